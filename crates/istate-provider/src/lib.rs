//! Interactive-state storage provider.
//!
//! [`InteractiveApiProvider`] is the caller-facing surface: a document host
//! asks it to load, save, or open a module's state without knowing whether
//! the state lives inline, in an attachment, in a linked instance, or in a
//! shared document. Underneath it drives the session handshake, the state
//! reconciler, the attachment-aware state store and the URL rewriter.

pub mod config;
pub mod content;
pub mod document;
pub mod error;
pub mod provider;
pub mod telemetry;

pub use config::{LaunchParams, ProviderConfig, ATTACHMENT_LAUNCH_VALUE};
pub use content::{CloudContent, CloudMetadata, MetadataKind, OpenSavedParams, Opened, SaveReceipt};
pub use document::{DocumentFetcher, HttpDocumentFetcher, InMemoryDocuments};
pub use error::{ProviderError, ProviderResult};
pub use provider::{InteractiveApiProvider, ProviderBackends};
pub use telemetry::{LaunchLogData, LaunchLogger, MemoryLaunchLog};

// Re-export the types callers need to assemble a provider.
pub use istate_session::{
    Candidate, ConflictChoice, ConflictPrompt, ConflictResolver, FixedResolver, HostChannel,
    StaticHostChannel,
};
pub use istate_store::{AttachmentBackend, InMemoryHost, StateBackend, StorageConfig};
pub use istate_types::{Capabilities, Capability, HandshakeResult, ModuleState, RunMode};
