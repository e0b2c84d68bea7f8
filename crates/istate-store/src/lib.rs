//! State persistence for embedded interactive modules.
//!
//! A module hands its state to the [`StateStoreAdapter`], which decides per
//! write whether the state is stored inline through the host's state channel
//! or redirected into the [`AttachmentStore`], leaving a small
//! [`StateReference`](istate_types::StateReference) in its place. Loads
//! resolve such references transparently.
//!
//! # Storage Backends
//!
//! Hosts plug in through two traits:
//!
//! - [`StateBackend`] -- buffered read/write of the inline state, plus flush
//! - [`AttachmentBackend`] -- named auxiliary blobs keyed to an instance
//!
//! [`InMemoryHost`] implements both for tests and embedding.
//!
//! # Design Rules
//!
//! 1. State at or above the size threshold is always stored as an attachment.
//! 2. An attachment write either fully succeeds, followed by the reference
//!    write, or nothing is persisted.
//! 3. Every save flushes the buffered state channel before returning.
//! 4. Backend failures are propagated with the backend's own text.

pub mod adapter;
pub mod attachment;
pub mod config;
pub mod error;
pub mod memory;
pub mod traits;

pub use adapter::{SaveOptions, StateStoreAdapter, StorageStrategy};
pub use attachment::AttachmentStore;
pub use config::{StorageConfig, DEFAULT_ATTACHMENT_NAME, DEFAULT_ATTACHMENT_THRESHOLD};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryHost;
pub use traits::{
    AttachmentBackend, AttachmentRead, AttachmentWrite, BackendResponse, StateBackend, StateUpdate,
};
