//! Foundation types for interactive state persistence.
//!
//! This crate provides the value, identity, and handshake types shared by
//! every other `istate` crate. It performs no I/O.
//!
//! # Key Types
//!
//! - [`ModuleState`] -- opaque JSON value holding a module's working state
//! - [`StateReference`] -- small record standing in for state moved to an attachment
//! - [`InstanceId`] -- identity of one embedded module instance
//! - [`LinkedStateEntry`] -- state produced by a related module instance
//! - [`HandshakeResult`] -- immutable run context obtained from the host
//! - [`ReconciliationOutcome`] -- the state chosen for the current load
//! - [`Capabilities`] -- which provider operations a backend supports

pub mod capability;
pub mod error;
pub mod handshake;
pub mod identity;
pub mod outcome;
pub mod state;

pub use capability::{Capabilities, Capability};
pub use error::TypeError;
pub use handshake::{HandshakeResult, LinkedStateEntry, RunMode};
pub use identity::InstanceId;
pub use outcome::ReconciliationOutcome;
pub use state::{is_absent, is_empty_object, serialized_size, ContentType, ModuleState, StateReference};
