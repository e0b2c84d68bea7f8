//! Session startup for embedded interactive modules.
//!
//! A session starts with a single handshake with the host, which reports
//! the run mode, the instance identity, the instance's own saved state and
//! any states produced by linked instances. The [`Reconciler`] then decides
//! which of those states the module should start from, asking the user
//! through a [`ConflictResolver`] when recency makes the choice ambiguous.
//!
//! All per-session state lives in one [`Session`] value that dependents
//! borrow; there are no process-wide caches.

pub mod error;
pub mod handshake;
pub mod memory;
pub mod reconcile;
pub mod session;

pub use error::{SessionError, SessionResult};
pub use handshake::{Handshake, HostChannel};
pub use memory::{FixedResolver, StaticHostChannel};
pub use reconcile::{Candidate, ConflictChoice, ConflictPrompt, ConflictResolver, Reconciler};
pub use session::Session;
