//! A real-time collaborative text synchronization engine built on
//! Operational Transformation.
//!
//! The core — [`clock`], [`operation`], [`transform`], [`buffer`],
//! [`document`], and [`sync_manager`] — is a single-document OT engine:
//! it accepts local edits optimistically, integrates remote edits
//! against any concurrent local edits, and converges every participant
//! on the same content regardless of delivery order.
//!
//! Everything else ([`session`], [`doc_metadata`], [`transport`],
//! [`config`], [`metrics`]) is host-side plumbing around that core.

pub mod buffer;
pub mod clock;
pub mod config;
pub mod doc_metadata;
pub mod document;
pub mod error;
pub mod metrics;
pub mod operation;
pub mod priority;
pub mod session;
pub mod sync_manager;
pub mod transform;
pub mod transport;

pub use clock::VectorClock;
pub use error::{HostError, OtError, SessionError};
pub use operation::{Operation, OperationKind};
pub use sync_manager::{DocumentSnapshot, RemoteApplyOutcome, SyncManager};
