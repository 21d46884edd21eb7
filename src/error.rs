use thiserror::Error;

/// The engine's closed error taxonomy. Every fallible entry point on
/// [`crate::sync_manager::SyncManager`] returns one of these; nothing is
/// thrown across the API boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OtError {
    #[error("position {position} (length {length}) is invalid for a document of {document_len} characters")]
    InvalidPosition {
        position: usize,
        length: usize,
        document_len: usize,
    },

    #[error("operation kind is not Insert or Delete")]
    UnknownKind,

    #[error("operation {0} has already been applied")]
    DuplicateOp(String),

    #[error("failed to (de)serialize at the wire boundary: {0}")]
    Serialization(String),
}

/// Host-level session bookkeeping errors. Distinct from [`OtError`]
/// because the session layer is explicit host-side plumbing the engine
/// never inspects (see [`crate::session`]).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(String),

    #[error("participant {0} is not a member of this session")]
    NotAMember(String),

    #[error("edit control is already held by {0}")]
    EditControlHeld(String),
}

/// Errors surfaced by the host binary: config loading, session
/// bookkeeping, transport placement, or the engine itself, unified for
/// the bridge loop's single error-reporting path.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Ot(#[from] OtError),

    #[error("transport unavailable: {0}")]
    Transport(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
