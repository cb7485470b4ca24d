use cairn_core::{Hash, LinkError};

use crate::PinMode;

/// Errors returned by pin operations.
///
/// Structural errors (the first six variants) leave the pin state
/// untouched.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum PinError {
    #[error("{0} already pinned recursively")]
    AlreadyPinnedRecursively(Hash),

    #[error("{0} is pinned recursively, must unpin recursively")]
    PinnedRecursively(Hash),

    #[error("{0} is pinned indirectly, indirect pins cannot be removed directly")]
    PinnedIndirectly(Hash),

    #[error("{0} is not pinned")]
    NotPinned(Hash),

    #[error("pins cannot be edited with mode {0}")]
    InvalidMode(PinMode),

    #[error("{0} is reachable through too many paths to count")]
    RefCountOverflow(Hash),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("pin record {path} is missing")]
    MissingRecord { path: &'static str },

    #[error("pin record {path} is corrupt: {reason}")]
    CorruptRecord { path: &'static str, reason: String },

    #[error("datastore error: {0}")]
    Datastore(#[source] anyhow::Error),
}

pub type PinResult<T> = Result<T, PinError>;
