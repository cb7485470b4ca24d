use cairn_core::{Hash, LinkError, StoreError};

/// A single failure reported on a GC result stream.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum GcError {
    /// The links of `key` could not be resolved while marking.
    #[error("could not retrieve links for {key}")]
    CannotFetchLinks {
        key: Hash,
        #[source]
        source: LinkError,
    },

    /// `key` is garbage but could not be removed from the store.
    #[error("could not remove {key}")]
    CannotDeleteBlock {
        key: Hash,
        #[source]
        source: StoreError,
    },

    /// Marking failed for at least one key; nothing was swept.
    #[error("garbage collection aborted: could not retrieve some links")]
    CannotFetchAllLinks,

    /// Sweeping finished but at least one block could not be removed.
    #[error("garbage collection incomplete: could not delete some blocks")]
    CannotDeleteSomeBlocks,

    #[error("could not enumerate stored blocks")]
    Enumerate(#[source] StoreError),

    #[error("could not acquire the gc lock")]
    Lock(#[source] StoreError),
}

/// Coarse classification of a [`GcError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GcErrorKind {
    LinkFetch,
    Delete,
    FetchAbort,
    DeleteIncomplete,
    Enumerate,
    Lock,
}

impl GcError {
    pub fn kind(&self) -> GcErrorKind {
        match self {
            GcError::CannotFetchLinks { .. } => GcErrorKind::LinkFetch,
            GcError::CannotDeleteBlock { .. } => GcErrorKind::Delete,
            GcError::CannotFetchAllLinks => GcErrorKind::FetchAbort,
            GcError::CannotDeleteSomeBlocks => GcErrorKind::DeleteIncomplete,
            GcError::Enumerate(_) => GcErrorKind::Enumerate,
            GcError::Lock(_) => GcErrorKind::Lock,
        }
    }

    /// Returns `true` for errors after which the run stops without sweeping
    /// the rest of the store.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind(),
            GcErrorKind::FetchAbort | GcErrorKind::Enumerate | GcErrorKind::Lock
        )
    }
}
