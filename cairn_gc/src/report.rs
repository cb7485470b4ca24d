use cairn_core::Hash;
use futures::{Stream, StreamExt};

use crate::{GcError, GcErrorKind};

/// Everything a GC run produced, gathered from its result stream.
#[derive(Debug, Default)]
pub struct GcReport {
    pub removed: Vec<Hash>,
    pub errors: Vec<GcError>,
}

impl GcReport {
    /// Drains `results` to the end.
    pub async fn collect<St>(results: St) -> Self
    where
        St: Stream<Item = Result<Hash, GcError>>,
    {
        let mut report = GcReport::default();
        let mut results = std::pin::pin!(results);
        while let Some(result) = results.next().await {
            match result {
                Ok(key) => report.removed.push(key),
                Err(e) => report.errors.push(e),
            }
        }
        report
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `true` if marking failed and nothing was swept.
    pub fn aborted(&self) -> bool {
        self.has_kind(GcErrorKind::FetchAbort)
    }

    pub fn has_kind(&self, kind: GcErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind() == kind)
    }
}
