//! Sweep phase: deleting every stored key outside the live set.

use cairn_core::{BlockStore, Hash, KeySet, KeyStream};
use futures::{Stream, StreamExt, stream};
use tracing::{debug, warn};

use crate::GcError;

struct SweepState<'a, S: ?Sized> {
    store: &'a S,
    live: &'a KeySet,
    keys: Option<KeyStream>,
    failed: usize,
}

/// Lazily deletes every key yielded by `keys` that is not in `live`.
///
/// Each removal yields the removed key; each failed removal yields
/// [`GcError::CannotDeleteBlock`] and the sweep carries on. A failure of the
/// enumeration itself yields [`GcError::Enumerate`] and ends the pass. Once
/// the pass is over, a final [`GcError::CannotDeleteSomeBlocks`] follows if
/// any removal failed.
///
/// Nothing is deleted until the stream is polled, so a slow consumer slows
/// the sweep down and dropping the stream stops it.
pub fn sweep<'a, S>(
    store: &'a S,
    live: &'a KeySet,
    keys: KeyStream,
) -> impl Stream<Item = Result<Hash, GcError>> + Send + 'a
where
    S: BlockStore + ?Sized,
{
    let state = SweepState {
        store,
        live,
        keys: Some(keys),
        failed: 0,
    };
    stream::unfold(state, |mut state| async move {
        loop {
            let Some(keys) = state.keys.as_mut() else {
                // Pass over: report failures once, then end.
                if state.failed == 0 {
                    return None;
                }
                warn!(failed = state.failed, "some blocks could not be deleted");
                state.failed = 0;
                return Some((Err(GcError::CannotDeleteSomeBlocks), state));
            };

            match keys.next().await {
                Some(Ok(key)) => {
                    if state.live.has(&key) {
                        continue;
                    }
                    match state.store.delete(&key).await {
                        Ok(()) => {
                            debug!(key = %key.fmt_short(), "removed");
                            return Some((Ok(key), state));
                        }
                        Err(source) => {
                            warn!(key = %key.fmt_short(), error = %source, "could not remove");
                            state.failed += 1;
                            return Some((Err(GcError::CannotDeleteBlock { key, source }), state));
                        }
                    }
                }
                Some(Err(e)) => {
                    state.keys = None;
                    return Some((Err(GcError::Enumerate(e)), state));
                }
                None => state.keys = None,
            }
        }
    })
}
