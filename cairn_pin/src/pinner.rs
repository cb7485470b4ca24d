use std::collections::HashMap;

use async_trait::async_trait;
use cairn_core::{DagNode, Datastore, Hash, KeySet, LinkResolver, PinRoots};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    PinMode,
    error::{PinError, PinResult},
    indirect::IndirectPins,
    records::{self, DIRECT_PIN_KEY, INDIRECT_PIN_KEY, RECURSIVE_PIN_KEY},
    walk::closure_refs,
};

#[derive(Debug, Default)]
struct PinState {
    recursive: KeySet,
    direct: KeySet,
    indirect: IndirectPins,
}

/// Tracks which DAGs must survive garbage collection.
///
/// A key is either pinned recursively (itself and every descendant),
/// directly (only itself), indirectly (a recursively pinned ancestor links
/// to it; reference counted), or not at all. Recursive and direct pins are
/// mutually exclusive.
///
/// All three structures sit behind one readers-writer lock. Mutations hold
/// the write lock for their whole duration, including the DAG walks they
/// perform, so no reader ever sees a half-applied pin. Recursive pin and
/// unpin resolve the full sub-DAG before touching any count, so a failed
/// fetch leaves the state exactly as it was.
///
/// Changes are only durable after [`Pinner::flush`].
#[derive(Debug)]
pub struct Pinner<R, D> {
    state: RwLock<PinState>,
    internal: KeySet,
    resolver: R,
    datastore: D,
}

impl<R, D> Pinner<R, D>
where
    R: LinkResolver,
    D: Datastore,
{
    /// Creates an empty pinner.
    pub fn new(resolver: R, datastore: D) -> Self {
        Self::with_state(resolver, datastore, PinState::default())
    }

    fn with_state(resolver: R, datastore: D, state: PinState) -> Self {
        Self {
            state: RwLock::new(state),
            internal: KeySet::new(),
            resolver,
            datastore,
        }
    }

    /// Registers keys the pinner depends on itself. They are always treated
    /// as recursive roots by the garbage collector and cannot be removed.
    pub fn with_internal_pins(mut self, keys: impl IntoIterator<Item = Hash>) -> Self {
        self.internal.extend(keys);
        self
    }

    /// Loads the pin state previously written by [`Pinner::flush`].
    ///
    /// Fails if any of the three records is missing or corrupt.
    pub async fn load(resolver: R, datastore: D) -> PinResult<Self> {
        let recursive = Self::read_record(&datastore, RECURSIVE_PIN_KEY).await?;
        let recursive = records::decode_keys(RECURSIVE_PIN_KEY, &recursive)?;

        let direct = Self::read_record(&datastore, DIRECT_PIN_KEY).await?;
        let direct = records::decode_keys(DIRECT_PIN_KEY, &direct)?;

        let indirect = Self::read_record(&datastore, INDIRECT_PIN_KEY).await?;
        let indirect = IndirectPins::from_refs(records::decode_refs(&indirect)?);

        debug!(
            recursive = recursive.len(),
            direct = direct.len(),
            indirect = indirect.len(),
            "loaded pin state"
        );
        let state = PinState {
            recursive,
            direct,
            indirect,
        };
        Ok(Self::with_state(resolver, datastore, state))
    }

    /// Loads the pin state, or starts empty if nothing was ever flushed.
    ///
    /// A datastore holding only some of the records is reported as
    /// `MissingRecord` rather than silently reset.
    pub async fn open(resolver: R, datastore: D) -> PinResult<Self> {
        let mut present = 0;
        for path in [RECURSIVE_PIN_KEY, DIRECT_PIN_KEY, INDIRECT_PIN_KEY] {
            if datastore
                .get(path)
                .await
                .map_err(PinError::Datastore)?
                .is_some()
            {
                present += 1;
            }
        }
        if present == 0 {
            debug!("no pin state found, starting empty");
            return Ok(Self::new(resolver, datastore));
        }
        Self::load(resolver, datastore).await
    }

    async fn read_record(datastore: &D, path: &'static str) -> PinResult<bytes::Bytes> {
        datastore
            .get(path)
            .await
            .map_err(PinError::Datastore)?
            .ok_or(PinError::MissingRecord { path })
    }

    /// Pins `node`.
    ///
    /// Recursive: a no-op if already pinned recursively. Otherwise every key
    /// reachable from `node` gains one indirect reference per path, any direct
    /// pin on the node is replaced, and the node joins the recursive set.
    ///
    /// Direct: the node must be resolvable and must not be pinned
    /// recursively.
    pub async fn pin(&self, node: &DagNode, recursive: bool) -> PinResult<()> {
        let key = node.key();
        let mut state = self.state.write().await;

        if recursive {
            if state.recursive.has(&key) {
                return Ok(());
            }
            let refs = closure_refs(&self.resolver, &node.links).await?;
            state
                .indirect
                .increment_all(&refs)
                .map_err(PinError::RefCountOverflow)?;
            state.direct.remove(&key);
            state.recursive.add(key);
            debug!(key = %key.fmt_short(), descendants = refs.len(), "pinned recursively");
        } else {
            self.resolver.fetch_node(&key).await?;
            if state.recursive.has(&key) {
                return Err(PinError::AlreadyPinnedRecursively(key));
            }
            state.direct.add(key);
            debug!(key = %key.fmt_short(), "pinned directly");
        }
        Ok(())
    }

    /// Fetches the node stored under `key` and pins it.
    pub async fn pin_key(&self, key: &Hash, recursive: bool) -> PinResult<()> {
        let node = self.resolver.fetch_node(key).await?;
        self.pin(&node, recursive).await
    }

    /// Removes the pin on `key`.
    ///
    /// A recursive pin requires `recursive = true` and releases one
    /// reference per path on every descendant. A direct pin is removed
    /// whatever `recursive` says. Indirect pins cannot be removed this way.
    pub async fn unpin(&self, key: &Hash, recursive: bool) -> PinResult<()> {
        let mut state = self.state.write().await;

        if state.recursive.has(key) {
            if !recursive {
                return Err(PinError::PinnedRecursively(*key));
            }
            let node = self.resolver.fetch_node(key).await?;
            let refs = closure_refs(&self.resolver, &node.links).await?;
            state.recursive.remove(key);
            for (child, n) in &refs {
                state.indirect.decrement_by(child, *n);
            }
            debug!(key = %key.fmt_short(), descendants = refs.len(), "unpinned recursively");
            Ok(())
        } else if state.direct.remove(key) {
            debug!(key = %key.fmt_short(), "unpinned directly");
            Ok(())
        } else if state.indirect.has(key) {
            Err(PinError::PinnedIndirectly(*key))
        } else {
            Err(PinError::NotPinned(*key))
        }
    }

    /// Returns `true` if `key` is pinned recursively, directly or indirectly.
    pub async fn is_pinned(&self, key: &Hash) -> bool {
        let state = self.state.read().await;
        state.recursive.has(key) || state.direct.has(key) || state.indirect.has(key)
    }

    /// The strongest classification of `key`.
    pub async fn pin_mode(&self, key: &Hash) -> PinMode {
        let state = self.state.read().await;
        if state.recursive.has(key) {
            PinMode::Recursive
        } else if state.direct.has(key) {
            PinMode::Direct
        } else if state.indirect.has(key) {
            PinMode::Indirect
        } else {
            PinMode::NotPinned
        }
    }

    /// Returns `true` if `key` is held by a pin of exactly `mode`.
    ///
    /// Indirect holds alongside a recursive or direct pin also count.
    pub async fn is_pinned_with_mode(&self, key: &Hash, mode: PinMode) -> bool {
        let state = self.state.read().await;
        match mode {
            PinMode::Recursive => state.recursive.has(key),
            PinMode::Direct => state.direct.has(key),
            PinMode::Indirect => state.indirect.has(key),
            PinMode::NotPinned => {
                !(state.recursive.has(key) || state.direct.has(key) || state.indirect.has(key))
            }
        }
    }

    /// Directly pinned keys, sorted.
    pub async fn direct_keys(&self) -> Vec<Hash> {
        self.state.read().await.direct.to_sorted_vec()
    }

    /// Recursively pinned keys, sorted.
    pub async fn recursive_keys(&self) -> Vec<Hash> {
        self.state.read().await.recursive.to_sorted_vec()
    }

    /// Indirectly pinned keys with their reference counts.
    pub async fn indirect_keys(&self) -> HashMap<Hash, u64> {
        self.state.read().await.indirect.refs().clone()
    }

    /// Keys the pinner itself depends on, sorted.
    pub fn internal_pins(&self) -> Vec<Hash> {
        self.internal.to_sorted_vec()
    }

    /// Writes the direct set, the recursive set and the indirect reference
    /// counts to the datastore as three independent records.
    pub async fn flush(&self) -> PinResult<()> {
        // Exclusive so two flushes never interleave their records.
        let state = self.state.write().await;

        let direct = records::encode_keys(DIRECT_PIN_KEY, &state.direct)?;
        let recursive = records::encode_keys(RECURSIVE_PIN_KEY, &state.recursive)?;
        let indirect = records::encode_refs(state.indirect.refs())?;

        for (path, value) in [
            (DIRECT_PIN_KEY, direct),
            (RECURSIVE_PIN_KEY, recursive),
            (INDIRECT_PIN_KEY, indirect),
        ] {
            self.datastore
                .put(path, value)
                .await
                .map_err(PinError::Datastore)?;
        }
        debug!(
            recursive = state.recursive.len(),
            direct = state.direct.len(),
            indirect = state.indirect.len(),
            "flushed pin state"
        );
        Ok(())
    }

    /// Adds a pin of `mode` without walking the DAG.
    ///
    /// This bypasses every consistency rule: the caller must keep the three
    /// structures coherent. Meant for repair and migration tooling only.
    pub async fn pin_with_mode(&self, key: Hash, mode: PinMode) -> PinResult<()> {
        let mut state = self.state.write().await;
        match mode {
            PinMode::Recursive => state.recursive.add(key),
            PinMode::Direct => state.direct.add(key),
            PinMode::Indirect => state
                .indirect
                .increment(key)
                .map_err(PinError::RefCountOverflow)?,
            PinMode::NotPinned => return Err(PinError::InvalidMode(mode)),
        }
        Ok(())
    }

    /// Removes a pin of `mode` without walking the DAG. An indirect pin
    /// loses one reference.
    ///
    /// Same caveats as [`Pinner::pin_with_mode`].
    pub async fn remove_pin_with_mode(&self, key: &Hash, mode: PinMode) -> PinResult<()> {
        let mut state = self.state.write().await;
        match mode {
            PinMode::Recursive => {
                state.recursive.remove(key);
            }
            PinMode::Direct => {
                state.direct.remove(key);
            }
            PinMode::Indirect => state.indirect.decrement(key),
            PinMode::NotPinned => return Err(PinError::InvalidMode(mode)),
        }
        Ok(())
    }
}

#[async_trait]
impl<R, D> PinRoots for Pinner<R, D>
where
    R: LinkResolver,
    D: Datastore,
{
    async fn recursive_keys(&self) -> Vec<Hash> {
        Pinner::recursive_keys(self).await
    }

    async fn direct_keys(&self) -> Vec<Hash> {
        Pinner::direct_keys(self).await
    }

    async fn internal_pins(&self) -> Vec<Hash> {
        Pinner::internal_pins(self)
    }
}
