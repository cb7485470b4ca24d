use std::{
    pin::{Pin, pin},
    sync::Arc,
    task::{Context, Poll},
};

use cairn_core::{GcBlockstore, Hash, LinkResolver, PinRoots};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use crate::{
    GcError,
    colored::colored_set,
    events::{GcEvent, GcObserver, NoopObserver},
    sweep::sweep,
};

/// Results buffered before a run waits for its consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;

/// Results of one GC run, in the order they were produced.
///
/// Yields `Ok(key)` for every removed block and `Err` for every failure. The
/// stream ends when the run is over. Dropping it cancels the run and
/// releases the GC lock.
pub struct GcStream {
    results: ReceiverStream<Result<Hash, GcError>>,
    _cancel_on_drop: DropGuard,
}

impl std::fmt::Debug for GcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcStream").finish_non_exhaustive()
    }
}

impl Stream for GcStream {
    type Item = Result<Hash, GcError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.results).poll_next(cx)
    }
}

struct Inner<S, P, R> {
    store: S,
    pins: P,
    resolver: R,
}

/// Mark-and-sweep collector over a block store.
///
/// A run holds the store's exclusive GC lock from before marking until the
/// sweep is drained, cancelled or aborted. Keeping the pin set stable during
/// marking is up to the caller, typically by taking the store's pin lock
/// around every pin mutation.
pub struct GarbageCollector<S, P, R> {
    inner: Arc<Inner<S, P, R>>,
    observer: Arc<dyn GcObserver>,
    capacity: usize,
}

impl<S, P, R> Clone for GarbageCollector<S, P, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            observer: self.observer.clone(),
            capacity: self.capacity,
        }
    }
}

impl<S, P, R> GarbageCollector<S, P, R>
where
    S: GcBlockstore,
    P: PinRoots + 'static,
    R: LinkResolver + 'static,
{
    pub fn new(store: S, pins: P, resolver: R) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                pins,
                resolver,
            }),
            observer: Arc::new(NoopObserver),
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Replaces the observer notified of run progress.
    pub fn with_observer(mut self, observer: impl GcObserver) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Number of results buffered before the sweep waits for the consumer.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Starts a run on a background task and returns its result stream.
    ///
    /// `best_effort_roots` are kept alive along with everything reachable
    /// from them that can still be resolved. Cancelling `cancel` stops the
    /// run at its next step.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run(&self, cancel: CancellationToken, best_effort_roots: Vec<Hash>) -> GcStream {
        let (tx, rx) = mpsc::channel(self.capacity);
        let token = cancel.child_token();
        let inner = self.inner.clone();
        let observer = self.observer.clone();
        let task_token = token.clone();
        tokio::spawn(async move {
            let finished = collect(&inner, &*observer, &task_token, &best_effort_roots, &tx).await;
            if finished.is_none() {
                observer.on_event(&GcEvent::Cancelled);
            }
        });
        GcStream {
            results: ReceiverStream::new(rx),
            _cancel_on_drop: token.drop_guard(),
        }
    }
}

/// Starts a single GC run. See [`GarbageCollector::run`].
pub fn run_gc<S, P, R>(
    cancel: CancellationToken,
    store: S,
    pins: P,
    resolver: R,
    best_effort_roots: Vec<Hash>,
) -> GcStream
where
    S: GcBlockstore,
    P: PinRoots + 'static,
    R: LinkResolver + 'static,
{
    GarbageCollector::new(store, pins, resolver).run(cancel, best_effort_roots)
}

/// Sends `item` unless the run is cancelled or nobody is listening.
///
/// A closed receiver is treated as cancellation: the receiver only closes
/// when the [`GcStream`] is dropped, and its drop guard cancels the run.
async fn emit(
    tx: &mpsc::Sender<Result<Hash, GcError>>,
    cancel: &CancellationToken,
    item: Result<Hash, GcError>,
) -> Option<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        sent = tx.send(item) => sent.ok(),
    }
}

/// Body of a run. Returns `None` if it stopped early because of
/// cancellation or because the result stream was dropped.
async fn collect<S, P, R>(
    inner: &Inner<S, P, R>,
    observer: &dyn GcObserver,
    cancel: &CancellationToken,
    best_effort_roots: &[Hash],
    tx: &mpsc::Sender<Result<Hash, GcError>>,
) -> Option<()>
where
    S: GcBlockstore,
    P: PinRoots,
    R: LinkResolver,
{
    observer.on_event(&GcEvent::LockWait);
    let locked = cancel.run_until_cancelled(inner.store.gc_lock()).await?;
    let _guard = match locked {
        Ok(guard) => guard,
        Err(e) => return emit(tx, cancel, Err(GcError::Lock(e))).await,
    };
    observer.on_event(&GcEvent::Locked);

    observer.on_event(&GcEvent::MarkStarted);
    let marked = cancel
        .run_until_cancelled(colored_set(&inner.pins, &inner.resolver, best_effort_roots))
        .await?;
    let live = match marked {
        Ok(live) => live,
        Err(errors) => {
            debug!(errors = errors.len(), "gc: mark failed, not sweeping");
            for error in errors {
                emit(tx, cancel, Err(error)).await?;
            }
            return emit(tx, cancel, Err(GcError::CannotFetchAllLinks)).await;
        }
    };
    observer.on_event(&GcEvent::MarkFinished { live: live.len() });

    let keys = match cancel.run_until_cancelled(inner.store.all_keys()).await? {
        Ok(keys) => keys,
        Err(e) => return emit(tx, cancel, Err(GcError::Enumerate(e))).await,
    };

    observer.on_event(&GcEvent::SweepStarted);
    let (mut removed, mut failed) = (0, 0);
    let mut results = pin!(sweep(&inner.store, &live, keys));
    while let Some(item) = cancel.run_until_cancelled(results.next()).await? {
        match &item {
            Ok(_) => removed += 1,
            Err(GcError::CannotDeleteBlock { .. }) => failed += 1,
            Err(_) => {}
        }
        emit(tx, cancel, item).await?;
    }
    observer.on_event(&GcEvent::SweepFinished { removed, failed });
    Some(())
}
