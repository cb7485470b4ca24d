use tracing::{debug, info};

/// Progress notifications emitted by a GC run, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GcEvent {
    /// Waiting for the store's GC lock.
    LockWait,
    Locked,
    MarkStarted,
    MarkFinished { live: usize },
    SweepStarted,
    SweepFinished { removed: usize, failed: usize },
    /// The run stopped early because it was cancelled or its stream was
    /// dropped.
    Cancelled,
}

/// Receives [`GcEvent`]s from the background GC task.
///
/// Called inline from the GC task, so implementations should return quickly.
pub trait GcObserver: Send + Sync + 'static {
    fn on_event(&self, event: &GcEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl GcObserver for NoopObserver {
    fn on_event(&self, _event: &GcEvent) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl GcObserver for TracingObserver {
    fn on_event(&self, event: &GcEvent) {
        match event {
            GcEvent::LockWait => debug!("gc: waiting for lock"),
            GcEvent::Locked => debug!("gc: lock acquired"),
            GcEvent::MarkStarted => debug!("gc: marking live blocks"),
            GcEvent::MarkFinished { live } => info!(live, "gc: mark finished"),
            GcEvent::SweepStarted => debug!("gc: sweeping"),
            GcEvent::SweepFinished { removed, failed } => {
                info!(removed, failed, "gc: sweep finished")
            }
            GcEvent::Cancelled => info!("gc: cancelled"),
        }
    }
}

impl<F> GcObserver for F
where
    F: Fn(&GcEvent) + Send + Sync + 'static,
{
    fn on_event(&self, event: &GcEvent) {
        self(event)
    }
}
