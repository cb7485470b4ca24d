//! Mark-and-sweep garbage collection for cairn block stores.
//!
//! A run locks the store, computes the live set from a pinner's roots
//! ([`colored_set`]), then deletes every stored block outside it
//! ([`sweep`]). Results are streamed back as they happen; see
//! [`GarbageCollector::run`].

pub mod colored;
mod error;
mod events;
mod gc;
mod report;
pub mod sweep;

pub use colored::{Traversal, colored_set, descendants};
pub use error::{GcError, GcErrorKind};
pub use events::{GcEvent, GcObserver, NoopObserver, TracingObserver};
pub use gc::{DEFAULT_CHANNEL_CAPACITY, GarbageCollector, GcStream, run_gc};
pub use report::GcReport;
pub use sweep::sweep;
pub use tokio_util::sync::CancellationToken;
