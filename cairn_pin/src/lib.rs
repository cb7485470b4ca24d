//! Pin registry for cairn block stores.
//!
//! A [`Pinner`] records which DAGs must survive garbage collection. Keys can
//! be pinned recursively (the node and everything below it) or directly (the
//! node alone); every descendant of a recursive pin is tracked as an indirect
//! pin with a per-path reference count. The state is persisted to a
//! [`Datastore`](cairn_core::Datastore) by [`Pinner::flush`] and restored by
//! [`Pinner::load`].

mod error;
mod indirect;
mod mode;
mod pinner;
mod records;
mod walk;

pub use error::{PinError, PinResult};
pub use indirect::IndirectPins;
pub use mode::{ParseModeError, PinFilter, PinMode};
pub use pinner::Pinner;
pub use records::{DIRECT_PIN_KEY, INDIRECT_PIN_KEY, RECURSIVE_PIN_KEY};
