//! Two-slot song queue.
//!
//! At most one song is `current` (being generated or played) and at most
//! one is `next`. Submissions beyond that are refused with
//! [`QueueError::QueueFull`].

pub mod controller;
pub mod state;

pub use controller::{PollOutcome, QueueError, QueueEvent, SongQueue, TickReport};
pub use state::{QueueSnapshot, QueueState, Slot, SongRequest, SongStatus};
