//! `epi-schedule` — tick-ordered event queue.
//!
//! # Crate layout
//!
//! | Module          | Contents                                      |
//! |-----------------|-----------------------------------------------|
//! | [`event_queue`] | `EventQueue<P>` (binary heap over `(tick, seq)`) |
//! | [`error`]       | `ScheduleError`, `ScheduleResult<T>`          |
//!
//! # Ordering
//!
//! Entries pop in ascending tick order.  Entries sharing a tick pop in the
//! order they were pushed:
//!
//! ```text
//! push (T5, a)  push (T2, b)  push (T5, c)   →   pop: b, a, c
//! ```

pub mod error;
pub mod event_queue;

#[cfg(test)]
mod tests;

pub use error::{ScheduleError, ScheduleResult};
pub use event_queue::EventQueue;
