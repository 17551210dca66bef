//! `EventQueue` — per-agent state transitions keyed by the tick they fire.
//!
//! The simulation pushes `(tick, payload)` when it decides an agent will
//! change state in the future (end of incubation, recovery, death) and pops
//! due entries at the start of each tick.
//!
//! # Performance note
//!
//! `BinaryHeap` gives O(log E) push and pop where E is the number of queued
//! events.  Entries are stored inline as `(tick, seq, payload)` with the
//! payload type fixed per queue, so there is no per-event allocation beyond
//! amortized heap growth.  Pre-size with [`EventQueue::with_capacity`] when
//! the event volume is known.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use epi_core::Tick;

use crate::{ScheduleError, ScheduleResult};

/// One queued event.  Ordered by `(tick, seq)` only; the payload never takes
/// part in comparisons, so `P` needs no `Ord`.
struct Entry<P> {
    tick:    Tick,
    seq:     u64,
    payload: P,
}

impl<P> Entry<P> {
    #[inline]
    fn key(&self) -> (Tick, u64) {
        (self.tick, self.seq)
    }
}

impl<P> PartialEq for Entry<P> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<P> Eq for Entry<P> {}

impl<P> PartialOrd for Entry<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for Entry<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Min-priority queue over `(tick, insertion sequence)`.
pub struct EventQueue<P> {
    heap:     BinaryHeap<Reverse<Entry<P>>>,
    /// Next insertion sequence number; strictly increasing for the life of
    /// the queue, including across `clear`.
    next_seq: u64,
}

impl<P> Default for EventQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> EventQueue<P> {
    pub fn new() -> Self {
        Self { heap: BinaryHeap::new(), next_seq: 0 }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { heap: BinaryHeap::with_capacity(capacity), next_seq: 0 }
    }

    /// Schedule `payload` at `tick`.
    pub fn push(&mut self, tick: Tick, payload: P) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Entry { tick, seq, payload }));
    }

    /// Remove and return the earliest entry.
    pub fn pop_min(&mut self) -> ScheduleResult<(Tick, P)> {
        self.heap
            .pop()
            .map(|Reverse(e)| (e.tick, e.payload))
            .ok_or(ScheduleError::EmptyQueue)
    }

    /// The earliest entry without removing it.
    pub fn peek_min(&self) -> Option<(Tick, &P)> {
        self.heap.peek().map(|Reverse(e)| (e.tick, &e.payload))
    }

    /// Tick of the earliest entry, or `None` if empty.
    pub fn next_tick(&self) -> Option<Tick> {
        self.heap.peek().map(|Reverse(e)| e.tick)
    }

    /// Pop the earliest entry only if it is due at or before `now`.
    ///
    /// Drain a tick with `while let Some((t, p)) = q.pop_due(now) { .. }`.
    pub fn pop_due(&mut self, now: Tick) -> Option<(Tick, P)> {
        if self.next_tick()? > now {
            return None;
        }
        self.pop_min().ok()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Alias of [`len`](Self::len).
    pub fn size(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop every entry.  Sequence numbers keep counting, so FIFO order
    /// among entries pushed afterwards is unaffected.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl<P> Extend<(Tick, P)> for EventQueue<P> {
    fn extend<I: IntoIterator<Item = (Tick, P)>>(&mut self, iter: I) {
        for (tick, payload) in iter {
            self.push(tick, payload);
        }
    }
}
