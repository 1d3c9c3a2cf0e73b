//! The engine-wide event queue: a min-heap ordered by `(time, rank, seq)`.
//!
//! `TimeQueue` (used internally by delay-style nodes for their own private
//! re-wake queues) only orders by time. The scheduler needs the full tuple
//! so that, within one engine time, events are drained in rank order, and
//! within one `(time, rank)`, insertion order is preserved (`seq` is a
//! process-wide monotonic counter assigned at push time).

use std::cmp::Reverse;
use std::collections::HashSet;

use priority_queue::PriorityQueue;

use crate::time::NanoTime;

/// Opaque handle returned by [`Scheduler::push`]; pass back to
/// [`Scheduler::cancel`] to lazily remove a pending event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Key(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Priority(Reverse<NanoTime>, Reverse<u32>, Reverse<u64>);

/// A min-heap of pending engine work, ordered `(time asc, rank asc, seq asc)`.
#[derive(Debug, Default)]
pub struct Scheduler<T> {
    queue: PriorityQueue<Key, Priority>,
    payloads: std::collections::HashMap<u64, T>,
    tombstones: HashSet<u64>,
    next_seq: u64,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            queue: PriorityQueue::new(),
            payloads: std::collections::HashMap::new(),
            tombstones: HashSet::new(),
            next_seq: 0,
        }
    }

    /// Enqueue `payload` to fire at `(time, rank)`. Returns a handle that
    /// can later be passed to [`Scheduler::cancel`].
    pub fn push(&mut self, time: NanoTime, rank: u32, payload: T) -> EventHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue
            .push(Key(seq), Priority(Reverse(time), Reverse(rank), Reverse(seq)));
        self.payloads.insert(seq, payload);
        EventHandle(seq)
    }

    /// Lazily cancel a pending event. A no-op if it has already fired or
    /// was already canceled.
    pub fn cancel(&mut self, handle: EventHandle) {
        self.tombstones.insert(handle.0);
    }

    /// Time of the earliest non-canceled event, if any.
    pub fn peek_time(&mut self) -> Option<NanoTime> {
        self.drain_tombstones();
        self.queue.peek().map(|(_, p)| (p.0).0)
    }

    /// Pop the earliest non-canceled event.
    pub fn pop_earliest(&mut self) -> Option<(NanoTime, u32, T)> {
        self.drain_tombstones();
        let (key, priority) = self.queue.pop()?;
        let payload = self.payloads.remove(&key.0)?;
        Some((priority.0.0, (priority.1).0, payload))
    }

    pub fn is_empty(&mut self) -> bool {
        self.peek_time().is_none()
    }

    fn drain_tombstones(&mut self) {
        while let Some((key, _)) = self.queue.peek() {
            if self.tombstones.remove(&key.0) {
                let key = *key;
                self.queue.remove(&key);
                self.payloads.remove(&key.0);
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_time_then_rank_then_seq() {
        let mut s = Scheduler::new();
        s.push(NanoTime::new(10), 1, "a");
        s.push(NanoTime::new(10), 0, "b");
        s.push(NanoTime::new(5), 3, "c");
        s.push(NanoTime::new(10), 1, "d");

        assert_eq!(s.pop_earliest().unwrap().2, "c");
        assert_eq!(s.pop_earliest().unwrap().2, "b");
        assert_eq!(s.pop_earliest().unwrap().2, "a");
        assert_eq!(s.pop_earliest().unwrap().2, "d");
        assert!(s.pop_earliest().is_none());
    }

    #[test]
    fn cancel_is_lazy_and_idempotent() {
        let mut s = Scheduler::new();
        let h = s.push(NanoTime::new(10), 0, "a");
        s.push(NanoTime::new(20), 0, "b");
        s.cancel(h);
        s.cancel(h); // no-op, already tombstoned
        assert_eq!(s.pop_earliest().unwrap().2, "b");
        assert!(s.pop_earliest().is_none());
    }

    #[test]
    fn cancel_after_pop_is_noop() {
        let mut s = Scheduler::new();
        let h = s.push(NanoTime::new(10), 0, "a");
        assert_eq!(s.pop_earliest().unwrap().2, "a");
        s.cancel(h);
        assert!(s.pop_earliest().is_none());
    }

    #[test]
    fn peek_time_skips_canceled() {
        let mut s = Scheduler::new();
        let h = s.push(NanoTime::new(10), 0, "a");
        s.push(NanoTime::new(20), 0, "b");
        s.cancel(h);
        assert_eq!(s.peek_time(), Some(NanoTime::new(20)));
    }
}
