//! Per-node self-scheduling timer facility (C3).
//!
//! An alarm is a typed self-edge: scheduling one at delay `d` requests a
//! wakeup at `now + d` carrying `payload`. A node embeds one [`AlarmQueue`]
//! per "kind" of alarm it wants (or one for everything, if payloads share
//! a type) as scratch state, calling [`AlarmQueue::schedule`] from
//! `start`/`cycle` and [`AlarmQueue::due`] from `cycle` to collect
//! whatever fired at the current engine time.
//!
//! A `delay` of zero still defers delivery to *after* the current cycle's
//! downstream propagation has settled, rather than recursing immediately:
//! the underlying `GraphState::add_callback` goes through the same
//! `(time, rank)`-ordered scheduler as every other event, and the cycle
//! loop only drains callbacks due at the current time at the *top* of
//! its outer-loop iteration, separately from `cycle()`'s layer-by-layer
//! dispatch. A same-time self-schedule made from inside `cycle()` is
//! therefore only visible on the next outer-loop pass — which, because
//! engine time hasn't advanced, runs at the same timestamp.

use crate::time::NanoTime;
use crate::types::GraphState;

/// Opaque handle returned by [`AlarmQueue::schedule`]; pass back to
/// [`AlarmQueue::cancel`] to cancel a pending alarm. Canceling one that
/// has already fired (or was already canceled) is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmHandle(u64);

/// A node's private queue of scheduled alarms. Not a graph-visible type —
/// nodes hold this in their own scratch state next to whatever else they
/// track.
#[derive(Debug, Default)]
pub struct AlarmQueue<P> {
    pending: Vec<(NanoTime, u64, P)>,
    next_id: u64,
}

impl<P> AlarmQueue<P> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 0,
        }
    }

    /// Schedules `payload` to fire at `state.time() + delay`. `delay`
    /// must be non-negative by construction (`NanoTime` cannot represent
    /// a negative offset).
    pub fn schedule(&mut self, state: &mut GraphState, delay: NanoTime, payload: P) -> AlarmHandle {
        let due = state.time() + delay;
        let id = self.next_id;
        self.next_id += 1;
        let pos = self.pending.partition_point(|(t, _, _)| *t <= due);
        self.pending.insert(pos, (due, id, payload));
        state.add_callback(due);
        AlarmHandle(id)
    }

    /// Cancels a pending alarm. No-op if it already fired.
    pub fn cancel(&mut self, handle: AlarmHandle) {
        self.pending.retain(|(_, id, _)| *id != handle.0);
    }

    /// Drains and returns every alarm due at the current engine time, in
    /// the order they were scheduled.
    pub fn due(&mut self, state: &GraphState) -> Vec<P> {
        let now = state.time();
        let mut out = Vec::new();
        while let Some((t, _, _)) = self.pending.first() {
            if *t != now {
                break;
            }
            let (_, _, payload) = self.pending.remove(0);
            out.push(payload);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, RunFor, RunMode};
    use crate::ops::CollectExt;
    use crate::types::*;
    use std::time::Duration;

    /// Starts, schedules an alarm at +5ms carrying `true`; on firing,
    /// writes 0 and reschedules another alarm +5ms later.
    struct AlarmCascade {
        alarms: AlarmQueue<bool>,
        value: i32,
    }

    impl MutableNode for AlarmCascade {
        fn cycle(&mut self, state: &mut GraphState) -> bool {
            let due = self.alarms.due(state);
            if due.is_empty() {
                return false;
            }
            for _ in due {
                self.value = 0;
                self.alarms.schedule(state, NanoTime::from(Duration::from_millis(5)), true);
            }
            true
        }
        fn start(&mut self, state: &mut GraphState) {
            self.alarms.schedule(state, NanoTime::from(Duration::from_millis(5)), true);
        }
    }

    impl StreamPeekRef<i32> for AlarmCascade {
        fn peek_ref(&self) -> &i32 {
            &self.value
        }
    }

    #[test]
    fn cascade_fires_at_5_and_10_but_not_12() {
        let node: std::rc::Rc<dyn Stream<i32>> = AlarmCascade {
            alarms: AlarmQueue::new(),
            value: -1,
        }
        .into_stream();
        let captured = node.collect();

        Graph::new(
            vec![captured.clone().as_node()],
            RunMode::HistoricalFrom(NanoTime::ZERO),
            RunFor::Duration(Duration::from_millis(12)),
        )
        .unwrap()
        .run()
        .unwrap();

        let ticks = captured.peek_value();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].time, NanoTime::from(Duration::from_millis(5)));
        assert_eq!(ticks[1].time, NanoTime::from(Duration::from_millis(10)));
    }

    #[test]
    fn cancel_prevents_delivery() {
        struct Dummy;
        impl MutableNode for Dummy {
            fn cycle(&mut self, _state: &mut GraphState) -> bool {
                false
            }
        }
        let mut q: AlarmQueue<&'static str> = AlarmQueue::new();
        assert!(q.is_empty());
        // Exercised indirectly through schedule/cancel below; a bare
        // AlarmQueue has no GraphState to drive `due` against outside a
        // running graph, so this only checks the pending-list mutation.
        let _ = Dummy; // keep Dummy referenced for clarity in this unit test
        q.pending.push((NanoTime::new(5), 0, "x"));
        q.cancel(AlarmHandle(0));
        assert!(q.is_empty());
    }
}
