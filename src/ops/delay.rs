use std::hash::Hash;
use std::rc::Rc;

use crate::queue::TimeQueue;
use crate::types::*;

/// Delays every tick of `source` by a fixed duration, replaying it
/// untouched once that much time has passed. Uses a private
/// [`TimeQueue`] to hold values whose release time hasn't arrived yet
/// (distinct from the graph's own scheduler — this queue only ever
/// holds this one node's pending replays). `T` must be `Hash + Eq`,
/// same as the graph's own scheduling queues require.
struct DelayStream<T: Element + Hash + Eq> {
    source: Rc<dyn Stream<T>>,
    delay: NanoTime,
    pending: TimeQueue<T>,
    value: T,
}

impl<T: Element + Hash + Eq> MutableNode for DelayStream<T> {
    fn cycle(&mut self, state: &mut GraphState) -> bool {
        if state.ticked(self.source.clone().as_node()) {
            let release_at = state.time() + self.delay;
            self.pending.push(self.source.peek_value(), release_at);
            state.add_callback(release_at);
        }
        if !self.pending.pending(state.time()) {
            return false;
        }
        // Drain everything due at this instant; if several releases
        // land on the same tick only the last is observable, same as
        // any other single-valued stream collapsing simultaneous writes.
        while self.pending.pending(state.time()) {
            self.value = self.pending.pop();
        }
        true
    }
    fn upstreams(&self) -> UpStreams {
        UpStreams::new(vec![self.source.clone().as_node()], vec![])
    }
}

impl<T: Element + Hash + Eq> StreamPeekRef<T> for DelayStream<T> {
    fn peek_ref(&self) -> &T {
        &self.value
    }
}

/// Replays `source`'s ticks `delay` later, preserving order. Multiple
/// values released at the same instant each produce their own cycle,
/// oldest first.
pub fn delay<T: Element + Hash + Eq>(source: &Rc<dyn Stream<T>>, delay: impl Into<NanoTime>) -> Rc<dyn Stream<T>> {
    DelayStream {
        source: source.clone(),
        delay: delay.into(),
        pending: TimeQueue::new(),
        value: T::default(),
    }
    .into_stream()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, RunFor, RunMode};
    use crate::ops::{CallBackStream, CollectExt};
    use crate::queue::ValueAt;
    use std::time::Duration;

    #[test]
    fn delayed_ticks_arrive_in_order_after_offset() {
        let s = std::cell::RefCell::new(CallBackStream::<i32>::new());
        s.borrow_mut().push(ValueAt::new(1, NanoTime::from(Duration::from_millis(1))));
        s.borrow_mut().push(ValueAt::new(2, NanoTime::from(Duration::from_millis(2))));
        let s = Rc::new(s).as_stream();

        let delayed = delay(&s, NanoTime::from(Duration::from_millis(5)));
        let captured = delayed.collect();

        Graph::new(
            vec![captured.clone().as_node()],
            RunMode::HistoricalFrom(NanoTime::ZERO),
            RunFor::Forever,
        )
        .unwrap()
        .run()
        .unwrap();

        let ticks = captured.peek_value();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].value, 1);
        assert_eq!(ticks[0].time, NanoTime::from(Duration::from_millis(6)));
        assert_eq!(ticks[1].value, 2);
        assert_eq!(ticks[1].time, NanoTime::from(Duration::from_millis(7)));
    }
}
