//! Per-subscriber tick history (C1, spec §4.1): most streams in this crate
//! only ever expose their latest value (`StreamPeekRef`/`peek_value`); a
//! consumer that needs to read further back subscribes through
//! [`history`] instead of the raw source, declaring a depth at build time
//! the way spec §3's "history depth" subscription attribute describes.

use std::cell::RefCell;
use std::rc::Rc;

use crate::edge::EdgeBuffer;
use crate::error::RuntimeRecoverable;
use crate::types::*;

/// Wraps `source`, retaining its last `depth + 1` ticks in an
/// [`EdgeBuffer`]. Ticks like any other stream (so it composes normally
/// with `map`/`bimap`/etc via [`AsStream`]) and additionally answers
/// [`HistoryStream::at`] for `0 <= k <= depth`.
pub struct HistoryStream<T: Element> {
    source: Rc<dyn Stream<T>>,
    buffer: EdgeBuffer<T>,
    value: T,
}

impl<T: Element> HistoryStream<T> {
    /// Sample `k` ticks ago; `k = 0` is the latest tick. Fails with
    /// `HistoryUnderflow` if fewer than `k + 1` ticks have arrived yet.
    pub fn at(&self, k: usize) -> Result<(NanoTime, T), RuntimeRecoverable> {
        self.buffer.at(k).map(|(t, v)| (t, v.clone()))
    }

    /// The deepest `k` this handle was built to serve.
    pub fn depth(&self) -> usize {
        self.buffer.capacity() - 1
    }
}

impl<T: Element> MutableNode for HistoryStream<T> {
    fn cycle(&mut self, state: &mut GraphState) -> bool {
        let v = self.source.peek_value();
        // The graph never cycles a node out of time order, so a write
        // here can never be a regression against the buffer's own clock.
        self.buffer
            .write(state.time(), v.clone())
            .expect("engine time is monotonic");
        self.value = v;
        true
    }
    fn upstreams(&self) -> UpStreams {
        UpStreams::new(vec![self.source.clone().as_node()], vec![])
    }
}

impl<T: Element> StreamPeekRef<T> for HistoryStream<T> {
    fn peek_ref(&self) -> &T {
        &self.value
    }
}

/// Subscribes to `source` with history depth `depth`: the returned handle
/// retains the last `depth + 1` ticks, readable through
/// [`HistoryStream::at`]. Returned as a concrete `Rc<RefCell<_>>` (rather
/// than `Rc<dyn Stream<T>>`) so callers can reach `at`/`depth` directly;
/// pass `.as_stream()` to wire it into combinators that expect a stream.
pub fn history<T: Element>(source: &Rc<dyn Stream<T>>, depth: usize) -> Rc<RefCell<HistoryStream<T>>> {
    Rc::new(RefCell::new(HistoryStream {
        source: source.clone(),
        buffer: EdgeBuffer::new("history", depth),
        value: T::default(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, RunFor, RunMode};
    use crate::ops::CallBackStream;
    use crate::queue::ValueAt;
    use std::time::Duration;

    #[test]
    fn at_reads_back_past_ticks_after_the_latest() {
        let s = RefCell::new(CallBackStream::<i32>::new());
        s.borrow_mut().push(ValueAt::new(1, NanoTime::from(Duration::from_millis(1))));
        s.borrow_mut().push(ValueAt::new(2, NanoTime::from(Duration::from_millis(2))));
        s.borrow_mut().push(ValueAt::new(3, NanoTime::from(Duration::from_millis(3))));
        let s: Rc<dyn Stream<i32>> = Rc::new(s).as_stream();

        let h = history(&s, 2);
        let h_stream = h.clone().as_stream();

        Graph::new(
            vec![h_stream.as_node()],
            RunMode::HistoricalFrom(NanoTime::ZERO),
            RunFor::Forever,
        )
        .unwrap()
        .run()
        .unwrap();

        let h = h.borrow();
        assert_eq!(h.at(0).unwrap(), (NanoTime::from(Duration::from_millis(3)), 3));
        assert_eq!(h.at(1).unwrap(), (NanoTime::from(Duration::from_millis(2)), 2));
        assert_eq!(h.at(2).unwrap(), (NanoTime::from(Duration::from_millis(1)), 1));
    }

    #[test]
    fn at_past_declared_depth_is_history_underflow() {
        let s = RefCell::new(CallBackStream::<i32>::new());
        s.borrow_mut().push(ValueAt::new(1, NanoTime::from(Duration::from_millis(1))));
        let s: Rc<dyn Stream<i32>> = Rc::new(s).as_stream();

        let h = history(&s, 1);
        let h_stream = h.clone().as_stream();

        Graph::new(
            vec![h_stream.as_node()],
            RunMode::HistoricalFrom(NanoTime::ZERO),
            RunFor::Forever,
        )
        .unwrap()
        .run()
        .unwrap();

        assert!(matches!(
            h.borrow().at(1),
            Err(RuntimeRecoverable::HistoryUnderflow { .. })
        ));
    }
}
