use std::cell::RefCell;
use std::rc::Rc;

use crate::types::*;

/// A value-holder a consuming node reads its own previous output from.
/// It never participates in the build-time upstream walk (`upstreams()`
/// is empty, so `initialise_node` never visits it and it is never marked
/// dirty by the graph), so wiring one in never triggers
/// [`crate::error::BuildError::CycleDetected`]: the value is pushed
/// directly by the node that reads it, not propagated along a graph
/// edge.
struct FeedbackStream<T: Element> {
    value: T,
}

impl<T: Element> FeedbackStream<T> {
    fn push(&mut self, v: T) {
        self.value = v;
    }
}

impl<T: Element> MutableNode for FeedbackStream<T> {
    fn cycle(&mut self, _state: &mut GraphState) -> bool {
        false
    }
}

impl<T: Element> StreamPeekRef<T> for FeedbackStream<T> {
    fn peek_ref(&self) -> &T {
        &self.value
    }
}

struct FeedbackCombineStream<T: Element, F: Fn(&T, &T) -> T + 'static> {
    source: Rc<dyn Stream<T>>,
    feedback: Rc<RefCell<FeedbackStream<T>>>,
    f: F,
    value: T,
}

impl<T: Element, F: Fn(&T, &T) -> T + 'static> MutableNode for FeedbackCombineStream<T, F> {
    fn cycle(&mut self, _state: &mut GraphState) -> bool {
        let prev = self.feedback.borrow().value.clone();
        let new_value = (self.f)(&prev, &self.source.peek_value());
        self.feedback.borrow_mut().push(new_value.clone());
        self.value = new_value;
        true
    }
    fn upstreams(&self) -> UpStreams {
        UpStreams::new(vec![self.source.clone().as_node()], vec![])
    }
}

impl<T: Element, F: Fn(&T, &T) -> T + 'static> StreamPeekRef<T> for FeedbackCombineStream<T, F> {
    fn peek_ref(&self) -> &T {
        &self.value
    }
}

/// Fires on every tick of `source`, combining it with this stream's own
/// previous value via `f(previous_self, source_value)`. `previous_self`
/// is read before this cycle's write, so it always reflects the value
/// produced one cycle behind (the "Feedback" scenario: a running total
/// read one tick behind its own write).
pub fn feedback_combine<T, F>(source: &Rc<dyn Stream<T>>, f: F) -> Rc<dyn Stream<T>>
where
    T: Element,
    F: Fn(&T, &T) -> T + 'static,
{
    let feedback = Rc::new(RefCell::new(FeedbackStream { value: T::default() }));
    FeedbackCombineStream {
        source: source.clone(),
        feedback,
        f,
        value: T::default(),
    }
    .into_stream()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, RunFor, RunMode};
    use crate::ops::CallBackStream;
    use crate::queue::ValueAt;
    use std::time::Duration;

    #[test]
    fn running_total_reads_previous_self() {
        let s = Rc::new(RefCell::new(CallBackStream::<i32>::new()));
        for i in 1..=3 {
            s.borrow_mut()
                .push(ValueAt::new(1, NanoTime::from(Duration::from_secs(i))));
        }
        let total = feedback_combine(&s.clone().as_stream(), |prev, cur| prev + cur);
        let captured = crate::ops::collect(&total);

        Graph::new(
            vec![captured.clone().as_node()],
            RunMode::HistoricalFrom(NanoTime::ZERO),
            RunFor::Forever,
        )
        .unwrap()
        .run()
        .unwrap();

        let ticks = captured.peek_value();
        assert_eq!(ticks.len(), 3);
        assert_eq!(ticks[0].value, 1);
        assert_eq!(ticks[1].value, 2);
        assert_eq!(ticks[2].value, 3);
    }
}
