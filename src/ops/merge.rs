use std::rc::Rc;

use crate::types::*;

struct MergeStream<T: Element> {
    sources: Vec<Rc<dyn Stream<T>>>,
    value: T,
}

impl<T: Element> MutableNode for MergeStream<T> {
    fn cycle(&mut self, state: &mut GraphState) -> bool {
        let mut fired = false;
        for source in &self.sources {
            if state.ticked(source.clone().as_node()) {
                self.value = source.peek_value();
                fired = true;
            }
        }
        fired
    }
    fn upstreams(&self) -> UpStreams {
        UpStreams::new(self.sources.iter().map(|s| s.clone().as_node()).collect(), vec![])
    }
}

impl<T: Element> StreamPeekRef<T> for MergeStream<T> {
    fn peek_ref(&self) -> &T {
        &self.value
    }
}

/// Merges several streams of the same type into one, passing through
/// whichever ticked. If more than one ticks at the same engine time, the
/// last in `sources` wins (a deterministic, input-order tie-break).
pub fn merge<T: Element>(sources: Vec<Rc<dyn Stream<T>>>) -> Rc<dyn Stream<T>> {
    MergeStream {
        sources,
        value: T::default(),
    }
    .into_stream()
}
