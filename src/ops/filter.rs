use std::rc::Rc;

use crate::types::*;

struct FilterStream<T: Element, F: Fn(&T) -> bool + 'static> {
    source: Rc<dyn Stream<T>>,
    predicate: F,
    value: T,
}

impl<T: Element, F: Fn(&T) -> bool + 'static> MutableNode for FilterStream<T, F> {
    fn cycle(&mut self, _state: &mut GraphState) -> bool {
        let v = self.source.peek_value();
        if !(self.predicate)(&v) {
            return false;
        }
        self.value = v;
        true
    }
    fn upstreams(&self) -> UpStreams {
        UpStreams::new(vec![self.source.clone().as_node()], vec![])
    }
}

impl<T: Element, F: Fn(&T) -> bool + 'static> StreamPeekRef<T> for FilterStream<T, F> {
    fn peek_ref(&self) -> &T {
        &self.value
    }
}

/// Passes through only the ticks of `source` for which `predicate` holds.
pub fn filter<T, F>(source: &Rc<dyn Stream<T>>, predicate: F) -> Rc<dyn Stream<T>>
where
    T: Element,
    F: Fn(&T) -> bool + 'static,
{
    FilterStream {
        source: source.clone(),
        predicate,
        value: T::default(),
    }
    .into_stream()
}
