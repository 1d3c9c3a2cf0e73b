use std::rc::Rc;

use crate::queue::ValueAt;
use crate::types::*;

struct CollectStream<T: Element> {
    source: Rc<dyn Stream<T>>,
    values: Vec<ValueAt<T>>,
}

impl<T: Element> MutableNode for CollectStream<T> {
    fn cycle(&mut self, state: &mut GraphState) -> bool {
        self.values.push(ValueAt::new(self.source.peek_value(), state.time()));
        true
    }
    fn upstreams(&self) -> UpStreams {
        UpStreams::new(vec![self.source.clone().as_node()], vec![])
    }
}

impl<T: Element> StreamPeekRef<Vec<ValueAt<T>>> for CollectStream<T> {
    fn peek_ref(&self) -> &Vec<ValueAt<T>> {
        &self.values
    }
}

/// Records every tick of `source` as a timestamped value, for assertions
/// in tests once a run has finished.
pub fn collect<T: Element>(source: &Rc<dyn Stream<T>>) -> Rc<dyn Stream<Vec<ValueAt<T>>>> {
    CollectStream {
        source: source.clone(),
        values: vec![],
    }
    .into_stream()
}

pub trait CollectExt<T: Element> {
    fn collect(&self) -> Rc<dyn Stream<Vec<ValueAt<T>>>>;
}

impl<T: Element> CollectExt<T> for Rc<dyn Stream<T>> {
    fn collect(&self) -> Rc<dyn Stream<Vec<ValueAt<T>>>> {
        collect(self)
    }
}
