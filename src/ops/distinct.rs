use std::rc::Rc;

use crate::types::*;

struct DistinctStream<T: Element + PartialEq> {
    source: Rc<dyn Stream<T>>,
    value: T,
    has_value: bool,
}

impl<T: Element + PartialEq> MutableNode for DistinctStream<T> {
    fn cycle(&mut self, _state: &mut GraphState) -> bool {
        let new_value = self.source.peek_value();
        if self.has_value && new_value == self.value {
            return false;
        }
        self.value = new_value;
        self.has_value = true;
        true
    }
    fn upstreams(&self) -> UpStreams {
        UpStreams::new(vec![self.source.clone().as_node()], vec![])
    }
}

impl<T: Element + PartialEq> StreamPeekRef<T> for DistinctStream<T> {
    fn peek_ref(&self) -> &T {
        &self.value
    }
}

/// Passes through `source`'s ticks, suppressing any that repeat the
/// previous value.
pub fn distinct<T: Element + PartialEq>(source: &Rc<dyn Stream<T>>) -> Rc<dyn Stream<T>> {
    DistinctStream {
        source: source.clone(),
        value: T::default(),
        has_value: false,
    }
    .into_stream()
}

pub trait DistinctExt<T: Element + PartialEq> {
    fn distinct(&self) -> Rc<dyn Stream<T>>;
}

impl<T: Element + PartialEq> DistinctExt<T> for Rc<dyn Stream<T>> {
    fn distinct(&self) -> Rc<dyn Stream<T>> {
        distinct(self)
    }
}
