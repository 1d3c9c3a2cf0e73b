use std::rc::Rc;

use crate::types::*;

struct FoldStream<T: Element, ACC: Element, F: Fn(&ACC, &T) -> ACC + 'static> {
    source: Rc<dyn Stream<T>>,
    f: F,
    acc: ACC,
}

impl<T: Element, ACC: Element, F: Fn(&ACC, &T) -> ACC + 'static> MutableNode for FoldStream<T, ACC, F> {
    fn cycle(&mut self, _state: &mut GraphState) -> bool {
        self.acc = (self.f)(&self.acc, &self.source.peek_value());
        true
    }
    fn upstreams(&self) -> UpStreams {
        UpStreams::new(vec![self.source.clone().as_node()], vec![])
    }
}

impl<T: Element, ACC: Element, F: Fn(&ACC, &T) -> ACC + 'static> StreamPeekRef<ACC> for FoldStream<T, ACC, F> {
    fn peek_ref(&self) -> &ACC {
        &self.acc
    }
}

/// Accumulates `source`'s ticks into a running value, starting from
/// `init`.
pub fn fold<T, ACC, F>(source: &Rc<dyn Stream<T>>, init: ACC, f: F) -> Rc<dyn Stream<ACC>>
where
    T: Element,
    ACC: Element,
    F: Fn(&ACC, &T) -> ACC + 'static,
{
    FoldStream {
        source: source.clone(),
        f,
        acc: init,
    }
    .into_stream()
}
