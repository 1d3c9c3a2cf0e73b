use std::rc::Rc;

use crate::types::*;

struct FinallyStream<T: Element, F: Fn(&T) + 'static> {
    source: Rc<dyn Stream<T>>,
    on_stop: Option<F>,
    value: T,
}

impl<T: Element, F: Fn(&T) + 'static> MutableNode for FinallyStream<T, F> {
    fn cycle(&mut self, _state: &mut GraphState) -> bool {
        self.value = self.source.peek_value();
        true
    }
    fn upstreams(&self) -> UpStreams {
        UpStreams::new(vec![self.source.clone().as_node()], vec![])
    }
    fn stop(&mut self, _state: &mut GraphState) {
        if let Some(f) = self.on_stop.take() {
            f(&self.value);
        }
    }
}

impl<T: Element, F: Fn(&T) + 'static> StreamPeekRef<T> for FinallyStream<T, F> {
    fn peek_ref(&self) -> &T {
        &self.value
    }
}

/// Passes `source` through unchanged, invoking `on_stop` once with the
/// last observed value when the graph stops (reverse rank order, after
/// everything downstream has already stopped).
pub fn finally<T, F>(source: &Rc<dyn Stream<T>>, on_stop: F) -> Rc<dyn Stream<T>>
where
    T: Element,
    F: Fn(&T) + 'static,
{
    FinallyStream {
        source: source.clone(),
        on_stop: Some(on_stop),
        value: T::default(),
    }
    .into_stream()
}
