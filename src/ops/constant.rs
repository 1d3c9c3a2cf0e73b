use crate::types::*;

struct ConstantStream<T: Element> {
    value: T,
}

impl<T: Element> MutableNode for ConstantStream<T> {
    fn cycle(&mut self, _state: &mut GraphState) -> bool {
        true
    }
    fn start(&mut self, state: &mut GraphState) {
        state.add_callback(state.time());
    }
}

impl<T: Element> StreamPeekRef<T> for ConstantStream<T> {
    fn peek_ref(&self) -> &T {
        &self.value
    }
}

/// A stream that ticks exactly once, at the engine's start time, carrying
/// `value`, and never again.
pub fn constant<T: Element>(value: T) -> std::rc::Rc<dyn Stream<T>> {
    ConstantStream { value }.into_stream()
}
