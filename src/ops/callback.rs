use crate::queue::ValueAt;
use crate::types::*;

/// Test-input helper: a source pre-loaded with a fixed, time-ordered
/// sequence of values. Schedules itself via `add_callback` at each
/// pending value's time, one at a time, so it behaves like a pull
/// adapter whose entire feed is known up front.
pub struct CallBackStream<T: Element> {
    pending: Vec<ValueAt<T>>,
    cursor: usize,
    value: T,
}

impl<T: Element> CallBackStream<T> {
    pub fn new() -> Self {
        Self {
            pending: vec![],
            cursor: 0,
            value: T::default(),
        }
    }

    /// Queue `value_at` for delivery. Must be pushed in non-decreasing
    /// time order per stream, before the graph is built.
    pub fn push(&mut self, value_at: ValueAt<T>) {
        self.pending.push(value_at);
    }
}

impl<T: Element> Default for CallBackStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> MutableNode for CallBackStream<T> {
    fn cycle(&mut self, state: &mut GraphState) -> bool {
        if self.cursor >= self.pending.len() {
            return false;
        }
        self.value = self.pending[self.cursor].value.clone();
        self.cursor += 1;
        if self.cursor < self.pending.len() {
            state.add_callback(self.pending[self.cursor].time);
        }
        true
    }

    fn start(&mut self, state: &mut GraphState) {
        if !self.pending.is_empty() {
            state.add_callback(self.pending[0].time);
        }
    }
}

impl<T: Element> StreamPeekRef<T> for CallBackStream<T> {
    fn peek_ref(&self) -> &T {
        &self.value
    }
}
