use crate::types::*;

struct TickStream {
    period: NanoTime,
    count: u64,
}

impl MutableNode for TickStream {
    fn cycle(&mut self, state: &mut GraphState) -> bool {
        self.count += 1;
        state.add_callback(state.time() + self.period);
        true
    }
    fn start(&mut self, state: &mut GraphState) {
        state.add_callback(state.time() + self.period);
    }
}

impl StreamPeekRef<u64> for TickStream {
    fn peek_ref(&self) -> &u64 {
        &self.count
    }
}

/// A stream that ticks every `period`, starting one period after the
/// engine's start time, carrying a monotonically increasing count.
pub fn ticker(period: impl Into<NanoTime>) -> std::rc::Rc<dyn Stream<u64>> {
    TickStream {
        period: period.into(),
        count: 0,
    }
    .into_stream()
}
