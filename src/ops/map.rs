use std::rc::Rc;

use crate::types::*;

struct MapStream<IN: Element, OUT: Element, F: Fn(&IN) -> OUT + 'static> {
    source: Rc<dyn Stream<IN>>,
    f: F,
    value: OUT,
}

impl<IN: Element, OUT: Element, F: Fn(&IN) -> OUT + 'static> MutableNode for MapStream<IN, OUT, F> {
    fn cycle(&mut self, _state: &mut GraphState) -> bool {
        self.value = (self.f)(&self.source.peek_value());
        true
    }
    fn upstreams(&self) -> UpStreams {
        UpStreams::new(vec![self.source.clone().as_node()], vec![])
    }
}

impl<IN: Element, OUT: Element, F: Fn(&IN) -> OUT + 'static> StreamPeekRef<OUT> for MapStream<IN, OUT, F> {
    fn peek_ref(&self) -> &OUT {
        &self.value
    }
}

/// Applies `f` to every tick of `source`.
pub fn map<IN, OUT, F>(source: &Rc<dyn Stream<IN>>, f: F) -> Rc<dyn Stream<OUT>>
where
    IN: Element,
    OUT: Element,
    F: Fn(&IN) -> OUT + 'static,
{
    MapStream {
        source: source.clone(),
        f,
        value: OUT::default(),
    }
    .into_stream()
}

pub trait MapExt<T: Element> {
    fn map<OUT: Element>(&self, f: impl Fn(&T) -> OUT + 'static) -> Rc<dyn Stream<OUT>>;
}

impl<T: Element> MapExt<T> for Rc<dyn Stream<T>> {
    fn map<OUT: Element>(&self, f: impl Fn(&T) -> OUT + 'static) -> Rc<dyn Stream<OUT>> {
        map(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::constant;

    #[test]
    fn starts_at_default_until_first_cycle() {
        let c = constant(4);
        let doubled = map(&c, |v| v * 2);
        assert_eq!(*doubled.peek_ref_cell(), 0);
    }
}
