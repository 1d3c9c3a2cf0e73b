use std::rc::Rc;

use crate::types::*;

struct BimapStream<A: Element, B: Element, OUT: Element, F: Fn(&A, &B) -> OUT + 'static> {
    a: Rc<dyn Stream<A>>,
    b: Rc<dyn Stream<B>>,
    upstreams: UpStreams,
    f: F,
    value: OUT,
}

impl<A: Element, B: Element, OUT: Element, F: Fn(&A, &B) -> OUT + 'static> MutableNode for BimapStream<A, B, OUT, F> {
    fn cycle(&mut self, _state: &mut GraphState) -> bool {
        self.value = (self.f)(&self.a.peek_value(), &self.b.peek_value());
        true
    }
    fn upstreams(&self) -> UpStreams {
        UpStreams::new(self.upstreams.active.clone(), self.upstreams.passive.clone())
    }
}

impl<A: Element, B: Element, OUT: Element, F: Fn(&A, &B) -> OUT + 'static> StreamPeekRef<OUT>
    for BimapStream<A, B, OUT, F>
{
    fn peek_ref(&self) -> &OUT {
        &self.value
    }
}

fn dep_as_node<T>(d: &Dep<Rc<dyn Stream<T>>>) -> Dep<Rc<dyn Node>> {
    match d {
        Dep::Active(s) => Dep::Active(s.clone().as_node()),
        Dep::Passive(s) => Dep::Passive(s.clone().as_node()),
    }
}

fn dep_stream<T>(d: &Dep<Rc<dyn Stream<T>>>) -> Rc<dyn Stream<T>> {
    match d {
        Dep::Active(s) => s.clone(),
        Dep::Passive(s) => s.clone(),
    }
}

/// Combines two streams with `f`, firing whenever a [Dep::Active] input
/// ticks; a [Dep::Passive] input only contributes its latest value on the
/// next active tick. Use this directly for two independently-ticking
/// sources that should both gate the fire (wrap both `Active`), or just
/// one (wrap the other `Passive`).
pub fn bimap<A, B, OUT, F>(a: Dep<Rc<dyn Stream<A>>>, b: Dep<Rc<dyn Stream<B>>>, f: F) -> Rc<dyn Stream<OUT>>
where
    A: Element,
    B: Element,
    OUT: Element,
    F: Fn(&A, &B) -> OUT + 'static,
{
    let a_node = dep_as_node(&a);
    let b_node = dep_as_node(&b);
    let upstreams = deps_to_upstreams(vec![a_node, b_node], |n| n.clone());
    BimapStream {
        a: dep_stream(&a),
        b: dep_stream(&b),
        upstreams,
        f,
        value: OUT::default(),
    }
    .into_stream()
}

/// Adds the latest values of two streams together whenever either ticks
/// (the "Adder" wiring: `N` fires on any tick of either source).
pub fn add<T>(a: &Rc<dyn Stream<T>>, b: &Rc<dyn Stream<T>>) -> Rc<dyn Stream<T>>
where
    T: Element + std::ops::Add<Output = T>,
{
    bimap(Dep::Active(a.clone()), Dep::Active(b.clone()), |x, y| x.clone() + y.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, RunFor, RunMode};
    use crate::ops::CallBackStream;
    use crate::queue::ValueAt;
    use std::cell::RefCell;

    #[test]
    fn adder_fires_on_either_input() {
        let a = Rc::new(RefCell::new(CallBackStream::<i32>::new()));
        let b = Rc::new(RefCell::new(CallBackStream::<i32>::new()));
        a.borrow_mut().push(ValueAt::new(1, NanoTime::new(10)));
        a.borrow_mut().push(ValueAt::new(3, NanoTime::new(30)));
        b.borrow_mut().push(ValueAt::new(10, NanoTime::new(20)));
        b.borrow_mut().push(ValueAt::new(20, NanoTime::new(30)));

        let sum = add(&a.clone().as_stream(), &b.clone().as_stream());
        let captured = crate::ops::collect(&sum);

        Graph::new(
            vec![captured.clone().as_node()],
            RunMode::HistoricalFrom(NanoTime::ZERO),
            RunFor::Forever,
        )
        .unwrap()
        .run()
        .unwrap();

        let ticks = captured.peek_value();
        assert_eq!(ticks.len(), 3);
        assert_eq!(ticks[0], ValueAt::new(1, NanoTime::new(10)));
        assert_eq!(ticks[1], ValueAt::new(11, NanoTime::new(20)));
        assert_eq!(ticks[2], ValueAt::new(23, NanoTime::new(30)));
    }
}
