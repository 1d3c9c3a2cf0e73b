//! Runtime sub-graph instantiation keyed by a discriminator (C8).
//!
//! A [`Basket`] watches a keyed control stream (its "key edge"): each new
//! key constructs a configured sub-graph via a user-supplied factory,
//! wires it in at a layer strictly above the basket's own, and calls its
//! nodes' `setup`/`start` hooks before the cycle loop continues. Removing
//! a key tears the sub-graph down — `stop`, then `teardown` — deferred to
//! the end of the current cycle so a key-removal observed mid-cycle never
//! invalidates a node another layer is about to read from in the same
//! pass.
//!
//! Because `Graph::initialise` only ever runs once, a basket's sub-graphs
//! are **not** wired in during the static rank-assignment walk. Instead a
//! basket registers each root a factory returns with
//! [`GraphState::register_dynamic_node`], which grows the graph's node
//! table at runtime and gives it a stable index the cycle loop's
//! dirty-tracking can reference like any other node. Edges *within* one
//! factory call's returned roots (a "tap" node depending on the root it
//! taps, say) are wired with [`GraphState::wire_downstream`] after
//! computing each root's layer from its internal upstreams. Edges from a
//! pre-existing static node *into* a freshly spawned sub-graph are not
//! auto-wired — the static walk never sees the new nodes to link them
//! from the other direction, so a factory that needs one must tick its
//! sub-graph through [`crate::ops::map`]-style adaptation of a value it
//! captures directly rather than through `upstreams()`. Every hook a
//! basket drives on a child runs via [`GraphState::invoke_as`] so that
//! any `add_callback`/`ready_notifier` call the child makes attributes to
//! the child's own index, not the basket's.

use std::collections::HashMap;
use std::rc::Rc;

use crate::queue::HashByRef;
use crate::types::*;

/// What a basket hands its factory: the rank a newly keyed sub-graph's
/// root nodes must be built at or above.
pub struct BasketSlot {
    pub rank_floor: usize,
}

/// One live sub-graph instance, tracked by the basket that owns it.
struct Instance<K> {
    key: K,
    roots: Vec<Rc<dyn Node>>,
    indices: Vec<usize>,
    pending_teardown: bool,
}

/// Watches `keys` (an active upstream whose peeked value is the set of
/// currently-live keys) and instantiates/tears down a sub-graph per key
/// via `factory`. `factory(key, slot) -> Vec<Rc<dyn Node>>` builds and
/// wires a fresh sub-graph's root nodes for `key`; the basket calls
/// `start` on them immediately and `stop`/`teardown` when the key is
/// removed.
pub struct Basket<K, F>
where
    K: Element + std::hash::Hash + Eq,
    F: FnMut(&K, &BasketSlot) -> Vec<Rc<dyn Node>> + 'static,
{
    keys: Rc<dyn Stream<Vec<K>>>,
    factory: F,
    instances: HashMap<K, Instance<K>>,
    rank_floor: usize,
    live: Vec<K>,
}

impl<K, F> Basket<K, F>
where
    K: Element + std::hash::Hash + Eq,
    F: FnMut(&K, &BasketSlot) -> Vec<Rc<dyn Node>> + 'static,
{
    pub fn new(keys: Rc<dyn Stream<Vec<K>>>, instantiator_rank: usize, factory: F) -> Self {
        Self {
            keys,
            factory,
            instances: HashMap::new(),
            rank_floor: instantiator_rank + 1,
            live: Vec::new(),
        }
    }

    /// The layer a root in this factory call's result set should run at:
    /// one past the deepest internal upstream also returned by this same
    /// call, or `self.rank_floor` if it has none. An upstream outside
    /// this call's result set is assumed already resolved at or below
    /// `self.rank_floor` and doesn't push the layer any higher — wiring
    /// that edge is out of scope here (see the module docs).
    fn layer_for(
        &self,
        node: &Rc<dyn Node>,
        by_ptr: &HashMap<HashByRef<dyn Node>, usize>,
        roots: &[Rc<dyn Node>],
        memo: &mut HashMap<usize, usize>,
    ) -> usize {
        let Some(&local) = by_ptr.get(&HashByRef::new(node.clone())) else {
            return self.rank_floor;
        };
        if let Some(&layer) = memo.get(&local) {
            return layer;
        }
        let upstreams = roots[local].upstreams();
        let mut layer = self.rank_floor;
        for up in upstreams.active.iter().chain(upstreams.passive.iter()) {
            layer = layer.max(self.layer_for(up, by_ptr, roots, memo) + 1);
        }
        memo.insert(local, layer);
        layer
    }

    fn instantiate(&mut self, key: K, state: &mut GraphState) {
        let slot = BasketSlot {
            rank_floor: self.rank_floor,
        };
        let roots = (self.factory)(&key, &slot);

        let by_ptr: HashMap<HashByRef<dyn Node>, usize> = roots
            .iter()
            .enumerate()
            .map(|(i, root)| (HashByRef::new(root.clone()), i))
            .collect();
        let mut memo: HashMap<usize, usize> = HashMap::new();
        let indices: Vec<usize> = roots
            .iter()
            .map(|root| {
                let layer = self.layer_for(root, &by_ptr, &roots, &mut memo);
                state.register_dynamic_node(root.clone(), layer)
            })
            .collect();

        for (i, root) in roots.iter().enumerate() {
            let upstreams = root.upstreams();
            for up in &upstreams.active {
                if let Some(&up_local) = by_ptr.get(&HashByRef::new(up.clone())) {
                    state.wire_downstream(indices[up_local], indices[i], true);
                }
            }
            for up in &upstreams.passive {
                if let Some(&up_local) = by_ptr.get(&HashByRef::new(up.clone())) {
                    state.wire_downstream(indices[up_local], indices[i], false);
                }
            }
        }

        for (root, &index) in roots.iter().zip(indices.iter()) {
            let root = root.clone();
            state.invoke_as(index, |state| {
                root.setup(state);
                root.start(state);
            });
        }

        self.instances.insert(
            key.clone(),
            Instance {
                key,
                roots,
                indices,
                pending_teardown: false,
            },
        );
    }

    /// Marks every instance whose key is no longer live for teardown at
    /// the end of this cycle; actually tearing down immediately would
    /// risk a downstream rank in the same cycle reading from a node
    /// that's already gone.
    fn mark_removed(&mut self, still_live: &[K]) {
        for instance in self.instances.values_mut() {
            if !still_live.contains(&instance.key) {
                instance.pending_teardown = true;
            }
        }
    }

    /// Call once, after the cycle that observed removed keys, to finish
    /// tearing down anything marked in [`Basket::mark_removed`].
    pub fn drain_pending_teardowns(&mut self, state: &mut GraphState) {
        let to_remove: Vec<K> = self
            .instances
            .iter()
            .filter(|(_, inst)| inst.pending_teardown)
            .map(|(k, _)| k.clone())
            .collect();
        for key in to_remove {
            if let Some(instance) = self.instances.remove(&key) {
                for (root, &index) in instance.roots.iter().zip(instance.indices.iter()).rev() {
                    let root = root.clone();
                    state.invoke_as(index, |state| root.stop(state));
                }
                for (root, &index) in instance.roots.iter().zip(instance.indices.iter()).rev() {
                    let root = root.clone();
                    state.invoke_as(index, |state| root.teardown(state));
                }
            }
        }
    }
}

impl<K, F> MutableNode for Basket<K, F>
where
    K: Element + std::hash::Hash + Eq,
    F: FnMut(&K, &BasketSlot) -> Vec<Rc<dyn Node>> + 'static,
{
    fn cycle(&mut self, state: &mut GraphState) -> bool {
        self.drain_pending_teardowns(state);
        let keys = self.keys.peek_value();
        let new_keys: Vec<K> = keys
            .iter()
            .filter(|k| !self.instances.contains_key(k))
            .cloned()
            .collect();
        for key in new_keys {
            self.instantiate(key, state);
        }
        self.mark_removed(&keys);
        self.live = keys;
        true
    }

    fn upstreams(&self) -> UpStreams {
        UpStreams::new(vec![self.keys.clone().as_node()], vec![])
    }

    /// `Graph::stop_nodes` runs this over every static node in one
    /// reverse-rank pass before `teardown_nodes` runs in a second. A
    /// basket mirrors that for its live instances rather than collapsing
    /// stop+teardown together: `instances` stays populated for the
    /// matching `teardown` pass below.
    fn stop(&mut self, state: &mut GraphState) {
        for instance in self.instances.values() {
            for (root, &index) in instance.roots.iter().zip(instance.indices.iter()).rev() {
                let root = root.clone();
                state.invoke_as(index, |state| root.stop(state));
            }
        }
    }

    fn teardown(&mut self, state: &mut GraphState) {
        for instance in self.instances.values() {
            for (root, &index) in instance.roots.iter().zip(instance.indices.iter()).rev() {
                let root = root.clone();
                state.invoke_as(index, |state| root.teardown(state));
            }
        }
        self.instances.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, RunFor, RunMode};
    use crate::ops::{CallBackStream, CollectExt};
    use crate::queue::ValueAt;
    use std::cell::RefCell;
    use std::time::Duration;

    /// Echoes a single tick 100ms after being instantiated, carrying its
    /// key. Grounds the "dynamic sub-graph" scenario: a symbol arrives,
    /// a sub-graph is built for it, and it emits one delayed tick.
    struct Echo {
        key: String,
        value: Option<(String, NanoTime)>,
    }

    impl MutableNode for Echo {
        fn cycle(&mut self, state: &mut GraphState) -> bool {
            self.value = Some((self.key.clone(), state.time()));
            true
        }
        fn start(&mut self, state: &mut GraphState) {
            state.add_callback(state.time() + NanoTime::from(Duration::from_millis(100)));
        }
    }

    impl StreamPeekRef<Option<(String, NanoTime)>> for Echo {
        fn peek_ref(&self) -> &Option<(String, NanoTime)> {
            &self.value
        }
    }

    #[test]
    fn symbols_instantiate_and_tear_down_sub_graphs() {
        let keys_source = RefCell::new(CallBackStream::<Vec<String>>::new());
        keys_source
            .borrow_mut()
            .push(ValueAt::new(vec!["X".to_string()], NanoTime::from(Duration::from_secs(1))));
        keys_source.borrow_mut().push(ValueAt::new(
            vec!["X".to_string(), "Y".to_string()],
            NanoTime::from(Duration::from_secs(2)),
        ));
        keys_source
            .borrow_mut()
            .push(ValueAt::new(vec!["Y".to_string()], NanoTime::from(Duration::from_secs(3))));
        let keys: Rc<dyn Stream<Vec<String>>> = Rc::new(keys_source).as_stream();

        let collected: Rc<RefCell<Vec<(String, NanoTime)>>> = Rc::new(RefCell::new(Vec::new()));
        let collected_for_factory = collected.clone();

        let basket = Basket::new(keys.clone(), 0, move |key: &String, _slot: &BasketSlot| {
            let node: Rc<dyn Stream<Option<(String, NanoTime)>>> = Echo {
                key: key.clone(),
                value: None,
            }
            .into_stream();
            let sink = collected_for_factory.clone();
            let tap = crate::ops::map(&node, move |v: &Option<(String, NanoTime)>| {
                if let Some(tick) = v {
                    sink.borrow_mut().push(tick.clone());
                }
                ()
            });
            vec![tap.as_node(), node.as_node()]
        });

        Graph::new(
            vec![basket.into_node()],
            RunMode::HistoricalFrom(NanoTime::ZERO),
            RunFor::Duration(Duration::from_millis(3500)),
        )
        .unwrap()
        .run()
        .unwrap();

        let ticks = collected.borrow();
        assert!(ticks.iter().any(|(k, t)| k == "X" && *t == NanoTime::from(Duration::from_millis(1100))));
        assert!(ticks.iter().any(|(k, t)| k == "Y" && *t == NanoTime::from(Duration::from_millis(2100))));
    }
}
