//! Adapter for sources driven from outside the cycle loop — a socket, a
//! channel fed by another thread, a timer. The adapter thread pushes
//! values onto a queue and wakes the engine with a [`ReadyNotifier`];
//! the node itself only runs on the graph's own thread.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crossbeam::channel::TryRecvError;

use crate::error::{LateTickPolicy, RuntimeRecoverable};
use crate::graph::ReadyNotifier;
use crate::queue::ValueAt;
use crate::types::*;

/// The producing side of a [`PushStream`]. Cloneable and `Send`; hand
/// clones to worker threads. `push` never blocks the engine thread: it
/// only appends to a shared queue and fires the notifier (once the
/// owning node has started and a notifier exists — pushes before that
/// are queued and picked up on the node's first cycle regardless).
#[derive(Clone)]
pub struct PushSink<T: Element> {
    queue: Arc<Mutex<VecDeque<ValueAt<T>>>>,
    notifier: Arc<Mutex<Option<ReadyNotifier>>>,
}

impl<T: Element> PushSink<T> {
    /// Enqueues `value` timestamped `at` and wakes the cycle loop. The
    /// timestamp is taken at the moment the producer observed the
    /// event, not when the engine eventually drains the queue.
    pub fn push_tick(&self, value: T, at: NanoTime) {
        self.queue.lock().unwrap().push_back(ValueAt::new(value, at));
        if let Some(notifier) = self.notifier.lock().unwrap().as_ref() {
            let _ = notifier.notify();
        }
    }
}

/// A stream whose ticks arrive from a [`PushSink`] on another thread.
/// Late ticks (timestamped before the last value already drained) are
/// handled per `policy`: clamped to the current engine time, or
/// dropped and logged as [`RuntimeRecoverable::LateTick`].
pub struct PushStream<T: Element> {
    queue: Arc<Mutex<VecDeque<ValueAt<T>>>>,
    notifier: Arc<Mutex<Option<ReadyNotifier>>>,
    policy: LateTickPolicy,
    last_time: NanoTime,
    value: T,
}

impl<T: Element> MutableNode for PushStream<T> {
    fn cycle(&mut self, state: &mut GraphState) -> bool {
        let drained: Vec<ValueAt<T>> = {
            let mut q = self.queue.lock().unwrap();
            q.drain(..).collect()
        };
        if drained.is_empty() {
            return false;
        }
        for mut entry in drained {
            if entry.time < self.last_time {
                match self.policy {
                    LateTickPolicy::Clamp => entry.time = self.last_time,
                    LateTickPolicy::Drop => {
                        state.log(
                            log::Level::Warn,
                            &RuntimeRecoverable::LateTick {
                                t: entry.time,
                                policy: self.policy,
                            }
                            .to_string(),
                        );
                        continue;
                    }
                }
            }
            self.last_time = entry.time;
            self.value = entry.value;
        }
        true
    }

    fn start(&mut self, state: &mut GraphState) {
        self.last_time = state.time();
        *self.notifier.lock().unwrap() = Some(state.ready_notifier());
        state.always_callback();
    }
}

impl<T: Element> StreamPeekRef<T> for PushStream<T> {
    fn peek_ref(&self) -> &T {
        &self.value
    }
}

/// Builds a push source and its sink. The sink can be handed to a
/// worker thread immediately; pushes made before the node's `start`
/// hook runs are simply queued and surface on the node's first cycle.
pub fn push_stream<T: Element>(policy: LateTickPolicy) -> (PushSink<T>, std::rc::Rc<dyn Stream<T>>) {
    let queue = Arc::new(Mutex::new(VecDeque::new()));
    let notifier = Arc::new(Mutex::new(None));
    let sink = PushSink {
        queue: queue.clone(),
        notifier: notifier.clone(),
    };
    let stream = PushStream {
        queue,
        notifier,
        policy,
        last_time: NanoTime::ZERO,
        value: T::default(),
    }
    .into_stream();
    (sink, stream)
}

/// Drains a plain crossbeam receiver once per cycle, for adapters that
/// already have their own channel (e.g. a tokio task forwarding
/// websocket frames) and just need a node wrapper. Unlike
/// [`PushStream`] this polls rather than waiting on a notifier, so it's
/// only useful alongside another always-dirty node or a tick source.
pub struct ChannelStream<T: Element> {
    receiver: crossbeam::channel::Receiver<T>,
    value: T,
}

impl<T: Element> ChannelStream<T> {
    pub fn new(receiver: crossbeam::channel::Receiver<T>) -> Self {
        Self {
            receiver,
            value: T::default(),
        }
    }
}

impl<T: Element> MutableNode for ChannelStream<T> {
    fn cycle(&mut self, _state: &mut GraphState) -> bool {
        match self.receiver.try_recv() {
            Ok(v) => {
                self.value = v;
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => false,
        }
    }
    fn start(&mut self, state: &mut GraphState) {
        state.always_callback();
    }
}

impl<T: Element> StreamPeekRef<T> for ChannelStream<T> {
    fn peek_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, RunFor, RunMode};
    use crate::ops::CollectExt;
    use std::time::Duration;

    #[test]
    fn live_pushes_from_another_thread_are_observed() {
        let (sink, stream) = push_stream::<i32>(LateTickPolicy::Clamp);
        let captured = stream.collect();

        let pusher = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            sink.push_tick(1, NanoTime::now());
            std::thread::sleep(Duration::from_millis(20));
            sink.push_tick(2, NanoTime::now());
        });

        Graph::new(
            vec![captured.clone().as_node()],
            RunMode::RealTime,
            RunFor::Duration(Duration::from_millis(100)),
        )
        .unwrap()
        .run()
        .unwrap();

        pusher.join().unwrap();
        let ticks = captured.peek_value();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].value, 1);
        assert_eq!(ticks[1].value, 2);
    }
}
