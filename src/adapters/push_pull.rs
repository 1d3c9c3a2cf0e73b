//! Hybrid adapter: replays a bounded historical feed, then switches to a
//! live [`PushPullSink`] once replay finishes. Grounded on the same
//! peekable-iterator pull mechanics as [`super::iterator_stream`], plus
//! a [`PushSink`](super::push::PushSink)-style shared queue for the
//! live half.

use std::collections::VecDeque;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use crate::error::RuntimeRecoverable;
use crate::graph::ReadyNotifier;
use crate::queue::ValueAt;
use crate::types::*;

type Peeker<T> = Box<std::iter::Peekable<Box<dyn Iterator<Item = ValueAt<T>>>>>;

/// The live-producing side, handed to whatever drives the push half
/// (a socket thread, a timer) once replay is known to be finishing.
/// Can be cloned and moved to another thread before the owning node
/// has even started; ticks pushed that early just queue up.
#[derive(Clone)]
pub struct PushPullSink<T: Element> {
    queue: Arc<Mutex<VecDeque<ValueAt<T>>>>,
    replay_complete: Arc<AtomicBool>,
    last_replay_time: Arc<Mutex<NanoTime>>,
    notifier: Arc<Mutex<Option<ReadyNotifier>>>,
}

impl<T: Element> PushPullSink<T> {
    /// Signals that historical replay has finished; the most recent
    /// pulled tick becomes the replay boundary. Idempotent.
    pub fn flag_replay_complete(&self) {
        self.replay_complete.store(true, Ordering::SeqCst);
    }

    /// Pushes a live tick. Rejected with `LateAfterReplay` if replay has
    /// completed and `t` is at or before the replay boundary (the
    /// boundary timestamp is inclusive in pull — scenario 4).
    pub fn push_tick(&self, t: NanoTime, value: T) -> Result<(), RuntimeRecoverable> {
        if self.replay_complete.load(Ordering::SeqCst) {
            let boundary = *self.last_replay_time.lock().unwrap();
            if t <= boundary {
                return Err(RuntimeRecoverable::LateAfterReplay {
                    adapter: tynm::type_name::<PushPullSink<T>>(),
                    t,
                    boundary,
                });
            }
        }
        self.queue.lock().unwrap().push_back(ValueAt::new(value, t));
        if let Some(notifier) = self.notifier.lock().unwrap().as_ref() {
            let _ = notifier.notify();
        }
        Ok(())
    }
}

/// A stream that begins in pull mode off a bounded historical iterator
/// and transitions to live ticks from a [`PushPullSink`] once the
/// iterator is exhausted.
pub struct PushPullStream<T: Element> {
    pull: Option<Peeker<T>>,
    queue: Arc<Mutex<VecDeque<ValueAt<T>>>>,
    replay_complete: Arc<AtomicBool>,
    last_replay_time: Arc<Mutex<NanoTime>>,
    notifier: Arc<Mutex<Option<ReadyNotifier>>>,
    value: T,
}

impl<T: Element> MutableNode for PushPullStream<T> {
    fn cycle(&mut self, state: &mut GraphState) -> bool {
        if let Some(pull) = &mut self.pull {
            match pull.peek() {
                Some(value_at) if value_at.time == state.time() => {
                    let value_at = pull.next().unwrap();
                    self.value = value_at.value;
                    *self.last_replay_time.lock().unwrap() = value_at.time;
                    if let Some(next) = pull.peek() {
                        state.add_callback(next.time);
                    } else {
                        self.pull = None;
                        self.replay_complete.store(true, Ordering::SeqCst);
                    }
                    return true;
                }
                Some(_) => return false,
                None => {
                    self.pull = None;
                    self.replay_complete.store(true, Ordering::SeqCst);
                }
            }
        }

        let drained: Vec<ValueAt<T>> = {
            let mut q = self.queue.lock().unwrap();
            q.drain(..).collect()
        };
        if drained.is_empty() {
            return false;
        }
        for value_at in drained {
            self.value = value_at.value;
        }
        true
    }

    fn start(&mut self, state: &mut GraphState) {
        *self.notifier.lock().unwrap() = Some(state.ready_notifier());
        if let Some(pull) = &mut self.pull {
            if let Some(value_at) = pull.peek() {
                state.add_callback(value_at.time);
            } else {
                self.pull = None;
                self.replay_complete.store(true, Ordering::SeqCst);
            }
        }
    }
}

impl<T: Element> StreamPeekRef<T> for PushPullStream<T> {
    fn peek_ref(&self) -> &T {
        &self.value
    }
}

/// Builds a push-pull source from a bounded historical iterator. The
/// sink can be handed to a worker thread immediately; live pushes made
/// before replay has started are simply queued.
pub fn push_pull_stream<T: Element>(
    pull: Box<dyn Iterator<Item = ValueAt<T>>>,
) -> (PushPullSink<T>, std::rc::Rc<dyn Stream<T>>) {
    let queue = Arc::new(Mutex::new(VecDeque::new()));
    let replay_complete = Arc::new(AtomicBool::new(false));
    let last_replay_time = Arc::new(Mutex::new(NanoTime::ZERO));
    let notifier = Arc::new(Mutex::new(None));
    let sink = PushPullSink {
        queue: queue.clone(),
        replay_complete: replay_complete.clone(),
        last_replay_time: last_replay_time.clone(),
        notifier: notifier.clone(),
    };
    let stream = PushPullStream {
        pull: Some(Box::new(pull.peekable())),
        queue,
        replay_complete,
        last_replay_time,
        notifier,
        value: T::default(),
    }
    .into_stream();
    (sink, stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, RunFor, RunMode};
    use crate::ops::CollectExt;

    #[test]
    fn replay_phase_emits_pulled_ticks_in_order() {
        let t0 = NanoTime::new(1_000_000);
        let data = vec![
            ValueAt::new("A".to_string(), t0),
            ValueAt::new("B".to_string(), t0 + NanoTime::new(1)),
        ];
        let (_sink, stream) = push_pull_stream(Box::new(data.into_iter()));
        let captured = stream.collect();

        Graph::new(
            vec![captured.clone().as_node()],
            RunMode::HistoricalFrom(t0),
            RunFor::Forever,
        )
        .unwrap()
        .run()
        .unwrap();

        let ticks = captured.peek_value();
        let values: Vec<&str> = ticks.iter().map(|v| v.value.as_str()).collect();
        assert_eq!(values, vec!["A", "B"]);
    }

    /// Exercises the boundary rule directly against a sink built by hand
    /// (as if its owning node had already replayed up to `t0 + 1`),
    /// since the real boundary-after-replay case only matters once the
    /// adapter has switched to live mode.
    #[test]
    fn live_push_respects_replay_boundary() {
        let t0 = NanoTime::new(1_000_000);
        let (tx, _rx) = crossbeam::channel::unbounded();
        let sink = PushPullSink::<String> {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            replay_complete: Arc::new(AtomicBool::new(false)),
            last_replay_time: Arc::new(Mutex::new(t0 + NanoTime::new(1))),
            notifier: Arc::new(Mutex::new(Some(ReadyNotifier { node_index: 0, sender: tx }))),
        };

        assert!(sink.push_tick(t0 + NanoTime::new(2), "C".to_string()).is_ok());
        sink.flag_replay_complete();

        let rejected = sink.push_tick(t0 + NanoTime::new(1), "D".to_string());
        assert!(matches!(rejected, Err(RuntimeRecoverable::LateAfterReplay { .. })));

        assert!(sink.push_tick(t0 + NanoTime::new(3), "E".to_string()).is_ok());
    }
}
