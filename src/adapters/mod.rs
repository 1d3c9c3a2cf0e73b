//! Input/output adapters bridging the engine to the outside world (C6).
//!
//! Three contracts, per the engine's adapter model: pull ([`traits::PullAdapter`],
//! a bounded historical source opened/closed around `next()`), push
//! ([`traits::PushAdapter`], a live source driven from another thread via
//! [`traits::spawn_push_adapter`] and woken through [`crate::graph::ReadyNotifier`]),
//! and push-pull ([`traits::PushPullAdapter`], starting in pull mode off
//! [`push_pull::PushPullSink`] and switching over once replay completes).
//! `iterator_stream` and `push`/`push_pull` are the engine-facing stream
//! types these adapters feed; `traits` is the implementor-facing contract
//! itself.

pub mod iterator_stream;
pub mod push;
pub mod push_pull;
pub mod traits;

pub use iterator_stream::{IteratorStream, SimpleIteratorStream};
pub use push::{ChannelStream, PushSink, PushStream, push_stream};
pub use push_pull::{PushPullSink, PushPullStream, push_pull_stream};
pub use traits::{
    AdapterHandle, AdapterStopToken, PullAdapter, PushAdapter, PushPullAdapter, drain_pull_adapter,
    spawn_push_adapter, spawn_push_pull_adapter,
};
