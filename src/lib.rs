#![warn(clippy::perf)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_doctest_main)]
#![doc = include_str!("../README.md")]

//! ## Graph execution
//!
//! `corrie` cycles a DAG of nodes in time order. Every node declares the
//! upstream streams it depends on ([`MutableNode::upstreams`]); the graph
//! assigns each node a rank at build time (the longest path from any
//! source) and, at every timepoint, only cycles the nodes that actually
//! need to run, in rank order. A node's downstream only becomes dirty
//! when an *active* upstream ticks — a *passive* upstream just updates
//! what the node reads without forcing it to fire.
//!
//! ## Historical vs RealTime
//!
//! Time is a first-class citizen here. Engine time is measured in
//! nanoseconds from the UNIX epoch and represented by [`NanoTime`].
//! [`RunMode::HistoricalFrom`] jumps straight from one scheduled event to
//! the next, which makes replaying a day of historical data take a
//! fraction of a second. [`RunMode::RealTime`] tracks the wall clock and
//! blocks between events — this is what a production deployment runs.
//! The same graph works unchanged in either mode, which is what makes
//! historical replay a meaningful test of production behaviour.
//!
//! ## Adapters
//!
//! The [`adapters`] module bridges the graph to the outside world via
//! three contracts: pull (a bounded historical iterator), push (a live
//! source driven from another thread, waking the engine through a
//! [`ReadyNotifier`]), and push-pull (pull replay that hands off to a
//! live push feed once it's caught up).
//!
//! ## Graph dynamism
//!
//! Some graphs need sub-graphs that come and go at runtime — one
//! instance per symbol in a market-data feed, say, created when a symbol
//! starts trading and torn down when it stops. [`dynamic::Basket`]
//! watches a keyed stream of live keys and instantiates/tears down a
//! sub-graph per key without re-running the engine's static wiring pass.
//!
//! ## Performance
//!
//! Cheaply cloneable value types make cycling cheaper:
//!
//! - For small strings: [`arraystring`](https://crates.io/crates/arraystring)
//! - For small vectors: [`tinyvec`](https://crates.io/crates/tinyvec)
//! - For larger or heap-allocated types, use
//!   [`Rc<T>`](std::rc::Rc) — the engine is single-threaded by design,
//!   one thread per graph, so `Rc`/`RefCell` are enough; adapters use
//!   `Arc`/`Mutex` only at the thread boundary they own.

#[macro_use]
extern crate log;
extern crate derive_new;

pub mod adapters;
pub mod dynamic;

mod alarm;
mod edge;
mod error;
mod graph;
mod ops;
mod queue;
mod time;
mod types;

pub use alarm::*;
pub use edge::*;
pub use error::*;
pub use graph::*;
pub use ops::*;
pub use queue::*;
pub use types::*;
