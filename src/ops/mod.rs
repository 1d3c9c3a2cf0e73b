//! A small library of stream combinators built on the engine core.
//!
//! Deliberately not a full operator library: map, bimap/add, merge,
//! filter, fold, delay, constant, ticker, feedback, history and a couple
//! of test-only building blocks (`CallBackStream`, `collect`, `distinct`,
//! `finally`) is enough surface for adapters and tests to compose
//! pipelines out of without pulling in statistics/windowing nodes that
//! belong in a higher-level library built on top of this crate.

mod bimap;
mod callback;
mod collect;
mod constant;
mod delay;
mod distinct;
mod feedback;
mod filter;
mod finally;
mod fold;
mod history;
mod map;
mod merge;
mod tick;

pub use bimap::*;
pub use callback::*;
pub use collect::*;
pub use constant::*;
pub use delay::*;
pub use distinct::*;
pub use feedback::*;
pub use filter::*;
pub use finally::*;
pub use fold::*;
pub use history::*;
pub use map::*;
pub use merge::*;
pub use tick::*;
