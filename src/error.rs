//! Typed error taxonomy surfaced at each engine phase boundary.
//!
//! Internal plumbing still leans on `anyhow::Result` the way upstream
//! node/adapter code does; these enums are what callers of `Graph::run`
//! and the adapter traits actually match on.

use thiserror::Error;

use crate::time::NanoTime;

/// Fatal, raised while a graph is being wired and `finalize()`d.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("cycle detected through node {0:?} (mark the offending edge as feedback to break it)")]
    CycleDetected(String),

    #[error("type mismatch wiring edge into node {node}: expected {expected}, got {got}")]
    TypeMismatch {
        node: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("input {input} of node {node} has no producer wired")]
    UnwiredInput { node: String, input: String },

    #[error("duplicate edge from {producer} to {consumer} input {input}")]
    DuplicateEdge {
        producer: String,
        consumer: String,
        input: String,
    },
}

/// Fatal, raised during the `on_start` phase before the cycle loop runs.
#[derive(Error, Debug)]
pub enum StartError {
    #[error("adapter {0} failed to initialise: {1}")]
    AdapterInit(String, #[source] anyhow::Error),

    #[error("resource exhausted starting {0}: {1}")]
    ResourceExhausted(String, String),
}

/// Non-fatal: the engine logs and continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeRecoverable {
    #[error("adapter {adapter} source error, adapter moved to terminal state: {message}")]
    AdapterSource { adapter: String, message: String },

    #[error("tick at {t} dropped/clamped as late (policy={policy:?})")]
    LateTick { t: NanoTime, policy: LateTickPolicy },

    #[error("history underflow on edge {edge} requesting depth {requested}, have {available}")]
    HistoryUnderflow {
        edge: String,
        requested: usize,
        available: usize,
    },

    #[error("push-pull adapter {adapter} rejected live tick at {t}: at or before replay boundary {boundary}")]
    LateAfterReplay {
        adapter: String,
        t: NanoTime,
        boundary: NanoTime,
    },
}

/// Fatal at runtime: the engine tears down every started node in reverse
/// rank order and returns this from `run`.
#[derive(Error, Debug)]
pub enum RuntimeFatal {
    #[error("time regression in scheduler: got {got}, last dispatched {last}")]
    TimeRegression { got: NanoTime, last: NanoTime },

    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("node {node} handler panicked/errored: {source}")]
    NodeHandler {
        node: String,
        #[source]
        source: anyhow::Error,
    },
}

/// How a push adapter's late tick (t < engine_now) is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LateTickPolicy {
    #[default]
    Clamp,
    Drop,
}

/// Process exit codes for a CLI wrapper embedding the engine (spec'd
/// external interface, not just a convention of this crate's own binary).
pub mod exit_code {
    pub const OK: i32 = 0;
    pub const BUILD_ERROR: i32 = 64;
    pub const RUNTIME_ERROR: i32 = 65;
    pub const INTERRUPTED: i32 = 130;
}
