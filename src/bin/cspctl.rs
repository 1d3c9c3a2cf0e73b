//! Thin CLI wrapper around the engine (spec.md §6's exit-code contract).
//!
//! Building a graph from a declarative spec is out of scope here (see
//! spec.md's Non-goals around offline tooling) — this binary exists
//! solely to translate `Graph::run`'s `Result` into the exit codes §6
//! names, running a small demo graph while doing it. An embedding
//! application that wants `130` on SIGINT wires its own signal handler
//! to `Graph::stop_handle()`; that's outside what a thin wrapper owns.

use std::time::Duration;

use corrie::*;
use log::error;

fn main() {
    env_logger::init();

    let period = Duration::from_millis(200);
    let source = ticker(period);
    let printed = map(&source, |count: &u64| {
        println!("tick {count}");
        *count
    });

    let code = match Graph::new(
        vec![printed.as_node()],
        RunMode::HistoricalFrom(NanoTime::ZERO),
        RunFor::Cycles(10),
    ) {
        Err(err) => {
            error!("graph build failed: {err}");
            exit_code::BUILD_ERROR
        }
        Ok(mut graph) => match graph.run() {
            Ok(()) => exit_code::OK,
            Err(err) => {
                error!("graph run failed: {err}");
                exit_code::RUNTIME_ERROR
            }
        },
    };

    std::process::exit(code);
}
