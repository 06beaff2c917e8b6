//! Compiled, executable graphs
//!
//! - `graph` - the [`CompiledGraph`] type and its builder methods
//! - `types` - run outcomes and state snapshots
//! - `execution` - the superstep loop (`invoke`, `resume`)
//! - `state` - checkpoint inspection and external updates

mod execution;
mod graph;
mod state;
mod types;
#[cfg(test)]
mod tests;

pub use graph::CompiledGraph;
pub use types::{RunOutcome, StateSnapshot};
