//! Bounded-concurrency runner for independent work units.

pub mod console;
pub mod context;
pub mod orchestrator;
pub mod outcome;
pub mod registry;
pub mod reporter;
pub mod unit;

pub use console::{Console, ConsoleSink, MemorySink, StdoutSink};
pub use context::{Identity, IdentitySource, RunContext};
pub use orchestrator::Orchestrator;
pub use outcome::{Outcome, ResultCode};
pub use registry::UnitRegistry;
pub use reporter::{overall_code, summarize, truncate_name};
pub use unit::{LogBuffer, UnitDescriptor, WorkUnit};
