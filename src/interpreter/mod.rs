//! Steppable evaluator
//!
//! This module provides the execution layer on top of the parser's AST:
//! - [`evaluator`]: per-run state and the one-quantum-per-node suspension
//! - [`engine`]: the host driver ([`Interpreter`]) with stepping, ticks,
//!   cancellation and timeouts
//! - [`debugger`]: breakpoint predicates and variable inspection
//! - [`scope`] and [`namespace`]: name resolution
//! - [`library`]: loadable native modules (`stdio`)
//! - [`errors`]: the runtime fault type
//!
//! # Execution Model
//!
//! Every statement and expression is visited as a boxed future. Entering a
//! node records it as the cursor and yields once, so the host regains control
//! between any two nodes. Faults carry the node they were raised at and end
//! the run; there is no recovery inside the evaluator.

pub mod debugger;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod library;
pub mod namespace;
pub mod scope;

mod calls;
mod declarations;
mod expressions;
mod initializers;
mod jumps;
mod loops;
mod statements;

pub use debugger::{Debugger, VariableInfo};
pub use engine::{Interpreter, RunOutcome, StepResult};
pub use errors::RuntimeError;
