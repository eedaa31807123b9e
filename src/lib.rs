//! Report Calc: a prefix-notation rule interpreter for quality-control reports
//!
//! A ruleset is a JSON document of named sections, each an ordered list of
//! rules such as `["store", ["lt", "reads", 1000], "report/low_coverage"]`.
//! Rules read input files and a path-addressed namespace, write results
//! into the `report` branch and signal pass, fail or retry to the workflow
//! running the tool through the process exit code.

pub mod ast;
pub mod config;
pub mod evaluator;
pub mod model;
pub mod namespace;
pub mod parser;
pub mod registry;
pub mod ruleset;
pub mod session;

// Re-export main types
pub use ast::{Rule, Token};
pub use config::{InputFile, RunConfig};
pub use evaluator::{
    ConfigurationError, EvaluationError, Evaluator, EvaluatorContext, ExecutionError,
};
pub use model::{Row, RowStream, Value};
pub use namespace::Namespace;
pub use registry::{FunctionRegistry, create_standard_registry};
pub use ruleset::{RuleFile, Section};
pub use session::{RunOutcome, Session, execute};
