//! Rule evaluation: the tree walker, its state and its error channels

mod context;
mod engine;
pub mod error;

pub use context::{EvaluatorContext, Frame};
pub use engine::{DEFAULT_MAX_DEPTH, Evaluator, report_rule_error};
pub use error::{
    ConfigurationError, EvaluationError, EvaluationResult, ExecutionError, ExecutionResult,
};
