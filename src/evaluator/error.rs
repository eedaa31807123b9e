// Error types for rule evaluation

use thiserror::Error;

/// Result type for recoverable, per-rule operations
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Result type for anything that may also end the run
pub type EvaluationResult<T> = Result<T, EvaluationError>;

/// Failures local to one rule. The evaluator logs them with the rule context,
/// treats the call result as null and moves on to the next rule.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// A non-terminal path segment exists but is not a mapping
    #[error(
        "The namespace path \"{path}\" isn't a dictionary but it needs to be. Did a rule previously set it to a constant?"
    )]
    TypeMismatch {
        /// Path prefix that failed to resolve to a mapping
        path: String,
    },

    /// A deferred `%(field)s` location could not be filled from a row
    #[error("Unable to match location term \"{location}\" in dictionary {row}")]
    KeyMismatch {
        /// Location template
        location: String,
        /// Row that lacked the field, rendered for the log
        row: String,
    },

    /// A row handed to a storing function had no `value` key
    #[error(
        "{function}() needs given dictionary to have a 'value' key. If derived from a regular expression search, did it have a \"(?P<value>...)\" named group?"
    )]
    MissingValue {
        /// Function that consumed the row
        function: String,
    },

    /// Too few or too many arguments for the declared signature
    #[error("A rule expression needs {expected} arguments in rule #{row}, got {actual}. See: {usage}")]
    Arity {
        /// Rule row the call appeared in
        row: usize,
        /// Human readable expectation, e.g. "2-3"
        expected: String,
        /// Number of arguments supplied
        actual: usize,
        /// Declared usage of the function
        usage: String,
    },

    /// A value had the wrong shape for the function receiving it
    #[error("{function}(): {message}")]
    InvalidArgument {
        /// Function name
        function: String,
        /// Error message
        message: String,
    },

    /// File system failure inside a rule
    #[error("I/O error on {path}: {message}")]
    Io {
        /// File path involved
        path: String,
        /// Error message from the operating system
        message: String,
    },
}

impl ExecutionError {
    /// Shorthand for [`ExecutionError::InvalidArgument`]
    pub fn invalid_argument(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it concerns
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Failures that mean the ruleset itself cannot be trusted. Always fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// `if`/`iif` received something other than a boolean
    #[error("Error: the {function}() command conditional in rule #{row} was not a boolean: {value}")]
    NonBooleanCondition {
        /// `if` or `iif`
        function: String,
        /// Rule row
        row: usize,
        /// Rendered condition value
        value: String,
    },

    /// A requested section does not exist
    #[error("Unable to find rule section \"{name}\"")]
    UnknownSection {
        /// Section name
        name: String,
    },

    /// The rule file could not be read or parsed
    #[error("Unable to load rules from {source_name}: {message}")]
    RuleFile {
        /// File path or other source label
        source_name: String,
        /// Error message
        message: String,
    },

    /// A custom rule overlay was malformed
    #[error("Custom rule problem at {row}: {message}")]
    Overlay {
        /// `section:row` coordinate as given
        row: String,
        /// Error message
        message: String,
    },

    /// An input file specification could not be understood
    #[error("Input file specification \"{spec}\" should have the form path:name:type")]
    InputFile {
        /// Offending specification
        spec: String,
    },
}

/// Everything a function call can produce besides a value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// Recoverable per-rule failure
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Fatal ruleset problem
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// `exit()` was called by a rule
    #[error("Exit requested with code {code}")]
    Exit {
        /// Requested exit code
        code: i32,
        /// Optional message
        message: String,
    },

    /// Unexpected condition inside the engine
    #[error("Halting program: {0}")]
    Internal(String),
}

impl EvaluationError {
    /// Whether the evaluator may log this and continue with the next rule
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EvaluationError::Execution(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_execution_errors_are_recoverable() {
        let exec: EvaluationError = ExecutionError::invalid_argument("length", "no input").into();
        assert!(exec.is_recoverable());

        let config: EvaluationError = ConfigurationError::UnknownSection {
            name: "qc".to_string(),
        }
        .into();
        assert!(!config.is_recoverable());

        let exit = EvaluationError::Exit {
            code: 2,
            message: String::new(),
        };
        assert!(!exit.is_recoverable());
        assert!(!EvaluationError::Internal("boom".to_string()).is_recoverable());
    }

    #[test]
    fn test_arity_message_names_row_and_usage() {
        let err = ExecutionError::Arity {
            row: 4,
            expected: "2".to_string(),
            actual: 1,
            usage: "lt(a, b)".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("rule #4"));
        assert!(text.contains("See: lt(a, b)"));
    }
}
