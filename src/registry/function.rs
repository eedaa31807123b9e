//! Function registry and the callable traits behind it

use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::policy::ArgumentPolicy;
use super::signature::FunctionSignature;
use crate::ast::Token;
use crate::evaluator::{EvaluationResult, Evaluator, EvaluatorContext, ExecutionResult};
use crate::model::Value;

/// Result type for context-free function calls
pub type FunctionResult<T> = ExecutionResult<T>;

/// A context-free rule function: values in, value out
pub trait RuleFunction: Send + Sync {
    /// Get the function name
    fn name(&self) -> &str;

    /// Get the function signature
    fn signature(&self) -> &FunctionSignature;

    /// Evaluate the function with given arguments
    fn evaluate(&self, args: Vec<Value>) -> FunctionResult<Value>;

    /// Get function documentation
    fn documentation(&self) -> &str {
        ""
    }
}

/// A function that needs the evaluator: it reads or writes the namespace,
/// runs rules it received raw, or ends the run.
pub trait EngineFunction: Send + Sync {
    /// Get the function name
    fn name(&self) -> &str;

    /// Get the function signature
    fn signature(&self) -> &FunctionSignature;

    /// Which arguments arrive unevaluated
    fn policy(&self) -> ArgumentPolicy {
        ArgumentPolicy::EAGER
    }

    /// Whether the result is written back to the location named by argument 1
    fn inplace(&self) -> bool {
        false
    }

    /// Get function documentation
    fn documentation(&self) -> &str {
        ""
    }

    /// Run the function
    fn call(
        &self,
        invocation: Invocation,
        engine: &Evaluator,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value>;
}

/// A host operation: a plain arithmetic, comparison, logic or math function
#[derive(Clone)]
pub struct HostOp {
    /// Operation name
    pub name: &'static str,
    /// Declared signature
    pub signature: FunctionSignature,
    /// Whether the result is written back to argument 1's location
    pub inplace: bool,
    /// Argument policy
    pub policy: ArgumentPolicy,
    /// The operation
    pub func: fn(&[Value]) -> FunctionResult<Value>,
    /// Short description
    pub documentation: &'static str,
}

impl HostOp {
    /// Host operation over `arity` evaluated arguments
    pub fn new(
        name: &'static str,
        arity: usize,
        documentation: &'static str,
        func: fn(&[Value]) -> FunctionResult<Value>,
    ) -> Self {
        Self {
            name,
            signature: FunctionSignature::positional(name, arity),
            inplace: false,
            policy: ArgumentPolicy::EAGER,
            func,
            documentation,
        }
    }

    /// Mark the operation as in-place
    pub fn in_place(mut self) -> Self {
        self.inplace = true;
        self
    }

    /// Override the argument policy
    pub fn with_policy(mut self, policy: ArgumentPolicy) -> Self {
        self.policy = policy;
        self
    }
}

type ClosureFn = dyn Fn(Vec<Value>) -> FunctionResult<Value> + Send + Sync;

/// Implementation behind a registered name
#[derive(Clone)]
pub enum FunctionImpl {
    /// Host operation
    HostOp(Arc<HostOp>),
    /// Function with evaluator access
    Engine(Arc<dyn EngineFunction>),
    /// Trait-based context-free function
    Free(Arc<dyn RuleFunction>),
    /// Lightweight closure-based context-free function
    Closure {
        /// Function signature
        signature: FunctionSignature,
        /// Documentation
        documentation: String,
        /// The actual function implementation
        func: Arc<ClosureFn>,
    },
}

/// How a function is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Plain operation over evaluated values
    HostOp,
    /// Receives the invocation plus evaluator and context
    EngineMethod,
    /// Context-free function over evaluated values
    FreeFunction,
}

impl FunctionImpl {
    /// Dispatch kind
    pub fn kind(&self) -> FunctionKind {
        match self {
            FunctionImpl::HostOp(_) => FunctionKind::HostOp,
            FunctionImpl::Engine(_) => FunctionKind::EngineMethod,
            FunctionImpl::Free(_) | FunctionImpl::Closure { .. } => FunctionKind::FreeFunction,
        }
    }

    /// Declared signature
    pub fn signature(&self) -> &FunctionSignature {
        match self {
            FunctionImpl::HostOp(op) => &op.signature,
            FunctionImpl::Engine(function) => function.signature(),
            FunctionImpl::Free(function) => function.signature(),
            FunctionImpl::Closure { signature, .. } => signature,
        }
    }

    /// Argument policy
    pub fn policy(&self) -> ArgumentPolicy {
        match self {
            FunctionImpl::HostOp(op) => op.policy,
            FunctionImpl::Engine(function) => function.policy(),
            FunctionImpl::Free(_) | FunctionImpl::Closure { .. } => ArgumentPolicy::EAGER,
        }
    }

    /// Whether the result is re-stored at argument 1's location
    pub fn inplace(&self) -> bool {
        match self {
            FunctionImpl::HostOp(op) => op.inplace,
            FunctionImpl::Engine(function) => function.inplace(),
            FunctionImpl::Free(_) | FunctionImpl::Closure { .. } => false,
        }
    }

    /// Documentation text
    pub fn documentation(&self) -> &str {
        match self {
            FunctionImpl::HostOp(op) => op.documentation,
            FunctionImpl::Engine(function) => function.documentation(),
            FunctionImpl::Free(function) => function.documentation(),
            FunctionImpl::Closure { documentation, .. } => documentation,
        }
    }
}

impl std::fmt::Debug for FunctionImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self.kind(), self.signature())
    }
}

/// The resolved description of one function call, built per lookup
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    /// Name the function was looked up by
    pub name: String,
    /// Dispatch kind
    pub kind: FunctionKind,
    /// Implementation
    pub implementation: FunctionImpl,
    /// Declared signature
    pub signature: FunctionSignature,
    /// Argument policy
    pub policy: ArgumentPolicy,
    /// Whether the result is re-stored at argument 1's location
    pub inplace: bool,
}

/// The collected arguments of one call
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// Function name
    pub name: String,
    /// Argument values; raw positions hold unquoted text, deferred terms null
    pub args: Vec<Value>,
    /// Source text of each argument, for diagnostics and in-place writes
    pub arg_texts: Vec<String>,
    /// The unevaluated argument terms
    pub terms: Vec<Token>,
}

impl Invocation {
    /// Argument `index`, or null when it was omitted
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or_default()
    }

    /// Take ownership of argument `index`, leaving null behind
    pub fn take(&mut self, index: usize) -> Value {
        self.args
            .get_mut(index)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Text of a raw argument; falls back to the rendered value
    pub fn text(&self, index: usize) -> Option<String> {
        match self.args.get(index)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Raw rule terms from `start` on
    pub fn rules_from(&self, start: usize) -> &[Token] {
        self.terms.get(start..).unwrap_or_default()
    }
}

/// Registry of every callable name, in four lookup tiers
#[derive(Default)]
pub struct FunctionRegistry {
    host_ops: FxHashMap<String, FunctionImpl>,
    builtins: FxHashMap<String, FunctionImpl>,
    extensions: FxHashMap<String, FunctionImpl>,
    functions: FxHashMap<String, FunctionImpl>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("host_op_count", &self.host_ops.len())
            .field("builtin_count", &self.builtins.len())
            .field("extension_count", &self.extensions.len())
            .field("function_count", &self.functions.len())
            .finish()
    }
}

impl FunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host operation
    pub fn register_host_op(&mut self, op: HostOp) {
        self.host_ops
            .insert(op.name.to_string(), FunctionImpl::HostOp(Arc::new(op)));
    }

    /// Register an interpreter builtin
    pub fn register_builtin<F: EngineFunction + 'static>(&mut self, function: F) {
        let name = function.name().to_string();
        self.builtins
            .insert(name, FunctionImpl::Engine(Arc::new(function)));
    }

    /// Register an engine extension
    pub fn register_extension<F: EngineFunction + 'static>(&mut self, function: F) {
        let name = function.name().to_string();
        self.extensions
            .insert(name, FunctionImpl::Engine(Arc::new(function)));
    }

    /// Register a trait-based context-free function
    pub fn register<F: RuleFunction + 'static>(&mut self, function: F) {
        let name = function.name().to_string();
        self.functions
            .insert(name, FunctionImpl::Free(Arc::new(function)));
    }

    /// Register a closure-based context-free function
    pub fn register_closure<F>(
        &mut self,
        signature: FunctionSignature,
        documentation: impl Into<String>,
        func: F,
    ) where
        F: Fn(Vec<Value>) -> FunctionResult<Value> + Send + Sync + 'static,
    {
        let name = signature.name.clone();
        self.functions.insert(
            name,
            FunctionImpl::Closure {
                signature,
                documentation: documentation.into(),
                func: Arc::new(func),
            },
        );
    }

    /// Resolve a name: host operations first, then builtins, engine
    /// extensions and finally context-free functions.
    pub fn lookup(&self, name: &str) -> Option<FunctionDescriptor> {
        let implementation = self
            .host_ops
            .get(name)
            .or_else(|| self.builtins.get(name))
            .or_else(|| self.extensions.get(name))
            .or_else(|| self.functions.get(name))?
            .clone();

        Some(FunctionDescriptor {
            name: name.to_string(),
            kind: implementation.kind(),
            signature: implementation.signature().clone(),
            policy: implementation.policy(),
            inplace: implementation.inplace(),
            implementation,
        })
    }

    /// Check if a function exists
    pub fn contains(&self, name: &str) -> bool {
        self.host_ops.contains_key(name)
            || self.builtins.contains_key(name)
            || self.extensions.contains_key(name)
            || self.functions.contains_key(name)
    }

    /// Every function's usage line and documentation, sorted by name
    pub fn names(&self) -> Vec<(String, String)> {
        let mut names: Vec<(String, String)> = [
            &self.host_ops,
            &self.builtins,
            &self.extensions,
            &self.functions,
        ]
        .into_iter()
        .flat_map(|tier| tier.values())
        .map(|f| (f.signature().to_string(), f.documentation().to_string()))
        .collect();
        names.sort();
        names.dedup_by(|a, b| a.0 == b.0);
        names
    }
}
