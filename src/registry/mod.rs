//! Function registry for rule evaluation
//!
//! Names resolve through four tiers: host operations, interpreter builtins,
//! engine extensions and context-free functions. Each entry declares its
//! signature and how its arguments are evaluated.

pub mod builtins;
pub mod extensions;
pub mod function;
pub mod functions;
pub mod operators;
pub mod policy;
pub mod signature;

pub use function::{
    EngineFunction, FunctionDescriptor, FunctionImpl, FunctionKind, FunctionRegistry,
    FunctionResult, HostOp, Invocation, RuleFunction,
};
pub use policy::{ArgumentPolicy, RawArgs, ShortCircuit};
pub use signature::{FunctionSignature, ParameterInfo};

/// Create a registry with every built-in function
pub fn create_standard_registry() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();

    operators::register_host_operations(&mut registry);
    builtins::register_builtins(&mut registry);
    extensions::register_extensions(&mut registry);
    functions::register_functions(&mut registry);

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_tiers() {
        let registry = create_standard_registry();
        for name in ["add", "iadd", "getitem", "sqrt"] {
            assert_eq!(registry.lookup(name).unwrap().kind, FunctionKind::HostOp, "{name}");
        }
        for name in ["store", "if", "iterate", "clear", "readFileByName"] {
            assert_eq!(
                registry.lookup(name).unwrap().kind,
                FunctionKind::EngineMethod,
                "{name}"
            );
        }
        for name in ["regexp", "statisticN", "basename", "pageHtml"] {
            assert_eq!(
                registry.lookup(name).unwrap().kind,
                FunctionKind::FreeFunction,
                "{name}"
            );
        }
    }

    #[test]
    fn test_inplace_flags() {
        let registry = create_standard_registry();
        for name in [
            "iadd", "isub", "imul", "itruediv", "ifloordiv", "imod", "ipow", "iconcat", "clear",
        ] {
            assert!(registry.lookup(name).unwrap().inplace, "{name}");
        }
        assert!(!registry.lookup("add").unwrap().inplace);
    }
}
