//! Arithmetic, sequence and in-place operations

use super::{number, unsupported};
use crate::evaluator::ExecutionError;
use crate::model::Value;
use crate::registry::function::{FunctionRegistry, FunctionResult, HostOp};
use crate::registry::policy::ArgumentPolicy;

enum Operands {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn operands(name: &str, left: &Value, right: &Value) -> FunctionResult<Operands> {
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => Ok(Operands::Ints(*l, *r)),
        (l, r) if l.is_number() && r.is_number() => {
            Ok(Operands::Floats(number(name, l)?, number(name, r)?))
        }
        (l, r) => Err(unsupported(name, l, r)),
    }
}

fn overflow(name: &str) -> ExecutionError {
    ExecutionError::invalid_argument(name, "integer overflow")
}

fn zero_division(name: &str) -> ExecutionError {
    ExecutionError::invalid_argument(name, "division by zero")
}

/// Longest text `"ab" * n` may produce
const MAX_REPEAT_BYTES: usize = 1 << 28;

fn repeat(text: &str, count: i64) -> FunctionResult<Value> {
    let count = usize::try_from(count).unwrap_or(0);
    match text.len().checked_mul(count) {
        Some(len) if len <= MAX_REPEAT_BYTES => Ok(Value::String(text.repeat(count))),
        _ => Err(ExecutionError::invalid_argument(
            "mul",
            format!("repeating text {count} times exceeds {MAX_REPEAT_BYTES} bytes"),
        )),
    }
}

fn add(args: &[Value]) -> FunctionResult<Value> {
    match (&args[0], &args[1]) {
        (Value::String(l), Value::String(r)) => Ok(Value::String(format!("{l}{r}"))),
        (Value::List(l), Value::List(r)) => Ok(Value::List(l.iter().chain(r).cloned().collect())),
        (l, r) => match operands("add", l, r)? {
            Operands::Ints(l, r) => l
                .checked_add(r)
                .map(Value::Integer)
                .ok_or_else(|| overflow("add")),
            Operands::Floats(l, r) => Ok(Value::Float(l + r)),
        },
    }
}

fn sub(args: &[Value]) -> FunctionResult<Value> {
    match operands("sub", &args[0], &args[1])? {
        Operands::Ints(l, r) => l
            .checked_sub(r)
            .map(Value::Integer)
            .ok_or_else(|| overflow("sub")),
        Operands::Floats(l, r) => Ok(Value::Float(l - r)),
    }
}

fn mul(args: &[Value]) -> FunctionResult<Value> {
    match (&args[0], &args[1]) {
        (Value::String(s), Value::Integer(n)) | (Value::Integer(n), Value::String(s)) => {
            repeat(s, *n)
        }
        (l, r) => match operands("mul", l, r)? {
            Operands::Ints(l, r) => l
                .checked_mul(r)
                .map(Value::Integer)
                .ok_or_else(|| overflow("mul")),
            Operands::Floats(l, r) => Ok(Value::Float(l * r)),
        },
    }
}

fn truediv(args: &[Value]) -> FunctionResult<Value> {
    let (l, r) = (number("truediv", &args[0])?, number("truediv", &args[1])?);
    if r == 0.0 {
        return Err(zero_division("truediv"));
    }
    Ok(Value::Float(l / r))
}

fn floordiv(args: &[Value]) -> FunctionResult<Value> {
    match operands("floordiv", &args[0], &args[1])? {
        Operands::Ints(_, 0) => Err(zero_division("floordiv")),
        Operands::Ints(l, r) => {
            let quotient = l.checked_div(r).ok_or_else(|| overflow("floordiv"))?;
            let floored = if (l % r != 0) && ((l < 0) != (r < 0)) {
                quotient - 1
            } else {
                quotient
            };
            Ok(Value::Integer(floored))
        }
        Operands::Floats(_, r) if r == 0.0 => Err(zero_division("floordiv")),
        Operands::Floats(l, r) => Ok(Value::Float((l / r).floor())),
    }
}

fn modulo(args: &[Value]) -> FunctionResult<Value> {
    match operands("mod", &args[0], &args[1])? {
        Operands::Ints(_, 0) => Err(zero_division("mod")),
        Operands::Ints(l, r) => {
            let rem = l.checked_rem(r).ok_or_else(|| overflow("mod"))?;
            // result takes the sign of the divisor
            Ok(Value::Integer(if rem != 0 && ((rem < 0) != (r < 0)) {
                rem + r
            } else {
                rem
            }))
        }
        Operands::Floats(_, r) if r == 0.0 => Err(zero_division("mod")),
        Operands::Floats(l, r) => Ok(Value::Float(l - r * (l / r).floor())),
    }
}

fn pow(args: &[Value]) -> FunctionResult<Value> {
    match operands("pow", &args[0], &args[1])? {
        Operands::Ints(base, exp) if exp >= 0 => u32::try_from(exp)
            .ok()
            .and_then(|exp| base.checked_pow(exp))
            .map(Value::Integer)
            .ok_or_else(|| overflow("pow")),
        Operands::Ints(base, exp) => Ok(Value::Float((base as f64).powf(exp as f64))),
        Operands::Floats(base, exp) => Ok(Value::Float(base.powf(exp))),
    }
}

fn neg(args: &[Value]) -> FunctionResult<Value> {
    match &args[0] {
        Value::Integer(i) => i.checked_neg().map(Value::Integer).ok_or_else(|| overflow("neg")),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(ExecutionError::invalid_argument(
            "neg",
            format!("bad operand type for unary -: {}", other.type_name()),
        )),
    }
}

fn abs(args: &[Value]) -> FunctionResult<Value> {
    match &args[0] {
        Value::Integer(i) => i.checked_abs().map(Value::Integer).ok_or_else(|| overflow("abs")),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(ExecutionError::invalid_argument(
            "abs",
            format!("bad operand type for abs(): {}", other.type_name()),
        )),
    }
}

fn concat(args: &[Value]) -> FunctionResult<Value> {
    match (&args[0], &args[1]) {
        (Value::String(l), Value::String(r)) => Ok(Value::String(format!("{l}{r}"))),
        (Value::List(l), Value::List(r)) => Ok(Value::List(l.iter().chain(r).cloned().collect())),
        (l, r) => Err(unsupported("concat", l, r)),
    }
}

fn contains(args: &[Value]) -> FunctionResult<Value> {
    let found = match (&args[0], &args[1]) {
        (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
        (Value::List(items), needle) => items.iter().any(|item| item.loose_eq(needle)),
        (Value::Map(map), Value::String(key)) => map.contains_key(key),
        (l, r) => return Err(unsupported("contains", l, r)),
    };
    Ok(Value::Boolean(found))
}

fn getitem(args: &[Value]) -> FunctionResult<Value> {
    let missing = || {
        ExecutionError::invalid_argument(
            "getitem",
            format!("no item {} in {}", args[1], args[0].type_name()),
        )
    };
    let index = |len: usize| -> Option<usize> {
        let i = match &args[1] {
            Value::Integer(i) => *i,
            Value::String(s) => s.trim().parse::<i64>().ok()?,
            _ => return None,
        };
        let len = i64::try_from(len).ok()?;
        let i = if i < 0 { i + len } else { i };
        usize::try_from(i).ok().filter(|&i| (i as i64) < len)
    };

    match &args[0] {
        Value::Map(map) => map
            .get(args[1].to_string().as_str())
            .cloned()
            .ok_or_else(missing),
        Value::List(items) => index(items.len())
            .map(|i| items[i].clone())
            .ok_or_else(missing),
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            index(chars.len())
                .map(|i| Value::String(chars[i].to_string()))
                .ok_or_else(missing)
        }
        other => Err(ExecutionError::invalid_argument(
            "getitem",
            format!("{} is not subscriptable", other.type_name()),
        )),
    }
}

pub(super) fn register_arithmetic_operations(registry: &mut FunctionRegistry) {
    registry.register_host_op(HostOp::new("add", 2, "add(a, b) -- Same as a + b.", add));
    registry.register_host_op(HostOp::new("sub", 2, "sub(a, b) -- Same as a - b.", sub));
    registry.register_host_op(HostOp::new("mul", 2, "mul(a, b) -- Same as a * b.", mul));
    registry.register_host_op(HostOp::new(
        "truediv",
        2,
        "truediv(a, b) -- Same as a / b.",
        truediv,
    ));
    registry.register_host_op(HostOp::new(
        "floordiv",
        2,
        "floordiv(a, b) -- Same as a // b.",
        floordiv,
    ));
    registry.register_host_op(HostOp::new("mod", 2, "mod(a, b) -- Same as a % b.", modulo));
    registry.register_host_op(HostOp::new("pow", 2, "pow(a, b) -- Same as a ** b.", pow));
    registry.register_host_op(HostOp::new("neg", 1, "neg(a) -- Same as -a.", neg));
    registry.register_host_op(HostOp::new("-", 1, "-(a) -- Same as -a.", neg));
    registry.register_host_op(HostOp::new("abs", 1, "abs(a) -- Same as abs(a).", abs));
    registry.register_host_op(HostOp::new(
        "concat",
        2,
        "concat(a, b) -- Same as a + b, for a and b sequences.",
        concat,
    ));
    registry.register_host_op(HostOp::new(
        "contains",
        2,
        "contains(a, b) -- Same as b in a (note reversed operands).",
        contains,
    ));
    registry.register_host_op(
        HostOp::new(
            "getitem",
            2,
            "getitem(a, b) -- Same as a[b]; b is taken literally.",
            getitem,
        )
        .with_policy(ArgumentPolicy::raw_at(&[1])),
    );

    let inplace: [(&'static str, &'static str, fn(&[Value]) -> FunctionResult<Value>); 8] = [
        ("iadd", "iadd(a, b) -- Same as a += b.", add),
        ("isub", "isub(a, b) -- Same as a -= b.", sub),
        ("imul", "imul(a, b) -- Same as a *= b.", mul),
        ("itruediv", "itruediv(a, b) -- Same as a /= b.", truediv),
        ("ifloordiv", "ifloordiv(a, b) -- Same as a //= b.", floordiv),
        ("imod", "imod(a, b) -- Same as a %= b.", modulo),
        ("ipow", "ipow(a, b) -- Same as a **= b.", pow),
        (
            "iconcat",
            "iconcat(a, b) -- Same as a += b, for a and b sequences.",
            concat,
        ),
    ];
    for (name, doc, func) in inplace {
        registry.register_host_op(HostOp::new(name, 2, doc, func).in_place());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Value::Integer(7), Value::Integer(2), Value::Integer(3))]
    #[case(Value::Integer(-7), Value::Integer(2), Value::Integer(-4))]
    #[case(Value::Float(7.5), Value::Integer(2), Value::Float(3.0))]
    fn test_floordiv_rounds_down(#[case] a: Value, #[case] b: Value, #[case] expected: Value) {
        assert_eq!(floordiv(&[a, b]).unwrap(), expected);
    }

    #[rstest]
    #[case(Value::Integer(-7), Value::Integer(3), Value::Integer(2))]
    #[case(Value::Integer(7), Value::Integer(-3), Value::Integer(-2))]
    #[case(Value::Integer(6), Value::Integer(3), Value::Integer(0))]
    fn test_mod_follows_divisor_sign(#[case] a: Value, #[case] b: Value, #[case] expected: Value) {
        assert_eq!(modulo(&[a, b]).unwrap(), expected);
    }

    #[test]
    fn test_truediv_always_floats() {
        assert_eq!(
            truediv(&[Value::Integer(1), Value::Integer(2)]).unwrap(),
            Value::Float(0.5)
        );
        assert!(truediv(&[Value::Integer(1), Value::Integer(0)]).is_err());
    }

    #[test]
    fn test_add_strings_and_numbers() {
        assert_eq!(
            add(&[Value::from("ab"), Value::from("cd")]).unwrap(),
            Value::from("abcd")
        );
        assert_eq!(
            add(&[Value::Integer(1), Value::Float(0.5)]).unwrap(),
            Value::Float(1.5)
        );
        assert!(add(&[Value::Integer(1), Value::from("x")]).is_err());
    }

    #[rstest]
    #[case(Value::from("ab"), Value::Integer(3), Value::from("ababab"))]
    #[case(Value::Integer(2), Value::from("x"), Value::from("xx"))]
    #[case(Value::from("ab"), Value::Integer(-1), Value::from(""))]
    fn test_mul_repeats_text(#[case] a: Value, #[case] b: Value, #[case] expected: Value) {
        assert_eq!(mul(&[a, b]).unwrap(), expected);
    }

    #[test]
    fn test_mul_rejects_oversized_repeat() {
        let err = mul(&[Value::from("ab"), Value::Integer(4_611_686_018_427_387_904)]).unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidArgument { .. }));
        assert!(mul(&[Value::from("x"), Value::Integer(i64::MAX)]).is_err());
    }

    #[test]
    fn test_pow() {
        assert_eq!(
            pow(&[Value::Integer(2), Value::Integer(10)]).unwrap(),
            Value::Integer(1024)
        );
        assert_eq!(
            pow(&[Value::Integer(2), Value::Integer(-1)]).unwrap(),
            Value::Float(0.5)
        );
    }

    #[test]
    fn test_getitem_by_key_and_index() {
        let list = Value::List(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(
            getitem(&[list.clone(), Value::from("-1")]).unwrap(),
            Value::from("b")
        );
        assert!(getitem(&[list, Value::Integer(2)]).is_err());

        let map = Value::from(serde_json::json!({"reads": 5}));
        assert_eq!(
            getitem(&[map, Value::from("reads")]).unwrap(),
            Value::Integer(5)
        );
    }
}
