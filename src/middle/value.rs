//! Compile time values and the arithmetic the optimizer folds with. Every
//! operation mirrors what the target computes at runtime; anything the target
//! would trap on or that has no finite result is reported as `None` and left
//! for runtime.

use super::ty::Type;
use crate::frontend::ast::{BinaryOperatorKind, UnaryOperatorKind};

#[derive(Debug, Clone, Copy)]
pub enum Value {
    Int(i32),
    Float(f32),
    Char(i8),
}

impl Value {
    pub fn ty(self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Float(_) => Type::Float,
            Value::Char(_) => Type::Char,
        }
    }

    pub fn zero(ty: Type) -> Self {
        match ty {
            Type::Int => Value::Int(0),
            Type::Float => Value::Float(0.0),
            Type::Char => Value::Char(0),
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Value::Int(i) => i == 0,
            Value::Float(f) => f == 0.0,
            Value::Char(c) => c == 0,
        }
    }

    pub fn is_one(self) -> bool {
        match self {
            Value::Int(i) => i == 1,
            Value::Float(f) => f == 1.0,
            Value::Char(c) => c == 1,
        }
    }

    pub fn unary(operator: UnaryOperatorKind, operand: Value) -> Option<Value> {
        match operator {
            UnaryOperatorKind::Negate => match operand {
                Value::Int(i) => Some(Value::Int(i.wrapping_neg())),
                Value::Float(f) => Some(Value::Float(-f)),
                Value::Char(c) => Some(Value::Char(c.wrapping_neg())),
            },
        }
    }

    /// Evaluates `lhs operator rhs`. Operands of different types are never
    /// folded; the type checker rejects such programs before we get here.
    pub fn binary(operator: BinaryOperatorKind, lhs: Value, rhs: Value) -> Option<Value> {
        use BinaryOperatorKind as Op;

        let value = match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => match operator {
                Op::Add => Value::Int(a.wrapping_add(b)),
                Op::Subtract => Value::Int(a.wrapping_sub(b)),
                Op::Multiply => Value::Int(a.wrapping_mul(b)),
                // Zero and `INT_MIN / -1` both trap
                Op::Divide => Value::Int(a.checked_div(b)?),
                _ => Value::compare(operator, a.cmp(&b))?,
            },
            // Chars are promoted to int by the target and truncated on store,
            // which is exactly wrapping 8-bit arithmetic
            (Value::Char(a), Value::Char(b)) => match operator {
                Op::Add => Value::Char(a.wrapping_add(b)),
                Op::Subtract => Value::Char(a.wrapping_sub(b)),
                Op::Multiply => Value::Char(a.wrapping_mul(b)),
                Op::Divide => {
                    if b == 0 {
                        return None;
                    }
                    Value::Char(a.wrapping_div(b))
                }
                _ => Value::compare(operator, a.cmp(&b))?,
            },
            (Value::Float(a), Value::Float(b)) => match operator {
                Op::Add => Value::Float(a + b),
                Op::Subtract => Value::Float(a - b),
                Op::Multiply => Value::Float(a * b),
                Op::Divide => Value::Float(a / b),
                _ => Value::compare(operator, a.partial_cmp(&b)?)?,
            },
            _ => return None,
        };

        match value {
            Value::Float(f) if !f.is_finite() => None,
            value => Some(value),
        }
    }

    fn compare(operator: BinaryOperatorKind, ordering: std::cmp::Ordering) -> Option<Value> {
        use std::cmp::Ordering;

        let result = match operator {
            BinaryOperatorKind::Equals => ordering == Ordering::Equal,
            BinaryOperatorKind::NotEquals => ordering != Ordering::Equal,
            BinaryOperatorKind::LessThan => ordering == Ordering::Less,
            BinaryOperatorKind::LessThanOrEqualTo => ordering != Ordering::Greater,
            BinaryOperatorKind::GreaterThan => ordering == Ordering::Greater,
            BinaryOperatorKind::GreaterThanOrEqualTo => ordering != Ordering::Less,
            BinaryOperatorKind::Add
            | BinaryOperatorKind::Subtract
            | BinaryOperatorKind::Multiply
            | BinaryOperatorKind::Divide => return None,
        };

        Some(Value::Int(result as i32))
    }
}

/// Floats compare by bit pattern so that facts holding the same literal are
/// always equal to each other
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Char(a), Value::Char(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

/// Renders the value as a C literal of its own type
impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // `2147483648` is not an int literal, so there is no `-2147483648`
            Value::Int(i32::MIN) => f.write_str("(-2147483647 - 1)"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => {
                let text = v.to_string();

                if text.contains('.') {
                    f.write_str(&text)
                } else {
                    write!(f, "{text}.0")
                }
            }
            Value::Char(c) => match *c as u8 {
                b'\n' => f.write_str("'\\n'"),
                b'\t' => f.write_str("'\\t'"),
                b'\r' => f.write_str("'\\r'"),
                b'\0' => f.write_str("'\\0'"),
                b'\\' => f.write_str("'\\\\'"),
                b'\'' => f.write_str("'\\''"),
                byte if byte.is_ascii_graphic() || byte == b' ' => {
                    write!(f, "'{}'", byte as char)
                }
                byte => write!(f, "'\\x{byte:02x}'"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn integer_division_truncates_toward_zero() {
        assert_eq!(
            Value::binary(BinaryOperatorKind::Divide, Value::Int(-7), Value::Int(2)),
            Some(Value::Int(-3))
        );
        assert_eq!(
            Value::binary(BinaryOperatorKind::Divide, Value::Int(200), Value::Int(4)),
            Some(Value::Int(50))
        );
    }

    #[test]
    fn trapping_operations_are_not_folded() {
        assert_eq!(
            Value::binary(BinaryOperatorKind::Divide, Value::Int(1), Value::Int(0)),
            None
        );
        assert_eq!(
            Value::binary(BinaryOperatorKind::Divide, Value::Int(i32::MIN), Value::Int(-1)),
            None
        );
        assert_eq!(
            Value::binary(BinaryOperatorKind::Divide, Value::Float(1.0), Value::Float(0.0)),
            None
        );
        assert_eq!(
            Value::binary(BinaryOperatorKind::Divide, Value::Char(5), Value::Char(0)),
            None
        );
    }

    #[test]
    fn integral_arithmetic_wraps() {
        assert_eq!(
            Value::binary(BinaryOperatorKind::Add, Value::Int(i32::MAX), Value::Int(1)),
            Some(Value::Int(i32::MIN))
        );
        assert_eq!(
            Value::binary(BinaryOperatorKind::Add, Value::Char(100), Value::Char(100)),
            Some(Value::Char(-56))
        );
        assert_eq!(
            Value::unary(UnaryOperatorKind::Negate, Value::Char(-128)),
            Some(Value::Char(-128))
        );
    }

    #[test]
    fn comparisons_produce_int() {
        assert_eq!(
            Value::binary(BinaryOperatorKind::LessThan, Value::Float(1.5), Value::Float(2.0)),
            Some(Value::Int(1))
        );
        assert_eq!(
            Value::binary(BinaryOperatorKind::Equals, Value::Char(65), Value::Char(66)),
            Some(Value::Int(0))
        );
        assert_eq!(
            Value::binary(BinaryOperatorKind::GreaterThanOrEqualTo, Value::Int(3), Value::Int(3)),
            Some(Value::Int(1))
        );
    }

    #[test]
    fn mixed_operands_are_not_folded() {
        assert_eq!(
            Value::binary(BinaryOperatorKind::Add, Value::Int(1), Value::Float(1.0)),
            None
        );
    }

    #[test]
    fn displays_as_c_literals() {
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Int(i32::MIN).to_string(), "(-2147483647 - 1)");
        assert_eq!(Value::Float(100.0).to_string(), "100.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Char(b'A' as i8).to_string(), "'A'");
        assert_eq!(Value::Char(b'\n' as i8).to_string(), "'\\n'");
        assert_eq!(Value::Char(-1).to_string(), "'\\xff'");
    }

    #[test]
    fn identities() {
        assert!(Value::zero(Type::Float).is_zero());
        assert!(Value::Char(1).is_one());
        assert!(!Value::Int(2).is_one());
        assert_eq!(Value::zero(Type::Char).ty(), Type::Char);
    }
}
