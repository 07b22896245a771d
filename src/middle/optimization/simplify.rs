//! Algebraic simplification
//!
//! Identity and annihilator laws applied bottom up, so `((x + 0) * 1) / 1`
//! collapses to `x` in one go. An operand counts as `0` or `1` when it is that
//! literal or a variable currently known to hold it; the facts are only read,
//! variables are never replaced here.
//!
//! | pattern             | result   |
//! |---------------------|----------|
//! | `e + 0`, `0 + e`    | `e`      |
//! | `e - 0`             | `e`      |
//! | `0 - e`             | `-e`     |
//! | `x - x`             | `0`      |
//! | `e * 1`, `1 * e`    | `e`      |
//! | `e / 1`             | `e`      |
//! | `e * 0`, `0 * e`    | `0`      |
//!
//! `x - x` only folds for a variable `x` of integral type; for a float it is
//! NaN when `x` is infinite. `x / x` and `0 / x` are never rewritten since
//! both trap when `x` is zero.

use super::{
    constant_propagation::constant_transfer,
    dataflow::{Fact, Facts, ForwardPass},
};
use crate::middle::{
    ir::{BinaryOperatorKind, Expression, ExpressionKind, UnaryOperatorKind, visit::contains_call},
    ty::Type,
    value::Value,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct AlgebraicSimplification;

impl ForwardPass for AlgebraicSimplification {
    const NAME: &'static str = "algebraic simplification";

    fn transfer(&self, value: &Expression, facts: &Facts) -> Fact {
        constant_transfer(value, facts)
    }

    fn rewrite(&self, expression: &mut Expression, facts: &Facts) -> bool {
        simplify(expression, facts)
    }
}

/// Simplifies the operands first, then the node itself
pub fn simplify(expression: &mut Expression, facts: &Facts) -> bool {
    let mut changed = match &mut expression.kind {
        ExpressionKind::Literal(_) | ExpressionKind::Variable(_) => false,
        ExpressionKind::Unary { operand, .. } => simplify(operand, facts),
        ExpressionKind::Binary { lhs, rhs, .. } => {
            let lhs = simplify(lhs, facts);
            let rhs = simplify(rhs, facts);
            lhs || rhs
        }
        ExpressionKind::Call { arguments, .. } => arguments
            .iter_mut()
            .fold(false, |changed, argument| simplify(argument, facts) || changed),
    };

    if let Some(simplified) = apply_identity(expression, facts) {
        *expression = simplified;
        changed = true;
    }

    changed
}

fn apply_identity(expression: &Expression, facts: &Facts) -> Option<Expression> {
    let ExpressionKind::Binary { operator, lhs, rhs } = &expression.kind else {
        return None;
    };

    let left = known_value(lhs, facts);
    let right = known_value(rhs, facts);
    let is_zero = |value: Option<Value>| value.is_some_and(Value::is_zero);
    let is_one = |value: Option<Value>| value.is_some_and(Value::is_one);

    let simplified = match operator {
        BinaryOperatorKind::Add if is_zero(right) => (**lhs).clone(),
        BinaryOperatorKind::Add if is_zero(left) => (**rhs).clone(),
        BinaryOperatorKind::Subtract if is_zero(right) => (**lhs).clone(),
        BinaryOperatorKind::Subtract if is_zero(left) => Expression {
            span: expression.span,
            ty: expression.ty,
            kind: ExpressionKind::Unary {
                operator: UnaryOperatorKind::Negate,
                operand: rhs.clone(),
            },
        },
        BinaryOperatorKind::Subtract
            if same_variable(lhs, rhs) && expression.ty.is_some_and(Type::is_integral) =>
        {
            Expression::literal(expression.span, Value::zero(expression.ty?))
        }
        BinaryOperatorKind::Multiply if is_one(right) => (**lhs).clone(),
        BinaryOperatorKind::Multiply if is_one(left) => (**rhs).clone(),
        // The discarded side must still be evaluated when it calls something
        BinaryOperatorKind::Multiply if is_zero(right) && !contains_call(lhs) => {
            Expression::literal(expression.span, right.map(|zero| Value::zero(zero.ty()))?)
        }
        BinaryOperatorKind::Multiply if is_zero(left) && !contains_call(rhs) => {
            Expression::literal(expression.span, left.map(|zero| Value::zero(zero.ty()))?)
        }
        BinaryOperatorKind::Divide if is_one(right) => (**lhs).clone(),
        _ => return None,
    };

    Some(simplified)
}

/// The value of a literal, or of a variable with a constant fact
fn known_value(expression: &Expression, facts: &Facts) -> Option<Value> {
    match expression.kind {
        ExpressionKind::Variable(symbol) => facts.constant(symbol),
        _ => expression.as_literal(),
    }
}

fn same_variable(lhs: &Expression, rhs: &Expression) -> bool {
    match (&lhs.kind, &rhs.kind) {
        (ExpressionKind::Variable(lhs), ExpressionKind::Variable(rhs)) => lhs == rhs,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use crate::middle::optimization::{Pass, tests::run_single_pass};

    fn simplified(source: &str) -> String {
        run_single_pass(source, Pass::AlgebraicSimplification)
    }

    #[test]
    fn identities_disappear() {
        assert_eq!(
            simplified(indoc! {"
                int main(int e) {
                    int a = e + 0;
                    int b = 0 + e;
                    int c = e - 0;
                    int d = e * 1;
                    int f = 1 * e;
                    int g = e / 1;
                    int h = e * 0;
                    int i = 0 * e;
                    return 0 - e;
                }
            "}),
            indoc! {"
                int main(int e) {
                    int a = e;
                    int b = e;
                    int c = e;
                    int d = e;
                    int f = e;
                    int g = e;
                    int h = 0;
                    int i = 0;
                    return -e;
                }
            "}
        );
    }

    #[test]
    fn zero_keeps_the_operand_type() {
        assert_eq!(
            simplified(indoc! {"
                float main(float f, char c) {
                    char z = c * '\\0';
                    return f * 0.0;
                }
            "}),
            indoc! {"
                float main(float f, char c) {
                    char z = '\\0';
                    return 0.0;
                }
            "}
        );
    }

    #[test]
    fn nested_identities_collapse_in_one_pass() {
        assert_eq!(
            simplified("int main(int x) { return ((x + 0) * 1) / 1; }"),
            "int main(int x) {\n    return x;\n}\n"
        );
    }

    #[test]
    fn known_operands_fold_but_unknown_ones_survive() {
        assert_eq!(
            simplified(indoc! {"
                int main() {
                    int x = 10;
                    int y = 5;
                    int z;
                    int result = x * 1 + y * 0 + (z - 0);
                    return x - z;
                }
            "}),
            indoc! {"
                int main() {
                    int x = 10;
                    int y = 5;
                    int z;
                    int result = x + z;
                    return x - z;
                }
            "}
        );
    }

    #[test]
    fn constant_facts_act_as_identities() {
        assert_eq!(
            simplified(indoc! {"
                int main(int e) {
                    int one = 1;
                    int zero = 0;
                    int a = e * one;
                    int b = zero + e;
                    return a + b;
                }
            "}),
            indoc! {"
                int main(int e) {
                    int one = 1;
                    int zero = 0;
                    int a = e;
                    int b = e;
                    return a + b;
                }
            "}
        );
    }

    #[test]
    fn calls_are_not_multiplied_away() {
        assert_eq!(
            simplified(indoc! {"
                int main(int e) {
                    return tick() * 0 + e * 0;
                }

                int tick() {
                    return 1;
                }
            "}),
            indoc! {"
                int main(int e) {
                    return tick() * 0;
                }

                int tick() {
                    return 1;
                }
            "}
        );
    }

    #[test]
    fn integral_self_difference_is_zero() {
        assert_eq!(
            simplified(indoc! {"
                float main(int e, int d, char c, float f) {
                    int a = e - e;
                    char b = c - c;
                    int g = e - d;
                    return f - f;
                }
            "}),
            indoc! {"
                float main(int e, int d, char c, float f) {
                    int a = 0;
                    char b = '\\0';
                    int g = e - d;
                    return f - f;
                }
            "}
        );
    }

    #[test]
    fn self_quotient_is_not_an_identity() {
        let source = "int main(int e) {\n    return e / e;\n}\n";

        assert_eq!(simplified(source), source);
    }

    #[test]
    fn zero_dividend_is_not_an_identity() {
        let source = "int main(int e) {\n    return 0 / e;\n}\n";

        assert_eq!(simplified(source), source);
    }
}
