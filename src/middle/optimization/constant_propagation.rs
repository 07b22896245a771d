//! Constant propagation
//!
//! Variables assigned an expression whose leaves are all literals or known
//! constants hold that constant until reassigned. Every evaluable subtree is
//! replaced by the literal it evaluates to, which also folds constant
//! arithmetic that never touches a variable.

use super::dataflow::{Fact, Facts, ForwardPass};
use crate::middle::{
    ir::{Expression, ExpressionKind},
    value::Value,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct ConstantPropagation;

impl ForwardPass for ConstantPropagation {
    const NAME: &'static str = "constant propagation";

    fn transfer(&self, value: &Expression, facts: &Facts) -> Fact {
        constant_transfer(value, facts)
    }

    fn rewrite(&self, expression: &mut Expression, facts: &Facts) -> bool {
        fold(expression, facts)
    }
}

/// Constant if `value` evaluates under `facts`, unknown otherwise
pub fn constant_transfer(value: &Expression, facts: &Facts) -> Fact {
    match evaluate(value, facts) {
        Some(value) => Fact::Constant(value),
        None => Fact::Bottom,
    }
}

/// Evaluates `expression` the way the target would. `None` if a leaf is not
/// a known constant, the expression calls a function or the arithmetic is not
/// evaluable at compile time.
pub fn evaluate(expression: &Expression, facts: &Facts) -> Option<Value> {
    match &expression.kind {
        ExpressionKind::Literal(value) => Some(*value),
        ExpressionKind::Variable(symbol) => facts.constant(*symbol),
        ExpressionKind::Unary { operator, operand } => {
            Value::unary(*operator, evaluate(operand, facts)?)
        }
        ExpressionKind::Binary { operator, lhs, rhs } => {
            Value::binary(*operator, evaluate(lhs, facts)?, evaluate(rhs, facts)?)
        }
        ExpressionKind::Call { .. } => None,
    }
}

/// Replaces every maximal evaluable subtree that isn't already a literal
fn fold(expression: &mut Expression, facts: &Facts) -> bool {
    if expression.is_literal() {
        return false;
    }

    if let Some(value) = evaluate(expression, facts) {
        *expression = Expression::literal(expression.span, value);
        return true;
    }

    match &mut expression.kind {
        ExpressionKind::Literal(_) | ExpressionKind::Variable(_) => false,
        ExpressionKind::Unary { operand, .. } => fold(operand, facts),
        ExpressionKind::Binary { lhs, rhs, .. } => {
            let lhs = fold(lhs, facts);
            let rhs = fold(rhs, facts);
            lhs || rhs
        }
        ExpressionKind::Call { arguments, .. } => arguments
            .iter_mut()
            .fold(false, |changed, argument| fold(argument, facts) || changed),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use crate::middle::optimization::{
        Pass,
        tests::{optimized, run_single_pass},
    };

    fn propagate(source: &str) -> String {
        run_single_pass(source, Pass::ConstantPropagation)
    }

    #[test]
    fn folds_straight_line_code() {
        assert_eq!(
            propagate(indoc! {"
                int main() {
                    int a = 6;
                    int b = a * 7;
                    int c = b / 4 - -3;
                    return c + a;
                }
            "}),
            indoc! {"
                int main() {
                    int a = 6;
                    int b = 42;
                    int c = 13;
                    return 19;
                }
            "}
        );
    }

    #[test]
    fn reassignment_uses_the_newest_value() {
        assert_eq!(
            propagate(indoc! {"
                int main() {
                    int a = 5;
                    int b = a;
                    a = 15;
                    int c = a + 1;
                    return b;
                }
            "}),
            indoc! {"
                int main() {
                    int a = 5;
                    int b = 5;
                    a = 15;
                    int c = 16;
                    return 5;
                }
            "}
        );
    }

    #[test]
    fn reads_before_writes_stay_symbolic() {
        assert_eq!(
            propagate(indoc! {"
                int main(int p) {
                    int x;
                    int y = x + 1;
                    x = p * 2;
                    return x + y;
                }
            "}),
            indoc! {"
                int main(int p) {
                    int x;
                    int y = x + 1;
                    x = p * 2;
                    return x + y;
                }
            "}
        );
    }

    #[test]
    fn branches_must_agree() {
        assert_eq!(
            propagate(indoc! {"
                int main(int p) {
                    int same = 1;
                    int different = 1;
                    if (p > 0) {
                        same = 2;
                        different = 2;
                    } else {
                        same = 2;
                        different = 3;
                    }
                    return same * different;
                }
            "}),
            indoc! {"
                int main(int p) {
                    int same = 1;
                    int different = 1;
                    if (p > 0) {
                        same = 2;
                        different = 2;
                    } else {
                        same = 2;
                        different = 3;
                    }
                    return 2 * different;
                }
            "}
        );
    }

    #[test]
    fn returning_branch_does_not_spoil_the_join() {
        assert_eq!(
            propagate(indoc! {"
                int main(int p) {
                    int x = 1;
                    if (p > 0) {
                        x = 2;
                        return x;
                    }
                    return x;
                }
            "}),
            indoc! {"
                int main(int p) {
                    int x = 1;
                    if (p > 0) {
                        x = 2;
                        return 2;
                    }
                    return 1;
                }
            "}
        );
    }

    #[test]
    fn loops_keep_only_invariant_facts() {
        assert_eq!(
            propagate(indoc! {"
                int main() {
                    int step = 2;
                    int i = 0;
                    int total = 0;
                    while (i < 10) {
                        total = total + step;
                        i = i + 1;
                    }
                    return total + step;
                }
            "}),
            indoc! {"
                int main() {
                    int step = 2;
                    int i = 0;
                    int total = 0;
                    while (i < 10) {
                        total = total + 2;
                        i = i + 1;
                    }
                    return total + 2;
                }
            "}
        );
    }

    #[test]
    fn unfoldable_arithmetic_is_left_for_runtime() {
        assert_eq!(
            propagate(indoc! {"
                int main() {
                    int zero = 0;
                    float none = 0.0;
                    int q = 7 / zero;
                    float f = 1.0 / none;
                    return q;
                }
            "}),
            indoc! {"
                int main() {
                    int zero = 0;
                    float none = 0.0;
                    int q = 7 / 0;
                    float f = 1.0 / 0.0;
                    return q;
                }
            "}
        );
    }

    #[test]
    fn calls_are_never_folded() {
        assert_eq!(
            optimized(indoc! {"
                int main() {
                    int a = 2;
                    return id(a * 3) + a;
                }

                int id(int x) {
                    return x;
                }
            "}),
            indoc! {"
                int main() {
                    int a = 2;
                    return id(6) + 2;
                }

                int id(int x) {
                    return x;
                }
            "}
        );
    }

    #[test]
    fn chars_wrap_like_the_target() {
        // 'x' * 3 is 360, which wraps to 104
        assert_eq!(
            propagate("char main() { return 'x' * '\\x03'; }"),
            "char main() {\n    return 'h';\n}\n"
        );
    }
}
