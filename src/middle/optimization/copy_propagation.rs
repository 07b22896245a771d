//! Copy propagation
//!
//! After `x = y;` reads of `x` become reads of `y` until either of them is
//! reassigned. Chains resolve to the variable at their end, so after
//! `c = b; d = c;` a read of `d` reads `b`. Constant propagation later turns
//! that into `b`'s value when it has one.

use super::dataflow::{Fact, Facts, ForwardPass};
use crate::middle::ir::{Expression, ExpressionKind};

#[derive(Debug, Default, Clone, Copy)]
pub struct CopyPropagation;

impl ForwardPass for CopyPropagation {
    const NAME: &'static str = "copy propagation";

    fn transfer(&self, value: &Expression, facts: &Facts) -> Fact {
        match value.kind {
            ExpressionKind::Variable(source) => Fact::Copy(facts.copy_root(source)),
            _ => Fact::Bottom,
        }
    }

    fn rewrite(&self, expression: &mut Expression, facts: &Facts) -> bool {
        match &mut expression.kind {
            ExpressionKind::Literal(_) => false,
            ExpressionKind::Variable(symbol) => {
                let root = facts.copy_root(*symbol);

                if root == *symbol {
                    return false;
                }

                *symbol = root;
                true
            }
            ExpressionKind::Unary { operand, .. } => self.rewrite(operand, facts),
            ExpressionKind::Binary { lhs, rhs, .. } => {
                let lhs = self.rewrite(lhs, facts);
                let rhs = self.rewrite(rhs, facts);
                lhs || rhs
            }
            ExpressionKind::Call { arguments, .. } => arguments
                .iter_mut()
                .fold(false, |changed, argument| {
                    self.rewrite(argument, facts) || changed
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use crate::{
        driver::lower_source_file,
        frontend::SourceFile,
        middle::optimization::{
            Pass,
            tests::{optimized, run_single_pass},
        },
    };

    fn propagate(source: &str) -> String {
        run_single_pass(source, Pass::CopyPropagation)
    }

    #[test]
    fn chains_resolve_to_their_source() {
        assert_eq!(
            propagate(indoc! {"
                int main(int b) {
                    int c = b;
                    int d = c;
                    int e = d;
                    return e * 2;
                }
            "}),
            indoc! {"
                int main(int b) {
                    int c = b;
                    int d = b;
                    int e = b;
                    return b * 2;
                }
            "}
        );
    }

    #[test]
    fn reassigning_the_source_kills_the_copy() {
        assert_eq!(
            propagate(indoc! {"
                int main(int a, int p) {
                    int b = a;
                    int before = b + 1;
                    a = p;
                    return b + a;
                }
            "}),
            indoc! {"
                int main(int a, int p) {
                    int b = a;
                    int before = a + 1;
                    a = p;
                    return b + p;
                }
            "}
        );
    }

    #[test]
    fn reassigning_the_holder_kills_the_copy() {
        assert_eq!(
            propagate(indoc! {"
                int main(int a, int p) {
                    int b = a;
                    b = p * 2;
                    return b;
                }
            "}),
            indoc! {"
                int main(int a, int p) {
                    int b = a;
                    b = p * 2;
                    return b;
                }
            "}
        );
    }

    #[test]
    fn copies_must_agree_across_branches() {
        assert_eq!(
            propagate(indoc! {"
                int main(int a, int b, int p) {
                    int x = a;
                    int y = a;
                    if (p > 0) {
                        y = b;
                    }
                    return x + y;
                }
            "}),
            indoc! {"
                int main(int a, int b, int p) {
                    int x = a;
                    int y = a;
                    if (p > 0) {
                        y = b;
                    }
                    return a + y;
                }
            "}
        );
    }

    #[test]
    fn copies_of_loop_variables_do_not_escape_the_loop() {
        assert_eq!(
            propagate(indoc! {"
                int main(int n) {
                    int i = 0;
                    int last = i;
                    while (i < n) {
                        last = i;
                        i = i + 1;
                    }
                    return last;
                }
            "}),
            indoc! {"
                int main(int n) {
                    int i = 0;
                    int last = i;
                    while (i < n) {
                        last = i;
                        i = i + 1;
                    }
                    return last;
                }
            "}
        );
    }

    #[test]
    fn assigned_globals_are_never_copied() {
        assert_eq!(
            propagate(indoc! {"
                int counter = 0;

                int main() {
                    int seen = counter;
                    int ignored = bump();
                    return seen;
                }

                int bump() {
                    counter = counter + 1;
                    return counter;
                }
            "}),
            indoc! {"
                int counter = 0;

                int main() {
                    int seen = counter;
                    int ignored = bump();
                    return seen;
                }

                int bump() {
                    counter = counter + 1;
                    return counter;
                }
            "}
        );
    }

    #[test]
    fn copies_of_block_locals_end_with_the_block() {
        let source = indoc! {"
            int main(int p) {
                int x;
                if (p > 0) {
                    int y = p * 2;
                    x = y;
                } else {
                    return 0;
                }
                return x;
            }
        "};

        assert_eq!(propagate(source), source);

        let output = optimized(source);
        assert_eq!(output, source);
        assert!(lower_source_file(&SourceFile::new_in_memory(output)).is_ok());
    }
}
