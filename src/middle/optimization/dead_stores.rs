//! Dead store elimination
//!
//! Once propagation has replaced every read of a variable, the writes to it
//! are left behind. This pass removes writes to variables the function never
//! reads, and then the declarations of variables nothing writes any more.
//! Stores whose value calls a function stay, the call has to happen. Globals
//! other functions may read are never touched.

use super::dataflow::ModuleFacts;
use crate::middle::{
    ir::{
        Block, FunctionDefinition, Statement, StatementKind,
        visit::{AssignedSymbols, ReadSymbols, Visitor, contains_call},
    },
    symbol::SymbolId,
};

/// Removes dead stores from `function` once. Returns whether anything was
/// removed.
pub fn eliminate_dead_stores(function: &mut FunctionDefinition, module: &ModuleFacts) -> bool {
    let mut read = ReadSymbols::default();
    read.visit_function_definition(function);

    let is_dead = |symbol: SymbolId| {
        !read.symbols.contains(&symbol) && !module.untracked.contains(&symbol)
    };

    let dead_store = |statement: &Statement| match &statement.kind {
        StatementKind::Assignment { target, value } => is_dead(*target) && !contains_call(value),
        _ => false,
    };
    let removed_stores = sweep(&mut function.body, &dead_store);

    // Assignments that had to stay still need their declaration
    let mut assigned = AssignedSymbols::default();
    assigned.visit_function_definition(function);

    let dead_declaration = |statement: &Statement| match &statement.kind {
        StatementKind::Declaration {
            symbol,
            initializer,
        } => {
            is_dead(*symbol)
                && !assigned.symbols.contains(symbol)
                && !initializer.as_ref().is_some_and(contains_call)
        }
        _ => false,
    };
    let removed_declarations = sweep(&mut function.body, &dead_declaration);

    removed_stores || removed_declarations
}

/// Removes every statement of `block` and its nested blocks that `is_dead`
/// picks out
fn sweep(block: &mut Block, is_dead: &impl Fn(&Statement) -> bool) -> bool {
    let mut changed = false;

    for statement in &mut block.statements {
        match &mut statement.kind {
            StatementKind::If {
                positive, negative, ..
            } => {
                changed |= sweep(positive, is_dead);
                changed |= sweep(negative, is_dead);
            }
            StatementKind::While { body, .. } => changed |= sweep(body, is_dead),
            _ => {}
        }
    }

    let before = block.statements.len();
    block.statements.retain(|statement| !is_dead(statement));

    changed || block.statements.len() != before
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use crate::middle::optimization::{Pass, tests::run_single_pass};

    fn eliminated(source: &str) -> String {
        run_single_pass(source, Pass::DeadStoreElimination)
    }

    #[test]
    fn unread_locals_disappear() {
        assert_eq!(
            eliminated(indoc! {"
                int main(int p) {
                    int unused = p * 2;
                    int kept = p + 1;
                    if (p > 0) {
                        unused = 3;
                        kept = kept + 1;
                    }
                    return kept;
                }
            "}),
            indoc! {"
                int main(int p) {
                    int kept = p + 1;
                    if (p > 0) {
                        kept = kept + 1;
                    }
                    return kept;
                }
            "}
        );
    }

    #[test]
    fn calls_are_still_made() {
        assert_eq!(
            eliminated(indoc! {"
                int main() {
                    int called = tick();
                    int later;
                    later = tick() + 1;
                    int gone;
                    gone = 4;
                    return 0;
                }

                int tick() {
                    return 1;
                }
            "}),
            indoc! {"
                int main() {
                    int called = tick();
                    int later;
                    later = tick() + 1;
                    return 0;
                }

                int tick() {
                    return 1;
                }
            "}
        );
    }

    #[test]
    fn stores_to_assigned_globals_stay() {
        let source = indoc! {"
            int counter = 0;

            int main() {
                counter = 5;
                return 1;
            }
        "};

        assert_eq!(eliminated(source), source);
    }
}
