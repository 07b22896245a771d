//! Read-only IR visitor plus the small analyses built on it

use hashbrown::HashSet;

use super::{Block, Expression, ExpressionKind, FunctionDefinition, Statement, StatementKind};
use crate::middle::symbol::SymbolId;

pub trait Visitor<'ir>: Sized {
    fn visit_function_definition(&mut self, function: &'ir FunctionDefinition) {
        walk_function_definition(self, function)
    }

    fn visit_block(&mut self, block: &'ir Block) {
        walk_block(self, block)
    }

    fn visit_statement(&mut self, statement: &'ir Statement) {
        walk_statement(self, statement)
    }

    fn visit_expression(&mut self, expression: &'ir Expression) {
        walk_expression(self, expression)
    }
}

pub fn walk_function_definition<'a>(
    visitor: &mut impl Visitor<'a>,
    function: &'a FunctionDefinition,
) {
    visitor.visit_block(&function.body);
}

pub fn walk_block<'a>(visitor: &mut impl Visitor<'a>, block: &'a Block) {
    for statement in &block.statements {
        visitor.visit_statement(statement);
    }
}

pub fn walk_statement<'a>(visitor: &mut impl Visitor<'a>, statement: &'a Statement) {
    match &statement.kind {
        StatementKind::Declaration { initializer, .. } => {
            if let Some(initializer) = initializer {
                visitor.visit_expression(initializer);
            }
        }
        StatementKind::Assignment { value, .. } => visitor.visit_expression(value),
        StatementKind::If {
            condition,
            positive,
            negative,
        } => {
            visitor.visit_expression(condition);
            visitor.visit_block(positive);
            visitor.visit_block(negative);
        }
        StatementKind::While { condition, body } => {
            visitor.visit_expression(condition);
            visitor.visit_block(body);
        }
        StatementKind::Return(expression) => {
            if let Some(expression) = expression {
                visitor.visit_expression(expression);
            }
        }
    }
}

pub fn walk_expression<'a>(visitor: &mut impl Visitor<'a>, expression: &'a Expression) {
    match &expression.kind {
        ExpressionKind::Literal(_) | ExpressionKind::Variable(_) => {}
        ExpressionKind::Unary { operand, .. } => visitor.visit_expression(operand),
        ExpressionKind::Binary { lhs, rhs, .. } => {
            visitor.visit_expression(lhs);
            visitor.visit_expression(rhs);
        }
        ExpressionKind::Call { arguments, .. } => {
            for argument in arguments {
                visitor.visit_expression(argument);
            }
        }
    }
}

/// Collects every symbol that is the target of an assignment
#[derive(Debug, Default)]
pub struct AssignedSymbols {
    pub symbols: HashSet<SymbolId>,
}

impl<'ir> Visitor<'ir> for AssignedSymbols {
    fn visit_statement(&mut self, statement: &'ir Statement) {
        if let StatementKind::Assignment { target, .. } = &statement.kind {
            self.symbols.insert(*target);
        }

        walk_statement(self, statement)
    }
}

/// Collects every symbol whose value is read somewhere
#[derive(Debug, Default)]
pub struct ReadSymbols {
    pub symbols: HashSet<SymbolId>,
}

impl<'ir> Visitor<'ir> for ReadSymbols {
    fn visit_expression(&mut self, expression: &'ir Expression) {
        if let ExpressionKind::Variable(symbol) = expression.kind {
            self.symbols.insert(symbol);
        }

        walk_expression(self, expression)
    }
}

#[derive(Debug, Default)]
struct CallFinder {
    found: bool,
}

impl<'ir> Visitor<'ir> for CallFinder {
    fn visit_expression(&mut self, expression: &'ir Expression) {
        if self.found {
            return;
        }

        if let ExpressionKind::Call { .. } = expression.kind {
            self.found = true;
            return;
        }

        walk_expression(self, expression)
    }
}

/// Whether evaluating `expression` calls a function. Calls may diverge or
/// touch globals, so they must never be folded away.
pub fn contains_call(expression: &Expression) -> bool {
    let mut finder = CallFinder::default();
    finder.visit_expression(expression);
    finder.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        frontend::lexer::Span,
        index::Index,
        middle::{ir::BinaryOperatorKind, value::Value},
    };

    fn variable(index: usize) -> Expression {
        Expression::new(Span::default(), ExpressionKind::Variable(SymbolId::new(index)))
    }

    #[test]
    fn finds_nested_calls() {
        let call = Expression::new(
            Span::default(),
            ExpressionKind::Call {
                function: SymbolId::new(0),
                arguments: vec![variable(1)],
            },
        );
        let sum = Expression::new(
            Span::default(),
            ExpressionKind::Binary {
                operator: BinaryOperatorKind::Add,
                lhs: Box::new(Expression::literal(Span::default(), Value::Int(1))),
                rhs: Box::new(call),
            },
        );

        assert!(contains_call(&sum));
        assert!(!contains_call(&variable(2)));
    }

    #[test]
    fn collects_assignments_in_nested_blocks() {
        let assign = |target: usize| Statement {
            span: Span::default(),
            kind: StatementKind::Assignment {
                target: SymbolId::new(target),
                value: variable(9),
            },
        };

        let block = Block::new(vec![
            assign(1),
            Statement {
                span: Span::default(),
                kind: StatementKind::While {
                    condition: variable(1),
                    body: Block::new(vec![assign(2)]),
                },
            },
        ]);

        let mut assigned = AssignedSymbols::default();
        assigned.visit_block(&block);

        assert_eq!(
            assigned.symbols,
            HashSet::from([SymbolId::new(1), SymbolId::new(2)])
        );
    }

    #[test]
    fn collects_reads_but_not_targets() {
        let block = Block::new(vec![Statement {
            span: Span::default(),
            kind: StatementKind::If {
                condition: variable(1),
                positive: Block::new(vec![Statement {
                    span: Span::default(),
                    kind: StatementKind::Assignment {
                        target: SymbolId::new(2),
                        value: variable(3),
                    },
                }]),
                negative: Block::default(),
            },
        }]);

        let mut read = ReadSymbols::default();
        read.visit_block(&block);

        assert_eq!(read.symbols, HashSet::from([SymbolId::new(1), SymbolId::new(3)]));
    }
}
