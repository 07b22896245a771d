//! This module contains all the code related to lowering an AST into IR
//!
//! Names have already been resolved, so lowering swaps identifiers for their
//! symbols, parses literal text into typed values and drops the purely
//! syntactic parts of the tree (groupings, missing else blocks).

use std::collections::BTreeMap;

use thiserror::Error;

use super::resolve::ModuleResolutions;
use crate::{
    frontend::{ast, lexer::Span},
    middle::{ir, symbol::SymbolId, value::Value},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoweringError {
    #[error("integer literal `{text}` does not fit in an int")]
    IntegerOutOfRange { text: String, span: Span },
    #[error("invalid float literal `{text}`")]
    InvalidFloat { text: String, span: Span },
    #[error("invalid character literal {text}")]
    InvalidChar { text: String, span: Span },
    #[error("name was not resolved before lowering")]
    UnresolvedName { span: Span },
}

impl LoweringError {
    pub fn span(&self) -> Span {
        match self {
            LoweringError::IntegerOutOfRange { span, .. }
            | LoweringError::InvalidFloat { span, .. }
            | LoweringError::InvalidChar { span, .. }
            | LoweringError::UnresolvedName { span } => *span,
        }
    }
}

type LoweringResult<T> = Result<T, LoweringError>;

pub fn lower_module(
    module: &ast::Module,
    resolutions: ModuleResolutions,
) -> LoweringResult<ir::Module> {
    let ModuleResolutions { symbols, names } = resolutions;
    let context = LoweringContext { names: &names };

    let mut globals = Vec::new();
    let mut functions = Vec::new();

    for item in &module.items {
        match &item.kind {
            ast::ItemKind::GlobalDeclaration(local) => {
                globals.push(ir::GlobalDeclaration {
                    symbol: context.symbol(&local.name)?,
                    span: local.span,
                    initializer: context.lower_optional_expression(local.initializer.as_deref())?,
                });
            }
            ast::ItemKind::FunctionDefinition(function) => {
                functions.push(context.lower_function_definition(function)?);
            }
        }
    }

    Ok(ir::Module {
        symbols,
        globals,
        functions,
    })
}

struct LoweringContext<'a> {
    names: &'a BTreeMap<ast::NodeId, SymbolId>,
}

impl LoweringContext<'_> {
    fn symbol(&self, identifier: &ast::Identifier) -> LoweringResult<SymbolId> {
        self.names
            .get(&identifier.id)
            .copied()
            .ok_or(LoweringError::UnresolvedName {
                span: identifier.span,
            })
    }

    fn lower_function_definition(
        &self,
        function: &ast::FunctionDefinition,
    ) -> LoweringResult<ir::FunctionDefinition> {
        let signature = &function.signature;

        let parameters = signature
            .parameters
            .parameters
            .iter()
            .map(|parameter| self.symbol(&parameter.name))
            .collect::<LoweringResult<_>>()?;

        Ok(ir::FunctionDefinition {
            symbol: self.symbol(&signature.name)?,
            span: function.span,
            parameters,
            return_type: signature.return_type.kind.into(),
            body: self.lower_block(&function.body)?,
        })
    }

    fn lower_block(&self, block: &ast::Block) -> LoweringResult<ir::Block> {
        let statements = block
            .statements
            .iter()
            .map(|statement| self.lower_statement(statement))
            .collect::<LoweringResult<_>>()?;

        Ok(ir::Block::new(statements))
    }

    fn lower_statement(&self, statement: &ast::Statement) -> LoweringResult<ir::Statement> {
        let kind = match &statement.kind {
            ast::StatementKind::Local(local) => ir::StatementKind::Declaration {
                symbol: self.symbol(&local.name)?,
                initializer: self.lower_optional_expression(local.initializer.as_deref())?,
            },
            ast::StatementKind::Assignment(assignment) => ir::StatementKind::Assignment {
                target: self.symbol(&assignment.target)?,
                value: self.lower_expression(&assignment.value)?,
            },
            ast::StatementKind::If(if_statement) => ir::StatementKind::If {
                condition: self.lower_expression(&if_statement.condition)?,
                positive: self.lower_block(&if_statement.positive)?,
                negative: match &if_statement.negative {
                    Some(negative) => self.lower_block(negative)?,
                    None => ir::Block::default(),
                },
            },
            ast::StatementKind::While(while_statement) => ir::StatementKind::While {
                condition: self.lower_expression(&while_statement.condition)?,
                body: self.lower_block(&while_statement.body)?,
            },
            ast::StatementKind::Return(expression) => {
                ir::StatementKind::Return(self.lower_optional_expression(expression.as_deref())?)
            }
        };

        Ok(ir::Statement {
            span: statement.span,
            kind,
        })
    }

    fn lower_optional_expression(
        &self,
        expression: Option<&ast::Expression>,
    ) -> LoweringResult<Option<ir::Expression>> {
        expression
            .map(|expression| self.lower_expression(expression))
            .transpose()
    }

    fn lower_expression(&self, expression: &ast::Expression) -> LoweringResult<ir::Expression> {
        let kind = match &expression.kind {
            ast::ExpressionKind::Literal(literal) => {
                return Ok(ir::Expression::literal(
                    expression.span,
                    lower_literal(literal)?,
                ));
            }
            ast::ExpressionKind::Identifier(identifier) => {
                ir::ExpressionKind::Variable(self.symbol(identifier)?)
            }
            // Groupings only exist to steer the parser
            ast::ExpressionKind::Grouping(inner) => {
                let mut lowered = self.lower_expression(inner)?;
                lowered.span = expression.span;
                return Ok(lowered);
            }
            ast::ExpressionKind::FunctionCall { target, arguments } => ir::ExpressionKind::Call {
                function: self.symbol(target)?,
                arguments: arguments
                    .arguments
                    .iter()
                    .map(|argument| self.lower_expression(argument))
                    .collect::<LoweringResult<_>>()?,
            },
            ast::ExpressionKind::Binary { lhs, operator, rhs } => ir::ExpressionKind::Binary {
                operator: operator.kind,
                lhs: Box::new(self.lower_expression(lhs)?),
                rhs: Box::new(self.lower_expression(rhs)?),
            },
            ast::ExpressionKind::Unary { operator, operand } => ir::ExpressionKind::Unary {
                operator: operator.kind,
                operand: Box::new(self.lower_expression(operand)?),
            },
        };

        Ok(ir::Expression::new(expression.span, kind))
    }
}

fn lower_literal(literal: &ast::Literal) -> LoweringResult<Value> {
    let text = literal.symbol.value();

    match literal.kind {
        ast::LiteralKind::Integer => parse_integer(text)
            .map(Value::Int)
            .ok_or_else(|| LoweringError::IntegerOutOfRange {
                text: text.to_owned(),
                span: literal.span,
            }),
        ast::LiteralKind::Float => text
            .parse::<f32>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::Float)
            .ok_or_else(|| LoweringError::InvalidFloat {
                text: text.to_owned(),
                span: literal.span,
            }),
        ast::LiteralKind::Char => parse_char(text)
            .map(|byte| Value::Char(byte as i8))
            .ok_or_else(|| LoweringError::InvalidChar {
                text: text.to_owned(),
                span: literal.span,
            }),
    }
}

/// Decimal, or octal when written with a leading zero
fn parse_integer(text: &str) -> Option<i32> {
    match text.strip_prefix('0') {
        Some(octal) if !octal.is_empty() => i32::from_str_radix(octal, 8).ok(),
        _ => text.parse().ok(),
    }
}

/// Parses a quoted character literal, escapes included, into its byte value
fn parse_char(text: &str) -> Option<u8> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;

    let Some(escape) = inner.strip_prefix('\\') else {
        return match inner.as_bytes() {
            [byte] if byte.is_ascii() => Some(*byte),
            _ => None,
        };
    };

    match escape {
        "n" => Some(b'\n'),
        "t" => Some(b'\t'),
        "r" => Some(b'\r'),
        "0" => Some(b'\0'),
        "\\" => Some(b'\\'),
        "'" => Some(b'\''),
        "\"" => Some(b'"'),
        hex => {
            let digits = hex.strip_prefix('x')?;

            if digits.is_empty() || digits.len() > 2 {
                return None;
            }

            u8::from_str_radix(digits, 16).ok()
        }
    }
}
