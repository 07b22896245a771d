//! The intermediate representation the type checker and the optimizer work
//! on. Names are resolved to [`SymbolId`]s, groupings are gone and every `if`
//! has an else block. Passes rewrite expression trees in place.

use super::{symbol::SymbolTable, ty::Type, value::Value};
use crate::frontend::lexer::Span;
pub use crate::{
    frontend::ast::{BinaryOperatorClass, BinaryOperatorKind, UnaryOperatorKind},
    middle::symbol::SymbolId,
};

pub mod pretty_print;
pub mod visit;

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub symbols: SymbolTable,
    pub globals: Vec<GlobalDeclaration>,
    pub functions: Vec<FunctionDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalDeclaration {
    pub symbol: SymbolId,
    pub span: Span,
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub symbol: SymbolId,
    pub span: Span,
    pub parameters: Vec<SymbolId>,
    pub return_type: Type,
    pub body: Block,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub span: Span,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Declaration {
        symbol: SymbolId,
        initializer: Option<Expression>,
    },
    Assignment {
        target: SymbolId,
        value: Expression,
    },
    If {
        condition: Expression,
        positive: Block,
        negative: Block,
    },
    While {
        condition: Expression,
        body: Block,
    },
    Return(Option<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub span: Span,
    /// Filled in by the type checker; `None` until then, and for operands
    /// whose type could not be determined
    pub ty: Option<Type>,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Literal(Value),
    Variable(SymbolId),
    Unary {
        operator: UnaryOperatorKind,
        operand: Box<Expression>,
    },
    Binary {
        operator: BinaryOperatorKind,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Call {
        function: SymbolId,
        arguments: Vec<Expression>,
    },
}

impl Expression {
    pub fn new(span: Span, kind: ExpressionKind) -> Self {
        Self {
            span,
            ty: None,
            kind,
        }
    }

    /// A literal is always typed, whether or not the checker has run
    pub fn literal(span: Span, value: Value) -> Self {
        Self {
            span,
            ty: Some(value.ty()),
            kind: ExpressionKind::Literal(value),
        }
    }

    pub fn as_literal(&self) -> Option<Value> {
        match self.kind {
            ExpressionKind::Literal(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ExpressionKind::Literal(_))
    }
}

impl Module {
    pub fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions
            .iter()
            .find(|function| self.symbols.name(function.symbol) == name)
    }
}
