//! Strict type checker
//!
//! There are no implicit conversions: initializers, assignments, arithmetic
//! and comparisons all require identical types, so `int x = 1.0;` and
//! `'a' + 1` are both errors. Each function is walked once and every
//! mismatch in it is collected before moving on. Every expression is
//! annotated with its type along the way.
//!
//! An expression whose type could not be determined is typed `None` and its
//! parents stay quiet about it, so one mistake yields one diagnostic.

use tracing::debug;

use super::{
    diagnostic::{Diagnostic, DiagnosticKind},
    ir::{
        self, BinaryOperatorClass, Expression, ExpressionKind, FunctionDefinition, Statement,
        StatementKind,
    },
    symbol::{SymbolId, SymbolKind, SymbolTable},
    ty::Type,
};
use crate::frontend::lexer::Span;

/// Diagnostics of a whole module, grouped by where they were found
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TypeCheckResults {
    /// Found in global initializers
    pub global_diagnostics: Vec<Diagnostic>,
    /// One entry per function, in definition order
    pub function_diagnostics: Vec<(SymbolId, Vec<Diagnostic>)>,
}

impl TypeCheckResults {
    pub fn diagnostics_for(&self, function: SymbolId) -> &[Diagnostic] {
        self.function_diagnostics
            .iter()
            .find(|(symbol, _)| *symbol == function)
            .map(|(_, diagnostics)| diagnostics.as_slice())
            .unwrap_or_default()
    }

    pub fn is_clean(&self, function: SymbolId) -> bool {
        self.diagnostics_for(function).is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.global_diagnostics.is_empty()
            || self
                .function_diagnostics
                .iter()
                .any(|(_, diagnostics)| !diagnostics.is_empty())
    }

    /// Every diagnostic in source order
    pub fn all(&self) -> Vec<&Diagnostic> {
        let mut all: Vec<_> = self
            .global_diagnostics
            .iter()
            .chain(
                self.function_diagnostics
                    .iter()
                    .flat_map(|(_, diagnostics)| diagnostics),
            )
            .collect();

        all.sort_by_key(|diagnostic| diagnostic.span.start);
        all
    }
}

/// Checks every global initializer and function body, annotating expression
/// types in place
pub fn type_check_module(module: &mut ir::Module) -> TypeCheckResults {
    let mut results = TypeCheckResults::default();

    for global in &mut module.globals {
        let mut checker = TypeChecker::new(&module.symbols, None);

        if let Some(initializer) = &mut global.initializer {
            checker.check_initializer(global.symbol, initializer, global.span);
        }

        results.global_diagnostics.append(&mut checker.diagnostics);
    }

    for function in &mut module.functions {
        let diagnostics = type_check_function(&module.symbols, function);

        debug!(
            function = module.symbols.name(function.symbol),
            diagnostics = diagnostics.len(),
            "type checked function"
        );

        results
            .function_diagnostics
            .push((function.symbol, diagnostics));
    }

    results
}

pub fn type_check_function(
    symbols: &SymbolTable,
    function: &mut FunctionDefinition,
) -> Vec<Diagnostic> {
    let mut checker = TypeChecker::new(symbols, Some(function.return_type));
    checker.check_block(&mut function.body);
    checker.diagnostics
}

/// The context associated with type checking an individual body
struct TypeChecker<'a> {
    symbols: &'a SymbolTable,
    /// Declared return type of the function being checked
    return_type: Option<Type>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> TypeChecker<'a> {
    fn new(symbols: &'a SymbolTable, return_type: Option<Type>) -> Self {
        Self {
            symbols,
            return_type,
            diagnostics: Vec::new(),
        }
    }

    fn report(&mut self, kind: DiagnosticKind, span: Span, message: String) {
        self.diagnostics.push(Diagnostic {
            kind,
            span,
            message,
        });
    }

    fn check_block(&mut self, block: &mut ir::Block) {
        for statement in &mut block.statements {
            self.check_statement(statement);
        }
    }

    fn check_statement(&mut self, statement: &mut Statement) {
        let span = statement.span;

        match &mut statement.kind {
            StatementKind::Declaration {
                symbol,
                initializer,
            } => {
                if let Some(initializer) = initializer {
                    self.check_initializer(*symbol, initializer, span);
                }
            }
            StatementKind::Assignment { target, value } => {
                let expected = self.symbols.ty(*target);

                if let Some(actual) = self.check_expression(value).filter(|t| *t != expected) {
                    self.report(
                        DiagnosticKind::AssignmentTypeMismatch,
                        span,
                        format!(
                            "cannot assign {actual} to variable `{}` with type {expected}",
                            self.symbols.name(*target)
                        ),
                    );
                }
            }
            StatementKind::If {
                condition,
                positive,
                negative,
            } => {
                self.check_expression(condition);
                self.check_block(positive);
                self.check_block(negative);
            }
            StatementKind::While { condition, body } => {
                self.check_expression(condition);
                self.check_block(body);
            }
            StatementKind::Return(expression) => self.check_return(expression.as_mut(), span),
        }
    }

    fn check_initializer(&mut self, symbol: SymbolId, initializer: &mut Expression, span: Span) {
        let expected = self.symbols.ty(symbol);

        if let Some(actual) = self.check_expression(initializer).filter(|t| *t != expected) {
            self.report(
                DiagnosticKind::InitializerTypeMismatch,
                span,
                format!(
                    "initializer type {actual} does not match declared type {expected} of `{}`",
                    self.symbols.name(symbol)
                ),
            );
        }
    }

    fn check_return(&mut self, expression: Option<&mut Expression>, span: Span) {
        let Some(expected) = self.return_type else {
            return;
        };

        match expression {
            Some(expression) => {
                if let Some(actual) = self.check_expression(expression).filter(|t| *t != expected)
                {
                    self.report(
                        DiagnosticKind::ReturnTypeMismatch,
                        span,
                        format!(
                            "return type {actual} does not match the function signature's type {expected}"
                        ),
                    );
                }
            }
            None => self.report(
                DiagnosticKind::ReturnTypeMismatch,
                span,
                format!("missing return value in function returning {expected}"),
            ),
        }
    }

    /// Computes and records the type of `expression`. `None` means an error
    /// was already reported somewhere inside it.
    fn check_expression(&mut self, expression: &mut Expression) -> Option<Type> {
        let span = expression.span;

        let ty = match &mut expression.kind {
            ExpressionKind::Literal(value) => Some(value.ty()),
            ExpressionKind::Variable(symbol) => Some(self.symbols.ty(*symbol)),
            ExpressionKind::Unary { operand, .. } => self.check_expression(operand),
            ExpressionKind::Binary { operator, lhs, rhs } => {
                let operator = *operator;
                let lhs = self.check_expression(lhs);
                let rhs = self.check_expression(rhs);

                match operator.class() {
                    BinaryOperatorClass::Arithmetic => match (lhs, rhs) {
                        (Some(lhs), Some(rhs)) if lhs == rhs => Some(lhs),
                        (Some(lhs), Some(rhs)) => {
                            self.report(
                                DiagnosticKind::BinaryOperandTypeMismatch,
                                span,
                                format!(
                                    "expected left-hand side of `{operator}` ({lhs}) to match right-hand side ({rhs})"
                                ),
                            );
                            None
                        }
                        _ => None,
                    },
                    // The result of a comparison is an int whatever its operands
                    BinaryOperatorClass::Comparison => {
                        if let (Some(lhs), Some(rhs)) = (lhs, rhs) {
                            if lhs != rhs {
                                self.report(
                                    DiagnosticKind::ComparisonTypeMismatch,
                                    span,
                                    format!("cannot compare {lhs} with {rhs} using `{operator}`"),
                                );
                            }
                        }

                        Some(Type::Int)
                    }
                }
            }
            ExpressionKind::Call {
                function,
                arguments,
            } => {
                let function = *function;
                let argument_types: Vec<_> = arguments
                    .iter_mut()
                    .map(|argument| (argument.span, self.check_expression(argument)))
                    .collect();

                self.check_call_arguments(function, &argument_types, span);

                Some(self.symbols.ty(function))
            }
        };

        expression.ty = ty;
        ty
    }

    fn check_call_arguments(
        &mut self,
        function: SymbolId,
        arguments: &[(Span, Option<Type>)],
        span: Span,
    ) {
        let symbols = self.symbols;
        let SymbolKind::Function { parameter_types } = &symbols[function].kind else {
            return;
        };
        let name = symbols.name(function);

        if parameter_types.len() != arguments.len() {
            self.report(
                DiagnosticKind::ArgumentCountMismatch,
                span,
                format!(
                    "expected {} argument(s) to `{name}` but found {}",
                    parameter_types.len(),
                    arguments.len()
                ),
            );
            return;
        }

        for (position, ((argument_span, actual), expected)) in
            arguments.iter().zip(parameter_types).enumerate()
        {
            if let Some(actual) = actual.filter(|t| t != expected) {
                self.report(
                    DiagnosticKind::ArgumentTypeMismatch,
                    *argument_span,
                    format!(
                        "expected argument {} of `{name}` to be {expected} but found {actual}",
                        position + 1
                    ),
                );
            }
        }
    }
}
