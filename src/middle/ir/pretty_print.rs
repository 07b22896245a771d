//! Renders the IR back to C source. Output is coloured for the terminal; use
//! the `*_plain` helpers for text that is compared or written to files.

use core::fmt::{self, Write};

use colored::Colorize;
use itertools::Itertools;

use super::{
    BinaryOperatorKind, Block, Expression, ExpressionKind, FunctionDefinition, GlobalDeclaration,
    Module, Statement, StatementKind, SymbolId,
};
use crate::middle::{symbol::SymbolTable, value::Value};

const INDENT: &str = "    ";

pub fn pretty_print_module(module: &Module) {
    print!("{}", module.display());
}

pub fn render_module_plain(module: &Module) -> String {
    strip_ansi_escapes::strip_str(module.display().to_string())
}

pub fn render_function_plain(symbols: &SymbolTable, function: &FunctionDefinition) -> String {
    strip_ansi_escapes::strip_str(function.display(symbols).to_string())
}

pub fn render_expression_plain(symbols: &SymbolTable, expression: &Expression) -> String {
    strip_ansi_escapes::strip_str(expression.display(symbols).to_string())
}

pub struct DisplayModule<'ir> {
    module: &'ir Module,
}

pub struct DisplayFunction<'ir> {
    symbols: &'ir SymbolTable,
    function: &'ir FunctionDefinition,
}

pub struct DisplayExpression<'ir> {
    symbols: &'ir SymbolTable,
    expression: &'ir Expression,
}

impl Module {
    pub fn display(&self) -> DisplayModule<'_> {
        DisplayModule { module: self }
    }
}

impl FunctionDefinition {
    pub fn display<'ir>(&'ir self, symbols: &'ir SymbolTable) -> DisplayFunction<'ir> {
        DisplayFunction {
            symbols,
            function: self,
        }
    }
}

impl Expression {
    pub fn display<'ir>(&'ir self, symbols: &'ir SymbolTable) -> DisplayExpression<'ir> {
        DisplayExpression {
            symbols,
            expression: self,
        }
    }
}

impl fmt::Display for DisplayModule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let printer = Printer {
            symbols: &self.module.symbols,
        };

        for global in &self.module.globals {
            printer.global(f, global)?;
        }

        for (i, function) in self.module.functions.iter().enumerate() {
            if i > 0 || !self.module.globals.is_empty() {
                writeln!(f)?;
            }

            printer.function(f, function)?;
        }

        Ok(())
    }
}

impl fmt::Display for DisplayFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Printer {
            symbols: self.symbols,
        }
        .function(f, self.function)
    }
}

impl fmt::Display for DisplayExpression<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Printer {
            symbols: self.symbols,
        }
        .expression(f, self.expression)
    }
}

struct Printer<'ir> {
    symbols: &'ir SymbolTable,
}

impl Printer<'_> {
    fn global(&self, f: &mut impl Write, global: &GlobalDeclaration) -> fmt::Result {
        self.declaration(f, global.symbol, global.initializer.as_ref())?;
        writeln!(f)
    }

    fn function(&self, f: &mut impl Write, function: &FunctionDefinition) -> fmt::Result {
        let parameters = function
            .parameters
            .iter()
            .map(|parameter| {
                format!(
                    "{} {}",
                    self.symbols.ty(*parameter).colored(),
                    self.symbols.name(*parameter)
                )
            })
            .join(", ");

        writeln!(
            f,
            "{} {}({parameters}) {{",
            function.return_type.colored(),
            self.symbols.name(function.symbol).blue(),
        )?;

        self.block_contents(f, &function.body, 1)?;

        writeln!(f, "}}")
    }

    fn block_contents(&self, f: &mut impl Write, block: &Block, depth: usize) -> fmt::Result {
        for statement in &block.statements {
            self.statement(f, statement, depth)?;
        }

        Ok(())
    }

    fn statement(&self, f: &mut impl Write, statement: &Statement, depth: usize) -> fmt::Result {
        let indent = INDENT.repeat(depth);

        match &statement.kind {
            StatementKind::Declaration {
                symbol,
                initializer,
            } => {
                write!(f, "{indent}")?;
                self.declaration(f, *symbol, initializer.as_ref())?;
                writeln!(f)
            }
            StatementKind::Assignment { target, value } => {
                write!(f, "{indent}{} = ", self.symbols.name(*target))?;
                self.expression(f, value)?;
                writeln!(f, ";")
            }
            StatementKind::If { .. } => {
                write!(f, "{indent}")?;
                self.if_chain(f, statement, depth)?;
                writeln!(f)
            }
            StatementKind::While { condition, body } => {
                write!(f, "{indent}{} (", "while".magenta())?;
                self.expression(f, condition)?;
                writeln!(f, ") {{")?;
                self.block_contents(f, body, depth + 1)?;
                writeln!(f, "{indent}}}")
            }
            StatementKind::Return(expression) => {
                write!(f, "{indent}{}", "return".magenta())?;

                if let Some(expression) = expression {
                    write!(f, " ")?;
                    self.expression(f, expression)?;
                }

                writeln!(f, ";")
            }
        }
    }

    /// Prints `if (..) { .. } else if (..) { .. } else { .. }` without the
    /// trailing newline. An else block holding nothing but another if is
    /// printed as `else if`, and an empty else block is left out.
    fn if_chain(&self, f: &mut impl Write, statement: &Statement, depth: usize) -> fmt::Result {
        let StatementKind::If {
            condition,
            positive,
            negative,
        } = &statement.kind
        else {
            return self.statement(f, statement, depth);
        };

        let indent = INDENT.repeat(depth);

        write!(f, "{} (", "if".magenta())?;
        self.expression(f, condition)?;
        writeln!(f, ") {{")?;
        self.block_contents(f, positive, depth + 1)?;
        write!(f, "{indent}}}")?;

        match negative.statements.as_slice() {
            [] => Ok(()),
            [nested @ Statement {
                kind: StatementKind::If { .. },
                ..
            }] => {
                write!(f, " {} ", "else".magenta())?;
                self.if_chain(f, nested, depth)
            }
            _ => {
                writeln!(f, " {} {{", "else".magenta())?;
                self.block_contents(f, negative, depth + 1)?;
                write!(f, "{indent}}}")
            }
        }
    }

    fn declaration(
        &self,
        f: &mut impl Write,
        symbol: SymbolId,
        initializer: Option<&Expression>,
    ) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.symbols.ty(symbol).colored(),
            self.symbols.name(symbol)
        )?;

        if let Some(initializer) = initializer {
            write!(f, " = ")?;
            self.expression(f, initializer)?;
        }

        write!(f, ";")
    }

    fn expression(&self, f: &mut impl Write, expression: &Expression) -> fmt::Result {
        match &expression.kind {
            ExpressionKind::Literal(value) => write!(f, "{}", value.to_string().purple()),
            ExpressionKind::Variable(symbol) => write!(f, "{}", self.symbols.name(*symbol)),
            ExpressionKind::Unary { operator, operand } => {
                write!(f, "{operator}")?;
                // `--x` would lex as a decrement in C
                self.operand(f, operand, precedence(operand) <= UNARY_PRECEDENCE)
            }
            ExpressionKind::Binary { operator, lhs, rhs } => {
                let own = binary_precedence(*operator);

                self.operand(f, lhs, precedence(lhs) < own)?;
                write!(f, " {operator} ")?;
                self.operand(f, rhs, precedence(rhs) <= own)
            }
            ExpressionKind::Call {
                function,
                arguments,
            } => {
                write!(f, "{}(", self.symbols.name(*function).blue())?;

                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    self.expression(f, argument)?;
                }

                write!(f, ")")
            }
        }
    }

    fn operand(&self, f: &mut impl Write, operand: &Expression, parenthesize: bool) -> fmt::Result {
        if parenthesize {
            write!(f, "(")?;
            self.expression(f, operand)?;
            write!(f, ")")
        } else {
            self.expression(f, operand)
        }
    }
}

const UNARY_PRECEDENCE: u8 = 4;

fn binary_precedence(operator: BinaryOperatorKind) -> u8 {
    match operator {
        BinaryOperatorKind::Multiply | BinaryOperatorKind::Divide => 3,
        BinaryOperatorKind::Add | BinaryOperatorKind::Subtract => 2,
        BinaryOperatorKind::Equals
        | BinaryOperatorKind::NotEquals
        | BinaryOperatorKind::LessThan
        | BinaryOperatorKind::LessThanOrEqualTo
        | BinaryOperatorKind::GreaterThan
        | BinaryOperatorKind::GreaterThanOrEqualTo => 1,
    }
}

fn precedence(expression: &Expression) -> u8 {
    match &expression.kind {
        // Negative literals print with a leading minus, except the minimum int
        // which prints parenthesized
        ExpressionKind::Literal(Value::Int(i)) if *i < 0 && *i != i32::MIN => UNARY_PRECEDENCE,
        ExpressionKind::Literal(Value::Float(v)) if v.is_sign_negative() => UNARY_PRECEDENCE,
        ExpressionKind::Literal(_) | ExpressionKind::Variable(_) | ExpressionKind::Call { .. } => 5,
        ExpressionKind::Unary { .. } => UNARY_PRECEDENCE,
        ExpressionKind::Binary { operator, .. } => binary_precedence(*operator),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::driver::lower_source_file;
    use crate::frontend::SourceFile;

    fn round_trip(source: &str) -> String {
        let module = lower_source_file(&SourceFile::new_in_memory(source)).unwrap();
        render_module_plain(&module)
    }

    #[test]
    fn prints_structured_c() {
        let source = indoc! {"
            int limit = 10;

            int main(int a, float b) {
                char c = 'x';
                if (a > limit) {
                    a = a - 1;
                } else if (a < 0) {
                    a = 0;
                } else {
                    a = 1;
                }
                while (a < 10) {
                    a = step(a);
                }
                return a;
            }

            int step(int x) {
                return x + 1;
            }
        "};

        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn parenthesizes_only_where_needed() {
        let source = indoc! {"
            int main(int a, int b, int c) {
                int x = (a + b) * c - (a - (b - c));
                int y = a - b + c * (b / c) / a;
                int z = -(-a) + -(b * 2) - -3;
                return x < y == (z > 0);
            }
        "};

        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn redundant_parentheses_are_dropped() {
        assert_eq!(
            round_trip("int main(int a) { return ((a * 2)) + (3); }"),
            "int main(int a) {\n    return a * 2 + 3;\n}\n"
        );
    }

    #[test]
    fn if_without_else_has_no_else_block() {
        let source = indoc! {"
            float half(float f) {
                if (f > 1.0) {
                    return f / 2.0;
                }
                return f;
            }
        "};

        assert_eq!(round_trip(source), source);
    }
}
