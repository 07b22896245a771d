use colored::Colorize;
use strum::{Display, EnumString};

use crate::frontend::ast;

/// The three scalar types of the language. There are no implicit conversions
/// between them: every operation requires its operand types to be identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Type {
    /// 32-bit two's complement integer
    Int,
    /// IEEE 754 single precision float
    Float,
    /// 8-bit signed character
    Char,
}

impl Type {
    pub fn is_integral(self) -> bool {
        matches!(self, Type::Int | Type::Char)
    }

    pub fn colored(self) -> colored::ColoredString {
        self.to_string().yellow()
    }
}

impl From<ast::TypeKind> for Type {
    fn from(kind: ast::TypeKind) -> Self {
        match kind {
            ast::TypeKind::Int => Type::Int,
            ast::TypeKind::Float => Type::Float,
            ast::TypeKind::Char => Type::Char,
        }
    }
}
