use colored::Colorize;
use strum::Display;

use crate::frontend::{SourceFile, lexer::Span};

/// Type errors found in the user's program. Every kind is a hard error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DiagnosticKind {
    /// `int x = 1.5;`
    InitializerTypeMismatch,
    /// `x = 'a';` where `x` is not a char
    AssignmentTypeMismatch,
    /// Arithmetic on two different types
    BinaryOperandTypeMismatch,
    /// Comparison of two different types
    ComparisonTypeMismatch,
    /// `return e;` where `e` is not the declared return type, or `return;`
    ReturnTypeMismatch,
    ArgumentCountMismatch,
    ArgumentTypeMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    /// 1-indexed source line the diagnostic points at
    pub fn line(&self) -> usize {
        self.span.line
    }

    pub fn render(&self, source: &SourceFile) -> String {
        format!(
            "{}: {} {}\n{}",
            "error".red(),
            self.message,
            format!("(at {})", source.format_span_position(self.span)).white(),
            source.render_highlighted_span(self.span)
        )
    }

    pub fn report(&self, source: &SourceFile) {
        eprintln!("{}", self.render(source));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn renders_position_and_source_line() {
        let source = SourceFile::new_in_memory("int main() {\n    int x = 1.5;\n}\n");
        let diagnostic = Diagnostic {
            kind: DiagnosticKind::InitializerTypeMismatch,
            span: Span::new(17, 29, 2),
            message: "initializer type float does not match declared type int of `x`".to_owned(),
        };

        assert_eq!(
            strip_ansi_escapes::strip_str(diagnostic.render(&source)),
            "error: initializer type float does not match declared type int of `x` (at <memory>:2:5)\n\
             2 |     int x = 1.5;\n    \
             \x20   ^^^^^^^^^^^^"
        );
        assert_eq!(diagnostic.kind.to_string(), "InitializerTypeMismatch");
    }
}
