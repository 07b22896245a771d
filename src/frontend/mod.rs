use std::path::PathBuf;

use colored::Colorize;

use self::lexer::Span;

pub mod ast;
pub mod intern;
pub mod lexer;
pub mod parser;

#[derive(Debug)]
pub struct SourceFile {
    pub contents: String,
    pub origin: SourceFileOrigin,
}

impl SourceFile {
    pub fn new_in_memory(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            origin: SourceFileOrigin::Memory,
        }
    }

    pub fn value_of_span(&self, span: Span) -> &str {
        &self.contents[span.start..span.end]
    }

    /// 1-indexed line containing the byte at `position`
    pub fn row_for_position(&self, position: usize) -> usize {
        self.contents[..position.min(self.contents.len())]
            .bytes()
            .filter(|b| *b == b'\n')
            .count()
            + 1
    }

    /// 1-indexed column of the byte at `position`
    pub fn column_for_position(&self, position: usize) -> usize {
        let position = position.min(self.contents.len());
        let line_start = self.contents[..position]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);

        position - line_start + 1
    }

    pub fn format_span_position(&self, span: Span) -> String {
        format!(
            "{}:{}:{}",
            self.origin,
            self.row_for_position(span.start),
            self.column_for_position(span.start)
        )
    }

    /// Renders the line containing `span` with the spanned characters
    /// underlined. Spans that cross a line break are cut at the end of the
    /// first line.
    pub fn render_highlighted_span(&self, span: Span) -> String {
        let row = self.row_for_position(span.start);
        let column = self.column_for_position(span.start);
        let line = self.contents.lines().nth(row - 1).unwrap_or_default();

        let width = span
            .end
            .saturating_sub(span.start)
            .clamp(1, (line.len() + 1).saturating_sub(column).max(1));

        let gutter = format!("{row} | ");

        format!(
            "{}{}\n{}{}",
            gutter.blue(),
            line,
            " ".repeat(gutter.len() + column - 1),
            "^".repeat(width).red()
        )
    }

    pub fn highlight_span(&self, span: Span) {
        eprintln!("{}", self.render_highlighted_span(span));
    }
}

#[derive(Debug)]
pub enum SourceFileOrigin {
    Memory,
    File(PathBuf),
}

impl core::fmt::Display for SourceFileOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFileOrigin::Memory => f.write_str("<memory>"),
            SourceFileOrigin::File(path) => f.write_fmt(format_args!("{}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_one_indexed() {
        let source = SourceFile::new_in_memory("int a;\nint bc;\n");

        assert_eq!(source.row_for_position(0), 1);
        assert_eq!(source.column_for_position(0), 1);
        assert_eq!(source.row_for_position(11), 2);
        assert_eq!(source.column_for_position(11), 5);
        assert_eq!(source.format_span_position(Span::new(11, 13, 2)), "<memory>:2:5");
    }

    #[test]
    fn highlight_underlines_the_span() {
        let source = SourceFile::new_in_memory("int a;\nint bc = 1.5;\n");
        let rendered = strip_ansi_escapes::strip_str(source.render_highlighted_span(Span::new(16, 19, 2)));

        assert_eq!(rendered, "2 | int bc = 1.5;\n             ^^^");
    }
}
