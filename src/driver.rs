//! A compilation session: source text in, type checked and optimized IR out

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info_span};

use crate::{
    frontend::{
        SourceFile, SourceFileOrigin,
        parser::{ParseError, Parser},
    },
    middle::{
        ast_lowering::{LoweringError, lower_module},
        ir,
        optimization::{OptimizationReport, PipelineConfig, optimize_module},
        resolve::{ResolveError, Resolver},
        type_check::{TypeCheckResults, type_check_module},
    },
};

/// Errors that stop compilation before the IR exists. Type errors are not
/// among them; those are collected as diagnostics.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{} name resolution error(s)", .0.len())]
    Resolve(Vec<ResolveError>),
    #[error(transparent)]
    Lowering(#[from] LoweringError),
}

impl CompileError {
    /// Prints the error with the offending source lines highlighted
    pub fn report(&self, source: &SourceFile) {
        use colored::Colorize;

        let report_one = |message: String, span| {
            eprintln!(
                "{}: {message} {}",
                "error".red(),
                format!("(at {})", source.format_span_position(span)).white()
            );
            source.highlight_span(span);
        };

        match self {
            CompileError::Io { .. } => eprintln!("{}: {self}", "error".red()),
            CompileError::Parse(error) => report_one(error.to_string(), error.span()),
            CompileError::Resolve(errors) => {
                for error in errors {
                    report_one(error.to_string(), error.span());
                }
            }
            CompileError::Lowering(error) => report_one(error.to_string(), error.span()),
        }
    }
}

#[derive(Debug)]
pub struct CompilationOutput {
    pub module: ir::Module,
    pub diagnostics: TypeCheckResults,
    pub report: OptimizationReport,
}

impl CompilationOutput {
    /// Code may only be generated for a program without diagnostics whose
    /// functions were all optimized
    pub fn is_ready_for_codegen(&self) -> bool {
        !self.diagnostics.has_errors() && self.report.is_ok()
    }
}

/// Parses, resolves and lowers a source file to unchecked IR
pub fn lower_source_file(source: &SourceFile) -> Result<ir::Module, CompileError> {
    let module = Parser::parse_module(source)?;
    let resolutions = Resolver::resolve_names(&module).map_err(CompileError::Resolve)?;

    Ok(lower_module(&module, resolutions)?)
}

/// Runs the whole middle end over `source`
pub fn compile(
    source: &SourceFile,
    config: &PipelineConfig,
) -> Result<CompilationOutput, CompileError> {
    let _span = info_span!("compile", origin = %source.origin).entered();

    let mut module = lower_source_file(source)?;
    let diagnostics = type_check_module(&mut module);
    debug!(diagnostics = diagnostics.all().len(), "type checked module");

    let report = optimize_module(&mut module, &diagnostics, config);

    Ok(CompilationOutput {
        module,
        diagnostics,
        report,
    })
}

pub fn read_source_file(path: &Path) -> Result<SourceFile, CompileError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_owned(),
        source,
    })?;

    Ok(SourceFile {
        contents,
        origin: SourceFileOrigin::File(path.to_owned()),
    })
}

/// Reads and compiles the file at `path`. The source is handed back so the
/// caller can render diagnostics against it.
pub fn compile_path(
    path: &Path,
    config: &PipelineConfig,
) -> Result<(SourceFile, CompilationOutput), (Option<SourceFile>, CompileError)> {
    let source = read_source_file(path).map_err(|error| (None, error))?;

    match compile(&source, config) {
        Ok(output) => Ok((source, output)),
        Err(error) => Err((Some(source), error)),
    }
}
