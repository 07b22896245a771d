use std::{path::PathBuf, process::ExitCode};

use clap::{CommandFactory, Parser as ClapParser, ValueEnum, error::ErrorKind};
use colored::Colorize;
use minicc::{
    driver::{self, CompilationOutput, CompileError},
    frontend::{SourceFile, lexer::Lexer, parser::Parser},
    middle::{
        ir::pretty_print::pretty_print_module,
        optimization::{DEFAULT_MAX_ROUNDS, FunctionOutcome, Pass, PipelineConfig},
        type_check::type_check_module,
    },
};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    source_files: Vec<PathBuf>,

    /// What to print for each source file
    #[arg(long, value_enum, default_value_t = Emit::Optimized)]
    emit: Emit,

    /// Passes of one optimization round, in order
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = Pass::ALL)]
    passes: Vec<Pass>,

    /// Rounds a function may take to reach a fixpoint
    #[arg(long, default_value_t = DEFAULT_MAX_ROUNDS)]
    max_rounds: usize,

    /// Optimize functions in parallel
    #[arg(long)]
    parallel: bool,

    #[arg(long)]
    no_color: bool,

    /// Log more (-v for debug, -vv for trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    Tokens,
    Ast,
    /// Type checked IR, before optimization
    Ir,
    Optimized,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            passes: self.passes.clone(),
            max_rounds: self.max_rounds,
            parallel: self.parallel,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("minicc={default_level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    init_tracing(args.verbose);

    if args.source_files.is_empty() {
        Args::command()
            .error(ErrorKind::MissingRequiredArgument, "Missing source files!")
            .exit();
    }

    for source_file in &args.source_files {
        if !source_file.is_file() {
            Args::command()
                .error(
                    ErrorKind::InvalidValue,
                    format!("Input path '{}' is not a file!", source_file.display()),
                )
                .exit()
        }
    }

    let config = args.pipeline_config();
    let mut succeeded = true;

    for path in &args.source_files {
        let source = match driver::read_source_file(path) {
            Ok(source) => source,
            Err(error) => {
                eprintln!("{}: {error}", "error".red());
                succeeded = false;
                continue;
            }
        };

        debug!(path = %path.display(), emit = ?args.emit, "compiling");

        match emit(&source, args.emit, &config) {
            Ok(clean) => succeeded &= clean,
            Err(error) => {
                error.report(&source);
                succeeded = false;
            }
        }
    }

    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Prints the requested representation of `source` and reports its type
/// errors and optimizer faults. Returns whether there were none.
fn emit(
    source: &SourceFile,
    emit: Emit,
    config: &PipelineConfig,
) -> Result<bool, CompileError> {
    let output = match emit {
        Emit::Tokens => {
            let tokens =
                Lexer::tokenize(source).map_err(|error| CompileError::Parse(error.into()))?;

            for token in tokens {
                println!("{:?} {:?}", token.kind, source.value_of_span(token.span));
            }

            return Ok(true);
        }
        Emit::Ast => {
            println!("{:#?}", Parser::parse_module(source)?);
            return Ok(true);
        }
        Emit::Ir => {
            let mut module = driver::lower_source_file(source)?;
            let diagnostics = type_check_module(&mut module);
            pretty_print_module(&module);

            CompilationOutput {
                module,
                diagnostics,
                report: Default::default(),
            }
        }
        Emit::Optimized => {
            let output = driver::compile(source, config)?;
            pretty_print_module(&output.module);
            output
        }
    };

    for diagnostic in output.diagnostics.all() {
        diagnostic.report(source);
    }

    for (function, outcome) in &output.report.functions {
        if let FunctionOutcome::Faulted(error) = outcome {
            eprintln!(
                "{}: {error} (in `{}`)",
                "internal error".red(),
                output.module.symbols.name(*function)
            );
        }
    }

    Ok(output.is_ready_for_codegen())
}
