//! The optimization pipeline
//!
//! Functions are optimized independently. Each round runs every configured
//! pass once over the function, in order, and rounds repeat until a whole
//! round rewrites nothing. Folding a copy can expose a constant and folding a
//! constant can expose an identity, so no single order reaches the fixpoint in
//! one round.

use clap::ValueEnum;
use rayon::prelude::*;
use strum::Display;
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

use self::{
    constant_propagation::{ConstantPropagation, evaluate},
    copy_propagation::CopyPropagation,
    dataflow::{Fact, Facts, ForwardWalker, ModuleFacts},
    dead_stores::eliminate_dead_stores,
    simplify::AlgebraicSimplification,
};
use super::{
    ir::{
        Expression, FunctionDefinition, Module,
        visit::{AssignedSymbols, Visitor},
    },
    symbol::{SymbolId, SymbolTable},
    type_check::TypeCheckResults,
    value::Value,
};

pub mod constant_propagation;
pub mod copy_propagation;
pub mod dataflow;
pub mod dead_stores;
pub mod simplify;

pub const DEFAULT_MAX_ROUNDS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Pass {
    AlgebraicSimplification,
    ConstantPropagation,
    CopyPropagation,
    /// Not part of the default round
    DeadStoreElimination,
}

impl Pass {
    /// The default round
    pub const ALL: [Pass; 3] = [
        Pass::AlgebraicSimplification,
        Pass::ConstantPropagation,
        Pass::CopyPropagation,
    ];

    /// Runs the pass over `function` once, returning whether it rewrote
    /// anything
    pub fn run(self, function: &mut FunctionDefinition, module: &ModuleFacts) -> bool {
        match self {
            Pass::AlgebraicSimplification => {
                ForwardWalker::new(&AlgebraicSimplification, module).run(function)
            }
            Pass::ConstantPropagation => {
                ForwardWalker::new(&ConstantPropagation, module).run(function)
            }
            Pass::CopyPropagation => ForwardWalker::new(&CopyPropagation, module).run(function),
            Pass::DeadStoreElimination => eliminate_dead_stores(function, module),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Passes of one round, in order
    pub passes: Vec<Pass>,
    /// Rounds a function may take before giving up on it
    pub max_rounds: usize,
    /// Optimize functions on the rayon thread pool
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            passes: Pass::ALL.to_vec(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            parallel: false,
        }
    }
}

/// Internal faults of the optimizer. A type correct program never causes
/// one unless a pass is broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizationError {
    #[error("optimizing `{function}` did not reach a fixpoint within {rounds} rounds")]
    FixpointNotReached { function: String, rounds: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionOutcome {
    /// Reached a fixpoint; the last round changed nothing
    Optimized { rounds: usize },
    /// The function has type errors and was left alone
    Skipped,
    Faulted(OptimizationError),
}

/// What happened to every function of a module, in definition order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OptimizationReport {
    pub functions: Vec<(SymbolId, FunctionOutcome)>,
}

impl OptimizationReport {
    pub fn outcome(&self, function: SymbolId) -> Option<&FunctionOutcome> {
        self.functions
            .iter()
            .find(|(symbol, _)| *symbol == function)
            .map(|(_, outcome)| outcome)
    }

    pub fn faults(&self) -> impl Iterator<Item = &OptimizationError> {
        self.functions.iter().filter_map(|(_, outcome)| match outcome {
            FunctionOutcome::Faulted(error) => Some(error),
            _ => None,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.faults().next().is_none()
    }
}

/// Optimizes every function that type checked cleanly. A fault in one
/// function is recorded and the others are still optimized.
#[instrument(level = "debug", skip_all, fields(functions = module.functions.len()))]
pub fn optimize_module(
    module: &mut Module,
    diagnostics: &TypeCheckResults,
    config: &PipelineConfig,
) -> OptimizationReport {
    let facts = analyze_globals(module);
    let symbols = &module.symbols;

    let optimize = |function: &mut FunctionDefinition| {
        if !diagnostics.is_clean(function.symbol) {
            debug!(
                function = symbols.name(function.symbol),
                "skipping function with type errors"
            );
            return (function.symbol, FunctionOutcome::Skipped);
        }

        let outcome = match optimize_function(function, symbols, &facts, config) {
            Ok(rounds) => FunctionOutcome::Optimized { rounds },
            Err(error) => {
                warn!("{error}");
                FunctionOutcome::Faulted(error)
            }
        };

        (function.symbol, outcome)
    };

    let functions = if config.parallel {
        module.functions.par_iter_mut().map(optimize).collect()
    } else {
        module.functions.iter_mut().map(optimize).collect()
    };

    OptimizationReport { functions }
}

/// Runs rounds over one function until nothing changes. Returns the number of
/// rounds, including the final one that changed nothing.
#[instrument(level = "debug", skip_all, fields(function = symbols.name(function.symbol)))]
pub fn optimize_function(
    function: &mut FunctionDefinition,
    symbols: &SymbolTable,
    facts: &ModuleFacts,
    config: &PipelineConfig,
) -> Result<usize, OptimizationError> {
    for round in 1..=config.max_rounds {
        let mut changed = false;

        for pass in &config.passes {
            if pass.run(function, facts) {
                trace!(round, %pass, "rewrote");
                changed = true;
            }
        }

        if !changed {
            debug!(rounds = round, "reached fixpoint");
            return Ok(round);
        }
    }

    Err(OptimizationError::FixpointNotReached {
        function: symbols.name(function.symbol).to_owned(),
        rounds: config.max_rounds,
    })
}

/// Folds global initializers and finds the globals functions may treat as
/// constants: the ones no function ever assigns. A global without an
/// initializer starts out as zero.
pub fn analyze_globals(module: &mut Module) -> ModuleFacts {
    let mut assigned = AssignedSymbols::default();
    for function in &module.functions {
        assigned.visit_function_definition(function);
    }

    // Initial values, whether or not the global changes later on
    let mut initial = Facts::default();
    let mut global_constants = hashbrown::HashMap::new();

    for global in &mut module.globals {
        let ty = module.symbols.ty(global.symbol);

        let value = match &mut global.initializer {
            Some(initializer) if initializer.ty == Some(ty) => {
                fold_initializer(initializer, &initial)
            }
            Some(_) => None,
            None => Some(Value::zero(ty)),
        };

        let Some(value) = value else {
            continue;
        };

        initial.assign(global.symbol, Fact::Constant(value));

        if !assigned.symbols.contains(&global.symbol) {
            global_constants.insert(global.symbol, value);
        }
    }

    debug!(
        constants = global_constants.len(),
        untracked = assigned.symbols.len(),
        "analyzed globals"
    );

    ModuleFacts {
        global_constants,
        untracked: assigned
            .symbols
            .into_iter()
            .filter(|symbol| module.symbols[*symbol].is_global_variable())
            .collect(),
    }
}

fn fold_initializer(initializer: &mut Expression, initial: &Facts) -> Option<Value> {
    let value = evaluate(initializer, initial)?;

    if !initializer.is_literal() {
        *initializer = Expression::literal(initializer.span, value);
    }

    Some(value)
}
