//! Forward dataflow over the structured IR
//!
//! Every pass in this directory tracks one [`Fact`] per variable while it
//! walks a function body top to bottom. The walk itself is shared: the
//! [`ForwardWalker`] threads a [`Facts`] map through statements, splits it at
//! `if`, joins it afterwards and iterates loop heads to a fixpoint. Passes only
//! decide what an assignment means ([`ForwardPass::transfer`]) and how an
//! expression is rewritten under the facts in scope ([`ForwardPass::rewrite`]).

use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use tracing::warn;

use crate::middle::{
    ir::{
        Block, Expression, FunctionDefinition, StatementKind,
        visit::{AssignedSymbols, Visitor},
    },
    symbol::SymbolId,
    value::Value,
};

/// Loop heads normally settle in two or three iterations
const LOOP_ITERATION_LIMIT: usize = 64;

/// What is known about a variable at one program point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fact {
    /// Nothing yet, the variable has not been written on this path
    Top,
    Constant(Value),
    /// Holds the same value as another variable
    Copy(SymbolId),
    /// Varies or is unknown
    Bottom,
}

impl Fact {
    /// Facts from two predecessors agree or collapse
    fn join(self, other: Fact) -> Fact {
        if self == other { self } else { Fact::Bottom }
    }
}

/// Per variable facts at one program point. Variables that are absent are
/// [`Fact::Top`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facts {
    facts: HashMap<SymbolId, Fact>,
    /// Cleared after a `return`; facts of an unreachable point never reach a
    /// join
    reachable: bool,
}

impl Default for Facts {
    fn default() -> Self {
        Self {
            facts: HashMap::new(),
            reachable: true,
        }
    }
}

impl Facts {
    pub fn get(&self, symbol: SymbolId) -> Fact {
        self.facts.get(&symbol).copied().unwrap_or(Fact::Top)
    }

    pub fn constant(&self, symbol: SymbolId) -> Option<Value> {
        match self.get(symbol) {
            Fact::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// Records that `target` was just written with something described by
    /// `fact`. Every copy of the old value of `target` dies first.
    pub fn assign(&mut self, target: SymbolId, fact: Fact) {
        for held in self.facts.values_mut() {
            if *held == Fact::Copy(target) {
                *held = Fact::Bottom;
            }
        }

        match fact {
            Fact::Top => {
                self.facts.remove(&target);
            }
            Fact::Copy(source) if source == target => {
                self.facts.insert(target, Fact::Bottom);
            }
            fact => {
                self.facts.insert(target, fact);
            }
        }
    }

    /// Follows a chain of copies to the variable that actually holds the value
    pub fn copy_root(&self, symbol: SymbolId) -> SymbolId {
        let mut root = symbol;

        // Chains can't be cyclic, the bound only guards against bugs
        for _ in 0..=self.facts.len() {
            match self.get(root) {
                Fact::Copy(source) => root = source,
                _ => break,
            }
        }

        root
    }

    /// Drops everything known about `symbol` once it is out of scope. Copies
    /// of it die with it.
    pub fn forget(&mut self, symbol: SymbolId) {
        self.assign(symbol, Fact::Top);
    }

    pub fn mark_unreachable(&mut self) {
        self.facts.clear();
        self.reachable = false;
    }

    /// The facts that hold where control from `self` and `other` meets
    pub fn join(&self, other: &Facts) -> Facts {
        if !self.reachable {
            return other.clone();
        }
        if !other.reachable {
            return self.clone();
        }

        let facts = self
            .facts
            .keys()
            .chain(other.facts.keys())
            .unique()
            .filter_map(|symbol| {
                let fact = self.get(*symbol).join(other.get(*symbol));
                (fact != Fact::Top).then_some((*symbol, fact))
            })
            .collect();

        Facts {
            facts,
            reachable: true,
        }
    }
}

/// Globals the optimizer may rely on for a whole module
#[derive(Debug, Default, Clone)]
pub struct ModuleFacts {
    /// Globals that are never assigned and hold a known value
    pub global_constants: HashMap<SymbolId, Value>,
    /// Globals assigned somewhere; any call may change them, so they are
    /// never tracked
    pub untracked: HashSet<SymbolId>,
}

impl ModuleFacts {
    /// Facts at the entry of `function`
    pub fn entry_facts(&self, function: &FunctionDefinition) -> Facts {
        let mut facts = Facts::default();

        for (symbol, value) in &self.global_constants {
            facts.assign(*symbol, Fact::Constant(*value));
        }

        for parameter in &function.parameters {
            facts.assign(*parameter, Fact::Bottom);
        }

        facts
    }
}

pub trait ForwardPass {
    const NAME: &'static str;

    /// The fact a variable holds right after being assigned `value`
    fn transfer(&self, value: &Expression, facts: &Facts) -> Fact;

    /// Rewrites an expression that is evaluated under `facts`. Returns whether
    /// anything changed.
    fn rewrite(&self, expression: &mut Expression, facts: &Facts) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Only compute facts
    Analyze,
    /// Compute facts and rewrite expressions under them
    Rewrite,
}

/// Drives a [`ForwardPass`] over one function body
pub struct ForwardWalker<'a, P> {
    pass: &'a P,
    module: &'a ModuleFacts,
    changed: bool,
}

impl<'a, P: ForwardPass> ForwardWalker<'a, P> {
    pub fn new(pass: &'a P, module: &'a ModuleFacts) -> Self {
        Self {
            pass,
            module,
            changed: false,
        }
    }

    /// Runs the pass over `function` once. Returns whether the pass rewrote
    /// anything.
    pub fn run(mut self, function: &mut FunctionDefinition) -> bool {
        let entry = self.module.entry_facts(function);
        self.walk_block(&mut function.body, entry, Mode::Rewrite);
        self.changed
    }

    fn rewrite(&mut self, expression: &mut Expression, facts: &Facts, mode: Mode) {
        if mode == Mode::Rewrite && self.pass.rewrite(expression, facts) {
            self.changed = true;
        }
    }

    fn assign(&self, facts: &mut Facts, target: SymbolId, value: &Expression) {
        let fact = if self.module.untracked.contains(&target) {
            Fact::Bottom
        } else {
            match self.pass.transfer(value, facts) {
                Fact::Copy(source) if self.module.untracked.contains(&source) => Fact::Bottom,
                fact => fact,
            }
        };

        facts.assign(target, fact);
    }

    fn walk_block(&mut self, block: &mut Block, mut facts: Facts, mode: Mode) -> Facts {
        for statement in &mut block.statements {
            facts = self.walk_statement(&mut statement.kind, facts, mode);
        }

        // Locals of this block go out of scope, and so do outer copies of them
        for statement in &block.statements {
            if let StatementKind::Declaration { symbol, .. } = statement.kind {
                facts.forget(symbol);
            }
        }

        facts
    }

    fn walk_statement(
        &mut self,
        statement: &mut StatementKind,
        mut facts: Facts,
        mode: Mode,
    ) -> Facts {
        match statement {
            StatementKind::Declaration {
                symbol,
                initializer: Some(initializer),
            } => {
                self.rewrite(initializer, &facts, mode);
                self.assign(&mut facts, *symbol, initializer);
                facts
            }
            StatementKind::Declaration {
                symbol,
                initializer: None,
            } => {
                facts.assign(*symbol, Fact::Top);
                facts
            }
            StatementKind::Assignment { target, value } => {
                self.rewrite(value, &facts, mode);
                self.assign(&mut facts, *target, value);
                facts
            }
            StatementKind::If {
                condition,
                positive,
                negative,
            } => {
                self.rewrite(condition, &facts, mode);

                let positive = self.walk_block(positive, facts.clone(), mode);
                let negative = self.walk_block(negative, facts, mode);

                positive.join(&negative)
            }
            StatementKind::While { condition, body } => {
                let head = self.loop_head(body, facts);

                if mode == Mode::Rewrite {
                    self.rewrite(condition, &head, mode);
                    self.walk_block(body, head.clone(), mode);
                }

                // Leaving the loop means the condition was false at the head
                head
            }
            StatementKind::Return(value) => {
                if let Some(value) = value {
                    self.rewrite(value, &facts, mode);
                }

                facts.mark_unreachable();
                facts
            }
        }
    }

    /// Facts holding at the top of a loop on every iteration, which are the
    /// entry facts joined with whatever any number of trips through `body`
    /// produce
    fn loop_head(&mut self, body: &mut Block, entry: Facts) -> Facts {
        let mut head = entry.clone();

        for _ in 0..LOOP_ITERATION_LIMIT {
            let after_body = self.walk_block(body, head.clone(), Mode::Analyze);
            let next = entry.join(&after_body);

            if next == head {
                return head;
            }

            head = next;
        }

        warn!(
            pass = P::NAME,
            "loop facts did not settle, dropping everything the loop assigns"
        );

        let mut assigned = AssignedSymbols::default();
        assigned.visit_block(body);

        let mut head = entry;
        for symbol in assigned.symbols {
            head.assign(symbol, Fact::Bottom);
        }

        head
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::index::Index;

    fn symbol(index: usize) -> SymbolId {
        SymbolId::new(index)
    }

    #[test]
    fn reassigning_a_source_kills_its_copies() {
        let (a, b, c) = (symbol(0), symbol(1), symbol(2));
        let mut facts = Facts::default();

        facts.assign(b, Fact::Copy(a));
        facts.assign(c, Fact::Copy(b));
        assert_eq!(facts.copy_root(c), a);

        facts.assign(a, Fact::Constant(Value::Int(1)));
        assert_eq!(facts.get(b), Fact::Bottom);
        // `c` still copies `b`, which was not reassigned
        assert_eq!(facts.get(c), Fact::Copy(b));
        assert_eq!(facts.copy_root(c), b);
    }

    #[test]
    fn copying_yourself_is_unknown() {
        let mut facts = Facts::default();
        facts.assign(symbol(0), Fact::Copy(symbol(0)));

        assert_eq!(facts.get(symbol(0)), Fact::Bottom);
    }

    #[test]
    fn join_keeps_only_agreeing_facts() {
        let (a, b, c, d) = (symbol(0), symbol(1), symbol(2), symbol(3));

        let mut left = Facts::default();
        left.assign(a, Fact::Constant(Value::Int(1)));
        left.assign(b, Fact::Constant(Value::Int(2)));
        left.assign(c, Fact::Copy(a));

        let mut right = Facts::default();
        right.assign(a, Fact::Constant(Value::Int(1)));
        right.assign(b, Fact::Constant(Value::Int(3)));
        right.assign(d, Fact::Constant(Value::Int(4)));

        let joined = left.join(&right);

        assert_eq!(joined.get(a), Fact::Constant(Value::Int(1)));
        assert_eq!(joined.get(b), Fact::Bottom);
        assert_eq!(joined.get(c), Fact::Bottom);
        assert_eq!(joined.get(d), Fact::Bottom);
    }

    #[test]
    fn unreachable_side_does_not_participate() {
        let mut returned = Facts::default();
        returned.assign(symbol(0), Fact::Constant(Value::Int(1)));
        returned.mark_unreachable();
        assert!(!returned.is_reachable());

        let mut live = Facts::default();
        live.assign(symbol(0), Fact::Constant(Value::Int(2)));

        assert_eq!(returned.join(&live), live);
        assert_eq!(live.join(&returned), live);
    }

    #[test]
    fn forgetting_a_local_kills_its_copies() {
        let (outer, local, other) = (symbol(0), symbol(1), symbol(2));
        let mut facts = Facts::default();

        facts.assign(local, Fact::Bottom);
        facts.assign(outer, Fact::Copy(local));
        facts.assign(other, Fact::Constant(Value::Int(3)));
        facts.forget(local);

        assert_eq!(facts.get(local), Fact::Top);
        assert_eq!(facts.get(outer), Fact::Bottom);
        assert_eq!(facts.get(other), Fact::Constant(Value::Int(3)));
    }
}
