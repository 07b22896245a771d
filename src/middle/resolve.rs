use std::collections::{BTreeMap, VecDeque};

use thiserror::Error;

use super::{
    symbol::{Scope, Symbol, SymbolId, SymbolKind, SymbolTable},
    ty::Type,
};
use crate::frontend::{
    ast::{
        Assignment, Block, Expression, ExpressionKind, FunctionDefinition, Identifier, ItemKind,
        Local, Module, NodeId,
        visit::{self, Visitor},
    },
    intern::InternedSymbol,
    lexer::Span,
};

/// The symbol table of a module together with a map from every identifier
/// node (declarations and uses) to the symbol it names
#[derive(Debug)]
pub struct ModuleResolutions {
    pub symbols: SymbolTable,
    pub names: BTreeMap<NodeId, SymbolId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("cannot find variable `{name}` in this scope")]
    UndefinedVariable { name: InternedSymbol, span: Span },
    #[error("cannot find function `{name}`")]
    UndefinedFunction { name: InternedSymbol, span: Span },
    #[error("`{name}` is already defined in this scope")]
    DuplicateDefinition {
        name: InternedSymbol,
        span: Span,
        /// Where the earlier definition was made
        previous: Span,
    },
    #[error("`{name}` is a variable and cannot be called")]
    NotAFunction { name: InternedSymbol, span: Span },
    #[error("`{name}` is a function and cannot be used as a value")]
    NotAVariable { name: InternedSymbol, span: Span },
}

impl ResolveError {
    pub fn span(&self) -> Span {
        match self {
            ResolveError::UndefinedVariable { span, .. }
            | ResolveError::UndefinedFunction { span, .. }
            | ResolveError::DuplicateDefinition { span, .. }
            | ResolveError::NotAFunction { span, .. }
            | ResolveError::NotAVariable { span, .. } => *span,
        }
    }
}

/// AST module name resolver
///
/// Traverses the AST for a module, builds its symbol table and maps every
/// identifier to the declaration it refers to.
#[derive(Debug)]
pub struct Resolver {
    scope_stack: ScopeStack<SymbolId>,
    symbols: SymbolTable,
    names: BTreeMap<NodeId, SymbolId>,
    errors: Vec<ResolveError>,
    /// Function whose body is being resolved
    current_function: Option<SymbolId>,
}

impl Resolver {
    /// Resolves all names within a module in 2 steps.
    ///
    /// The first step binds every function definition in the global scope so
    /// calls may appear before the callee is defined.
    ///
    /// The second step walks the items in order, binding globals as they are
    /// declared and resolving each function body with C's block scoping.
    /// Errors do not stop the walk; all of them are returned together.
    pub fn resolve_names(module: &Module) -> Result<ModuleResolutions, Vec<ResolveError>> {
        let mut resolver = Self {
            scope_stack: ScopeStack::new(),
            symbols: SymbolTable::new(),
            names: BTreeMap::new(),
            errors: Vec::new(),
            current_function: None,
        };

        resolver.bind_function_definitions(module);
        visit::walk_module(&mut resolver, module);

        if !resolver.errors.is_empty() {
            return Err(resolver.errors);
        }

        Ok(ModuleResolutions {
            symbols: resolver.symbols,
            names: resolver.names,
        })
    }

    /// Adds all the function definitions from the module to the global scope
    fn bind_function_definitions(&mut self, module: &Module) {
        for item in &module.items {
            let ItemKind::FunctionDefinition(function) = &item.kind else {
                continue;
            };

            let signature = &function.signature;
            let parameter_types = signature
                .parameters
                .parameters
                .iter()
                .map(|parameter| Type::from(parameter.ty.kind))
                .collect();

            self.declare(
                &signature.name,
                Type::from(signature.return_type.kind),
                SymbolKind::Function { parameter_types },
            );
        }
    }

    /// Creates a symbol for `name` in the innermost scope
    fn declare(&mut self, name: &Identifier, ty: Type, kind: SymbolKind) -> SymbolId {
        if let Some(previous) = self.scope_stack.get_shallow_binding(name.symbol) {
            self.errors.push(ResolveError::DuplicateDefinition {
                name: name.symbol,
                span: name.span,
                previous: self.symbols[*previous].span,
            });
        }

        let scope = match self.current_function {
            Some(function) if !matches!(kind, SymbolKind::Function { .. }) => {
                Scope::Local(function)
            }
            _ => Scope::Global,
        };

        let id = self.symbols.insert(Symbol {
            name: name.symbol,
            ty,
            scope,
            kind,
            span: name.span,
        });

        self.scope_stack.add_binding(name.symbol, id);
        self.names.insert(name.id, id);

        id
    }

    /// Resolves a name used as a value (a read or an assignment target)
    fn resolve_variable(&mut self, identifier: &Identifier) {
        let Some(id) = self.scope_stack.get_binding(identifier.symbol).copied() else {
            self.errors.push(ResolveError::UndefinedVariable {
                name: identifier.symbol,
                span: identifier.span,
            });
            return;
        };

        if self.symbols[id].is_function() {
            self.errors.push(ResolveError::NotAVariable {
                name: identifier.symbol,
                span: identifier.span,
            });
            return;
        }

        self.names.insert(identifier.id, id);
    }

    fn resolve_callee(&mut self, identifier: &Identifier) {
        let Some(id) = self.scope_stack.get_binding(identifier.symbol).copied() else {
            self.errors.push(ResolveError::UndefinedFunction {
                name: identifier.symbol,
                span: identifier.span,
            });
            return;
        };

        if !self.symbols[id].is_function() {
            self.errors.push(ResolveError::NotAFunction {
                name: identifier.symbol,
                span: identifier.span,
            });
            return;
        }

        self.names.insert(identifier.id, id);
    }
}

impl<'ast> Visitor<'ast> for Resolver {
    fn visit_function_definition(&mut self, function: &'ast FunctionDefinition) {
        let Some(function_id) = self.names.get(&function.signature.name.id).copied() else {
            return;
        };

        self.current_function = Some(function_id);
        self.scope_stack.push_shallow_scope();

        for parameter in &function.signature.parameters.parameters {
            self.declare(
                &parameter.name,
                Type::from(parameter.ty.kind),
                SymbolKind::Parameter,
            );
        }

        // Parameters share the scope of the outermost block of the body
        visit::walk_block(self, &function.body);

        self.scope_stack.pop_shallow_scope();
        self.current_function = None;
    }

    fn visit_block(&mut self, block: &'ast Block) {
        self.scope_stack.push_shallow_scope();
        visit::walk_block(self, block);
        self.scope_stack.pop_shallow_scope();
    }

    fn visit_local(&mut self, local: &'ast Local) {
        // The initializer can not see the name being declared
        if let Some(initializer) = &local.initializer {
            self.visit_expression(initializer);
        }

        self.declare(&local.name, Type::from(local.ty.kind), SymbolKind::Variable);
    }

    fn visit_assignment(&mut self, assignment: &'ast Assignment) {
        self.visit_expression(&assignment.value);
        self.resolve_variable(&assignment.target);
    }

    fn visit_expression(&mut self, expression: &'ast Expression) {
        match &expression.kind {
            ExpressionKind::Identifier(identifier) => self.resolve_variable(identifier),
            ExpressionKind::FunctionCall { target, arguments } => {
                self.resolve_callee(target);
                self.visit_function_call_argument_list(arguments);
            }
            _ => visit::walk_expression(self, expression),
        }
    }
}

/// A data structure to assist in traversing AST scopes
#[derive(Debug)]
struct ScopeStack<R> {
    global_scope: BTreeMap<InternedSymbol, R>,
    stack: VecDeque<BTreeMap<InternedSymbol, R>>,
}

impl<R> ScopeStack<R> {
    fn new() -> Self {
        Self {
            global_scope: BTreeMap::new(),
            stack: VecDeque::new(),
        }
    }

    /// Creates a new block or function scope
    fn push_shallow_scope(&mut self) {
        self.stack.push_back(BTreeMap::new());
    }

    /// Destroys the current block or function scope
    fn pop_shallow_scope(&mut self) {
        self.stack.pop_back();
    }

    /// Looks for a binding only within the current (most nested) scope, which
    /// is the global scope outside of any function
    fn get_shallow_binding(&self, symbol: InternedSymbol) -> Option<&R> {
        self.stack.back().unwrap_or(&self.global_scope).get(&symbol)
    }

    /// Adds a binding within the current (most nested) scope
    fn add_binding(&mut self, symbol: InternedSymbol, name_resolution: R) {
        let scope = match self.stack.back_mut() {
            Some(scope) => scope,
            None => &mut self.global_scope,
        };

        scope.insert(symbol, name_resolution);
    }

    /// Traverses the scope stack from back to front looking for bindings before
    /// checking the global scope.
    fn get_binding(&self, symbol: InternedSymbol) -> Option<&R> {
        for scope in self.stack.iter().rev() {
            if let Some(binding) = scope.get(&symbol) {
                return Some(binding);
            }
        }

        self.global_scope.get(&symbol)
    }
}
