//! Elaboration: symbols, scopes, types, binding, and constant
//! evaluation.
//!
//! A [`Compilation`] owns everything produced after parsing: the
//! syntax trees, the symbol and scope arenas, the type table, bound
//! expressions, and the diagnostic sink. Lifetimes are simple by
//! design: all arenas live exactly as long as the compilation and are
//! freed together.
//!
//! The flow is: [`Compilation::add_tree`] registers packages and
//! definitions from a parsed file, then [`Compilation::finalize`]
//! instantiates every definition that is not instantiated anywhere
//! else (the design roots) and elaborates the instance bodies.
//! Binding and constant evaluation run lazily on top of the resulting
//! symbol graph through write-once caches.

mod bind;
mod elaborate;
mod eval;
mod scope;
mod symbol;
mod types;

pub use bind::{
    BinaryOp, BindContext, BindFlags, DimensionKind, EvaluatedDimension, ExprKind, Expression,
    RangeSelectKind, UnaryOp,
};
pub use eval::{eval, EvalContext};
pub use scope::{Scope, ScopeId};
pub use symbol::{
    DeclaredType, DefinitionKind, Direction, ExprId, NetKind, ProceduralKind, Symbol, SymbolId,
    SymbolKind, SyntaxRef, TreeId,
};
pub use types::{builtin, FloatKind, Type, TypeId};

use std::cell::{Ref, RefCell, RefMut};

use rustc_hash::FxHashMap;
use tracing::instrument;

use alder_diagnostic::Diagnostics;
use alder_syntax::{Name, StringInterner, SyntaxTree};

/// The root object of semantic analysis.
pub struct Compilation {
    interner: &'static StringInterner,
    diagnostics: Diagnostics,
    trees: Vec<SyntaxTree>,
    symbols: Vec<Symbol>,
    scopes: Vec<Scope>,
    types: RefCell<Vec<Type>>,
    exprs: RefCell<Vec<Expression>>,
    packages: FxHashMap<Name, SymbolId>,
    definitions: FxHashMap<Name, SymbolId>,
    /// Definitions in registration order, for deterministic root
    /// selection.
    definition_list: Vec<SymbolId>,
    /// Hoisted value symbols per enum type syntax, so type resolution
    /// can embed the member list into the enum type.
    enum_members: FxHashMap<SyntaxRef, Vec<SymbolId>>,
    root_symbol: SymbolId,
    root_scope: ScopeId,
    unit_scope: ScopeId,
    finalized: bool,
}

impl Compilation {
    pub fn new(interner: &'static StringInterner) -> Self {
        let mut comp = Compilation {
            interner,
            diagnostics: Diagnostics::new(),
            trees: Vec::new(),
            symbols: Vec::new(),
            scopes: Vec::new(),
            types: RefCell::new(types::builtin_types()),
            exprs: RefCell::new(Vec::new()),
            packages: FxHashMap::default(),
            definitions: FxHashMap::default(),
            definition_list: Vec::new(),
            enum_members: FxHashMap::default(),
            root_symbol: SymbolId(0),
            root_scope: ScopeId(0),
            unit_scope: ScopeId(0),
            finalized: false,
        };

        let root_symbol = comp.alloc_symbol(Symbol::new(
            SymbolKind::Root {
                scope: ScopeId(0), // patched below
            },
            interner.intern("$root"),
            alder_source::SourceLocation::NONE,
        ));
        let root_scope = comp.alloc_scope(Scope::new(root_symbol, None));
        comp.symbols[root_symbol.0 as usize].kind = SymbolKind::Root { scope: root_scope };
        comp.root_symbol = root_symbol;
        comp.root_scope = root_scope;

        let unit_symbol = comp.alloc_symbol(Symbol::new(
            SymbolKind::CompilationUnit {
                scope: ScopeId(0), // patched below
            },
            interner.intern("$unit"),
            alder_source::SourceLocation::NONE,
        ));
        let unit_scope = comp.alloc_scope(Scope::new(unit_symbol, Some(root_scope)));
        comp.symbols[unit_symbol.0 as usize].kind =
            SymbolKind::CompilationUnit { scope: unit_scope };
        comp.add_member(root_scope, unit_symbol);
        comp.unit_scope = unit_scope;

        comp
    }

    // === Arena access ===

    pub fn interner(&self) -> &'static StringInterner {
        self.interner
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub(crate) fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    pub fn tree(&self, id: TreeId) -> &SyntaxTree {
        &self.trees[id.0 as usize]
    }

    pub(crate) fn types_ref(&self) -> Ref<'_, Vec<Type>> {
        self.types.borrow()
    }

    pub(crate) fn types_mut(&self) -> RefMut<'_, Vec<Type>> {
        self.types.borrow_mut()
    }

    pub fn expr(&self, id: ExprId) -> Expression {
        self.exprs.borrow()[id.0 as usize].clone()
    }

    pub(crate) fn alloc_expr(&self, expr: Expression) -> ExprId {
        let mut exprs = self.exprs.borrow_mut();
        let id = ExprId(exprs.len() as u32);
        exprs.push(expr);
        id
    }

    pub(crate) fn alloc_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    pub(crate) fn alloc_scope(&mut self, scope: Scope) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(scope);
        id
    }

    pub fn root_scope(&self) -> ScopeId {
        self.root_scope
    }

    pub fn root_symbol(&self) -> SymbolId {
        self.root_symbol
    }

    pub fn unit_scope(&self) -> ScopeId {
        self.unit_scope
    }

    pub fn packages(&self) -> &FxHashMap<Name, SymbolId> {
        &self.packages
    }

    /// Hoisted value symbols of an enum type, keyed by its syntax.
    pub fn enum_members_of(&self, syntax: SyntaxRef) -> Vec<SymbolId> {
        self.enum_members.get(&syntax).cloned().unwrap_or_default()
    }

    pub(crate) fn packages_mut(&mut self) -> &mut FxHashMap<Name, SymbolId> {
        &mut self.packages
    }

    pub fn definitions(&self) -> &FxHashMap<Name, SymbolId> {
        &self.definitions
    }

    pub(crate) fn definitions_mut(&mut self) -> &mut FxHashMap<Name, SymbolId> {
        &mut self.definitions
    }

    // === Convenience queries (used by the driver and tests) ===

    /// Find a package by source name.
    pub fn get_package(&self, name: &str) -> Option<SymbolId> {
        self.packages.get(&self.interner.intern(name)).copied()
    }

    /// Find a definition by source name.
    pub fn get_definition(&self, name: &str) -> Option<SymbolId> {
        self.definitions.get(&self.interner.intern(name)).copied()
    }

    /// Top-level instances, in creation order.
    pub fn root_instances(&self) -> Vec<SymbolId> {
        self.scope(self.root_scope)
            .members
            .iter()
            .copied()
            .filter(|&id| matches!(self.symbol(id).kind, SymbolKind::Instance { .. }))
            .collect()
    }

    /// Touch every lazily computed fact in the elaborated design so
    /// the diagnostic sink is complete: parameter values, declared
    /// types, initializers, connections.
    pub fn force_elaborate(&self) {
        self.force_scope(self.root_scope);
    }

    fn force_scope(&self, scope: ScopeId) {
        let members: Vec<SymbolId> = self.scope(scope).members.clone();
        for member in members {
            let ctx = BindContext::new(self, scope);
            match &self.symbol(member).kind {
                SymbolKind::Parameter(_) => {
                    let _ = self.parameter_value(member);
                    let _ = self.value_type(member, &ctx);
                }
                SymbolKind::Variable { .. } => {
                    let _ = self.value_type(member, &ctx);
                    let _ = self.variable_initializer(member);
                }
                SymbolKind::Net { .. } => {
                    let _ = self.value_type(member, &ctx);
                }
                SymbolKind::TransparentMember { wrapped } => {
                    let wrapped = *wrapped;
                    if matches!(self.symbol(wrapped).kind, SymbolKind::EnumValue(_)) {
                        let _ = self.enum_value(wrapped);
                    }
                }
                SymbolKind::ContinuousAssign { .. } => {
                    let _ = self.continuous_assign_expr(member);
                }
                SymbolKind::Instance { body, ports, .. } => {
                    for &port in ports {
                        let _ = self.port_connection(port);
                        let _ = self.port_internal_connection(port);
                    }
                    self.force_scope(*body);
                    continue;
                }
                _ => {}
            }
            if let Some(child) = self.symbol(member).owned_scope() {
                self.force_scope(child);
            }
        }
    }

    /// Visit every symbol reachable from the root, depth first.
    pub fn visit_symbols(&self, mut visit: impl FnMut(SymbolId, &Symbol)) {
        fn walk(
            comp: &Compilation,
            scope: ScopeId,
            visit: &mut impl FnMut(SymbolId, &Symbol),
        ) {
            for &member in &comp.scope(scope).members {
                visit(member, comp.symbol(member));
                if let Some(child) = comp.symbol(member).owned_scope() {
                    walk(comp, child, visit);
                }
            }
        }
        walk(self, self.root_scope, &mut visit);
    }
}

/// Parse and elaborate a string in one step; the main entry point for
/// tests and simple drivers.
#[instrument(skip_all)]
pub fn compile_str(
    sources: &alder_source::SourceManager,
    text: &str,
    interner: &'static StringInterner,
) -> Compilation {
    let diagnostics = Diagnostics::new();
    let tree = alder_parse::parse_str(sources, text, interner, &diagnostics);
    let mut comp = Compilation::new(interner);
    // Parse-phase diagnostics flow into the compilation's sink so
    // callers see one ordered stream.
    for diag in diagnostics.collect() {
        comp.diagnostics.add(diag);
    }
    comp.add_tree(tree);
    comp.finalize();
    comp.force_elaborate();
    comp
}
