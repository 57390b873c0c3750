//! Scopes and name lookup.
//!
//! A scope owns an ordered list of members and a name map. Wildcard
//! imports live on a sideband list: they are invisible to `find` and
//! to the member list, and are only consulted when unqualified lookup
//! misses the local map.

use std::cell::RefCell;

use rustc_hash::FxHashMap;

use alder_diagnostic::{DiagCode, Diagnostic};
use alder_source::SourceRange;
use alder_syntax::Name;

use crate::symbol::{SymbolId, SymbolKind};
use crate::Compilation;

/// Index of a scope in the compilation's scope arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ScopeId(pub u32);

/// A container of symbols with name lookup.
#[derive(Debug)]
pub struct Scope {
    /// The symbol this scope belongs to.
    pub owner: SymbolId,
    /// Lexically enclosing scope.
    pub parent: Option<ScopeId>,
    /// Members in declaration order (wildcard imports excluded).
    pub members: Vec<SymbolId>,
    /// First-declared symbol per name.
    pub name_map: FxHashMap<Name, SymbolId>,
    /// Sideband list of wildcard imports, in declaration order.
    pub wildcard_imports: Vec<SymbolId>,
    /// Names already resolved through a wildcard import; a later
    /// declaration of the same name here is a collision.
    pub wildcard_uses: RefCell<FxHashMap<Name, SymbolId>>,
}

impl Scope {
    pub fn new(owner: SymbolId, parent: Option<ScopeId>) -> Self {
        Scope {
            owner,
            parent,
            members: Vec::new(),
            name_map: FxHashMap::default(),
            wildcard_imports: Vec::new(),
            wildcard_uses: RefCell::new(FxHashMap::default()),
        }
    }
}

impl Compilation {
    /// Insert a symbol at the end of a scope's member order and
    /// register its name. A duplicate name is recorded as a
    /// diagnostic; the first declaration keeps lookup precedence and
    /// the later one stays in the ordered member list.
    pub fn add_member(&mut self, scope: ScopeId, symbol: SymbolId) {
        self.symbol_mut(symbol).parent = Some(scope);

        // Wildcard imports never enter the map or member list.
        if matches!(
            self.symbol(symbol).kind,
            SymbolKind::WildcardImport { .. }
        ) {
            self.scope_mut(scope).wildcard_imports.push(symbol);
            return;
        }

        let name = self.symbol(symbol).name;
        let location = self.symbol(symbol).location;
        if name != Name::EMPTY {
            let collided = self
                .scope(scope)
                .wildcard_uses
                .borrow()
                .contains_key(&name);
            if collided {
                self.diagnostics().add(
                    Diagnostic::new(
                        DiagCode::ImportNameCollision,
                        SourceRange::point(location),
                    )
                    .with_arg(self.interner().get(name)),
                );
            }

            match self.scope(scope).name_map.get(&name).copied() {
                None => {
                    self.scope_mut(scope).name_map.insert(name, symbol);
                }
                Some(prev) => {
                    let prev_loc = self.symbol(prev).location;
                    self.diagnostics().add(
                        Diagnostic::new(
                            DiagCode::DuplicateDefinition,
                            SourceRange::point(location),
                        )
                        .with_arg(self.interner().get(name))
                        .with_note("previously declared here", SourceRange::point(prev_loc)),
                    );
                }
            }
        }
        self.scope_mut(scope).members.push(symbol);
    }

    /// Exact-match lookup in one scope. Does not consult wildcard
    /// imports and does not unwrap transparent members.
    pub fn find(&self, scope: ScopeId, name: Name) -> Option<SymbolId> {
        self.scope(scope).name_map.get(&name).copied()
    }

    /// Unwrap a transparent member to the symbol it exposes.
    pub fn unwrap_transparent(&self, symbol: SymbolId) -> SymbolId {
        match self.symbol(symbol).kind {
            SymbolKind::TransparentMember { wrapped } => wrapped,
            _ => symbol,
        }
    }

    /// Unqualified lookup: local map, then wildcard imports in
    /// declaration order, then the parent scope. Ambiguity across
    /// wildcard imports is an error naming all candidates.
    pub fn lookup_unqualified(
        &self,
        scope: ScopeId,
        name: Name,
        use_range: SourceRange,
    ) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(scope_id) = current {
            if let Some(found) = self.find(scope_id, name) {
                let found = self.unwrap_transparent(found);
                if let Some(resolved) = self.resolve_import(found, use_range) {
                    return Some(resolved);
                }
                return None;
            }

            if let Some(found) = self.lookup_in_wildcards(scope_id, name, use_range) {
                return Some(found);
            }
            current = self.scope(scope_id).parent;
        }

        self.diagnostics().add(
            Diagnostic::new(DiagCode::UndeclaredIdentifier, use_range)
                .with_arg(self.interner().get(name)),
        );
        None
    }

    /// Like [`lookup_unqualified`] but silent on failure; used by
    /// probes that have their own diagnostics.
    ///
    /// [`lookup_unqualified`]: Compilation::lookup_unqualified
    pub fn lookup_unqualified_quiet(&self, scope: ScopeId, name: Name) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(scope_id) = current {
            if let Some(found) = self.find(scope_id, name) {
                let found = self.unwrap_transparent(found);
                return self.resolve_import(found, SourceRange::NONE);
            }
            if let Some(found) = self.lookup_in_wildcards_quiet(scope_id, name) {
                return Some(found);
            }
            current = self.scope(scope_id).parent;
        }
        None
    }

    fn lookup_in_wildcards(
        &self,
        scope_id: ScopeId,
        name: Name,
        use_range: SourceRange,
    ) -> Option<SymbolId> {
        let mut candidates: Vec<SymbolId> = Vec::new();
        for &import in &self.scope(scope_id).wildcard_imports {
            let SymbolKind::WildcardImport { package_name, .. } = self.symbol(import).kind
            else {
                continue;
            };
            if let Some(pkg_scope) = self.package_scope(import, package_name) {
                if let Some(found) = self.find(pkg_scope, name) {
                    let found = self.unwrap_transparent(found);
                    if !candidates.contains(&found) {
                        candidates.push(found);
                    }
                }
            }
        }
        match candidates.len() {
            0 => None,
            1 => {
                // Record the use so a later local declaration of the
                // same name can be flagged.
                self.scope(scope_id)
                    .wildcard_uses
                    .borrow_mut()
                    .entry(name)
                    .or_insert(candidates[0]);
                Some(candidates[0])
            }
            _ => {
                // Every candidate is reported, with where it came
                // from.
                let mut diag = Diagnostic::new(DiagCode::AmbiguousWildcardImport, use_range)
                    .with_arg(self.interner().get(name));
                for &candidate in &candidates {
                    let package = self.enclosing_package_name(candidate);
                    diag = diag.with_note(
                        format!(
                            "candidate imported from package '{}'",
                            self.interner().get(package)
                        ),
                        SourceRange::point(self.symbol(candidate).location),
                    );
                }
                self.diagnostics().add(diag);
                Some(candidates[0])
            }
        }
    }

    /// Name of the package a symbol was declared in, walking out
    /// through its owning scopes.
    fn enclosing_package_name(&self, symbol: SymbolId) -> Name {
        let mut scope = self.symbol(symbol).parent;
        while let Some(scope_id) = scope {
            let owner = self.scope(scope_id).owner;
            if matches!(self.symbol(owner).kind, SymbolKind::Package { .. }) {
                return self.symbol(owner).name;
            }
            scope = self.scope(scope_id).parent;
        }
        Name::EMPTY
    }

    fn lookup_in_wildcards_quiet(&self, scope_id: ScopeId, name: Name) -> Option<SymbolId> {
        for &import in &self.scope(scope_id).wildcard_imports {
            let SymbolKind::WildcardImport { package_name, .. } = self.symbol(import).kind
            else {
                continue;
            };
            if let Some(pkg_scope) = self.package_scope(import, package_name) {
                if let Some(found) = self.find(pkg_scope, name) {
                    return Some(self.unwrap_transparent(found));
                }
            }
        }
        None
    }

    /// The scope of a wildcard import's package, resolved once.
    fn package_scope(&self, import: SymbolId, package_name: Name) -> Option<ScopeId> {
        let SymbolKind::WildcardImport { package, .. } = &self.symbol(import).kind else {
            return None;
        };
        let pkg = *package.get_or_init(|| self.packages().get(&package_name).copied());
        pkg.and_then(|p| self.symbol(p).owned_scope())
    }

    /// Resolve an explicit import to its target, lazily, on first
    /// lookup through it.
    fn resolve_import(&self, symbol: SymbolId, use_range: SourceRange) -> Option<SymbolId> {
        let SymbolKind::ExplicitImport {
            package_name,
            import_name,
            package,
            resolved,
        } = &self.symbol(symbol).kind
        else {
            return Some(symbol);
        };

        let result = *resolved.get_or_init(|| {
            let pkg = *package.get_or_init(|| self.packages().get(package_name).copied());
            let Some(pkg) = pkg else {
                self.diagnostics().add(
                    Diagnostic::new(DiagCode::UnknownPackage, use_range)
                        .with_arg(self.interner().get(*package_name)),
                );
                return None;
            };
            let pkg_scope = self.symbol(pkg).owned_scope()?;
            match self.find(pkg_scope, *import_name) {
                Some(target) => Some(self.unwrap_transparent(target)),
                None => {
                    self.diagnostics().add(
                        Diagnostic::new(DiagCode::UnknownPackageMember, use_range)
                            .with_arg(self.interner().get(*package_name))
                            .with_arg(self.interner().get(*import_name)),
                    );
                    None
                }
            }
        });
        result
    }

    /// Qualified lookup through one step: find `name` as a member of
    /// `base` (a package, instance, or modport). Diagnoses per-step
    /// failures.
    pub fn lookup_member(
        &self,
        base: SymbolId,
        name: Name,
        use_range: SourceRange,
    ) -> Option<SymbolId> {
        let base = self.unwrap_transparent(base);
        match &self.symbol(base).kind {
            SymbolKind::Package { scope }
            | SymbolKind::Instance { body: scope, .. }
            | SymbolKind::CompilationUnit { scope }
            | SymbolKind::Root { scope } => match self.find(*scope, name) {
                Some(found) => Some(self.unwrap_transparent(found)),
                None => {
                    self.diagnostics().add(
                        Diagnostic::new(DiagCode::NotAMember, use_range)
                            .with_arg(self.interner().get(name))
                            .with_arg(self.interner().get(self.symbol(base).name)),
                    );
                    None
                }
            },
            SymbolKind::Modport { scope } => match self.find(*scope, name) {
                Some(found) => Some(self.unwrap_transparent(found)),
                None => {
                    self.diagnostics().add(
                        Diagnostic::new(DiagCode::AccessViolation, use_range)
                            .with_arg(self.interner().get(self.symbol(base).name))
                            .with_arg(self.interner().get(name)),
                    );
                    None
                }
            },
            _ => {
                self.diagnostics().add(
                    Diagnostic::new(DiagCode::NotAMember, use_range)
                        .with_arg(self.interner().get(name))
                        .with_arg(self.interner().get(self.symbol(base).name)),
                );
                None
            }
        }
    }

    /// `pkg::name` lookup, diagnosing an unknown package.
    pub fn lookup_package_qualified(
        &self,
        package_name: Name,
        name: Name,
        use_range: SourceRange,
    ) -> Option<SymbolId> {
        let Some(&pkg) = self.packages().get(&package_name) else {
            self.diagnostics().add(
                Diagnostic::new(DiagCode::UnknownPackage, use_range)
                    .with_arg(self.interner().get(package_name)),
            );
            return None;
        };
        self.lookup_member(pkg, name, use_range)
    }
}
