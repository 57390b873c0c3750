//! The symbol hierarchy.
//!
//! Symbols are arena-allocated in the [`Compilation`] and addressed by
//! [`SymbolId`]. Ownership is strictly tree shaped: each scope owns its
//! members. Everything else (a port's internal symbol, an import's
//! resolved target, an instance's definition) is a non-owning
//! `SymbolId` cross-reference, possibly absent.
//!
//! Lazily computed state (parameter values, resolved imports, variable
//! types, external connections) lives in write-once cells: the core is
//! single-threaded, so compute-if-absent needs no synchronization.
//!
//! [`Compilation`]: crate::Compilation

use std::cell::{Cell, OnceCell, RefCell};

use alder_num::ConstantValue;
use alder_source::SourceLocation;
use alder_syntax::{Name, NodeId};

use crate::scope::ScopeId;
use crate::types::TypeId;

/// Index of a symbol in the compilation's symbol arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SymbolId(pub u32);

/// Index of a parsed tree registered with the compilation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TreeId(pub u32);

/// A node in a specific syntax tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SyntaxRef {
    pub tree: TreeId,
    pub node: NodeId,
}

/// Index of a bound expression in the compilation's expression arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ExprId(pub u32);

/// Data flow direction of a port or argument.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Input,
    Output,
    Inout,
    Ref,
}

/// What kind of design element a definition describes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DefinitionKind {
    Module,
    Interface,
    Program,
}

/// Net type keywords.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NetKind {
    Wire,
    Tri,
    Tri0,
    Tri1,
    Wand,
    Wor,
    Triand,
    Trior,
    Trireg,
    Supply0,
    Supply1,
    Uwire,
}

/// Procedural block kinds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProceduralKind {
    Initial,
    Final,
    Always,
    AlwaysComb,
    AlwaysFf,
    AlwaysLatch,
}

/// A declared entity with a lazily resolved type.
#[derive(Debug, Default)]
pub struct DeclaredType {
    /// The data type syntax node; absent means fully implicit.
    pub type_syntax: Option<SyntaxRef>,
    /// The declarator, for unpacked dimensions.
    pub declarator: Option<SyntaxRef>,
    /// Resolved type, computed on first use.
    pub resolved: OnceCell<TypeId>,
}

/// Parameter payload: declared type, initializer, optional override.
#[derive(Debug)]
pub struct ParameterData {
    pub is_local: bool,
    pub is_port: bool,
    pub declared: DeclaredType,
    pub initializer: Option<SyntaxRef>,
    /// Override expression from the instantiation site, bound in the
    /// scope it was written in.
    pub override_expr: Option<(SyntaxRef, ScopeId)>,
    pub value: OnceCell<ConstantValue>,
    /// Guards against self-referential parameter values.
    pub evaluating: Cell<bool>,
}

#[derive(Debug)]
pub struct PortData {
    pub direction: Direction,
    /// The in-body symbol this port connects to (a net or variable of
    /// the same name), if any.
    pub internal_symbol: OnceCell<SymbolId>,
    /// Connection provided at an instantiation site: the expression
    /// syntax plus the scope to bind it in. Wildcard connections store
    /// no syntax and resolve by name instead.
    pub external: RefCell<Option<ExternalConnection>>,
    /// Bound external connection expression.
    pub external_expr: OnceCell<Option<ExprId>>,
    /// For explicit ports, the expression controlling how the port
    /// connects to the instance's internals.
    pub internal_connection: Option<SyntaxRef>,
    /// Default value used for the port when no connection is given.
    pub default_syntax: Option<SyntaxRef>,
}

#[derive(Debug, Clone)]
pub enum ExternalConnection {
    /// `.name(expr)` or an ordered expression.
    Expr(SyntaxRef, ScopeId),
    /// `.name` / `.*`: resolve `name` in the instantiation scope.
    Implicit(ScopeId),
    /// `.name()` — explicitly unconnected.
    Open,
}

#[derive(Debug)]
pub struct InterfacePortData {
    /// The interface definition this port requires.
    pub interface_def: OnceCell<SymbolId>,
    /// Modport name written on the port type (`iface.mp name`).
    pub modport_name: Option<Name>,
    /// The modport symbol, resolved against the connected instance.
    pub modport: OnceCell<SymbolId>,
    /// The connected interface instance, attached by
    /// `make_connections`.
    pub connection: OnceCell<SymbolId>,
}

#[derive(Debug)]
pub struct SubroutineData {
    pub is_task: bool,
    pub scope: ScopeId,
    pub return_type: DeclaredType,
    pub args: Vec<SymbolId>,
    /// Statements of the body, in syntax form.
    pub body: Vec<SyntaxRef>,
    /// The return expression, when the body is a single return;
    /// used by constant evaluation of function calls.
    pub return_expr: OnceCell<Option<ExprId>>,
}

#[derive(Debug)]
pub struct EnumValueData {
    /// Position within the enum, for implicit value assignment.
    pub index: u32,
    /// Explicit initializer, if written.
    pub initializer: Option<SyntaxRef>,
    /// The previous member, for `previous + 1` implicit values.
    pub previous: Option<SymbolId>,
    /// Base type syntax of the enclosing enum, if written.
    pub base_syntax: Option<SyntaxRef>,
    /// The enum's resolved base type.
    pub base: OnceCell<TypeId>,
    pub value: OnceCell<ConstantValue>,
    pub evaluating: Cell<bool>,
}

/// The payload of a symbol, by kind.
#[derive(Debug)]
pub enum SymbolKind {
    /// The root of the hierarchy (`$root`).
    Root { scope: ScopeId },
    /// One compilation unit (`$unit`).
    CompilationUnit { scope: ScopeId },
    Package { scope: ScopeId },
    /// The blueprint of a module/interface/program.
    Definition {
        def_kind: DefinitionKind,
        syntax: SyntaxRef,
    },
    /// An elaborated instance of a definition.
    Instance {
        definition: SymbolId,
        body: ScopeId,
        /// The instance's ports, in declaration order. Ports are not
        /// in the body's name map: only their internal symbols are
        /// referenceable from inside.
        ports: Vec<SymbolId>,
    },
    Parameter(ParameterData),
    Port(PortData),
    InterfacePort(InterfacePortData),
    Net {
        net_kind: NetKind,
        declared: DeclaredType,
        initializer: Option<SyntaxRef>,
    },
    Variable {
        declared: DeclaredType,
        initializer: Option<SyntaxRef>,
        is_const: bool,
        initializer_expr: OnceCell<Option<ExprId>>,
    },
    FormalArgument {
        direction: Direction,
        declared: DeclaredType,
    },
    Subroutine(SubroutineData),
    Modport { scope: ScopeId },
    /// One signal exposed by a modport.
    ModportPort {
        direction: Direction,
        internal: OnceCell<SymbolId>,
    },
    EnumValue(EnumValueData),
    /// Wrapper that makes a member of a nested construct visible in
    /// an enclosing scope; lookup unwraps it at the boundary.
    TransparentMember { wrapped: SymbolId },
    ExplicitImport {
        package_name: Name,
        import_name: Name,
        package: OnceCell<Option<SymbolId>>,
        resolved: OnceCell<Option<SymbolId>>,
    },
    /// Wildcard import: never in any name map, only on the scope's
    /// sideband list.
    WildcardImport {
        package_name: Name,
        package: OnceCell<Option<SymbolId>>,
    },
    ContinuousAssign {
        assignment: SyntaxRef,
        bound: OnceCell<ExprId>,
    },
    ProceduralBlock {
        kind: ProceduralKind,
        body: Option<SyntaxRef>,
    },
    TypeAlias {
        target: DeclaredType,
    },
}

/// A named entity in the design.
#[derive(Debug)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: Name,
    pub location: SourceLocation,
    /// The owning scope; `None` only for the root symbol.
    pub parent: Option<ScopeId>,
}

impl Symbol {
    pub fn new(kind: SymbolKind, name: Name, location: SourceLocation) -> Self {
        Symbol {
            kind,
            name,
            location,
            parent: None,
        }
    }

    /// The scope this symbol introduces, for container symbols.
    pub fn owned_scope(&self) -> Option<ScopeId> {
        match &self.kind {
            SymbolKind::Root { scope }
            | SymbolKind::CompilationUnit { scope }
            | SymbolKind::Package { scope }
            | SymbolKind::Instance { body: scope, .. }
            | SymbolKind::Modport { scope }
            | SymbolKind::Subroutine(SubroutineData { scope, .. }) => Some(*scope),
            _ => None,
        }
    }

    /// Whether this symbol carries a value with a declared type.
    pub fn is_value(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Parameter(_)
                | SymbolKind::Port(_)
                | SymbolKind::Net { .. }
                | SymbolKind::Variable { .. }
                | SymbolKind::FormalArgument { .. }
                | SymbolKind::EnumValue(_)
        )
    }
}
