//! Lowering syntax into the symbol graph.
//!
//! [`Compilation::add_tree`] registers packages (elaborated eagerly —
//! they cannot instantiate anything) and definitions (kept as
//! blueprints). [`Compilation::finalize`] picks the design roots —
//! definitions never instantiated elsewhere — and elaborates an
//! instance hierarchy under `$root`.

use alder_diagnostic::{DiagCode, Diagnostic};
use alder_source::SourceLocation;
use alder_syntax::{
    ident_of, AnsiPortDecl, ContinuousAssignView, DataDecl, Declarator, DefinitionDecl,
    EnumTypeView, ImportDecl, ImportItem, InstantiationView, ModportDeclView, ModportItemView,
    Name, NetDecl, NodeId, PackageDecl, ParameterDecl, PortDecl, ProceduralBlockView,
    SubroutineDecl, SubroutinePortView, SyntaxKind, SyntaxTree, TokenKind, TypedefDecl,
};
use tracing::{debug, instrument};

use crate::scope::{Scope, ScopeId};
use crate::symbol::{
    DeclaredType, DefinitionKind, Direction, EnumValueData, ExternalConnection, InterfacePortData,
    NetKind, ParameterData, PortData, ProceduralKind, SubroutineData, Symbol, SymbolId, SymbolKind,
    SyntaxRef, TreeId,
};
use crate::Compilation;

/// Instantiation depth bound; real designs are far shallower, and a
/// module that instantiates itself would otherwise never terminate.
const MAX_INSTANCE_DEPTH: u32 = 128;

impl Compilation {
    /// Register a parsed file: packages and `$unit` items elaborate
    /// immediately, definitions are recorded for [`finalize`].
    ///
    /// [`finalize`]: Compilation::finalize
    #[instrument(skip_all)]
    pub fn add_tree(&mut self, tree: SyntaxTree) -> TreeId {
        let tree_id = TreeId(self.trees.len() as u32);
        self.trees.push(tree);

        let root = self.tree(tree_id).root();
        let members: Vec<NodeId> = self.tree(tree_id).child_nodes(root).collect();
        for node in members {
            let kind = self.tree(tree_id).kind(node);
            match kind {
                SyntaxKind::ModuleDeclaration
                | SyntaxKind::InterfaceDeclaration
                | SyntaxKind::ProgramDeclaration => {
                    self.register_definition(SyntaxRef {
                        tree: tree_id,
                        node,
                    });
                }
                SyntaxKind::PackageDeclaration => {
                    self.create_package(SyntaxRef {
                        tree: tree_id,
                        node,
                    });
                }
                _ => {
                    // Everything else is a compilation-unit item.
                    let unit = self.unit_scope();
                    self.elaborate_member(unit, SyntaxRef { tree: tree_id, node }, 0);
                }
            }
        }
        tree_id
    }

    /// Instantiate every definition that no other definition
    /// instantiates; these are the design roots.
    #[instrument(skip_all)]
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        let mut instantiated: Vec<Name> = Vec::new();
        for &def in &self.definition_list {
            let SymbolKind::Definition { syntax, .. } = self.symbol(def).kind else {
                continue;
            };
            // A definition that instantiates itself still counts as a
            // root candidate; the depth limit reports the recursion.
            let own_name = self.symbol(def).name;
            let mut names = Vec::new();
            self.collect_instantiated_names(syntax, &mut names);
            for name in names {
                if name != own_name && !instantiated.contains(&name) {
                    instantiated.push(name);
                }
            }
        }

        for def in self.definition_list.clone() {
            let name = self.symbol(def).name;
            if instantiated.contains(&name) {
                continue;
            }
            debug!(name = self.interner().get(name), "elaborating root instance");
            let loc = self.symbol(def).location;
            let root_scope = self.root_scope();
            self.create_instance(def, name, loc, None, None, root_scope, root_scope, 0);
        }
    }

    fn collect_instantiated_names(&self, syntax: SyntaxRef, out: &mut Vec<Name>) {
        fn walk(tree: &SyntaxTree, node: NodeId, out: &mut Vec<Name>) {
            if tree.kind(node) == SyntaxKind::HierarchyInstantiation {
                if let Some(view) = InstantiationView::cast(tree, node) {
                    if let Some(name) = view.type_name(tree) {
                        if !out.contains(&name) {
                            out.push(name);
                        }
                    }
                }
            }
            for child in tree.child_nodes(node) {
                walk(tree, child, out);
            }
        }
        walk(self.tree(syntax.tree), syntax.node, out);
    }

    // === Packages and definitions ===

    fn register_definition(&mut self, syntax: SyntaxRef) {
        let tree = self.tree(syntax.tree);
        let Some(view) = DefinitionDecl::cast(tree, syntax.node) else {
            return;
        };
        let def_kind = match tree.kind(syntax.node) {
            SyntaxKind::InterfaceDeclaration => DefinitionKind::Interface,
            SyntaxKind::ProgramDeclaration => DefinitionKind::Program,
            _ => DefinitionKind::Module,
        };
        let name = view.name(tree).unwrap_or(Name::EMPTY);
        let location = self.node_location(syntax);

        let symbol = self.alloc_symbol(Symbol::new(
            SymbolKind::Definition { def_kind, syntax },
            name,
            location,
        ));
        self.symbol_mut(symbol).parent = Some(self.unit_scope());
        if name != Name::EMPTY {
            if let Some(&prev) = self.definitions().get(&name) {
                let prev_loc = self.symbol(prev).location;
                self.diagnostics().add(
                    Diagnostic::at(DiagCode::DuplicateDefinition, location)
                        .with_arg(self.interner().get(name))
                        .with_note(
                            "previously declared here",
                            alder_source::SourceRange::point(prev_loc),
                        ),
                );
            } else {
                self.definitions_mut().insert(name, symbol);
            }
        }
        self.definition_list.push(symbol);
    }

    fn create_package(&mut self, syntax: SyntaxRef) {
        let tree = self.tree(syntax.tree);
        let Some(view) = PackageDecl::cast(tree, syntax.node) else {
            return;
        };
        let name = view.name(tree).unwrap_or(Name::EMPTY);
        let location = self.node_location(syntax);
        let members: Vec<NodeId> = view.members(tree).collect();

        let symbol = self.alloc_symbol(Symbol::new(
            SymbolKind::Package { scope: ScopeId(0) },
            name,
            location,
        ));
        let unit = self.unit_scope();
        let scope = self.alloc_scope(Scope::new(symbol, Some(unit)));
        self.patch_scope(symbol, scope);

        let root = self.root_scope();
        self.add_member(root, symbol);
        if name != Name::EMPTY {
            self.packages_mut().insert(name, symbol);
        }

        for node in members {
            self.elaborate_member(
                scope,
                SyntaxRef {
                    tree: syntax.tree,
                    node,
                },
                0,
            );
        }
    }

    fn patch_scope(&mut self, symbol: SymbolId, scope: ScopeId) {
        match &mut self.symbol_mut(symbol).kind {
            SymbolKind::Package { scope: s }
            | SymbolKind::Instance { body: s, .. }
            | SymbolKind::Modport { scope: s } => *s = scope,
            SymbolKind::Subroutine(data) => data.scope = scope,
            _ => {}
        }
    }

    // === Instances ===

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn create_instance(
        &mut self,
        definition: SymbolId,
        name: Name,
        location: SourceLocation,
        param_assignments: Option<SyntaxRef>,
        instance_syntax: Option<SyntaxRef>,
        parent_scope: ScopeId,
        instantiation_scope: ScopeId,
        depth: u32,
    ) -> Option<SymbolId> {
        if depth > MAX_INSTANCE_DEPTH {
            self.diagnostics()
                .add(Diagnostic::at(DiagCode::MaxInstanceDepthExceeded, location));
            return None;
        }

        let SymbolKind::Definition { syntax, .. } = self.symbol(definition).kind else {
            return None;
        };

        let symbol = self.alloc_symbol(Symbol::new(
            SymbolKind::Instance {
                definition,
                body: ScopeId(0),
                ports: Vec::new(),
            },
            name,
            location,
        ));
        // The body nests lexically where the definition was written,
        // not where it is instantiated.
        let unit = self.unit_scope();
        let body = self.alloc_scope(Scope::new(symbol, Some(unit)));
        self.patch_scope(symbol, body);
        self.add_member(parent_scope, symbol);

        let tree = self.tree(syntax.tree);
        let view = DefinitionDecl::cast(tree, syntax.node)?;
        let header = view.header(tree);
        let param_ports = header.and_then(|h| h.parameter_ports(tree));
        let port_list = header.and_then(|h| h.port_list(tree));
        let body_members: Vec<NodeId> = view.members(tree).collect();

        if let Some(param_ports) = param_ports {
            self.elaborate_parameter_ports(
                body,
                SyntaxRef {
                    tree: syntax.tree,
                    node: param_ports,
                },
                param_assignments,
                instantiation_scope,
            );
        }

        let ports = if let Some(port_list) = port_list {
            self.make_ports(
                body,
                SyntaxRef {
                    tree: syntax.tree,
                    node: port_list,
                },
            )
        } else {
            Vec::new()
        };
        if let SymbolKind::Instance { ports: p, .. } = &mut self.symbol_mut(symbol).kind {
            *p = ports;
        }

        for node in body_members {
            self.elaborate_member(
                body,
                SyntaxRef {
                    tree: syntax.tree,
                    node,
                },
                depth,
            );
        }

        if let Some(instance_syntax) = instance_syntax {
            self.make_connections(symbol, instance_syntax, instantiation_scope);
        }
        Some(symbol)
    }

    /// Parameter ports, with overrides paired to the instantiation's
    /// ordered or named assignments. Port parameters may be set by
    /// name in any order; body parameters may not be overridden.
    fn elaborate_parameter_ports(
        &mut self,
        scope: ScopeId,
        param_ports: SyntaxRef,
        assignments: Option<SyntaxRef>,
        instantiation_scope: ScopeId,
    ) {
        // Gather override syntax first.
        let mut ordered: Vec<SyntaxRef> = Vec::new();
        let mut named: Vec<(Name, Option<SyntaxRef>, SourceLocation)> = Vec::new();
        if let Some(assignments) = assignments {
            let tree = self.tree(assignments.tree);
            for child in tree.child_nodes(assignments.node) {
                match tree.kind(child) {
                    SyntaxKind::OrderedParamAssignment => {
                        if let Some(expr) = tree.child_nodes(child).next() {
                            ordered.push(SyntaxRef {
                                tree: assignments.tree,
                                node: expr,
                            });
                        }
                    }
                    SyntaxKind::NamedParamAssignment => {
                        let name = ident_of(tree, child).unwrap_or(Name::EMPTY);
                        let expr = tree.child_nodes(child).next().map(|n| SyntaxRef {
                            tree: assignments.tree,
                            node: n,
                        });
                        let loc = tree.range(child).start;
                        named.push((name, expr, loc));
                    }
                    _ => {}
                }
            }
        }

        let tree_id = param_ports.tree;
        let decls: Vec<NodeId> = self
            .tree(tree_id)
            .children_of_kind(param_ports.node, SyntaxKind::ParameterDeclaration)
            .collect();

        let mut port_index = 0usize;
        let mut param_names: Vec<Name> = Vec::new();
        for decl in decls {
            let tree = self.tree(tree_id);
            let Some(view) = ParameterDecl::cast(tree, decl) else {
                continue;
            };
            let is_local = view.is_local(tree);
            let type_syntax = view.data_type(tree).map(|node| SyntaxRef {
                tree: tree_id,
                node,
            });
            let declarators: Vec<Declarator> = view.declarators(tree).collect();

            for declarator in declarators {
                let tree = self.tree(tree_id);
                let name = declarator.name(tree).unwrap_or(Name::EMPTY);
                let location = declarator
                    .name_token(tree)
                    .map(|t| t.location)
                    .unwrap_or(SourceLocation::NONE);
                let initializer = declarator.initializer(tree).map(|node| SyntaxRef {
                    tree: tree_id,
                    node,
                });
                let declarator_ref = SyntaxRef {
                    tree: tree_id,
                    node: declarator.id(),
                };

                let override_expr = if is_local {
                    None
                } else {
                    let by_position = ordered.get(port_index).copied();
                    port_index += 1;
                    let by_name = named
                        .iter()
                        .find(|(n, _, _)| *n == name)
                        .and_then(|(_, expr, _)| *expr);
                    by_name.or(by_position)
                };
                param_names.push(name);

                let symbol = self.alloc_symbol(Symbol::new(
                    SymbolKind::Parameter(ParameterData {
                        is_local,
                        is_port: true,
                        declared: DeclaredType {
                            type_syntax,
                            declarator: Some(declarator_ref),
                            resolved: Default::default(),
                        },
                        initializer,
                        override_expr: override_expr.map(|e| (e, instantiation_scope)),
                        value: Default::default(),
                        evaluating: Default::default(),
                    }),
                    name,
                    location,
                ));
                self.add_member(scope, symbol);
                // Parameters evaluate in declaration order; eager
                // evaluation keeps diagnostics in source order and
                // records wildcard-import uses before later
                // declarations can collide with them.
                let _ = self.parameter_value(symbol);
            }
        }

        // Named assignments that matched nothing.
        let owner_name = self.symbol(self.scope(scope).owner).name;
        for (name, _, loc) in named {
            if !param_names.contains(&name) {
                self.diagnostics().add(
                    Diagnostic::at(DiagCode::ParameterDoesNotExist, loc)
                        .with_arg(self.interner().get(owner_name))
                        .with_arg(self.interner().get(name)),
                );
            }
        }
    }

    // === Ports ===

    /// Build port symbols from an ANSI or non-ANSI header port list.
    /// Non-ANSI references are completed later by body
    /// `PortDeclaration` members, which merge direction and type.
    fn make_ports(&mut self, body: ScopeId, port_list: SyntaxRef) -> Vec<SymbolId> {
        let tree_id = port_list.tree;
        let list_kind = self.tree(tree_id).kind(port_list.node);
        let mut ports = Vec::new();

        match list_kind {
            SyntaxKind::NonAnsiPortList => {
                let refs: Vec<NodeId> = self
                    .tree(tree_id)
                    .children_of_kind(port_list.node, SyntaxKind::PortReference)
                    .collect();
                for node in refs {
                    let tree = self.tree(tree_id);
                    let name = ident_of(tree, node).unwrap_or(Name::EMPTY);
                    let location = tree.range(node).start;
                    let symbol = self.alloc_symbol(Symbol::new(
                        SymbolKind::Port(PortData {
                            direction: Direction::Inout,
                            internal_symbol: Default::default(),
                            external: Default::default(),
                            external_expr: Default::default(),
                            internal_connection: None,
                            default_syntax: None,
                        }),
                        name,
                        location,
                    ));
                    self.symbol_mut(symbol).parent = Some(body);
                    ports.push(symbol);
                }
            }
            SyntaxKind::AnsiPortList => {
                let decls: Vec<NodeId> = self.tree(tree_id).child_nodes(port_list.node).collect();
                let mut last_direction = Direction::Inout;
                for node in decls {
                    let kind = self.tree(tree_id).kind(node);
                    match kind {
                        SyntaxKind::AnsiPortDeclaration => {
                            if let Some(port) = self.make_ansi_port(
                                body,
                                SyntaxRef {
                                    tree: tree_id,
                                    node,
                                },
                                &mut last_direction,
                            ) {
                                ports.push(port);
                            }
                        }
                        SyntaxKind::ExplicitAnsiPort => {
                            let tree = self.tree(tree_id);
                            let name = ident_of(tree, node).unwrap_or(Name::EMPTY);
                            let location = tree.range(node).start;
                            let connection =
                                tree.child_nodes(node).next().map(|n| SyntaxRef {
                                    tree: tree_id,
                                    node: n,
                                });
                            let symbol = self.alloc_symbol(Symbol::new(
                                SymbolKind::Port(PortData {
                                    direction: last_direction,
                                    internal_symbol: Default::default(),
                                    external: Default::default(),
                                    external_expr: Default::default(),
                                    internal_connection: connection,
                                    default_syntax: None,
                                }),
                                name,
                                location,
                            ));
                            self.symbol_mut(symbol).parent = Some(body);
                            ports.push(symbol);
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        ports
    }

    fn make_ansi_port(
        &mut self,
        body: ScopeId,
        syntax: SyntaxRef,
        last_direction: &mut Direction,
    ) -> Option<SymbolId> {
        let tree = self.tree(syntax.tree);
        let view = AnsiPortDecl::cast(tree, syntax.node)?;

        let direction = view
            .direction(tree)
            .map(|t| direction_from_token(t.kind))
            .unwrap_or(*last_direction);
        *last_direction = direction;

        let declarator = view.declarator(tree)?;
        let name = declarator.name(tree).unwrap_or(Name::EMPTY);
        let location = declarator
            .name_token(tree)
            .map(|t| t.location)
            .unwrap_or(SourceLocation::NONE);
        let type_syntax = view.data_type(tree).map(|node| SyntaxRef {
            tree: syntax.tree,
            node,
        });
        let default_syntax = declarator.initializer(tree).map(|node| SyntaxRef {
            tree: syntax.tree,
            node,
        });
        let declarator_ref = SyntaxRef {
            tree: syntax.tree,
            node: declarator.id(),
        };
        let net_kind = view.net_type(tree).map(|t| net_kind_from_token(t.kind));
        let is_net_port = net_kind.is_some();

        // An interface port if the named type resolves to an
        // interface definition.
        if let Some(ts) = type_syntax {
            let tree = self.tree(ts.tree);
            if tree.kind(ts.node) == SyntaxKind::NamedType {
                let type_name = ident_of(tree, ts.node);
                let modport_name = tree
                    .child_tokens(ts.node)
                    .filter(|t| t.kind == TokenKind::Identifier)
                    .nth(1)
                    .and_then(|t| t.ident_name());
                if let Some(type_name) = type_name {
                    if let Some(&def) = self.definitions().get(&type_name) {
                        if matches!(
                            self.symbol(def).kind,
                            SymbolKind::Definition {
                                def_kind: DefinitionKind::Interface,
                                ..
                            }
                        ) {
                            return Some(self.make_interface_port(
                                body,
                                name,
                                location,
                                def,
                                modport_name,
                            ));
                        }
                    }
                }
            }
        }

        // The port's internal symbol carries the declared type and is
        // what names inside the body resolve to.
        // Input and inout ports default to nets; outputs with a data
        // type are variables.
        let defaults_to_net = matches!(direction, Direction::Input | Direction::Inout);
        let internal_kind = if is_net_port || type_syntax.is_none() || defaults_to_net {
            SymbolKind::Net {
                net_kind: net_kind.unwrap_or(NetKind::Wire),
                declared: DeclaredType {
                    type_syntax,
                    declarator: Some(declarator_ref),
                    resolved: Default::default(),
                },
                initializer: None,
            }
        } else {
            SymbolKind::Variable {
                declared: DeclaredType {
                    type_syntax,
                    declarator: Some(declarator_ref),
                    resolved: Default::default(),
                },
                initializer: None,
                is_const: false,
                initializer_expr: Default::default(),
            }
        };
        let internal = self.alloc_symbol(Symbol::new(internal_kind, name, location));
        self.add_member(body, internal);

        let port = self.alloc_symbol(Symbol::new(
            SymbolKind::Port(PortData {
                direction,
                internal_symbol: Default::default(),
                external: Default::default(),
                external_expr: Default::default(),
                internal_connection: None,
                default_syntax,
            }),
            name,
            location,
        ));
        self.symbol_mut(port).parent = Some(body);
        if let SymbolKind::Port(data) = &self.symbol(port).kind {
            let _ = data.internal_symbol.set(internal);
        }
        Some(port)
    }

    fn make_interface_port(
        &mut self,
        body: ScopeId,
        name: Name,
        location: SourceLocation,
        def: SymbolId,
        modport_name: Option<Name>,
    ) -> SymbolId {
        let data = InterfacePortData {
            interface_def: Default::default(),
            modport_name,
            modport: Default::default(),
            connection: Default::default(),
        };
        let _ = data.interface_def.set(def);
        let port = self.alloc_symbol(Symbol::new(
            SymbolKind::InterfacePort(data),
            name,
            location,
        ));
        self.symbol_mut(port).parent = Some(body);
        port
    }

    /// Pair an instantiation's connections with the instance's ports.
    fn make_connections(
        &mut self,
        instance: SymbolId,
        instance_syntax: SyntaxRef,
        instantiation_scope: ScopeId,
    ) {
        let SymbolKind::Instance { ports, .. } = &self.symbol(instance).kind else {
            return;
        };
        let ports = ports.clone();

        let tree = self.tree(instance_syntax.tree);
        let Some(view) = alder_syntax::InstanceView::cast(tree, instance_syntax.node) else {
            return;
        };
        let conns: Vec<NodeId> = view.connections(tree).collect();

        let mut ordered_index = 0usize;
        let mut connected: Vec<SymbolId> = Vec::new();
        let mut has_wildcard = false;

        for conn in conns {
            let tree = self.tree(instance_syntax.tree);
            let kind = tree.kind(conn);
            let loc = tree.range(conn).start;
            match kind {
                SyntaxKind::OrderedPortConnection => {
                    let expr = tree.child_nodes(conn).next();
                    if ordered_index >= ports.len() {
                        self.diagnostics().add(
                            Diagnostic::at(DiagCode::TooManyPortConnections, loc)
                                .with_arg(ports.len() as i64)
                                .with_arg((ordered_index + 1) as i64),
                        );
                        ordered_index += 1;
                        continue;
                    }
                    let port = ports[ordered_index];
                    ordered_index += 1;
                    if let Some(expr) = expr {
                        self.set_port_connection(
                            port,
                            ExternalConnection::Expr(
                                SyntaxRef {
                                    tree: instance_syntax.tree,
                                    node: expr,
                                },
                                instantiation_scope,
                            ),
                        );
                    }
                    connected.push(port);
                }
                SyntaxKind::NamedPortConnection => {
                    let name = ident_of(tree, conn).unwrap_or(Name::EMPTY);
                    let expr = tree.child_nodes(conn).next();
                    let has_parens = tree
                        .child_tokens(conn)
                        .any(|t| t.kind == TokenKind::OpenParen);
                    let Some(&port) = ports
                        .iter()
                        .find(|&&p| self.symbol(p).name == name)
                    else {
                        let owner = self.symbol(instance).name;
                        self.diagnostics().add(
                            Diagnostic::at(DiagCode::PortDoesNotExist, loc)
                                .with_arg(self.interner().get(owner))
                                .with_arg(self.interner().get(name)),
                        );
                        continue;
                    };
                    if connected.contains(&port) {
                        self.diagnostics().add(
                            Diagnostic::at(DiagCode::DuplicatePortConnection, loc)
                                .with_arg(self.interner().get(name)),
                        );
                        continue;
                    }
                    let connection = match expr {
                        Some(expr) => ExternalConnection::Expr(
                            SyntaxRef {
                                tree: instance_syntax.tree,
                                node: expr,
                            },
                            instantiation_scope,
                        ),
                        None if has_parens => ExternalConnection::Open,
                        None => ExternalConnection::Implicit(instantiation_scope),
                    };
                    self.set_port_connection(port, connection);
                    connected.push(port);
                }
                SyntaxKind::WildcardPortConnection => has_wildcard = true,
                _ => {}
            }
        }

        if has_wildcard {
            for &port in &ports {
                if !connected.contains(&port) {
                    self.set_port_connection(
                        port,
                        ExternalConnection::Implicit(instantiation_scope),
                    );
                }
            }
        }
    }

    fn set_port_connection(&mut self, port: SymbolId, connection: ExternalConnection) {
        match &self.symbol(port).kind {
            SymbolKind::Port(data) => {
                *data.external.borrow_mut() = Some(connection);
            }
            SymbolKind::InterfacePort(data) => {
                // Interface ports connect to an instance, resolved by
                // name in the instantiation scope.
                let (name, scope) = match connection {
                    ExternalConnection::Expr(syntax, scope) => {
                        // A plain identifier connection names the
                        // instance directly.
                        let tree = self.tree(syntax.tree);
                        let name = if tree.kind(syntax.node) == SyntaxKind::IdentifierName {
                            ident_of(tree, syntax.node).unwrap_or(self.symbol(port).name)
                        } else {
                            self.symbol(port).name
                        };
                        (name, scope)
                    }
                    ExternalConnection::Implicit(scope) => (self.symbol(port).name, scope),
                    ExternalConnection::Open => return,
                };
                if let Some(target) = self.lookup_unqualified_quiet(scope, name) {
                    if matches!(self.symbol(target).kind, SymbolKind::Instance { .. }) {
                        let _ = data.connection.set(target);
                        // Resolve the modport restriction against the
                        // connected instance.
                        if let Some(mp_name) = data.modport_name {
                            if let SymbolKind::Instance { body, .. } = self.symbol(target).kind
                            {
                                if let Some(mp) = self.find(body, mp_name) {
                                    if matches!(
                                        self.symbol(mp).kind,
                                        SymbolKind::Modport { .. }
                                    ) {
                                        let _ = data.modport.set(mp);
                                    }
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    // === Members ===

    pub(crate) fn elaborate_member(&mut self, scope: ScopeId, syntax: SyntaxRef, depth: u32) {
        let kind = self.tree(syntax.tree).kind(syntax.node);
        match kind {
            SyntaxKind::ParameterDeclaration => self.elaborate_body_parameters(scope, syntax),
            SyntaxKind::DataDeclaration => self.elaborate_data_declaration(scope, syntax),
            SyntaxKind::NetDeclaration => self.elaborate_net_declaration(scope, syntax),
            SyntaxKind::TypedefDeclaration => self.elaborate_typedef(scope, syntax),
            SyntaxKind::ImportDeclaration => self.elaborate_import(scope, syntax),
            SyntaxKind::FunctionDeclaration | SyntaxKind::TaskDeclaration => {
                self.elaborate_subroutine(scope, syntax)
            }
            SyntaxKind::ModportDeclaration => self.elaborate_modport(scope, syntax),
            SyntaxKind::ContinuousAssign => self.elaborate_continuous_assign(scope, syntax),
            SyntaxKind::ProceduralBlock => self.elaborate_procedural_block(scope, syntax),
            SyntaxKind::HierarchyInstantiation => {
                self.elaborate_instantiation(scope, syntax, depth)
            }
            SyntaxKind::PortDeclaration => self.elaborate_body_port_declaration(scope, syntax),
            SyntaxKind::ModuleDeclaration
            | SyntaxKind::InterfaceDeclaration
            | SyntaxKind::ProgramDeclaration => {
                // Nested definitions register like top-level ones.
                self.register_definition(syntax);
            }
            _ => {}
        }
    }

    fn elaborate_body_parameters(&mut self, scope: ScopeId, syntax: SyntaxRef) {
        let tree_id = syntax.tree;
        let tree = self.tree(tree_id);
        let Some(view) = ParameterDecl::cast(tree, syntax.node) else {
            return;
        };
        let is_local = view.is_local(tree);
        let type_syntax = view.data_type(tree).map(|node| SyntaxRef {
            tree: tree_id,
            node,
        });
        let declarators: Vec<Declarator> = view.declarators(tree).collect();

        for declarator in declarators {
            let tree = self.tree(tree_id);
            let name = declarator.name(tree).unwrap_or(Name::EMPTY);
            let location = declarator
                .name_token(tree)
                .map(|t| t.location)
                .unwrap_or(SourceLocation::NONE);
            let initializer = declarator.initializer(tree).map(|node| SyntaxRef {
                tree: tree_id,
                node,
            });
            let symbol = self.alloc_symbol(Symbol::new(
                SymbolKind::Parameter(ParameterData {
                    is_local,
                    is_port: false,
                    declared: DeclaredType {
                        type_syntax,
                        declarator: Some(SyntaxRef {
                            tree: tree_id,
                            node: declarator.id(),
                        }),
                        resolved: Default::default(),
                    },
                    initializer,
                    override_expr: None,
                    value: Default::default(),
                    evaluating: Default::default(),
                }),
                name,
                location,
            ));
            self.add_member(scope, symbol);
            let _ = self.parameter_value(symbol);
        }
    }

    fn elaborate_data_declaration(&mut self, scope: ScopeId, syntax: SyntaxRef) {
        let tree_id = syntax.tree;
        let tree = self.tree(tree_id);
        let Some(view) = DataDecl::cast(tree, syntax.node) else {
            return;
        };
        let is_const = view.is_const(tree);
        let type_syntax = view.data_type(tree).map(|node| SyntaxRef {
            tree: tree_id,
            node,
        });
        let declarators: Vec<Declarator> = view.declarators(tree).collect();

        // Enum members hoist into the enclosing scope.
        if let Some(ts) = type_syntax {
            if self.tree(ts.tree).kind(ts.node) == SyntaxKind::EnumType {
                self.hoist_enum_members(scope, ts);
            }
        }

        for declarator in declarators {
            let tree = self.tree(tree_id);
            let name = declarator.name(tree).unwrap_or(Name::EMPTY);
            let location = declarator
                .name_token(tree)
                .map(|t| t.location)
                .unwrap_or(SourceLocation::NONE);
            let initializer = declarator.initializer(tree).map(|node| SyntaxRef {
                tree: tree_id,
                node,
            });
            let symbol = self.alloc_symbol(Symbol::new(
                SymbolKind::Variable {
                    declared: DeclaredType {
                        type_syntax,
                        declarator: Some(SyntaxRef {
                            tree: tree_id,
                            node: declarator.id(),
                        }),
                        resolved: Default::default(),
                    },
                    initializer,
                    is_const,
                    initializer_expr: Default::default(),
                },
                name,
                location,
            ));
            self.add_member(scope, symbol);
        }
    }

    fn elaborate_net_declaration(&mut self, scope: ScopeId, syntax: SyntaxRef) {
        let tree_id = syntax.tree;
        let tree = self.tree(tree_id);
        let Some(view) = NetDecl::cast(tree, syntax.node) else {
            return;
        };
        let net_kind = view
            .net_type(tree)
            .map(|t| net_kind_from_token(t.kind))
            .unwrap_or(NetKind::Wire);
        let type_syntax = view.data_type(tree).map(|node| SyntaxRef {
            tree: tree_id,
            node,
        });
        let declarators: Vec<Declarator> = view.declarators(tree).collect();

        for declarator in declarators {
            let tree = self.tree(tree_id);
            let name = declarator.name(tree).unwrap_or(Name::EMPTY);
            let location = declarator
                .name_token(tree)
                .map(|t| t.location)
                .unwrap_or(SourceLocation::NONE);
            let initializer = declarator.initializer(tree).map(|node| SyntaxRef {
                tree: tree_id,
                node,
            });
            let symbol = self.alloc_symbol(Symbol::new(
                SymbolKind::Net {
                    net_kind,
                    declared: DeclaredType {
                        type_syntax,
                        declarator: Some(SyntaxRef {
                            tree: tree_id,
                            node: declarator.id(),
                        }),
                        resolved: Default::default(),
                    },
                    initializer,
                },
                name,
                location,
            ));
            self.add_member(scope, symbol);
        }
    }

    fn elaborate_typedef(&mut self, scope: ScopeId, syntax: SyntaxRef) {
        let tree_id = syntax.tree;
        let tree = self.tree(tree_id);
        let Some(view) = TypedefDecl::cast(tree, syntax.node) else {
            return;
        };
        let name = view.name(tree).unwrap_or(Name::EMPTY);
        let location = self.node_location(syntax);
        let target = view.data_type(tree).map(|node| SyntaxRef {
            tree: tree_id,
            node,
        });

        if let Some(ts) = target {
            if self.tree(ts.tree).kind(ts.node) == SyntaxKind::EnumType {
                self.hoist_enum_members(scope, ts);
            }
        }

        let symbol = self.alloc_symbol(Symbol::new(
            SymbolKind::TypeAlias {
                target: DeclaredType {
                    type_syntax: target,
                    declarator: None,
                    resolved: Default::default(),
                },
            },
            name,
            location,
        ));
        self.add_member(scope, symbol);
    }

    /// Create the hoisted enum-value symbols for an enum type written
    /// in this scope. Each value is wrapped in a transparent member so
    /// lookup finds it here but uses the value symbol itself.
    fn hoist_enum_members(&mut self, scope: ScopeId, enum_syntax: SyntaxRef) {
        let tree_id = enum_syntax.tree;
        let tree = self.tree(tree_id);
        let Some(view) = EnumTypeView::cast(tree, enum_syntax.node) else {
            return;
        };
        let base_syntax = view.base_type(tree).map(|node| SyntaxRef {
            tree: tree_id,
            node,
        });
        let members: Vec<_> = view.members(tree).collect();

        let mut previous: Option<SymbolId> = None;
        let mut value_symbols: Vec<SymbolId> = Vec::new();
        for (index, member) in members.into_iter().enumerate() {
            let tree = self.tree(tree_id);
            let name = member.name(tree).unwrap_or(Name::EMPTY);
            let location = member
                .name_token(tree)
                .map(|t| t.location)
                .unwrap_or(SourceLocation::NONE);
            let initializer = member.initializer(tree).map(|node| SyntaxRef {
                tree: tree_id,
                node,
            });

            let value_symbol = self.alloc_symbol(Symbol::new(
                SymbolKind::EnumValue(EnumValueData {
                    index: index as u32,
                    initializer,
                    previous,
                    base_syntax,
                    base: Default::default(),
                    value: Default::default(),
                    evaluating: Default::default(),
                }),
                name,
                location,
            ));
            self.symbol_mut(value_symbol).parent = Some(scope);

            let wrapper = self.alloc_symbol(Symbol::new(
                SymbolKind::TransparentMember {
                    wrapped: value_symbol,
                },
                name,
                location,
            ));
            self.add_member(scope, wrapper);
            previous = Some(value_symbol);
            value_symbols.push(value_symbol);
        }
        self.enum_members.insert(enum_syntax, value_symbols);
    }

    fn elaborate_import(&mut self, scope: ScopeId, syntax: SyntaxRef) {
        let tree_id = syntax.tree;
        let tree = self.tree(tree_id);
        let Some(view) = ImportDecl::cast(tree, syntax.node) else {
            return;
        };
        let items: Vec<ImportItem> = view.items(tree).collect();

        for item in items {
            let tree = self.tree(tree_id);
            let package_name = item.package_name(tree).unwrap_or(Name::EMPTY);
            let location = item
                .package_token(tree)
                .map(|t| t.location)
                .unwrap_or(SourceLocation::NONE);
            if item.is_wildcard(tree) {
                let symbol = self.alloc_symbol(Symbol::new(
                    SymbolKind::WildcardImport {
                        package_name,
                        package: Default::default(),
                    },
                    Name::EMPTY,
                    location,
                ));
                self.add_member(scope, symbol);
            } else {
                let import_name = item.member_name(tree).unwrap_or(Name::EMPTY);
                let symbol = self.alloc_symbol(Symbol::new(
                    SymbolKind::ExplicitImport {
                        package_name,
                        import_name,
                        package: Default::default(),
                        resolved: Default::default(),
                    },
                    import_name,
                    location,
                ));
                self.add_member(scope, symbol);
            }
        }
    }

    fn elaborate_subroutine(&mut self, scope: ScopeId, syntax: SyntaxRef) {
        let tree_id = syntax.tree;
        let tree = self.tree(tree_id);
        let Some(view) = SubroutineDecl::cast(tree, syntax.node) else {
            return;
        };
        let is_task = view.is_task(tree);
        let name = view.name(tree).unwrap_or(Name::EMPTY);
        let location = self.node_location(syntax);
        let return_type = view.return_type(tree).map(|node| SyntaxRef {
            tree: tree_id,
            node,
        });
        let port_nodes: Vec<NodeId> = view
            .port_list(tree)
            .map(|list| {
                tree.children_of_kind(list, SyntaxKind::SubroutinePort)
                    .collect()
            })
            .unwrap_or_default();
        let body: Vec<SyntaxRef> = view
            .body_items(tree)
            .map(|node| SyntaxRef {
                tree: tree_id,
                node,
            })
            .collect();

        let symbol = self.alloc_symbol(Symbol::new(
            SymbolKind::Subroutine(SubroutineData {
                is_task,
                scope: ScopeId(0),
                return_type: DeclaredType {
                    type_syntax: return_type,
                    declarator: None,
                    resolved: Default::default(),
                },
                args: Vec::new(),
                body,
                return_expr: Default::default(),
            }),
            name,
            location,
        ));
        let sub_scope = self.alloc_scope(Scope::new(symbol, Some(scope)));
        self.patch_scope(symbol, sub_scope);
        self.add_member(scope, symbol);

        // Formal arguments.
        let mut args = Vec::new();
        let mut last_direction = Direction::Input;
        for node in port_nodes {
            let tree = self.tree(tree_id);
            let Some(port) = SubroutinePortView::cast(tree, node) else {
                continue;
            };
            let direction = port
                .direction(tree)
                .map(|t| direction_from_token(t.kind))
                .unwrap_or(last_direction);
            last_direction = direction;
            let Some(declarator) = port.declarator(tree) else {
                continue;
            };
            let arg_name = declarator.name(tree).unwrap_or(Name::EMPTY);
            let arg_loc = declarator
                .name_token(tree)
                .map(|t| t.location)
                .unwrap_or(SourceLocation::NONE);
            let type_syntax = port.data_type(tree).map(|n| SyntaxRef {
                tree: tree_id,
                node: n,
            });
            let arg = self.alloc_symbol(Symbol::new(
                SymbolKind::FormalArgument {
                    direction,
                    declared: DeclaredType {
                        type_syntax,
                        declarator: Some(SyntaxRef {
                            tree: tree_id,
                            node: declarator.id(),
                        }),
                        resolved: Default::default(),
                    },
                },
                arg_name,
                arg_loc,
            ));
            self.add_member(sub_scope, arg);
            args.push(arg);
        }

        // The implicit return-value variable shares the subroutine's
        // name.
        if !is_task {
            let ret = self.alloc_symbol(Symbol::new(
                SymbolKind::Variable {
                    declared: DeclaredType {
                        type_syntax: return_type,
                        declarator: None,
                        resolved: Default::default(),
                    },
                    initializer: None,
                    is_const: false,
                    initializer_expr: Default::default(),
                },
                name,
                location,
            ));
            self.add_member(sub_scope, ret);
        }

        // Local declarations in the body become scope members.
        let body_refs: Vec<SyntaxRef> = match &self.symbol(symbol).kind {
            SymbolKind::Subroutine(data) => data.body.clone(),
            _ => Vec::new(),
        };
        for item in &body_refs {
            if self.tree(item.tree).kind(item.node) == SyntaxKind::DataDeclaration {
                self.elaborate_data_declaration(sub_scope, *item);
            }
        }

        if let SymbolKind::Subroutine(data) = &mut self.symbol_mut(symbol).kind {
            data.args = args;
        }
    }

    fn elaborate_modport(&mut self, scope: ScopeId, syntax: SyntaxRef) {
        let tree_id = syntax.tree;
        let tree = self.tree(tree_id);
        let Some(view) = ModportDeclView::cast(tree, syntax.node) else {
            return;
        };
        let items: Vec<ModportItemView> = view.items(tree).collect();

        for item in items {
            let tree = self.tree(tree_id);
            let name = item.name(tree).unwrap_or(Name::EMPTY);
            let location = tree.range(item.id()).start;
            let port_nodes: Vec<NodeId> = item.ports(tree).collect();

            let symbol = self.alloc_symbol(Symbol::new(
                SymbolKind::Modport { scope: ScopeId(0) },
                name,
                location,
            ));
            let mp_scope = self.alloc_scope(Scope::new(symbol, Some(scope)));
            self.patch_scope(symbol, mp_scope);
            self.add_member(scope, symbol);

            let mut last_direction = Direction::Inout;
            for node in port_nodes {
                let tree = self.tree(tree_id);
                let direction = tree
                    .child_tokens(node)
                    .find(|t| t.kind.is_direction())
                    .map(|t| direction_from_token(t.kind))
                    .unwrap_or(last_direction);
                last_direction = direction;
                let port_name = ident_of(tree, node).unwrap_or(Name::EMPTY);
                let port_loc = tree.range(node).start;

                let port = self.alloc_symbol(Symbol::new(
                    SymbolKind::ModportPort {
                        direction,
                        internal: Default::default(),
                    },
                    port_name,
                    port_loc,
                ));
                self.add_member(mp_scope, port);

                // Bind the modport signal to the interface-body symbol
                // of the same name.
                if let Some(target) = self.lookup_unqualified_quiet(scope, port_name) {
                    if let SymbolKind::ModportPort { internal, .. } = &self.symbol(port).kind {
                        let _ = internal.set(target);
                    }
                }
            }
        }
    }

    fn elaborate_continuous_assign(&mut self, scope: ScopeId, syntax: SyntaxRef) {
        let tree_id = syntax.tree;
        let tree = self.tree(tree_id);
        let Some(view) = ContinuousAssignView::cast(tree, syntax.node) else {
            return;
        };
        let assignments: Vec<NodeId> = view.assignments(tree).collect();
        for node in assignments {
            let location = self.tree(tree_id).range(node).start;
            let symbol = self.alloc_symbol(Symbol::new(
                SymbolKind::ContinuousAssign {
                    assignment: SyntaxRef {
                        tree: tree_id,
                        node,
                    },
                    bound: Default::default(),
                },
                Name::EMPTY,
                location,
            ));
            self.add_member(scope, symbol);
        }
    }

    fn elaborate_procedural_block(&mut self, scope: ScopeId, syntax: SyntaxRef) {
        let tree_id = syntax.tree;
        let tree = self.tree(tree_id);
        let Some(view) = ProceduralBlockView::cast(tree, syntax.node) else {
            return;
        };
        let kind = view
            .keyword(tree)
            .map(|t| match t.kind {
                TokenKind::Initial => ProceduralKind::Initial,
                TokenKind::Final => ProceduralKind::Final,
                TokenKind::AlwaysComb => ProceduralKind::AlwaysComb,
                TokenKind::AlwaysFf => ProceduralKind::AlwaysFf,
                TokenKind::AlwaysLatch => ProceduralKind::AlwaysLatch,
                _ => ProceduralKind::Always,
            })
            .unwrap_or(ProceduralKind::Always);
        let body = view.body(tree).map(|node| SyntaxRef {
            tree: tree_id,
            node,
        });
        let location = self.node_location(syntax);

        let symbol = self.alloc_symbol(Symbol::new(
            SymbolKind::ProceduralBlock { kind, body },
            Name::EMPTY,
            location,
        ));
        self.add_member(scope, symbol);
    }

    fn elaborate_instantiation(&mut self, scope: ScopeId, syntax: SyntaxRef, depth: u32) {
        let tree_id = syntax.tree;
        let tree = self.tree(tree_id);
        let Some(view) = InstantiationView::cast(tree, syntax.node) else {
            return;
        };
        let type_name = view.type_name(tree).unwrap_or(Name::EMPTY);
        let type_loc = view
            .type_token(tree)
            .map(|t| t.location)
            .unwrap_or(SourceLocation::NONE);
        let param_assignments = view.parameter_assignments(tree).map(|node| SyntaxRef {
            tree: tree_id,
            node,
        });
        let instances: Vec<(Name, SourceLocation, NodeId)> = view
            .instances(tree)
            .map(|inst| {
                (
                    inst.name(tree).unwrap_or(Name::EMPTY),
                    tree.range(inst.id()).start,
                    inst.id(),
                )
            })
            .collect();

        let Some(&definition) = self.definitions().get(&type_name) else {
            self.diagnostics().add(
                Diagnostic::at(DiagCode::UnknownDefinition, type_loc)
                    .with_arg(self.interner().get(type_name)),
            );
            return;
        };

        for (name, location, node) in instances {
            self.create_instance(
                definition,
                name,
                location,
                param_assignments,
                Some(SyntaxRef {
                    tree: tree_id,
                    node,
                }),
                scope,
                scope,
                depth + 1,
            );
        }
    }

    /// A body-level direction declaration completing non-ANSI ports:
    /// merge direction and type into the matching port symbols and
    /// create their internal net symbols.
    fn elaborate_body_port_declaration(&mut self, scope: ScopeId, syntax: SyntaxRef) {
        let tree_id = syntax.tree;
        let tree = self.tree(tree_id);
        let Some(view) = PortDecl::cast(tree, syntax.node) else {
            return;
        };
        let direction = view
            .direction(tree)
            .map(|t| direction_from_token(t.kind))
            .unwrap_or(Direction::Inout);
        let type_syntax = view.data_type(tree).map(|node| SyntaxRef {
            tree: tree_id,
            node,
        });
        let declarators: Vec<Declarator> = view.declarators(tree).collect();

        let owner = self.scope(scope).owner;
        let ports: Vec<SymbolId> = match &self.symbol(owner).kind {
            SymbolKind::Instance { ports, .. } => ports.clone(),
            _ => Vec::new(),
        };

        for declarator in declarators {
            let tree = self.tree(tree_id);
            let name = declarator.name(tree).unwrap_or(Name::EMPTY);
            let location = declarator
                .name_token(tree)
                .map(|t| t.location)
                .unwrap_or(SourceLocation::NONE);
            let declarator_ref = SyntaxRef {
                tree: tree_id,
                node: declarator.id(),
            };

            // Internal net carrying the declared type.
            let internal = self.alloc_symbol(Symbol::new(
                SymbolKind::Net {
                    net_kind: NetKind::Wire,
                    declared: DeclaredType {
                        type_syntax,
                        declarator: Some(declarator_ref),
                        resolved: Default::default(),
                    },
                    initializer: None,
                },
                name,
                location,
            ));
            self.add_member(scope, internal);

            if let Some(&port) = ports.iter().find(|&&p| self.symbol(p).name == name) {
                if let SymbolKind::Port(data) = &self.symbol(port).kind {
                    let _ = data.internal_symbol.set(internal);
                }
                if let SymbolKind::Port(data) = &mut self.symbol_mut(port).kind {
                    data.direction = direction;
                }
            }
        }
    }

    pub(crate) fn node_location(&self, syntax: SyntaxRef) -> SourceLocation {
        self.tree(syntax.tree).range(syntax.node).start
    }
}

fn direction_from_token(kind: TokenKind) -> Direction {
    match kind {
        TokenKind::Output => Direction::Output,
        TokenKind::Inout => Direction::Inout,
        TokenKind::Ref => Direction::Ref,
        _ => Direction::Input,
    }
}

fn net_kind_from_token(kind: TokenKind) -> NetKind {
    match kind {
        TokenKind::Tri => NetKind::Tri,
        TokenKind::Tri0 => NetKind::Tri0,
        TokenKind::Tri1 => NetKind::Tri1,
        TokenKind::Wand => NetKind::Wand,
        TokenKind::Wor => NetKind::Wor,
        TokenKind::Triand => NetKind::Triand,
        TokenKind::Trior => NetKind::Trior,
        TokenKind::Trireg => NetKind::Trireg,
        TokenKind::Supply0 => NetKind::Supply0,
        TokenKind::Supply1 => NetKind::Supply1,
        TokenKind::Uwire => NetKind::Uwire,
        _ => NetKind::Wire,
    }
}
