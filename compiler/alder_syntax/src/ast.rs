//! Typed views over the homogeneous syntax tree.
//!
//! A view is a zero-cost wrapper around a [`NodeId`] that knows which
//! kinds it may wrap and exposes the children elaboration cares about.
//! Views are deliberately tolerant: on malformed trees (error
//! recovery) accessors return `None` rather than panicking.

use crate::{Name, NodeId, SyntaxKind, SyntaxTree, Token, TokenKind};

macro_rules! ast_view {
    ($(#[$doc:meta])* $name:ident: $($kind:ident)|+) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Debug, Eq, PartialEq)]
        pub struct $name(NodeId);

        impl $name {
            pub fn cast(tree: &SyntaxTree, node: NodeId) -> Option<Self> {
                match tree.kind(node) {
                    $(SyntaxKind::$kind)|+ => Some(Self(node)),
                    _ => None,
                }
            }

            #[inline]
            pub fn id(self) -> NodeId {
                self.0
            }
        }
    };
}

/// First identifier token under a node, resolved to its canonical name.
pub fn ident_of(tree: &SyntaxTree, node: NodeId) -> Option<Name> {
    tree.child_token_of_kind(node, TokenKind::Identifier)
        .and_then(Token::ident_name)
}

ast_view!(
    /// The root of a parsed file.
    CompilationUnit: CompilationUnit
);

impl CompilationUnit {
    /// Top-level members in declaration order.
    pub fn members<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = NodeId> + 'a {
        tree.child_nodes(self.0)
    }
}

ast_view!(
    /// A module, interface, or program declaration.
    DefinitionDecl: ModuleDeclaration | InterfaceDeclaration | ProgramDeclaration
);

impl DefinitionDecl {
    pub fn header(self, tree: &SyntaxTree) -> Option<ModuleHeader> {
        tree.child_of_kind(self.0, SyntaxKind::ModuleHeader)
            .and_then(|n| ModuleHeader::cast(tree, n))
    }

    pub fn name(self, tree: &SyntaxTree) -> Option<Name> {
        self.header(tree).and_then(|h| h.name(tree))
    }

    /// Body items, excluding the header.
    pub fn members<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = NodeId> + 'a {
        tree.child_nodes(self.0)
            .filter(move |&n| tree.kind(n) != SyntaxKind::ModuleHeader)
    }
}

ast_view!(ModuleHeader: ModuleHeader);

impl ModuleHeader {
    pub fn keyword<'a>(self, tree: &'a SyntaxTree) -> Option<&'a Token> {
        tree.child_tokens(self.0).next()
    }

    pub fn name(self, tree: &SyntaxTree) -> Option<Name> {
        ident_of(tree, self.0)
    }

    pub fn parameter_ports(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.child_of_kind(self.0, SyntaxKind::ParameterPortList)
    }

    pub fn port_list(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.child_of_kind(self.0, SyntaxKind::AnsiPortList)
            .or_else(|| tree.child_of_kind(self.0, SyntaxKind::NonAnsiPortList))
    }
}

ast_view!(PackageDecl: PackageDeclaration);

impl PackageDecl {
    pub fn name(self, tree: &SyntaxTree) -> Option<Name> {
        ident_of(tree, self.0)
    }

    pub fn members<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = NodeId> + 'a {
        tree.child_nodes(self.0)
    }
}

ast_view!(
    /// `parameter`/`localparam` declaration, in a parameter port list
    /// or a body.
    ParameterDecl: ParameterDeclaration
);

impl ParameterDecl {
    /// True for `localparam`.
    pub fn is_local(self, tree: &SyntaxTree) -> bool {
        tree.child_token_of_kind(self.0, TokenKind::LocalParam)
            .is_some()
    }

    pub fn data_type(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.child_nodes(self.0)
            .find(|&n| tree.kind(n).is_data_type())
    }

    pub fn declarators<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = Declarator> + 'a {
        tree.children_of_kind(self.0, SyntaxKind::Declarator)
            .map(Declarator)
    }
}

ast_view!(
    /// One `name [dims] [= init]` unit of a declaration.
    Declarator: Declarator
);

impl Declarator {
    pub fn name(self, tree: &SyntaxTree) -> Option<Name> {
        ident_of(tree, self.0)
    }

    pub fn name_token<'a>(self, tree: &'a SyntaxTree) -> Option<&'a Token> {
        tree.child_token_of_kind(self.0, TokenKind::Identifier)
    }

    pub fn dimensions<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = NodeId> + 'a {
        tree.children_of_kind(self.0, SyntaxKind::VariableDimension)
    }

    /// The initializer expression inside the `= value` clause.
    pub fn initializer(self, tree: &SyntaxTree) -> Option<NodeId> {
        let clause = tree.child_of_kind(self.0, SyntaxKind::EqualsValueClause)?;
        tree.child_nodes(clause).next()
    }
}

ast_view!(DataDecl: DataDeclaration);

impl DataDecl {
    pub fn data_type(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.child_nodes(self.0)
            .find(|&n| tree.kind(n).is_data_type())
    }

    pub fn is_const(self, tree: &SyntaxTree) -> bool {
        tree.child_token_of_kind(self.0, TokenKind::Const).is_some()
    }

    pub fn declarators<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = Declarator> + 'a {
        tree.children_of_kind(self.0, SyntaxKind::Declarator)
            .map(Declarator)
    }
}

ast_view!(NetDecl: NetDeclaration);

impl NetDecl {
    /// The net-type keyword (`wire`, `tri`, ...).
    pub fn net_type<'a>(self, tree: &'a SyntaxTree) -> Option<&'a Token> {
        tree.child_tokens(self.0).find(|t| t.kind.is_net_type())
    }

    pub fn data_type(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.child_nodes(self.0)
            .find(|&n| tree.kind(n).is_data_type())
    }

    pub fn declarators<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = Declarator> + 'a {
        tree.children_of_kind(self.0, SyntaxKind::Declarator)
            .map(Declarator)
    }
}

ast_view!(TypedefDecl: TypedefDeclaration);

impl TypedefDecl {
    pub fn data_type(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.child_nodes(self.0)
            .find(|&n| tree.kind(n).is_data_type())
    }

    pub fn name(self, tree: &SyntaxTree) -> Option<Name> {
        ident_of(tree, self.0)
    }
}

ast_view!(ImportDecl: ImportDeclaration);

impl ImportDecl {
    pub fn items<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = ImportItem> + 'a {
        tree.children_of_kind(self.0, SyntaxKind::PackageImportItem)
            .map(ImportItem)
    }
}

ast_view!(
    /// `pkg::name` or `pkg::*` inside an import declaration.
    ImportItem: PackageImportItem
);

impl ImportItem {
    pub fn package_name(self, tree: &SyntaxTree) -> Option<Name> {
        tree.child_tokens(self.0)
            .find(|t| t.kind == TokenKind::Identifier)
            .and_then(Token::ident_name)
    }

    /// The imported member name; `None` for a wildcard import.
    pub fn member_name(self, tree: &SyntaxTree) -> Option<Name> {
        tree.child_tokens(self.0)
            .filter(|t| t.kind == TokenKind::Identifier)
            .nth(1)
            .and_then(Token::ident_name)
    }

    pub fn is_wildcard(self, tree: &SyntaxTree) -> bool {
        tree.child_token_of_kind(self.0, TokenKind::Star).is_some()
    }

    pub fn package_token<'a>(self, tree: &'a SyntaxTree) -> Option<&'a Token> {
        tree.child_tokens(self.0)
            .find(|t| t.kind == TokenKind::Identifier)
    }
}

ast_view!(EnumTypeView: EnumType);

impl EnumTypeView {
    /// The base type, if explicitly written.
    pub fn base_type(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.child_nodes(self.0)
            .find(|&n| tree.kind(n).is_data_type())
    }

    pub fn members<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = EnumMemberView> + 'a {
        tree.children_of_kind(self.0, SyntaxKind::EnumMember)
            .map(EnumMemberView)
    }
}

ast_view!(EnumMemberView: EnumMember);

impl EnumMemberView {
    pub fn name(self, tree: &SyntaxTree) -> Option<Name> {
        ident_of(tree, self.0)
    }

    pub fn name_token<'a>(self, tree: &'a SyntaxTree) -> Option<&'a Token> {
        tree.child_token_of_kind(self.0, TokenKind::Identifier)
    }

    pub fn initializer(self, tree: &SyntaxTree) -> Option<NodeId> {
        let clause = tree.child_of_kind(self.0, SyntaxKind::EqualsValueClause)?;
        tree.child_nodes(clause).next()
    }
}

ast_view!(StructTypeView: StructUnionType);

impl StructTypeView {
    pub fn is_packed(self, tree: &SyntaxTree) -> bool {
        tree.child_token_of_kind(self.0, TokenKind::Packed)
            .is_some()
    }

    pub fn is_union(self, tree: &SyntaxTree) -> bool {
        tree.child_token_of_kind(self.0, TokenKind::Union).is_some()
    }

    pub fn members<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = NodeId> + 'a {
        tree.children_of_kind(self.0, SyntaxKind::StructUnionMember)
    }
}

ast_view!(
    /// An ANSI port declaration inside a header port list.
    AnsiPortDecl: AnsiPortDeclaration
);

impl AnsiPortDecl {
    pub fn direction<'a>(self, tree: &'a SyntaxTree) -> Option<&'a Token> {
        tree.child_tokens(self.0).find(|t| t.kind.is_direction())
    }

    pub fn data_type(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.child_nodes(self.0)
            .find(|&n| tree.kind(n).is_data_type())
    }

    pub fn declarator(self, tree: &SyntaxTree) -> Option<Declarator> {
        tree.child_of_kind(self.0, SyntaxKind::Declarator)
            .map(Declarator)
    }

    /// True for a net-type port (`input wire ...`).
    pub fn net_type<'a>(self, tree: &'a SyntaxTree) -> Option<&'a Token> {
        tree.child_tokens(self.0).find(|t| t.kind.is_net_type())
    }
}

ast_view!(
    /// A body-level `input/output/inout` declaration (non-ANSI style).
    PortDecl: PortDeclaration
);

impl PortDecl {
    pub fn direction<'a>(self, tree: &'a SyntaxTree) -> Option<&'a Token> {
        tree.child_tokens(self.0).find(|t| t.kind.is_direction())
    }

    pub fn data_type(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.child_nodes(self.0)
            .find(|&n| tree.kind(n).is_data_type())
    }

    pub fn declarators<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = Declarator> + 'a {
        tree.children_of_kind(self.0, SyntaxKind::Declarator)
            .map(Declarator)
    }
}

ast_view!(ContinuousAssignView: ContinuousAssign);

impl ContinuousAssignView {
    /// The comma-separated assignment expressions.
    pub fn assignments<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = NodeId> + 'a {
        tree.child_nodes(self.0)
    }
}

ast_view!(ProceduralBlockView: ProceduralBlock);

impl ProceduralBlockView {
    pub fn keyword<'a>(self, tree: &'a SyntaxTree) -> Option<&'a Token> {
        tree.child_tokens(self.0).next()
    }

    pub fn body(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.child_nodes(self.0).next()
    }
}

ast_view!(InstantiationView: HierarchyInstantiation);

impl InstantiationView {
    /// The instantiated definition's name.
    pub fn type_name(self, tree: &SyntaxTree) -> Option<Name> {
        ident_of(tree, self.0)
    }

    pub fn type_token<'a>(self, tree: &'a SyntaxTree) -> Option<&'a Token> {
        tree.child_token_of_kind(self.0, TokenKind::Identifier)
    }

    pub fn parameter_assignments(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.child_of_kind(self.0, SyntaxKind::ParameterValueAssignment)
    }

    pub fn instances<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = InstanceView> + 'a {
        tree.children_of_kind(self.0, SyntaxKind::HierarchicalInstance)
            .map(InstanceView)
    }
}

ast_view!(InstanceView: HierarchicalInstance);

impl InstanceView {
    pub fn name(self, tree: &SyntaxTree) -> Option<Name> {
        ident_of(tree, self.0)
    }

    /// Port connections in written order.
    pub fn connections<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = NodeId> + 'a {
        tree.child_nodes(self.0).filter(move |&n| {
            matches!(
                tree.kind(n),
                SyntaxKind::OrderedPortConnection
                    | SyntaxKind::NamedPortConnection
                    | SyntaxKind::WildcardPortConnection
            )
        })
    }
}

ast_view!(SubroutineDecl: FunctionDeclaration | TaskDeclaration);

impl SubroutineDecl {
    pub fn is_task(self, tree: &SyntaxTree) -> bool {
        tree.kind(self.0) == SyntaxKind::TaskDeclaration
    }

    pub fn lifetime<'a>(self, tree: &'a SyntaxTree) -> Option<&'a Token> {
        tree.child_tokens(self.0)
            .find(|t| matches!(t.kind, TokenKind::Automatic | TokenKind::Static))
    }

    pub fn return_type(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.child_nodes(self.0)
            .find(|&n| tree.kind(n).is_data_type())
    }

    pub fn name(self, tree: &SyntaxTree) -> Option<Name> {
        ident_of(tree, self.0)
    }

    pub fn port_list(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.child_of_kind(self.0, SyntaxKind::SubroutinePortList)
    }

    pub fn body_items<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = NodeId> + 'a {
        tree.child_nodes(self.0).filter(move |&n| {
            let kind = tree.kind(n);
            kind.is_statement()
                || kind == SyntaxKind::DataDeclaration
                || kind == SyntaxKind::ParameterDeclaration
        })
    }
}

ast_view!(SubroutinePortView: SubroutinePort);

impl SubroutinePortView {
    pub fn direction<'a>(self, tree: &'a SyntaxTree) -> Option<&'a Token> {
        tree.child_tokens(self.0).find(|t| t.kind.is_direction())
    }

    pub fn data_type(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.child_nodes(self.0)
            .find(|&n| tree.kind(n).is_data_type())
    }

    pub fn declarator(self, tree: &SyntaxTree) -> Option<Declarator> {
        tree.child_of_kind(self.0, SyntaxKind::Declarator)
            .map(Declarator)
    }
}

ast_view!(ModportDeclView: ModportDeclaration);

impl ModportDeclView {
    pub fn items<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = ModportItemView> + 'a {
        tree.children_of_kind(self.0, SyntaxKind::ModportItem)
            .map(ModportItemView)
    }
}

ast_view!(ModportItemView: ModportItem);

impl ModportItemView {
    pub fn name(self, tree: &SyntaxTree) -> Option<Name> {
        ident_of(tree, self.0)
    }

    pub fn ports<'a>(self, tree: &'a SyntaxTree) -> impl Iterator<Item = NodeId> + 'a {
        tree.children_of_kind(self.0, SyntaxKind::ModportSimplePort)
    }
}

ast_view!(
    /// `[ ... ]` dimension on a declarator or type.
    DimensionView: VariableDimension
);

impl DimensionView {
    /// The specifier node, absent for a dynamic array `[]`.
    pub fn specifier(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.child_nodes(self.0).next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StringInterner, TokenList, TreeBuilder};
    use alder_source::SourceLocation;

    #[test]
    fn cast_rejects_wrong_kind() {
        let interner: &'static StringInterner = Box::leak(Box::new(StringInterner::new()));
        let mut builder = TreeBuilder::new(TokenList::new(), interner);
        builder.start_node(SyntaxKind::CompilationUnit);
        let root = builder.finish_node();
        let tree = builder.finish(root);

        assert!(CompilationUnit::cast(&tree, tree.root()).is_some());
        assert!(DefinitionDecl::cast(&tree, tree.root()).is_none());
    }

    #[test]
    fn ident_of_reads_token_value() {
        let interner: &'static StringInterner = Box::leak(Box::new(StringInterner::new()));
        let mut tokens = TokenList::new();
        let name = interner.intern("m");
        let mut tok = crate::Token::new(TokenKind::Identifier, SourceLocation::NONE, 1, name);
        tok.value = crate::TokenValue::Ident(name);
        let id = crate::TokenId(0);
        tokens.push(tok);

        let mut builder = TreeBuilder::new(tokens, interner);
        builder.start_node(SyntaxKind::Declarator);
        builder.token(id);
        let root = builder.finish_node();
        let tree = builder.finish(root);

        assert_eq!(ident_of(&tree, tree.root()), Some(name));
    }
}
