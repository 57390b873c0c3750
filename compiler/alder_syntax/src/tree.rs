//! The flat syntax tree arena.
//!
//! Nodes, their child lists, and the token stream all live in flat
//! vectors addressed by u32 ids. A node's children are a contiguous
//! slice of [`SyntaxElement`]s; construction goes through
//! [`TreeBuilder`], which finalizes each node's child range exactly
//! once, so nodes are immutable from the moment they exist.

use alder_source::SourceRange;

use crate::{SyntaxKind, Token, TokenList, TriviaKind};

/// Index of a node in the tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Index of a token in the tree's token list.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TokenId(pub u32);

/// A child of a syntax node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SyntaxElement {
    Token(TokenId),
    Node(NodeId),
}

struct NodeData {
    kind: SyntaxKind,
    child_start: u32,
    child_len: u32,
}

/// A fully built concrete syntax tree over its token stream.
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    children: Vec<SyntaxElement>,
    tokens: TokenList,
    root: NodeId,
    interner: &'static crate::StringInterner,
}

impl SyntaxTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self, node: NodeId) -> SyntaxKind {
        self.nodes[node.0 as usize].kind
    }

    pub fn children(&self, node: NodeId) -> &[SyntaxElement] {
        let data = &self.nodes[node.0 as usize];
        let start = data.child_start as usize;
        &self.children[start..start + data.child_len as usize]
    }

    pub fn tokens(&self) -> &TokenList {
        &self.tokens
    }

    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id.0 as usize]
    }

    /// Child nodes in order.
    pub fn child_nodes(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(node).iter().filter_map(|c| match c {
            SyntaxElement::Node(n) => Some(*n),
            SyntaxElement::Token(_) => None,
        })
    }

    /// Child tokens in order.
    pub fn child_tokens(&self, node: NodeId) -> impl Iterator<Item = &Token> + '_ {
        self.children(node).iter().filter_map(|c| match c {
            SyntaxElement::Token(t) => Some(self.token(*t)),
            SyntaxElement::Node(_) => None,
        })
    }

    /// First child node of the given kind.
    pub fn child_of_kind(&self, node: NodeId, kind: SyntaxKind) -> Option<NodeId> {
        self.child_nodes(node).find(|&n| self.kind(n) == kind)
    }

    /// All child nodes of the given kind.
    pub fn children_of_kind(
        &self,
        node: NodeId,
        kind: SyntaxKind,
    ) -> impl Iterator<Item = NodeId> + '_ {
        self.child_nodes(node).filter(move |&n| self.kind(n) == kind)
    }

    /// First child token of the given kind.
    pub fn child_token_of_kind(
        &self,
        node: NodeId,
        kind: crate::TokenKind,
    ) -> Option<&Token> {
        self.child_tokens(node).find(|t| t.kind == kind)
    }

    /// The `n`th child node (0-based).
    pub fn nth_child_node(&self, node: NodeId, n: usize) -> Option<NodeId> {
        self.child_nodes(node).nth(n)
    }

    /// Leftmost token under a node.
    pub fn first_token(&self, node: NodeId) -> Option<&Token> {
        for child in self.children(node) {
            match child {
                SyntaxElement::Token(t) => return Some(self.token(*t)),
                SyntaxElement::Node(n) => {
                    if let Some(t) = self.first_token(*n) {
                        return Some(t);
                    }
                }
            }
        }
        None
    }

    /// Rightmost token under a node.
    pub fn last_token(&self, node: NodeId) -> Option<&Token> {
        for child in self.children(node).iter().rev() {
            match child {
                SyntaxElement::Token(t) => return Some(self.token(*t)),
                SyntaxElement::Node(n) => {
                    if let Some(t) = self.last_token(*n) {
                        return Some(t);
                    }
                }
            }
        }
        None
    }

    /// Source range covered by a node (token text only, not leading
    /// trivia).
    pub fn range(&self, node: NodeId) -> SourceRange {
        match (self.first_token(node), self.last_token(node)) {
            (Some(first), Some(last)) if first.location.buffer() == last.range().end.buffer() => {
                SourceRange::new(first.location, last.range().end)
            }
            (Some(first), _) => first.range(),
            _ => SourceRange::NONE,
        }
    }

    /// Reproduce the exact source text covered by a node, including
    /// each token's leading trivia and any skipped tokens.
    pub fn render(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.render_into(node, &mut out);
        out
    }

    fn render_into(&self, node: NodeId, out: &mut String) {
        for child in self.children(node) {
            match child {
                SyntaxElement::Token(t) => {
                    let token = self.token(*t);
                    for trivia in self.tokens.trivia_of(token) {
                        out.push_str(self.resolve(trivia.raw));
                    }
                    out.push_str(self.resolve(token.raw));
                }
                SyntaxElement::Node(n) => self.render_into(*n, out),
            }
        }
    }

    /// Resolve interned raw text through the interner the lexer used.
    pub fn resolve(&self, name: crate::Name) -> &'static str {
        self.interner.get(name)
    }

    /// Count of skipped-token nodes (error recovery marks).
    pub fn skipped_node_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.kind == SyntaxKind::SkippedTokens)
            .count()
    }

    /// Count of skipped-token trivia entries attached by earlier
    /// phases (the preprocessor does not produce these; external
    /// tools may).
    pub fn skipped_trivia_count(&self) -> usize {
        self.tokens
            .tokens()
            .iter()
            .flat_map(|t| self.tokens.trivia_of(t))
            .filter(|t| t.kind == TriviaKind::SkippedTokens)
            .count()
    }
}

/// Incremental construction of a [`SyntaxTree`].
///
/// Usage mirrors the parse: `start_node` when a production begins,
/// `token` for each consumed token, `finish_node` when it ends. The
/// builder checks balance in debug builds.
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
    children: Vec<SyntaxElement>,
    tokens: TokenList,
    /// Stack of (kind, accumulated children).
    stack: Vec<(SyntaxKind, Vec<SyntaxElement>)>,
    interner: &'static crate::StringInterner,
}

impl TreeBuilder {
    pub fn new(tokens: TokenList, interner: &'static crate::StringInterner) -> Self {
        TreeBuilder {
            nodes: Vec::new(),
            children: Vec::new(),
            tokens,
            stack: Vec::new(),
            interner,
        }
    }

    pub fn tokens(&self) -> &TokenList {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut TokenList {
        &mut self.tokens
    }

    pub fn start_node(&mut self, kind: SyntaxKind) {
        self.stack.push((kind, Vec::new()));
    }

    /// Record a consumed token as a child of the current node.
    pub fn token(&mut self, id: TokenId) {
        let top = self
            .stack
            .last_mut()
            .expect("token recorded outside any node");
        top.1.push(SyntaxElement::Token(id));
    }

    pub fn finish_node(&mut self) -> NodeId {
        let (kind, children) = self.stack.pop().expect("unbalanced finish_node");
        let id = self.alloc_node(kind, children);
        if let Some(parent) = self.stack.last_mut() {
            parent.1.push(SyntaxElement::Node(id));
        }
        id
    }

    /// Abandon the current node, splicing its children into the
    /// parent. Used when speculative parsing backs out of a wrapper.
    pub fn abandon_node(&mut self) {
        let (_, children) = self.stack.pop().expect("unbalanced abandon_node");
        if let Some(parent) = self.stack.last_mut() {
            parent.1.extend(children);
        }
    }

    /// Remember the current position in the open node's child list.
    /// A later [`TreeBuilder::start_node_at`] wraps everything added
    /// since the checkpoint into a new node — how infix expressions
    /// get their left operand.
    pub fn checkpoint(&self) -> usize {
        self.stack.last().map_or(0, |top| top.1.len())
    }

    /// Open a node that adopts the children recorded since
    /// `checkpoint` as its leading children.
    pub fn start_node_at(&mut self, checkpoint: usize, kind: SyntaxKind) {
        let top = self
            .stack
            .last_mut()
            .expect("start_node_at outside any node");
        debug_assert!(checkpoint <= top.1.len(), "stale checkpoint");
        let adopted = top.1.split_off(checkpoint);
        self.stack.push((kind, adopted));
    }

    fn alloc_node(&mut self, kind: SyntaxKind, children: Vec<SyntaxElement>) -> NodeId {
        let child_start = self.children.len() as u32;
        let child_len = children.len() as u32;
        self.children.extend(children);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            child_start,
            child_len,
        });
        id
    }

    /// Finish construction. `root` must be the id returned by the
    /// outermost `finish_node`.
    pub fn finish(self, root: NodeId) -> SyntaxTree {
        debug_assert!(self.stack.is_empty(), "unbalanced tree builder");
        SyntaxTree {
            nodes: self.nodes,
            children: self.children,
            tokens: self.tokens,
            root,
            interner: self.interner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StringInterner, Token, TokenKind};
    use alder_source::SourceLocation;

    fn interner() -> &'static StringInterner {
        Box::leak(Box::new(StringInterner::new()))
    }

    fn tok(list: &mut TokenList, interner: &StringInterner, kind: TokenKind, text: &str) -> TokenId {
        let raw = interner.intern(text);
        let id = TokenId(list.len() as u32);
        list.push(Token::new(
            kind,
            SourceLocation::NONE,
            text.len() as u32,
            raw,
        ));
        id
    }

    #[test]
    fn build_and_walk() {
        let interner = interner();
        let mut tokens = TokenList::new();
        let a = tok(&mut tokens, interner, TokenKind::Identifier, "a");
        let plus = tok(&mut tokens, interner, TokenKind::Plus, "+");
        let b = tok(&mut tokens, interner, TokenKind::Identifier, "b");

        let mut builder = TreeBuilder::new(tokens, interner);
        builder.start_node(SyntaxKind::BinaryExpression);
        builder.start_node(SyntaxKind::IdentifierName);
        builder.token(a);
        builder.finish_node();
        builder.token(plus);
        builder.start_node(SyntaxKind::IdentifierName);
        builder.token(b);
        builder.finish_node();
        let root = builder.finish_node();
        let tree = builder.finish(root);

        assert_eq!(tree.kind(tree.root()), SyntaxKind::BinaryExpression);
        assert_eq!(tree.child_nodes(tree.root()).count(), 2);
        assert_eq!(tree.child_tokens(tree.root()).count(), 1);
        assert_eq!(tree.render(tree.root()), "a+b");
        assert_eq!(tree.first_token(tree.root()).unwrap().raw, interner.intern("a"));
        assert_eq!(tree.last_token(tree.root()).unwrap().raw, interner.intern("b"));
    }

    #[test]
    fn abandon_splices_children() {
        let interner = interner();
        let mut tokens = TokenList::new();
        let a = tok(&mut tokens, interner, TokenKind::Identifier, "x");

        let mut builder = TreeBuilder::new(tokens, interner);
        builder.start_node(SyntaxKind::CompilationUnit);
        builder.start_node(SyntaxKind::ParenthesizedExpression);
        builder.token(a);
        builder.abandon_node();
        let root = builder.finish_node();
        let tree = builder.finish(root);

        assert_eq!(tree.children(tree.root()).len(), 1);
        assert!(matches!(
            tree.children(tree.root())[0],
            SyntaxElement::Token(_)
        ));
    }
}
