//! Recursive descent parser producing a lossless concrete syntax tree.
//!
//! Expressions use precedence climbing; declarations and statements
//! use recursive descent with context-sensitive lookahead. Speculative
//! decisions (declaration vs. expression) go through bounded
//! token-scanning probes rather than tree rollback: a probe walks the
//! token stream without touching the builder, and at most two probes
//! run per construct.
//!
//! Error recovery never aborts the tree: an unexpected token produces
//! a diagnostic, the offending tokens are collected under a
//! [`SyntaxKind::SkippedTokens`] node, and missing tokens are
//! materialized as zero-length placeholders.

mod grammar;
pub mod recovery;
mod series;

#[cfg(test)]
mod tests;

pub use recovery::TokenSet;
pub use series::SeriesConfig;

use alder_diagnostic::{DiagCode, Diagnostic, Diagnostics};
use alder_source::{BufferId, SourceLocation, SourceManager, SourceRange};
use alder_syntax::{
    StringInterner, SyntaxKind, SyntaxTree, Token, TokenId, TokenKind, TokenList, TreeBuilder,
};

/// Parse a registered buffer into a syntax tree (lexing and
/// preprocessing included).
pub fn parse(
    sources: &SourceManager,
    buffer: BufferId,
    interner: &'static StringInterner,
    diagnostics: &Diagnostics,
) -> SyntaxTree {
    let tokens = alder_lexer::tokenize(sources, buffer, interner, diagnostics);
    Parser::new(tokens, interner, diagnostics).parse_compilation_unit()
}

/// Parse in-memory text; convenience for tests and tools.
pub fn parse_str(
    sources: &SourceManager,
    text: &str,
    interner: &'static StringInterner,
    diagnostics: &Diagnostics,
) -> SyntaxTree {
    let buffer = sources.assign_text(text);
    parse(sources, buffer, interner, diagnostics)
}

/// A saved cursor position for speculative probes.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Snapshot {
    pos: usize,
}

pub struct Parser<'a> {
    builder: TreeBuilder,
    pos: usize,
    diagnostics: &'a Diagnostics,
    interner: &'static StringInterner,
}

impl<'a> Parser<'a> {
    pub fn new(
        tokens: TokenList,
        interner: &'static StringInterner,
        diagnostics: &'a Diagnostics,
    ) -> Self {
        Parser {
            builder: TreeBuilder::new(tokens, interner),
            pos: 0,
            diagnostics,
            interner,
        }
    }

    /// Parse the whole token stream into a compilation unit.
    pub fn parse_compilation_unit(mut self) -> SyntaxTree {
        self.builder.start_node(SyntaxKind::CompilationUnit);
        while !self.at(TokenKind::EndOfFile) {
            let before = self.pos;
            self.parse_member();
            if self.pos == before {
                // A stray region closer at top level; consume it so
                // the loop always makes progress.
                self.skip_one_as_skipped();
            }
        }
        // The EOF token carries any trailing trivia; keep it in-tree
        // so rendering stays lossless.
        let eof = TokenId(self.pos as u32);
        self.builder.token(eof);
        let root = self.builder.finish_node();
        self.builder.finish(root)
    }

    // === Token access ===

    #[inline]
    pub(crate) fn current(&self) -> &Token {
        &self.builder.tokens()[self.pos]
    }

    #[inline]
    pub(crate) fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    /// Unbounded lookahead; saturates at the trailing EOF token.
    pub(crate) fn peek(&self, n: usize) -> &Token {
        let tokens = self.builder.tokens();
        let idx = (self.pos + n).min(tokens.len() - 1);
        &tokens[idx]
    }

    pub(crate) fn peek_kind(&self, n: usize) -> TokenKind {
        self.peek(n).kind
    }

    #[inline]
    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current_kind() == kind
    }

    #[inline]
    pub(crate) fn at_any(&self, set: TokenSet) -> bool {
        set.contains(self.current_kind())
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.current().location
    }

    /// Raw cursor position, used for progress checks.
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn current_range(&self) -> SourceRange {
        self.current().range()
    }

    /// Consume the current token into the open node.
    pub(crate) fn bump(&mut self) {
        debug_assert!(
            !self.at(TokenKind::EndOfFile),
            "bump must not consume end of file"
        );
        self.builder.token(TokenId(self.pos as u32));
        self.pos += 1;
    }

    /// Consume the current token if it matches.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Require a token: consume it, or diagnose and insert a
    /// zero-length placeholder so the tree stays well formed.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.diagnostics.add(
            Diagnostic::new(DiagCode::ExpectedToken, self.current_range())
                .with_arg(kind.display_name()),
        );
        self.push_missing(kind);
        false
    }

    /// Insert a zero-length placeholder token of the given kind.
    pub(crate) fn push_missing(&mut self, kind: TokenKind) {
        let loc = self.current_location();
        let id = TokenId(self.builder.tokens().len() as u32);
        self.builder.tokens_mut().push(Token::missing(kind, loc));
        self.builder.token(id);
    }

    // === Builder passthrough ===

    pub(crate) fn start_node(&mut self, kind: SyntaxKind) {
        self.builder.start_node(kind);
    }

    pub(crate) fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    pub(crate) fn checkpoint(&self) -> usize {
        self.builder.checkpoint()
    }

    pub(crate) fn start_node_at(&mut self, checkpoint: usize, kind: SyntaxKind) {
        self.builder.start_node_at(checkpoint, kind);
    }

    pub(crate) fn interner(&self) -> &'static StringInterner {
        self.interner
    }

    pub(crate) fn add_diag(&self, code: DiagCode, range: SourceRange) {
        self.diagnostics.add(Diagnostic::new(code, range));
    }

    // === Speculation ===

    /// Save the cursor for a lookahead probe. Probes only move the
    /// cursor, never the builder, so restoring is trivial.
    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot { pos: self.pos }
    }

    pub(crate) fn restore(&mut self, snapshot: Snapshot) {
        self.pos = snapshot.pos;
    }

    // === Recovery ===

    /// Skip tokens until something in `recover` (or a region closer)
    /// appears, wrapping everything skipped in a `SkippedTokens` node
    /// and noting it once.
    pub(crate) fn skip_until(&mut self, recover: TokenSet) {
        let stop = recover.union(recovery::REGION_END);
        if self.at_any(stop) {
            return;
        }
        let start = self.current_range();
        self.start_node(SyntaxKind::SkippedTokens);
        let mut end = start;
        while !self.at_any(stop) {
            end = self.current_range();
            self.bump();
        }
        self.finish_node();
        let range = if start.start.buffer() == end.start.buffer() {
            start.merge(end)
        } else {
            start
        };
        self.diagnostics
            .add(Diagnostic::new(DiagCode::SkippedTokens, range));
    }
}
