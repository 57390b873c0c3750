//! Tokens, trivia, and the concrete syntax tree.
//!
//! The tree is a flat, homogeneous arena: every node is a
//! [`SyntaxKind`] plus a range of children, where each child is either
//! a token or another node. Nodes are immutable after construction and
//! the tree is a true tree — no sharing.
//!
//! Trivia (whitespace, comments, directives, and tokens skipped during
//! error recovery) attaches to the *following* token, so the tree
//! losslessly covers its input: rendering the root reproduces the
//! exact source text.

mod ast;
mod interner;
mod kind;
mod token;
mod tree;

pub use ast::*;
pub use interner::{Name, StringInterner};
pub use kind::SyntaxKind;
pub use token::{
    LiteralId, TimeUnit, Token, TokenKind, TokenList, TokenValue, Trivia, TriviaKind, TriviaRange,
};
pub use tree::{NodeId, SyntaxElement, SyntaxTree, TokenId, TreeBuilder};
