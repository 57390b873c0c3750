//! Lexing and preprocessing.
//!
//! The [`Lexer`] is a hand-written byte cursor producing raw tokens
//! with their leading trivia. The [`Preprocessor`] sits on top of a
//! stack of lexers: it expands macros, splices includes, evaluates
//! conditional directives, and emits the final [`TokenList`] the
//! parser consumes. Directive text and inactive conditional regions
//! are attached as trivia so the token stream stays lossless over the
//! file it came from.

mod lexer;
mod preprocessor;

pub use lexer::{Lexer, RawToken};
pub use preprocessor::Preprocessor;

use alder_diagnostic::Diagnostics;
use alder_source::{BufferId, SourceManager};
use alder_syntax::{StringInterner, TokenList};

/// Lex and preprocess a registered buffer into a token list.
pub fn tokenize(
    sources: &SourceManager,
    buffer: BufferId,
    interner: &'static StringInterner,
    diagnostics: &Diagnostics,
) -> TokenList {
    let mut pp = Preprocessor::new(sources, interner, diagnostics);
    pp.push_buffer(buffer);
    pp.run()
}

/// Convenience for tests: lex a string through a fresh source manager.
pub fn tokenize_str(
    sources: &SourceManager,
    text: &str,
    interner: &'static StringInterner,
    diagnostics: &Diagnostics,
) -> TokenList {
    let buffer = sources.assign_text(text);
    tokenize(sources, buffer, interner, diagnostics)
}
