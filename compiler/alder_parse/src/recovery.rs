//! Error recovery support.
//!
//! [`TokenSet`] is a 256-bit const bitset over token kinds, used to
//! answer "is this a resynchronization point" in O(1) during recovery
//! skips.

use alder_syntax::TokenKind;

/// A set of token kinds with O(1) membership testing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TokenSet([u64; 4]);

impl TokenSet {
    pub const fn new() -> Self {
        TokenSet([0; 4])
    }

    pub const fn single(kind: TokenKind) -> Self {
        Self::new().with(kind)
    }

    /// Add a kind (const builder).
    #[must_use]
    pub const fn with(self, kind: TokenKind) -> Self {
        let idx = kind.index() as usize;
        let mut words = self.0;
        words[idx / 64] |= 1 << (idx % 64);
        TokenSet(words)
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        TokenSet([
            self.0[0] | other.0[0],
            self.0[1] | other.0[1],
            self.0[2] | other.0[2],
            self.0[3] | other.0[3],
        ])
    }

    pub const fn contains(&self, kind: TokenKind) -> bool {
        let idx = kind.index() as usize;
        (self.0[idx / 64] >> (idx % 64)) & 1 != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0[0] == 0 && self.0[1] == 0 && self.0[2] == 0 && self.0[3] == 0
    }
}

impl Default for TokenSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Tokens that can begin a module/interface/package body item.
pub const MEMBER_START: TokenSet = TokenSet::new()
    .with(TokenKind::Module)
    .with(TokenKind::Interface)
    .with(TokenKind::Program)
    .with(TokenKind::Package)
    .with(TokenKind::Import)
    .with(TokenKind::Parameter)
    .with(TokenKind::LocalParam)
    .with(TokenKind::Typedef)
    .with(TokenKind::Assign)
    .with(TokenKind::Initial)
    .with(TokenKind::Final)
    .with(TokenKind::Always)
    .with(TokenKind::AlwaysComb)
    .with(TokenKind::AlwaysFf)
    .with(TokenKind::AlwaysLatch)
    .with(TokenKind::Function)
    .with(TokenKind::Task)
    .with(TokenKind::Modport)
    .with(TokenKind::Genvar)
    .with(TokenKind::Input)
    .with(TokenKind::Output)
    .with(TokenKind::Inout)
    .with(TokenKind::Semicolon);

/// Tokens that close an enclosing region; recovery never skips past
/// these.
pub const REGION_END: TokenSet = TokenSet::new()
    .with(TokenKind::EndModule)
    .with(TokenKind::EndInterface)
    .with(TokenKind::EndProgram)
    .with(TokenKind::EndPackage)
    .with(TokenKind::EndFunction)
    .with(TokenKind::EndTask)
    .with(TokenKind::EndCase)
    .with(TokenKind::EndGenerate)
    .with(TokenKind::End)
    .with(TokenKind::Join)
    .with(TokenKind::JoinAny)
    .with(TokenKind::JoinNone)
    .with(TokenKind::EndOfFile);

/// Tokens that can begin a statement.
pub const STATEMENT_START: TokenSet = TokenSet::new()
    .with(TokenKind::Unique)
    .with(TokenKind::Unique0)
    .with(TokenKind::Priority)
    .with(TokenKind::Case)
    .with(TokenKind::CaseX)
    .with(TokenKind::CaseZ)
    .with(TokenKind::If)
    .with(TokenKind::Forever)
    .with(TokenKind::Repeat)
    .with(TokenKind::While)
    .with(TokenKind::Do)
    .with(TokenKind::For)
    .with(TokenKind::Foreach)
    .with(TokenKind::Return)
    .with(TokenKind::Break)
    .with(TokenKind::Continue)
    .with(TokenKind::Hash)
    .with(TokenKind::DoubleHash)
    .with(TokenKind::At)
    .with(TokenKind::AtStar)
    .with(TokenKind::Assign)
    .with(TokenKind::Force)
    .with(TokenKind::Deassign)
    .with(TokenKind::Release)
    .with(TokenKind::Disable)
    .with(TokenKind::Begin)
    .with(TokenKind::Fork)
    .with(TokenKind::Assert)
    .with(TokenKind::Assume)
    .with(TokenKind::Cover)
    .with(TokenKind::Restrict)
    .with(TokenKind::Expect)
    .with(TokenKind::Wait)
    .with(TokenKind::WaitOrder)
    .with(TokenKind::RandCase)
    .with(TokenKind::Semicolon);

/// Tokens that can follow an expression inside a list.
pub const EXPR_FOLLOW: TokenSet = TokenSet::new()
    .with(TokenKind::Comma)
    .with(TokenKind::Semicolon)
    .with(TokenKind::CloseParen)
    .with(TokenKind::CloseBracket)
    .with(TokenKind::CloseBrace)
    .with(TokenKind::Colon);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set() {
        let set = TokenSet::new();
        assert!(set.is_empty());
        assert!(!set.contains(TokenKind::Module));
    }

    #[test]
    fn with_and_contains() {
        const SET: TokenSet = TokenSet::new()
            .with(TokenKind::Module)
            .with(TokenKind::EndOfFile);
        assert!(SET.contains(TokenKind::Module));
        assert!(SET.contains(TokenKind::EndOfFile));
        assert!(!SET.contains(TokenKind::Wire));
    }

    #[test]
    fn union() {
        let a = TokenSet::single(TokenKind::Module);
        let b = TokenSet::single(TokenKind::Wire);
        let u = a.union(b);
        assert!(u.contains(TokenKind::Module));
        assert!(u.contains(TokenKind::Wire));
    }

    #[test]
    fn high_discriminants_fit() {
        // The last operator variants sit near the top of the bitset.
        let set = TokenSet::single(TokenKind::TripleAmp);
        assert!(set.contains(TokenKind::TripleAmp));
        assert!(!set.contains(TokenKind::PlusColon));
    }

    #[test]
    fn predefined_sets() {
        assert!(MEMBER_START.contains(TokenKind::Parameter));
        assert!(REGION_END.contains(TokenKind::EndModule));
        assert!(STATEMENT_START.contains(TokenKind::If));
        assert!(EXPR_FOLLOW.contains(TokenKind::Comma));
    }
}
