//! Generic separated-list driver.
//!
//! Every comma-separated construct in the grammar (port lists,
//! argument lists, declarators, enum members, case item expressions)
//! goes through one loop with a uniform policy: diagnose a missing
//! separator, skip to a resynchronization point, and always terminate.

use alder_diagnostic::DiagCode;
use alder_syntax::TokenKind;

use crate::recovery::{self, TokenSet};
use crate::Parser;

/// Configuration for one separated list.
#[derive(Clone, Copy, Debug)]
pub struct SeriesConfig {
    pub separator: TokenKind,
    pub terminator: TokenKind,
    /// Whether a trailing separator before the terminator is allowed.
    pub allow_trailing: bool,
    /// Extra recovery points beyond separator/terminator.
    pub recover: TokenSet,
}

impl SeriesConfig {
    /// Comma-separated items up to `terminator`.
    pub fn comma(terminator: TokenKind) -> Self {
        SeriesConfig {
            separator: TokenKind::Comma,
            terminator,
            allow_trailing: false,
            recover: TokenSet::new(),
        }
    }

    #[must_use]
    pub fn allow_trailing(mut self) -> Self {
        self.allow_trailing = true;
        self
    }

    #[must_use]
    pub fn recover_at(mut self, set: TokenSet) -> Self {
        self.recover = set;
        self
    }
}

impl Parser<'_> {
    /// Drive a separated list. `parse_item` returns `true` when it
    /// parsed an element, `false` when no element can start here.
    /// Returns the number of elements parsed.
    ///
    /// Termination: every iteration either consumes a token through
    /// `parse_item`/the separator, or skips at least one token through
    /// recovery, or breaks.
    pub(crate) fn parse_series<F>(&mut self, config: SeriesConfig, mut parse_item: F) -> usize
    where
        F: FnMut(&mut Self) -> bool,
    {
        let mut count = 0;
        loop {
            if self.at(config.terminator) || self.at(TokenKind::EndOfFile) {
                break;
            }

            let made_item = parse_item(self);
            if made_item {
                count += 1;
            }
            if !made_item {
                // No element could start here; resynchronize.
                self.add_diag(DiagCode::ExpectedListItem, self.current_range());
                let stop = config
                    .recover
                    .union(TokenSet::single(config.separator))
                    .union(TokenSet::single(config.terminator));
                self.skip_until(stop);
                if !self.at(config.separator) {
                    break;
                }
            }

            if self.at(config.separator) {
                self.bump();
                if self.at(config.terminator) {
                    if !config.allow_trailing {
                        self.add_diag(DiagCode::ExpectedListItem, self.current_range());
                    }
                    break;
                }
            } else if !self.at(config.terminator) && !self.at(TokenKind::EndOfFile) {
                // Missing separator: diagnose once and either continue
                // (next token could start an element) or bail to a
                // recovery point.
                self.add_diag(DiagCode::ExpectedToken, self.current_range());
                let stop = config
                    .recover
                    .union(TokenSet::single(config.separator))
                    .union(TokenSet::single(config.terminator))
                    .union(recovery::REGION_END);
                self.skip_until(stop);
                if !self.at(config.separator) {
                    break;
                }
            } else {
                break;
            }
        }
        count
    }

}
