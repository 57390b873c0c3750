//! Statement parsing.
//!
//! The statement parser dispatches on the kind of the first token
//! after an optional `label :` and attribute list. Anything that does
//! not match a statement keyword but can begin an expression becomes
//! an expression statement; everything else is an ExpectedStatement
//! diagnostic with recovery.

use alder_diagnostic::DiagCode;
use alder_syntax::{SyntaxKind, TokenKind};

use crate::recovery;
use crate::Parser;
use crate::SeriesConfig;

/// Which case-item flavor a case statement uses, decided by the token
/// after the selector.
#[derive(Copy, Clone, PartialEq)]
enum CaseFlavor {
    Ordinary,
    Matches,
    Inside,
}

impl Parser<'_> {
    pub(crate) fn parse_statement(&mut self) {
        let cp = self.checkpoint();

        // Optional `label :` (but not `name ::`, which is a scoped
        // expression).
        if self.at(TokenKind::Identifier) && self.peek_kind(1) == TokenKind::Colon {
            self.start_node(SyntaxKind::NamedLabel);
            self.bump();
            self.bump();
            self.finish_node();
        }
        self.parse_attributes();

        match self.current_kind() {
            TokenKind::Unique | TokenKind::Unique0 | TokenKind::Priority => {
                self.bump(); // modifier; adopted via the checkpoint
                match self.current_kind() {
                    TokenKind::If => self.parse_conditional(cp),
                    TokenKind::Case | TokenKind::CaseX | TokenKind::CaseZ => self.parse_case(cp),
                    _ => {
                        self.add_diag(DiagCode::ExpectedStatement, self.current_range());
                        self.start_node_at(cp, SyntaxKind::EmptyStatement);
                        self.push_missing(TokenKind::Semicolon);
                        self.finish_node();
                    }
                }
            }
            TokenKind::Case | TokenKind::CaseX | TokenKind::CaseZ => self.parse_case(cp),
            TokenKind::If => self.parse_conditional(cp),
            TokenKind::Forever => {
                self.start_node_at(cp, SyntaxKind::ForeverStatement);
                self.bump();
                self.parse_statement();
                self.finish_node();
            }
            TokenKind::Repeat | TokenKind::While => {
                self.start_node_at(cp, SyntaxKind::LoopStatement);
                self.bump();
                self.expect(TokenKind::OpenParen);
                self.parse_expression();
                self.expect(TokenKind::CloseParen);
                self.parse_statement();
                self.finish_node();
            }
            TokenKind::Do => self.parse_do_while(cp),
            TokenKind::For => self.parse_for_loop(cp),
            TokenKind::Foreach => self.parse_foreach(cp),
            TokenKind::Return => {
                self.start_node_at(cp, SyntaxKind::ReturnStatement);
                self.bump();
                if self.can_start_expression() {
                    self.parse_expression();
                }
                self.expect(TokenKind::Semicolon);
                self.finish_node();
            }
            TokenKind::Break | TokenKind::Continue => {
                self.start_node_at(cp, SyntaxKind::JumpStatement);
                self.bump();
                self.expect(TokenKind::Semicolon);
                self.finish_node();
            }
            TokenKind::Hash | TokenKind::DoubleHash | TokenKind::At | TokenKind::AtStar => {
                self.start_node_at(cp, SyntaxKind::TimingControlStatement);
                self.parse_timing_control();
                self.parse_statement();
                self.finish_node();
            }
            TokenKind::Assign => {
                self.parse_procedural_assign(cp, SyntaxKind::ProceduralAssignStatement)
            }
            TokenKind::Force => {
                self.parse_procedural_assign(cp, SyntaxKind::ProceduralForceStatement)
            }
            TokenKind::Deassign => {
                self.parse_procedural_release(cp, SyntaxKind::ProceduralDeassignStatement)
            }
            TokenKind::Release => {
                self.parse_procedural_release(cp, SyntaxKind::ProceduralReleaseStatement)
            }
            TokenKind::Disable => {
                if self.peek_kind(1) == TokenKind::Fork {
                    self.start_node_at(cp, SyntaxKind::DisableForkStatement);
                    self.bump();
                    self.bump();
                    self.expect(TokenKind::Semicolon);
                    self.finish_node();
                } else {
                    self.start_node_at(cp, SyntaxKind::DisableStatement);
                    self.bump();
                    self.parse_unary_expr(); // block or task name
                    self.expect(TokenKind::Semicolon);
                    self.finish_node();
                }
            }
            TokenKind::Begin => self.parse_block(cp, SyntaxKind::SequentialBlockStatement),
            TokenKind::Fork => self.parse_block(cp, SyntaxKind::ParallelBlockStatement),
            TokenKind::Assert | TokenKind::Assume | TokenKind::Cover => {
                let concurrent = self.peek_kind(1) == TokenKind::Property
                    || self.peek_kind(1) == TokenKind::Sequence;
                let kind = if concurrent {
                    SyntaxKind::ConcurrentAssertionStatement
                } else {
                    SyntaxKind::ImmediateAssertionStatement
                };
                self.parse_assertion(cp, kind, concurrent);
            }
            TokenKind::Restrict | TokenKind::Expect => {
                self.parse_assertion(cp, SyntaxKind::ConcurrentAssertionStatement, true)
            }
            TokenKind::Wait => {
                if self.peek_kind(1) == TokenKind::Fork {
                    self.start_node_at(cp, SyntaxKind::WaitForkStatement);
                    self.bump();
                    self.bump();
                    self.expect(TokenKind::Semicolon);
                    self.finish_node();
                } else {
                    self.start_node_at(cp, SyntaxKind::WaitStatement);
                    self.bump();
                    self.expect(TokenKind::OpenParen);
                    self.parse_expression();
                    self.expect(TokenKind::CloseParen);
                    self.parse_statement();
                    self.finish_node();
                }
            }
            TokenKind::WaitOrder => {
                self.start_node_at(cp, SyntaxKind::WaitOrderStatement);
                self.bump();
                self.expect(TokenKind::OpenParen);
                self.parse_series(SeriesConfig::comma(TokenKind::CloseParen), |p| {
                    if p.can_start_expression() {
                        p.parse_unary_expr();
                        true
                    } else {
                        false
                    }
                });
                self.expect(TokenKind::CloseParen);
                self.parse_action_block(true);
                self.finish_node();
            }
            TokenKind::RandCase => {
                self.start_node_at(cp, SyntaxKind::RandCaseStatement);
                self.bump();
                while !self.at(TokenKind::EndCase) && !self.at(TokenKind::EndOfFile) {
                    let before = self.position();
                    self.start_node(SyntaxKind::RandCaseItem);
                    self.parse_expression();
                    self.expect(TokenKind::Colon);
                    self.parse_statement();
                    self.finish_node();
                    if self.position() == before {
                        break;
                    }
                }
                self.expect(TokenKind::EndCase);
                self.finish_node();
            }
            TokenKind::Semicolon => {
                self.start_node_at(cp, SyntaxKind::EmptyStatement);
                self.bump();
                self.finish_node();
            }
            _ if self.can_start_expression() => {
                self.start_node_at(cp, SyntaxKind::ExpressionStatement);
                self.parse_expression_or_assignment();
                self.expect(TokenKind::Semicolon);
                self.finish_node();
            }
            _ => {
                self.add_diag(DiagCode::ExpectedStatement, self.current_range());
                self.start_node_at(cp, SyntaxKind::EmptyStatement);
                self.push_missing(TokenKind::Semicolon);
                self.finish_node();
                self.skip_until(recovery::STATEMENT_START);
            }
        }
    }

    fn parse_conditional(&mut self, cp: usize) {
        self.start_node_at(cp, SyntaxKind::ConditionalStatement);
        self.bump(); // if
        self.expect(TokenKind::OpenParen);
        self.parse_expression();
        self.expect(TokenKind::CloseParen);
        self.parse_statement();
        if self.at(TokenKind::Else) {
            self.start_node(SyntaxKind::ElseClause);
            self.bump();
            self.parse_statement();
            self.finish_node();
        }
        self.finish_node();
    }

    fn parse_case(&mut self, cp: usize) {
        self.start_node_at(cp, SyntaxKind::CaseStatement);
        self.bump(); // case / casex / casez
        self.expect(TokenKind::OpenParen);
        self.parse_expression();
        self.expect(TokenKind::CloseParen);

        let flavor = match self.current_kind() {
            TokenKind::Matches => {
                self.bump();
                CaseFlavor::Matches
            }
            TokenKind::Inside => {
                self.bump();
                CaseFlavor::Inside
            }
            _ => CaseFlavor::Ordinary,
        };

        while !self.at(TokenKind::EndCase) && !self.at(TokenKind::EndOfFile) {
            let before = self.position();
            self.parse_case_item(flavor);
            if self.position() == before {
                self.add_diag(DiagCode::ExpectedCaseItem, self.current_range());
                self.skip_until(recovery::TokenSet::single(TokenKind::EndCase));
                break;
            }
        }
        self.expect(TokenKind::EndCase);
        self.finish_node();
    }

    fn parse_case_item(&mut self, flavor: CaseFlavor) {
        if self.at(TokenKind::Default) {
            self.start_node(SyntaxKind::DefaultCaseItem);
            self.bump();
            self.eat(TokenKind::Colon);
            self.parse_statement();
            self.finish_node();
            return;
        }

        match flavor {
            CaseFlavor::Matches => {
                self.start_node(SyntaxKind::PatternCaseItem);
                self.parse_pattern();
                if self.at(TokenKind::TripleAmp) {
                    self.start_node(SyntaxKind::PatternGuard);
                    self.bump();
                    self.parse_expression();
                    self.finish_node();
                }
                self.expect(TokenKind::Colon);
                self.parse_statement();
                self.finish_node();
            }
            CaseFlavor::Inside => {
                self.start_node(SyntaxKind::StandardCaseItem);
                self.parse_series(SeriesConfig::comma(TokenKind::Colon), |p| {
                    if p.at(TokenKind::OpenBracket) {
                        p.start_node(SyntaxKind::ValueRangeExpression);
                        p.bump();
                        p.parse_expression();
                        p.expect(TokenKind::Colon);
                        p.parse_expression();
                        p.expect(TokenKind::CloseBracket);
                        p.finish_node();
                        true
                    } else if p.can_start_expression() {
                        p.parse_expression();
                        true
                    } else {
                        false
                    }
                });
                self.expect(TokenKind::Colon);
                self.parse_statement();
                self.finish_node();
            }
            CaseFlavor::Ordinary => {
                self.start_node(SyntaxKind::StandardCaseItem);
                self.parse_series(SeriesConfig::comma(TokenKind::Colon), |p| {
                    if p.can_start_expression() {
                        p.parse_expression();
                        true
                    } else {
                        false
                    }
                });
                self.expect(TokenKind::Colon);
                self.parse_statement();
                self.finish_node();
            }
        }
    }

    /// Case patterns: `.name`, `.*`, `tagged Name [pattern]`, or a
    /// constant expression.
    fn parse_pattern(&mut self) {
        match self.current_kind() {
            TokenKind::DotStar => {
                self.start_node(SyntaxKind::WildcardPattern);
                self.bump();
                self.finish_node();
            }
            TokenKind::Dot => {
                self.start_node(SyntaxKind::IdentifierPattern);
                self.bump();
                self.expect(TokenKind::Identifier);
                self.finish_node();
            }
            TokenKind::Tagged => {
                self.start_node(SyntaxKind::TaggedPattern);
                self.bump();
                self.expect(TokenKind::Identifier);
                if matches!(self.current_kind(), TokenKind::Dot | TokenKind::DotStar)
                    || self.at(TokenKind::Tagged)
                {
                    self.parse_pattern();
                }
                self.finish_node();
            }
            _ if self.can_start_expression() => {
                self.start_node(SyntaxKind::ExpressionPattern);
                self.parse_expression();
                self.finish_node();
            }
            _ => {
                self.add_diag(DiagCode::ExpectedPattern, self.current_range());
                self.start_node(SyntaxKind::WildcardPattern);
                self.push_missing(TokenKind::DotStar);
                self.finish_node();
            }
        }
    }

    fn parse_do_while(&mut self, cp: usize) {
        self.start_node_at(cp, SyntaxKind::DoWhileStatement);
        self.bump(); // do
        self.parse_statement();
        self.expect(TokenKind::While);
        self.expect(TokenKind::OpenParen);
        self.parse_expression();
        self.expect(TokenKind::CloseParen);
        self.expect(TokenKind::Semicolon);
        self.finish_node();
    }

    fn parse_for_loop(&mut self, cp: usize) {
        self.start_node_at(cp, SyntaxKind::ForLoopStatement);
        self.bump(); // for
        self.expect(TokenKind::OpenParen);

        // Initializers: declarations or assignments, comma separated.
        if !self.at(TokenKind::Semicolon) {
            self.parse_series(SeriesConfig::comma(TokenKind::Semicolon), |p| {
                if p.current_kind().is_data_type_keyword()
                    || (p.at(TokenKind::Identifier) && p.probe_type_then_name())
                {
                    p.start_node(SyntaxKind::ForVariableDeclaration);
                    p.parse_data_type();
                    p.parse_declarator();
                    p.finish_node();
                    true
                } else if p.can_start_expression() {
                    p.parse_expression_or_assignment();
                    true
                } else {
                    false
                }
            });
        }
        self.expect(TokenKind::Semicolon);

        if !self.at(TokenKind::Semicolon) {
            self.parse_expression();
        }
        self.expect(TokenKind::Semicolon);

        if !self.at(TokenKind::CloseParen) {
            self.parse_series(SeriesConfig::comma(TokenKind::CloseParen), |p| {
                if p.can_start_expression() {
                    p.parse_expression_or_assignment();
                    true
                } else {
                    false
                }
            });
        }
        self.expect(TokenKind::CloseParen);
        self.parse_statement();
        self.finish_node();
    }

    fn parse_foreach(&mut self, cp: usize) {
        self.start_node_at(cp, SyntaxKind::ForeachLoopStatement);
        self.bump(); // foreach
        self.expect(TokenKind::OpenParen);
        // The array name with its loop-variable brackets parses as a
        // normal postfix expression.
        self.parse_unary_expr();
        self.expect(TokenKind::CloseParen);
        self.parse_statement();
        self.finish_node();
    }

    fn parse_procedural_assign(&mut self, cp: usize, kind: SyntaxKind) {
        self.start_node_at(cp, kind);
        self.bump(); // assign / force
        self.parse_expression_or_assignment();
        self.expect(TokenKind::Semicolon);
        self.finish_node();
    }

    fn parse_procedural_release(&mut self, cp: usize, kind: SyntaxKind) {
        self.start_node_at(cp, kind);
        self.bump(); // deassign / release
        self.parse_unary_expr();
        self.expect(TokenKind::Semicolon);
        self.finish_node();
    }

    fn parse_block(&mut self, cp: usize, kind: SyntaxKind) {
        let enders = match kind {
            SyntaxKind::ParallelBlockStatement => [
                TokenKind::Join,
                TokenKind::JoinAny,
                TokenKind::JoinNone,
            ],
            _ => [TokenKind::End, TokenKind::End, TokenKind::End],
        };

        self.start_node_at(cp, kind);
        self.bump(); // begin / fork
        if self.at(TokenKind::Colon) {
            self.start_node(SyntaxKind::NamedBlockClause);
            self.bump();
            self.expect(TokenKind::Identifier);
            self.finish_node();
        }

        while !enders.contains(&self.current_kind()) && !self.at(TokenKind::EndOfFile) {
            let before = self.position();
            if self.at_data_declaration_start() {
                self.parse_data_declaration();
            } else {
                self.parse_statement();
            }
            if self.position() == before {
                self.skip_until(recovery::STATEMENT_START.union(recovery::REGION_END));
                if self.position() == before {
                    break;
                }
            }
        }

        if enders.contains(&self.current_kind()) {
            self.bump();
        } else {
            self.expect(enders[0]);
        }
        if self.at(TokenKind::Colon) {
            self.start_node(SyntaxKind::NamedBlockClause);
            self.bump();
            self.expect(TokenKind::Identifier);
            self.finish_node();
        }
        self.finish_node();
    }

    fn parse_assertion(&mut self, cp: usize, kind: SyntaxKind, concurrent: bool) {
        self.start_node_at(cp, kind);
        self.bump(); // assert / assume / cover / restrict / expect
        if concurrent {
            if !self.eat(TokenKind::Property) {
                self.eat(TokenKind::Sequence);
            }
        }
        self.expect(TokenKind::OpenParen);
        self.parse_expression();
        self.expect(TokenKind::CloseParen);
        self.parse_action_block(true);
        self.finish_node();
    }

    /// `statement [else statement]`, `else statement`, or just `;`.
    fn parse_action_block(&mut self, allow_else: bool) {
        self.start_node(SyntaxKind::ActionBlock);
        if allow_else && self.at(TokenKind::Else) {
            self.bump();
            self.parse_statement();
        } else if self.at(TokenKind::Semicolon) {
            self.bump();
        } else {
            self.parse_statement();
            if allow_else && self.at(TokenKind::Else) {
                self.bump();
                self.parse_statement();
            }
        }
        self.finish_node();
    }

    // === Timing control ===

    pub(crate) fn parse_timing_control(&mut self) {
        match self.current_kind() {
            TokenKind::Hash => {
                self.start_node(SyntaxKind::DelayControl);
                self.bump();
                if self.at(TokenKind::OpenParen) {
                    self.bump();
                    self.parse_expression();
                    self.expect(TokenKind::CloseParen);
                } else {
                    self.parse_unary_expr();
                }
                self.finish_node();
            }
            TokenKind::DoubleHash => {
                self.start_node(SyntaxKind::CycleDelay);
                self.bump();
                if self.at(TokenKind::OpenParen) {
                    self.bump();
                    self.parse_expression();
                    self.expect(TokenKind::CloseParen);
                } else {
                    self.parse_unary_expr();
                }
                self.finish_node();
            }
            TokenKind::AtStar => {
                self.start_node(SyntaxKind::ImplicitEventControl);
                self.bump();
                self.finish_node();
            }
            TokenKind::At => {
                // `@(*)` lexes as `@ ( *)`; treat it as implicit.
                if self.peek_kind(1) == TokenKind::OpenParen
                    && self.peek_kind(2) == TokenKind::StarCloseParen
                {
                    self.start_node(SyntaxKind::ImplicitEventControl);
                    self.bump();
                    self.bump();
                    self.bump();
                    self.finish_node();
                    return;
                }
                self.start_node(SyntaxKind::EventControl);
                self.bump();
                if self.at(TokenKind::OpenParen) {
                    self.bump();
                    self.parse_event_expression();
                    self.expect(TokenKind::CloseParen);
                } else {
                    self.parse_unary_expr();
                }
                self.finish_node();
            }
            _ => unreachable!("timing control called on a non-timing token"),
        }
    }

    /// `posedge a iff en, negedge b or c`.
    fn parse_event_expression(&mut self) {
        loop {
            self.start_node(SyntaxKind::SignalEventExpression);
            if matches!(
                self.current_kind(),
                TokenKind::Posedge | TokenKind::Negedge | TokenKind::Edge
            ) {
                self.bump();
            }
            self.parse_expression();
            if self.at(TokenKind::Iff) {
                self.bump();
                self.parse_expression();
            }
            self.finish_node();

            if self.at(TokenKind::Or) || self.at(TokenKind::Comma) {
                self.bump();
                continue;
            }
            break;
        }
    }
}
