//! Declaration and member parsing.
//!
//! One member parser serves compilation units, design element bodies,
//! and packages; the sets of legal members differ slightly but the
//! elaborator is the layer that cares, and it diagnoses misplaced
//! members with better context than the parser could.

mod exprs;
mod stmts;
mod types;

use alder_diagnostic::DiagCode;
use alder_syntax::{SyntaxKind, TokenKind};

use crate::recovery;
use crate::series::SeriesConfig;
use crate::Parser;

impl Parser<'_> {
    /// Parse one top-level or body member.
    pub(crate) fn parse_member(&mut self) {
        self.parse_attributes();
        match self.current_kind() {
            TokenKind::Module | TokenKind::Interface | TokenKind::Program => {
                self.parse_definition()
            }
            TokenKind::Package => self.parse_package(),
            TokenKind::Import => self.parse_import(),
            TokenKind::Parameter | TokenKind::LocalParam => {
                self.parse_parameter_declaration(true)
            }
            TokenKind::Typedef => self.parse_typedef(),
            TokenKind::Assign => self.parse_continuous_assign(),
            TokenKind::Initial
            | TokenKind::Final
            | TokenKind::Always
            | TokenKind::AlwaysComb
            | TokenKind::AlwaysFf
            | TokenKind::AlwaysLatch => self.parse_procedural_block(),
            TokenKind::Function | TokenKind::Task => self.parse_subroutine(),
            TokenKind::Modport => self.parse_modport(),
            TokenKind::Input | TokenKind::Output | TokenKind::Inout | TokenKind::Ref => {
                self.parse_port_declaration()
            }
            TokenKind::Genvar => self.parse_genvar_declaration(),
            TokenKind::Semicolon => {
                self.start_node(SyntaxKind::EmptyMember);
                self.bump();
                self.finish_node();
            }
            kind if kind.is_net_type() => self.parse_net_declaration(),
            kind if kind.is_data_type_keyword() => self.parse_data_declaration(),
            TokenKind::Const | TokenKind::Var | TokenKind::Static | TokenKind::Automatic => {
                self.parse_data_declaration()
            }
            TokenKind::Identifier => self.parse_identifier_member(),
            _ => {
                self.add_diag(DiagCode::ExpectedMember, self.current_range());
                self.skip_until(recovery::MEMBER_START);
                // A region closer stops recovery; the caller decides
                // what it means.
                if self.at(TokenKind::Semicolon) {
                    self.start_node(SyntaxKind::EmptyMember);
                    self.bump();
                    self.finish_node();
                }
            }
        }
    }

    /// `(* key = value, ... *)` attribute instances.
    pub(crate) fn parse_attributes(&mut self) {
        while self.at(TokenKind::OpenParenStar) {
            self.start_node(SyntaxKind::AttributeInstance);
            self.bump();
            self.parse_series(
                SeriesConfig::comma(TokenKind::StarCloseParen),
                |p| {
                    if !p.at(TokenKind::Identifier) {
                        return false;
                    }
                    p.start_node(SyntaxKind::AttributeSpec);
                    p.bump();
                    if p.eat(TokenKind::Eq) {
                        p.parse_expression();
                    }
                    p.finish_node();
                    true
                },
            );
            self.expect(TokenKind::StarCloseParen);
            self.finish_node();
        }
    }

    // === Design elements ===

    fn parse_definition(&mut self) {
        let kind = match self.current_kind() {
            TokenKind::Interface => SyntaxKind::InterfaceDeclaration,
            TokenKind::Program => SyntaxKind::ProgramDeclaration,
            _ => SyntaxKind::ModuleDeclaration,
        };
        let end_kind = match self.current_kind() {
            TokenKind::Interface => TokenKind::EndInterface,
            TokenKind::Program => TokenKind::EndProgram,
            _ => TokenKind::EndModule,
        };

        self.start_node(kind);
        self.start_node(SyntaxKind::ModuleHeader);
        self.bump(); // module/interface/program
        self.eat(TokenKind::Static) || self.eat(TokenKind::Automatic); // lifetime
        self.expect(TokenKind::Identifier);
        if self.at(TokenKind::Hash) && self.peek_kind(1) == TokenKind::OpenParen {
            self.parse_parameter_port_list();
        }
        if self.at(TokenKind::OpenParen) {
            self.parse_port_list();
        }
        self.expect(TokenKind::Semicolon);
        self.finish_node(); // header

        while !self.at(end_kind) && !self.at(TokenKind::EndOfFile) {
            let before = self.position();
            self.parse_member();
            if self.position() == before {
                // A stray region closer for some other construct;
                // consume it to guarantee progress.
                self.skip_one_as_skipped();
            }
        }
        self.expect(end_kind);
        self.parse_end_label();
        self.finish_node();
    }

    fn parse_package(&mut self) {
        self.start_node(SyntaxKind::PackageDeclaration);
        self.bump(); // package
        self.expect(TokenKind::Identifier);
        self.expect(TokenKind::Semicolon);
        while !self.at(TokenKind::EndPackage) && !self.at(TokenKind::EndOfFile) {
            let before = self.position();
            self.parse_member();
            if self.position() == before {
                self.skip_one_as_skipped();
            }
        }
        self.expect(TokenKind::EndPackage);
        self.parse_end_label();
        self.finish_node();
    }

    fn parse_end_label(&mut self) {
        if self.at(TokenKind::Colon) {
            self.bump();
            self.expect(TokenKind::Identifier);
        }
    }

    /// Consume exactly one token into a SkippedTokens node, for
    /// guaranteed progress when a member parser could not start.
    pub(crate) fn skip_one_as_skipped(&mut self) {
        if self.at(TokenKind::EndOfFile) {
            return;
        }
        self.add_diag(DiagCode::SkippedTokens, self.current_range());
        self.start_node(SyntaxKind::SkippedTokens);
        self.bump();
        self.finish_node();
    }

    // === Parameters ===

    fn parse_parameter_port_list(&mut self) {
        self.start_node(SyntaxKind::ParameterPortList);
        self.bump(); // #
        self.expect(TokenKind::OpenParen);
        self.parse_series(SeriesConfig::comma(TokenKind::CloseParen), |p| {
            if p.at(TokenKind::Parameter) || p.at(TokenKind::LocalParam) {
                p.start_node(SyntaxKind::ParameterDeclaration);
                p.bump();
                p.parse_optional_data_type();
                p.parse_declarator();
                p.finish_node();
                true
            } else if p.at(TokenKind::Identifier) {
                // Continuation of the previous declaration:
                // `#(parameter A = 1, B = 2)`.
                p.start_node(SyntaxKind::ParameterDeclaration);
                p.parse_declarator();
                p.finish_node();
                true
            } else {
                false
            }
        });
        self.expect(TokenKind::CloseParen);
        self.finish_node();
    }

    /// A body `parameter`/`localparam` declaration. In bodies the
    /// trailing semicolon is required; in port lists it is absent.
    fn parse_parameter_declaration(&mut self, semicolon: bool) {
        self.start_node(SyntaxKind::ParameterDeclaration);
        self.bump(); // parameter / localparam
        self.parse_optional_data_type();
        self.parse_series(SeriesConfig::comma(TokenKind::Semicolon), |p| {
            if p.at(TokenKind::Identifier) {
                p.parse_declarator();
                true
            } else {
                false
            }
        });
        if semicolon {
            self.expect(TokenKind::Semicolon);
        }
        self.finish_node();
    }

    /// A data type when one is present, otherwise an implicit type.
    /// Used where the type is optional (parameters, net and port
    /// declarations).
    fn parse_optional_data_type(&mut self) {
        if self.current_kind().is_data_type_keyword()
            || self.at(TokenKind::OpenBracket)
            || self.at(TokenKind::Signed)
            || self.at(TokenKind::Unsigned)
        {
            self.parse_data_type();
        } else if self.at(TokenKind::Identifier) && self.probe_type_then_name() {
            self.parse_data_type();
        } else {
            self.start_node(SyntaxKind::ImplicitType);
            self.finish_node();
        }
    }

    /// `name [dims]* [= init]` — one declared entity.
    pub(crate) fn parse_declarator(&mut self) {
        self.start_node(SyntaxKind::Declarator);
        self.expect(TokenKind::Identifier);
        self.parse_dimension_list();
        if self.at(TokenKind::Eq) {
            self.start_node(SyntaxKind::EqualsValueClause);
            self.bump();
            self.parse_expression();
            self.finish_node();
        }
        self.finish_node();
    }

    // === Ports ===

    fn parse_port_list(&mut self) {
        // Non-ANSI: a plain identifier list.
        let non_ansi = self.at(TokenKind::OpenParen)
            && self.peek_kind(1) == TokenKind::Identifier
            && matches!(self.peek_kind(2), TokenKind::Comma | TokenKind::CloseParen);

        if non_ansi {
            self.start_node(SyntaxKind::NonAnsiPortList);
            self.bump(); // (
            self.parse_series(SeriesConfig::comma(TokenKind::CloseParen), |p| {
                if p.at(TokenKind::Identifier) {
                    p.start_node(SyntaxKind::PortReference);
                    p.bump();
                    p.finish_node();
                    true
                } else {
                    false
                }
            });
            self.expect(TokenKind::CloseParen);
            self.finish_node();
            return;
        }

        self.start_node(SyntaxKind::AnsiPortList);
        self.bump(); // (
        self.parse_series(SeriesConfig::comma(TokenKind::CloseParen), |p| {
            p.parse_ansi_port()
        });
        self.expect(TokenKind::CloseParen);
        self.finish_node();
    }

    fn parse_ansi_port(&mut self) -> bool {
        if self.at(TokenKind::Dot) {
            // Explicit port: `.name(expr)`.
            self.start_node(SyntaxKind::ExplicitAnsiPort);
            self.bump();
            self.expect(TokenKind::Identifier);
            self.expect(TokenKind::OpenParen);
            if !self.at(TokenKind::CloseParen) {
                self.parse_expression();
            }
            self.expect(TokenKind::CloseParen);
            self.finish_node();
            return true;
        }

        let can_start = self.current_kind().is_direction()
            || self.current_kind().is_net_type()
            || self.current_kind().is_data_type_keyword()
            || self.at(TokenKind::Identifier)
            || self.at(TokenKind::OpenBracket);
        if !can_start {
            return false;
        }

        self.start_node(SyntaxKind::AnsiPortDeclaration);
        if self.current_kind().is_direction() {
            self.bump();
        }
        if self.current_kind().is_net_type() {
            self.bump();
        }
        // `input a` has an implicit type; `input logic a` and
        // `input iface.mp a` have explicit ones.
        if self.current_kind().is_data_type_keyword()
            || self.at(TokenKind::OpenBracket)
            || self.at(TokenKind::Signed)
            || self.at(TokenKind::Unsigned)
            || (self.at(TokenKind::Identifier) && self.probe_type_then_name())
        {
            self.parse_data_type();
        } else {
            self.start_node(SyntaxKind::ImplicitType);
            self.finish_node();
        }
        self.parse_declarator();
        self.finish_node();
        true
    }

    /// Non-ANSI body port declaration: `input [7:0] a, b;`.
    fn parse_port_declaration(&mut self) {
        self.start_node(SyntaxKind::PortDeclaration);
        self.bump(); // direction
        if self.current_kind().is_net_type() {
            self.bump();
        }
        self.parse_optional_data_type();
        self.parse_series(SeriesConfig::comma(TokenKind::Semicolon), |p| {
            if p.at(TokenKind::Identifier) {
                p.parse_declarator();
                true
            } else {
                false
            }
        });
        self.expect(TokenKind::Semicolon);
        self.finish_node();
    }

    // === Imports ===

    fn parse_import(&mut self) {
        self.start_node(SyntaxKind::ImportDeclaration);
        self.bump(); // import
        self.parse_series(SeriesConfig::comma(TokenKind::Semicolon), |p| {
            if !p.at(TokenKind::Identifier) {
                return false;
            }
            p.start_node(SyntaxKind::PackageImportItem);
            p.bump(); // package name
            p.expect(TokenKind::DoubleColon);
            if !p.eat(TokenKind::Star) {
                p.expect(TokenKind::Identifier);
            }
            p.finish_node();
            true
        });
        self.expect(TokenKind::Semicolon);
        self.finish_node();
    }

    // === Data, net, typedef, genvar ===

    pub(crate) fn parse_data_declaration(&mut self) {
        self.start_node(SyntaxKind::DataDeclaration);
        while matches!(
            self.current_kind(),
            TokenKind::Const | TokenKind::Var | TokenKind::Static | TokenKind::Automatic
        ) {
            self.bump();
        }
        self.parse_optional_data_type();
        self.parse_series(SeriesConfig::comma(TokenKind::Semicolon), |p| {
            if p.at(TokenKind::Identifier) {
                p.parse_declarator();
                true
            } else {
                false
            }
        });
        self.expect(TokenKind::Semicolon);
        self.finish_node();
    }

    fn parse_net_declaration(&mut self) {
        self.start_node(SyntaxKind::NetDeclaration);
        self.bump(); // net type keyword
        self.parse_optional_data_type();
        self.parse_series(SeriesConfig::comma(TokenKind::Semicolon), |p| {
            if p.at(TokenKind::Identifier) {
                p.parse_declarator();
                true
            } else {
                false
            }
        });
        self.expect(TokenKind::Semicolon);
        self.finish_node();
    }

    fn parse_typedef(&mut self) {
        self.start_node(SyntaxKind::TypedefDeclaration);
        self.bump(); // typedef
        self.parse_data_type();
        self.expect(TokenKind::Identifier);
        self.parse_dimension_list();
        self.expect(TokenKind::Semicolon);
        self.finish_node();
    }

    fn parse_genvar_declaration(&mut self) {
        self.start_node(SyntaxKind::DataDeclaration);
        self.bump(); // genvar
        self.start_node(SyntaxKind::ImplicitType);
        self.finish_node();
        self.parse_series(SeriesConfig::comma(TokenKind::Semicolon), |p| {
            if p.at(TokenKind::Identifier) {
                p.parse_declarator();
                true
            } else {
                false
            }
        });
        self.expect(TokenKind::Semicolon);
        self.finish_node();
    }

    // === Module members ===

    fn parse_continuous_assign(&mut self) {
        self.start_node(SyntaxKind::ContinuousAssign);
        self.bump(); // assign
        if self.at(TokenKind::Hash) {
            self.parse_timing_control();
        }
        self.parse_series(SeriesConfig::comma(TokenKind::Semicolon), |p| {
            if p.can_start_expression() {
                p.parse_expression_or_assignment();
                true
            } else {
                false
            }
        });
        self.expect(TokenKind::Semicolon);
        self.finish_node();
    }

    fn parse_procedural_block(&mut self) {
        self.start_node(SyntaxKind::ProceduralBlock);
        self.bump(); // initial / final / always*
        self.parse_statement();
        self.finish_node();
    }

    fn parse_subroutine(&mut self) {
        let is_task = self.at(TokenKind::Task);
        let (kind, end_kind) = if is_task {
            (SyntaxKind::TaskDeclaration, TokenKind::EndTask)
        } else {
            (SyntaxKind::FunctionDeclaration, TokenKind::EndFunction)
        };
        self.start_node(kind);
        self.bump(); // function / task
        if self.at(TokenKind::Automatic) || self.at(TokenKind::Static) {
            self.bump();
        }
        if !is_task {
            // Return type, unless the name directly follows.
            let direct_name = self.at(TokenKind::Identifier)
                && matches!(
                    self.peek_kind(1),
                    TokenKind::OpenParen | TokenKind::Semicolon
                );
            if !direct_name {
                self.parse_data_type();
            }
        }
        self.expect(TokenKind::Identifier);
        if self.at(TokenKind::OpenParen) {
            self.start_node(SyntaxKind::SubroutinePortList);
            self.bump();
            self.parse_series(SeriesConfig::comma(TokenKind::CloseParen), |p| {
                let can_start = p.current_kind().is_direction()
                    || p.current_kind().is_data_type_keyword()
                    || p.at(TokenKind::Identifier)
                    || p.at(TokenKind::OpenBracket);
                if !can_start {
                    return false;
                }
                p.start_node(SyntaxKind::SubroutinePort);
                if p.current_kind().is_direction() {
                    p.bump();
                }
                if p.current_kind().is_data_type_keyword()
                    || p.at(TokenKind::OpenBracket)
                    || (p.at(TokenKind::Identifier) && p.probe_type_then_name())
                {
                    p.parse_data_type();
                } else {
                    p.start_node(SyntaxKind::ImplicitType);
                    p.finish_node();
                }
                p.parse_declarator();
                p.finish_node();
                true
            });
            self.expect(TokenKind::CloseParen);
            self.finish_node();
        }
        self.expect(TokenKind::Semicolon);

        while !self.at(end_kind) && !self.at(TokenKind::EndOfFile) {
            let before = self.position();
            if self.at_data_declaration_start() {
                self.parse_data_declaration();
            } else {
                self.parse_statement();
            }
            if self.position() == before {
                self.skip_one_as_skipped();
            }
        }
        self.expect(end_kind);
        self.parse_end_label();
        self.finish_node();
    }

    fn parse_modport(&mut self) {
        self.start_node(SyntaxKind::ModportDeclaration);
        self.bump(); // modport
        self.parse_series(SeriesConfig::comma(TokenKind::Semicolon), |p| {
            if !p.at(TokenKind::Identifier) {
                return false;
            }
            p.start_node(SyntaxKind::ModportItem);
            p.bump(); // modport name
            p.expect(TokenKind::OpenParen);
            p.parse_series(SeriesConfig::comma(TokenKind::CloseParen), |p| {
                let has_direction = p.current_kind().is_direction();
                if !has_direction && !p.at(TokenKind::Identifier) {
                    return false;
                }
                p.start_node(SyntaxKind::ModportSimplePort);
                if has_direction {
                    p.bump();
                }
                p.expect(TokenKind::Identifier);
                p.finish_node();
                true
            });
            p.expect(TokenKind::CloseParen);
            p.finish_node();
            true
        });
        self.expect(TokenKind::Semicolon);
        self.finish_node();
    }

    // === Identifier-led members ===

    /// An identifier at member level starts either a declaration with
    /// a user-named type or a hierarchy instantiation. Two bounded
    /// probes decide; if neither fits, the tokens are skipped.
    fn parse_identifier_member(&mut self) {
        if self.probe_instantiation() {
            self.parse_instantiation();
        } else if self.probe_type_then_name() {
            self.parse_data_declaration();
        } else {
            self.add_diag(DiagCode::ExpectedMember, self.current_range());
            self.skip_until(recovery::MEMBER_START);
        }
    }

    /// `Type name (` or `Type #(...) name (` means instantiation.
    fn probe_instantiation(&mut self) -> bool {
        if !self.at(TokenKind::Identifier) {
            return false;
        }
        let snap = self.snapshot();
        let result = (|| {
            let mut n = 1;
            if self.peek_kind(n) == TokenKind::Hash {
                if self.peek_kind(n + 1) != TokenKind::OpenParen {
                    return false;
                }
                n = match self.probe_matched_parens(n + 1) {
                    Some(next) => next,
                    None => return false,
                };
            }
            if self.peek_kind(n) != TokenKind::Identifier {
                return false;
            }
            n += 1;
            // Optional instance array dimensions.
            while self.peek_kind(n) == TokenKind::OpenBracket {
                n = match self.probe_matched_brackets(n) {
                    Some(next) => next,
                    None => return false,
                };
            }
            self.peek_kind(n) == TokenKind::OpenParen
        })();
        self.restore(snap);
        result
    }

    /// Scan past a balanced `( ... )` starting at offset `open`.
    pub(crate) fn probe_matched_parens(&self, open: usize) -> Option<usize> {
        self.probe_matched(open, TokenKind::OpenParen, TokenKind::CloseParen)
    }

    /// Scan past a balanced `[ ... ]` starting at offset `open`.
    pub(crate) fn probe_matched_brackets(&self, open: usize) -> Option<usize> {
        self.probe_matched(open, TokenKind::OpenBracket, TokenKind::CloseBracket)
    }

    fn probe_matched(&self, open: usize, open_kind: TokenKind, close_kind: TokenKind) -> Option<usize> {
        if self.peek_kind(open) != open_kind {
            return None;
        }
        let mut depth = 0usize;
        let mut n = open;
        loop {
            let kind = self.peek_kind(n);
            if kind == TokenKind::EndOfFile {
                return None;
            }
            if kind == open_kind {
                depth += 1;
            } else if kind == close_kind {
                depth -= 1;
                if depth == 0 {
                    return Some(n + 1);
                }
            }
            n += 1;
            // Probes are bounded; far-off garbage is not worth
            // scanning through.
            if n > open + 512 {
                return None;
            }
        }
    }

    fn parse_instantiation(&mut self) {
        self.start_node(SyntaxKind::HierarchyInstantiation);
        self.bump(); // definition name
        if self.at(TokenKind::Hash) {
            self.start_node(SyntaxKind::ParameterValueAssignment);
            self.bump();
            self.expect(TokenKind::OpenParen);
            self.parse_series(SeriesConfig::comma(TokenKind::CloseParen), |p| {
                if p.at(TokenKind::Dot) {
                    p.start_node(SyntaxKind::NamedParamAssignment);
                    p.bump();
                    p.expect(TokenKind::Identifier);
                    p.expect(TokenKind::OpenParen);
                    if !p.at(TokenKind::CloseParen) {
                        p.parse_expression();
                    }
                    p.expect(TokenKind::CloseParen);
                    p.finish_node();
                    true
                } else if p.can_start_expression() {
                    p.start_node(SyntaxKind::OrderedParamAssignment);
                    p.parse_expression();
                    p.finish_node();
                    true
                } else {
                    false
                }
            });
            self.expect(TokenKind::CloseParen);
            self.finish_node();
        }

        self.parse_series(SeriesConfig::comma(TokenKind::Semicolon), |p| {
            if !p.at(TokenKind::Identifier) {
                return false;
            }
            p.start_node(SyntaxKind::HierarchicalInstance);
            p.bump(); // instance name
            p.parse_dimension_list();
            p.expect(TokenKind::OpenParen);
            p.parse_port_connections();
            p.expect(TokenKind::CloseParen);
            p.finish_node();
            true
        });
        self.expect(TokenKind::Semicolon);
        self.finish_node();
    }

    fn parse_port_connections(&mut self) {
        self.parse_series(
            SeriesConfig::comma(TokenKind::CloseParen).allow_trailing(),
            |p| {
                if p.at(TokenKind::DotStar) {
                    p.start_node(SyntaxKind::WildcardPortConnection);
                    p.bump();
                    p.finish_node();
                    true
                } else if p.at(TokenKind::Dot) {
                    p.start_node(SyntaxKind::NamedPortConnection);
                    p.bump();
                    p.expect(TokenKind::Identifier);
                    if p.at(TokenKind::OpenParen) {
                        p.bump();
                        if !p.at(TokenKind::CloseParen) {
                            p.parse_expression();
                        }
                        p.expect(TokenKind::CloseParen);
                    }
                    p.finish_node();
                    true
                } else if p.can_start_expression() {
                    p.start_node(SyntaxKind::OrderedPortConnection);
                    p.parse_expression();
                    p.finish_node();
                    true
                } else if p.at(TokenKind::Comma) {
                    // `(a, , b)` leaves a port unconnected.
                    p.start_node(SyntaxKind::OrderedPortConnection);
                    p.finish_node();
                    true
                } else {
                    false
                }
            },
        );
    }

    pub(crate) fn at_data_declaration_start(&mut self) -> bool {
        self.current_kind().is_data_type_keyword()
            || matches!(
                self.current_kind(),
                TokenKind::Const | TokenKind::Var | TokenKind::Static | TokenKind::Automatic
            )
            || (self.at(TokenKind::Identifier) && self.probe_type_then_name())
    }
}
