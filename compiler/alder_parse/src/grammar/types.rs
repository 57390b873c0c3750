//! Data type parsing and the declaration-vs-expression probe.

use alder_diagnostic::DiagCode;
use alder_syntax::{SyntaxKind, TokenKind};

use crate::Parser;
use crate::SeriesConfig;

impl Parser<'_> {
    /// Parse a data type. Call sites that allow an implicit type check
    /// for one first; this always produces a node.
    pub(crate) fn parse_data_type(&mut self) {
        match self.current_kind() {
            TokenKind::Logic | TokenKind::Bit | TokenKind::Reg => {
                self.start_node(SyntaxKind::IntegerVectorType);
                self.bump();
                self.eat_signing();
                self.parse_dimension_list();
                self.finish_node();
            }
            TokenKind::Byte
            | TokenKind::ShortInt
            | TokenKind::Int
            | TokenKind::LongInt
            | TokenKind::Integer
            | TokenKind::Time => {
                self.start_node(SyntaxKind::IntegerAtomType);
                self.bump();
                self.eat_signing();
                self.finish_node();
            }
            TokenKind::Real | TokenKind::ShortReal | TokenKind::RealTime => {
                self.start_node(SyntaxKind::FloatingType);
                self.bump();
                self.finish_node();
            }
            TokenKind::String => {
                self.start_node(SyntaxKind::StringType);
                self.bump();
                self.finish_node();
            }
            TokenKind::Void => {
                self.start_node(SyntaxKind::VoidType);
                self.bump();
                self.finish_node();
            }
            TokenKind::Event => {
                self.start_node(SyntaxKind::EventType);
                self.bump();
                self.finish_node();
            }
            TokenKind::Enum => self.parse_enum_type(),
            TokenKind::Struct | TokenKind::Union => self.parse_struct_type(),
            TokenKind::Identifier => {
                self.start_node(SyntaxKind::NamedType);
                self.bump();
                while self.at(TokenKind::DoubleColon) {
                    self.bump();
                    self.expect(TokenKind::Identifier);
                }
                // `iface.modport` interface port types.
                if self.at(TokenKind::Dot) && self.peek_kind(1) == TokenKind::Identifier {
                    self.bump();
                    self.bump();
                }
                self.parse_dimension_list();
                self.finish_node();
            }
            TokenKind::Signed | TokenKind::Unsigned | TokenKind::OpenBracket => {
                self.start_node(SyntaxKind::ImplicitType);
                self.eat_signing();
                self.parse_dimension_list();
                self.finish_node();
            }
            _ => {
                self.add_diag(DiagCode::ExpectedDataType, self.current_range());
                self.start_node(SyntaxKind::ImplicitType);
                self.finish_node();
            }
        }
    }

    fn eat_signing(&mut self) {
        if self.at(TokenKind::Signed) || self.at(TokenKind::Unsigned) {
            self.bump();
        }
    }

    fn parse_enum_type(&mut self) {
        self.start_node(SyntaxKind::EnumType);
        self.bump(); // enum
        if !self.at(TokenKind::OpenBrace) {
            self.parse_data_type();
        }
        self.expect(TokenKind::OpenBrace);
        self.parse_series(SeriesConfig::comma(TokenKind::CloseBrace), |p| {
            if !p.at(TokenKind::Identifier) {
                return false;
            }
            p.start_node(SyntaxKind::EnumMember);
            p.bump();
            // Ranged members (`A[4]`) declare several values.
            p.parse_dimension_list();
            if p.at(TokenKind::Eq) {
                p.start_node(SyntaxKind::EqualsValueClause);
                p.bump();
                p.parse_expression();
                p.finish_node();
            }
            p.finish_node();
            true
        });
        self.expect(TokenKind::CloseBrace);
        self.parse_dimension_list();
        self.finish_node();
    }

    fn parse_struct_type(&mut self) {
        self.start_node(SyntaxKind::StructUnionType);
        self.bump(); // struct / union
        self.eat(TokenKind::Tagged);
        self.eat(TokenKind::Packed);
        self.eat_signing();
        self.expect(TokenKind::OpenBrace);
        while !self.at(TokenKind::CloseBrace) && !self.at(TokenKind::EndOfFile) {
            let before = self.position();
            self.start_node(SyntaxKind::StructUnionMember);
            self.parse_data_type();
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
            if self.position() == before {
                break;
            }
        }
        self.expect(TokenKind::CloseBrace);
        self.parse_dimension_list();
        self.finish_node();
    }

    // === Dimensions ===

    /// Zero or more `[ ... ]` dimensions.
    pub(crate) fn parse_dimension_list(&mut self) {
        while self.at(TokenKind::OpenBracket) {
            self.parse_dimension();
        }
    }

    fn parse_dimension(&mut self) {
        self.start_node(SyntaxKind::VariableDimension);
        self.bump(); // [
        match self.current_kind() {
            TokenKind::CloseBracket => {} // dynamic array
            TokenKind::Star => {
                self.start_node(SyntaxKind::WildcardDimensionSpecifier);
                self.bump();
                self.finish_node();
            }
            TokenKind::Dollar => {
                self.start_node(SyntaxKind::QueueDimensionSpecifier);
                self.bump();
                if self.eat(TokenKind::Colon) {
                    self.parse_expression();
                }
                self.finish_node();
            }
            _ => {
                self.start_node(SyntaxKind::RangeDimensionSpecifier);
                self.parse_select_inner();
                self.finish_node();
            }
        }
        self.expect(TokenKind::CloseBracket);
        self.finish_node();
    }

    /// The inside of a `[...]`: a bit select, a simple range, or an
    /// indexed (`+:`/`-:`) range.
    pub(crate) fn parse_select_inner(&mut self) {
        let cp = self.checkpoint();
        self.parse_expression();
        match self.current_kind() {
            TokenKind::Colon => {
                self.start_node_at(cp, SyntaxKind::SimpleRangeSelect);
                self.bump();
                self.parse_expression();
                self.finish_node();
            }
            TokenKind::PlusColon => {
                self.start_node_at(cp, SyntaxKind::AscendingRangeSelect);
                self.bump();
                self.parse_expression();
                self.finish_node();
            }
            TokenKind::MinusColon => {
                self.start_node_at(cp, SyntaxKind::DescendingRangeSelect);
                self.bump();
                self.parse_expression();
                self.finish_node();
            }
            _ => {
                self.start_node_at(cp, SyntaxKind::BitSelect);
                self.finish_node();
            }
        }
    }

    // === Probes ===

    /// Bounded lookahead: does the cursor sit on a data type that is
    /// followed by a declared name? Scans tokens only, never builds
    /// nodes; used to disambiguate declarations from expressions.
    pub(crate) fn probe_type_then_name(&mut self) -> bool {
        let snap = self.snapshot();
        let result = self.probe_type_then_name_inner();
        self.restore(snap);
        result
    }

    fn probe_type_then_name_inner(&self) -> bool {
        let mut n = 0;
        let kind = self.peek_kind(0);

        if kind.is_data_type_keyword() {
            // Keyword types always mean a declaration here.
            return true;
        }
        if kind != TokenKind::Identifier {
            return false;
        }
        n += 1;
        while self.peek_kind(n) == TokenKind::DoubleColon {
            if self.peek_kind(n + 1) != TokenKind::Identifier {
                return false;
            }
            n += 2;
        }
        // Interface-port types: `iface.modport name`.
        if self.peek_kind(n) == TokenKind::Dot && self.peek_kind(n + 1) == TokenKind::Identifier {
            n += 2;
        }
        // Packed dimensions on the type.
        while self.peek_kind(n) == TokenKind::OpenBracket {
            n = match self.probe_matched_brackets(n) {
                Some(next) => next,
                None => return false,
            };
        }
        self.peek_kind(n) == TokenKind::Identifier
    }
}
