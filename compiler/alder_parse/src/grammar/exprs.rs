//! Expression parsing: precedence climbing with postfix handling.

use alder_diagnostic::DiagCode;
use alder_syntax::{SyntaxKind, TokenKind, TokenValue};

use crate::Parser;
use crate::SeriesConfig;

/// Binding powers, loosest to tightest. Matching entries in the
/// binary-operator table below index into this ladder.
const BP_TERNARY: u8 = 2;
const BP_LOGICAL_OR: u8 = 3;
const BP_LOGICAL_AND: u8 = 4;
const BP_BITWISE_OR: u8 = 5;
const BP_BITWISE_XOR: u8 = 6;
const BP_BITWISE_AND: u8 = 7;
const BP_EQUALITY: u8 = 8;
const BP_RELATIONAL: u8 = 9;
const BP_SHIFT: u8 = 10;
const BP_ADDITIVE: u8 = 11;
const BP_MULTIPLICATIVE: u8 = 12;
const BP_POWER: u8 = 13;

/// Binding power and associativity of a binary operator token.
fn binary_bp(kind: TokenKind) -> Option<(u8, bool)> {
    use TokenKind::*;
    let (bp, right) = match kind {
        PipePipe => (BP_LOGICAL_OR, false),
        AmpAmp => (BP_LOGICAL_AND, false),
        Pipe => (BP_BITWISE_OR, false),
        Caret | TildeCaret => (BP_BITWISE_XOR, false),
        Amp => (BP_BITWISE_AND, false),
        EqEq | NotEq | CaseEq | CaseNotEq | WildcardEq | WildcardNotEq => (BP_EQUALITY, false),
        Lt | LtEq | Gt | GtEq => (BP_RELATIONAL, false),
        LeftShift | RightShift | ArithLeftShift | ArithRightShift => (BP_SHIFT, false),
        Plus | Minus => (BP_ADDITIVE, false),
        Star | Slash | Percent => (BP_MULTIPLICATIVE, false),
        DoubleStar => (BP_POWER, true),
        _ => return None,
    };
    Some((bp, right))
}

fn is_prefix_op(kind: TokenKind) -> bool {
    use TokenKind::*;
    matches!(
        kind,
        Plus | Minus
            | Bang
            | Tilde
            | Amp
            | TildeAmp
            | Pipe
            | TildePipe
            | Caret
            | TildeCaret
            | PlusPlus
            | MinusMinus
    )
}

impl Parser<'_> {
    /// Whether the current token can begin an expression.
    pub(crate) fn can_start_expression(&self) -> bool {
        use TokenKind::*;
        let kind = self.current_kind();
        is_prefix_op(kind)
            || kind.is_data_type_keyword()
            || matches!(
                kind,
                Identifier
                    | SystemIdentifier
                    | IntegerLiteral
                    | RealLiteral
                    | TimeLiteral
                    | StringLiteral
                    | UnbasedUnsizedLiteral
                    | Null
                    | This
                    | OpenParen
                    | OpenBrace
                    | ApostropheOpenBrace
                    | Tagged
                    | Dollar
            )
    }

    /// Parse a full expression.
    pub(crate) fn parse_expression(&mut self) {
        self.parse_expr_bp(0);
    }

    /// Parse an expression that may be an assignment (statement and
    /// continuous-assign position). `<=` directly after the target is
    /// a nonblocking assignment here, not a comparison.
    pub(crate) fn parse_expression_or_assignment(&mut self) {
        let cp = self.checkpoint();
        self.parse_unary_expr();
        let kind = self.current_kind();
        if kind == TokenKind::Eq || kind == TokenKind::LtEq || kind.is_compound_assignment() {
            self.start_node_at(cp, SyntaxKind::AssignmentExpression);
            self.bump();
            // Intra-assignment timing control: `a <= #5 b;`.
            if matches!(self.current_kind(), TokenKind::Hash | TokenKind::DoubleHash) {
                self.parse_timing_control();
            }
            self.parse_expr_bp(0);
            self.finish_node();
        } else {
            self.parse_binary_rest(cp, 0);
        }
    }

    fn parse_expr_bp(&mut self, min_bp: u8) {
        let cp = self.checkpoint();
        self.parse_unary_expr();
        self.parse_binary_rest(cp, min_bp);
    }

    fn parse_binary_rest(&mut self, cp: usize, min_bp: u8) {
        loop {
            let kind = self.current_kind();

            // Ternary sits below the binary ladder and is
            // right-associative.
            if kind == TokenKind::Question && BP_TERNARY >= min_bp {
                self.start_node_at(cp, SyntaxKind::ConditionalExpression);
                self.bump();
                self.parse_expr_bp(0);
                self.expect(TokenKind::Colon);
                self.parse_expr_bp(BP_TERNARY);
                self.finish_node();
                continue;
            }

            // `x inside {a, [b:c]}`.
            if kind == TokenKind::Inside && BP_RELATIONAL >= min_bp {
                self.start_node_at(cp, SyntaxKind::InsideExpression);
                self.bump();
                self.parse_range_list();
                self.finish_node();
                continue;
            }

            let Some((bp, right)) = binary_bp(kind) else {
                break;
            };
            if bp < min_bp {
                break;
            }
            self.start_node_at(cp, SyntaxKind::BinaryExpression);
            self.bump();
            self.parse_expr_bp(if right { bp } else { bp + 1 });
            self.finish_node();
        }
    }

    /// `{ value, [lo:hi], ... }` after `inside`.
    fn parse_range_list(&mut self) {
        self.start_node(SyntaxKind::RangeListExpression);
        self.expect(TokenKind::OpenBrace);
        self.parse_series(SeriesConfig::comma(TokenKind::CloseBrace), |p| {
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
        self.expect(TokenKind::CloseBrace);
        self.finish_node();
    }

    /// Prefix operators, then a primary, then all postfix forms.
    pub(crate) fn parse_unary_expr(&mut self) {
        if is_prefix_op(self.current_kind()) {
            self.start_node(SyntaxKind::PrefixUnaryExpression);
            self.bump();
            self.parse_unary_expr();
            self.finish_node();
            return;
        }
        let cp = self.checkpoint();
        self.parse_primary();
        self.parse_postfix(cp);
    }

    fn parse_postfix(&mut self, cp: usize) {
        loop {
            match self.current_kind() {
                TokenKind::OpenBracket => {
                    self.start_node_at(cp, SyntaxKind::ElementSelectExpression);
                    self.start_node(SyntaxKind::ElementSelect);
                    self.bump();
                    self.parse_select_inner();
                    self.expect(TokenKind::CloseBracket);
                    self.finish_node();
                    self.finish_node();
                }
                TokenKind::OpenParen => {
                    self.start_node_at(cp, SyntaxKind::InvocationExpression);
                    self.parse_argument_list();
                    self.finish_node();
                }
                TokenKind::Dot => {
                    self.start_node_at(cp, SyntaxKind::MemberAccessExpression);
                    self.bump();
                    self.expect(TokenKind::Identifier);
                    self.finish_node();
                }
                TokenKind::DoubleColon => {
                    self.start_node_at(cp, SyntaxKind::ScopedName);
                    self.bump();
                    self.expect(TokenKind::Identifier);
                    self.finish_node();
                }
                TokenKind::Apostrophe if self.peek_kind(1) == TokenKind::OpenParen => {
                    self.start_node_at(cp, SyntaxKind::CastExpression);
                    self.bump(); // '
                    self.bump(); // (
                    self.parse_expression();
                    self.expect(TokenKind::CloseParen);
                    self.finish_node();
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    self.start_node_at(cp, SyntaxKind::PostfixUnaryExpression);
                    self.bump();
                    self.finish_node();
                }
                _ => break,
            }
        }
    }

    fn parse_argument_list(&mut self) {
        self.start_node(SyntaxKind::ArgumentList);
        self.bump(); // (
        self.parse_series(
            SeriesConfig::comma(TokenKind::CloseParen).allow_trailing(),
            |p| {
                if p.at(TokenKind::Dot) {
                    p.start_node(SyntaxKind::NamedArgument);
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
                    p.start_node(SyntaxKind::OrderedArgument);
                    p.parse_expression();
                    p.finish_node();
                    true
                } else {
                    false
                }
            },
        );
        self.expect(TokenKind::CloseParen);
        self.finish_node();
    }

    fn parse_primary(&mut self) {
        match self.current_kind() {
            TokenKind::IntegerLiteral => self.literal(SyntaxKind::IntegerLiteralExpression),
            TokenKind::RealLiteral => self.literal(SyntaxKind::RealLiteralExpression),
            TokenKind::TimeLiteral => self.literal(SyntaxKind::TimeLiteralExpression),
            TokenKind::StringLiteral => self.literal(SyntaxKind::StringLiteralExpression),
            TokenKind::UnbasedUnsizedLiteral => {
                self.literal(SyntaxKind::UnbasedUnsizedLiteralExpression)
            }
            TokenKind::Null => self.literal(SyntaxKind::NullLiteralExpression),
            TokenKind::Identifier | TokenKind::This => {
                self.start_node(SyntaxKind::IdentifierName);
                self.bump();
                self.finish_node();
            }
            TokenKind::SystemIdentifier => {
                // `$root` and `$unit` anchor hierarchical names; other
                // system names are callables.
                let kind = match self.current().value {
                    TokenValue::Ident(name) => {
                        let text = self.interner().get(name);
                        match text {
                            "$root" => SyntaxKind::RootScopeName,
                            "$unit" => SyntaxKind::UnitScopeName,
                            _ => SyntaxKind::SystemName,
                        }
                    }
                    _ => SyntaxKind::SystemName,
                };
                self.start_node(kind);
                self.bump();
                self.finish_node();
            }
            TokenKind::OpenParen => {
                self.start_node(SyntaxKind::ParenthesizedExpression);
                self.bump();
                self.parse_expression();
                self.expect(TokenKind::CloseParen);
                self.finish_node();
            }
            TokenKind::OpenBrace => self.parse_concatenation(),
            TokenKind::ApostropheOpenBrace => self.parse_assignment_pattern(),
            TokenKind::Tagged => {
                self.start_node(SyntaxKind::TaggedUnionExpression);
                self.bump();
                self.expect(TokenKind::Identifier);
                if self.can_start_expression() {
                    self.parse_unary_expr();
                }
                self.finish_node();
            }
            kind if kind.is_data_type_keyword() => {
                // Either a cast (`int'(x)`) or a bare type reference
                // (`$bits(int)`, associative-array index types).
                self.start_node(SyntaxKind::TypeReference);
                self.parse_data_type();
                self.finish_node();
            }
            _ => {
                self.add_diag(DiagCode::ExpectedExpression, self.current_range());
                self.start_node(SyntaxKind::IdentifierName);
                self.push_missing(TokenKind::Identifier);
                self.finish_node();
            }
        }
    }

    fn literal(&mut self, kind: SyntaxKind) {
        self.start_node(kind);
        self.bump();
        self.finish_node();
    }

    /// `{...}` concatenation, `{n{...}}` replication, or
    /// `{<< [size] {...}}` streaming.
    fn parse_concatenation(&mut self) {
        let stream = matches!(
            self.peek_kind(1),
            TokenKind::LeftShift | TokenKind::RightShift
        );
        if stream {
            self.start_node(SyntaxKind::StreamingConcatenationExpression);
            self.bump(); // {
            self.bump(); // << or >>
            if !self.at(TokenKind::OpenBrace) {
                // Slice size: expression or type.
                self.parse_expression();
            }
            self.expect(TokenKind::OpenBrace);
            self.parse_series(
                SeriesConfig::comma(TokenKind::CloseBrace),
                |p| {
                    if p.can_start_expression() {
                        p.parse_expression();
                        true
                    } else {
                        false
                    }
                },
            );
            self.expect(TokenKind::CloseBrace);
            self.expect(TokenKind::CloseBrace);
            self.finish_node();
            return;
        }

        let cp = self.checkpoint();
        self.bump(); // {
        if self.at(TokenKind::CloseBrace) {
            // `{}`: the empty queue concatenation.
            self.start_node_at(cp, SyntaxKind::ConcatenationExpression);
            self.bump();
            self.finish_node();
            return;
        }
        self.parse_expression();
        if self.at(TokenKind::OpenBrace) {
            // `{count {elements}}` replication.
            self.start_node_at(cp, SyntaxKind::MultipleConcatenationExpression);
            self.bump(); // inner {
            self.parse_series(SeriesConfig::comma(TokenKind::CloseBrace), |p| {
                if p.can_start_expression() {
                    p.parse_expression();
                    true
                } else {
                    false
                }
            });
            self.expect(TokenKind::CloseBrace); // inner
            self.expect(TokenKind::CloseBrace); // outer
            self.finish_node();
            return;
        }

        self.start_node_at(cp, SyntaxKind::ConcatenationExpression);
        while self.eat(TokenKind::Comma) {
            if self.can_start_expression() {
                self.parse_expression();
            } else {
                self.add_diag(DiagCode::ExpectedExpression, self.current_range());
                break;
            }
        }
        self.expect(TokenKind::CloseBrace);
        self.finish_node();
    }

    fn parse_assignment_pattern(&mut self) {
        self.start_node(SyntaxKind::AssignmentPatternExpression);
        self.bump(); // '{
        self.parse_series(
            SeriesConfig::comma(TokenKind::CloseBrace),
            |p| {
                if !p.can_start_expression() && !p.at(TokenKind::Default) {
                    return false;
                }
                p.start_node(SyntaxKind::AssignmentPatternItem);
                if p.eat(TokenKind::Default) {
                    p.expect(TokenKind::Colon);
                    p.parse_expression();
                } else {
                    p.parse_expression();
                    if p.eat(TokenKind::Colon) {
                        p.parse_expression();
                    }
                }
                p.finish_node();
                true
            },
        );
        self.expect(TokenKind::CloseBrace);
        self.finish_node();
    }
}
