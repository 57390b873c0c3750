//! The byte-cursor lexer.
//!
//! Produces one token at a time together with its leading trivia.
//! Operators use maximal munch; numeric literals are lexed whole
//! (size, base, and digits in one token) with their `SvInt` payload
//! decoded immediately.

use std::sync::Arc;

use alder_diagnostic::{DiagCode, Diagnostic, Diagnostics};
use alder_num::{LiteralBase, Logic, SvInt};
use alder_source::{BufferId, SourceLocation, SourceRange};
use alder_syntax::{Name, StringInterner, TimeUnit, Token, TokenKind, TokenValue, Trivia, TriviaKind};

/// A token plus its leading trivia, before trivia is committed to the
/// token list.
pub struct RawToken {
    pub token: Token,
    pub trivia: Vec<Trivia>,
    /// Decoded integer payload, stored into the token list by the
    /// preprocessor (tokens reference literals by id).
    pub literal: Option<SvInt>,
    /// True when an end-of-line appears in the leading trivia; used to
    /// find the end of directive bodies.
    pub starts_line: bool,
}

/// Directive names the preprocessor understands. Anything else after
/// a backtick is a macro usage.
const DIRECTIVE_NAMES: &[&str] = &[
    "include",
    "define",
    "undef",
    "undefineall",
    "ifdef",
    "ifndef",
    "elsif",
    "else",
    "endif",
    "timescale",
    "resetall",
    "default_nettype",
    "line",
    "pragma",
    "celldefine",
    "endcelldefine",
    "begin_keywords",
    "end_keywords",
];

pub struct Lexer<'a> {
    text: Arc<str>,
    buffer: BufferId,
    pos: usize,
    interner: &'static StringInterner,
    diagnostics: &'a Diagnostics,
    eof_emitted: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(
        text: Arc<str>,
        buffer: BufferId,
        interner: &'static StringInterner,
        diagnostics: &'a Diagnostics,
    ) -> Self {
        Lexer {
            text,
            buffer,
            pos: 0,
            interner,
            diagnostics,
            eof_emitted: false,
        }
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    #[inline]
    fn peek(&self) -> u8 {
        self.bytes().get(self.pos).copied().unwrap_or(0)
    }

    #[inline]
    fn peek_at(&self, n: usize) -> u8 {
        self.bytes().get(self.pos + n).copied().unwrap_or(0)
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
    }

    #[inline]
    fn at_end(&self) -> bool {
        self.pos >= self.bytes().len()
    }

    fn location(&self, pos: usize) -> SourceLocation {
        SourceLocation::new(self.buffer, pos as u32)
    }

    fn range(&self, start: usize, end: usize) -> SourceRange {
        SourceRange::new(self.location(start), self.location(end))
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        &self.text[start..end]
    }

    fn intern_slice(&self, start: usize, end: usize) -> Name {
        self.interner.intern(self.slice(start, end))
    }

    fn add_diag(&self, code: DiagCode, start: usize, end: usize) -> Diagnostic {
        Diagnostic::new(code, self.range(start, end))
    }

    /// Lex the next token. At end of input, returns the EOF token
    /// (repeatedly, if called again).
    pub fn next(&mut self) -> RawToken {
        let (trivia, starts_line) = self.lex_trivia();

        let start = self.pos;
        if self.at_end() {
            self.eof_emitted = true;
            let token = Token::new(TokenKind::EndOfFile, self.location(start), 0, Name::EMPTY);
            return RawToken {
                token,
                trivia,
                literal: None,
                starts_line,
            };
        }

        let (kind, value, literal) = self.lex_token();
        let end = self.pos;
        let mut token = Token::new(
            kind,
            self.location(start),
            (end - start) as u32,
            self.intern_slice(start, end),
        );
        token.value = value;
        RawToken {
            token,
            trivia,
            literal,
            starts_line,
        }
    }

    /// Skip horizontal whitespace and lex a `"file"` or `<file>` name
    /// after `` `include ``. Returns `None` (after a diagnostic) when
    /// the next thing on the line is not a file name.
    pub fn lex_include_filename(&mut self) -> Option<(Token, bool)> {
        while matches!(self.peek(), b' ' | b'\t') {
            self.advance();
        }
        let start = self.pos;
        let (close, is_system) = match self.peek() {
            b'"' => (b'"', false),
            b'<' => (b'>', true),
            _ => {
                self.diagnostics
                    .add(self.add_diag(DiagCode::ExpectedIncludeFileName, start, start + 1));
                return None;
            }
        };
        self.advance();
        let name_start = self.pos;
        while !self.at_end() && self.peek() != close && self.peek() != b'\n' && self.peek() != b'\r'
        {
            self.advance();
        }
        if self.peek() != close {
            self.diagnostics
                .add(self.add_diag(DiagCode::ExpectedIncludeFileName, start, self.pos));
            return None;
        }
        let name_end = self.pos;
        self.advance();

        let mut token = Token::new(
            TokenKind::IncludeFileName,
            self.location(start),
            (self.pos - start) as u32,
            self.intern_slice(start, self.pos),
        );
        token.value = TokenValue::Str(self.intern_slice(name_start, name_end));
        Some((token, is_system))
    }

    // === Trivia ===

    fn lex_trivia(&mut self) -> (Vec<Trivia>, bool) {
        let mut out = Vec::new();
        let mut starts_line = false;
        loop {
            let start = self.pos;
            match self.peek() {
                b' ' | b'\t' => {
                    while matches!(self.peek(), b' ' | b'\t') {
                        self.advance();
                    }
                    out.push(self.make_trivia(TriviaKind::Whitespace, start));
                }
                b'\n' => {
                    self.advance();
                    out.push(self.make_trivia(TriviaKind::EndOfLine, start));
                    starts_line = true;
                }
                b'\r' => {
                    self.advance();
                    if self.peek() == b'\n' {
                        self.advance();
                    }
                    out.push(self.make_trivia(TriviaKind::EndOfLine, start));
                    starts_line = true;
                }
                b'\\' if matches!(self.peek_at(1), b'\n' | b'\r') => {
                    // Line continuation: consumes the newline without
                    // ending the logical line.
                    self.advance();
                    if self.peek() == b'\r' {
                        self.advance();
                    }
                    if self.peek() == b'\n' {
                        self.advance();
                    }
                    out.push(self.make_trivia(TriviaKind::Whitespace, start));
                }
                b'/' if self.peek_at(1) == b'/' => {
                    while !self.at_end() && self.peek() != b'\n' && self.peek() != b'\r' {
                        self.advance();
                    }
                    out.push(self.make_trivia(TriviaKind::LineComment, start));
                }
                b'/' if self.peek_at(1) == b'*' => {
                    self.advance();
                    self.advance();
                    loop {
                        if self.at_end() {
                            self.diagnostics.add(self.add_diag(
                                DiagCode::UnterminatedBlockComment,
                                start,
                                self.pos,
                            ));
                            break;
                        }
                        if self.peek() == b'*' && self.peek_at(1) == b'/' {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                    out.push(self.make_trivia(TriviaKind::BlockComment, start));
                }
                _ => break,
            }
        }
        (out, starts_line)
    }

    fn make_trivia(&self, kind: TriviaKind, start: usize) -> Trivia {
        Trivia {
            kind,
            raw: self.intern_slice(start, self.pos),
        }
    }

    // === Tokens ===

    fn lex_token(&mut self) -> (TokenKind, TokenValue, Option<SvInt>) {
        let start = self.pos;
        let c = self.peek();
        match c {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_identifier(start),
            b'0'..=b'9' => self.lex_number(start),
            b'"' => self.lex_string(start),
            b'$' => self.lex_system_identifier(start),
            b'`' => self.lex_directive(start),
            b'\\' => self.lex_escaped_identifier(start),
            b'\'' => self.lex_apostrophe(start),
            _ => {
                let kind = self.lex_punctuation();
                if kind == TokenKind::Unknown {
                    self.diagnostics.add(
                        self.add_diag(DiagCode::UnexpectedCharacter, start, self.pos)
                            .with_arg(self.slice(start, self.pos)),
                    );
                }
                (kind, TokenValue::None, None)
            }
        }
    }

    fn lex_identifier(&mut self, start: usize) -> (TokenKind, TokenValue, Option<SvInt>) {
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$') {
            self.advance();
        }
        let text = self.slice(start, self.pos);
        match TokenKind::keyword(text) {
            Some(kind) => (kind, TokenValue::None, None),
            None => {
                let name = self.interner.intern(text);
                (TokenKind::Identifier, TokenValue::Ident(name), None)
            }
        }
    }

    fn lex_escaped_identifier(&mut self, start: usize) -> (TokenKind, TokenValue, Option<SvInt>) {
        self.advance(); // backslash
        let name_start = self.pos;
        while !self.at_end() && !self.peek().is_ascii_whitespace() {
            self.advance();
        }
        if self.pos == name_start {
            self.diagnostics
                .add(self.add_diag(DiagCode::EmptyEscapedIdentifier, start, self.pos));
            return (TokenKind::Unknown, TokenValue::None, None);
        }
        let name = self.intern_slice(name_start, self.pos);
        (TokenKind::Identifier, TokenValue::Ident(name), None)
    }

    fn lex_system_identifier(&mut self, start: usize) -> (TokenKind, TokenValue, Option<SvInt>) {
        self.advance(); // $
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$') {
            self.advance();
        }
        if self.pos - start == 1 {
            return (TokenKind::Dollar, TokenValue::None, None);
        }
        let name = self.intern_slice(start, self.pos);
        (TokenKind::SystemIdentifier, TokenValue::Ident(name), None)
    }

    fn lex_directive(&mut self, start: usize) -> (TokenKind, TokenValue, Option<SvInt>) {
        self.advance(); // backtick
        let name_start = self.pos;
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.advance();
        }
        let name = self.slice(name_start, self.pos);
        let value = TokenValue::Ident(self.interner.intern(name));
        if DIRECTIVE_NAMES.contains(&name) {
            (TokenKind::Directive, value, None)
        } else if name.is_empty() {
            self.diagnostics.add(
                self.add_diag(DiagCode::UnexpectedCharacter, start, self.pos)
                    .with_arg("`"),
            );
            (TokenKind::Unknown, TokenValue::None, None)
        } else {
            (TokenKind::MacroUsage, value, None)
        }
    }

    fn lex_string(&mut self, start: usize) -> (TokenKind, TokenValue, Option<SvInt>) {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            if self.at_end() || matches!(self.peek(), b'\n' | b'\r') {
                self.diagnostics
                    .add(self.add_diag(DiagCode::UnterminatedString, start, self.pos));
                break;
            }
            match self.peek() {
                b'"' => {
                    self.advance();
                    break;
                }
                b'\\' => {
                    let esc_start = self.pos;
                    self.advance();
                    let e = self.peek();
                    self.advance();
                    match e {
                        b'n' => value.push('\n'),
                        b't' => value.push('\t'),
                        b'\\' => value.push('\\'),
                        b'"' => value.push('"'),
                        b'v' => value.push('\x0b'),
                        b'f' => value.push('\x0c'),
                        b'a' => value.push('\x07'),
                        b'0'..=b'7' => {
                            // Up to three octal digits.
                            let mut v = u32::from(e - b'0');
                            for _ in 0..2 {
                                if matches!(self.peek(), b'0'..=b'7') {
                                    v = v * 8 + u32::from(self.peek() - b'0');
                                    self.advance();
                                }
                            }
                            value.push(char::from_u32(v).unwrap_or('\u{FFFD}'));
                        }
                        b'x' => {
                            let mut v = 0u32;
                            let mut digits = 0;
                            while self.peek().is_ascii_hexdigit() && digits < 2 {
                                v = v * 16 + (self.peek() as char).to_digit(16).unwrap_or(0);
                                self.advance();
                                digits += 1;
                            }
                            value.push(char::from_u32(v).unwrap_or('\u{FFFD}'));
                        }
                        b'\n' | b'\r' => {
                            // Escaped newline inside a string continues it.
                            if e == b'\r' && self.peek() == b'\n' {
                                self.advance();
                            }
                        }
                        other => {
                            self.diagnostics.add(
                                self.add_diag(DiagCode::BadEscapeSequence, esc_start, self.pos)
                                    .with_arg((other as char).to_string()),
                            );
                            value.push(other as char);
                        }
                    }
                }
                _ => {
                    // Copy a full UTF-8 scalar.
                    let ch_start = self.pos;
                    self.advance();
                    while !self.at_end() && (self.bytes()[self.pos] & 0xC0) == 0x80 {
                        self.advance();
                    }
                    value.push_str(self.slice(ch_start, self.pos));
                }
            }
        }
        let name = self.interner.intern(&value);
        (TokenKind::StringLiteral, TokenValue::Str(name), None)
    }

    fn lex_number(&mut self, start: usize) -> (TokenKind, TokenValue, Option<SvInt>) {
        while matches!(self.peek(), b'0'..=b'9' | b'_') {
            self.advance();
        }
        let digits_end = self.pos;

        // Real literal: fraction and/or exponent.
        let has_fraction = self.peek() == b'.' && self.peek_at(1).is_ascii_digit();
        let has_exponent = matches!(self.peek(), b'e' | b'E')
            && (self.peek_at(1).is_ascii_digit()
                || (matches!(self.peek_at(1), b'+' | b'-') && self.peek_at(2).is_ascii_digit()));
        if has_fraction || has_exponent {
            return self.lex_real(start);
        }
        if matches!(self.peek(), b'e' | b'E')
            && !matches!(self.peek_at(1), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_')
        {
            // `1e` with nothing after: still a real, with a diagnostic.
            return self.lex_real(start);
        }

        // Time literal: unit suffix directly attached.
        if let Some((kind, value)) = self.try_lex_time_suffix(start, digits_end) {
            return (kind, value, None);
        }

        // Sized based literal: digits immediately followed by 'base.
        if self.peek() == b'\'' && self.is_based_literal_ahead() {
            let size_text: String = self
                .slice(start, digits_end)
                .chars()
                .filter(|&c| c != '_')
                .collect();
            let size = size_text.parse::<u32>().ok().filter(|&s| s > 0);
            self.advance(); // apostrophe
            return self.lex_based_value(start, size);
        }

        // Plain decimal: unsized, signed, at least 32 bits.
        let text = self.slice(start, digits_end);
        let literal = SvInt::from_literal(None, true, LiteralBase::Decimal, text);
        (
            TokenKind::IntegerLiteral,
            TokenValue::None,
            Some(literal.unwrap_or_else(|| SvInt::zero(32))),
        )
    }

    fn is_based_literal_ahead(&self) -> bool {
        // After an apostrophe: optional s/S, then a base letter.
        let mut n = 1;
        if matches!(self.peek_at(n), b's' | b'S') {
            n += 1;
        }
        matches!(
            self.peek_at(n),
            b'b' | b'B' | b'o' | b'O' | b'd' | b'D' | b'h' | b'H'
        )
    }

    fn lex_based_value(
        &mut self,
        token_start: usize,
        size: Option<u32>,
    ) -> (TokenKind, TokenValue, Option<SvInt>) {
        let signed = if matches!(self.peek(), b's' | b'S') {
            self.advance();
            true
        } else {
            false
        };
        let base = match self.peek() {
            b'b' | b'B' => LiteralBase::Binary,
            b'o' | b'O' => LiteralBase::Octal,
            b'd' | b'D' => LiteralBase::Decimal,
            _ => LiteralBase::Hex,
        };
        self.advance();

        // Whitespace is allowed between base and digits.
        while matches!(self.peek(), b' ' | b'\t') {
            self.advance();
        }
        let digit_start = self.pos;
        while matches!(self.peek(),
            b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F' | b'x' | b'X' | b'z' | b'Z' | b'?' | b'_')
        {
            self.advance();
        }
        if self.pos == digit_start {
            self.diagnostics
                .add(self.add_diag(DiagCode::MissingBaseDigits, token_start, self.pos));
            return (
                TokenKind::IntegerLiteral,
                TokenValue::None,
                Some(SvInt::zero(size.unwrap_or(32))),
            );
        }

        let digits = self.slice(digit_start, self.pos);
        match SvInt::from_literal(size, signed, base, digits) {
            Some(v) => (TokenKind::IntegerLiteral, TokenValue::None, Some(v)),
            None => {
                self.diagnostics.add(
                    self.add_diag(DiagCode::InvalidBaseDigit, digit_start, self.pos)
                        .with_arg(digits),
                );
                (
                    TokenKind::IntegerLiteral,
                    TokenValue::None,
                    Some(SvInt::zero(size.unwrap_or(32))),
                )
            }
        }
    }

    fn lex_real(&mut self, start: usize) -> (TokenKind, TokenValue, Option<SvInt>) {
        if self.peek() == b'.' {
            self.advance();
            while matches!(self.peek(), b'0'..=b'9' | b'_') {
                self.advance();
            }
        }
        if matches!(self.peek(), b'e' | b'E') {
            self.advance();
            if matches!(self.peek(), b'+' | b'-') {
                self.advance();
            }
            if !self.peek().is_ascii_digit() {
                self.diagnostics
                    .add(self.add_diag(DiagCode::MissingExponentDigits, start, self.pos));
            }
            while matches!(self.peek(), b'0'..=b'9' | b'_') {
                self.advance();
            }
        }
        let text: String = self
            .slice(start, self.pos)
            .chars()
            .filter(|&c| c != '_')
            .collect();
        let value = text.parse::<f64>().unwrap_or(0.0);

        // A real with a time-unit suffix is a time literal.
        if let Some((_, tv)) = self.try_lex_time_suffix_value(value) {
            return (TokenKind::TimeLiteral, tv, None);
        }
        (TokenKind::RealLiteral, TokenValue::Real(value), None)
    }

    fn try_lex_time_suffix(
        &mut self,
        start: usize,
        digits_end: usize,
    ) -> Option<(TokenKind, TokenValue)> {
        let text: String = self
            .slice(start, digits_end)
            .chars()
            .filter(|&c| c != '_')
            .collect();
        let value = text.parse::<f64>().ok()?;
        self.try_lex_time_suffix_value(value)
            .map(|(k, v)| (k, v))
    }

    fn try_lex_time_suffix_value(&mut self, value: f64) -> Option<(TokenKind, TokenValue)> {
        let (len, unit) = match (self.peek(), self.peek_at(1)) {
            (b'f', b's') => (2, TimeUnit::Femtoseconds),
            (b'p', b's') => (2, TimeUnit::Picoseconds),
            (b'n', b's') => (2, TimeUnit::Nanoseconds),
            (b'u', b's') => (2, TimeUnit::Microseconds),
            (b'm', b's') => (2, TimeUnit::Milliseconds),
            (b's', next) if !is_ident_char(next) => (1, TimeUnit::Seconds),
            _ => return None,
        };
        // Reject `100nsec` style suffixes that run into an identifier.
        if len == 2 && is_ident_char(self.peek_at(2)) {
            return None;
        }
        for _ in 0..len {
            self.advance();
        }
        Some((TokenKind::TimeLiteral, TokenValue::Time(value, unit)))
    }

    fn lex_apostrophe(&mut self, _start: usize) -> (TokenKind, TokenValue, Option<SvInt>) {
        self.advance(); // apostrophe
        match self.peek() {
            b'{' => {
                self.advance();
                (TokenKind::ApostropheOpenBrace, TokenValue::None, None)
            }
            b'0' | b'1' | b'x' | b'X' | b'z' | b'Z'
                if !is_ident_char(self.peek_at(1)) && !self.peek_at(1).is_ascii_digit() =>
            {
                let bit = Logic::from_digit(self.peek() as char).unwrap_or(Logic::Zero);
                self.advance();
                (
                    TokenKind::UnbasedUnsizedLiteral,
                    TokenValue::Bit(bit),
                    None,
                )
            }
            _ if self.is_based_literal_ahead_at_zero() => {
                // Unsized based literal: 'hff and friends.
                self.lex_based_value(self.pos - 1, None)
            }
            _ => (TokenKind::Apostrophe, TokenValue::None, None),
        }
    }

    fn is_based_literal_ahead_at_zero(&self) -> bool {
        let mut n = 0;
        if matches!(self.peek_at(n), b's' | b'S') {
            n += 1;
        }
        matches!(
            self.peek_at(n),
            b'b' | b'B' | b'o' | b'O' | b'd' | b'D' | b'h' | b'H'
        )
    }

    fn lex_punctuation(&mut self) -> TokenKind {
        use TokenKind::*;
        let c = self.peek();
        let c1 = self.peek_at(1);
        let c2 = self.peek_at(2);
        let c3 = self.peek_at(3);

        // (kind, consumed) via longest match.
        let (kind, n) = match c {
            b'(' => {
                if c1 == b'*' && c2 != b')' {
                    (OpenParenStar, 2)
                } else {
                    (OpenParen, 1)
                }
            }
            b')' => (CloseParen, 1),
            b'[' => (OpenBracket, 1),
            b']' => (CloseBracket, 1),
            b'{' => (OpenBrace, 1),
            b'}' => (CloseBrace, 1),
            b';' => (Semicolon, 1),
            b',' => (Comma, 1),
            b'?' => (Question, 1),
            b'.' => {
                if c1 == b'*' {
                    (DotStar, 2)
                } else {
                    (Dot, 1)
                }
            }
            b':' => {
                if c1 == b':' {
                    (DoubleColon, 2)
                } else {
                    (Colon, 1)
                }
            }
            b'#' => {
                if c1 == b'#' {
                    (DoubleHash, 2)
                } else {
                    (Hash, 1)
                }
            }
            b'@' => {
                if c1 == b'*' {
                    (AtStar, 2)
                } else {
                    (At, 1)
                }
            }
            b'+' => match c1 {
                b'+' => (PlusPlus, 2),
                b'=' => (PlusEq, 2),
                b':' => (PlusColon, 2),
                _ => (Plus, 1),
            },
            b'-' => match c1 {
                b'-' => (MinusMinus, 2),
                b'=' => (MinusEq, 2),
                b':' => (MinusColon, 2),
                b'>' => (Arrow, 2),
                _ => (Minus, 1),
            },
            b'*' => match c1 {
                b'*' => (DoubleStar, 2),
                b'=' => (StarEq, 2),
                b')' => (StarCloseParen, 2),
                _ => (Star, 1),
            },
            b'/' => {
                if c1 == b'=' {
                    (SlashEq, 2)
                } else {
                    (Slash, 1)
                }
            }
            b'%' => {
                if c1 == b'=' {
                    (PercentEq, 2)
                } else {
                    (Percent, 1)
                }
            }
            b'<' => match (c1, c2, c3) {
                (b'<', b'<', b'=') => (ArithLeftShiftEq, 4),
                (b'<', b'<', _) => (ArithLeftShift, 3),
                (b'<', b'=', _) => (LeftShiftEq, 3),
                (b'<', _, _) => (LeftShift, 2),
                (b'=', _, _) => (LtEq, 2),
                (b'-', b'>', _) => (BidirArrow, 3),
                _ => (Lt, 1),
            },
            b'>' => match (c1, c2, c3) {
                (b'>', b'>', b'=') => (ArithRightShiftEq, 4),
                (b'>', b'>', _) => (ArithRightShift, 3),
                (b'>', b'=', _) => (RightShiftEq, 3),
                (b'>', _, _) => (RightShift, 2),
                (b'=', _, _) => (GtEq, 2),
                _ => (Gt, 1),
            },
            b'=' => match (c1, c2) {
                (b'=', b'=') => (CaseEq, 3),
                (b'=', b'?') => (WildcardEq, 3),
                (b'=', _) => (EqEq, 2),
                _ => (Eq, 1),
            },
            b'!' => match (c1, c2) {
                (b'=', b'=') => (CaseNotEq, 3),
                (b'=', b'?') => (WildcardNotEq, 3),
                (b'=', _) => (NotEq, 2),
                _ => (Bang, 1),
            },
            b'&' => match (c1, c2) {
                (b'&', b'&') => (TripleAmp, 3),
                (b'&', _) => (AmpAmp, 2),
                (b'=', _) => (AmpEq, 2),
                _ => (Amp, 1),
            },
            b'|' => match c1 {
                b'|' => (PipePipe, 2),
                b'=' => (PipeEq, 2),
                _ => (Pipe, 1),
            },
            b'^' => match c1 {
                b'~' => (TildeCaret, 2),
                b'=' => (CaretEq, 2),
                _ => (Caret, 1),
            },
            b'~' => match c1 {
                b'&' => (TildeAmp, 2),
                b'|' => (TildePipe, 2),
                b'^' => (TildeCaret, 2),
                _ => (Tilde, 1),
            },
            _ => (Unknown, 1),
        };
        for _ in 0..n {
            self.advance();
        }
        kind
    }
}

#[inline]
fn is_ident_char(c: u8) -> bool {
    matches!(c, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(text: &str) -> (Vec<Token>, Vec<Option<SvInt>>, Diagnostics) {
        let interner: &'static StringInterner = Box::leak(Box::new(StringInterner::new()));
        let diagnostics = Diagnostics::new();
        let mut tokens = Vec::new();
        let mut literals = Vec::new();
        {
            let mut lexer = Lexer::new(text.into(), BufferId::NONE, interner, &diagnostics);
            loop {
                let raw = lexer.next();
                let done = raw.token.kind == TokenKind::EndOfFile;
                tokens.push(raw.token);
                literals.push(raw.literal);
                if done {
                    break;
                }
            }
        }
        (tokens, literals, diagnostics)
    }

    fn kinds(text: &str) -> Vec<TokenKind> {
        let (tokens, _, _) = lex_all(text);
        tokens.iter().map(|t| t.kind).collect()
    }

    // === Identifiers and keywords ===

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("module m;"),
            vec![
                TokenKind::Module,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::EndOfFile
            ]
        );
    }

    #[test]
    fn escaped_identifier() {
        let (tokens, _, diags) = lex_all("\\bus+width more");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert!(diags.is_empty());
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn system_identifier() {
        let (tokens, _, _) = lex_all("$display $");
        assert_eq!(tokens[0].kind, TokenKind::SystemIdentifier);
        assert_eq!(tokens[1].kind, TokenKind::Dollar);
    }

    // === Literals ===

    #[test]
    fn sized_based_literal() {
        let (tokens, literals, diags) = lex_all("8'hff");
        assert!(diags.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::IntegerLiteral);
        let v = literals[0].as_ref().unwrap();
        assert_eq!(v.width(), 8);
        assert_eq!(v.as_u64(), Some(0xff));
    }

    #[test]
    fn unsized_based_literal() {
        let (_, literals, _) = lex_all("'sd15");
        let v = literals[0].as_ref().unwrap();
        assert_eq!(v.width(), 32);
        assert!(v.is_signed());
        assert_eq!(v.as_i32(), Some(15));
    }

    #[test]
    fn four_state_literal() {
        let (_, literals, _) = lex_all("4'b10xz");
        let v = literals[0].as_ref().unwrap();
        assert!(v.has_unknown());
        assert_eq!(v.get_bit(1), Logic::X);
        assert_eq!(v.get_bit(0), Logic::Z);
    }

    #[test]
    fn plain_decimal() {
        let (_, literals, _) = lex_all("42");
        let v = literals[0].as_ref().unwrap();
        assert_eq!(v.width(), 32);
        assert!(v.is_signed());
        assert_eq!(v.as_i32(), Some(42));
    }

    #[test]
    fn real_literals() {
        let (tokens, _, _) = lex_all("3.14 1e6 2.5e-3");
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::RealLiteral));
        assert_eq!(tokens[0].value, TokenValue::Real(3.14));
        assert_eq!(tokens[1].value, TokenValue::Real(1e6));
        assert_eq!(tokens[2].value, TokenValue::Real(2.5e-3));
    }

    #[test]
    fn time_literals() {
        let (tokens, _, _) = lex_all("10ns 1.5us 3s");
        assert_eq!(tokens[0].kind, TokenKind::TimeLiteral);
        assert_eq!(
            tokens[0].value,
            TokenValue::Time(10.0, TimeUnit::Nanoseconds)
        );
        assert_eq!(
            tokens[1].value,
            TokenValue::Time(1.5, TimeUnit::Microseconds)
        );
        assert_eq!(tokens[2].value, TokenValue::Time(3.0, TimeUnit::Seconds));
    }

    #[test]
    fn unbased_unsized_literals() {
        let (tokens, _, _) = lex_all("'0 '1 'x 'z");
        for (tok, bit) in tokens.iter().zip([Logic::Zero, Logic::One, Logic::X, Logic::Z]) {
            assert_eq!(tok.kind, TokenKind::UnbasedUnsizedLiteral);
            assert_eq!(tok.value, TokenValue::Bit(bit));
        }
    }

    #[test]
    fn string_escapes() {
        let (tokens, _, diags) = lex_all(r#""a\n\t\"b""#);
        assert!(diags.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
    }

    #[test]
    fn unterminated_string() {
        let (_, _, diags) = lex_all("\"abc\nx");
        assert!(diags.contains(DiagCode::UnterminatedString));
    }

    #[test]
    fn bad_escape_diagnosed() {
        let (_, _, diags) = lex_all(r#""\q""#);
        assert!(diags.contains(DiagCode::BadEscapeSequence));
    }

    // === Operators ===

    #[test]
    fn maximal_munch() {
        assert_eq!(
            kinds("<<<= <<< <<= << <= < === ==? == = &&& && & @* @"),
            vec![
                TokenKind::ArithLeftShiftEq,
                TokenKind::ArithLeftShift,
                TokenKind::LeftShiftEq,
                TokenKind::LeftShift,
                TokenKind::LtEq,
                TokenKind::Lt,
                TokenKind::CaseEq,
                TokenKind::WildcardEq,
                TokenKind::EqEq,
                TokenKind::Eq,
                TokenKind::TripleAmp,
                TokenKind::AmpAmp,
                TokenKind::Amp,
                TokenKind::AtStar,
                TokenKind::At,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn select_operators() {
        assert_eq!(
            kinds("a[3+:2] b[7-:4]"),
            vec![
                TokenKind::Identifier,
                TokenKind::OpenBracket,
                TokenKind::IntegerLiteral,
                TokenKind::PlusColon,
                TokenKind::IntegerLiteral,
                TokenKind::CloseBracket,
                TokenKind::Identifier,
                TokenKind::OpenBracket,
                TokenKind::IntegerLiteral,
                TokenKind::MinusColon,
                TokenKind::IntegerLiteral,
                TokenKind::CloseBracket,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn attribute_delimiters() {
        assert_eq!(
            kinds("(* full_case *) (a) @(*)"),
            vec![
                TokenKind::OpenParenStar,
                TokenKind::Identifier,
                TokenKind::StarCloseParen,
                TokenKind::OpenParen,
                TokenKind::Identifier,
                TokenKind::CloseParen,
                TokenKind::At,
                TokenKind::OpenParen,
                TokenKind::StarCloseParen,
                TokenKind::EndOfFile,
            ]
        );
    }

    // === Trivia ===

    #[test]
    fn trivia_attaches_to_following_token() {
        let interner: &'static StringInterner = Box::leak(Box::new(StringInterner::new()));
        let diagnostics = Diagnostics::new();
        let mut lexer = Lexer::new(
            "  // comment\n  foo".into(),
            BufferId::NONE,
            interner,
            &diagnostics,
        );
        let raw = lexer.next();
        assert_eq!(raw.token.kind, TokenKind::Identifier);
        let kinds: Vec<TriviaKind> = raw.trivia.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TriviaKind::Whitespace,
                TriviaKind::LineComment,
                TriviaKind::EndOfLine,
                TriviaKind::Whitespace
            ]
        );
        assert!(raw.starts_line);
    }

    #[test]
    fn line_continuation_does_not_start_line() {
        let interner: &'static StringInterner = Box::leak(Box::new(StringInterner::new()));
        let diagnostics = Diagnostics::new();
        let mut lexer = Lexer::new("\\\nfoo".into(), BufferId::NONE, interner, &diagnostics);
        let raw = lexer.next();
        assert_eq!(raw.token.kind, TokenKind::Identifier);
        assert!(!raw.starts_line);
    }

    #[test]
    fn directives_and_macros() {
        let (tokens, _, _) = lex_all("`include `define `MY_MACRO");
        assert_eq!(tokens[0].kind, TokenKind::Directive);
        assert_eq!(tokens[1].kind, TokenKind::Directive);
        assert_eq!(tokens[2].kind, TokenKind::MacroUsage);
    }

    #[test]
    fn raw_text_round_trip() {
        let text = "module m; logic [7:0] a = 8'hff; // t\nendmodule\n";
        let interner: &'static StringInterner = Box::leak(Box::new(StringInterner::new()));
        let diagnostics = Diagnostics::new();
        let mut lexer = Lexer::new(text.into(), BufferId::NONE, interner, &diagnostics);
        let mut rebuilt = String::new();
        loop {
            let raw = lexer.next();
            for t in &raw.trivia {
                rebuilt.push_str(interner.get(t.raw));
            }
            rebuilt.push_str(interner.get(raw.token.raw));
            if raw.token.kind == TokenKind::EndOfFile {
                break;
            }
        }
        assert_eq!(rebuilt, text);
    }
}
