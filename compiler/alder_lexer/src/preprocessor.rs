//! The preprocessor.
//!
//! Sits on a stack of lexers (one per include level) and produces the
//! final token stream. Directives are consumed here and attached to
//! the next real token as [`TriviaKind::Directive`] trivia, together
//! with the text of inactive conditional regions, so the emitted
//! stream still covers the source it came from.
//!
//! Macro expansion registers an expansion buffer with the source
//! manager per use site; expanded body tokens carry locations in that
//! buffer, while argument tokens keep their use-site locations.

use std::collections::VecDeque;
use std::path::Path;

use rustc_hash::FxHashMap;
use tracing::debug;

use alder_diagnostic::{DiagCode, Diagnostic, Diagnostics};
use alder_num::SvInt;
use alder_source::{BufferId, SourceLocation, SourceManager, SourceRange};
use alder_syntax::{
    Name, StringInterner, Token, TokenKind, TokenList, TokenValue, Trivia, TriviaKind,
};

use crate::lexer::{Lexer, RawToken};

const MAX_INCLUDE_DEPTH: usize = 32;
const MAX_EXPANSION_STEPS: usize = 1024;

/// A recorded macro definition.
#[derive(Clone)]
struct MacroDef {
    /// Formal parameter names; `None` for object-like macros.
    params: Option<Vec<Name>>,
    body: Vec<(Token, Option<SvInt>)>,
    /// Range of the body in its defining buffer; `None` when empty.
    body_range: Option<SourceRange>,
}

/// One level of `` `ifdef `` nesting.
struct Cond {
    currently_active: bool,
    /// A branch already ran (or the enclosing context is inactive, in
    /// which case no branch may ever run).
    any_taken: bool,
    has_else: bool,
}

pub struct Preprocessor<'a> {
    sources: &'a SourceManager,
    interner: &'static StringInterner,
    diagnostics: &'a Diagnostics,
    lexers: Vec<Lexer<'a>>,
    lookahead: Option<RawToken>,
    macros: FxHashMap<Name, MacroDef>,
    cond_stack: Vec<Cond>,
    /// Trivia accumulated from consumed directives and inactive
    /// regions, waiting for the next emitted token.
    pending_trivia: Vec<Trivia>,
}

impl<'a> Preprocessor<'a> {
    pub fn new(
        sources: &'a SourceManager,
        interner: &'static StringInterner,
        diagnostics: &'a Diagnostics,
    ) -> Self {
        Preprocessor {
            sources,
            interner,
            diagnostics,
            lexers: Vec::new(),
            lookahead: None,
            macros: FxHashMap::default(),
            cond_stack: Vec::new(),
            pending_trivia: Vec::new(),
        }
    }

    /// Push a registered buffer as the (next) input.
    pub fn push_buffer(&mut self, buffer: BufferId) {
        let text = self
            .sources
            .source_text(buffer)
            .expect("buffer must be a file buffer");
        self.lexers
            .push(Lexer::new(text, buffer, self.interner, self.diagnostics));
    }

    /// Define a macro from the command line (`+define+NAME=...` style
    /// front ends call this with an empty body).
    pub fn predefine(&mut self, name: &str) {
        let name = self.interner.intern(name);
        self.macros.insert(
            name,
            MacroDef {
                params: None,
                body: Vec::new(),
                body_range: None,
            },
        );
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(&self.interner.intern(name))
    }

    /// Run to end of input, producing the complete token list.
    pub fn run(&mut self) -> TokenList {
        let mut list = TokenList::new();
        loop {
            let raw = self.lex_next();
            match raw.token.kind {
                TokenKind::Directive => self.handle_directive(raw),
                TokenKind::MacroUsage if self.is_active() => {
                    let leading = raw.trivia.clone();
                    let expanded = self.expand_top_level(raw);
                    let mut first = Some(leading);
                    for (tok, lit) in expanded {
                        self.emit(&mut list, tok, lit, first.take().unwrap_or_default());
                    }
                    // If the expansion was empty, keep the leading
                    // trivia for the next token.
                    if let Some(leading) = first {
                        self.pending_trivia.extend(leading);
                    }
                }
                TokenKind::EndOfFile => {
                    if self.lexers.len() > 1 {
                        self.pending_trivia.extend(raw.trivia);
                        self.lexers.pop();
                        continue;
                    }
                    if let Some(_unterminated) = self.cond_stack.pop() {
                        self.diagnostics.add(
                            Diagnostic::at(
                                DiagCode::MissingEndIfDirective,
                                raw.token.location,
                            )
                            .with_arg("ifdef"),
                        );
                        self.cond_stack.clear();
                    }
                    self.emit(&mut list, raw.token, None, raw.trivia);
                    break;
                }
                _ if !self.is_active() => {
                    // Inactive region: the text survives as trivia.
                    self.pending_trivia.extend(raw.trivia);
                    self.pending_trivia.push(Trivia {
                        kind: TriviaKind::Directive,
                        raw: raw.token.raw,
                    });
                }
                _ => {
                    self.emit(&mut list, raw.token, raw.literal, raw.trivia);
                }
            }
        }
        list
    }

    fn is_active(&self) -> bool {
        self.cond_stack.iter().all(|c| c.currently_active)
    }

    fn emit(
        &mut self,
        list: &mut TokenList,
        mut token: Token,
        literal: Option<SvInt>,
        leading: Vec<Trivia>,
    ) {
        let mut trivia = std::mem::take(&mut self.pending_trivia);
        trivia.extend(leading);
        token.trivia = list.add_trivia(&trivia);
        if let Some(value) = literal {
            token.value = TokenValue::Integer(list.add_literal(value));
        }
        list.push(token);
    }

    // === Input plumbing ===

    fn lex_next(&mut self) -> RawToken {
        if let Some(raw) = self.lookahead.take() {
            return raw;
        }
        self.lexers
            .last_mut()
            .expect("preprocessor has no input")
            .next()
    }

    fn peek_next(&mut self) -> &RawToken {
        if self.lookahead.is_none() {
            let raw = self
                .lexers
                .last_mut()
                .expect("preprocessor has no input")
                .next();
            self.lookahead = Some(raw);
        }
        self.lookahead.as_ref().unwrap()
    }

    // === Directives ===

    fn handle_directive(&mut self, raw: RawToken) {
        let name = match raw.token.value {
            TokenValue::Ident(n) => n,
            _ => Name::EMPTY,
        };
        let name_str = self.interner.get(name);

        // The directive's own leading trivia is preserved as-is; the
        // directive text itself accumulates into one Directive trivia.
        self.pending_trivia.extend(raw.trivia.iter().copied());
        let mut text = String::from(self.interner.get(raw.token.raw));

        match name_str {
            "ifdef" | "ifndef" => self.handle_ifdef(&raw, name_str == "ifndef", &mut text),
            "elsif" => self.handle_elsif(&raw, &mut text),
            "else" => self.handle_else(&raw),
            "endif" => self.handle_endif(&raw),
            "include" if self.is_active() => {
                self.flush_directive_text(text);
                self.handle_include(&raw);
                return;
            }
            "define" if self.is_active() => self.handle_define(&mut text),
            "undef" if self.is_active() => {
                if let Some(tok) = self.consume_directive_name(&mut text) {
                    self.macros.remove(&tok);
                }
            }
            "undefineall" if self.is_active() => self.macros.clear(),
            // Known but unmodeled directives: swallow the rest of the
            // line so the parser never sees it.
            _ => self.consume_rest_of_line(&mut text),
        }
        self.flush_directive_text(text);
    }

    fn flush_directive_text(&mut self, text: String) {
        if !text.is_empty() {
            self.pending_trivia.push(Trivia {
                kind: TriviaKind::Directive,
                raw: self.interner.intern(&text),
            });
        }
    }

    /// Append a consumed token (with its leading trivia) to the
    /// directive text.
    fn append_token_text(&self, text: &mut String, raw: &RawToken) {
        for t in &raw.trivia {
            text.push_str(self.interner.get(t.raw));
        }
        text.push_str(self.interner.get(raw.token.raw));
    }

    fn consume_rest_of_line(&mut self, text: &mut String) {
        loop {
            let peeked = self.peek_next();
            if peeked.starts_line || peeked.token.kind == TokenKind::EndOfFile {
                break;
            }
            let raw = self.lex_next();
            self.append_token_text(text, &raw);
        }
    }

    /// Consume an identifier naming a macro; diagnoses a missing name.
    fn consume_directive_name(&mut self, text: &mut String) -> Option<Name> {
        let peeked = self.peek_next();
        if peeked.starts_line || peeked.token.kind != TokenKind::Identifier {
            let loc = peeked.token.location;
            self.diagnostics
                .add(Diagnostic::at(DiagCode::ExpectedMacroName, loc));
            return None;
        }
        let raw = self.lex_next();
        self.append_token_text(text, &raw);
        raw.token.ident_name()
    }

    fn handle_ifdef(&mut self, _raw: &RawToken, invert: bool, text: &mut String) {
        let name = self.consume_directive_name(text);
        let parent_active = self.is_active();
        let defined = name.is_some_and(|n| self.macros.contains_key(&n));
        let cond = defined != invert;
        if parent_active {
            self.cond_stack.push(Cond {
                currently_active: cond,
                any_taken: cond,
                has_else: false,
            });
        } else {
            // Inside an inactive region no branch may ever activate.
            self.cond_stack.push(Cond {
                currently_active: false,
                any_taken: true,
                has_else: false,
            });
        }
    }

    fn handle_elsif(&mut self, raw: &RawToken, text: &mut String) {
        let name = self.consume_directive_name(text);
        let defined = name.is_some_and(|n| self.macros.contains_key(&n));
        match self.cond_stack.last_mut() {
            Some(cond) if !cond.has_else => {
                cond.currently_active = !cond.any_taken && defined;
                cond.any_taken |= cond.currently_active;
            }
            _ => {
                self.diagnostics.add(
                    Diagnostic::at(DiagCode::UnexpectedConditionalDirective, raw.token.location)
                        .with_arg("elsif"),
                );
            }
        }
    }

    fn handle_else(&mut self, raw: &RawToken) {
        match self.cond_stack.last_mut() {
            Some(cond) if !cond.has_else => {
                cond.currently_active = !cond.any_taken;
                cond.any_taken = true;
                cond.has_else = true;
            }
            _ => {
                self.diagnostics.add(
                    Diagnostic::at(DiagCode::UnexpectedConditionalDirective, raw.token.location)
                        .with_arg("else"),
                );
            }
        }
    }

    fn handle_endif(&mut self, raw: &RawToken) {
        if self.cond_stack.pop().is_none() {
            self.diagnostics.add(
                Diagnostic::at(DiagCode::UnexpectedConditionalDirective, raw.token.location)
                    .with_arg("endif"),
            );
        }
    }

    fn handle_include(&mut self, raw: &RawToken) {
        debug_assert!(self.lookahead.is_none(), "include after peek");
        if self.lexers.len() >= MAX_INCLUDE_DEPTH {
            self.diagnostics.add(Diagnostic::at(
                DiagCode::IncludeDepthExceeded,
                raw.token.location,
            ));
            return;
        }

        let lexer = self.lexers.last_mut().expect("no input");
        let Some((file_token, is_system)) = lexer.lex_include_filename() else {
            return;
        };
        // The file name text joins the directive trivia.
        self.pending_trivia.push(Trivia {
            kind: TriviaKind::Directive,
            raw: file_token.raw,
        });

        let path_name = match file_token.value {
            TokenValue::Str(s) => self.interner.get(s),
            _ => return,
        };
        match self
            .sources
            .read_header(Path::new(path_name), raw.token.location, is_system)
        {
            Ok(buffer) => {
                debug!(file = path_name, "entering include");
                self.push_buffer(buffer);
            }
            Err(_) => {
                self.diagnostics.add(
                    Diagnostic::new(DiagCode::CouldNotOpenIncludeFile, file_token.range())
                        .with_arg(path_name),
                );
            }
        }
    }

    fn handle_define(&mut self, text: &mut String) {
        let Some(name) = self.consume_directive_name(text) else {
            self.consume_rest_of_line(text);
            return;
        };

        // A '(' immediately after the name (no whitespace) starts a
        // formal parameter list.
        let params = {
            let peeked = self.peek_next();
            let adjacent = peeked.trivia.is_empty()
                && !peeked.starts_line
                && peeked.token.kind == TokenKind::OpenParen;
            if adjacent {
                Some(self.consume_define_params(text))
            } else {
                None
            }
        };

        let mut body = Vec::new();
        loop {
            let peeked = self.peek_next();
            if peeked.starts_line || peeked.token.kind == TokenKind::EndOfFile {
                break;
            }
            let raw = self.lex_next();
            self.append_token_text(text, &raw);
            body.push((raw.token, raw.literal));
        }

        let body_range = match (body.first(), body.last()) {
            (Some((first, _)), Some((last, _))) => {
                Some(SourceRange::new(first.location, last.range().end))
            }
            _ => None,
        };
        self.macros.insert(
            name,
            MacroDef {
                params,
                body,
                body_range,
            },
        );
    }

    fn consume_define_params(&mut self, text: &mut String) -> Vec<Name> {
        let open = self.lex_next(); // '('
        self.append_token_text(text, &open);
        let mut params = Vec::new();
        loop {
            let raw = self.lex_next();
            self.append_token_text(text, &raw);
            match raw.token.kind {
                TokenKind::Identifier => {
                    if let Some(name) = raw.token.ident_name() {
                        params.push(name);
                    }
                }
                TokenKind::CloseParen | TokenKind::EndOfFile => break,
                _ => {} // commas and recovery
            }
        }
        params
    }

    // === Macro expansion ===

    /// Expand a use site whose arguments (if any) come from the lexer.
    fn expand_top_level(&mut self, raw: RawToken) -> Vec<(Token, Option<SvInt>)> {
        let name = match raw.token.value {
            TokenValue::Ident(n) => n,
            _ => return Vec::new(),
        };
        let Some(def) = self.macros.get(&name).cloned() else {
            self.diagnostics.add(
                Diagnostic::new(DiagCode::UnknownDirective, raw.token.range())
                    .with_arg(self.interner.get(name)),
            );
            return Vec::new();
        };

        let args = if def.params.is_some() {
            let has_paren = self.peek_next().token.kind == TokenKind::OpenParen;
            if !has_paren {
                self.diagnostics.add(
                    Diagnostic::new(DiagCode::ExpectedMacroArgs, raw.token.range())
                        .with_arg(self.interner.get(name)),
                );
                return Vec::new();
            }
            let mut queue: VecDeque<(Token, Option<SvInt>)> = VecDeque::new();
            // Pull the whole argument list from the lexer into a queue
            // so nested and top-level expansion share one path.
            let mut depth = 0i32;
            loop {
                let arg_raw = self.lex_next();
                match arg_raw.token.kind {
                    TokenKind::OpenParen => depth += 1,
                    TokenKind::CloseParen => {
                        queue.push_back((arg_raw.token, arg_raw.literal));
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                        continue;
                    }
                    TokenKind::EndOfFile => {
                        queue.push_back((arg_raw.token, arg_raw.literal));
                        break;
                    }
                    _ => {}
                }
                queue.push_back((arg_raw.token, arg_raw.literal));
            }
            Some(queue)
        } else {
            None
        };

        let mut seed = VecDeque::new();
        seed.push_back((raw.token, None));
        if let Some(args) = args {
            seed.extend(args);
        }
        self.expand_queue(seed)
    }

    /// Worklist expansion: macro usages at the queue front expand in
    /// place (arguments are consumed from the queue), everything else
    /// passes through. A step limit catches recursive macros.
    fn expand_queue(
        &mut self,
        mut queue: VecDeque<(Token, Option<SvInt>)>,
    ) -> Vec<(Token, Option<SvInt>)> {
        let mut out = Vec::new();
        let mut steps = 0usize;
        while let Some((tok, lit)) = queue.pop_front() {
            if tok.kind != TokenKind::MacroUsage {
                out.push((tok, lit));
                continue;
            }

            steps += 1;
            if steps > MAX_EXPANSION_STEPS {
                self.diagnostics.add(
                    Diagnostic::new(DiagCode::RecursiveMacro, tok.range())
                        .with_arg(self.token_name_str(&tok)),
                );
                break;
            }

            let name = match tok.value {
                TokenValue::Ident(n) => n,
                _ => continue,
            };
            let Some(def) = self.macros.get(&name).cloned() else {
                self.diagnostics.add(
                    Diagnostic::new(DiagCode::UnknownDirective, tok.range())
                        .with_arg(self.interner.get(name)),
                );
                continue;
            };

            let args = match &def.params {
                Some(params) => {
                    match Self::parse_args_from_queue(&mut queue) {
                        Some(args) => {
                            if args.len() != params.len() {
                                self.diagnostics.add(
                                    Diagnostic::new(DiagCode::WrongMacroArgCount, tok.range())
                                        .with_arg(self.interner.get(name))
                                        .with_arg(params.len() as i64)
                                        .with_arg(args.len() as i64),
                                );
                            }
                            Some(args)
                        }
                        None => {
                            self.diagnostics.add(
                                Diagnostic::new(DiagCode::ExpectedMacroArgs, tok.range())
                                    .with_arg(self.interner.get(name)),
                            );
                            continue;
                        }
                    }
                }
                None => None,
            };

            let substituted = self.substitute(&def, tok.location, args.as_deref());
            for item in substituted.into_iter().rev() {
                queue.push_front(item);
            }
        }
        out
    }

    /// Split `( ... )` at the queue front into top-level
    /// comma-separated argument token groups.
    #[allow(clippy::type_complexity)]
    fn parse_args_from_queue(
        queue: &mut VecDeque<(Token, Option<SvInt>)>,
    ) -> Option<Vec<Vec<(Token, Option<SvInt>)>>> {
        match queue.front() {
            Some((tok, _)) if tok.kind == TokenKind::OpenParen => {}
            _ => return None,
        }
        queue.pop_front();

        let mut args: Vec<Vec<(Token, Option<SvInt>)>> = Vec::new();
        let mut current: Vec<(Token, Option<SvInt>)> = Vec::new();
        let mut depth = 0i32;
        let mut saw_any = false;
        while let Some((tok, lit)) = queue.pop_front() {
            match tok.kind {
                TokenKind::CloseParen if depth == 0 => {
                    if saw_any || !current.is_empty() {
                        args.push(current);
                    }
                    return Some(args);
                }
                TokenKind::Comma if depth == 0 => {
                    args.push(std::mem::take(&mut current));
                    saw_any = true;
                    continue;
                }
                TokenKind::OpenParen | TokenKind::OpenBracket | TokenKind::OpenBrace => depth += 1,
                TokenKind::CloseParen | TokenKind::CloseBracket | TokenKind::CloseBrace => {
                    depth -= 1
                }
                TokenKind::EndOfFile => {
                    queue.push_front((tok, lit));
                    return None;
                }
                _ => {}
            }
            current.push((tok, lit));
            saw_any = true;
        }
        None
    }

    /// Produce the body of `def` for one use site: body tokens are
    /// relocated into a fresh expansion buffer, parameters replaced by
    /// their argument tokens (which keep use-site locations).
    fn substitute(
        &mut self,
        def: &MacroDef,
        usage_loc: SourceLocation,
        args: Option<&[Vec<(Token, Option<SvInt>)>]>,
    ) -> Vec<(Token, Option<SvInt>)> {
        let Some(body_range) = def.body_range else {
            return Vec::new();
        };
        let expansion = self.sources.create_expansion(usage_loc, body_range);
        let body_start = body_range.start.offset();

        let mut out = Vec::new();
        for (tok, lit) in &def.body {
            // Parameter reference?
            if tok.kind == TokenKind::Identifier {
                if let (Some(params), Some(args), Some(name)) =
                    (&def.params, args, tok.ident_name())
                {
                    if let Some(idx) = params.iter().position(|&p| p == name) {
                        if let Some(actual) = args.get(idx) {
                            out.extend(actual.iter().cloned());
                        }
                        continue;
                    }
                }
            }
            let mut relocated = *tok;
            relocated.location =
                SourceLocation::new(expansion, tok.location.offset() - body_start);
            out.push((relocated, lit.clone()));
        }
        out
    }

    fn token_name_str(&self, tok: &Token) -> String {
        match tok.value {
            TokenValue::Ident(n) => self.interner.get(n).to_owned(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alder_syntax::TokenList;

    fn preprocess(text: &str) -> (TokenList, Diagnostics, SourceManager) {
        let interner: &'static StringInterner = Box::leak(Box::new(StringInterner::new()));
        let sources = SourceManager::new();
        let diagnostics = Diagnostics::new();
        let buffer = sources.assign_text(text);
        let list = {
            let mut pp = Preprocessor::new(&sources, interner, &diagnostics);
            pp.push_buffer(buffer);
            pp.run()
        };
        (list, diagnostics, sources)
    }

    fn kinds(list: &TokenList) -> Vec<TokenKind> {
        list.tokens().iter().map(|t| t.kind).collect()
    }

    // === Plain passthrough ===

    #[test]
    fn passthrough() {
        let (list, diags, _) = preprocess("module m; endmodule");
        assert!(diags.is_empty());
        assert_eq!(
            kinds(&list),
            vec![
                TokenKind::Module,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::EndModule,
                TokenKind::EndOfFile
            ]
        );
    }

    // === Object-like macros ===

    #[test]
    fn object_macro_expands() {
        let (list, diags, _) = preprocess("`define WIDTH 8\nlogic [`WIDTH:0] x;");
        assert!(diags.is_empty(), "{:?}", diags.collect());
        let ks = kinds(&list);
        // The macro body token appears in place of the usage.
        assert_eq!(
            ks,
            vec![
                TokenKind::Logic,
                TokenKind::OpenBracket,
                TokenKind::IntegerLiteral,
                TokenKind::Colon,
                TokenKind::IntegerLiteral,
                TokenKind::CloseBracket,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::EndOfFile
            ]
        );
    }

    #[test]
    fn expanded_tokens_live_in_expansion_buffers(){
        let (list, _, sources) = preprocess("`define VAL 42\nx = `VAL;");
        let lit = list
            .tokens()
            .iter()
            .find(|t| t.kind == TokenKind::IntegerLiteral)
            .unwrap();
        assert!(sources.is_expansion(lit.location.buffer()));
        // Following the chain lands on the use site, line 2.
        assert_eq!(sources.get_line_number(lit.location), 2);
    }

    #[test]
    fn nested_object_macros() {
        let (list, diags, _) = preprocess("`define A `B\n`define B 7\ny = `A;");
        assert!(diags.is_empty());
        assert!(kinds(&list).contains(&TokenKind::IntegerLiteral));
    }

    #[test]
    fn recursive_macro_diagnosed() {
        let (_, diags, _) = preprocess("`define LOOP `LOOP\nx = `LOOP;");
        assert!(diags.contains(DiagCode::RecursiveMacro));
    }

    #[test]
    fn undefined_macro_diagnosed() {
        let (_, diags, _) = preprocess("x = `NOPE;");
        assert!(diags.contains(DiagCode::UnknownDirective));
    }

    #[test]
    fn undef_removes_macro() {
        let (_, diags, _) = preprocess("`define M 1\n`undef M\nx = `M;");
        assert!(diags.contains(DiagCode::UnknownDirective));
    }

    // === Function-like macros ===

    #[test]
    fn function_macro_substitutes_args() {
        let (list, diags, _) = preprocess("`define MAX(a, b) ((a) > (b) ? (a) : (b))\nx = `MAX(1, 2);");
        assert!(diags.is_empty(), "{:?}", diags.collect());
        let ks = kinds(&list);
        // Both literal arguments must appear in the output.
        let ints = ks
            .iter()
            .filter(|&&k| k == TokenKind::IntegerLiteral)
            .count();
        assert_eq!(ints, 4); // (1) > (2) ? (1) : (2)
    }

    #[test]
    fn wrong_arg_count_diagnosed() {
        let (_, diags, _) = preprocess("`define PAIR(a, b) a b\nx = `PAIR(1);");
        assert!(diags.contains(DiagCode::WrongMacroArgCount));
    }

    #[test]
    fn function_macro_without_args_diagnosed() {
        let (_, diags, _) = preprocess("`define F(x) x\ny = `F;");
        assert!(diags.contains(DiagCode::ExpectedMacroArgs));
    }

    #[test]
    fn space_before_paren_means_object_like() {
        // With a space, the parens are part of the body, not params.
        let (list, diags, _) = preprocess("`define M (5)\nx = `M;");
        assert!(diags.is_empty());
        assert!(kinds(&list).contains(&TokenKind::OpenParen));
    }

    // === Conditionals ===

    #[test]
    fn ifdef_active_branch() {
        let (list, diags, _) =
            preprocess("`define FEATURE\n`ifdef FEATURE\nwire a;\n`else\nwire b;\n`endif\n");
        assert!(diags.is_empty());
        assert_eq!(
            list.tokens()
                .iter()
                .filter(|t| t.kind == TokenKind::Identifier)
                .count(),
            1
        );
    }

    #[test]
    fn ifndef_and_elsif() {
        let (list, diags, _) = preprocess(
            "`ifndef A\nwire first;\n`elsif B\nwire second;\n`else\nwire third;\n`endif\n",
        );
        assert!(diags.is_empty());
        assert_eq!(
            list.tokens()
                .iter()
                .filter(|t| t.kind == TokenKind::Wire)
                .count(),
            1
        );
    }

    #[test]
    fn inactive_region_becomes_trivia() {
        let (list, _, _) = preprocess("`ifdef NOPE\nwire hidden;\n`endif\nwire visible;");
        let wire = list
            .tokens()
            .iter()
            .find(|t| t.kind == TokenKind::Wire)
            .unwrap();
        // The hidden tokens were folded into directive trivia.
        let directive_count = list
            .trivia_of(wire)
            .iter()
            .filter(|t| t.kind == TriviaKind::Directive)
            .count();
        assert!(directive_count > 0);
    }

    #[test]
    fn nested_inactive_conditionals() {
        let (list, diags, _) = preprocess(
            "`ifdef NOPE\n`ifdef ALSO_NOPE\nwire a;\n`endif\nwire b;\n`endif\nwire c;\n",
        );
        assert!(diags.is_empty(), "{:?}", diags.collect());
        assert_eq!(
            list.tokens()
                .iter()
                .filter(|t| t.kind == TokenKind::Wire)
                .count(),
            1
        );
    }

    #[test]
    fn unbalanced_conditionals_diagnosed() {
        let (_, diags, _) = preprocess("`ifdef X\nwire a;\n");
        assert!(diags.contains(DiagCode::MissingEndIfDirective));

        let (_, diags, _) = preprocess("`endif\n");
        assert!(diags.contains(DiagCode::UnexpectedConditionalDirective));
    }

    // === Includes ===

    #[test]
    fn include_splices_tokens() {
        let dir = std::env::temp_dir().join("alder_pp_inc");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("defs.svh"), "wire included;\n").unwrap();

        let interner: &'static StringInterner = Box::leak(Box::new(StringInterner::new()));
        let sources = SourceManager::new();
        sources.add_user_directory(&dir);
        let diagnostics = Diagnostics::new();
        let buffer = sources.assign_text("`include \"defs.svh\"\nwire local_wire;\n");
        let list = {
            let mut pp = Preprocessor::new(&sources, interner, &diagnostics);
            pp.push_buffer(buffer);
            pp.run()
        };
        assert!(diagnostics.is_empty(), "{:?}", diagnostics.collect());
        assert_eq!(
            list.tokens()
                .iter()
                .filter(|t| t.kind == TokenKind::Wire)
                .count(),
            2
        );
    }

    #[test]
    fn missing_include_diagnosed() {
        let (_, diags, _) = preprocess("`include \"definitely_missing.svh\"\n");
        assert!(diags.contains(DiagCode::CouldNotOpenIncludeFile));
    }

    // === Unmodeled directives ===

    #[test]
    fn timescale_swallowed() {
        let (list, diags, _) = preprocess("`timescale 1ns / 1ps\nwire w;\n");
        assert!(diags.is_empty());
        assert_eq!(
            kinds(&list),
            vec![
                TokenKind::Wire,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::EndOfFile
            ]
        );
    }

    // === Losslessness ===

    #[test]
    fn directive_text_survives_as_trivia() {
        let text = "`define X 1\nwire w;\n";
        let (list, _, _) = preprocess(text);
        let wire = &list.tokens()[0];
        assert_eq!(wire.kind, TokenKind::Wire);
        assert!(list
            .trivia_of(wire)
            .iter()
            .any(|t| t.kind == TriviaKind::Directive));
    }
}
