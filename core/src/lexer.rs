//! PHP lexer and the tokenizer adapter built on it.
//!
//! The lexer turns a file into an ordered list of [`Token`]s with exact
//! 1-based line numbers. It recognises:
//! - inline HTML and the `<?php` / `<?=` / `?>` tags
//! - comments, doc comments and whitespace
//! - plain, qualified, fully qualified and relative names
//! - reserved words, with the context rules PHP applies to `enum` and to
//!   labels following `->`, `?->` and `::`
//! - single/double quoted, backtick, heredoc and nowdoc strings, lexing the
//!   code embedded through `{$` and `${` as PHP
//! - `__halt_compiler`, after which the rest of the file is data
//!
//! [`tokenize`] additionally rejects files whose brackets do not pair up,
//! which is the part of PHP's parse check the declaration scanner relies on.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::error::LexError;
use crate::token::{Keyword, Token, TokenKind};

/// Reserved words other than the ones mapped to [`Keyword`].
static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "abstract",
        "and",
        "array",
        "as",
        "break",
        "callable",
        "case",
        "catch",
        "clone",
        "continue",
        "declare",
        "default",
        "die",
        "do",
        "echo",
        "else",
        "elseif",
        "empty",
        "enddeclare",
        "endfor",
        "endforeach",
        "endif",
        "endswitch",
        "endwhile",
        "eval",
        "exit",
        "extends",
        "final",
        "finally",
        "fn",
        "for",
        "foreach",
        "global",
        "goto",
        "if",
        "implements",
        "include",
        "include_once",
        "instanceof",
        "insteadof",
        "isset",
        "list",
        "match",
        "new",
        "or",
        "print",
        "private",
        "protected",
        "public",
        "readonly",
        "require",
        "require_once",
        "return",
        "static",
        "switch",
        "throw",
        "try",
        "unset",
        "var",
        "while",
        "xor",
        "yield",
        "__halt_compiler",
        "__class__",
        "__dir__",
        "__file__",
        "__function__",
        "__line__",
        "__method__",
        "__namespace__",
        "__property__",
        "__trait__",
    ]
    .into_iter()
    .collect()
});

/// Tokenize PHP source, failing on lexical errors and unbalanced brackets.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(source);
    lexer.run()?;
    let end_line = lexer.line;
    let tokens = lexer.tokens;
    check_delimiters(&tokens, end_line)?;
    Ok(tokens)
}

/// Lexer state for a single file.
struct Lexer<'src> {
    source: &'src str,
    /// Current byte position.
    pos: usize,
    /// Line of the next token to be pushed.
    line: usize,
    tokens: Vec<Token>,
    /// Set right after `->`, `?->` or `::`; the next label is a plain name.
    after_member_operator: bool,
    /// `__halt_compiler` was seen; lexing stops at the next `;` or `?>`.
    halt_pending: bool,
}

impl<'src> Lexer<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            tokens: Vec::new(),
            after_member_operator: false,
            halt_pending: false,
        }
    }

    fn run(&mut self) -> Result<(), LexError> {
        while !self.is_eof() {
            self.lex_inline_html();
            if self.is_eof() {
                break;
            }
            self.lex_open_tag();
            self.lex_php(false)?;
            if self.halt_pending {
                let start = self.pos;
                self.pos = self.source.len();
                if start < self.pos {
                    self.push(TokenKind::InlineHtml, start);
                }
                break;
            }
        }
        Ok(())
    }

    // ----- cursor helpers -----

    fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    fn starts_with(&self, pattern: &str) -> bool {
        self.rest().starts_with(pattern)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            if self.bump().is_none() {
                break;
            }
        }
    }

    fn eat_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        let text = &self.source[start..self.pos];
        let line = self.line;
        self.line += count_newlines(text);
        if !kind.is_trivia() {
            self.after_member_operator = false;
        }
        self.tokens.push(Token::new(kind, text, line));
    }

    fn last_text_is(&self, text: &str) -> bool {
        self.tokens.last().map_or(false, |t| t.text == text)
    }

    // ----- outside PHP -----

    fn lex_inline_html(&mut self) {
        let start = self.pos;
        self.pos = find_open_tag(self.source, self.pos).unwrap_or(self.source.len());
        if start < self.pos {
            self.push(TokenKind::InlineHtml, start);
        }
    }

    fn lex_open_tag(&mut self) {
        let start = self.pos;
        if self.starts_with("<?=") {
            self.bump_n(3);
        } else {
            self.bump_n(5);
            if self.starts_with("\r\n") {
                self.bump_n(2);
            } else if matches!(self.peek(), Some(' ' | '\t' | '\n' | '\r')) {
                self.bump();
            }
        }
        self.push(TokenKind::OpenTag, start);
    }

    // ----- inside PHP -----

    /// Lex code until `?>` or end of input. With `nested` set, lex the code
    /// embedded in a string instead, stopping after the `}` that closes it.
    fn lex_php(&mut self, nested: bool) -> Result<(), LexError> {
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            let start = self.pos;
            match c {
                '{' => {
                    self.bump();
                    self.push(TokenKind::OpenBrace, start);
                    if nested {
                        depth += 1;
                    }
                }
                '}' => {
                    self.bump();
                    self.push(TokenKind::CloseBrace, start);
                    if nested {
                        if depth == 0 {
                            return Ok(());
                        }
                        depth -= 1;
                    }
                }
                '?' if self.starts_with("?>") => {
                    if nested {
                        return Err(LexError::new(
                            "syntax error, unexpected token \"?>\"",
                            self.line,
                        ));
                    }
                    self.bump_n(2);
                    if self.starts_with("\r\n") {
                        self.bump_n(2);
                    } else if matches!(self.peek(), Some('\n')) {
                        self.bump();
                    }
                    self.push(TokenKind::CloseTag, start);
                    return Ok(());
                }
                _ => self.lex_token(c)?,
            }
            if !nested && self.halt_pending && self.last_text_is(";") {
                return Ok(());
            }
        }
        if nested {
            return Err(LexError::new(
                "syntax error, unexpected end of file",
                self.line,
            ));
        }
        Ok(())
    }

    fn lex_token(&mut self, c: char) -> Result<(), LexError> {
        let start = self.pos;
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                self.eat_while(|c| matches!(c, ' ' | '\t' | '\n' | '\r'));
                self.push(TokenKind::Whitespace, start);
            }
            '#' if self.peek_second() == Some('[') => {
                self.bump_n(2);
                self.push(TokenKind::Punct, start);
            }
            '#' => self.lex_line_comment(),
            '/' if self.peek_second() == Some('/') => self.lex_line_comment(),
            '/' if self.peek_second() == Some('*') => self.lex_block_comment()?,
            '$' if self.peek_second().map_or(false, is_label_start) => {
                self.bump();
                self.eat_while(is_label_char);
                self.push(TokenKind::Variable, start);
            }
            '\'' => {
                self.bump();
                self.lex_single_quoted(start)?;
            }
            '"' => {
                self.bump();
                self.lex_interpolated(start, Closing::Quote('"'))?;
            }
            '`' => {
                self.bump();
                self.lex_interpolated(start, Closing::Quote('`'))?;
            }
            '<' if self.starts_with("<<<") => match heredoc_opener(self.rest()) {
                Some(opener) => {
                    self.pos += opener.len;
                    self.lex_heredoc(start, opener)?;
                }
                None => {
                    self.bump();
                    self.push(TokenKind::Punct, start);
                }
            },
            'b' | 'B' if self.binary_string_follows() => {
                self.bump();
                return self.lex_binary_string(start);
            }
            '0'..='9' => self.lex_number(),
            '.' if self.peek_second().map_or(false, |c| c.is_ascii_digit()) => self.lex_number(),
            '\\' if self.peek_second().map_or(false, is_label_start) => {
                self.bump();
                self.eat_name_segments();
                self.push(TokenKind::FullyQualifiedName, start);
            }
            c if is_label_start(c) => self.lex_label(),
            '-' if self.starts_with("->") => self.lex_member_operator(2),
            '?' if self.starts_with("?->") => self.lex_member_operator(3),
            ':' if self.starts_with("::") => self.lex_member_operator(2),
            _ => {
                self.bump();
                self.push(TokenKind::Punct, start);
            }
        }
        Ok(())
    }

    fn lex_member_operator(&mut self, len: usize) {
        let start = self.pos;
        self.bump_n(len);
        self.push(TokenKind::Punct, start);
        self.after_member_operator = true;
    }

    fn lex_line_comment(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\n' || c == '\r' || self.starts_with("?>") {
                break;
            }
            self.bump();
        }
        self.push(TokenKind::Comment, start);
    }

    fn lex_block_comment(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        let doc = self.starts_with("/**")
            && self.source[start + 3..]
                .chars()
                .next()
                .map_or(false, |c| c.is_ascii_whitespace());
        self.bump_n(2);
        match self.rest().find("*/") {
            Some(end) => {
                self.pos += end + 2;
                let kind = if doc {
                    TokenKind::DocComment
                } else {
                    TokenKind::Comment
                };
                self.push(kind, start);
                Ok(())
            }
            None => Err(LexError::new(
                format!("Unterminated comment starting line {}", self.line),
                self.line,
            )),
        }
    }

    fn lex_number(&mut self) {
        let start = self.pos;
        let radix_prefix = self.peek() == Some('0')
            && matches!(
                self.peek_second(),
                Some('x' | 'X' | 'b' | 'B' | 'o' | 'O')
            );
        if radix_prefix {
            self.bump_n(2);
            self.eat_while(|c| c.is_ascii_hexdigit() || c == '_');
        } else {
            self.eat_while(|c| c.is_ascii_digit() || c == '_');
            if self.peek() == Some('.') && self.peek_second() != Some('.') {
                self.bump();
                self.eat_while(|c| c.is_ascii_digit() || c == '_');
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                let mut chars = self.rest().chars().skip(1);
                let exponent = match chars.next() {
                    Some('+' | '-') => chars.next().map_or(false, |c| c.is_ascii_digit()),
                    Some(c) => c.is_ascii_digit(),
                    None => false,
                };
                if exponent {
                    self.bump_n(2);
                    self.eat_while(|c| c.is_ascii_digit() || c == '_');
                }
            }
        }
        self.push(TokenKind::Number, start);
    }

    /// Consume `\Label` segments following the current position.
    fn eat_name_segments(&mut self) {
        self.eat_while(is_label_char);
        while self.peek() == Some('\\') && self.peek_second().map_or(false, is_label_start) {
            self.bump();
            self.eat_while(is_label_char);
        }
    }

    fn lex_label(&mut self) {
        let start = self.pos;
        self.eat_name_segments();
        let word = &self.source[start..self.pos];

        let kind = if let Some((first, _)) = word.split_once('\\') {
            if first.eq_ignore_ascii_case("namespace") {
                TokenKind::RelativeName
            } else {
                TokenKind::QualifiedName
            }
        } else if self.after_member_operator {
            TokenKind::Name
        } else {
            self.classify_word(word)
        };
        self.push(kind, start);
    }

    fn classify_word(&mut self, word: &str) -> TokenKind {
        let lower = word.to_ascii_lowercase();
        match lower.as_str() {
            "namespace" => TokenKind::Keyword(Keyword::Namespace),
            "class" => TokenKind::Keyword(Keyword::Class),
            "interface" => TokenKind::Keyword(Keyword::Interface),
            "trait" => TokenKind::Keyword(Keyword::Trait),
            "function" => TokenKind::Keyword(Keyword::Function),
            "const" => TokenKind::Keyword(Keyword::Const),
            "use" => TokenKind::Keyword(Keyword::Use),
            "enum" if self.enum_declaration_follows() => TokenKind::Keyword(Keyword::Enum),
            "__halt_compiler" => {
                self.halt_pending = true;
                TokenKind::Reserved
            }
            w if RESERVED_WORDS.contains(w) => TokenKind::Reserved,
            _ => TokenKind::Name,
        }
    }

    /// `enum` opens a declaration only when trivia and then a label other
    /// than `extends`/`implements` follow it.
    fn enum_declaration_follows(&self) -> bool {
        let rest = self.rest();
        let skipped = skip_trivia(rest);
        if skipped == 0 {
            return false;
        }
        let after = &rest[skipped..];
        if !after.chars().next().map_or(false, is_label_start) {
            return false;
        }
        let end = after
            .char_indices()
            .find(|&(_, c)| !is_label_char(c))
            .map_or(after.len(), |(i, _)| i);
        let next = &after[..end];
        !next.eq_ignore_ascii_case("extends") && !next.eq_ignore_ascii_case("implements")
    }

    // ----- strings -----

    fn binary_string_follows(&self) -> bool {
        match self.peek_second() {
            Some('\'' | '"') => true,
            Some('<') => heredoc_opener(&self.rest()[1..]).is_some(),
            _ => false,
        }
    }

    fn lex_binary_string(&mut self, start: usize) -> Result<(), LexError> {
        match self.peek() {
            Some('\'') => {
                self.bump();
                self.lex_single_quoted(start)
            }
            Some('"') => {
                self.bump();
                self.lex_interpolated(start, Closing::Quote('"'))
            }
            _ => match heredoc_opener(self.rest()) {
                Some(opener) => {
                    self.pos += opener.len;
                    self.lex_heredoc(start, opener)
                }
                None => {
                    self.push(TokenKind::Name, start);
                    Ok(())
                }
            },
        }
    }

    fn lex_single_quoted(&mut self, start: usize) -> Result<(), LexError> {
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some('\'') => break,
                Some(_) => {}
                None => {
                    return Err(LexError::new(
                        "syntax error, unterminated string literal",
                        self.line,
                    ))
                }
            }
        }
        self.push(TokenKind::StringLiteral, start);
        Ok(())
    }

    fn lex_heredoc(&mut self, start: usize, opener: HeredocOpener) -> Result<(), LexError> {
        if opener.nowdoc {
            self.lex_nowdoc_body(start, &opener.label)
        } else {
            self.lex_interpolated(start, Closing::Heredoc(&opener.label))
        }
    }

    fn lex_nowdoc_body(&mut self, start: usize, label: &str) -> Result<(), LexError> {
        let mut at_line_start = true;
        loop {
            if at_line_start {
                if let Some(len) = closing_marker_len(self.rest(), label) {
                    self.pos += len;
                    self.push(TokenKind::StringLiteral, start);
                    return Ok(());
                }
            }
            match self.bump() {
                Some('\n') => at_line_start = true,
                Some('\r') => at_line_start = self.peek() != Some('\n'),
                Some(_) => at_line_start = false,
                None => {
                    return Err(LexError::new(
                        format!("syntax error, unterminated nowdoc \"{label}\""),
                        self.line,
                    ))
                }
            }
        }
    }

    /// Lex a double quoted, backtick or heredoc string. Literal runs become
    /// [`TokenKind::StringLiteral`] fragments; `{$` and `${` hand over to
    /// [`Lexer::lex_php`] until the matching `}`.
    fn lex_interpolated(&mut self, start: usize, closing: Closing<'_>) -> Result<(), LexError> {
        let mut fragment = start;
        let mut at_line_start = matches!(closing, Closing::Heredoc(_));
        loop {
            if let (Closing::Heredoc(label), true) = (closing, at_line_start) {
                if let Some(len) = closing_marker_len(self.rest(), label) {
                    self.pos += len;
                    self.push(TokenKind::StringLiteral, fragment);
                    return Ok(());
                }
            }
            let Some(c) = self.peek() else {
                let message = match closing {
                    Closing::Heredoc(label) => {
                        format!("syntax error, unterminated heredoc \"{label}\"")
                    }
                    Closing::Quote(_) => "syntax error, unterminated string literal".to_string(),
                };
                return Err(LexError::new(message, self.line));
            };
            match c {
                '\\' => {
                    self.bump();
                    if !matches!(self.peek(), Some('\n' | '\r') | None) {
                        self.bump();
                    }
                    at_line_start = false;
                }
                '{' if self.peek_second() == Some('$') => {
                    if fragment < self.pos {
                        self.push(TokenKind::StringLiteral, fragment);
                    }
                    let open = self.pos;
                    self.bump();
                    self.push(TokenKind::CurlyOpen, open);
                    self.lex_php(true)?;
                    fragment = self.pos;
                    at_line_start = false;
                }
                '$' if self.peek_second() == Some('{') => {
                    if fragment < self.pos {
                        self.push(TokenKind::StringLiteral, fragment);
                    }
                    let open = self.pos;
                    self.bump_n(2);
                    self.push(TokenKind::DollarOpenCurlyBraces, open);
                    self.lex_php(true)?;
                    fragment = self.pos;
                    at_line_start = false;
                }
                '\n' => {
                    self.bump();
                    at_line_start = true;
                }
                '\r' => {
                    self.bump();
                    at_line_start = self.peek() != Some('\n');
                }
                c => {
                    self.bump();
                    at_line_start = false;
                    if let Closing::Quote(quote) = closing {
                        if c == quote {
                            self.push(TokenKind::StringLiteral, fragment);
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Closing<'a> {
    Quote(char),
    Heredoc(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeredocOpener {
    /// Bytes from `<<<` through the newline ending the opener line.
    len: usize,
    label: String,
    nowdoc: bool,
}

/// Parse `<<<LABEL`, `<<<"LABEL"` or `<<<'LABEL'` followed by a newline.
fn heredoc_opener(text: &str) -> Option<HeredocOpener> {
    let after_arrows = text.strip_prefix("<<<")?;
    let trimmed = after_arrows.trim_start_matches([' ', '\t']);
    let mut pos = 3 + after_arrows.len() - trimmed.len();

    let quote = match trimmed.chars().next()? {
        q @ ('"' | '\'') => Some(q),
        _ => None,
    };
    let label_start = if quote.is_some() { 1 } else { 0 };
    let label_text = &trimmed[label_start..];
    if !label_text.chars().next().map_or(false, is_label_start) {
        return None;
    }
    let label_len = label_text
        .char_indices()
        .find(|&(_, c)| !is_label_char(c))
        .map_or(label_text.len(), |(i, _)| i);
    let label = &label_text[..label_len];
    pos += label_start + label_len;

    let tail = &text[pos..];
    let tail = match quote {
        Some(q) => {
            let stripped = tail.strip_prefix(q)?;
            pos += 1;
            stripped
        }
        None => tail,
    };
    if tail.starts_with("\r\n") {
        pos += 2;
    } else if tail.starts_with('\n') || tail.starts_with('\r') {
        pos += 1;
    } else {
        return None;
    }

    Some(HeredocOpener {
        len: pos,
        label: label.to_string(),
        nowdoc: quote == Some('\''),
    })
}

/// Length of an indented closing heredoc marker at the start of `text`.
fn closing_marker_len(text: &str, label: &str) -> Option<usize> {
    let body = text.trim_start_matches([' ', '\t']);
    let indent = text.len() - body.len();
    let after = body.strip_prefix(label)?;
    if after.chars().next().map_or(false, is_label_char) {
        return None;
    }
    Some(indent + label.len())
}

/// Bytes of whitespace and comments at the start of `text`.
fn skip_trivia(text: &str) -> usize {
    let mut pos = 0;
    loop {
        let rest = &text[pos..];
        let trimmed = rest.trim_start_matches([' ', '\t', '\n', '\r']);
        if trimmed.len() < rest.len() {
            pos += rest.len() - trimmed.len();
            continue;
        }
        if rest.starts_with("/*") {
            match rest[2..].find("*/") {
                Some(end) => {
                    pos += end + 4;
                    continue;
                }
                None => return pos,
            }
        }
        if rest.starts_with("//") || (rest.starts_with('#') && !rest.starts_with("#[")) {
            pos += rest.find('\n').unwrap_or(rest.len());
            continue;
        }
        return pos;
    }
}

/// Byte offset of the next `<?php` or `<?=` at or after `from`.
fn find_open_tag(source: &str, from: usize) -> Option<usize> {
    let mut search = from;
    while let Some(offset) = source[search..].find("<?") {
        let at = search + offset;
        let after = &source.as_bytes()[at + 2..];
        if after.first() == Some(&b'=') {
            return Some(at);
        }
        if after.get(..3).map_or(false, |w| w.eq_ignore_ascii_case(b"php")) {
            match after.get(3) {
                None => return Some(at),
                Some(b) if b.is_ascii_whitespace() => return Some(at),
                _ => {}
            }
        }
        search = at + 2;
    }
    None
}

fn is_label_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic() || !c.is_ascii()
}

fn is_label_char(c: char) -> bool {
    is_label_start(c) || c.is_ascii_digit()
}

/// Newlines as PHP counts them: `\n`, `\r\n`, or a lone `\r`.
fn count_newlines(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut count = 0;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\n' => count += 1,
            b'\r' if bytes.get(i + 1) != Some(&b'\n') => count += 1,
            _ => {}
        }
    }
    count
}

/// Verify that `(`/`)`, `[`/`]` and `{`/`}` nest properly.
fn check_delimiters(tokens: &[Token], end_line: usize) -> Result<(), LexError> {
    let mut open: Vec<char> = Vec::new();
    for token in tokens {
        let closer = match (token.kind, token.text.as_str()) {
            (TokenKind::OpenBrace | TokenKind::CurlyOpen | TokenKind::DollarOpenCurlyBraces, _) => {
                open.push('}');
                continue;
            }
            (TokenKind::Punct, "(") => {
                open.push(')');
                continue;
            }
            (TokenKind::Punct, "[" | "#[") => {
                open.push(']');
                continue;
            }
            (TokenKind::CloseBrace, _) => '}',
            (TokenKind::Punct, ")") => ')',
            (TokenKind::Punct, "]") => ']',
            _ => continue,
        };
        if open.pop() != Some(closer) {
            return Err(LexError::new(
                format!("syntax error, unexpected token \"{}\"", token.text),
                token.line,
            ));
        }
    }
    if !open.is_empty() {
        return Err(LexError::new(
            "syntax error, unexpected end of file",
            end_line,
        ));
    }
    Ok(())
}
