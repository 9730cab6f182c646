//! Declaration scanner: recovers top-level class-like, function and constant
//! declarations from a token stream without building a syntax tree.
//!
//! The scanner is a small state machine. A declaring keyword opens a pending
//! capture; name fragments that follow are concatenated; the first other
//! significant token closes the capture. A closed capture is emitted only
//! when the brace level equals the top level of the current namespace, which
//! excludes methods, class constants, closures and anything declared inside
//! a function body or conditional block.

use tracing::trace;

use crate::collision::{Declaration, DeclarationGroup};
use crate::token::{Keyword, Token, TokenKind};

/// Scan a token stream and return its top-level declarations in source order.
pub fn scan_declarations(tokens: &[Token]) -> Vec<Declaration> {
    DeclarationScanner::new(tokens).scan()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Namespace,
    Declaration(DeclarationGroup),
}

/// Per-file scanner state. Create one per file and drop it afterwards.
#[derive(Debug)]
pub struct DeclarationScanner<'t> {
    tokens: &'t [Token],
    pending: Option<Pending>,
    /// Line of the keyword that opened the pending capture.
    pending_line: usize,
    pending_name: String,
    /// Current namespace with a trailing `\`, or empty for the global one.
    namespace_prefix: String,
    brace_level: i64,
    /// Brace level at which the current namespace's members live.
    top_level_depth: i64,
    declarations: Vec<Declaration>,
}

impl<'t> DeclarationScanner<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            pending: None,
            pending_line: 0,
            pending_name: String::new(),
            namespace_prefix: String::new(),
            brace_level: 0,
            top_level_depth: 0,
            declarations: Vec::new(),
        }
    }

    pub fn scan(mut self) -> Vec<Declaration> {
        for (index, token) in self.tokens.iter().enumerate() {
            self.step(index, token);
        }
        self.declarations
    }

    fn step(&mut self, index: usize, token: &Token) {
        match token.kind {
            kind if kind.is_trivia() => return,
            kind if kind.is_name_fragment() => {
                if self.pending.is_some() {
                    self.pending_name.push_str(&token.text);
                }
                return;
            }
            TokenKind::Keyword(keyword @ (Keyword::Function | Keyword::Const)) => {
                if !is_within_use_statement(self.tokens, index) {
                    self.begin(keyword, token.line);
                }
                return;
            }
            TokenKind::Keyword(
                keyword @ (Keyword::Namespace
                | Keyword::Class
                | Keyword::Interface
                | Keyword::Trait
                | Keyword::Enum),
            ) => {
                self.begin(keyword, token.line);
                return;
            }
            kind if kind.opens_implicit_scope() => {
                self.brace_level += 1;
            }
            _ => {}
        }

        if let Some(pending) = self.pending.take() {
            self.finish_capture(pending, token);
        }

        match token.kind {
            TokenKind::OpenBrace => self.brace_level += 1,
            TokenKind::CloseBrace => self.brace_level -= 1,
            _ => {}
        }
    }

    fn begin(&mut self, keyword: Keyword, line: usize) {
        self.pending = match DeclarationGroup::from_keyword(keyword) {
            Some(group) => Some(Pending::Declaration(group)),
            None => Some(Pending::Namespace),
        };
        self.pending_line = line;
        self.pending_name.clear();
    }

    fn finish_capture(&mut self, pending: Pending, terminator: &Token) {
        let name = std::mem::take(&mut self.pending_name);
        match pending {
            Pending::Namespace => {
                self.namespace_prefix = if name.is_empty() {
                    String::new()
                } else {
                    format!("{name}\\")
                };
                self.top_level_depth = if terminator.kind == TokenKind::OpenBrace {
                    1
                } else {
                    0
                };
            }
            Pending::Declaration(group) => {
                if name.is_empty() || self.brace_level != self.top_level_depth {
                    return;
                }
                let declaration = Declaration {
                    group,
                    name: format!("{}{}", self.namespace_prefix, name),
                    line: self.pending_line,
                };
                trace!(
                    group = %declaration.group,
                    name = %declaration.name,
                    line = declaration.line,
                    "declaration"
                );
                self.declarations.push(declaration);
            }
        }
    }
}

/// Whether the keyword at `index` belongs to `use function` / `use const`.
///
/// Braced group imports (`use Foo\{ function f }`) are not detected here;
/// they sit one brace level deeper than the namespace top level and are
/// dropped by the level check instead.
pub fn is_within_use_statement(tokens: &[Token], index: usize) -> bool {
    tokens[..index.min(tokens.len())]
        .iter()
        .rev()
        .find(|token| !token.kind.is_ignorable())
        .map_or(false, |token| token.is_keyword(Keyword::Use))
}
