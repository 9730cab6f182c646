//! Lexical tokens produced by the PHP lexer.

/// Keywords the declaration scanner reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Namespace,
    Class,
    Interface,
    Trait,
    Enum,
    Function,
    Const,
    Use,
}

/// Classification of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Text outside of `<?php ... ?>`.
    InlineHtml,
    /// `<?php` or `<?=`, including the whitespace PHP folds into it.
    OpenTag,
    /// `?>`
    CloseTag,
    Whitespace,
    /// `//`, `#` or `/* */`
    Comment,
    /// `/** */`
    DocComment,
    /// Unqualified label such as `Foo` or `strlen`.
    Name,
    /// `Foo\Bar`
    QualifiedName,
    /// `\Foo\Bar`
    FullyQualifiedName,
    /// `namespace\Foo`
    RelativeName,
    /// `$foo`
    Variable,
    Keyword(Keyword),
    /// Any other reserved word (`extends`, `new`, `if`, ...).
    Reserved,
    Number,
    /// String literal or a literal fragment of an interpolated string.
    StringLiteral,
    /// `{$` inside an interpolated string; the token text is `{`.
    CurlyOpen,
    /// `${` inside an interpolated string.
    DollarOpenCurlyBraces,
    OpenBrace,
    CloseBrace,
    /// Operators and remaining punctuation.
    Punct,
}

impl TokenKind {
    /// Comments and whitespace. The scanner treats these as if absent.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::DocComment
        )
    }

    /// Trivia plus open tags; what backward lookups skip.
    pub fn is_ignorable(&self) -> bool {
        self.is_trivia() || *self == TokenKind::OpenTag
    }

    /// Tokens that may be concatenated into a declared name.
    pub fn is_name_fragment(&self) -> bool {
        matches!(self, TokenKind::Name | TokenKind::QualifiedName)
    }

    /// Tokens that open a brace scope without being a literal `{` in code.
    pub fn opens_implicit_scope(&self) -> bool {
        matches!(
            self,
            TokenKind::CurlyOpen | TokenKind::DollarOpenCurlyBraces
        )
    }
}

/// A single token: kind, source text, and the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }
}
