//! Token types produced by the lexer.

use std::fmt;

/// Reserved words the splitter and rewriter care about.
///
/// Every other reserved word is reported as [`Keyword::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Namespace,
    Use,
    Class,
    Interface,
    Trait,
    Enum,
    Function,
    Const,
    Other,
}

impl Keyword {
    /// Classify a word as a reserved word, case-insensitively.
    ///
    /// `enum` is deliberately absent: it is only a keyword in declaration
    /// position, which the lexer decides from the surrounding text.
    pub fn from_word(word: &str) -> Option<Keyword> {
        let lower = word.to_ascii_lowercase();
        let keyword = match lower.as_str() {
            "namespace" => Keyword::Namespace,
            "use" => Keyword::Use,
            "class" => Keyword::Class,
            "interface" => Keyword::Interface,
            "trait" => Keyword::Trait,
            "function" => Keyword::Function,
            "const" => Keyword::Const,
            "abstract" | "and" | "array" | "as" | "break" | "callable" | "case" | "catch"
            | "clone" | "continue" | "declare" | "default" | "do" | "echo" | "else"
            | "elseif" | "empty" | "enddeclare" | "endfor" | "endforeach" | "endif"
            | "endswitch" | "endwhile" | "eval" | "exit" | "die" | "extends" | "final"
            | "finally" | "fn" | "for" | "foreach" | "global" | "goto" | "if"
            | "implements" | "include" | "include_once" | "instanceof" | "insteadof"
            | "isset" | "list" | "match" | "new" | "or" | "print" | "private"
            | "protected" | "public" | "readonly" | "require" | "require_once" | "return"
            | "static" | "switch" | "throw" | "try" | "unset" | "var" | "while" | "xor"
            | "yield" => Keyword::Other,
            _ => return None,
        };
        Some(keyword)
    }

    /// Whether this keyword introduces a type declaration.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            Keyword::Class | Keyword::Interface | Keyword::Trait | Keyword::Enum
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Keyword::Namespace => "namespace",
            Keyword::Use => "use",
            Keyword::Class => "class",
            Keyword::Interface => "interface",
            Keyword::Trait => "trait",
            Keyword::Enum => "enum",
            Keyword::Function => "function",
            Keyword::Const => "const",
            Keyword::Other => "keyword",
        };
        write!(f, "{}", s)
    }
}

/// Classification of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// An unqualified name such as `Foo` or `strlen`.
    Identifier,
    /// A name with at least one separator, such as `Foo\Bar`.
    QualifiedName,
    /// A qualified name with a leading separator, such as `\Foo\Bar`.
    FullyQualifiedName,
    Whitespace,
    /// Line and block comments.
    Comment,
    /// `/** ... */`, which belongs to the declaration that follows it.
    DocComment,
    /// Single-character punctuation plus the `${` interpolation opener.
    Punctuation,
    /// `<?php` including the single whitespace character that follows it.
    OpenTag,
    Keyword(Keyword),
    /// Variables, literals, operators, inline HTML and anything else.
    Other,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::QualifiedName => write!(f, "qualified name"),
            TokenKind::FullyQualifiedName => write!(f, "fully qualified name"),
            TokenKind::Whitespace => write!(f, "whitespace"),
            TokenKind::Comment => write!(f, "comment"),
            TokenKind::DocComment => write!(f, "doc comment"),
            TokenKind::Punctuation => write!(f, "punctuation"),
            TokenKind::OpenTag => write!(f, "open tag"),
            TokenKind::Keyword(kw) => write!(f, "keyword `{}`", kw),
            TokenKind::Other => write!(f, "token"),
        }
    }
}

/// A token together with its exact source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Token {
            kind,
            text: text.into(),
        }
    }

    /// Whitespace and plain comments are insignificant; doc comments are not.
    pub fn is_significant(&self) -> bool {
        !matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }

    /// Check for a specific punctuation token.
    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punctuation && self.text == punct
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Net change in brace depth caused by this token.
    pub fn brace_delta(&self) -> i64 {
        if self.kind != TokenKind::Punctuation {
            return 0;
        }
        let opens = self.text.matches('{').count() as i64;
        let closes = self.text.matches('}').count() as i64;
        opens - closes
    }

    /// Number of newline characters in the token text.
    pub fn newlines(&self) -> usize {
        self.text.matches('\n').count()
    }

    /// Human-readable description for error messages.
    pub fn describe(&self) -> String {
        format!("{} `{}`", self.kind, self.text.trim())
    }
}
