//! Lexer for PHP source files.
//!
//! Produces a flat, lossless token stream: concatenating the text of every
//! token reproduces the input exactly. The lexer only classifies tokens as
//! far as the splitter and rewriter need:
//! - names (plain, qualified, fully qualified)
//! - the handful of keywords that shape a file's layout
//! - punctuation, including the braces opened inside interpolated strings
//!
//! Everything else (variables, literals, operators, inline HTML) is
//! reported as [`TokenKind::Other`].

mod token;

pub use token::{Keyword, Token, TokenKind};

use miette::Diagnostic;
use thiserror::Error;

/// Lexical errors, each annotated with the 1-based line where the
/// offending construct starts.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum LexError {
    #[error("unterminated string literal starting on line {line}")]
    #[diagnostic(code(shadepack::lex::unterminated_string))]
    UnterminatedString { line: usize },

    #[error("unterminated comment starting on line {line}")]
    #[diagnostic(code(shadepack::lex::unterminated_comment))]
    UnterminatedComment { line: usize },

    #[error("unterminated heredoc `{label}` starting on line {line}")]
    #[diagnostic(code(shadepack::lex::unterminated_heredoc))]
    UnterminatedHeredoc { line: usize, label: String },

    #[error("invalid heredoc header on line {line}")]
    #[diagnostic(code(shadepack::lex::invalid_heredoc))]
    InvalidHeredoc { line: usize },

    #[error("unterminated string interpolation starting on line {line}")]
    #[diagnostic(code(shadepack::lex::unterminated_interpolation))]
    UnterminatedInterpolation { line: usize },
}

impl LexError {
    /// The line the error refers to.
    pub fn line(&self) -> usize {
        match self {
            LexError::UnterminatedString { line }
            | LexError::UnterminatedComment { line }
            | LexError::UnterminatedHeredoc { line, .. }
            | LexError::InvalidHeredoc { line }
            | LexError::UnterminatedInterpolation { line } => *line,
        }
    }
}

/// Multi-character operators, longest first so that matching is greedy.
const OPERATORS: &[&str] = &[
    "<=>", "===", "!==", "**=", "...", "<<=", ">>=", "??=", "?->", "->", "=>", "::", "==", "!=",
    "<>", "<=", ">=", "&&", "||", "??", "++", "--", "+=", "-=", "*=", "/=", ".=", "%=", "&=",
    "|=", "^=", "<<", ">>", "**",
];

/// Split source text into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    in_html: bool,
    tokens: Vec<Token>,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_byte(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            in_html: true,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while self.pos < self.bytes.len() {
            if self.in_html {
                self.lex_inline_html();
            } else {
                self.lex_code_token()?;
            }
        }
        Ok(self.tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.bytes[self.pos..].starts_with(s.as_bytes())
    }

    fn line_at(&self, pos: usize) -> usize {
        self.bytes[..pos].iter().filter(|&&b| b == b'\n').count() + 1
    }

    /// Push the text from `from` to the cursor, if any.
    fn push_from(&mut self, kind: TokenKind, from: usize) {
        if self.pos > from {
            self.tokens
                .push(Token::new(kind, &self.src[from..self.pos]));
        }
    }

    fn push_len(&mut self, kind: TokenKind, len: usize) {
        let from = self.pos;
        self.pos = (self.pos + len).min(self.bytes.len());
        self.push_from(kind, from);
    }

    fn previous_significant(&self) -> Option<&Token> {
        self.tokens.iter().rev().find(|t| t.is_significant())
    }

    fn lex_inline_html(&mut self) {
        let start = self.pos;
        let rest = &self.bytes[self.pos..];

        let mut i = 0;
        while i + 1 < rest.len() {
            if rest[i] == b'<' && rest[i + 1] == b'?' {
                if rest[i + 2..].starts_with(b"=") {
                    self.pos = start + i;
                    self.push_from(TokenKind::Other, start);
                    self.push_len(TokenKind::OpenTag, 3);
                    self.in_html = false;
                    return;
                }
                let word = rest.get(i + 2..i + 5);
                let after = rest.get(i + 5).copied();
                if word.is_some_and(|w| w.eq_ignore_ascii_case(b"php"))
                    && after.map_or(true, is_space)
                {
                    self.pos = start + i;
                    self.push_from(TokenKind::Other, start);
                    let mut len = 5;
                    if rest[i + 5..].starts_with(b"\r\n") {
                        len += 2;
                    } else if after.is_some() {
                        len += 1;
                    }
                    self.push_len(TokenKind::OpenTag, len);
                    self.in_html = false;
                    return;
                }
            }
            i += 1;
        }

        self.pos = self.bytes.len();
        self.push_from(TokenKind::Other, start);
    }

    fn lex_code_token(&mut self) -> Result<(), LexError> {
        let Some(b) = self.peek() else {
            return Ok(());
        };
        let next = self.peek_at(1);

        match b {
            _ if is_space(b) => {
                let start = self.pos;
                while self.peek().is_some_and(is_space) {
                    self.pos += 1;
                }
                self.push_from(TokenKind::Whitespace, start);
            }
            b'#' if next == Some(b'[') => self.push_len(TokenKind::Other, 2),
            b'#' => self.lex_line_comment(),
            b'/' if next == Some(b'/') => self.lex_line_comment(),
            b'/' if next == Some(b'*') => self.lex_block_comment()?,
            b'?' if next == Some(b'>') => {
                let mut len = 2;
                if self.bytes[self.pos + 2..].starts_with(b"\r\n") {
                    len += 2;
                } else if self.peek_at(2) == Some(b'\n') {
                    len += 1;
                }
                self.push_len(TokenKind::Other, len);
                self.in_html = true;
            }
            b'$' if next.is_some_and(is_ident_start) => {
                let start = self.pos;
                self.pos += 1;
                while self.peek().is_some_and(is_ident_byte) {
                    self.pos += 1;
                }
                self.push_from(TokenKind::Other, start);
            }
            b'\'' => self.lex_single_quoted()?,
            b'"' | b'`' => self.lex_quoted(b)?,
            b'<' if self.starts_with("<<<") => self.lex_heredoc()?,
            b'\\' if next.is_some_and(is_ident_start) => {
                let start = self.pos;
                self.consume_name_segments();
                self.push_from(TokenKind::FullyQualifiedName, start);
            }
            _ if is_ident_start(b) => self.lex_word(),
            _ if b.is_ascii_digit() => self.lex_number(),
            b'.' if next.is_some_and(|n| n.is_ascii_digit()) => self.lex_number(),
            _ => {
                if let Some(op) = OPERATORS.iter().find(|op| self.starts_with(op)) {
                    self.push_len(TokenKind::Other, op.len());
                } else {
                    // keep multi-byte characters whole
                    let len = self.src[self.pos..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                    self.push_len(TokenKind::Punctuation, len);
                }
            }
        }

        Ok(())
    }

    /// Consume `(\segment)+` starting at a separator.
    fn consume_name_segments(&mut self) {
        while self.peek() == Some(b'\\') && self.peek_at(1).is_some_and(is_ident_start) {
            self.pos += 1;
            while self.peek().is_some_and(is_ident_byte) {
                self.pos += 1;
            }
        }
    }

    fn lex_word(&mut self) {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_byte) {
            self.pos += 1;
        }
        let first_end = self.pos;
        self.consume_name_segments();

        if self.pos > first_end {
            // `namespace\Foo` is a relative name, not a qualified one
            let kind = if self.src[start..first_end].eq_ignore_ascii_case("namespace") {
                TokenKind::Other
            } else {
                TokenKind::QualifiedName
            };
            self.push_from(kind, start);
            return;
        }

        let word = &self.src[start..first_end];
        let kind = if self.is_member_name_position() {
            TokenKind::Identifier
        } else if word.eq_ignore_ascii_case("enum") {
            if self.enum_declaration_follows() {
                TokenKind::Keyword(Keyword::Enum)
            } else {
                TokenKind::Identifier
            }
        } else {
            Keyword::from_word(word).map_or(TokenKind::Identifier, TokenKind::Keyword)
        };
        self.push_from(kind, start);
    }

    /// Reserved words are plain identifiers after `->`, `?->`, `::` and
    /// `function`.
    fn is_member_name_position(&self) -> bool {
        match self.previous_significant() {
            Some(prev) => {
                matches!(prev.text.as_str(), "->" | "?->" | "::")
                    || prev.is_keyword(Keyword::Function)
            }
            None => false,
        }
    }

    /// `enum` declares a type only when a name follows it.
    fn enum_declaration_follows(&self) -> bool {
        let mut p = self.pos;
        if !self.bytes.get(p).copied().is_some_and(is_space) {
            return false;
        }
        while self.bytes.get(p).copied().is_some_and(is_space) {
            p += 1;
        }
        if !self.bytes.get(p).copied().is_some_and(is_ident_start) {
            return false;
        }
        let name_start = p;
        while self.bytes.get(p).copied().is_some_and(is_ident_byte) {
            p += 1;
        }
        let name = &self.src[name_start..p];
        !name.eq_ignore_ascii_case("extends") && !name.eq_ignore_ascii_case("implements")
    }

    fn lex_number(&mut self) {
        let start = self.pos;
        let digits = |lexer: &mut Self| {
            while lexer
                .peek()
                .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
            {
                lexer.pos += 1;
            }
        };

        digits(self);
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
            digits(self);
        }
        let last = self.bytes[self.pos - 1];
        if matches!(last, b'e' | b'E')
            && matches!(self.peek(), Some(b'+' | b'-'))
            && self.peek_at(1).is_some_and(|b| b.is_ascii_digit())
        {
            self.pos += 1;
            digits(self);
        }
        self.push_from(TokenKind::Other, start);
    }

    fn lex_line_comment(&mut self) {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'\n' || self.starts_with("?>") {
                break;
            }
            self.pos += 1;
        }
        self.push_from(TokenKind::Comment, start);
    }

    fn lex_block_comment(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        match self.src[self.pos + 2..].find("*/") {
            Some(end) => {
                self.pos += 2 + end + 2;
                let doc = self.src[start..self.pos].starts_with("/**")
                    && self.bytes.get(start + 3).copied().is_some_and(is_space);
                let kind = if doc {
                    TokenKind::DocComment
                } else {
                    TokenKind::Comment
                };
                self.push_from(kind, start);
                Ok(())
            }
            None => Err(LexError::UnterminatedComment {
                line: self.line_at(start),
            }),
        }
    }

    fn lex_single_quoted(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek() {
                None => {
                    return Err(LexError::UnterminatedString {
                        line: self.line_at(start),
                    })
                }
                Some(b'\\') => self.pos = (self.pos + 2).min(self.bytes.len()),
                Some(b'\'') => {
                    self.pos += 1;
                    self.push_from(TokenKind::Other, start);
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Double-quoted and backtick strings. Literal runs become
    /// [`TokenKind::Other`]; `{$` and `${` blocks are lexed as code.
    fn lex_quoted(&mut self, quote: u8) -> Result<(), LexError> {
        let start = self.pos;
        let mut segment = self.pos;
        self.pos += 1;
        loop {
            match self.peek() {
                None => {
                    return Err(LexError::UnterminatedString {
                        line: self.line_at(start),
                    })
                }
                Some(b) if b == quote => {
                    self.pos += 1;
                    self.push_from(TokenKind::Other, segment);
                    return Ok(());
                }
                Some(b'\\') => self.skip_escape(),
                Some(b'{') | Some(b'$') if self.at_interpolation() => {
                    self.lex_interpolation(segment)?;
                    segment = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn lex_heredoc(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        let invalid = |lexer: &Self| LexError::InvalidHeredoc {
            line: lexer.line_at(start),
        };

        let mut p = self.pos + 3;
        while matches!(self.bytes.get(p), Some(b' ' | b'\t')) {
            p += 1;
        }
        let quote = match self.bytes.get(p).copied() {
            Some(q @ (b'\'' | b'"')) => {
                p += 1;
                Some(q)
            }
            _ => None,
        };
        if !self.bytes.get(p).copied().is_some_and(is_ident_start) {
            return Err(invalid(self));
        }
        let label_start = p;
        while self.bytes.get(p).copied().is_some_and(is_ident_byte) {
            p += 1;
        }
        let label = &self.src[label_start..p];
        if let Some(q) = quote {
            if self.bytes.get(p) != Some(&q) {
                return Err(invalid(self));
            }
            p += 1;
        }
        if self.bytes[p..].starts_with(b"\r\n") {
            p += 2;
        } else if self.bytes.get(p) == Some(&b'\n') {
            p += 1;
        } else {
            return Err(invalid(self));
        }

        self.pos = p;
        let interpolate = quote != Some(b'\'');
        let mut segment = start;
        let mut line_start = true;
        loop {
            if line_start {
                if let Some(end) = self.closing_label_end(label) {
                    self.pos = end;
                    self.push_from(TokenKind::Other, segment);
                    return Ok(());
                }
            }
            line_start = false;

            match self.peek() {
                None => {
                    return Err(LexError::UnterminatedHeredoc {
                        line: self.line_at(start),
                        label: label.to_string(),
                    })
                }
                Some(b'\n') => {
                    self.pos += 1;
                    line_start = true;
                }
                Some(b'\\') if interpolate => {
                    self.pos += 1;
                    if !matches!(self.peek(), Some(b'{' | b'\n')) {
                        self.pos = (self.pos + 1).min(self.bytes.len());
                    }
                }
                Some(b'{') | Some(b'$') if interpolate && self.at_interpolation() => {
                    self.lex_interpolation(segment)?;
                    segment = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// If the cursor sits on a heredoc closing line, return the end of the label.
    fn closing_label_end(&self, label: &str) -> Option<usize> {
        let mut p = self.pos;
        while matches!(self.bytes.get(p), Some(b' ' | b'\t')) {
            p += 1;
        }
        if !self.bytes[p..].starts_with(label.as_bytes()) {
            return None;
        }
        let end = p + label.len();
        if self.bytes.get(end).copied().is_some_and(is_ident_byte) {
            return None;
        }
        Some(end)
    }

    /// A backslash escapes the next byte, except that `{` cannot be escaped.
    fn skip_escape(&mut self) {
        self.pos += 1;
        if self.peek().is_some_and(|b| b != b'{') {
            self.pos += 1;
        }
    }

    fn at_interpolation(&self) -> bool {
        matches!(
            (self.peek(), self.peek_at(1)),
            (Some(b'{'), Some(b'$')) | (Some(b'$'), Some(b'{'))
        )
    }

    /// Flush the literal run, then lex `{$ ... }` or `${ ... }` as code.
    fn lex_interpolation(&mut self, segment: usize) -> Result<(), LexError> {
        self.push_from(TokenKind::Other, segment);
        let open = self.pos;
        let opener_len = if self.peek() == Some(b'{') { 1 } else { 2 };
        self.push_len(TokenKind::Punctuation, opener_len);

        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => {
                    return Err(LexError::UnterminatedInterpolation {
                        line: self.line_at(open),
                    })
                }
                Some(b'}') if depth == 0 => {
                    self.push_len(TokenKind::Punctuation, 1);
                    return Ok(());
                }
                Some(_) => {
                    let before = self.tokens.len();
                    self.lex_code_token()?;
                    for token in &self.tokens[before..] {
                        if token.is_punct("{") {
                            depth += 1;
                        } else if token.is_punct("}") {
                            depth = depth.saturating_sub(1);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .filter(|t| t.is_significant())
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn concat(tokens: &[Token]) -> String {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_lossless() {
        let src = "<?php\n\n/** doc */\nnamespace Foo\\Bar;\n\n$x = \"a {$b->c} d ${e}\";\n$y = <<<EOT\n  {$z}\n  EOT;\n?>\n<html>";
        let tokens = tokenize(src).unwrap();
        assert_eq!(concat(&tokens), src);
    }

    #[test]
    fn test_open_tag_includes_newline() {
        let tokens = tokenize("<?php\necho 1;").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::OpenTag);
        assert_eq!(tokens[0].text, "<?php\n");
    }

    #[test]
    fn test_names() {
        let toks = kinds("<?php Foo \\Foo\\Bar Foo\\Bar namespace\\Baz");
        assert_eq!(toks[1], (TokenKind::Identifier, "Foo".to_string()));
        assert_eq!(
            toks[2],
            (TokenKind::FullyQualifiedName, "\\Foo\\Bar".to_string())
        );
        assert_eq!(toks[3], (TokenKind::QualifiedName, "Foo\\Bar".to_string()));
        assert_eq!(toks[4].0, TokenKind::Other);
    }

    #[test]
    fn test_keyword_after_arrow_is_identifier() {
        let toks = kinds("<?php $a->class; Foo::class; function list() {}");
        assert!(toks
            .iter()
            .all(|(kind, _)| *kind != TokenKind::Keyword(Keyword::Class)));
        assert!(toks.contains(&(TokenKind::Identifier, "list".to_string())));
    }

    #[test]
    fn test_enum_context() {
        let toks = kinds("<?php enum Suit {} enum(1);");
        assert_eq!(toks[1].0, TokenKind::Keyword(Keyword::Enum));
        assert!(toks.contains(&(TokenKind::Identifier, "enum".to_string())));
    }

    #[test]
    fn test_interpolation_braces_are_punctuation() {
        let tokens = tokenize("<?php \"x {$a[\"}\"]} ${b} {not}\";").unwrap();
        let depth: i64 = tokens.iter().map(Token::brace_delta).sum();
        assert_eq!(depth, 0);
        let opens = tokens.iter().filter(|t| t.brace_delta() > 0).count();
        assert_eq!(opens, 2);
    }

    #[test]
    fn test_braces_in_plain_strings_are_not_counted() {
        let tokens = tokenize("<?php '{' . \"}\" . \"\\{\";").unwrap();
        let opens: i64 = tokens.iter().map(Token::brace_delta).sum();
        assert_eq!(opens, 0);
    }

    #[test]
    fn test_nowdoc_is_not_interpolated() {
        let tokens = tokenize("<?php $a = <<<'EOT'\n{$x}\nEOT;\n").unwrap();
        assert!(tokens.iter().all(|t| t.brace_delta() == 0));
    }

    #[test]
    fn test_comments() {
        let toks = tokenize("<?php // one\n# two\n/* three */ /** four */ #[Attr]").unwrap();
        let comments: Vec<_> = toks
            .iter()
            .filter(|t| t.kind == TokenKind::Comment)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(comments, vec!["// one", "# two", "/* three */"]);
        assert!(toks
            .iter()
            .any(|t| t.kind == TokenKind::DocComment && t.text == "/** four */"));
    }

    #[test]
    fn test_unterminated_string_reports_line() {
        let err = tokenize("<?php\n\n$a = 'abc;\n").unwrap_err();
        assert_eq!(err, LexError::UnterminatedString { line: 3 });
    }

    #[test]
    fn test_unterminated_comment() {
        let err = tokenize("<?php\n/* never closed").unwrap_err();
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_unterminated_heredoc() {
        let err = tokenize("<?php\n$a = <<<EOT\nbody\n").unwrap_err();
        assert!(matches!(err, LexError::UnterminatedHeredoc { line: 2, .. }));
    }

    #[test]
    fn test_inline_html_before_open_tag() {
        let tokens = tokenize("#!/usr/bin/env php\n<?php\n").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Other);
        assert_eq!(tokens[1].kind, TokenKind::OpenTag);
    }
}
