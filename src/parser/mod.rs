//! Splits a PHP file into a header and its top-level declarations.
//!
//! Splitting works directly on the token stream:
//! 1. find the single `namespace X;` statement
//! 2. extend the header over the contiguous `use` statements after it
//! 3. repeatedly cut out `class`/`interface`/`trait`/`enum` declarations by
//!    tracking brace depth
//!
//! The header is kept verbatim so that every declaration can be written to
//! its own file with the same imports.

use std::path::{Path, PathBuf};

use anyhow::Result;
use miette::Diagnostic;
use thiserror::Error;

use crate::core::source_file::{DeclarationItem, SourceFile};
use crate::lexer::{tokenize, Keyword, LexError, Token, TokenKind};
use crate::util::fs::read_to_string;

/// Structural errors found while splitting a file.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("syntax error in {}:{}: {source}", path.display(), source.line())]
    #[diagnostic(code(shadepack::parse::lex))]
    Lex {
        path: PathBuf,
        #[source]
        source: LexError,
    },

    #[error("could not detect a namespace statement in {}", path.display())]
    #[diagnostic(
        code(shadepack::parse::no_namespace),
        help("every packaged file must declare exactly one `namespace X;`")
    )]
    NoNamespace { path: PathBuf },

    #[error("multiple namespace statements in {}, only one is allowed", path.display())]
    #[diagnostic(code(shadepack::parse::multiple_namespace))]
    MultipleNamespace { path: PathBuf },

    #[error("braced namespace blocks are not supported in {}", path.display())]
    #[diagnostic(
        code(shadepack::parse::braced_namespace),
        help("use `namespace X;` instead of `namespace X {{ ... }}`")
    )]
    BracedNamespace { path: PathBuf },

    #[error("expected a name after `namespace` in {}, got {found}", path.display())]
    #[diagnostic(code(shadepack::parse::expected_namespace_name))]
    ExpectedNamespaceName { path: PathBuf, found: String },

    #[error("expected `;` after the namespace statement in {}, got {found}", path.display())]
    #[diagnostic(code(shadepack::parse::expected_semicolon))]
    ExpectedSemicolon { path: PathBuf, found: String },

    #[error("expected an identifier after `{keyword}` in {}, got {found}", path.display())]
    #[diagnostic(code(shadepack::parse::expected_identifier))]
    ExpectedIdentifier {
        path: PathBuf,
        keyword: Keyword,
        found: String,
    },

    #[error("cannot find the opening brace of `{name}` in {}", path.display())]
    #[diagnostic(code(shadepack::parse::no_opening_brace))]
    NoOpeningBrace { path: PathBuf, name: String },

    #[error("unexpected end of file with unclosed brace in `{name}` in {}", path.display())]
    #[diagnostic(code(shadepack::parse::unclosed_brace))]
    UnclosedBrace { path: PathBuf, name: String },

    #[error("trailing content after the last declaration in {}: {found}", path.display())]
    #[diagnostic(
        code(shadepack::parse::trailing_content),
        help("only class, interface, trait and enum declarations may follow the imports")
    )]
    TrailingContent { path: PathBuf, found: String },
}

/// Read and split a file.
pub fn parse_file(path: &Path) -> Result<SourceFile> {
    tracing::debug!("Parsing {}", path.display());
    let source = read_to_string(path)?;
    let file = split(path, &source)?;
    for item in &file.items {
        tracing::debug!("Parsed item {} on line {}", item.name, item.starting_line);
    }
    Ok(file)
}

/// Split source text into a [`SourceFile`].
pub fn split(path: &Path, source: &str) -> Result<SourceFile, ParseError> {
    let tokens = tokenize(source).map_err(|source| ParseError::Lex {
        path: path.to_path_buf(),
        source,
    })?;
    Splitter { path, tokens: &tokens }.split()
}

struct Splitter<'a> {
    path: &'a Path,
    tokens: &'a [Token],
}

impl Splitter<'_> {
    fn split(&self) -> Result<SourceFile, ParseError> {
        let (namespace_offset, namespace) = self.find_namespace()?;
        let header_end = self.find_header_end(namespace_offset)?;
        let header = concat(&self.tokens[..header_end]);

        let mut line = header.matches('\n').count();
        let mut offset = header_end;
        let mut items = Vec::new();

        while offset < self.tokens.len() {
            match self.next_item(offset, line)? {
                Some((item, end)) => {
                    line = item.starting_line + item.code.matches('\n').count();
                    offset = end;
                    items.push(item);
                }
                None => {
                    if let Some(i) = next_significant(self.tokens, offset) {
                        return Err(ParseError::TrailingContent {
                            path: self.path.to_path_buf(),
                            found: self.tokens[i].describe(),
                        });
                    }
                    break;
                }
            }
        }

        Ok(SourceFile {
            original_path: self.path.to_path_buf(),
            header,
            namespace,
            items,
        })
    }

    /// Locate the only namespace statement, returning its token offset and name.
    fn find_namespace(&self) -> Result<(usize, String), ParseError> {
        let mut found: Option<(usize, String)> = None;

        for (i, token) in self.tokens.iter().enumerate() {
            if !token.is_keyword(Keyword::Namespace) {
                continue;
            }
            if found.is_some() {
                return Err(ParseError::MultipleNamespace {
                    path: self.path.to_path_buf(),
                });
            }

            let name_index = next_significant(self.tokens, i + 1);
            let name = match name_index.map(|j| &self.tokens[j]) {
                Some(t) if matches!(t.kind, TokenKind::QualifiedName | TokenKind::Identifier) => t,
                Some(t) if t.is_punct("{") => {
                    return Err(ParseError::BracedNamespace {
                        path: self.path.to_path_buf(),
                    })
                }
                other => {
                    return Err(ParseError::ExpectedNamespaceName {
                        path: self.path.to_path_buf(),
                        found: describe_or_eof(other),
                    })
                }
            };

            let semi_index = name_index.and_then(|j| next_significant(self.tokens, j + 1));
            match semi_index.map(|j| &self.tokens[j]) {
                Some(t) if t.is_punct(";") => {}
                Some(t) if t.is_punct("{") => {
                    return Err(ParseError::BracedNamespace {
                        path: self.path.to_path_buf(),
                    })
                }
                other => {
                    return Err(ParseError::ExpectedSemicolon {
                        path: self.path.to_path_buf(),
                        found: describe_or_eof(other),
                    })
                }
            }

            found = Some((i, name.text.clone()));
        }

        found.ok_or_else(|| ParseError::NoNamespace {
            path: self.path.to_path_buf(),
        })
    }

    /// Token offset just past the last contiguous `use` statement.
    fn find_header_end(&self, namespace_offset: usize) -> Result<usize, ParseError> {
        let semi = seek_punct(self.tokens, namespace_offset, ";").ok_or_else(|| {
            ParseError::ExpectedSemicolon {
                path: self.path.to_path_buf(),
                found: "end of file".to_string(),
            }
        })?;
        let mut header_end = semi + 1;

        loop {
            let Some(use_index) = next_significant(self.tokens, header_end) else {
                break;
            };
            if !self.tokens[use_index].is_keyword(Keyword::Use) {
                break;
            }

            let mut name_index = next_significant(self.tokens, use_index + 1);
            // `use function` / `use const`
            if let Some(j) = name_index {
                let t = &self.tokens[j];
                if t.is_keyword(Keyword::Function) || t.is_keyword(Keyword::Const) {
                    name_index = next_significant(self.tokens, j + 1);
                }
            }

            let is_name = name_index.is_some_and(|j| {
                matches!(
                    self.tokens[j].kind,
                    TokenKind::QualifiedName
                        | TokenKind::FullyQualifiedName
                        | TokenKind::Identifier
                )
            });
            if !is_name {
                break;
            }

            // group imports may contain braces before the terminating `;`
            match name_index.and_then(|j| seek_punct(self.tokens, j, ";")) {
                Some(end) => header_end = end + 1,
                None => break,
            }
        }

        Ok(header_end)
    }

    /// Find the next declaration at or after `offset`.
    ///
    /// The item's code starts at the first significant token after `offset`,
    /// so modifiers, attributes and doc comments stay with their declaration.
    fn next_item(
        &self,
        offset: usize,
        line: usize,
    ) -> Result<Option<(DeclarationItem, usize)>, ParseError> {
        let Some(start) = next_significant(self.tokens, offset) else {
            return Ok(None);
        };

        let Some((keyword_index, keyword)) =
            (start..self.tokens.len()).find_map(|i| match self.tokens[i].kind {
                TokenKind::Keyword(kw) if kw.is_declaration() => Some((i, kw)),
                _ => None,
            })
        else {
            return Ok(None);
        };

        let name_index = next_significant(self.tokens, keyword_index + 1);
        let name = match name_index.map(|j| &self.tokens[j]) {
            Some(t) if t.kind == TokenKind::Identifier => t.text.trim().to_string(),
            other => {
                return Err(ParseError::ExpectedIdentifier {
                    path: self.path.to_path_buf(),
                    keyword,
                    found: describe_or_eof(other),
                })
            }
        };

        let open = seek_punct(self.tokens, keyword_index, "{").ok_or_else(|| {
            ParseError::NoOpeningBrace {
                path: self.path.to_path_buf(),
                name: name.clone(),
            }
        })?;

        let mut depth = 1i64;
        let mut end = None;
        for (i, token) in self.tokens.iter().enumerate().skip(open + 1) {
            depth += token.brace_delta();
            if depth == 0 {
                end = Some(i + 1);
                break;
            }
        }
        let end = end.ok_or_else(|| ParseError::UnclosedBrace {
            path: self.path.to_path_buf(),
            name: name.clone(),
        })?;

        let leading_lines: usize = self.tokens[offset..start].iter().map(Token::newlines).sum();
        let item = DeclarationItem {
            starting_line: line + leading_lines,
            name,
            code: concat(&self.tokens[start..end]),
        };
        Ok(Some((item, end)))
    }
}

fn concat(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// Index of the first significant token at or after `from`.
fn next_significant(tokens: &[Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| tokens[i].is_significant())
}

/// Index of the first `punct` punctuation at or after `from`.
fn seek_punct(tokens: &[Token], from: usize, punct: &str) -> Option<usize> {
    (from..tokens.len()).find(|&i| tokens[i].is_punct(punct))
}

fn describe_or_eof(token: Option<&Token>) -> String {
    token.map_or_else(|| "end of file".to_string(), Token::describe)
}
