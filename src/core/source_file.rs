//! Parsed source files and their top-level declarations.

use std::path::PathBuf;

/// One top-level class, interface, trait or enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationItem {
    /// 0-based line of the first character of `code`
    pub starting_line: usize,
    /// Short name, without namespace
    pub name: String,
    /// Verbatim, brace-balanced source of the declaration
    pub code: String,
}

/// A source file split into a shared header and its declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path the file was read from
    pub original_path: PathBuf,
    /// Open tag, namespace statement and the contiguous imports after it
    pub header: String,
    /// The declared namespace, without leading separator
    pub namespace: String,
    pub items: Vec<DeclarationItem>,
}

impl SourceFile {
    /// Number of newlines in the header.
    pub fn header_lines(&self) -> usize {
        self.header.matches('\n').count()
    }

    /// Output directory for this file relative to the source root.
    pub fn namespace_dir(&self) -> PathBuf {
        self.namespace.split('\\').filter(|s| !s.is_empty()).collect()
    }
}
