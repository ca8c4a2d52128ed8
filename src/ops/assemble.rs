//! Writes each declaration to its own file under a namespace directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::{DeclarationItem, SourceFile};
use crate::util::fs::{ensure_dir, write_string};

/// Render one item: header, blank-line padding, then the code.
///
/// The padding puts the first line of code back on its original line
/// number, so line numbers in stack traces stay meaningful.
pub fn render_item(file: &SourceFile, item: &DeclarationItem) -> String {
    let header_lines = file.header_lines();
    let mut content = String::with_capacity(file.header.len() + item.code.len() + 16);
    content.push_str(&file.header);

    match item.starting_line.checked_sub(header_lines) {
        Some(padding) => content.push_str(&"\n".repeat(padding)),
        None => tracing::warn!(
            "{}: {} starts on line {} but the header already spans {} lines",
            file.original_path.display(),
            item.name,
            item.starting_line,
            header_lines
        ),
    }

    content.push_str(&item.code);
    content
}

/// Write every item of every file below `src_root`.
///
/// Returns the number of files written.
pub fn assemble(files: &[SourceFile], src_root: &Path) -> Result<usize> {
    let mut written: HashSet<PathBuf> = HashSet::new();

    for file in files {
        let dir = src_root.join(file.namespace_dir());
        ensure_dir(&dir)?;

        for item in &file.items {
            let path = dir.join(format!("{}.php", item.name));
            if !written.insert(path.clone()) {
                tracing::warn!(
                    "{}\\{} is declared more than once, {} overwrites it",
                    file.namespace,
                    item.name,
                    file.original_path.display()
                );
            }
            write_string(&path, &render_item(file, item))?;
        }
    }

    Ok(written.len())
}
