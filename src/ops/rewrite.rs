//! Namespace shading over parsed source files.
//!
//! Rewriting works on the token stream: only name tokens under a shaded
//! root change, everything else is emitted verbatim.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::shading::{namespace_matches, ShadingRule, SEPARATOR};
use crate::core::SourceFile;
use crate::lexer::{tokenize, LexError, Token, TokenKind};
use crate::util::fs::{is_inside, normalize_path};

const OPEN_TAG: &str = "<?php\n";

/// A transformation applied to the whole set of parsed files.
///
/// A processor may drop files from the set.
pub trait Processor {
    fn process(&self, files: Vec<SourceFile>) -> Result<Vec<SourceFile>>;
}

/// Applies one [`ShadingRule`] to every file.
#[derive(Debug)]
pub struct ShadingProcessor {
    rule: ShadingRule,
    /// Canonical form of the rule's own source roots
    own_roots: Option<Vec<PathBuf>>,
}

impl ShadingProcessor {
    pub fn new(rule: ShadingRule) -> Self {
        let own_roots = rule
            .own_source_roots
            .as_ref()
            .map(|roots| roots.iter().map(|root| normalize_path(root)).collect());
        ShadingProcessor { rule, own_roots }
    }

    /// Whether a file lies under one of the rule's own source roots.
    fn owns(&self, path: &Path) -> bool {
        let Some(roots) = &self.own_roots else {
            return false;
        };
        let path = normalize_path(path);
        roots.iter().any(|root| is_inside(&path, root))
    }
}

impl Processor for ShadingProcessor {
    fn process(&self, files: Vec<SourceFile>) -> Result<Vec<SourceFile>> {
        let mut kept = Vec::with_capacity(files.len());

        for mut file in files {
            let shaded = self.rule.shades(&file.namespace);
            if !shaded && !self.rule.shares(&file.namespace) && self.owns(&file.original_path) {
                tracing::warn!(
                    "{} is in the source roots of {} but declares namespace {}, dropping it",
                    file.original_path.display(),
                    self.rule.shaded_namespace,
                    file.namespace
                );
                continue;
            }

            if shaded {
                file.namespace = self.rule.relocate(&file.namespace);
            }

            let path = file.original_path.clone();
            let retokenize_failed = || format!("failed to re-tokenize {}", path.display());
            file.header = shade_code(&file.header, &self.rule).with_context(retokenize_failed)?;
            for item in &mut file.items {
                item.code = shade_code(&item.code, &self.rule).with_context(retokenize_failed)?;
            }

            kept.push(file);
        }

        Ok(kept)
    }
}

/// Apply every rule in order, each as a pass over all files.
pub fn rewrite(files: Vec<SourceFile>, rules: &[ShadingRule]) -> Result<Vec<SourceFile>> {
    rules
        .iter()
        .cloned()
        .map(ShadingProcessor::new)
        .try_fold(files, |files, processor| {
            tracing::debug!(
                "shading {} under {}",
                processor.rule.shaded_namespace,
                processor.rule.target_prefix
            );
            processor.process(files)
        })
}

/// Rewrite the names in a code fragment that fall under the rule's root.
///
/// Fragments without an opening tag are lexed with one synthesized in
/// front; it is removed again from the result.
pub fn shade_code(code: &str, rule: &ShadingRule) -> Result<String, LexError> {
    let synthesized = !starts_with_open_tag(code);
    let tokens = if synthesized {
        tokenize(&format!("{}{}", OPEN_TAG, code))?
    } else {
        tokenize(code)?
    };

    let skip = usize::from(
        synthesized && tokens.first().is_some_and(|t| t.kind == TokenKind::OpenTag),
    );

    let mut out = String::with_capacity(code.len() + 32);
    for token in &tokens[skip..] {
        match shade_token(token, rule) {
            Some(renamed) => out.push_str(&renamed),
            None => out.push_str(&token.text),
        }
    }
    Ok(out)
}

fn starts_with_open_tag(code: &str) -> bool {
    code.get(..5)
        .is_some_and(|tag| tag.eq_ignore_ascii_case("<?php"))
}

fn shade_token(token: &Token, rule: &ShadingRule) -> Option<String> {
    match token.kind {
        TokenKind::QualifiedName if namespace_matches(&token.text, &rule.shaded_namespace) => {
            Some(rule.relocate(&token.text))
        }
        TokenKind::FullyQualifiedName => {
            let name = token.text.strip_prefix(SEPARATOR)?;
            namespace_matches(name, &rule.shaded_namespace)
                .then(|| format!("{}{}", SEPARATOR, rule.relocate(name)))
        }
        _ => None,
    }
}
