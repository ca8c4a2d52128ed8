//! Shading rules: which namespace gets relocated, and where to.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use miette::Diagnostic;
use regex::Regex;
use thiserror::Error;

/// The namespace separator.
pub const SEPARATOR: char = '\\';

/// A shaded namespace root needs at least two segments.
static NAMESPACE_ROOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_]+(\\[a-zA-Z0-9_]+)+$").expect("namespace root pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ShadingError {
    #[error("\"{0}\" is not a valid namespace root")]
    #[diagnostic(
        code(shadepack::shading::invalid_namespace),
        help("a namespace root needs at least two segments, e.g. `Vendor\\Library`")
    )]
    InvalidNamespace(String),

    #[error("target prefix \"{0}\" must not be empty or start or end with a backslash")]
    #[diagnostic(code(shadepack::shading::invalid_prefix))]
    InvalidPrefix(String),
}

/// Whether `name` is `root` itself or lies under it.
///
/// This is a segment-wise match: `Foo\Barx` is not under `Foo\Bar`.
pub fn namespace_matches(name: &str, root: &str) -> bool {
    match name.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
        None => false,
    }
}

/// The private namespace every shaded root is moved under.
///
/// One prefix is generated per build and shared by all rules, so that
/// libraries shaded in the same run still see each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPrefix(String);

impl TargetPrefix {
    pub fn new(prefix: impl Into<String>) -> Result<Self, ShadingError> {
        let prefix = prefix.into();
        if prefix.is_empty() || prefix.starts_with(SEPARATOR) || prefix.ends_with(SEPARATOR) {
            return Err(ShadingError::InvalidPrefix(prefix));
        }
        Ok(TargetPrefix(prefix))
    }

    /// Generate `libs\_<random hex>`, placed under `parent` when given.
    ///
    /// `parent` is a namespace such as `My\Plugin\`; the trailing separator
    /// is optional.
    pub fn generate(parent: Option<&str>) -> Self {
        let suffix = hex::encode(rand::random::<[u8; 8]>());
        let leaf = format!("libs{}_{}", SEPARATOR, suffix);
        match parent.map(|p| p.trim_matches(SEPARATOR)).filter(|p| !p.is_empty()) {
            Some(parent) => TargetPrefix(format!("{}{}{}", parent, SEPARATOR, leaf)),
            None => TargetPrefix(leaf),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Relocate one namespace root under a build's [`TargetPrefix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadingRule {
    /// Namespace root to relocate
    pub shaded_namespace: String,
    pub target_prefix: TargetPrefix,
    /// Sibling namespace the library deliberately leaves unshaded
    pub shared_namespace: Option<String>,
    /// Source roots of the library, used to reject files that sit in the
    /// library but outside both of its namespaces
    pub own_source_roots: Option<Vec<PathBuf>>,
}

impl ShadingRule {
    pub fn new(
        shaded_namespace: impl Into<String>,
        target_prefix: TargetPrefix,
    ) -> Result<Self, ShadingError> {
        let shaded_namespace = shaded_namespace.into();
        if !NAMESPACE_ROOT.is_match(&shaded_namespace) {
            return Err(ShadingError::InvalidNamespace(shaded_namespace));
        }
        Ok(ShadingRule {
            shaded_namespace,
            target_prefix,
            shared_namespace: None,
            own_source_roots: None,
        })
    }

    pub fn with_shared_namespace(mut self, shared: Option<String>) -> Self {
        self.shared_namespace = shared;
        self
    }

    pub fn with_source_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.own_source_roots = Some(roots);
        self
    }

    /// Whether a namespace falls under the shaded root.
    pub fn shades(&self, namespace: &str) -> bool {
        namespace_matches(namespace, &self.shaded_namespace)
    }

    /// Whether a namespace falls under the shared root.
    pub fn shares(&self, namespace: &str) -> bool {
        self.shared_namespace
            .as_deref()
            .is_some_and(|shared| namespace_matches(namespace, shared))
    }

    /// Prefix a name (without leading separator) with the target prefix.
    pub fn relocate(&self, name: &str) -> String {
        format!("{}{}{}", self.target_prefix, SEPARATOR, name)
    }
}
