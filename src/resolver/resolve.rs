//! Dependency walk over installed composer packages.
//!
//! Starting at the project manifest, every `require` entry is looked up
//! under `vendor/<vendor>/<package>`. Packages that declare a shading
//! block contribute their source roots and one shading rule; packages
//! that do not are reported and left out, along with everything below
//! them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::core::manifest::{Manifest, ShadingDeclaration};
use crate::core::shading::{ShadingRule, TargetPrefix};
use crate::resolver::errors::ManifestError;
use crate::resolver::version::{check_spec, SpecSupport};

/// Directory composer installs dependencies into.
pub const VENDOR_DIR: &str = "vendor";

/// Runtime and extension requirements that are never installed packages.
static PLATFORM_PACKAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(php|(ext|php|lib|composer)-[^/]+)$").expect("platform pattern is valid")
});

/// Source roots and shading rules collected from a project.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Every source root, project first, dependencies in walk order
    pub source_roots: Vec<PathBuf>,
    /// One rule per shadeable package, dependencies before their dependents
    pub rules: Vec<ShadingRule>,
}

/// Whether a requirement names the runtime or an extension.
pub fn is_platform_package(name: &str) -> bool {
    PLATFORM_PACKAGE.is_match(name)
}

/// A package whose dependencies are still being walked.
struct Frame {
    label: String,
    manifest_path: PathBuf,
    require: Vec<String>,
    next: usize,
    shading: Option<ShadingDeclaration>,
    package_roots: Vec<PathBuf>,
}

impl Frame {
    fn next_dependency(&mut self) -> Option<String> {
        let dep = self.require.get(self.next).cloned();
        self.next += 1;
        dep
    }
}

/// Walk the project at `project_dir` and collect what it needs shaded.
pub fn resolve(project_dir: &Path, prefix: &TargetPrefix) -> Result<Resolution, ManifestError> {
    Walker::new(project_dir, prefix).run(project_dir)
}

struct Walker<'a> {
    vendor_dir: PathBuf,
    prefix: &'a TargetPrefix,
    visited: HashSet<String>,
    resolution: Resolution,
}

impl<'a> Walker<'a> {
    fn new(project_dir: &Path, prefix: &'a TargetPrefix) -> Self {
        Walker {
            vendor_dir: project_dir.join(VENDOR_DIR),
            prefix,
            visited: HashSet::new(),
            resolution: Resolution::default(),
        }
    }

    fn run(mut self, project_dir: &Path) -> Result<Resolution, ManifestError> {
        let root = Manifest::load(project_dir)?;
        let label = root.name.clone().unwrap_or_else(|| "project".to_string());
        let mut stack = vec![self.enter(root, label)];

        while let Some(frame) = stack.last_mut() {
            let Some(dep) = frame.next_dependency() else {
                if let Some(done) = stack.pop() {
                    self.finish(done)?;
                }
                continue;
            };

            if is_platform_package(&dep) {
                continue;
            }
            if dep.matches('/').count() != 1 {
                return Err(ManifestError::InvalidDependencyName {
                    name: dep,
                    referenced_from: frame.manifest_path.clone(),
                });
            }
            if !self.visited.insert(dep.clone()) {
                tracing::debug!("{} already visited", dep);
                continue;
            }

            let manifest = Manifest::load(&self.vendor_dir.join(&dep))?;
            if manifest.shading.is_none() {
                tracing::warn!(
                    "dependency {} is not shadeable (no shading block in {}), skipping it; \
                     it should declare `extra.shading` with a spec version and namespace root",
                    dep,
                    manifest.path.display()
                );
                continue;
            }
            let child = self.enter(manifest, dep);
            stack.push(child);
        }

        Ok(self.resolution)
    }

    fn enter(&mut self, manifest: Manifest, label: String) -> Frame {
        tracing::debug!("including source roots of {}", label);
        let package_roots = manifest.source_roots();
        for root in &package_roots {
            if !self.resolution.source_roots.contains(root) {
                self.resolution.source_roots.push(root.clone());
            }
        }

        Frame {
            label,
            manifest_path: manifest.path,
            require: manifest.require,
            next: 0,
            shading: manifest.shading,
            package_roots,
        }
    }

    fn finish(&mut self, frame: Frame) -> Result<(), ManifestError> {
        let Some(shading) = frame.shading else {
            return Ok(());
        };
        let path = frame.manifest_path;

        let spec = shading
            .spec
            .ok_or_else(|| ManifestError::MissingSpec { path: path.clone() })?;
        match check_spec(&spec) {
            None => {
                return Err(ManifestError::InvalidSpecVersion {
                    path,
                    version: spec,
                })
            }
            Some(SpecSupport::TooNew(_)) => {
                return Err(ManifestError::SpecTooNew {
                    path,
                    version: spec,
                })
            }
            Some(SpecSupport::TooOld(_)) => {
                return Err(ManifestError::SpecTooOld {
                    path,
                    version: spec,
                })
            }
            Some(SpecSupport::Supported(_)) => {}
        }

        let namespace_root = shading
            .namespace_root
            .ok_or_else(|| ManifestError::MissingNamespaceRoot { path: path.clone() })?;
        let rule = ShadingRule::new(namespace_root, self.prefix.clone())
            .map_err(|source| ManifestError::InvalidNamespace { path, source })?
            .with_shared_namespace(shading.shared_namespace_root)
            .with_source_roots(frame.package_roots);

        tracing::debug!(
            "{}: namespace {} will be shaded",
            frame.label,
            rule.shaded_namespace
        );
        self.resolution.rules.push(rule);
        Ok(())
    }
}
