//! Manifest and resolution error types.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::core::shading::ShadingError;

/// Error while reading a package manifest or walking its dependencies.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    #[error("failed to read manifest: {}", path.display())]
    #[diagnostic(
        code(shadepack::manifest::read),
        help("run `composer install` so every dependency is present under vendor/")
    )]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {}", path.display())]
    #[diagnostic(code(shadepack::manifest::malformed))]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid shading block in {}: {message}", path.display())]
    #[diagnostic(code(shadepack::manifest::invalid_shading))]
    InvalidShading { path: PathBuf, message: String },

    #[error("shading block in {} does not declare a spec version", path.display())]
    #[diagnostic(code(shadepack::manifest::missing_spec))]
    MissingSpec { path: PathBuf },

    #[error("spec version \"{version}\" in {} is not a version number", path.display())]
    #[diagnostic(code(shadepack::manifest::invalid_spec))]
    InvalidSpecVersion { path: PathBuf, version: String },

    #[error("{} requires shading spec {version}, which is newer than this tool supports", path.display())]
    #[diagnostic(
        code(shadepack::manifest::spec_too_new),
        help("upgrade shadepack or pin an older release of the dependency")
    )]
    SpecTooNew { path: PathBuf, version: String },

    #[error("{} uses shading spec {version}, which is no longer supported", path.display())]
    #[diagnostic(
        code(shadepack::manifest::spec_too_old),
        help("upgrade the dependency to a release built for spec 3.x")
    )]
    SpecTooOld { path: PathBuf, version: String },

    #[error("shading block in {} does not declare a namespace-root", path.display())]
    #[diagnostic(code(shadepack::manifest::missing_namespace_root))]
    MissingNamespaceRoot { path: PathBuf },

    #[error("invalid dependency name `{name}` required by {}", referenced_from.display())]
    #[diagnostic(
        code(shadepack::manifest::invalid_dependency),
        help("dependency names have the form `vendor/package`")
    )]
    InvalidDependencyName {
        name: String,
        referenced_from: PathBuf,
    },

    #[error("invalid namespace-root in {}", path.display())]
    #[diagnostic(code(shadepack::manifest::invalid_namespace))]
    InvalidNamespace {
        path: PathBuf,
        #[source]
        source: ShadingError,
    },
}
