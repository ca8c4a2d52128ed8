//! Core data structures.
//!
//! - Parsed source files and their declarations
//! - Shading rules and the per-build target prefix
//! - Package manifests and the plugin descriptor

pub mod manifest;
pub mod plugin;
pub mod shading;
pub mod source_file;

pub use manifest::{Manifest, ShadingDeclaration, SourceLayout, MANIFEST_NAME};
pub use plugin::{PluginDescriptor, PLUGIN_DESCRIPTOR};
pub use shading::{namespace_matches, ShadingError, ShadingRule, TargetPrefix};
pub use source_file::{DeclarationItem, SourceFile};
