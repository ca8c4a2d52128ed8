//! Dependency resolution.
//!
//! Walks the installed composer packages of a project and turns their
//! shading blocks into [`ShadingRule`](crate::core::ShadingRule)s.

pub mod errors;
pub mod resolve;
pub mod version;

pub use errors::ManifestError;
pub use resolve::{is_platform_package, resolve, Resolution, VENDOR_DIR};
