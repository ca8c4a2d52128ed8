//! Shadepack - package a plugin together with its libraries, shading the
//! libraries' namespaces
//!
//! Each library is moved under a private namespace unique to the build, so
//! two plugins bundling different versions of the same library cannot
//! collide at load time. Sources are handled as token streams: files are
//! split into a shared header and one file per declaration, and only name
//! tokens are rewritten.

pub mod archive;
pub mod core;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod resolver;
pub mod util;

pub use crate::core::{DeclarationItem, ShadingRule, SourceFile, TargetPrefix};
pub use ops::{pack, PackOptions, PackReport};
pub use resolver::{resolve, Resolution};
