//! High-level operations.
//!
//! This module contains the stages of a packaging run and the run itself.

pub mod assemble;
pub mod install;
pub mod pack;
pub mod rewrite;

pub use assemble::{assemble, render_item};
pub use install::{install_dependencies, locate_composer};
pub use pack::{pack, InputFile, PackOptions, PackReport, DEFAULT_SOURCE_ROOT};
pub use rewrite::{rewrite, shade_code, Processor, ShadingProcessor};
