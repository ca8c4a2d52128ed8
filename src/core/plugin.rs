//! `plugin.yml` descriptor.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::shading::SEPARATOR;

/// File name of the plugin descriptor.
pub const PLUGIN_DESCRIPTOR: &str = "plugin.yml";

/// The fields of a plugin descriptor this tool reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginDescriptor {
    /// Fully qualified entry class, e.g. `My\Plugin\Main`
    #[serde(default)]
    pub main: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

impl PluginDescriptor {
    /// Load a descriptor from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plugin descriptor: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("failed to parse plugin descriptor: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Namespace of the entry class including the trailing separator.
    pub fn main_namespace(&self) -> Option<&str> {
        let main = self.main.as_deref()?;
        main.rfind(SEPARATOR).map(|pos| &main[..=pos])
    }
}
