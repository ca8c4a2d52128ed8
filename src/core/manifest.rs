//! `composer.json` parsing.
//!
//! Only the parts relevant to packaging are modelled: the `require` table,
//! the autoload layouts and the shading block under `extra`.

use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::resolver::ManifestError;

/// File name of a package manifest.
pub const MANIFEST_NAME: &str = "composer.json";

/// Autoload standard of a prefix-mapped layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixStandard {
    Psr0,
    Psr4,
}

/// One autoload declaration of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLayout {
    /// `psr-0` or `psr-4`: a namespace prefix mapped to directories
    PrefixMap {
        standard: PrefixStandard,
        prefix: String,
        paths: Vec<String>,
    },
    /// `classmap`: directories or files scanned for classes
    ClassMap(Vec<String>),
    /// `files`: files always loaded
    FileList(Vec<String>),
}

impl SourceLayout {
    /// Paths relative to the package directory.
    pub fn paths(&self) -> &[String] {
        match self {
            SourceLayout::PrefixMap { paths, .. } => paths,
            SourceLayout::ClassMap(paths) | SourceLayout::FileList(paths) => paths,
        }
    }
}

/// The `extra.shading` block, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadingDeclaration {
    /// Spec version as written; numbers are kept in their textual form
    pub spec: Option<String>,
    pub namespace_root: Option<String>,
    pub shared_namespace_root: Option<String>,
}

/// A parsed package manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Path to composer.json
    pub path: PathBuf,
    pub name: Option<String>,
    /// Dependency identifiers in declaration order
    pub require: Vec<String>,
    pub layouts: Vec<SourceLayout>,
    pub shading: Option<ShadingDeclaration>,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "map_or_empty")]
    require: Map<String, Value>,
    #[serde(default, deserialize_with = "map_or_empty")]
    autoload: Map<String, Value>,
    #[serde(default)]
    extra: RawExtra,
}

#[derive(Debug, Default, Deserialize)]
struct RawExtra {
    #[serde(default, alias = "virion")]
    shading: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawShading {
    #[serde(default)]
    spec: Option<RawSpec>,
    #[serde(default, rename = "namespace-root")]
    namespace_root: Option<String>,
    #[serde(default, rename = "shared-namespace-root")]
    shared_namespace_root: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSpec {
    Text(String),
    Number(serde_json::Number),
}

/// An object, or the empty list PHP encoders write for an empty one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MapOrEmpty {
    Map(Map<String, Value>),
    List(Vec<Value>),
}

impl MapOrEmpty {
    fn into_map<E: de::Error>(self) -> Result<Map<String, Value>, E> {
        match self {
            MapOrEmpty::Map(map) => Ok(map),
            MapOrEmpty::List(list) if list.is_empty() => Ok(Map::new()),
            MapOrEmpty::List(_) => Err(E::custom("expected an object, found a non-empty list")),
        }
    }
}

fn map_or_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    MapOrEmpty::deserialize(deserializer)?.into_map()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(path) => vec![path],
            OneOrMany::Many(paths) => paths,
        }
    }
}

impl Manifest {
    /// Load `composer.json` from a package directory.
    pub fn load(package_dir: &Path) -> Result<Self, ManifestError> {
        let path = package_dir.join(MANIFEST_NAME);
        let content = std::fs::read_to_string(&path).map_err(|source| ManifestError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&content, &path)
    }

    /// Parse manifest content.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ManifestError> {
        let malformed = |source| ManifestError::Malformed {
            path: path.to_path_buf(),
            source,
        };
        let raw: RawManifest = serde_json::from_str(content).map_err(malformed)?;

        let mut layouts = Vec::new();
        for (kind, value) in raw.autoload {
            let layout = match kind.as_str() {
                "psr-0" | "psr-4" => {
                    let standard = if kind == "psr-0" {
                        PrefixStandard::Psr0
                    } else {
                        PrefixStandard::Psr4
                    };
                    let map = serde_json::from_value::<MapOrEmpty>(value)
                        .and_then(MapOrEmpty::into_map)
                        .map_err(malformed)?;
                    for (prefix, paths) in map {
                        let paths: OneOrMany = serde_json::from_value(paths).map_err(malformed)?;
                        layouts.push(SourceLayout::PrefixMap {
                            standard,
                            prefix,
                            paths: paths.into(),
                        });
                    }
                    continue;
                }
                "classmap" => SourceLayout::ClassMap(
                    serde_json::from_value::<OneOrMany>(value)
                        .map_err(malformed)?
                        .into(),
                ),
                "files" => SourceLayout::FileList(
                    serde_json::from_value::<OneOrMany>(value)
                        .map_err(malformed)?
                        .into(),
                ),
                // exclude-from-classmap and friends do not add sources
                _ => continue,
            };
            layouts.push(layout);
        }

        let shading = match raw.extra.shading {
            None => None,
            Some(value) => Some(parse_shading(value, path)?),
        };

        Ok(Manifest {
            path: path.to_path_buf(),
            name: raw.name,
            require: raw.require.into_iter().map(|(name, _)| name).collect(),
            layouts,
            shading,
        })
    }

    /// Directory containing the manifest.
    pub fn package_dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    /// Absolute-or-relative source roots declared by the autoload layouts.
    pub fn source_roots(&self) -> Vec<PathBuf> {
        let dir = self.package_dir();
        self.layouts
            .iter()
            .flat_map(|layout| layout.paths())
            .map(|path| dir.join(path))
            .collect()
    }
}

fn parse_shading(value: Value, path: &Path) -> Result<ShadingDeclaration, ManifestError> {
    let raw: RawShading =
        serde_json::from_value(value).map_err(|e| ManifestError::InvalidShading {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(ShadingDeclaration {
        spec: raw.spec.map(|spec| match spec {
            RawSpec::Text(text) => text,
            RawSpec::Number(number) => number.to_string(),
        }),
        namespace_root: raw.namespace_root,
        shared_namespace_root: raw.shared_namespace_root,
    })
}
