//! Implementation of a full packaging run.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::archive::package_dir;
use crate::core::{PluginDescriptor, ShadingRule, SourceFile, TargetPrefix};
use crate::ops::assemble::assemble;
use crate::ops::install::{install_dependencies, locate_composer};
use crate::ops::rewrite::rewrite;
use crate::parser::parse_file;
use crate::resolver::resolve;
use crate::util::fs::{collect_sources, copy_path, ensure_dir, remove_dir_all_if_exists};

/// Default name of the source root inside the output.
pub const DEFAULT_SOURCE_ROOT: &str = "src";

/// A file or directory copied verbatim into the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Path relative to the output root
    pub name: String,
    pub path: PathBuf,
}

impl InputFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        InputFile {
            name: name.into(),
            path: path.into(),
        }
    }
}

impl FromStr for InputFile {
    type Err = String;

    /// Parse `NAME:PATH`, or a bare `PATH` named after its last component.
    ///
    /// A `:` directly followed by `\` belongs to a drive letter and does
    /// not separate.
    fn from_str(arg: &str) -> Result<Self, Self::Err> {
        let arg = arg.trim_end_matches(['/', '\\']);
        if arg.is_empty() {
            return Err("input path is empty".to_string());
        }

        let bytes = arg.as_bytes();
        let split = arg
            .match_indices(':')
            .map(|(pos, _)| pos)
            .find(|&pos| bytes.get(pos + 1) != Some(&b'\\'));

        let input = match split {
            Some(pos) => InputFile::new(&arg[..pos], &arg[pos + 1..]),
            None => {
                let name = Path::new(arg)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| arg.to_string());
                InputFile::new(name, arg)
            }
        };

        if input.name.is_empty() || input.path.as_os_str().is_empty() {
            return Err(format!("`{}` is not of the form NAME:PATH", arg));
        }
        Ok(input)
    }
}

/// Options for a packaging run.
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Files and directories copied into the output as is
    pub inputs: Vec<InputFile>,

    /// Directories or files whose sources are split and shaded
    pub source_roots: Vec<PathBuf>,

    /// Name of the source root directory inside the output
    pub source_root_name: String,

    /// Keep the output tree at this path
    pub output_dir: Option<PathBuf>,

    /// Package the output tree into this file
    pub archive: Option<PathBuf>,

    /// Namespace roots to shade in addition to the resolved ones
    pub shaded_namespaces: Vec<String>,

    /// Composer project to take source roots and shading rules from
    pub composer_project: Option<PathBuf>,

    /// Run `composer install` in the project first
    pub install: bool,

    /// Composer executable; looked up on PATH when unset
    pub composer: Option<PathBuf>,

    /// Plugin descriptor whose main class places the target prefix
    pub plugin_descriptor: Option<PathBuf>,
}

impl Default for PackOptions {
    fn default() -> Self {
        PackOptions {
            inputs: Vec::new(),
            source_roots: Vec::new(),
            source_root_name: DEFAULT_SOURCE_ROOT.to_string(),
            output_dir: None,
            archive: None,
            shaded_namespaces: Vec::new(),
            composer_project: None,
            install: true,
            composer: None,
            plugin_descriptor: None,
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct PackReport {
    pub target_prefix: TargetPrefix,
    pub files_parsed: usize,
    /// Declaration files written to the source root
    pub items_written: usize,
    /// Files dropped for sitting in a library without belonging to it
    pub files_dropped: usize,
    pub rules_applied: usize,
    pub output_dir: Option<PathBuf>,
    pub archive: Option<PathBuf>,
}

/// Run the whole pipeline: resolve, parse, shade, assemble, package.
pub fn pack(opts: &PackOptions) -> Result<PackReport> {
    if opts.output_dir.is_none() && opts.archive.is_none() {
        bail!("no output selected: pass an output directory, an archive path, or both");
    }

    let prefix = target_prefix(opts)?;
    tracing::debug!("target prefix is {}", prefix);

    let mut rules = Vec::new();
    for namespace in &opts.shaded_namespaces {
        let rule = ShadingRule::new(namespace.as_str(), prefix.clone())
            .with_context(|| format!("cannot shade `{}`", namespace))?;
        rules.push(rule);
    }

    let mut source_roots = opts.source_roots.clone();
    if let Some(project) = &opts.composer_project {
        if opts.install {
            let composer = locate_composer(opts.composer.as_deref())?;
            install_dependencies(&composer, project)?;
        }
        let resolution = resolve(project, &prefix)
            .with_context(|| format!("failed to resolve dependencies of {}", project.display()))?;
        source_roots.extend(resolution.source_roots);
        rules.extend(resolution.rules);
    }

    let staging = staging_dir(opts.output_dir.as_deref())?;
    let staged = staging.path();

    for input in &opts.inputs {
        copy_path(&input.path, &staged.join(&input.name))
            .with_context(|| format!("failed to copy input `{}`", input.name))?;
    }
    let src_root = staged.join(&opts.source_root_name);
    ensure_dir(&src_root)?;

    let files = parse_source_roots(&source_roots)?;
    let files_parsed = files.len();
    let files = rewrite(files, &rules)?;
    let files_dropped = files_parsed - files.len();
    let items_written = assemble(&files, &src_root)?;

    let built = match &opts.output_dir {
        Some(dir) => {
            remove_dir_all_if_exists(dir)?;
            std::fs::rename(staged, dir).with_context(|| {
                format!("failed to move output into place: {}", dir.display())
            })?;
            tracing::info!("Output directory created at {}", dir.display());
            dir.clone()
        }
        None => staged.to_path_buf(),
    };

    if let Some(archive) = &opts.archive {
        package_dir(&built, archive)?;
        tracing::info!("Generated archive at {}", archive.display());
    }

    Ok(PackReport {
        target_prefix: prefix,
        files_parsed,
        items_written,
        files_dropped,
        rules_applied: rules.len(),
        output_dir: opts.output_dir.clone(),
        archive: opts.archive.clone(),
    })
}

fn target_prefix(opts: &PackOptions) -> Result<TargetPrefix> {
    let parent = match &opts.plugin_descriptor {
        Some(path) if path.is_file() => {
            let descriptor = PluginDescriptor::load(path)?;
            tracing::debug!(
                "placing libraries under the main namespace of plugin {}",
                descriptor.name.as_deref().unwrap_or("<unnamed>")
            );
            descriptor.main_namespace().map(str::to_owned)
        }
        _ => None,
    };
    Ok(TargetPrefix::generate(parent.as_deref()))
}

/// A fresh directory to build into, next to the final output if any.
fn staging_dir(output_dir: Option<&Path>) -> Result<tempfile::TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".shadepack-");

    let parent = output_dir
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty());
    match (output_dir, parent) {
        (Some(_), Some(parent)) => {
            ensure_dir(parent)?;
            builder
                .tempdir_in(parent)
                .with_context(|| format!("failed to create staging directory in {}", parent.display()))
        }
        (Some(_), None) => builder
            .tempdir_in(".")
            .context("failed to create staging directory"),
        (None, _) => builder.tempdir().context("failed to create staging directory"),
    }
}

fn parse_source_roots(roots: &[PathBuf]) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();
    for root in roots {
        for path in collect_sources(root)? {
            files.push(parse_file(&path)?);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_input_file_with_name() {
        let input: InputFile = "assets:res/assets/".parse().unwrap();
        assert_eq!(input, InputFile::new("assets", "res/assets"));
    }

    #[test]
    fn test_input_file_without_name() {
        let input: InputFile = "some/dir/plugin.yml".parse().unwrap();
        assert_eq!(input, InputFile::new("plugin.yml", "some/dir/plugin.yml"));
    }

    #[test]
    fn test_input_file_drive_letter() {
        let input: InputFile = "C:\\plugin\\resources\\".parse().unwrap();
        assert_eq!(input.path, PathBuf::from("C:\\plugin\\resources"));

        let named: InputFile = "res:C:\\plugin\\resources".parse().unwrap();
        assert_eq!(named, InputFile::new("res", "C:\\plugin\\resources"));
    }

    #[test]
    fn test_input_file_rejects_empty() {
        assert!("".parse::<InputFile>().is_err());
        assert!(":path".parse::<InputFile>().is_err());
        assert!("name:".parse::<InputFile>().is_err());
    }

    fn write_plugin(root: &Path) {
        fs::create_dir_all(root.join("src/My/Plugin")).unwrap();
        fs::write(root.join("plugin.yml"), "name: Demo\nmain: My\\Plugin\\Main\n").unwrap();
        fs::write(
            root.join("src/My/Plugin/Main.php"),
            "<?php\n\nnamespace My\\Plugin;\n\nuse Foo\\Bar\\Lib;\n\nfinal class Main {\n    \
             public function lib() : Lib {\n        return new \\Foo\\Bar\\Lib();\n    }\n}\n",
        )
        .unwrap();
    }

    #[test]
    fn test_pack_to_directory() {
        let tmp = TempDir::new().unwrap();
        let plugin = tmp.path().join("plugin");
        write_plugin(&plugin);
        let out = tmp.path().join("out");
        fs::create_dir_all(out.join("stale")).unwrap();

        let opts = PackOptions {
            inputs: vec![InputFile::new("plugin.yml", plugin.join("plugin.yml"))],
            source_roots: vec![plugin.join("src")],
            output_dir: Some(out.clone()),
            shaded_namespaces: vec!["Foo\\Bar".to_string()],
            plugin_descriptor: Some(plugin.join("plugin.yml")),
            ..Default::default()
        };
        let report = pack(&opts).unwrap();

        assert_eq!(report.files_parsed, 1);
        assert_eq!(report.items_written, 1);
        assert_eq!(report.rules_applied, 1);
        assert!(report
            .target_prefix
            .as_str()
            .starts_with("My\\Plugin\\libs\\_"));

        assert!(!out.join("stale").exists());
        assert!(out.join("plugin.yml").is_file());
        let main = fs::read_to_string(out.join("src/My/Plugin/Main.php")).unwrap();
        let shaded = format!("use {}\\Foo\\Bar\\Lib;", report.target_prefix);
        assert!(main.contains(&shaded), "{}", main);
        assert_eq!(
            main.lines().position(|l| l.starts_with("final class Main")),
            Some(6)
        );
    }

    #[test]
    fn test_pack_to_archive_only() {
        let tmp = TempDir::new().unwrap();
        let plugin = tmp.path().join("plugin");
        write_plugin(&plugin);
        let archive = tmp.path().join("dist/plugin.phar");

        let opts = PackOptions {
            source_roots: vec![plugin.join("src")],
            archive: Some(archive.clone()),
            ..Default::default()
        };
        let report = pack(&opts).unwrap();

        assert!(report.output_dir.is_none());
        let bytes = fs::read(&archive).unwrap();
        assert!(bytes.starts_with(crate::archive::phar::STUB));
        let needle = b"src/My/Plugin/Main.php";
        assert!(bytes.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn test_pack_requires_output() {
        let err = pack(&PackOptions::default()).unwrap_err();
        assert!(err.to_string().contains("no output selected"));
    }

    #[test]
    fn test_pack_from_composer_project() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("plugin");
        write_plugin(&project);
        fs::write(
            project.join("composer.json"),
            r#"{"require": {"php": "^8.1", "foo/bar": "^1.0"},
                "autoload": {"psr-4": {"My\\Plugin\\": "src/"}}}"#,
        )
        .unwrap();

        let lib = project.join("vendor/foo/bar");
        fs::create_dir_all(lib.join("src")).unwrap();
        fs::write(
            lib.join("composer.json"),
            r#"{"name": "foo/bar", "autoload": {"psr-4": {"Foo\\Bar\\": "src/"}},
                "extra": {"shading": {"spec": "3.0", "namespace-root": "Foo\\Bar"}}}"#,
        )
        .unwrap();
        fs::write(
            lib.join("src/Lib.php"),
            "<?php\nnamespace Foo\\Bar;\nclass Lib {}\n",
        )
        .unwrap();
        fs::write(
            lib.join("src/Stray.php"),
            "<?php\nnamespace Somewhere\\Else;\nclass Stray {}\n",
        )
        .unwrap();

        let out = tmp.path().join("out");
        let opts = PackOptions {
            output_dir: Some(out.clone()),
            composer_project: Some(project.clone()),
            install: false,
            plugin_descriptor: Some(project.join("plugin.yml")),
            ..Default::default()
        };
        let report = pack(&opts).unwrap();

        assert_eq!(report.files_parsed, 3);
        assert_eq!(report.files_dropped, 1);
        assert_eq!(report.items_written, 2);

        let prefix_dir: PathBuf = report.target_prefix.as_str().split('\\').collect();
        let lib_out = out.join("src").join(prefix_dir).join("Foo/Bar/Lib.php");
        let lib_code = fs::read_to_string(&lib_out).unwrap();
        assert!(lib_code.contains(&format!("namespace {}\\Foo\\Bar;", report.target_prefix)));
        assert!(!out.join("src/Somewhere").exists());
    }
}
