//! CLI integration tests for Shadepack.
//!
//! These tests drive the binary end to end: plugin directory in, output
//! tree and archive out.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the shadepack binary command.
fn shadepack() -> Command {
    let mut cmd = Command::cargo_bin("shadepack").unwrap();
    cmd.env_remove("SHADEPACK_COMPOSER");
    cmd
}

/// Create a temporary directory for test projects.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

/// Write a plugin with one entry class that uses a library.
fn write_plugin(root: &Path) {
    fs::create_dir_all(root.join("src/Demo")).unwrap();
    fs::create_dir_all(root.join("resources")).unwrap();
    fs::write(
        root.join("plugin.yml"),
        "name: Demo\nversion: 1.0.0\nmain: Demo\\Main\napi: 5.0.0\n",
    )
    .unwrap();
    fs::write(root.join("resources/config.yml"), "enabled: true\n").unwrap();
    fs::write(
        root.join("src/Demo/Main.php"),
        r#"<?php

declare(strict_types=1);

namespace Demo;

use Acme\Util\Greeter;

final class Main {
    public function greet() : string {
        return (new Greeter())->greet("{$this->name()}");
    }

    private function name() : string {
        return \Acme\Util\Names::DEFAULT;
    }
}
"#,
    )
    .unwrap();
}

/// Write an installed library under the plugin's vendor directory.
fn write_library(root: &Path) {
    fs::write(
        root.join("composer.json"),
        r#"{"require": {"php": "^8.1", "ext-yaml": "*", "acme/util": "^1.0"},
            "autoload": {"psr-4": {"Demo\\": "src/"}}}"#,
    )
    .unwrap();

    let lib = root.join("vendor/acme/util");
    fs::create_dir_all(lib.join("src")).unwrap();
    fs::write(
        lib.join("composer.json"),
        r#"{"name": "acme/util", "autoload": {"psr-4": {"Acme\\Util\\": "src/"}},
            "extra": {"shading": {"spec": "3.1", "namespace-root": "Acme\\Util"}}}"#,
    )
    .unwrap();
    fs::write(
        lib.join("src/Greeter.php"),
        "<?php\n\nnamespace Acme\\Util;\n\nclass Greeter {\n    public function greet(string $n) : string {\n        return \"hi $n\";\n    }\n}\n",
    )
    .unwrap();
    fs::write(
        lib.join("src/Names.php"),
        "<?php\n\nnamespace Acme\\Util;\n\ninterface Names {\n    const DEFAULT = 'world';\n}\n",
    )
    .unwrap();
}

/// Find the single shaded prefix directory under `src/Demo/libs`.
fn shaded_dir(out: &Path) -> std::path::PathBuf {
    let libs = out.join("src/Demo/libs");
    let mut entries: Vec<_> = fs::read_dir(&libs)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1, "expected one prefix directory in {}", libs.display());
    entries.remove(0)
}

// ============================================================================
// output selection
// ============================================================================

#[test]
fn test_directory_output() {
    let tmp = temp_dir();
    let plugin = tmp.path().join("plugin");
    write_plugin(&plugin);
    let out = tmp.path().join("out");

    shadepack()
        .arg("-i")
        .arg(&plugin)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Output directory created"));

    assert!(out.join("plugin.yml").is_file());
    assert!(out.join("resources/config.yml").is_file());
    let main = fs::read_to_string(out.join("src/Demo/Main.php")).unwrap();
    assert!(main.contains("namespace Demo;"));
    assert_eq!(
        main.lines().position(|l| l.starts_with("final class Main")),
        Some(8)
    );
    assert!(!tmp.path().join("out.phar").exists());
}

#[test]
fn test_archive_output_next_to_directory() {
    let tmp = temp_dir();
    let plugin = tmp.path().join("plugin");
    write_plugin(&plugin);
    let out = tmp.path().join("out");

    shadepack()
        .arg("-i")
        .arg(&plugin)
        .arg("-o")
        .arg(&out)
        .arg("-p")
        .assert()
        .success();

    let bytes = fs::read(tmp.path().join("out.phar")).unwrap();
    assert!(bytes.starts_with(b"<?php __HALT_COMPILER(); ?>\r\n"));
    assert!(bytes.ends_with(b"GBMB"));
}

#[test]
fn test_default_archive_in_working_directory() {
    let tmp = temp_dir();
    let plugin = tmp.path().join("plugin");
    write_plugin(&plugin);

    shadepack()
        .args(["-i", "plugin"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated archive at output.phar"));

    assert!(tmp.path().join("output.phar").is_file());
}

#[test]
fn test_tarball_output() {
    let tmp = temp_dir();
    let plugin = tmp.path().join("plugin");
    write_plugin(&plugin);
    let archive = tmp.path().join("demo.tar.gz");

    shadepack()
        .arg("-i")
        .arg(&plugin)
        .arg(format!("-p={}", archive.display()))
        .assert()
        .success();

    let bytes = fs::read(&archive).unwrap();
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
}

// ============================================================================
// shading
// ============================================================================

#[test]
fn test_explicit_shading() {
    let tmp = temp_dir();
    let plugin = tmp.path().join("plugin");
    write_plugin(&plugin);
    let out = tmp.path().join("out");

    shadepack()
        .arg("-i")
        .arg(&plugin)
        .args(["-a", "Acme\\Util"])
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let main = fs::read_to_string(out.join("src/Demo/Main.php")).unwrap();
    assert!(main.contains("use Demo\\libs\\_"));
    assert!(main.contains("\\Acme\\Util\\Greeter;"));
    assert!(main.contains("return \\Demo\\libs\\_"));
    assert!(!main.contains("use Acme\\Util\\Greeter;"));
}

#[test]
fn test_composer_project_without_install() {
    let tmp = temp_dir();
    let plugin = tmp.path().join("plugin");
    write_plugin(&plugin);
    write_library(&plugin);
    let out = tmp.path().join("out");

    shadepack()
        .arg("-i")
        .arg(&plugin)
        .args(["-c", "--no-install"])
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let prefix_dir = shaded_dir(&out);
    let greeter = fs::read_to_string(prefix_dir.join("Acme/Util/Greeter.php")).unwrap();
    assert!(greeter.contains("namespace Demo\\libs\\_"));
    assert_eq!(
        greeter.lines().position(|l| l.starts_with("class Greeter")),
        Some(4)
    );
    assert!(prefix_dir.join("Acme/Util/Names.php").is_file());
    assert!(!out.join("src/Acme").exists());
}

#[test]
fn test_unshadeable_dependency_is_reported() {
    let tmp = temp_dir();
    let plugin = tmp.path().join("plugin");
    write_plugin(&plugin);
    write_library(&plugin);
    fs::write(
        plugin.join("vendor/acme/util/composer.json"),
        r#"{"name": "acme/util", "autoload": {"psr-4": {"Acme\\Util\\": "src/"}}}"#,
    )
    .unwrap();
    let out = tmp.path().join("out");

    shadepack()
        .arg("-i")
        .arg(&plugin)
        .args(["-c", "--no-install"])
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/util is not shadeable"))
        .stdout(predicate::str::contains("should declare `extra.shading`"));

    assert!(!out.join("src/Acme").exists());
    assert!(!out.join("src/Demo/libs").exists());
}

#[test]
fn test_unsupported_spec_version_fails() {
    let tmp = temp_dir();
    let plugin = tmp.path().join("plugin");
    write_plugin(&plugin);
    write_library(&plugin);
    let manifest = plugin.join("vendor/acme/util/composer.json");
    let content = fs::read_to_string(&manifest)
        .unwrap()
        .replace("\"3.1\"", "\"3.2\"");
    fs::write(&manifest, content).unwrap();
    let out = tmp.path().join("out");

    shadepack()
        .arg("-i")
        .arg(&plugin)
        .args(["-c", "--no-install"])
        .arg("-o")
        .arg(&out)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("newer than this tool supports"));

    assert!(!out.exists());
}

// ============================================================================
// errors
// ============================================================================

#[test]
fn test_nothing_to_package_is_usage_error() {
    shadepack()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("nothing to package"))
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_unknown_flag_exits_with_one() {
    shadepack().arg("--bogus").assert().failure().code(1);
}

#[test]
fn test_syntax_error_names_file() {
    let tmp = temp_dir();
    let src = tmp.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("Broken.php"), "<?php\nnamespace A\\B;\nclass X { $s = \"open;\n").unwrap();

    shadepack()
        .arg("-s")
        .arg(&src)
        .arg("-o")
        .arg(tmp.path().join("out"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Broken.php"));
}

#[test]
fn test_missing_namespace_fails() {
    let tmp = temp_dir();
    let src = tmp.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("Loose.php"), "<?php\nclass Loose {}\n").unwrap();

    shadepack()
        .arg("-s")
        .arg(&src)
        .arg("-o")
        .arg(tmp.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Loose.php"));
}

#[test]
fn test_help_exits_zero() {
    shadepack()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("NAME:PATH"));
}
