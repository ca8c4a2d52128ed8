//! Shading spec version handling.

use std::cmp::Ordering;

use semver::Version;

/// Oldest shading spec this tool understands.
pub const MIN_SPEC: Version = Version::new(3, 0, 0);
/// Newest shading spec this tool understands.
pub const MAX_SPEC: Version = Version::new(3, 1, 0);

/// Result of checking a declared spec version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSupport {
    Supported(Version),
    TooOld(Version),
    TooNew(Version),
}

/// Parse a version string, allowing for incomplete versions.
pub fn parse_version_lenient(s: &str) -> Option<Version> {
    let s = s.trim();
    if let Ok(v) = s.parse() {
        return Some(v);
    }

    let parts: Vec<&str> = s.split('.').collect();
    match parts.len() {
        1 => {
            let major: u64 = parts[0].parse().ok()?;
            Some(Version::new(major, 0, 0))
        }
        2 => {
            let major: u64 = parts[0].parse().ok()?;
            let minor: u64 = parts[1].parse().ok()?;
            Some(Version::new(major, minor, 0))
        }
        _ => None,
    }
}

/// Check a declared spec version against the supported window.
///
/// Returns `None` when the string is not a version at all.
pub fn check_spec(raw: &str) -> Option<SpecSupport> {
    let version = parse_version_lenient(raw)?;
    let support = if version.cmp_precedence(&MIN_SPEC) == Ordering::Less {
        SpecSupport::TooOld(version)
    } else if version.cmp_precedence(&MAX_SPEC) == Ordering::Greater {
        SpecSupport::TooNew(version)
    } else {
        SpecSupport::Supported(version)
    };
    Some(support)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_lenient() {
        assert_eq!(parse_version_lenient("3"), Some(Version::new(3, 0, 0)));
        assert_eq!(parse_version_lenient("3.1"), Some(Version::new(3, 1, 0)));
        assert_eq!(parse_version_lenient("3.1.2"), Some(Version::new(3, 1, 2)));
        assert_eq!(parse_version_lenient("three"), None);
        assert_eq!(parse_version_lenient("3.1.2.4"), None);
    }

    #[test]
    fn test_spec_window() {
        assert_eq!(
            check_spec("3.0"),
            Some(SpecSupport::Supported(Version::new(3, 0, 0)))
        );
        assert_eq!(
            check_spec("3.1"),
            Some(SpecSupport::Supported(Version::new(3, 1, 0)))
        );
        assert!(matches!(check_spec("3.2"), Some(SpecSupport::TooNew(_))));
        assert!(matches!(check_spec("3.1.1"), Some(SpecSupport::TooNew(_))));
        assert!(matches!(check_spec("2.9"), Some(SpecSupport::TooOld(_))));
        assert!(matches!(check_spec("1"), Some(SpecSupport::TooOld(_))));
        assert_eq!(check_spec("latest"), None);
    }
}
