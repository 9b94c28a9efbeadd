//! Canonical package identity.
//!
//! Identity is purely syntactic: it is derived from a URL or filesystem path
//! by stripping scheme, user-info, the `.git` suffix and trailing
//! separators, then case-folding. Two references with the same identity are
//! the same package even if their URLs differ (mirrors rely on this).

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A canonical, lowercase package identity.
///
/// Invariant: `identity(mirror_of(u)) == identity(u)` for every mirrored
/// URL `u` — mirrors rewrite the host/path, never the basename identity is
/// derived from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageIdentity(String);

impl PackageIdentity {
    /// Derives an identity from a URL or filesystem path string.
    ///
    /// Strips a scheme (`scheme://`), user-info (`user@`), a trailing
    /// `.git`, and trailing path separators, then takes the last path
    /// component and case-folds it.
    pub fn from_location(location: &str) -> PackageIdentity {
        let without_scheme = match location.find("://") {
            Some(idx) => &location[idx + 3..],
            None => location,
        };
        let without_userinfo = match without_scheme.rfind('@') {
            // only strip user-info that precedes the first remaining path
            // separator, so `@` inside a path component is left alone.
            Some(idx) if without_scheme[..idx].find('/').is_none() => &without_scheme[idx + 1..],
            _ => without_scheme,
        };
        let trimmed = without_userinfo.trim_end_matches(['/', '\\']);
        let basename = trimmed
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(trimmed)
            .trim_end_matches(".git");
        PackageIdentity(basename.to_lowercase())
    }

    pub fn from_path(path: &Path) -> PackageIdentity {
        PackageIdentity::from_location(&path.to_string_lossy())
    }

    /// Builds an identity directly from an already-canonical string, e.g.
    /// one stored verbatim in a v2 pins file.
    pub fn from_raw(raw: impl Into<String>) -> PackageIdentity {
        PackageIdentity(raw.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageIdentity {
    fn from(s: &str) -> Self {
        PackageIdentity::from_location(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_userinfo_and_git_suffix() {
        let a = PackageIdentity::from_location("https://github.com/corporate/Foo.git");
        assert_eq!(a.as_str(), "foo");
        let b = PackageIdentity::from_location("git@github.com:corporate/Foo.git");
        assert_eq!(b.as_str(), "foo");
    }

    #[test]
    fn strips_trailing_separators() {
        let a = PackageIdentity::from_location("https://example.com/foo/");
        assert_eq!(a.as_str(), "foo");
    }

    #[test]
    fn local_paths_use_basename() {
        let a = PackageIdentity::from_path(Path::new("/Users/dev/checkouts/Bar"));
        assert_eq!(a.as_str(), "bar");
    }

    #[test]
    fn identity_is_case_folded() {
        assert_eq!(
            PackageIdentity::from_location("FOO"),
            PackageIdentity::from_location("foo")
        );
    }
}
