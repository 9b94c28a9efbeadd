//! Bidirectional URL/mirror rewriting applied at resolution boundaries.
//!
//! Mirrors are invisible to [`PackageIdentity`](crate::identity::PackageIdentity):
//! `resolve` and `unresolve` only ever rewrite the location a package is
//! fetched from, never the string identity is derived from.

use std::collections::HashMap;

/// `resolve(url)` rewrites an original URL to its mirror, if one is
/// configured; `unresolve(url)` reverses that rewrite when saving pins so
/// the lockfile stays portable across environments with different mirror
/// configurations.
#[derive(Debug, Clone, Default)]
pub struct Mirrors {
    // original -> mirror
    forward: HashMap<String, String>,
    // mirror -> original
    backward: HashMap<String, String>,
}

impl Mirrors {
    pub fn new() -> Mirrors {
        Mirrors::default()
    }

    pub fn set(&mut self, original: impl Into<String>, mirror: impl Into<String>) {
        let original = original.into();
        let mirror = mirror.into();
        self.backward.insert(mirror.clone(), original.clone());
        self.forward.insert(original, mirror);
    }

    /// Returns the mirror URL if `url` has one configured, else `url`
    /// unchanged.
    pub fn resolve<'a>(&'a self, url: &'a str) -> &'a str {
        self.forward.get(url).map(String::as_str).unwrap_or(url)
    }

    /// Returns the original URL if `url` is a known mirror target, else
    /// `url` unchanged.
    pub fn unresolve<'a>(&'a self, url: &'a str) -> &'a str {
        self.backward.get(url).map(String::as_str).unwrap_or(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_resolve_and_unresolve() {
        let mut m = Mirrors::new();
        m.set(
            "https://github.com/corporate/foo.git",
            "https://ghe/team/foo.git",
        );
        let mirrored = m.resolve("https://github.com/corporate/foo.git");
        assert_eq!(mirrored, "https://ghe/team/foo.git");
        assert_eq!(m.unresolve(mirrored), "https://github.com/corporate/foo.git");
    }

    #[test]
    fn resolve_is_identity_outside_domain() {
        let m = Mirrors::new();
        assert_eq!(m.resolve("https://example.com/x.git"), "https://example.com/x.git");
        assert_eq!(m.unresolve("https://example.com/x.git"), "https://example.com/x.git");
    }

    #[test]
    fn identity_mapped_to_itself_is_a_no_op() {
        let mut m = Mirrors::new();
        m.set("https://example.com/x.git", "https://example.com/x.git");
        assert_eq!(m.resolve("https://example.com/x.git"), "https://example.com/x.git");
    }

    #[test]
    fn identity_is_preserved_across_mirror() {
        use crate::identity::PackageIdentity;
        let mut m = Mirrors::new();
        let original = "https://github.com/corporate/foo.git";
        m.set(original, "https://ghe/team/foo.git");
        let mirrored = m.resolve(original);
        assert_eq!(
            PackageIdentity::from_location(original),
            PackageIdentity::from_location(mirrored)
        );
    }
}
