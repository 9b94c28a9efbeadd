//! Version algebra: SemVer versions, range sets, and requirements.

mod range;
mod requirement;

pub use range::{OpaqueSet, RangeSet, Relation, VersionSetSpecifier};
pub use requirement::Requirement;

/// Strict SemVer 2.0.0 version.
///
/// Re-exports `semver::Version` rather than reimplementing comparison: its
/// `Ord` impl already ignores build metadata and compares prerelease
/// identifiers the way the spec requires (numeric identifiers compared
/// numerically, the rest lexicographically).
pub type Version = semver::Version;

pub fn parse_version(s: &str) -> crate::error::ResolverResult<Version> {
    Version::parse(s).map_err(|_| crate::error::ResolverError::InvalidVersion(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_canonical_strings() {
        for s in [
            "1.0.0",
            "1.2.3-alpha.1",
            "1.2.3-alpha.10",
            "2.0.0-rc.1+build.5",
            "0.0.1",
        ] {
            let v = parse_version(s).unwrap();
            assert_eq!(v.to_string(), s);
        }
    }

    #[test]
    fn build_metadata_ignored_in_ordering() {
        let a = parse_version("1.0.0+a").unwrap();
        let b = parse_version("1.0.0+b").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn numeric_prerelease_identifiers_compare_numerically() {
        let a = parse_version("1.0.0-alpha.2").unwrap();
        let b = parse_version("1.0.0-alpha.10").unwrap();
        assert!(a < b);
    }
}
