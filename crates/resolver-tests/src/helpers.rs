//! Fixture builders for resolver tests.
//!
//! Grounded on the teacher's `resolver-tests` helpers (`pkg`, `pkg_dep`,
//! `dep`, `dep_req`, `registry`) — reduced to what this resolver's version
//! algebra needs rather than Cargo's full feature/platform-cfg model.

use pkgresolve::container::{MemoryContainer, PinPoint};
use pkgresolve::identity::PackageIdentity;
use pkgresolve::reference::PackageReference;
use pkgresolve::version::{parse_version, RangeSet, Requirement, VersionSetSpecifier};

#[derive(Debug, Clone)]
pub struct FixturePackage {
    pub identity: String,
    pub version: String,
    pub deps: Vec<(String, Requirement)>,
}

pub fn pkg(name: &str) -> FixturePackage {
    pkg_at(name, "0.1.0")
}

pub fn pkg_at(name: &str, version: &str) -> FixturePackage {
    FixturePackage { identity: name.to_string(), version: version.to_string(), deps: Vec::new() }
}

pub fn pkg_dep(name: &str, deps: Vec<(&str, Requirement)>) -> FixturePackage {
    pkg_dep_at(name, "0.1.0", deps)
}

pub fn pkg_dep_at(name: &str, version: &str, deps: Vec<(&str, Requirement)>) -> FixturePackage {
    FixturePackage {
        identity: name.to_string(),
        version: version.to_string(),
        deps: deps.into_iter().map(|(n, r)| (n.to_string(), r)).collect(),
    }
}

/// An unconstrained dependency edge.
pub fn dep(name: &str) -> (&str, Requirement) {
    (name, Requirement::Unversioned)
}

/// A `^X.Y.Z` or `=X.Y.Z` dependency edge; enough syntax for fixtures,
/// not a general requirement-string parser.
pub fn dep_req(name: &str, req: &str) -> (&str, Requirement) {
    (name, parse_fixture_requirement(req))
}

fn parse_fixture_requirement(req: &str) -> Requirement {
    if let Some(rest) = req.strip_prefix('^') {
        let lo = parse_version(rest).expect("fixture version");
        let mut hi = lo.clone();
        hi.major += 1;
        hi.minor = 0;
        hi.patch = 0;
        hi.pre = semver::Prerelease::EMPTY;
        Requirement::Range(VersionSetSpecifier::from_ranges(RangeSet::half_open(lo, hi)))
    } else if let Some(rest) = req.strip_prefix('=') {
        Requirement::Exact(parse_version(rest).expect("fixture version"))
    } else {
        Requirement::Range(VersionSetSpecifier::full())
    }
}

/// Builds a [`MemoryContainer`] from a fixture package list, registering
/// every version and wiring every declared dependency edge.
pub fn registry(pkgs: Vec<FixturePackage>) -> MemoryContainer {
    let mut container = MemoryContainer::new();
    for p in &pkgs {
        let identity = PackageIdentity::from_raw(&p.identity);
        let version = parse_version(&p.version).expect("fixture version");
        container.add_version(identity, version);
    }
    for p in &pkgs {
        let identity = PackageIdentity::from_raw(&p.identity);
        let version = parse_version(&p.version).expect("fixture version");
        for (dep_name, requirement) in &p.deps {
            container.add_dependency(
                identity.clone(),
                PinPoint::Version(version.clone()),
                PackageReference::Registry { identity: PackageIdentity::from_raw(dep_name) },
                requirement.clone(),
            );
        }
    }
    container
}
