//! [`PackageContainer`]: the source of "what versions exist, what are
//! their dependencies" the resolver is polymorphic over.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ResolverResult;
use crate::identity::PackageIdentity;
use crate::reference::PackageReference;
use crate::version::{Requirement, Version};

/// The point at which a package's dependencies are being asked for: either
/// a concrete version (range requirements) or an opaque revision (branch/
/// revision requirements).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PinPoint {
    Version(Version),
    Revision(String),
}

/// The facts a container exposes about one package at one pinned point —
/// mirrors cargo's `Summary`: identity, the point resolved to, and the
/// outgoing `(PackageReference, Requirement)` edges declared there. The
/// resolver and `ResolutionGraph` carry this rather than a bare tuple list
/// so callers never have to re-derive identity/point provenance.
#[derive(Debug, Clone)]
pub struct Summary {
    pub identity: PackageIdentity,
    pub at: PinPoint,
    pub dependencies: Vec<(PackageReference, Requirement)>,
}

/// Abstracted source of package facts. Implementations are expected to
/// cache; the resolver makes no assumptions about cost beyond total
/// ordering on versions (spec.md §4.3).
pub trait PackageContainer {
    /// Sorted descending. May block; implementations decide how to
    /// memoize repeated calls.
    fn versions(&self, identity: &PackageIdentity) -> ResolverResult<Vec<Version>>;

    /// The concrete revisions that satisfy a branch/revision requirement.
    fn revisions(
        &self,
        identity: &PackageIdentity,
        requirement: &Requirement,
    ) -> ResolverResult<BTreeSet<String>>;

    /// The outgoing edges of a specific pinned point.
    fn dependencies(&self, identity: &PackageIdentity, at: &PinPoint) -> ResolverResult<Summary>;

    /// Filters out versions whose manifest declares an incompatible tools
    /// version. Defaults to always-compatible for containers that don't
    /// gate on tools version.
    fn is_tools_version_compatible(&self, _identity: &PackageIdentity, _at: &PinPoint) -> bool {
        true
    }

    /// When `is_tools_version_compatible` returns `false`, optionally
    /// supplies `(required, have)` for [`crate::ResolverError::ToolsVersionIncompatible`]
    /// diagnostics. Defaults to `None` for containers that don't track it.
    fn tools_version_mismatch(&self, _identity: &PackageIdentity, _at: &PinPoint) -> Option<(String, String)> {
        None
    }
}

/// A fully in-memory [`PackageContainer`], used in tests and by the
/// resolver-tests crate's independent SAT double-checker. Holds every
/// package's versions and edges directly rather than fetching them.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    versions: BTreeMap<PackageIdentity, Vec<Version>>,
    deps: BTreeMap<(PackageIdentity, PinPoint), Vec<(PackageReference, Requirement)>>,
    /// Branch name or revision hex -> revision hex, per package, so
    /// `revisions()` can answer both "what does branch `main` resolve to"
    /// and "does revision `abc123` exist" without string-sniffing `deps`.
    revisions: BTreeMap<PackageIdentity, BTreeMap<String, String>>,
    incompatible_tools_version: BTreeSet<(PackageIdentity, PinPoint)>,
    tools_version_requirement: BTreeMap<(PackageIdentity, PinPoint), (String, String)>,
}

impl MemoryContainer {
    pub fn new() -> MemoryContainer {
        MemoryContainer::default()
    }

    /// Registers a version for `identity`, keeping the list sorted
    /// descending as `versions()` requires.
    pub fn add_version(&mut self, identity: PackageIdentity, version: Version) -> &mut Self {
        let entry = self.versions.entry(identity).or_default();
        entry.push(version);
        entry.sort_by(|a, b| b.cmp(a));
        entry.dedup();
        self
    }

    pub fn add_dependency(
        &mut self,
        identity: PackageIdentity,
        at: PinPoint,
        dep: PackageReference,
        requirement: Requirement,
    ) -> &mut Self {
        self.deps.entry((identity, at)).or_default().push((dep, requirement));
        self
    }

    /// Registers `branch_or_revision` (a branch name, or a revision hex
    /// naming itself) as resolving to `revision`.
    pub fn add_revision(
        &mut self,
        identity: PackageIdentity,
        branch_or_revision: impl Into<String>,
        revision: impl Into<String>,
    ) -> &mut Self {
        self.revisions.entry(identity).or_default().insert(branch_or_revision.into(), revision.into());
        self
    }

    pub fn mark_tools_version_incompatible(
        &mut self,
        identity: PackageIdentity,
        at: PinPoint,
        required: impl Into<String>,
        have: impl Into<String>,
    ) -> &mut Self {
        self.incompatible_tools_version.insert((identity.clone(), at.clone()));
        self.tools_version_requirement.insert((identity, at), (required.into(), have.into()));
        self
    }

    /// Every identity with at least one registered version. Used by test
    /// tooling that needs to enumerate the registry rather than query one
    /// package at a time.
    pub fn identities(&self) -> impl Iterator<Item = &PackageIdentity> {
        self.versions.keys()
    }
}

impl PackageContainer for MemoryContainer {
    fn versions(&self, identity: &PackageIdentity) -> ResolverResult<Vec<Version>> {
        Ok(self.versions.get(identity).cloned().unwrap_or_default())
    }

    fn revisions(
        &self,
        identity: &PackageIdentity,
        requirement: &Requirement,
    ) -> ResolverResult<BTreeSet<String>> {
        let key = match requirement {
            Requirement::Branch(name) => name,
            Requirement::Revision(hash) => hash,
            _ => return Ok(BTreeSet::new()),
        };
        Ok(self
            .revisions
            .get(identity)
            .and_then(|m| m.get(key))
            .cloned()
            .into_iter()
            .collect())
    }

    fn dependencies(&self, identity: &PackageIdentity, at: &PinPoint) -> ResolverResult<Summary> {
        Ok(Summary {
            identity: identity.clone(),
            at: at.clone(),
            dependencies: self.deps.get(&(identity.clone(), at.clone())).cloned().unwrap_or_default(),
        })
    }

    fn is_tools_version_compatible(&self, identity: &PackageIdentity, at: &PinPoint) -> bool {
        !self.incompatible_tools_version.contains(&(identity.clone(), at.clone()))
    }

    fn tools_version_mismatch(&self, identity: &PackageIdentity, at: &PinPoint) -> Option<(String, String)> {
        self.tools_version_requirement.get(&(identity.clone(), at.clone())).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_container_reports_registered_versions_descending() {
        let mut c = MemoryContainer::new();
        let foo = PackageIdentity::from_raw("foo");
        c.add_version(foo.clone(), crate::version::parse_version("1.0.0").unwrap());
        c.add_version(foo.clone(), crate::version::parse_version("1.2.0").unwrap());
        assert_eq!(
            c.versions(&foo).unwrap(),
            vec![
                crate::version::parse_version("1.2.0").unwrap(),
                crate::version::parse_version("1.0.0").unwrap(),
            ]
        );
    }

    #[test]
    fn memory_container_resolves_branch_to_revision() {
        let mut c = MemoryContainer::new();
        let foo = PackageIdentity::from_raw("foo");
        c.add_revision(foo.clone(), "main", "abc123");
        let revs = c.revisions(&foo, &Requirement::Branch("main".to_string())).unwrap();
        assert_eq!(revs, BTreeSet::from(["abc123".to_string()]));
    }
}
