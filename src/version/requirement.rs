//! [`Requirement`]: the constraint a manifest edge places on a dependency.

use std::fmt;

use super::{RangeSet, Version, VersionSetSpecifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Range(VersionSetSpecifier),
    Revision(String),
    Branch(String),
    Exact(Version),
    Unversioned,
}

impl Requirement {
    /// Converts the requirement into the version-set term the resolver
    /// reasons over. Branches and revisions become opaque singleton sets;
    /// `Unversioned` is the universal set.
    pub fn to_version_set(&self) -> VersionSetSpecifier {
        match self {
            Requirement::Range(set) => set.clone(),
            Requirement::Revision(hash) => VersionSetSpecifier::from_opaque_token(format!("rev:{hash}")),
            Requirement::Branch(name) => VersionSetSpecifier::from_opaque_token(format!("branch:{name}")),
            Requirement::Exact(v) => {
                VersionSetSpecifier::from_ranges(RangeSet::half_open(v.clone(), bump_patch(v)))
            }
            Requirement::Unversioned => VersionSetSpecifier::full(),
        }
    }
}

fn bump_patch(v: &Version) -> Version {
    let mut next = v.clone();
    next.patch += 1;
    next.pre = semver::Prerelease::EMPTY;
    next.build = semver::BuildMetadata::EMPTY;
    next
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Range(set) => write!(f, "{set}"),
            Requirement::Revision(hash) => write!(f, "revision {hash}"),
            Requirement::Branch(name) => write!(f, "branch {name}"),
            Requirement::Exact(v) => write!(f, "={v}"),
            Requirement::Unversioned => f.write_str("*"),
        }
    }
}
