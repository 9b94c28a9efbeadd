//! [`PackageReference`]: enough information to fetch a package, with
//! equality defined purely by identity and kind (never by the carried
//! location), matching the spec's "carries enough information to fetch but
//! equality is by identity and kind only" rule.

use std::path::PathBuf;

use crate::identity::PackageIdentity;

#[derive(Debug, Clone)]
pub enum PackageReference {
    /// The package at the root of the current workspace.
    Root(PathBuf),
    /// A source-control checkout living on local disk, not fetched over
    /// the network (e.g. a path dependency backed by a git repo).
    LocalSCM { identity: PackageIdentity, path: PathBuf },
    /// A source-control repository fetched over the network.
    RemoteSCM { identity: PackageIdentity, url: String },
    /// A package resolved through a registry rather than source control.
    Registry { identity: PackageIdentity },
}

impl PackageReference {
    pub fn identity(&self) -> PackageIdentity {
        match self {
            PackageReference::Root(path) => PackageIdentity::from_path(path),
            PackageReference::LocalSCM { identity, .. }
            | PackageReference::RemoteSCM { identity, .. }
            | PackageReference::Registry { identity } => identity.clone(),
        }
    }

    pub fn kind(&self) -> ReferenceKind {
        match self {
            PackageReference::Root(_) => ReferenceKind::Root,
            PackageReference::LocalSCM { .. } => ReferenceKind::LocalSourceControl,
            PackageReference::RemoteSCM { .. } => ReferenceKind::RemoteSourceControl,
            PackageReference::Registry { .. } => ReferenceKind::Registry,
        }
    }

    /// The location a container or reconciler would fetch from, if any.
    pub fn location(&self) -> Option<&str> {
        match self {
            PackageReference::Root(_) => None,
            PackageReference::LocalSCM { path, .. } => path.to_str(),
            PackageReference::RemoteSCM { url, .. } => Some(url.as_str()),
            PackageReference::Registry { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Root,
    LocalSourceControl,
    RemoteSourceControl,
    Registry,
}

impl ReferenceKind {
    pub fn as_schema_str(self) -> &'static str {
        match self {
            ReferenceKind::Root => "root",
            ReferenceKind::LocalSourceControl => "localSourceControl",
            ReferenceKind::RemoteSourceControl => "remoteSourceControl",
            ReferenceKind::Registry => "registry",
        }
    }
}

impl PartialEq for PackageReference {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity() && self.kind() == other.kind()
    }
}

impl Eq for PackageReference {}

impl std::hash::Hash for PackageReference {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
        self.kind().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_location() {
        let a = PackageReference::RemoteSCM {
            identity: PackageIdentity::from_raw("foo"),
            url: "https://github.com/corporate/foo.git".into(),
        };
        let b = PackageReference::RemoteSCM {
            identity: PackageIdentity::from_raw("foo"),
            url: "https://ghe/team/foo.git".into(),
        };
        assert_eq!(a, b);
    }

    #[test]
    fn different_kinds_are_not_equal() {
        let a = PackageReference::Registry {
            identity: PackageIdentity::from_raw("foo"),
        };
        let b = PackageReference::RemoteSCM {
            identity: PackageIdentity::from_raw("foo"),
            url: "https://example.com/foo.git".into(),
        };
        assert_ne!(a, b);
    }
}
