//! Edit-mode state and the on-disk checkout view the reconciler queries.

use crate::identity::PackageIdentity;

/// What a checkout is doing right now, as seen by the reconciler — an
/// edited working copy with an optional checked-out branch/revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditState {
    pub branch: Option<String>,
    pub revision: Option<String>,
}

/// The reconciler's view of on-disk checkout state. A real implementation
/// backs this with actual source-control queries; it is abstracted here
/// because fetching/cloning/git-plumbing is out of core (spec.md §1).
pub trait CheckoutView {
    fn exists(&self, identity: &PackageIdentity) -> bool;
    fn edit_state(&self, identity: &PackageIdentity) -> Option<EditState>;
    fn has_uncommitted_changes(&self, identity: &PackageIdentity) -> bool;
    fn has_unpushed_changes(&self, identity: &PackageIdentity) -> bool;
    fn branch_exists(&self, identity: &PackageIdentity, branch: &str) -> bool;
    fn revision_exists(&self, identity: &PackageIdentity, revision: &str) -> bool;
}

/// A simple in-memory [`CheckoutView`] for tests and for drivers that
/// track checkout state themselves rather than re-querying a VCS each
/// time.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckouts {
    pub existing: std::collections::HashSet<PackageIdentity>,
    pub edits: std::collections::HashMap<PackageIdentity, EditState>,
    pub uncommitted: std::collections::HashSet<PackageIdentity>,
    pub unpushed: std::collections::HashSet<PackageIdentity>,
    pub branches: std::collections::HashMap<PackageIdentity, std::collections::HashSet<String>>,
    pub revisions: std::collections::HashMap<PackageIdentity, std::collections::HashSet<String>>,
}

impl CheckoutView for MemoryCheckouts {
    fn exists(&self, identity: &PackageIdentity) -> bool {
        self.existing.contains(identity)
    }

    fn edit_state(&self, identity: &PackageIdentity) -> Option<EditState> {
        self.edits.get(identity).cloned()
    }

    fn has_uncommitted_changes(&self, identity: &PackageIdentity) -> bool {
        self.uncommitted.contains(identity)
    }

    fn has_unpushed_changes(&self, identity: &PackageIdentity) -> bool {
        self.unpushed.contains(identity)
    }

    fn branch_exists(&self, identity: &PackageIdentity, branch: &str) -> bool {
        self.branches.get(identity).map_or(false, |b| b.contains(branch))
    }

    fn revision_exists(&self, identity: &PackageIdentity, revision: &str) -> bool {
        self.revisions.get(identity).map_or(false, |r| r.contains(revision))
    }
}
