//! Workspace reconciler: loads pins, drives resolution, reconciles the
//! outcome against on-disk checkouts, and manages edit mode (spec.md §4.5).
//!
//! State machine: `Idle -> Loaded -> Resolving -> Resolved -> Applied`.
//! Each step is a distinct method rather than one `run()` call so a CLI
//! (or a future IDE integration) can stop after `resolve()` to show a
//! diff before committing it with `apply()`.

mod edit;

pub use edit::{CheckoutView, EditState, MemoryCheckouts};

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::container::PackageContainer;
use crate::error::{ResolverError, ResolverResult};
use crate::identity::PackageIdentity;
use crate::mirrors::Mirrors;
use crate::pins::{Pin, PinState, PinsLock, PinsStore};
use crate::reference::{PackageReference, ReferenceKind};
use crate::resolver::{resolve_with_graph, CancellationToken, Decision, ResolutionGraph};
use crate::version::Requirement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Loaded,
    Resolving,
    Resolved,
    Applied,
}

/// A condition surfaced while reconciling resolved pins against checkouts.
/// Unlike [`ResolverError`], none of these abort `apply` on their own —
/// the caller decides whether to treat them as fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A resolved dependency has no checkout on disk yet.
    MissingCheckout { identity: PackageIdentity },
    /// A checkout is in edit mode on a branch other than the one resolved.
    EditModeBranchMismatch {
        identity: PackageIdentity,
        resolved: String,
        checked_out: Option<String>,
    },
    /// A checkout is in edit mode but the workspace has no record of it
    /// being placed there (e.g. a manual `git checkout` by the user).
    UnmanagedEdit { identity: PackageIdentity },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingCheckout { identity } => {
                write!(f, "'{identity}' is resolved but has no checkout on disk")
            }
            Diagnostic::EditModeBranchMismatch { identity, resolved, checked_out } => write!(
                f,
                "'{identity}' is checked out on {} but resolution expects {resolved}",
                checked_out.as_deref().unwrap_or("an unknown branch")
            ),
            Diagnostic::UnmanagedEdit { identity } => {
                write!(f, "'{identity}' is in edit mode outside of workspace tracking")
            }
        }
    }
}

/// Drives one workspace's pins through resolution and back onto disk.
pub struct Reconciler<'a> {
    state: State,
    pins_path: PathBuf,
    mirrors: Mirrors,
    container: &'a dyn PackageContainer,
    checkouts: &'a dyn CheckoutView,
    pins: PinsStore,
    roots: Vec<(PackageReference, Requirement)>,
    graph: Option<ResolutionGraph>,
    edits: HashMap<PackageIdentity, EditState>,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        pins_path: impl Into<PathBuf>,
        mirrors: Mirrors,
        container: &'a dyn PackageContainer,
        checkouts: &'a dyn CheckoutView,
        roots: Vec<(PackageReference, Requirement)>,
    ) -> Reconciler<'a> {
        Reconciler {
            state: State::Idle,
            pins_path: pins_path.into(),
            mirrors,
            container,
            checkouts,
            pins: PinsStore::new(),
            roots,
            graph: None,
            edits: HashMap::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn pins(&self) -> &PinsStore {
        &self.pins
    }

    pub fn graph(&self) -> Option<&ResolutionGraph> {
        self.graph.as_ref()
    }

    /// Reads the pins file (under an exclusive lock held only for the
    /// duration of the load) into memory. `Idle -> Loaded`.
    pub fn load(&mut self) -> ResolverResult<()> {
        let dir = self.pins_path.parent().unwrap_or_else(|| Path::new("."));
        let lock = PinsLock::acquire(dir)?;
        self.pins = PinsStore::load(&self.pins_path, &lock)?;
        self.state = State::Loaded;
        Ok(())
    }

    /// Runs the resolver against the loaded pins as prefetch hints.
    /// `Loaded -> Resolving -> Resolved`.
    pub fn resolve(&mut self, cancel: &CancellationToken) -> ResolverResult<()> {
        let pin_hints: Vec<_> =
            self.pins.iter().map(|pin| (pin.identity.clone(), pin_point(pin))).collect();
        self.resolve_with_hints(cancel, &pin_hints)
    }

    /// Re-resolves from scratch, discarding any loaded pins as hints
    /// (spec.md §6 `update`) — every package is re-picked from the
    /// container's current highest-priority candidate rather than sticking
    /// near whatever was previously pinned.
    pub fn update(&mut self, cancel: &CancellationToken) -> ResolverResult<()> {
        self.resolve_with_hints(cancel, &[])
    }

    fn resolve_with_hints(
        &mut self,
        cancel: &CancellationToken,
        pin_hints: &[(PackageIdentity, crate::container::PinPoint)],
    ) -> ResolverResult<()> {
        self.state = State::Resolving;
        let graph = resolve_with_graph(self.container, &self.roots, pin_hints, cancel)?;
        self.graph = Some(graph);
        self.state = State::Resolved;
        Ok(())
    }

    /// Compares the resolved graph against checkout state without writing
    /// anything. Always callable once `resolve` has run.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let Some(graph) = &self.graph else { return Vec::new() };
        let mut out = Vec::new();
        for identity in graph.sort() {
            if !self.checkouts.exists(&identity) {
                out.push(Diagnostic::MissingCheckout { identity: identity.clone() });
                continue;
            }
            let Some(edit_state) = self.checkouts.edit_state(&identity) else { continue };
            if !self.edits.contains_key(&identity) {
                out.push(Diagnostic::UnmanagedEdit { identity: identity.clone() });
                continue;
            }
            if let Some(Decision::Opaque(resolved)) = graph.decision(&identity) {
                let checked_out = edit_state.branch.clone().or_else(|| edit_state.revision.clone());
                if checked_out.as_deref() != Some(resolved.as_str()) {
                    out.push(Diagnostic::EditModeBranchMismatch {
                        identity: identity.clone(),
                        resolved: resolved.clone(),
                        checked_out,
                    });
                }
            }
        }
        out
    }

    /// Persists the resolved graph as pins, replacing whatever was loaded.
    /// `Resolved -> Applied`.
    pub fn apply(&mut self) -> ResolverResult<()> {
        let graph = self.graph.as_ref().ok_or_else(|| ResolverError::MalformedLockfile {
            path: self.pins_path.clone(),
            reason: "apply called before resolve produced a graph".into(),
        })?;

        let mut next = PinsStore::new();
        for identity in graph.sort() {
            let Some(decision) = graph.decision(&identity) else { continue };
            if let Some(existing) = self.pins.get(&identity) {
                next.pin(rebuild_pin(existing, decision));
            } else if let Some(reference) = graph.reference(&identity) {
                let state = fresh_pin_state(graph.requirement(&identity), decision);
                next.pin(Pin::from_reference(reference, state));
            } else {
                warn!(
                    target: "pkgresolve::reconciler",
                    "'{identity}' resolved with no prior pin and no known reference to source kind/location from; dropping from pins"
                );
            }
        }
        self.pins = next;

        let dir = self.pins_path.parent().unwrap_or_else(|| Path::new("."));
        let lock = PinsLock::acquire(dir)?;
        self.pins.save(&self.pins_path, &self.mirrors, &lock)?;
        self.state = State::Applied;
        info!(target: "pkgresolve::reconciler", "applied resolution to {}", self.pins_path.display());
        Ok(())
    }

    /// Places a dependency into edit mode on `branch`, at `revision`, or
    /// (if both are omitted) on whatever's currently checked out. Fails if
    /// a named branch already exists, a named revision doesn't, or the
    /// checkout is missing (spec.md §4.5 `enter-edit(identity, branch?,
    /// revision?)`).
    pub fn enter_edit(
        &mut self,
        identity: &PackageIdentity,
        branch: Option<&str>,
        revision: Option<&str>,
    ) -> ResolverResult<()> {
        if !self.checkouts.exists(identity) {
            return Err(ResolverError::DependencyMissing {
                name: identity.to_string(),
                origin: self.pins.get(identity).map(|p| p.location.clone()).unwrap_or_default(),
            });
        }
        if let Some(branch) = branch {
            if self.checkouts.branch_exists(identity, branch) {
                return Err(ResolverError::BranchAlreadyExists { name: branch.to_string() });
            }
        }
        if let Some(revision) = revision {
            if !self.checkouts.revision_exists(identity, revision) {
                return Err(ResolverError::RevisionDoesNotExist { hex: revision.to_string() });
            }
        }
        self.edits.insert(
            identity.clone(),
            EditState { branch: branch.map(str::to_string), revision: revision.map(str::to_string) },
        );
        Ok(())
    }

    /// Leaves edit mode for a dependency, refusing if there are
    /// uncommitted or unpushed changes the caller hasn't acknowledged.
    pub fn leave_edit(&mut self, identity: &PackageIdentity, force: bool) -> ResolverResult<()> {
        if !self.edits.contains_key(identity) {
            return Err(ResolverError::DependencyNotInEditMode { name: identity.to_string() });
        }
        if !force {
            if self.checkouts.has_uncommitted_changes(identity) {
                let origin = self.pins.get(identity).map(|p| PathBuf::from(&p.location)).unwrap_or_default();
                return Err(ResolverError::UncommitedChanges { path: origin });
            }
            if self.checkouts.has_unpushed_changes(identity) {
                let origin = self.pins.get(identity).map(|p| PathBuf::from(&p.location)).unwrap_or_default();
                return Err(ResolverError::UnpushedChanges { path: origin });
            }
        }
        self.edits.remove(identity);
        Ok(())
    }

    pub fn is_in_edit_mode(&self, identity: &PackageIdentity) -> bool {
        self.edits.contains_key(identity)
    }
}

fn pin_point(pin: &Pin) -> crate::container::PinPoint {
    use crate::container::PinPoint;
    match &pin.state {
        PinState::Version { version, .. } => PinPoint::Version(version.clone()),
        PinState::Branch { revision, .. } | PinState::Revision { hash: revision } => {
            PinPoint::Revision(revision.clone())
        }
    }
}

/// Builds the [`PinState`] for a package decided during resolution that had
/// no prior pin, so [`Pin::from_reference`] has something to attach to the
/// reference it recovered from the graph.
fn fresh_pin_state(requirement: Option<&Requirement>, decision: &Decision) -> PinState {
    match decision {
        Decision::Version(version) => PinState::Version { version: version.clone(), revision: None },
        Decision::Opaque(revision) => match requirement {
            Some(Requirement::Branch(name)) => PinState::Branch { name: name.clone(), revision: revision.clone() },
            _ => PinState::Revision { hash: revision.clone() },
        },
    }
}

fn rebuild_pin(existing: &Pin, decision: &Decision) -> Pin {
    let state = match decision {
        Decision::Version(version) => PinState::Version {
            version: version.clone(),
            revision: existing.state.revision().map(str::to_string),
        },
        Decision::Opaque(revision) => match &existing.state {
            PinState::Branch { name, .. } => {
                PinState::Branch { name: name.clone(), revision: revision.clone() }
            }
            _ => PinState::Revision { hash: revision.clone() },
        },
    };
    Pin {
        identity: existing.identity.clone(),
        kind: existing.kind,
        location: existing.location.clone(),
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::PinPoint;
    use crate::reference::PackageReference;
    use crate::version::Version;
    use std::collections::BTreeSet;

    struct SingleVersionContainer;

    impl PackageContainer for SingleVersionContainer {
        fn versions(&self, _identity: &PackageIdentity) -> ResolverResult<Vec<Version>> {
            Ok(vec![crate::version::parse_version("1.0.0").unwrap()])
        }

        fn revisions(
            &self,
            _identity: &PackageIdentity,
            _requirement: &Requirement,
        ) -> ResolverResult<BTreeSet<String>> {
            Ok(BTreeSet::new())
        }

        fn dependencies(
            &self,
            identity: &PackageIdentity,
            at: &PinPoint,
        ) -> ResolverResult<crate::container::Summary> {
            Ok(crate::container::Summary { identity: identity.clone(), at: at.clone(), dependencies: Vec::new() })
        }
    }

    #[test]
    fn load_resolve_apply_round_trips_through_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        let pins_path = dir.path().join("pins.json");
        let container = SingleVersionContainer;
        let checkouts = MemoryCheckouts::default();
        let foo = PackageIdentity::from_raw("foo");
        let roots = vec![(
            PackageReference::Registry { identity: foo.clone() },
            Requirement::Range(crate::version::VersionSetSpecifier::full()),
        )];
        let mut reconciler =
            Reconciler::new(&pins_path, Mirrors::new(), &container, &checkouts, roots);

        reconciler.load().unwrap();
        assert_eq!(reconciler.state(), State::Loaded);
        reconciler.resolve(&CancellationToken::new()).unwrap();
        assert_eq!(reconciler.state(), State::Resolved);

        // No prior pin for `foo`; `apply` fabricates one from the root's
        // `PackageReference` now that it carries enough provenance to do so.
        reconciler.apply().unwrap();
        assert_eq!(reconciler.state(), State::Applied);
        let pin = reconciler.pins().get(&foo).expect("foo should be pinned after apply");
        match &pin.state {
            PinState::Version { version, .. } => assert_eq!(version.to_string(), "1.0.0"),
            other => panic!("expected a version pin, got {other:?}"),
        }
    }

    #[test]
    fn enter_edit_rejects_missing_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let pins_path = dir.path().join("pins.json");
        let container = SingleVersionContainer;
        let checkouts = MemoryCheckouts::default();
        let mut reconciler =
            Reconciler::new(&pins_path, Mirrors::new(), &container, &checkouts, Vec::new());
        let err = reconciler
            .enter_edit(&PackageIdentity::from_raw("foo"), Some("my-branch"), None)
            .unwrap_err();
        assert!(matches!(err, ResolverError::DependencyMissing { .. }));
    }

    #[test]
    fn leave_edit_without_enter_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pins_path = dir.path().join("pins.json");
        let container = SingleVersionContainer;
        let checkouts = MemoryCheckouts::default();
        let mut reconciler =
            Reconciler::new(&pins_path, Mirrors::new(), &container, &checkouts, Vec::new());
        let err = reconciler
            .leave_edit(&PackageIdentity::from_raw("foo"), false)
            .unwrap_err();
        assert!(matches!(err, ResolverError::DependencyNotInEditMode { .. }));
    }
}
