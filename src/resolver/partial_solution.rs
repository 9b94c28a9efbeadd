//! [`PartialSolution`]: an assignment list plus derived indexes.

use indexmap::IndexMap;

use crate::identity::PackageIdentity;
use crate::version::VersionSetSpecifier;

use super::incompatibility::IncompatibilityId;
use super::term::Term;

#[derive(Debug, Clone)]
pub enum AssignmentKind {
    Decision,
    Derivation { antecedent: IncompatibilityId },
}

#[derive(Debug, Clone)]
pub struct AssignmentEntry {
    pub term: Term,
    pub level: usize,
    pub kind: AssignmentKind,
    /// Set when `kind` is `Decision`, so a backtrack can rebuild the
    /// decided-map without re-deriving a concrete point from a term.
    pub decision: Option<Decision>,
}

/// A concrete point a package can be decided at: either a version (for
/// range requirements) or an opaque branch/revision token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Version(crate::version::Version),
    Opaque(String),
}

#[derive(Debug, Clone, Default)]
pub struct PartialSolution {
    assignments: Vec<AssignmentEntry>,
    /// Accumulated (intersected) allowed set per package, in the order the
    /// package was first referenced — this insertion order is the
    /// tie-break spec.md §4.4 requires for determinism.
    allowed: IndexMap<PackageIdentity, VersionSetSpecifier>,
    decided: IndexMap<PackageIdentity, Decision>,
    level: usize,
}

impl PartialSolution {
    pub fn new() -> PartialSolution {
        PartialSolution::default()
    }

    pub fn current_level(&self) -> usize {
        self.level
    }

    /// Ensures `identity` has an accumulated-term slot, preserving the
    /// order packages are first mentioned in.
    pub fn register(&mut self, identity: &PackageIdentity) {
        self.allowed
            .entry(identity.clone())
            .or_insert_with(VersionSetSpecifier::full);
    }

    pub fn allowed(&self, identity: &PackageIdentity) -> VersionSetSpecifier {
        self.allowed.get(identity).cloned().unwrap_or_else(VersionSetSpecifier::full)
    }

    pub fn is_decided(&self, identity: &PackageIdentity) -> bool {
        self.decided.contains_key(identity)
    }

    pub fn decision(&self, identity: &PackageIdentity) -> Option<&Decision> {
        self.decided.get(identity)
    }

    pub fn decisions(&self) -> impl Iterator<Item = (&PackageIdentity, &Decision)> {
        self.decided.iter()
    }

    /// The next undecided package with a registered (positive) term, in
    /// first-referenced order.
    pub fn next_undecided(&self) -> Option<PackageIdentity> {
        self.allowed.keys().find(|id| !self.decided.contains_key(*id)).cloned()
    }

    fn assert(&mut self, term: Term) {
        self.register(&term.identity);
        let merged = self.allowed(&term.identity).intersect(&term.truth_set());
        self.allowed.insert(term.identity.clone(), merged);
    }

    pub fn decide(&mut self, identity: &PackageIdentity, decision: Decision, term: Term) {
        self.level += 1;
        self.assert(term.clone());
        self.decided.insert(identity.clone(), decision.clone());
        self.assignments.push(AssignmentEntry {
            term,
            level: self.level,
            kind: AssignmentKind::Decision,
            decision: Some(decision),
        });
    }

    pub fn derive(&mut self, term: Term, antecedent: IncompatibilityId) {
        self.assert(term.clone());
        self.assignments.push(AssignmentEntry {
            term,
            level: self.level,
            kind: AssignmentKind::Derivation { antecedent },
            decision: None,
        });
    }

    pub fn assignments(&self) -> &[AssignmentEntry] {
        &self.assignments
    }

    /// Undoes every assignment above `target_level`, recomputing the
    /// accumulated sets and decided map from the retained prefix. Used by
    /// conflict-resolution backjumping.
    pub fn backtrack_to(&mut self, target_level: usize) {
        self.assignments.retain(|a| a.level <= target_level);
        self.level = target_level;
        self.allowed.clear();
        self.decided.clear();
        let retained = std::mem::take(&mut self.assignments);
        for entry in &retained {
            self.assert(entry.term.clone());
            if let (AssignmentKind::Decision, Some(decision)) = (&entry.kind, &entry.decision) {
                self.decided.insert(entry.term.identity.clone(), decision.clone());
            }
        }
        self.assignments = retained;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::parse_version;

    #[test]
    fn decide_then_backtrack_restores_prior_state() {
        let mut ps = PartialSolution::new();
        let foo = PackageIdentity::from_raw("foo");
        ps.register(&foo);
        assert_eq!(ps.current_level(), 0);

        let v = parse_version("1.0.0").unwrap();
        let term = Term::positive(
            foo.clone(),
            VersionSetSpecifier::from_ranges(crate::version::RangeSet::half_open(
                v.clone(),
                parse_version("1.0.1").unwrap(),
            )),
        );
        ps.decide(&foo, Decision::Version(v), term);
        assert!(ps.is_decided(&foo));
        assert_eq!(ps.current_level(), 1);

        ps.backtrack_to(0);
        assert!(!ps.is_decided(&foo));
        assert_eq!(ps.current_level(), 0);
    }
}
