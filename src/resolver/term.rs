//! [`Term`]: `(PackageIdentity, VersionSetSpecifier, polarity)`.

use std::fmt;

use crate::identity::PackageIdentity;
use crate::version::{Relation, VersionSetSpecifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub identity: PackageIdentity,
    pub set: VersionSetSpecifier,
    pub positive: bool,
}

impl Term {
    pub fn positive(identity: PackageIdentity, set: VersionSetSpecifier) -> Term {
        Term { identity, set, positive: true }
    }

    pub fn negative(identity: PackageIdentity, set: VersionSetSpecifier) -> Term {
        Term { identity, set, positive: false }
    }

    /// The set of versions for which this term is true, regardless of
    /// polarity — the representation every other operation works against.
    pub fn truth_set(&self) -> VersionSetSpecifier {
        if self.positive {
            self.set.clone()
        } else {
            self.set.complement()
        }
    }

    /// Unions two terms about the same package into the single term that
    /// is true whenever either one was, used when resolving a conflicting
    /// incompatibility against its antecedent (spec.md §4.4, "merging the
    /// two incompatibility term sets, unioning version-sets on the shared
    /// package").
    pub fn union(&self, other: &Term) -> Term {
        debug_assert_eq!(self.identity, other.identity);
        Term::positive(self.identity.clone(), self.truth_set().union(&other.truth_set()))
    }

    pub fn negate(&self) -> Term {
        Term { identity: self.identity.clone(), set: self.set.clone(), positive: !self.positive }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermStatus {
    Satisfied,
    Contradicted,
    Undetermined,
}

/// Evaluates `term` against the accumulated `allowed` set for its package —
/// the intersection of every term asserted about that package so far.
pub fn evaluate(term: &Term, allowed: &VersionSetSpecifier) -> TermStatus {
    let truth = term.truth_set();
    if allowed.relation(&truth) == Relation::Subset {
        TermStatus::Satisfied
    } else if allowed.intersect(&truth).is_empty() {
        TermStatus::Contradicted
    } else {
        TermStatus::Undetermined
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.positive {
            write!(f, "{} in {}", self.identity, self.set)
        } else {
            write!(f, "{} not in {}", self.identity, self.set)
        }
    }
}
