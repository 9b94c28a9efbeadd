//! Closed-under-union/intersection/complement version sets.
//!
//! A [`VersionSetSpecifier`] is the disjunction-of-ranges encoding the spec
//! calls for, plus an [`OpaqueSet`] side for branch/revision exact pins,
//! which are equality-only and live in a disjoint domain from version
//! numbers. The two domains only interact through the universal
//! ("unconstrained") and empty sets, matching "cannot intersect with
//! ranges except the trivial cases" in spec.md §3.

use std::collections::BTreeSet;
use std::fmt;

use super::Version;

/// A half-open interval `[lo, hi)`. `hi = None` means unbounded above.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Interval {
    lo: Version,
    hi: Option<Version>,
}

/// A normal-form union of disjoint, non-adjacent `[lo, hi)` intervals,
/// sorted ascending by `lo`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RangeSet {
    intervals: Vec<Interval>,
}

impl RangeSet {
    pub fn empty() -> RangeSet {
        RangeSet { intervals: Vec::new() }
    }

    pub fn full() -> RangeSet {
        RangeSet {
            intervals: vec![Interval { lo: Version::new(0, 0, 0), hi: None }],
        }
    }

    pub fn half_open(lo: Version, hi: Version) -> RangeSet {
        if lo >= hi {
            return RangeSet::empty();
        }
        RangeSet { intervals: vec![Interval { lo, hi: Some(hi) }] }
    }

    pub fn at_least(lo: Version) -> RangeSet {
        RangeSet { intervals: vec![Interval { lo, hi: None }] }
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.intervals.len() == 1
            && self.intervals[0].lo == Version::new(0, 0, 0)
            && self.intervals[0].hi.is_none()
    }

    pub fn contains(&self, v: &Version) -> bool {
        self.intervals
            .iter()
            .any(|i| i.lo <= *v && i.hi.as_ref().map_or(true, |hi| v < hi))
    }

    pub fn union(&self, other: &RangeSet) -> RangeSet {
        let mut all: Vec<Interval> = self
            .intervals
            .iter()
            .cloned()
            .chain(other.intervals.iter().cloned())
            .collect();
        all.sort_by(|a, b| a.lo.cmp(&b.lo));
        let mut merged: Vec<Interval> = Vec::new();
        for iv in all {
            match merged.last_mut() {
                Some(last) if overlaps_or_touches(last, &iv) => {
                    last.hi = max_hi(&last.hi, &iv.hi);
                }
                _ => merged.push(iv),
            }
        }
        RangeSet { intervals: merged }
    }

    pub fn intersect(&self, other: &RangeSet) -> RangeSet {
        let mut result = Vec::new();
        for a in &self.intervals {
            for b in &other.intervals {
                let lo = a.lo.clone().max(b.lo.clone());
                let hi = min_hi(&a.hi, &b.hi);
                if hi.as_ref().map_or(true, |hi| lo < *hi) {
                    result.push(Interval { lo, hi });
                }
            }
        }
        result.sort_by(|a, b| a.lo.cmp(&b.lo));
        RangeSet { intervals: result }
    }

    pub fn complement(&self) -> RangeSet {
        let mut result = Vec::new();
        let mut cursor = Version::new(0, 0, 0);
        let mut cursor_is_start = true;
        for iv in &self.intervals {
            if cursor_is_start && iv.lo > cursor {
                result.push(Interval { lo: cursor.clone(), hi: Some(iv.lo.clone()) });
            } else if !cursor_is_start && iv.lo > cursor {
                result.push(Interval { lo: cursor.clone(), hi: Some(iv.lo.clone()) });
            }
            match &iv.hi {
                Some(hi) => {
                    cursor = hi.clone();
                    cursor_is_start = false;
                }
                None => return RangeSet { intervals: result },
            }
        }
        result.push(Interval { lo: cursor, hi: None });
        RangeSet { intervals: result }
    }

    pub fn difference(&self, other: &RangeSet) -> RangeSet {
        self.intersect(&other.complement())
    }

    pub fn relation(&self, other: &RangeSet) -> Relation {
        if self.intersect(other).is_empty() {
            return Relation::Disjoint;
        }
        if self.difference(other).is_empty() {
            return Relation::Subset;
        }
        Relation::Overlap
    }
}

fn overlaps_or_touches(a: &Interval, b: &Interval) -> bool {
    match &a.hi {
        None => true,
        Some(hi) => *hi >= b.lo,
    }
}

fn max_hi(a: &Option<Version>, b: &Option<Version>) -> Option<Version> {
    match (a, b) {
        (None, _) | (_, None) => None,
        (Some(x), Some(y)) => Some(x.clone().max(y.clone())),
    }
}

fn min_hi(a: &Option<Version>, b: &Option<Version>) -> Option<Version> {
    match (a, b) {
        (None, None) => None,
        (None, Some(x)) | (Some(x), None) => Some(x.clone()),
        (Some(x), Some(y)) => Some(x.clone().min(y.clone())),
    }
}

impl fmt::Display for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("<empty>");
        }
        if self.is_full() {
            return f.write_str("*");
        }
        let parts: Vec<String> = self
            .intervals
            .iter()
            .map(|iv| match &iv.hi {
                Some(hi) => format!(">={}, <{}", iv.lo, hi),
                None => format!(">={}", iv.lo),
            })
            .collect();
        f.write_str(&parts.join(" || "))
    }
}

/// A set of opaque tokens (branch names or revision hashes), supporting
/// complement via the standard include/exclude representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpaqueSet {
    Include(BTreeSet<String>),
    Exclude(BTreeSet<String>),
}

impl OpaqueSet {
    pub fn empty() -> OpaqueSet {
        OpaqueSet::Include(BTreeSet::new())
    }

    pub fn full() -> OpaqueSet {
        OpaqueSet::Exclude(BTreeSet::new())
    }

    pub fn singleton(token: impl Into<String>) -> OpaqueSet {
        let mut s = BTreeSet::new();
        s.insert(token.into());
        OpaqueSet::Include(s)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, OpaqueSet::Include(s) if s.is_empty())
    }

    pub fn contains(&self, token: &str) -> bool {
        match self {
            OpaqueSet::Include(s) => s.contains(token),
            OpaqueSet::Exclude(s) => !s.contains(token),
        }
    }

    pub fn complement(&self) -> OpaqueSet {
        match self {
            OpaqueSet::Include(s) => OpaqueSet::Exclude(s.clone()),
            OpaqueSet::Exclude(s) => OpaqueSet::Include(s.clone()),
        }
    }

    pub fn union(&self, other: &OpaqueSet) -> OpaqueSet {
        match (self, other) {
            (OpaqueSet::Include(a), OpaqueSet::Include(b)) => {
                OpaqueSet::Include(a.union(b).cloned().collect())
            }
            (OpaqueSet::Exclude(a), OpaqueSet::Exclude(b)) => {
                OpaqueSet::Exclude(a.intersection(b).cloned().collect())
            }
            (OpaqueSet::Include(inc), OpaqueSet::Exclude(exc))
            | (OpaqueSet::Exclude(exc), OpaqueSet::Include(inc)) => {
                OpaqueSet::Exclude(exc.difference(inc).cloned().collect())
            }
        }
    }

    pub fn intersect(&self, other: &OpaqueSet) -> OpaqueSet {
        match (self, other) {
            (OpaqueSet::Include(a), OpaqueSet::Include(b)) => {
                OpaqueSet::Include(a.intersection(b).cloned().collect())
            }
            (OpaqueSet::Exclude(a), OpaqueSet::Exclude(b)) => {
                OpaqueSet::Exclude(a.union(b).cloned().collect())
            }
            (OpaqueSet::Include(inc), OpaqueSet::Exclude(exc))
            | (OpaqueSet::Exclude(exc), OpaqueSet::Include(inc)) => {
                OpaqueSet::Include(inc.difference(exc).cloned().collect())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Subset,
    Disjoint,
    Overlap,
}

/// The full version-set algebra term: a union of numeric ranges and/or
/// opaque branch/revision tokens, or the universal "unconstrained" set
/// produced by an unversioned requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSetSpecifier {
    ranges: RangeSet,
    opaques: OpaqueSet,
    unconstrained: bool,
}

impl VersionSetSpecifier {
    pub fn empty() -> Self {
        VersionSetSpecifier { ranges: RangeSet::empty(), opaques: OpaqueSet::empty(), unconstrained: false }
    }

    pub fn full() -> Self {
        VersionSetSpecifier { ranges: RangeSet::empty(), opaques: OpaqueSet::empty(), unconstrained: true }
    }

    pub fn from_ranges(ranges: RangeSet) -> Self {
        VersionSetSpecifier { ranges, opaques: OpaqueSet::empty(), unconstrained: false }
    }

    pub fn from_opaque_token(token: impl Into<String>) -> Self {
        VersionSetSpecifier {
            ranges: RangeSet::empty(),
            opaques: OpaqueSet::singleton(token),
            unconstrained: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.unconstrained && self.ranges.is_empty() && self.opaques.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.unconstrained
    }

    pub fn contains_version(&self, v: &Version) -> bool {
        self.unconstrained || self.ranges.contains(v)
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.unconstrained || self.opaques.contains(token)
    }

    pub fn ranges(&self) -> &RangeSet {
        &self.ranges
    }

    /// The concrete opaque tokens this set names, if it is an `Include`
    /// set (as opposed to an `Exclude`/unconstrained-on-this-domain set,
    /// which cannot be enumerated).
    pub fn opaque_tokens(&self) -> Option<&BTreeSet<String>> {
        match &self.opaques {
            OpaqueSet::Include(s) if !self.unconstrained => Some(s),
            _ => None,
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        if self.unconstrained || other.unconstrained {
            return Self::full();
        }
        VersionSetSpecifier {
            ranges: self.ranges.union(&other.ranges),
            opaques: self.opaques.union(&other.opaques),
            unconstrained: false,
        }
    }

    pub fn intersect(&self, other: &Self) -> Self {
        if self.unconstrained {
            return other.clone();
        }
        if other.unconstrained {
            return self.clone();
        }
        VersionSetSpecifier {
            ranges: self.ranges.intersect(&other.ranges),
            opaques: self.opaques.intersect(&other.opaques),
            unconstrained: false,
        }
    }

    pub fn complement(&self) -> Self {
        if self.unconstrained {
            return Self::empty();
        }
        // complement(ranges ∪ opaques) = complement(ranges) ∩ complement(opaques),
        // each taken within the domain the other side cannot touch.
        let ranges_complement = VersionSetSpecifier {
            ranges: self.ranges.complement(),
            opaques: OpaqueSet::full(),
            unconstrained: false,
        };
        let opaques_complement = VersionSetSpecifier {
            ranges: RangeSet::full(),
            opaques: self.opaques.complement(),
            unconstrained: false,
        };
        ranges_complement.intersect(&opaques_complement)
    }

    pub fn difference(&self, other: &Self) -> Self {
        self.intersect(&other.complement())
    }

    pub fn relation(&self, other: &Self) -> Relation {
        if self.intersect(other).is_empty() {
            return Relation::Disjoint;
        }
        if self.difference(other).is_empty() {
            return Relation::Subset;
        }
        Relation::Overlap
    }
}

impl fmt::Display for VersionSetSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unconstrained {
            return f.write_str("*");
        }
        if self.is_empty() {
            return f.write_str("<empty>");
        }
        write!(f, "{}", self.ranges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::parse_version;

    fn v(s: &str) -> Version {
        parse_version(s).unwrap()
    }

    #[test]
    fn union_merges_overlapping_intervals() {
        let a = RangeSet::half_open(v("1.0.0"), v("2.0.0"));
        let b = RangeSet::half_open(v("1.5.0"), v("3.0.0"));
        let u = a.union(&b);
        assert!(u.contains(&v("1.0.0")));
        assert!(u.contains(&v("2.5.0")));
        assert!(!u.contains(&v("3.0.0")));
    }

    #[test]
    fn intersect_of_disjoint_ranges_is_empty() {
        let a = RangeSet::half_open(v("1.0.0"), v("2.0.0"));
        let b = RangeSet::half_open(v("2.0.0"), v("3.0.0"));
        assert!(a.intersect(&b).is_empty());
    }

    #[test]
    fn complement_of_full_is_empty() {
        assert!(RangeSet::full().complement().is_empty());
    }

    #[test]
    fn complement_round_trips() {
        let a = RangeSet::half_open(v("1.0.0"), v("2.0.0"));
        let comp = a.complement();
        assert!(!comp.contains(&v("1.5.0")));
        assert!(comp.contains(&v("2.0.0")));
        assert!(comp.contains(&v("0.5.0")));
        assert_eq!(comp.complement(), a);
    }

    #[test]
    fn opaque_sets_union_and_intersect() {
        let a = VersionSetSpecifier::from_opaque_token("main");
        let b = VersionSetSpecifier::from_opaque_token("dev");
        let u = a.union(&b);
        assert!(u.contains_token("main"));
        assert!(u.contains_token("dev"));
        assert!(!u.contains_token("release"));
        assert!(a.intersect(&b).is_empty());
    }

    #[test]
    fn unconstrained_intersect_is_identity() {
        let full = VersionSetSpecifier::full();
        let a = VersionSetSpecifier::from_ranges(RangeSet::half_open(v("1.0.0"), v("2.0.0")));
        assert_eq!(full.intersect(&a), a);
        assert_eq!(a.intersect(&full), a);
    }

    #[test]
    fn relation_subset() {
        let wide = VersionSetSpecifier::from_ranges(RangeSet::half_open(v("1.0.0"), v("3.0.0")));
        let narrow = VersionSetSpecifier::from_ranges(RangeSet::half_open(v("1.0.0"), v("2.0.0")));
        assert_eq!(narrow.relation(&wide), Relation::Subset);
    }
}
