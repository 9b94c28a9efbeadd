//! The PubGrub main loop: decision, unit propagation, conflict-driven
//! backjumping.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::container::{PackageContainer, PinPoint};
use crate::error::{ResolverError, ResolverResult};
use crate::identity::PackageIdentity;
use crate::version::{Requirement, Version, VersionSetSpecifier};

use super::incompatibility::{Cause, Incompatibility, IncompatibilityId, IncompatibilityStore};
use super::partial_solution::{AssignmentKind, Decision, PartialSolution};
use super::term::{self, Term, TermStatus};

/// Cooperative cancellation flag checked before each decision and
/// container call (spec.md §5).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn check(&self) -> ResolverResult<()> {
        if self.0.load(Ordering::SeqCst) {
            Err(ResolverError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub decided: Vec<(PackageIdentity, Decision)>,
}

enum PropagateOutcome {
    Quiescent,
    Conflict(IncompatibilityId),
}

enum ConflictOutcome {
    Backjumped,
    Unsat { derivation: String, sole_cause: Option<SoleCause> },
}

/// The single-package cause a derivation tree reduces to, when its whole
/// ancestry never mentions a second identity. Distinguishes "this package
/// alone has no candidate" from a genuine multi-package conflict (spec.md
/// §7, §8 S4).
enum SoleCause {
    NoAvailableVersion { identity: PackageIdentity, range: VersionSetSpecifier },
    ToolsVersionIncompatible { identity: PackageIdentity, version: String, required: String, have: String },
}

pub fn resolve(
    container: &dyn PackageContainer,
    roots: &[(PackageIdentity, Requirement)],
    pins: &[(PackageIdentity, PinPoint)],
    cancel: &CancellationToken,
) -> ResolverResult<Solution> {
    let mut store = IncompatibilityStore::new();
    let mut ps = PartialSolution::new();

    for (identity, req) in roots {
        ps.register(identity);
        store.add(Incompatibility::new(
            vec![Term::negative(identity.clone(), req.to_version_set())],
            Cause::Root,
        ));
        trace!(target: "pkgresolve::resolver", %identity, requirement = %req, "seeded root requirement");
    }

    // Pin prefetch (spec.md §4.4): eagerly decide packages whose pinned
    // state satisfies the root terms gathered so far. Backtracking treats
    // these exactly like any other decision if later contradicted.
    for (identity, point) in pins {
        cancel.check()?;
        if ps.is_decided(identity) {
            continue;
        }
        let allowed = ps.allowed(identity);
        let term = term_for_point(identity, point);
        if term::evaluate(&term, &allowed) != TermStatus::Contradicted {
            decide(&mut ps, &mut store, container, identity, point.clone())?;
            debug!(target: "pkgresolve::resolver", %identity, "prefetched pin as level-0 decision");
        }
    }

    loop {
        cancel.check()?;
        loop {
            match propagate(&mut ps, &store)? {
                PropagateOutcome::Quiescent => break,
                PropagateOutcome::Conflict(id) => match resolve_conflict(&mut ps, &mut store, id)? {
                    ConflictOutcome::Backjumped => continue,
                    ConflictOutcome::Unsat { derivation, sole_cause } => {
                        return Err(match sole_cause {
                            Some(SoleCause::NoAvailableVersion { identity, range }) => {
                                ResolverError::NoAvailableVersion { identity, range }
                            }
                            Some(SoleCause::ToolsVersionIncompatible { identity, version, required, have }) => {
                                ResolverError::ToolsVersionIncompatible { identity, version, required, have }
                            }
                            None => ResolverError::Unsatisfiable { derivation },
                        });
                    }
                },
            }
        }

        let Some(identity) = ps.next_undecided() else {
            break;
        };
        cancel.check()?;

        let allowed = ps.allowed(&identity);
        match pick_candidate(container, &identity, &allowed)? {
            PickOutcome::Found(point) => {
                decide(&mut ps, &mut store, container, &identity, point)?;
            }
            PickOutcome::ToolsIncompatible { version, required, have } => {
                store.add(Incompatibility::new(
                    vec![Term::positive(identity.clone(), allowed.clone())],
                    Cause::ToolsVersionIncompatible { version, required, have },
                ));
                // The next propagation pass will find this incompatibility
                // immediately satisfied (its one term already holds) and
                // route to conflict resolution.
            }
            PickOutcome::NotFound => {
                store.add(Incompatibility::new(
                    vec![Term::positive(identity.clone(), allowed.clone())],
                    Cause::NoAvailableVersion,
                ));
                // The next propagation pass will find this incompatibility
                // immediately satisfied (its one term already holds) and
                // route to conflict resolution.
            }
        }
    }

    Ok(Solution { decided: ps.decisions().map(|(id, d)| (id.clone(), d.clone())).collect() })
}

fn term_for_point(identity: &PackageIdentity, point: &PinPoint) -> Term {
    match point {
        PinPoint::Version(v) => Term::positive(identity.clone(), singleton(v)),
        PinPoint::Revision(hash) => {
            Term::positive(identity.clone(), VersionSetSpecifier::from_opaque_token(format!("rev:{hash}")))
        }
    }
}

fn singleton(v: &Version) -> VersionSetSpecifier {
    let mut hi = v.clone();
    hi.patch += 1;
    hi.pre = semver::Prerelease::EMPTY;
    hi.build = semver::BuildMetadata::EMPTY;
    VersionSetSpecifier::from_ranges(crate::version::RangeSet::half_open(v.clone(), hi))
}

enum PickOutcome {
    Found(PinPoint),
    ToolsIncompatible { version: String, required: String, have: String },
    NotFound,
}

fn pick_candidate(
    container: &dyn PackageContainer,
    identity: &PackageIdentity,
    allowed: &VersionSetSpecifier,
) -> ResolverResult<PickOutcome> {
    let mut tools_mismatch: Option<(String, String, String)> = None;

    // Range side: highest version, descending, satisfying `allowed` and
    // the tools-version gate.
    for v in container.versions(identity)? {
        if allowed.contains_version(&v) {
            let point = PinPoint::Version(v.clone());
            if container.is_tools_version_compatible(identity, &point) {
                return Ok(PickOutcome::Found(point));
            }
            if tools_mismatch.is_none() {
                if let Some((required, have)) = container.tools_version_mismatch(identity, &point) {
                    tools_mismatch = Some((v.to_string(), required, have));
                }
            }
        }
    }
    // Opaque side: `allowed` already names the exact branch/revision tokens
    // a dependency edge constrained this package to; resolve each to a
    // concrete revision through the container.
    if let Some(tokens) = allowed.opaque_tokens() {
        let mut sorted: Vec<&String> = tokens.iter().collect();
        sorted.sort();
        for token in sorted {
            let point = if let Some(branch) = token.strip_prefix("branch:") {
                let mut revisions = container
                    .revisions(identity, &Requirement::Branch(branch.to_string()))?
                    .into_iter();
                revisions.next().map(PinPoint::Revision)
            } else {
                token.strip_prefix("rev:").map(|hash| PinPoint::Revision(hash.to_string()))
            };
            if let Some(point) = point {
                if container.is_tools_version_compatible(identity, &point) {
                    return Ok(PickOutcome::Found(point));
                }
                if tools_mismatch.is_none() {
                    if let Some((required, have)) = container.tools_version_mismatch(identity, &point) {
                        let version = match &point {
                            PinPoint::Revision(hash) => hash.clone(),
                            PinPoint::Version(v) => v.to_string(),
                        };
                        tools_mismatch = Some((version, required, have));
                    }
                }
            }
        }
    }
    Ok(match tools_mismatch {
        Some((version, required, have)) => PickOutcome::ToolsIncompatible { version, required, have },
        None => PickOutcome::NotFound,
    })
}

fn decide(
    ps: &mut PartialSolution,
    store: &mut IncompatibilityStore,
    container: &dyn PackageContainer,
    identity: &PackageIdentity,
    point: PinPoint,
) -> ResolverResult<()> {
    let summary = container.dependencies(identity, &point)?;
    for (dep_ref, requirement) in summary.dependencies {
        let dep_identity = dep_ref.identity();
        ps.register(&dep_identity);
        let term_self = term_for_point(identity, &point);
        let term_dep = Term::negative(dep_identity.clone(), requirement.to_version_set());
        store.add(Incompatibility::new(
            vec![term_self, term_dep],
            Cause::Dependency { from: identity.clone() },
        ));
    }
    let decision = match &point {
        PinPoint::Version(v) => Decision::Version(v.clone()),
        PinPoint::Revision(hash) => Decision::Opaque(hash.clone()),
    };
    let term = term_for_point(identity, &point);
    ps.decide(identity, decision, term);
    Ok(())
}

fn propagate(ps: &mut PartialSolution, store: &IncompatibilityStore) -> ResolverResult<PropagateOutcome> {
    loop {
        let mut progressed = false;
        for (id, incompat) in store.iter() {
            let mut statuses: Vec<(Term, TermStatus)> = Vec::with_capacity(incompat.terms.len());
            let mut contradicted = false;
            for t in &incompat.terms {
                let allowed = ps.allowed(&t.identity);
                let status = term::evaluate(t, &allowed);
                if status == TermStatus::Contradicted {
                    contradicted = true;
                    break;
                }
                statuses.push((t.clone(), status));
            }
            if contradicted {
                continue;
            }
            let undetermined: Vec<&(Term, TermStatus)> =
                statuses.iter().filter(|(_, s)| *s == TermStatus::Undetermined).collect();
            if undetermined.is_empty() {
                return Ok(PropagateOutcome::Conflict(id));
            }
            if undetermined.len() == 1 {
                let remaining = undetermined[0].0.clone();
                let before = ps.allowed(&remaining.identity);
                ps.derive(remaining.negate(), id);
                let after = ps.allowed(&remaining.identity);
                if before != after {
                    progressed = true;
                }
            }
        }
        if !progressed {
            return Ok(PropagateOutcome::Quiescent);
        }
    }
}

fn level_of(ps: &PartialSolution, identity: &PackageIdentity) -> usize {
    ps.assignments()
        .iter()
        .rev()
        .find(|a| a.term.identity == *identity)
        .map(|a| a.level)
        .unwrap_or(0)
}

fn merge_duplicate_terms(terms: Vec<Term>) -> Vec<Term> {
    let mut merged: HashMap<PackageIdentity, Term> = HashMap::new();
    for t in terms {
        merged
            .entry(t.identity.clone())
            .and_modify(|existing| {
                *existing = Term::positive(t.identity.clone(), existing.truth_set().intersect(&t.truth_set()))
            })
            .or_insert(t);
    }
    merged.into_values().collect()
}

fn resolve_conflict(
    ps: &mut PartialSolution,
    store: &mut IncompatibilityStore,
    conflict_id: IncompatibilityId,
) -> ResolverResult<ConflictOutcome> {
    let mut current_id = conflict_id;
    loop {
        let current = store.get(current_id).clone();
        if current.is_empty() {
            return Ok(ConflictOutcome::Unsat {
                derivation: derivation_chain(store, current_id),
                sole_cause: sole_cause(store, current_id),
            });
        }

        let current_level = ps.current_level();
        let levels: Vec<(PackageIdentity, usize)> =
            current.terms.iter().map(|t| (t.identity.clone(), level_of(ps, &t.identity))).collect();
        let at_current: Vec<&(PackageIdentity, usize)> =
            levels.iter().filter(|(_, l)| *l == current_level).collect();

        if at_current.len() <= 1 {
            let second_highest =
                levels.iter().map(|(_, l)| *l).filter(|l| *l != current_level).max().unwrap_or(0);
            let new_id = store.add(current.clone());
            ps.backtrack_to(second_highest);
            if let Some((sole_identity, _)) = at_current.first() {
                let sole_term = current.term_for(sole_identity).unwrap().clone();
                ps.derive(sole_term.negate(), new_id);
            }
            return Ok(ConflictOutcome::Backjumped);
        }

        let found = current.terms.iter().find_map(|t| {
            ps.assignments().iter().enumerate().rev().find(|(_, a)| {
                matches!(a.kind, AssignmentKind::Derivation { .. }) && a.term.identity == t.identity
            })
        });
        let Some((_, entry)) = found else {
            return Ok(ConflictOutcome::Unsat {
                derivation: derivation_chain(store, current_id),
                sole_cause: sole_cause(store, current_id),
            });
        };
        let AssignmentKind::Derivation { antecedent } = entry.kind else { unreachable!() };
        let shared_identity = entry.term.identity.clone();
        let antecedent_incompat = store.get(antecedent).clone();

        let t_current = current.term_for(&shared_identity).cloned();
        let t_ante = antecedent_incompat.term_for(&shared_identity).cloned();

        let mut new_terms: Vec<Term> =
            current.terms.iter().filter(|t| t.identity != shared_identity).cloned().collect();
        new_terms.extend(antecedent_incompat.terms.iter().filter(|t| t.identity != shared_identity).cloned());

        if let (Some(a), Some(b)) = (t_current, t_ante) {
            let merged = a.union(&b);
            if !merged.set.is_full() {
                new_terms.push(merged);
            }
        }
        let new_terms = merge_duplicate_terms(new_terms);
        let new_incompat =
            Incompatibility::new(new_terms, Cause::Conflict { a: current_id, b: antecedent });
        current_id = store.add(new_incompat);
    }
}

/// Walks the derivation tree rooted at `id` and, if every incompatibility
/// in it mentions only one identity, returns the leaf cause for that
/// identity. A `Dependency`-caused incompatibility always carries terms for
/// two distinct identities (the deciding package and the dependency it
/// names), so any chain that reaches a second identity is a genuine
/// multi-package conflict and correctly yields `None` here.
fn sole_cause(store: &IncompatibilityStore, id: IncompatibilityId) -> Option<SoleCause> {
    let mut identities = std::collections::HashSet::new();
    let mut leaves: Vec<IncompatibilityId> = Vec::new();
    let mut visited = std::collections::HashSet::new();
    collect_leaves(store, id, &mut identities, &mut leaves, &mut visited);
    if identities.len() != 1 {
        return None;
    }
    let identity = identities.into_iter().next().unwrap();
    for leaf_id in leaves {
        let incompat = store.get(leaf_id);
        match &incompat.cause {
            Cause::NoAvailableVersion => {
                if let Some(term) = incompat.term_for(&identity) {
                    return Some(SoleCause::NoAvailableVersion { identity: identity.clone(), range: term.truth_set() });
                }
            }
            Cause::ToolsVersionIncompatible { version, required, have } => {
                return Some(SoleCause::ToolsVersionIncompatible {
                    identity: identity.clone(),
                    version: version.clone(),
                    required: required.clone(),
                    have: have.clone(),
                });
            }
            _ => {}
        }
    }
    None
}

fn collect_leaves(
    store: &IncompatibilityStore,
    id: IncompatibilityId,
    identities: &mut std::collections::HashSet<PackageIdentity>,
    leaves: &mut Vec<IncompatibilityId>,
    visited: &mut std::collections::HashSet<IncompatibilityId>,
) {
    if !visited.insert(id) {
        return;
    }
    let incompat = store.get(id);
    for t in &incompat.terms {
        identities.insert(t.identity.clone());
    }
    match &incompat.cause {
        Cause::Conflict { a, b } => {
            collect_leaves(store, *a, identities, leaves, visited);
            collect_leaves(store, *b, identities, leaves, visited);
        }
        _ => leaves.push(id),
    }
}

fn derivation_chain(store: &IncompatibilityStore, id: IncompatibilityId) -> String {
    let mut lines = Vec::new();
    let mut visited = std::collections::HashSet::new();
    derivation_chain_inner(store, id, &mut lines, &mut visited);
    lines.join("\n")
}

fn derivation_chain_inner(
    store: &IncompatibilityStore,
    id: IncompatibilityId,
    lines: &mut Vec<String>,
    visited: &mut std::collections::HashSet<IncompatibilityId>,
) {
    if !visited.insert(id) {
        return;
    }
    let incompat = store.get(id);
    match &incompat.cause {
        Cause::Root => lines.push(format!("root requires {}", incompat)),
        Cause::NoAvailableVersion => lines.push(format!("no available version satisfies {}", incompat)),
        Cause::ToolsVersionIncompatible { version, required, have } => lines.push(format!(
            "no tools-compatible version satisfies {} ({version} needs tools {required}, have {have})",
            incompat
        )),
        Cause::Dependency { from } => lines.push(format!("{from} requires {}", incompat)),
        Cause::Conflict { a, b } => {
            derivation_chain_inner(store, *a, lines, visited);
            derivation_chain_inner(store, *b, lines, visited);
            lines.push(format!("therefore {}", incompat));
        }
    }
}
