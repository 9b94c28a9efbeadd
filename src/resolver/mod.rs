//! PubGrub-style conflict-driven version solver (spec.md §4.4).

mod graph;
mod incompatibility;
mod partial_solution;
mod solve;
mod term;

pub use graph::ResolutionGraph;
pub use incompatibility::{Cause, Incompatibility, IncompatibilityId, IncompatibilityStore};
pub use partial_solution::{Decision, PartialSolution};
pub use solve::{resolve, CancellationToken, Solution};
pub use term::{evaluate, Term, TermStatus};

use crate::container::{PackageContainer, PinPoint};
use crate::error::ResolverResult;
use crate::identity::PackageIdentity;
use crate::reference::PackageReference;
use crate::version::Requirement;

/// Runs the resolver and materializes its output into a
/// [`ResolutionGraph`], re-querying the container for the dependency edges
/// of every decided package so the graph carries provenance for
/// diagnostics (spec.md §4.4 "Dependency resolution graph").
pub fn resolve_with_graph(
    container: &dyn PackageContainer,
    roots: &[(PackageReference, Requirement)],
    pins: &[(PackageIdentity, PinPoint)],
    cancel: &CancellationToken,
) -> ResolverResult<ResolutionGraph> {
    let identity_roots: Vec<(PackageIdentity, Requirement)> =
        roots.iter().map(|(r, req)| (r.identity(), req.clone())).collect();
    let solution = solve::resolve(container, &identity_roots, pins, cancel)?;

    let mut edges = Vec::new();
    for (identity, decision) in &solution.decided {
        let point = match decision {
            Decision::Version(v) => PinPoint::Version(v.clone()),
            Decision::Opaque(hash) => PinPoint::Revision(hash.clone()),
        };
        let summary = container.dependencies(identity, &point)?;
        for (dep_ref, req) in summary.dependencies {
            edges.push((identity.clone(), dep_ref, req));
        }
    }

    Ok(ResolutionGraph::from_solution(&solution, roots, &edges))
}
