//! Test-only resolver harness: fixture builders plus an independent SAT
//! double-checker, grounded on the teacher's `resolver-tests` crate.

pub mod helpers;
pub mod sat;

use pkgresolve::container::{MemoryContainer, PackageContainer};
use pkgresolve::error::ResolverResult;
use pkgresolve::identity::PackageIdentity;
use pkgresolve::resolver::{resolve as core_resolve, CancellationToken, Solution};
use pkgresolve::version::Requirement;

pub use helpers::{dep, dep_req, pkg, pkg_at, pkg_dep, pkg_dep_at, registry};

/// Resolves `roots` against `reg`, with no pin hints.
pub fn resolve(roots: Vec<(&str, Requirement)>, reg: &dyn PackageContainer) -> ResolverResult<Solution> {
    let roots: Vec<(PackageIdentity, Requirement)> =
        roots.into_iter().map(|(n, r)| (PackageIdentity::from_raw(n), r)).collect();
    core_resolve(reg, &roots, &[], &CancellationToken::new())
}

/// Resolves `roots` and, on success, cross-checks the outcome against an
/// independent SAT encoding of `reg`'s dependency graph.
pub fn resolve_and_validated(
    roots: Vec<(&str, Requirement)>,
    reg: &MemoryContainer,
    sat_resolver: &mut sat::SatResolver<'_>,
) -> ResolverResult<Solution> {
    let solution = resolve(roots, reg)?;
    assert!(sat_resolver.check(&solution), "SAT double-checker rejected a resolution the solver accepted");
    Ok(solution)
}
