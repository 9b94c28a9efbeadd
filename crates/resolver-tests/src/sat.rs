//! Independent SAT-based double-checker for resolver output.
//!
//! Grounded on the teacher's `resolver-tests::sat::SatResolver`, which
//! re-encodes the registry as a boolean formula and checks the resolver's
//! answer against it via `varisat` rather than re-running the resolver's
//! own code. Re-encoding catches bugs a self-check using the resolver's
//! own term algebra would not.

use std::collections::HashMap;

use varisat::{CnfFormula, ExtendFormula, Lit, Solver, Var};

use pkgresolve::container::{MemoryContainer, PackageContainer, PinPoint};
use pkgresolve::identity::PackageIdentity;
use pkgresolve::resolver::{Decision, Solution};

pub struct SatResolver<'a> {
    container: &'a MemoryContainer,
}

impl<'a> SatResolver<'a> {
    pub fn new(container: &'a MemoryContainer) -> SatResolver<'a> {
        SatResolver { container }
    }

    /// Re-encodes the registry's version/dependency structure as CNF and
    /// checks that the decided assignment, asserted as unit clauses, is
    /// satisfiable against it.
    pub fn check(&self, solution: &Solution) -> bool {
        let mut vars: HashMap<(PackageIdentity, String), Lit> = HashMap::new();
        let mut next_index = 0usize;
        let mut formula = CnfFormula::new();

        for identity in self.container.identities() {
            let Ok(versions) = self.container.versions(identity) else { continue };
            let lits: Vec<Lit> = versions
                .iter()
                .map(|v| lit_for(&mut vars, &mut next_index, identity, &format!("v:{v}")))
                .collect();
            for i in 0..lits.len() {
                for j in (i + 1)..lits.len() {
                    formula.add_clause(&[!lits[i], !lits[j]]);
                }
            }
            for v in &versions {
                let point = PinPoint::Version(v.clone());
                let Ok(summary) = self.container.dependencies(identity, &point) else { continue };
                let self_lit = lit_for(&mut vars, &mut next_index, identity, &format!("v:{v}"));
                for (dep_ref, requirement) in summary.dependencies {
                    let dep_identity = dep_ref.identity();
                    let Ok(dep_versions) = self.container.versions(&dep_identity) else { continue };
                    let satisfying: Vec<Lit> = dep_versions
                        .iter()
                        .filter(|dv| requirement.to_version_set().contains_version(dv))
                        .map(|dv| lit_for(&mut vars, &mut next_index, &dep_identity, &format!("v:{dv}")))
                        .collect();
                    if satisfying.is_empty() {
                        // No registered version of the dependency can ever
                        // satisfy this edge; encode as an outright conflict.
                        formula.add_clause(&[!self_lit]);
                    } else {
                        let mut clause = vec![!self_lit];
                        clause.extend(satisfying);
                        formula.add_clause(&clause);
                    }
                }
            }
        }

        for (identity, decision) in &solution.decided {
            match decision {
                Decision::Version(v) => {
                    let lit = lit_for(&mut vars, &mut next_index, identity, &format!("v:{v}"));
                    formula.add_clause(&[lit]);
                }
                Decision::Opaque(_) => {
                    // Opaque (branch/revision) decisions have no sibling
                    // version candidates to disambiguate against; nothing
                    // further to encode beyond the edges already handled
                    // via the `Version` side above.
                }
            }
        }

        let mut solver = Solver::new();
        solver.add_formula(&formula);
        solver.solve().unwrap_or(false)
    }
}

fn lit_for(
    vars: &mut HashMap<(PackageIdentity, String), Lit>,
    next_index: &mut usize,
    identity: &PackageIdentity,
    token: &str,
) -> Lit {
    *vars.entry((identity.clone(), token.to_string())).or_insert_with(|| {
        let lit = Var::from_index(*next_index).positive();
        *next_index += 1;
        lit
    })
}
