//! [`ResolutionGraph`]: the materialized outcome of a resolution.
//!
//! Grounded on the teacher's `Resolve` (`core/resolver/resolve.rs`):
//! an arena graph keyed by package identity, generalized from
//! `PackageId`/`Dependency` to `PackageIdentity`/`Requirement` so cycles
//! (which can appear during exploratory resolution, spec.md §9) don't
//! require reference counting — edges are indices, never owning
//! references.
use std::collections::HashMap;

use crate::identity::PackageIdentity;
use crate::reference::PackageReference;
use crate::version::Requirement;

use super::partial_solution::Decision;
use super::solve::Solution;

#[derive(Debug, Clone)]
pub struct ResolutionGraph {
    nodes: Vec<PackageIdentity>,
    index: HashMap<PackageIdentity, usize>,
    decisions: HashMap<PackageIdentity, Decision>,
    edges: HashMap<usize, Vec<(usize, Requirement)>>,
    references: HashMap<PackageIdentity, PackageReference>,
    requirements: HashMap<PackageIdentity, Requirement>,
}

impl ResolutionGraph {
    /// `roots` are the workspace's own top-level requirements; `edges` are
    /// the `(from, to-reference, requirement)` triples discovered while
    /// deciding each package. Both contribute to the `references`/
    /// `requirements` provenance maps so `apply()` can fabricate a [`crate::pins::Pin`]
    /// for a package that was decided but never previously pinned.
    pub fn from_solution(
        solution: &Solution,
        roots: &[(PackageReference, Requirement)],
        edges: &[(PackageIdentity, PackageReference, Requirement)],
    ) -> ResolutionGraph {
        let mut nodes = Vec::new();
        let mut index = HashMap::new();
        let mut decisions = HashMap::new();
        for (identity, decision) in &solution.decided {
            index.entry(identity.clone()).or_insert_with(|| {
                nodes.push(identity.clone());
                nodes.len() - 1
            });
            decisions.insert(identity.clone(), decision.clone());
        }

        let mut references: HashMap<PackageIdentity, PackageReference> = HashMap::new();
        let mut requirements: HashMap<PackageIdentity, Requirement> = HashMap::new();
        for (reference, req) in roots {
            references.entry(reference.identity()).or_insert_with(|| reference.clone());
            requirements.entry(reference.identity()).or_insert_with(|| req.clone());
        }

        let mut graph_edges: HashMap<usize, Vec<(usize, Requirement)>> = HashMap::new();
        for (from, to_ref, req) in edges {
            let to = to_ref.identity();
            references.entry(to.clone()).or_insert_with(|| to_ref.clone());
            requirements.entry(to.clone()).or_insert_with(|| req.clone());
            let (Some(&fi), Some(&ti)) = (index.get(from), index.get(&to)) else { continue };
            graph_edges.entry(fi).or_default().push((ti, req.clone()));
        }
        ResolutionGraph { nodes, index, decisions, edges: graph_edges, references, requirements }
    }

    /// The `PackageReference` a decided identity was first discovered
    /// through — either a workspace root or a dependency edge — carrying
    /// enough provenance (kind/location) to fabricate a fresh [`crate::pins::Pin`].
    pub fn reference(&self, identity: &PackageIdentity) -> Option<&PackageReference> {
        self.references.get(identity)
    }

    pub fn requirement(&self, identity: &PackageIdentity) -> Option<&Requirement> {
        self.requirements.get(identity)
    }

    pub fn contains(&self, identity: &PackageIdentity) -> bool {
        self.index.contains_key(identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageIdentity> {
        self.nodes.iter()
    }

    /// Stable sort: by identity string, matching the pins-file and
    /// classifier output-stability requirements elsewhere in the spec.
    pub fn sort(&self) -> Vec<PackageIdentity> {
        let mut ids: Vec<PackageIdentity> = self.nodes.clone();
        ids.sort();
        ids
    }

    pub fn decision(&self, identity: &PackageIdentity) -> Option<&Decision> {
        self.decisions.get(identity)
    }

    pub fn deps(&self, identity: &PackageIdentity) -> Vec<(&PackageIdentity, &Requirement)> {
        let Some(&idx) = self.index.get(identity) else { return Vec::new() };
        self.edges
            .get(&idx)
            .into_iter()
            .flatten()
            .map(|(ti, req)| (&self.nodes[*ti], req))
            .collect()
    }

    /// Walks one path from `pkg` back toward the roots, following
    /// whichever incoming edge was recorded first for each ancestor.
    pub fn path_to_top(&self, pkg: &PackageIdentity) -> Vec<PackageIdentity> {
        let mut path = vec![pkg.clone()];
        let mut current = pkg.clone();
        loop {
            let parent = self
                .edges
                .iter()
                .find(|(_, outs)| outs.iter().any(|(ti, _)| self.nodes[*ti] == current))
                .map(|(from_idx, _)| self.nodes[*from_idx].clone());
            match parent {
                Some(p) if !path.contains(&p) => {
                    path.push(p.clone());
                    current = p;
                }
                _ => break,
            }
        }
        path
    }
}
