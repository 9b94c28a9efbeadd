//! [`Incompatibility`]: a conjunction of terms known to be unsatisfiable.

use std::fmt;

use crate::identity::PackageIdentity;

use super::term::Term;

pub type IncompatibilityId = usize;

#[derive(Debug, Clone)]
pub enum Cause {
    Root,
    Dependency { from: PackageIdentity },
    Conflict { a: IncompatibilityId, b: IncompatibilityId },
    NoAvailableVersion,
    ToolsVersionIncompatible { version: String, required: String, have: String },
}

#[derive(Debug, Clone)]
pub struct Incompatibility {
    pub terms: Vec<Term>,
    pub cause: Cause,
}

impl Incompatibility {
    pub fn new(terms: Vec<Term>, cause: Cause) -> Incompatibility {
        Incompatibility { terms, cause }
    }

    pub fn term_for(&self, identity: &PackageIdentity) -> Option<&Term> {
        self.terms.iter().find(|t| &t.identity == identity)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl fmt::Display for Incompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str("<contradiction>");
        }
        let parts: Vec<String> = self.terms.iter().map(|t| t.to_string()).collect();
        write!(f, "not ({})", parts.join(" and "))
    }
}

/// A store of every incompatibility derived so far, indexed by
/// [`IncompatibilityId`] (its position in insertion order) so conflict
/// resolution can reference antecedents cheaply.
#[derive(Debug, Clone, Default)]
pub struct IncompatibilityStore {
    incompatibilities: Vec<Incompatibility>,
}

impl IncompatibilityStore {
    pub fn new() -> IncompatibilityStore {
        IncompatibilityStore::default()
    }

    pub fn add(&mut self, incompat: Incompatibility) -> IncompatibilityId {
        self.incompatibilities.push(incompat);
        self.incompatibilities.len() - 1
    }

    pub fn get(&self, id: IncompatibilityId) -> &Incompatibility {
        &self.incompatibilities[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = (IncompatibilityId, &Incompatibility)> {
        self.incompatibilities.iter().enumerate()
    }
}
