//! Durable `PackageIdentity -> Pin` store with v1/v2 schema migration.

mod schema;
mod store;

pub use store::{PinsLock, PinsStore};

use crate::identity::PackageIdentity;
use crate::reference::{PackageReference, ReferenceKind};

/// A pinned resolution outcome for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinState {
    Version { version: semver::Version, revision: Option<String> },
    Branch { name: String, revision: String },
    Revision { hash: String },
}

impl PinState {
    pub fn revision(&self) -> Option<&str> {
        match self {
            PinState::Version { revision, .. } => revision.as_deref(),
            PinState::Branch { revision, .. } => Some(revision),
            PinState::Revision { hash } => Some(hash),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    pub identity: PackageIdentity,
    pub kind: ReferenceKind,
    /// The upstream (unmirrored) location, as recorded in the lockfile.
    pub location: String,
    pub state: PinState,
}

impl Pin {
    pub fn from_reference(reference: &PackageReference, state: PinState) -> Pin {
        Pin {
            identity: reference.identity(),
            kind: reference.kind(),
            location: reference.location().unwrap_or_default().to_string(),
            state,
        }
    }
}
