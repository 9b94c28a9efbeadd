//! Crate-wide error taxonomy.
//!
//! Every kind reported by the resolver, pins store, reconciler and
//! classifier funnels through [`ResolverError`]. Library code returns
//! [`ResolverResult`]; only the CLI binary converts into `anyhow::Error`.

use std::path::PathBuf;

use thiserror::Error;

use crate::identity::PackageIdentity;
use crate::version::VersionSetSpecifier;

pub type ResolverResult<T> = Result<T, ResolverError>;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("{path}: corrupted or malformed; fix or delete to continue: {reason}")]
    MalformedLockfile { path: PathBuf, reason: String },

    #[error("dependencies could not be resolved:\n{derivation}")]
    Unsatisfiable { derivation: String },

    #[error("no versions of '{identity}' match requirement {range}")]
    NoAvailableVersion {
        identity: PackageIdentity,
        range: VersionSetSpecifier,
    },

    #[error(
        "'{identity}' {version} requires tools version {required}, but the current tools version is {have}"
    )]
    ToolsVersionIncompatible {
        identity: PackageIdentity,
        version: String,
        required: String,
        have: String,
    },

    #[error("the working copy for '{path}' has uncommitted changes")]
    UncommitedChanges { path: PathBuf },

    #[error("the working copy for '{path}' has unpushed changes")]
    UnpushedChanges { path: PathBuf },

    #[error("branch '{name}' already exists")]
    BranchAlreadyExists { name: String },

    #[error("revision '{hex}' does not exist")]
    RevisionDoesNotExist { hex: String },

    #[error("dependency '{name}' is not in edit mode")]
    DependencyNotInEditMode { name: String },

    #[error("dependency '{name}' is missing at '{origin}'")]
    DependencyMissing { name: String, origin: String },

    #[error("the checksum for '{identity}' changed since the lockfile was generated")]
    ArtifactChecksumChanged { identity: PackageIdentity },

    #[error("'{identity}' has an invalid checksum")]
    ArtifactInvalidChecksum { identity: PackageIdentity },

    #[error("resolution was cancelled")]
    Cancelled,

    #[error("{message}")]
    ClassifierConflict { message: String, paths: Vec<String> },

    #[error("invalid version string '{0}'")]
    InvalidVersion(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
