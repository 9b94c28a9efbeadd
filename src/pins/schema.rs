//! On-disk JSON shapes for pins file schema v1 (legacy) and v2 (current).

use serde::{Deserialize, Serialize};

use super::{Pin, PinState};
use crate::identity::PackageIdentity;
use crate::reference::ReferenceKind;
use crate::version::parse_version;

#[derive(Debug, Deserialize)]
pub struct V1Doc {
    pub object: V1Object,
}

#[derive(Debug, Deserialize)]
pub struct V1Object {
    pub pins: Vec<V1Pin>,
}

#[derive(Debug, Deserialize)]
pub struct V1Pin {
    pub package: String,
    #[serde(rename = "repositoryURL")]
    pub repository_url: String,
    pub state: V1State,
}

#[derive(Debug, Deserialize)]
pub struct V1State {
    pub branch: Option<String>,
    pub revision: Option<String>,
    pub version: Option<String>,
}

/// Upgrades a v1 document into the in-memory `Pin` model. Identity for v1
/// pins is the lowercased basename of the `package` field, per spec.md
/// §4.2's "Identity is derived from `package` field (lowercased basename of
/// URL)".
pub fn upgrade_v1(doc: V1Doc) -> Vec<(Pin, Option<String>)> {
    doc.object
        .pins
        .into_iter()
        .map(|p| {
            let identity = PackageIdentity::from_location(&p.package);
            let mut warning = None;
            let state = match (&p.state.branch, &p.state.version, &p.state.revision) {
                (Some(branch), _, Some(rev)) => PinState::Branch { name: branch.clone(), revision: rev.clone() },
                (None, Some(version), revision) => {
                    if revision.is_none() {
                        warning = Some(format!(
                            "pin '{identity}' has no revision recorded; accepting on load"
                        ));
                    }
                    PinState::Version {
                        version: parse_version(version).unwrap_or_else(|_| semver::Version::new(0, 0, 0)),
                        revision: revision.clone(),
                    }
                }
                (None, None, Some(rev)) => PinState::Revision { hash: rev.clone() },
                _ => {
                    warning = Some(format!("pin '{identity}' has no usable state; skipping"));
                    PinState::Revision { hash: String::new() }
                }
            };
            (
                Pin {
                    identity,
                    kind: ReferenceKind::RemoteSourceControl,
                    location: p.repository_url,
                    state,
                },
                warning,
            )
        })
        .collect()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct V2Doc {
    pub version: u32,
    pub pins: Vec<V2Pin>,
    #[serde(rename = "originHash", skip_serializing_if = "Option::is_none")]
    pub origin_hash: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct V2Pin {
    pub identity: String,
    pub kind: String,
    pub location: String,
    pub state: V2State,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct V2State {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

pub fn decode_v2_kind(kind: &str) -> Option<ReferenceKind> {
    match kind {
        "root" => Some(ReferenceKind::Root),
        "localSourceControl" => Some(ReferenceKind::LocalSourceControl),
        "remoteSourceControl" => Some(ReferenceKind::RemoteSourceControl),
        "registry" => Some(ReferenceKind::Registry),
        _ => None,
    }
}

pub fn decode_v2_pin(p: V2Pin) -> crate::error::ResolverResult<(Pin, Option<String>)> {
    let kind = decode_v2_kind(&p.kind)
        .ok_or_else(|| crate::error::ResolverError::MalformedLockfile {
            path: Default::default(),
            reason: format!("unknown pin kind '{}'", p.kind),
        })?;
    let mut warning = None;
    let state = match (&p.state.branch, &p.state.version, &p.state.revision) {
        (Some(branch), _, Some(rev)) => PinState::Branch { name: branch.clone(), revision: rev.clone() },
        (None, Some(version), revision) => {
            if revision.is_none() && kind != ReferenceKind::Registry {
                warning = Some(format!(
                    "pin '{}' of kind {:?} has no revision recorded; accepting on load",
                    p.identity, kind
                ));
            }
            PinState::Version { version: parse_version(version)?, revision: revision.clone() }
        }
        (None, None, Some(rev)) => PinState::Revision { hash: rev.clone() },
        _ => {
            return Err(crate::error::ResolverError::MalformedLockfile {
                path: Default::default(),
                reason: format!("pin '{}' has neither version, branch, nor revision", p.identity),
            });
        }
    };
    Ok((
        Pin { identity: PackageIdentity::from_raw(p.identity), kind, location: p.location, state },
        warning,
    ))
}

pub fn encode_v2_pin(pin: &Pin) -> V2Pin {
    let state = match &pin.state {
        PinState::Version { version, revision } => {
            V2State { version: Some(version.to_string()), branch: None, revision: revision.clone() }
        }
        PinState::Branch { name, revision } => {
            V2State { version: None, branch: Some(name.clone()), revision: Some(revision.clone()) }
        }
        PinState::Revision { hash } => V2State { version: None, branch: None, revision: Some(hash.clone()) },
    };
    V2Pin {
        identity: pin.identity.as_str().to_string(),
        kind: pin.kind.as_schema_str().to_string(),
        location: pin.location.clone(),
        state,
    }
}
