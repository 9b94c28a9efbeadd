//! [`PinsStore`]: the persisted `PackageIdentity -> Pin` map.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::schema::{decode_v2_pin, encode_v2_pin, upgrade_v1, V1Doc, V2Doc, V2Pin};
use super::{Pin, PinState};
use crate::error::{ResolverError, ResolverResult};
use crate::identity::PackageIdentity;
use crate::mirrors::Mirrors;
use crate::reference::ReferenceKind;

const TOOLS_VERSION: &str = "pkgresolve/0.1.0";

/// An exclusive lock on the pins file's parent directory, held for the
/// duration of a load-mutate-save cycle so that "in-memory mutation between
/// load and save is performed by a single owner" (spec.md §4.2) is an
/// enforced invariant, not a caller convention.
pub struct PinsLock {
    lock_path: PathBuf,
}

impl PinsLock {
    pub fn acquire(pins_dir: &Path) -> ResolverResult<PinsLock> {
        fs::create_dir_all(pins_dir)?;
        let lock_path = pins_dir.join(".pins.lock");
        OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    ResolverError::Io(std::io::Error::new(
                        std::io::ErrorKind::WouldBlock,
                        format!("pins directory '{}' is already locked", pins_dir.display()),
                    ))
                } else {
                    ResolverError::Io(e)
                }
            })?;
        Ok(PinsLock { lock_path })
    }
}

impl Drop for PinsLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// In-memory pins, mutated by the reconciler and persisted on explicit
/// `save`.
#[derive(Debug, Clone, Default)]
pub struct PinsStore {
    pins: BTreeMap<PackageIdentity, Pin>,
}

impl PinsStore {
    pub fn new() -> PinsStore {
        PinsStore::default()
    }

    /// Loads a pins file, applying schema v1 -> v2 migration transparently.
    /// Returns `Ok(PinsStore::new())` if the file does not exist.
    pub fn load(path: &Path, _lock: &PinsLock) -> ResolverResult<PinsStore> {
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PinsStore::new()),
            Err(e) => return Err(e.into()),
        };
        Self::parse(&contents, path)
    }

    fn parse(contents: &str, path: &Path) -> ResolverResult<PinsStore> {
        let raw: serde_json::Value = serde_json::from_str(contents).map_err(|e| {
            ResolverError::MalformedLockfile { path: path.to_path_buf(), reason: e.to_string() }
        })?;
        let version = raw.get("version").and_then(serde_json::Value::as_u64);
        let mut store = PinsStore::new();
        match version {
            Some(1) => {
                let doc: V1Doc = serde_json::from_value(raw).map_err(|e| {
                    ResolverError::MalformedLockfile { path: path.to_path_buf(), reason: e.to_string() }
                })?;
                for (pin, warning) in upgrade_v1(doc) {
                    if let Some(w) = warning {
                        warn!(target: "pkgresolve::pins", "{w}");
                    }
                    store.pins.insert(pin.identity.clone(), pin);
                }
            }
            Some(2) => {
                let doc: V2Doc = serde_json::from_value(raw).map_err(|e| {
                    ResolverError::MalformedLockfile { path: path.to_path_buf(), reason: e.to_string() }
                })?;
                for p in doc.pins {
                    let (pin, warning) = decode_v2_pin(p)?;
                    if let Some(w) = warning {
                        warn!(target: "pkgresolve::pins", "{w}");
                    }
                    store.pins.insert(pin.identity.clone(), pin);
                }
            }
            _ => {
                return Err(ResolverError::MalformedLockfile {
                    path: path.to_path_buf(),
                    reason: "unrecognized or missing 'version' field".into(),
                });
            }
        }
        Ok(store)
    }

    pub fn get(&self, identity: &PackageIdentity) -> Option<&Pin> {
        self.pins.get(identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pin> {
        self.pins.values()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn pin(&mut self, pin: Pin) {
        self.pins.insert(pin.identity.clone(), pin);
    }

    pub fn unpin(&mut self, identity: &PackageIdentity) {
        self.pins.remove(identity);
    }

    pub fn unpin_all(&mut self) {
        self.pins.clear();
    }

    /// Atomically writes the store as schema v2, unresolving each pin's
    /// location through `mirrors` so the lockfile records the upstream URL.
    /// Deletes the file instead of writing an empty one, per spec.md §4.2.
    pub fn save(&self, path: &Path, mirrors: &Mirrors, _lock: &PinsLock) -> ResolverResult<()> {
        if self.pins.is_empty() {
            match fs::remove_file(path) {
                Ok(()) => debug!(target: "pkgresolve::pins", "deleted empty pins file at {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            return Ok(());
        }

        for pin in self.pins.values() {
            if pin.kind == ReferenceKind::RemoteSourceControl
                && matches!(pin.state, PinState::Revision { ref hash } if hash.is_empty())
            {
                return Err(ResolverError::MalformedLockfile {
                    path: path.to_path_buf(),
                    reason: format!("pin '{}' has no revision recorded; refusing to save", pin.identity),
                });
            }
            if matches!(pin.kind, ReferenceKind::RemoteSourceControl | ReferenceKind::LocalSourceControl)
                && pin.state.revision().is_none()
            {
                return Err(ResolverError::MalformedLockfile {
                    path: path.to_path_buf(),
                    reason: format!(
                        "pin '{}' is a source-control pin with no revision; refusing to save",
                        pin.identity
                    ),
                });
            }
        }

        let mut pins: Vec<V2Pin> = self
            .pins
            .values()
            .map(|pin| {
                let mut encoded = encode_v2_pin(pin);
                encoded.location = mirrors.unresolve(&encoded.location).to_string();
                encoded
            })
            .collect();
        pins.sort_by(|a, b| a.identity.cmp(&b.identity));

        let doc = V2Doc { version: 2, pins, origin_hash: Some(TOOLS_VERSION.to_string()) };
        let serialized = serde_json::to_string_pretty(&doc)?;

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("pins")
        ));
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(serialized.as_bytes())?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        debug!(target: "pkgresolve::pins", "saved {} pins to {}", self.pins.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn version_pin(identity: &str, version: &str, revision: &str) -> Pin {
        Pin {
            identity: PackageIdentity::from_raw(identity),
            kind: ReferenceKind::RemoteSourceControl,
            location: format!("https://example.com/{identity}.git"),
            state: PinState::Version {
                version: crate::version::parse_version(version).unwrap(),
                revision: Some(revision.to_string()),
            },
        }
    }

    #[test]
    fn empty_store_deletes_file_on_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pins.json");
        fs::write(&path, "{}").unwrap();
        let lock = PinsLock::acquire(dir.path()).unwrap();
        let store = PinsStore::new();
        store.save(&path, &Mirrors::new(), &lock).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn load_after_save_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pins.json");
        let lock = PinsLock::acquire(dir.path()).unwrap();
        let mut store = PinsStore::new();
        store.pin(version_pin("foo", "1.0.2", "90a9"));
        store.save(&path, &Mirrors::new(), &lock).unwrap();
        drop(lock);

        let lock2 = PinsLock::acquire(dir.path()).unwrap();
        let loaded = PinsStore::load(&path, &lock2).unwrap();
        let pin = loaded.get(&PackageIdentity::from_raw("foo")).unwrap();
        assert_eq!(pin.state.revision(), Some("90a9"));
    }

    #[test]
    fn v1_schema_migrates_to_v2_identities() {
        let json = r#"{
            "version": 1,
            "object": {
                "pins": [
                    { "package": "Clang_C", "repositoryURL": "https://example.com/Clang_C.git",
                      "state": { "branch": null, "revision": "90a9", "version": "1.0.2" } },
                    { "package": "Commandant", "repositoryURL": "https://example.com/Commandant.git",
                      "state": { "branch": null, "revision": "ab12", "version": "0.1.0" } }
                ]
            }
        }"#;
        let store = PinsStore::parse(json, Path::new("pins.json")).unwrap();
        let mut identities: Vec<_> = store.iter().map(|p| p.identity.as_str().to_string()).collect();
        identities.sort();
        assert_eq!(identities, vec!["clang_c", "commandant"]);
    }

    #[test]
    fn unrecognized_schema_version_is_malformed() {
        let json = r#"{"version": 99, "pins": []}"#;
        let err = PinsStore::parse(json, Path::new("pins.json")).unwrap_err();
        assert!(matches!(err, ResolverError::MalformedLockfile { .. }));
    }

    #[test]
    fn mirror_round_trip_saves_upstream_url() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pins.json");
        let lock = PinsLock::acquire(dir.path()).unwrap();
        let mut store = PinsStore::new();
        let mut pin = version_pin("foo", "1.0.0", "abc123");
        pin.location = "https://ghe/team/foo.git".to_string();
        store.pin(pin);

        let mut mirrors = Mirrors::new();
        mirrors.set("https://github.com/corporate/foo.git", "https://ghe/team/foo.git");
        store.save(&path, &mirrors, &lock).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("https://github.com/corporate/foo.git"));
        assert!(!contents.contains("https://ghe/team/foo.git"));
    }
}
