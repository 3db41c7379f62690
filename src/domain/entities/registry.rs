use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::repository::RepositoryRecord;

/// Failures of registry mutations and lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("'{}' is already registered as '{identity}'", path.display())]
    AlreadyRegistered { path: PathBuf, identity: String },

    #[error("'{}' is not a git working tree (no .git found)", path.display())]
    NotAGitRepository { path: PathBuf },

    #[error("Path '{}' does not exist", path.display())]
    PathNotFound { path: PathBuf },

    #[error("Identity '{identity}' is already used by '{}'; pick another with --name", existing.display())]
    IdentityTaken { identity: String, existing: PathBuf },

    #[error("Repository '{selector}' is not registered")]
    NotRegistered { selector: String },

    #[error("Identity '{identity}' is empty; pick a name with at least one visible character")]
    EmptyIdentity { identity: String },
}

/// Ordered set of registered repositories, keyed by identity.
///
/// Iteration follows insertion order, which is also the order of the
/// `[repositories.*]` tables in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    records: Vec<RepositoryRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the working tree at `path`.
    ///
    /// The path is canonicalized before the duplicate check, so `./api`
    /// and `/home/me/src/api` are the same entry.
    pub fn register(
        &mut self,
        path: &Path,
        name: Option<&str>,
    ) -> Result<RepositoryRecord, RegistryError> {
        let canonical = path
            .canonicalize()
            .map_err(|_| RegistryError::PathNotFound {
                path: path.to_path_buf(),
            })?;

        if let Some(existing) = self.find_by_path(&canonical) {
            return Err(RegistryError::AlreadyRegistered {
                path: canonical,
                identity: existing.identity.clone(),
            });
        }

        if !RepositoryRecord::has_git_marker(&canonical) {
            return Err(RegistryError::NotAGitRepository { path: canonical });
        }

        let identity = match name {
            Some(name) if name.trim().is_empty() => {
                return Err(RegistryError::EmptyIdentity {
                    identity: name.to_string(),
                })
            }
            Some(name) => name.to_string(),
            None => RepositoryRecord::derive_identity(&canonical).unwrap_or_else(|| {
                canonical.to_string_lossy().into_owned()
            }),
        };

        let record = RepositoryRecord::new(identity, canonical);
        self.insert(record.clone())?;
        Ok(record)
    }

    /// Append an already-built record, enforcing identity and path uniqueness.
    pub fn insert(&mut self, record: RepositoryRecord) -> Result<(), RegistryError> {
        if let Some(existing) = self.find_by_path(&record.path) {
            return Err(RegistryError::AlreadyRegistered {
                path: record.path,
                identity: existing.identity.clone(),
            });
        }
        if let Some(existing) = self.get(&record.identity) {
            return Err(RegistryError::IdentityTaken {
                identity: record.identity,
                existing: existing.path.clone(),
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Remove the entry matching `selector` (identity or path).
    pub fn unregister(&mut self, selector: &str) -> Result<RepositoryRecord, RegistryError> {
        let identity = self.resolve(selector)?.identity.clone();
        let index = self
            .records
            .iter()
            .position(|r| r.identity == identity)
            .ok_or_else(|| RegistryError::NotRegistered {
                selector: selector.to_string(),
            })?;
        Ok(self.records.remove(index))
    }

    /// Look a repository up by identity, then by path.
    pub fn resolve(&self, selector: &str) -> Result<&RepositoryRecord, RegistryError> {
        if let Some(record) = self.get(selector) {
            return Ok(record);
        }

        let as_path = Path::new(selector);
        let found = match as_path.canonicalize() {
            Ok(canonical) => self.find_by_path(&canonical),
            // The directory may be gone already; fall back to the literal path.
            Err(_) => self.find_by_path(as_path),
        };

        found.ok_or_else(|| RegistryError::NotRegistered {
            selector: selector.to_string(),
        })
    }

    pub fn get(&self, identity: &str) -> Option<&RepositoryRecord> {
        self.records.iter().find(|r| r.identity == identity)
    }

    pub fn get_mut(&mut self, identity: &str) -> Option<&mut RepositoryRecord> {
        self.records.iter_mut().find(|r| r.identity == identity)
    }

    fn find_by_path(&self, path: &Path) -> Option<&RepositoryRecord> {
        self.records.iter().find(|r| r.path == path)
    }

    /// Records in insertion order.
    pub fn list(&self) -> &[RepositoryRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &RepositoryRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop entries whose directory is gone or no longer a git working tree.
    pub fn remove_stale(&mut self) -> Vec<RepositoryRecord> {
        let (kept, removed): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| RepositoryRecord::has_git_marker(&r.path));
        self.records = kept;
        removed
    }
}

/// On-disk shape of one `[repositories.<identity>]` table.
#[derive(Serialize, Deserialize)]
struct RegistryEntry {
    path: PathBuf,
    #[serde(default, rename = "no-push", skip_serializing_if = "std::ops::Not::not")]
    no_push: bool,
}

impl Serialize for Registry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for record in &self.records {
            map.serialize_entry(
                &record.identity,
                &RegistryEntry {
                    path: record.path.clone(),
                    no_push: record.no_push,
                },
            )?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Registry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RegistryVisitor;

        impl<'de> Visitor<'de> for RegistryVisitor {
            type Value = Registry;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a table of repositories keyed by identity")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Registry, A::Error> {
                let mut registry = Registry::new();
                while let Some((identity, entry)) = access.next_entry::<String, RegistryEntry>()? {
                    let record = RepositoryRecord::new(identity, entry.path)
                        .with_no_push(entry.no_push);
                    registry.insert(record).map_err(serde::de::Error::custom)?;
                }
                Ok(registry)
            }
        }

        deserializer.deserialize_map(RegistryVisitor)
    }
}
