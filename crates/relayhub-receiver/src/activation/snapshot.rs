//! Resolution of the active configuration snapshot.
//!
//! Layout under the config root:
//!
//! ```text
//! <config_root>/active_serial          currently active serial, one line
//! <config_root>/<serial>/<relay_id>/   rendered configuration of one relay
//! ```
//!
//! A relay receives its directory as a tar archive with paths relative to
//! the directory itself.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::{RelayId, Serial};

const ACTIVE_SERIAL_FILE: &str = "active_serial";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("no active configuration serial in {0}")]
    NoActiveSerial(PathBuf),

    #[error("serial {serial} has no configuration for relay {relay_id}")]
    MissingRelay { serial: Serial, relay_id: RelayId },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The active serial and the relays provisioned in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub serial: Serial,
    /// Sorted by id.
    pub relays: Vec<RelayId>,
}

#[derive(Debug, Clone)]
pub struct ConfigSnapshotResolver {
    root: PathBuf,
}

impl ConfigSnapshotResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the active serial and list the relays that have a rendered
    /// configuration for it. Relays configured on the site but missing from
    /// the snapshot are simply not listed.
    pub async fn resolve(&self) -> Result<ConfigSnapshot, SnapshotError> {
        let serial_path = self.root.join(ACTIVE_SERIAL_FILE);
        let serial = match tokio::fs::read_to_string(&serial_path).await {
            Ok(content) => content.trim().to_string(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SnapshotError::NoActiveSerial(self.root.clone()));
            }
            Err(source) => {
                return Err(SnapshotError::Io {
                    path: serial_path,
                    source,
                });
            }
        };
        if serial.is_empty() {
            return Err(SnapshotError::NoActiveSerial(self.root.clone()));
        }

        let serial_dir = self.root.join(&serial);
        let mut relays = Vec::new();
        let mut entries = match tokio::fs::read_dir(&serial_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(ConfigSnapshot {
                    serial: Serial::new(serial),
                    relays,
                });
            }
            Err(source) => {
                return Err(SnapshotError::Io {
                    path: serial_dir,
                    source,
                });
            }
        };

        let io_err = |source| SnapshotError::Io {
            path: serial_dir.clone(),
            source,
        };
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            if !entry.file_type().await.map_err(io_err)?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                relays.push(RelayId::from(name));
            }
        }
        relays.sort();

        Ok(ConfigSnapshot {
            serial: Serial::new(serial),
            relays,
        })
    }

    /// Pack `<root>/<serial>/<relay_id>/` into an uncompressed tar archive.
    pub async fn relay_archive(
        &self,
        serial: &Serial,
        relay_id: &RelayId,
    ) -> Result<Vec<u8>, SnapshotError> {
        let dir = self.root.join(serial.as_str()).join(relay_id.as_str());
        let missing = || SnapshotError::MissingRelay {
            serial: serial.clone(),
            relay_id: relay_id.clone(),
        };
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(missing()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(missing()),
            Err(source) => return Err(SnapshotError::Io { path: dir, source }),
        }

        let path = dir.clone();
        tokio::task::spawn_blocking(move || pack_dir(&dir))
            .await
            .map_err(|e| SnapshotError::Io {
                path: path.clone(),
                source: io::Error::other(e),
            })?
            .map_err(|source| SnapshotError::Io { path, source })
    }
}

fn pack_dir(dir: &Path) -> io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);
    builder.append_dir_all("", dir)?;
    builder.into_inner()
}
