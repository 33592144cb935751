//! Snapshot storage implementation.

use crate::{unified_diff, Snapshot, SnapshotError, SnapshotId, SnapshotResult};
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Storage for site snapshots.
///
/// Snapshots are stored as plain file copies, one directory per snapshot:
/// ```text
/// archive_dir/
///   <unix_seconds>/
///     <file_name>   # verbatim copy of the live file
/// ```
pub struct SnapshotStore {
    /// Directory holding one subdirectory per snapshot.
    archive_dir: PathBuf,

    /// Directory holding the live files.
    live_dir: PathBuf,
}

impl SnapshotStore {
    /// Create a new snapshot store, creating the archive directory if needed.
    pub async fn new(archive_dir: PathBuf, live_dir: PathBuf) -> SnapshotResult<Self> {
        fs::create_dir_all(&archive_dir).await?;

        Ok(Self {
            archive_dir,
            live_dir,
        })
    }

    /// The archive directory.
    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Copy the named live files into a new snapshot.
    ///
    /// Every name is copied whether or not it changed since the last
    /// snapshot. Names with no live file are skipped.
    pub async fn take(&self, files: &[String]) -> SnapshotResult<Snapshot> {
        let (id, snapshot_dir) = self.allocate().await?;

        let mut copied = Vec::with_capacity(files.len());
        for name in files {
            check_file_name(name)?;
            let src = self.live_dir.join(name);
            if !fs::try_exists(&src).await? {
                warn!(file = %name, "Skipping missing live file");
                continue;
            }

            fs::copy(&src, snapshot_dir.join(name)).await.map_err(|e| {
                SnapshotError::operation_failed(format!("Failed to copy {}: {}", src.display(), e))
            })?;
            debug!(snapshot = %id, file = %name, "Snapshotted");
            copied.push(name.clone());
        }

        info!("Created snapshot {} with {} files", id, copied.len());
        Ok(Snapshot::new(id, copied))
    }

    /// List all snapshot ids, newest first.
    ///
    /// Only directories with a numeric name count as snapshots; anything
    /// else in the archive directory is ignored.
    pub async fn list(&self) -> SnapshotResult<Vec<SnapshotId>> {
        let mut ids = Vec::new();

        let mut entries = fs::read_dir(&self.archive_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            match name.to_str().and_then(SnapshotId::parse) {
                Some(id) => ids.push(id),
                None => debug!("Ignoring non-snapshot entry {:?}", entry.path()),
            }
        }

        ids.sort_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    /// Resolve a version string from a caller to an existing snapshot id.
    pub async fn resolve(&self, version: &str) -> SnapshotResult<SnapshotId> {
        let id = SnapshotId::parse(version).ok_or_else(|| SnapshotError::not_found(version))?;
        if fs::metadata(self.snapshot_dir(&id))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            Ok(id)
        } else {
            Err(SnapshotError::not_found(version))
        }
    }

    /// Get a snapshot by ID.
    pub async fn get(&self, id: &SnapshotId) -> SnapshotResult<Snapshot> {
        let files = self.archived_files(id).await?;
        Ok(Snapshot::new(*id, files))
    }

    /// Copy every file held by a snapshot over the live file of the same name.
    ///
    /// Live files the snapshot does not hold are left alone, and no new
    /// snapshot is taken first.
    pub async fn restore(&self, id: &SnapshotId) -> SnapshotResult<Snapshot> {
        let files = self.archived_files(id).await?;
        let snapshot_dir = self.snapshot_dir(id);

        for name in &files {
            let dst = self.live_dir.join(name);
            fs::copy(snapshot_dir.join(name), &dst).await.map_err(|e| {
                SnapshotError::operation_failed(format!(
                    "Failed to restore {}: {}",
                    dst.display(),
                    e
                ))
            })?;
            debug!(snapshot = %id, file = %name, "Restored");
        }

        info!("Restored snapshot {} ({} files)", id, files.len());
        Ok(Snapshot::new(*id, files))
    }

    /// Generate a diff between an archived file and its current live content.
    pub async fn diff(&self, id: &SnapshotId, name: &str) -> SnapshotResult<String> {
        check_file_name(name)?;
        let snapshot = self.get(id).await?;
        if !snapshot.contains_file(name) {
            return Err(SnapshotError::FileNotFound(format!("{name} in version {id}")));
        }

        let old_content = fs::read_to_string(self.snapshot_dir(id).join(name)).await?;
        let new_content = read_or_empty(&self.live_dir.join(name)).await?;

        Ok(unified_diff(
            &old_content,
            &new_content,
            &format!("{id}/{name}"),
            &format!("live/{name}"),
        ))
    }

    /// Claim a fresh snapshot directory.
    ///
    /// Starts from the current second and moves forward until a directory
    /// can be created, so two publishes in the same second never share one.
    async fn allocate(&self) -> SnapshotResult<(SnapshotId, PathBuf)> {
        let secs = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        let mut id = SnapshotId::from_secs(secs);

        loop {
            let dir = self.snapshot_dir(&id);
            match fs::create_dir(&dir).await {
                Ok(()) => return Ok((id, dir)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(snapshot = %id, "Snapshot id taken, trying next");
                    id = id.next();
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Names of the regular files inside a snapshot directory.
    async fn archived_files(&self, id: &SnapshotId) -> SnapshotResult<Vec<String>> {
        let snapshot_dir = self.snapshot_dir(id);
        let mut entries = match fs::read_dir(&snapshot_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SnapshotError::not_found(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => files.push(name),
                Err(name) => warn!("Skipping non UTF-8 file name {:?}", name),
            }
        }
        files.sort();
        Ok(files)
    }

    /// Get the directory for a snapshot.
    fn snapshot_dir(&self, id: &SnapshotId) -> PathBuf {
        self.archive_dir.join(id.to_string())
    }
}

/// Reject anything but a plain file name.
fn check_file_name(name: &str) -> SnapshotResult<()> {
    let path = Path::new(name);
    let plain = path.file_name().and_then(|f| f.to_str()) == Some(name);
    if plain && name != "." && name != ".." {
        Ok(())
    } else {
        Err(SnapshotError::InvalidFileName(name.to_string()))
    }
}

async fn read_or_empty(path: &Path) -> SnapshotResult<String> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}
