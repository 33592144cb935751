//! The site facade used by the server and CLI.

use crate::{
    ManagedFiles, PreviewStager, PublishOutcome, Publisher, RollbackExecutor, SiteError,
    SiteLayout, SiteResult,
};
use evolve_snapshot::{Snapshot, SnapshotId, SnapshotStore};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// A managed site: live files, their previews and the snapshot archive.
///
/// Operations that write files (stage, discard, publish, rollback) hold a
/// shared lock, so they never interleave with each other.
pub struct Site {
    layout: Arc<SiteLayout>,
    store: Arc<SnapshotStore>,
    stager: PreviewStager,
    publisher: Publisher,
    rollback: RollbackExecutor,
    write_lock: Mutex<()>,
}

impl Site {
    /// Open a site, creating the live and archive directories if needed.
    pub async fn open(
        live_dir: PathBuf,
        archive_dir: PathBuf,
        files: ManagedFiles,
    ) -> SiteResult<Self> {
        fs::create_dir_all(&live_dir)
            .await
            .map_err(|e| SiteError::io("create site directory", &live_dir, e))?;
        let store = Arc::new(SnapshotStore::new(archive_dir, live_dir.clone()).await?);
        let layout = Arc::new(SiteLayout::new(live_dir, files));
        debug!(live_dir = %layout.live_dir().display(), "Opened site");

        let stager = PreviewStager::new(layout.clone());
        let publisher = Publisher::new(layout.clone(), store.clone(), stager.clone());
        let rollback = RollbackExecutor::new(store.clone());

        Ok(Self {
            layout,
            store,
            stager,
            publisher,
            rollback,
            write_lock: Mutex::new(()),
        })
    }

    pub fn layout(&self) -> &SiteLayout {
        &self.layout
    }

    /// Current live content of every managed file; unreadable files are empty.
    pub async fn current_files(&self) -> BTreeMap<String, String> {
        self.layout.read_live_all().await
    }

    /// Stage previews for managed files.
    pub async fn stage(&self, files: &BTreeMap<String, String>) -> SiteResult<Vec<String>> {
        let _guard = self.write_lock.lock().await;
        self.stager.stage(files).await
    }

    /// Names with a pending preview.
    pub async fn pending(&self) -> SiteResult<Vec<String>> {
        self.stager.pending().await
    }

    /// Diffs from live to pending preview.
    pub async fn preview_diffs(&self) -> SiteResult<BTreeMap<String, String>> {
        self.stager.diffs().await
    }

    /// Drop every pending preview.
    pub async fn discard(&self) -> SiteResult<Vec<String>> {
        let _guard = self.write_lock.lock().await;
        self.stager.discard().await
    }

    /// Snapshot live files and promote pending previews.
    pub async fn publish(&self) -> SiteResult<PublishOutcome> {
        let _guard = self.write_lock.lock().await;
        self.publisher.publish().await
    }

    /// Snapshot ids, newest first.
    pub async fn history(&self) -> SiteResult<Vec<SnapshotId>> {
        Ok(self.store.list().await?)
    }

    /// Details of one snapshot.
    pub async fn snapshot(&self, version: &str) -> SiteResult<Snapshot> {
        let id = self.store.resolve(version).await?;
        Ok(self.store.get(&id).await?)
    }

    /// Diff between an archived file and its live content.
    pub async fn snapshot_diff(&self, version: &str, file: &str) -> SiteResult<String> {
        let id = self.store.resolve(version).await?;
        Ok(self.store.diff(&id, file).await?)
    }

    /// Restore live files from a snapshot.
    pub async fn rollback(&self, version: &str) -> SiteResult<Snapshot> {
        let _guard = self.write_lock.lock().await;
        self.rollback.rollback(version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> Site {
        Site::open(
            dir.path().join("site"),
            dir.path().join("site/.history"),
            ManagedFiles::default(),
        )
        .await
        .unwrap()
    }

    async fn write_live(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join("site").join(name), content)
            .await
            .unwrap();
    }

    async fn read_live(dir: &TempDir, name: &str) -> String {
        fs::read_to_string(dir.path().join("site").join(name))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_publish_edit_and_roll_back() {
        let dir = TempDir::new().unwrap();
        let site = open(&dir).await;
        write_live(&dir, "live.html", "A").await;
        write_live(&dir, "styles.css", "a {}").await;

        let t1 = site.publish().await.unwrap().version;

        let mut edit = BTreeMap::new();
        edit.insert("live.html".to_string(), "B".to_string());
        site.stage(&edit).await.unwrap();
        let t2 = site.publish().await.unwrap().version;

        assert!(t2 > t1);
        assert_eq!(site.history().await.unwrap(), vec![t2, t1]);
        assert_eq!(read_live(&dir, "live.html").await, "B");

        let t2_snapshot = site.snapshot(&t2.to_string()).await.unwrap();
        assert_eq!(t2_snapshot.files, vec!["live.html", "styles.css"]);

        site.rollback(&t1.to_string()).await.unwrap();
        assert_eq!(read_live(&dir, "live.html").await, "A");
        assert_eq!(read_live(&dir, "styles.css").await, "a {}");
    }

    #[tokio::test]
    async fn test_rollback_keeps_files_missing_from_snapshot() {
        let dir = TempDir::new().unwrap();
        let site = open(&dir).await;
        write_live(&dir, "live.html", "A").await;
        let version = site.publish().await.unwrap().version;

        write_live(&dir, "main.js", "later").await;
        site.rollback(&version.to_string()).await.unwrap();

        assert_eq!(read_live(&dir, "main.js").await, "later");
    }

    #[tokio::test]
    async fn test_snapshot_diff_against_live() {
        let dir = TempDir::new().unwrap();
        let site = open(&dir).await;
        write_live(&dir, "main.js", "let a = 1;\n").await;
        let version = site.publish().await.unwrap().version.to_string();
        write_live(&dir, "main.js", "let a = 2;\n").await;

        let diff = site.snapshot_diff(&version, "main.js").await.unwrap();
        assert!(diff.contains("-let a = 1;"));
        assert!(diff.contains("+let a = 2;"));
        assert!(matches!(
            site.snapshot_diff("1", "main.js").await,
            Err(SiteError::Snapshot(evolve_snapshot::SnapshotError::NotFound(_)))
        ));
    }
}
