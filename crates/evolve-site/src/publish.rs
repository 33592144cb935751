//! Publishing staged previews.

use crate::{PreviewStager, SiteError, SiteLayout, SiteResult};
use evolve_snapshot::{Snapshot, SnapshotId, SnapshotStore};
use serde::Serialize;
use std::sync::Arc;
use tokio::fs;
use tracing::info;

/// Result of a publish.
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    /// Id of the snapshot holding the pre-publish live files.
    pub version: SnapshotId,
    /// The snapshot itself.
    pub snapshot: Snapshot,
    /// Names promoted from preview to live.
    pub promoted: Vec<String>,
    /// Exact bytes written to each promoted live file.
    #[serde(skip)]
    pub promoted_content: Vec<(String, Vec<u8>)>,
}

/// Snapshots the live files and promotes pending previews.
pub struct Publisher {
    layout: Arc<SiteLayout>,
    store: Arc<SnapshotStore>,
    stager: PreviewStager,
}

impl Publisher {
    pub fn new(layout: Arc<SiteLayout>, store: Arc<SnapshotStore>, stager: PreviewStager) -> Self {
        Self {
            layout,
            store,
            stager,
        }
    }

    /// Publish pending previews.
    ///
    /// Runs in three passes: read every pending preview, snapshot all live
    /// managed files, then write each preview over its live file and delete
    /// the preview. A snapshot is taken even when nothing is pending.
    ///
    /// There is no rollback on failure. If the promotion pass fails partway,
    /// the snapshot exists, files promoted so far are live, and the
    /// remaining previews are still on disk.
    pub async fn publish(&self) -> SiteResult<PublishOutcome> {
        let pending = self.stager.read_pending().await?;

        let snapshot = self.store.take(self.layout.files().names()).await?;

        let mut promoted = Vec::with_capacity(pending.len());
        let mut promoted_content = Vec::with_capacity(pending.len());
        for (name, bytes) in pending {
            let live = self.layout.live_path(&name)?;
            let preview = self.layout.preview_path(&name)?;
            fs::write(&live, &bytes)
                .await
                .map_err(|e| SiteError::io("write live file", &live, e))?;
            fs::remove_file(&preview)
                .await
                .map_err(|e| SiteError::io("delete preview", &preview, e))?;
            info!(file = %name, version = %snapshot.id, "Published");
            promoted.push(name.clone());
            promoted_content.push((name, bytes));
        }

        Ok(PublishOutcome {
            version: snapshot.id,
            snapshot,
            promoted,
            promoted_content,
        })
    }
}
