//! Restoring live files from a snapshot.

use crate::SiteResult;
use evolve_snapshot::{Snapshot, SnapshotStore};
use std::sync::Arc;

/// Copies an archived snapshot back over the live files.
pub struct RollbackExecutor {
    store: Arc<SnapshotStore>,
}

impl RollbackExecutor {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    /// Roll the live files back to `version`.
    ///
    /// Fails with a not-found error, without touching anything, when the
    /// version does not name an archived snapshot. Files the snapshot does
    /// not hold keep their current content, and the state being replaced is
    /// not archived first.
    pub async fn rollback(&self, version: &str) -> SiteResult<Snapshot> {
        let id = self.store.resolve(version).await?;
        Ok(self.store.restore(&id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SiteError;
    use evolve_snapshot::SnapshotError;
    use tempfile::TempDir;
    use tokio::fs;

    #[tokio::test]
    async fn test_unknown_version_changes_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("live.html"), "current").await.unwrap();
        let store = Arc::new(
            SnapshotStore::new(dir.path().join(".history"), dir.path().to_path_buf())
                .await
                .unwrap(),
        );
        let executor = RollbackExecutor::new(store);

        for version in ["123", "abc", "../../etc", ""] {
            let err = executor.rollback(version).await.unwrap_err();
            assert!(
                matches!(err, SiteError::Snapshot(SnapshotError::NotFound(_))),
                "{version}: {err}"
            );
        }
        assert!(matches!(
            executor.rollback("1").await,
            Err(SiteError::Snapshot(_))
        ));
        assert_eq!(
            fs::read_to_string(dir.path().join("live.html")).await.unwrap(),
            "current"
        );
    }
}
