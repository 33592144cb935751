//! Where live and preview files live on disk.

use crate::{preview_name, ManagedFiles, SiteError, SiteResult};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// Paths of the managed files inside the live directory.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    live_dir: PathBuf,
    files: ManagedFiles,
}

impl SiteLayout {
    pub fn new(live_dir: PathBuf, files: ManagedFiles) -> Self {
        Self { live_dir, files }
    }

    pub fn live_dir(&self) -> &Path {
        &self.live_dir
    }

    pub fn files(&self) -> &ManagedFiles {
        &self.files
    }

    /// Path of the live copy of a managed file.
    pub fn live_path(&self, name: &str) -> SiteResult<PathBuf> {
        self.check(name)?;
        Ok(self.live_dir.join(name))
    }

    /// Path of the preview copy of a managed file.
    pub fn preview_path(&self, name: &str) -> SiteResult<PathBuf> {
        self.check(name)?;
        Ok(self.live_dir.join(preview_name(name)))
    }

    /// Read every live managed file.
    ///
    /// A file that cannot be read maps to an empty string.
    pub async fn read_live_all(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for name in self.files.names() {
            let path = self.live_dir.join(name);
            let content = match fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    if e.kind() != ErrorKind::NotFound {
                        warn!(file = %name, error = %e, "Failed to read live file");
                    }
                    String::new()
                }
            };
            out.insert(name.clone(), content);
        }
        out
    }

    fn check(&self, name: &str) -> SiteResult<()> {
        if self.files.contains(name) {
            Ok(())
        } else {
            Err(SiteError::UnknownFile(name.to_string()))
        }
    }
}
