//! Preview staging.

use crate::{SiteError, SiteLayout, SiteResult};
use evolve_snapshot::unified_diff;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

/// Writes proposed file contents next to the live files without touching them.
#[derive(Debug, Clone)]
pub struct PreviewStager {
    layout: Arc<SiteLayout>,
}

impl PreviewStager {
    pub fn new(layout: Arc<SiteLayout>) -> Self {
        Self { layout }
    }

    /// Write each file's content to its preview path, replacing any earlier preview.
    ///
    /// Content is written verbatim. Every name must be managed; nothing is
    /// written if one is not.
    pub async fn stage(&self, files: &BTreeMap<String, String>) -> SiteResult<Vec<String>> {
        let mut targets = Vec::with_capacity(files.len());
        for (name, content) in files {
            targets.push((name, self.layout.preview_path(name)?, content));
        }

        let mut staged = Vec::with_capacity(targets.len());
        for (name, path, content) in targets {
            fs::write(&path, content)
                .await
                .map_err(|e| SiteError::io("write preview", &path, e))?;
            debug!(file = %name, path = %path.display(), "Preview written");
            staged.push(name.clone());
        }

        info!("Staged preview for {} files", staged.len());
        Ok(staged)
    }

    /// Names of managed files that have a pending preview.
    pub async fn pending(&self) -> SiteResult<Vec<String>> {
        let mut pending = Vec::new();
        for name in self.layout.files().names() {
            let path = self.layout.preview_path(name)?;
            if fs::try_exists(&path)
                .await
                .map_err(|e| SiteError::io("check preview", &path, e))?
            {
                pending.push(name.clone());
            }
        }
        Ok(pending)
    }

    /// Read all pending previews as raw bytes, in managed file order.
    pub async fn read_pending(&self) -> SiteResult<Vec<(String, Vec<u8>)>> {
        let mut out = Vec::new();
        for name in self.layout.files().names() {
            let path = self.layout.preview_path(name)?;
            match fs::read(&path).await {
                Ok(bytes) => out.push((name.clone(), bytes)),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(SiteError::io("read preview", &path, e)),
            }
        }
        Ok(out)
    }

    /// Delete every pending preview, returning the names that had one.
    pub async fn discard(&self) -> SiteResult<Vec<String>> {
        let mut discarded = Vec::new();
        for name in self.layout.files().names() {
            let path = self.layout.preview_path(name)?;
            match fs::remove_file(&path).await {
                Ok(()) => discarded.push(name.clone()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(SiteError::io("delete preview", &path, e)),
            }
        }
        if !discarded.is_empty() {
            info!("Discarded preview for {} files", discarded.len());
        }
        Ok(discarded)
    }

    /// Unified diffs from live to preview content for every pending preview.
    pub async fn diffs(&self) -> SiteResult<BTreeMap<String, String>> {
        let live = self.layout.read_live_all().await;
        let mut out = BTreeMap::new();
        for (name, bytes) in self.read_pending().await? {
            let preview = String::from_utf8_lossy(&bytes);
            let current = live.get(&name).map(String::as_str).unwrap_or_default();
            let diff = unified_diff(
                current,
                &preview,
                &format!("live/{name}"),
                &format!("preview/{name}"),
            );
            out.insert(name, diff);
        }
        Ok(out)
    }
}
