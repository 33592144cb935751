//! Site file lifecycle for evolve.
//!
//! A site is a fixed set of managed files, each of which can exist in three
//! places:
//! - **live**: what visitors are served
//! - **preview**: a staged replacement next to the live file
//!   (`live.html` → `live.preview.html`)
//! - **archived**: a verbatim copy inside a snapshot
//!
//! [`Site`] ties the pieces together: the [`PreviewStager`] writes previews,
//! the [`Publisher`] snapshots live files and promotes previews, and the
//! [`RollbackExecutor`] copies a snapshot back over the live files.

mod error;
mod files;
mod layout;
mod preview;
mod publish;
mod rollback;
mod site;

pub use error::{SiteError, SiteResult};
pub use files::{preview_name, ManagedFiles, DEFAULT_MANAGED_FILES, PREVIEW_MARKER};
pub use layout::SiteLayout;
pub use preview::PreviewStager;
pub use publish::{PublishOutcome, Publisher};
pub use rollback::RollbackExecutor;
pub use site::Site;

pub use evolve_snapshot::{Snapshot, SnapshotError, SnapshotId, SnapshotStore};
