//! Snapshot archive for evolve.
//!
//! Every publish copies the live site files into a new directory named by
//! the publish time (Unix seconds). Snapshots are never modified after they
//! are written; they are only listed, inspected, diffed, or restored.
//!
//! # Example
//!
//! ```no_run
//! use evolve_snapshot::SnapshotStore;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SnapshotStore::new(
//!     PathBuf::from("site/.history"),
//!     PathBuf::from("site"),
//! ).await?;
//!
//! let snapshot = store.take(&["live.html".to_string()]).await?;
//!
//! // ... edit site/live.html ...
//!
//! store.restore(&snapshot.id).await?;
//! # Ok(())
//! # }
//! ```

mod diff;
mod error;
mod snapshot;
mod store;

pub use diff::unified_diff;
pub use error::{SnapshotError, SnapshotResult};
pub use snapshot::{Snapshot, SnapshotId};
pub use store::SnapshotStore;
