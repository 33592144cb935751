//! Snapshot data structures.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a snapshot: the Unix second it was allocated for.
///
/// Ordering is numeric, so a later publish always sorts after an earlier one.
/// On the wire the id is a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SnapshotId(u64);

impl SnapshotId {
    /// Create an id from a Unix timestamp in seconds.
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Parse an id from its directory/wire form.
    ///
    /// Only canonical decimal digits are accepted: no sign, no leading zeros.
    /// This rules out anything that could escape the archive directory, and
    /// every accepted string is exactly the directory name the id maps back to.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if s.len() > 1 && s.starts_with('0') {
            return None;
        }
        s.parse().ok().map(Self)
    }

    /// The next id after this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// The wall-clock time this id encodes.
    pub fn timestamp(&self) -> DateTime<Utc> {
        i64::try_from(self.0)
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_default()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SnapshotId> for String {
    fn from(id: SnapshotId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for SnapshotId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid snapshot id: {value}"))
    }
}

/// An archived copy of the site files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot identifier.
    pub id: SnapshotId,

    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Names of the files held by this snapshot, sorted.
    pub files: Vec<String>,
}

impl Snapshot {
    /// Create a snapshot record.
    pub fn new(id: SnapshotId, mut files: Vec<String>) -> Self {
        files.sort();
        Self {
            id,
            timestamp: id.timestamp(),
            files,
        }
    }

    /// Check if this snapshot includes a specific file.
    pub fn contains_file(&self, name: &str) -> bool {
        self.files.iter().any(|f| f == name)
    }
}
