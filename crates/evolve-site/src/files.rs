//! The managed file set and preview naming.

/// Files managed when no explicit set is configured.
pub const DEFAULT_MANAGED_FILES: [&str; 3] = ["live.html", "main.js", "styles.css"];

/// Marker inserted before the extension of a preview file.
pub const PREVIEW_MARKER: &str = "preview";

/// Name of the preview variant of a managed file.
///
/// The marker goes before the last extension (`main.js` → `main.preview.js`);
/// a name without an extension gets it as a suffix (`README` → `README.preview`).
pub fn preview_name(name: &str) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}.{}{}", &name[..dot], PREVIEW_MARKER, &name[dot..]),
        _ => format!("{}.{}", name, PREVIEW_MARKER),
    }
}

/// The fixed set of files subject to generation, preview, publish and rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedFiles {
    names: Vec<String>,
}

impl ManagedFiles {
    /// The managed file names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether a name is managed.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

impl Default for ManagedFiles {
    fn default() -> Self {
        Self {
            names: DEFAULT_MANAGED_FILES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
