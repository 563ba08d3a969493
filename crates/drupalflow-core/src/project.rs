use crate::constants::{MARKER_GIT, MARKER_SCSS, MARKER_TSC};
use std::path::Path;

/// Marker files whose presence classifies a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Git,
    Scss,
    TypeScript,
}

impl Marker {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Git => MARKER_GIT,
            Self::Scss => MARKER_SCSS,
            Self::TypeScript => MARKER_TSC,
        }
    }
}

/// Best-effort existence probe; unreadable or missing markers count as absent.
pub fn has_marker(base_path: &Path, marker: Marker) -> bool {
    base_path.join(marker.file_name()).exists()
}
