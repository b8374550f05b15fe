//! Overlay asset references.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Opaque handle to a registered overlay asset.
///
/// Rendered as `<uuid>` or `<uuid>.<ext>`; callers place it verbatim in an
/// overlay's `content` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(pub String);

impl AssetRef {
    /// Generate a fresh reference, keeping a sanitized extension.
    pub fn generate(extension: Option<&str>) -> Self {
        let id = Uuid::new_v4();
        match extension.and_then(sanitize_extension) {
            Some(ext) => Self(format!("{id}.{ext}")),
            None => Self(id.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the reference can name a file without escaping its directory.
    pub fn is_path_safe(&self) -> bool {
        let s = self.0.as_str();
        !s.is_empty()
            && s.len() <= 160
            && !s.starts_with('.')
            && !s.contains("..")
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn sanitize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim_start_matches('.');
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Resolves an overlay's asset reference to a readable file.
///
/// Returning `None` means the asset is missing; the compiler skips the
/// overlay rather than failing the job.
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Option<PathBuf>;
}
