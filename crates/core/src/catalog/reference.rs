//! Deriving deletable handles from stored public references.
//!
//! A stored reference looks like `https://host/.../{folder}/{name}.{ext}`.
//! Image handles drop the extension (`{folder}/{name}`), raw handles keep it
//! (`{folder}/{name}.{ext}`). The remote store resolves both forms.

use thiserror::Error;
use url::Url;

use super::types::AssetKind;

/// A stored reference that no handle can be derived from.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    /// Not an absolute URL.
    #[error("reference is not a valid URL: {0}")]
    InvalidUrl(String),

    /// The path lacks a `{folder}/{name}` tail.
    #[error("reference has no folder/name path: {0}")]
    MissingSegments(String),
}

/// Derive the remote handle for a stored reference.
///
/// # Errors
///
/// Returns an error if the reference is not a URL or its path has fewer
/// than two non-empty segments.
pub fn derive_handle(reference: &str, kind: AssetKind) -> Result<String, ReferenceError> {
    let url =
        Url::parse(reference).map_err(|e| ReferenceError::InvalidUrl(format!("{reference}: {e}")))?;
    let missing = || ReferenceError::MissingSegments(reference.to_string());

    let mut segments = url.path_segments().ok_or_else(missing)?.rev();
    let name = segments.next().filter(|s| !s.is_empty()).ok_or_else(missing)?;
    let folder = segments.next().filter(|s| !s.is_empty()).ok_or_else(missing)?;

    let name = if kind.is_raw() {
        name
    } else {
        strip_extension(name)
    };
    Ok(format!("{folder}/{name}"))
}

fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}
