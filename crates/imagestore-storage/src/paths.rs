//! Artifact path derivation and validation against the storage root.

use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};

use imagestore_core::constants::{ORIGINALS_DIR, THUMBNAILS_DIR, THUMBNAIL_EXTENSION};
use imagestore_core::OwnerId;
use imagestore_processing::SupportedFormat;
use tokio::fs;
use uuid::Uuid;

use crate::error::{PathError, StorageError, StorageResult};

const MAX_EXTENSION_LEN: usize = 16;

/// The managed storage directory. Holds the canonical form of the root so every
/// containment check compares resolved paths.
#[derive(Debug, Clone)]
pub struct StorageRoot {
    path: PathBuf,
}

impl StorageRoot {
    /// Create the directory if needed and canonicalize it.
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();

        fs::create_dir_all(&path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                path.display(),
                e
            ))
        })?;

        let canonical = fs::canonicalize(&path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to canonicalize storage directory {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(StorageRoot { path: canonical })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Storage-root-relative locations of one image's two artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub original: String,
    pub thumbnail: String,
}

/// Derive the artifact paths for a freshly generated id.
///
/// The original keeps the client's extension when it is plain ASCII alphanumeric,
/// otherwise the sniffed format's canonical extension is used.
pub fn derive_paths(
    id: Uuid,
    owner: &OwnerId,
    filename: &str,
    detected: SupportedFormat,
) -> ArtifactPaths {
    let ext = client_extension(filename).unwrap_or_else(|| detected.extension().to_string());
    ArtifactPaths {
        original: format!("{}/{}/{}.{}", ORIGINALS_DIR, owner, id, ext),
        thumbnail: format!(
            "{}/{}/{}_thumb.{}",
            THUMBNAILS_DIR, owner, id, THUMBNAIL_EXTENSION
        ),
    }
}

fn client_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Map a relative path onto the root, refusing anything that could land outside it.
///
/// The path is normalized lexically first (so `..` can never climb above the root),
/// then the deepest ancestor that already exists is canonicalized so a symlink inside
/// the root cannot redirect the final path elsewhere.
pub async fn resolve_and_validate(root: &StorageRoot, rel: &str) -> Result<PathBuf, PathError> {
    let mut normalized = PathBuf::new();
    for component in Path::new(rel).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                return Err(PathError::NotRelative(rel.to_string()));
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(PathError::EscapesRoot(rel.to_string()));
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(PathError::Empty);
    }

    let candidate = root.path().join(&normalized);

    let mut existing = candidate.as_path();
    let mut missing: Vec<OsString> = Vec::new();
    loop {
        match fs::symlink_metadata(existing).await {
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let (Some(name), Some(parent)) = (existing.file_name(), existing.parent()) else {
                    return Err(PathError::EscapesRoot(rel.to_string()));
                };
                missing.push(name.to_os_string());
                existing = parent;
            }
            Err(e) => {
                return Err(PathError::Resolve {
                    path: rel.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    let mut resolved = fs::canonicalize(existing)
        .await
        .map_err(|e| PathError::Resolve {
            path: rel.to_string(),
            message: e.to_string(),
        })?;
    if !resolved.starts_with(root.path()) {
        return Err(PathError::EscapesRoot(rel.to_string()));
    }

    for part in missing.iter().rev() {
        resolved.push(part);
    }
    Ok(resolved)
}
