use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use imagestore_core::OwnerId;
use imagestore_processing::{decode, SupportedFormat, ThumbnailRenderer};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{PathError, StorageError, StorageResult};
use crate::id::{IdGenerator, UuidV4Generator};
use crate::paths::{derive_paths, resolve_and_validate, ArtifactPaths, StorageRoot};

/// Reject native dimensions that do not fit the index's `i32` columns.
pub fn checked_dimensions(width: u32, height: u32) -> StorageResult<(i32, i32)> {
    match (i32::try_from(width), i32::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(StorageError::InvalidDimensions { width, height }),
    }
}

/// Files written by one `store` call that must disappear unless the call commits.
///
/// Cleanup runs on the async path when the caller fails normally; the `Drop` impl
/// covers a caller whose future is dropped mid-flight.
#[derive(Debug, Default)]
struct RollbackGuard {
    files: Vec<PathBuf>,
}

impl RollbackGuard {
    fn track(&mut self, path: PathBuf) {
        self.files.push(path);
    }

    fn disarm(&mut self) {
        self.files.clear();
    }

    async fn discard(&mut self) -> StorageResult<()> {
        let mut first_error = None;
        for path in self.files.drain(..) {
            if let Err(e) = remove_if_exists(&path).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for RollbackGuard {
    fn drop(&mut self) {
        for path in self.files.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "Rolled back uncommitted artifact");
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to roll back uncommitted artifact"
                    );
                }
            }
        }
    }
}

/// Artifacts that are on disk but not yet referenced by an index record.
///
/// Dropping a `StagedImage` without calling [`StagedImage::commit`] removes both files.
#[derive(Debug)]
pub struct StagedImage {
    pub id: Uuid,
    pub paths: ArtifactPaths,
    pub width: i32,
    pub height: i32,
    pub size_bytes: u64,
    pub format: SupportedFormat,
    guard: RollbackGuard,
}

impl StagedImage {
    /// Keep the artifacts. Called once the index record is durable.
    pub fn commit(mut self) {
        self.guard.disarm();
    }

    /// Remove both artifacts now and report the first failure.
    pub async fn rollback(mut self) -> StorageResult<()> {
        self.guard.discard().await
    }
}

/// Local filesystem image store
#[derive(Clone)]
pub struct ImageStore {
    root: StorageRoot,
    renderer: ThumbnailRenderer,
    ids: Arc<dyn IdGenerator>,
}

impl ImageStore {
    pub fn new(root: StorageRoot, renderer: ThumbnailRenderer) -> Self {
        ImageStore {
            root,
            renderer,
            ids: Arc::new(UuidV4Generator),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn root(&self) -> &StorageRoot {
        &self.root
    }

    /// Decode the payload, then durably write the original and its thumbnail.
    ///
    /// Nothing is written when decoding or the dimension check fails. Any file written
    /// by this call is removed again if a later step fails.
    #[tracing::instrument(
        skip(self, payload),
        fields(owner = %owner, content_type = %content_type, size_bytes = payload.len(), image_id = tracing::field::Empty)
    )]
    pub async fn store(
        &self,
        owner: &OwnerId,
        filename: &str,
        content_type: &str,
        payload: Bytes,
    ) -> StorageResult<StagedImage> {
        let id = self.ids.generate();
        tracing::Span::current().record("image_id", tracing::field::display(id));

        let data = payload.clone();
        let (img, format) = tokio::task::spawn_blocking(move || decode(&data))
            .await
            .map_err(|e| StorageError::Task(format!("decode task failed: {}", e)))??;

        let (width, height) = checked_dimensions(img.width(), img.height())?;

        let paths = derive_paths(id, owner, filename, format);
        let original_path = resolve_and_validate(&self.root, &paths.original).await?;
        let thumbnail_path = resolve_and_validate(&self.root, &paths.thumbnail).await?;

        let mut guard = RollbackGuard::default();

        if let Err(e) = write_new_file(&original_path, &paths.original, &payload, &mut guard).await {
            guard.discard().await.ok();
            return Err(StorageError::WriteFailed(e));
        }

        let renderer = self.renderer;
        let rendered = tokio::task::spawn_blocking(move || renderer.render(&img))
            .await
            .map_err(|e| format!("thumbnail task failed: {}", e))
            .and_then(|result| result.map_err(|e| e.to_string()));

        let written = match rendered {
            Ok(thumb) => {
                write_new_file(&thumbnail_path, &paths.thumbnail, &thumb.bytes, &mut guard).await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = guard.discard().await {
                tracing::warn!(
                    error = %cleanup,
                    path = %paths.original,
                    "Failed to remove original after thumbnail failure"
                );
            }
            return Err(StorageError::ThumbnailFailed(e));
        }

        Ok(StagedImage {
            id,
            paths,
            width,
            height,
            size_bytes: payload.len() as u64,
            format,
            guard,
        })
    }

    /// Best-effort removal of both artifacts. Missing files are fine; both deletes are
    /// attempted and the first failure is returned.
    pub async fn remove(&self, original_rel: &str, thumbnail_rel: &str) -> StorageResult<()> {
        let mut first_error = None;
        for rel in [original_rel, thumbnail_rel] {
            let result = match resolve_and_validate(&self.root, rel).await {
                Ok(path) => remove_if_exists(&path).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub async fn resolve_read_path(&self, rel: &str) -> Result<PathBuf, PathError> {
        resolve_and_validate(&self.root, rel).await
    }

    pub async fn read(&self, rel: &str) -> StorageResult<Bytes> {
        let path = self.resolve_read_path(rel).await?;
        let start = Instant::now();

        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StorageError::NotFound(rel.to_string())
            } else {
                StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
            }
        })?;

        tracing::debug!(
            key = %rel,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(Bytes::from(data))
    }
}

/// Create `path` (which must not exist yet), write `data` and fsync. The file is tracked
/// by `guard` as soon as it exists.
async fn write_new_file(
    path: &Path,
    key: &str,
    data: &[u8],
    guard: &mut RollbackGuard,
) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            format!("Failed to create directory {}: {}", parent.display(), e)
        })?;
    }

    let start = Instant::now();

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| format!("Failed to create file {}: {}", path.display(), e))?;
    guard.track(path.to_path_buf());

    file.write_all(data)
        .await
        .map_err(|e| format!("Failed to write file {}: {}", path.display(), e))?;

    file.sync_all()
        .await
        .map_err(|e| format!("Failed to sync file {}: {}", path.display(), e))?;

    tracing::info!(
        path = %path.display(),
        key = %key,
        size_bytes = data.len(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Local storage write successful"
    );

    Ok(())
}

async fn remove_if_exists(path: &Path) -> StorageResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => {
            tracing::info!(path = %path.display(), "Local storage delete successful");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::DeleteFailed(format!(
            "Failed to delete file {}: {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use imagestore_processing::DecodeError;
    use std::io::Cursor;
    use tempfile::{tempdir, TempDir};

    struct FixedId(Uuid);

    impl IdGenerator for FixedId {
        fn generate(&self) -> Uuid {
            self.0
        }
    }

    fn png(width: u32, height: u32) -> Bytes {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        Bytes::from(buffer)
    }

    fn owner() -> OwnerId {
        OwnerId::parse("user-1").unwrap()
    }

    async fn setup() -> (TempDir, ImageStore) {
        let dir = tempdir().unwrap();
        let root = StorageRoot::open(dir.path()).await.unwrap();
        (dir, ImageStore::new(root, ThumbnailRenderer::default()))
    }

    fn count_files(dir: &Path) -> usize {
        if !dir.exists() {
            return 0;
        }
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    count_files(&path)
                } else {
                    1
                }
            })
            .sum()
    }

    #[test]
    fn test_checked_dimensions() {
        assert_eq!(checked_dimensions(640, 480).unwrap(), (640, 480));
        assert_eq!(
            checked_dimensions(i32::MAX as u32, 1).unwrap(),
            (i32::MAX, 1)
        );
        assert!(matches!(
            checked_dimensions(i32::MAX as u32 + 1, 1),
            Err(StorageError::InvalidDimensions { .. })
        ));
        assert!(checked_dimensions(1, u32::MAX).is_err());
    }

    #[tokio::test]
    async fn test_store_and_read_back() {
        let (_dir, store) = setup().await;
        let payload = png(640, 320);

        let staged = store
            .store(&owner(), "photo.png", "image/png", payload.clone())
            .await
            .unwrap();
        assert_eq!((staged.width, staged.height), (640, 320));
        assert_eq!(staged.size_bytes, payload.len() as u64);
        assert_eq!(staged.format, SupportedFormat::Png);
        assert_eq!(
            staged.paths.original,
            format!("originals/user-1/{}.png", staged.id)
        );

        let paths = staged.paths.clone();
        staged.commit();

        let original = store.read(&paths.original).await.unwrap();
        assert_eq!(original, payload);

        let thumb = store.read(&paths.thumbnail).await.unwrap();
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 100));
    }

    #[tokio::test]
    async fn test_undecodable_payload_writes_nothing() {
        let (dir, store) = setup().await;

        let result = store
            .store(&owner(), "a.png", "image/png", Bytes::from_static(b"garbage"))
            .await;
        assert!(matches!(
            result,
            Err(StorageError::DecodeFailed(DecodeError::Unsupported))
        ));
        assert_eq!(count_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_write_failure_leaves_no_files() {
        let (dir, store) = setup().await;
        let id = Uuid::new_v4();
        let store = store.with_id_generator(Arc::new(FixedId(id)));

        // A directory squatting on the original's path makes the create fail.
        std::fs::create_dir_all(dir.path().join(format!("originals/user-1/{}.png", id))).unwrap();

        let result = store.store(&owner(), "a.png", "image/png", png(10, 10)).await;
        assert!(matches!(result, Err(StorageError::WriteFailed(_))));
        assert_eq!(count_files(dir.path()), 0);
        assert!(dir.path().join(format!("originals/user-1/{}.png", id)).is_dir());
    }

    #[tokio::test]
    async fn test_thumbnail_failure_removes_original() {
        let (dir, store) = setup().await;
        let id = Uuid::new_v4();
        let store = store.with_id_generator(Arc::new(FixedId(id)));

        std::fs::create_dir_all(dir.path().join(format!("thumbnails/user-1/{}_thumb.webp", id)))
            .unwrap();

        let result = store.store(&owner(), "a.png", "image/png", png(10, 10)).await;
        assert!(matches!(result, Err(StorageError::ThumbnailFailed(_))));
        assert!(!dir.path().join(format!("originals/user-1/{}.png", id)).exists());
        assert_eq!(count_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_dropping_uncommitted_staged_image_removes_files() {
        let (dir, store) = setup().await;

        let staged = store
            .store(&owner(), "a.png", "image/png", png(10, 10))
            .await
            .unwrap();
        assert_eq!(count_files(dir.path()), 2);

        drop(staged);
        assert_eq!(count_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_rollback_removes_files() {
        let (dir, store) = setup().await;

        let staged = store
            .store(&owner(), "a.png", "image/png", png(10, 10))
            .await
            .unwrap();
        staged.rollback().await.unwrap();
        assert_eq!(count_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (dir, store) = setup().await;

        let staged = store
            .store(&owner(), "a.png", "image/png", png(10, 10))
            .await
            .unwrap();
        let paths = staged.paths.clone();
        staged.commit();

        store.remove(&paths.original, &paths.thumbnail).await.unwrap();
        assert_eq!(count_files(dir.path()), 0);
        store.remove(&paths.original, &paths.thumbnail).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_rejects_escaping_paths_but_still_removes_the_other() {
        let (dir, store) = setup().await;

        let staged = store
            .store(&owner(), "a.png", "image/png", png(10, 10))
            .await
            .unwrap();
        let paths = staged.paths.clone();
        staged.commit();

        let result = store.remove("../../etc/passwd", &paths.thumbnail).await;
        assert!(matches!(result, Err(StorageError::Path(_))));
        assert!(!dir.path().join(&paths.thumbnail).exists());
        assert!(dir.path().join(&paths.original).exists());
    }

    #[tokio::test]
    async fn test_read_rejects_traversal_and_reports_missing() {
        let (_dir, store) = setup().await;

        assert!(matches!(
            store.read("../../etc/passwd").await,
            Err(StorageError::Path(PathError::EscapesRoot(_)))
        ));
        assert!(matches!(
            store.read("originals/user-1/missing.png").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_resolve_read_path_on_single_threaded_runtime() {
        let (_dir, store) = setup().await;

        let resolved = store
            .resolve_read_path("thumbnails/user-1/x_thumb.webp")
            .await
            .unwrap();
        assert!(resolved.starts_with(store.root().path()));
        assert!(matches!(
            store.resolve_read_path("/etc/passwd").await,
            Err(PathError::NotRelative(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_stores_are_disjoint() {
        let (dir, store) = setup().await;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let staged = store
                        .store(&owner(), "a.png", "image/png", png(20, 20))
                        .await
                        .unwrap();
                    let id = staged.id;
                    staged.commit();
                    id
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert_eq!(count_files(dir.path()), 8);
    }
}
