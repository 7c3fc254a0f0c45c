//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p imagestore-api`. Every test gets its own
//! temporary storage root and its own in-memory index.

#![allow(dead_code)]

pub mod fixtures;

use std::path::Path;
use std::sync::Arc;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use imagestore_api::constants;
use imagestore_api::setup::{routes, services};
use imagestore_core::{BaseConfig, Config, ImageStoreConfig};
use imagestore_db::{ImageIndex, MemoryImageIndex, SqliteImageIndex};
use imagestore_processing::ThumbnailRenderer;
use imagestore_storage::{ImageStore, StorageRoot};
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

pub const TEST_BASE_URL: &str = "http://images.test";

/// API path prefix for tests (e.g. `/api/v1`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server, index and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub index: Arc<dyn ImageIndex>,
    pub store: ImageStore,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn storage_root(&self) -> &Path {
        self.store.root().path()
    }

    /// Number of regular files below the storage root.
    pub fn stored_file_count(&self) -> usize {
        count_files(self.storage_root())
    }
}

/// Setup test app backed by the in-memory index.
pub async fn setup_test_app() -> TestApp {
    setup_with_index(Arc::new(MemoryImageIndex::new()), 10 * 1024 * 1024).await
}

/// Setup test app backed by a migrated in-memory SQLite database.
pub async fn setup_sqlite_test_app() -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");
    let index = SqliteImageIndex::new(pool);
    index.migrate().await.expect("Failed to run migrations");
    setup_with_index(Arc::new(index), 10 * 1024 * 1024).await
}

pub async fn setup_with_index(index: Arc<dyn ImageIndex>, max_upload_bytes: usize) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&temp_dir, max_upload_bytes);

    let root = StorageRoot::open(config.storage_root())
        .await
        .expect("Failed to open storage root");
    let renderer = ThumbnailRenderer::new(config.thumbnail_size(), config.thumbnail_quality());
    let store = ImageStore::new(root, renderer);

    let state = services::initialize_services(&config, store.clone(), index.clone());
    let app = routes::setup_routes(&config, state);
    let server = TestServer::new(app).expect("Failed to create test server");

    TestApp {
        server,
        index,
        store,
        _temp_dir: temp_dir,
    }
}

fn create_test_config(temp_dir: &TempDir, max_upload_bytes: usize) -> Config {
    let base = BaseConfig {
        server_port: 3000,
        base_url: TEST_BASE_URL.to_string(),
        environment: "test".to_string(),
        log_format: "text".to_string(),
    };
    Config(Box::new(ImageStoreConfig {
        base,
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        storage_root: temp_dir.path().join("store").to_string_lossy().into_owned(),
        max_upload_bytes,
        thumbnail_size: 200,
        thumbnail_quality: 80,
    }))
}

/// Multipart upload form with a metadata part and a single payload part.
pub fn upload_form(user_id: &str, filename: &str, content_type: &str, data: Vec<u8>) -> MultipartForm {
    let metadata = serde_json::json!({
        "user_id": user_id,
        "filename": filename,
        "content_type": content_type,
    });
    MultipartForm::new()
        .add_text("metadata", metadata.to_string())
        .add_part(
            "file",
            Part::bytes(bytes::Bytes::from(data))
                .file_name(filename.to_string())
                .mime_type(content_type.to_string()),
        )
}

/// Upload a PNG of the given size and return the parsed receipt.
pub async fn upload_png(
    client: &TestServer,
    user_id: &str,
    width: u32,
    height: u32,
) -> serde_json::Value {
    let form = upload_form(
        user_id,
        "photo.png",
        "image/png",
        fixtures::create_test_png(width, height),
    );
    let response: TestResponse = client.post(&api_path("/images")).multipart(form).await;
    assert_eq!(response.status_code(), 201, "upload failed: {}", response.text());
    response.json()
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}
