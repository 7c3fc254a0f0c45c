//! Application-wide constants.

/// Longest side, in pixels, of a generated thumbnail.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 200;

/// Lossy WebP quality used for thumbnails (0-100).
pub const DEFAULT_THUMBNAIL_QUALITY: u8 = 80;

/// Thumbnails are always WebP, whatever the original format was.
pub const THUMBNAIL_EXTENSION: &str = "webp";
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/webp";

/// Top-level directories below the storage root. Part of the on-disk contract:
/// changing them requires migrating files and index paths together.
pub const ORIGINALS_DIR: &str = "originals";
pub const THUMBNAILS_DIR: &str = "thumbnails";

/// List pagination: page size used when the caller sends none, and the hard cap.
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Artifacts never change once written, so clients may cache them for a year.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Maximum length of an owner token, in bytes.
pub const MAX_OWNER_ID_LEN: usize = 128;
