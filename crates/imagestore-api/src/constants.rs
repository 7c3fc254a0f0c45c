//! API constants

/// Versioned prefix of the JSON API.
pub const API_PREFIX: &str = "/api/v1";

/// Multipart field carrying the JSON upload header.
pub const METADATA_FIELD: &str = "metadata";

/// Multipart fields whose bytes are appended to the payload, in order.
pub const PAYLOAD_FIELDS: &[&str] = &["file", "chunk"];

/// Room for multipart framing and the metadata part on top of the payload cap.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Buffered messages between the multipart reader and the ingestion pipeline.
pub const INGEST_CHANNEL_CAPACITY: usize = 8;
