// ⚙️ Boundary policy - upload limits, retention, preview size
//
// None of this is enforced by the core; the HTTP server and CLI apply it
// before handing bytes to `ingest`.

use crate::artifacts::DEFAULT_RETENTION;
use crate::reconciliation::DEFAULT_PREVIEW_LIMIT;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extensions accepted for upload
pub const ALLOWED_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv", "txt"];

/// 100 MB per uploaded file
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_upload_bytes: usize,
    pub retention: Duration,
    pub sweep_interval: Duration,
    pub preview_limit: usize,
    pub web_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0:3000".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            retention: DEFAULT_RETENTION,
            sweep_interval: Duration::from_secs(30),
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            web_dir: PathBuf::from("web"),
        }
    }
}

impl ServerConfig {
    /// Request body cap: two files plus multipart framing
    pub fn body_limit(&self) -> usize {
        self.max_upload_bytes.saturating_mul(2).saturating_add(64 * 1024)
    }
}

/// Whether `filename` carries one of the accepted extensions
pub fn is_allowed_upload(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
