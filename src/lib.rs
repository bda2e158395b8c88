// Cross-Check - Core Library
// Ingest two files, decide which records of File A exist in File B,
// and serialize both partitions back to CSV.

pub mod table;
pub mod dates;
pub mod error;
pub mod ingest;
pub mod headers;
pub mod reconciliation;
pub mod export;
pub mod artifacts;
pub mod config;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use table::{ComparisonKey, Record, Scalar, Table, TableKind, LINE_CONTENT};
pub use error::{CrossCheckError, Result};
pub use ingest::{ingest, ingest_path, SourceFormat};
pub use headers::{candidate_keys, HeaderCandidates, NO_HEADERS_FOUND};
pub use reconciliation::{
    reconcile, resolve_key, PartitionResult, ReconciliationEngine, ReconciliationStatus,
};
pub use export::{serialize, serialize_result, serialize_with_columns};
pub use artifacts::{ArtifactError, ArtifactStore};
pub use config::{is_allowed_upload, ServerConfig, ALLOWED_EXTENSIONS};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
