//! Artifact persistence: local scratch files uploaded to object storage.

pub mod artifact;
pub mod gcs;

use anyhow::Result;
use std::path::Path;

pub use artifact::{storage_key, ArtifactWriter, UploadReceipt};

/// Bucket-scoped object storage.
pub trait ObjectStore {
    /// Upload the file at `local_path` to `key`, replacing any existing object.
    fn upload_file(&self, local_path: &Path, key: &str) -> Result<()>;
}
