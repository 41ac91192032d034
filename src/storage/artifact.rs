use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::ObjectStore;
use crate::models::{CheckType, VerificationResult};

/// Where an artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub key: String,
    pub local_path: PathBuf,
    pub sha256: String,
}

/// Writes match results under the scratch root and uploads them.
///
/// Layout: `<scratch_root>/<check dir>/<file name>` locally and
/// `<namespace>/<check dir>/<file name>` in the bucket.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    scratch_root: PathBuf,
    namespace: String,
}

impl ArtifactWriter {
    pub fn new(scratch_root: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            scratch_root: scratch_root.into(),
            namespace: namespace.into(),
        }
    }

    /// Local path for an employee's artifact. Pure function of its inputs.
    pub fn local_path(&self, check: CheckType, employee_number: &str) -> PathBuf {
        self.scratch_root
            .join(check.dir_name())
            .join(check.file_name(employee_number))
    }

    /// Serialize the result, write it locally and upload it.
    pub fn write_and_upload(
        &self,
        result: &VerificationResult,
        check: CheckType,
        store: &dyn ObjectStore,
    ) -> Result<UploadReceipt> {
        let local_path = self.local_path(check, &result.employee_number);
        let dir = local_path
            .parent()
            .context("Artifact path has no parent directory")?;
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create scratch directory: {}", dir.display()))?;

        let body = serde_json::to_vec(&result.to_document())
            .context("Failed to serialize verification result")?;
        fs::write(&local_path, &body)
            .with_context(|| format!("Failed to write artifact: {}", local_path.display()))?;

        let key = storage_key(&self.namespace, &local_path)?;
        store
            .upload_file(&local_path, &key)
            .with_context(|| format!("Failed to upload {} to {key}", local_path.display()))?;

        Ok(UploadReceipt {
            key,
            local_path,
            sha256: hex::encode(Sha256::digest(&body)),
        })
    }
}

/// `<namespace>/<parent dir name>/<file name>` for a local artifact path.
pub fn storage_key(namespace: &str, local_path: &Path) -> Result<String> {
    let file_name = local_path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Artifact path has no file name: {}", local_path.display()))?;
    let parent = local_path
        .parent()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
        .with_context(|| {
            format!(
                "Artifact path has no parent directory: {}",
                local_path.display()
            )
        })?;

    Ok(format!(
        "{}/{parent}/{file_name}",
        namespace.trim_end_matches('/')
    ))
}
