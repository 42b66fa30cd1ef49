//! On-disk content store for blobs addressed by digest.

use crate::digest::Digest;
use crate::error::{ExtensionError, Result};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

/// An OCI content descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub media_type: String,
    pub digest: Digest,
    pub size: u64,
}

impl Descriptor {
    /// Builds a descriptor from parts already known to the caller.
    pub fn new(media_type: impl Into<String>, digest: Digest, size: u64) -> Self {
        Self {
            media_type: media_type.into(),
            digest,
            size,
        }
    }

    /// Describes `data` by its sha256 digest and length.
    pub fn for_bytes(media_type: impl Into<String>, data: &[u8]) -> Self {
        Self::new(media_type, Digest::from_bytes(data), data.len() as u64)
    }
}

/// A content-addressable blob directory laid out as
/// `<root>/blobs/<algorithm>/<hex>`.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
    _temp_dir: Option<Arc<tempfile::TempDir>>,
}

impl ContentStore {
    /// Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            _temp_dir: None,
        }
    }

    /// A store in a fresh temporary directory, removed when the last clone
    /// is dropped.
    pub fn temp() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        Ok(Self {
            root: temp_dir.path().to_path_buf(),
            _temp_dir: Some(Arc::new(temp_dir)),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the blob named by `digest` lives on disk.
    pub fn blob_path(&self, digest: &Digest) -> PathBuf {
        self.root
            .join("blobs")
            .join(digest.algorithm().as_str())
            .join(digest.hex())
    }

    /// Writes `data` under its own sha256 digest. Rewriting the same bytes
    /// is harmless.
    pub async fn write_blob(&self, data: &[u8]) -> io::Result<Digest> {
        let digest = Digest::from_bytes(data);
        let path = self.blob_path(&digest);

        let dir = path.parent().unwrap_or(self.root.as_path());
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o755);
        builder.create(dir).await?;

        // Readers only ever see a missing or complete blob.
        let partial = dir.join(format!(".{}.{}.partial", digest.hex(), Uuid::new_v4()));
        if let Err(e) = write_new_file(&partial, data).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&partial, &path).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }

        debug!("Stored blob {} ({} bytes)", digest, data.len());
        Ok(digest)
    }

    /// Writes `data` and returns its descriptor.
    pub async fn add_blob(&self, media_type: impl Into<String>, data: &[u8]) -> Result<Descriptor> {
        let digest = self.write_blob(data).await?;
        Ok(Descriptor::new(media_type, digest, data.len() as u64))
    }

    /// Returns true if a blob with this digest has been written.
    pub async fn contains(&self, digest: &Digest) -> Result<bool> {
        Ok(fs::try_exists(self.blob_path(digest)).await?)
    }

    /// Reads the blob a descriptor names, checking its size and digest.
    pub async fn read_blob(&self, descriptor: &Descriptor) -> Result<Vec<u8>> {
        let path = self.blob_path(&descriptor.digest);

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ExtensionError::BlobMissing(descriptor.digest.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        if data.len() as u64 != descriptor.size || !descriptor.digest.verify(&data) {
            return Err(ExtensionError::BlobMismatch(descriptor.digest.clone()));
        }

        Ok(data)
    }
}

async fn write_new_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o664);

    let mut file = options.open(path).await?;
    file.write_all(data).await?;
    file.flush().await?;
    Ok(())
}
