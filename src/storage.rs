use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;

use chrono::Utc;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::domain::sanitize_file_name;

const MAX_NAME_ATTEMPTS: u32 = 100;

/// Where uploaded document contents live.
/// Implemented per backend so tests and deployments can swap it.
#[async_trait::async_trait]
pub trait FileStore: Send + Sync {
    /// Store `contents` under a unique name derived from `file_name`, returning its path
    async fn save(&self, file_name: &str, contents: &[u8]) -> anyhow::Result<String>;

    /// Remove a previously saved file
    async fn remove(&self, path: &str) -> anyhow::Result<()>;
}

/// Stores files in a directory on the local disk
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<millis>-<name>`, with a counter after the timestamp once that name is taken
    fn stored_name(millis: i64, sanitized: &str, attempt: u32) -> String {
        if attempt == 0 {
            format!("{}-{}", millis, sanitized)
        } else {
            format!("{}-{}-{}", millis, attempt, sanitized)
        }
    }
}

#[async_trait::async_trait]
impl FileStore for LocalFileStore {
    #[tracing::instrument("Save uploaded file", skip(self, contents), fields(size = contents.len()))]
    async fn save(&self, file_name: &str, contents: &[u8]) -> anyhow::Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .context("Failed to create upload directory")?;

        let sanitized = match sanitize_file_name(file_name) {
            name if name.is_empty() => "upload".to_string(),
            name => name,
        };
        let millis = Utc::now().timestamp_millis();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.root.join(Self::stored_name(millis, &sanitized, attempt));
            // Never reuse a path another upload already owns
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create {}", path.display()))
                }
            };
            file.write_all(contents)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            file.flush()
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;

            return Ok(path.to_string_lossy().into_owned());
        }

        anyhow::bail!("No free file name for {} in the upload directory", sanitized)
    }

    #[tracing::instrument("Remove stored file", skip(self))]
    async fn remove(&self, path: &str) -> anyhow::Result<()> {
        let path = Path::new(path);
        if !path.starts_with(&self.root) {
            anyhow::bail!("{} is outside the upload directory", path.display());
        }
        tokio::fs::remove_file(path)
            .await
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        Ok(())
    }
}
