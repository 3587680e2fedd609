use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;

const FILE_PREFIX: &str = "google-id-token";

/// Storage for the last ID token obtained per client id
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// The stored token, or `None` if nothing was stored for `client_id`
    async fn load(&self, client_id: &str) -> Result<Option<String>>;

    async fn save(&self, client_id: &str, token: &str) -> Result<()>;
}

/// Keeps one file per client id in a directory
///
/// File names are derived from a 32-bit FNV-1a hash of the client id, so
/// arbitrary client ids map to safe names.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the user's cache directory (`~/.cache` on Linux,
    /// `~/Library/Caches` on macOS), or the working directory if there is none.
    pub fn in_cache_dir() -> Self {
        Self::new(dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, client_id: &str) -> PathBuf {
        self.dir
            .join(format!("{FILE_PREFIX}-{}", fnv1a_32(client_id.as_bytes())))
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self, client_id: &str) -> Result<Option<String>> {
        let path = self.path_for(client_id);

        match tokio::fs::read_to_string(&path).await {
            Ok(token) if token.trim().is_empty() => Ok(None),
            Ok(token) => Ok(Some(token.trim().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, client_id: &str, token: &str) -> Result<()> {
        let path = self.path_for(client_id);
        tokio::fs::write(&path, token).await?;
        tracing::debug!(path = %path.display(), "stored ID token");
        Ok(())
    }
}

fn fnv1a_32(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    bytes.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(PRIME)
    })
}
