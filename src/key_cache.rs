use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::Result;
use crate::key_directory::KeySet;
use crate::key_directory::KeySource;

/// Holds the most recently fetched key set until it is explicitly reset
///
/// There is no TTL: the provider rotates keys, and callers reset the cache
/// when a token names a key that is not in the held set. The lock is held
/// across check, fetch and store so that callers racing on an empty cache
/// trigger a single fetch.
pub struct KeyCache {
    keys: Mutex<Option<Arc<KeySet>>>,
    source: Arc<dyn KeySource>,
}

impl KeyCache {
    pub fn new(source: Arc<dyn KeySource>) -> Self {
        Self {
            keys: Mutex::new(None),
            source,
        }
    }

    /// Return the held key set, fetching it first if the cache is empty
    ///
    /// A failed fetch leaves the cache empty, so the next call retries.
    pub async fn get_or_fetch(&self) -> Result<Arc<KeySet>> {
        let mut keys = self.keys.lock().await;

        if let Some(cached) = keys.as_ref() {
            tracing::debug!(keys = cached.len(), "using cached signing keys");
            return Ok(Arc::clone(cached));
        }

        let fetched = Arc::new(self.source.fetch_current_keys().await?);
        tracing::info!(keys = fetched.len(), "refreshed signing keys");
        *keys = Some(Arc::clone(&fetched));

        Ok(fetched)
    }

    /// Drop the held key set; the next [`get_or_fetch`](Self::get_or_fetch) fetches again.
    pub async fn reset(&self) {
        if self.keys.lock().await.take().is_some() {
            tracing::info!("signing keys reset");
        }
    }

    pub async fn is_populated(&self) -> bool {
        self.keys.lock().await.is_some()
    }
}
