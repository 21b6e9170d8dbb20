//! Extension trait for [`ContentStore`] with typed convenience methods.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ContentStore;

/// Typed JSON access on top of any [`ContentStore`].
///
/// [`ContentStore`] stays object-safe and byte-oriented; callers get
/// `get_json`/`set_json` via a blanket impl. A blob that fails to deserialize
/// is reported as a miss so a corrupt entry is simply recomputed.
#[async_trait]
pub trait ContentStoreExt: ContentStore {
    /// Retrieve a JSON-deserialized value.
    ///
    /// Returns `None` on miss or deserialization failure.
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Option<T> {
        let bytes = self.get(key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(error = %e, "Discarding unreadable content store entry");
                None
            }
        }
    }

    /// Store a value as JSON.
    ///
    /// Silently does nothing if serialization fails.
    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) {
        if let Ok(bytes) = serde_json::to_vec(value) {
            self.set(key, &bytes).await;
        }
    }
}

impl<S: ContentStore + ?Sized> ContentStoreExt for S {}
