use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::RevocationStore;
use crate::TokenError;

/// Single-replica revocation set: a map from token string to its expiry
/// instant. Expired entries are swept lazily on access rather than by a
/// background task, which is enough for one process and loses nothing on
/// restart that the token's own expiry wouldn't have discarded anyway.
#[derive(Default)]
pub struct InMemoryRevocationStore {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryRevocationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, token: &str, remaining_ttl: Duration) -> Result<(), TokenError> {
        let mut entries = self.entries.write().await;
        entries.insert(token.to_string(), Utc::now() + remaining_ttl);
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, TokenError> {
        let mut entries = self.entries.write().await;
        match entries.get(token) {
            Some(expires_at) if *expires_at > Utc::now() => Ok(true),
            Some(_) => {
                entries.remove(token);
                Ok(false)
            }
            None => Ok(false),
        }
    }
}
