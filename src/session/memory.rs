//! In-memory session store implementation using `DashMap`.
//!
//! Data is lost on process restart. Values are stored as encoded JSON so the
//! same bytes could be handed to any external key-value backend.

use super::{SessionStore, VisitState, VisitUpdate};
use crate::Result;
use dashmap::DashMap;

/// In-memory per-visit store using a concurrent hashmap.
///
/// `update` holds the entry's shard lock across decode, apply and encode,
/// so concurrent updates to one key serialize.
///
/// # Example
///
/// ```rust
/// use splitdb::session::{MemorySessionStore, SessionStore, VisitState};
///
/// # async fn example() -> splitdb::Result<()> {
/// let store = MemorySessionStore::new();
/// store.save("visit-1", &VisitState::default()).await?;
/// assert!(store.load("visit-1").await?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, Vec<u8>>,
}

impl MemorySessionStore {
    /// Create an empty session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored visit records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Store raw bytes under a key, bypassing encoding.
    pub fn insert_raw(&self, key: &str, bytes: Vec<u8>) {
        self.sessions.insert(key.to_string(), bytes);
    }
}

impl SessionStore for MemorySessionStore {
    async fn load(&self, key: &str) -> Result<Option<VisitState>> {
        match self.sessions.get(key) {
            Some(bytes) => VisitState::decode(bytes.value()).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, key: &str, state: &VisitState) -> Result<()> {
        self.sessions.insert(key.to_string(), state.encode()?);
        Ok(())
    }

    async fn update(&self, key: &str, update: &VisitUpdate) -> Result<VisitState> {
        let mut entry = self.sessions.entry(key.to_string()).or_default();
        let mut state = if entry.is_empty() {
            VisitState::default()
        } else {
            VisitState::decode(entry.value())?
        };
        update.apply_to(&mut state);
        *entry.value_mut() = state.encode()?;
        Ok(state)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.sessions.remove(key);
        Ok(())
    }
}
