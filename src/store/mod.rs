//! Persistence for the project collection.
//!
//! The collection is read and written whole through a narrow key-value
//! contract, so the backing medium can change without touching the timer.

mod projects;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use anyhow::Result;

use crate::db::Database;

pub use projects::{ProjectStore, PROJECTS_KEY};

/// String-keyed storage holding serialized documents.
///
/// A missing key is `Ok(None)`, never an error.
pub trait KeyValueStore: Send + Sync + 'static {
    fn get_item(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    fn set_item(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;
}

impl KeyValueStore for Database {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Database::get_item(self, key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        Database::set_item(self, key, value).await
    }
}

/// Volatile store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
