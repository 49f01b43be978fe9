/*!
 * Entity store seam.
 *
 * The pipeline only reads entities for one title at the start of a
 * chapter and, after detection, adds new names best-effort. Stores never
 * abort a chapter: a failed load is treated as an empty set by the caller
 * and `add` reports per-name results instead of failing.
 */

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;

use crate::entities::model::{Entity, EntitySet, DEFAULT_CATEGORY};
use crate::errors::EntityStoreError;

/// Per-name outcome of `EntityStore::add`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddReport {
    /// Names the store accepted
    pub added: Vec<String>,
    /// Names the store rejected, with the reason
    pub failed: Vec<(String, String)>,
}

impl AddReport {
    /// Report that marks every name as failed for the same reason
    pub fn all_failed(names: &[String], reason: &str) -> Self {
        Self {
            added: Vec::new(),
            failed: names.iter().map(|n| (n.clone(), reason.to_string())).collect(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Persistent entity storage, keyed by title
#[async_trait]
pub trait EntityStore: Send + Sync + Debug {
    /// All entities of a title; an unknown title is an empty set
    async fn load(&self, title: &str) -> Result<EntitySet, EntityStoreError>;

    /// Register untranslated names; never aborts on a single failure
    async fn add(&self, title: &str, names: &[String]) -> AddReport;
}

/// Store used when none is configured
#[derive(Debug, Default)]
pub struct NullEntityStore;

#[async_trait]
impl EntityStore for NullEntityStore {
    async fn load(&self, _title: &str) -> Result<EntitySet, EntityStoreError> {
        Ok(EntitySet::new())
    }

    async fn add(&self, _title: &str, names: &[String]) -> AddReport {
        AddReport::all_failed(names, &EntityStoreError::Unavailable.to_string())
    }
}

/// Process-local store for tests and dry runs
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    titles: RwLock<HashMap<String, EntitySet>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a title
    pub fn with_entities(self, title: impl Into<String>, entities: EntitySet) -> Self {
        self.titles.write().insert(title.into(), entities);
        self
    }

    /// Copy of a title's current entities
    pub fn snapshot(&self, title: &str) -> EntitySet {
        self.titles.read().get(title).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn load(&self, title: &str) -> Result<EntitySet, EntityStoreError> {
        Ok(self.snapshot(title))
    }

    async fn add(&self, title: &str, names: &[String]) -> AddReport {
        let mut titles = self.titles.write();
        let set = titles.entry(title.to_string()).or_default();
        let mut report = AddReport::default();

        for name in names {
            if name.trim().is_empty() {
                report.failed.push((name.clone(), "empty name".to_string()));
                continue;
            }
            if !set.contains(name) {
                set.insert(Entity::new(name.clone()).with_category(DEFAULT_CATEGORY));
            }
            report.added.push(name.clone());
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inMemory_load_withUnknownTitle_shouldReturnEmptySet() {
        let store = InMemoryEntityStore::new();
        assert!(store.load("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inMemory_add_shouldRegisterWithoutTranslations() {
        let store = InMemoryEntityStore::new();
        let report = store.add("novel", &["아이라".to_string(), " ".to_string()]).await;

        assert_eq!(report.added, vec!["아이라".to_string()]);
        assert_eq!(report.failed.len(), 1);

        let set = store.load("novel").await.unwrap();
        let entity = set.get("아이라").unwrap();
        assert!(entity.translations.is_empty());
        assert_eq!(entity.category.as_deref(), Some(DEFAULT_CATEGORY));
    }

    #[tokio::test]
    async fn test_nullStore_shouldLoadEmptyAndRejectAdds() {
        let store = NullEntityStore;
        assert!(store.load("any").await.unwrap().is_empty());
        let report = store.add("any", &["x".to_string()]).await;
        assert!(!report.is_complete());
    }
}
