use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::entities::model::{Entity, EntitySet, DEFAULT_CATEGORY};
use crate::entities::store::{AddReport, EntityStore};
use crate::errors::EntityStoreError;

/// Entity store kept as one JSON file per title: `{dir}/{title}.json`
///
/// Same wire format as the storage API, for offline work.
#[derive(Debug)]
pub struct JsonFileEntityStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles of `add`
    write_lock: Mutex<()>,
}

impl JsonFileEntityStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), write_lock: Mutex::new(()) }
    }

    /// File holding a title's entities
    pub fn path_for(&self, title: &str) -> PathBuf {
        let file_name: String = title
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':' | '\0') { '_' } else { c })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }

    async fn read_set(path: &Path) -> Result<EntitySet, EntityStoreError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(EntitySet::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(EntitySet::new());
        }

        let payload: Value = serde_json::from_str(&content)
            .map_err(|e| EntityStoreError::ParseError(format!("{}: {}", path.display(), e)))?;
        EntitySet::from_payload(&payload)
    }

    async fn write_set(path: &Path, set: &EntitySet) -> Result<(), EntityStoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(&set.to_payload())
            .map_err(|e| EntityStoreError::ParseError(e.to_string()))?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl EntityStore for JsonFileEntityStore {
    async fn load(&self, title: &str) -> Result<EntitySet, EntityStoreError> {
        let path = self.path_for(title);
        debug!("Loading entities from {:?}", path);
        Self::read_set(&path).await
    }

    async fn add(&self, title: &str, names: &[String]) -> AddReport {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(title);

        let mut set = match Self::read_set(&path).await {
            Ok(set) => set,
            Err(e) => return AddReport::all_failed(names, &e.to_string()),
        };

        let mut accepted = Vec::new();
        for name in names.iter().filter(|n| !n.trim().is_empty()) {
            if !set.contains(name) {
                set.insert(Entity::new(name.clone()).with_category(DEFAULT_CATEGORY));
            }
            accepted.push(name.clone());
        }

        match Self::write_set(&path, &set).await {
            Ok(()) => AddReport {
                failed: names
                    .iter()
                    .filter(|n| n.trim().is_empty())
                    .map(|n| (n.clone(), "empty name".to_string()))
                    .collect(),
                added: accepted,
            },
            Err(e) => AddReport::all_failed(names, &e.to_string()),
        }
    }
}
