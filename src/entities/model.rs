/*!
 * Entity records and the per-title entity set.
 *
 * The wire format is shared by the HTTP store and the JSON file store:
 * either `{"entities": [...]}` or a bare list, each record carrying
 * `source_text`, `locked` (default true) and a `translations` map. Older
 * records with a single `translation` string are read as English.
 */

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::errors::EntityStoreError;
use crate::translation::placeholder::EntityLookup;

/// Category attached to entities registered by the pipeline ("other")
pub const DEFAULT_CATEGORY: &str = "기타";

/// Language assumed for a legacy single `translation` value
const LEGACY_TRANSLATION_LANGUAGE: &str = "en";

fn default_locked() -> bool {
    true
}

/// A proper noun tracked across the chapters of one title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Name as it appears in the source text
    pub source_text: String,
    /// Whether the translations are authoritative
    #[serde(default = "default_locked")]
    pub locked: bool,
    /// Target language code -> display value
    #[serde(default)]
    pub translations: HashMap<String, String>,
    /// Free-form grouping used by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Entity {
    /// Locked entity without translations
    pub fn new(source_text: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            locked: true,
            translations: HashMap::new(),
            category: None,
        }
    }

    /// Add or replace one translation
    pub fn with_translation(mut self, language: impl Into<String>, value: impl Into<String>) -> Self {
        self.translations.insert(language.into(), value.into());
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Parse one wire record, tolerating legacy and malformed fields
    pub fn from_wire(record: &Value) -> Option<Self> {
        let source_text = record.get("source_text")?.as_str()?.to_string();
        if source_text.trim().is_empty() {
            return None;
        }

        // Only a real boolean `true` locks; a missing field defaults to locked
        let locked = match record.get("locked") {
            None | Some(Value::Null) => true,
            Some(Value::Bool(locked)) => *locked,
            Some(_) => false,
        };

        let translations = match record.get("translations") {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(lang, value)| value.as_str().map(|v| (lang.clone(), v.to_string())))
                .collect(),
            _ => match record.get("translation").and_then(Value::as_str) {
                Some(value) if !value.is_empty() => {
                    HashMap::from([(LEGACY_TRANSLATION_LANGUAGE.to_string(), value.to_string())])
                }
                _ => HashMap::new(),
            },
        };

        let category = record.get("category").and_then(Value::as_str).map(str::to_string);

        Some(Self { source_text, locked, translations, category })
    }
}

/// All entities known for one title, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySet {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set; a later record with the same name replaces an earlier one
    pub fn from_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let mut set = Self::new();
        for entity in entities {
            set.insert(entity);
        }
        set
    }

    /// Insert or replace by source name
    pub fn insert(&mut self, entity: Entity) {
        match self.index.get(&entity.source_text) {
            Some(&position) => self.entities[position] = entity,
            None => {
                self.index.insert(entity.source_text.clone(), self.entities.len());
                self.entities.push(entity);
            }
        }
    }

    pub fn get(&self, source_text: &str) -> Option<&Entity> {
        self.index.get(source_text).map(|&position| &self.entities[position])
    }

    pub fn contains(&self, source_text: &str) -> bool {
        self.index.contains_key(source_text)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Locked entities that carry a translation for `target_language`,
    /// as a `source -> translation` map
    pub fn resolve_locked(&self, target_language: &str) -> HashMap<String, String> {
        self.entities
            .iter()
            .filter(|entity| entity.locked)
            .filter_map(|entity| {
                entity.translations
                    .get(target_language)
                    .map(|value| (entity.source_text.clone(), value.clone()))
            })
            .collect()
    }

    /// Parse a store payload: `{"entities": [...]}` or a bare list
    pub fn from_payload(payload: &Value) -> Result<Self, EntityStoreError> {
        let records = match payload {
            Value::Array(records) => records.as_slice(),
            Value::Object(map) => match map.get("entities") {
                Some(Value::Array(records)) => records.as_slice(),
                Some(other) => {
                    return Err(EntityStoreError::ParseError(format!(
                        "'entities' is not a list: {}",
                        other
                    )))
                }
                None => &[],
            },
            other => {
                return Err(EntityStoreError::ParseError(format!(
                    "Unexpected entity payload: {}",
                    other
                )))
            }
        };

        let mut skipped = 0;
        let set = Self::from_entities(records.iter().filter_map(|record| {
            let parsed = Entity::from_wire(record);
            if parsed.is_none() {
                skipped += 1;
            }
            parsed
        }));

        if skipped > 0 {
            warn!("Skipped {} entity record(s) without a usable source_text", skipped);
        }

        Ok(set)
    }

    /// Serialize as `{"entities": [...]}`
    pub fn to_payload(&self) -> Value {
        serde_json::json!({ "entities": self.entities })
    }
}

impl EntityLookup for EntitySet {
    // Only locked entities are shielded; unlocked names are left to the translator
    fn entity_names(&self) -> Vec<&str> {
        self.entities
            .iter()
            .filter(|entity| entity.locked)
            .map(|entity| entity.source_text.as_str())
            .collect()
    }

    fn resolve(&self, source_name: &str, target_language: &str) -> Option<&str> {
        self.get(source_name)
            .filter(|entity| entity.locked)
            .and_then(|entity| entity.translations.get(target_language))
            .map(String::as_str)
    }
}
