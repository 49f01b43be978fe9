/*!
 * Tests for the entity model and the local stores
 */

use serde_json::json;

use novelwai::entities::{Entity, EntitySet, EntityStore, InMemoryEntityStore, JsonFileEntityStore, NullEntityStore};
use crate::common;

#[test]
fn test_fromPayload_withMixedRecords_shouldApplyDefaults() {
    let payload = json!({
        "entities": [
            { "source_text": "아이라 푸트리", "translations": { "en": "Aira Putri" } },
            { "source_text": "레온", "locked": false, "translations": { "en": "Leon" } },
            { "source_text": "메르세데스", "translation": "Mercedes" },
            { "source_text": "" },
            "not an object"
        ]
    });

    let set = EntitySet::from_payload(&payload).unwrap();

    assert_eq!(set.len(), 3);
    let resolved = set.resolve_locked("en");
    assert_eq!(resolved.get("아이라 푸트리").map(String::as_str), Some("Aira Putri"));
    assert_eq!(resolved.get("메르세데스").map(String::as_str), Some("Mercedes"));
    assert!(!resolved.contains_key("레온"));
}

#[test]
fn test_resolveLocked_withOtherTarget_shouldDropEntitiesWithoutTranslation() {
    let set = EntitySet::from_entities([
        Entity::new("아이라").with_translation("en", "Aira"),
        Entity::new("레온").with_translation("ja", "レオン"),
    ]);

    let resolved = set.resolve_locked("ja");

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved["레온"], "レオン");
}

#[tokio::test]
async fn test_inMemoryStore_add_shouldMakeNamesLoadable() {
    let store = InMemoryEntityStore::new();

    let report = store.add("novel", &["아이라".to_string(), "레온".to_string()]).await;
    assert!(report.is_complete());

    let set = store.load("novel").await.unwrap();
    assert!(set.contains("아이라"));
    assert!(set.contains("레온"));
    assert!(store.load("other").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_nullStore_shouldNeverAbortBatch() {
    let report = NullEntityStore.add("novel", &["a".to_string(), "b".to_string()]).await;
    assert!(report.added.is_empty());
    assert_eq!(report.failed.len(), 2);
}

#[tokio::test]
async fn test_fileStore_shouldReadStorageApiPayload() {
    let dir = common::create_temp_dir().unwrap();
    let store = JsonFileEntityStore::new(dir.path());
    let payload = json!([{ "source_text": "아이라", "translations": { "ko": "아이라", "en": "Aira" } }]);
    std::fs::write(store.path_for("my novel"), payload.to_string()).unwrap();

    let set = store.load("my novel").await.unwrap();

    assert_eq!(set.resolve_locked("en")["아이라"], "Aira");
}
