/*!
 * Tests for placeholder substitution and restoration
 */

use std::collections::HashMap;

use novelwai::entities::{Entity, EntitySet};
use novelwai::translation::placeholder::{
    apply_placeholders, find_residual_tokens, restore_placeholders, PlaceholderCodec,
};

fn resolved(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn test_roundTrip_withLockedEnglishEntities_shouldReproduceInput() {
    let entities = EntitySet::from_entities([
        Entity::new("Aira Putri").with_translation("en", "Aira Putri"),
        Entity::new("Mercedes").with_translation("en", "Mercedes"),
    ]);
    let text = "Aira Putri got into the white Mercedes van.";

    let (masked, mapping) = apply_placeholders(text, &entities);

    assert_eq!(mapping.len(), 2);
    assert!(!masked.contains("Aira"));
    assert!(!masked.contains("Mercedes"));
    let tokens = mapping.tokens();
    assert_ne!(tokens[0], tokens[1]);

    let restored = restore_placeholders(&masked, &mapping, &entities, "en");
    assert_eq!(restored, text);
    assert!(find_residual_tokens(&restored).is_empty());
}

#[test]
fn test_apply_withOverlappingNames_shouldNeverLeaveDanglingSuffix() {
    let entities = resolved(&[("Aira", "アイラ"), ("Aira Putri", "アイラ・プトリ")]);
    let (masked, mapping) = apply_placeholders("Aira Putri smiled at Aira.", &entities);

    assert!(!masked.contains("Putri"));
    assert_eq!(mapping.len(), 2);

    let restored = restore_placeholders(&masked, &mapping, &entities, "ja");
    assert_eq!(restored, "アイラ・プトリ smiled at アイラ.");
}

#[test]
fn test_apply_withNameInsideLargerWord_shouldNotReplace() {
    let entities = resolved(&[("An", "安")]);
    let (masked, mapping) = apply_placeholders("Anna met An.", &entities);

    assert_eq!(mapping.len(), 1);
    assert!(masked.starts_with("Anna met "));
    assert_eq!(restore_placeholders(&masked, &mapping, &entities, "zh"), "Anna met 安.");
}

#[test]
fn test_restore_withoutTargetTranslation_shouldFallBackToSourceName() {
    let entities = EntitySet::from_entities([Entity::new("레온").with_translation("ja", "レオン")]);
    let codec = PlaceholderCodec::sequential();

    let (masked, mapping) = codec.apply("레온 !", &entities);
    let restored = codec.restore(&masked, &mapping, &entities, "en");

    assert_eq!(restored, "레온 !");
}

#[test]
fn test_apply_withUnlockedEntity_shouldLeaveNameInPlace() {
    let entities = EntitySet::from_entities([Entity::new("Leon").with_translation("en", "Leon").with_locked(false)]);
    let (masked, mapping) = apply_placeholders("Leon waited.", &entities);

    assert!(mapping.is_empty());
    assert_eq!(masked, "Leon waited.");
}

#[test]
fn test_restore_shouldRemoveEveryInsertedToken() {
    let entities = resolved(&[("Kang", "강"), ("Seoul", "서울"), ("Han River", "한강")]);
    let texts = [
        "Kang walked along the Han River in Seoul.",
        "Seoul, Seoul, Seoul.",
        "Nobody named here.",
        "Kang\n\nKang",
    ];

    for text in texts {
        let (masked, mapping) = apply_placeholders(text, &entities);
        let restored = restore_placeholders(&masked, &mapping, &entities, "ko");
        assert!(find_residual_tokens(&restored).is_empty(), "residue in {:?}", restored);
    }
}

#[test]
fn test_findResidualTokens_shouldReportUnknownTokens() {
    let residue = find_residual_tokens("a __ENTITY_deadbeef__ b __ENTITY_7__");
    assert_eq!(residue, vec!["__ENTITY_deadbeef__".to_string(), "__ENTITY_7__".to_string()]);
}
