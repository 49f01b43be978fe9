/*!
 * End-to-end tests of the chapter pipeline over mock collaborators
 */

use std::sync::Arc;

use novelwai::entities::{Entity, EntitySet, EntityStore, InMemoryEntityStore};
use novelwai::errors::PipelineError;
use novelwai::providers::mock::MockProvider;
use novelwai::text::count_paragraphs;
use novelwai::translation::TranslatorSettings;

use crate::common::{init_test_logging, quiet_settings, translator_with, UnavailableEntityStore, SAMPLE_CHAPTER};

fn store_with(entities: Vec<Entity>) -> Arc<dyn EntityStore> {
    Arc::new(InMemoryEntityStore::new().with_entities("novel", EntitySet::from_entities(entities)))
}

#[tokio::test]
async fn test_translate_withShortParagraphs_shouldKeepParagraphCount() {
    let translator = translator_with(MockProvider::working(), Arc::new(InMemoryEntityStore::new()), quiet_settings());

    let result = translator.translate_chapter("novel", SAMPLE_CHAPTER, "ko", "de").await.unwrap();

    assert_eq!(count_paragraphs(&result.text), count_paragraphs(SAMPLE_CHAPTER));
    assert_eq!(result.text, SAMPLE_CHAPTER);
    assert_eq!(result.stats.paragraphs, 3);
    assert_eq!(result.stats.output_paragraphs, 3);
}

#[tokio::test]
async fn test_translate_withLockedEntities_shouldHideNamesFromProvider() {
    let provider = MockProvider::working();
    let store = store_with(vec![
        Entity::new("아이라").with_translation("en", "Aira"),
        Entity::new("레온").with_translation("en", "Leon"),
    ]);
    let translator = translator_with(provider.clone(), store, quiet_settings());

    let result = translator
        .translate_chapter("novel", "아이라 그리고 레온.\n\n\"레온, 거기 있어?\"", "ko", "en")
        .await
        .unwrap();

    for request in provider.recorded_requests() {
        assert!(!request.user_text().contains("아이라"));
        assert!(!request.user_text().contains("레온"));
        assert!(request.user_text().contains("__ENTITY_"));
    }
    assert_eq!(result.text, "Aira 그리고 Leon.\n\n\"Leon, 거기 있어?\"");
    assert_eq!(result.stats.entities_resolved, 2);
    assert_eq!(result.stats.placeholders_applied, 3);
    assert!(result.stats.residual_tokens.is_empty());
}

#[tokio::test]
async fn test_translate_withOverlappingNames_shouldRestoreLongestFirst() {
    let store = store_with(vec![
        Entity::new("Aira").with_translation("ja", "アイラ"),
        Entity::new("Aira Putri").with_translation("ja", "アイラ・プトリ"),
    ]);
    let translator = translator_with(MockProvider::working(), store, quiet_settings());

    let result = translator.translate_chapter("novel", "Aira Putri waved at Aira.", "ko", "ja").await.unwrap();

    assert_eq!(result.text, "アイラ・プトリ waved at アイラ.");
}

#[tokio::test]
async fn test_translate_withUnlockedEntity_shouldLeaveNameToProvider() {
    let provider = MockProvider::working();
    let store = store_with(vec![Entity::new("레온").with_translation("en", "Leon").with_locked(false)]);
    let translator = translator_with(provider.clone(), store, quiet_settings());

    let result = translator.translate_chapter("novel", "레온.", "ko", "en").await.unwrap();

    assert_eq!(result.text, "레온.");
    assert_eq!(result.stats.placeholders_applied, 0);
    assert!(provider.recorded_requests()[0].user_text().contains("레온"));
}

#[tokio::test]
async fn test_translate_withFailingProvider_shouldPassThroughEveryStage() {
    init_test_logging();
    let provider = MockProvider::failing();
    let translator = translator_with(provider.clone(), Arc::new(InMemoryEntityStore::new()), quiet_settings());

    let en = translator.translate_chapter("novel", SAMPLE_CHAPTER, "ko", "en").await.unwrap();
    assert_eq!(en.text, SAMPLE_CHAPTER);
    assert_eq!(en.stats.stage_fallbacks, 3 * 3);

    let de = translator.translate_chapter("novel", SAMPLE_CHAPTER, "ko", "de").await.unwrap();
    assert_eq!(de.stats.stage_fallbacks, 3 * 2);
    assert_eq!(provider.request_count(), 9 + 6);
}

#[tokio::test]
async fn test_translate_withEmptyAnswers_shouldCountFallbacks() {
    let translator = translator_with(MockProvider::empty(), Arc::new(InMemoryEntityStore::new()), quiet_settings());

    let result = translator.translate_chapter("novel", "한 문단.", "ko", "fr").await.unwrap();

    assert_eq!(result.text, "한 문단.");
    assert_eq!(result.stats.stage_fallbacks, 2);
}

#[tokio::test]
async fn test_translate_withAnswerDroppingPlaceholder_shouldFallBackPerStage() {
    init_test_logging();
    let provider = MockProvider::working().with_custom_response(|_| "Nobody smiled.".to_string());
    let store = store_with(vec![Entity::new("아이라").with_translation("de", "Aira")]);
    let translator = translator_with(provider.clone(), store, quiet_settings());

    let result = translator.translate_chapter("novel", "아이라, 그녀가 웃었다.", "ko", "de").await.unwrap();

    assert_eq!(result.text, "Aira, 그녀가 웃었다.");
    assert_eq!(result.stats.stage_fallbacks, 2);
    assert_eq!(provider.request_count(), 2);
    // The second stage still saw the token, not the first stage's answer
    assert!(provider.recorded_requests()[1].user_text().contains("__ENTITY_"));
}

#[tokio::test]
async fn test_translate_withAnswerKeepingPlaceholder_shouldAcceptIt() {
    let provider = MockProvider::working().with_custom_response(|request| {
        request.user_text().replace("그녀가 웃었다", "sie lachte")
    });
    let store = store_with(vec![Entity::new("아이라").with_translation("de", "Aira")]);
    let translator = translator_with(provider, store, quiet_settings());

    let result = translator.translate_chapter("novel", "아이라, 그녀가 웃었다.", "ko", "de").await.unwrap();

    assert_eq!(result.text, "Aira, sie lachte.");
    assert_eq!(result.stats.stage_fallbacks, 0);
}

#[tokio::test]
async fn test_translate_withLongParagraph_shouldChunkAndRejoin() {
    let text = "line one here\nline two here\nline three";
    let settings = TranslatorSettings { max_paragraph_chars: 15, ..quiet_settings() };
    let provider = MockProvider::working();
    let translator = translator_with(provider.clone(), Arc::new(InMemoryEntityStore::new()), settings);

    let result = translator.translate_chapter("novel", text, "ko", "de").await.unwrap();

    assert_eq!(result.text, text);
    assert_eq!(result.stats.units, 3);
    assert_eq!(result.stats.chunked_paragraphs, 1);
    assert_eq!(provider.request_count(), 3 * 2);
}

#[tokio::test]
async fn test_translate_withParagraphBreaksFromProvider_shouldStayOneParagraph() {
    let provider = MockProvider::working().with_custom_response(|_| "First half.\n\nSecond half.".to_string());
    let translator = translator_with(provider, Arc::new(InMemoryEntityStore::new()), quiet_settings());

    let result = translator.translate_chapter("novel", "하나.\n\n둘.", "ko", "de").await.unwrap();

    assert_eq!(count_paragraphs(&result.text), 2);
    assert_eq!(result.text, "First half.\nSecond half.\n\nFirst half.\nSecond half.");
}

#[tokio::test]
async fn test_translate_withConcurrentUnits_shouldPreserveOrder() {
    let paragraphs: Vec<String> = (1..=8).map(|i| format!("문단 {}.", i)).collect();
    let text = paragraphs.join("\n\n");
    let settings = TranslatorSettings { concurrent_requests: 4, ..quiet_settings() };
    let translator = translator_with(MockProvider::slow(5), Arc::new(InMemoryEntityStore::new()), settings);

    let result = translator.translate_chapter("novel", &text, "ko", "de").await.unwrap();

    assert_eq!(result.text, text);
}

#[tokio::test]
async fn test_translate_withProgressCallback_shouldReportEveryUnit() {
    let translator = translator_with(MockProvider::working(), Arc::new(InMemoryEntityStore::new()), quiet_settings());
    let calls = std::sync::Mutex::new(Vec::new());

    translator
        .translate_chapter_with_progress("novel", SAMPLE_CHAPTER, "ko", "de", |done, total| {
            calls.lock().unwrap().push((done, total));
        })
        .await
        .unwrap();

    let mut calls = calls.into_inner().unwrap();
    calls.sort();
    assert_eq!(calls, vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn test_translate_withEnglishRhythmPass_shouldApplyBreaks() {
    let text = "It was cold. The wind howled through every gap in the old wooden walls.";
    let settings = TranslatorSettings { rhythm_enabled: true, ..quiet_settings() };
    let provider = MockProvider::working();
    let translator = translator_with(provider.clone(), Arc::new(InMemoryEntityStore::new()), settings);

    let result = translator.translate_chapter("novel", text, "ko", "en").await.unwrap();

    assert!(result.stats.rhythm_applied);
    assert_eq!(result.stats.rhythm_candidates, 1);
    assert_eq!(count_paragraphs(&result.text), 2);
    assert!(!result.text.contains("[[BREAK]]"));
    assert!(result.text.starts_with("It was cold."));
    // Three stages plus the rhythm judgment
    assert_eq!(provider.request_count(), 4);
}

#[tokio::test]
async fn test_translate_withRhythmAnswerChangingContent_shouldKeepRestructuredText() {
    init_test_logging();
    let text = "It was cold. The wind howled through every gap in the old wooden walls.";
    let provider = MockProvider::working().with_custom_response(|request| {
        if request.user_text().contains("[[BREAK]]") {
            "Something else entirely.".to_string()
        } else {
            request.user_text().to_string()
        }
    });
    let settings = TranslatorSettings { rhythm_enabled: true, ..quiet_settings() };
    let translator = translator_with(provider, Arc::new(InMemoryEntityStore::new()), settings);

    let result = translator.translate_chapter("novel", text, "ko", "en").await.unwrap();

    assert!(!result.stats.rhythm_applied);
    assert_eq!(result.text, text);
}

#[tokio::test]
async fn test_translate_withDenseJapaneseParagraph_shouldSplitWithoutRhythmPass() {
    let text = "雨が降った。風が吹いた。猫が鳴いた。犬が吠えた。鳥が飛んだ。夜が来た。";
    let settings = TranslatorSettings { rhythm_enabled: false, ..quiet_settings() };
    let translator = translator_with(MockProvider::working(), Arc::new(InMemoryEntityStore::new()), settings);

    let result = translator.translate_chapter("novel", text, "ko", "ja").await.unwrap();

    assert!(!result.stats.rhythm_applied);
    assert_eq!(result.text, "雨が降った。風が吹いた。猫が鳴いた。犬が吠えた。鳥が飛んだ。\n\n夜が来た。");
}

#[tokio::test]
async fn test_translate_withInvalidInput_shouldFail() {
    let translator = translator_with(MockProvider::working(), Arc::new(InMemoryEntityStore::new()), quiet_settings());

    let empty_title = translator.translate_chapter(" ", SAMPLE_CHAPTER, "ko", "en").await;
    assert!(matches!(empty_title, Err(PipelineError::InvalidInput(_))));

    let bad_target = translator.translate_chapter("novel", SAMPLE_CHAPTER, "ko", "xx").await;
    assert!(matches!(bad_target, Err(PipelineError::InvalidInput(_))));
}

#[tokio::test]
async fn test_translate_withStoreUnavailable_shouldContinueWithoutEntities() {
    init_test_logging();
    let translator = translator_with(MockProvider::working(), Arc::new(UnavailableEntityStore), quiet_settings());

    let result = translator.translate_chapter("novel", SAMPLE_CHAPTER, "ko", "de").await.unwrap();

    assert_eq!(result.text, SAMPLE_CHAPTER);
    assert_eq!(result.stats.entities_resolved, 0);
}

#[tokio::test]
async fn test_registerNewEntities_shouldAddOnlyUnknownNames() {
    let provider = MockProvider::working().with_custom_response(|_| "[\"아이라\", \"레온\"]".to_string());
    let store = Arc::new(
        InMemoryEntityStore::new().with_entities("novel", EntitySet::from_entities([Entity::new("아이라")])),
    );
    let translator = translator_with(provider, store.clone(), quiet_settings());

    let report = translator.register_new_entities("novel", SAMPLE_CHAPTER, "ko").await.unwrap();

    assert_eq!(report.added, vec!["레온".to_string()]);
    assert!(report.failed.is_empty());
    let snapshot = store.snapshot("novel");
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.get("레온").unwrap().translations.is_empty());
}

#[tokio::test]
async fn test_registerNewEntities_withStoreUnavailable_shouldReportFailures() {
    let provider = MockProvider::working().with_custom_response(|_| "[\"레온\"]".to_string());
    let translator = translator_with(provider, Arc::new(UnavailableEntityStore), quiet_settings());

    let report = translator.register_new_entities("novel", SAMPLE_CHAPTER, "ko").await.unwrap();

    assert!(report.added.is_empty());
    assert_eq!(report.failed.len(), 1);
}
