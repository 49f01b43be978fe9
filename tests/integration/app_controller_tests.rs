/*!
 * Tests for the controller's file and directory handling
 */

use std::fs;
use std::sync::Arc;

use novelwai::app_config::Config;
use novelwai::app_controller::{Controller, FolderSummary};
use novelwai::entities::{Entity, EntitySet, InMemoryEntityStore};
use novelwai::providers::mock::MockProvider;

use crate::common::{create_temp_dir, create_test_file, init_test_logging, SAMPLE_CHAPTER};

fn controller(provider: MockProvider, store: InMemoryEntityStore) -> Controller {
    let config = Config { target_language: "de".to_string(), ..Config::default() };
    Controller::with_components(config, Arc::new(provider), Arc::new(store))
}

#[tokio::test]
async fn test_run_shouldWriteLanguageSuffixedOutput() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "ch001.txt", SAMPLE_CHAPTER).unwrap();
    let store = InMemoryEntityStore::new()
        .with_entities("novel", EntitySet::from_entities([Entity::new("레온").with_translation("de", "Leon")]));
    let controller = controller(MockProvider::working(), store);

    let written = controller.run(input, dir.path().to_path_buf(), "novel", false).await.unwrap();

    let output = written.unwrap();
    assert_eq!(output, dir.path().join("ch001.de.txt"));
    let content = fs::read_to_string(&output).unwrap();
    assert!(content.contains("\"Leon, 거기 있어?\""));
    assert_eq!(content.split("\n\n").count(), 3);
}

#[tokio::test]
async fn test_run_withCrlfChapter_shouldKeepParagraphs() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "ch001.txt", "첫 문단.\r\n\r\n둘째 문단.\r\n\r\n셋째 문단.").unwrap();
    let controller = controller(MockProvider::working(), InMemoryEntityStore::new());

    let output = controller.run(input, dir.path().to_path_buf(), "novel", false).await.unwrap().unwrap();

    assert_eq!(fs::read_to_string(output).unwrap(), "첫 문단.\n\n둘째 문단.\n\n셋째 문단.");
}

#[tokio::test]
async fn test_run_withExistingOutput_shouldSkipUnlessForced() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "ch001.txt", SAMPLE_CHAPTER).unwrap();
    create_test_file(dir.path(), "ch001.de.txt", "old").unwrap();
    let provider = MockProvider::working();
    let controller = controller(provider.clone(), InMemoryEntityStore::new());

    let skipped = controller.run(input.clone(), dir.path().to_path_buf(), "novel", false).await.unwrap();
    assert!(skipped.is_none());
    assert_eq!(provider.request_count(), 0);
    assert_eq!(fs::read_to_string(dir.path().join("ch001.de.txt")).unwrap(), "old");

    let forced = controller.run(input, dir.path().to_path_buf(), "novel", true).await.unwrap();
    assert!(forced.is_some());
    assert_eq!(fs::read_to_string(dir.path().join("ch001.de.txt")).unwrap(), SAMPLE_CHAPTER);
}

#[test]
fn test_run_withMissingInput_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let controller = controller(MockProvider::working(), InMemoryEntityStore::new());

    let result = tokio_test::block_on(async {
        controller.run(dir.path().join("missing.txt"), dir.path().to_path_buf(), "novel", false).await
    });

    assert!(result.is_err());
}

#[tokio::test]
async fn test_runFolder_shouldTranslateNewChaptersAndSkipExisting() {
    let dir = create_temp_dir().unwrap();
    let out = dir.path().join("out");
    create_test_file(dir.path(), "ch001.txt", SAMPLE_CHAPTER).unwrap();
    create_test_file(dir.path(), "ch002.txt", "둘째 장.").unwrap();
    fs::create_dir_all(&out).unwrap();
    create_test_file(&out, "ch002.de.txt", "done").unwrap();
    let controller = controller(MockProvider::working(), InMemoryEntityStore::new());

    let summary = controller
        .run_folder(dir.path().to_path_buf(), Some(out.clone()), "novel", false)
        .await
        .unwrap();

    assert_eq!(summary, FolderSummary { translated: 1, skipped: 1, failed: 0 });
    assert!(out.join("ch001.de.txt").exists());
    assert_eq!(fs::read_to_string(out.join("ch002.de.txt")).unwrap(), "done");
}

#[tokio::test]
async fn test_runFolder_withFailingChapter_shouldCountItAndContinue() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    create_test_file(dir.path(), "ch001.txt", SAMPLE_CHAPTER).unwrap();
    create_test_file(dir.path(), "ch002.txt", "둘째 장.").unwrap();
    // A blank title fails every chapter before any request is made
    let controller = controller(MockProvider::working(), InMemoryEntityStore::new());

    let summary = controller.run_folder(dir.path().to_path_buf(), None, " ", false).await.unwrap();

    assert_eq!(summary.failed, 2);
    assert_eq!(summary.translated, 0);
}

#[tokio::test]
async fn test_runFolder_withoutChapters_shouldFail() {
    let dir = create_temp_dir().unwrap();
    create_test_file(dir.path(), "notes.md", "-").unwrap();
    let controller = controller(MockProvider::working(), InMemoryEntityStore::new());

    assert!(controller.run_folder(dir.path().to_path_buf(), None, "novel", false).await.is_err());
}

#[tokio::test]
async fn test_detect_overDirectory_shouldRegisterNames() {
    let dir = create_temp_dir().unwrap();
    create_test_file(dir.path(), "ch001.txt", SAMPLE_CHAPTER).unwrap();
    create_test_file(dir.path(), "ch001.en.txt", "Aira looked out.").unwrap();
    let provider = MockProvider::working().with_custom_response(|_| "[\"아이라\", \"레온\"]".to_string());
    let controller = controller(provider.clone(), InMemoryEntityStore::new());

    let report = controller.detect(dir.path(), "novel").await.unwrap();

    assert_eq!(report.added, vec!["아이라".to_string(), "레온".to_string()]);
    // The earlier output file is not a chapter
    assert_eq!(provider.request_count(), 1);
}

#[test]
fn test_inspectCandidates_shouldMarkWithoutCallingProvider() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(
        dir.path(),
        "ch001.en.txt",
        "It was cold. The wind howled through every gap in the old wooden walls.",
    )
    .unwrap();
    let provider = MockProvider::working();
    let controller = controller(provider.clone(), InMemoryEntityStore::new());

    let (marked, report) = controller.inspect_candidates(&input).unwrap();

    assert!(marked.contains("[[BREAK]]"));
    assert_eq!(report.break_candidates, 1);
    assert_eq!(report.sentence_count, 2);
    assert_eq!(provider.request_count(), 0);
}
