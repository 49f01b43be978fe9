/*!
 * Tests for paragraph-preserving chunking
 */

use novelwai::text::{count_paragraphs, PARAGRAPH_DELIMITER};
use novelwai::translation::chunker::{
    chunk_paragraph, chunk_paragraphs, join_chunks, plan_paragraphs, reassemble_paragraphs,
};

#[test]
fn test_chunkParagraph_withThreeFiveCharLines_shouldYieldTwoChunks() {
    let paragraph = "line1\nline2\nline3";
    let chunks = chunk_paragraph(paragraph, 11);

    assert_eq!(chunks, vec!["line1\nline2", "line3"]);
    assert!(chunks.iter().all(|c| c.chars().count() <= 11));
    assert_eq!(join_chunks(&chunks), paragraph);
}

#[test]
fn test_chunkParagraph_shouldNeverContainParagraphDelimiter() {
    let chapter = "first line\nsecond line\nthird line\n\nanother paragraph\nwith two lines";
    for paragraph in chapter.split(PARAGRAPH_DELIMITER) {
        for chunk in chunk_paragraph(paragraph, 12) {
            assert!(!chunk.contains(PARAGRAPH_DELIMITER), "chunk spans paragraphs: {:?}", chunk);
        }
    }
}

#[test]
fn test_planAndReassemble_withForcedChunking_shouldKeepParagraphCount() {
    let chapter = [
        "짧은 문단.",
        "첫 줄입니다.\n둘째 줄입니다.\n셋째 줄입니다.\n넷째 줄입니다.",
        "   ",
        "Oversized single line that is much longer than the tiny budget used here.",
        "끝.",
    ]
    .join(PARAGRAPH_DELIMITER);

    let plan = plan_paragraphs(&chapter, 10);
    assert!(plan.iter().any(|p| p.is_chunked()));

    let paragraphs: Vec<Vec<&str>> = plan.iter().map(|p| p.chunks.clone()).collect();
    let rebuilt = reassemble_paragraphs(&paragraphs);

    assert_eq!(count_paragraphs(&rebuilt), count_paragraphs(&chapter));
    assert_eq!(rebuilt, chapter);
}

#[test]
fn test_chunkParagraphs_shouldRespectBudgetExceptOversized() {
    let text = "aaaa\n\nbbbb\n\ncccccccccccccccccccc\n\ndddd";
    let chunks = chunk_paragraphs(text, 12);

    assert_eq!(chunks, vec!["aaaa\n\nbbbb", "cccccccccccccccccccc", "dddd"]);
}
