/*!
 * Deterministic splitting of over-dense Japanese paragraphs.
 *
 * Only inserts paragraph breaks between `。`-terminated sentences; sentence
 * order and wording are untouched and paragraphs carrying 「」 dialogue are
 * left as they are.
 */

use crate::text::PARAGRAPH_DELIMITER;

/// Default sentence budget per paragraph
pub const DEFAULT_MAX_SENTENCES: usize = 5;

const JA_FULL_STOP: char = '。';

/// Insert blank lines so no narration paragraph exceeds `max_sentences`.
///
/// Blank paragraphs are dropped and split pieces are trimmed. Blank input,
/// or input that yields no paragraphs, is returned unchanged.
pub fn split_dense_paragraphs(text: &str, max_sentences: usize) -> String {
    if text.trim().is_empty() || max_sentences == 0 {
        return text.to_string();
    }

    let mut paragraphs: Vec<String> = Vec::new();

    for paragraph in text.split(PARAGRAPH_DELIMITER) {
        if paragraph.trim().is_empty() {
            continue;
        }

        let is_dialogue = paragraph.contains('「') && paragraph.contains('」');
        let sentence_count = paragraph.matches(JA_FULL_STOP).count();
        if is_dialogue || sentence_count <= max_sentences {
            paragraphs.push(paragraph.to_string());
            continue;
        }

        let sentences: Vec<&str> = paragraph.split_inclusive(JA_FULL_STOP).collect();
        for group in sentences.chunks(max_sentences) {
            let piece = group.concat();
            let piece = piece.trim();
            if !piece.is_empty() {
                paragraphs.push(piece.to_string());
            }
        }
    }

    if paragraphs.is_empty() {
        return text.to_string();
    }

    paragraphs.join(PARAGRAPH_DELIMITER)
}
