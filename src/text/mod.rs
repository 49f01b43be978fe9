/*!
 * Text segmentation primitives shared by the chunker, the block
 * restructurer and the break-candidate marker.
 */

pub mod segmenter;

pub use self::segmenter::{
    char_len, count_paragraphs, is_quote_char, normalize_line_endings, segment_blocks,
    segment_sentences, split_paragraphs, LINE_DELIMITER, PARAGRAPH_DELIMITER, QUOTE_CHARS,
};
