/*!
 * Sentence and block segmentation.
 *
 * Both the chunker and the break-candidate marker work on the spans produced
 * here. Segmentation never rewrites content: every function returns slices of
 * the input, and the sentence spans of a non-blank text concatenate back to
 * exactly that text. `normalize_line_endings` is the one exception and runs
 * before any of them.
 */

use std::borrow::Cow;

/// Delimiter between paragraphs (blocks)
pub const PARAGRAPH_DELIMITER: &str = "\n\n";

/// Delimiter between lines inside one paragraph
pub const LINE_DELIMITER: &str = "\n";

/// Characters that open or close a quotation span.
///
/// Straight and curly double quotes plus Japanese corner brackets.
pub const QUOTE_CHARS: [char; 5] = ['"', '\u{201C}', '\u{201D}', '「', '」'];

/// Sentence-terminal punctuation, half-width and full-width
const SENTENCE_TERMINATORS: [char; 6] = ['.', '?', '!', '。', '？', '！'];

/// Characters that must follow a terminator for it to end a sentence
const BOUNDARY_WHITESPACE: [char; 3] = [' ', '\n', '\r'];

/// Rewrite CRLF line endings to LF so that paragraph delimiters match.
///
/// Borrows the input when it has no CRLF pair.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains("\r\n") {
        Cow::Owned(text.replace("\r\n", LINE_DELIMITER))
    } else {
        Cow::Borrowed(text)
    }
}

/// Check whether a character is one of the recognized quotation characters
pub fn is_quote_char(c: char) -> bool {
    QUOTE_CHARS.contains(&c)
}

/// Split text into sentence-like spans.
///
/// A sentence ends after a terminator that is followed by a space or a line
/// break, unless the terminator sits inside a quotation span. Quote state is a
/// single toggle flipped on every quote character, so unbalanced or nested
/// quotes only shift where boundaries fall; they never cause an error.
///
/// The whitespace after a boundary belongs to the following span. A trailing
/// whitespace-only remainder is attached to the last sentence so that the
/// spans always rebuild the input. Blank input yields no spans.
pub fn segment_sentences(text: &str) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if is_quote_char(c) {
            in_quote = !in_quote;
        }

        if SENTENCE_TERMINATORS.contains(&c) && !in_quote {
            if let Some(&(_, next)) = chars.peek() {
                if BOUNDARY_WHITESPACE.contains(&next) {
                    let end = idx + c.len_utf8();
                    sentences.push(&text[start..end]);
                    start = end;
                }
            }
        }
    }

    let rest = &text[start..];
    if !rest.is_empty() {
        if rest.trim().is_empty() && !sentences.is_empty() {
            // Glue trailing whitespace onto the last sentence
            let last = sentences.len() - 1;
            let last_start = text.len() - rest.len() - sentences[last].len();
            sentences[last] = &text[last_start..];
        } else {
            sentences.push(rest);
        }
    }

    sentences
}

/// Split text into blank-line-delimited blocks.
///
/// Splits strictly on the double-newline delimiter, trims each block and
/// discards the ones that end up empty.
pub fn segment_blocks(text: &str) -> Vec<&str> {
    text.split(PARAGRAPH_DELIMITER)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .collect()
}

/// Split text on the paragraph delimiter without trimming or filtering.
///
/// Joining the result with `PARAGRAPH_DELIMITER` reproduces the input.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split(PARAGRAPH_DELIMITER).collect()
}

/// Count the non-empty blank-line-delimited paragraphs of a text
pub fn count_paragraphs(text: &str) -> usize {
    segment_blocks(text).len()
}

/// Length of a text in characters (not bytes)
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
