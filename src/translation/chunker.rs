/*!
 * Paragraph-preserving chunking.
 *
 * Providers accept a bounded amount of text per request. A paragraph that
 * exceeds the budget is cut on its own line boundaries, never across a
 * paragraph delimiter, and its translated chunks are glued back with a single
 * newline so the paragraph count of the chapter cannot change.
 *
 * Sizes are measured in characters.
 */

use crate::text::{char_len, split_paragraphs, LINE_DELIMITER, PARAGRAPH_DELIMITER};

/// Default per-request budget for one paragraph unit
pub const DEFAULT_MAX_PARAGRAPH_CHARS: usize = 2000;

/// Default budget for the coarse multi-paragraph chunker
pub const DEFAULT_COARSE_CHUNK_CHARS: usize = 3000;

/// Cut one paragraph into line-aligned chunks of at most `max_size` chars.
///
/// A paragraph at or under the budget comes back as a single chunk. Otherwise
/// lines are packed greedily: the running size counts the newline that would
/// join the next line, and when that would overflow a new chunk starts. A
/// single line longer than the budget becomes its own oversized chunk.
///
/// Every chunk is a contiguous slice of the input, so joining the chunks with
/// `"\n"` reproduces the paragraph exactly.
pub fn chunk_paragraph(paragraph: &str, max_size: usize) -> Vec<&str> {
    if char_len(paragraph) <= max_size {
        return vec![paragraph];
    }

    let mut chunks = Vec::new();
    // (start byte, end byte, char length) of the chunk being packed
    let mut current: Option<(usize, usize, usize)> = None;
    let mut line_start = 0;

    for line in paragraph.split(LINE_DELIMITER) {
        let line_end = line_start + line.len();
        let line_len = char_len(line);

        current = match current {
            None => Some((line_start, line_end, line_len)),
            Some((start, end, len)) => {
                if len + 1 + line_len > max_size {
                    chunks.push(&paragraph[start..end]);
                    Some((line_start, line_end, line_len))
                } else {
                    Some((start, line_end, len + 1 + line_len))
                }
            }
        };

        line_start = line_end + LINE_DELIMITER.len();
    }

    if let Some((start, end, _)) = current {
        chunks.push(&paragraph[start..end]);
    }

    chunks
}

/// Pack whole paragraphs into chunks of roughly `max_size` chars.
///
/// For consumers that only need an approximate bound and do not care about
/// paragraph-level reassembly. Paragraphs are joined with `"\n\n"`; a
/// paragraph that alone exceeds the budget is emitted as its own chunk.
/// Whitespace-only chunks are dropped.
pub fn chunk_paragraphs(text: &str, max_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();
    // Size of the buffer as if every paragraph carried its trailing delimiter
    let mut buffer_len = 0;

    for paragraph in split_paragraphs(text) {
        let paragraph_len = char_len(paragraph);

        if paragraph_len > max_size {
            flush_buffer(&mut buffer, &mut chunks);
            buffer_len = 0;
            chunks.push(paragraph.to_string());
            continue;
        }

        let candidate_len = buffer_len + paragraph_len + PARAGRAPH_DELIMITER.len();
        if candidate_len > max_size {
            flush_buffer(&mut buffer, &mut chunks);
            buffer.push(paragraph);
            buffer_len = paragraph_len + PARAGRAPH_DELIMITER.len();
        } else {
            buffer.push(paragraph);
            buffer_len = candidate_len;
        }
    }

    flush_buffer(&mut buffer, &mut chunks);
    chunks
}

fn flush_buffer(buffer: &mut Vec<&str>, chunks: &mut Vec<String>) {
    let joined = buffer.join(PARAGRAPH_DELIMITER);
    if !joined.trim().is_empty() {
        chunks.push(joined);
    }
    buffer.clear();
}

/// One paragraph of a chapter, ready to be sent out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedParagraph<'a> {
    /// Whitespace-only paragraph, kept verbatim and never sent out
    pub blank: bool,
    /// Units to translate; a single element unless the paragraph was chunked
    pub chunks: Vec<&'a str>,
}

impl PlannedParagraph<'_> {
    /// Whether the paragraph had to be cut
    pub fn is_chunked(&self) -> bool {
        self.chunks.len() > 1
    }
}

/// Split a chapter into paragraphs and chunk the oversized ones
pub fn plan_paragraphs(text: &str, max_size: usize) -> Vec<PlannedParagraph<'_>> {
    split_paragraphs(text)
        .into_iter()
        .map(|paragraph| {
            if paragraph.trim().is_empty() {
                PlannedParagraph { blank: true, chunks: vec![paragraph] }
            } else {
                PlannedParagraph { blank: false, chunks: chunk_paragraph(paragraph, max_size) }
            }
        })
        .collect()
}

/// Glue the chunks of one paragraph back together
pub fn join_chunks<S: AsRef<str>>(chunks: &[S]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.as_ref())
        .collect::<Vec<&str>>()
        .join(LINE_DELIMITER)
}

/// Rebuild a chapter: chunks joined by `"\n"`, paragraphs by `"\n\n"`
pub fn reassemble_paragraphs<S: AsRef<str>>(paragraphs: &[Vec<S>]) -> String {
    paragraphs
        .iter()
        .map(|chunks| join_chunks(chunks))
        .collect::<Vec<String>>()
        .join(PARAGRAPH_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::count_paragraphs;

    #[test]
    fn test_chunk_paragraph_withThreeShortLines_shouldPackIntoTwoChunks() {
        let chunks = chunk_paragraph("line1\nline2\nline3", 11);
        assert_eq!(chunks, vec!["line1\nline2", "line3"]);
        assert_eq!(join_chunks(&chunks), "line1\nline2\nline3");
    }

    #[test]
    fn test_chunk_paragraph_underBudget_shouldPassThrough() {
        let chunks = chunk_paragraph("short\nparagraph", 100);
        assert_eq!(chunks, vec!["short\nparagraph"]);
    }

    #[test]
    fn test_chunk_paragraph_withOversizedLine_shouldKeepItWhole() {
        let long_line = "x".repeat(30);
        let paragraph = format!("ab\n{}\ncd", long_line);
        let chunks = chunk_paragraph(&paragraph, 10);
        assert_eq!(chunks, vec!["ab", long_line.as_str(), "cd"]);
        assert_eq!(join_chunks(&chunks), paragraph);
    }

    #[test]
    fn test_chunk_paragraph_withMultibyteLines_shouldCountChars() {
        // 4 chars per line, 9 with the joining newline
        let chunks = chunk_paragraph("가나다라\n마바사아\n자차카타", 9);
        assert_eq!(chunks, vec!["가나다라\n마바사아", "자차카타"]);
    }

    #[test]
    fn test_chunk_paragraph_withEmptyLines_shouldReassembleExactly() {
        let paragraph = "\nfirst line\nthird after blank\nfourth";
        let chunks = chunk_paragraph(paragraph, 12);
        assert_eq!(join_chunks(&chunks), paragraph);
        assert!(chunks.iter().all(|c| !c.contains("\n\n")));
    }

    #[test]
    fn test_chunk_paragraphs_shouldPackWholeParagraphs() {
        let chunks = chunk_paragraphs("aaaa\n\nbbbb\n\ncccc", 12);
        assert_eq!(chunks, vec!["aaaa\n\nbbbb".to_string(), "cccc".to_string()]);
    }

    #[test]
    fn test_chunk_paragraphs_withOversizedParagraph_shouldEmitItAlone() {
        let big = "z".repeat(20);
        let text = format!("aa\n\n{}\n\nbb", big);
        let chunks = chunk_paragraphs(&text, 10);
        assert_eq!(chunks, vec!["aa".to_string(), big, "bb".to_string()]);
    }

    #[test]
    fn test_planAndReassemble_shouldPreserveParagraphCount() {
        let long = (0..40).map(|i| format!("line number {}", i)).collect::<Vec<_>>().join("\n");
        let text = format!("Intro.\n\n{}\n\n   \n\nOutro.", long);

        let plan = plan_paragraphs(&text, 50);
        assert_eq!(plan.len(), 4);
        assert!(plan[1].is_chunked());
        assert!(plan[2].blank);

        let rebuilt: Vec<Vec<&str>> = plan.iter().map(|p| p.chunks.clone()).collect();
        let output = reassemble_paragraphs(&rebuilt);
        assert_eq!(output, text);
        assert_eq!(count_paragraphs(&output), count_paragraphs(&text));
    }
}
