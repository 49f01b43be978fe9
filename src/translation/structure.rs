/*!
 * Block classification and reassembly.
 *
 * After restoration the chapter is split into blocks, each block is tagged
 * as dialogue or narration, and long narration is paired up under a line
 * rhythm policy. Block content and order are never altered; only the
 * delimiters between blocks change.
 */

use std::fmt;

use log::debug;

use crate::text::{char_len, is_quote_char, segment_blocks, LINE_DELIMITER, PARAGRAPH_DELIMITER};

/// Narration blocks at or under this length stay standalone
pub const DEFAULT_SHORT_LINE_MAX: usize = 80;

/// Number of long narration blocks merged into one paragraph
const NARRATION_MERGE_COUNT: usize = 2;

/// Kind of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Contains at least two quotation characters
    Dialogue,
    /// Anything else
    Narration,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Dialogue => write!(f, "DIALOGUE"),
            BlockKind::Narration => write!(f, "NARRATION"),
        }
    }
}

/// A tagged block of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'a> {
    pub kind: BlockKind,
    pub content: &'a str,
}

impl<'a> Block<'a> {
    /// Classify and wrap a block
    pub fn new(content: &'a str) -> Self {
        Self { kind: classify_block(content), content }
    }
}

/// Tag a block by counting quotation characters
pub fn classify_block(text: &str) -> BlockKind {
    let quotes = text.chars().filter(|&c| is_quote_char(c)).count();
    if quotes >= 2 {
        BlockKind::Dialogue
    } else {
        BlockKind::Narration
    }
}

/// Split a text into tagged blocks
pub fn classify_blocks(text: &str) -> Vec<Block<'_>> {
    segment_blocks(text).into_iter().map(Block::new).collect()
}

/// Reassemble tagged blocks.
///
/// Dialogue and short narration are emitted standalone after flushing any
/// buffered narration. Narration longer than `short_line_max` is buffered and
/// flushed, joined by a single newline, once two have accumulated. Emitted
/// units are joined by a blank line.
pub fn reassemble(blocks: &[Block<'_>], short_line_max: usize) -> String {
    let mut merged: Vec<String> = Vec::with_capacity(blocks.len());
    let mut narration: Vec<&str> = Vec::with_capacity(NARRATION_MERGE_COUNT);

    for block in blocks {
        match block.kind {
            BlockKind::Dialogue => {
                flush_narration(&mut narration, &mut merged);
                merged.push(block.content.to_string());
            }
            BlockKind::Narration if char_len(block.content) <= short_line_max => {
                flush_narration(&mut narration, &mut merged);
                merged.push(block.content.to_string());
            }
            BlockKind::Narration => {
                narration.push(block.content);
                if narration.len() >= NARRATION_MERGE_COUNT {
                    flush_narration(&mut narration, &mut merged);
                }
            }
        }
    }

    flush_narration(&mut narration, &mut merged);
    merged.join(PARAGRAPH_DELIMITER)
}

fn flush_narration(narration: &mut Vec<&str>, merged: &mut Vec<String>) {
    if !narration.is_empty() {
        merged.push(narration.join(LINE_DELIMITER));
        narration.clear();
    }
}

/// Segment, classify and reassemble a full text
pub fn restructure(text: &str, short_line_max: usize) -> String {
    let blocks = classify_blocks(text);
    let dialogue = blocks.iter().filter(|b| b.kind == BlockKind::Dialogue).count();
    debug!(
        "Restructuring {} block(s): {} dialogue, {} narration",
        blocks.len(),
        dialogue,
        blocks.len() - dialogue
    );
    reassemble(&blocks, short_line_max)
}
