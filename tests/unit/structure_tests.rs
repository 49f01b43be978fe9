/*!
 * Tests for block classification and restructuring
 */

use novelwai::translation::structure::{classify_block, classify_blocks, reassemble, restructure, BlockKind};

fn long_narration(tag: &str) -> String {
    format!("{} walked the length of the ward twice before anyone noticed that something was wrong.", tag)
}

#[test]
fn test_classifyBlock_shouldBePureFunctionOfContent() {
    let blocks = ["\"Hello,\" she said.", "「行くぞ」", "He paused.", "One \" quote only", ""];
    for block in blocks {
        assert_eq!(classify_block(block), classify_block(block));
    }
    assert_eq!(classify_block("「行くぞ」"), BlockKind::Dialogue);
    assert_eq!(classify_block("One \" quote only"), BlockKind::Narration);
}

#[test]
fn test_restructure_withDialogueBetweenLongNarration_shouldKeepDialogueStandalone() {
    let a = long_narration("Mina");
    let b = long_narration("Joon");
    let text = format!("{}\n\n\u{201C}Wait.\u{201D}\n\n{}", a, b);

    let result = restructure(&text, 80);

    assert_eq!(result, text);
}

#[test]
fn test_restructure_withTwoLongNarrationBlocks_shouldMergeWithNewline() {
    let a = long_narration("Mina");
    let b = long_narration("Joon");
    let text = format!("{}\n\n{}", a, b);

    assert_eq!(restructure(&text, 80), format!("{}\n{}", a, b));
}

#[test]
fn test_reassemble_shouldPreserveContentAndOrder() {
    let a = long_narration("Mina");
    let text = format!("Short.\n\n{}\n\n\"Go!\"\n\n   \n\nEnd.", a);
    let blocks = classify_blocks(&text);

    let result = reassemble(&blocks, 80);

    let contents: Vec<&str> = blocks.iter().map(|b| b.content).collect();
    assert_eq!(contents, vec!["Short.", a.as_str(), "\"Go!\"", "End."]);
    assert_eq!(result, format!("Short.\n\n{}\n\n\"Go!\"\n\nEnd.", a));
}
