/*!
 * Tests for break-candidate marking and the pressure diagnostic
 */

use novelwai::rhythm::candidates::count_break_markers;
use novelwai::rhythm::{mark_break_candidates, pressure_score, strip_break_markers, BREAK_TAG};

const SAMPLES: [&str; 6] = [
    "",
    "One sentence only.",
    "It was cold. The wind howled through every gap in the old wooden walls.",
    "\"Stay here,\" she said. He did not answer. Then the door opened.",
    "彼は走った。 「待って！」 彼女が叫んだ。",
    "Wait... no. She turned around — slowly.\n\nA new paragraph begins here.",
];

#[test]
fn test_markThenStrip_shouldReproduceInputExactly() {
    for text in SAMPLES {
        let marked = mark_break_candidates(text);
        assert_eq!(strip_break_markers(&marked), text, "round trip failed for {:?}", text);
    }
}

#[test]
fn test_markThenStrip_withMarkersAlreadyInText_shouldReproduceInputExactly() {
    let texts = [
        "Hi.\n[[BREAK]]\nGo now, said the man who was waiting for a long time.",
        "It was cold. [[BREAK]] [[BREAK-1]] Then it rained.\n[[BREAK-2]]\n",
        "\n[[BREAK]]\n",
    ];
    for text in texts {
        let marked = mark_break_candidates(text);
        assert!(!text.contains(marked.tag.as_str()));
        assert_eq!(strip_break_markers(&marked), text, "round trip failed for {:?}", text);
        assert_eq!(count_break_markers(&marked.text, &marked.tag), marked.candidates);
    }
}

#[test]
fn test_marker_shouldNotOccurInOrdinaryProse() {
    for text in SAMPLES {
        let marked = mark_break_candidates(text);
        assert_eq!(marked.tag, BREAK_TAG);
        assert!(marked.marker().contains(BREAK_TAG));
    }
}

#[test]
fn test_mark_withDialogueBoundary_shouldAlwaysMark() {
    let text = "The hallway had been silent for a very long time now. \"Who goes there,\" the guard called out into the dark.";
    let marked = mark_break_candidates(text);
    assert_eq!(marked.candidates, 1);
    assert_eq!(count_break_markers(&marked.text, BREAK_TAG), 1);
}

#[test]
fn test_mark_withoutAnyTrigger_shouldLeaveTextUntouched() {
    let text = "The corridor stretched on far longer than anyone had expected it to. Its walls were lined with portraits of people nobody remembered anymore.";
    assert_eq!(mark_break_candidates(text).text, text);
}

#[test]
fn test_pressureScore_shouldBeBoundedAndDeterministic() {
    for text in SAMPLES {
        let first = pressure_score(text);
        let second = pressure_score(text);
        assert!((0.0..=1.0).contains(&first.pressure_score));
        assert_eq!(first, second);
    }
}

#[test]
fn test_pressureScore_withDialogue_shouldFlagIt() {
    let report = pressure_score("\"Run!\" he shouted. They ran.");
    assert!(report.has_dialogue);
    assert_eq!(report.sentence_count, 2);
}
