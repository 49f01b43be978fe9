/*!
 * Tests for language code handling
 */

use novelwai::language_utils::{
    get_language_name, is_supported_language, normalize_to_part1, prompt_language_name,
    validate_language_code, SUPPORTED_LANGUAGES,
};
use novelwai::rhythm::policy_for;

#[test]
fn test_normalize_withMixedCaseAndSpaces_shouldReturnPart1() {
    assert_eq!(normalize_to_part1("KO").unwrap(), "ko");
    assert_eq!(normalize_to_part1(" jpn ").unwrap(), "ja");
    assert_eq!(normalize_to_part1("ger").unwrap(), "de");
}

#[test]
fn test_normalize_withGarbage_shouldFail() {
    assert!(normalize_to_part1("").is_err());
    assert!(normalize_to_part1("english").is_err());
    assert!(normalize_to_part1("zz").is_err());
}

#[test]
fn test_supportedLanguages_shouldAllValidateAndHaveRhythmRecords() {
    for (code, name) in SUPPORTED_LANGUAGES {
        assert_eq!(validate_language_code(code).unwrap(), code);
        assert_eq!(prompt_language_name(code).unwrap(), name);
        assert!(policy_for(code).is_some(), "no rhythm record for {}", code);
    }
}

#[test]
fn test_validate_withKnownButUnsupportedLanguage_shouldNameSupportedSet() {
    let error = validate_language_code("it").unwrap_err().to_string();
    assert!(error.contains("Unsupported language"));
    assert!(error.contains("ko"));
    assert!(!is_supported_language("ita"));
}

#[test]
fn test_promptLanguageName_outsideSupportedSet_shouldUseIsoName() {
    assert_eq!(prompt_language_name("it").unwrap(), "Italian");
    assert_eq!(get_language_name("kor").unwrap(), "Korean");
}
