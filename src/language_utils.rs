//! Language utilities for the translation pipeline
//!
//! Chapters are addressed with ISO 639-1 codes. Users may also pass ISO
//! 639-2 codes (`kor`, `jpn`, `chi`...), which are normalized before the
//! supported-language check.

use anyhow::{anyhow, Result};
use isolang::Language;

/// Target languages the pipeline knows how to instruct, with the names used
/// in stage instructions
pub const SUPPORTED_LANGUAGES: [(&str, &str); 9] = [
    ("ko", "Korean"),
    ("en", "English"),
    ("ja", "Japanese"),
    ("zh", "Chinese (Simplified)"),
    ("de", "German"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("pt", "Portuguese"),
    ("id", "Indonesian"),
];

/// ISO 639-2/B codes that differ from their 639-2/T form
fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    let part2t = match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        _ => return None,
    };
    Some(part2t)
}

/// Resolve any ISO 639-1 / 639-2 code to a language
fn lookup(code: &str) -> Option<Language> {
    let normalized = code.trim().to_lowercase();
    match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => Language::from_639_3(part2b_to_part2t(&normalized).unwrap_or(&normalized)),
        _ => None,
    }
}

/// Normalize a language code to ISO 639-1 (2-letter) format
pub fn normalize_to_part1(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Invalid language code: {}", code))?;
    lang.to_639_1()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Language has no 2-letter code: {}", code))
}

/// Whether a code names one of the supported languages
pub fn is_supported_language(code: &str) -> bool {
    normalize_to_part1(code)
        .map(|part1| SUPPORTED_LANGUAGES.iter().any(|(c, _)| *c == part1))
        .unwrap_or(false)
}

/// Normalize and check a code against the supported languages
pub fn validate_language_code(code: &str) -> Result<String> {
    let part1 = normalize_to_part1(code)?;
    if SUPPORTED_LANGUAGES.iter().any(|(c, _)| *c == part1) {
        Ok(part1)
    } else {
        Err(anyhow!(
            "Unsupported language '{}'; expected one of: {}",
            code,
            SUPPORTED_LANGUAGES.iter().map(|(c, _)| *c).collect::<Vec<_>>().join(", ")
        ))
    }
}

/// Name used when instructing the generation service
///
/// Falls back to the ISO name for languages outside the supported set.
pub fn prompt_language_name(code: &str) -> Result<String> {
    let part1 = normalize_to_part1(code)?;
    match SUPPORTED_LANGUAGES.iter().find(|(c, _)| *c == part1) {
        Some((_, name)) => Ok(name.to_string()),
        None => get_language_name(code),
    }
}

/// Get the ISO language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;
    Ok(lang.to_name().to_string())
}
