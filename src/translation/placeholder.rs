/*!
 * Placeholder protection for locked entity names.
 *
 * Before any text is handed to a provider, every locked entity name found in
 * it is swapped for an opaque `__ENTITY_<id>__` token. After the provider
 * calls, the tokens are swapped back for the entity's display value in the
 * target language (or the untouched source name when no translation exists).
 *
 * A mapping lives for exactly one text unit (a paragraph or a chunk) and is
 * discarded afterwards.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use uuid::Uuid;

/// Prefix shared by every placeholder token
pub const TOKEN_PREFIX: &str = "__ENTITY_";

/// Suffix shared by every placeholder token
pub const TOKEN_SUFFIX: &str = "__";

/// Anything shaped like a placeholder token, known or not
static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"__ENTITY_[0-9A-Za-z]+__").expect("Invalid placeholder token regex")
});

/// Read access to an entity collection, as needed by the codec.
///
/// Implemented for plain `source -> translated` maps (already resolved for
/// one target language) and for full entity sets that carry a per-language
/// translation table.
pub trait EntityLookup {
    /// Source names eligible for substitution
    fn entity_names(&self) -> Vec<&str>;

    /// Display value of `source_name` in `target_language`, if one is known
    fn resolve(&self, source_name: &str, target_language: &str) -> Option<&str>;
}

impl EntityLookup for HashMap<String, String> {
    fn entity_names(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect()
    }

    // Values are already resolved for the call's target language
    fn resolve(&self, source_name: &str, _target_language: &str) -> Option<&str> {
        self.get(source_name).map(String::as_str)
    }
}

/// How tokens are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenStyle {
    /// 32 hex digits from a random v4 UUID
    #[default]
    Random,
    /// Counter scoped to one `apply` call; deterministic for tests
    Sequential,
}

/// Ephemeral token -> source name mapping for one text unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMapping {
    entries: Vec<(String, String)>,
}

impl PlaceholderMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tokens in the mapping
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no token was inserted
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(token, source_name)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, s)| (t.as_str(), s.as_str()))
    }

    /// Source name a token stands for
    pub fn source_for(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, s)| s.as_str())
    }

    /// All tokens in insertion order
    pub fn tokens(&self) -> Vec<&str> {
        self.entries.iter().map(|(t, _)| t.as_str()).collect()
    }

    /// Tokens present in `before` that `after` no longer carries
    pub fn lost_tokens(&self, before: &str, after: &str) -> Vec<&str> {
        self.entries
            .iter()
            .map(|(t, _)| t.as_str())
            .filter(|token| before.contains(token) && !after.contains(token))
            .collect()
    }

    fn contains_token(&self, token: &str) -> bool {
        self.entries.iter().any(|(t, _)| t == token)
    }

    fn insert(&mut self, token: String, source_name: String) {
        self.entries.push((token, source_name));
    }
}

/// Placeholder codec
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderCodec {
    style: TokenStyle,
}

impl PlaceholderCodec {
    /// Create a codec with the given token style
    pub fn new(style: TokenStyle) -> Self {
        Self { style }
    }

    /// Create a codec producing deterministic counter tokens
    pub fn sequential() -> Self {
        Self::new(TokenStyle::Sequential)
    }

    /// Replace entity names in `text` with fresh tokens.
    ///
    /// Names are tried longest first so a short name never eats part of a
    /// longer one. A match only counts when neither neighbour is a word
    /// character. Names that do not occur produce no mapping entry.
    pub fn apply<E: EntityLookup + ?Sized>(&self, text: &str, entities: &E) -> (String, PlaceholderMapping) {
        let mut names = entities.entity_names();
        // Longest first; ties broken alphabetically so output is stable
        names.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));

        let mut mapping = PlaceholderMapping::new();
        let mut rewritten = text.to_string();
        let mut counter = 0usize;

        for name in names {
            if name.trim().is_empty() {
                continue;
            }

            let token = self.fresh_token(&rewritten, &mapping, &mut counter);
            if let Some(replaced) = replace_bounded(&rewritten, name, &token) {
                rewritten = replaced;
                mapping.insert(token, name.to_string());
            }
        }

        if !mapping.is_empty() {
            debug!("Applied {} placeholder(s)", mapping.len());
        }

        (rewritten, mapping)
    }

    /// Swap every token of `mapping` back for its display value.
    ///
    /// The display value is the entity's translation for `target_language`
    /// when one exists and is non-empty, otherwise the original source name.
    pub fn restore<E: EntityLookup + ?Sized>(
        &self,
        text: &str,
        mapping: &PlaceholderMapping,
        entities: &E,
        target_language: &str,
    ) -> String {
        let mut restored = text.to_string();

        for (token, source_name) in mapping.iter() {
            let replacement = entities
                .resolve(source_name, target_language)
                .filter(|value| !value.is_empty())
                .unwrap_or(source_name);

            if !restored.contains(token) {
                warn!("Placeholder for '{}' was dropped by the provider", source_name);
                continue;
            }

            restored = restored.replace(token, replacement);
        }

        restored
    }

    fn fresh_token(&self, text: &str, mapping: &PlaceholderMapping, counter: &mut usize) -> String {
        loop {
            let id = match self.style {
                TokenStyle::Random => Uuid::new_v4().simple().to_string(),
                TokenStyle::Sequential => {
                    *counter += 1;
                    counter.to_string()
                }
            };
            let token = format!("{}{}{}", TOKEN_PREFIX, id, TOKEN_SUFFIX);
            if !text.contains(&token) && !mapping.contains_token(&token) {
                return token;
            }
        }
    }
}

/// Replace entity names with random tokens (see `PlaceholderCodec::apply`)
pub fn apply_placeholders<E: EntityLookup + ?Sized>(text: &str, entities: &E) -> (String, PlaceholderMapping) {
    PlaceholderCodec::default().apply(text, entities)
}

/// Restore tokens to display values (see `PlaceholderCodec::restore`)
pub fn restore_placeholders<E: EntityLookup + ?Sized>(
    text: &str,
    mapping: &PlaceholderMapping,
    entities: &E,
    target_language: &str,
) -> String {
    PlaceholderCodec::default().restore(text, mapping, entities, target_language)
}

/// Every placeholder-shaped token still present in `text`
pub fn find_residual_tokens(text: &str) -> Vec<String> {
    TOKEN_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Word character in the regex `\w` sense: alphanumeric or underscore
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace every word-bounded occurrence of `name` with `token`.
///
/// Returns `None` when no bounded occurrence exists.
fn replace_bounded(text: &str, name: &str, token: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut copied_up_to = 0;
    let mut search_from = 0;
    let mut found = false;

    while let Some(offset) = text[search_from..].find(name) {
        let start = search_from + offset;
        let end = start + name.len();

        let clear_before = text[..start].chars().next_back().is_none_or(|c| !is_word_char(c));
        let clear_after = text[end..].chars().next().is_none_or(|c| !is_word_char(c));

        if clear_before && clear_after {
            out.push_str(&text[copied_up_to..start]);
            out.push_str(token);
            copied_up_to = end;
            search_from = end;
            found = true;
        } else {
            let step = text[start..].chars().next().map_or(1, char::len_utf8);
            search_from = start + step;
        }

        if search_from >= text.len() {
            break;
        }
    }

    if !found {
        return None;
    }

    out.push_str(&text[copied_up_to..]);
    Some(out)
}
