/*!
 * Chapter translation.
 *
 * - `placeholder`: locks entity names behind opaque tokens and restores them
 * - `chunker`: paragraph-preserving text units
 * - `structure`: dialogue/narration block classification and reassembly
 * - `stages`: instructions of the translate, edit and polish stages
 * - `core`: the `ChapterTranslator` pipeline
 */

// Re-export main types for easier usage
pub use self::core::{ChapterTranslation, ChapterTranslator, TokenUsageStats, TranslationStats, TranslatorSettings};
pub use self::placeholder::{apply_placeholders, restore_placeholders, EntityLookup, PlaceholderCodec, PlaceholderMapping, TokenStyle};
pub use self::structure::{restructure, BlockKind};

// Submodules
pub mod chunker;
pub mod core;
pub mod placeholder;
pub mod stages;
pub mod structure;
