/*!
 * Instructions for the external translate, edit and polish stages.
 *
 * Each stage is one chat request over one unit of text. Every template
 * tells the service to leave `__ENTITY_x__` placeholders alone; the codec
 * does the rest.
 */

use std::fmt;

use crate::providers::CompletionRequest;

/// Shared by every stage
const STYLE_RULES: &str = "STYLE RULES:
- Do NOT raise the emotional intensity of the source.
- Do NOT add emotional adjectives that the source does not contain.
- Prefer direct verbs over descriptive embellishment.
- Do NOT add rhetorical emphasis or stylistic flair.
- Keep the formality of the source.";

const TRANSLATOR: &str = "SOURCE LANGUAGE: {source_language}
TARGET LANGUAGE: {target_language}
The input is written entirely in {source_language}. Translate it into {target_language}.
Output MUST be written only in {target_language}.";

const TRANSLATOR_RULES: &str = "You are a professional translator of commercial web novels.

RULES:
- Translate everything, narration and dialogue alike.
- Do NOT summarize, omit or add content. Do NOT change sentence order.
- Lines made only of numbers or symbols stay unchanged.
- Write as if the text had been drafted in the target language, without changing meaning or intent.
- Dialogue stays separate from narration.
- Keep the speech level of each character; do not introduce slang.
- Placeholders such as __ENTITY_x__ stand for locked proper nouns. NEVER translate, change, move or remove them.

{style_rules}

OUTPUT: only the translated text.";

const EDITOR: &str = "The following text is written in {target_language}. Keep the output in {target_language}.
You are a fiction editor preparing a translated web novel for paid release.

- Improve clarity and readability without changing meaning.
- Do NOT add, remove or summarize content.
- Do NOT change paragraph breaks or line order.
- Do NOT touch placeholders such as __ENTITY_x__.
- Where present: prefer active voice, vary repetitive sentence openings, replace stiff phrasing,
  and turn hedges like 'seemed to' or 'appeared to' into direct verbs unless the uncertainty is explicit.

{style_rules}

OUTPUT: only the revised text.";

const POLISH_EN: &str = "You are a professional English web novel editor.
Keep the output in English. Improve naturalness and readability for commercial publication.
Do NOT change meaning, plot or tone. Do NOT add or remove content.
Do NOT touch placeholders such as __ENTITY_x__.

{style_rules}";

const POLISH_JA: &str = "You are a professional Japanese web novel editor.
Keep the output in Japanese.
商業作品として自然な日本語に整えてください。意味・展開・文量は変えないでください。
省略・要約・再解釈は禁止です。__ENTITY_x__ の形のプレースホルダーは変更しないでください。

{style_rules}";

const POLISH_ZH: &str = "You are a professional Chinese web novel editor.
Keep the output in Chinese (Simplified).
这是已经翻译完成的中文正文，请润色而不是改写。禁止删减、概括或改变结构。
不要修改 __ENTITY_x__ 形式的占位符。

{style_rules}";

/// One external stage of the per-unit chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Source -> target translation
    Translate,
    /// Same-language readability edit
    Edit,
    /// Language-specific publication polish
    Polish,
}

impl Stage {
    /// Stages in the order they run
    pub const ALL: [Stage; 3] = [Stage::Translate, Stage::Edit, Stage::Polish];

    pub fn temperature(self) -> f32 {
        match self {
            Stage::Translate => 0.3,
            Stage::Edit => 0.4,
            Stage::Polish => 0.35,
        }
    }

    /// Whether the stage runs for a target language
    pub fn applies_to(self, target_language: &str) -> bool {
        match self {
            Stage::Translate | Stage::Edit => true,
            Stage::Polish => polish_template(target_language).is_some(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Translate => write!(f, "translate"),
            Stage::Edit => write!(f, "edit"),
            Stage::Polish => write!(f, "polish"),
        }
    }
}

fn polish_template(target_language: &str) -> Option<&'static str> {
    match target_language {
        "en" => Some(POLISH_EN),
        "ja" => Some(POLISH_JA),
        "zh" => Some(POLISH_ZH),
        _ => None,
    }
}

/// Languages of one chapter, as codes and instruction names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLanguages {
    pub source_code: String,
    pub source_name: String,
    pub target_code: String,
    pub target_name: String,
}

impl StageLanguages {
    fn render(&self, template: &str) -> String {
        template
            .replace("{style_rules}", STYLE_RULES)
            .replace("{source_language}", &self.source_name)
            .replace("{target_language}", &self.target_name)
    }
}

/// Request for one stage over one unit, or `None` if the stage does not
/// apply to the target language
pub fn build_stage_request(stage: Stage, text: &str, languages: &StageLanguages) -> Option<CompletionRequest> {
    let request = match stage {
        Stage::Translate => CompletionRequest::new()
            .system(languages.render(TRANSLATOR))
            .system(languages.render(TRANSLATOR_RULES)),
        Stage::Edit => CompletionRequest::new().system(languages.render(EDITOR)),
        Stage::Polish => CompletionRequest::new().system(languages.render(polish_template(&languages.target_code)?)),
    };

    Some(request.user(text).temperature(stage.temperature()))
}
