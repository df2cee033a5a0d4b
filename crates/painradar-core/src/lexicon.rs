//! Problem-language lexicon: query modifiers and problem-indicating stems.
//!
//! Two built-in lexicons ship with the crate (English and Russian); any other
//! can be loaded from a YAML file with the same shape:
//!
//! ```yaml
//! modifiers:
//!   problems: ["problem with", "not working"]
//!   help: ["how to fix"]
//!   pain: ["tired of"]
//!   solutions: ["where to find"]
//! indicators: ["problem", "can't", "stuck"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Query modifiers grouped by the kind of problem language they express.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ModifierSet {
    #[serde(default)]
    pub problems: Vec<String>,
    #[serde(default)]
    pub help: Vec<String>,
    #[serde(default)]
    pub pain: Vec<String>,
    #[serde(default)]
    pub solutions: Vec<String>,
}

impl ModifierSet {
    /// All four categories flattened, duplicates removed, first occurrence kept.
    #[must_use]
    pub fn pooled(&self) -> Vec<String> {
        let mut pool: Vec<String> = Vec::new();
        for m in self
            .problems
            .iter()
            .chain(&self.help)
            .chain(&self.pain)
            .chain(&self.solutions)
        {
            let m = m.trim();
            if !m.is_empty() && !pool.iter().any(|p| p.eq_ignore_ascii_case(m)) {
                pool.push(m.to_string());
            }
        }
        pool
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemLexicon {
    pub modifiers: ModifierSet,
    /// Lowercase stems counted by the problem score.
    pub indicators: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ProblemLexicon {
    fn default() -> Self {
        Self::english()
    }
}

impl ProblemLexicon {
    #[must_use]
    pub fn english() -> Self {
        Self {
            modifiers: ModifierSet {
                problems: owned(&[
                    "problem with",
                    "issues with",
                    "not working",
                    "can't",
                    "broken",
                    "error",
                ]),
                help: owned(&[
                    "help with",
                    "how to fix",
                    "how to solve",
                    "what to do about",
                    "advice on",
                    "need help",
                ]),
                pain: owned(&[
                    "tired of",
                    "fed up with",
                    "frustrated with",
                    "disappointed with",
                    "scammed by",
                    "hate",
                ]),
                solutions: owned(&[
                    "how to find",
                    "where to find",
                    "recommend",
                    "which to choose",
                    "best",
                    "reviews of",
                ]),
            },
            indicators: owned(&[
                "problem",
                "issue",
                "error",
                "doesn't work",
                "not working",
                "can't",
                "cannot",
                "help me",
                "any advice",
                "what to do",
                "how to fix",
                "tired of",
                "fed up",
                "annoy",
                "hate",
                "disappointed",
                "scam",
                "broken",
                "crash",
                "bug",
                "glitch",
                "fail",
                "stuck",
                "frustrat",
                "nightmare",
                "worst",
                "ripped off",
                "anyone else",
                "struggl",
                "refund",
            ]),
        }
    }

    /// Lexicon tuned for the Russian-language sources.
    #[must_use]
    pub fn russian() -> Self {
        Self {
            modifiers: ModifierSet {
                problems: owned(&[
                    "проблема",
                    "проблемы",
                    "не работает",
                    "не могу",
                    "сломался",
                    "ошибка",
                ]),
                help: owned(&[
                    "помогите",
                    "подскажите",
                    "как решить",
                    "что делать",
                    "как быть",
                    "нужен совет",
                ]),
                pain: owned(&[
                    "устал от",
                    "надоело",
                    "бесит",
                    "разочарован",
                    "обманули",
                    "кинули",
                ]),
                solutions: owned(&[
                    "как найти",
                    "где найти",
                    "посоветуйте",
                    "какой выбрать",
                    "что лучше",
                    "отзывы",
                ]),
            },
            indicators: owned(&[
                "проблем",
                "ошибк",
                "не работа",
                "не могу",
                "помоги",
                "подскажи",
                "что делать",
                "как быть",
                "устал",
                "надоел",
                "бесит",
                "разочаров",
                "обман",
                "кину",
                "сломал",
                "испорти",
                "не получается",
                "не выходит",
                "застрял",
                "нужен совет",
                "кто сталкивался",
                "у кого было",
                "как решить",
                "как исправить",
                "косяк",
                "баг",
                "глюк",
                "фейл",
                "провал",
                "неудач",
            ]),
        }
    }

    /// Parses a lexicon from YAML and lowercases its indicators.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Lexicon`] if the YAML is malformed or has no indicators.
    pub fn from_yaml_str(yaml: &str, origin: &str) -> Result<Self, ConfigError> {
        let mut lexicon: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Lexicon {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;
        lexicon.indicators = lexicon
            .indicators
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        if lexicon.indicators.is_empty() {
            return Err(ConfigError::Lexicon {
                path: origin.to_string(),
                reason: "indicator list is empty".to_string(),
            });
        }
        Ok(lexicon)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Lexicon`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Lexicon {
            path: origin.clone(),
            reason: e.to_string(),
        })?;
        Self::from_yaml_str(&raw, &origin)
    }

    /// Resolves a `PAIN_RADAR_LEXICON` setting: `en`, `ru`, or a YAML path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Lexicon`] when a path is given and cannot be loaded.
    pub fn from_setting(setting: &str) -> Result<Self, ConfigError> {
        match setting.trim() {
            "" | "en" | "english" => Ok(Self::english()),
            "ru" | "russian" => Ok(Self::russian()),
            path => Self::load(Path::new(path)),
        }
    }

    /// Number of distinct indicators occurring in `text`, case-insensitively.
    #[must_use]
    pub fn count_matches(&self, text: &str) -> usize {
        let lowered = text.to_lowercase();
        self.indicators
            .iter()
            .filter(|stem| lowered.contains(stem.as_str()))
            .count()
    }
}
