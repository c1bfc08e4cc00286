//! Language selection and model resolution.
//!
//! Each supported language is served by exactly one pre-trained
//! sequence-classification model. [`resolve`] maps a [`Language`] to the
//! [`ModelHandle`] describing that model; the mapping is static, there is no
//! discovery at runtime.

use super::cache::ModelOptions;
use super::error::ClassificationError;
use std::str::FromStr;

const ENGLISH_MODEL: &str = "distilbert/distilbert-base-uncased-finetuned-sst-2-english";
const VIETNAMESE_MODEL: &str = "wonrax/phobert-base-vietnamese-sentiment";

/// Language selector for a classification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Vietnamese,
}

impl Language {
    /// All supported languages, in display order.
    pub const ALL: [Language; 2] = [Language::English, Language::Vietnamese];

    /// Short selector used on the command line and in logs.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Vietnamese => "vi",
        }
    }

    /// Section title as shown to the user.
    pub fn title(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Vietnamese => "Tiếng Việt",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Language {
    type Err = ClassificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "eng" | "english" => Ok(Language::English),
            "vi" | "vn" | "vie" | "vietnamese" | "tiếng việt" => Ok(Language::Vietnamese),
            other => Err(ClassificationError::Configuration(format!(
                "unsupported language selector `{other}` (expected `en` or `vi`)"
            ))),
        }
    }
}

/// Encoder family of a model, used to pick the weight layout at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    DistilBert,
    Roberta,
}

/// Identifies a pre-trained model and the tokenizer paired with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelHandle {
    pub model_id: String,
    pub tokenizer_id: String,
    pub architecture: Architecture,
}

impl ModelHandle {
    pub fn new(model_id: &str, tokenizer_id: &str, architecture: Architecture) -> Self {
        Self {
            model_id: model_id.to_string(),
            tokenizer_id: tokenizer_id.to_string(),
            architecture,
        }
    }
}

impl ModelOptions for ModelHandle {
    fn cache_key(&self) -> String {
        format!("{}+{}", self.model_id, self.tokenizer_id)
    }
}

/// Resolve the model serving `language`.
pub fn resolve(language: Language) -> ModelHandle {
    match language {
        Language::English => ModelHandle::new(ENGLISH_MODEL, ENGLISH_MODEL, Architecture::DistilBert),
        Language::Vietnamese => {
            ModelHandle::new(VIETNAMESE_MODEL, VIETNAMESE_MODEL, Architecture::Roberta)
        }
    }
}
