//! Request-level API: classify a sentence in a given language and render the
//! result as a conversational reply.
//!
//! ```rust,no_run
//! use bilingual_sentiment::core::Language;
//! use bilingual_sentiment::pipelines::utils::DeviceRequest;
//! use bilingual_sentiment::service::{format, ClassificationRequest, SentimentClassifier};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let classifier = SentimentClassifier::new(DeviceRequest::Cpu);
//! let request = ClassificationRequest::new("Tôi ghét điều này", Language::Vietnamese);
//!
//! let result = classifier.classify_request(&request).await?;
//! println!("{}", format(&result, request.language));
//! # Ok::<(), bilingual_sentiment::core::ClassificationError>(())
//! # });
//! ```

pub mod classifier;
pub mod formatter;
pub mod log;

pub use classifier::{
    ClassificationResult, HubLoader, PipelineLoader, SentimentClassifier, SentimentScorer,
};
pub use formatter::{format, format_failure, FormattedMessage};
pub use log::QueryLog;

use crate::core::Language;

/// One sentence to classify and the language section it was entered in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    pub text: String,
    pub language: Language,
}

impl ClassificationRequest {
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self {
            text: text.into(),
            language,
        }
    }
}
