pub mod core;
mod loaders;
pub mod models;
pub mod pipelines;
pub mod service;

// Re-export the request-level API
pub use core::{resolve, ClassificationError, Language, ModelHandle};
pub use service::{
    format, format_failure, ClassificationRequest, ClassificationResult, FormattedMessage,
    QueryLog, SentimentClassifier,
};

// Re-export model types for easier access
pub use models::implementations::{DistilBertSentimentModel, RobertaSentimentModel, SentimentModel};
