//! Sentiment analysis pipeline for classifying the emotional tone of text.
//!
//! A pipeline pairs a loaded sequence-classification model with its
//! tokenizer. By default models are shared through the global model cache,
//! so building a second pipeline for the same model and device does not
//! reload weights. `shared_cache(false)` gives the pipeline its own copy.
//!
//! ## Main Types
//!
//! - [`SentimentAnalysisPipeline`] - Runs the tokenizer and model on one text
//! - [`SentimentAnalysisPipelineBuilder`] - Device and truncation configuration
//! - [`SentimentAnalysisModel`] - Trait for sentiment model implementations
//! - [`SentimentResult`] - A label and its probability
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use bilingual_sentiment::core::{resolve, Language};
//! use bilingual_sentiment::pipelines::sentiment_analysis_pipeline::*;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let pipeline = SentimentAnalysisPipelineBuilder::from_handle(resolve(Language::English))
//!     .cpu()
//!     .build()
//!     .await?;
//!
//! let result = pipeline.predict("I love this product!")?;
//! println!("Sentiment: {} (confidence: {:.2})", result.label, result.score);
//! # anyhow::Ok(())
//! # });
//! ```

pub mod builder;
pub mod model;
pub mod pipeline;

pub use builder::SentimentAnalysisPipelineBuilder;
pub use model::SentimentAnalysisModel;
pub use pipeline::{SentimentAnalysisPipeline, SentimentResult};

pub use crate::pipelines::utils::DeviceSelectable;

pub use anyhow::Result;
