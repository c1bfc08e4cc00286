//! Inference pipelines: a loaded model paired with its tokenizer.

pub mod sentiment_analysis_pipeline;
pub mod utils;
