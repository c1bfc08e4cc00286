use super::model::SentimentAnalysisModel;
use std::sync::Arc;
use tokenizers::Tokenizer;

/// A label from the model's own vocabulary and its probability.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentResult {
    pub label: String,
    pub score: f32,
}

pub struct SentimentAnalysisPipeline<M: SentimentAnalysisModel> {
    pub(crate) model: Arc<M>,
    pub(crate) tokenizer: Tokenizer,
}

impl<M: SentimentAnalysisModel> SentimentAnalysisPipeline<M> {
    /// Predict the top-ranked sentiment label and its probability.
    pub fn predict(&self, text: &str) -> anyhow::Result<SentimentResult> {
        self.predict_all(text)?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("model returned an empty label distribution"))
    }

    /// Full label distribution, highest probability first.
    pub fn predict_all(&self, text: &str) -> anyhow::Result<Vec<SentimentResult>> {
        self.model.predict(&self.tokenizer, text)
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn device(&self) -> &candle_core::Device {
        self.model.device()
    }
}
