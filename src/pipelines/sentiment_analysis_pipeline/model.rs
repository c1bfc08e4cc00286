use super::pipeline::SentimentResult;
use tokenizers::Tokenizer;

/// A sequence-classification model that can score text for sentiment.
#[allow(async_fn_in_trait)]
pub trait SentimentAnalysisModel {
    type Options: std::fmt::Debug + Clone;

    async fn new(options: Self::Options, device: candle_core::Device) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Score `text` against every label of the model, highest first.
    fn predict(&self, tokenizer: &Tokenizer, text: &str) -> anyhow::Result<Vec<SentimentResult>>;

    async fn get_tokenizer(options: Self::Options) -> anyhow::Result<Tokenizer>;

    /// Longest token sequence the model accepts; longer input is truncated.
    fn max_sequence_length(&self) -> usize;

    fn device(&self) -> &candle_core::Device;
}
