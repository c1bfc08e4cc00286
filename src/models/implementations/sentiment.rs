use super::distilbert::DistilBertSentimentModel;
use super::roberta::RobertaSentimentModel;
use crate::core::{Architecture, ModelHandle};
use crate::loaders::TokenizerLoader;
use crate::pipelines::sentiment_analysis_pipeline::{SentimentAnalysisModel, SentimentResult};
use candle_core::Device;
use tokenizers::Tokenizer;

/// Sentiment model chosen at runtime from a [`ModelHandle`]'s architecture.
#[derive(Debug, Clone)]
pub enum SentimentModel {
    DistilBert(DistilBertSentimentModel),
    Roberta(RobertaSentimentModel),
}

impl SentimentAnalysisModel for SentimentModel {
    type Options = ModelHandle;

    async fn new(options: Self::Options, device: Device) -> anyhow::Result<Self> {
        match options.architecture {
            Architecture::DistilBert => Ok(Self::DistilBert(
                DistilBertSentimentModel::new(&options, device).await?,
            )),
            Architecture::Roberta => Ok(Self::Roberta(
                RobertaSentimentModel::new(&options, device).await?,
            )),
        }
    }

    fn predict(&self, tokenizer: &Tokenizer, text: &str) -> anyhow::Result<Vec<SentimentResult>> {
        match self {
            Self::DistilBert(model) => model.predict(tokenizer, text),
            Self::Roberta(model) => model.predict(tokenizer, text),
        }
    }

    async fn get_tokenizer(options: Self::Options) -> anyhow::Result<Tokenizer> {
        TokenizerLoader::new(&options.tokenizer_id).load().await
    }

    fn max_sequence_length(&self) -> usize {
        match self {
            Self::DistilBert(model) => model.max_sequence_length(),
            Self::Roberta(model) => model.max_sequence_length(),
        }
    }

    fn device(&self) -> &Device {
        match self {
            Self::DistilBert(model) => model.device(),
            Self::Roberta(model) => model.device(),
        }
    }
}
