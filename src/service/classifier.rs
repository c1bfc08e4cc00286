//! The classifier service: one request in, one top-ranked label out.

use super::ClassificationRequest;
use crate::core::{resolve, ClassificationError, ModelCache, ModelHandle, ModelOptions};
use crate::models::SentimentModel;
use crate::pipelines::sentiment_analysis_pipeline::{
    SentimentAnalysisModel, SentimentAnalysisPipeline, SentimentAnalysisPipelineBuilder,
    SentimentResult,
};
use crate::pipelines::utils::{DeviceRequest, DeviceSelectable};

/// Result of a successful classification.
pub type ClassificationResult = SentimentResult;

/// Something that scores text against a fixed label set.
pub trait SentimentScorer {
    /// Probability for each label. Order is not significant.
    fn scores(&self, text: &str) -> anyhow::Result<Vec<SentimentResult>>;
}

impl<M: SentimentAnalysisModel> SentimentScorer for SentimentAnalysisPipeline<M> {
    fn scores(&self, text: &str) -> anyhow::Result<Vec<SentimentResult>> {
        self.predict_all(text)
    }
}

/// Produces a ready-to-run scorer for a model handle.
#[allow(async_fn_in_trait)]
pub trait PipelineLoader {
    type Pipeline: SentimentScorer + Send + Sync + 'static;

    async fn load(&self, handle: &ModelHandle) -> anyhow::Result<Self::Pipeline>;
}

/// Loads pipelines from the Hugging Face Hub.
#[derive(Debug, Clone, Default)]
pub struct HubLoader {
    device_request: DeviceRequest,
    max_length: Option<usize>,
}

impl HubLoader {
    pub fn new(device_request: DeviceRequest) -> Self {
        Self {
            device_request,
            max_length: None,
        }
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

impl PipelineLoader for HubLoader {
    type Pipeline = SentimentAnalysisPipeline<SentimentModel>;

    async fn load(&self, handle: &ModelHandle) -> anyhow::Result<Self::Pipeline> {
        // The classifier caches the pipeline; the weights go with it.
        let mut builder = SentimentAnalysisPipelineBuilder::from_handle(handle.clone())
            .device_request(self.device_request.clone())
            .shared_cache(false);
        if let Some(max_length) = self.max_length {
            builder = builder.max_length(max_length);
        }
        builder.build().await
    }
}

/// Classifier service with a per-model pipeline cache.
///
/// The first request for a model loads it; later requests, including ones
/// racing the first, reuse the loaded pipeline. Requests for different
/// languages never touch each other's models.
pub struct SentimentClassifier<L: PipelineLoader = HubLoader> {
    loader: L,
    cache: ModelCache,
}

impl SentimentClassifier<HubLoader> {
    pub fn new(device_request: DeviceRequest) -> Self {
        Self::with_loader(HubLoader::new(device_request))
    }
}

impl<L: PipelineLoader> SentimentClassifier<L> {
    pub fn with_loader(loader: L) -> Self {
        Self {
            loader,
            cache: ModelCache::new(),
        }
    }

    /// Classify `text` with the model behind `handle`, returning the single
    /// top-scoring label.
    pub async fn classify(
        &self,
        handle: &ModelHandle,
        text: &str,
    ) -> Result<ClassificationResult, ClassificationError> {
        let pipeline = self
            .cache
            .get_or_create::<L::Pipeline, _, _>(&handle.cache_key(), || self.loader.load(handle))
            .await
            .map_err(|e| ClassificationError::model_load(&handle.model_id, e))?;

        let scores = pipeline
            .scores(text)
            .map_err(|e| ClassificationError::inference(&handle.model_id, e))?;

        let top = top_prediction(scores)
            .map_err(|e| ClassificationError::inference(&handle.model_id, e))?;

        tracing::debug!(model = %handle.model_id, label = %top.label, score = top.score, "classified");
        Ok(top)
    }

    /// Resolve the request's language and classify its text.
    pub async fn classify_request(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResult, ClassificationError> {
        let handle = resolve(request.language);
        self.classify(&handle, &request.text).await
    }

    /// Whether the model behind `handle` is already loaded.
    pub async fn is_loaded(&self, handle: &ModelHandle) -> bool {
        self.cache.contains::<L::Pipeline>(&handle.cache_key()).await
    }
}

/// Pick the highest-probability label and check it is a usable prediction.
fn top_prediction(scores: Vec<SentimentResult>) -> anyhow::Result<SentimentResult> {
    let top = scores
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or_else(|| anyhow::anyhow!("model returned no predictions"))?;

    if top.label.is_empty() {
        anyhow::bail!("model returned an empty label");
    }
    if !(0.0..=1.0).contains(&top.score) {
        anyhow::bail!("score {} for `{}` is not a probability", top.score, top.label);
    }

    Ok(top)
}
