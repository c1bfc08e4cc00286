use super::model::SentimentAnalysisModel;
use super::pipeline::SentimentAnalysisPipeline;
use crate::core::{global_cache, ModelHandle, ModelOptions};
use crate::models::SentimentModel;
use crate::pipelines::utils::{build_cache_key, DeviceRequest, DeviceSelectable};
use candle_core::Device;
use std::sync::Arc;
use tokenizers::TruncationParams;

pub struct SentimentAnalysisPipelineBuilder<M: SentimentAnalysisModel> {
    options: M::Options,
    device_request: DeviceRequest,
    max_length: Option<usize>,
    shared_cache: bool,
}

impl<M: SentimentAnalysisModel> SentimentAnalysisPipelineBuilder<M> {
    pub fn new(options: M::Options) -> Self {
        Self {
            options,
            device_request: DeviceRequest::Default,
            max_length: None,
            shared_cache: true,
        }
    }

    /// Whether to share the model through the process-wide cache (the
    /// default). When disabled, the pipeline owns its weights and they are
    /// freed with it.
    pub fn shared_cache(mut self, enabled: bool) -> Self {
        self.shared_cache = enabled;
        self
    }

    /// Truncate input to at most `max_length` tokens. Values above the
    /// model's own limit are clamped to it.
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub async fn build(self) -> anyhow::Result<SentimentAnalysisPipeline<M>>
    where
        M: Send + Sync + 'static,
        M::Options: ModelOptions,
    {
        let device = self.device_request.resolve()?;
        let model = acquire_model::<M>(&self.options, device, self.shared_cache).await?;

        let mut tokenizer = M::get_tokenizer(self.options).await?;
        let limit = model.max_sequence_length();
        let max_length = self.max_length.map_or(limit, |requested| requested.min(limit));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(anyhow::Error::msg)?;
        tokenizer.with_padding(None);

        tracing::debug!(shared = self.shared_cache, max_length, "built sentiment pipeline");

        Ok(SentimentAnalysisPipeline { model, tokenizer })
    }
}

/// Load the model, through the process-wide cache when `shared`.
async fn acquire_model<M>(options: &M::Options, device: Device, shared: bool) -> anyhow::Result<Arc<M>>
where
    M: SentimentAnalysisModel + Send + Sync + 'static,
    M::Options: ModelOptions,
{
    if !shared {
        return Ok(Arc::new(M::new(options.clone(), device).await?));
    }

    let key = build_cache_key(options, &device);
    tracing::debug!(key = %key, "loading model through the shared cache");
    global_cache()
        .get_or_create(&key, || M::new(options.clone(), device))
        .await
}

impl<M: SentimentAnalysisModel> DeviceSelectable for SentimentAnalysisPipelineBuilder<M> {
    fn device_request_mut(&mut self) -> &mut DeviceRequest {
        &mut self.device_request
    }
}

impl SentimentAnalysisPipelineBuilder<SentimentModel> {
    /// Builder for the model identified by `handle`.
    pub fn from_handle(handle: ModelHandle) -> Self {
        Self::new(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::sentiment_analysis_pipeline::SentimentResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokenizers::Tokenizer;

    static LOADS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug, Clone)]
    struct CountingOptions(&'static str);

    impl ModelOptions for CountingOptions {
        fn cache_key(&self) -> String {
            self.0.to_string()
        }
    }

    struct CountingModel {
        device: Device,
    }

    impl SentimentAnalysisModel for CountingModel {
        type Options = CountingOptions;

        async fn new(_options: Self::Options, device: Device) -> anyhow::Result<Self> {
            LOADS.fetch_add(1, Ordering::SeqCst);
            Ok(Self { device })
        }

        fn predict(&self, _tokenizer: &Tokenizer, _text: &str) -> anyhow::Result<Vec<SentimentResult>> {
            Ok(Vec::new())
        }

        async fn get_tokenizer(_options: Self::Options) -> anyhow::Result<Tokenizer> {
            anyhow::bail!("not needed")
        }

        fn max_sequence_length(&self) -> usize {
            8
        }

        fn device(&self) -> &Device {
            &self.device
        }
    }

    #[tokio::test]
    async fn test_shared_and_owned_model_loading() {
        let shared = CountingOptions("builder-test-shared");
        let a = acquire_model::<CountingModel>(&shared, Device::Cpu, true).await.unwrap();
        let b = acquire_model::<CountingModel>(&shared, Device::Cpu, true).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(
            global_cache()
                .contains::<CountingModel>(&build_cache_key(&shared, &Device::Cpu))
                .await
        );

        let owned = CountingOptions("builder-test-owned");
        let before = LOADS.load(Ordering::SeqCst);
        let c = acquire_model::<CountingModel>(&owned, Device::Cpu, false).await.unwrap();
        let d = acquire_model::<CountingModel>(&owned, Device::Cpu, false).await.unwrap();
        assert!(!Arc::ptr_eq(&c, &d));
        assert_eq!(LOADS.load(Ordering::SeqCst) - before, 2);
        assert!(
            !global_cache()
                .contains::<CountingModel>(&build_cache_key(&owned, &Device::Cpu))
                .await
        );
        assert_eq!(Arc::strong_count(&c), 1);
    }
}
