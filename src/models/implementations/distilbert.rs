//! DistilBERT encoder with the Hugging Face sequence-classification head.
//!
//! Weight layout follows `DistilBertForSequenceClassification`:
//! `distilbert.embeddings.*`, `distilbert.transformer.layer.{i}.*`, then
//! `pre_classifier` and `classifier` at the root.

use crate::core::ModelHandle;
use crate::loaders::ModelFilesLoader;
use crate::models::components::{
    encode_single, extended_attention_mask, load_var_builder, read_config, ClassLabels,
    SelfAttention,
};
use crate::pipelines::sentiment_analysis_pipeline::SentimentResult;
use anyhow::Result as AnyhowResult;
use candle_core::{DType, Device, IndexOp, Result, Tensor};
use candle_nn::{embedding, layer_norm, linear, Activation, Embedding, LayerNorm, Linear, Module, VarBuilder};
use serde::Deserialize;
use std::collections::HashMap;
use tokenizers::Tokenizer;

const LAYER_NORM_EPS: f64 = 1e-12;

fn default_activation() -> Activation {
    Activation::Gelu
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub vocab_size: usize,
    pub dim: usize,
    pub n_layers: usize,
    pub n_heads: usize,
    pub hidden_dim: usize,
    #[serde(default = "default_activation")]
    pub activation: Activation,
    pub max_position_embeddings: usize,
    #[serde(default)]
    pub id2label: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct Embeddings {
    word_embeddings: Embedding,
    position_embeddings: Embedding,
    norm: LayerNorm,
}

impl Embeddings {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        Ok(Self {
            word_embeddings: embedding(config.vocab_size, config.dim, vb.pp("word_embeddings"))?,
            position_embeddings: embedding(
                config.max_position_embeddings,
                config.dim,
                vb.pp("position_embeddings"),
            )?,
            norm: layer_norm(config.dim, LAYER_NORM_EPS, vb.pp("LayerNorm"))?,
        })
    }

    fn forward(&self, input_ids: &Tensor) -> Result<Tensor> {
        let seq_len = input_ids.dim(1)?;
        let position_ids = Tensor::arange(0u32, seq_len as u32, input_ids.device())?.unsqueeze(0)?;

        let words = self.word_embeddings.forward(input_ids)?;
        let positions = self.position_embeddings.forward(&position_ids)?;
        words.broadcast_add(&positions)?.apply(&self.norm)
    }
}

#[derive(Debug, Clone)]
struct TransformerBlock {
    attention: SelfAttention,
    out_lin: Linear,
    sa_layer_norm: LayerNorm,
    lin1: Linear,
    lin2: Linear,
    activation: Activation,
    output_layer_norm: LayerNorm,
}

impl TransformerBlock {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let attention_vb = vb.pp("attention");
        let attention = SelfAttention::load(
            attention_vb.pp("q_lin"),
            attention_vb.pp("k_lin"),
            attention_vb.pp("v_lin"),
            config.dim,
            config.n_heads,
        )?;

        Ok(Self {
            attention,
            out_lin: linear(config.dim, config.dim, attention_vb.pp("out_lin"))?,
            sa_layer_norm: layer_norm(config.dim, LAYER_NORM_EPS, vb.pp("sa_layer_norm"))?,
            lin1: linear(config.dim, config.hidden_dim, vb.pp("ffn.lin1"))?,
            lin2: linear(config.hidden_dim, config.dim, vb.pp("ffn.lin2"))?,
            activation: config.activation,
            output_layer_norm: layer_norm(
                config.dim,
                LAYER_NORM_EPS,
                vb.pp("output_layer_norm"),
            )?,
        })
    }

    fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let attention_output = self
            .attention
            .forward(hidden_states, attention_mask)?
            .apply(&self.out_lin)?;
        let hidden_states = (attention_output + hidden_states)?.apply(&self.sa_layer_norm)?;

        let ffn_output = hidden_states
            .apply(&self.lin1)?
            .apply(&self.activation)?
            .apply(&self.lin2)?;
        (ffn_output + hidden_states)?.apply(&self.output_layer_norm)
    }
}

/// DistilBERT encoder plus `pre_classifier -> ReLU -> classifier` head.
#[derive(Debug, Clone)]
pub struct DistilBertForSequenceClassification {
    embeddings: Embeddings,
    layers: Vec<TransformerBlock>,
    pre_classifier: Linear,
    classifier: Linear,
    dtype: DType,
}

impl DistilBertForSequenceClassification {
    pub fn load(vb: VarBuilder, config: &Config, num_labels: usize) -> Result<Self> {
        let encoder_vb = vb.pp("distilbert");
        let embeddings = Embeddings::load(encoder_vb.pp("embeddings"), config)?;

        let layers = (0..config.n_layers)
            .map(|layer_idx| {
                TransformerBlock::load(
                    encoder_vb.pp(format!("transformer.layer.{layer_idx}")),
                    config,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            embeddings,
            layers,
            pre_classifier: linear(config.dim, config.dim, vb.pp("pre_classifier"))?,
            classifier: linear(config.dim, num_labels, vb.pp("classifier"))?,
            dtype: vb.dtype(),
        })
    }

    /// Returns logits with shape `(batch_size, num_labels)`.
    pub fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let attention_mask = extended_attention_mask(attention_mask, self.dtype)?;

        let mut hidden_states = self.embeddings.forward(input_ids)?;
        for layer in &self.layers {
            hidden_states = layer.forward(&hidden_states, &attention_mask)?;
        }

        hidden_states
            .i((.., 0, ..))?
            .apply(&self.pre_classifier)?
            .relu()?
            .apply(&self.classifier)
    }
}

/// English sentiment model: DistilBERT fine-tuned on SST-2.
#[derive(Debug, Clone)]
pub struct DistilBertSentimentModel {
    model: DistilBertForSequenceClassification,
    labels: ClassLabels,
    vocab_size: usize,
    max_position_embeddings: usize,
    device: Device,
}

impl DistilBertSentimentModel {
    pub async fn new(handle: &ModelHandle, device: Device) -> AnyhowResult<Self> {
        let files = ModelFilesLoader::new(&handle.model_id).load().await?;
        let config: Config = read_config(&files.config)?;
        let labels = ClassLabels::from_id2label(&config.id2label)?;

        let vb = load_var_builder(&files.weights, &device)?;
        let model = DistilBertForSequenceClassification::load(vb, &config, labels.len())?;

        tracing::info!(
            model = %handle.model_id,
            layers = config.n_layers,
            labels = labels.len(),
            "loaded DistilBERT classifier"
        );

        Ok(Self {
            model,
            labels,
            vocab_size: config.vocab_size,
            max_position_embeddings: config.max_position_embeddings,
            device,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn max_sequence_length(&self) -> usize {
        self.max_position_embeddings
    }

    pub fn predict(&self, tokenizer: &Tokenizer, text: &str) -> AnyhowResult<Vec<SentimentResult>> {
        let (input_ids, attention_mask) = encode_single(tokenizer, text, self.vocab_size, &self.device)?;
        let logits = self.model.forward(&input_ids, &attention_mask)?;
        self.labels.scores(&logits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config() -> Config {
        serde_json::from_str(
            r#"{
                "vocab_size": 16,
                "dim": 8,
                "n_layers": 2,
                "n_heads": 2,
                "hidden_dim": 12,
                "activation": "gelu",
                "max_position_embeddings": 10,
                "id2label": {"0": "NEGATIVE", "1": "POSITIVE"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_config_parses_sst2_fields() {
        let config = tiny_config();
        assert_eq!(config.dim, 8);
        assert_eq!(config.activation, Activation::Gelu);
        assert_eq!(config.id2label.len(), 2);
    }

    #[test]
    fn test_forward_shapes_with_zero_weights() {
        let device = Device::Cpu;
        let config = tiny_config();
        let vb = VarBuilder::zeros(DType::F32, &device);
        let model = DistilBertForSequenceClassification::load(vb, &config, 2).unwrap();

        let input_ids = Tensor::new(&[[1u32, 5, 7, 2]], &device).unwrap();
        let attention_mask = Tensor::ones((1, 4), DType::U32, &device).unwrap();
        let logits = model.forward(&input_ids, &attention_mask).unwrap();
        assert_eq!(logits.dims(), &[1, 2]);

        // All-zero weights give equal logits, so the distribution is uniform.
        let labels = ClassLabels::from_id2label(&config.id2label).unwrap();
        let scores = labels.scores(&logits).unwrap();
        assert!((scores[0].score - 0.5).abs() < 1e-6);
    }
}
