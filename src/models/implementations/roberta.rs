//! RoBERTa encoder with the Hugging Face sequence-classification head.
//!
//! Used for PhoBERT checkpoints, which keep the `RobertaForSequenceClassification`
//! weight layout: `roberta.embeddings.*`, `roberta.encoder.layer.{i}.*` and a
//! `classifier.dense -> tanh -> classifier.out_proj` head.

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

fn default_activation() -> Activation {
    Activation::Gelu
}

fn default_layer_norm_eps() -> f64 {
    1e-5
}

fn default_pad_token_id() -> u32 {
    1
}

fn default_type_vocab_size() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    #[serde(default = "default_activation")]
    pub hidden_act: Activation,
    pub max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size: usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
    #[serde(default = "default_pad_token_id")]
    pub pad_token_id: u32,
    #[serde(default)]
    pub id2label: HashMap<String, String>,
}

impl Config {
    /// Longest input the position table can hold. RoBERTa numbers positions
    /// from `pad_token_id + 1`, so the first slots are never used.
    pub fn max_sequence_length(&self) -> usize {
        self.max_position_embeddings
            .saturating_sub(self.pad_token_id as usize + 1)
    }
}

#[derive(Debug, Clone)]
struct Embeddings {
    word_embeddings: Embedding,
    position_embeddings: Embedding,
    token_type_embeddings: Embedding,
    norm: LayerNorm,
    padding_idx: u32,
}

impl Embeddings {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        Ok(Self {
            word_embeddings: embedding(
                config.vocab_size,
                config.hidden_size,
                vb.pp("word_embeddings"),
            )?,
            position_embeddings: embedding(
                config.max_position_embeddings,
                config.hidden_size,
                vb.pp("position_embeddings"),
            )?,
            token_type_embeddings: embedding(
                config.type_vocab_size,
                config.hidden_size,
                vb.pp("token_type_embeddings"),
            )?,
            norm: layer_norm(config.hidden_size, config.layer_norm_eps, vb.pp("LayerNorm"))?,
            padding_idx: config.pad_token_id,
        })
    }

    /// `input_ids` is a single unpadded sequence per row, so positions run
    /// contiguously from `padding_idx + 1`.
    fn forward(&self, input_ids: &Tensor) -> Result<Tensor> {
        let seq_len = input_ids.dim(1)? as u32;
        let first_position = self.padding_idx + 1;
        let position_ids = Tensor::arange(first_position, first_position + seq_len, input_ids.device())?
            .unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let words = self.word_embeddings.forward(input_ids)?;
        let positions = self.position_embeddings.forward(&position_ids)?;
        let token_types = self.token_type_embeddings.forward(&token_type_ids)?;

        words
            .broadcast_add(&positions)?
            .broadcast_add(&token_types)?
            .apply(&self.norm)
    }
}

#[derive(Debug, Clone)]
struct EncoderLayer {
    attention: SelfAttention,
    attention_output: Linear,
    attention_norm: LayerNorm,
    intermediate: Linear,
    activation: Activation,
    output: Linear,
    output_norm: LayerNorm,
}

impl EncoderLayer {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let self_vb = vb.pp("attention.self");
        let attention = SelfAttention::load(
            self_vb.pp("query"),
            self_vb.pp("key"),
            self_vb.pp("value"),
            config.hidden_size,
            config.num_attention_heads,
        )?;

        Ok(Self {
            attention,
            attention_output: linear(
                config.hidden_size,
                config.hidden_size,
                vb.pp("attention.output.dense"),
            )?,
            attention_norm: layer_norm(
                config.hidden_size,
                config.layer_norm_eps,
                vb.pp("attention.output.LayerNorm"),
            )?,
            intermediate: linear(
                config.hidden_size,
                config.intermediate_size,
                vb.pp("intermediate.dense"),
            )?,
            activation: config.hidden_act,
            output: linear(
                config.intermediate_size,
                config.hidden_size,
                vb.pp("output.dense"),
            )?,
            output_norm: layer_norm(
                config.hidden_size,
                config.layer_norm_eps,
                vb.pp("output.LayerNorm"),
            )?,
        })
    }

    fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let attention_output = self
            .attention
            .forward(hidden_states, attention_mask)?
            .apply(&self.attention_output)?;
        let hidden_states = (attention_output + hidden_states)?.apply(&self.attention_norm)?;

        let output = hidden_states
            .apply(&self.intermediate)?
            .apply(&self.activation)?
            .apply(&self.output)?;
        (output + hidden_states)?.apply(&self.output_norm)
    }
}

#[derive(Debug, Clone)]
struct ClassificationHead {
    dense: Linear,
    out_proj: Linear,
}

impl ClassificationHead {
    fn load(vb: VarBuilder, config: &Config, num_labels: usize) -> Result<Self> {
        Ok(Self {
            dense: linear(config.hidden_size, config.hidden_size, vb.pp("dense"))?,
            out_proj: linear(config.hidden_size, num_labels, vb.pp("out_proj"))?,
        })
    }

    fn forward(&self, hidden_states: &Tensor) -> Result<Tensor> {
        hidden_states
            .i((.., 0, ..))?
            .apply(&self.dense)?
            .tanh()?
            .apply(&self.out_proj)
    }
}

/// RoBERTa encoder plus classification head.
#[derive(Debug, Clone)]
pub struct RobertaForSequenceClassification {
    embeddings: Embeddings,
    layers: Vec<EncoderLayer>,
    head: ClassificationHead,
    dtype: DType,
}

impl RobertaForSequenceClassification {
    pub fn load(vb: VarBuilder, config: &Config, num_labels: usize) -> Result<Self> {
        let encoder_vb = vb.pp("roberta");
        let embeddings = Embeddings::load(encoder_vb.pp("embeddings"), config)?;

        let layers = (0..config.num_hidden_layers)
            .map(|layer_idx| {
                EncoderLayer::load(encoder_vb.pp(format!("encoder.layer.{layer_idx}")), config)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            embeddings,
            layers,
            head: ClassificationHead::load(vb.pp("classifier"), config, num_labels)?,
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

        self.head.forward(&hidden_states)
    }
}

/// Vietnamese sentiment model: PhoBERT fine-tuned for POS/NEG/NEU.
#[derive(Debug, Clone)]
pub struct RobertaSentimentModel {
    model: RobertaForSequenceClassification,
    labels: ClassLabels,
    vocab_size: usize,
    max_sequence_length: usize,
    device: Device,
}

impl RobertaSentimentModel {
    pub async fn new(handle: &ModelHandle, device: Device) -> AnyhowResult<Self> {
        let files = ModelFilesLoader::new(&handle.model_id).load().await?;
        let config: Config = read_config(&files.config)?;
        let labels = ClassLabels::from_id2label(&config.id2label)?;

        let vb = load_var_builder(&files.weights, &device)?;
        let model = RobertaForSequenceClassification::load(vb, &config, labels.len())?;

        tracing::info!(
            model = %handle.model_id,
            layers = config.num_hidden_layers,
            labels = labels.len(),
            "loaded RoBERTa classifier"
        );

        Ok(Self {
            model,
            labels,
            vocab_size: config.vocab_size,
            max_sequence_length: config.max_sequence_length(),
            device,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn max_sequence_length(&self) -> usize {
        self.max_sequence_length
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

    fn phobert_like_config() -> Config {
        serde_json::from_str(
            r#"{
                "architectures": ["RobertaForSequenceClassification"],
                "vocab_size": 20,
                "hidden_size": 8,
                "num_hidden_layers": 1,
                "num_attention_heads": 2,
                "intermediate_size": 16,
                "hidden_act": "gelu",
                "max_position_embeddings": 12,
                "type_vocab_size": 1,
                "layer_norm_eps": 1e-05,
                "pad_token_id": 1,
                "id2label": {"0": "NEG", "1": "POS", "2": "NEU"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_max_sequence_length_skips_padding_offset() {
        assert_eq!(phobert_like_config().max_sequence_length(), 10);
    }

    #[test]
    fn test_forward_shapes_with_zero_weights() {
        let device = Device::Cpu;
        let config = phobert_like_config();
        let vb = VarBuilder::zeros(DType::F32, &device);
        let model = RobertaForSequenceClassification::load(vb, &config, 3).unwrap();

        // Longest sequence the position table allows.
        let ids: Vec<u32> = (0..config.max_sequence_length() as u32).collect();
        let input_ids = Tensor::new(ids.as_slice(), &device).unwrap().unsqueeze(0).unwrap();
        let attention_mask = input_ids.ones_like().unwrap();

        let logits = model.forward(&input_ids, &attention_mask).unwrap();
        assert_eq!(logits.dims(), &[1, 3]);
    }
}
