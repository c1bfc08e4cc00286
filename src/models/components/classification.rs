use crate::pipelines::sentiment_analysis_pipeline::SentimentResult;
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::ops::softmax;
use std::collections::HashMap;
use tokenizers::Tokenizer;

/// Output labels of a classification head, ordered by class id.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassLabels {
    labels: Vec<String>,
}

impl ClassLabels {
    /// Build from the `id2label` table of a Hugging Face `config.json`.
    ///
    /// Ids must be exactly `0..n`; anything else means the config does not
    /// describe the head we are about to load.
    pub fn from_id2label(id2label: &HashMap<String, String>) -> Result<Self> {
        if id2label.is_empty() {
            anyhow::bail!("config has an empty id2label table");
        }

        let mut indexed = id2label
            .iter()
            .map(|(id, label)| {
                id.parse::<usize>()
                    .map(|id| (id, label.clone()))
                    .with_context(|| format!("id2label key `{id}` is not a class index"))
            })
            .collect::<Result<Vec<_>>>()?;
        indexed.sort_by_key(|(id, _)| *id);

        if let Some((position, (id, _))) = indexed
            .iter()
            .enumerate()
            .find(|(position, (id, _))| position != id)
        {
            anyhow::bail!("id2label is not contiguous: expected class {position}, found {id}");
        }

        Ok(Self {
            labels: indexed.into_iter().map(|(_, label)| label).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Softmax a `(1, num_labels)` logits tensor into per-label scores,
    /// highest first.
    pub fn scores(&self, logits: &Tensor) -> Result<Vec<SentimentResult>> {
        let probabilities = softmax(&logits.to_dtype(DType::F32)?, D::Minus1)?
            .squeeze(0)?
            .to_vec1::<f32>()?;

        if probabilities.len() != self.labels.len() {
            anyhow::bail!(
                "classifier produced {} logits for {} labels",
                probabilities.len(),
                self.labels.len()
            );
        }

        let mut scores: Vec<SentimentResult> = self
            .labels
            .iter()
            .zip(probabilities)
            .map(|(label, score)| SentimentResult {
                label: label.clone(),
                score,
            })
            .collect();
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));

        Ok(scores)
    }
}

const UNKNOWN_TOKENS: [&str; 2] = ["<unk>", "[UNK]"];

/// Tokenize one text into `(input_ids, attention_mask)` tensors of shape
/// `(1, seq_len)`. Truncation is whatever the tokenizer is configured with.
///
/// Ids at or past `vocab_size` are tokenizer-only pieces (fastBPE merge
/// intermediates) and are read as the tokenizer's unknown token.
pub fn encode_single(
    tokenizer: &Tokenizer,
    text: &str,
    vocab_size: usize,
    device: &Device,
) -> Result<(Tensor, Tensor)> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| anyhow::anyhow!("Tokenization error: {e}"))?;

    if encoding.get_ids().is_empty() {
        anyhow::bail!("tokenizer produced no tokens");
    }

    let ids = clamp_to_vocab(tokenizer, encoding.get_ids(), vocab_size)?;
    let input_ids = Tensor::new(ids.as_slice(), device)?.unsqueeze(0)?;
    let attention_mask = Tensor::new(encoding.get_attention_mask(), device)?.unsqueeze(0)?;

    Ok((input_ids, attention_mask))
}

fn clamp_to_vocab(tokenizer: &Tokenizer, ids: &[u32], vocab_size: usize) -> Result<Vec<u32>> {
    if ids.iter().all(|&id| (id as usize) < vocab_size) {
        return Ok(ids.to_vec());
    }

    let unk = UNKNOWN_TOKENS
        .iter()
        .find_map(|token| tokenizer.token_to_id(token))
        .filter(|&id| (id as usize) < vocab_size)
        .ok_or_else(|| {
            anyhow::anyhow!("token ids exceed the model vocabulary of {vocab_size} and there is no unknown token")
        })?;

    Ok(ids
        .iter()
        .map(|&id| if (id as usize) < vocab_size { id } else { unk })
        .collect())
}
