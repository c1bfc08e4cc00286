use candle_core::{DType, Result, Tensor, D};
use candle_nn::{linear, ops::softmax, Linear, Module, VarBuilder};

const MIN_VALUE_F64: f64 = f32::MIN as f64;

/// Multi-head scaled dot-product self-attention as used by BERT-family
/// encoders.
///
/// Only the query/key/value projections live here; the output projection and
/// residual are owned by the caller because the encoders name and normalize
/// them differently.
#[derive(Debug, Clone)]
pub struct SelfAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    num_attention_heads: usize,
    attention_head_size: usize,
}

impl SelfAttention {
    pub fn load(
        query: VarBuilder,
        key: VarBuilder,
        value: VarBuilder,
        hidden_size: usize,
        num_attention_heads: usize,
    ) -> Result<Self> {
        if num_attention_heads == 0 || hidden_size % num_attention_heads != 0 {
            candle_core::bail!(
                "hidden size {hidden_size} is not divisible by {num_attention_heads} attention heads"
            );
        }

        Ok(Self {
            query: linear(hidden_size, hidden_size, query)?,
            key: linear(hidden_size, hidden_size, key)?,
            value: linear(hidden_size, hidden_size, value)?,
            num_attention_heads,
            attention_head_size: hidden_size / num_attention_heads,
        })
    }

    fn split_heads(&self, xs: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, _) = xs.dims3()?;
        xs.reshape((
            batch,
            seq_len,
            self.num_attention_heads,
            self.attention_head_size,
        ))?
        .transpose(1, 2)?
        .contiguous()
    }

    /// `attention_mask` is the additive mask from [`extended_attention_mask`].
    /// Returns the attention context with shape `(batch, seq_len, hidden)`.
    pub fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, hidden_size) = hidden_states.dims3()?;

        let q = self.split_heads(&self.query.forward(hidden_states)?)?;
        let k = self.split_heads(&self.key.forward(hidden_states)?)?;
        let v = self.split_heads(&self.value.forward(hidden_states)?)?;

        let scale = (self.attention_head_size as f64).powf(-0.5);
        let q = (q * scale)?;

        let attention_scores = q.matmul(&k.transpose(D::Minus2, D::Minus1)?)?;
        let attention_scores = attention_scores.broadcast_add(attention_mask)?;
        let attention_probs = softmax(&attention_scores, D::Minus1)?;

        attention_probs
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((batch, seq_len, hidden_size))
    }
}

/// Turn a `(batch, seq_len)` padding mask (1 = token, 0 = padding) into the
/// additive `(batch, 1, 1, seq_len)` mask applied to attention scores.
pub fn extended_attention_mask(mask: &Tensor, dtype: DType) -> Result<Tensor> {
    let (batch_size, seq_len) = mask.dims2()?;
    let expanded_mask = mask.reshape((batch_size, 1, 1, seq_len))?.to_dtype(dtype)?;
    let inverted_mask = (1.0 - expanded_mask)?;
    inverted_mask * MIN_VALUE_F64
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_extended_mask_blocks_padding_only() {
        let mask = Tensor::new(&[[1u32, 1, 0]], &Device::Cpu).unwrap();
        let extended = extended_attention_mask(&mask, DType::F32).unwrap();
        assert_eq!(extended.dims(), &[1, 1, 1, 3]);

        let values = extended.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], 0.0);
        assert_eq!(values[2], f32::MIN);
    }

    #[test]
    fn test_attention_preserves_shape() {
        let device = Device::Cpu;
        let vb = VarBuilder::zeros(DType::F32, &device);
        let attention =
            SelfAttention::load(vb.pp("q"), vb.pp("k"), vb.pp("v"), 8, 2).unwrap();

        let hidden = Tensor::ones((1, 5, 8), DType::F32, &device).unwrap();
        let mask = Tensor::ones((1, 5), DType::U32, &device).unwrap();
        let mask = extended_attention_mask(&mask, DType::F32).unwrap();

        let context = attention.forward(&hidden, &mask).unwrap();
        assert_eq!(context.dims(), &[1, 5, 8]);
    }

    #[test]
    fn test_heads_must_divide_hidden_size() {
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        assert!(SelfAttention::load(vb.pp("q"), vb.pp("k"), vb.pp("v"), 10, 3).is_err());
    }
}
