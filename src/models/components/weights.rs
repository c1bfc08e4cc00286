use anyhow::Result;
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Open a checkpoint as a [`VarBuilder`], memory-mapping safetensors and
/// falling back to PyTorch pickles.
pub fn load_var_builder(weights: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let dtype = DType::F32;

    if weights.extension().is_some_and(|ext| ext == "safetensors") {
        // SAFETY: the file lives in the Hub cache and is not modified while mapped.
        Ok(unsafe { VarBuilder::from_mmaped_safetensors(&[weights], dtype, device)? })
    } else if weights.extension().is_some_and(|ext| ext == "bin") {
        Ok(VarBuilder::from_pth(weights, dtype, device)?)
    } else {
        anyhow::bail!("Unsupported weight file format: {:?}", weights);
    }
}

/// Read and parse a JSON model config.
pub fn read_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file {path:?}: {e}"))?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse model config {path:?}: {e}"))
}
