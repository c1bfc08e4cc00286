//! Building blocks shared by the encoder implementations.

pub mod attention;
pub mod classification;
pub mod weights;

pub use attention::{extended_attention_mask, SelfAttention};
pub use classification::{encode_single, ClassLabels};
pub use weights::{load_var_builder, read_config};
