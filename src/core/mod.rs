pub mod cache;
pub mod error;
pub mod language;

pub use cache::{global_cache, ModelCache, ModelOptions};
pub use error::ClassificationError;
pub use language::{resolve, Architecture, Language, ModelHandle};
