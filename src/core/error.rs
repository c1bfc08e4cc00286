use thiserror::Error;

/// Error returned at the classifier service boundary.
///
/// Everything below the service (downloads, weight loading, tokenization,
/// forward passes) reports through `anyhow`; the service sorts those failures
/// into one of these variants and keeps the original error as the source.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// The caller asked for something the resolver does not know about,
    /// e.g. an unsupported language selector.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The model, its weights or its tokenizer could not be initialized.
    #[error("failed to load model `{model}`: {source}")]
    ModelLoad {
        model: String,
        #[source]
        source: anyhow::Error,
    },

    /// The pipeline was loaded but running it failed, or it produced
    /// something that is not a usable prediction.
    #[error("inference failed for model `{model}`: {source}")]
    Inference {
        model: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ClassificationError {
    pub(crate) fn model_load(model: &str, source: anyhow::Error) -> Self {
        Self::ModelLoad {
            model: model.to_string(),
            source,
        }
    }

    pub(crate) fn inference(model: &str, source: anyhow::Error) -> Self {
        Self::Inference {
            model: model.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_model_and_cause() {
        let err = ClassificationError::model_load(
            "wonrax/phobert-base-vietnamese-sentiment",
            anyhow::anyhow!("weights not found"),
        );
        let msg = err.to_string();
        assert!(msg.contains("wonrax/phobert-base-vietnamese-sentiment"));
        assert!(msg.contains("weights not found"));

        let err = ClassificationError::Configuration("unsupported language `fr`".into());
        assert_eq!(err.to_string(), "configuration error: unsupported language `fr`");
    }

    #[test]
    fn test_source_is_preserved() {
        use std::error::Error as _;

        let err = ClassificationError::inference("m", anyhow::anyhow!("bad input"));
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("bad input"));
    }
}
