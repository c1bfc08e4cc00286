// Integration tests for the classifier service.
// A scripted loader stands in for the Hub so these run offline.

use bilingual_sentiment::pipelines::sentiment_analysis_pipeline::SentimentResult;
use bilingual_sentiment::service::{PipelineLoader, SentimentScorer};
use bilingual_sentiment::{
    format, resolve, ClassificationError, ClassificationRequest, Language, ModelHandle,
    SentimentClassifier,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Scores by keyword, with one fixed label set per model.
struct KeywordScorer {
    positive: &'static str,
    negative: &'static str,
}

impl SentimentScorer for KeywordScorer {
    fn scores(&self, text: &str) -> anyhow::Result<Vec<SentimentResult>> {
        let lower = text.to_lowercase();
        let positive = if lower.contains("love") || lower.contains("tuyệt") {
            0.9
        } else if lower.contains("hate") || lower.contains("ghét") {
            0.1
        } else {
            0.5
        };
        Ok(vec![
            SentimentResult {
                label: self.negative.to_string(),
                score: 1.0 - positive,
            },
            SentimentResult {
                label: self.positive.to_string(),
                score: positive,
            },
        ])
    }
}

#[derive(Clone, Default)]
struct ScriptedLoader {
    loads: Arc<AtomicUsize>,
}

impl PipelineLoader for ScriptedLoader {
    type Pipeline = KeywordScorer;

    async fn load(&self, handle: &ModelHandle) -> anyhow::Result<KeywordScorer> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(if handle == &resolve(Language::English) {
            KeywordScorer {
                positive: "POSITIVE",
                negative: "NEGATIVE",
            }
        } else {
            KeywordScorer {
                positive: "POS",
                negative: "NEG",
            }
        })
    }
}

#[tokio::test]
async fn english_request_is_formatted() -> anyhow::Result<()> {
    let classifier = SentimentClassifier::with_loader(ScriptedLoader::default());
    let request = ClassificationRequest::new("I love this!", Language::English);

    let result = classifier.classify_request(&request).await?;
    assert_eq!(result.label, "POSITIVE");
    assert!(result.score > 0.5 && result.score <= 1.0);

    let message = format(&result, request.language);
    assert!(message
        .text
        .starts_with("The sentence is Positive with a probability of "));
    Ok(())
}

#[tokio::test]
async fn vietnamese_request_is_formatted() -> anyhow::Result<()> {
    let classifier = SentimentClassifier::with_loader(ScriptedLoader::default());
    let request = ClassificationRequest::new("Tôi ghét điều này", Language::Vietnamese);

    let result = classifier.classify_request(&request).await?;
    assert_eq!(result.label, "NEG");

    let message = format(&result, request.language);
    assert!(message.text.starts_with("Câu đã nhập mang sắc thái Tiêu cực"));
    Ok(())
}

#[tokio::test]
async fn each_model_loads_once_across_requests() -> anyhow::Result<()> {
    let loader = ScriptedLoader::default();
    let loads = Arc::clone(&loader.loads);
    let classifier = SentimentClassifier::with_loader(loader);

    for text in ["", "I love this!", "I hate this!"] {
        classifier
            .classify_request(&ClassificationRequest::new(text, Language::English))
            .await?;
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    classifier
        .classify_request(&ClassificationRequest::new("", Language::Vietnamese))
        .await?;
    assert_eq!(loads.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn unknown_language_is_rejected() {
    let err = "fr".parse::<Language>().unwrap_err();
    assert!(matches!(err, ClassificationError::Configuration(_)));
}
