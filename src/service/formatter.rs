use super::ClassificationResult;
use crate::core::{ClassificationError, Language};

/// Conversational reply shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedMessage {
    pub text: String,
}

impl std::fmt::Display for FormattedMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Render a classification as a sentence in the request's language.
///
/// English labels are echoed with only their first letter capitalized.
/// Vietnamese labels are translated: `POS` and `NEG` map to their own
/// wording and every other label, including an empty one, reads as neutral.
pub fn format(result: &ClassificationResult, language: Language) -> FormattedMessage {
    let pct = percentage(result.score);
    let text = match language {
        Language::English => format!(
            "The sentence is {} with a probability of {pct}!",
            capitalize(&result.label)
        ),
        Language::Vietnamese => format!(
            "Câu đã nhập mang sắc thái {} với xác suất {pct}!",
            vietnamese_sentiment(&result.label)
        ),
    };
    FormattedMessage { text }
}

/// Message shown in place of a result when classification failed.
pub fn format_failure(error: &ClassificationError, language: Language) -> FormattedMessage {
    let text = match language {
        Language::English => {
            format!("Sorry, the sentiment of this sentence could not be determined ({error}).")
        }
        Language::Vietnamese => {
            format!("Xin lỗi, không thể xác định sắc thái của câu đã nhập ({error}).")
        }
    };
    FormattedMessage { text }
}

fn percentage(score: f32) -> String {
    format!("{:.2}%", f64::from(score) * 100.0)
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

fn vietnamese_sentiment(label: &str) -> &'static str {
    match label {
        "POS" => "Tích cực",
        "NEG" => "Tiêu cực",
        "NEU" => "Trung lập",
        other => {
            tracing::warn!(label = other, "unexpected Vietnamese label, treating as neutral");
            "Trung lập"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, score: f32) -> ClassificationResult {
        ClassificationResult {
            label: label.to_string(),
            score,
        }
    }

    #[test]
    fn test_english_label_is_capitalized() {
        let msg = format(&result("POSITIVE", 0.9532), Language::English);
        assert_eq!(
            msg.text,
            "The sentence is Positive with a probability of 95.32%!"
        );

        let msg = format(&result("NEGATIVE", 0.5), Language::English);
        assert_eq!(
            msg.text,
            "The sentence is Negative with a probability of 50.00%!"
        );
    }

    #[test]
    fn test_vietnamese_labels_are_translated() {
        assert_eq!(
            format(&result("POS", 1.0), Language::Vietnamese).text,
            "Câu đã nhập mang sắc thái Tích cực với xác suất 100.00%!"
        );
        assert_eq!(
            format(&result("NEG", 0.0), Language::Vietnamese).text,
            "Câu đã nhập mang sắc thái Tiêu cực với xác suất 0.00%!"
        );
    }

    #[test]
    fn test_vietnamese_neutral_catch_all() {
        let expected = "Câu đã nhập mang sắc thái Trung lập với xác suất 61.00%!";
        for label in ["NEU", "", "MIXED", "pos"] {
            assert_eq!(
                format(&result(label, 0.61), Language::Vietnamese).text,
                expected,
                "label {label:?}"
            );
        }
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(0.5), "50.00%");
        assert_eq!(percentage(1.0), "100.00%");
        assert_eq!(percentage(0.0), "0.00%");
        assert_eq!(percentage(0.9532), "95.32%");
        assert_eq!(percentage(0.99999), "100.00%");
    }

    #[test]
    fn test_format_is_deterministic() {
        let r = result("POSITIVE", 0.87);
        assert_eq!(format(&r, Language::English), format(&r, Language::English));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("POSITIVE"), "Positive");
        assert_eq!(capitalize("negative"), "Negative");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_failure_message_is_localized() {
        let err = ClassificationError::Configuration("no model".into());
        let en = format_failure(&err, Language::English);
        let vi = format_failure(&err, Language::Vietnamese);
        assert!(en.text.starts_with("Sorry"));
        assert!(vi.text.starts_with("Xin lỗi"));
        assert!(en.text.contains("no model") && vi.text.contains("no model"));
    }
}
