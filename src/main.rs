//! sentiment-chat - classify English or Vietnamese sentences from the console.
//!
//! One-shot: `sentiment-chat --lang vi "Tôi ghét điều này"`.
//! Without TEXT it reads lines from stdin; a line starting with `en:` or
//! `vi:` goes to that language's section, anything else to `--lang`.

use anyhow::Result;
use bilingual_sentiment::pipelines::utils::DeviceRequest;
use bilingual_sentiment::service::HubLoader;
use bilingual_sentiment::{
    format, format_failure, ClassificationRequest, Language, QueryLog, SentimentClassifier,
};
use clap::Parser;
use std::io::{BufRead, Write};
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "sentiment-chat")]
#[command(about = "Bilingual (English/Vietnamese) sentiment classifier")]
struct Args {
    /// Sentence to classify; starts an interactive session when omitted
    text: Option<String>,

    /// Language section for input without an `en:`/`vi:` prefix
    #[arg(long, short = 'l', default_value = "en")]
    lang: Language,

    /// Force CPU inference
    #[arg(long, env = "SENTIMENT_CPU", conflicts_with = "cuda")]
    cpu: bool,

    /// CUDA device index
    #[arg(long, env = "SENTIMENT_CUDA")]
    cuda: Option<usize>,

    /// Truncate input to at most this many tokens
    #[arg(long)]
    max_length: Option<usize>,

    /// Print a timestamped query log entry after each classification
    #[arg(long)]
    audit: bool,
}

impl Args {
    fn device_request(&self) -> DeviceRequest {
        match (self.cpu, self.cuda) {
            (true, _) => DeviceRequest::Cpu,
            (false, Some(index)) => DeviceRequest::Cuda(index),
            (false, None) => DeviceRequest::Default,
        }
    }
}

struct Session {
    classifier: SentimentClassifier,
    log: Option<QueryLog<std::io::Stdout>>,
}

impl Session {
    /// Classify one request and print the reply. Returns whether it succeeded.
    async fn handle(&mut self, request: &ClassificationRequest) -> bool {
        match self.classifier.classify_request(request).await {
            Ok(result) => {
                println!("{}", format(&result, request.language));
                if let Some(log) = self.log.as_mut() {
                    if let Err(e) = log.record(&request.text, &result) {
                        tracing::warn!(error = %e, "failed to write query log");
                    }
                }
                true
            }
            Err(e) => {
                tracing::error!(language = %request.language, error = ?e, "classification failed");
                println!("{}", format_failure(&e, request.language));
                false
            }
        }
    }
}

fn section_prompt(language: Language) -> &'static str {
    match language {
        Language::English => "Enter your sentence in English and I will classify it!",
        Language::Vietnamese => "Nhập câu của bạn bằng Tiếng Việt và tôi sẽ phân loại nó!",
    }
}

/// Split an `en:`/`vi:` prefix off `line`, falling back to `default`.
/// The text itself is passed on as typed, blank or not.
fn route(line: &str, default: Language) -> ClassificationRequest {
    if let Some((prefix, rest)) = line.split_once(':') {
        if let Ok(language) = prefix.parse::<Language>() {
            return ClassificationRequest::new(rest, language);
        }
    }
    ClassificationRequest::new(line, default)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut loader = HubLoader::new(args.device_request());
    if let Some(max_length) = args.max_length {
        loader = loader.max_length(max_length);
    }
    let mut session = Session {
        classifier: SentimentClassifier::with_loader(loader),
        log: args.audit.then(|| QueryLog::new(std::io::stdout())),
    };

    if let Some(text) = &args.text {
        let request = ClassificationRequest::new(text.as_str(), args.lang);
        let ok = session.handle(&request).await;
        return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    println!("Type your sentence! Prefix a line with `en:` or `vi:` to pick a section; Ctrl-D to quit.");
    for language in Language::ALL {
        println!("  {}: {} - {}", language.code(), language.title(), section_prompt(language));
    }

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("[{}] > ", args.lang);
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        session.handle(&route(&line, args.lang)).await;
    }
    println!();

    Ok(ExitCode::SUCCESS)
}
