//! Model and tokenizer loading utilities for Hugging Face Hub integration.
//!
//! ## Main Types
//!
//! - [`HfLoader`] - Fetches a single file from a Hub repository, with retries
//! - [`TokenizerLoader`] - Loads `tokenizer.json`, or builds a tokenizer from
//!   `vocab.txt` (WordPiece, or fairseq BPE with `bpe.codes`) for repositories
//!   that do not ship one
//! - [`ModelFilesLoader`] - Resolves `config.json` and the weight file of a
//!   sequence-classification checkpoint
//!
//! Lock acquisition failures from the Hub cache are retried with exponential
//! backoff; every other error is returned as is.

use hf_hub::api::tokio::ApiBuilder;
use serde::Deserialize;
use std::path::PathBuf;
use tokenizers::models::bpe::{Vocab, BPE};
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::pre_tokenizers::whitespace::WhitespaceSplit;
use tokenizers::processors::bert::BertProcessing;
use tokenizers::processors::roberta::RobertaProcessing;
use tokenizers::Tokenizer;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub filename: String,
}

impl HfLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        Self {
            repo: repo.into(),
            filename: filename.into(),
        }
    }

    pub async fn load(&self) -> anyhow::Result<PathBuf> {
        let hf_api = ApiBuilder::new().with_progress(false).build()?;
        let hf_api = hf_api.model(self.repo.clone());

        let mut attempt = 0;
        loop {
            match hf_api.get(self.filename.as_str()).await {
                Ok(path) => {
                    tracing::debug!(repo = %self.repo, file = %self.filename, path = %path.display(), "resolved hub file");
                    return Ok(path);
                }
                Err(e) if e.to_string().contains("Lock acquisition failed")
                    && attempt + 1 < MAX_RETRIES =>
                {
                    let wait_time = std::time::Duration::from_millis(100 * (1 << attempt));
                    tracing::debug!(repo = %self.repo, file = %self.filename, attempt, "hub cache locked, retrying");
                    tokio::time::sleep(wait_time).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("fetching `{}` from `{}`", self.filename, self.repo)))
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct TokenizerLoader {
    pub repo: String,
}

impl TokenizerLoader {
    pub fn new(repo: &str) -> Self {
        Self { repo: repo.into() }
    }

    /// Load the repository's tokenizer.
    ///
    /// `tokenizer.json` is preferred, then the `onnx/tokenizer.json` export
    /// some BERT checkpoints keep instead. Without either, the tokenizer is
    /// assembled from `vocab.txt`: as fairseq BPE when the repository also has
    /// `bpe.codes` (PhoBERT), as BERT WordPiece otherwise.
    pub async fn load(&self) -> anyhow::Result<Tokenizer> {
        for filename in ["tokenizer.json", "onnx/tokenizer.json"] {
            if let Ok(path) = HfLoader::new(&self.repo, filename).load().await {
                tracing::debug!(repo = %self.repo, file = filename, "loading serialized tokenizer");
                return Tokenizer::from_file(path).map_err(anyhow::Error::msg);
            }
        }

        let vocab_path = HfLoader::new(&self.repo, "vocab.txt")
            .load()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "no usable tokenizer in `{}`: no tokenizer.json and no vocab.txt: {e:#}",
                    self.repo
                )
            })?;
        let vocab = std::fs::read_to_string(vocab_path)?;

        match HfLoader::new(&self.repo, "bpe.codes").load().await {
            Ok(codes_path) => {
                tracing::debug!(repo = %self.repo, "building fairseq BPE tokenizer");
                let codes = std::fs::read_to_string(codes_path)?;
                fairseq_bpe_tokenizer(&vocab, &codes)
            }
            Err(_) => {
                let lowercase = self.do_lower_case().await;
                tracing::debug!(repo = %self.repo, lowercase, "building WordPiece tokenizer");
                wordpiece_tokenizer(&vocab, lowercase)
            }
        }
    }

    /// `do_lower_case` from `tokenizer_config.json`, defaulting to true like
    /// the BERT tokenizers do.
    async fn do_lower_case(&self) -> bool {
        #[derive(Deserialize)]
        struct TokenizerConfig {
            do_lower_case: Option<bool>,
        }

        let Ok(path) = HfLoader::new(&self.repo, "tokenizer_config.json").load().await else {
            return true;
        };
        std::fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str::<TokenizerConfig>(&content).ok())
            .and_then(|config| config.do_lower_case)
            .unwrap_or(true)
    }
}

const WORDPIECE_UNK: &str = "[UNK]";
const WORDPIECE_CLS: &str = "[CLS]";
const WORDPIECE_SEP: &str = "[SEP]";

/// Build a BERT tokenizer from a WordPiece `vocab.txt` (one token per line,
/// id = line number).
pub(crate) fn wordpiece_tokenizer(vocab: &str, lowercase: bool) -> anyhow::Result<Tokenizer> {
    let vocab: Vocab = vocab
        .lines()
        .enumerate()
        .map(|(id, token)| (token.trim_end().to_string(), id as u32))
        .collect();

    let special = |token: &str| {
        vocab
            .get(token)
            .map(|&id| (token.to_string(), id))
            .ok_or_else(|| anyhow::anyhow!("vocab.txt has no `{token}` token"))
    };
    let cls = special(WORDPIECE_CLS)?;
    let sep = special(WORDPIECE_SEP)?;
    special(WORDPIECE_UNK)?;

    let wordpiece = WordPiece::builder()
        .vocab(vocab)
        .unk_token(WORDPIECE_UNK.to_string())
        .build()
        .map_err(anyhow::Error::msg)?;

    let mut tokenizer = Tokenizer::new(wordpiece);
    tokenizer.with_normalizer(Some(BertNormalizer::new(true, true, None, lowercase)));
    tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
    tokenizer.with_post_processor(Some(BertProcessing::new(sep, cls)));

    Ok(tokenizer)
}

const FAIRSEQ_SPECIALS: [&str; 4] = ["<s>", "<pad>", "</s>", "<unk>"];
const FAIRSEQ_MASK: &str = "<mask>";
const CONTINUATION_MARKER: &str = "@@";
const END_OF_WORD: &str = "</w>";

/// Convert a fairseq dictionary into a BPE vocabulary.
///
/// fairseq reserves ids 0..4 for `<s> <pad> </s> <unk>`, numbers dictionary
/// lines from 4 and appends `<mask>`. Subwords ending in `@@` continue the
/// word; every other entry ends it and is stored with the `</w>` suffix that
/// the BPE model attaches to the last character of each word.
fn fairseq_vocab(dictionary: &str) -> Vocab {
    let mut vocab: Vocab = FAIRSEQ_SPECIALS
        .iter()
        .enumerate()
        .map(|(id, token)| (token.to_string(), id as u32))
        .collect();

    let mut next_id = FAIRSEQ_SPECIALS.len() as u32;
    for line in dictionary.lines().filter(|l| !l.trim().is_empty()) {
        let symbol = line.rsplit_once(' ').map_or(line, |(symbol, _count)| symbol);
        let token = match symbol.strip_suffix(CONTINUATION_MARKER) {
            Some(stem) => stem.to_string(),
            None => format!("{symbol}{END_OF_WORD}"),
        };
        vocab.insert(token, next_id);
        next_id += 1;
    }
    vocab.insert(FAIRSEQ_MASK.to_string(), next_id);

    vocab
}

/// Parse fastBPE codes (`left right count` per line) into merges, in rank
/// order. Every code is kept: parts and results that are not dictionary
/// entries get ids past the end of the dictionary, so merge chains through
/// them still run. Such ids never reach a model; see
/// [`encode_single`](crate::models::components::encode_single).
fn fairseq_merges(codes: &str, vocab: &mut Vocab) -> Vec<(String, String)> {
    let mut next_id = vocab.values().max().map_or(0, |&id| id + 1);
    let mut merges = Vec::new();

    for line in codes.lines() {
        let mut parts = line.split_whitespace();
        let (Some(left), Some(right)) = (parts.next(), parts.next()) else {
            continue;
        };
        for token in [left.to_string(), right.to_string(), format!("{left}{right}")] {
            vocab.entry(token).or_insert_with(|| {
                next_id += 1;
                next_id - 1
            });
        }
        merges.push((left.to_string(), right.to_string()));
    }

    merges
}

/// Build a RoBERTa-style tokenizer from a fairseq dictionary and BPE codes.
pub(crate) fn fairseq_bpe_tokenizer(dictionary: &str, codes: &str) -> anyhow::Result<Tokenizer> {
    let mut vocab = fairseq_vocab(dictionary);
    let dictionary_len = vocab.len();
    let merges = fairseq_merges(codes, &mut vocab);
    tracing::debug!(
        dictionary = dictionary_len,
        merge_only = vocab.len() - dictionary_len,
        merges = merges.len(),
        "built fairseq BPE tables"
    );

    let bpe = BPE::builder()
        .vocab_and_merges(vocab, merges)
        .unk_token(FAIRSEQ_SPECIALS[3].to_string())
        .end_of_word_suffix(END_OF_WORD.to_string())
        .build()
        .map_err(anyhow::Error::msg)?;

    let mut tokenizer = Tokenizer::new(bpe);
    tokenizer.with_pre_tokenizer(Some(WhitespaceSplit));
    tokenizer.with_post_processor(Some(
        RobertaProcessing::new(
            (FAIRSEQ_SPECIALS[2].to_string(), 2),
            (FAIRSEQ_SPECIALS[0].to_string(), 0),
        )
        .trim_offsets(false)
        .add_prefix_space(false),
    ));

    Ok(tokenizer)
}

/// Local paths of a checkpoint's configuration and weights.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub weights: PathBuf,
}

#[derive(Clone)]
pub struct ModelFilesLoader {
    pub repo: String,
}

impl ModelFilesLoader {
    pub fn new(repo: &str) -> Self {
        Self { repo: repo.into() }
    }

    pub async fn load(&self) -> anyhow::Result<ModelFiles> {
        let config = HfLoader::new(&self.repo, "config.json").load().await?;

        let weights = match HfLoader::new(&self.repo, "model.safetensors").load().await {
            Ok(safetensors) => safetensors,
            Err(_) => match HfLoader::new(&self.repo, "pytorch_model.bin").load().await {
                Ok(pytorch_model) => pytorch_model,
                Err(e) => anyhow::bail!(
                    "Model weights not found in `{}`. Expected `model.safetensors` or `pytorch_model.bin`. Error: {e:#}",
                    self.repo
                ),
            },
        };

        Ok(ModelFiles { config, weights })
    }
}
