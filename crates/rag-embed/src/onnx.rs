//! Sentence-embedding vectorizer backed by ONNX Runtime.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ndarray::ArrayViewD;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Encoding, Tokenizer};
use tracing::{debug, info};

use rag_core::{text_input, RagError, Result, Value, Vectorizer};

use crate::l2_normalize;

/// Default token window for BERT-style encoders.
const DEFAULT_MAX_TOKENS: usize = 512;

/// Embeds text with a transformer encoder exported to ONNX.
///
/// Token embeddings are mean-pooled under the attention mask and
/// L2-normalized. The output dimension is learned from the first batch.
pub struct OnnxVectorizer {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_tokens: usize,

    /// Prepended to every input, e.g. `"search_document: "`.
    prefix: String,

    dimension: Mutex<Option<usize>>,
}

impl OnnxVectorizer {
    /// Load a model and its `tokenizer.json`.
    pub fn new(model_path: impl AsRef<Path>, tokenizer_path: impl AsRef<Path>) -> Result<Self> {
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        info!("Loading ONNX model from {:?}", model_path);

        let session = Session::builder()
            .map_err(|e| RagError::vectorization(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| RagError::vectorization(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| RagError::vectorization(format!("Failed to set thread count: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| RagError::vectorization(format!("Failed to load model: {}", e)))?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| RagError::vectorization(format!("Failed to load tokenizer: {}", e)))?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_tokens: DEFAULT_MAX_TOKENS,
            prefix: String::new(),
            dimension: Mutex::new(None),
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let prefixed: Vec<String> = texts
            .iter()
            .map(|t| format!("{}{}", self.prefix, t))
            .collect();

        let encodings = self
            .tokenizer
            .encode_batch(prefixed, true)
            .map_err(|e| RagError::vectorization(format!("Tokenization failed: {}", e)))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_tokens);
        let batch = encodings.len();

        debug!("Embedding batch: size={}, seq_len={}", batch, seq_len);

        let mut input_ids = vec![0i64; batch * seq_len];
        let mut attention_mask = vec![0i64; batch * seq_len];
        for (row, encoding) in encodings.iter().enumerate() {
            let offset = row * seq_len;
            for (j, (id, mask)) in encoding
                .get_ids()
                .iter()
                .zip(encoding.get_attention_mask())
                .take(seq_len)
                .enumerate()
            {
                input_ids[offset + j] = i64::from(*id);
                attention_mask[offset + j] = i64::from(*mask);
            }
        }

        let input_ids = Tensor::from_array((vec![batch, seq_len], input_ids))
            .map_err(|e| RagError::vectorization(format!("Failed to create input tensor: {}", e)))?;
        let attention_mask = Tensor::from_array((vec![batch, seq_len], attention_mask))
            .map_err(|e| RagError::vectorization(format!("Failed to create mask tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| RagError::vectorization(format!("Failed to lock session: {}", e)))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask
            ])
            .map_err(|e| RagError::vectorization(format!("Inference failed: {}", e)))?;

        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| RagError::vectorization("model produced no outputs"))?;

        let view = output
            .try_extract_array::<f32>()
            .map_err(|e| RagError::vectorization(format!("Failed to extract tensor: {}", e)))?;

        let vectors = match view.ndim() {
            3 => mean_pool(&view, &encodings, seq_len),
            2 => (0..batch)
                .map(|i| l2_normalize((0..view.shape()[1]).map(|j| view[[i, j]]).collect()))
                .collect(),
            _ => {
                return Err(RagError::vectorization(format!(
                    "unexpected output shape {:?}",
                    view.shape()
                )))
            }
        };

        if let Some(first) = vectors.first() {
            if let Ok(mut dimension) = self.dimension.lock() {
                dimension.get_or_insert(first.len());
            }
        }

        Ok(vectors)
    }
}

/// Mean of token embeddings under the attention mask, for `[batch, seq, hidden]`.
fn mean_pool(view: &ArrayViewD<'_, f32>, encodings: &[Encoding], seq_len: usize) -> Vec<Vec<f32>> {
    let shape = view.shape();
    let hidden = shape[2];
    let seq_len = seq_len.min(shape[1]);

    encodings
        .iter()
        .enumerate()
        .map(|(i, encoding)| {
            let mut sum = vec![0.0f32; hidden];
            let mut count = 0usize;
            for (j, &mask) in encoding.get_attention_mask().iter().take(seq_len).enumerate() {
                if mask == 1 {
                    for (k, slot) in sum.iter_mut().enumerate() {
                        *slot += view[[i, j, k]];
                    }
                    count += 1;
                }
            }
            if count == 0 {
                return sum;
            }
            l2_normalize(sum.into_iter().map(|s| s / count as f32).collect())
        })
        .collect()
}

#[async_trait]
impl Vectorizer for OnnxVectorizer {
    async fn vectorize(&self, input: &Value) -> Result<Vec<f32>> {
        let text = text_input(input)?;
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::vectorization("no embedding returned"))
    }

    async fn bulk_vectorize(&self, inputs: &[&Value]) -> Result<Vec<Vec<f32>>> {
        let texts = inputs
            .iter()
            .map(|input| text_input(input))
            .collect::<Result<Vec<_>>>()?;
        self.embed_batch(&texts)
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension.lock().ok().and_then(|d| *d)
    }
}
