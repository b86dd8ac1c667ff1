//! ONNX Runtime embedding pipeline for transformer sentence encoders.
//!
//! Mean-pooled, L2-normalized embeddings. The default model is
//! multilingual-e5-small (384 dimensions), which expects the `query: ` and
//! `passage: ` prefixes the provider adds. The model directory must contain
//! `model.onnx` and `tokenizer.json`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

use crate::provider::{EmbeddingModel, ModelLoader};
use crate::vector::normalize;

const MAX_TOKENS: usize = 512;
const DEFAULT_DIM: usize = 384;

/// A loaded tokenizer plus ONNX session.
///
/// Inference on the session is serialized; the tokenizer is shared freely.
pub struct Embedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dim: usize,
    // BERT-style exports take token_type_ids; XLM-R based ones (E5) do not.
    uses_token_types: bool,
}

impl Embedder {
    /// Load an embedding model from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?.commit_from_file(&model_path)?;
        let dim = session
            .outputs()
            .first()
            .and_then(|o| infer_dim(o.dtype()))
            .unwrap_or(DEFAULT_DIM);
        let uses_token_types = session
            .inputs()
            .iter()
            .any(|i| i.name() == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams::default()));

        info!(
            dim,
            uses_token_types,
            model = %model_path.display(),
            "loaded embedding model"
        );
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dim,
            uses_token_types,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embed a batch of texts as given (no prefixing), one unit vector per input.
    pub fn embed_batch<S: AsRef<str>>(&self, texts: &[S]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let batch_size = texts.len();

        let inputs: Vec<&str> = texts.iter().map(AsRef::as_ref).collect();
        let encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        // Flat [batch_size, seq_len] inputs.
        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let mut token_type_ids = vec![0i64; batch_size * seq_len];
        for (i, encoding) in encodings.iter().enumerate() {
            let row = i * seq_len;
            for (j, &id) in encoding.get_ids().iter().enumerate() {
                input_ids[row + j] = i64::from(id);
            }
            for (j, &mask) in encoding.get_attention_mask().iter().enumerate() {
                attention_mask[row + j] = i64::from(mask);
            }
            for (j, &tid) in encoding.get_type_ids().iter().enumerate() {
                token_type_ids[row + j] = i64::from(tid);
            }
        }

        let shape = [batch_size as i64, seq_len as i64];
        let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice()))?;
        let mask_tensor = Tensor::from_array((shape, attention_mask.clone().into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("onnx session poisoned"))?;
        let outputs = if self.uses_token_types {
            let type_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))?;
            session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
                "token_type_ids" => type_tensor,
            ])?
        } else {
            session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
            ])?
        };

        // Token embeddings: [batch_size, seq_len, dim].
        let (output_shape, hidden) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[0] as usize == batch_size && dims[2] as usize == self.dim,
            "unexpected output shape: {dims:?}, expected [{batch_size}, {seq_len}, {}]",
            self.dim
        );
        let out_seq = dims[1] as usize;

        Ok((0..batch_size)
            .map(|i| {
                let mask = &attention_mask[i * seq_len..(i + 1) * seq_len];
                let tokens = &hidden[i * out_seq * self.dim..(i + 1) * out_seq * self.dim];
                let mut pooled = mean_pool(tokens, mask, self.dim);
                normalize(&mut pooled);
                pooled
            })
            .collect())
    }
}

/// Attention-masked mean over one sequence of token vectors.
fn mean_pool(tokens: &[f32], mask: &[i64], dim: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; dim];
    let mut count = 0.0f32;
    for (token, &m) in tokens.chunks_exact(dim).zip(mask) {
        if m > 0 {
            for (p, &x) in pooled.iter_mut().zip(token) {
                *p += x;
            }
            count += 1.0;
        }
    }
    if count > 0.0 {
        for p in &mut pooled {
            *p /= count;
        }
    }
    pooled
}

/// Last dimension of the model's first output, when static.
fn infer_dim(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}

struct OnnxModel(Arc<Embedder>);

#[async_trait]
impl EmbeddingModel for OnnxModel {
    fn dim(&self) -> usize {
        self.0.dim()
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let embedder = self.0.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || embedder.embed_batch(texts.as_slice())).await?
    }
}

/// Loads an [`Embedder`] from disk on a blocking thread.
#[derive(Debug, Clone)]
pub struct OnnxLoader {
    model_dir: PathBuf,
}

impl OnnxLoader {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

#[async_trait]
impl ModelLoader for OnnxLoader {
    async fn load(&self) -> anyhow::Result<Arc<dyn EmbeddingModel>> {
        let dir = self.model_dir.clone();
        let embedder = tokio::task::spawn_blocking(move || Embedder::load(&dir)).await??;
        Ok(Arc::new(OnnxModel(Arc::new(embedder))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{EmbeddingProvider, Role, RolePrefixes};
    use crate::vector::cosine_sim;

    fn model_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("models")
            .join("multilingual-e5-small")
    }

    fn require_model() -> PathBuf {
        let dir = model_dir();
        if !dir.join("model.onnx").exists() {
            panic!(
                "Model not found. Download from HuggingFace:\n  \
                 curl -L -o models/multilingual-e5-small/model.onnx \
                 https://huggingface.co/intfloat/multilingual-e5-small/resolve/main/onnx/model.onnx\n  \
                 curl -L -o models/multilingual-e5-small/tokenizer.json \
                 https://huggingface.co/intfloat/multilingual-e5-small/resolve/main/tokenizer.json"
            );
        }
        dir
    }

    #[test]
    fn mean_pool_ignores_padding() {
        let tokens = [1.0, 2.0, 3.0, 4.0, 100.0, 100.0];
        let pooled = mean_pool(&tokens, &[1, 1, 0], 2);
        assert_eq!(pooled, [2.0, 3.0]);
    }

    #[test]
    fn mean_pool_all_masked_is_zero() {
        assert_eq!(mean_pool(&[5.0, 5.0], &[0], 2), [0.0, 0.0]);
    }

    #[test]
    fn missing_model_is_an_error() {
        let err = Embedder::load(Path::new("/nonexistent/model/dir"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("model.onnx not found"));
    }

    #[test]
    #[ignore = "requires models/multilingual-e5-small"]
    fn load_model() {
        let embedder = Embedder::load(&require_model()).unwrap();
        assert_eq!(embedder.dim(), 384);
    }

    #[test]
    #[ignore = "requires models/multilingual-e5-small"]
    fn embed_batch_unit_vectors() {
        let embedder = Embedder::load(&require_model()).unwrap();
        let vecs = embedder
            .embed_batch(&["passage: open settings", "passage: создай задачу"])
            .unwrap();
        assert_eq!(vecs.len(), 2);
        for (i, v) in vecs.iter().enumerate() {
            assert_eq!(v.len(), 384, "text {i} has wrong dimension");
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4, "text {i}: expected unit norm, got {norm}");
        }
    }

    #[tokio::test]
    #[ignore = "requires models/multilingual-e5-small"]
    async fn cross_lingual_query_matches_passage() {
        let provider =
            EmbeddingProvider::new(OnnxLoader::new(require_model()), RolePrefixes::default());

        let passage = provider
            .embed("покажи новости про AI", Role::Passage)
            .await
            .unwrap();
        let query = provider.embed("show AI news", Role::Query).await.unwrap();
        let unrelated = provider
            .embed("set the theme to dark", Role::Query)
            .await
            .unwrap();

        let related = cosine_sim(&query, &passage);
        let other = cosine_sim(&unrelated, &passage);
        assert!(related > 0.85, "cross-lingual similarity {related:.4}");
        assert!(related > other, "{related:.4} should beat {other:.4}");
    }

    #[tokio::test]
    async fn loader_reports_missing_dir() {
        let err = OnnxLoader::new("/nonexistent/model/dir")
            .load()
            .await
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("model.onnx not found"));
    }
}
