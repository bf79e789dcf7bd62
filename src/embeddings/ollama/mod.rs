
use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::{Device, Embedder, normalize_l2};
use crate::config::EmbeddingConfig;
use crate::{RagError, Result};

/// Used when the server does not report a context length
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 512;

const PROBE_TEXT: &str = "dimension probe";

/// Embedder backed by a model served by Ollama
///
/// Requests are sent once; a failed request surfaces as a model error and is
/// never retried.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    base_url: Url,
    model: String,
    batch_size: usize,
    device: Device,
    agent: ureq::Agent,
    dimension: usize,
    max_sequence_length: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<EmbedOptions>,
}

#[derive(Debug, Serialize)]
struct EmbedOptions {
    num_gpu: u32,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct ShowRequest<'a> {
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct ShowResponse {
    #[serde(default)]
    model_info: HashMap<String, serde_json::Value>,
}

impl OllamaEmbedder {
    /// Connect to the configured server and load the model's shape
    ///
    /// The output dimension comes from the model metadata, or from embedding a
    /// probe string when the server does not report it.
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        let mut embedder = Self {
            base_url,
            model: config.model.clone(),
            batch_size: config.batch_size.max(1) as usize,
            device: config.device,
            agent,
            dimension: 0,
            max_sequence_length: DEFAULT_MAX_SEQUENCE_LENGTH,
        };

        let model_info = embedder
            .show_model()
            .map_err(|e| RagError::Model(format!("Failed to load model '{}': {:#}", config.model, e)))?;

        embedder.max_sequence_length =
            info_value(&model_info, ".context_length").unwrap_or(DEFAULT_MAX_SEQUENCE_LENGTH);

        embedder.dimension = match info_value(&model_info, ".embedding_length") {
            Some(dimension) => dimension,
            None => {
                let probe = embedder
                    .request_embeddings(&[PROBE_TEXT.to_string()])
                    .map_err(|e| RagError::Model(format!("Failed to probe embedding dimension: {:#}", e)))?;
                probe.first().map_or(0, Vec::len)
            }
        };

        if embedder.dimension == 0 {
            return Err(RagError::Model(format!(
                "Model '{}' reported an empty embedding dimension",
                config.model
            )));
        }

        info!("model_name: {}", embedder.model);
        info!("EMBEDDING_DIM: {}", embedder.dimension);
        info!("MAX_SEQ_LENGTH: {}", embedder.max_sequence_length);

        Ok(embedder)
    }

    fn show_model(&self) -> anyhow::Result<HashMap<String, serde_json::Value>> {
        let url = self
            .base_url
            .join("/api/show")
            .context("Failed to build model info URL")?;

        let request_json = serde_json::to_string(&ShowRequest { model: &self.model })
            .context("Failed to serialize model info request")?;

        debug!("Fetching model info for {} from {}", self.model, url);

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| anyhow!("Request to {} failed: {}", url, e))?;

        let response: ShowResponse =
            serde_json::from_str(&response_text).context("Failed to parse model info response")?;

        Ok(response.model_info)
    }

    fn request_embeddings(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let url = self
            .base_url
            .join("/api/embed")
            .context("Failed to build embedding URL")?;

        let request = EmbedRequest {
            model: &self.model,
            input: texts,
            options: match self.device {
                Device::Cpu => Some(EmbedOptions { num_gpu: 0 }),
                Device::Auto => None,
            },
        };

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| anyhow!("Request to {} failed: {}", url, e))?;

        let response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        if response.embeddings.len() != texts.len() {
            return Err(anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.embeddings.len()
            ));
        }

        Ok(response.embeddings)
    }
}

impl Embedder for OllamaEmbedder {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let batch_vectors = self.request_embeddings(batch).map_err(|e| {
                RagError::Model(format!(
                    "Failed to embed batch of {} texts with '{}': {:#}",
                    batch.len(),
                    self.model,
                    e
                ))
            })?;

            for mut vector in batch_vectors {
                if vector.len() != self.dimension {
                    return Err(RagError::Model(format!(
                        "Model '{}' returned a {}-dimensional vector, expected {}",
                        self.model,
                        vector.len(),
                        self.dimension
                    )));
                }
                normalize_l2(&mut vector)?;
                vectors.push(vector);
            }
        }

        debug!("Generated {} embeddings total", vectors.len());
        Ok(vectors)
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn max_sequence_length(&self) -> usize {
        self.max_sequence_length
    }

    #[inline]
    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Look up a numeric model_info entry by key suffix, e.g. `bert.context_length`
fn info_value(model_info: &HashMap<String, serde_json::Value>, suffix: &str) -> Option<usize> {
    model_info
        .iter()
        .find(|(key, _)| key.ends_with(suffix))
        .and_then(|(_, value)| value.as_u64())
        .and_then(|value| usize::try_from(value).ok())
}
