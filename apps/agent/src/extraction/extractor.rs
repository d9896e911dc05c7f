use async_trait::async_trait;
use tracing::warn;

use crate::errors::AppError;
use crate::extraction::prompts::{build_extraction_prompt, EXTRACTION_SYSTEM};
use crate::llm_client::LlmClient;
use crate::models::StructuredFields;

/// Turns a raw posting description into structured fields.
///
/// `Ok(None)` means "no usable structure in this text" and is not an error.
/// `Err` is reserved for transport failures the caller must propagate.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, raw_text: &str) -> Result<Option<StructuredFields>, AppError>;
}

/// Production extractor backed by Claude via `LlmClient`.
pub struct LlmExtractor {
    llm: LlmClient,
}

impl LlmExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Extractor for LlmExtractor {
    async fn extract(&self, raw_text: &str) -> Result<Option<StructuredFields>, AppError> {
        let prompt = build_extraction_prompt(raw_text);
        match self
            .llm
            .call_json::<StructuredFields>(&prompt, EXTRACTION_SYSTEM)
            .await
        {
            Ok(fields) => Ok(fields.filter(|f| !f.is_empty())),
            Err(e) if e.is_no_structure() => {
                warn!("Extractor returned no usable structure: {e}");
                Ok(None)
            }
            Err(e) => Err(AppError::Llm(format!("Extraction call failed: {e}"))),
        }
    }
}
