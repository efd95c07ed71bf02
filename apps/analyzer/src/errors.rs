use thiserror::Error;

use crate::extract::ExtractError;
use crate::llm_client::LlmError;
use crate::queue::QueueError;
use crate::storage::StoreError;

/// Everything that can end the processing of a single inbound message.
///
/// None of these stop the consumption loop. The first two are skip outcomes
/// decided before any stage runs; the rest are stage failures caught at the
/// message boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] StoreError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] LlmError),

    #[error("Publish error: {0}")]
    Publish(#[from] QueueError),
}

impl PipelineError {
    /// Short stage label used as a structured log field.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::MalformedMessage(_) => "deserialize",
            PipelineError::Validation(_) => "validate",
            PipelineError::Retrieval(_) => "fetch",
            PipelineError::Extraction(_) => "extract",
            PipelineError::Evaluation(_) => "evaluate",
            PipelineError::Publish(_) => "publish",
        }
    }
}
