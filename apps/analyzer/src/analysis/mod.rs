// Resume evaluation: prompt construction, the evaluation call, and report parsing.
// All evaluation-service traffic goes through llm_client::CompletionService.

pub mod grammar;
pub mod parser;
pub mod prompts;
pub mod sections;

use std::sync::Arc;

use tracing::{info, warn};

use crate::analysis::prompts::{
    DEFAULT_LANGUAGE, EVALUATION_PROMPT_TEMPLATE, EVALUATION_SYSTEM, MAX_RESUME_CHARS,
};
use crate::llm_client::{CompletionService, LlmError};
use crate::models::{EvaluationReport, ExtractedText};
use crate::retry::RetryPolicy;

pub use parser::{ParsedReport, ReportParser};

/// Evaluator: sends resume text to the evaluation service with the fixed
/// three-section template and returns the raw report.
pub struct Evaluator {
    service: Arc<dyn CompletionService>,
    temperature: f32,
    retry: RetryPolicy,
}

impl Evaluator {
    pub fn new(service: Arc<dyn CompletionService>, temperature: f32, retry: RetryPolicy) -> Self {
        Self {
            service,
            temperature,
            retry,
        }
    }

    pub async fn evaluate(&self, text: &ExtractedText) -> Result<EvaluationReport, LlmError> {
        let prompt = build_prompt(&text.text);

        let raw_text = self
            .retry
            .run("evaluate", || {
                self.service
                    .complete(EVALUATION_SYSTEM, &prompt, self.temperature)
            })
            .await?;

        info!(report_chars = raw_text.chars().count(), "evaluation received");
        Ok(EvaluationReport { raw_text })
    }
}

/// Fills the evaluation template, cutting oversized resumes on a char boundary.
pub fn build_prompt(resume_text: &str) -> String {
    let resume_text = match resume_text.char_indices().nth(MAX_RESUME_CHARS) {
        Some((cut, _)) => {
            warn!(
                limit = MAX_RESUME_CHARS,
                "resume text exceeds prompt budget, truncating"
            );
            &resume_text[..cut]
        }
        None => resume_text,
    };

    EVALUATION_PROMPT_TEMPLATE
        .replace("{language}", DEFAULT_LANGUAGE)
        .replace("{resume_text}", resume_text.trim())
}
