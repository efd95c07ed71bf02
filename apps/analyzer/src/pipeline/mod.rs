//! Orchestrator: the per-message control loop.
//!
//! Flow: decode + validate → fetch → extract → evaluate → parse → publish.
//!
//! Every failure is contained at the message boundary. A message yields either
//! zero outbound messages or exactly two (feedback, then notification).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::analysis::{Evaluator, ParsedReport, ReportParser};
use crate::errors::PipelineError;
use crate::extract::TextExtractor;
use crate::models::{AnalysisRequest, AnalysisResult, AnalysisStatus};
use crate::publisher::ResultPublisher;
use crate::storage::DocumentFetcher;

pub mod stats;
pub mod worker;

pub use stats::Stats;
pub use worker::Worker;

/// Section text used in feedback published for a failed request.
pub const FAILED_SECTION_TEXT: &str = "이력서 분석 중 오류가 발생하여 결과를 생성하지 못했습니다.";

/// What happens downstream when a validated request fails in a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log only; the user receives nothing.
    Drop,
    /// Publish a `status: failed` feedback and a failure notification.
    Notify,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(FailurePolicy::Drop),
            "notify" => Ok(FailurePolicy::Notify),
            other => Err(format!("expected 'drop' or 'notify', got '{other}'")),
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Published { degraded: usize },
    Skipped(PipelineError),
    Failed {
        error: PipelineError,
        failure_published: bool,
    },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Published { .. } => f.write_str("published"),
            Outcome::Skipped(_) => f.write_str("skipped"),
            Outcome::Failed { .. } => f.write_str("failed"),
        }
    }
}

/// The stateless stages, built once at startup and shared by all workers.
pub struct Stages {
    pub fetcher: DocumentFetcher,
    pub extractor: TextExtractor,
    pub evaluator: Evaluator,
    pub parser: ReportParser,
}

pub struct Orchestrator {
    stages: Arc<Stages>,
    publisher: ResultPublisher,
    policy: FailurePolicy,
    stats: Arc<Stats>,
}

impl Orchestrator {
    pub fn new(
        stages: Arc<Stages>,
        publisher: ResultPublisher,
        policy: FailurePolicy,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            stages,
            publisher,
            policy,
            stats,
        }
    }

    /// Processes one inbound payload to completion. Never returns an error.
    pub async fn handle(&mut self, payload: &[u8]) -> Outcome {
        let payload_text = String::from_utf8_lossy(payload);

        let request = match AnalysisRequest::from_payload(payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(
                    stage = e.stage(),
                    error = %e,
                    payload = %payload_text,
                    "skipping message"
                );
                self.stats.record_skipped();
                return Outcome::Skipped(e);
            }
        };

        info!(
            user_id = %request.user_id,
            document_ref = %request.document_ref,
            "processing resume analysis request"
        );

        match self.run(&request).await {
            Ok(parsed) => {
                self.stats.record_processed(parsed.is_degraded());
                Outcome::Published {
                    degraded: parsed.degraded.len(),
                }
            }
            Err(e) => {
                error!(
                    user_id = %request.user_id,
                    stage = e.stage(),
                    error = %e,
                    payload = %payload_text,
                    "message processing failed"
                );
                self.stats.record_failed();
                let failure_published = self.publish_failure(&request, &e).await;
                Outcome::Failed {
                    error: e,
                    failure_published,
                }
            }
        }
    }

    async fn run(&mut self, request: &AnalysisRequest) -> Result<ParsedReport, PipelineError> {
        let document = self.stages.fetcher.fetch(&request.document_ref).await?;
        let text = self.stages.extractor.extract(&document).await?;
        let report = self.stages.evaluator.evaluate(&text).await?;
        let parsed = self.stages.parser.parse(&report);
        self.publisher.publish(&request.user_id, &parsed.result).await?;
        Ok(parsed)
    }

    /// Under `Notify`, tells the user their request failed. A transport that
    /// just failed to publish is not asked to publish again.
    async fn publish_failure(&mut self, request: &AnalysisRequest, cause: &PipelineError) -> bool {
        if self.policy != FailurePolicy::Notify || matches!(cause, PipelineError::Publish(_)) {
            return false;
        }

        let result = AnalysisResult::failed(FAILED_SECTION_TEXT);
        match self.publisher.publish(&request.user_id, &result).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    user_id = %request.user_id,
                    error = %e,
                    "failed to publish failure notice"
                );
                false
            }
        }
    }
}

impl Outcome {
    pub fn status(&self) -> Option<AnalysisStatus> {
        match self {
            Outcome::Published { .. } => Some(AnalysisStatus::Completed),
            Outcome::Failed {
                failure_published: true,
                ..
            } => Some(AnalysisStatus::Failed),
            _ => None,
        }
    }
}
