use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::PipelineError;
use crate::models::analysis::{AnalysisResult, AnalysisStatus};

pub const COMPLETED_NOTIFICATION: &str = "이력서 AI 분석이 완료되었습니다. 지금 확인해보세요!";
pub const FAILED_NOTIFICATION: &str =
    "이력서 AI 분석을 완료하지 못했습니다. 잠시 후 다시 시도해주세요.";

/// An inbound work item, built from one request-topic message.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub user_id: String,
    pub document_ref: String,
}

impl AnalysisRequest {
    /// Decodes and validates a raw request payload.
    ///
    /// `userId` may arrive as a string or a number and is always normalized to
    /// a string. Absent, null or blank fields are validation failures.
    pub fn from_payload(payload: &[u8]) -> Result<Self, PipelineError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| PipelineError::MalformedMessage(e.to_string()))?;
        let map = value.as_object().ok_or_else(|| {
            PipelineError::MalformedMessage("payload is not a JSON object".to_string())
        })?;

        let user_id = map
            .get("userId")
            .and_then(normalize_user_id)
            .ok_or_else(|| PipelineError::Validation("userId is missing or empty".to_string()))?;

        let document_ref = map
            .get("fileUrl")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .ok_or_else(|| PipelineError::Validation("fileUrl is missing or empty".to_string()))?;

        Ok(Self {
            user_id,
            document_ref,
        })
    }
}

fn normalize_user_id(value: &Value) -> Option<String> {
    let id = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

/// Feedback-topic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackMessage {
    pub user_id: String,
    pub strengths: String,
    pub weaknesses: String,
    pub suggestions: String,
    pub status: AnalysisStatus,
}

impl FeedbackMessage {
    pub fn new(user_id: &str, result: &AnalysisResult) -> Self {
        Self {
            user_id: user_id.to_string(),
            strengths: result.strengths.clone(),
            weaknesses: result.weaknesses.clone(),
            suggestions: result.suggestions.clone(),
            status: result.status,
        }
    }
}

/// Notification-topic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    pub user_id: String,
    pub message: String,
}

impl NotificationMessage {
    pub fn for_status(user_id: &str, status: AnalysisStatus) -> Self {
        let message = match status {
            AnalysisStatus::Completed => COMPLETED_NOTIFICATION,
            AnalysisStatus::Failed => FAILED_NOTIFICATION,
        };
        Self {
            user_id: user_id.to_string(),
            message: message.to_string(),
        }
    }
}
