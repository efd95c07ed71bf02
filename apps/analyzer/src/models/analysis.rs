use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Raw document bytes as retrieved from the content store.
#[derive(Debug, Clone)]
pub struct ResumeDocument {
    pub bytes: Bytes,
}

/// Plain text pulled out of a resume document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    pub pages: usize,
}

impl ExtractedText {
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// The evaluation service's unparsed answer.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub raw_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Completed,
    Failed,
}

/// User-facing verdict, the terminal artifact of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub strengths: String,
    pub weaknesses: String,
    pub suggestions: String,
    pub status: AnalysisStatus,
}

impl AnalysisResult {
    /// Result published for a request whose pipeline failed before parsing.
    pub fn failed(reason: &str) -> Self {
        Self {
            strengths: reason.to_string(),
            weaknesses: reason.to_string(),
            suggestions: reason.to_string(),
            status: AnalysisStatus::Failed,
        }
    }
}
