pub mod analysis;
pub mod messages;

pub use analysis::{AnalysisResult, AnalysisStatus, EvaluationReport, ExtractedText, ResumeDocument};
pub use messages::{AnalysisRequest, FeedbackMessage, NotificationMessage};
