//! ResultPublisher: emits the feedback record, then the user notification,
//! then flushes. Both payloads are encoded before anything is published.

use tracing::info;

use crate::config::Topics;
use crate::models::{AnalysisResult, FeedbackMessage, NotificationMessage};
use crate::queue::{MessageSink, QueueError};

pub struct ResultPublisher {
    sink: Box<dyn MessageSink>,
    feedback_topic: String,
    notification_topic: String,
}

impl ResultPublisher {
    pub fn new(sink: Box<dyn MessageSink>, topics: &Topics) -> Self {
        Self {
            sink,
            feedback_topic: topics.feedback.clone(),
            notification_topic: topics.notification.clone(),
        }
    }

    pub async fn publish(&mut self, user_id: &str, result: &AnalysisResult) -> Result<(), QueueError> {
        let feedback = serde_json::to_vec(&FeedbackMessage::new(user_id, result))?;
        let notification =
            serde_json::to_vec(&NotificationMessage::for_status(user_id, result.status))?;

        if let Err(e) = self.send_pair(feedback, notification).await {
            // A half-queued pair must not ride along with the next flush.
            self.sink.discard();
            return Err(e);
        }

        info!(user_id, status = ?result.status, "feedback and notification published");
        Ok(())
    }

    async fn send_pair(&mut self, feedback: Vec<u8>, notification: Vec<u8>) -> Result<(), QueueError> {
        self.sink.publish(&self.feedback_topic, feedback).await?;
        self.sink.publish(&self.notification_topic, notification).await?;
        self.sink.flush().await
    }
}
