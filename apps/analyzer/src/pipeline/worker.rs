use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::pipeline::{Orchestrator, Outcome};
use crate::queue::{Delivery, MessageSource};

/// Pause after a transport error before polling again.
const TRANSPORT_BACKOFF: Duration = Duration::from_secs(2);

/// One sequential consumption loop: a message is fully processed and
/// acknowledged before the next is read.
pub struct Worker {
    id: usize,
    source: Box<dyn MessageSource>,
    orchestrator: Orchestrator,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    pub fn new(
        id: usize,
        source: Box<dyn MessageSource>,
        orchestrator: Orchestrator,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            source,
            orchestrator,
            shutdown,
        }
    }

    /// Runs until the shutdown flag flips. Only stops between messages.
    pub async fn run(mut self) {
        info!(worker = self.id, "worker started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let next = tokio::select! {
                _ = self.shutdown.changed() => break,
                next = self.source.next() => next,
            };

            match next {
                Ok(Some(delivery)) => self.process(delivery).await,
                Ok(None) => {}
                Err(e) => {
                    error!(worker = self.id, error = %e, "failed to read from queue");
                    tokio::select! {
                        _ = self.shutdown.changed() => break,
                        _ = tokio::time::sleep(TRANSPORT_BACKOFF) => {}
                    }
                }
            }
        }

        info!(worker = self.id, "worker stopped");
    }

    async fn process(&mut self, delivery: Delivery) {
        let span = info_span!("message", worker = self.id, message_id = %Uuid::new_v4());

        async {
            let outcome = self.orchestrator.handle(&delivery.payload).await;
            match &outcome {
                Outcome::Published { degraded } => {
                    info!(outcome = %outcome, degraded, "message done")
                }
                Outcome::Skipped(error) => {
                    info!(outcome = %outcome, stage = error.stage(), %error, "message done")
                }
                Outcome::Failed {
                    error,
                    failure_published,
                } => info!(
                    outcome = %outcome,
                    stage = error.stage(),
                    %error,
                    failure_published,
                    status = ?outcome.status(),
                    "message done"
                ),
            }

            // Acked whatever the outcome: failures are not redelivered.
            if let Err(e) = self.source.ack(&delivery).await {
                error!(error = %e, "failed to acknowledge message");
            }
        }
        .instrument(span)
        .await
    }
}
