//! Redis reliable-list transport.
//!
//! Topics are Redis lists. Producers `LPUSH`, consumers `BLMOVE` from the
//! right end into a processing list owned by one worker of one process, and
//! `LREM` it on ack. Each process holds a heartbeat key while it runs. At
//! startup, processing lists whose owner's heartbeat has expired are moved
//! back onto the topic, which is what makes delivery at-least-once.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::queue::{Delivery, MessageSink, MessageSource, QueueError};

/// Lifetime of the heartbeat key; refreshed every third of it.
const HEARTBEAT_TTL: Duration = Duration::from_secs(30);
const SCAN_COUNT: usize = 100;

#[derive(Clone)]
pub struct RedisQueue {
    client: Client,
    block: Duration,
    instance: String,
}

impl RedisQueue {
    /// Opens the client and verifies the server answers `PING`. Every call
    /// gets a fresh instance id that scopes its processing lists.
    pub async fn connect(url: &str, block: Duration) -> Result<Self, QueueError> {
        let client = Client::open(url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(Self {
            client,
            block,
            instance: Uuid::new_v4().simple().to_string(),
        })
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Consumer for `topic` with its own connection, since `BLMOVE` blocks it.
    pub async fn consumer(&self, topic: &str, worker: usize) -> Result<RedisConsumer, QueueError> {
        Ok(RedisConsumer {
            conn: self.client.get_multiplexed_async_connection().await?,
            source: topic.to_string(),
            processing: processing_key(topic, &self.instance, worker),
            block: self.block,
        })
    }

    pub async fn producer(&self) -> Result<RedisProducer, QueueError> {
        Ok(RedisProducer {
            conn: self.client.get_multiplexed_async_connection().await?,
            pending: Vec::new(),
        })
    }

    /// Marks this process alive for `topic` until the TTL runs out.
    pub async fn heartbeat(&self, topic: &str) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("SET")
            .arg(heartbeat_key(topic, &self.instance))
            .arg(1)
            .arg("EX")
            .arg(HEARTBEAT_TTL.as_secs())
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    /// Refreshes the heartbeat until shutdown. Failures are logged and retried
    /// on the next tick.
    pub async fn keep_alive(self, topic: String, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(HEARTBEAT_TTL / 3);
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.heartbeat(&topic).await {
                        warn!(topic = %topic, error = %e, "failed to refresh heartbeat");
                    }
                }
            }
        }
    }

    /// Moves unacknowledged messages from processing lists of `topic` whose
    /// owning process is gone back onto the topic so they are consumed next.
    pub async fn requeue_inflight(&self, topic: &str) -> Result<usize, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let pattern = format!("{topic}:processing:*");
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        let mut moved = 0;
        for key in keys {
            let Some(owner) = processing_owner(topic, &key) else {
                continue;
            };
            if owner == self.instance {
                continue;
            }
            let alive: bool = redis::cmd("EXISTS")
                .arg(heartbeat_key(topic, owner))
                .query_async(&mut conn)
                .await?;
            if alive {
                debug!(key = %key, "processing list owner is alive, leaving it");
                continue;
            }

            loop {
                let item: Option<Vec<u8>> = redis::cmd("LMOVE")
                    .arg(&key)
                    .arg(topic)
                    .arg("RIGHT")
                    .arg("RIGHT")
                    .query_async(&mut conn)
                    .await?;
                if item.is_none() {
                    break;
                }
                moved += 1;
            }
        }

        if moved > 0 {
            info!(topic, moved, "requeued unacknowledged messages");
        }
        Ok(moved)
    }
}

fn processing_key(topic: &str, instance: &str, worker: usize) -> String {
    format!("{topic}:processing:{instance}:{worker}")
}

fn heartbeat_key(topic: &str, instance: &str) -> String {
    format!("{topic}:alive:{instance}")
}

/// Instance id embedded in a processing key of `topic`.
fn processing_owner<'a>(topic: &str, key: &'a str) -> Option<&'a str> {
    let rest = key.strip_prefix(topic)?.strip_prefix(":processing:")?;
    let (owner, worker) = rest.rsplit_once(':')?;
    (!owner.is_empty() && worker.parse::<usize>().is_ok()).then_some(owner)
}

pub struct RedisConsumer {
    conn: MultiplexedConnection,
    source: String,
    processing: String,
    block: Duration,
}

#[async_trait]
impl MessageSource for RedisConsumer {
    async fn next(&mut self) -> Result<Option<Delivery>, QueueError> {
        let payload: Option<Vec<u8>> = redis::cmd("BLMOVE")
            .arg(&self.source)
            .arg(&self.processing)
            .arg("RIGHT")
            .arg("LEFT")
            .arg(self.block.as_secs_f64())
            .query_async(&mut self.conn)
            .await?;
        Ok(payload.map(|payload| Delivery { payload }))
    }

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), QueueError> {
        let removed: i64 = redis::cmd("LREM")
            .arg(&self.processing)
            .arg(1)
            .arg(&delivery.payload)
            .query_async(&mut self.conn)
            .await?;
        debug!(processing = %self.processing, removed, "message acknowledged");
        Ok(())
    }
}

/// Buffers publishes and sends them as one `MULTI`/`EXEC` block on flush.
pub struct RedisProducer {
    conn: MultiplexedConnection,
    pending: Vec<(String, Vec<u8>)>,
}

#[async_trait]
impl MessageSink for RedisProducer {
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), QueueError> {
        self.pending.push((topic.to_string(), payload));
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), QueueError> {
        // A failed flush must not resend its batch with the next one.
        let batch = std::mem::take(&mut self.pending);
        if batch.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (topic, payload) in &batch {
            pipe.lpush(topic, payload).ignore();
        }
        pipe.query_async::<_, ()>(&mut self.conn).await?;

        debug!(messages = batch.len(), "producer flushed");
        Ok(())
    }

    fn discard(&mut self) {
        self.pending.clear();
    }
}
