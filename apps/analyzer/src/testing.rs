//! In-memory stand-ins for the external systems, shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

use crate::analysis::grammar::{SectionGrammar, StrategyKind};
use crate::analysis::{Evaluator, ReportParser};
use crate::config::{Topics, DEFAULT_FEEDBACK_TOPIC, DEFAULT_NOTIFICATION_TOPIC, DEFAULT_REQUEST_TOPIC};
use crate::extract::TextExtractor;
use crate::llm_client::{CompletionService, LlmError};
use crate::pipeline::{FailurePolicy, Orchestrator, Stages, Stats};
use crate::publisher::ResultPublisher;
use crate::queue::{Delivery, MessageSink, MessageSource, QueueError};
use crate::retry::RetryPolicy;
use crate::storage::{ContentStore, DocumentFetcher, StoreError};

pub const WELL_FORMED_REPORT: &str = "1. 강점\n문제 해결 과정을 구체적으로 서술했습니다.\n\n\
2. 약점\n협업 경험이 드러나지 않습니다.\n\n\
3. 개선점\n성과를 수치로 보여주세요.\n";

pub fn topics() -> Topics {
    Topics {
        request: DEFAULT_REQUEST_TOPIC.to_string(),
        feedback: DEFAULT_FEEDBACK_TOPIC.to_string(),
        notification: DEFAULT_NOTIFICATION_TOPIC.to_string(),
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), Duration::from_secs(5))
}

/// Builds a minimal valid PDF with one Helvetica text line per page.
pub fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let page_count = pages.len();
    let mut objects: Vec<String> = Vec::new();

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    let kids: Vec<String> = (0..page_count).map(|i| format!("{} 0 R", 4 + 2 * i)).collect();
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        page_count
    ));
    objects.push(
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    );

    for (i, text) in pages.iter().enumerate() {
        let escaped = text
            .replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)");
        let content = format!("BT /F1 12 Tf 72 720 Td ({escaped}) Tj ET");
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_at = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{offset:010} 00000 n \n"));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    ));
    out.extend_from_slice(xref.as_bytes());
    out
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Bytes>>,
    reads: AtomicUsize,
    failures: AtomicU32,
}

impl MemoryStore {
    pub fn with(key: &str, bytes: &[u8]) -> Self {
        let store = Self::default();
        store.insert(key, bytes.to_vec());
        store
    }

    pub fn insert(&self, key: &str, bytes: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::from(bytes));
    }

    /// The next `n` reads fail with a transfer error.
    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Transfer("connection reset".into()));
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[derive(Debug, Clone)]
pub struct CompletionCall {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
}

/// Replays scripted results in order, then answers with a fixed reply.
pub struct ScriptedCompletion {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    reply: String,
    calls: Mutex<Vec<CompletionCall>>,
}

impl ScriptedCompletion {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            reply: WELL_FORMED_REPORT.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Self::new(Vec::new())
        }
    }

    pub fn push(&self, results: Vec<Result<String, LlmError>>) {
        self.script.lock().unwrap().extend(results);
    }

    pub fn calls(&self) -> Vec<CompletionCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(CompletionCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
            temperature,
        });
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.reply.clone()))
    }
}

#[derive(Default)]
struct BrokerState {
    inbound: VecDeque<Vec<u8>>,
    published: Vec<(String, Vec<u8>)>,
    acked: usize,
    fail_flushes: bool,
    failing_topic: Option<String>,
    flush_attempts: usize,
}

/// A single in-process broker; sinks and sources made from it share state.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    pub fn sink(&self) -> MemorySink {
        MemorySink {
            state: self.state.clone(),
            pending: Vec::new(),
        }
    }

    pub fn source(&self) -> MemorySource {
        MemorySource {
            state: self.state.clone(),
        }
    }

    pub fn enqueue(&self, payload: &[u8]) {
        self.state.lock().unwrap().inbound.push_back(payload.to_vec());
    }

    /// Messages that reached the broker, in flush order.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().unwrap().published.clone()
    }

    pub fn fail_flushes(&self, fail: bool) {
        self.state.lock().unwrap().fail_flushes = fail;
    }

    /// Makes `publish` to `topic` fail; `None` restores normal publishing.
    pub fn fail_publishes_to(&self, topic: Option<&str>) {
        self.state.lock().unwrap().failing_topic = topic.map(String::from);
    }

    pub fn flush_attempts(&self) -> usize {
        self.state.lock().unwrap().flush_attempts
    }

    pub fn acked(&self) -> usize {
        self.state.lock().unwrap().acked
    }
}

pub struct MemorySink {
    state: Arc<Mutex<BrokerState>>,
    pending: Vec<(String, Vec<u8>)>,
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), QueueError> {
        let failing = self.state.lock().unwrap().failing_topic.as_deref() == Some(topic);
        if failing {
            return Err(unavailable());
        }
        self.pending.push((topic.to_string(), payload));
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), QueueError> {
        let batch = std::mem::take(&mut self.pending);
        let mut state = self.state.lock().unwrap();
        state.flush_attempts += 1;
        if state.fail_flushes {
            return Err(unavailable());
        }
        state.published.extend(batch);
        Ok(())
    }

    fn discard(&mut self) {
        self.pending.clear();
    }
}

fn unavailable() -> QueueError {
    QueueError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "broker unavailable",
    )))
}

pub struct MemorySource {
    state: Arc<Mutex<BrokerState>>,
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn next(&mut self) -> Result<Option<Delivery>, QueueError> {
        let payload = self.state.lock().unwrap().inbound.pop_front();
        match payload {
            Some(payload) => Ok(Some(Delivery { payload })),
            None => {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(None)
            }
        }
    }

    async fn ack(&mut self, _delivery: &Delivery) -> Result<(), QueueError> {
        self.state.lock().unwrap().acked += 1;
        Ok(())
    }
}

/// Everything an orchestrator needs, backed by in-memory fakes.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub completion: Arc<ScriptedCompletion>,
    pub broker: MemoryBroker,
    pub stats: Arc<Stats>,
    pub topics: Topics,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::default()),
            completion: Arc::new(ScriptedCompletion::new(Vec::new())),
            broker: MemoryBroker::default(),
            stats: Arc::new(Stats::default()),
            topics: topics(),
        }
    }

    pub fn with_document(self, key: &str, bytes: Vec<u8>) -> Self {
        self.store.insert(key, bytes);
        self
    }

    pub fn with_replies(self, replies: Vec<Result<String, LlmError>>) -> Self {
        self.completion.push(replies);
        self
    }

    pub fn stages(&self) -> Arc<Stages> {
        Arc::new(Stages {
            fetcher: DocumentFetcher::new(self.store.clone(), fast_retry()),
            extractor: TextExtractor,
            evaluator: Evaluator::new(self.completion.clone(), 0.2, fast_retry()),
            parser: ReportParser::new(SectionGrammar::v1(), StrategyKind::Regex).unwrap(),
        })
    }

    pub fn orchestrator(&self, policy: FailurePolicy) -> Orchestrator {
        Orchestrator::new(
            self.stages(),
            ResultPublisher::new(Box::new(self.broker.sink()), &self.topics),
            policy,
            self.stats.clone(),
        )
    }
}

/// Captured fmt output, plain text without ANSI colours.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Routes this thread's tracing output into a buffer until the guard drops.
pub fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}
