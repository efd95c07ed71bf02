mod analysis;
mod config;
mod errors;
mod extract;
mod llm_client;
mod models;
mod pipeline;
mod publisher;
mod queue;
mod retry;
mod routes;
mod storage;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::grammar::SectionGrammar;
use crate::analysis::{Evaluator, ReportParser};
use crate::config::{Config, StorageBackend};
use crate::extract::TextExtractor;
use crate::llm_client::LlmClient;
use crate::pipeline::{Orchestrator, Stages, Stats, Worker};
use crate::publisher::ResultPublisher;
use crate::queue::RedisQueue;
use crate::retry::RetryPolicy;
use crate::routes::build_router;
use crate::storage::{ContentStore, DocumentFetcher, LocalContentStore, S3ContentStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume analyzer v{}", env!("CARGO_PKG_VERSION"));

    // Content store (S3 / MinIO or local directory)
    let store = build_store(&config).await;
    store
        .check()
        .await
        .with_context(|| format!("content store '{}' is not reachable", store.name()))?;
    info!(store = store.name(), "content store ready");

    // Evaluation service
    let llm = LlmClient::new(&config.llm, config.evaluation_timeout)?;
    info!("LLM client initialized (deployment: {})", config.llm.deployment);

    let parser = ReportParser::new(SectionGrammar::v1(), config.report_grammar)
        .context("failed to build report grammar")?;

    let stages = Arc::new(Stages {
        fetcher: DocumentFetcher::new(
            store,
            RetryPolicy::new(config.max_attempts, config.retry_base_delay, config.fetch_timeout),
        ),
        extractor: TextExtractor,
        evaluator: Evaluator::new(
            Arc::new(llm),
            config.llm.temperature,
            RetryPolicy::new(
                config.max_attempts,
                config.retry_base_delay,
                config.evaluation_timeout,
            ),
        ),
        parser,
    });

    // Queue transport
    let queue = RedisQueue::connect(&config.redis_url, config.queue_block)
        .await
        .context("failed to connect to Redis")?;
    queue.heartbeat(&config.topics.request).await?;
    queue.requeue_inflight(&config.topics.request).await?;
    info!(instance = queue.instance(), "Redis queue connected");

    let stats = Arc::new(Stats::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let heartbeat = tokio::spawn(
        queue
            .clone()
            .keep_alive(config.topics.request.clone(), shutdown_rx.clone()),
    );

    let mut workers = JoinSet::new();
    for id in 0..config.worker_count {
        let source = queue.consumer(&config.topics.request, id).await?;
        let sink = queue.producer().await?;
        let orchestrator = Orchestrator::new(
            stages.clone(),
            ResultPublisher::new(Box::new(sink), &config.topics),
            config.failure_policy,
            stats.clone(),
        );
        workers.spawn(Worker::new(id, Box::new(source), orchestrator, shutdown_rx.clone()).run());
    }
    info!(
        workers = config.worker_count,
        topic = %config.topics.request,
        policy = ?config.failure_policy,
        "consuming resume analysis requests"
    );

    // Health endpoint
    let app = build_router(stats).layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {addr}");

    let mut server_shutdown = shutdown_rx.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    shutdown_signal().await;
    info!("shutdown requested, waiting for in-flight messages");
    let _ = shutdown_tx.send(true);

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "worker task ended abnormally");
        }
    }
    server.await??;
    heartbeat.await?;

    info!("resume analyzer stopped");
    Ok(())
}

async fn build_store(config: &Config) -> Arc<dyn ContentStore> {
    match &config.storage {
        StorageBackend::S3 {
            bucket,
            endpoint,
            region,
            access_key_id,
            secret_access_key,
        } => Arc::new(
            S3ContentStore::connect(bucket, endpoint, region, access_key_id, secret_access_key)
                .await,
        ),
        StorageBackend::Local { root } => Arc::new(LocalContentStore::new(root.clone())),
    }
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl+c"),
        _ = terminate => info!("received SIGTERM"),
    }
}
