use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::analysis::grammar::StrategyKind;
use crate::pipeline::FailurePolicy;

pub const DEFAULT_REQUEST_TOPIC: &str = "resume_analysis_request";
pub const DEFAULT_FEEDBACK_TOPIC: &str = "analysis_feedback_topic";
pub const DEFAULT_NOTIFICATION_TOPIC: &str = "notification_topic";

/// Where resume documents are read from.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    S3 {
        bucket: String,
        endpoint: String,
        region: String,
        access_key_id: String,
        secret_access_key: String,
    },
    Local {
        root: PathBuf,
    },
}

/// Azure OpenAI chat deployment used as the evaluation service.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub endpoint: String,
    pub deployment: String,
    pub api_key: String,
    pub api_version: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Topics {
    pub request: String,
    pub feedback: String,
    pub notification: String,
}

/// Worker configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub topics: Topics,
    pub storage: StorageBackend,
    pub llm: LlmConfig,
    pub fetch_timeout: Duration,
    pub evaluation_timeout: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub worker_count: usize,
    pub failure_policy: FailurePolicy,
    pub report_grammar: StrategyKind,
    pub queue_block: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let storage = match env.or("STORAGE_BACKEND", "s3").to_lowercase().as_str() {
            "s3" => StorageBackend::S3 {
                bucket: env.require("S3_BUCKET")?,
                endpoint: env.require("S3_ENDPOINT")?,
                region: env.or("S3_REGION", "us-east-1"),
                access_key_id: env.require("AWS_ACCESS_KEY_ID")?,
                secret_access_key: env.require("AWS_SECRET_ACCESS_KEY")?,
            },
            "local" => StorageBackend::Local {
                root: PathBuf::from(env.require("LOCAL_STORAGE_DIR")?),
            },
            other => bail!("STORAGE_BACKEND must be 's3' or 'local', got '{other}'"),
        };

        let temperature: f32 = env.parse_or("LLM_TEMPERATURE", 0.2)?;
        if !(0.0..=2.0).contains(&temperature) {
            bail!("LLM_TEMPERATURE must be between 0 and 2, got {temperature}");
        }

        let llm = LlmConfig {
            endpoint: env.require("LLM_ENDPOINT")?,
            deployment: env.require("LLM_DEPLOYMENT")?,
            api_key: env.require("LLM_API_KEY")?,
            api_version: env.or("LLM_API_VERSION", "2024-06-01"),
            temperature,
            max_tokens: env.parse_or("LLM_MAX_TOKENS", 2048)?,
        };

        let max_attempts: u32 = env.parse_or("MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            bail!("MAX_ATTEMPTS must be at least 1");
        }
        let worker_count: usize = env.parse_or("WORKER_COUNT", 1)?;
        if worker_count == 0 {
            bail!("WORKER_COUNT must be at least 1");
        }

        Ok(Config {
            redis_url: env.require("REDIS_URL")?,
            topics: Topics {
                request: env.or("REQUEST_TOPIC", DEFAULT_REQUEST_TOPIC),
                feedback: env.or("FEEDBACK_TOPIC", DEFAULT_FEEDBACK_TOPIC),
                notification: env.or("NOTIFICATION_TOPIC", DEFAULT_NOTIFICATION_TOPIC),
            },
            storage,
            llm,
            fetch_timeout: Duration::from_secs(env.parse_or("FETCH_TIMEOUT_SECS", 30)?),
            evaluation_timeout: Duration::from_secs(env.parse_or("EVALUATION_TIMEOUT_SECS", 120)?),
            max_attempts,
            retry_base_delay: Duration::from_millis(env.parse_or("RETRY_BASE_DELAY_MS", 1000)?),
            worker_count,
            failure_policy: env.parse_or("FAILURE_POLICY", FailurePolicy::Drop)?,
            report_grammar: env.parse_or("REPORT_GRAMMAR", StrategyKind::Regex)?,
            queue_block: Duration::from_secs(env.parse_or("QUEUE_BLOCK_SECS", 5)?),
            port: env.parse_or("PORT", 8080)?,
            rust_log: env.or("RUST_LOG", "info"),
        })
    }
}

struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .with_context(|| format!("Required environment variable '{key}' is not set"))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
            None => Ok(default),
        }
    }
}
