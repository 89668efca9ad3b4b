use crate::error::ChatError;
use std::env;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

pub const MAX_OUTPUT_TOKENS: u32 = 4090;
pub const TEMPERATURE: f32 = 0.0;
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024; // 5 MB

const CONTEXT_WINDOW_TOKENS: usize = 200_000;
pub const DEFAULT_CONTEXT_TOKEN_LIMIT: usize = CONTEXT_WINDOW_TOKENS - MAX_OUTPUT_TOKENS as usize;

/// Sessions idle for longer than this are dropped.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub bind_addr: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub max_upload_bytes: usize,
    pub context_token_limit: usize,
    pub session_ttl: Duration,
}

impl Config {
    /// Reads the process environment. Call `dotenv::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("ANTHROPIC_API_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ChatError::Initialization("ANTHROPIC_API_KEY environment variable not set".to_string())
            })?;

        let context_token_limit = match lookup("CONTEXT_TOKEN_LIMIT") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                ChatError::Initialization(format!(
                    "CONTEXT_TOKEN_LIMIT must be a positive integer, got {:?}",
                    raw
                ))
            })?,
            None => DEFAULT_CONTEXT_TOKEN_LIMIT,
        };

        let session_ttl = match lookup("SESSION_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    ChatError::Initialization(format!(
                        "SESSION_TTL_SECS must be a positive integer, got {:?}",
                        raw
                    ))
                })?,
            None => DEFAULT_SESSION_TTL,
        };

        Ok(Self {
            api_key,
            model: lookup("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: lookup("ANTHROPIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            max_output_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            context_token_limit,
            session_ttl,
        })
    }
}
