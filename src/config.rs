// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SURVEY_BASE_URL` | Survey service base URL | `http://localhost:5001` |
//! | `SURVEY_SESSION_FILE` | Session store file path | `survey-session.json` |
//! | `SURVEY_REQUEST_TIMEOUT_MS` | Per-request timeout | `2000` |
//! | `SURVEY_SIGN_PAYLOAD` | Signing payload strategy (`identity` or `body`) | `identity` |
//! | `SURVEY_STREAM_MAX_RETRIES` | Consecutive stream failures before giving up | `5` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::auth::SigningPayload;
use crate::error::ClientError;
use crate::events::ReconnectPolicy;

pub const BASE_URL_ENV: &str = "SURVEY_BASE_URL";
pub const SESSION_FILE_ENV: &str = "SURVEY_SESSION_FILE";
pub const REQUEST_TIMEOUT_ENV: &str = "SURVEY_REQUEST_TIMEOUT_MS";
pub const SIGN_PAYLOAD_ENV: &str = "SURVEY_SIGN_PAYLOAD";
pub const STREAM_MAX_RETRIES_ENV: &str = "SURVEY_STREAM_MAX_RETRIES";

const DEFAULT_BASE_URL: &str = "http://localhost:5001";
const DEFAULT_SESSION_FILE: &str = "survey-session.json";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(2000);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub session_file: PathBuf,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub signing_payload: SigningPayload,
    pub reconnect: ReconnectPolicy,
}

impl ClientConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::for_base_url(&env_or_default(BASE_URL_ENV, DEFAULT_BASE_URL))?;

        config.session_file = PathBuf::from(env_or_default(SESSION_FILE_ENV, DEFAULT_SESSION_FILE));

        if let Some(raw) = env_optional(REQUEST_TIMEOUT_ENV) {
            let millis: u64 = raw.parse().map_err(|_| {
                ClientError::InvalidRequest(format!("invalid {REQUEST_TIMEOUT_ENV}: {raw}"))
            })?;
            config.request_timeout = Duration::from_millis(millis);
        }

        if let Some(raw) = env_optional(SIGN_PAYLOAD_ENV) {
            config.signing_payload = SigningPayload::parse(&raw).ok_or_else(|| {
                ClientError::InvalidRequest(format!(
                    "invalid {SIGN_PAYLOAD_ENV}: {raw} (expected 'identity' or 'body')"
                ))
            })?;
        }

        if let Some(raw) = env_optional(STREAM_MAX_RETRIES_ENV) {
            config.reconnect.max_retries = raw.parse().map_err(|_| {
                ClientError::InvalidRequest(format!("invalid {STREAM_MAX_RETRIES_ENV}: {raw}"))
            })?;
        }

        Ok(config)
    }

    /// Configuration with defaults for the given base URL.
    pub fn for_base_url(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidRequest(format!("invalid base URL: {e}")))?;

        Ok(Self {
            base_url,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            signing_payload: SigningPayload::default(),
            reconnect: ReconnectPolicy::default(),
        })
    }
}

fn env_optional(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}
