// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Headless runner for the survey client.
//!
//! Startup flow: if an identity is already persisted, build the signing
//! headers and log in; otherwise register from `SURVEY_NAME` and the key
//! files. Then list surveys and consume the event stream until Ctrl-C.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use survey_client::api::ApiClient;
use survey_client::config::ClientConfig;
use survey_client::error::ClientError;
use survey_client::events::EventStreamClient;
use survey_client::models::{Identity, KeyPair, NotificationEvent, Survey};
use survey_client::session::{Session, SessionObserver};
use survey_client::store::SessionStore;

const NAME_ENV: &str = "SURVEY_NAME";
const PRIVATE_KEY_PATH_ENV: &str = "SURVEY_PRIVATE_KEY_PATH";
const PUBLIC_KEY_PATH_ENV: &str = "SURVEY_PUBLIC_KEY_PATH";

/// Observer that renders session events into the log.
struct LogObserver;

impl SessionObserver for LogObserver {
    fn on_authenticated(&self, identity: &Identity) {
        info!(user_id = %identity.id, name = %identity.name, "authenticated");
    }

    fn on_notification(&self, event: &NotificationEvent) {
        info!(kind = ?event.kind, text = %event.text, "notification");
    }

    fn on_survey_update(&self, survey: &Survey) {
        info!(
            survey_id = %survey.id,
            title = %survey.title,
            closed = survey.closed,
            "survey update"
        );
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Register using name and key material from the environment.
async fn register_from_env(api: &ApiClient) -> Result<Identity, ClientError> {
    let name = std::env::var(NAME_ENV).map_err(|_| {
        ClientError::InvalidRequest(format!("{NAME_ENV} is required for registration"))
    })?;

    let keypair = KeyPair {
        private_key_pem: read_key_file(PRIVATE_KEY_PATH_ENV)?,
        public_key_pem: read_key_file(PUBLIC_KEY_PATH_ENV)?,
    };

    api.register(&name, &keypair).await
}

fn read_key_file(env_name: &str) -> Result<String, ClientError> {
    let path = std::env::var(env_name)
        .map_err(|_| ClientError::InvalidRequest(format!("{env_name} is required")))?;

    std::fs::read_to_string(&path)
        .map_err(|e| ClientError::InvalidRequest(format!("failed to read {path}: {e}")))
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let store = match SessionStore::open(&config.session_file) {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "failed to open session store");
            std::process::exit(1);
        }
    };

    let session = Arc::new(Session::new(store, config.signing_payload));
    let api = match ApiClient::new(&config, session.clone()) {
        Ok(api) => api,
        Err(e) => {
            error!(error = %e, "failed to build API client");
            std::process::exit(1);
        }
    };
    let observer: Arc<LogObserver> = Arc::new(LogObserver);

    let already_registered = matches!(session.identity(), Ok(Some(_)));
    info!(registered = already_registered, "starting up");

    // Registration, persistence, and header build all complete before any
    // signed request goes out.
    let identity = if already_registered {
        match api.login().await {
            Ok(()) => session
                .identity()
                .ok()
                .flatten()
                .expect("identity present after login"),
            Err(e) => {
                // registration overwrites the persisted record wholesale
                warn!(error = %e, "login failed; falling back to registration");
                match register_from_env(&api).await {
                    Ok(identity) => identity,
                    Err(e) => {
                        error!(error = %e, "registration failed");
                        std::process::exit(1);
                    }
                }
            }
        }
    } else {
        match register_from_env(&api).await {
            Ok(identity) => identity,
            Err(e) => {
                error!(error = %e, "registration failed");
                std::process::exit(1);
            }
        }
    };

    observer.on_authenticated(&identity);

    match api.surveys().await {
        Ok(surveys) => {
            info!(count = surveys.len(), "surveys listed");
            for survey in &surveys {
                info!(
                    survey_id = %survey.id,
                    title = %survey.title,
                    created_by = %survey.created_by,
                    closed = survey.closed,
                    "survey"
                );
            }
        }
        Err(e) => warn!(error = %e, "failed to list surveys"),
    }

    let stream = match EventStreamClient::new(&config, &api, observer, &identity.id) {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = %e, "failed to build event stream client");
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let stream_task = tokio::spawn(stream.run(shutdown.clone()));

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }

    info!("shutting down");
    shutdown.cancel();
    let _ = stream_task.await;
}
