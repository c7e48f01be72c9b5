// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Event Stream Client
//!
//! Subscribes to the per-user push channel (`GET /events/:userId`, SSE)
//! and dispatches typed events into the notification list and the session
//! observer.
//!
//! ## Reconnection
//!
//! Reconnection is an explicit policy owned by this client, not an
//! implicit property of the transport: on disconnect the client backs off
//! exponentially (capped) and retries up to `max_retries` consecutive
//! failures before giving up. A successful connection resets the counter.
//! Stream errors are logged and non-fatal until retries are exhausted;
//! missing key material is terminal immediately.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for deterministic teardown:
//! cancelling the token closes the connection and ends the task.

pub mod sse;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{NotificationEvent, NotificationKind, Survey};
use crate::notifications::NotificationList;
use crate::session::{Session, SessionObserver};
use sse::{SseFrame, SseParser};

/// Named events the server pushes.
pub const NEW_SURVEY_EVENT: &str = "new-survey";
pub const CLOSED_SURVEY_EVENT: &str = "closed-survey";
pub const PING_EVENT: &str = "ping";
pub const WELCOME_EVENT: &str = "welcome";
pub const ERROR_EVENT: &str = "error";

/// Subscription lifecycle: `Closed -> Connecting -> Open -> (Errored ->
/// Connecting | Closed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Closed,
    Connecting,
    Open,
    Errored,
}

/// Reconnection policy: exponential backoff with a cap and a terminal
/// give-up threshold.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Consecutive failures tolerated before giving up.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// Backoff before reconnect attempt `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Why one stream connection ended.
enum StreamExit {
    Shutdown,
    Ended,
}

/// Client for the authenticated push channel.
pub struct EventStreamClient {
    http: Client,
    events_url: String,
    session: Arc<Session>,
    observer: Arc<dyn SessionObserver>,
    notifications: Arc<Mutex<NotificationList>>,
    policy: ReconnectPolicy,
    state: StreamState,
    retries: u32,
}

impl EventStreamClient {
    /// Build a stream client for the given user's channel.
    ///
    /// The HTTP client gets a connect timeout only: the stream itself is
    /// long-lived and must not be cut by a total request timeout.
    pub fn new(
        config: &ClientConfig,
        api: &ApiClient,
        observer: Arc<dyn SessionObserver>,
        user_id: &str,
    ) -> Result<Self, ClientError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ClientError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            events_url: api.events_url(user_id),
            session: api.session().clone(),
            observer,
            notifications: Arc::new(Mutex::new(NotificationList::new())),
            policy: config.reconnect.clone(),
            state: StreamState::Closed,
            retries: 0,
        })
    }

    /// Shared handle to the bounded notification list.
    pub fn notifications(&self) -> Arc<Mutex<NotificationList>> {
        self.notifications.clone()
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Consume the stream until shutdown or the retry budget runs out.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(url = %self.events_url, "event stream starting");

        loop {
            if shutdown.is_cancelled() {
                self.state = StreamState::Closed;
                info!("event stream shut down");
                return;
            }

            self.state = StreamState::Connecting;
            match self.consume_stream(&shutdown).await {
                Ok(StreamExit::Shutdown) => {
                    self.state = StreamState::Closed;
                    info!("event stream shut down");
                    return;
                }
                Ok(StreamExit::Ended) => {
                    self.state = StreamState::Errored;
                    warn!("event stream ended by server");
                }
                Err(ClientError::Auth(e)) => {
                    // unusable key material cannot be retried away
                    self.state = StreamState::Closed;
                    warn!(error = %e, "event stream requires registration; stopping");
                    return;
                }
                Err(e) => {
                    self.state = StreamState::Errored;
                    warn!(error = %e, "event stream error");
                }
            }

            if self.retries >= self.policy.max_retries {
                self.state = StreamState::Closed;
                warn!(
                    retries = self.retries,
                    "event stream giving up after repeated failures"
                );
                return;
            }

            let delay = self.policy.delay_for(self.retries);
            self.retries += 1;
            debug!(
                attempt = self.retries,
                delay_ms = delay.as_millis() as u64,
                "event stream reconnecting"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.cancelled() => {
                    self.state = StreamState::Closed;
                    info!("event stream shut down");
                    return;
                }
            }
        }
    }

    /// Open one connection and dispatch frames until it ends.
    async fn consume_stream(
        &mut self,
        shutdown: &CancellationToken,
    ) -> Result<StreamExit, ClientError> {
        let headers = self.session.sign_request(None).await?;

        let response = headers
            .apply(self.http.get(&self.events_url))
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| ClientError::Request(format!("event stream connect failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ClientError::Request(format!(
                "event stream returned {}",
                response.status()
            )));
        }

        self.state = StreamState::Open;
        self.retries = 0;
        debug!("event stream open");

        let mut stream = response.bytes_stream();
        let mut parser = SseParser::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(StreamExit::Shutdown),
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        for frame in parser.push(&bytes) {
                            self.dispatch(frame).await;
                        }
                    }
                    Some(Err(e)) => {
                        return Err(ClientError::Request(format!(
                            "event stream read failed: {e}"
                        )));
                    }
                    None => return Ok(StreamExit::Ended),
                },
            }
        }
    }

    /// Map one frame to a notification and hand it to the consumers.
    async fn dispatch(&self, frame: SseFrame) {
        debug!(event = %frame.event, "incoming event");

        let event = match frame.event.as_str() {
            NEW_SURVEY_EVENT => match serde_json::from_str::<Survey>(&frame.data) {
                Ok(survey) => {
                    self.observer.on_survey_update(&survey);
                    NotificationEvent {
                        kind: NotificationKind::NewSurvey,
                        text: survey.title,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "malformed new-survey payload");
                    NotificationEvent {
                        kind: NotificationKind::Error,
                        text: frame.data,
                    }
                }
            },
            CLOSED_SURVEY_EVENT => {
                // The survey may be unknown locally, or the payload may not
                // even be JSON; the closed notification renders regardless.
                let text = match serde_json::from_str::<Survey>(&frame.data) {
                    Ok(survey) => {
                        self.observer.on_survey_update(&survey);
                        survey.title
                    }
                    Err(_) => frame.data,
                };
                NotificationEvent {
                    kind: NotificationKind::SurveyClosed,
                    text,
                }
            }
            PING_EVENT | WELCOME_EVENT => NotificationEvent {
                kind: NotificationKind::Ping,
                text: frame.data,
            },
            ERROR_EVENT => {
                warn!(data = %frame.data, "server pushed an error event");
                NotificationEvent {
                    kind: NotificationKind::Error,
                    text: frame.data,
                }
            }
            _ => NotificationEvent {
                kind: NotificationKind::Message,
                text: frame.data,
            },
        };

        self.observer.on_notification(&event);
        self.notifications.lock().await.push(event);
    }
}
