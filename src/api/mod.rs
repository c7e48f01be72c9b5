// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the survey service.
//!
//! Every call after registration is authenticated: the request is signed
//! through the [`Session`] and the `X-User-ID`/`X-Signature` headers are
//! attached here, so call sites never wire headers themselves. Signed
//! POSTs send the exact byte serialization that was signed.
//!
//! Ordering is strict: `register` persists the identity and keypair before
//! returning, and every signed method builds headers before the request
//! goes out.

use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{
    map_vote_status, CreateSurveyRequest, Identity, KeyPair, Survey, SurveyId, VoteRequest,
    VoteStatus,
};
use crate::session::Session;

const APPLICATION_JSON: &str = "application/json";

/// `{ "data": ... }` envelope the survey endpoints wrap their payloads in.
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct VoteResponse {
    status: String,
}

/// Signed HTTP client for the survey service.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ClientError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// URL of the per-user event stream.
    pub fn events_url(&self, user_id: &str) -> String {
        self.endpoint(&format!("/events/{user_id}"))
    }

    /// Register a new identity. The only unsigned call.
    ///
    /// On success the returned identity and the keypair are persisted
    /// atomically before this method returns, so signing headers can be
    /// built immediately afterwards.
    pub async fn register(&self, name: &str, keypair: &KeyPair) -> Result<Identity, ClientError> {
        if name.trim().is_empty() {
            return Err(ClientError::InvalidRequest("name must not be empty".into()));
        }

        let payload = json!({ "name": name, "publicKey": keypair.public_key_pem });
        let response = self
            .http
            .post(self.endpoint("/register"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ClientError::Request(format!("POST /register failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Request(format!(
                "POST /register returned {status}: {body}"
            )));
        }

        let identity: Identity = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("register response: {e}")))?;

        self.session.persist_registration(&identity, keypair)?;
        info!(user_id = %identity.id, name = %identity.name, "registered");

        Ok(identity)
    }

    /// Signed login. Any failure reads as "not authenticated" so the
    /// caller can fall back to registration.
    pub async fn login(&self) -> Result<(), ClientError> {
        let identity = self.session.require_identity()?;
        let body = serde_json::to_vec(&json!({ "id": identity.id }))
            .map_err(|e| ClientError::InvalidResponse(format!("serialize body failed: {e}")))?;
        let headers = self.session.sign_request(Some(&body)).await?;

        let response = headers
            .apply(self.http.post(self.endpoint("/login")))
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "login request failed");
                ClientError::NotAuthenticated
            })?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "login rejected");
            return Err(ClientError::NotAuthenticated);
        }

        info!(user_id = %identity.id, "logged in");
        Ok(())
    }

    /// List all surveys.
    pub async fn surveys(&self) -> Result<Vec<Survey>, ClientError> {
        let headers = self.session.sign_request(None).await?;

        let response = headers
            .apply(self.http.get(self.endpoint("/surveys")))
            .header(ACCEPT, APPLICATION_JSON)
            .send()
            .await
            .map_err(|e| ClientError::Request(format!("GET /surveys failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Request(format!(
                "GET /surveys returned {status}: {body}"
            )));
        }

        let envelope: DataEnvelope<Vec<Survey>> = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("surveys response: {e}")))?;

        Ok(envelope.data)
    }

    /// Create a survey. Fields are validated client-side first.
    pub async fn create_survey(
        &self,
        request: &CreateSurveyRequest,
    ) -> Result<Survey, ClientError> {
        request.validate().map_err(ClientError::InvalidRequest)?;

        let survey: DataEnvelope<Survey> = self.signed_post_json("/surveys", request).await?;
        info!(survey_id = %survey.data.id, title = %survey.data.title, "survey created");
        Ok(survey.data)
    }

    /// Vote for one option of a survey.
    pub async fn vote(
        &self,
        survey_id: &SurveyId,
        option: &str,
    ) -> Result<VoteStatus, ClientError> {
        if option.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "chosen option must not be empty".into(),
            ));
        }

        let request = VoteRequest {
            survey_id: survey_id.clone(),
            chosen_option: option.to_string(),
        };
        let response: VoteResponse = self.signed_post_json("/vote", &request).await?;

        let status = map_vote_status(&response.status).ok_or_else(|| {
            ClientError::InvalidResponse(format!("unknown vote status: {}", response.status))
        })?;

        info!(survey_id = %survey_id, status = ?status, "vote submitted");
        Ok(status)
    }

    /// Sign and POST a JSON payload, sending the exact bytes that were
    /// signed, then deserialize the response.
    async fn signed_post_json<B, R>(&self, path: &str, payload: &B) -> Result<R, ClientError>
    where
        B: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        let body = serde_json::to_vec(payload)
            .map_err(|e| ClientError::InvalidResponse(format!("serialize body failed: {e}")))?;
        let headers = self.session.sign_request(Some(&body)).await?;

        let response = headers
            .apply(self.http.post(self.endpoint(path)))
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .body(body)
            .send()
            .await
            .map_err(|e| ClientError::Request(format!("POST {path} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Request(format!(
                "POST {path} returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("POST {path} invalid JSON: {e}")))
    }
}
