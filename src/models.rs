// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures exchanged
//! with the survey service. All types derive `Serialize`/`Deserialize`;
//! field renames follow the server's wire format (`_id`, `local`,
//! `dueDate`, `createdBy`).
//!
//! ## Model Categories
//!
//! - **Identity**: the registered user record returned by `/register`
//! - **Surveys**: survey records and the create/vote request payloads
//! - **Notifications**: typed events received over the push stream

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Maximum number of options a survey may carry.
pub const MAX_SURVEY_OPTIONS: usize = 3;

// =============================================================================
// Identity
// =============================================================================

/// The registered user record.
///
/// Returned by `/register`, immutable after creation, and persisted in the
/// session store for the life of the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Server-assigned opaque identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Display name supplied at registration.
    #[serde(default)]
    pub name: String,
    /// PEM public key submitted at registration.
    #[serde(rename = "publicKey", alias = "public_key", default)]
    pub public_key: String,
}

/// Client-held keypair. The private half never leaves the client after
/// registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyPair {
    /// PEM-wrapped PKCS#8 EC P-521 private key.
    pub private_key_pem: String,
    /// PEM public key, transmitted once at registration.
    pub public_key_pem: String,
}

// =============================================================================
// Surveys
// =============================================================================

/// Survey identifier wrapper.
///
/// Provides type safety for survey ids throughout the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurveyId(pub String);

impl std::fmt::Display for SurveyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SurveyId {
    fn from(value: String) -> Self {
        SurveyId(value)
    }
}

impl From<&str> for SurveyId {
    fn from(value: &str) -> Self {
        SurveyId(value.to_string())
    }
}

impl From<SurveyId> for String {
    fn from(value: SurveyId) -> Self {
        value.0
    }
}

/// A survey record as returned by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Survey {
    #[serde(rename = "_id")]
    pub id: SurveyId,
    pub title: String,
    /// Where the surveyed event takes place.
    #[serde(rename = "local")]
    pub location: String,
    /// Due date as the server formats it; not parsed client-side.
    #[serde(rename = "dueDate", default)]
    pub due_date: String,
    /// Creator's display name (the server resolves the id before listing).
    #[serde(rename = "createdBy", default)]
    pub created_by: String,
    #[serde(default)]
    pub closed: bool,
    /// Ordered options, at most [`MAX_SURVEY_OPTIONS`].
    #[serde(default)]
    pub options: Vec<String>,
}

/// Request to create a new survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSurveyRequest {
    pub title: String,
    #[serde(rename = "local")]
    pub location: String,
    #[serde(rename = "dueDate")]
    pub due_date: NaiveDateTime,
    pub options: Vec<String>,
}

impl CreateSurveyRequest {
    /// Validate the fields the server would reject.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if self.location.trim().is_empty() {
            return Err("location must not be empty".to_string());
        }
        if self.options.is_empty() {
            return Err("at least one option is required".to_string());
        }
        if self.options.len() > MAX_SURVEY_OPTIONS {
            return Err(format!(
                "at most {MAX_SURVEY_OPTIONS} options are allowed, got {}",
                self.options.len()
            ));
        }
        if self.options.iter().any(|option| option.trim().is_empty()) {
            return Err("options must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request to vote on a survey option.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    #[serde(rename = "surveyId")]
    pub survey_id: SurveyId,
    #[serde(rename = "chosenOption")]
    pub chosen_option: String,
}

/// Outcome of a vote submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteStatus {
    Accepted,
    AlreadyVoted,
}

/// Map the server's vote status string to a [`VoteStatus`].
pub fn map_vote_status(raw_status: &str) -> Option<VoteStatus> {
    match raw_status.trim() {
        "ok" => Some(VoteStatus::Accepted),
        "already voted" => Some(VoteStatus::AlreadyVoted),
        _ => None,
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// Kind of a received push event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationKind {
    NewSurvey,
    SurveyClosed,
    Ping,
    Message,
    Error,
}

/// A push event mapped for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> CreateSurveyRequest {
        CreateSurveyRequest {
            title: "Team lunch".into(),
            location: "Cafeteria".into(),
            due_date: NaiveDateTime::parse_from_str("2026-09-01 12:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            options: vec!["Monday".into(), "Tuesday".into()],
        }
    }

    #[test]
    fn create_survey_request_validation() {
        assert!(base_request().validate().is_ok());

        let mut req = base_request();
        req.title = "  ".into();
        assert!(req.validate().is_err());

        let mut req = base_request();
        req.location.clear();
        assert!(req.validate().is_err());

        let mut req = base_request();
        req.options.clear();
        assert!(req.validate().is_err());

        let mut req = base_request();
        req.options = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        assert!(req.validate().is_err());

        let mut req = base_request();
        req.options = vec!["a".into(), "".into()];
        assert!(req.validate().is_err());
    }

    #[test]
    fn survey_deserializes_server_wire_format() {
        let json = r#"{
            "_id": "s1",
            "title": "Team lunch",
            "local": "Cafeteria",
            "dueDate": "2026-09-01 12:00:00",
            "createdBy": "Alice",
            "closed": false,
            "options": ["Monday", "Tuesday"]
        }"#;

        let survey: Survey = serde_json::from_str(json).unwrap();
        assert_eq!(survey.id, SurveyId::from("s1"));
        assert_eq!(survey.location, "Cafeteria");
        assert_eq!(survey.created_by, "Alice");
        assert!(!survey.closed);
        assert_eq!(survey.options.len(), 2);
    }

    #[test]
    fn identity_accepts_both_public_key_spellings() {
        let registered: Identity = serde_json::from_str(
            r#"{"_id": "u1", "name": "Alice", "public_key": "PUB", "logged": true}"#,
        )
        .unwrap();
        assert_eq!(registered.id, "u1");
        assert_eq!(registered.public_key, "PUB");

        let stored: Identity =
            serde_json::from_str(r#"{"_id": "u1", "name": "Alice", "publicKey": "PUB"}"#).unwrap();
        assert_eq!(stored, registered);
    }

    #[test]
    fn vote_status_mapping_is_stable() {
        assert_eq!(map_vote_status("ok"), Some(VoteStatus::Accepted));
        assert_eq!(
            map_vote_status("already voted"),
            Some(VoteStatus::AlreadyVoted)
        );
        assert_eq!(map_vote_status("nonsense"), None);
    }

    #[test]
    fn create_survey_request_serializes_wire_names() {
        let value = serde_json::to_value(base_request()).unwrap();
        assert!(value.get("local").is_some());
        assert!(value.get("dueDate").is_some());
        assert!(value.get("location").is_none());
    }
}
