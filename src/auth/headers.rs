// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing header record and payload strategy.

use serde::{Deserialize, Serialize};

/// Header carrying the registered identity id.
pub const USER_ID_HEADER: &str = "X-User-ID";
/// Header carrying the base64 ECDSA signature.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// The transport-level authentication headers derived from the session
/// identity and the imported private key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SigningHeaders {
    pub user_id: String,
    /// Base64 of the raw `r || s` signature bytes.
    pub signature: String,
}

impl SigningHeaders {
    /// Attach both headers to an outgoing request.
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(USER_ID_HEADER, &self.user_id)
            .header(SIGNATURE_HEADER, &self.signature)
    }
}

/// What gets signed for an authenticated request.
///
/// `IdentityId` is the server's fixed contract: the signed bytes are the
/// identity id, which is stable for the whole session and therefore safe
/// to memoize. `RequestBody` signs the serialized body of each request for
/// replay resistance and is never memoized; requests without a body fall
/// back to the identity id payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SigningPayload {
    #[default]
    IdentityId,
    RequestBody,
}

impl SigningPayload {
    /// Parse the configuration value (`identity` | `body`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "identity" => Some(SigningPayload::IdentityId),
            "body" => Some(SigningPayload::RequestBody),
            _ => None,
        }
    }
}
