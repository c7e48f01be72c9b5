// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-level error type.

use crate::auth::AuthError;
use crate::store::StoreError;

/// Errors surfaced by the API and event stream clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Key material is missing or unusable. Callers must route the user
    /// back to registration rather than continue unsigned.
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Request rejected client-side before it was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("server response was invalid: {0}")]
    InvalidResponse(String),

    /// Login did not succeed; the caller falls back to registration.
    #[error("not authenticated")]
    NotAuthenticated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_convert_into_client_errors() {
        let err: ClientError = AuthError::NotRegistered.into();
        assert!(matches!(err, ClientError::Auth(AuthError::NotRegistered)));
    }

    #[test]
    fn display_includes_context() {
        let err = ClientError::Request("POST /login returned 500".into());
        assert_eq!(err.to_string(), "request failed: POST /login returned 500");
    }
}
