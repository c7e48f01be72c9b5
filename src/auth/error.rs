// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication material errors.

use crate::store::StoreError;

/// Errors raised while loading, importing, or using key material.
///
/// Every variant means signing is impossible; callers route the user back
/// to the registration flow instead of issuing unsigned requests.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No identity or private key in the session store.
    #[error("no identity or key material in the session store; registration required")]
    NotRegistered,

    /// The stored private key is not valid PEM.
    #[error("private key PEM is malformed: {0}")]
    MalformedPem(String),

    /// The PEM body is not a usable PKCS#8 EC P-521 signing key.
    #[error("private key is not a usable P-521 ECDSA key: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
