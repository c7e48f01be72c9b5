// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Signing & Identity Module
//!
//! This module produces the authentication headers the survey service
//! expects on every request after registration.
//!
//! ## Signing Flow
//!
//! 1. The session store holds the PEM private key persisted at registration
//! 2. The key importer parses the PEM (PKCS#8, EC P-521) into a signing key
//! 3. The signer produces an ECDSA/SHA-256 signature over the canonical
//!    payload and base64-encodes it
//! 4. The headers are attached as:
//!    - `X-User-ID` → the registered identity id
//!    - `X-Signature` → the base64 signature
//!
//! ## Payload Strategies
//!
//! The signed payload is a configurable strategy ([`SigningPayload`]):
//! the identity id (the server's fixed contract, safe to memoize per
//! session) or the serialized request body (replay-resistant, signed fresh
//! per request).

pub mod error;
pub mod headers;
pub mod keys;

pub use error::AuthError;
pub use headers::{SigningHeaders, SigningPayload, SIGNATURE_HEADER, USER_ID_HEADER};
pub use keys::{import_private_key, sign_payload};
