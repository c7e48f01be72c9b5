// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session
//!
//! Owns the persisted identity, the imported private key, and the cached
//! signing headers. Both caches live in one write-once/read-many state slot
//! behind a single async mutex: the first caller performs the import (or
//! import + sign) while concurrent callers await the same lock instead of
//! racing independent imports. One mutex means there is no lock ordering to
//! get wrong between signing and `clear()`.
//!
//! `clear()` wipes the store and both caches together, so a logged-out
//! session can never sign with stale material.

use serde_json::json;
use tokio::sync::Mutex;

use crate::auth::{keys, AuthError, SigningHeaders, SigningPayload};
use crate::models::{Identity, KeyPair, NotificationEvent, Survey};
use crate::store::{keys as store_keys, SessionStore, StoreError};

use p521::ecdsa::SigningKey;

/// Consumer of session and stream state changes.
///
/// The UI layer implements this instead of being wired into the signing
/// code. Default methods are no-ops so implementors pick what they need.
pub trait SessionObserver: Send + Sync {
    fn on_authenticated(&self, _identity: &Identity) {}
    fn on_notification(&self, _event: &NotificationEvent) {}
    fn on_survey_update(&self, _survey: &Survey) {}
}

/// No-op observer for headless use.
#[derive(Debug, Default)]
pub struct NullObserver;

impl SessionObserver for NullObserver {}

/// Cached signing material, filled lazily and dropped on `clear()`.
#[derive(Default)]
struct SigningState {
    key: Option<SigningKey>,
    headers: Option<SigningHeaders>,
}

/// The authenticated session: store plus cached signing state.
pub struct Session {
    store: SessionStore,
    payload_strategy: SigningPayload,
    state: Mutex<SigningState>,
}

impl Session {
    pub fn new(store: SessionStore, payload_strategy: SigningPayload) -> Self {
        Self {
            store,
            payload_strategy,
            state: Mutex::new(SigningState::default()),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn payload_strategy(&self) -> SigningPayload {
        self.payload_strategy
    }

    /// The persisted identity, or `None` before registration.
    pub fn identity(&self) -> Result<Option<Identity>, StoreError> {
        self.store.get_json(store_keys::USER_DATA)
    }

    /// The persisted identity, treating absence as "not registered".
    pub fn require_identity(&self) -> Result<Identity, AuthError> {
        self.identity()?.ok_or(AuthError::NotRegistered)
    }

    /// Persist the identity and keypair atomically (one store write).
    pub fn persist_registration(
        &self,
        identity: &Identity,
        keypair: &KeyPair,
    ) -> Result<(), StoreError> {
        self.store.set_all([
            (
                store_keys::USER_DATA.to_string(),
                serde_json::to_value(identity)?,
            ),
            (
                store_keys::PRIVATE_KEY.to_string(),
                json!(keypair.private_key_pem),
            ),
            (
                store_keys::PUBLIC_KEY.to_string(),
                json!(keypair.public_key_pem),
            ),
        ])
    }

    /// Import the stored private key into the state slot, once per session.
    ///
    /// The state lock is held by the caller across the import, so concurrent
    /// callers wait for the first import instead of performing their own.
    fn load_key(&self, state: &mut SigningState) -> Result<SigningKey, AuthError> {
        if let Some(key) = state.key.as_ref() {
            return Ok(key.clone());
        }

        let pem: String = self
            .store
            .get_json(store_keys::PRIVATE_KEY)?
            .ok_or(AuthError::NotRegistered)?;
        let key = keys::import_private_key(&pem)?;
        state.key = Some(key.clone());
        Ok(key)
    }

    /// Identity-payload signing headers, computed at most once per session.
    ///
    /// The signed bytes are the identity id, which does not change within a
    /// session, so the record is reused verbatim for every signed request.
    pub async fn signing_headers(&self) -> Result<SigningHeaders, AuthError> {
        let mut state = self.state.lock().await;
        if let Some(headers) = state.headers.as_ref() {
            return Ok(headers.clone());
        }

        let identity = self.require_identity()?;
        let key = self.load_key(&mut state)?;
        let signature = keys::sign_payload(&key, identity.id.as_bytes())?;

        let headers = SigningHeaders {
            user_id: identity.id,
            signature,
        };
        state.headers = Some(headers.clone());
        Ok(headers)
    }

    /// Headers for an outgoing request under the configured strategy.
    ///
    /// Body signing produces a fresh signature per request and is never
    /// cached; requests without a body (and the identity strategy) use the
    /// memoized identity-payload headers.
    pub async fn sign_request(&self, body: Option<&[u8]>) -> Result<SigningHeaders, AuthError> {
        match (self.payload_strategy, body) {
            (SigningPayload::RequestBody, Some(body)) => {
                let identity = self.require_identity()?;
                let key = {
                    let mut state = self.state.lock().await;
                    self.load_key(&mut state)?
                };
                let signature = keys::sign_payload(&key, body)?;
                Ok(SigningHeaders {
                    user_id: identity.id,
                    signature,
                })
            }
            _ => self.signing_headers().await,
        }
    }

    /// Log out: wipe the store and drop the cached key and headers together.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        self.store.clear()?;
        *state = SigningState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::auth::keys::TEST_PEM;

    fn test_identity() -> Identity {
        Identity {
            id: "u1".into(),
            name: "Alice".into(),
            public_key: "PUB".into(),
        }
    }

    fn test_keypair() -> KeyPair {
        KeyPair {
            private_key_pem: TEST_PEM.into(),
            public_key_pem: "PUB".into(),
        }
    }

    fn registered_session(dir: &TempDir, strategy: SigningPayload) -> Session {
        let store = SessionStore::open(dir.path().join("session.json")).unwrap();
        let session = Session::new(store, strategy);
        session
            .persist_registration(&test_identity(), &test_keypair())
            .unwrap();
        session
    }

    #[tokio::test]
    async fn headers_carry_identity_and_nonempty_signature() {
        let dir = TempDir::new().unwrap();
        let session = registered_session(&dir, SigningPayload::IdentityId);

        let headers = session.signing_headers().await.unwrap();
        assert_eq!(headers.user_id, "u1");
        assert!(!headers.signature.is_empty());
    }

    #[tokio::test]
    async fn identity_headers_are_memoized() {
        let dir = TempDir::new().unwrap();
        let session = registered_session(&dir, SigningPayload::IdentityId);

        let first = session.signing_headers().await.unwrap();

        // Swapping the stored key after the first build must not matter:
        // the cached record is reused without re-importing or re-signing.
        session
            .store()
            .set(store_keys::PRIVATE_KEY, json!("garbage"))
            .unwrap();

        for _ in 0..3 {
            let again = session.signing_headers().await.unwrap();
            assert_eq!(again, first);
        }
    }

    #[tokio::test]
    async fn body_signing_is_fresh_per_request() {
        let dir = TempDir::new().unwrap();
        let session = registered_session(&dir, SigningPayload::RequestBody);

        let sig_a = session.sign_request(Some(b"{\"id\":\"u1\"}")).await.unwrap();
        let sig_b = session.sign_request(Some(b"{\"vote\":1}")).await.unwrap();

        assert_eq!(sig_a.user_id, "u1");
        assert_ne!(sig_a.signature, sig_b.signature);
    }

    #[tokio::test]
    async fn body_strategy_falls_back_to_identity_for_bodyless_requests() {
        let dir = TempDir::new().unwrap();
        let session = registered_session(&dir, SigningPayload::RequestBody);

        let get_headers = session.sign_request(None).await.unwrap();
        let identity_headers = session.signing_headers().await.unwrap();
        assert_eq!(get_headers, identity_headers);
    }

    #[tokio::test]
    async fn unregistered_session_reports_not_registered() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path().join("session.json")).unwrap();
        let session = Session::new(store, SigningPayload::IdentityId);

        let err = session.signing_headers().await.unwrap_err();
        assert!(matches!(err, AuthError::NotRegistered));
    }

    #[tokio::test]
    async fn clear_invalidates_store_and_caches_together() {
        let dir = TempDir::new().unwrap();
        let session = registered_session(&dir, SigningPayload::IdentityId);

        session.signing_headers().await.unwrap();
        session.clear().await.unwrap();

        assert!(session.identity().unwrap().is_none());
        let err = session.signing_headers().await.unwrap_err();
        assert!(matches!(err, AuthError::NotRegistered));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_header_record() {
        let dir = TempDir::new().unwrap();
        let session = std::sync::Arc::new(registered_session(&dir, SigningPayload::IdentityId));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let session = session.clone();
            handles.push(tokio::spawn(
                async move { session.signing_headers().await },
            ));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }
        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn clear_races_with_header_builds_without_deadlock() {
        let dir = TempDir::new().unwrap();
        let session =
            std::sync::Arc::new(registered_session(&dir, SigningPayload::IdentityId));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let builder = session.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    // NotRegistered mid-race is fine; hanging is not
                    let _ = builder.signing_headers().await;
                }
            }));

            let clearer = session.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    clearer.clear().await.unwrap();
                    clearer
                        .persist_registration(&test_identity(), &test_keypair())
                        .unwrap();
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(session.signing_headers().await.is_ok());
    }
}
