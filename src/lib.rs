// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Survey Client - Signed HTTP + SSE client for the survey service
//!
//! This crate provides a headless client for the survey service:
//! registration via an asymmetric keypair, ECDSA-signed requests, survey
//! listing/creation/voting, and live notifications over server-sent
//! events.
//!
//! ## Modules
//!
//! - `api` - HTTP API client (reqwest)
//! - `auth` - Request signing and identity (ECDSA P-521 / SHA-256)
//! - `events` - Server-sent event stream client with reconnection
//! - `session` - Session object owning cached key material and headers
//! - `store` - Session-scoped key/value persistence

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod notifications;
pub mod session;
pub mod store;
