//! Grant and credential lifecycle core of an [OAuth 2.0][rfc6749]
//! authorization server.
//!
//! The crate decides, for each of the four standard grant types, whether a
//! token request is valid and what credential to mint, and enforces the
//! lifecycle rules of those credentials: single-use authorization codes bound
//! to their redirect URI, hashed-at-rest secrets, expiration and refresh.
//!
//! HTTP routing, sessions and persistence are left to the host: the engine
//! talks to storage through the [`store::CredentialStore`] and
//! [`store::TransactionStore`] traits, and produces plain [`http`] responses.
//!
//! # Modules
//!
//! - [`grant`]: the [`GrantEngine`] and one module per grant type.
//! - [`endpoints`]: the authorization transaction flow and token request
//!   dispatch.
//! - [`server`]: OAuth 2.0 success and error responses, client
//!   authentication.
//! - [`store`]: persistence contract and records, with an in-memory
//!   implementation.
//! - [`hasher`]: random identifiers, token digests and password derivation.
//! - [`config`]: lifetimes and sizes.
//! - [`util`]: redirect URI query building.
//!
//! Core OAuth 2.0 types ([`AccessToken`], [`ClientId`], [`Code`], [`Scope`],
//! etc.) are re-exported at the crate root.
//!
//! [rfc6749]: https://datatracker.ietf.org/doc/html/rfc6749
pub use http;

pub mod config;
pub mod endpoints;
pub mod error;
pub mod grant;
pub mod hasher;
pub mod server;
pub mod store;
mod types;
pub mod util;

pub use config::GrantConfig;
pub use error::{GrantError, StoreError, ValidationError};
pub use grant::{ExchangeOutcome, GrantEngine, TokenGrant};
pub use types::*;
