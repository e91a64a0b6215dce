//! Authorization server endpoints.
//!
//! - [`authorization`]: the authorization transaction flow, ending with the
//!   issuance of an authorization code.
//! - [`token`]: token request decoding and dispatch to the grant handlers.
pub mod authorization;
pub mod token;
