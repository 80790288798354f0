//! Widget Credentials
//!
//! Fetches short-lived {token, endpoint} pairs from the credential backend.

mod client;
mod provider;
mod types;

pub use client::AuthClient;
pub use provider::{CredentialError, CredentialProvider, GENERIC_LOAD_FAILURE};
pub use types::*;
