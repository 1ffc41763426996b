//! Lumen Auth - OAuth hosted-UI round trip
//!
//! Builds the provider's authorize/signup URLs with the login nonce
//! embedded, and extracts tokens from the redirect fragment exactly once
//! per page lifetime.

pub mod config;
pub mod redirect;

pub use config::OAuthConfig;
pub use redirect::{ExtractionState, OAuthTokens, RedirectController, RedirectOutcome};
