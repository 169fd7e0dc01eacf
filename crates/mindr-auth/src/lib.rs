//! Credential store for the mindr client.
//!
//! Single source of truth for "who is signed in" and "what calendar
//! credential is available", with change notification. The identity provider
//! itself is an external collaborator reached through the [`TokenIssuer`]
//! seam; the browser's session-scoped credential cache is modeled by the
//! [`SessionCache`] seam.

pub mod cache;
pub mod issuer;
pub mod store;

pub use cache::{InMemorySessionCache, SessionCache};
pub use issuer::{StaticTokenIssuer, TokenIssuer};
pub use store::{CredentialStore, IdentityListener};
