//! `HashiCorp` Vault backend for vaultstep
//!
//! Implements the [`vaultstep_secrets::BackendConnector`] /
//! [`vaultstep_secrets::BackendSession`] seam on top of `vaultrs`:
//! - token, AppRole and userpass authentication
//! - KV v1 and v2 reads (`<mount>/<path>`)
//! - renew-self of the session token

mod errors;
pub mod session;

// Re-export main types for convenience
pub use session::{VaultConnector, VaultSession};
