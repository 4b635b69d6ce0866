//! Shared building blocks for vaultstep
//!
//! Provides the vocabulary every other crate speaks:
//! - [`VaultCredential`] and the [`CredentialStore`] it is looked up from
//! - [`SessionState`] plus the [`BackendConnector`] / [`BackendSession`] seam
//!   a secret backend implements
//! - [`SecretVersion`] and [`SecureSecret`] for values that must never be logged
//! - [`BackendError`] for any failure of a backend call
//!
//! Backend implementations are in separate crates:
//! - vaultstep-vault: `VaultConnector`, `VaultSession`

mod credential;
mod error;
mod session;
mod types;

pub use credential::{
    CredentialStore, DEFAULT_APPROLE_MOUNT, DEFAULT_USERPASS_MOUNT, InMemoryCredentialStore,
    JobScope, VaultCredential,
};
pub use error::{BackendError, BackendErrorKind, BackendOperation};
pub use session::{
    BackendConnector, BackendSession, SessionOptions, SessionState, renewal_increment,
};
pub use types::{SecretVersion, SecureSecret};
