//! Backend session lifecycle
//!
//! A session is driven strictly in this order: [`SessionState::initialize`],
//! [`BackendConnector::connect`], [`BackendSession::authenticate`],
//! [`BackendSession::read`] and optionally [`BackendSession::renew`].

use crate::{
    BackendError, BackendErrorKind, BackendOperation, SecretVersion, SecureSecret,
    VaultCredential,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Seconds per hour of requested renewal
const SECONDS_PER_HOUR: u64 = 3600;

/// Renewal increment in the backend's native unit (`"<seconds>s"`)
#[must_use]
pub fn renewal_increment(hours: u32) -> String {
    format!("{}s", u64::from(hours) * SECONDS_PER_HOUR)
}

/// Per-invocation session state: target URL and the current token.
///
/// Once a token has been adopted it is only ever extended, never replaced.
#[derive(Debug)]
pub struct SessionState {
    backend_url: String,
    current_token: Option<SecureSecret>,
    token_expiry: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Record the target backend.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `backend_url` is empty.
    pub fn initialize(backend_url: impl Into<String>) -> Result<Self, BackendError> {
        let backend_url = backend_url.into().trim().to_string();
        if backend_url.is_empty() {
            return Err(BackendError::configuration(
                "no Vault URL configured for this step",
            ));
        }
        Ok(Self {
            backend_url,
            current_token: None,
            token_expiry: None,
        })
    }

    /// Target backend URL
    #[must_use]
    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    /// Current session token, if authenticated
    #[must_use]
    pub const fn token(&self) -> Option<&SecureSecret> {
        self.current_token.as_ref()
    }

    /// Whether a token has been adopted
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.current_token.is_some()
    }

    /// When the current token stops being valid, if known
    #[must_use]
    pub const fn token_expiry(&self) -> Option<DateTime<Utc>> {
        self.token_expiry
    }

    /// Adopt the token produced by authentication.
    ///
    /// A zero or absent lease leaves the expiry unknown.
    ///
    /// # Errors
    ///
    /// Fails if the session already holds a token.
    pub fn adopt_token(
        &mut self,
        token: SecureSecret,
        lease: Option<Duration>,
    ) -> Result<(), BackendError> {
        if self.current_token.is_some() {
            return Err(BackendError::new(
                BackendOperation::Authenticate,
                BackendErrorKind::Rejected,
                "session is already authenticated",
            ));
        }
        self.current_token = Some(token);
        self.token_expiry = lease.and_then(expiry_after);
        Ok(())
    }

    /// Record a renewed lease for the current token
    pub fn extend(&mut self, lease: Duration) {
        if let Some(expiry) = expiry_after(lease) {
            self.token_expiry = Some(expiry);
        }
    }
}

fn expiry_after(lease: Duration) -> Option<DateTime<Utc>> {
    if lease.is_zero() {
        return None;
    }
    let lease = chrono::Duration::from_std(lease).ok()?;
    Utc::now().checked_add_signed(lease)
}

/// Connection options supplied by configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Enterprise namespace sent with every request
    pub namespace: Option<String>,
    /// Upper bound for every individual backend call
    pub request_timeout: Option<Duration>,
}

/// Builds an authenticated-capable session for an initialized state.
pub trait BackendConnector: Send + Sync {
    /// Construct the client for `state`. No network traffic happens here.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the client cannot be built
    /// (for example, an unparseable URL).
    fn connect(
        &self,
        state: SessionState,
        options: &SessionOptions,
    ) -> Result<Box<dyn BackendSession>, BackendError>;
}

/// One connection to the secret backend.
#[async_trait]
pub trait BackendSession: Send + Sync {
    /// Current session state
    fn state(&self) -> &SessionState;

    /// Authenticate with `credential`.
    ///
    /// `None` leaves the session unauthenticated; authorization failures
    /// then surface on the read.
    async fn authenticate(
        &mut self,
        credential: Option<&VaultCredential>,
    ) -> Result<(), BackendError>;

    /// Read the key/value secret at `path` using KV engine `api_version`
    async fn read(&self, path: &str, api_version: u8) -> Result<SecretVersion, BackendError>;

    /// Extend the current token's time-to-live by `hours`
    async fn renew(&mut self, hours: u32) -> Result<(), BackendError>;
}
