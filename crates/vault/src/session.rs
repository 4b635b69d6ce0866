//! `HashiCorp` Vault session: token / AppRole / userpass authentication,
//! KV v1 and v2 reads, and self-renewal of the session token

use crate::errors::{from_client_error, split_mount};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use url::Url;
use vaultrs::client::{Client, VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultstep_secrets::{
    BackendConnector, BackendError, BackendErrorKind, BackendOperation, BackendSession,
    SecretVersion, SecureSecret, SessionOptions, SessionState, VaultCredential, renewal_increment,
};

/// Builds [`VaultSession`]s over HTTP(S)
#[derive(Debug, Clone, Copy, Default)]
pub struct VaultConnector;

impl VaultConnector {
    /// Create a new connector
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl BackendConnector for VaultConnector {
    fn connect(
        &self,
        state: SessionState,
        options: &SessionOptions,
    ) -> Result<Box<dyn BackendSession>, BackendError> {
        Ok(Box::new(VaultSession::connect(state, options)?))
    }
}

/// One Vault connection for one step invocation
pub struct VaultSession {
    client: VaultClient,
    state: SessionState,
    request_timeout: Option<Duration>,
}

impl std::fmt::Debug for VaultSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSession")
            .field("state", &self.state)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl VaultSession {
    /// Build the client for an initialized session.
    ///
    /// The client starts without a token, so nothing from the process
    /// environment (`VAULT_TOKEN`) leaks into an unauthenticated session.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL does not parse, is not
    /// HTTP(S), has no host, or the Vault client cannot be built.
    pub fn connect(state: SessionState, options: &SessionOptions) -> Result<Self, BackendError> {
        let address = parse_address(state.backend_url())?;

        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(address.as_str()).token("");

        if let Some(namespace) = &options.namespace {
            if !header_safe(namespace) {
                return Err(BackendError::configuration(
                    "Vault namespace contains control characters",
                ));
            }
            settings_builder.namespace(Some(namespace.clone()));
        }

        let settings = settings_builder.build().map_err(|e| {
            BackendError::configuration(format!("invalid Vault configuration: {e}"))
        })?;

        let client = VaultClient::new(settings).map_err(|e| {
            BackendError::configuration(format!(
                "failed to create Vault client for '{}'",
                state.backend_url()
            ))
            .with_source(e)
        })?;

        Ok(Self {
            client,
            state,
            request_timeout: options.request_timeout,
        })
    }

    /// Run one backend call under the configured timeout
    async fn call<T, F>(&self, operation: BackendOperation, request: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, ClientError>> + Send,
    {
        let result = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, request).await.map_err(|_| {
                BackendError::new(
                    operation,
                    BackendErrorKind::Network,
                    format!("no response from Vault within {limit:?}"),
                )
            })?,
            None => request.await,
        };
        result.map_err(|e| from_client_error(operation, e))
    }

    fn adopt(&mut self, token: &SecureSecret, lease: Option<Duration>) -> Result<(), BackendError> {
        if !header_safe(token.expose()) {
            return Err(BackendError::new(
                BackendOperation::Authenticate,
                BackendErrorKind::Configuration,
                "Vault token contains control characters",
            ));
        }
        self.state.adopt_token(token.clone(), lease)?;
        self.client.set_token(token.expose());
        Ok(())
    }
}

#[async_trait]
impl BackendSession for VaultSession {
    fn state(&self) -> &SessionState {
        &self.state
    }

    async fn authenticate(
        &mut self,
        credential: Option<&VaultCredential>,
    ) -> Result<(), BackendError> {
        let Some(credential) = credential else {
            tracing::debug!(url = %self.state.backend_url(), "No credential, continuing unauthenticated");
            return Ok(());
        };

        let op = BackendOperation::Authenticate;
        match credential {
            VaultCredential::Token { token } => self.adopt(token, None)?,
            VaultCredential::AppRole {
                role_id,
                secret_id,
                mount,
            } => {
                let auth = self
                    .call(
                        op,
                        vaultrs::auth::approle::login(
                            &self.client,
                            mount,
                            role_id,
                            secret_id.expose(),
                        ),
                    )
                    .await?;
                self.adopt(
                    &SecureSecret::new(auth.client_token),
                    Some(Duration::from_secs(auth.lease_duration)),
                )?;
            }
            VaultCredential::UserPass {
                username,
                password,
                mount,
            } => {
                let auth = self
                    .call(
                        op,
                        vaultrs::auth::userpass::login(
                            &self.client,
                            mount,
                            username,
                            password.expose(),
                        ),
                    )
                    .await?;
                self.adopt(
                    &SecureSecret::new(auth.client_token),
                    Some(Duration::from_secs(auth.lease_duration)),
                )?;
            }
        }

        tracing::info!(
            method = credential.method(),
            expiry = ?self.state.token_expiry(),
            "Authenticated against Vault"
        );
        Ok(())
    }

    async fn read(&self, path: &str, api_version: u8) -> Result<SecretVersion, BackendError> {
        let (mount, secret_path) = split_mount(path)?;
        let op = BackendOperation::Read;

        let raw: HashMap<String, Value> = match api_version {
            1 => {
                self.call(op, vaultrs::kv1::get(&self.client, mount, secret_path))
                    .await?
            }
            2 => {
                self.call(op, vaultrs::kv2::read(&self.client, mount, secret_path))
                    .await?
            }
            other => {
                return Err(BackendError::new(
                    op,
                    BackendErrorKind::Configuration,
                    format!("unsupported KV engine version {other}"),
                ));
            }
        };

        tracing::debug!(mount, path = secret_path, keys = raw.len(), "Read secret");
        Ok(SecretVersion::new(stringify_values(raw)))
    }

    async fn renew(&mut self, hours: u32) -> Result<(), BackendError> {
        let op = BackendOperation::Renew;
        if !self.state.is_authenticated() {
            return Err(BackendError::new(
                op,
                BackendErrorKind::Rejected,
                "session has no token to renew",
            ));
        }

        let increment = renewal_increment(hours);
        let auth = self
            .call(
                op,
                vaultrs::token::renew_self(&self.client, Some(increment.as_str())),
            )
            .await?;

        self.state.extend(Duration::from_secs(auth.lease_duration));
        tracing::info!(
            increment = %increment,
            renewable = auth.renewable,
            expiry = ?self.state.token_expiry(),
            "Renewed Vault token"
        );
        Ok(())
    }
}

/// Checked up front: `VaultClientSettingsBuilder::address` panics on an unparseable URL
fn parse_address(raw: &str) -> Result<Url, BackendError> {
    let url = Url::parse(raw).map_err(|e| {
        BackendError::configuration(format!("Vault URL '{raw}' is not a valid URL: {e}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(BackendError::configuration(format!(
            "Vault URL '{raw}' must start with http:// or https://"
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(BackendError::configuration(format!(
            "Vault URL '{raw}' has no host"
        )));
    }
    Ok(url)
}

/// Tokens and namespaces travel as HTTP headers, which `vaultrs` builds with `unwrap`
fn header_safe(value: &str) -> bool {
    value.bytes().all(|b| b == b'\t' || (b >= 0x20 && b != 0x7f))
}

/// KV values may be any JSON type; non-strings keep their JSON rendering
fn stringify_values(raw: HashMap<String, Value>) -> HashMap<String, String> {
    raw.into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect()
}
