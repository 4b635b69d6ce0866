//! User-facing step configuration

use serde::Deserialize;

/// Configuration of one secret read, as written in the pipeline.
///
/// Every optional field distinguishes "not set" from an explicit value;
/// unset fields are filled later from the global defaults without touching
/// this value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepConfig {
    /// Secret path, `<mount>/<path>`
    pub path: String,
    /// Key to extract from the secret
    pub key: String,
    /// Credential to authenticate with
    #[serde(default)]
    pub credentials_id: Option<String>,
    /// Backend URL
    #[serde(default)]
    pub vault_url: Option<String>,
    /// Renew the session token after reading
    #[serde(default)]
    pub renew: Option<bool>,
    /// Renewal horizon in hours
    #[serde(default)]
    pub renew_hours: Option<u32>,
    /// Surface the full error chain on failure
    #[serde(default)]
    pub print_stacktrace: Option<bool>,
    /// KV engine version (1 or 2)
    #[serde(default)]
    pub engine_version: Option<u8>,
    /// Treat a missing key as a failure instead of an absent value
    #[serde(default)]
    pub fail_on_missing_key: Option<bool>,
}

impl StepConfig {
    /// Start building a step for `path` / `key`
    #[must_use]
    pub fn builder(path: impl Into<String>, key: impl Into<String>) -> StepConfigBuilder {
        StepConfigBuilder {
            config: Self {
                path: path.into(),
                key: key.into(),
                credentials_id: None,
                vault_url: None,
                renew: None,
                renew_hours: None,
                print_stacktrace: None,
                engine_version: None,
                fail_on_missing_key: None,
            },
        }
    }
}

/// Builder for [`StepConfig`].
///
/// Setters accept either a value or an `Option`, so host adapters can pass
/// through "unset" directly.
#[derive(Debug, Clone)]
#[must_use]
pub struct StepConfigBuilder {
    config: StepConfig,
}

impl StepConfigBuilder {
    /// Credential id
    pub fn credentials_id(mut self, id: impl Into<Option<String>>) -> Self {
        self.config.credentials_id = id.into();
        self
    }

    /// Backend URL
    pub fn vault_url(mut self, url: impl Into<Option<String>>) -> Self {
        self.config.vault_url = url.into();
        self
    }

    /// Renewal toggle
    pub fn renew(mut self, renew: impl Into<Option<bool>>) -> Self {
        self.config.renew = renew.into();
        self
    }

    /// Renewal horizon in hours
    pub fn renew_hours(mut self, hours: impl Into<Option<u32>>) -> Self {
        self.config.renew_hours = hours.into();
        self
    }

    /// Detailed failure output
    pub fn print_stacktrace(mut self, enabled: impl Into<Option<bool>>) -> Self {
        self.config.print_stacktrace = enabled.into();
        self
    }

    /// KV engine version
    pub fn engine_version(mut self, version: impl Into<Option<u8>>) -> Self {
        self.config.engine_version = version.into();
        self
    }

    /// Strict key lookup
    pub fn fail_on_missing_key(mut self, strict: impl Into<Option<bool>>) -> Self {
        self.config.fail_on_missing_key = strict.into();
        self
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> StepConfig {
        self.config
    }
}
