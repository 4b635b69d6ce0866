//! Merge of step configuration, job environment and global defaults

use crate::defaults::GlobalDefaults;
use crate::macros::expand;
use crate::step::StepConfig;
use std::collections::HashMap;
use vaultstep_secrets::SessionOptions;

/// Renewal toggle when neither step nor defaults set one
pub const DEFAULT_RENEW: bool = true;
/// Renewal horizon when neither step nor defaults set one (30 days)
pub const DEFAULT_RENEW_HOURS: u32 = 720;
/// Detailed failure output when neither step nor defaults set one
pub const DEFAULT_PRINT_STACKTRACE: bool = false;
/// KV engine version when neither step nor defaults set one
pub const DEFAULT_ENGINE_VERSION: u8 = 2;

/// Fully resolved configuration for one invocation.
///
/// Lives only for the invocation; never written back to the step or defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStep {
    /// Expanded secret path
    pub path: String,
    /// Expanded key
    pub key: String,
    /// Credential id to look up (may be empty)
    pub credential_id: String,
    /// Backend URL (may be empty)
    pub vault_url: String,
    /// Renew after reading
    pub renew: bool,
    /// Renewal horizon in hours
    pub renew_hours: u32,
    /// Detailed failure output
    pub print_stacktrace: bool,
    /// KV engine version
    pub engine_version: u8,
    /// Strict key lookup
    pub fail_on_missing_key: bool,
    /// Connection options from the defaults
    pub session: SessionOptions,
}

/// Resolve `config` against the job environment and the global defaults.
///
/// An empty or absent credential id / URL on the step falls back to the
/// default verbatim (defaults are already resolved configuration); a
/// non-empty one is macro-expanded and always wins. With no defaults at all
/// the step's own (possibly empty) values are used.
#[must_use]
pub fn resolve(
    config: &StepConfig,
    env: &HashMap<String, String>,
    defaults: Option<&GlobalDefaults>,
) -> ResolvedStep {
    let credential_id = pick(
        config.credentials_id.as_deref(),
        defaults.and_then(|d| d.credential_id.as_deref()),
        env,
    );
    let vault_url = pick(
        config.vault_url.as_deref(),
        defaults.and_then(|d| d.vault_url.as_deref()),
        env,
    );

    ResolvedStep {
        path: expand(&config.path, env),
        key: expand(&config.key, env),
        credential_id,
        vault_url,
        renew: config
            .renew
            .or_else(|| defaults.and_then(|d| d.renew))
            .unwrap_or(DEFAULT_RENEW),
        renew_hours: config
            .renew_hours
            .or_else(|| defaults.and_then(|d| d.renew_hours))
            .unwrap_or(DEFAULT_RENEW_HOURS),
        print_stacktrace: config
            .print_stacktrace
            .or_else(|| defaults.and_then(|d| d.print_stacktrace))
            .unwrap_or(DEFAULT_PRINT_STACKTRACE),
        engine_version: config
            .engine_version
            .or_else(|| defaults.and_then(|d| d.engine_version))
            .unwrap_or(DEFAULT_ENGINE_VERSION),
        fail_on_missing_key: config
            .fail_on_missing_key
            .or_else(|| defaults.and_then(|d| d.fail_on_missing_key))
            .unwrap_or(false),
        session: SessionOptions {
            namespace: defaults.and_then(|d| d.namespace.clone()),
            request_timeout: defaults.and_then(GlobalDefaults::request_timeout),
        },
    }
}

fn pick(user: Option<&str>, fallback: Option<&str>, env: &HashMap<String, String>) -> String {
    match user.filter(|value| !value.is_empty()) {
        Some(value) => expand(value, env),
        None => fallback.unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn env() -> HashMap<String, String> {
        HashMap::from([
            ("TEAM".to_string(), "payments".to_string()),
            ("VAULT_HOST".to_string(), "vault.internal".to_string()),
        ])
    }

    fn defaults() -> GlobalDefaults {
        GlobalDefaults {
            credential_id: Some("ci-${TEAM}".to_string()),
            vault_url: Some("https://vault.example.com".to_string()),
            renew: Some(false),
            renew_hours: Some(48),
            print_stacktrace: Some(true),
            namespace: Some("platform".to_string()),
            engine_version: Some(1),
            request_timeout_secs: Some(15),
            fail_on_missing_key: Some(true),
        }
    }

    #[test]
    fn empty_credential_id_uses_default_verbatim() {
        let step = StepConfig::builder("secret/app", "password")
            .credentials_id(String::new())
            .build();
        let resolved = resolve(&step, &env(), Some(&defaults()));
        assert_eq!(resolved.credential_id, "ci-${TEAM}");
        assert_eq!(resolved.vault_url, "https://vault.example.com");
    }

    #[test]
    fn explicit_values_are_expanded_and_win() {
        let step = StepConfig::builder("secret/${TEAM}/db", "${TEAM}_password")
            .credentials_id("deploy-${TEAM}".to_string())
            .vault_url("https://${VAULT_HOST}:8200".to_string())
            .build();
        let resolved = resolve(&step, &env(), Some(&defaults()));
        assert_eq!(resolved.path, "secret/payments/db");
        assert_eq!(resolved.key, "payments_password");
        assert_eq!(resolved.credential_id, "deploy-payments");
        assert_eq!(resolved.vault_url, "https://vault.internal:8200");
    }

    #[test]
    fn flags_fall_back_to_defaults() {
        let step = StepConfig::builder("secret/app", "password").build();
        let resolved = resolve(&step, &env(), Some(&defaults()));
        assert!(!resolved.renew);
        assert_eq!(resolved.renew_hours, 48);
        assert!(resolved.print_stacktrace);
        assert_eq!(resolved.engine_version, 1);
        assert!(resolved.fail_on_missing_key);
        assert_eq!(resolved.session.namespace.as_deref(), Some("platform"));
        assert_eq!(
            resolved.session.request_timeout,
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn step_flags_override_defaults() {
        let step = StepConfig::builder("secret/app", "password")
            .renew(true)
            .renew_hours(1)
            .print_stacktrace(false)
            .engine_version(2)
            .fail_on_missing_key(false)
            .build();
        let resolved = resolve(&step, &env(), Some(&defaults()));
        assert!(resolved.renew);
        assert_eq!(resolved.renew_hours, 1);
        assert!(!resolved.print_stacktrace);
        assert_eq!(resolved.engine_version, 2);
        assert!(!resolved.fail_on_missing_key);
    }

    #[test]
    fn unset_defaults_fall_back_to_hardcoded_values() {
        let step = StepConfig::builder("secret/app", "password").build();
        let resolved = resolve(&step, &env(), Some(&GlobalDefaults::default()));
        assert!(resolved.renew);
        assert_eq!(resolved.renew_hours, 720);
        assert!(!resolved.print_stacktrace);
        assert_eq!(resolved.engine_version, 2);
        assert_eq!(resolved.credential_id, "");
    }

    #[test]
    fn absent_defaults_use_step_values_even_if_empty() {
        let step = StepConfig::builder("secret/app", "password")
            .credentials_id(String::new())
            .build();
        let resolved = resolve(&step, &env(), None);
        assert_eq!(resolved.credential_id, "");
        assert_eq!(resolved.vault_url, "");
        assert!(resolved.renew);
        assert_eq!(resolved.renew_hours, DEFAULT_RENEW_HOURS);
        assert_eq!(resolved.session, SessionOptions::default());
    }
}
