//! File-backed credential store
//!
//! ```toml
//! [credentials.ci-default]
//! type = "approle"
//! role_id = "..."
//! secret_id = "..."
//! jobs = ["platform/"]
//!
//! [credentials.readonly]
//! type = "token"
//! token = "..."
//! ```

use crate::{Result, StepError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use vaultstep_secrets::{
    DEFAULT_APPROLE_MOUNT, DEFAULT_USERPASS_MOUNT, InMemoryCredentialStore, VaultCredential,
};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CredentialsFile {
    #[serde(default)]
    credentials: HashMap<String, CredentialEntry>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum CredentialEntry {
    Token {
        token: String,
        #[serde(default)]
        jobs: Vec<String>,
    },
    #[serde(rename = "approle")]
    AppRole {
        role_id: String,
        secret_id: String,
        #[serde(default = "default_approle_mount")]
        mount: String,
        #[serde(default)]
        jobs: Vec<String>,
    },
    #[serde(rename = "userpass")]
    UserPass {
        username: String,
        password: String,
        #[serde(default = "default_userpass_mount")]
        mount: String,
        #[serde(default)]
        jobs: Vec<String>,
    },
}

fn default_approle_mount() -> String {
    DEFAULT_APPROLE_MOUNT.to_string()
}

fn default_userpass_mount() -> String {
    DEFAULT_USERPASS_MOUNT.to_string()
}

impl CredentialEntry {
    fn into_parts(self) -> (VaultCredential, Vec<String>) {
        match self {
            Self::Token { token, jobs } => (VaultCredential::token(token), jobs),
            Self::AppRole {
                role_id,
                secret_id,
                mount,
                jobs,
            } => (
                VaultCredential::approle(role_id, secret_id).with_mount(mount),
                jobs,
            ),
            Self::UserPass {
                username,
                password,
                mount,
                jobs,
            } => (
                VaultCredential::userpass(username, password).with_mount(mount),
                jobs,
            ),
        }
    }
}

/// Parse a credential store from TOML
///
/// # Errors
///
/// Returns a configuration error on invalid TOML or unknown credential types.
pub fn parse_credential_store(text: &str) -> Result<InMemoryCredentialStore> {
    let file: CredentialsFile = toml::from_str(text)
        .map_err(|e| StepError::configuration(format!("invalid credentials file: {e}")))?;

    let mut store = InMemoryCredentialStore::new();
    for (id, entry) in file.credentials {
        let (credential, jobs) = entry.into_parts();
        store.insert_scoped(id, credential, jobs);
    }
    Ok(store)
}

/// Load a credential store from a TOML file
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read or parsed.
pub fn load_credential_store(path: impl AsRef<Path>) -> Result<InMemoryCredentialStore> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        StepError::configuration(format!(
            "failed to read credentials file {}: {e}",
            path.display()
        ))
    })?;
    let store = parse_credential_store(&text)?;
    tracing::debug!(path = %path.display(), count = store.len(), "Loaded credential store");
    Ok(store)
}

/// Environment variable naming the credentials file
pub const CREDENTIALS_ENV_VAR: &str = "VAULTSTEP_CREDENTIALS";

/// Locate and load the credential store.
///
/// `explicit`, then `$VAULTSTEP_CREDENTIALS`, then
/// `<config dir>/vaultstep/credentials.toml`. When none of them names a file
/// the store is empty and every step runs unauthenticated.
///
/// # Errors
///
/// Returns a configuration error if a named file is missing or any found
/// file is invalid.
pub fn discover_credential_store(explicit: Option<&Path>) -> Result<InMemoryCredentialStore> {
    if let Some(path) = explicit {
        return load_credential_store(path);
    }
    if let Some(path) = std::env::var_os(CREDENTIALS_ENV_VAR).filter(|p| !p.is_empty()) {
        return load_credential_store(PathBuf::from(path));
    }
    match default_credentials_location() {
        Some(path) if path.is_file() => load_credential_store(path),
        _ => {
            tracing::debug!("No credentials file found");
            Ok(InMemoryCredentialStore::new())
        }
    }
}

/// `<config dir>/vaultstep/credentials.toml`
#[must_use]
pub fn default_credentials_location() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vaultstep").join("credentials.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultstep_secrets::{CredentialStore, JobScope};

    const SAMPLE: &str = r#"
[credentials.ci-default]
type = "approle"
role_id = "role-123"
secret_id = "secret-456"

[credentials.readonly]
type = "token"
token = "hvs.readonly"

[credentials.deployer]
type = "userpass"
username = "deploy"
password = "hunter22"
mount = "ldap-users"
jobs = ["platform/"]
"#;

    fn scope(job: &str) -> JobScope {
        JobScope::new(job, "1")
    }

    #[test]
    fn parses_every_credential_type() {
        let store = parse_credential_store(SAMPLE).unwrap();
        assert_eq!(store.len(), 3);

        match store.find_credential_by_id("ci-default", &scope("any")) {
            Some(VaultCredential::AppRole { role_id, mount, .. }) => {
                assert_eq!(role_id, "role-123");
                assert_eq!(mount, "approle");
            }
            other => panic!("unexpected {other:?}"),
        }

        match store.find_credential_by_id("readonly", &scope("any")) {
            Some(VaultCredential::Token { token }) => assert_eq!(token.expose(), "hvs.readonly"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn job_restrictions_are_applied() {
        let store = parse_credential_store(SAMPLE).unwrap();
        match store.find_credential_by_id("deployer", &scope("platform/api")) {
            Some(VaultCredential::UserPass { mount, .. }) => assert_eq!(mount, "ldap-users"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(
            store
                .find_credential_by_id("deployer", &scope("sandbox/api"))
                .is_none()
        );
    }

    #[test]
    fn empty_file_is_empty_store() {
        assert!(parse_credential_store("").unwrap().is_empty());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = parse_credential_store(
            r#"
[credentials.x]
type = "kerberos"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, StepError::Configuration { .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load_credential_store("/nonexistent/credentials.toml").unwrap_err();
        assert!(err.to_string().contains("credentials file"));
    }

    #[test]
    fn discover_prefers_explicit_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("explicit.toml");
        let from_env = dir.path().join("env.toml");
        std::fs::write(&explicit, SAMPLE).unwrap();
        std::fs::write(&from_env, "[credentials.only]\ntype = \"token\"\ntoken = \"t\"\n").unwrap();

        temp_env::with_var(CREDENTIALS_ENV_VAR, Some(from_env.as_os_str()), || {
            assert_eq!(discover_credential_store(Some(&explicit)).unwrap().len(), 3);
            assert_eq!(discover_credential_store(None).unwrap().len(), 1);
        });
    }

    #[test]
    fn discover_without_any_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_vars(
            [
                (CREDENTIALS_ENV_VAR, None),
                ("XDG_CONFIG_HOME", Some(dir.path().as_os_str())),
                ("HOME", Some(dir.path().as_os_str())),
            ],
            || {
                assert!(discover_credential_store(None).unwrap().is_empty());
            },
        );
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(load_credential_store(&path).unwrap().len(), 3);
    }
}
