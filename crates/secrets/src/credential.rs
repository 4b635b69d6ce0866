//! Credentials and the store they are looked up from

use crate::SecureSecret;
use std::collections::HashMap;

/// Default mount point of the AppRole auth method
pub const DEFAULT_APPROLE_MOUNT: &str = "approle";

/// Default mount point of the userpass auth method
pub const DEFAULT_USERPASS_MOUNT: &str = "userpass";

/// Identity material used to authenticate against the secret backend.
///
/// Only backend sessions look inside a credential; everything upstream passes
/// it through untouched. Secret fields are [`SecureSecret`], so `Debug`
/// output never contains them.
#[derive(Debug, Clone)]
pub enum VaultCredential {
    /// A pre-issued token used as-is
    Token {
        /// Session token
        token: SecureSecret,
    },
    /// AppRole login
    AppRole {
        /// Role ID
        role_id: String,
        /// Secret ID
        secret_id: SecureSecret,
        /// Auth method mount point
        mount: String,
    },
    /// Username/password login
    UserPass {
        /// Username
        username: String,
        /// Password
        password: SecureSecret,
        /// Auth method mount point
        mount: String,
    },
}

impl VaultCredential {
    /// Token credential
    #[must_use]
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token {
            token: SecureSecret::new(token),
        }
    }

    /// AppRole credential on the default mount
    #[must_use]
    pub fn approle(role_id: impl Into<String>, secret_id: impl Into<String>) -> Self {
        Self::AppRole {
            role_id: role_id.into(),
            secret_id: SecureSecret::new(secret_id),
            mount: DEFAULT_APPROLE_MOUNT.to_string(),
        }
    }

    /// Userpass credential on the default mount
    #[must_use]
    pub fn userpass(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::UserPass {
            username: username.into(),
            password: SecureSecret::new(password),
            mount: DEFAULT_USERPASS_MOUNT.to_string(),
        }
    }

    /// Override the auth mount (no effect on token credentials)
    #[must_use]
    pub fn with_mount(mut self, new_mount: impl Into<String>) -> Self {
        match &mut self {
            Self::Token { .. } => {}
            Self::AppRole { mount, .. } | Self::UserPass { mount, .. } => {
                *mount = new_mount.into();
            }
        }
        self
    }

    /// Short name of the auth method, safe to log
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Token { .. } => "token",
            Self::AppRole { .. } => "approle",
            Self::UserPass { .. } => "userpass",
        }
    }
}

/// The job a credential lookup is performed for.
///
/// Stores use it to decide credential visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobScope {
    /// Full job name, e.g. `platform/deploy-api`
    pub job_name: String,
    /// Identifier of the current run
    pub run_id: String,
}

impl JobScope {
    /// Create a new scope
    #[must_use]
    pub fn new(job_name: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            run_id: run_id.into(),
        }
    }
}

/// Read-only credential lookup by identifier.
pub trait CredentialStore: Send + Sync {
    /// Find the credential with the given id visible to `scope`.
    ///
    /// Returns `None` when no such credential exists or it is hidden from
    /// the scope.
    fn find_credential_by_id(&self, id: &str, scope: &JobScope) -> Option<VaultCredential>;
}

#[derive(Debug, Clone)]
struct StoredCredential {
    credential: VaultCredential,
    jobs: Vec<String>,
}

impl StoredCredential {
    fn visible_to(&self, scope: &JobScope) -> bool {
        self.jobs.is_empty()
            || self
                .jobs
                .iter()
                .any(|prefix| scope.job_name.starts_with(prefix.as_str()))
    }
}

/// Credential store backed by a map.
///
/// Each entry may be restricted to job-name prefixes; an unrestricted entry
/// is visible to every job.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    entries: HashMap<String, StoredCredential>,
}

impl InMemoryCredentialStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential visible to every job. Replaces any existing entry.
    pub fn insert(&mut self, id: impl Into<String>, credential: VaultCredential) {
        self.insert_scoped(id, credential, Vec::new());
    }

    /// Add a credential visible only to jobs whose name starts with one of
    /// `jobs`. Replaces any existing entry.
    pub fn insert_scoped(
        &mut self,
        id: impl Into<String>,
        credential: VaultCredential,
        jobs: Vec<String>,
    ) {
        self.entries
            .insert(id.into(), StoredCredential { credential, jobs });
    }

    /// Number of stored credentials
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn find_credential_by_id(&self, id: &str, scope: &JobScope) -> Option<VaultCredential> {
        let entry = self.entries.get(id)?;
        if entry.visible_to(scope) {
            Some(entry.credential.clone())
        } else {
            tracing::debug!(
                credential_id = %id,
                job = %scope.job_name,
                "Credential exists but is not visible to this job"
            );
            None
        }
    }
}
