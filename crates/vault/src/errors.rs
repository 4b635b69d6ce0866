//! Translation of `vaultrs` failures into [`BackendError`]

use vaultrs::error::ClientError;
use vaultstep_secrets::{BackendError, BackendErrorKind, BackendOperation};

/// Map a client error, keeping the server's own error messages
pub fn from_client_error(operation: BackendOperation, err: ClientError) -> BackendError {
    let (kind, message) = match &err {
        ClientError::APIError { code, errors } => {
            let kind = match code {
                404 => BackendErrorKind::NotFound,
                401 | 403 => BackendErrorKind::PermissionDenied,
                _ => BackendErrorKind::Rejected,
            };
            let message = if errors.is_empty() {
                format!("server responded with status {code}")
            } else {
                format!("{} (status {code})", errors.join("; "))
            };
            (kind, message)
        }
        ClientError::RestClientError { .. } => (BackendErrorKind::Network, err.to_string()),
        _ => (BackendErrorKind::Malformed, err.to_string()),
    };
    BackendError::new(operation, kind, message).with_source(err)
}

/// Split `secret/app/db` into mount `secret` and path `app/db`
pub fn split_mount(path: &str) -> Result<(&str, &str), BackendError> {
    let trimmed = path.trim_matches('/');
    match trimmed.split_once('/') {
        Some((mount, rest)) if !mount.is_empty() && !rest.is_empty() => Ok((mount, rest)),
        _ => Err(BackendError::new(
            BackendOperation::Read,
            BackendErrorKind::Configuration,
            format!("secret path '{path}' must be of the form <mount>/<path>"),
        )),
    }
}
