//! Credentials and credential providers.
//!
//! This module defines [`Credentials`], the access key / secret key / session
//! token triple used for signing, and the [`CredentialProvider`] trait that
//! resolves them at signing time.

use std::fmt;

use crate::error::SignError;

/// AWS credentials used to sign a request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// The access key ID.
    pub access_key_id: String,
    /// The secret access key.
    pub secret_access_key: String,
    /// Session token for temporary credentials.
    pub session_token: Option<String>,
}

impl Credentials {
    /// Create a new set of credentials.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    /// Reject credentials that cannot produce a valid signature.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::MissingCredentials`] if either key is empty.
    pub fn ensure_present(&self) -> Result<(), SignError> {
        if self.access_key_id.trim().is_empty() || self.secret_access_key.is_empty() {
            return Err(SignError::MissingCredentials);
        }
        Ok(())
    }
}

// The secret never shows up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Trait for resolving the credentials a request is signed with.
///
/// Implementations may read from the environment, a profile file, or an
/// instance metadata service.
pub trait CredentialProvider: Send + Sync {
    /// Resolve the current credentials.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::MissingCredentials`] if no credentials are available.
    fn credentials(&self) -> Result<Credentials, SignError>;
}

/// A provider that always returns the same credentials.
///
/// # Examples
///
/// ```
/// use docstack_auth::credentials::{CredentialProvider, Credentials, StaticCredentialProvider};
///
/// let provider = StaticCredentialProvider::new(Credentials::new("AKID", "secret", None));
/// assert_eq!(provider.credentials().unwrap().access_key_id, "AKID");
/// ```
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credentials: Credentials,
}

impl StaticCredentialProvider {
    /// Create a new `StaticCredentialProvider`.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn credentials(&self) -> Result<Credentials, SignError> {
        self.credentials.ensure_present()?;
        Ok(self.credentials.clone())
    }
}

/// A provider reading `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
/// `AWS_SESSION_TOKEN` on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentialProvider;

impl CredentialProvider for EnvCredentialProvider {
    fn credentials(&self) -> Result<Credentials, SignError> {
        let access_key_id =
            std::env::var("AWS_ACCESS_KEY_ID").map_err(|_| SignError::MissingCredentials)?;
        let secret_access_key =
            std::env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| SignError::MissingCredentials)?;
        let session_token = std::env::var("AWS_SESSION_TOKEN")
            .ok()
            .filter(|token| !token.is_empty());
        let credentials = Credentials::new(access_key_id, secret_access_key, session_token);
        credentials.ensure_present()?;
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_return_static_credentials() {
        let provider = StaticCredentialProvider::new(Credentials::new(
            "AKID",
            "secret",
            Some("token".to_owned()),
        ));

        let credentials = provider.credentials().unwrap();
        assert_eq!(credentials.access_key_id, "AKID");
        assert_eq!(credentials.session_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_should_reject_empty_secret() {
        let provider = StaticCredentialProvider::new(Credentials::new("AKID", "", None));
        assert!(matches!(
            provider.credentials(),
            Err(SignError::MissingCredentials)
        ));
    }

    #[test]
    fn test_should_reject_blank_access_key() {
        let credentials = Credentials::new("  ", "secret", None);
        assert!(matches!(
            credentials.ensure_present(),
            Err(SignError::MissingCredentials)
        ));
    }

    #[test]
    fn test_should_redact_secret_in_debug_output() {
        let credentials = Credentials::new("AKID", "super-secret", Some("tok".to_owned()));
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("AKID"));
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("tok\""));
    }
}
