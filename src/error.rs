//! Error taxonomy of the token lifecycle and the catalog client.

use std::fmt;

use reqwest::StatusCode;

use crate::management::StoreError;

/// An error answer from the token endpoint (`{error, error_description}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRejection {
    pub error: String,
    pub description: Option<String>,
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.error, description),
            None => write!(f, "{}", self.error),
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    /// A required configuration value (client id, redirect URI) is missing.
    Configuration(&'static str),
    /// The code exchange was refused, or the user declined consent.
    AuthorizationDenied(TokenRejection),
    /// The refresh token was refused by the token endpoint.
    RefreshInvalid(TokenRejection),
    /// No PKCE verifier was stored when the authorization code came back.
    TransactionLost,
    /// A resource endpoint answered 401.
    UpstreamUnauthorized,
    /// A resource endpoint failed with a non-auth status.
    Upstream(StatusCode),
    /// Unclassified token endpoint rejection.
    Rejected(TokenRejection),
    Http(reqwest::Error),
    Store(StoreError),
    Url(String),
}

impl AuthError {
    /// Name of the error class, as used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::AuthorizationDenied(_) => "AuthorizationDenied",
            Self::RefreshInvalid(_) => "RefreshInvalid",
            Self::TransactionLost => "TransactionLost",
            Self::UpstreamUnauthorized => "UpstreamUnauthorized",
            Self::Upstream(_) | Self::Http(_) => "UpstreamFailure",
            Self::Rejected(_) => "TokenRejected",
            Self::Store(_) => "StoreError",
            Self::Url(_) => "UrlError",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(var) => write!(f, "missing configuration value {var}"),
            Self::AuthorizationDenied(rejection) => {
                write!(f, "authorization denied ({rejection})")
            }
            Self::RefreshInvalid(rejection) => write!(f, "refresh token rejected ({rejection})"),
            Self::TransactionLost => write!(
                f,
                "PKCE code verifier missing (storage cleared or flow resumed elsewhere)"
            ),
            Self::UpstreamUnauthorized => write!(f, "request was not authorized"),
            Self::Upstream(status) => write!(f, "request failed with status {status}"),
            Self::Rejected(rejection) => write!(f, "token request rejected ({rejection})"),
            Self::Http(err) => write!(f, "http: {err}"),
            Self::Store(err) => write!(f, "store: {err}"),
            Self::Url(msg) => write!(f, "url: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Http(err)
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Store(err)
    }
}
