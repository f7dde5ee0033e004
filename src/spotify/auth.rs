use reqwest::{Client, Url};

use crate::{
    error::AuthError,
    types::{TokenGrant, TokenResponse},
};

/// Builds the authorization endpoint URL for the PKCE flow.
///
/// # Arguments
///
/// * `auth_url` - Base authorization endpoint, e.g. `https://accounts.spotify.com/authorize`
/// * `client_id` - Application client id
/// * `redirect_uri` - Registered redirect URI the code is delivered to
/// * `scope` - Space separated scopes
/// * `code_challenge` - S256 challenge derived from the stored verifier
pub fn authorize_url(
    auth_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    code_challenge: &str,
) -> Result<Url, AuthError> {
    Url::parse_with_params(
        auth_url,
        &[
            ("client_id", client_id),
            ("response_type", "code"),
            ("redirect_uri", redirect_uri),
            ("scope", scope),
            ("code_challenge_method", "S256"),
            ("code_challenge", code_challenge),
        ],
    )
    .map_err(|e| AuthError::Url(format!("{auth_url}: {e}")))
}

/// Exchanges an authorization code for tokens.
///
/// Posts `client_id, grant_type=authorization_code, code, redirect_uri,
/// code_verifier` as a form. An error answer becomes
/// [`AuthError::Rejected`]; transport failures become [`AuthError::Http`].
pub async fn exchange_code_pkce(
    client: &Client,
    token_url: &str,
    client_id: &str,
    redirect_uri: &str,
    code: &str,
    verifier: &str,
) -> Result<TokenGrant, AuthError> {
    request_token(
        client,
        token_url,
        &[
            ("client_id", client_id),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", verifier),
        ],
    )
    .await
}

/// Trades a refresh token for a new access token.
///
/// The answer may carry a rotated refresh token, which the caller has to
/// persist in place of the old one.
pub async fn refresh_token(
    client: &Client,
    token_url: &str,
    client_id: &str,
    refresh_token: &str,
) -> Result<TokenGrant, AuthError> {
    request_token(
        client,
        token_url,
        &[
            ("client_id", client_id),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ],
    )
    .await
}

async fn request_token(
    client: &Client,
    token_url: &str,
    form: &[(&str, &str)],
) -> Result<TokenGrant, AuthError> {
    let res = client.post(token_url).form(form).send().await?;
    let status = res.status();
    let body = res.text().await?;

    // Spotify answers errors as JSON, proxies in between may not.
    let json: TokenResponse = serde_json::from_str(&body).unwrap_or_default();
    let fallback = format!("http_{}", status.as_u16());
    let grant = json.into_grant(&fallback).map_err(AuthError::Rejected)?;

    if !status.is_success() {
        return Err(AuthError::Rejected(crate::error::TokenRejection {
            error: fallback,
            description: None,
        }));
    }

    Ok(grant)
}
