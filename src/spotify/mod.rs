//! # Spotify Integration Module
//!
//! Client side of the Spotify Web API used by jamcli: the OAuth 2.0 PKCE
//! token endpoint calls, catalog search and playlist creation.
//!
//! ## Architecture
//!
//! ```text
//! CLI Layer
//!     ↓
//! TokenManager (token lifecycle)
//!     ↓
//! Spotify Integration Layer
//!     ├── Authentication (authorize URL, code exchange, refresh)
//!     ├── Search (tracks)
//!     └── Playlist (create, add tracks)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//! ```
//!
//! ## Authorization failures
//!
//! Every bearer-authenticated request goes through [`authorized`]. A 401
//! answer invalidates the access token, triggers one refresh and retries the
//! request once. When the refresh fails the refresh token is dropped and a
//! fresh authorization redirect starts; the request then yields
//! [`Reply::Redirected`] so the caller can wait for the browser and repeat it.
//!
//! ## API Coverage
//!
//! - `POST /api/token` - Code exchange and refresh
//! - `GET /search?type=track` - Track search
//! - `GET /me` - Current user id
//! - `POST /users/{user_id}/playlists` - Create playlist
//! - `POST /playlists/{playlist_id}/tracks` - Add tracks (100 per request)

pub mod auth;
pub mod playlist;
pub mod search;

use std::future::Future;

use reqwest::{Response, StatusCode};

use crate::{
    error::AuthError,
    management::{Access, TokenManager},
    warning,
};

pub use playlist::{create_playlist, save_playlist};
pub use search::{search, search_tracks};

/// Outcome of a call that may have sent the user to the authorization page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    Ready(T),
    /// An authorization redirect was started and the call did not run to
    /// the end. It can be repeated once the redirect has come back.
    Redirected,
}

impl<T> Reply<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Reply::Ready(value) => Some(value),
            Reply::Redirected => None,
        }
    }
}

/// Runs `call` with a bearer token, recovering once from a 401.
///
/// Yields [`Reply::Redirected`] when the manager started an authorization
/// redirect, either because no token was available or because recovery
/// ended in one. At most one refresh and one retry happen per invocation.
pub async fn authorized<T, F, Fut>(manager: &TokenManager, mut call: F) -> Result<Reply<T>, AuthError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, AuthError>>,
{
    let token = match manager.get_access_token().await? {
        Access::Granted(token) => token,
        Access::Redirected => return Ok(Reply::Redirected),
    };

    match call(token).await {
        Err(AuthError::UpstreamUnauthorized) => {}
        other => return other.map(Reply::Ready),
    }

    warning!("Access token was rejected, refreshing...");
    manager.invalidate_access_token().await?;

    match manager.refresh_access_token().await {
        Ok(Some(token)) => call(token).await.map(Reply::Ready),
        Ok(None) => reauthorize(manager).await,
        Err(e) => {
            warning!("{}: {}", e.kind(), e);
            reauthorize(manager).await
        }
    }
}

async fn reauthorize<T>(manager: &TokenManager) -> Result<Reply<T>, AuthError> {
    manager.forget_refresh_token().await?;
    manager.begin_authorization().await?;
    Ok(Reply::Redirected)
}

/// Maps 401 to [`AuthError::UpstreamUnauthorized`] and other failures to
/// [`AuthError::Upstream`].
pub(crate) fn check_status(res: Response) -> Result<Response, AuthError> {
    match res.status() {
        StatusCode::UNAUTHORIZED => Err(AuthError::UpstreamUnauthorized),
        status if !status.is_success() => Err(AuthError::Upstream(status)),
        _ => Ok(res),
    }
}
