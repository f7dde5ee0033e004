//! # CLI Module
//!
//! User-facing commands of jamcli. Each command builds a [`Session`] (token
//! manager over the file store, browser navigator with its callback
//! server), acquires a token when it needs one and delegates to the
//! [`crate::spotify`] client.
//!
//! ## Commands
//!
//! - [`auth`] - Acquire a token and replay a search left pending by an
//!   interrupted authorization
//! - [`search`] - Search tracks and print them as a table
//! - [`playlist`] - Save a playlist from track URIs
//! - [`status`] - Show the token lifecycle state
//! - [`logout`] - Forget all stored credentials
//!
//! ## Authorization round-trip
//!
//! When the manager answers [`Access::Redirected`] the browser has been
//! opened on Spotify's consent page. The command then waits for the
//! callback server to receive the redirect and asks the manager again, which
//! exchanges the `code` it now finds on the navigator location. A catalog
//! call that ends in a redirect (a 401 the refresh could not recover) is
//! followed the same way through [`resume`] and then repeated once.
//!
//! ```text
//! get_access_token ── Redirected ──> browser ──> /callback?code=...
//!        ↑                                              │
//!        └────────────── location updated ──────────────┘
//! ```

mod auth;
mod info;
mod playlist;
mod search;

use std::{sync::Arc, time::Duration};

use crate::{
    browser::{BrowserNavigator, RedirectListener},
    config::ClientConfig,
    error::AuthError,
    error,
    management::{Access, FileStore, TokenManager},
    warning,
};

pub use auth::{auth, auth_with, logout};
pub use info::status;
pub use playlist::{playlist, playlist_with};
pub use search::{search, search_with};

/// How long a command waits for the browser to come back.
const REDIRECT_TIMEOUT: Duration = Duration::from_secs(120);

/// Browser round-trips a single command will go through.
const MAX_ROUND_TRIPS: usize = 2;

/// Token manager plus the listener that reports the returning redirect.
pub struct Session {
    pub manager: TokenManager,
    redirects: Arc<dyn RedirectListener>,
}

impl Session {
    pub fn new(manager: TokenManager, redirects: Arc<dyn RedirectListener>) -> Self {
        Self { manager, redirects }
    }

    async fn wait_for_redirect(&self) -> bool {
        self.redirects.wait_for_redirect(REDIRECT_TIMEOUT).await
    }
}

/// Builds the token manager for a command run.
pub fn session() -> Session {
    let config = ClientConfig::from_env();
    let navigator = Arc::new(BrowserNavigator::new(&config));
    let manager = TokenManager::new(config, Arc::new(FileStore::new()), navigator.clone());
    Session::new(manager, navigator)
}

/// Returns an access token, following the browser round-trip when needed.
///
/// Every authorization page this opens is waited for. The redirect of the
/// last round-trip is redeemed without starting another one.
///
/// Exits the program when the client configuration is missing. Other
/// failures are reported and yield `None`.
pub async fn authorize(session: &Session) -> Option<String> {
    for _ in 0..MAX_ROUND_TRIPS {
        match report(session.manager.get_access_token().await)? {
            Access::Granted(token) => return Some(token),
            Access::Redirected => {
                if !session.wait_for_redirect().await {
                    warning!("Authorization timed out. Run jamcli auth to try again.");
                    return None;
                }
            }
        }
    }

    redeem(session).await
}

/// Follows a redirect that a catalog call has just started.
pub async fn resume(session: &Session) -> Option<String> {
    if !session.wait_for_redirect().await {
        warning!("Authorization timed out. Run jamcli auth to try again.");
        return None;
    }

    redeem(session).await
}

async fn redeem(session: &Session) -> Option<String> {
    let token = report(session.manager.try_access_token().await)?;
    if token.is_none() {
        warning!("Authorization did not complete. Run jamcli auth to try again.");
    }
    token
}

fn report<T>(result: Result<T, AuthError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e @ AuthError::Configuration(_)) => {
            error!(
                "{}: {}. Set it in the environment or in the jamcli .env file.",
                e.kind(),
                e
            )
        }
        Err(e) => {
            warning!("{}: {}", e.kind(), e);
            None
        }
    }
}
