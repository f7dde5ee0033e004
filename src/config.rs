//! Configuration management for the playlist CLI.
//!
//! Configuration values come from environment variables, optionally seeded
//! from a `.env` file in the local data directory:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (Spotify endpoints, scope, callback address)
//!
//! The client id and the redirect URI have no default. Their absence is a
//! configuration error reported by the token manager, never a panic.

use std::{env, path::PathBuf};

use reqwest::Url;

use crate::error::AuthError;

pub const CLIENT_ID_VAR: &str = "SPOTIFY_API_AUTH_CLIENT_ID";
pub const REDIRECT_URI_VAR: &str = "SPOTIFY_API_REDIRECT_URI";

const DEFAULT_SCOPE: &str = "playlist-modify-public playlist-modify-private";
const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";

/// Loads environment variables from a `.env` file in the local data directory.
///
/// The file lives at `<data_local_dir>/jamcli/.env`:
/// - Linux: `~/.local/share/jamcli/.env`
/// - macOS: `~/Library/Application Support/jamcli/.env`
/// - Windows: `%LOCALAPPDATA%/jamcli/.env`
///
/// Variables already present in the process environment are not overridden.
/// A missing file is fine, the values may come from the environment alone.
///
/// # Errors
///
/// Returns an error string if the directory cannot be created or the file
/// exists but cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("jamcli/.env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if !path.is_file() {
        return Ok(());
    }

    dotenv::from_path(&path).map_err(|e| e.to_string())
}

/// Client configuration for the authorization flow and the Web API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    /// Bind address of the local callback server.
    pub server_addr: String,
}

impl ClientConfig {
    /// Reads the configuration from the process environment.
    ///
    /// Empty values count as absent. `SERVER_ADDRESS` falls back to the host
    /// and port of the redirect URI, so a loopback redirect works without an
    /// extra variable.
    pub fn from_env() -> Self {
        let client_id = var(CLIENT_ID_VAR);
        let redirect_uri = var(REDIRECT_URI_VAR);
        let server_addr = var("SERVER_ADDRESS")
            .or_else(|| redirect_uri.as_deref().and_then(callback_addr))
            .unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string());

        Self {
            client_id,
            redirect_uri,
            scope: var("SPOTIFY_API_AUTH_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            auth_url: var("SPOTIFY_API_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            token_url: var("SPOTIFY_API_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            api_url: var("SPOTIFY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            server_addr,
        }
    }

    /// Returns the client id and redirect URI, or the name of the first
    /// missing variable as a configuration error.
    pub fn client(&self) -> Result<(&str, &str), AuthError> {
        let client_id = self
            .client_id
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::Configuration(CLIENT_ID_VAR))?;
        let redirect_uri = self
            .redirect_uri
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::Configuration(REDIRECT_URI_VAR))?;
        Ok((client_id, redirect_uri))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            redirect_uri: None,
            scope: DEFAULT_SCOPE.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            server_addr: DEFAULT_SERVER_ADDRESS.to_string(),
        }
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Derives `host:port` from a redirect URI such as `http://127.0.0.1:8888/callback`.
pub fn callback_addr(redirect_uri: &str) -> Option<String> {
    let url = Url::parse(redirect_uri).ok()?;
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    let host = if host == "localhost" { "127.0.0.1" } else { host };
    Some(format!("{host}:{port}"))
}
