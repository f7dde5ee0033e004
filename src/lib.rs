//! Spotify Playlist CLI Library
//!
//! This library lets a terminal user search the Spotify catalog and save
//! playlists to their account. Its core is the OAuth 2.0 Authorization Code
//! flow with PKCE: acquiring, persisting, expiring, refreshing and recovering
//! access tokens without a client secret.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints of the local callback server
//! - `browser` - The user agent abstraction the authorization flow navigates
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - Error taxonomy of the token lifecycle
//! - `management` - Credential persistence and the token lifecycle manager
//! - `server` - Local HTTP server receiving the OAuth redirect
//! - `spotify` - Spotify Web API client implementation
//! - `types` - Data structures and type definitions
//! - `utils` - PKCE helpers and small utilities
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use jamcli::{browser::BrowserNavigator, config, management::{FileStore, TokenManager}};
//!
//! #[tokio::main]
//! async fn main() -> jamcli::Res<()> {
//!     config::load_env().await?;
//!     let config = config::ClientConfig::from_env();
//!     let navigator = Arc::new(BrowserNavigator::new(&config));
//!     let manager = TokenManager::new(config, Arc::new(FileStore::new()), navigator);
//!     let _ = manager.get_access_token().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Uses a boxed dynamic error trait object so that unrelated error types
/// can be propagated with `?`, while keeping the `Send + Sync` bounds
/// required across await points.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// Accepts the same arguments as `println!`.
///
/// # Example
///
/// ```
/// info!("Waiting for the authorization callback...");
/// info!("Found {} tracks", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// Accepts the same arguments as `println!`.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Terminates the process with exit code 1 after printing. Only the command
/// layer uses it, for failures that cannot be recovered such as missing
/// client configuration. Library code reports through [`warning!`] and
/// returns instead.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable problems: a rejected refresh token, a lost PKCE
/// transaction, a failed playlist request.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
