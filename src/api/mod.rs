//! # API Module
//!
//! HTTP endpoints of the local callback server that stands in for the page
//! reload at the end of the OAuth redirect.
//!
//! ## Endpoints
//!
//! - [`callback`] - Receives Spotify's redirect and records the full URL,
//!   including the `code` query parameter, as the navigator location. The
//!   token manager performs the code exchange afterwards.
//! - [`health`] - Reports service name and version.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use jamcli::server::{CallbackState, router};
//!
//! let app = router(CallbackState { location, redirect_uri });
//! ```

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
