//! The user agent the authorization flow drives.
//!
//! In a browser the flow reads `window.location`, navigates away to the
//! authorization endpoint and later rewrites the history entry to hide the
//! used code. [`Navigator`] captures those three operations. The terminal
//! implementation, [`BrowserNavigator`], opens the system browser and learns
//! the returning location from the local callback server.

use std::{
    sync::{Arc, Mutex, MutexGuard, atomic::AtomicBool, atomic::Ordering},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Url;

use crate::{
    config::ClientConfig,
    info,
    server::{CallbackState, start_api_server},
    warning,
};

pub trait Navigator: Send + Sync {
    /// The location the flow currently "sits on", if any.
    fn location(&self) -> Option<Url>;

    /// Full navigation to `url`. The current location is left behind.
    fn assign(&self, url: Url);

    /// Replaces the current location without navigating.
    fn replace(&self, url: Url);
}

/// Something that learns when the browser has come back from the
/// authorization endpoint.
#[async_trait]
pub trait RedirectListener: Send + Sync {
    /// Waits until a redirect has delivered a location, at most `max_wait`.
    /// Returns `false` on timeout.
    async fn wait_for_redirect(&self, max_wait: Duration) -> bool;
}

/// Shared slot holding the location delivered by the callback server.
pub type Location = Arc<Mutex<Option<Url>>>;

pub(crate) fn lock(location: &Location) -> MutexGuard<'_, Option<Url>> {
    location.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct BrowserNavigator {
    location: Location,
    server_addr: String,
    redirect_uri: Option<String>,
    server_started: AtomicBool,
}

impl BrowserNavigator {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            location: Arc::new(Mutex::new(None)),
            server_addr: config.server_addr.clone(),
            redirect_uri: config.redirect_uri.clone(),
            server_started: AtomicBool::new(false),
        }
    }

    fn ensure_server(&self) {
        if self.server_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let Some(redirect_uri) = self.redirect_uri.clone() else {
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warning!("No async runtime available, callback server not started.");
            return;
        };

        let state = CallbackState {
            location: Arc::clone(&self.location),
            redirect_uri,
        };
        let addr = self.server_addr.clone();
        runtime.spawn(async move {
            if let Err(e) = start_api_server(&addr, state).await {
                warning!("Callback server on {} stopped: {}", addr, e);
            }
        });
    }
}

impl Navigator for BrowserNavigator {
    fn location(&self) -> Option<Url> {
        lock(&self.location).clone()
    }

    fn assign(&self, url: Url) {
        *lock(&self.location) = None;
        self.ensure_server();

        if webbrowser::open(url.as_str()).is_err() {
            warning!(
                "Failed to open browser. Please navigate to the following URL manually:\n{}",
                url
            );
        } else {
            info!("Opened Spotify authorization in your browser.");
        }
    }

    fn replace(&self, url: Url) {
        *lock(&self.location) = Some(url);
    }
}

#[async_trait]
impl RedirectListener for BrowserNavigator {
    /// Shows a spinner while waiting for the callback server.
    async fn wait_for_redirect(&self, max_wait: Duration) -> bool {
        let pb = ProgressBar::new_spinner();
        pb.set_message("Waiting for Spotify authorization...");
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
            pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        let start = Instant::now();
        while start.elapsed() < max_wait {
            if lock(&self.location).is_some() {
                pb.finish_and_clear();
                return true;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        pb.finish_and_clear();
        false
    }
}
