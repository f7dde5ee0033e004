use axum::{Extension, Router, routing::get};
use reqwest::Url;
use std::{net::SocketAddr, str::FromStr};

use crate::{Res, api, browser::Location};

/// Shared state of the callback route.
#[derive(Clone)]
pub struct CallbackState {
    /// Slot the navigator reads its location from.
    pub location: Location,
    /// Registered redirect URI; its path is the callback route.
    pub redirect_uri: String,
}

/// Builds the callback router: `GET /health` and `GET <redirect path>`.
pub fn router(state: CallbackState) -> Router {
    let callback_path = Url::parse(&state.redirect_uri)
        .map(|url| url.path().to_string())
        .unwrap_or_else(|_| "/callback".to_string());

    Router::new()
        .route("/health", get(api::health))
        .route(&callback_path, get(api::callback).layer(Extension(state)))
}

/// Serves the callback router on `addr` until the process ends.
pub async fn start_api_server(addr: &str, state: CallbackState) -> Res<()> {
    let addr = SocketAddr::from_str(addr)?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}
