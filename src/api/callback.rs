use std::collections::HashMap;

use axum::{Extension, extract::Query, response::Html};
use reqwest::Url;

use crate::{browser, server::CallbackState, warning};

/// Receives the OAuth redirect and hands the full URL to the navigator.
///
/// The handler does not exchange the code itself. The token manager picks
/// the `code` (or `error`) parameter up from the navigator location, the
/// way a reloaded page would read its own query string.
pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(state): Extension<CallbackState>,
) -> Html<&'static str> {
    let mut location = match Url::parse(&state.redirect_uri) {
        Ok(url) => url,
        Err(e) => {
            warning!("Invalid redirect URI {}: {}", state.redirect_uri, e);
            return Html("<h4>Invalid redirect configuration.</h4>");
        }
    };
    if !params.is_empty() {
        location.query_pairs_mut().extend_pairs(params.iter());
    }

    let page = if params.contains_key("code") {
        Html("<h2>Authorization received.</h2><p>Close this window and return to the terminal.</p>")
    } else if params.contains_key("error") {
        Html("<h4>Authorization was declined.</h4>")
    } else {
        Html("<h4>Missing authorization code.</h4>")
    };

    *browser::lock(&state.location) = Some(location);
    page
}
