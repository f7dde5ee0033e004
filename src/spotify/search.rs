use reqwest::Client;

use crate::{
    error::AuthError,
    management::TokenManager,
    spotify::{Reply, authorized, check_status},
    types::{SearchResponse, Track},
    warning,
};

/// Searches the catalog for tracks matching `term`.
///
/// Results are normalized into [`Track`]s: the first artist, the album name,
/// the first album image (empty string when there is none) and the preview
/// URL (`None` when absent).
///
/// Never fails: a redirect, an authorization failure that survives one
/// refresh, or any upstream error is logged and yields an empty list.
///
/// # Example
///
/// ```rust,ignore
/// let tracks = spotify::search(&manager, "daft punk").await;
/// for track in tracks {
///     println!("{} - {}", track.artist, track.name);
/// }
/// ```
pub async fn search(manager: &TokenManager, term: &str) -> Vec<Track> {
    search_tracks(manager, term).await.ready().unwrap_or_default()
}

/// Like [`search`], but tells a started authorization redirect apart from an
/// empty result.
pub async fn search_tracks(manager: &TokenManager, term: &str) -> Reply<Vec<Track>> {
    if term.trim().is_empty() {
        return Reply::Ready(Vec::new());
    }

    let api_url = format!("{uri}/search", uri = &manager.config().api_url);
    let result = authorized(manager, |token| {
        fetch_tracks(manager.http(), &api_url, token, term)
    })
    .await;

    match result {
        Ok(reply) => reply,
        Err(e) => {
            warning!("Search for '{}' failed. {}: {}", term, e.kind(), e);
            Reply::Ready(Vec::new())
        }
    }
}

async fn fetch_tracks(
    client: &Client,
    api_url: &str,
    token: String,
    term: &str,
) -> Result<Vec<Track>, AuthError> {
    let res = client
        .get(api_url)
        .bearer_auth(token)
        .query(&[("type", "track"), ("q", term)])
        .send()
        .await?;

    let json = check_status(res)?.json::<SearchResponse>().await?;

    Ok(json
        .tracks
        .map(|page| page.items.into_iter().map(Track::from).collect())
        .unwrap_or_default())
}
