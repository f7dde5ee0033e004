use crate::{
    cli::{self, Session},
    info, success,
    types::Track,
    warning,
};

/// Authorizes with Spotify and replays a search that was interrupted by a
/// previous authorization redirect.
pub async fn auth() {
    auth_with(&cli::session()).await;
}

/// Authorizes `session` and replays a pending search.
///
/// Returns the replayed search results, `None` when nothing was replayed.
pub async fn auth_with(session: &Session) -> Option<Vec<Track>> {
    cli::authorize(session).await?;
    success!("Authenticated with Spotify.");

    // The term is consumed by the replay itself once it has run.
    match session.manager.store().pending_term().await {
        Ok(Some(term)) => {
            info!("Replaying pending search '{}'", term);
            cli::search::run_search(session, &term).await
        }
        Ok(None) => None,
        Err(e) => {
            warning!("Failed to read pending search: {}", e);
            None
        }
    }
}

pub async fn logout() {
    let session = cli::session();
    match session.manager.logout().await {
        Ok(()) => success!("Stored credentials removed."),
        Err(e) => warning!("Failed to remove stored credentials: {}", e),
    }
}
