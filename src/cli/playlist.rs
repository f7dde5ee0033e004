use crate::{
    cli::{self, Session},
    info,
    spotify::{self, Reply},
    success, warning,
};

/// Saves a playlist named `name` containing `uris`.
pub async fn playlist(name: String, uris: Vec<String>) {
    playlist_with(&cli::session(), &name, &uris).await;
}

/// Saves a playlist in `session`, following one authorization round-trip
/// that the save itself started. Returns the playlist id.
pub async fn playlist_with(session: &Session, name: &str, uris: &[String]) -> Option<String> {
    if name.trim().is_empty() || uris.is_empty() {
        warning!("A playlist needs a name and at least one track URI.");
        return None;
    }

    cli::authorize(session).await?;

    info!("Saving playlist '{}' with {} tracks", name, uris.len());
    let saved = match spotify::create_playlist(&session.manager, name, uris).await {
        Reply::Ready(saved) => saved,
        Reply::Redirected => {
            cli::resume(session).await?;
            spotify::create_playlist(&session.manager, name, uris)
                .await
                .ready()
                .flatten()
        }
    };

    match &saved {
        Some(id) => success!("Playlist '{}' saved ({}).", name, id),
        None => warning!("Playlist '{}' was not saved.", name),
    }
    saved
}
