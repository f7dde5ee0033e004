use tabled::Table;

use crate::{
    cli::{self, Session},
    info,
    spotify::{self, Reply},
    success,
    types::{Track, TrackTableRow},
    warning,
};

/// Searches tracks and prints them as a table.
pub async fn search(term: String) {
    search_with(&cli::session(), &term).await;
}

/// Runs a search in `session`.
///
/// The term is remembered before authorization starts and forgotten only
/// once the search has run to the end, so an interrupted browser round-trip
/// can be resumed with `jamcli auth`. Returns `None` when the search is left
/// waiting for authorization.
pub async fn search_with(session: &Session, term: &str) -> Option<Vec<Track>> {
    if let Err(e) = session.manager.store().save_pending_term(term).await {
        warning!("Failed to remember search term: {}", e);
    }

    cli::authorize(session).await?;
    run_search(session, term).await
}

pub(crate) async fn run_search(session: &Session, term: &str) -> Option<Vec<Track>> {
    let tracks = match spotify::search_tracks(&session.manager, term).await {
        Reply::Ready(tracks) => tracks,
        Reply::Redirected => {
            cli::resume(session).await?;
            match spotify::search_tracks(&session.manager, term).await {
                Reply::Ready(tracks) => tracks,
                Reply::Redirected => {
                    warning!(
                        "Search for '{}' is still waiting for authorization. Run jamcli auth to resume it.",
                        term
                    );
                    return None;
                }
            }
        }
    };

    if let Err(e) = session.manager.store().take_pending_term().await {
        warning!("Failed to clear pending search: {}", e);
    }

    if tracks.is_empty() {
        info!("No tracks found for '{}'.", term);
        return Some(tracks);
    }

    let rows: Vec<TrackTableRow> = tracks
        .iter()
        .enumerate()
        .map(|(index, track)| TrackTableRow {
            index: index + 1,
            name: track.name.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            uri: track.uri.clone(),
        })
        .collect();

    println!("{}", Table::new(rows));
    success!("Found {} tracks for '{}'.", tracks.len(), term);
    Some(tracks)
}
