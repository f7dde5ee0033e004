use reqwest::Client;

use crate::{
    error::AuthError,
    management::TokenManager,
    spotify::{Reply, authorized, check_status},
    types::{
        AddTrackToPlaylistRequest, AddTrackToPlaylistResponse, CreatePlaylistRequest,
        CreatePlaylistResponse, CurrentUser,
    },
    warning,
};

/// Spotify accepts at most this many URIs per add-tracks request.
const MAX_TRACKS_PER_REQUEST: usize = 100;

/// Creates a playlist called `name` on the current user's account and adds
/// the given track URIs to it.
///
/// Best effort: an empty name or an empty track list is a no-op, and any
/// failure is logged rather than returned. Returns the new playlist id when
/// every step succeeded.
pub async fn save_playlist(manager: &TokenManager, name: &str, uris: &[String]) -> Option<String> {
    create_playlist(manager, name, uris).await.ready().flatten()
}

/// Like [`save_playlist`], but reports a redirect started before the
/// playlist was created as [`Reply::Redirected`], so the whole save can be
/// repeated without creating a duplicate.
pub async fn create_playlist(
    manager: &TokenManager,
    name: &str,
    uris: &[String],
) -> Reply<Option<String>> {
    if name.trim().is_empty() || uris.is_empty() {
        return Reply::Ready(None);
    }

    match create_with_tracks(manager, name, uris).await {
        Ok(reply) => reply,
        Err(e) => {
            warning!("Failed to save playlist '{}'. {}: {}", name, e.kind(), e);
            Reply::Ready(None)
        }
    }
}

async fn create_with_tracks(
    manager: &TokenManager,
    name: &str,
    uris: &[String],
) -> Result<Reply<Option<String>>, AuthError> {
    let client = manager.http();
    let api_url = manager.config().api_url.as_str();

    let Reply::Ready(user) =
        authorized(manager, |token| current_user(client, api_url, token)).await?
    else {
        return Ok(Reply::Redirected);
    };

    let Reply::Ready(playlist) = authorized(manager, |token| {
        create(client, api_url, &user.id, name, token)
    })
    .await?
    else {
        return Ok(Reply::Redirected);
    };

    for chunk in uris.chunks(MAX_TRACKS_PER_REQUEST) {
        let added = authorized(manager, |token| {
            add_tracks(client, api_url, &playlist.id, chunk, token)
        })
        .await?;

        if matches!(added, Reply::Redirected) {
            warning!(
                "Playlist {} was created but not all tracks could be added.",
                playlist.id
            );
            return Ok(Reply::Ready(None));
        }
    }

    Ok(Reply::Ready(Some(playlist.id)))
}

async fn current_user(client: &Client, api_url: &str, token: String) -> Result<CurrentUser, AuthError> {
    let res = client
        .get(format!("{api_url}/me"))
        .bearer_auth(token)
        .send()
        .await?;
    Ok(check_status(res)?.json::<CurrentUser>().await?)
}

async fn create(
    client: &Client,
    api_url: &str,
    user_id: &str,
    name: &str,
    token: String,
) -> Result<CreatePlaylistResponse, AuthError> {
    let res = client
        .post(format!("{api_url}/users/{user_id}/playlists"))
        .bearer_auth(token)
        .json(&CreatePlaylistRequest {
            name: name.to_string(),
        })
        .send()
        .await?;
    Ok(check_status(res)?.json::<CreatePlaylistResponse>().await?)
}

async fn add_tracks(
    client: &Client,
    api_url: &str,
    playlist_id: &str,
    uris: &[String],
    token: String,
) -> Result<AddTrackToPlaylistResponse, AuthError> {
    let res = client
        .post(format!("{api_url}/playlists/{playlist_id}/tracks"))
        .bearer_auth(token)
        .json(&AddTrackToPlaylistRequest {
            uris: uris.to_vec(),
        })
        .send()
        .await?;
    Ok(check_status(res)?.json::<AddTrackToPlaylistResponse>().await?)
}
