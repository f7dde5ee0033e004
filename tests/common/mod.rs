#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use jamcli::{
    browser::{Navigator, RedirectListener},
    cli::Session,
    config::ClientConfig,
    management::{MemoryStore, TokenManager},
    types::Credential,
    utils,
};
use reqwest::Url;
use serde_json::{Value, json};

pub const CLIENT_ID: &str = "test-client";
pub const REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";

pub struct FakeState {
    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub me_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub add_calls: AtomicUsize,
    pub reject_exchange: AtomicBool,
    pub reject_refresh: AtomicBool,
    pub rotate_refresh: AtomicBool,
    pub fail_create: AtomicBool,
    pub expires_in: AtomicU64,
    pub unauthorized_tokens: Mutex<Vec<String>>,
    pub last_form: Mutex<HashMap<String, String>>,
    pub last_query: Mutex<HashMap<String, String>>,
    pub created_names: Mutex<Vec<String>>,
    pub added_uris: Mutex<Vec<Vec<String>>>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            exchange_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            me_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            add_calls: AtomicUsize::new(0),
            reject_exchange: AtomicBool::new(false),
            reject_refresh: AtomicBool::new(false),
            rotate_refresh: AtomicBool::new(false),
            fail_create: AtomicBool::new(false),
            expires_in: AtomicU64::new(3600),
            unauthorized_tokens: Mutex::new(Vec::new()),
            last_form: Mutex::new(HashMap::new()),
            last_query: Mutex::new(HashMap::new()),
            created_names: Mutex::new(Vec::new()),
            added_uris: Mutex::new(Vec::new()),
        }
    }
}

/// Minimal stand-in for the accounts service and the Web API.
pub struct FakeSpotify {
    pub state: Arc<FakeState>,
    pub base: String,
}

impl FakeSpotify {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route("/api/token", post(token))
            .route("/v1/search", get(search))
            .route("/v1/me", get(me))
            .route("/v1/users/{user_id}/playlists", post(create_playlist))
            .route("/v1/playlists/{playlist_id}/tracks", post(add_tracks))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            base: format!("http://{addr}"),
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            client_id: Some(CLIENT_ID.to_string()),
            redirect_uri: Some(REDIRECT_URI.to_string()),
            scope: "playlist-modify-public playlist-modify-private".to_string(),
            auth_url: format!("{}/authorize", self.base),
            token_url: format!("{}/api/token", self.base),
            api_url: format!("{}/v1", self.base),
            server_addr: "127.0.0.1:8888".to_string(),
        }
    }

    pub fn manager(
        &self,
        store: &Arc<MemoryStore>,
        navigator: &Arc<RecordingNavigator>,
    ) -> TokenManager {
        TokenManager::new(self.config(), store.clone(), navigator.clone())
    }

    pub fn session(&self, store: &Arc<MemoryStore>, navigator: &Arc<RecordingNavigator>) -> Session {
        Session::new(self.manager(store, navigator), navigator.clone())
    }

    pub fn add_calls(&self) -> usize {
        self.state.add_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.state.create_calls.load(Ordering::SeqCst)
    }

    pub fn reject_as_unauthorized(&self, token: &str) {
        self.state
            .unauthorized_tokens
            .lock()
            .unwrap()
            .push(token.to_string());
    }

    pub fn exchange_calls(&self) -> usize {
        self.state.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.state.search_calls.load(Ordering::SeqCst)
    }

    pub fn network_calls(&self) -> usize {
        self.exchange_calls()
            + self.refresh_calls()
            + self.search_calls()
            + self.state.me_calls.load(Ordering::SeqCst)
            + self.state.create_calls.load(Ordering::SeqCst)
            + self.state.add_calls.load(Ordering::SeqCst)
    }

    pub fn last_form(&self) -> HashMap<String, String> {
        self.state.last_form.lock().unwrap().clone()
    }
}

fn rejection(error: &str, description: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": error, "error_description": description })),
    )
        .into_response()
}

fn unauthorized(state: &FakeState, headers: &HeaderMap) -> Option<Response> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string();

    let rejected = token.is_empty() || state.unauthorized_tokens.lock().unwrap().contains(&token);
    rejected.then(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "status": 401, "message": "The access token expired" } })),
        )
            .into_response()
    })
}

async fn token(
    State(state): State<Arc<FakeState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    *state.last_form.lock().unwrap() = form.clone();
    let expires_in = state.expires_in.load(Ordering::SeqCst);

    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") => {
            state.exchange_calls.fetch_add(1, Ordering::SeqCst);
            if state.reject_exchange.load(Ordering::SeqCst) || !form.contains_key("code_verifier") {
                return rejection("invalid_grant", "Invalid authorization code");
            }
            Json(json!({
                "access_token": "exchanged-token",
                "token_type": "Bearer",
                "refresh_token": "fresh-refresh",
                "expires_in": expires_in,
                "scope": "playlist-modify-public playlist-modify-private"
            }))
            .into_response()
        }
        Some("refresh_token") => {
            state.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if state.reject_refresh.load(Ordering::SeqCst) {
                return rejection("invalid_grant", "Refresh token revoked");
            }
            let mut body = json!({
                "access_token": "refreshed-token",
                "token_type": "Bearer",
                "expires_in": expires_in
            });
            if state.rotate_refresh.load(Ordering::SeqCst) {
                body["refresh_token"] = json!("rotated-refresh");
            }
            Json(body).into_response()
        }
        _ => rejection("unsupported_grant_type", "Unknown grant type"),
    }
}

async fn search(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.search_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(res) = unauthorized(&state, &headers) {
        return res;
    }
    *state.last_query.lock().unwrap() = query;

    Json(json!({
        "tracks": {
            "items": [
                {
                    "id": "track-1",
                    "name": "One More Time",
                    "uri": "spotify:track:track-1",
                    "artists": [{ "name": "Daft Punk" }, { "name": "Romanthony" }],
                    "album": {
                        "name": "Discovery",
                        "images": [
                            { "url": "https://img.example/large.jpg" },
                            { "url": "https://img.example/small.jpg" }
                        ]
                    },
                    "preview_url": "https://preview.example/track-1.mp3"
                },
                {
                    "id": "track-2",
                    "name": "Untitled",
                    "uri": "spotify:track:track-2",
                    "artists": [],
                    "album": { "name": "Demos", "images": [] },
                    "preview_url": null
                }
            ]
        }
    }))
    .into_response()
}

async fn me(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(res) = unauthorized(&state, &headers) {
        return res;
    }
    Json(json!({ "id": "listener", "display_name": "Listener" })).into_response()
}

async fn create_playlist(
    State(state): State<Arc<FakeState>>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.create_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(res) = unauthorized(&state, &headers) {
        return res;
    }
    if state.fail_create.load(Ordering::SeqCst) || user_id != "listener" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "status": 500, "message": "Server error" } })),
        )
            .into_response();
    }

    let name = body["name"].as_str().unwrap_or_default().to_string();
    state.created_names.lock().unwrap().push(name.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "id": "playlist-1", "name": name })),
    )
        .into_response()
}

async fn add_tracks(
    State(state): State<Arc<FakeState>>,
    Path(_playlist_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.add_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(res) = unauthorized(&state, &headers) {
        return res;
    }

    let uris: Vec<String> = body["uris"]
        .as_array()
        .map(|uris| {
            uris.iter()
                .filter_map(|u| u.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    state.added_uris.lock().unwrap().push(uris);
    (StatusCode::CREATED, Json(json!({ "snapshot_id": "snap-1" }))).into_response()
}

/// Navigator that records navigations instead of opening a browser.
///
/// Waiting for a redirect returns at once: with an approval code set, the
/// user "approves" and the location comes back carrying that code,
/// otherwise the wait times out.
#[derive(Default)]
pub struct RecordingNavigator {
    location: Mutex<Option<Url>>,
    assigned: Mutex<Vec<Url>>,
    replaced: Mutex<Vec<Url>>,
    approval: Mutex<Option<String>>,
    waits: AtomicUsize,
}

impl RecordingNavigator {
    pub fn at(url: &str) -> Self {
        Self {
            location: Mutex::new(Some(Url::parse(url).unwrap())),
            ..Self::default()
        }
    }

    pub fn approving(code: &str) -> Self {
        Self {
            approval: Mutex::new(Some(code.to_string())),
            ..Self::default()
        }
    }

    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }

    pub fn assigned(&self) -> Vec<Url> {
        self.assigned.lock().unwrap().clone()
    }

    pub fn replaced(&self) -> Vec<Url> {
        self.replaced.lock().unwrap().clone()
    }

    pub fn location_snapshot(&self) -> Url {
        self.location.lock().unwrap().clone().unwrap()
    }
}

impl Navigator for RecordingNavigator {
    fn location(&self) -> Option<Url> {
        self.location.lock().unwrap().clone()
    }

    fn assign(&self, url: Url) {
        *self.location.lock().unwrap() = None;
        self.assigned.lock().unwrap().push(url);
    }

    fn replace(&self, url: Url) {
        *self.location.lock().unwrap() = Some(url.clone());
        self.replaced.lock().unwrap().push(url);
    }
}

#[async_trait]
impl RedirectListener for RecordingNavigator {
    async fn wait_for_redirect(&self, _max_wait: Duration) -> bool {
        self.waits.fetch_add(1, Ordering::SeqCst);
        let Some(code) = self.approval.lock().unwrap().clone() else {
            return false;
        };
        let url = Url::parse(&format!("{REDIRECT_URI}?code={code}")).unwrap();
        *self.location.lock().unwrap() = Some(url);
        true
    }
}

pub fn valid_credential(access_token: &str, refresh_token: Option<&str>) -> Credential {
    Credential {
        access_token: Some(access_token.to_string()),
        refresh_token: refresh_token.map(str::to_string),
        expires_at: Some(utils::now_millis() + 3_600_000),
    }
}

pub fn expired_credential(access_token: &str, refresh_token: &str) -> Credential {
    Credential {
        access_token: Some(access_token.to_string()),
        refresh_token: Some(refresh_token.to_string()),
        expires_at: Some(utils::now_millis() - 1_000),
    }
}

pub fn query(url: &Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}
