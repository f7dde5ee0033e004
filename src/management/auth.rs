use std::{
    sync::{Arc, Mutex as StdMutex, MutexGuard, Weak},
    time::Duration,
};

use reqwest::{Client, Url};
use tokio::{sync::Mutex, task::JoinHandle};

use crate::{
    browser::Navigator,
    config::ClientConfig,
    error::{AuthError, TokenRejection},
    info,
    management::store::CredentialStore,
    spotify, success,
    types::Credential,
    utils, warning,
};

/// A token is treated as expired this long before its recorded expiry.
pub const EXPIRY_MARGIN_SECS: u64 = 240;

/// Result of a token acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// A usable bearer token.
    Granted(String),
    /// The navigator was sent to the authorization endpoint. No token is
    /// available until the redirect comes back with a `code`.
    Redirected,
}

impl Access {
    pub fn token(&self) -> Option<&str> {
        match self {
            Access::Granted(token) => Some(token),
            Access::Redirected => None,
        }
    }

    pub fn into_token(self) -> Option<String> {
        match self {
            Access::Granted(token) => Some(token),
            Access::Redirected => None,
        }
    }
}

/// Lifecycle state as observed from memory, the store and the navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    NoToken,
    CachedValid,
    NeedsRefresh,
    AwaitingCode,
    Error,
}

#[derive(Debug, Clone)]
pub struct TokenStatus {
    pub state: TokenState,
    pub expires_at: Option<i64>,
    pub has_refresh_token: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct TokenCache {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    awaiting_code: bool,
    last_error: Option<String>,
}

struct Inner {
    config: ClientConfig,
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    http: Client,
    cache: Mutex<TokenCache>,
    // Held for a whole acquisition so concurrent callers queue up behind it
    // and then hit the in-memory token instead of refreshing again.
    acquiring: Mutex<()>,
    refresh_task: StdMutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let slot = self
            .refresh_task
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}

fn task_slot(slot: &StdMutex<Option<JoinHandle<()>>>) -> MutexGuard<'_, Option<JoinHandle<()>>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn is_due(expires_at: Option<i64>, now: i64) -> bool {
    match expires_at {
        Some(expires_at) => now >= expires_at - (EXPIRY_MARGIN_SECS as i64) * 1000,
        None => false,
    }
}

fn expiry_from_now(expires_in: u64) -> i64 {
    let lifetime = i64::try_from(expires_in)
        .ok()
        .and_then(|secs| secs.checked_mul(1000))
        .unwrap_or(i64::MAX);
    utils::now_millis().saturating_add(lifetime)
}

/// Owns the access token for one user session.
///
/// Every API call asks [`TokenManager::get_access_token`] for its bearer
/// token. The manager decides whether the cached token is still good,
/// whether to refresh it, whether the navigator came back with an
/// authorization code to exchange, or whether the user has to be sent to
/// the authorization endpoint.
///
/// Cloning is cheap and clones share the same session. A proactive refresh
/// is scheduled whenever a token with a known lifetime is obtained; it is
/// aborted when the last clone is dropped.
///
/// # Example
///
/// ```rust,ignore
/// let manager = TokenManager::new(config, Arc::new(FileStore::new()), navigator);
/// match manager.get_access_token().await? {
///     Access::Granted(token) => search(&token).await,
///     Access::Redirected => info!("Finish the authorization in your browser."),
/// }
/// ```
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

impl TokenManager {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self::with_client(config, store, navigator, Client::new())
    }

    pub fn with_client(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
        http: Client,
    ) -> Self {
        TokenManager {
            inner: Arc::new(Inner {
                config,
                store,
                navigator,
                http,
                cache: Mutex::new(TokenCache::default()),
                acquiring: Mutex::new(()),
                refresh_task: StdMutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    pub fn http(&self) -> &Client {
        &self.inner.http
    }

    /// Returns a usable access token, or starts the authorization redirect.
    ///
    /// The first matching step wins:
    /// 1. In-memory token that is not due for refresh.
    /// 2. Missing client id or redirect URI: [`AuthError::Configuration`].
    /// 3. Stored access token that is not due: adopted into memory.
    /// 4. Known refresh token: refreshed; on failure continue.
    /// 5. Navigator location carries `code`: exchanged, and the code is
    ///    stripped from the location. A failed exchange restarts
    ///    authorization. A location carrying `error` (consent declined)
    ///    yields [`AuthError::AuthorizationDenied`] without a new redirect.
    /// 6. Otherwise the authorization redirect starts.
    ///
    /// # Errors
    ///
    /// Configuration errors, a declined consent and store failures are
    /// returned. Every other failure ends in [`Access::Redirected`].
    pub async fn get_access_token(&self) -> Result<Access, AuthError> {
        let _latch = self.inner.acquiring.lock().await;
        match self.acquire().await? {
            Some(token) => Ok(Access::Granted(token)),
            None => self.start_authorization().await,
        }
    }

    /// Steps 1 to 5 of [`get_access_token`](Self::get_access_token) without
    /// ever navigating.
    ///
    /// Used to redeem a redirect that has come back when no further browser
    /// round-trip will be awaited. Returns `Ok(None)` where
    /// `get_access_token` would start a new authorization.
    pub async fn try_access_token(&self) -> Result<Option<String>, AuthError> {
        let _latch = self.inner.acquiring.lock().await;
        self.acquire().await
    }

    /// Trades the known refresh token for a new access token.
    ///
    /// Returns `Ok(None)` without a network call when no refresh token is
    /// known. On success the new access token, expiry and (when rotated)
    /// refresh token replace the stored values in one write, and a proactive
    /// refresh is scheduled.
    ///
    /// # Errors
    ///
    /// A refused refresh token yields [`AuthError::RefreshInvalid`] after the
    /// whole credential has been cleared, so the next acquisition restarts
    /// full authorization.
    pub async fn refresh_access_token(&self) -> Result<Option<String>, AuthError> {
        let _latch = self.inner.acquiring.lock().await;

        let known = self.inner.cache.lock().await.refresh_token.clone();
        let refresh_token = match known {
            Some(token) => Some(token),
            None => self.inner.store.load().await?.refresh_token,
        };

        match refresh_token {
            Some(token) => self.refresh_with(&token).await.map(Some),
            None => Ok(None),
        }
    }

    /// Starts a fresh authorization: new verifier, stored transaction,
    /// navigation to the authorization endpoint. Always [`Access::Redirected`].
    pub async fn begin_authorization(&self) -> Result<Access, AuthError> {
        let _latch = self.inner.acquiring.lock().await;
        self.start_authorization().await
    }

    /// Exchanges an authorization code using the stored PKCE verifier.
    ///
    /// A lost verifier or a refused exchange restarts authorization and
    /// yields [`Access::Redirected`].
    pub async fn exchange_code(&self, code: &str) -> Result<Access, AuthError> {
        let _latch = self.inner.acquiring.lock().await;
        match self.exchange(code).await? {
            Some(token) => Ok(Access::Granted(token)),
            None => self.start_authorization().await,
        }
    }

    /// Drops the access token from memory and store, keeping the refresh token.
    pub async fn invalidate_access_token(&self) -> Result<(), AuthError> {
        self.inner.cache.lock().await.access_token = None;
        self.inner
            .store
            .update(Box::new(|credential| credential.access_token = None))
            .await?;
        Ok(())
    }

    /// Drops the refresh token from memory and store.
    pub async fn forget_refresh_token(&self) -> Result<(), AuthError> {
        self.inner.cache.lock().await.refresh_token = None;
        self.inner
            .store
            .update(Box::new(|credential| credential.refresh_token = None))
            .await?;
        Ok(())
    }

    /// Forgets everything: credential, pending transaction, pending search,
    /// scheduled refresh.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let _latch = self.inner.acquiring.lock().await;
        if let Some(task) = task_slot(&self.inner.refresh_task).take() {
            task.abort();
        }
        *self.inner.cache.lock().await = TokenCache::default();
        self.inner.store.clear().await?;
        self.inner.store.take_transaction().await?;
        self.inner.store.take_pending_term().await?;
        Ok(())
    }

    /// Snapshot of the lifecycle without touching the network.
    pub async fn status(&self) -> Result<TokenStatus, AuthError> {
        let cache = self.inner.cache.lock().await.clone();
        let stored = self.inner.store.load().await?;

        let (access_token, expires_at) = match cache.access_token {
            Some(token) => (Some(token), cache.expires_at),
            None => (stored.access_token, stored.expires_at),
        };
        let has_refresh_token = cache.refresh_token.is_some() || stored.refresh_token.is_some();
        let has_code = self
            .inner
            .navigator
            .location()
            .is_some_and(|location| utils::query_param(&location, "code").is_some());

        let state = if self.inner.config.client().is_err() {
            TokenState::Error
        } else if access_token.is_some() && !is_due(expires_at, utils::now_millis()) {
            TokenState::CachedValid
        } else if has_refresh_token {
            TokenState::NeedsRefresh
        } else if cache.awaiting_code || has_code {
            TokenState::AwaitingCode
        } else if cache.last_error.is_some() {
            TokenState::Error
        } else {
            TokenState::NoToken
        };

        Ok(TokenStatus {
            state,
            expires_at,
            has_refresh_token,
            last_error: cache.last_error,
        })
    }

    pub async fn state(&self) -> Result<TokenState, AuthError> {
        Ok(self.status().await?.state)
    }

    /// Steps 1 to 5 of the acquisition. `None` means authorization has to
    /// start over.
    async fn acquire(&self) -> Result<Option<String>, AuthError> {
        if let Some(token) = self.cached_token().await {
            return Ok(Some(token));
        }

        if let Err(e) = self.inner.config.client() {
            self.record_error(&e).await;
            return Err(e);
        }

        let stored = self.inner.store.load().await?;
        if let Some(token) = stored.access_token.clone() {
            if !is_due(stored.expires_at, utils::now_millis()) {
                self.adopt(&stored).await;
                return Ok(Some(token));
            }
            info!("Access token expired, refreshing...");
        }

        let known = self.inner.cache.lock().await.refresh_token.clone();
        if let Some(refresh_token) = known.or(stored.refresh_token) {
            match self.refresh_with(&refresh_token).await {
                Ok(token) => return Ok(Some(token)),
                Err(e @ AuthError::Configuration(_)) => return Err(e),
                Err(e) => warning!("{}: {}", e.kind(), e),
            }
        }

        let Some(location) = self.inner.navigator.location() else {
            return Ok(None);
        };

        if let Some(code) = utils::query_param(&location, "code") {
            let token = self.exchange(&code).await?;
            if token.is_some() {
                let visible = utils::strip_query_params(&location, &["code", "state"]);
                self.inner.navigator.replace(visible);
                success!("Authorization complete.");
            }
            return Ok(token);
        }

        match utils::query_param(&location, "error") {
            Some(error) => Err(self.decline(&location, error).await),
            None => Ok(None),
        }
    }

    async fn cached_token(&self) -> Option<String> {
        let mut cache = self.inner.cache.lock().await;
        let token = cache.access_token.clone()?;
        if is_due(cache.expires_at, utils::now_millis()) {
            cache.access_token = None;
            return None;
        }
        Some(token)
    }

    async fn adopt(&self, credential: &Credential) {
        let mut cache = self.inner.cache.lock().await;
        cache.access_token = credential.access_token.clone();
        cache.refresh_token = credential.refresh_token.clone();
        cache.expires_at = credential.expires_at;
        cache.awaiting_code = false;
        cache.last_error = None;
    }

    async fn record_error(&self, error: &AuthError) {
        self.inner.cache.lock().await.last_error = Some(format!("{}: {}", error.kind(), error));
    }

    async fn start_authorization(&self) -> Result<Access, AuthError> {
        let (client_id, redirect_uri) = self.inner.config.client()?;

        let verifier = utils::generate_code_verifier(utils::VERIFIER_LENGTH);
        let challenge = utils::generate_code_challenge(&verifier);
        self.inner.store.save_transaction(&verifier).await?;

        let url = spotify::auth::authorize_url(
            &self.inner.config.auth_url,
            client_id,
            redirect_uri,
            &self.inner.config.scope,
            &challenge,
        )?;

        self.inner.cache.lock().await.awaiting_code = true;
        info!("Redirecting to Spotify for authorization...");
        self.inner.navigator.assign(url);
        Ok(Access::Redirected)
    }

    /// Redeems `code`. A refused code or a lost verifier is logged and
    /// yields `None`.
    async fn exchange(&self, code: &str) -> Result<Option<String>, AuthError> {
        match self.redeem_code(code).await {
            Ok(token) => Ok(Some(token)),
            Err(e @ (AuthError::Store(_) | AuthError::Configuration(_))) => Err(e),
            Err(e) => {
                warning!("{}: {}", e.kind(), e);
                self.record_error(&e).await;
                Ok(None)
            }
        }
    }

    async fn redeem_code(&self, code: &str) -> Result<String, AuthError> {
        let (client_id, redirect_uri) = self.inner.config.client()?;
        let Some(verifier) = self.inner.store.take_transaction().await? else {
            return Err(AuthError::TransactionLost);
        };

        let grant = spotify::auth::exchange_code_pkce(
            &self.inner.http,
            &self.inner.config.token_url,
            client_id,
            redirect_uri,
            code,
            &verifier,
        )
        .await
        .map_err(|e| match e {
            AuthError::Rejected(rejection) => AuthError::AuthorizationDenied(rejection),
            other => other,
        })?;

        let credential = Credential {
            access_token: Some(grant.access_token.clone()),
            refresh_token: grant.refresh_token.clone(),
            expires_at: grant.expires_in.map(expiry_from_now),
        };
        self.inner.store.save(&credential).await?;
        self.adopt(&credential).await;

        if let Some(expires_in) = grant.expires_in {
            self.schedule_refresh(expires_in);
        }

        Ok(grant.access_token)
    }

    async fn refresh_with(&self, refresh_token: &str) -> Result<String, AuthError> {
        let (client_id, _) = self.inner.config.client()?;

        let result = spotify::auth::refresh_token(
            &self.inner.http,
            &self.inner.config.token_url,
            client_id,
            refresh_token,
        )
        .await;

        let grant = match result {
            Ok(grant) => grant,
            Err(AuthError::Rejected(rejection)) => {
                let e = AuthError::RefreshInvalid(rejection);
                self.discard_credential().await;
                self.record_error(&e).await;
                return Err(e);
            }
            Err(e) => {
                self.record_error(&e).await;
                return Err(e);
            }
        };

        let access_token = grant.access_token.clone();
        let refresh_token = grant
            .refresh_token
            .clone()
            .unwrap_or_else(|| refresh_token.to_string());
        let expires_at = grant.expires_in.map(expiry_from_now);

        let credential = self
            .inner
            .store
            .update(Box::new(move |credential| {
                credential.access_token = Some(access_token);
                credential.refresh_token = Some(refresh_token);
                credential.expires_at = expires_at;
            }))
            .await?;
        self.adopt(&credential).await;

        if let Some(expires_in) = grant.expires_in {
            self.schedule_refresh(expires_in);
        }

        Ok(grant.access_token)
    }

    async fn discard_credential(&self) {
        {
            let mut cache = self.inner.cache.lock().await;
            cache.access_token = None;
            cache.refresh_token = None;
            cache.expires_at = None;
        }
        if let Err(e) = self.inner.store.clear().await {
            warning!("Failed to clear stored credential: {}", e);
        }
    }

    async fn decline(&self, location: &Url, error: String) -> AuthError {
        if let Err(e) = self.inner.store.take_transaction().await {
            warning!("Failed to discard PKCE transaction: {}", e);
        }
        self.inner.navigator.replace(utils::strip_query_params(
            location,
            &["error", "error_description", "state"],
        ));

        let e = AuthError::AuthorizationDenied(TokenRejection {
            error,
            description: utils::query_param(location, "error_description"),
        });
        self.record_error(&e).await;
        self.inner.cache.lock().await.awaiting_code = false;
        e
    }

    fn schedule_refresh(&self, expires_in: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let delay = Duration::from_secs(expires_in.saturating_sub(EXPIRY_MARGIN_SECS));
        let session: Weak<Inner> = Arc::downgrade(&self.inner);
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = session.upgrade() else {
                return;
            };
            // Detach before refreshing; the refresh schedules the next run.
            task_slot(&inner.refresh_task).take();

            let manager = TokenManager { inner };
            if let Err(e) = manager.refresh_access_token().await {
                warning!("Proactive refresh failed. {}: {}", e.kind(), e);
            }
        });

        if let Some(previous) = task_slot(&self.inner.refresh_task).replace(task) {
            previous.abort();
        }
    }
}
