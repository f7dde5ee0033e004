use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand::Rng;
use reqwest::Url;
use sha2::{Digest, Sha256};

/// Characters allowed in a PKCE code verifier (RFC 7636 unreserved set).
pub const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Verifier length used by the authorization flow.
pub const VERIFIER_LENGTH: usize = 64;

/// Generates a code verifier of `length` characters from the unreserved set.
///
/// Every character is drawn uniformly from [`VERIFIER_CHARSET`] using the
/// thread-local CSPRNG. RFC 7636 allows 43 to 128 characters.
pub fn generate_code_verifier(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| VERIFIER_CHARSET[rng.random_range(0..VERIFIER_CHARSET.len())] as char)
        .collect()
}

/// Derives the S256 code challenge: base64url(sha256(verifier)) without padding.
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Returns the value of the first query parameter called `name`.
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Returns `url` without any of the named query parameters.
///
/// Other parameters keep their order. A query left empty is removed
/// entirely, so `/callback?code=x` becomes `/callback`.
pub fn strip_query_params(url: &Url, names: &[&str]) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !names.contains(&key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut stripped = url.clone();
    stripped.set_query(None);
    if !kept.is_empty() {
        stripped.query_pairs_mut().extend_pairs(kept);
    }
    stripped
}
