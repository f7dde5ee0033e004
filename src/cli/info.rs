use chrono::{DateTime, Local};

use crate::{cli, info, management::TokenState, success, utils, warning};

/// Prints the token lifecycle state without touching the network.
pub async fn status() {
    let session = cli::session();
    let status = match session.manager.status().await {
        Ok(status) => status,
        Err(e) => {
            warning!("Failed to read credential state: {}", e);
            return;
        }
    };

    match status.state {
        TokenState::CachedValid => success!("Access token is valid."),
        TokenState::NeedsRefresh => info!("Access token expired, it will be refreshed on next use."),
        TokenState::AwaitingCode => info!("Waiting for an authorization code."),
        TokenState::NoToken => info!("Not authenticated. Run jamcli auth."),
        TokenState::Error => warning!(
            "Authorization is not possible: {}",
            status
                .last_error
                .as_deref()
                .unwrap_or("client configuration is incomplete")
        ),
    }

    if let Some(expires_at) = status.expires_at {
        let remaining = (expires_at - utils::now_millis()) / 1000;
        if let Some(at) = DateTime::from_timestamp_millis(expires_at) {
            let at = at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
            if remaining > 0 {
                info!("Expires at {} (in {} minutes)", at, remaining / 60);
            } else {
                info!("Expired at {}", at);
            }
        }
    }

    info!(
        "Refresh token: {}",
        if status.has_refresh_token { "stored" } else { "none" }
    );
}
