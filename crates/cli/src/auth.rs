//! Sign-in for the headless client.

use anyhow::Context;

use duotrack_core::user::{Credentials, User};
use duotrack_sync::session::Session;

/// Resume the stored session, falling back to a password login.
///
/// `has_token` is whether the token store held a token at start-up.
/// `lookup` reads `DUOTRACK_EMAIL` and `DUOTRACK_PASSWORD`.
pub async fn sign_in(
    session: &Session,
    has_token: bool,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<User> {
    if has_token {
        if let Some(user) = session.resume().await.context("Failed to resume session")? {
            return Ok(user);
        }
        tracing::info!("Stored session expired, signing in again");
    }

    let email = lookup("DUOTRACK_EMAIL")
        .context("DUOTRACK_EMAIL is required when no valid token is stored")?;
    let password = lookup("DUOTRACK_PASSWORD")
        .context("DUOTRACK_PASSWORD is required when no valid token is stored")?;

    let user = session
        .login(&Credentials::new(&email, password))
        .await
        .context("Login failed")?;
    tracing::info!(user_id = %user.id, name = %user.name, "Signed in");
    Ok(user)
}
