// src/session.rs

use tower_sessions::{Expiry, Session, cookie::time::Duration, session::Error};

const USER_ID_KEY: &str = "user_id";
const FLASHES_KEY: &str = "_flashes";

/// "Remember me" keeps the login for this long after the last request.
const REMEMBER_FOR_DAYS: i64 = 30;

/// Binds the session to `user_id` under a fresh session ID.
pub async fn log_in(session: &Session, user_id: i64, remember: bool) -> Result<(), Error> {
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user_id).await?;
    if remember {
        session.set_expiry(Some(Expiry::OnInactivity(Duration::days(REMEMBER_FOR_DAYS))));
    }
    tracing::debug!("User {} logged in", user_id);
    Ok(())
}

/// Drops the login but keeps pending flash messages.
pub async fn log_out(session: &Session) -> Result<(), Error> {
    let flashes = take_flashes(session).await?;
    session.flush().await?;
    for message in flashes {
        flash(session, message).await?;
    }
    Ok(())
}

pub async fn user_id(session: &Session) -> Result<Option<i64>, Error> {
    session.get::<i64>(USER_ID_KEY).await
}

/// Queues a message for the next rendered page.
pub async fn flash(session: &Session, message: impl Into<String>) -> Result<(), Error> {
    let mut flashes: Vec<String> = session.get(FLASHES_KEY).await?.unwrap_or_default();
    flashes.push(message.into());
    session.insert(FLASHES_KEY, flashes).await
}

/// Returns and clears the queued messages.
pub async fn take_flashes(session: &Session) -> Result<Vec<String>, Error> {
    Ok(session
        .remove::<Vec<String>>(FLASHES_KEY)
        .await?
        .unwrap_or_default())
}
