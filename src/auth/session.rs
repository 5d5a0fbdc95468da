//! Sign-in and per-request principal resolution

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{bearer_token, verify_password, SessionTokens};
use crate::db::Store;
use crate::identity::{Principal, User};
use crate::types::{EncvError, Result};

/// Check credentials and record the login time.
///
/// Unknown usernames, wrong passwords and inactive accounts all fail the same
/// way.
pub async fn sign_in(
    store: &Store,
    username: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<User> {
    let invalid = || EncvError::Unauthorized("Invalid username or password".into());

    let Some(mut user) = store.find_user_by_username(username.trim()).await? else {
        warn!("Login attempt for unknown user: {}", username);
        return Err(invalid());
    };

    if !verify_password(password, &user.password_hash)? {
        warn!("Failed login attempt for: {}", user.username);
        return Err(invalid());
    }

    if !user.is_active {
        warn!("Login attempt for inactive user: {}", user.username);
        return Err(invalid());
    }

    user.last_login = Some(now);
    store.replace(&user).await?;

    info!("User logged in: {}", user.username);
    Ok(user)
}

/// Resolve the principal behind an `Authorization` header.
///
/// No header means anonymous. A token that does not verify, or whose user is
/// gone or deactivated, is rejected.
pub async fn resolve_principal(
    store: &Store,
    tokens: &SessionTokens,
    auth_header: Option<&str>,
) -> Result<Principal> {
    let Some(token) = bearer_token(auth_header) else {
        return Ok(Principal::anonymous());
    };

    let claims = tokens.verify(token).inspect_err(|e| debug!("Rejected token: {}", e))?;

    // Role, strand and active flag come from the stored user, not the token
    match store.get::<User>(claims.sub.0).await? {
        Some(user) if user.is_active => Ok(Principal::from_user(&user)),
        Some(_) => Err(EncvError::Unauthorized("Account is inactive".into())),
        None => Err(EncvError::Unauthorized("User no longer exists".into())),
    }
}
