//! Join-or-create: resolving an external login to a local account.

use tracing::{info, warn};

use super::providers::{ExternalProfile, Provider};
use crate::auth::models::{NewUser, User};
use crate::auth::store::CredentialStore;
use crate::common::{safe_email_log, ApiError};

/// Finds the local account for `profile`, checking in order: same email
/// (linking the provider id if it is not recorded yet), same provider id,
/// and finally creating a passwordless verified account.
pub async fn join_or_create(
    store: &CredentialStore,
    provider: Provider,
    profile: &ExternalProfile,
) -> Result<User, ApiError> {
    if let Some(user) = store.get_user_by_email(&profile.email).await? {
        return link_if_missing(store, provider, user, &profile.provider_id).await;
    }

    if let Some(user) = store
        .get_user_by_provider_id(provider, &profile.provider_id)
        .await?
    {
        return Ok(user);
    }

    let new_user = NewUser {
        email: profile.email.clone(),
        password_hash: String::new(),
        first_name: profile.first_name.clone(),
        last_name: profile.last_name.clone(),
        email_verified: true,
        google_id: (provider == Provider::Google).then(|| profile.provider_id.clone()),
        github_id: (provider == Provider::GitHub).then(|| profile.provider_id.clone()),
    };

    match store.insert_user(new_user).await {
        Ok(user) => {
            info!(
                user_id = %user.id,
                provider = %provider,
                email = %safe_email_log(&user.email),
                "Created account from OAuth login"
            );
            Ok(user)
        }
        // lost a race with a concurrent signup for the same email
        Err(ApiError::Conflict(msg)) => {
            warn!(provider = %provider, "OAuth account insert conflicted, retrying lookup");
            match store.get_user_by_email(&profile.email).await? {
                Some(user) => link_if_missing(store, provider, user, &profile.provider_id).await,
                None => Err(ApiError::Conflict(msg)),
            }
        }
        Err(e) => Err(e),
    }
}

async fn link_if_missing(
    store: &CredentialStore,
    provider: Provider,
    mut user: User,
    external_id: &str,
) -> Result<User, ApiError> {
    let slot = match provider {
        Provider::Google => &mut user.google_id,
        Provider::GitHub => &mut user.github_id,
    };

    if slot.as_deref().map_or(true, str::is_empty) {
        store.update_provider_id(&user.id, provider, external_id).await?;
        *slot = Some(external_id.to_string());
    }

    Ok(user)
}

/// Splits a display name into first name and the rest. Without a name the
/// login handle becomes the first name.
pub fn split_name(display_name: Option<&str>, login: &str) -> (Option<String>, Option<String>) {
    let mut parts = display_name.unwrap_or_default().split_whitespace();

    match parts.next() {
        Some(first) => {
            let rest = parts.collect::<Vec<_>>().join(" ");
            (Some(first.to_string()), Some(rest).filter(|r| !r.is_empty()))
        }
        None => (Some(login.to_string()).filter(|l| !l.is_empty()), None),
    }
}
