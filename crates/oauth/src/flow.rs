use chrono::{Duration, Utc};
use reqwest::Client;
use timeline_core::{Account, OAuthClientConfig, Platform, ProfileId};
use timeline_crypto::PayloadEncryptor;
use timeline_store::MetadataStore;

use tracing::warn;

use crate::error::OAuthError;
use crate::exchange::{exchange_code, fetch_identity};
use crate::state::OAuthState;

/// Everything the callback handler needs in order to complete a flow,
/// gathered so the handler itself stays a thin HTTP adapter.
///
/// `profile_id` names which profile the new account is linked under —
/// resolved by the HTTP layer (typically from the callback route or a
/// "currently active profile" cookie), not from the `state` parameter
/// itself. `state.user_id` is used only to confirm that profile is
/// still owned by the user who started the flow.
pub struct CallbackRequest<'a> {
    pub platform: Platform,
    pub profile_id: ProfileId,
    pub code: Option<&'a str>,
    pub state: Option<&'a str>,
    pub error: Option<&'a str>,
    pub redirect_uri: &'a str,
    pub required_state_extras: &'a [&'a str],
}

/// Runs the full authorization-code callback: validate inputs, decode
/// state, exchange the code, fetch the platform identity, then upsert
/// the `Account` row (re-activating and refreshing tokens if one
/// already exists for this `(platform, platform_user_id)`).
///
/// # Errors
/// Returns the specific [`OAuthError`] variant naming which step failed
/// — callers map this to a `?error={tag}` front-end redirect.
pub async fn complete_callback(
    client: &Client,
    store: &dyn MetadataStore,
    encryptor: &PayloadEncryptor,
    client_config: Option<&OAuthClientConfig>,
    request: CallbackRequest<'_>,
) -> Result<Account, OAuthError> {
    if request.error.is_some() {
        return Err(OAuthError::AuthDenied);
    }
    let code = request.code.ok_or(OAuthError::NoCode)?;
    let raw_state = request.state.ok_or(OAuthError::NoState)?;
    let state = OAuthState::decode(raw_state, request.required_state_extras)?;
    let config = client_config.ok_or(OAuthError::NotConfigured)?;

    let profile = store.get_profile(request.profile_id).await.map_err(|_| OAuthError::InvalidState)?;
    if profile.user_id != state.user_id {
        return Err(OAuthError::InvalidState);
    }

    let tokens = exchange_code(client, request.platform, config, code, request.redirect_uri).await?;
    let identity = fetch_identity(client, request.platform, &tokens.access_token).await?;

    let access_token_ciphertext = encryptor.encrypt_str(&tokens.access_token).map_err(|_| OAuthError::SaveFailed)?;
    let refresh_token_ciphertext = tokens
        .refresh_token
        .as_deref()
        .map(|t| encryptor.encrypt_str(t))
        .transpose()
        .map_err(|_| OAuthError::SaveFailed)?;
    let token_expires_at = tokens.expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs));

    let existing = store
        .find_account(request.platform, &identity.platform_user_id)
        .await
        .map_err(|_| OAuthError::SaveFailed)?;

    let account = match existing {
        Some(mut account) => {
            account.platform_handle = identity.platform_handle;
            account.access_token_ciphertext = access_token_ciphertext;
            account.refresh_token_ciphertext = refresh_token_ciphertext;
            account.token_expires_at = token_expires_at;
            account.is_active = true;
            account.updated_at = Utc::now();
            account
        }
        None => {
            let mut account = Account::new(
                request.profile_id,
                request.platform,
                identity.platform_user_id,
                identity.platform_handle,
                access_token_ciphertext,
            );
            account.refresh_token_ciphertext = refresh_token_ciphertext;
            account.token_expires_at = token_expires_at;
            account
        }
    };

    store.upsert_account(account).await.map_err(|e| {
        warn!(platform = %request.platform, error = %e, "failed to persist linked account");
        OAuthError::SaveFailed
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline_core::{Profile, UserId};
    use timeline_store_memory::MemoryMetadataStore;

    fn base_request(profile_id: ProfileId) -> CallbackRequest<'static> {
        CallbackRequest {
            platform: Platform::Github,
            profile_id,
            code: Some("abc"),
            state: Some("xyz"),
            error: Some("access_denied"),
            redirect_uri: "https://app.example.com/callback",
            required_state_extras: &[],
        }
    }

    #[tokio::test]
    async fn auth_denied_short_circuits_before_any_network_call() {
        let store = MemoryMetadataStore::default();
        let encryptor = PayloadEncryptor::from_password("test-password-at-least-32-bytes");
        let client = Client::new();
        let result = complete_callback(&client, &store, &encryptor, None, base_request(ProfileId::new())).await;
        assert_eq!(result.unwrap_err(), OAuthError::AuthDenied);
    }

    #[tokio::test]
    async fn wrong_owner_state_is_rejected_before_token_exchange() {
        let store = MemoryMetadataStore::default();
        let owner = UserId::new();
        let profile = Profile::new(owner, "main", "Main");
        store.seed_profile(profile.clone());
        let encryptor = PayloadEncryptor::from_password("test-password-at-least-32-bytes");
        let client = Client::new();

        let mismatched_state = OAuthState::new(UserId::new()).encode();
        let config = OAuthClientConfig { client_id: "id".into(), client_secret: "secret".into() };
        let request = CallbackRequest {
            platform: Platform::Github,
            profile_id: profile.id,
            code: Some("abc"),
            state: Some(&mismatched_state),
            error: None,
            redirect_uri: "https://app.example.com/callback",
            required_state_extras: &[],
        };
        let result = complete_callback(&client, &store, &encryptor, Some(&config), request).await;
        assert_eq!(result.unwrap_err(), OAuthError::InvalidState);
    }
}
