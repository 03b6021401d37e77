use reqwest::Client;
use timeline_core::{OAuthClientConfig, Platform};

use crate::endpoints::{endpoints_for, PlatformEndpoints};
use crate::error::OAuthError;

/// Tokens returned by a platform's token endpoint.
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in_secs: Option<i64>,
}

/// The platform-side identity discovered after a successful exchange:
/// what the Account row gets keyed and displayed by.
pub struct Identity {
    pub platform_user_id: String,
    pub platform_handle: String,
}

/// Exchanges an authorization code for tokens at the platform's token
/// endpoint. Every platform in this pipeline accepts form-encoded
/// `grant_type=authorization_code` bodies; the only variance is whether
/// client credentials ride in the body or an `Authorization: Basic`
/// header.
pub async fn exchange_code(
    client: &Client,
    platform: Platform,
    config: &OAuthClientConfig,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenResponse, OAuthError> {
    let endpoints = endpoints_for(platform);
    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
    ];
    if !endpoints.basic_auth {
        form.push(("client_id", &config.client_id));
        form.push(("client_secret", &config.client_secret));
    }

    let mut request = client.post(endpoints.token_url).header("Accept", "application/json").form(&form);
    if endpoints.basic_auth {
        request = request.basic_auth(&config.client_id, Some(&config.client_secret));
    }

    let response = request.send().await.map_err(|_| OAuthError::TokenFailed)?;
    if !response.status().is_success() {
        return Err(OAuthError::TokenFailed);
    }
    let body: serde_json::Value = response.json().await.map_err(|_| OAuthError::TokenFailed)?;

    let access_token = body
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or(OAuthError::TokenFailed)?
        .to_string();
    let refresh_token = body.get("refresh_token").and_then(|v| v.as_str()).map(String::from);
    let expires_in_secs = body.get("expires_in").and_then(serde_json::Value::as_i64);

    Ok(TokenResponse { access_token, refresh_token, expires_in_secs })
}

/// Fetches the identity endpoint and extracts a platform user id and
/// display handle. Field names are duck-typed per platform since each
/// identity response has its own shape.
pub async fn fetch_identity(client: &Client, platform: Platform, access_token: &str) -> Result<Identity, OAuthError> {
    let PlatformEndpoints { identity_url, .. } = endpoints_for(platform);
    let response = client
        .get(identity_url)
        .bearer_auth(access_token)
        .header("User-Agent", "timeline-pipeline/0.1")
        .send()
        .await
        .map_err(|_| OAuthError::UserFailed)?;
    if !response.status().is_success() {
        return Err(OAuthError::UserFailed);
    }
    let body: serde_json::Value = response.json().await.map_err(|_| OAuthError::UserFailed)?;
    extract_identity(platform, &body)
}

fn extract_identity(platform: Platform, body: &serde_json::Value) -> Result<Identity, OAuthError> {
    let (id_field, handle_field) = match platform {
        Platform::Github => ("id", "login"),
        Platform::Bluesky => ("did", "handle"),
        Platform::Youtube => ("id", "id"),
        Platform::Reddit => ("id", "name"),
        Platform::Twitter => ("id", "username"),
        Platform::Linear => ("id", "name"),
    };

    let id_value = body.get(id_field).ok_or(OAuthError::UserFailed)?;
    let platform_user_id = id_value.as_str().map(String::from).unwrap_or_else(|| id_value.to_string());
    let platform_handle = body.get(handle_field).and_then(|v| v.as_str()).unwrap_or(&platform_user_id).to_string();

    Ok(Identity { platform_user_id, platform_handle })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_github_identity() {
        let body = serde_json::json!({"id": 42, "login": "octocat"});
        let identity = extract_identity(Platform::Github, &body).unwrap();
        assert_eq!(identity.platform_user_id, "42");
        assert_eq!(identity.platform_handle, "octocat");
    }

    #[test]
    fn extracts_bluesky_identity() {
        let body = serde_json::json!({"did": "did:plc:abc", "handle": "alice.bsky.social"});
        let identity = extract_identity(Platform::Bluesky, &body).unwrap();
        assert_eq!(identity.platform_user_id, "did:plc:abc");
        assert_eq!(identity.platform_handle, "alice.bsky.social");
    }

    #[test]
    fn missing_id_field_fails() {
        let body = serde_json::json!({});
        assert!(extract_identity(Platform::Github, &body).is_err());
    }
}
