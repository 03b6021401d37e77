use std::sync::Arc;

use reqwest::Client;
use timeline_core::{Account, Platform};
use timeline_provider::{
    BlueskyProvider, DynProvider, GithubProvider, LinearProvider, RedditProvider, TwitterProvider, YoutubeProvider,
};

/// Builds the adapter for one account's platform.
///
/// Github, Bluesky, and Linear adapters only need a client. Reddit,
/// Twitter, and Youtube also need an identity fragment captured at link
/// time — `platform_handle` or `platform_user_id` depending on what the
/// platform's API addresses fetches by.
#[must_use]
pub fn build_provider(client: Client, account: &Account) -> Arc<dyn DynProvider> {
    match account.platform {
        Platform::Github => Arc::new(GithubProvider::new(client)),
        Platform::Bluesky => Arc::new(BlueskyProvider::new(client)),
        Platform::Linear => Arc::new(LinearProvider::new(client)),
        Platform::Reddit => Arc::new(RedditProvider::new(client, account.platform_handle.clone())),
        Platform::Twitter => Arc::new(TwitterProvider::new(client, account.platform_user_id.clone())),
        Platform::Youtube => {
            Arc::new(YoutubeProvider::new(client, uploads_playlist_id(&account.platform_user_id)))
        }
    }
}

/// A channel's uploads playlist id is its channel id with the `UC`
/// prefix replaced by `UU`, per the YouTube Data API convention.
#[must_use]
pub fn uploads_playlist_id(channel_id: &str) -> String {
    match channel_id.strip_prefix("UC") {
        Some(rest) => format!("UU{rest}"),
        None => channel_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_channel_id_to_uploads_playlist() {
        assert_eq!(uploads_playlist_id("UCabc123"), "UUabc123");
    }

    #[test]
    fn leaves_non_channel_ids_untouched() {
        assert_eq!(uploads_playlist_id("not-a-channel-id"), "not-a-channel-id");
    }

    #[test]
    fn builds_provider_matching_account_platform() {
        let account = Account::new(timeline_core::ProfileId::new(), Platform::Github, "1", "octocat", "ct");
        let provider = build_provider(Client::new(), &account);
        assert_eq!(provider.platform(), Platform::Github);
    }
}
