use timeline_core::Platform;

/// Where to exchange an authorization code for tokens, and where to
/// fetch the identity that names the just-authorized account.
pub struct PlatformEndpoints {
    pub token_url: &'static str,
    pub identity_url: &'static str,
    /// Whether the token endpoint expects `Authorization: Basic` (client
    /// id/secret) rather than form-encoded client credentials in the body.
    pub basic_auth: bool,
}

#[must_use]
pub fn endpoints_for(platform: Platform) -> PlatformEndpoints {
    match platform {
        Platform::Github => PlatformEndpoints {
            token_url: "https://github.com/login/oauth/access_token",
            identity_url: "https://api.github.com/user",
            basic_auth: false,
        },
        Platform::Bluesky => PlatformEndpoints {
            token_url: "https://bsky.social/xrpc/com.atproto.server.createSession",
            identity_url: "https://bsky.social/xrpc/com.atproto.server.getSession",
            basic_auth: false,
        },
        Platform::Youtube => PlatformEndpoints {
            token_url: "https://oauth2.googleapis.com/token",
            identity_url: "https://www.googleapis.com/youtube/v3/channels?part=id&mine=true",
            basic_auth: false,
        },
        Platform::Reddit => PlatformEndpoints {
            token_url: "https://www.reddit.com/api/v1/access_token",
            identity_url: "https://oauth.reddit.com/api/v1/me",
            basic_auth: true,
        },
        Platform::Twitter => PlatformEndpoints {
            token_url: "https://api.twitter.com/2/oauth2/token",
            identity_url: "https://api.twitter.com/2/users/me",
            basic_auth: true,
        },
        Platform::Linear => {
            PlatformEndpoints { token_url: "https://api.linear.app/oauth/token", identity_url: "https://api.linear.app/graphql", basic_auth: false }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_platform_has_endpoints() {
        for platform in Platform::all() {
            let e = endpoints_for(*platform);
            assert!(!e.token_url.is_empty());
            assert!(!e.identity_url.is_empty());
        }
    }
}
