//! Platform adapters: one `Provider` implementation per external
//! service, each turning a bearer token into a typed [`RawPayload`].
//!
//! Adapters never touch storage or rate-limit bookkeeping; they are
//! pure fetch-and-parse. The scheduler owns the gate check and the
//! resulting snapshot write.

pub mod adapters;
pub mod http;
pub mod payload;
pub mod provider;

pub use adapters::{BlueskyProvider, GithubProvider, LinearProvider, MemoryProvider, RedditProvider, TwitterProvider, YoutubeProvider};
pub use http::{map_status, map_transport_error, retry_after_secs};
pub use payload::{
    BlueskyPost, BlueskyRaw, GithubCommit, GithubPullRequest, GithubPullRequestState, GithubRaw, GithubRepoActivity, LinearIssue,
    LinearRaw, RawPayload, RedditComment, RedditMeta, RedditRaw, RedditSubmission, Tweet, TwitterRaw, YoutubeRaw, YoutubeVideo,
};
pub use provider::{DynProvider, FetchEnvelope, Provider, RateLimitInfo};
