use async_trait::async_trait;
use timeline_core::{
    Account, AccountId, ApiKey, Platform, Profile, ProfileFilter, ProfileId, RateLimitState, TimelineError, User,
    UserId,
};

/// Relational persistence boundary for `User`, `Profile`, `Account`,
/// `ProfileFilter`, `ApiKey`, and `RateLimitState`.
///
/// Not a general CRUD surface — only the operations the pipeline and
/// its read path actually need. Full profile/filter management is
/// handled outside this core.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<User, TimelineError>;

    async fn upsert_account(&self, account: Account) -> Result<Account, TimelineError>;
    async fn find_account(&self, platform: Platform, platform_user_id: &str) -> Result<Option<Account>, TimelineError>;
    async fn get_account(&self, id: AccountId) -> Result<Account, TimelineError>;
    async fn list_active_accounts(&self) -> Result<Vec<Account>, TimelineError>;
    async fn list_accounts_for_profile(&self, profile_id: ProfileId) -> Result<Vec<Account>, TimelineError>;
    async fn deactivate_account(&self, id: AccountId) -> Result<(), TimelineError>;
    async fn touch_last_fetched(&self, id: AccountId) -> Result<(), TimelineError>;

    async fn get_profile(&self, id: ProfileId) -> Result<Profile, TimelineError>;
    async fn list_profiles_for_user(&self, user_id: UserId) -> Result<Vec<Profile>, TimelineError>;
    async fn list_filters_for_profile(&self, profile_id: ProfileId) -> Result<Vec<ProfileFilter>, TimelineError>;

    async fn find_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, TimelineError>;
    async fn touch_api_key_usage(&self, id: timeline_core::ApiKeyId) -> Result<(), TimelineError>;

    async fn get_rate_limit_state(&self, account_id: AccountId) -> Result<Option<RateLimitState>, TimelineError>;
    async fn upsert_rate_limit_state(&self, state: RateLimitState) -> Result<(), TimelineError>;
}
