use async_trait::async_trait;
use dashmap::DashMap;
use timeline_core::{
    Account, AccountId, ApiKey, ApiKeyId, Platform, Profile, ProfileFilter, ProfileId, RateLimitState, TimelineError,
    User, UserId,
};
use timeline_store::MetadataStore;

/// An in-process `MetadataStore` backed by `DashMap`s, one per entity
/// kind. Used by tests and local development.
#[derive(Default)]
pub struct MemoryMetadataStore {
    users: DashMap<UserId, User>,
    accounts: DashMap<AccountId, Account>,
    profiles: DashMap<ProfileId, Profile>,
    filters: DashMap<ProfileId, Vec<ProfileFilter>>,
    api_keys: DashMap<String, ApiKey>,
    rate_limits: DashMap<AccountId, RateLimitState>,
}

impl MemoryMetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn seed_profile(&self, profile: Profile) {
        self.profiles.insert(profile.id, profile);
    }

    pub fn seed_filter(&self, filter: ProfileFilter) {
        self.filters.entry(filter.profile_id).or_default().push(filter);
    }

    pub fn seed_api_key(&self, key: ApiKey) {
        self.api_keys.insert(key.key_hash.clone(), key);
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get_user(&self, id: UserId) -> Result<User, TimelineError> {
        self.users.get(&id).map(|u| u.clone()).ok_or(TimelineError::NotFound)
    }

    async fn upsert_account(&self, account: Account) -> Result<Account, TimelineError> {
        if let Some(existing) = self
            .accounts
            .iter()
            .find(|a| a.platform == account.platform && a.platform_user_id == account.platform_user_id)
        {
            let mut merged = account;
            merged.id = existing.id;
            merged.created_at = existing.created_at;
            self.accounts.insert(merged.id, merged.clone());
            return Ok(merged);
        }
        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_account(&self, platform: Platform, platform_user_id: &str) -> Result<Option<Account>, TimelineError> {
        Ok(self
            .accounts
            .iter()
            .find(|a| a.platform == platform && a.platform_user_id == platform_user_id)
            .map(|a| a.clone()))
    }

    async fn get_account(&self, id: AccountId) -> Result<Account, TimelineError> {
        self.accounts.get(&id).map(|a| a.clone()).ok_or(TimelineError::NotFound)
    }

    async fn list_active_accounts(&self) -> Result<Vec<Account>, TimelineError> {
        Ok(self.accounts.iter().filter(|a| a.is_active).map(|a| a.clone()).collect())
    }

    async fn list_accounts_for_profile(&self, profile_id: ProfileId) -> Result<Vec<Account>, TimelineError> {
        Ok(self.accounts.iter().filter(|a| a.profile_id == profile_id).map(|a| a.clone()).collect())
    }

    async fn deactivate_account(&self, id: AccountId) -> Result<(), TimelineError> {
        self.accounts.get_mut(&id).ok_or(TimelineError::NotFound)?.is_active = false;
        Ok(())
    }

    async fn touch_last_fetched(&self, id: AccountId) -> Result<(), TimelineError> {
        self.accounts.get_mut(&id).ok_or(TimelineError::NotFound)?.last_fetched_at = Some(chrono::Utc::now());
        Ok(())
    }

    async fn get_profile(&self, id: ProfileId) -> Result<Profile, TimelineError> {
        self.profiles.get(&id).map(|p| p.clone()).ok_or(TimelineError::NotFound)
    }

    async fn list_profiles_for_user(&self, user_id: UserId) -> Result<Vec<Profile>, TimelineError> {
        Ok(self.profiles.iter().filter(|p| p.user_id == user_id).map(|p| p.clone()).collect())
    }

    async fn list_filters_for_profile(&self, profile_id: ProfileId) -> Result<Vec<ProfileFilter>, TimelineError> {
        Ok(self.filters.get(&profile_id).map(|f| f.clone()).unwrap_or_default())
    }

    async fn find_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, TimelineError> {
        Ok(self.api_keys.get(key_hash).map(|k| k.clone()))
    }

    async fn touch_api_key_usage(&self, id: ApiKeyId) -> Result<(), TimelineError> {
        if let Some(mut key) = self.api_keys.iter_mut().find(|k| k.id == id) {
            key.last_used_at = Some(chrono::Utc::now());
        }
        Ok(())
    }

    async fn get_rate_limit_state(&self, account_id: AccountId) -> Result<Option<RateLimitState>, TimelineError> {
        Ok(self.rate_limits.get(&account_id).map(|s| s.clone()))
    }

    async fn upsert_rate_limit_state(&self, state: RateLimitState) -> Result<(), TimelineError> {
        self.rate_limits.insert(state.account_id, state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline_core::ProfileId;

    #[tokio::test]
    async fn upsert_account_merges_on_platform_identity() {
        let store = MemoryMetadataStore::new();
        let profile_id = ProfileId::new();
        let account = Account::new(profile_id, Platform::Github, "123", "octocat", "ct1");
        let first = store.upsert_account(account.clone()).await.unwrap();

        let mut updated = account.clone();
        updated.access_token_ciphertext = "ct2".into();
        let second = store.upsert_account(updated).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.access_token_ciphertext, "ct2");
        assert_eq!(store.list_active_accounts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deactivate_marks_inactive() {
        let store = MemoryMetadataStore::new();
        let account = Account::new(ProfileId::new(), Platform::Github, "1", "h", "ct");
        let id = account.id;
        store.upsert_account(account).await.unwrap();
        store.deactivate_account(id).await.unwrap();
        assert!(store.list_active_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn api_key_lookup_by_hash() {
        let store = MemoryMetadataStore::new();
        let key = ApiKey::new(UserId::new(), "cli", "plaintext-key");
        store.seed_api_key(key.clone());
        let hash = ApiKey::hash_plaintext("plaintext-key");
        assert!(store.find_api_key_by_hash(&hash).await.unwrap().is_some());
        assert!(store.find_api_key_by_hash("wrong").await.unwrap().is_none());
    }
}
