use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use timeline_core::{
    Account, AccountId, ApiKey, ApiKeyId, FilterKey, FilterKind, Platform, Profile, ProfileFilter, ProfileFilterId,
    ProfileId, RateLimitState, TimelineError, User, UserId,
};
use timeline_store::MetadataStore;

pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: uuid::Uuid,
    email: String,
    display_name: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User { id: r.id.into(), email: r.email, display_name: r.display_name, created_at: r.created_at, updated_at: r.updated_at }
    }
}

#[derive(FromRow)]
struct AccountRow {
    id: uuid::Uuid,
    profile_id: uuid::Uuid,
    platform: String,
    platform_user_id: String,
    platform_handle: String,
    access_token_ciphertext: String,
    refresh_token_ciphertext: Option<String>,
    token_expires_at: Option<chrono::DateTime<chrono::Utc>>,
    is_active: bool,
    last_fetched_at: Option<chrono::DateTime<chrono::Utc>>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = TimelineError;

    fn try_from(r: AccountRow) -> Result<Self, Self::Error> {
        let platform = Platform::from_str_opt(&r.platform)
            .ok_or_else(|| TimelineError::StoreError { operation: format!("unknown platform in row: {}", r.platform) })?;
        Ok(Account {
            id: r.id.into(),
            profile_id: r.profile_id.into(),
            platform,
            platform_user_id: r.platform_user_id,
            platform_handle: r.platform_handle,
            access_token_ciphertext: r.access_token_ciphertext,
            refresh_token_ciphertext: r.refresh_token_ciphertext,
            token_expires_at: r.token_expires_at,
            is_active: r.is_active,
            last_fetched_at: r.last_fetched_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn get_user(&self, id: UserId) -> Result<User, TimelineError> {
        let row: UserRow = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TimelineError::StoreError { operation: format!("get_user: {e}") })?
            .ok_or(TimelineError::NotFound)?;
        Ok(row.into())
    }

    async fn upsert_account(&self, account: Account) -> Result<Account, TimelineError> {
        let row: AccountRow = sqlx::query_as(
            "INSERT INTO accounts (id, profile_id, platform, platform_user_id, platform_handle,
                access_token_ciphertext, refresh_token_ciphertext, token_expires_at, is_active,
                last_fetched_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             ON CONFLICT (profile_id, platform, platform_user_id) DO UPDATE SET
                platform_handle = EXCLUDED.platform_handle,
                access_token_ciphertext = EXCLUDED.access_token_ciphertext,
                refresh_token_ciphertext = EXCLUDED.refresh_token_ciphertext,
                token_expires_at = EXCLUDED.token_expires_at,
                is_active = TRUE,
                updated_at = EXCLUDED.updated_at
             RETURNING *",
        )
        .bind(account.id.0)
        .bind(account.profile_id.0)
        .bind(account.platform.as_str())
        .bind(&account.platform_user_id)
        .bind(&account.platform_handle)
        .bind(&account.access_token_ciphertext)
        .bind(&account.refresh_token_ciphertext)
        .bind(account.token_expires_at)
        .bind(account.is_active)
        .bind(account.last_fetched_at)
        .bind(account.created_at)
        .bind(account.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TimelineError::StoreError { operation: format!("upsert_account: {e}") })?;
        row.try_into()
    }

    async fn find_account(&self, platform: Platform, platform_user_id: &str) -> Result<Option<Account>, TimelineError> {
        let row: Option<AccountRow> = sqlx::query_as("SELECT * FROM accounts WHERE platform = $1 AND platform_user_id = $2")
            .bind(platform.as_str())
            .bind(platform_user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TimelineError::StoreError { operation: format!("find_account: {e}") })?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_account(&self, id: AccountId) -> Result<Account, TimelineError> {
        let row: AccountRow = sqlx::query_as("SELECT * FROM accounts WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TimelineError::StoreError { operation: format!("get_account: {e}") })?
            .ok_or(TimelineError::NotFound)?;
        row.try_into()
    }

    async fn list_active_accounts(&self) -> Result<Vec<Account>, TimelineError> {
        let rows: Vec<AccountRow> = sqlx::query_as("SELECT * FROM accounts WHERE is_active")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TimelineError::StoreError { operation: format!("list_active_accounts: {e}") })?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_accounts_for_profile(&self, profile_id: ProfileId) -> Result<Vec<Account>, TimelineError> {
        let rows: Vec<AccountRow> = sqlx::query_as("SELECT * FROM accounts WHERE profile_id = $1")
            .bind(profile_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TimelineError::StoreError { operation: format!("list_accounts_for_profile: {e}") })?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn deactivate_account(&self, id: AccountId) -> Result<(), TimelineError> {
        let result = sqlx::query("UPDATE accounts SET is_active = FALSE, updated_at = now() WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| TimelineError::StoreError { operation: format!("deactivate_account: {e}") })?;
        if result.rows_affected() == 0 {
            return Err(TimelineError::NotFound);
        }
        Ok(())
    }

    async fn touch_last_fetched(&self, id: AccountId) -> Result<(), TimelineError> {
        sqlx::query("UPDATE accounts SET last_fetched_at = now() WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| TimelineError::StoreError { operation: format!("touch_last_fetched: {e}") })?;
        Ok(())
    }

    async fn get_profile(&self, id: ProfileId) -> Result<Profile, TimelineError> {
        let row = sqlx::query_as::<_, (uuid::Uuid, uuid::Uuid, String, String, Option<String>, chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)>(
            "SELECT id, user_id, slug, name, description, created_at, updated_at FROM profiles WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TimelineError::StoreError { operation: format!("get_profile: {e}") })?
        .ok_or(TimelineError::NotFound)?;
        Ok(Profile {
            id: row.0.into(),
            user_id: row.1.into(),
            slug: row.2,
            name: row.3,
            description: row.4,
            created_at: row.5,
            updated_at: row.6,
        })
    }

    async fn list_profiles_for_user(&self, user_id: UserId) -> Result<Vec<Profile>, TimelineError> {
        let rows = sqlx::query_as::<_, (uuid::Uuid, uuid::Uuid, String, String, Option<String>, chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)>(
            "SELECT id, user_id, slug, name, description, created_at, updated_at FROM profiles WHERE user_id = $1",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TimelineError::StoreError { operation: format!("list_profiles_for_user: {e}") })?;
        Ok(rows
            .into_iter()
            .map(|row| Profile {
                id: row.0.into(),
                user_id: row.1.into(),
                slug: row.2,
                name: row.3,
                description: row.4,
                created_at: row.5,
                updated_at: row.6,
            })
            .collect())
    }

    async fn list_filters_for_profile(&self, profile_id: ProfileId) -> Result<Vec<ProfileFilter>, TimelineError> {
        let rows = sqlx::query_as::<_, (uuid::Uuid, uuid::Uuid, uuid::Uuid, String, String, String)>(
            "SELECT id, profile_id, account_id, kind, filter_key, filter_value FROM profile_filters WHERE profile_id = $1",
        )
        .bind(profile_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TimelineError::StoreError { operation: format!("list_filters_for_profile: {e}") })?;

        rows.into_iter()
            .map(|row| {
                let kind = match row.3.as_str() {
                    "exclude" => FilterKind::Exclude,
                    _ => FilterKind::Include,
                };
                let key = match row.4.as_str() {
                    "subreddit" => FilterKey::Subreddit,
                    "keyword" => FilterKey::Keyword,
                    "account_handle" => FilterKey::AccountHandle,
                    _ => FilterKey::Repo,
                };
                Ok(ProfileFilter {
                    id: ProfileFilterId(row.0),
                    profile_id: row.1.into(),
                    account_id: row.2.into(),
                    kind,
                    key,
                    value: row.5,
                })
            })
            .collect()
    }

    async fn find_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, TimelineError> {
        let row = sqlx::query_as::<_, (uuid::Uuid, uuid::Uuid, String, String, Option<chrono::DateTime<chrono::Utc>>, chrono::DateTime<chrono::Utc>)>(
            "SELECT id, user_id, key_hash, name, last_used_at, created_at FROM api_keys WHERE key_hash = $1",
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TimelineError::StoreError { operation: format!("find_api_key_by_hash: {e}") })?;
        Ok(row.map(|r| ApiKey {
            id: ApiKeyId(r.0),
            user_id: r.1.into(),
            key_hash: r.2,
            name: r.3,
            last_used_at: r.4,
            created_at: r.5,
        }))
    }

    async fn touch_api_key_usage(&self, id: ApiKeyId) -> Result<(), TimelineError> {
        sqlx::query("UPDATE api_keys SET last_used_at = now() WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| TimelineError::StoreError { operation: format!("touch_api_key_usage: {e}") })?;
        Ok(())
    }

    async fn get_rate_limit_state(&self, account_id: AccountId) -> Result<Option<RateLimitState>, TimelineError> {
        let row = sqlx::query_as::<_, (uuid::Uuid, Option<i32>, Option<i32>, Option<chrono::DateTime<chrono::Utc>>, i32, Option<chrono::DateTime<chrono::Utc>>, Option<chrono::DateTime<chrono::Utc>>)>(
            "SELECT account_id, remaining, limit_total, reset_at, consecutive_failures, last_failure_at, circuit_open_until
             FROM rate_limits WHERE account_id = $1",
        )
        .bind(account_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TimelineError::StoreError { operation: format!("get_rate_limit_state: {e}") })?;
        Ok(row.map(|r| RateLimitState {
            account_id: r.0.into(),
            remaining: r.1.map(|v| v as u32),
            limit_total: r.2.map(|v| v as u32),
            reset_at: r.3,
            consecutive_failures: r.4 as u32,
            last_failure_at: r.5,
            circuit_open_until: r.6,
        }))
    }

    async fn upsert_rate_limit_state(&self, state: RateLimitState) -> Result<(), TimelineError> {
        sqlx::query(
            "INSERT INTO rate_limits (account_id, remaining, limit_total, reset_at, consecutive_failures, last_failure_at, circuit_open_until)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (account_id) DO UPDATE SET
                remaining = EXCLUDED.remaining,
                limit_total = EXCLUDED.limit_total,
                reset_at = EXCLUDED.reset_at,
                consecutive_failures = EXCLUDED.consecutive_failures,
                last_failure_at = EXCLUDED.last_failure_at,
                circuit_open_until = EXCLUDED.circuit_open_until",
        )
        .bind(state.account_id.0)
        .bind(state.remaining.map(|v| v as i32))
        .bind(state.limit_total.map(|v| v as i32))
        .bind(state.reset_at)
        .bind(state.consecutive_failures as i32)
        .bind(state.last_failure_at)
        .bind(state.circuit_open_until)
        .execute(&self.pool)
        .await
        .map_err(|e| TimelineError::StoreError { operation: format!("upsert_rate_limit_state: {e}") })?;
        Ok(())
    }
}
