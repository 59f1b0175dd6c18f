//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::id::RefreshSessionId;
use kernel::{AppError, UserId};
use platform::rate_limit::{RateLimitConfig, RateLimitDecision, RateLimitStore, RateLimitStoreError, now_ms};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{
    AuthHold, AuthProviderLink, Credential, EmailChangeVerification, OAuthProvider, OAuthState,
    PasswordReset, RefreshSession, User,
};
use crate::domain::repository::{
    CredentialRepository, EmailChangeRepository, NewAccount, OAuthRepository,
    PasswordResetRepository, RateLimitRepository, RefreshSessionRepository, UserRepository,
};
use crate::domain::value_object::{
    email::Email, public_id::PublicId, totp_secret::TotpSecret, user_name::UserName,
    user_password::UserPassword, user_role::UserRole, user_status::UserStatus,
};
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translate unique violations on account rows into domain conflicts
fn map_unique_violation(err: sqlx::Error) -> AuthError {
    let constraint = match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            db_err.constraint().map(str::to_owned)
        }
        _ => return AuthError::Database(err),
    };

    match constraint.as_deref() {
        Some("users_user_name_canonical_key") => AuthError::UserNameTaken,
        Some("users_email_key") => AuthError::EmailTaken,
        Some("auth_providers_pkey") => {
            AuthError::App(AppError::conflict("This provider account is already linked"))
        }
        _ => AuthError::Database(err),
    }
}

const USER_COLUMNS: &str = r#"
    user_id,
    public_id,
    user_name,
    email,
    email_verified,
    user_role,
    user_status,
    deletion_scheduled_at,
    last_login_at,
    created_at,
    updated_at
"#;

const SESSION_COLUMNS: &str = r#"
    session_id,
    user_id,
    token_hash,
    remember_me,
    client_fingerprint_hash,
    client_ip,
    user_agent,
    expires_at,
    created_at,
    last_used_at
"#;

const HOLD_COLUMNS: &str = r#"
    hold_id,
    token_hash,
    provider,
    provider_user_id,
    email,
    suggested_user_name,
    expires_at,
    created_at
"#;

const EMAIL_CHANGE_COLUMNS: &str = r#"
    user_id,
    new_email,
    old_token_hash,
    new_token_hash,
    old_confirmed_at,
    new_confirmed_at,
    expires_at,
    created_at
"#;

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgAuthRepository {
    async fn create_account(&self, account: NewAccount<'_>) -> AuthResult<()> {
        let NewAccount {
            user,
            credential,
            link,
            consumed_hold,
        } = account;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                user_id,
                public_id,
                user_name,
                user_name_canonical,
                email,
                email_verified,
                user_role,
                user_status,
                deletion_scheduled_at,
                last_login_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.public_id.as_str())
        .bind(user.user_name.display())
        .bind(user.user_name.canonical())
        .bind(user.email.as_str())
        .bind(user.email_verified)
        .bind(user.user_role.id())
        .bind(user.user_status.id())
        .bind(user.deletion_scheduled_at)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        sqlx::query(
            r#"
            INSERT INTO auth_credentials (
                user_id,
                password_hash,
                totp_secret,
                totp_enabled,
                login_failed_count,
                last_failed_at,
                locked_until,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(credential.user_id.as_uuid())
        .bind(credential.password_hash.as_ref().map(|p| p.as_phc_string()))
        .bind(credential.totp_secret.as_ref().map(|s| s.as_base32()))
        .bind(credential.totp_enabled)
        .bind(credential.login_failed_count as i16)
        .bind(credential.last_failed_at)
        .bind(credential.locked_until)
        .bind(credential.created_at)
        .bind(credential.updated_at)
        .execute(&mut *tx)
        .await?;

        if let Some(link) = link {
            sqlx::query(
                r#"
                INSERT INTO auth_providers (user_id, provider, provider_user_id, created_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(link.user_id.as_uuid())
            .bind(link.provider.code())
            .bind(&link.provider_user_id)
            .bind(link.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_unique_violation)?;
        }

        if let Some(hold_id) = consumed_hold {
            sqlx::query("DELETE FROM auth_holds WHERE hold_id = $1")
                .bind(hold_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_public_id(&self, public_id: &PublicId) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE public_id = $1"
        ))
        .bind(public_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_user_name(&self, canonical: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_name_canonical = $1"
        ))
        .bind(canonical)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn exists_by_user_name(&self, canonical: &str) -> AuthResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE user_name_canonical = $1)",
        )
        .bind(canonical)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn update_user(&self, user: &User) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                user_name = $2,
                user_name_canonical = $3,
                email = $4,
                email_verified = $5,
                user_role = $6,
                user_status = $7,
                deletion_scheduled_at = $8,
                last_login_at = $9,
                updated_at = $10
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.user_name.display())
        .bind(user.user_name.canonical())
        .bind(user.email.as_str())
        .bind(user.email_verified)
        .bind(user.user_role.id())
        .bind(user.user_status.id())
        .bind(user.deletion_scheduled_at)
        .bind(user.last_login_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(())
    }

    async fn purge_due_deletions(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        // Owned rows go with the user through ON DELETE CASCADE
        let deleted = sqlx::query(
            "DELETE FROM users WHERE user_status = $1 AND deletion_scheduled_at <= $2",
        )
        .bind(UserStatus::PendingDeletion.id())
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Credential Repository Implementation
// ============================================================================

impl CredentialRepository for PgAuthRepository {
    async fn find_credential(&self, user_id: &UserId) -> AuthResult<Option<Credential>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT
                user_id,
                password_hash,
                totp_secret,
                totp_enabled,
                login_failed_count,
                last_failed_at,
                locked_until,
                created_at,
                updated_at
            FROM auth_credentials
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CredentialRow::into_credential).transpose()
    }

    async fn update_credential(&self, credential: &Credential) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE auth_credentials SET
                password_hash = $2,
                totp_secret = $3,
                totp_enabled = $4,
                login_failed_count = $5,
                last_failed_at = $6,
                locked_until = $7,
                updated_at = $8
            WHERE user_id = $1
            "#,
        )
        .bind(credential.user_id.as_uuid())
        .bind(credential.password_hash.as_ref().map(|p| p.as_phc_string()))
        .bind(credential.totp_secret.as_ref().map(|s| s.as_base32()))
        .bind(credential.totp_enabled)
        .bind(credential.login_failed_count as i16)
        .bind(credential.last_failed_at)
        .bind(credential.locked_until)
        .bind(credential.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Refresh Session Repository Implementation
// ============================================================================

impl RefreshSessionRepository for PgAuthRepository {
    async fn create_session(&self, session: &RefreshSession) -> AuthResult<()> {
        sqlx::query(&format!(
            "INSERT INTO refresh_sessions ({SESSION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(session.session_id.as_uuid())
        .bind(session.user_id.as_uuid())
        .bind(&session.token_hash)
        .bind(session.remember_me)
        .bind(&session.client_fingerprint_hash)
        .bind(&session.client_ip)
        .bind(&session.user_agent)
        .bind(session.expires_at)
        .bind(session.created_at)
        .bind(session.last_used_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_session(&self, token_hash: &[u8]) -> AuthResult<Option<RefreshSession>> {
        let row = sqlx::query_as::<_, RefreshSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM refresh_sessions WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RefreshSessionRow::into_session))
    }

    async fn list_sessions(&self, user_id: &UserId) -> AuthResult<Vec<RefreshSession>> {
        let rows = sqlx::query_as::<_, RefreshSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM refresh_sessions \
             WHERE user_id = $1 AND expires_at > NOW() \
             ORDER BY last_used_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RefreshSessionRow::into_session).collect())
    }

    async fn rotate_session(
        &self,
        session: &RefreshSession,
        previous_hash: &[u8],
    ) -> AuthResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_sessions SET
                token_hash = $2,
                client_ip = $3,
                expires_at = $4,
                last_used_at = $5
            WHERE session_id = $1 AND token_hash = $6
            "#,
        )
        .bind(session.session_id.as_uuid())
        .bind(&session.token_hash)
        .bind(&session.client_ip)
        .bind(session.expires_at)
        .bind(session.last_used_at)
        .bind(previous_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_session(&self, session_id: &RefreshSessionId) -> AuthResult<()> {
        sqlx::query("DELETE FROM refresh_sessions WHERE session_id = $1")
            .bind(session_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn revoke_session(
        &self,
        user_id: &UserId,
        session_id: &RefreshSessionId,
    ) -> AuthResult<bool> {
        let deleted =
            sqlx::query("DELETE FROM refresh_sessions WHERE session_id = $1 AND user_id = $2")
                .bind(session_id.as_uuid())
                .bind(user_id.as_uuid())
                .execute(&self.pool)
                .await?
                .rows_affected();

        Ok(deleted > 0)
    }

    async fn revoke_all_sessions(
        &self,
        user_id: &UserId,
        except: Option<&RefreshSessionId>,
    ) -> AuthResult<u64> {
        let deleted = match except {
            Some(except_id) => {
                sqlx::query(
                    "DELETE FROM refresh_sessions WHERE user_id = $1 AND session_id != $2",
                )
                .bind(user_id.as_uuid())
                .bind(except_id.as_uuid())
                .execute(&self.pool)
                .await?
                .rows_affected()
            }
            None => sqlx::query("DELETE FROM refresh_sessions WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .execute(&self.pool)
                .await?
                .rows_affected(),
        };

        Ok(deleted)
    }

    async fn cleanup_expired_sessions(&self) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM refresh_sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// OAuth Repository Implementation
// ============================================================================

impl OAuthRepository for PgAuthRepository {
    async fn save_state(&self, state: &OAuthState) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO oauth_states (state_hash, provider, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&state.state_hash)
        .bind(state.provider.code())
        .bind(state.expires_at)
        .bind(state.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn take_state(&self, state_hash: &[u8]) -> AuthResult<Option<OAuthState>> {
        let row = sqlx::query_as::<_, OAuthStateRow>(
            r#"
            DELETE FROM oauth_states
            WHERE state_hash = $1
            RETURNING state_hash, provider, expires_at, created_at
            "#,
        )
        .bind(state_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(OAuthStateRow::into_state).transpose()
    }

    async fn find_link(
        &self,
        provider: OAuthProvider,
        provider_user_id: &str,
    ) -> AuthResult<Option<AuthProviderLink>> {
        let row = sqlx::query_as::<_, ProviderLinkRow>(
            r#"
            SELECT user_id, provider, provider_user_id, created_at
            FROM auth_providers
            WHERE provider = $1 AND provider_user_id = $2
            "#,
        )
        .bind(provider.code())
        .bind(provider_user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProviderLinkRow::into_link).transpose()
    }

    async fn list_links(&self, user_id: &UserId) -> AuthResult<Vec<AuthProviderLink>> {
        let rows = sqlx::query_as::<_, ProviderLinkRow>(
            r#"
            SELECT user_id, provider, provider_user_id, created_at
            FROM auth_providers
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProviderLinkRow::into_link).collect()
    }

    async fn save_hold(&self, hold: &AuthHold) -> AuthResult<()> {
        sqlx::query(&format!(
            "INSERT INTO auth_holds ({HOLD_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(hold.hold_id)
        .bind(&hold.token_hash)
        .bind(hold.provider.code())
        .bind(&hold.provider_user_id)
        .bind(hold.email.as_str())
        .bind(hold.suggested_user_name.as_ref().map(|n| n.display()))
        .bind(hold.expires_at)
        .bind(hold.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_hold(&self, token_hash: &[u8]) -> AuthResult<Option<AuthHold>> {
        let row = sqlx::query_as::<_, AuthHoldRow>(&format!(
            "SELECT {HOLD_COLUMNS} FROM auth_holds WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AuthHoldRow::into_hold).transpose()
    }

    async fn cleanup_expired_oauth(&self) -> AuthResult<u64> {
        let states = sqlx::query("DELETE FROM oauth_states WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?
            .rows_affected();

        let holds = sqlx::query("DELETE FROM auth_holds WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(states + holds)
    }
}

// ============================================================================
// Password Reset Repository Implementation
// ============================================================================

impl PasswordResetRepository for PgAuthRepository {
    async fn replace_password_reset(&self, reset: &PasswordReset) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM password_resets WHERE user_id = $1")
            .bind(reset.user_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO password_resets (token_hash, user_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&reset.token_hash)
        .bind(reset.user_id.as_uuid())
        .bind(reset.expires_at)
        .bind(reset.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_password_reset(&self, token_hash: &[u8]) -> AuthResult<Option<PasswordReset>> {
        let row = sqlx::query_as::<_, PasswordResetRow>(
            r#"
            SELECT token_hash, user_id, expires_at, created_at
            FROM password_resets
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PasswordResetRow::into_reset))
    }

    async fn delete_password_resets(&self, user_id: &UserId) -> AuthResult<()> {
        sqlx::query("DELETE FROM password_resets WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn cleanup_expired_password_resets(&self) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM password_resets WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Email Change Repository Implementation
// ============================================================================

impl EmailChangeRepository for PgAuthRepository {
    async fn replace_email_change(&self, verification: &EmailChangeVerification) -> AuthResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO email_change_verifications ({EMAIL_CHANGE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO UPDATE SET
                new_email = EXCLUDED.new_email,
                old_token_hash = EXCLUDED.old_token_hash,
                new_token_hash = EXCLUDED.new_token_hash,
                old_confirmed_at = EXCLUDED.old_confirmed_at,
                new_confirmed_at = EXCLUDED.new_confirmed_at,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at
            "#
        ))
        .bind(verification.user_id.as_uuid())
        .bind(verification.new_email.as_str())
        .bind(&verification.old_token_hash)
        .bind(&verification.new_token_hash)
        .bind(verification.old_confirmed_at)
        .bind(verification.new_confirmed_at)
        .bind(verification.expires_at)
        .bind(verification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_email_change(
        &self,
        token_hash: &[u8],
    ) -> AuthResult<Option<EmailChangeVerification>> {
        let row = sqlx::query_as::<_, EmailChangeRow>(&format!(
            "SELECT {EMAIL_CHANGE_COLUMNS} FROM email_change_verifications \
             WHERE old_token_hash = $1 OR new_token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(EmailChangeRow::into_verification))
    }

    async fn update_email_change(&self, verification: &EmailChangeVerification) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE email_change_verifications SET
                old_confirmed_at = $2,
                new_confirmed_at = $3
            WHERE user_id = $1
            "#,
        )
        .bind(verification.user_id.as_uuid())
        .bind(verification.old_confirmed_at)
        .bind(verification.new_confirmed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_email_change(&self, user_id: &UserId) -> AuthResult<()> {
        sqlx::query("DELETE FROM email_change_verifications WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn cleanup_expired_email_changes(&self) -> AuthResult<u64> {
        let deleted =
            sqlx::query("DELETE FROM email_change_verifications WHERE expires_at <= NOW()")
                .execute(&self.pool)
                .await?
                .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Rate Limiting
// ============================================================================

impl RateLimitStore for PgAuthRepository {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitDecision, RateLimitStoreError> {
        let now = now_ms();
        let window_start = config.window_start_ms(now);

        // A hit in a new window restarts the counter at 1
        let count = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO rate_limits (key, window_start_ms, count)
            VALUES ($1, $2, 1)
            ON CONFLICT (key) DO UPDATE SET
                count = CASE
                    WHEN rate_limits.window_start_ms = EXCLUDED.window_start_ms
                    THEN rate_limits.count + 1
                    ELSE 1
                END,
                window_start_ms = EXCLUDED.window_start_ms
            RETURNING count
            "#,
        )
        .bind(key)
        .bind(window_start)
        .fetch_one(&self.pool)
        .await?;

        Ok(config.decide(count.max(0) as u32, window_start, now))
    }
}

impl RateLimitRepository for PgAuthRepository {
    async fn cleanup_stale_rate_limits(&self, before_ms: i64) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM rate_limits WHERE window_start_ms < $1")
            .bind(before_ms)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

fn parse_provider(code: &str) -> AuthResult<OAuthProvider> {
    OAuthProvider::from_code(code)
        .ok_or_else(|| AuthError::Internal(format!("Unknown OAuth provider: {code}")))
}

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    public_id: String,
    user_name: String,
    email: String,
    email_verified: bool,
    user_role: i16,
    user_status: i16,
    deletion_scheduled_at: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AuthResult<User> {
        let public_id = PublicId::parse_str(&self.public_id)
            .map_err(|e| AuthError::Internal(format!("Invalid public_id: {e}")))?;
        let user_role = UserRole::from_id(self.user_role)
            .ok_or_else(|| AuthError::Internal(format!("Unknown user_role: {}", self.user_role)))?;
        let user_status = UserStatus::from_id(self.user_status).ok_or_else(|| {
            AuthError::Internal(format!("Unknown user_status: {}", self.user_status))
        })?;

        Ok(User {
            user_id: UserId::from_uuid(self.user_id),
            public_id,
            user_name: UserName::from_db(self.user_name),
            email: Email::from_db(self.email),
            email_verified: self.email_verified,
            user_role,
            user_status,
            deletion_scheduled_at: self.deletion_scheduled_at,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    user_id: Uuid,
    password_hash: Option<String>,
    totp_secret: Option<String>,
    totp_enabled: bool,
    login_failed_count: i16,
    last_failed_at: Option<DateTime<Utc>>,
    locked_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CredentialRow {
    fn into_credential(self) -> AuthResult<Credential> {
        let password_hash = self
            .password_hash
            .map(UserPassword::from_phc_string)
            .transpose()
            .map_err(|e| AuthError::Internal(format!("Invalid password hash: {e}")))?;

        let totp_secret = self
            .totp_secret
            .map(TotpSecret::from_base32)
            .transpose()
            .map_err(|e| AuthError::Internal(format!("Invalid TOTP secret: {e}")))?;

        Ok(Credential {
            user_id: UserId::from_uuid(self.user_id),
            password_hash,
            totp_secret,
            totp_enabled: self.totp_enabled,
            login_failed_count: self.login_failed_count.max(0) as u16,
            last_failed_at: self.last_failed_at,
            locked_until: self.locked_until,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RefreshSessionRow {
    session_id: Uuid,
    user_id: Uuid,
    token_hash: Vec<u8>,
    remember_me: bool,
    client_fingerprint_hash: Vec<u8>,
    client_ip: Option<String>,
    user_agent: Option<String>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
}

impl RefreshSessionRow {
    fn into_session(self) -> RefreshSession {
        RefreshSession {
            session_id: RefreshSessionId::from_uuid(self.session_id),
            user_id: UserId::from_uuid(self.user_id),
            token_hash: self.token_hash,
            remember_me: self.remember_me,
            client_fingerprint_hash: self.client_fingerprint_hash,
            client_ip: self.client_ip,
            user_agent: self.user_agent,
            expires_at: self.expires_at,
            created_at: self.created_at,
            last_used_at: self.last_used_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OAuthStateRow {
    state_hash: Vec<u8>,
    provider: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl OAuthStateRow {
    fn into_state(self) -> AuthResult<OAuthState> {
        Ok(OAuthState {
            state_hash: self.state_hash,
            provider: parse_provider(&self.provider)?,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProviderLinkRow {
    user_id: Uuid,
    provider: String,
    provider_user_id: String,
    created_at: DateTime<Utc>,
}

impl ProviderLinkRow {
    fn into_link(self) -> AuthResult<AuthProviderLink> {
        Ok(AuthProviderLink {
            user_id: UserId::from_uuid(self.user_id),
            provider: parse_provider(&self.provider)?,
            provider_user_id: self.provider_user_id,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AuthHoldRow {
    hold_id: Uuid,
    token_hash: Vec<u8>,
    provider: String,
    provider_user_id: String,
    email: String,
    suggested_user_name: Option<String>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl AuthHoldRow {
    fn into_hold(self) -> AuthResult<AuthHold> {
        Ok(AuthHold {
            hold_id: self.hold_id,
            token_hash: self.token_hash,
            provider: parse_provider(&self.provider)?,
            provider_user_id: self.provider_user_id,
            email: Email::from_db(self.email),
            suggested_user_name: self.suggested_user_name.map(UserName::from_db),
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PasswordResetRow {
    token_hash: Vec<u8>,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl PasswordResetRow {
    fn into_reset(self) -> PasswordReset {
        PasswordReset {
            token_hash: self.token_hash,
            user_id: UserId::from_uuid(self.user_id),
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EmailChangeRow {
    user_id: Uuid,
    new_email: String,
    old_token_hash: Vec<u8>,
    new_token_hash: Vec<u8>,
    old_confirmed_at: Option<DateTime<Utc>>,
    new_confirmed_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl EmailChangeRow {
    fn into_verification(self) -> EmailChangeVerification {
        EmailChangeVerification {
            user_id: UserId::from_uuid(self.user_id),
            new_email: Email::from_db(self.new_email),
            old_token_hash: self.old_token_hash,
            new_token_hash: self.new_token_hash,
            old_confirmed_at: self.old_confirmed_at,
            new_confirmed_at: self.new_confirmed_at,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}
