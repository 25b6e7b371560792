use crate::domain::token::OAuthToken;
use crate::error::Result;
use crate::storage::{DbPool, TokenStore};
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Postgres-backed token store. One row per user, replaced on save.
#[derive(Clone, Debug)]
pub struct PgTokenStore {
    pool: DbPool,
}

impl PgTokenStore {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TokenRecord {
    access_token: String,
    refresh_token: Option<String>,
    token_type: String,
    scope: Option<String>,
    expires_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl From<TokenRecord> for OAuthToken {
    fn from(record: TokenRecord) -> Self {
        Self {
            access_token: record.access_token,
            refresh_token: record.refresh_token,
            token_type: record.token_type,
            scope: record.scope,
            expires_at: record.expires_at,
            created_at: record.created_at,
        }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn load(&self, user_id: Uuid) -> Result<Option<OAuthToken>> {
        let record: Option<TokenRecord> = sqlx::query_as(
            r#"
            SELECT access_token, refresh_token, token_type, scope, expires_at, created_at
            FROM oauth_tokens
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(OAuthToken::from))
    }

    async fn save(&self, user_id: Uuid, token: &OAuthToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO oauth_tokens (user_id, access_token, refresh_token, token_type, scope, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                token_type = EXCLUDED.token_type,
                scope = EXCLUDED.scope,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(user_id)
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(&token.token_type)
        .bind(&token.scope)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM oauth_tokens WHERE user_id = $1").bind(user_id).execute(&self.pool).await?;
        Ok(())
    }
}
