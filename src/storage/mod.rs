use crate::domain::token::OAuthToken;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub mod memory;
pub mod token_repo;

pub type DbPool = Pool<Postgres>;

/// Initializes the database connection pool.
///
/// # Errors
/// Returns `sqlx::Error` if the connection fails.
pub async fn init_pool(database_url: &str) -> Result<DbPool> {
    Ok(PgPoolOptions::new().max_connections(20).connect(database_url).await?)
}

/// Token persistence, keyed by the owning user's identity. One record per
/// user; `save` replaces any existing record.
#[async_trait]
pub trait TokenStore: Send + Sync + std::fmt::Debug {
    async fn load(&self, user_id: Uuid) -> Result<Option<OAuthToken>>;

    async fn save(&self, user_id: Uuid, token: &OAuthToken) -> Result<()>;

    async fn delete(&self, user_id: Uuid) -> Result<()>;
}
