use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::db::{handle_sql_error, RepoError};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    /// Fails with `UniqueViolation` when the username is taken.
    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        roles: &[String],
    ) -> Result<User, RepoError>;
}

pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, roles, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .map_err(handle_sql_error)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, roles, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(handle_sql_error)
    }

    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        roles: &[String],
    ) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, roles)
            VALUES ($1, $2, $3)
            RETURNING id, username, password_hash, roles, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(roles)
        .fetch_one(&self.db)
        .await
        .map_err(handle_sql_error)
    }
}
