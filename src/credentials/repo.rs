use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Credential, NewCredential};
use crate::db::{handle_sql_error, RepoError};

/// Owner-scoped access to stored credentials.
///
/// Listings are ordered by `created_date`, then `name`. Inserts and updates
/// fail with `RepoError::UniqueViolation` when `(user_id, name)` is taken.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Returns the requested slice together with the owner's total count.
    async fn find_page_by_owner(
        &self,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Credential>, i64), RepoError>;

    async fn find_all_by_owner(&self, owner_id: Uuid) -> Result<Vec<Credential>, RepoError>;

    async fn find_by_id_and_owner(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Credential>, RepoError>;

    async fn find_by_name_and_owner(
        &self,
        name: &str,
        owner_id: Uuid,
    ) -> Result<Option<Credential>, RepoError>;

    async fn exists_by_owner_and_name(&self, owner_id: Uuid, name: &str) -> Result<bool, RepoError>;

    async fn insert(&self, new: &NewCredential) -> Result<Credential, RepoError>;

    /// Overwrites the mutable fields; `None` if the row vanished meanwhile.
    async fn update(&self, credential: &Credential) -> Result<Option<Credential>, RepoError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<bool, RepoError>;
}

pub struct PgCredentialRepository {
    db: PgPool,
}

impl PgCredentialRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialRepository for PgCredentialRepository {
    async fn find_page_by_owner(
        &self,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Credential>, i64), RepoError> {
        let rows = sqlx::query_as::<_, Credential>(
            r#"
            SELECT id, user_id, name, url, username, password, created_date
            FROM credentials
            WHERE user_id = $1
            ORDER BY created_date ASC, name ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .map_err(handle_sql_error)?;

        let total: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM credentials WHERE user_id = $1"#)
                .bind(owner_id)
                .fetch_one(&self.db)
                .await
                .map_err(handle_sql_error)?;

        Ok((rows, total))
    }

    async fn find_all_by_owner(&self, owner_id: Uuid) -> Result<Vec<Credential>, RepoError> {
        sqlx::query_as::<_, Credential>(
            r#"
            SELECT id, user_id, name, url, username, password, created_date
            FROM credentials
            WHERE user_id = $1
            ORDER BY created_date ASC, name ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await
        .map_err(handle_sql_error)
    }

    async fn find_by_id_and_owner(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Credential>, RepoError> {
        sqlx::query_as::<_, Credential>(
            r#"
            SELECT id, user_id, name, url, username, password, created_date
            FROM credentials
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await
        .map_err(handle_sql_error)
    }

    async fn find_by_name_and_owner(
        &self,
        name: &str,
        owner_id: Uuid,
    ) -> Result<Option<Credential>, RepoError> {
        sqlx::query_as::<_, Credential>(
            r#"
            SELECT id, user_id, name, url, username, password, created_date
            FROM credentials
            WHERE name = $1 AND user_id = $2
            "#,
        )
        .bind(name)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await
        .map_err(handle_sql_error)
    }

    async fn exists_by_owner_and_name(
        &self,
        owner_id: Uuid,
        name: &str,
    ) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM credentials WHERE user_id = $1 AND name = $2)"#,
        )
        .bind(owner_id)
        .bind(name)
        .fetch_one(&self.db)
        .await
        .map_err(handle_sql_error)
    }

    async fn insert(&self, new: &NewCredential) -> Result<Credential, RepoError> {
        sqlx::query_as::<_, Credential>(
            r#"
            INSERT INTO credentials (user_id, name, url, username, password, created_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, name, url, username, password, created_date
            "#,
        )
        .bind(new.user_id)
        .bind(&new.name)
        .bind(&new.url)
        .bind(&new.username)
        .bind(&new.password)
        .bind(new.created_date)
        .fetch_one(&self.db)
        .await
        .map_err(handle_sql_error)
    }

    async fn update(&self, credential: &Credential) -> Result<Option<Credential>, RepoError> {
        sqlx::query_as::<_, Credential>(
            r#"
            UPDATE credentials
               SET name = $3, url = $4, username = $5, password = $6
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, name, url, username, password, created_date
            "#,
        )
        .bind(credential.id)
        .bind(credential.user_id)
        .bind(&credential.name)
        .bind(&credential.url)
        .bind(&credential.username)
        .bind(&credential.password)
        .fetch_optional(&self.db)
        .await
        .map_err(handle_sql_error)
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(r#"DELETE FROM credentials WHERE id = $1 AND user_id = $2"#)
            .bind(id)
            .bind(owner_id)
            .execute(&self.db)
            .await
            .map_err(handle_sql_error)?;
        Ok(result.rows_affected() > 0)
    }
}
