use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::error;

use crate::config::AppConfig;

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("database failure: {0}")]
    DatabaseError(String),

    #[error("not found")]
    NotFound,

    #[error("uniqueness violation on {0} ({1})")]
    UniqueViolation(String, String),

    #[error("foreign key violation on {0} ({1})")]
    ForeignKeyViolation(String, String),

    #[error("integrity check failed on {0} ({1})")]
    CheckViolation(String, String),
}

pub fn handle_sql_error(err: sqlx::Error) -> RepoError {
    use sqlx::Error as E;

    match err {
        E::RowNotFound => RepoError::NotFound,
        E::Database(ref e) => {
            let constraint = e.constraint().unwrap_or_default().to_string();
            let table = e.table().unwrap_or_default().to_string();

            if e.is_unique_violation() {
                return RepoError::UniqueViolation(table, constraint);
            }
            if e.is_foreign_key_violation() {
                return RepoError::ForeignKeyViolation(table, constraint);
            }
            if e.is_check_violation() {
                return RepoError::CheckViolation(table, constraint);
            }

            error!(error = %err, "sql error");
            RepoError::DatabaseError(err.to_string())
        }
        other => {
            error!(error = %other, "sql error");
            RepoError::DatabaseError(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            handle_sql_error(sqlx::Error::RowNotFound),
            RepoError::NotFound
        ));
    }

    #[test]
    fn other_errors_keep_their_message() {
        let err = handle_sql_error(sqlx::Error::PoolTimedOut);
        match err {
            RepoError::DatabaseError(msg) => assert!(!msg.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
