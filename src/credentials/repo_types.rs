use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

/// One stored platform login, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Credential {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub url: String,
    pub username: String,
    pub password: String,
    pub created_date: Date,
}

/// Insert payload; the store assigns `id`.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub user_id: Uuid,
    pub name: String,
    pub url: String,
    pub username: String,
    pub password: String,
    pub created_date: Date,
}
