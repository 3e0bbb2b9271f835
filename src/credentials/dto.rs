use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::repo_types::Credential;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDto {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(with = "iso_date")]
    pub created_date: Date,
}

impl From<Credential> for CredentialDto {
    fn from(c: Credential) -> Self {
        Self {
            id: c.id,
            name: c.name,
            url: c.url,
            username: c.username,
            password: c.password,
            created_date: c.created_date,
        }
    }
}

/// Body of create and update requests.
///
/// `created_date` is tolerated for older clients but the server always
/// keeps its own date.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, with = "iso_date::option")]
    pub created_date: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

fn default_size() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ListAllQuery {
    #[serde(default)]
    pub allow_empty: bool,
}

/// Offset-based slice of an owner's credentials plus totals.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, page: i64, size: i64, total_elements: i64) -> Self {
        // ceil(total / size) without `total + size - 1`, which overflows for huge sizes
        let total_pages = if size > 0 && total_elements > 0 {
            (total_elements - 1) / size + 1
        } else {
            0
        };
        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}
