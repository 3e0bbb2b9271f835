use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::repo::CredentialRepository;
use super::repo_types::{Credential, NewCredential};
use crate::db::RepoError;

/// Test double with the same ordering and `(user_id, name)` uniqueness as Postgres.
#[derive(Default)]
pub struct InMemoryCredentialRepository {
    rows: Mutex<Vec<Credential>>,
}

fn unique_violation() -> RepoError {
    RepoError::UniqueViolation("credentials".into(), "credentials_user_name_idx".into())
}

impl InMemoryCredentialRepository {
    fn owned_sorted(&self, owner_id: Uuid) -> Vec<Credential> {
        let rows = self.rows.lock().unwrap();
        let mut owned: Vec<Credential> = rows
            .iter()
            .filter(|c| c.user_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| (a.created_date, &a.name).cmp(&(b.created_date, &b.name)));
        owned
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn find_page_by_owner(
        &self,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Credential>, i64), RepoError> {
        let owned = self.owned_sorted(owner_id);
        let total = owned.len() as i64;
        let page = owned
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_all_by_owner(&self, owner_id: Uuid) -> Result<Vec<Credential>, RepoError> {
        Ok(self.owned_sorted(owner_id))
    }

    async fn find_by_id_and_owner(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Credential>, RepoError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|c| c.id == id && c.user_id == owner_id).cloned())
    }

    async fn find_by_name_and_owner(
        &self,
        name: &str,
        owner_id: Uuid,
    ) -> Result<Option<Credential>, RepoError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|c| c.name == name && c.user_id == owner_id).cloned())
    }

    async fn exists_by_owner_and_name(
        &self,
        owner_id: Uuid,
        name: &str,
    ) -> Result<bool, RepoError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().any(|c| c.user_id == owner_id && c.name == name))
    }

    async fn insert(&self, new: &NewCredential) -> Result<Credential, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|c| c.user_id == new.user_id && c.name == new.name) {
            return Err(unique_violation());
        }
        let stored = Credential {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            name: new.name.clone(),
            url: new.url.clone(),
            username: new.username.clone(),
            password: new.password.clone(),
            created_date: new.created_date,
        };
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, credential: &Credential) -> Result<Option<Credential>, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|c| {
            c.user_id == credential.user_id && c.name == credential.name && c.id != credential.id
        }) {
            return Err(unique_violation());
        }
        let Some(row) = rows
            .iter_mut()
            .find(|c| c.id == credential.id && c.user_id == credential.user_id)
        else {
            return Ok(None);
        };
        row.name = credential.name.clone();
        row.url = credential.url.clone();
        row.username = credential.username.clone();
        row.password = credential.password.clone();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<bool, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| !(c.id == id && c.user_id == owner_id));
        Ok(rows.len() != before)
    }
}
