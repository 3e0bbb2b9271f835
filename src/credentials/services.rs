use std::sync::Arc;

use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CredentialDto, CredentialInput, Page},
    repo::CredentialRepository,
    repo_types::{Credential, NewCredential},
};
use crate::{
    db::RepoError,
    error::AppError,
    reports::{ExcelReport, PdfReport, Report, ReportRenderer},
    state::AppState,
};

/// What `list_all` does when the owner has nothing stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPolicy {
    Allow,
    Fail,
}

/// Business rules for an owner's credentials. Every call is scoped to `owner_id`.
#[derive(Clone)]
pub struct CredentialService {
    repo: Arc<dyn CredentialRepository>,
    excel: Arc<dyn ReportRenderer>,
    pdf: Arc<dyn ReportRenderer>,
}

impl FromRef<AppState> for CredentialService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.credentials.clone())
    }
}

fn duplicate_name(name: &str) -> AppError {
    AppError::Conflict(format!("A credential named '{name}' already exists"))
}

fn not_found_id(id: &str) -> AppError {
    AppError::NotFound(format!("Credential {id} not found"))
}

/// The store's unique index is the last word on `(owner, name)` clashes.
fn conflict_on_unique(name: &str) -> impl FnOnce(RepoError) -> AppError + '_ {
    move |e| match e {
        RepoError::UniqueViolation(..) => duplicate_name(name),
        other => other.into(),
    }
}

fn require_input(input: Option<CredentialInput>) -> Result<CredentialInput, AppError> {
    let input =
        input.ok_or_else(|| AppError::InvalidArgument("Credential body is required".into()))?;
    if input.name.trim().is_empty() {
        return Err(AppError::InvalidArgument("Credential name must not be empty".into()));
    }
    Ok(input)
}

impl CredentialService {
    pub fn new(repo: Arc<dyn CredentialRepository>) -> Self {
        Self {
            repo,
            excel: Arc::new(ExcelReport),
            pdf: Arc::new(PdfReport),
        }
    }

    #[cfg(test)]
    pub fn with_renderers(
        mut self,
        excel: Arc<dyn ReportRenderer>,
        pdf: Arc<dyn ReportRenderer>,
    ) -> Self {
        self.excel = excel;
        self.pdf = pdf;
        self
    }

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    pub async fn list_page(
        &self,
        owner_id: Uuid,
        page: i64,
        size: i64,
    ) -> Result<Page<CredentialDto>, AppError> {
        if page < 0 || size <= 0 {
            warn!(page, size, "invalid pagination");
            return Err(AppError::InvalidArgument(
                "Pagination requires page >= 0 and size > 0".into(),
            ));
        }
        let offset = page
            .checked_mul(size)
            .ok_or_else(|| AppError::InvalidArgument("Page offset is out of range".into()))?;

        let (rows, total) = self.repo.find_page_by_owner(owner_id, size, offset).await?;
        if rows.is_empty() {
            warn!(page, size, total, "no credentials on page");
            return Err(AppError::EmptyResult(
                "No credentials registered for this page".into(),
            ));
        }

        info!(page, size, count = rows.len(), "credential page listed");
        Ok(Page::new(
            rows.into_iter().map(CredentialDto::from).collect(),
            page,
            size,
            total,
        ))
    }

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    pub async fn get_by_name(&self, owner_id: Uuid, name: &str) -> Result<CredentialDto, AppError> {
        if name.is_empty() {
            warn!("empty name lookup");
            return Err(AppError::InvalidArgument("Name must not be empty".into()));
        }

        let found = self.repo.find_by_name_and_owner(name, owner_id).await?;
        let Some(credential) = found else {
            warn!(name, "credential not found by name");
            return Err(AppError::NotFound(format!("Credential '{name}' not found")));
        };
        Ok(credential.into())
    }

    #[instrument(skip(self, input), fields(owner_id = %owner_id))]
    pub async fn create(
        &self,
        owner_id: Uuid,
        input: Option<CredentialInput>,
    ) -> Result<CredentialDto, AppError> {
        let input = require_input(input).inspect_err(|e| warn!(error = %e, "create rejected"))?;

        if self.repo.exists_by_owner_and_name(owner_id, &input.name).await? {
            warn!(name = %input.name, "duplicate credential name");
            return Err(duplicate_name(&input.name));
        }
        if let Some(client_date) = input.created_date {
            debug!(%client_date, "client created_date ignored");
        }

        let new = NewCredential {
            user_id: owner_id,
            name: input.name,
            url: input.url,
            username: input.username,
            password: input.password,
            created_date: OffsetDateTime::now_utc().date(),
        };
        let saved = self
            .repo
            .insert(&new)
            .await
            .map_err(conflict_on_unique(&new.name))?;

        info!(credential_id = %saved.id, name = %saved.name, "credential created");
        Ok(saved.into())
    }

    #[instrument(skip(self, input), fields(owner_id = %owner_id))]
    pub async fn update(
        &self,
        owner_id: Uuid,
        id: &str,
        input: Option<CredentialInput>,
    ) -> Result<CredentialDto, AppError> {
        if id.is_empty() {
            warn!("update without id");
            return Err(AppError::InvalidArgument("Id must not be empty".into()));
        }
        let input = require_input(input).inspect_err(|e| warn!(id, error = %e, "update rejected"))?;

        let existing = self.owned(owner_id, id).await?;

        if existing.name != input.name
            && self.repo.exists_by_owner_and_name(owner_id, &input.name).await?
        {
            warn!(id, name = %input.name, "rename clashes with existing credential");
            return Err(duplicate_name(&input.name));
        }

        let changed = Credential {
            name: input.name,
            url: input.url,
            username: input.username,
            password: input.password,
            ..existing
        };
        let saved = self
            .repo
            .update(&changed)
            .await
            .map_err(conflict_on_unique(&changed.name))?
            .ok_or_else(|| not_found_id(id))?;

        info!(credential_id = %saved.id, "credential updated");
        Ok(saved.into())
    }

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    pub async fn delete(&self, owner_id: Uuid, id: &str) -> Result<(), AppError> {
        if id.is_empty() {
            warn!("delete without id");
            return Err(AppError::InvalidArgument("Id must not be empty".into()));
        }

        let existing = self.owned(owner_id, id).await?;
        if !self.repo.delete(existing.id, owner_id).await? {
            warn!(id, "credential vanished before delete");
            return Err(not_found_id(id));
        }

        info!(credential_id = %existing.id, "credential deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    pub async fn list_all(
        &self,
        owner_id: Uuid,
        policy: EmptyPolicy,
    ) -> Result<Vec<CredentialDto>, AppError> {
        let rows = self.repo.find_all_by_owner(owner_id).await?;
        if rows.is_empty() && policy == EmptyPolicy::Fail {
            warn!("owner has no credentials");
            return Err(AppError::EmptyResult("No credentials registered".into()));
        }
        Ok(rows.into_iter().map(CredentialDto::from).collect())
    }

    pub async fn export_excel(&self, owner_id: Uuid) -> Result<Report, AppError> {
        self.export(owner_id, self.excel.clone()).await
    }

    pub async fn export_pdf(&self, owner_id: Uuid) -> Result<Report, AppError> {
        self.export(owner_id, self.pdf.clone()).await
    }

    #[instrument(skip(self, renderer), fields(owner_id = %owner_id, file = renderer.file_name()))]
    async fn export(
        &self,
        owner_id: Uuid,
        renderer: Arc<dyn ReportRenderer>,
    ) -> Result<Report, AppError> {
        let rows = self.repo.find_all_by_owner(owner_id).await?;
        if rows.is_empty() {
            warn!("nothing to export");
            return Err(AppError::EmptyResult("No credentials registered to export".into()));
        }

        let content_type = renderer.content_type();
        let file_name = renderer.file_name();
        let bytes = tokio::task::spawn_blocking(move || renderer.render(&rows))
            .await
            .map_err(|e| AppError::ExportFailure(format!("Report task failed: {e}")))?
            .map_err(|e| {
                warn!(error = %e, "report rendering failed");
                AppError::ExportFailure(format!("Could not generate {file_name}: {e}"))
            })?;

        info!(size = bytes.len(), "report exported");
        Ok(Report {
            bytes,
            content_type,
            file_name,
        })
    }

    /// Loads `id` for `owner_id`; foreign, missing and malformed ids all read as absent.
    async fn owned(&self, owner_id: Uuid, id: &str) -> Result<Credential, AppError> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            warn!(id, "malformed credential id");
            return Err(not_found_id(id));
        };
        self.repo
            .find_by_id_and_owner(uuid, owner_id)
            .await?
            .ok_or_else(|| {
                warn!(id, "credential not found for owner");
                not_found_id(id)
            })
    }
}
