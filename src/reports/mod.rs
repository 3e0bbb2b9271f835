use thiserror::Error;

use crate::credentials::repo_types::Credential;

mod excel;
mod pdf;

pub use excel::ExcelReport;
pub use pdf::PdfReport;

/// Column titles shared by every export format, in output order.
pub const COLUMNS: [&str; 5] = ["Platform", "URL", "Username", "Password", "Date created"];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("excel rendering failed: {0}")]
    Excel(#[from] rust_xlsxwriter::XlsxError),

    #[error("pdf rendering failed: {0}")]
    Pdf(String),

    #[error("date formatting failed: {0}")]
    Format(#[from] time::error::Format),
}

/// Stateless formatter turning an ordered credential list into a document.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, rows: &[Credential]) -> Result<Vec<u8>, ReportError>;
    fn content_type(&self) -> &'static str;
    fn file_name(&self) -> &'static str;
}

/// A rendered document ready to be sent as a download.
#[derive(Debug)]
pub struct Report {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: &'static str,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use time::macros::date;
    use uuid::Uuid;

    use crate::credentials::repo_types::Credential;

    pub fn sample_rows() -> Vec<Credential> {
        let owner = Uuid::new_v4();
        vec![
            Credential {
                id: Uuid::new_v4(),
                user_id: owner,
                name: "GitHub".into(),
                url: "https://github.com".into(),
                username: "octocat".into(),
                password: "p4ss".into(),
                created_date: date!(2024 - 12 - 10),
            },
            Credential {
                id: Uuid::new_v4(),
                user_id: owner,
                name: "A platform with a remarkably long name".into(),
                url: "https://example.com/some/very/long/path/that/overflows".into(),
                username: "someone".into(),
                password: "hunter2".into(),
                created_date: date!(2025 - 01 - 31),
            },
        ]
    }
}
