//! HTTP routes for data exports
//!
//! - GET /downloaddata/excel/ - Workbook of journal entries and conversations
//! - GET /downloaddata/word/  - The same data as a Word document
//!
//! Any signed-in, active user may download.

use chrono::Utc;
use hyper::{Method, Response};
use std::sync::Arc;
use tracing::info;

use super::response::{attachment, error_response, method_not_allowed, not_found_response, BoxBody};
use crate::auth::resolve_principal;
use crate::export::{self, excel, word, ExportData, ExportFile};
use crate::server::AppState;
use crate::types::{EncvError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Excel,
    Word,
}

impl ExportFormat {
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/downloaddata/excel" => Some(ExportFormat::Excel),
            "/downloaddata/word" => Some(ExportFormat::Word),
            _ => None,
        }
    }
}

/// Build an export, keeping a copy in the export directory if configured
pub async fn build_export(state: &AppState, format: ExportFormat) -> Result<ExportFile> {
    let data = ExportData::load(&state.store).await?;
    let now = Utc::now();

    let file = match format {
        ExportFormat::Excel => excel::create_workbook(&data, &state.links, now)?,
        ExportFormat::Word => word::create_document(&data, &state.links, now)?,
    };

    if let Some(dir) = &state.args.export_dir {
        export::persist(dir, &file).await?;
    }

    Ok(file)
}

/// Route `/downloaddata/*`
pub async fn handle_download_request(
    method: &Method,
    path: &str,
    auth_header: Option<&str>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let Some(format) = ExportFormat::from_path(path) else {
        return not_found_response(path);
    };
    if method != Method::GET {
        return method_not_allowed();
    }

    let result = async {
        let principal = resolve_principal(&state.store, &state.tokens, auth_header).await?;
        if !principal.authenticated {
            return Err(EncvError::Unauthorized("Authorization required".into()));
        }

        let file = build_export(&state, format).await?;
        info!("{} downloaded {}", principal.username, file.file_name);
        Ok::<_, EncvError>(file)
    }
    .await;

    match result {
        Ok(file) => attachment(file.bytes, file.content_type, &file.file_name),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path("/downloaddata/excel/"), Some(ExportFormat::Excel));
        assert_eq!(ExportFormat::from_path("/downloaddata/word"), Some(ExportFormat::Word));
        assert_eq!(ExportFormat::from_path("/downloaddata/pdf/"), None);
    }
}
