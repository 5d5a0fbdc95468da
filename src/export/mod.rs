//! Data exports for project staff
//!
//! Two reports cover the participant-authored records of both strands:
//! an Excel workbook with one sheet per strand, and a Word document with
//! one labelled block per record. Files are built in memory; when an export
//! directory is configured the latest file is also kept there.

pub mod excel;
pub mod ooxml;
pub mod word;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::dashboard::UserDirectory;
use crate::db::Store;
use crate::identity::{User, UserId};
use crate::records::{format_timestamp, media_url_full, Conversation, JournalEntry};
use crate::types::{EncvError, Result};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// A generated report
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Where media download links point
#[derive(Debug, Clone)]
pub struct MediaLinks {
    pub base_url: String,
    pub media_url: String,
}

impl MediaLinks {
    pub fn new(base_url: impl Into<String>, media_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            media_url: media_url.into(),
        }
    }

    pub fn link(&self, path: Option<&str>) -> String {
        match path {
            Some(path) if !path.is_empty() => media_url_full(&self.base_url, &self.media_url, path),
            _ => String::new(),
        }
    }
}

/// Everything a report needs, loaded once
pub struct ExportData {
    pub journal_entries: Vec<JournalEntry>,
    pub conversations: Vec<Conversation>,
    pub users: UserDirectory,
}

impl ExportData {
    /// Load every journal entry and conversation, in default order
    pub async fn load(store: &Store) -> Result<Self> {
        let users = store.list::<User>().await?;
        let data = Self {
            journal_entries: store.list::<JournalEntry>().await?,
            conversations: store.list::<Conversation>().await?,
            users: UserDirectory::from_users(&users),
        };
        debug!(
            journal_entries = data.journal_entries.len(),
            conversations = data.conversations.len(),
            "Loaded export data"
        );
        Ok(data)
    }

    pub fn author(&self, id: Option<UserId>) -> String {
        self.users.username(id).unwrap_or_default().to_string()
    }
}

pub(crate) fn opt_timestamp(ts: Option<&DateTime<Utc>>) -> String {
    ts.map(format_timestamp).unwrap_or_default()
}

/// `encv_data_2024-03-01_14-05.xlsx`
pub fn file_name(now: DateTime<Utc>, extension: &str) -> String {
    format!("encv_data_{}.{}", now.format("%Y-%m-%d_%H-%M"), extension)
}

/// Replace the contents of `dir` with `file`
pub async fn persist(dir: &Path, file: &ExportFile) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            tokio::fs::remove_file(entry.path()).await?;
        }
    }

    let path = dir.join(&file.file_name);
    tokio::fs::write(&path, &file.bytes)
        .await
        .map_err(|e| EncvError::Export(format!("Failed to write {}: {}", path.display(), e)))?;

    info!("Wrote export {}", path.display());
    Ok(path)
}
