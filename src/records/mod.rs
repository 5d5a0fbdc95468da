//! Strand record models
//!
//! Education strand: journal entries and questionnaire links.
//! Health strand: conversations and videos.
//!
//! Every record embeds a `RecordMeta` carrying its id, author and
//! timestamps, which is also what the permission evaluator reads.

pub mod education;
pub mod health;
pub mod text;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

use crate::auth::Resource;
use crate::identity::{AppLabel, User, UserId};
use crate::types::EncvError;

pub use education::{JournalEntry, Questionnaire};
pub use health::{Conversation, Video};

/// Identity and bookkeeping shared by all strand records
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RecordMeta {
    #[serde(with = "crate::types::uuid_str")]
    pub id: Uuid,

    /// Shown as "created by"
    #[serde(default)]
    pub author: Option<UserId>,

    pub created: DateTime<Utc>,

    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl RecordMeta {
    pub fn new(author: Option<UserId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author,
            created: Utc::now(),
            last_updated: None,
        }
    }

    /// Apply save-time bookkeeping: keep an existing author, otherwise
    /// attribute the record to the saving user, and refresh `last_updated`.
    pub fn stamp(&mut self, saved_by: Option<UserId>, now: DateTime<Utc>) {
        if self.author.is_none() {
            self.author = saved_by;
        }
        self.last_updated = Some(now);
    }

    /// Default record ordering: newest first
    pub fn newest_first(a: &Self, b: &Self) -> Ordering {
        b.created.cmp(&a.created).then_with(|| a.id.cmp(&b.id))
    }
}

/// Every model the dashboard manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    User,
    JournalEntry,
    Questionnaire,
    Conversation,
    Video,
}

impl ModelKind {
    pub const ALL: [ModelKind; 5] = [
        ModelKind::User,
        ModelKind::JournalEntry,
        ModelKind::Questionnaire,
        ModelKind::Conversation,
        ModelKind::Video,
    ];

    pub fn app_label(&self) -> AppLabel {
        match self {
            ModelKind::User => AppLabel::Account,
            ModelKind::JournalEntry | ModelKind::Questionnaire => AppLabel::Education,
            ModelKind::Conversation | ModelKind::Video => AppLabel::Health,
        }
    }

    /// Path segment used in dashboard URLs
    pub fn model_name(&self) -> &'static str {
        match self {
            ModelKind::User => "user",
            ModelKind::JournalEntry => "journalentry",
            ModelKind::Questionnaire => "questionnaire",
            ModelKind::Conversation => "conversation",
            ModelKind::Video => "video",
        }
    }

    /// Storage collection name
    pub fn collection(&self) -> &'static str {
        match self {
            ModelKind::User => "users",
            ModelKind::JournalEntry => "journal_entries",
            ModelKind::Questionnaire => "questionnaires",
            ModelKind::Conversation => "conversations",
            ModelKind::Video => "videos",
        }
    }

    pub fn verbose_name(&self) -> &'static str {
        match self {
            ModelKind::User => "user",
            ModelKind::JournalEntry => "journal entry",
            ModelKind::Questionnaire => "questionnaire",
            ModelKind::Conversation => "conversation",
            ModelKind::Video => "video",
        }
    }

    pub fn verbose_name_plural(&self) -> &'static str {
        match self {
            ModelKind::User => "users",
            ModelKind::JournalEntry => "journal entries",
            ModelKind::Questionnaire => "questionnaires",
            ModelKind::Conversation => "conversations",
            ModelKind::Video => "videos",
        }
    }

    /// Resolve `/<app>/<model>/` path segments
    pub fn from_path(app: &str, model: &str) -> Result<Self, EncvError> {
        let label: AppLabel = app.parse()?;
        Self::ALL
            .into_iter()
            .find(|kind| kind.app_label() == label && kind.model_name() == model)
            .ok_or_else(|| EncvError::NotFound(format!("Unknown model: {app}/{model}")))
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label(), self.model_name())
    }
}

/// A persisted model
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    const MODEL: ModelKind;

    /// Document path of the id, for store filters
    const ID_FIELD: &'static str = "meta.id";

    fn record_id(&self) -> Uuid;

    /// Ordering used for lists and exports
    fn default_order(a: &Self, b: &Self) -> Ordering;
}

impl Record for User {
    const MODEL: ModelKind = ModelKind::User;
    const ID_FIELD: &'static str = "id";

    fn record_id(&self) -> Uuid {
        self.id.0
    }

    fn default_order(a: &Self, b: &Self) -> Ordering {
        User::by_username(a, b)
    }
}

// An account belongs to itself
impl Resource for User {
    fn owner(&self) -> Option<UserId> {
        Some(self.id)
    }

    fn created(&self) -> DateTime<Utc> {
        self.date_joined
    }
}

/// Format a timestamp the way lists and exports show it
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

/// Absolute download URL for a stored media path
pub fn media_url_full(base_url: &str, media_url: &str, path: &str) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        media_url.trim_matches('/'),
        path.trim_start_matches('/')
    )
}
