//! Education strand records

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

use super::text::{strip_tags, truncate_chars, PREVIEW_CHARS};
use super::{format_timestamp, ModelKind, Record, RecordMeta};
use crate::auth::Resource;
use crate::identity::UserId;
use crate::types::EncvError;

pub const MAX_TITLE_CHARS: usize = 255;

/// An entry in a participant's journal
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JournalEntry {
    pub meta: RecordMeta,

    /// Rich text (HTML)
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub link: Option<String>,

    /// Media paths relative to the media root
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub video: Option<String>,

    /// Titles of the prompts this entry responds to
    #[serde(default)]
    pub prompts: Vec<String>,
}

/// Editable fields of a journal entry
#[derive(Deserialize, Debug, Clone, Default)]
pub struct JournalEntryForm {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub prompts: Vec<String>,
}

impl JournalEntry {
    pub fn from_form(form: JournalEntryForm) -> Result<Self, EncvError> {
        let mut entry = Self {
            meta: RecordMeta::new(None),
            text: None,
            link: None,
            image: None,
            audio: None,
            video: None,
            prompts: Vec::new(),
        };
        entry.apply_form(form)?;
        Ok(entry)
    }

    pub fn apply_form(&mut self, form: JournalEntryForm) -> Result<(), EncvError> {
        if let Some(link) = form.link.as_deref() {
            validate_url("link", link)?;
        }
        self.text = non_blank(form.text);
        self.link = non_blank(form.link);
        self.image = non_blank(form.image);
        self.audio = non_blank(form.audio);
        self.video = non_blank(form.video);
        self.prompts = form.prompts;
        Ok(())
    }

    /// e.g. `Journal Entry: jo.bloggs (2023-04-05 09:07)`
    pub fn name(&self, author: Option<&str>) -> String {
        let stamp = format_timestamp(&self.meta.created);
        format!("Journal Entry: {} ({})", author.unwrap_or("None"), stamp)
    }

    /// First characters of the text, tags removed
    pub fn text_preview(&self) -> String {
        truncate_chars(&strip_tags(self.text.as_deref().unwrap_or_default()), PREVIEW_CHARS)
    }

    pub fn prompts_as_str(&self) -> String {
        self.prompts.join(", ")
    }
}

impl Resource for JournalEntry {
    fn owner(&self) -> Option<UserId> {
        self.meta.author
    }

    fn created(&self) -> chrono::DateTime<chrono::Utc> {
        self.meta.created
    }
}

impl Record for JournalEntry {
    const MODEL: ModelKind = ModelKind::JournalEntry;

    fn record_id(&self) -> Uuid {
        self.meta.id
    }

    fn default_order(a: &Self, b: &Self) -> Ordering {
        RecordMeta::newest_first(&a.meta, &b.meta)
    }
}

/// A link to a questionnaire hosted by an external provider
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Questionnaire {
    pub meta: RecordMeta,

    pub title: String,

    pub link_to_questionnaire: String,

    /// Participants who may see this questionnaire. Empty means the whole strand.
    #[serde(default)]
    pub allowed_viewers: Vec<UserId>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct QuestionnaireForm {
    pub title: String,
    pub link_to_questionnaire: String,
    #[serde(default)]
    pub allowed_viewers: Vec<UserId>,
}

impl Questionnaire {
    pub fn from_form(form: QuestionnaireForm) -> Result<Self, EncvError> {
        let mut questionnaire = Self {
            meta: RecordMeta::new(None),
            title: String::new(),
            link_to_questionnaire: String::new(),
            allowed_viewers: Vec::new(),
        };
        questionnaire.apply_form(form)?;
        Ok(questionnaire)
    }

    pub fn apply_form(&mut self, form: QuestionnaireForm) -> Result<(), EncvError> {
        validate_title(&form.title)?;
        validate_required("link_to_questionnaire", &form.link_to_questionnaire)?;
        validate_url("link_to_questionnaire", &form.link_to_questionnaire)?;
        self.title = form.title.trim().to_string();
        self.link_to_questionnaire = form.link_to_questionnaire;
        self.allowed_viewers = form.allowed_viewers;
        Ok(())
    }

    /// The questionnaire link personalised for the participant completing it
    pub fn link_to_complete_questionnaire(&self, username: &str) -> String {
        format!("{}?username={}", self.link_to_questionnaire, username)
    }
}

impl Resource for Questionnaire {
    fn owner(&self) -> Option<UserId> {
        self.meta.author
    }

    fn created(&self) -> chrono::DateTime<chrono::Utc> {
        self.meta.created
    }

    fn allowed_viewers(&self) -> &[UserId] {
        &self.allowed_viewers
    }
}

impl Record for Questionnaire {
    const MODEL: ModelKind = ModelKind::Questionnaire;

    fn record_id(&self) -> Uuid {
        self.meta.id
    }

    fn default_order(a: &Self, b: &Self) -> Ordering {
        RecordMeta::newest_first(&a.meta, &b.meta)
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub(crate) fn validate_title(title: &str) -> Result<(), EncvError> {
    if title.trim().is_empty() {
        return Err(EncvError::BadRequest("title: this field is required".into()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(EncvError::BadRequest(format!(
            "title: at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_required(field: &str, value: &str) -> Result<(), EncvError> {
    if value.trim().is_empty() {
        return Err(EncvError::BadRequest(format!("{field}: this field is required")));
    }
    Ok(())
}

pub(crate) fn validate_url(field: &str, value: &str) -> Result<(), EncvError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.contains(char::is_whitespace) => Ok(()),
        _ => Err(EncvError::BadRequest(format!("{field}: enter a valid URL"))),
    }
}
