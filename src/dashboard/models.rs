//! How each model is edited, listed and searched in the dashboard

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::{hash_password, Resource};
use crate::identity::{Principal, Role, Strand, User, UserId};
use crate::records::education::{JournalEntryForm, QuestionnaireForm};
use crate::records::health::{ConversationForm, VideoForm};
use crate::records::{
    format_timestamp, Conversation, JournalEntry, Questionnaire, Record, Video,
};
use crate::types::{EncvError, Result};

/// Longest accepted username
pub const MAX_USERNAME_CHARS: usize = 150;

/// Usernames by id, for "created by" columns and search
#[derive(Debug, Clone, Default)]
pub struct UserDirectory(HashMap<UserId, String>);

impl UserDirectory {
    pub fn from_users(users: &[User]) -> Self {
        Self(users.iter().map(|u| (u.id, u.username.clone())).collect())
    }

    pub fn username(&self, id: Option<UserId>) -> Option<&str> {
        id.and_then(|id| self.0.get(&id)).map(String::as_str)
    }

    fn usernames(&self, ids: &[UserId]) -> Vec<&str> {
        ids.iter().filter_map(|id| self.username(Some(*id))).collect()
    }
}

/// A model the dashboard can manage
pub trait DashboardModel: Record + Resource {
    /// Submitted fields for create and update
    type Form: DeserializeOwned + Send;

    fn build(form: Self::Form) -> Result<Self>;

    fn apply(&mut self, form: Self::Form) -> Result<()>;

    /// Creation time bookkeeping
    fn mark_created(&mut self, now: DateTime<Utc>);

    /// Save time bookkeeping
    fn touch(&mut self, saved_by: Option<UserId>, now: DateTime<Utc>);

    /// Columns shown in list views
    fn row(&self, viewer: &Principal, users: &UserDirectory) -> Value;

    /// Full representation for the change form
    fn detail(&self, viewer: &Principal, users: &UserDirectory) -> Value {
        let record = serde_json::to_value(self).unwrap_or(Value::Null);
        merged(record, self.row(viewer, users))
    }

    /// Text the `q` search parameter is matched against
    fn search_text(&self, users: &UserDirectory) -> String;

    /// Username that must stay unique across accounts
    fn unique_username(&self) -> Option<&str> {
        None
    }
}

fn merged(record: Value, row: Value) -> Value {
    match (record, row) {
        (Value::Object(mut base), Value::Object(extra)) => {
            base.extend(extra);
            Value::Object(base)
        }
        (_, row) => row,
    }
}

fn opt_timestamp(ts: Option<&DateTime<Utc>>) -> String {
    ts.map(format_timestamp).unwrap_or_default()
}

/// Account fields; the password is only required when creating
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UserForm {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub participant_strand: Option<Strand>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn validate_username(username: &str) -> Result<()> {
    let username = username.trim();
    if username.is_empty() {
        return Err(EncvError::BadRequest("username: this field is required".into()));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(EncvError::BadRequest(format!(
            "username: at most {MAX_USERNAME_CHARS} characters"
        )));
    }
    if username.contains(char::is_whitespace) {
        return Err(EncvError::BadRequest("username: spaces are not allowed".into()));
    }
    Ok(())
}

impl DashboardModel for User {
    type Form = UserForm;

    fn build(form: UserForm) -> Result<Self> {
        let password = form
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| EncvError::BadRequest("password: this field is required".into()))?;

        let mut user = User::new(String::new(), hash_password(password)?, None, None);
        user.apply(UserForm {
            password: None,
            ..form
        })?;
        Ok(user)
    }

    fn apply(&mut self, form: UserForm) -> Result<()> {
        validate_username(&form.username)?;
        if let Some(password) = form.password.as_deref().filter(|p| !p.is_empty()) {
            self.password_hash = hash_password(password)?;
        }
        self.username = form.username.trim().to_string();
        self.role = form.role;
        self.participant_strand = form.participant_strand;
        self.email = form.email.trim().to_string();
        self.first_name = form.first_name.trim().to_string();
        self.last_name = form.last_name.trim().to_string();
        if let Some(active) = form.is_active {
            self.is_active = active;
        }
        Ok(())
    }

    fn mark_created(&mut self, now: DateTime<Utc>) {
        self.date_joined = now;
    }

    fn touch(&mut self, _saved_by: Option<UserId>, _now: DateTime<Utc>) {}

    fn row(&self, _viewer: &Principal, _users: &UserDirectory) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "email": self.email,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "role": self.role,
            "participant_strand": self.participant_strand,
            "is_active": self.is_active,
            "date_joined": format_timestamp(&self.date_joined),
            "last_login": opt_timestamp(self.last_login.as_ref()),
        })
    }

    // Never expose the password hash
    fn detail(&self, viewer: &Principal, users: &UserDirectory) -> Value {
        self.row(viewer, users)
    }

    fn search_text(&self, _users: &UserDirectory) -> String {
        format!(
            "{} {} {} {}",
            self.username, self.first_name, self.last_name, self.email
        )
    }

    fn unique_username(&self) -> Option<&str> {
        Some(&self.username)
    }
}

impl DashboardModel for JournalEntry {
    type Form = JournalEntryForm;

    fn build(form: JournalEntryForm) -> Result<Self> {
        JournalEntry::from_form(form)
    }

    fn apply(&mut self, form: JournalEntryForm) -> Result<()> {
        self.apply_form(form)
    }

    fn mark_created(&mut self, now: DateTime<Utc>) {
        self.meta.created = now;
    }

    fn touch(&mut self, saved_by: Option<UserId>, now: DateTime<Utc>) {
        self.meta.stamp(saved_by, now);
    }

    fn row(&self, _viewer: &Principal, users: &UserDirectory) -> Value {
        let author = users.username(self.meta.author);
        json!({
            "id": self.meta.id,
            "name": self.name(author),
            "author": author,
            "created": format_timestamp(&self.meta.created),
            "last_updated": opt_timestamp(self.meta.last_updated.as_ref()),
            "text_preview": self.text_preview(),
            "prompts": self.prompts_as_str(),
        })
    }

    fn search_text(&self, users: &UserDirectory) -> String {
        let id = self.meta.id.to_string();
        [
            Some(id.as_str()),
            self.text.as_deref(),
            self.link.as_deref(),
            self.image.as_deref(),
            self.audio.as_deref(),
            self.video.as_deref(),
            users.username(self.meta.author),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

impl DashboardModel for Questionnaire {
    type Form = QuestionnaireForm;

    fn build(form: QuestionnaireForm) -> Result<Self> {
        Questionnaire::from_form(form)
    }

    fn apply(&mut self, form: QuestionnaireForm) -> Result<()> {
        self.apply_form(form)
    }

    fn mark_created(&mut self, now: DateTime<Utc>) {
        self.meta.created = now;
    }

    fn touch(&mut self, saved_by: Option<UserId>, now: DateTime<Utc>) {
        self.meta.stamp(saved_by, now);
    }

    // Participants only get the title and their personalised link
    fn row(&self, viewer: &Principal, users: &UserDirectory) -> Value {
        if viewer.is_participant() {
            return json!({
                "id": self.meta.id,
                "title": self.title,
                "link_to_complete_questionnaire":
                    self.link_to_complete_questionnaire(&viewer.username),
            });
        }
        json!({
            "id": self.meta.id,
            "title": self.title,
            "link_to_questionnaire": self.link_to_questionnaire,
            "allowed_viewers": users.usernames(&self.allowed_viewers),
            "author": users.username(self.meta.author),
            "created": format_timestamp(&self.meta.created),
            "last_updated": opt_timestamp(self.meta.last_updated.as_ref()),
        })
    }

    fn detail(&self, viewer: &Principal, users: &UserDirectory) -> Value {
        if viewer.is_participant() {
            return self.row(viewer, users);
        }
        let record = serde_json::to_value(self).unwrap_or(Value::Null);
        merged(record, self.row(viewer, users))
    }

    fn search_text(&self, users: &UserDirectory) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.link_to_questionnaire,
            users.username(self.meta.author).unwrap_or_default()
        )
    }
}

impl DashboardModel for Conversation {
    type Form = ConversationForm;

    fn build(form: ConversationForm) -> Result<Self> {
        Conversation::from_form(form)
    }

    fn apply(&mut self, form: ConversationForm) -> Result<()> {
        self.apply_form(form)
    }

    fn mark_created(&mut self, now: DateTime<Utc>) {
        self.meta.created = now;
    }

    fn touch(&mut self, saved_by: Option<UserId>, now: DateTime<Utc>) {
        self.meta.stamp(saved_by, now);
    }

    fn row(&self, _viewer: &Principal, users: &UserDirectory) -> Value {
        let author = users.username(self.meta.author);
        json!({
            "id": self.meta.id,
            "name": self.name(author),
            "author": author,
            "conversation_date": self.conversation_date.format("%Y-%m-%d").to_string(),
            "created": format_timestamp(&self.meta.created),
            "last_updated": opt_timestamp(self.meta.last_updated.as_ref()),
            "cancer_champion_reflection_preview": self.cancer_champion_reflection_preview(),
        })
    }

    fn search_text(&self, users: &UserDirectory) -> String {
        format!(
            "{} {} {}",
            self.meta.id,
            self.cancer_champion_reflection.as_deref().unwrap_or_default(),
            users.username(self.meta.author).unwrap_or_default()
        )
    }
}

impl DashboardModel for Video {
    type Form = VideoForm;

    fn build(form: VideoForm) -> Result<Self> {
        Video::from_form(form)
    }

    fn apply(&mut self, form: VideoForm) -> Result<()> {
        self.apply_form(form)
    }

    fn mark_created(&mut self, now: DateTime<Utc>) {
        self.meta.created = now;
    }

    fn touch(&mut self, saved_by: Option<UserId>, now: DateTime<Utc>) {
        self.meta.stamp(saved_by, now);
    }

    fn row(&self, viewer: &Principal, users: &UserDirectory) -> Value {
        let mut row = json!({
            "id": self.meta.id,
            "title": self.title,
            "video": self.video,
            "description": self.description,
        });
        if viewer.is_admin() {
            row["allowed_viewers"] = json!(users.usernames(&self.allowed_viewers));
            row["author"] = json!(users.username(self.meta.author));
            row["created"] = json!(format_timestamp(&self.meta.created));
        }
        row
    }

    fn detail(&self, viewer: &Principal, users: &UserDirectory) -> Value {
        if viewer.is_admin() {
            let record = serde_json::to_value(self).unwrap_or(Value::Null);
            return merged(record, self.row(viewer, users));
        }
        self.row(viewer, users)
    }

    fn search_text(&self, _users: &UserDirectory) -> String {
        format!("{} {}", self.title, self.description.as_deref().unwrap_or_default())
    }
}
