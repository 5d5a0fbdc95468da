//! Health strand records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

use super::education::{non_blank, validate_required, validate_title};
use super::text::{truncate_chars, PREVIEW_CHARS};
use super::{ModelKind, Record, RecordMeta};
use crate::auth::Resource;
use crate::identity::UserId;
use crate::types::EncvError;

/// A recorded conversation between a cancer champion and a patient
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Conversation {
    pub meta: RecordMeta,

    /// Date the conversation was held
    pub conversation_date: NaiveDate,

    /// Audio recording path (required)
    pub conversation_audio: String,

    /// Transcript document path
    #[serde(default)]
    pub conversation_transcript: Option<String>,

    #[serde(default)]
    pub cancer_champion_reflection: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ConversationForm {
    pub conversation_date: NaiveDate,
    pub conversation_audio: String,
    #[serde(default)]
    pub conversation_transcript: Option<String>,
    #[serde(default)]
    pub cancer_champion_reflection: Option<String>,
}

impl Conversation {
    pub fn from_form(form: ConversationForm) -> Result<Self, EncvError> {
        let mut conversation = Self {
            meta: RecordMeta::new(None),
            conversation_date: form.conversation_date,
            conversation_audio: String::new(),
            conversation_transcript: None,
            cancer_champion_reflection: None,
        };
        conversation.apply_form(form)?;
        Ok(conversation)
    }

    pub fn apply_form(&mut self, form: ConversationForm) -> Result<(), EncvError> {
        validate_required("conversation_audio", &form.conversation_audio)?;
        self.conversation_date = form.conversation_date;
        self.conversation_audio = form.conversation_audio;
        self.conversation_transcript = non_blank(form.conversation_transcript);
        self.cancer_champion_reflection = non_blank(form.cancer_champion_reflection);
        Ok(())
    }

    /// e.g. `Conversation: jo.bloggs (2023-04-05)`
    pub fn name(&self, author: Option<&str>) -> String {
        format!(
            "Conversation: {} ({})",
            author.unwrap_or("None"),
            self.conversation_date.format("%Y-%m-%d")
        )
    }

    pub fn cancer_champion_reflection_preview(&self) -> String {
        truncate_chars(
            self.cancer_champion_reflection.as_deref().unwrap_or_default(),
            PREVIEW_CHARS,
        )
    }
}

impl Resource for Conversation {
    fn owner(&self) -> Option<UserId> {
        self.meta.author
    }

    fn created(&self) -> chrono::DateTime<chrono::Utc> {
        self.meta.created
    }
}

impl Record for Conversation {
    const MODEL: ModelKind = ModelKind::Conversation;

    fn record_id(&self) -> Uuid {
        self.meta.id
    }

    fn default_order(a: &Self, b: &Self) -> Ordering {
        RecordMeta::newest_first(&a.meta, &b.meta)
    }
}

/// A video published to the health strand
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Video {
    pub meta: RecordMeta,

    pub title: String,

    /// Video file path
    pub video: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Participants who may see this video. Empty means the whole strand.
    #[serde(default)]
    pub allowed_viewers: Vec<UserId>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct VideoForm {
    pub title: String,
    pub video: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub allowed_viewers: Vec<UserId>,
}

impl Video {
    pub fn from_form(form: VideoForm) -> Result<Self, EncvError> {
        let mut video = Self {
            meta: RecordMeta::new(None),
            title: String::new(),
            video: String::new(),
            description: None,
            allowed_viewers: Vec::new(),
        };
        video.apply_form(form)?;
        Ok(video)
    }

    pub fn apply_form(&mut self, form: VideoForm) -> Result<(), EncvError> {
        validate_title(&form.title)?;
        validate_required("video", &form.video)?;
        self.title = form.title.trim().to_string();
        self.video = form.video;
        self.description = non_blank(form.description);
        self.allowed_viewers = form.allowed_viewers;
        Ok(())
    }
}

impl Resource for Video {
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

impl Record for Video {
    const MODEL: ModelKind = ModelKind::Video;

    fn record_id(&self) -> Uuid {
        self.meta.id
    }

    fn default_order(a: &Self, b: &Self) -> Ordering {
        RecordMeta::newest_first(&a.meta, &b.meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ConversationForm {
        ConversationForm {
            conversation_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            conversation_audio: "health/conversation/audio/c1.mp3".into(),
            conversation_transcript: None,
            cancer_champion_reflection: Some("r".repeat(120)),
        }
    }

    #[test]
    fn test_conversation_name() {
        let conversation = Conversation::from_form(form()).unwrap();
        assert_eq!(conversation.name(Some("champion")), "Conversation: champion (2023-06-01)");
        assert_eq!(conversation.name(None), "Conversation: None (2023-06-01)");
    }

    #[test]
    fn test_reflection_preview_truncates() {
        let conversation = Conversation::from_form(form()).unwrap();
        let preview = conversation.cancer_champion_reflection_preview();
        assert_eq!(preview.chars().count(), PREVIEW_CHARS);
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn test_conversation_requires_audio() {
        let mut f = form();
        f.conversation_audio = String::new();
        assert!(Conversation::from_form(f).is_err());
    }

    #[test]
    fn test_video_allowed_viewers() {
        let viewer = UserId::new();
        let video = Video::from_form(VideoForm {
            title: "Welcome".into(),
            video: "health/video/welcome.mp4".into(),
            description: None,
            allowed_viewers: vec![viewer],
        })
        .unwrap();
        assert_eq!(Resource::allowed_viewers(&video), &[viewer]);
    }
}
