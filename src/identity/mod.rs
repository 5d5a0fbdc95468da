//! Identity model: roles, strands and the acting principal
//!
//! A `Principal` is the value every permission decision is made for. It is
//! built once per request from the stored `User` (or is anonymous) and then
//! passed explicitly to the evaluator.

pub mod user;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::types::EncvError;

pub use user::User;

/// Role of a user within the project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Participant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Participant => "participant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = EncvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "participant" => Ok(Role::Participant),
            other => Err(EncvError::BadRequest(format!("Unknown role: {other}"))),
        }
    }
}

/// Project strand a participant belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strand {
    Education,
    Health,
}

impl Strand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strand::Education => "education",
            Strand::Health => "health",
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strand {
    type Err = EncvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "education" => Ok(Strand::Education),
            "health" => Ok(Strand::Health),
            other => Err(EncvError::BadRequest(format!("Unknown strand: {other}"))),
        }
    }
}

/// Label of the application that owns a model.
///
/// Strand applications carry the strand's name, so a participant's strand is
/// compared against the label of the model being accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppLabel {
    Account,
    Education,
    Health,
}

impl AppLabel {
    /// Strand this application partitions data for, if any
    pub fn strand(&self) -> Option<Strand> {
        match self {
            AppLabel::Account => None,
            AppLabel::Education => Some(Strand::Education),
            AppLabel::Health => Some(Strand::Health),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppLabel::Account => "account",
            AppLabel::Education => "education",
            AppLabel::Health => "health",
        }
    }
}

impl fmt::Display for AppLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppLabel {
    type Err = EncvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "account" => Ok(AppLabel::Account),
            "education" => Ok(AppLabel::Education),
            "health" => Ok(AppLabel::Health),
            other => Err(EncvError::NotFound(format!("Unknown application: {other}"))),
        }
    }
}

/// Stable user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(#[serde(with = "crate::types::uuid_str")] pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = EncvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| EncvError::BadRequest(format!("Invalid user id: {e}")))
    }
}

/// The actor a permission decision is made for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Option<UserId>,
    pub username: String,
    pub role: Option<Role>,
    pub strand: Option<Strand>,
    pub authenticated: bool,
}

impl Principal {
    /// Anonymous visitor; every evaluator check denies it
    pub fn anonymous() -> Self {
        Self {
            id: None,
            username: String::new(),
            role: None,
            strand: None,
            authenticated: false,
        }
    }

    /// Principal for an authenticated user
    pub fn from_user(user: &User) -> Self {
        Self {
            id: Some(user.id),
            username: user.username.clone(),
            role: user.role,
            strand: user.participant_strand,
            authenticated: true,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.authenticated && self.role == Some(Role::Admin)
    }

    pub fn is_participant(&self) -> bool {
        self.authenticated && self.role == Some(Role::Participant)
    }

    /// Whether this principal belongs to the strand the label partitions.
    ///
    /// Role is not consulted here; admins are handled by the callers.
    pub fn in_strand_of(&self, label: AppLabel) -> bool {
        match (self.strand, label.strand()) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => false,
        }
    }
}
