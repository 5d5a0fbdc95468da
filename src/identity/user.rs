//! User accounts
//!
//! Every user can sign in to the dashboard. Usernames are unique and matched
//! case-insensitively, so "My.Name@uni.ac.uk" and "my.name@uni.ac.uk" are the
//! same account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::{Role, Strand, UserId};

/// Stored user account
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: UserId,

    pub username: String,

    /// Argon2 PHC hash
    pub password_hash: String,

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

    /// Users are deactivated rather than deleted
    #[serde(default = "default_true")]
    pub is_active: bool,

    pub date_joined: DateTime<Utc>,

    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl User {
    /// Create a new active user
    pub fn new(
        username: impl Into<String>,
        password_hash: impl Into<String>,
        role: Option<Role>,
        participant_strand: Option<Strand>,
    ) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            password_hash: password_hash.into(),
            role,
            participant_strand,
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    pub fn is_participant(&self) -> bool {
        self.role == Some(Role::Participant)
    }

    pub fn is_participant_education(&self) -> bool {
        self.is_participant() && self.participant_strand == Some(Strand::Education)
    }

    pub fn is_participant_health(&self) -> bool {
        self.is_participant() && self.participant_strand == Some(Strand::Health)
    }

    /// Case-insensitive username comparison used for login and uniqueness
    pub fn username_matches(&self, username: &str) -> bool {
        self.username.to_lowercase() == username.to_lowercase()
    }

    /// Ordering by upper-cased username, then id
    pub fn by_username(a: &Self, b: &Self) -> Ordering {
        a.username
            .to_uppercase()
            .cmp(&b.username.to_uppercase())
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}
