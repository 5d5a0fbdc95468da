//! Which permission governs each dashboard action on each model

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::auth::{evaluate_action, ActionPermission, QueryPermission, Resource};
use crate::identity::Principal;
use crate::records::ModelKind;

/// Dashboard operations that need a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Model appears in the dashboard index
    Module,
    View,
    Add,
    Change,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Module => "module",
            Action::View => "view",
            Action::Add => "add",
            Action::Change => "change",
            Action::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Outcome source for one (model, action) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Permit(ActionPermission),
    /// Denied for everyone, admins included
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPolicy {
    pub module: Rule,
    pub view: Rule,
    pub add: Rule,
    pub change: Rule,
    pub delete: Rule,
    /// Narrows list views; `None` shows everything the view rule admits
    pub list_filter: Option<QueryPermission>,
}

impl ModelPolicy {
    pub fn for_model(kind: ModelKind) -> Self {
        use ActionPermission::*;

        match kind {
            // Participants write their own entries and may revise them for two weeks
            ModelKind::JournalEntry | ModelKind::Conversation => Self {
                module: Rule::Permit(StrandMember),
                view: Rule::Permit(StrandMember),
                add: Rule::Permit(StrandMember),
                change: Rule::Permit(StrandMemberRecent),
                delete: Rule::Permit(StrandMemberRecent),
                list_filter: Some(QueryPermission::OwnedOrAdmin),
            },
            // Admin-published content, optionally limited to named participants
            ModelKind::Questionnaire | ModelKind::Video => Self {
                module: Rule::Permit(StrandMember),
                view: Rule::Permit(StrandMember),
                add: Rule::Permit(AdminOnly),
                change: Rule::Permit(AdminOnly),
                delete: Rule::Permit(AdminOnly),
                list_filter: Some(QueryPermission::AllowedViewersOrAdmin),
            },
            // Accounts are deactivated, never deleted
            ModelKind::User => Self {
                module: Rule::Permit(AdminOnly),
                view: Rule::Permit(AdminOnly),
                add: Rule::Permit(AdminOnly),
                change: Rule::Permit(AdminOnly),
                delete: Rule::Never,
                list_filter: None,
            },
        }
    }

    pub fn rule(&self, action: Action) -> Rule {
        match action {
            Action::Module => self.module,
            Action::View => self.view,
            Action::Add => self.add,
            Action::Change => self.change,
            Action::Delete => self.delete,
        }
    }
}

/// Decide one dashboard action
pub fn has_permission(
    principal: &Principal,
    kind: ModelKind,
    action: Action,
    instance: Option<&dyn Resource>,
    now: DateTime<Utc>,
) -> bool {
    match ModelPolicy::for_model(kind).rule(action) {
        Rule::Permit(permission) => {
            evaluate_action(principal, kind.app_label(), instance, permission, now)
        }
        Rule::Never => false,
    }
}
