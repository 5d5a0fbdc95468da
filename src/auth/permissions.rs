//! Permission evaluator for strand-scoped records
//!
//! Two families of decisions:
//! - action permissions gate a single operation (view, add, change, delete)
//!   on a model, optionally against one instance
//! - query permissions narrow which instances a principal may enumerate
//!
//! Everything here is a pure function of its arguments. The current instant
//! is passed in by the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::identity::{AppLabel, Principal, UserId};
use crate::types::EncvError;

/// Days after creation during which strand members may still edit a record
pub const EDIT_WINDOW_DAYS: i64 = 14;

/// A record subject to visibility and edit rules
pub trait Resource {
    /// User that created the record, if known
    fn owner(&self) -> Option<UserId>;

    /// Creation instant
    fn created(&self) -> DateTime<Utc>;

    /// Users explicitly allowed to see the record. Empty means every member
    /// of the strand may see it.
    fn allowed_viewers(&self) -> &[UserId] {
        &[]
    }
}

/// Permission kinds that answer yes/no for one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPermission {
    /// Admins only
    AdminOnly,
    /// Admins, or participants whose strand matches the model's application
    StrandMember,
    /// As `StrandMember`, and the instance must be inside the edit window
    StrandMemberRecent,
}

/// Permission kinds that filter a list of instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPermission {
    /// Admins see everything; strand participants see what they authored
    OwnedOrAdmin,
    /// Admins see everything; strand participants see unrestricted records
    /// and records that list them as a viewer
    AllowedViewersOrAdmin,
}

/// Either permission family under a single name.
///
/// Kinds parse from their canonical or legacy names. Handing a kind of the
/// wrong family to `evaluate` or `filter_by_kind` panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionKind {
    AdminOnly,
    StrandMember,
    StrandMemberRecent,
    FilterOwnedOrAdmin,
    FilterAllowedViewersOrAdmin,
}

impl PermissionKind {
    /// The action permission this kind names, if it is one
    pub fn action(self) -> Option<ActionPermission> {
        match self {
            PermissionKind::AdminOnly => Some(ActionPermission::AdminOnly),
            PermissionKind::StrandMember => Some(ActionPermission::StrandMember),
            PermissionKind::StrandMemberRecent => Some(ActionPermission::StrandMemberRecent),
            PermissionKind::FilterOwnedOrAdmin
            | PermissionKind::FilterAllowedViewersOrAdmin => None,
        }
    }

    /// The query permission this kind names, if it is one
    pub fn query(self) -> Option<QueryPermission> {
        match self {
            PermissionKind::FilterOwnedOrAdmin => Some(QueryPermission::OwnedOrAdmin),
            PermissionKind::FilterAllowedViewersOrAdmin => {
                Some(QueryPermission::AllowedViewersOrAdmin)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKind::AdminOnly => "admin_only",
            PermissionKind::StrandMember => "strand_member",
            PermissionKind::StrandMemberRecent => "strand_member_recent",
            PermissionKind::FilterOwnedOrAdmin => "filter_owned_or_admin",
            PermissionKind::FilterAllowedViewersOrAdmin => "filter_allowed_viewers_or_admin",
        }
    }
}

impl From<ActionPermission> for PermissionKind {
    fn from(kind: ActionPermission) -> Self {
        match kind {
            ActionPermission::AdminOnly => PermissionKind::AdminOnly,
            ActionPermission::StrandMember => PermissionKind::StrandMember,
            ActionPermission::StrandMemberRecent => PermissionKind::StrandMemberRecent,
        }
    }
}

impl From<QueryPermission> for PermissionKind {
    fn from(kind: QueryPermission) -> Self {
        match kind {
            QueryPermission::OwnedOrAdmin => PermissionKind::FilterOwnedOrAdmin,
            QueryPermission::AllowedViewersOrAdmin => PermissionKind::FilterAllowedViewersOrAdmin,
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionKind {
    type Err = EncvError;

    /// Accepts the canonical names and the legacy ones
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin_only" => Ok(PermissionKind::AdminOnly),
            "strand_member" | "all_users_in_strand" => Ok(PermissionKind::StrandMember),
            "strand_member_recent" | "all_users_in_strand_recently_created" => {
                Ok(PermissionKind::StrandMemberRecent)
            }
            "filter_owned_or_admin" | "hide_if_participant_is_not_author" => {
                Ok(PermissionKind::FilterOwnedOrAdmin)
            }
            "filter_allowed_viewers_or_admin" | "limit_to_certain_participants" => {
                Ok(PermissionKind::FilterAllowedViewersOrAdmin)
            }
            other => Err(EncvError::Config(format!("Unknown permission kind: {other}"))),
        }
    }
}

/// Whether `now` is still inside the edit window of a record created at `created`
pub fn within_edit_window(created: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now < created + Duration::days(EDIT_WINDOW_DAYS)
}

/// Decide whether `principal` may perform an action on a model.
///
/// `instance` is the record being acted on, or `None` for model-level
/// checks (list, add). `StrandMemberRecent` denies when no instance is given.
pub fn evaluate_action(
    principal: &Principal,
    label: AppLabel,
    instance: Option<&dyn Resource>,
    kind: ActionPermission,
    now: DateTime<Utc>,
) -> bool {
    if !principal.authenticated {
        return false;
    }

    let strand_member = principal.is_admin() || principal.in_strand_of(label);

    match kind {
        ActionPermission::AdminOnly => principal.is_admin(),
        ActionPermission::StrandMember => strand_member,
        ActionPermission::StrandMemberRecent => {
            strand_member
                && instance.is_some_and(|resource| within_edit_window(resource.created(), now))
        }
    }
}

/// Narrow `all` to the records `principal` may enumerate.
///
/// Order is preserved and the input is left untouched. A principal outside
/// the strand (or anonymous) gets an empty list.
pub fn filter_visible<'a, R: Resource>(
    principal: &Principal,
    label: AppLabel,
    all: &'a [R],
    kind: QueryPermission,
) -> Vec<&'a R> {
    if !principal.authenticated {
        return Vec::new();
    }

    if principal.is_admin() {
        return all.iter().collect();
    }

    if !(principal.is_participant() && principal.in_strand_of(label)) {
        return Vec::new();
    }

    let Some(me) = principal.id else {
        return Vec::new();
    };

    match kind {
        QueryPermission::OwnedOrAdmin => all
            .iter()
            .filter(|resource| resource.owner() == Some(me))
            .collect(),
        QueryPermission::AllowedViewersOrAdmin => all
            .iter()
            .filter(|resource| {
                let viewers = resource.allowed_viewers();
                viewers.is_empty() || viewers.contains(&me)
            })
            .collect(),
    }
}

/// Evaluate an action by umbrella kind.
///
/// # Panics
///
/// Panics when `kind` is a queryset filter. That is a wiring mistake in the
/// caller, not an access-control outcome.
pub fn evaluate(
    principal: &Principal,
    label: AppLabel,
    instance: Option<&dyn Resource>,
    kind: PermissionKind,
    now: DateTime<Utc>,
) -> bool {
    match kind.action() {
        Some(action) => evaluate_action(principal, label, instance, action, now),
        None => panic!("{kind} is a queryset filter and cannot gate an action"),
    }
}

/// Filter by umbrella kind.
///
/// # Panics
///
/// Panics when `kind` is an action permission.
pub fn filter_by_kind<'a, R: Resource>(
    principal: &Principal,
    label: AppLabel,
    all: &'a [R],
    kind: PermissionKind,
) -> Vec<&'a R> {
    match kind.query() {
        Some(query) => filter_visible(principal, label, all, query),
        None => panic!("{kind} is an action permission and cannot filter a queryset"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Role, Strand};

    struct Note {
        owner: Option<UserId>,
        created: DateTime<Utc>,
        viewers: Vec<UserId>,
    }

    impl Resource for Note {
        fn owner(&self) -> Option<UserId> {
            self.owner
        }

        fn created(&self) -> DateTime<Utc> {
            self.created
        }

        fn allowed_viewers(&self) -> &[UserId] {
            &self.viewers
        }
    }

    fn participant(strand: Strand) -> Principal {
        Principal {
            id: Some(UserId::new()),
            username: "participant".into(),
            role: Some(Role::Participant),
            strand: Some(strand),
            authenticated: true,
        }
    }

    fn admin() -> Principal {
        Principal {
            id: Some(UserId::new()),
            username: "admin".into(),
            role: Some(Role::Admin),
            strand: Some(Strand::Health),
            authenticated: true,
        }
    }

    #[test]
    fn test_admin_only() {
        let now = Utc::now();
        assert!(evaluate_action(
            &admin(),
            AppLabel::Account,
            None,
            ActionPermission::AdminOnly,
            now
        ));
        assert!(!evaluate_action(
            &participant(Strand::Education),
            AppLabel::Education,
            None,
            ActionPermission::AdminOnly,
            now
        ));
    }

    #[test]
    fn test_admin_strand_is_irrelevant() {
        let now = Utc::now();
        // Admin's own strand is health, the model is education
        assert!(evaluate_action(
            &admin(),
            AppLabel::Education,
            None,
            ActionPermission::StrandMember,
            now
        ));
    }

    #[test]
    fn test_participant_without_role_is_not_admin() {
        let now = Utc::now();
        let mut p = participant(Strand::Education);
        p.role = None;
        assert!(!evaluate_action(&p, AppLabel::Account, None, ActionPermission::AdminOnly, now));
        // Strand membership alone still counts for strand_member
        assert!(evaluate_action(
            &p,
            AppLabel::Education,
            None,
            ActionPermission::StrandMember,
            now
        ));
    }

    #[test]
    fn test_recent_window_boundary() {
        let now = Utc::now();
        let p = participant(Strand::Education);
        let exactly_fourteen = Note {
            owner: p.id,
            created: now - Duration::days(EDIT_WINDOW_DAYS),
            viewers: vec![],
        };
        assert!(!evaluate_action(
            &p,
            AppLabel::Education,
            Some(&exactly_fourteen),
            ActionPermission::StrandMemberRecent,
            now
        ));

        let just_inside = Note {
            owner: p.id,
            created: now - Duration::days(EDIT_WINDOW_DAYS) + Duration::seconds(1),
            viewers: vec![],
        };
        assert!(evaluate_action(
            &p,
            AppLabel::Education,
            Some(&just_inside),
            ActionPermission::StrandMemberRecent,
            now
        ));
    }

    #[test]
    fn test_umbrella_parse_accepts_legacy_names() {
        assert_eq!(
            "all_users_in_strand_recently_created".parse::<PermissionKind>().unwrap(),
            PermissionKind::StrandMemberRecent
        );
        assert_eq!(
            "limit_to_certain_participants".parse::<PermissionKind>().unwrap(),
            PermissionKind::FilterAllowedViewersOrAdmin
        );
        assert!(matches!(
            "everyone".parse::<PermissionKind>(),
            Err(EncvError::Config(_))
        ));
    }

    #[test]
    fn test_umbrella_round_trips_through_families() {
        for kind in [
            ActionPermission::AdminOnly,
            ActionPermission::StrandMember,
            ActionPermission::StrandMemberRecent,
        ] {
            assert_eq!(PermissionKind::from(kind).action(), Some(kind));
            assert_eq!(PermissionKind::from(kind).query(), None);
        }
        for kind in [QueryPermission::OwnedOrAdmin, QueryPermission::AllowedViewersOrAdmin] {
            assert_eq!(PermissionKind::from(kind).query(), Some(kind));
            assert_eq!(PermissionKind::from(kind).action(), None);
        }
    }

    #[test]
    #[should_panic(expected = "queryset filter")]
    fn test_filter_kind_cannot_gate_action() {
        evaluate(
            &admin(),
            AppLabel::Education,
            None,
            PermissionKind::FilterOwnedOrAdmin,
            Utc::now(),
        );
    }

    #[test]
    #[should_panic(expected = "cannot filter")]
    fn test_action_kind_cannot_filter() {
        let notes: Vec<Note> = Vec::new();
        filter_by_kind(&admin(), AppLabel::Education, &notes, PermissionKind::AdminOnly);
    }

    #[test]
    fn test_admin_without_strand_sees_all() {
        let mut a = admin();
        a.strand = None;
        let now = Utc::now();
        let notes = vec![
            Note {
                owner: None,
                created: now,
                viewers: vec![],
            },
            Note {
                owner: Some(UserId::new()),
                created: now,
                viewers: vec![UserId::new()],
            },
        ];
        let visible = filter_visible(
            &a,
            AppLabel::Health,
            &notes,
            QueryPermission::AllowedViewersOrAdmin,
        );
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn test_other_strand_participant_sees_nothing() {
        let p = participant(Strand::Health);
        let now = Utc::now();
        let notes = vec![Note {
            owner: p.id,
            created: now,
            viewers: vec![],
        }];
        let visible =
            filter_visible(&p, AppLabel::Education, &notes, QueryPermission::OwnedOrAdmin);
        assert!(visible.is_empty());
    }
}
