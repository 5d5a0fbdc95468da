//! Properties of the permission evaluator, checked through the public API

use chrono::{DateTime, Duration, TimeZone, Utc};
use encv::auth::{
    evaluate, evaluate_action, filter_by_kind, filter_visible, ActionPermission, PermissionKind,
    QueryPermission, Resource,
};
use encv::identity::{AppLabel, Principal, Role, Strand, UserId};

#[derive(Debug, Clone, PartialEq)]
struct Item {
    name: &'static str,
    owner: Option<UserId>,
    created: DateTime<Utc>,
    viewers: Vec<UserId>,
}

impl Resource for Item {
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

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()
}

fn item(name: &'static str, owner: Option<UserId>) -> Item {
    Item {
        name,
        owner,
        created: now() - Duration::days(1),
        viewers: Vec::new(),
    }
}

fn participant(strand: Strand) -> Principal {
    Principal {
        id: Some(UserId::new()),
        username: format!("{strand}.participant"),
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
        strand: None,
        authenticated: true,
    }
}

const ACTIONS: [ActionPermission; 3] = [
    ActionPermission::AdminOnly,
    ActionPermission::StrandMember,
    ActionPermission::StrandMemberRecent,
];
const LABELS: [AppLabel; 3] = [AppLabel::Account, AppLabel::Education, AppLabel::Health];

#[test]
fn unauthenticated_principals_are_always_denied() {
    let fresh = item("fresh", None);

    // Even a principal that claims admin is denied without authentication
    let mut pretender = admin();
    pretender.authenticated = false;

    for principal in [Principal::anonymous(), pretender] {
        for label in LABELS {
            for kind in ACTIONS {
                assert!(!evaluate_action(&principal, label, Some(&fresh), kind, now()));
                assert!(!evaluate_action(&principal, label, None, kind, now()));
            }
        }
    }
}

#[test]
fn unauthenticated_principals_see_nothing() {
    let items = vec![item("a", None), item("b", None)];
    for kind in [QueryPermission::OwnedOrAdmin, QueryPermission::AllowedViewersOrAdmin] {
        let visible = filter_visible(&Principal::anonymous(), AppLabel::Education, &items, kind);
        assert!(visible.is_empty());
    }
}

#[test]
fn admins_pass_admin_only_and_filters_are_identity() {
    let admin = admin();
    for label in LABELS {
        assert!(evaluate_action(&admin, label, None, ActionPermission::AdminOnly, now()));
    }

    let other = UserId::new();
    let mut restricted = item("restricted", Some(other));
    restricted.viewers = vec![other];
    let items = vec![item("first", None), restricted, item("last", Some(UserId::new()))];

    for kind in [QueryPermission::OwnedOrAdmin, QueryPermission::AllowedViewersOrAdmin] {
        let visible = filter_visible(&admin, AppLabel::Health, &items, kind);
        let expected: Vec<&Item> = items.iter().collect();
        assert_eq!(visible, expected);
    }
}

#[test]
fn strand_member_matches_label() {
    for (strand, mine, other) in [
        (Strand::Education, AppLabel::Education, AppLabel::Health),
        (Strand::Health, AppLabel::Health, AppLabel::Education),
    ] {
        let p = participant(strand);
        let resource = item("r", p.id);
        let kind = ActionPermission::StrandMember;
        assert!(evaluate_action(&p, mine, Some(&resource), kind, now()));
        assert!(!evaluate_action(&p, other, Some(&resource), kind, now()));
        assert!(!evaluate_action(&p, AppLabel::Account, None, kind, now()));
    }
}

#[test]
fn strand_member_recent_window() {
    let p = participant(Strand::Education);

    let mut recent = item("recent", p.id);
    recent.created = now() - (Duration::days(13) + Duration::hours(23));
    assert!(evaluate_action(
        &p,
        AppLabel::Education,
        Some(&recent),
        ActionPermission::StrandMemberRecent,
        now()
    ));

    let mut stale = item("stale", p.id);
    stale.created = now() - Duration::days(15);
    assert!(!evaluate_action(
        &p,
        AppLabel::Education,
        Some(&stale),
        ActionPermission::StrandMemberRecent,
        now()
    ));

    for label in LABELS {
        let kind = ActionPermission::StrandMemberRecent;
        assert!(!evaluate_action(&p, label, None, kind, now()));
        assert!(!evaluate_action(&admin(), label, None, kind, now()));
    }
}

#[test]
fn owned_or_admin_keeps_own_records_in_order() {
    let p = participant(Strand::Education);
    let peer_a = UserId::new();
    let peer_b = UserId::new();

    let items = vec![
        item("mine-1", p.id),
        item("peer-a", Some(peer_a)),
        item("mine-2", p.id),
        item("peer-b", Some(peer_b)),
        item("mine-3", p.id),
    ];

    let visible = filter_visible(&p, AppLabel::Education, &items, QueryPermission::OwnedOrAdmin);
    let names: Vec<_> = visible.iter().map(|i| i.name).collect();
    assert_eq!(names, vec!["mine-1", "mine-2", "mine-3"]);

    // Outside the strand nothing is visible, owned or not
    let visible = filter_visible(&p, AppLabel::Health, &items, QueryPermission::OwnedOrAdmin);
    assert!(visible.is_empty());
}

#[test]
fn allowed_viewers_empty_means_whole_strand() {
    let p = participant(Strand::Health);
    let other = UserId::new();

    let open = item("open", None);
    let mut for_other = item("for-other", None);
    for_other.viewers = vec![other];
    let mut for_me = item("for-me", None);
    for_me.viewers = vec![other, p.id.unwrap()];

    let items = vec![open, for_other, for_me];
    let visible = filter_visible(
        &p,
        AppLabel::Health,
        &items,
        QueryPermission::AllowedViewersOrAdmin,
    );
    let names: Vec<_> = visible.iter().map(|i| i.name).collect();
    assert_eq!(names, vec!["open", "for-me"]);
}

#[test]
fn decisions_are_idempotent() {
    let p = participant(Strand::Education);
    let mut resource = item("r", p.id);
    resource.created = now() - Duration::days(3);
    let items = vec![resource.clone(), item("other", Some(UserId::new()))];

    for kind in ACTIONS {
        let first = evaluate_action(&p, AppLabel::Education, Some(&resource), kind, now());
        let second = evaluate_action(&p, AppLabel::Education, Some(&resource), kind, now());
        assert_eq!(first, second);
    }

    for kind in [QueryPermission::OwnedOrAdmin, QueryPermission::AllowedViewersOrAdmin] {
        let first = filter_visible(&p, AppLabel::Education, &items, kind);
        let second = filter_visible(&p, AppLabel::Education, &items, kind);
        assert_eq!(first, second);
    }
}

#[test]
fn umbrella_kinds_route_to_the_right_family() {
    let p = participant(Strand::Education);
    let items = vec![item("mine", p.id), item("theirs", Some(UserId::new()))];

    assert!(evaluate(&p, AppLabel::Education, None, PermissionKind::StrandMember, now()));
    let visible = filter_by_kind(
        &p,
        AppLabel::Education,
        &items,
        PermissionKind::FilterOwnedOrAdmin,
    );
    assert_eq!(visible.len(), 1);

    let parsed: PermissionKind = "all_users_in_strand_recently_created".parse().unwrap();
    assert_eq!(parsed, PermissionKind::StrandMemberRecent);
    assert!("no_such_permission".parse::<PermissionKind>().is_err());
}

#[test]
#[should_panic(expected = "queryset filter")]
fn filter_kind_cannot_gate_an_action() {
    evaluate(
        &admin(),
        AppLabel::Education,
        None,
        PermissionKind::FilterOwnedOrAdmin,
        now(),
    );
}

#[test]
#[should_panic(expected = "action permission")]
fn action_kind_cannot_filter() {
    let items: Vec<Item> = Vec::new();
    filter_by_kind(&admin(), AppLabel::Education, &items, PermissionKind::AdminOnly);
}
