//! Dashboard operations: list, view, add, change, delete
//!
//! Every operation takes the acting `Principal` and the decision time. Records
//! outside the principal's filtered list are reported as not found, so their
//! existence is not revealed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::models::{DashboardModel, UserDirectory};
use super::policy::{has_permission, Action, ModelPolicy};
use crate::auth::filter_visible;
use crate::db::Store;
use crate::identity::{Principal, User};
use crate::records::ModelKind;
use crate::types::{EncvError, Result};

/// Rows per list page
pub const LIST_PER_PAGE: usize = 100;

/// `?q=` and `?page=` of a list request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
}

/// One page of a list view
#[derive(Debug, Serialize)]
pub struct ListPage {
    pub model: String,
    pub verbose_name_plural: &'static str,
    pub count: usize,
    pub page: usize,
    pub num_pages: usize,
    pub can_add: bool,
    pub results: Vec<Value>,
}

/// Dashboard index entry
#[derive(Debug, Serialize, PartialEq)]
pub struct ModelEntry {
    pub app: &'static str,
    pub model: &'static str,
    pub name: &'static str,
    pub can_add: bool,
}

#[derive(Clone)]
pub struct Dashboard {
    store: Store,
}

impl Dashboard {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Models the principal may open
    pub fn index(&self, principal: &Principal, now: DateTime<Utc>) -> Vec<ModelEntry> {
        ModelKind::ALL
            .into_iter()
            .filter(|kind| has_permission(principal, *kind, Action::Module, None, now))
            .map(|kind| ModelEntry {
                app: kind.app_label().as_str(),
                model: kind.model_name(),
                name: kind.verbose_name_plural(),
                can_add: has_permission(principal, kind, Action::Add, None, now),
            })
            .collect()
    }

    pub async fn user_directory(&self) -> Result<UserDirectory> {
        let users = self.store.list::<User>().await?;
        Ok(UserDirectory::from_users(&users))
    }

    /// Records of `M` the principal may enumerate, in default order
    pub async fn visible<M: DashboardModel>(&self, principal: &Principal) -> Result<Vec<M>> {
        let all = self.store.list::<M>().await?;
        let visible = match ModelPolicy::for_model(M::MODEL).list_filter {
            Some(kind) => filter_visible(principal, M::MODEL.app_label(), &all, kind)
                .into_iter()
                .cloned()
                .collect(),
            None => all,
        };
        Ok(visible)
    }

    pub async fn list<M: DashboardModel>(
        &self,
        principal: &Principal,
        query: &ListQuery,
        now: DateTime<Utc>,
    ) -> Result<ListPage> {
        require::<M>(principal, Action::View, None, now)?;

        let users = self.user_directory().await?;
        let mut records = self.visible::<M>(principal).await?;

        if let Some(term) = query.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            records.retain(|record| record.search_text(&users).to_lowercase().contains(&term));
        }

        let count = records.len();
        let num_pages = count.div_ceil(LIST_PER_PAGE).max(1);
        let page = query.page.unwrap_or(1);
        if page == 0 || page > num_pages {
            return Err(EncvError::NotFound(format!("Invalid page ({page})")));
        }

        let results = records
            .iter()
            .skip((page - 1) * LIST_PER_PAGE)
            .take(LIST_PER_PAGE)
            .map(|record| record.row(principal, &users))
            .collect();

        debug!(model = %M::MODEL, user = %principal.username, count, page, "Listed records");

        Ok(ListPage {
            model: M::MODEL.to_string(),
            verbose_name_plural: M::MODEL.verbose_name_plural(),
            count,
            page,
            num_pages,
            can_add: has_permission(principal, M::MODEL, Action::Add, None, now),
            results,
        })
    }

    pub async fn get<M: DashboardModel>(
        &self,
        principal: &Principal,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Value> {
        let record = self.find_visible::<M>(principal, id).await?;
        require::<M>(principal, Action::View, Some(&record), now)?;

        let users = self.user_directory().await?;
        Ok(record.detail(principal, &users))
    }

    pub async fn create<M: DashboardModel>(
        &self,
        principal: &Principal,
        form: M::Form,
        now: DateTime<Utc>,
    ) -> Result<Value> {
        require::<M>(principal, Action::Add, None, now)?;

        let mut record = M::build(form)?;
        record.mark_created(now);
        record.touch(principal.id, now);
        self.check_unique_username(&record).await?;
        self.store.insert(&record).await?;

        info!(
            model = %M::MODEL,
            id = %record.record_id(),
            user = %principal.username,
            "Created record"
        );

        let users = self.user_directory().await?;
        Ok(record.detail(principal, &users))
    }

    pub async fn update<M: DashboardModel>(
        &self,
        principal: &Principal,
        id: Uuid,
        form: M::Form,
        now: DateTime<Utc>,
    ) -> Result<Value> {
        let mut record = self.find_visible::<M>(principal, id).await?;
        require::<M>(principal, Action::Change, Some(&record), now)?;

        record.apply(form)?;
        record.touch(principal.id, now);
        self.check_unique_username(&record).await?;
        self.store.replace(&record).await?;

        info!(model = %M::MODEL, %id, user = %principal.username, "Updated record");

        let users = self.user_directory().await?;
        Ok(record.detail(principal, &users))
    }

    pub async fn delete<M: DashboardModel>(
        &self,
        principal: &Principal,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let record = self.find_visible::<M>(principal, id).await?;
        require::<M>(principal, Action::Delete, Some(&record), now)?;

        if !self.store.delete::<M>(id).await? {
            return Err(not_found::<M>(id));
        }

        info!(model = %M::MODEL, %id, user = %principal.username, "Deleted record");
        Ok(())
    }

    async fn find_visible<M: DashboardModel>(&self, principal: &Principal, id: Uuid) -> Result<M> {
        self.visible::<M>(principal)
            .await?
            .into_iter()
            .find(|record| record.record_id() == id)
            .ok_or_else(|| not_found::<M>(id))
    }

    async fn check_unique_username<M: DashboardModel>(&self, record: &M) -> Result<()> {
        let Some(username) = record.unique_username() else {
            return Ok(());
        };
        match self.store.find_user_by_username(username).await? {
            Some(existing) if existing.id.0 != record.record_id() => Err(EncvError::Conflict(
                format!("A user with username '{username}' already exists"),
            )),
            _ => Ok(()),
        }
    }
}

fn require<M: DashboardModel>(
    principal: &Principal,
    action: Action,
    instance: Option<&M>,
    now: DateTime<Utc>,
) -> Result<()> {
    let instance = instance.map(|record| record as &dyn crate::auth::Resource);
    if has_permission(principal, M::MODEL, action, instance, now) {
        return Ok(());
    }

    warn!(
        model = %M::MODEL,
        %action,
        user = %principal.username,
        "Permission denied"
    );
    Err(EncvError::Forbidden(format!(
        "You do not have permission to {action} this {}",
        M::MODEL.verbose_name()
    )))
}

fn not_found<M: DashboardModel>(id: Uuid) -> EncvError {
    EncvError::NotFound(format!("{} {} not found", M::MODEL.verbose_name(), id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Role, Strand};
    use crate::records::education::{JournalEntryForm, QuestionnaireForm};
    use crate::records::health::ConversationForm;
    use crate::records::{Conversation, JournalEntry, Questionnaire};
    use chrono::Duration;

    use crate::dashboard::models::UserForm;

    async fn seed_user(store: &Store, name: &str, role: Role, strand: Option<Strand>) -> Principal {
        let user = User::new(name, "hash", Some(role), strand);
        store.insert(&user).await.unwrap();
        Principal::from_user(&user)
    }

    fn entry_form(text: &str) -> JournalEntryForm {
        JournalEntryForm {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    fn id_of(value: &Value) -> Uuid {
        let raw = value["meta"]["id"].as_str().or_else(|| value["id"].as_str()).unwrap();
        Uuid::parse_str(raw).unwrap()
    }

    #[tokio::test]
    async fn test_participant_sees_only_own_entries() {
        let store = Store::memory();
        let dashboard = Dashboard::new(store.clone());
        let now = Utc::now();

        let alice = seed_user(&store, "alice", Role::Participant, Some(Strand::Education)).await;
        let bob = seed_user(&store, "bob", Role::Participant, Some(Strand::Education)).await;
        let admin = seed_user(&store, "admin", Role::Admin, None).await;

        dashboard.create::<JournalEntry>(&alice, entry_form("alice one"), now).await.unwrap();
        dashboard.create::<JournalEntry>(&alice, entry_form("alice two"), now).await.unwrap();
        let bobs = dashboard
            .create::<JournalEntry>(&bob, entry_form("bob one"), now)
            .await
            .unwrap();

        let page = dashboard
            .list::<JournalEntry>(&alice, &ListQuery::default(), now)
            .await
            .unwrap();
        assert_eq!(page.count, 2);

        let page = dashboard
            .list::<JournalEntry>(&admin, &ListQuery::default(), now)
            .await
            .unwrap();
        assert_eq!(page.count, 3);

        // Someone else's record does not exist as far as alice can tell
        let result = dashboard.get::<JournalEntry>(&alice, id_of(&bobs), now).await;
        assert!(matches!(result, Err(EncvError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_other_strand_is_forbidden() {
        let store = Store::memory();
        let dashboard = Dashboard::new(store.clone());
        let health = seed_user(&store, "h1", Role::Participant, Some(Strand::Health)).await;

        let result = dashboard
            .list::<JournalEntry>(&health, &ListQuery::default(), Utc::now())
            .await;
        assert!(matches!(result, Err(EncvError::Forbidden(_))));

        let result = dashboard
            .create::<JournalEntry>(&health, entry_form("wrong strand"), Utc::now())
            .await;
        assert!(matches!(result, Err(EncvError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_stamps_author_and_time() {
        let store = Store::memory();
        let dashboard = Dashboard::new(store.clone());
        let now = Utc::now();
        let alice = seed_user(&store, "alice", Role::Participant, Some(Strand::Education)).await;

        let created = dashboard
            .create::<JournalEntry>(&alice, entry_form("hi"), now)
            .await
            .unwrap();
        let stored: JournalEntry = store.get(id_of(&created)).await.unwrap().unwrap();

        assert_eq!(stored.meta.author, alice.id);
        assert_eq!(stored.meta.created, now);
        assert_eq!(stored.meta.last_updated, Some(now));
        assert_eq!(created["author"], "alice");
    }

    #[tokio::test]
    async fn test_edit_window_closes_after_two_weeks() {
        let store = Store::memory();
        let dashboard = Dashboard::new(store.clone());
        let created_at = Utc::now() - Duration::days(20);
        let alice = seed_user(&store, "alice", Role::Participant, Some(Strand::Education)).await;

        let entry = dashboard
            .create::<JournalEntry>(&alice, entry_form("old"), created_at)
            .await
            .unwrap();
        let id = id_of(&entry);

        let early = created_at + Duration::days(13);
        dashboard
            .update::<JournalEntry>(&alice, id, entry_form("edited"), early)
            .await
            .unwrap();

        let late = created_at + Duration::days(15);
        let result = dashboard
            .update::<JournalEntry>(&alice, id, entry_form("too late"), late)
            .await;
        assert!(matches!(result, Err(EncvError::Forbidden(_))));
        let result = dashboard.delete::<JournalEntry>(&alice, id, late).await;
        assert!(matches!(result, Err(EncvError::Forbidden(_))));

        // Edit preserved the original author
        let stored: JournalEntry = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.meta.author, alice.id);
        assert_eq!(stored.text.as_deref(), Some("edited"));
    }

    #[tokio::test]
    async fn test_questionnaire_allowed_viewers() {
        let store = Store::memory();
        let dashboard = Dashboard::new(store.clone());
        let now = Utc::now();
        let admin = seed_user(&store, "admin", Role::Admin, None).await;
        let alice = seed_user(&store, "alice", Role::Participant, Some(Strand::Education)).await;
        let bob = seed_user(&store, "bob", Role::Participant, Some(Strand::Education)).await;

        let open = QuestionnaireForm {
            title: "Everyone".into(),
            link_to_questionnaire: "https://forms.example.com/a".into(),
            allowed_viewers: vec![],
        };
        let restricted = QuestionnaireForm {
            title: "Only bob".into(),
            link_to_questionnaire: "https://forms.example.com/b".into(),
            allowed_viewers: vec![bob.id.unwrap()],
        };
        dashboard.create::<Questionnaire>(&admin, open, now).await.unwrap();
        dashboard.create::<Questionnaire>(&admin, restricted, now).await.unwrap();

        let for_alice = dashboard
            .list::<Questionnaire>(&alice, &ListQuery::default(), now)
            .await
            .unwrap();
        assert_eq!(for_alice.count, 1);
        assert!(!for_alice.can_add);

        let for_bob = dashboard
            .list::<Questionnaire>(&bob, &ListQuery::default(), now)
            .await
            .unwrap();
        assert_eq!(for_bob.count, 2);
        assert!(for_bob.results[0]["link_to_complete_questionnaire"]
            .as_str()
            .unwrap()
            .ends_with("?username=bob"));
    }

    #[tokio::test]
    async fn test_search_and_paging() {
        let store = Store::memory();
        let dashboard = Dashboard::new(store.clone());
        let now = Utc::now();
        let admin = seed_user(&store, "admin", Role::Admin, None).await;

        for i in 0..(LIST_PER_PAGE + 5) {
            let text = if i % 2 == 0 { "Garden visit" } else { "Library" };
            dashboard.create::<JournalEntry>(&admin, entry_form(text), now).await.unwrap();
        }

        let first = dashboard
            .list::<JournalEntry>(&admin, &ListQuery::default(), now)
            .await
            .unwrap();
        assert_eq!(first.num_pages, 2);
        assert_eq!(first.results.len(), LIST_PER_PAGE);

        let second = ListQuery {
            q: None,
            page: Some(2),
        };
        let second = dashboard.list::<JournalEntry>(&admin, &second, now).await.unwrap();
        assert_eq!(second.results.len(), 5);

        let search = ListQuery {
            q: Some("garden".into()),
            page: None,
        };
        let found = dashboard.list::<JournalEntry>(&admin, &search, now).await.unwrap();
        assert_eq!(found.count, 53);

        let beyond = ListQuery {
            q: None,
            page: Some(9),
        };
        assert!(dashboard.list::<JournalEntry>(&admin, &beyond, now).await.is_err());
    }

    #[tokio::test]
    async fn test_search_fields_per_model() {
        let store = Store::memory();
        let dashboard = Dashboard::new(store.clone());
        let now = Utc::now();
        let admin = seed_user(&store, "admin", Role::Admin, None).await;
        let edu = seed_user(&store, "jo.edu", Role::Participant, Some(Strand::Education)).await;
        let health = seed_user(&store, "sam.health", Role::Participant, Some(Strand::Health)).await;

        async fn hits<M: DashboardModel>(
            dashboard: &Dashboard,
            admin: &Principal,
            q: &str,
        ) -> usize {
            let query = ListQuery {
                q: Some(q.into()),
                page: None,
            };
            dashboard.list::<M>(admin, &query, Utc::now()).await.unwrap().count
        }

        let linked = JournalEntryForm {
            link: Some("https://example.com/allotment".into()),
            audio: Some("education/journal_entry/audio/walk.mp3".into()),
            ..Default::default()
        };
        let entry = dashboard.create::<JournalEntry>(&edu, linked, now).await.unwrap();
        dashboard.create::<JournalEntry>(&admin, entry_form("Library"), now).await.unwrap();
        let entry_id = id_of(&entry).to_string();

        assert_eq!(hits::<JournalEntry>(&dashboard, &admin, "example.com").await, 1);
        assert_eq!(hits::<JournalEntry>(&dashboard, &admin, "walk.mp3").await, 1);
        assert_eq!(hits::<JournalEntry>(&dashboard, &admin, "JO.EDU").await, 1);
        assert_eq!(hits::<JournalEntry>(&dashboard, &admin, &entry_id).await, 1);

        let form = QuestionnaireForm {
            title: "Baseline".into(),
            link_to_questionnaire: "https://forms.example.org/baseline".into(),
            allowed_viewers: vec![],
        };
        dashboard.create::<Questionnaire>(&admin, form, now).await.unwrap();
        assert_eq!(hits::<Questionnaire>(&dashboard, &admin, "forms.example.org").await, 1);
        assert_eq!(hits::<Questionnaire>(&dashboard, &admin, "admin").await, 1);
        assert_eq!(hits::<Questionnaire>(&dashboard, &admin, "followup").await, 0);

        let form = ConversationForm {
            conversation_date: now.date_naive(),
            conversation_audio: "health/conversation/audio/c1.mp3".into(),
            conversation_transcript: None,
            cancer_champion_reflection: Some("Talked about screening".into()),
        };
        let conversation = dashboard.create::<Conversation>(&health, form, now).await.unwrap();
        let conversation_id = id_of(&conversation).to_string();
        assert_eq!(hits::<Conversation>(&dashboard, &admin, &conversation_id).await, 1);
        assert_eq!(hits::<Conversation>(&dashboard, &admin, "screening").await, 1);
        assert_eq!(hits::<Conversation>(&dashboard, &admin, "sam.health").await, 1);

        assert_eq!(hits::<User>(&dashboard, &admin, "jo.edu").await, 1);
    }

    #[tokio::test]
    async fn test_usernames_unique_ignoring_case() {
        let store = Store::memory();
        let dashboard = Dashboard::new(store.clone());
        let admin = seed_user(&store, "admin", Role::Admin, None).await;

        let form = |name: &str| UserForm {
            username: name.into(),
            password: Some("a-long-password".into()),
            role: Some(Role::Participant),
            participant_strand: Some(Strand::Health),
            ..Default::default()
        };

        dashboard.create::<User>(&admin, form("Jo.Bloggs"), Utc::now()).await.unwrap();
        let result = dashboard.create::<User>(&admin, form("jo.bloggs"), Utc::now()).await;
        assert!(matches!(result, Err(EncvError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_users_cannot_be_deleted() {
        let store = Store::memory();
        let dashboard = Dashboard::new(store.clone());
        let admin = seed_user(&store, "admin", Role::Admin, None).await;

        let result = dashboard.delete::<User>(&admin, admin.id.unwrap().0, Utc::now()).await;
        assert!(matches!(result, Err(EncvError::Forbidden(_))));
    }

    #[test]
    fn test_index_for_participant() {
        let dashboard = Dashboard::new(Store::memory());
        let p = Principal {
            id: None,
            username: "h".into(),
            role: Some(Role::Participant),
            strand: Some(Strand::Health),
            authenticated: true,
        };

        let models: Vec<_> = dashboard.index(&p, Utc::now()).into_iter().map(|e| e.model).collect();
        assert_eq!(models, vec!["conversation", "video"]);
        assert!(dashboard.index(&Principal::anonymous(), Utc::now()).is_empty());
    }
}
