//! In-memory store
//!
//! Records are kept as JSON values keyed by model and id, so one map serves
//! every model type.

use dashmap::DashMap;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::identity::User;
use crate::records::{ModelKind, Record};
use crate::types::{EncvError, Result};

#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<ModelKind, BTreeMap<Uuid, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list<R: Record>(&self) -> Result<Vec<R>> {
        match self.collections.get(&R::MODEL) {
            Some(collection) => collection.values().map(decode).collect(),
            None => Ok(Vec::new()),
        }
    }

    pub fn get<R: Record>(&self, id: Uuid) -> Result<Option<R>> {
        self.collections
            .get(&R::MODEL)
            .and_then(|collection| collection.get(&id).map(decode))
            .transpose()
    }

    pub fn insert<R: Record>(&self, record: &R) -> Result<()> {
        let value = encode(record)?;
        let mut collection = self.collections.entry(R::MODEL).or_default();
        let id = record.record_id();
        if collection.contains_key(&id) {
            return Err(EncvError::Conflict(format!(
                "{} {} already exists",
                R::MODEL.verbose_name(),
                id
            )));
        }
        collection.insert(id, value);
        Ok(())
    }

    pub fn replace<R: Record>(&self, record: &R) -> Result<()> {
        let value = encode(record)?;
        let mut collection = self.collections.entry(R::MODEL).or_default();
        match collection.get_mut(&record.record_id()) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(EncvError::NotFound(format!(
                "{} {}",
                R::MODEL.verbose_name(),
                record.record_id()
            ))),
        }
    }

    pub fn delete<R: Record>(&self, id: Uuid) -> Result<bool> {
        Ok(self
            .collections
            .get_mut(&R::MODEL)
            .map(|mut collection| collection.remove(&id).is_some())
            .unwrap_or(false))
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .list::<User>()?
            .into_iter()
            .find(|user| user.username_matches(username)))
    }
}

fn encode<R: Record>(record: &R) -> Result<serde_json::Value> {
    serde_json::to_value(record)
        .map_err(|e| EncvError::Internal(format!("Failed to encode {}: {}", R::MODEL, e)))
}

fn decode<R: Record>(value: &serde_json::Value) -> Result<R> {
    R::deserialize(value)
        .map_err(|e| EncvError::Internal(format!("Failed to decode {}: {}", R::MODEL, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Role, Strand};
    use crate::records::{JournalEntry, RecordMeta};

    fn entry() -> JournalEntry {
        JournalEntry {
            meta: RecordMeta::new(None),
            text: Some("<p>Day one</p>".into()),
            link: None,
            image: None,
            audio: None,
            video: None,
            prompts: vec![],
        }
    }

    #[test]
    fn test_insert_get_replace_delete() {
        let store = MemoryStore::new();
        let mut e = entry();
        store.insert(&e).unwrap();

        let loaded: JournalEntry = store.get(e.meta.id).unwrap().unwrap();
        assert_eq!(loaded, e);

        e.text = Some("<p>Edited</p>".into());
        store.replace(&e).unwrap();
        let loaded: JournalEntry = store.get(e.meta.id).unwrap().unwrap();
        assert_eq!(loaded.text.as_deref(), Some("<p>Edited</p>"));

        assert!(store.delete::<JournalEntry>(e.meta.id).unwrap());
        assert!(!store.delete::<JournalEntry>(e.meta.id).unwrap());
        assert!(store.get::<JournalEntry>(e.meta.id).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_insert_conflicts() {
        let store = MemoryStore::new();
        let e = entry();
        store.insert(&e).unwrap();
        assert!(matches!(store.insert(&e), Err(EncvError::Conflict(_))));
    }

    #[test]
    fn test_replace_missing_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.replace(&entry()), Err(EncvError::NotFound(_))));
    }

    #[test]
    fn test_models_are_partitioned() {
        let store = MemoryStore::new();
        store.insert(&entry()).unwrap();
        let users: Vec<User> = store.list().unwrap();
        assert!(users.is_empty());
    }

    #[test]
    fn test_find_user_by_username_ignores_case() {
        let store = MemoryStore::new();
        let user = User::new(
            "My.Name@uni.ac.uk",
            "hash",
            Some(Role::Participant),
            Some(Strand::Health),
        );
        store.insert(&user).unwrap();

        let found = store.find_user_by_username("my.name@UNI.ac.uk").unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(store.find_user_by_username("someone.else").unwrap().is_none());
    }
}
