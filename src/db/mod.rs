//! Storage for users and strand records
//!
//! `Store` is the single persistence seam. The MongoDB backend is used in
//! production; the in-memory backend serves dev mode and tests. Both hand
//! back records in each model's default order.

pub mod memory;
pub mod mongo;

use std::sync::Arc;
use uuid::Uuid;

use tracing::info;

use crate::auth::hash_password;
use crate::identity::{Role, User};
use crate::records::Record;
use crate::types::Result;

pub use memory::MemoryStore;
pub use mongo::MongoClient;

/// Storage backend
#[derive(Clone)]
pub enum Store {
    Memory(Arc<MemoryStore>),
    Mongo(MongoClient),
}

impl Store {
    /// Fresh empty in-memory store
    pub fn memory() -> Self {
        Store::Memory(Arc::new(MemoryStore::new()))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Mongo(_) => "mongodb",
        }
    }

    /// All records of a model in default order
    pub async fn list<R: Record>(&self) -> Result<Vec<R>> {
        let mut items: Vec<R> = match self {
            Store::Memory(store) => store.list()?,
            Store::Mongo(client) => client.list().await?,
        };
        items.sort_by(R::default_order);
        Ok(items)
    }

    pub async fn get<R: Record>(&self, id: Uuid) -> Result<Option<R>> {
        match self {
            Store::Memory(store) => store.get(id),
            Store::Mongo(client) => client.get(id).await,
        }
    }

    /// Insert a new record; fails with `Conflict` if the id exists
    pub async fn insert<R: Record>(&self, record: &R) -> Result<()> {
        match self {
            Store::Memory(store) => store.insert(record),
            Store::Mongo(client) => client.insert(record).await,
        }
    }

    /// Replace an existing record; fails with `NotFound` if it is missing
    pub async fn replace<R: Record>(&self, record: &R) -> Result<()> {
        match self {
            Store::Memory(store) => store.replace(record),
            Store::Mongo(client) => client.replace(record).await,
        }
    }

    /// Delete a record, returning whether it existed
    pub async fn delete<R: Record>(&self, id: Uuid) -> Result<bool> {
        match self {
            Store::Memory(store) => store.delete::<R>(id),
            Store::Mongo(client) => client.delete::<R>(id).await,
        }
    }

    /// Case-insensitive username lookup
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        match self {
            Store::Memory(store) => store.find_user_by_username(username),
            Store::Mongo(client) => client.find_user_by_username(username).await,
        }
    }

    /// Create an admin account unless a user with that name exists.
    /// Returns whether one was created.
    pub async fn seed_admin(&self, username: &str, password: &str) -> Result<bool> {
        if self.find_user_by_username(username).await?.is_some() {
            return Ok(false);
        }

        let admin = User::new(username, hash_password(password)?, Some(Role::Admin), None);
        self.insert(&admin).await?;
        info!("Seeded admin account '{}'", username);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;

    #[tokio::test]
    async fn test_seed_admin_once() {
        let store = Store::memory();
        assert!(store.seed_admin("admin", "dev-password-123").await.unwrap());
        assert!(!store.seed_admin("ADMIN", "other").await.unwrap());

        let admin = store.find_user_by_username("admin").await.unwrap().unwrap();
        assert!(admin.is_admin());
        assert!(verify_password("dev-password-123", &admin.password_hash).unwrap());
    }

    #[test]
    fn test_list_sorted_by_default_order() {
        let store = Store::memory();
        tokio_test::block_on(async {
            for name in ["carol", "Alice", "bob"] {
                store.insert(&User::new(name, "h", None, None)).await.unwrap();
            }
            let users: Vec<User> = store.list().await.unwrap();
            let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
            assert_eq!(names, vec!["Alice", "bob", "carol"]);
        });
    }
}
