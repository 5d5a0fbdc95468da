//! MongoDB backend
//!
//! One collection per model. Records are stored as their serde form; ids are
//! hyphenated UUID strings under `id` (users) or `meta.id` (strand records).

use bson::{doc, Bson, Document};
use futures_util::TryStreamExt;
use mongodb::{
    options::{Collation, CollationStrength, IndexOptions},
    Client, Collection, IndexModel,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::identity::User;
use crate::records::{Conversation, JournalEntry, Questionnaire, Record, Video};
use crate::types::{EncvError, Result};

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify the connection with a ping
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast when MongoDB is unreachable instead of hanging on selection
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| EncvError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| EncvError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    fn collection<R: Record>(&self) -> Collection<R> {
        self.client
            .database(&self.db_name)
            .collection::<R>(R::MODEL.collection())
    }

    /// Create the unique id index on every collection, plus a
    /// case-insensitive unique index on usernames
    pub async fn ensure_indexes(&self) -> Result<()> {
        self.ensure_id_index::<User>().await?;
        self.ensure_id_index::<JournalEntry>().await?;
        self.ensure_id_index::<Questionnaire>().await?;
        self.ensure_id_index::<Conversation>().await?;
        self.ensure_id_index::<Video>().await?;

        let username_index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("username_unique_ci".to_string())
                    .collation(
                        Collation::builder()
                            .locale("en".to_string())
                            .strength(CollationStrength::Secondary)
                            .build(),
                    )
                    .build(),
            )
            .build();

        self.collection::<User>()
            .create_index(username_index)
            .await
            .map_err(|e| EncvError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    async fn ensure_id_index<R: Record>(&self) -> Result<()> {
        let mut keys = Document::new();
        keys.insert(R::ID_FIELD, 1);

        let index = IndexModel::builder()
            .keys(keys)
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name(format!("{}_id_unique", R::MODEL.collection()))
                    .build(),
            )
            .build();

        self.collection::<R>()
            .create_index(index)
            .await
            .map_err(|e| EncvError::Database(format!("Failed to create indexes: {}", e)))?;

        debug!("Index ready on {}.{}", R::MODEL.collection(), R::ID_FIELD);
        Ok(())
    }

    pub async fn list<R: Record>(&self) -> Result<Vec<R>> {
        let cursor = self
            .collection::<R>()
            .find(doc! {})
            .await
            .map_err(|e| EncvError::Database(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| EncvError::Database(format!("Error reading documents: {}", e)))
    }

    pub async fn get<R: Record>(&self, id: Uuid) -> Result<Option<R>> {
        self.collection::<R>()
            .find_one(id_filter::<R>(id))
            .await
            .map_err(|e| EncvError::Database(format!("Find failed: {}", e)))
    }

    pub async fn insert<R: Record>(&self, record: &R) -> Result<()> {
        if let Err(e) = self.collection::<R>().insert_one(record).await {
            let error_str = e.to_string();
            if error_str.contains("duplicate key") || error_str.contains("E11000") {
                return Err(EncvError::Conflict(format!(
                    "{} already exists",
                    R::MODEL.verbose_name()
                )));
            }
            return Err(EncvError::Database(format!("Insert failed: {}", e)));
        }
        Ok(())
    }

    pub async fn replace<R: Record>(&self, record: &R) -> Result<()> {
        let result = self
            .collection::<R>()
            .replace_one(id_filter::<R>(record.record_id()), record)
            .await
            .map_err(|e| EncvError::Database(format!("Update failed: {}", e)))?;

        if result.matched_count == 0 {
            return Err(EncvError::NotFound(format!(
                "{} {}",
                R::MODEL.verbose_name(),
                record.record_id()
            )));
        }
        Ok(())
    }

    pub async fn delete<R: Record>(&self, id: Uuid) -> Result<bool> {
        let result = self
            .collection::<R>()
            .delete_one(id_filter::<R>(id))
            .await
            .map_err(|e| EncvError::Database(format!("Delete failed: {}", e)))?;

        Ok(result.deleted_count > 0)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.collection::<User>()
            .find_one(username_filter(username))
            .await
            .map_err(|e| EncvError::Database(format!("Find failed: {}", e)))
    }
}

fn id_filter<R: Record>(id: Uuid) -> Document {
    let mut filter = Document::new();
    filter.insert(R::ID_FIELD, Bson::String(id.to_string()));
    filter
}

/// Anchored, escaped, case-insensitive match on the whole username
fn username_filter(username: &str) -> Document {
    doc! {
        "username": {
            "$regex": format!("^{}$", regex::escape(username)),
            "$options": "i",
        }
    }
}
