//! MongoDB store

use super::{
    now_millis, ChatTurn, DocumentStore, FileRecord, SearchRecord, UserProfile, UserStats,
    UserUpsert, CHAT_HISTORY, FILE_METADATA, SEARCH_HISTORY, USERS,
};
use crate::config::StorageConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{ClientOptions, FindOptions, IndexOptions, UpdateOptions};
use mongodb::{Client, Collection, IndexModel};
use std::time::Duration;

/// MongoDB-backed document store
pub struct MongoStore {
    client: Client,
    users: Collection<UserProfile>,
    chat_history: Collection<ChatTurn>,
    file_metadata: Collection<FileRecord>,
    search_history: Collection<SearchRecord>,
}

impl MongoStore {
    /// Connect, ping the server and make sure `users.user_id` is unique
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| Error::Storage(format!("Invalid MongoDB URI: {}", e)))?;
        let timeout = Duration::from_secs(config.connect_timeout_secs);
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);
        options.app_name = Some("teleassist".to_string());

        let client = Client::with_options(options)?;
        let db = client.database(&config.database);

        db.run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| Error::Storage(format!("MongoDB connection failed: {}", e)))?;

        let users = db.collection::<UserProfile>(USERS);
        let unique_user = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        users.create_index(unique_user, None).await?;

        tracing::info!(database = %config.database, "MongoDB connection established");

        Ok(Self {
            users,
            chat_history: db.collection(CHAT_HISTORY),
            file_metadata: db.collection(FILE_METADATA),
            search_history: db.collection(SEARCH_HISTORY),
            client,
        })
    }
}

/// Update document for a user upsert. `created_at` is only written on insert
/// and a missing phone number never clears a stored one.
fn user_upsert_update(user: &UserProfile) -> Document {
    let mut set = doc! {
        "chat_id": user.chat_id,
        "username": user.username.clone(),
        "first_name": user.first_name.clone(),
        "last_name": user.last_name.clone(),
        "last_interaction": user.last_interaction,
    };
    if let Some(phone) = &user.phone_number {
        set.insert("phone_number", phone.clone());
    }

    doc! {
        "$set": set,
        "$setOnInsert": { "created_at": user.created_at },
    }
}

fn upsert_outcome(upserted_id: Option<&Bson>) -> UserUpsert {
    match upserted_id {
        Some(_) => UserUpsert::Created,
        None => UserUpsert::Updated,
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn upsert_user(&self, user: &UserProfile) -> Result<UserUpsert> {
        let result = self
            .users
            .update_one(
                doc! { "user_id": user.user_id },
                user_upsert_update(user),
                UpdateOptions::builder().upsert(true).build(),
            )
            .await?;

        Ok(upsert_outcome(result.upserted_id.as_ref()))
    }

    async fn update_user_contact(&self, user_id: i64, phone_number: &str) -> Result<()> {
        self.users
            .update_one(
                doc! { "user_id": user_id },
                doc! { "$set": { "phone_number": phone_number, "last_interaction": now_millis() } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn insert_chat_turn(&self, turn: &ChatTurn) -> Result<()> {
        self.chat_history.insert_one(turn, None).await?;
        self.users
            .update_one(
                doc! { "user_id": turn.user_id },
                doc! { "$set": { "last_interaction": turn.timestamp } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn insert_file_record(&self, record: &FileRecord) -> Result<()> {
        self.file_metadata.insert_one(record, None).await?;
        Ok(())
    }

    async fn insert_search_record(&self, record: &SearchRecord) -> Result<()> {
        self.search_history.insert_one(record, None).await?;
        Ok(())
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<UserProfile>> {
        Ok(self.users.find_one(doc! { "user_id": user_id }, None).await?)
    }

    async fn user_stats(&self, user_id: i64) -> Result<UserStats> {
        let filter = doc! { "user_id": user_id };

        Ok(UserStats {
            total_messages: self
                .chat_history
                .count_documents(filter.clone(), None)
                .await?,
            total_files: self
                .file_metadata
                .count_documents(filter.clone(), None)
                .await?,
            total_searches: self
                .search_history
                .count_documents(filter, None)
                .await?,
            join_date: self.get_user(user_id).await?.map(|u| u.created_at),
        })
    }

    async fn recent_chat_turns(&self, user_id: i64, limit: usize) -> Result<Vec<ChatTurn>> {
        let options = FindOptions::builder()
            .sort(doc! { "timestamp": -1 })
            .limit(limit as i64)
            .build();

        let cursor = self
            .chat_history
            .find(doc! { "user_id": user_id }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().shutdown().await;
        tracing::info!("MongoDB connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            username: Some("ada".to_string()),
            ..UserProfile::new(7, 70, "Ada")
        }
    }

    #[test]
    fn test_upsert_writes_created_at_only_on_insert() {
        let user = profile();
        let update = user_upsert_update(&user);

        let set = update.get_document("$set").unwrap();
        assert!(!set.contains_key("created_at"));
        assert!(!set.contains_key("user_id"));
        assert_eq!(set.get_i64("chat_id").unwrap(), 70);
        assert_eq!(set.get_str("username").unwrap(), "ada");
        assert_eq!(set.get("last_name"), Some(&Bson::Null));
        assert_eq!(set.get_i64("last_interaction").unwrap(), user.last_interaction);

        let on_insert = update.get_document("$setOnInsert").unwrap();
        assert_eq!(on_insert.len(), 1);
        assert_eq!(on_insert.get_i64("created_at").unwrap(), user.created_at);
    }

    #[test]
    fn test_upsert_keeps_stored_phone_number() {
        let without = user_upsert_update(&profile());
        assert!(!without.get_document("$set").unwrap().contains_key("phone_number"));

        let user = UserProfile {
            phone_number: Some("+15550100".to_string()),
            ..profile()
        };
        let with = user_upsert_update(&user);
        assert_eq!(
            with.get_document("$set").unwrap().get_str("phone_number").unwrap(),
            "+15550100"
        );
    }

    #[test]
    fn test_upsert_outcome() {
        assert_eq!(upsert_outcome(Some(&Bson::Int64(1))), UserUpsert::Created);
        assert_eq!(upsert_outcome(None), UserUpsert::Updated);
    }

    #[tokio::test]
    async fn test_invalid_uri_is_storage_error() {
        let config = StorageConfig {
            uri: "not-a-mongodb-uri".to_string(),
            ..Default::default()
        };

        let err = MongoStore::connect(&config).await.err().unwrap();
        assert!(matches!(err, Error::Storage(_)));
        assert!(err.to_string().contains("Invalid MongoDB URI"));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_fast() {
        let config = StorageConfig {
            uri: "mongodb://127.0.0.1:9/?directConnection=true".to_string(),
            connect_timeout_secs: 1,
            ..Default::default()
        };

        let err = MongoStore::connect(&config).await.err().unwrap();
        assert!(err.to_string().contains("MongoDB connection failed"));
    }
}
