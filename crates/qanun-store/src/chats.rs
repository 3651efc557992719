//! Chat persistence.
//!
//! Each chat is one keyed record holding the full message list. Every
//! operation takes the requesting user id and fails closed: a chat that does
//! not exist and a chat owned by someone else produce the same denied
//! outcome, so callers cannot probe for foreign chat ids.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use qanun_core::types::{Chat, Message, Role};

use crate::backend::StorageBackend;
use crate::error::{Result, StoreError};

const NAMESPACE: &str = "chats";

/// Keyed chat storage with ownership enforcement.
///
/// A store-wide mutex serializes every read-modify-write, so two concurrent
/// appends to the same chat cannot drop each other's message.
pub struct ChatStore {
    backend: Arc<dyn StorageBackend>,
    write_lock: Mutex<()>,
}

impl ChatStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// Create a chat owned by `user_id`.
    ///
    /// The chat id is the creation time in milliseconds, bumped until unused
    /// so same-instant creates still get distinct ids. An initial message,
    /// when given, is stored with id `"1"`.
    pub async fn create_chat(
        &self,
        user_id: &str,
        title: &str,
        initial_message: Option<(Role, String)>,
    ) -> Result<Chat> {
        let _guard = self.write_lock.lock().await;

        let now = Utc::now();
        let mut millis = now.timestamp_millis();
        let mut id = millis.to_string();
        while self.backend.read(NAMESPACE, &id).await?.is_some() {
            millis += 1;
            id = millis.to_string();
        }

        let messages = match initial_message {
            Some((role, content)) => vec![Message {
                id: "1".to_string(),
                role,
                content,
                timestamp: now,
                original_language: None,
                display_language: None,
            }],
            None => Vec::new(),
        };

        let chat = Chat {
            id,
            user_id: user_id.to_string(),
            title: title.to_string(),
            messages,
            created_at: now,
            updated_at: now,
        };

        self.persist(&chat).await?;
        info!(chat_id = %chat.id, user_id = %chat.user_id, "Chat created");
        Ok(chat)
    }

    /// Fetch a chat if it exists and is owned by `user_id`.
    pub async fn get_chat(&self, chat_id: &str, user_id: &str) -> Result<Option<Chat>> {
        self.load_owned(chat_id, user_id).await
    }

    /// Append a message, assigning the next sequential id and refreshing
    /// `updated_at`. `languages` carries `(original, display)` tags for
    /// assistant messages produced by the legal-answer path.
    ///
    /// Returns `None` when the chat is missing or not owned by `user_id`.
    pub async fn add_message_to_chat(
        &self,
        chat_id: &str,
        user_id: &str,
        role: Role,
        content: &str,
        languages: Option<(String, String)>,
    ) -> Result<Option<Message>> {
        let _guard = self.write_lock.lock().await;

        let Some(mut chat) = self.load_owned(chat_id, user_id).await? else {
            return Ok(None);
        };

        let (original_language, display_language) = match languages {
            Some((original, display)) => (Some(original), Some(display)),
            None => (None, None),
        };

        let message = Message {
            id: (chat.messages.len() + 1).to_string(),
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
            original_language,
            display_language,
        };

        chat.messages.push(message.clone());
        chat.updated_at = message.timestamp;
        self.persist(&chat).await?;

        debug!(chat_id = %chat.id, message_id = %message.id, "Message appended");
        Ok(Some(message))
    }

    /// Rename a chat, refreshing `updated_at`.
    ///
    /// Returns `None` when the chat is missing or not owned by `user_id`.
    pub async fn rename_chat(
        &self,
        chat_id: &str,
        user_id: &str,
        title: &str,
    ) -> Result<Option<Chat>> {
        let _guard = self.write_lock.lock().await;

        let Some(mut chat) = self.load_owned(chat_id, user_id).await? else {
            return Ok(None);
        };

        chat.title = title.to_string();
        chat.updated_at = Utc::now();
        self.persist(&chat).await?;

        info!(chat_id = %chat.id, "Chat renamed");
        Ok(Some(chat))
    }

    /// Delete a chat. Returns `false`, leaving storage untouched, when the
    /// chat is missing or not owned by `user_id`.
    pub async fn delete_chat(&self, chat_id: &str, user_id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        if self.load_owned(chat_id, user_id).await?.is_none() {
            debug!(chat_id = %chat_id, user_id = %user_id, "Delete denied");
            return Ok(false);
        }

        let removed = self.backend.remove(NAMESPACE, chat_id).await?;
        if removed {
            info!(chat_id = %chat_id, "Chat deleted");
        }
        Ok(removed)
    }

    /// All chats owned by `user_id`, most recently updated first.
    pub async fn user_chats(&self, user_id: &str) -> Result<Vec<Chat>> {
        let mut chats = Vec::new();
        for id in self.backend.list(NAMESPACE).await? {
            if let Some(chat) = self.load(&id).await? {
                if chat.user_id == user_id {
                    chats.push(chat);
                }
            }
        }
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(chats)
    }

    async fn load(&self, chat_id: &str) -> Result<Option<Chat>> {
        match self.backend.read(NAMESPACE, chat_id).await? {
            Some(payload) => {
                let chat =
                    serde_json::from_str(&payload).map_err(|e| StoreError::Corrupt {
                        namespace: NAMESPACE.to_string(),
                        id: chat_id.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(Some(chat))
            }
            None => Ok(None),
        }
    }

    /// Load a chat, collapsing "missing" and "owned by someone else" into
    /// `None`.
    async fn load_owned(&self, chat_id: &str, user_id: &str) -> Result<Option<Chat>> {
        match self.load(chat_id).await? {
            Some(chat) if chat.user_id == user_id => Ok(Some(chat)),
            Some(_) => {
                debug!(chat_id = %chat_id, user_id = %user_id, "Access denied");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn persist(&self, chat: &Chat) -> Result<()> {
        let payload = serde_json::to_string_pretty(chat)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.backend.write(NAMESPACE, &chat.id, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn make_store() -> ChatStore {
        ChatStore::new(Arc::new(MemoryBackend::new()))
    }

    // ---- create / get ----

    #[tokio::test]
    async fn test_create_and_get_round_trip() {
        let store = make_store();
        let chat = store
            .create_chat("1", "Mülkiyyət sualı", Some((Role::User, "Salam".to_string())))
            .await
            .unwrap();

        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].id, "1");
        assert_eq!(chat.messages[0].role, Role::User);
        assert_eq!(chat.created_at, chat.updated_at);

        let fetched = store.get_chat(&chat.id, "1").await.unwrap().unwrap();
        assert_eq!(fetched, chat);
    }

    #[tokio::test]
    async fn test_create_without_initial_message() {
        let store = make_store();
        let chat = store.create_chat("1", "New Chat", None).await.unwrap();
        assert!(chat.messages.is_empty());
        assert_eq!(chat.title, "New Chat");
    }

    #[tokio::test]
    async fn test_sequential_creates_get_distinct_ids() {
        let store = make_store();
        let a = store.create_chat("1", "a", None).await.unwrap();
        let b = store.create_chat("1", "b", None).await.unwrap();
        let c = store.create_chat("1", "c", None).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
        assert_ne!(a.id, c.id);
    }

    #[tokio::test]
    async fn test_get_foreign_chat_is_none() {
        let store = make_store();
        let chat = store.create_chat("1", "mine", None).await.unwrap();
        assert!(store.get_chat(&chat.id, "2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_missing_chat_is_none() {
        let store = make_store();
        assert!(store.get_chat("999", "1").await.unwrap().is_none());
    }

    // ---- append ----

    #[tokio::test]
    async fn test_append_assigns_sequential_ids() {
        let store = make_store();
        let chat = store
            .create_chat("1", "t", Some((Role::User, "birinci".to_string())))
            .await
            .unwrap();

        let second = store
            .add_message_to_chat(&chat.id, "1", Role::Assistant, "ikinci", None)
            .await
            .unwrap()
            .unwrap();
        let third = store
            .add_message_to_chat(&chat.id, "1", Role::User, "üçüncü", None)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(second.id, "2");
        assert_eq!(third.id, "3");

        let fetched = store.get_chat(&chat.id, "1").await.unwrap().unwrap();
        assert_eq!(fetched.messages.len(), 3);
        assert_eq!(fetched.messages.last().unwrap(), &third);
    }

    #[tokio::test]
    async fn test_append_refreshes_updated_at() {
        let store = make_store();
        let chat = store.create_chat("1", "t", None).await.unwrap();
        let before = chat.updated_at;

        store
            .add_message_to_chat(&chat.id, "1", Role::User, "salam", None)
            .await
            .unwrap()
            .unwrap();

        let fetched = store.get_chat(&chat.id, "1").await.unwrap().unwrap();
        assert!(fetched.updated_at >= before);
        assert_eq!(fetched.updated_at, fetched.messages[0].timestamp);
    }

    #[tokio::test]
    async fn test_append_sets_language_tags() {
        let store = make_store();
        let chat = store.create_chat("1", "t", None).await.unwrap();

        let msg = store
            .add_message_to_chat(
                &chat.id,
                "1",
                Role::Assistant,
                "Cavab",
                Some(("az".to_string(), "en".to_string())),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(msg.original_language.as_deref(), Some("az"));
        assert_eq!(msg.display_language.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_append_denied_for_foreign_user() {
        let store = make_store();
        let chat = store.create_chat("1", "t", None).await.unwrap();

        let denied = store
            .add_message_to_chat(&chat.id, "2", Role::User, "hack", None)
            .await
            .unwrap();
        assert!(denied.is_none());

        let fetched = store.get_chat(&chat.id, "1").await.unwrap().unwrap();
        assert!(fetched.messages.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_appends_both_survive() {
        let store = Arc::new(make_store());
        let chat = store.create_chat("1", "race", None).await.unwrap();

        let s1 = Arc::clone(&store);
        let s2 = Arc::clone(&store);
        let id1 = chat.id.clone();
        let id2 = chat.id.clone();

        let (a, b) = tokio::join!(
            tokio::spawn(async move {
                s1.add_message_to_chat(&id1, "1", Role::User, "birinci", None)
                    .await
            }),
            tokio::spawn(async move {
                s2.add_message_to_chat(&id2, "1", Role::User, "ikinci", None)
                    .await
            }),
        );
        let a = a.unwrap().unwrap().unwrap();
        let b = b.unwrap().unwrap().unwrap();
        assert_ne!(a.id, b.id);

        let fetched = store.get_chat(&chat.id, "1").await.unwrap().unwrap();
        assert_eq!(fetched.messages.len(), 2);
    }

    // ---- rename / delete ----

    #[tokio::test]
    async fn test_rename_updates_title_and_timestamp() {
        let store = make_store();
        let chat = store.create_chat("1", "old", None).await.unwrap();

        let renamed = store
            .rename_chat(&chat.id, "1", "new title")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.title, "new title");
        assert!(renamed.updated_at >= chat.updated_at);
    }

    #[tokio::test]
    async fn test_rename_denied_for_foreign_user() {
        let store = make_store();
        let chat = store.create_chat("1", "old", None).await.unwrap();

        assert!(store
            .rename_chat(&chat.id, "2", "stolen")
            .await
            .unwrap()
            .is_none());

        let fetched = store.get_chat(&chat.id, "1").await.unwrap().unwrap();
        assert_eq!(fetched.title, "old");
    }

    #[tokio::test]
    async fn test_delete_owned_chat() {
        let store = make_store();
        let chat = store.create_chat("1", "t", None).await.unwrap();

        assert!(store.delete_chat(&chat.id, "1").await.unwrap());
        assert!(store.get_chat(&chat.id, "1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_denied_leaves_chat_intact() {
        let store = make_store();
        let chat = store
            .create_chat("1", "t", Some((Role::User, "qorunan".to_string())))
            .await
            .unwrap();

        assert!(!store.delete_chat(&chat.id, "2").await.unwrap());

        let fetched = store.get_chat(&chat.id, "1").await.unwrap().unwrap();
        assert_eq!(fetched.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_chat_is_false() {
        let store = make_store();
        assert!(!store.delete_chat("999", "1").await.unwrap());
    }

    // ---- listing ----

    #[tokio::test]
    async fn test_user_chats_filters_by_owner() {
        let store = make_store();
        let mine = store.create_chat("1", "mine", None).await.unwrap();
        store.create_chat("2", "theirs", None).await.unwrap();

        let chats = store.user_chats("1").await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].id, mine.id);
    }

    #[tokio::test]
    async fn test_user_chats_newest_first() {
        let store = make_store();
        let first = store.create_chat("1", "first", None).await.unwrap();
        let second = store.create_chat("1", "second", None).await.unwrap();

        // Touch the older chat so it becomes the most recently updated.
        store
            .add_message_to_chat(&first.id, "1", Role::User, "yeniləmə", None)
            .await
            .unwrap()
            .unwrap();

        let chats = store.user_chats("1").await.unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].id, first.id);
        assert_eq!(chats[1].id, second.id);
    }

    #[tokio::test]
    async fn test_user_chats_empty_for_unknown_user() {
        let store = make_store();
        assert!(store.user_chats("ghost").await.unwrap().is_empty());
    }

    // ---- corruption ----

    #[tokio::test]
    async fn test_corrupt_record_is_reported() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write("chats", "13", "not json").await.unwrap();
        let store = ChatStore::new(backend);

        let err = store.get_chat("13", "1").await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert!(err.to_string().contains("chats/13"));
    }
}
