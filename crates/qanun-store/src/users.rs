//! User account persistence.
//!
//! Accounts are keyed records with sequential string ids. Username and email
//! are unique case-insensitively and stored lowercased; the password hash is
//! treated as an opaque string and never appears in a returned profile.

use std::sync::Arc;

use regex::Regex;
use tokio::sync::Mutex;
use tracing::info;

use qanun_core::types::{User, UserProfile};

use crate::backend::StorageBackend;
use crate::error::{Result, StoreError};

const NAMESPACE: &str = "users";

/// Registration input.
///
/// The password arrives pre-hashed; raw-password policy (minimum six
/// characters) is enforced by the caller before hashing. Empty `name` falls
/// back to the username as given, empty `surname` to `""`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub surname: Option<String>,
}

/// Keyed user storage with validation and uniqueness checks.
pub struct UserStore {
    backend: Arc<dyn StorageBackend>,
    write_lock: Mutex<()>,
    email_re: Regex,
    username_re: Regex,
}

impl UserStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
            email_re: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex"),
            username_re: Regex::new(r"^[a-zA-Z0-9_]+$").expect("Invalid username regex"),
        }
    }

    /// Register a new account.
    ///
    /// Validates email and username shape, rejects case-insensitive
    /// duplicates, assigns the next sequential id, and stores the
    /// identifiers lowercased. Returns the sanitized profile.
    pub async fn register(&self, new_user: NewUser) -> Result<UserProfile> {
        if !self.email_re.is_match(&new_user.email) {
            return Err(StoreError::Validation("Invalid email format".to_string()));
        }
        if new_user.username.len() < 3 || !self.username_re.is_match(&new_user.username) {
            return Err(StoreError::Validation(
                "Username must be at least 3 characters and contain only letters, numbers, and underscores"
                    .to_string(),
            ));
        }

        let _guard = self.write_lock.lock().await;

        let email_lower = new_user.email.to_lowercase();
        let username_lower = new_user.username.to_lowercase();

        let existing = self.load_all().await?;
        if existing.iter().any(|u| u.email == email_lower) {
            return Err(StoreError::Conflict("Email is already registered".to_string()));
        }
        if existing.iter().any(|u| u.username == username_lower) {
            return Err(StoreError::Conflict("Username is already taken".to_string()));
        }

        let name = new_user
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&new_user.username)
            .to_string();
        let surname = new_user
            .surname
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .to_string();

        let user = User {
            id: (existing.len() + 1).to_string(),
            username: username_lower,
            email: email_lower,
            name,
            surname,
            password_hash: new_user.password_hash,
        };

        self.persist(&user).await?;
        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user.profile())
    }

    /// Look up an account by username, case-insensitively.
    ///
    /// Returns the full record including the password hash, for credential
    /// verification at the boundary. Never serialize this into a response;
    /// use [`User::profile`].
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let wanted = username.to_lowercase();
        let users = self.load_all().await?;
        Ok(users.into_iter().find(|u| u.username == wanted))
    }

    /// Fetch the sanitized profile for a user id.
    pub async fn get(&self, user_id: &str) -> Result<Option<UserProfile>> {
        match self.backend.read(NAMESPACE, user_id).await? {
            Some(payload) => {
                let user: User =
                    serde_json::from_str(&payload).map_err(|e| StoreError::Corrupt {
                        namespace: NAMESPACE.to_string(),
                        id: user_id.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(Some(user.profile()))
            }
            None => Ok(None),
        }
    }

    async fn load_all(&self) -> Result<Vec<User>> {
        let mut users = Vec::new();
        for id in self.backend.list(NAMESPACE).await? {
            if let Some(payload) = self.backend.read(NAMESPACE, &id).await? {
                let user: User =
                    serde_json::from_str(&payload).map_err(|e| StoreError::Corrupt {
                        namespace: NAMESPACE.to_string(),
                        id: id.clone(),
                        reason: e.to_string(),
                    })?;
                users.push(user);
            }
        }
        Ok(users)
    }

    async fn persist(&self, user: &User) -> Result<()> {
        let payload = serde_json::to_string_pretty(user)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.backend.write(NAMESPACE, &user.id, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn make_store() -> UserStore {
        UserStore::new(Arc::new(MemoryBackend::new()))
    }

    fn make_new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash-1".to_string(),
            name: None,
            surname: None,
        }
    }

    #[tokio::test]
    async fn test_register_assigns_sequential_ids() {
        let store = make_store();

        let first = store
            .register(make_new_user("aysel", "aysel@example.az"))
            .await
            .unwrap();
        let second = store
            .register(make_new_user("elvin", "elvin@example.az"))
            .await
            .unwrap();

        assert_eq!(first.id, "1");
        assert_eq!(second.id, "2");
    }

    #[tokio::test]
    async fn test_register_lowercases_identifiers() {
        let store = make_store();
        let profile = store
            .register(make_new_user("Aysel_99", "Aysel@Example.AZ"))
            .await
            .unwrap();

        assert_eq!(profile.username, "aysel_99");
        assert_eq!(profile.email, "aysel@example.az");
    }

    #[tokio::test]
    async fn test_register_defaults_name_and_surname() {
        let store = make_store();
        let profile = store
            .register(make_new_user("rashad", "rashad@example.az"))
            .await
            .unwrap();

        assert_eq!(profile.name, "rashad");
        assert_eq!(profile.surname, "");
    }

    #[tokio::test]
    async fn test_register_keeps_given_name() {
        let store = make_store();
        let mut new_user = make_new_user("rashad", "rashad@example.az");
        new_user.name = Some("  Rəşad ".to_string());
        new_user.surname = Some("Əliyev".to_string());

        let profile = store.register(new_user).await.unwrap();
        assert_eq!(profile.name, "Rəşad");
        assert_eq!(profile.surname, "Əliyev");
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_email() {
        let store = make_store();
        let err = store
            .register(make_new_user("aysel", "not-an-email"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = store
            .register(make_new_user("aysel", "a b@example.az"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_short_username() {
        let store = make_store();
        let err = store
            .register(make_new_user("ab", "ab@example.az"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_username_charset() {
        let store = make_store();
        let err = store
            .register(make_new_user("ay-sel", "aysel@example.az"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_username_differs_only_in_case() {
        let store = make_store();
        store
            .register(make_new_user("aysel", "first@example.az"))
            .await
            .unwrap();

        let err = store
            .register(make_new_user("AYSEL", "second@example.az"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(err.to_string().contains("Username is already taken"));
    }

    #[tokio::test]
    async fn test_duplicate_email_differs_only_in_case() {
        let store = make_store();
        store
            .register(make_new_user("aysel", "same@example.az"))
            .await
            .unwrap();

        let err = store
            .register(make_new_user("elvin", "SAME@EXAMPLE.AZ"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(err.to_string().contains("Email is already registered"));
    }

    #[tokio::test]
    async fn test_find_by_username_is_case_insensitive() {
        let store = make_store();
        store
            .register(make_new_user("aysel", "aysel@example.az"))
            .await
            .unwrap();

        let user = store.find_by_username("AySeL").await.unwrap().unwrap();
        assert_eq!(user.username, "aysel");
        assert_eq!(user.password_hash, "hash-1");
    }

    #[tokio::test]
    async fn test_find_by_username_missing_is_none() {
        let store = make_store();
        assert!(store.find_by_username("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_returns_profile_without_hash() {
        let store = make_store();
        let profile = store
            .register(make_new_user("aysel", "aysel@example.az"))
            .await
            .unwrap();

        let fetched = store.get(&profile.id).await.unwrap().unwrap();
        assert_eq!(fetched, profile);

        let json = serde_json::to_string(&fetched).unwrap();
        assert!(!json.contains("hash-1"));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = make_store();
        assert!(store.get("42").await.unwrap().is_none());
    }
}
