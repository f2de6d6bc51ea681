//! User record storage
//!
//! `UserStore` is the seam between the gateway and wherever users live.
//! Registration goes through `insert`, which must check and insert under one
//! critical section so two concurrent registrations of the same username
//! cannot both succeed.
//!
//! `MemoryUserStore` keeps everything in a `RwLock<HashMap>`. Ids are
//! assigned from a counter and never reused.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::hasher::looks_like_bcrypt;

/// A stored user. `password_hash` never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// A user to be registered. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Abstraction over user persistence.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn UserStore>`).
pub trait UserStore: Send + Sync {
    /// Look up a user by exact username.
    fn find<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<UserRecord>>;

    /// Whether a username is taken.
    fn exists<'a>(&'a self, username: &'a str) -> StoreFuture<'a, bool>;

    /// Atomically register `user`, failing with `DuplicateUsername` if the
    /// username is already taken.
    fn insert(&self, user: NewUser) -> StoreFuture<'_, UserRecord>;

    /// Number of registered users.
    fn count(&self) -> StoreFuture<'_, usize>;
}

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<String, UserRecord>,
    last_id: i64,
}

impl MemoryState {
    fn insert(&mut self, user: NewUser) -> Result<UserRecord> {
        if self.users.contains_key(&user.username) {
            return Err(Error::DuplicateUsername(user.username));
        }
        self.last_id += 1;
        let record = UserRecord {
            id: self.last_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
        };
        self.users.insert(record.username.clone(), record.clone());
        Ok(record)
    }
}

/// Process-local user store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    state: RwLock<MemoryState>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `seed` users, ids assigned in order.
    ///
    /// Every seed must carry a bcrypt digest and a unique username.
    pub fn with_seed(seed: Vec<NewUser>) -> Result<Self> {
        let mut state = MemoryState::default();
        for user in seed {
            if !looks_like_bcrypt(&user.password_hash) {
                return Err(Error::InvalidRecord(format!(
                    "seed user {} does not have a bcrypt password_hash",
                    user.username
                )));
            }
            state.insert(user)?;
        }
        info!(users = state.users.len(), "seeded user store");
        Ok(Self {
            state: RwLock::new(state),
        })
    }
}

impl UserStore for MemoryUserStore {
    fn find<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<UserRecord>> {
        Box::pin(async move {
            let state = self.state.read().await;
            Ok(state.users.get(username).cloned())
        })
    }

    fn exists<'a>(&'a self, username: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let state = self.state.read().await;
            Ok(state.users.contains_key(username))
        })
    }

    fn insert(&self, user: NewUser) -> StoreFuture<'_, UserRecord> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let record = state.insert(user)?;
            debug!(user_id = record.id, username = %record.username, "registered user");
            Ok(record)
        })
    }

    fn count(&self) -> StoreFuture<'_, usize> {
        Box::pin(async move { Ok(self.state.read().await.users.len()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    // Structurally valid bcrypt digest; the password is irrelevant here.
    const DIGEST: &str = "$2a$10$P9iTmndOegEkd9OZ0DZxNOvWzemcb/bGGguvbWVBqGyCyX36vm77q";

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: format!("{username}@x.com"),
            password_hash: DIGEST.into(),
        }
    }

    #[tokio::test]
    async fn insert_then_find() {
        let store = MemoryUserStore::new();
        let record = store.insert(new_user("alice")).await.unwrap();
        assert_eq!(record.id, 1);

        let found = store.find("alice").await.unwrap().unwrap();
        assert_eq!(found, record);
        assert!(store.exists("alice").await.unwrap());
        assert!(!store.exists("bob").await.unwrap());
        assert!(store.find("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lookups_are_case_sensitive() {
        let store = MemoryUserStore::new();
        store.insert(new_user("alice")).await.unwrap();
        assert!(store.find("Alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = MemoryUserStore::new();
        store.insert(new_user("alice")).await.unwrap();

        let err = store.insert(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateUsername(ref name) if name == "alice"));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ids_increase_and_are_not_reused() {
        let store = MemoryUserStore::new();
        let a = store.insert(new_user("a")).await.unwrap();
        let _ = store.insert(new_user("a")).await;
        let b = store.insert(new_user("b")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registration_has_exactly_one_winner() {
        let store = Arc::new(MemoryUserStore::new());

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.insert(new_user("race")).await })
            })
            .collect();

        let mut winners = 0;
        let mut duplicates = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => winners += 1,
                Err(Error::DuplicateUsername(_)) => duplicates += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(duplicates, 31);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn seeded_users_are_findable() {
        let store = MemoryUserStore::with_seed(vec![new_user("testuser")]).unwrap();
        let user = store.find("testuser").await.unwrap().unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.email, "testuser@x.com");

        // Registration continues after the seeded ids.
        let next = store.insert(new_user("alice")).await.unwrap();
        assert_eq!(next.id, 2);
    }

    #[test]
    fn seed_rejects_plaintext_passwords() {
        let mut user = new_user("testuser");
        user.password_hash = "password123".into();
        let err = MemoryUserStore::with_seed(vec![user]).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)));
    }

    #[test]
    fn seed_rejects_duplicates() {
        let err = MemoryUserStore::with_seed(vec![new_user("x"), new_user("x")]).unwrap_err();
        assert!(matches!(err, Error::DuplicateUsername(_)));
    }

    #[tokio::test]
    async fn store_is_usable_as_trait_object() {
        let store: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
        store.insert(new_user("dyn")).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
