// User store: trait plus PostgreSQL and in-memory implementations

use axum::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::auth::{
    error::AuthError,
    models::{NewUser, Role, User},
};

/// Persistence for stored credential records.
///
/// Implementations must enforce email uniqueness atomically: `insert` and
/// `update_credentials` report `DuplicateIdentifier` rather than creating a
/// second record. Driver failures surface as `StoreUnavailable`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AuthError>;

    async fn insert(&self, user: NewUser) -> Result<User, AuthError>;

    async fn list(&self) -> Result<Vec<User>, AuthError>;

    async fn update_credentials(
        &self,
        id: i32,
        email: Option<String>,
        password_hash: Option<String>,
    ) -> Result<Option<User>, AuthError>;

    async fn update_role(&self, id: i32, role: Role) -> Result<Option<User>, AuthError>;

    async fn delete(&self, id: i32) -> Result<bool, AuthError>;
}

const USER_COLUMNS: &str = "id, email, password_hash, role, created_at, updated_at";

/// Map a sqlx error, turning unique violations into `DuplicateIdentifier`
fn map_store_error(e: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AuthError::DuplicateIdentifier;
        }
    }
    AuthError::StoreUnavailable(e.to_string())
}

/// PostgreSQL-backed user store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new PgUserStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    /// Find a user by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_store_error)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AuthError> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_store_error)
    }

    async fn insert(&self, user: NewUser) -> Result<User, AuthError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, role) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(map_store_error)
    }

    async fn list(&self) -> Result<Vec<User>, AuthError> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(map_store_error)
    }

    async fn update_credentials(
        &self,
        id: i32,
        email: Option<String>,
        password_hash: Option<String>,
    ) -> Result<Option<User>, AuthError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email = COALESCE($1, email),
                password_hash = COALESCE($2, password_hash),
                updated_at = NOW()
            WHERE id = $3
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(email)
        .bind(password_hash)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_store_error)
    }

    async fn update_role(&self, id: i32, role: Role) -> Result<Option<User>, AuthError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(role)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_store_error)
    }

    async fn delete(&self, id: i32) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_store_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<i32, User>,
    last_id: i32,
}

impl MemoryState {
    fn email_taken(&self, email: &str, except: Option<i32>) -> bool {
        self.users
            .values()
            .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email))
    }
}

/// Process-local user store for development runs and tests.
///
/// Uniqueness checks and writes happen under one write lock, which gives the
/// same atomicity the database's unique index does.
#[derive(Default)]
pub struct InMemoryUserStore {
    state: RwLock<MemoryState>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AuthError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, AuthError> {
        let mut state = self.state.write().await;
        if state.email_taken(&user.email, None) {
            return Err(AuthError::DuplicateIdentifier);
        }

        state.last_id += 1;
        let now = Utc::now();
        let record = User {
            id: state.last_id,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.state.read().await.users.values().cloned().collect())
    }

    async fn update_credentials(
        &self,
        id: i32,
        email: Option<String>,
        password_hash: Option<String>,
    ) -> Result<Option<User>, AuthError> {
        let mut state = self.state.write().await;
        if let Some(ref new_email) = email {
            if state.email_taken(new_email, Some(id)) {
                return Err(AuthError::DuplicateIdentifier);
            }
        }

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(new_email) = email {
            user.email = new_email;
        }
        if let Some(new_hash) = password_hash {
            user.password_hash = new_hash;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_role(&self, id: i32, role: Role) -> Result<Option<User>, AuthError> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(&id).map(|user| {
            user.role = role;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn delete(&self, id: i32) -> Result<bool, AuthError> {
        Ok(self.state.write().await.users.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = InMemoryUserStore::new();
        let first = store.insert(new_user("a@x.com")).await.unwrap();
        let second = store.insert(new_user("b@x.com")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.role, Role::User);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_case_insensitively() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("a@x.com")).await.unwrap();

        let result = store.insert(new_user("A@X.COM")).await;
        assert!(matches!(result, Err(AuthError::DuplicateIdentifier)));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_email_and_id() {
        let store = InMemoryUserStore::new();
        let created = store.insert(new_user("a@x.com")).await.unwrap();

        let by_email = store.find_by_email("A@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert!(store.find_by_id(created.id).await.unwrap().is_some());
        assert!(store.find_by_id(999).await.unwrap().is_none());
        assert!(store.find_by_email("nobody@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_credentials() {
        let store = InMemoryUserStore::new();
        let a = store.insert(new_user("a@x.com")).await.unwrap();
        store.insert(new_user("b@x.com")).await.unwrap();

        let updated = store
            .update_credentials(a.id, Some("c@x.com".to_string()), Some("new_hash".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.email, "c@x.com");
        assert_eq!(updated.password_hash, "new_hash");

        // Keeping your own email is not a conflict
        assert!(store
            .update_credentials(a.id, Some("c@x.com".to_string()), None)
            .await
            .is_ok());

        let taken = store
            .update_credentials(a.id, Some("b@x.com".to_string()), None)
            .await;
        assert!(matches!(taken, Err(AuthError::DuplicateIdentifier)));

        assert!(store.update_credentials(999, None, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_role_and_delete() {
        let store = InMemoryUserStore::new();
        let user = store.insert(new_user("a@x.com")).await.unwrap();

        let promoted = store.update_role(user.id, Role::Admin).await.unwrap().unwrap();
        assert_eq!(promoted.role, Role::Admin);
        assert!(store.update_role(999, Role::Admin).await.unwrap().is_none());

        assert!(store.delete(user.id).await.unwrap());
        assert!(!store.delete(user.id).await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }
}
