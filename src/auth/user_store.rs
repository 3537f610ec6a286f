//! User Storage
//! Mission: Persist user accounts and their latest token pair in SQLite

use crate::auth::errors::{AuthError, ConflictField};
use crate::auth::models::{User, UserPage, UserRole};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, types::Type, Connection, ErrorCode, OptionalExtension, Row};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which unique key to match a user on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    Id(String),
    Email(String),
    Phone(String),
}

impl UserFilter {
    fn column(&self) -> &'static str {
        match self {
            UserFilter::Id(_) => "id",
            UserFilter::Email(_) => "email",
            UserFilter::Phone(_) => "phone",
        }
    }

    fn value(&self) -> &str {
        match self {
            UserFilter::Id(v) | UserFilter::Email(v) | UserFilter::Phone(v) => v,
        }
    }
}

/// Session fields rewritten on every login
#[derive(Debug, Clone)]
pub struct UserPatch {
    pub token: String,
    pub refresh_token: String,
    pub updated_at: DateTime<Utc>,
}

/// Persistence operations the auth flows need
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, AuthError>;

    async fn count(&self, filter: &UserFilter) -> Result<u64, AuthError>;

    /// Returns the stored id. Duplicate email/phone surfaces as `Conflict`.
    async fn insert_one(&self, user: &User) -> Result<String, AuthError>;

    /// Returns whether a row matched
    async fn update_one(&self, filter: &UserFilter, patch: &UserPatch) -> Result<bool, AuthError>;

    async fn list_page(&self, offset: u64, limit: u32) -> Result<UserPage, AuthError>;
}

const USER_COLUMNS: &str = "id, email, first_name, last_name, phone, user_type, password_hash, \
                            token, refresh_token, created_at, updated_at";

/// User storage with SQLite backend
#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    /// Open (or create) a user database file and initialize its schema
    pub fn new(db_path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(db_path).context("open auth db")?;
        let journal = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        });
        match journal {
            Ok(mode) if mode.eq_ignore_ascii_case("wal") => {}
            Ok(mode) => warn!(db_path, mode = %mode, "WAL journal mode not available"),
            Err(e) => warn!(db_path, error = %e, "Failed to set journal mode"),
        }
        if let Err(e) = conn.pragma_update(None, "synchronous", "NORMAL") {
            warn!(db_path, error = %e, "Failed to set synchronous mode");
        }
        Self::from_connection(conn)
    }

    /// Private in-memory database, gone when the store is dropped
    pub fn in_memory() -> anyhow::Result<Self> {
        Self::from_connection(Connection::open_in_memory().context("open in-memory auth db")?)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking SQLite call off the async executor.
    ///
    /// The work runs in a transaction. If the caller stops waiting (a storage
    /// deadline fired), the blocking side skips the work or rolls it back.
    async fn run<T, F>(&self, op: F) -> Result<T, AuthError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        let abandoned = AbandonOnDrop::default();
        let flag = abandoned.0.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            if flag.load(Ordering::SeqCst) {
                debug!("Skipping storage call, caller gave up");
                return Err(AuthError::Storage(anyhow!("storage call abandoned")));
            }

            let tx = guard.transaction().map_err(map_sqlite_error)?;
            let out = op(&*tx).map_err(map_sqlite_error)?;

            // Dropping the transaction rolls it back
            if flag.load(Ordering::SeqCst) {
                debug!("Rolling back storage call, caller gave up");
                return Err(AuthError::Storage(anyhow!("storage call abandoned")));
            }
            tx.commit().map_err(map_sqlite_error)?;
            Ok(out)
        })
        .await
        .map_err(|e| AuthError::Storage(e.into()))?
    }
}

/// Raised when the awaiting side of a storage call is dropped
#[derive(Default)]
struct AbandonOnDrop(Arc<AtomicBool>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Initialize database schema
fn init_db(conn: &Connection) -> anyhow::Result<()> {
    // Uniqueness lives in the schema so concurrent signups cannot both land
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT UNIQUE NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            phone TEXT UNIQUE NOT NULL,
            user_type TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            token TEXT,
            refresh_token TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .context("create users table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at ASC)",
        [],
    )
    .context("create users index")?;

    Ok(())
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(5)?;
    let user_type = role
        .parse::<UserRole>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        phone: row.get(4)?,
        user_type,
        password_hash: row.get(6)?,
        token: row.get(7)?,
        refresh_token: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn map_sqlite_error(err: rusqlite::Error) -> AuthError {
    if let rusqlite::Error::SqliteFailure(code, Some(message)) = &err {
        if code.code == ErrorCode::ConstraintViolation {
            // "UNIQUE constraint failed: users.email"
            let mut fields = Vec::new();
            if message.contains("users.email") {
                fields.push(ConflictField::Email);
            }
            if message.contains("users.phone") {
                fields.push(ConflictField::Phone);
            }
            if !fields.is_empty() {
                return AuthError::Conflict(fields);
            }
        }
    }
    AuthError::Storage(err.into())
}

#[async_trait]
impl UserRepository for SqliteUserStore {
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, AuthError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {} = ?1 LIMIT 1",
            filter.column()
        );
        let value = filter.value().to_string();

        self.run(move |conn| {
            conn.prepare_cached(&sql)?
                .query_row(params![value], user_from_row)
                .optional()
        })
        .await
    }

    async fn count(&self, filter: &UserFilter) -> Result<u64, AuthError> {
        let sql = format!("SELECT COUNT(*) FROM users WHERE {} = ?1", filter.column());
        let value = filter.value().to_string();

        let count: i64 = self
            .run(move |conn| conn.query_row(&sql, params![value], |row| row.get(0)))
            .await?;
        Ok(count as u64)
    }

    async fn insert_one(&self, user: &User) -> Result<String, AuthError> {
        let user = user.clone();

        let id = self
            .run(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO users ({USER_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                    ),
                    params![
                        user.id,
                        user.email,
                        user.first_name,
                        user.last_name,
                        user.phone,
                        user.user_type.as_str(),
                        user.password_hash,
                        user.token,
                        user.refresh_token,
                        user.created_at,
                        user.updated_at,
                    ],
                )?;
                Ok(user.id)
            })
            .await?;

        info!(user_id = %id, "Inserted user");
        Ok(id)
    }

    async fn update_one(&self, filter: &UserFilter, patch: &UserPatch) -> Result<bool, AuthError> {
        let sql = format!(
            "UPDATE users SET token = ?1, refresh_token = ?2, updated_at = ?3 WHERE {} = ?4",
            filter.column()
        );
        let value = filter.value().to_string();
        let patch = patch.clone();

        let rows = self
            .run(move |conn| {
                conn.execute(
                    &sql,
                    params![patch.token, patch.refresh_token, patch.updated_at, value],
                )
            })
            .await?;

        debug!(filter = ?filter, rows, "Updated session tokens");
        Ok(rows > 0)
    }

    async fn list_page(&self, offset: u64, limit: u32) -> Result<UserPage, AuthError> {
        self.run(move |conn| {
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;

            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {USER_COLUMNS} FROM users
                 ORDER BY created_at ASC, id ASC
                 LIMIT ?1 OFFSET ?2"
            ))?;
            let user_items = stmt
                .query_map(params![limit as i64, offset as i64], user_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(UserPage {
                total_count: total as u64,
                user_items,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::service::with_deadline;
    use chrono::Duration;
    use std::time::Duration as StdDuration;
    use tempfile::NamedTempFile;

    fn sample_user(n: u32) -> User {
        let created = Utc::now() + Duration::seconds(n as i64);
        User {
            id: format!("id-{n}"),
            email: format!("user{n}@x.com"),
            first_name: "Test".to_string(),
            last_name: format!("User{n}"),
            phone: format!("555-{n:04}"),
            user_type: UserRole::User,
            password_hash: "hash".to_string(),
            token: Some(format!("token-{n}")),
            refresh_token: Some(format!("refresh-{n}")),
            created_at: created,
            updated_at: created,
        }
    }

    #[tokio::test]
    async fn test_create_and_retrieve_user() {
        let store = SqliteUserStore::in_memory().unwrap();
        let user = sample_user(1);

        let id = store.insert_one(&user).await.unwrap();
        assert_eq!(id, user.id);

        let by_email = store
            .find_one(&UserFilter::Email(user.email.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email, user);

        let by_id = store.find_one(&UserFilter::Id(id)).await.unwrap();
        assert!(by_id.is_some());

        let missing = store
            .find_one(&UserFilter::Email("nobody@x.com".into()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_count_by_unique_keys() {
        let store = SqliteUserStore::in_memory().unwrap();
        store.insert_one(&sample_user(1)).await.unwrap();

        let by_email = store
            .count(&UserFilter::Email("user1@x.com".into()))
            .await
            .unwrap();
        let by_phone = store
            .count(&UserFilter::Phone("555-0001".into()))
            .await
            .unwrap();
        let other = store
            .count(&UserFilter::Phone("555-9999".into()))
            .await
            .unwrap();
        assert_eq!((by_email, by_phone, other), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_unique_constraints_map_to_conflict() {
        let store = SqliteUserStore::in_memory().unwrap();
        store.insert_one(&sample_user(1)).await.unwrap();

        let mut dup_email = sample_user(2);
        dup_email.email = "user1@x.com".into();
        let err = store.insert_one(&dup_email).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(ref f) if f == &[ConflictField::Email]));

        let mut dup_phone = sample_user(3);
        dup_phone.phone = "555-0001".into();
        let err = store.insert_one(&dup_phone).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(ref f) if f == &[ConflictField::Phone]));
    }

    #[tokio::test]
    async fn test_update_tokens() {
        let store = SqliteUserStore::in_memory().unwrap();
        let user = sample_user(1);
        store.insert_one(&user).await.unwrap();

        let patch = UserPatch {
            token: "new-access".into(),
            refresh_token: "new-refresh".into(),
            updated_at: Utc::now(),
        };
        let matched = store
            .update_one(&UserFilter::Id(user.id.clone()), &patch)
            .await
            .unwrap();
        assert!(matched);

        let stored = store
            .find_one(&UserFilter::Id(user.id.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.token.as_deref(), Some("new-access"));
        assert_eq!(stored.refresh_token.as_deref(), Some("new-refresh"));
        assert_eq!(stored.created_at, user.created_at);

        let missed = store
            .update_one(&UserFilter::Id("ghost".into()), &patch)
            .await
            .unwrap();
        assert!(!missed);
    }

    #[tokio::test]
    async fn test_list_users_paginates_in_creation_order() {
        let store = SqliteUserStore::in_memory().unwrap();
        for n in 1..=5 {
            store.insert_one(&sample_user(n)).await.unwrap();
        }

        let page = store.list_page(2, 2).await.unwrap();
        assert_eq!(page.total_count, 5);
        let ids: Vec<_> = page.user_items.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["id-3", "id-4"]);

        let past_end = store.list_page(10, 2).await.unwrap();
        assert_eq!(past_end.total_count, 5);
        assert!(past_end.user_items.is_empty());
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();

        {
            let store = SqliteUserStore::new(&db_path).unwrap();
            store.insert_one(&sample_user(7)).await.unwrap();
        }

        let reopened = SqliteUserStore::new(&db_path).unwrap();
        let count = reopened
            .count(&UserFilter::Email("user7@x.com".into()))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_abandoned_insert_never_lands() {
        let store = SqliteUserStore::in_memory().unwrap();
        let user = sample_user(1);

        // Keep the connection busy past the deadline
        let held = store.conn.lock();
        let err = with_deadline(StdDuration::from_millis(50), store.insert_one(&user))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Timeout(_)));
        drop(held);

        tokio::time::sleep(StdDuration::from_millis(100)).await;
        let found = store
            .find_one(&UserFilter::Id(user.id.clone()))
            .await
            .unwrap();
        assert!(found.is_none());

        // A retry is a fresh signup, not a conflict
        assert_eq!(store.insert_one(&user).await.unwrap(), user.id);
    }

    #[tokio::test]
    async fn test_abandoned_update_leaves_session_alone() {
        let store = SqliteUserStore::in_memory().unwrap();
        let user = sample_user(1);
        store.insert_one(&user).await.unwrap();

        let patch = UserPatch {
            token: "late-access".into(),
            refresh_token: "late-refresh".into(),
            updated_at: Utc::now(),
        };
        let held = store.conn.lock();
        let err = with_deadline(
            StdDuration::from_millis(50),
            store.update_one(&UserFilter::Id(user.id.clone()), &patch),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Timeout(_)));
        drop(held);

        tokio::time::sleep(StdDuration::from_millis(100)).await;
        let stored = store
            .find_one(&UserFilter::Id(user.id.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.token, user.token);
        assert_eq!(stored.refresh_token, user.refresh_token);
    }

    #[test]
    fn test_file_store_uses_wal() {
        let temp_file = NamedTempFile::new().unwrap();
        let store = SqliteUserStore::new(temp_file.path().to_str().unwrap()).unwrap();

        let mode: String = store
            .conn
            .lock()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
