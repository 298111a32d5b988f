use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use snip_core::{CodeGenerator, LinkStore, ReadStore, Result, Role, ShortLink, StoreError, User};
use snip_generator::RandomCodeGenerator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::config::{StoreConfig, StoreLocation};
use crate::migrate;

/// How long a write waits behind a conflicting transaction before failing
/// with a busy error instead of queuing indefinitely.
const BUSY_TIMEOUT: Duration = Duration::from_millis(128);

/// Probe interval for [`SqliteRepository::wait`] when the busy-timeout
/// pragma is unreadable or zero.
const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// Attempts at finding an unused generated code before giving up.
const MAX_CODE_ATTEMPTS: usize = 16;

const UPSERT_USER: &str = "
INSERT INTO users (username, email, role)
VALUES (?, ?, ?)
ON CONFLICT(username) DO UPDATE SET
    email = excluded.email,
    role = excluded.role
";

const UPSERT_LINK: &str = "
INSERT INTO links (short, original, owner, date_created, date_expired)
VALUES (?, ?, ?, ?, ?)
ON CONFLICT(short) DO UPDATE SET
    original = excluded.original,
    owner = excluded.owner,
    date_created = excluded.date_created,
    date_expired = excluded.date_expired
";

const SELECT_LINK: &str = "
SELECT short, original, owner, date_created, date_expired
FROM links
WHERE short = ?
";

const SELECT_USER: &str = "
SELECT username, email, role
FROM users
WHERE username = ?
";

const DELETE_LINK: &str = "
DELETE FROM links
WHERE short = ?
";

/// SQLite implementation of the link store contract.
///
/// Rows store the owner as a nullable username reference into `users`;
/// timestamps are serialized as fixed-width RFC 3339 UTC strings so that
/// lexical order matches chronological order. The connection enables
/// foreign-key enforcement and a short busy timeout, so a writer blocked
/// behind another transaction fails fast with `StoreError::Busy` rather
/// than queuing; callers needing resilience retry explicitly.
#[derive(Debug, Clone)]
pub struct SqliteRepository<G: CodeGenerator = RandomCodeGenerator> {
    pool: SqlitePool,
    generator: G,
}

impl SqliteRepository {
    /// Opens the configured store (creating the database file if needed,
    /// never truncating an existing one), enables the consistency pragmas,
    /// and brings the schema to the latest version.
    ///
    /// Never returns a partially initialized handle: a failure anywhere,
    /// including a failed migration step, is the caller's error.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        Self::open_with_generator(config, RandomCodeGenerator::new()).await
    }
}

impl<G: CodeGenerator> SqliteRepository<G> {
    /// Same as [`SqliteRepository::open`] with a caller-chosen code
    /// generator.
    pub async fn open_with_generator(config: &StoreConfig, generator: G) -> Result<Self> {
        let pool = match &config.location {
            StoreLocation::Memory => {
                let options = SqliteConnectOptions::new()
                    .in_memory(true)
                    .foreign_keys(true)
                    .busy_timeout(BUSY_TIMEOUT);
                // An in-memory database lives inside its connection, so
                // the pool is pinned to a single one that is never reaped.
                SqlitePoolOptions::new()
                    .min_connections(1)
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options)
                    .await
            }
            StoreLocation::File(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await.map_err(|e| {
                            StoreError::Unavailable(format!(
                                "failed to create store directory: {e}"
                            ))
                        })?;
                    }
                }
                let options = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .foreign_keys(true)
                    .busy_timeout(BUSY_TIMEOUT);
                SqlitePool::connect_with(options).await
            }
        }
        .map_err(|e| StoreError::Unavailable(format!("failed to open store: {e}")))?;

        migrate::apply_migrations(&pool).await?;
        tracing::info!(location = ?config.location, "store opened");

        Ok(Self { pool, generator })
    }

    /// Creates a repository from an existing pool. The caller is
    /// responsible for having run the migrations.
    pub fn new(pool: SqlitePool, generator: G) -> Self {
        Self { pool, generator }
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Single liveness probe.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Blocks until a liveness probe succeeds, retrying forever at the
    /// configured busy-timeout interval (500 ms when the pragma is
    /// unreadable or zero). Intended for startup ordering only; there is
    /// no cancellation path.
    pub async fn wait(&self) {
        let interval = self.probe_interval().await;
        loop {
            if self.ping().await.is_ok() {
                return;
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn probe_interval(&self) -> Duration {
        let timeout: Option<i64> = sqlx::query_scalar("PRAGMA busy_timeout")
            .fetch_one(&self.pool)
            .await
            .ok();
        match timeout {
            Some(ms) if ms > 0 => Duration::from_millis(ms as u64),
            _ => DEFAULT_PROBE_INTERVAL,
        }
    }

    /// Insert-or-replace keyed by username; every non-key field is
    /// overwritten unconditionally, last writer wins.
    pub async fn upsert_user(&self, user: &User) -> Result<()> {
        sqlx::query(UPSERT_USER)
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.role.as_i64())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Fetches a user by username.
    pub async fn user(&self, username: &str) -> Result<User> {
        let row = sqlx::query(SELECT_USER)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StoreError::NotFound(format!("user '{username}'")));
        };

        let email: Option<String> = row.try_get("email").map_err(map_sqlx_error)?;
        Ok(User {
            username: row.try_get("username").map_err(map_sqlx_error)?,
            email: email.unwrap_or_default(),
            role: Role::from_i64(row.try_get("role").map_err(map_sqlx_error)?),
        })
    }

    /// A stored owner reference must resolve; with the foreign key in
    /// place a miss means the database was tampered with externally.
    async fn owner_record(&self, username: &str) -> Result<User> {
        match self.user(username).await {
            Err(StoreError::NotFound(_)) => Err(StoreError::InvalidData(format!(
                "link owner '{username}' has no user record"
            ))),
            other => other,
        }
    }

    async fn assign_code(&self) -> Result<String> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = self.generator.generate();
            if !self.exists(&code).await? {
                return Ok(code);
            }
        }
        Err(StoreError::Conflict(format!(
            "no unused code after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }
}

#[async_trait]
impl<G: CodeGenerator> ReadStore for SqliteRepository<G> {
    async fn get(&self, short: &str) -> Result<ShortLink> {
        let row = sqlx::query(SELECT_LINK)
            .bind(short)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StoreError::NotFound(format!("short code '{short}'")));
        };

        let original: Option<String> = row.try_get("original").map_err(map_sqlx_error)?;
        let owner_name: Option<String> = row.try_get("owner").map_err(map_sqlx_error)?;
        let date_created: Option<String> = row.try_get("date_created").map_err(map_sqlx_error)?;
        let date_expired: Option<String> = row.try_get("date_expired").map_err(map_sqlx_error)?;

        let owner = match owner_name {
            Some(username) => Some(self.owner_record(&username).await?),
            None => None,
        };

        Ok(ShortLink {
            short: row.try_get("short").map_err(map_sqlx_error)?,
            original: original.unwrap_or_default(),
            owner,
            date_created: date_created
                .map(|value| parse_timestamp("date_created", &value))
                .transpose()?,
            date_expired: date_expired
                .map(|value| parse_timestamp("date_expired", &value))
                .transpose()?,
        })
    }

    async fn exists(&self, short: &str) -> Result<bool> {
        let exists = sqlx::query("SELECT 1 FROM links WHERE short = ? LIMIT 1")
            .bind(short)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();
        Ok(exists)
    }
}

#[async_trait]
impl<G: CodeGenerator> LinkStore for SqliteRepository<G> {
    async fn put(&self, mut link: ShortLink) -> Result<ShortLink> {
        if link.original.is_empty() {
            return Err(StoreError::InvalidInput(
                "link has no destination url".to_string(),
            ));
        }

        if link.short.is_empty() {
            link.short = self.assign_code().await?;
        }

        // Upserting the owner first keeps the foreign key satisfied.
        if let Some(owner) = &link.owner {
            self.upsert_user(owner).await?;
        }

        sqlx::query(UPSERT_LINK)
            .bind(&link.short)
            .bind(&link.original)
            .bind(link.owner.as_ref().map(|owner| owner.username.as_str()))
            .bind(link.date_created.map(format_timestamp))
            .bind(link.date_expired.map(format_timestamp))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(link)
    }

    async fn remove(&self, short: &str, requester: &User) -> Result<()> {
        let existing = self.get(short).await?;

        if !requester.can_remove(&existing) {
            return Err(StoreError::Unauthorized(format!(
                "user '{}' may not remove '{short}'",
                requester.username
            )));
        }

        sqlx::query(DELETE_LINK)
            .bind(short)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

/// Fixed wire format for stored timestamps: RFC 3339, UTC, whole seconds.
fn format_timestamp(ts: Timestamp) -> String {
    ts.strftime("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn parse_timestamp(column: &str, value: &str) -> Result<Timestamp> {
    value
        .parse()
        .map_err(|e| StoreError::InvalidData(format!("failed to parse {column} '{value}': {e}")))
}

/// Translates sqlx failures into the shared error taxonomy. SQLITE_BUSY
/// and SQLITE_LOCKED surface as `Busy` so callers can retry explicitly.
fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if matches!(db_err.code().as_deref(), Some("5") | Some("6")) {
            return StoreError::Busy(db_err.to_string());
        }
    }

    let message = err.to_string();
    match err {
        sqlx::Error::PoolTimedOut => StoreError::Busy(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_) => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}
