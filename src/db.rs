use std::cell::Cell;
use std::fs::OpenOptions;
use std::path::Path;
use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types::{BigInt, Nullable, Text};
use diesel::sqlite::{Sqlite, SqliteConnection};
use diesel::{QueryableByName, RunQueryDsl};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::crud::SqlValue;
use crate::error::{StoreError, StoreResult};

pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;
pub type SqlitePooledConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub const DEFAULT_MAX_POOL_SIZE: u32 = 1;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CACHE_SIZE_KIB: u32 = 8_192;

const IN_MEMORY: &str = ":memory:";

diesel::define_sql_function! {
    /// Unicode lowercase; sqlite's own `lower` and `LIKE` fold ASCII only.
    fn fold_case(value: Nullable<Text>) -> Nullable<Text>;
}

thread_local! {
    static IN_TRANSACTION: Cell<bool> = const { Cell::new(false) };
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_pool_size: u32,
    pub busy_timeout: Duration,
    pub cache_size_kib: u32,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            cache_size_kib: DEFAULT_CACHE_SIZE_KIB,
        }
    }
}

#[derive(Debug)]
struct ConnectionPragmas {
    busy_timeout: Duration,
    cache_size_kib: u32,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {};
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -{};",
            self.busy_timeout.as_millis(),
            self.cache_size_kib
        ))
        .map_err(diesel::r2d2::Error::QueryError)?;
        fold_case_utils::register_impl(conn, |value: Option<String>| {
            value.map(|text| text.to_lowercase())
        })
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteOutcome {
    pub affected_rows: usize,
    pub last_insert_rowid: i64,
}

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = BigInt)]
    id: i64,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (or creates) the store and brings its schema up to date. Opening
    /// an already migrated store applies nothing further.
    pub fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        ensure_writable(&config.url)?;

        let manager = ConnectionManager::<SqliteConnection>::new(config.url.as_str());
        // each sqlite connection to :memory: opens its own empty database
        let builder = if is_in_memory(&config.url) {
            Pool::builder()
                .max_size(1)
                .max_lifetime(None)
                .idle_timeout(None)
        } else {
            Pool::builder().max_size(config.max_pool_size.max(1))
        };
        let pool = builder
            .connection_timeout(config.busy_timeout.max(Duration::from_secs(1)))
            .connection_customizer(Box::new(ConnectionPragmas {
                busy_timeout: config.busy_timeout,
                cache_size_kib: config.cache_size_kib,
            }))
            .build(manager)
            .map_err(|err| {
                tracing::error!(error = %err, url = %config.url, "failed to open database");
                StoreError::connection(format!("failed to open database: {err}"))
            })?;

        let database = Self { pool };
        database.run_migrations()?;
        Ok(database)
    }

    fn run_migrations(&self) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| StoreError::connection(format!("failed to run migrations: {err}")))?;
        if !applied.is_empty() {
            tracing::info!(count = applied.len(), "applied pending schema migrations");
        }
        Ok(())
    }

    pub fn conn(&self) -> StoreResult<SqlitePooledConnection> {
        Ok(self.pool.get()?)
    }

    pub fn read<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> StoreResult<T>,
    {
        let mut conn = self.conn()?;
        f(&mut *conn)
    }

    /// Runs `ops` as one atomic unit. Any error rolls the whole unit back.
    /// Calling `transaction` from inside `ops` is rejected: the model is flat.
    pub fn transaction<T, F>(&self, ops: F) -> StoreResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> StoreResult<T>,
    {
        if IN_TRANSACTION.with(Cell::get) {
            return Err(StoreError::query("nested transactions are not supported"));
        }
        let _guard = TransactionGuard::enter();
        let mut conn = self.conn()?;
        conn.immediate_transaction(ops)
    }

    pub fn execute(&self, sql: &str, params: Vec<SqlValue>) -> StoreResult<ExecuteOutcome> {
        let mut conn = self.conn()?;
        execute(&mut *conn, sql, params)
    }

    pub fn query<R>(&self, sql: &str, params: Vec<SqlValue>) -> StoreResult<Vec<R>>
    where
        R: QueryableByName<Sqlite> + 'static,
    {
        let mut conn = self.conn()?;
        query(&mut *conn, sql, params)
    }

    pub fn health_check(&self) -> bool {
        match self.pool.get() {
            Ok(mut conn) => diesel::sql_query("SELECT 1").execute(&mut conn).is_ok(),
            Err(err) => {
                tracing::warn!(error = %err, "database health check failed");
                false
            }
        }
    }
}

struct TransactionGuard;

impl TransactionGuard {
    fn enter() -> Self {
        IN_TRANSACTION.with(|flag| flag.set(true));
        TransactionGuard
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        IN_TRANSACTION.with(|flag| flag.set(false));
    }
}

pub(crate) fn bind_params(
    mut statement: BoxedSqlQuery<'static, Sqlite, SqlQuery>,
    params: Vec<SqlValue>,
) -> BoxedSqlQuery<'static, Sqlite, SqlQuery> {
    use diesel::sql_types::{Bool, Timestamp};

    for param in params {
        statement = match param {
            SqlValue::Text(value) => statement.bind::<Text, _>(value),
            SqlValue::Integer(value) => statement.bind::<BigInt, _>(value),
            SqlValue::Bool(value) => statement.bind::<Bool, _>(value),
            SqlValue::Timestamp(value) => statement.bind::<Timestamp, _>(value),
            SqlValue::Null => statement.bind::<Nullable<Text>, _>(None::<String>),
        };
    }
    statement
}

pub(crate) fn execute(
    conn: &mut SqliteConnection,
    sql: &str,
    params: Vec<SqlValue>,
) -> StoreResult<ExecuteOutcome> {
    let statement = bind_params(diesel::sql_query(sql).into_boxed(), params);
    let affected_rows = statement.execute(conn)?;
    let last_insert_rowid = diesel::sql_query("SELECT last_insert_rowid() AS id")
        .get_result::<LastInsertRowId>(conn)?
        .id;
    Ok(ExecuteOutcome {
        affected_rows,
        last_insert_rowid,
    })
}

pub(crate) fn query<R>(
    conn: &mut SqliteConnection,
    sql: &str,
    params: Vec<SqlValue>,
) -> StoreResult<Vec<R>>
where
    R: QueryableByName<Sqlite> + 'static,
{
    let statement = bind_params(diesel::sql_query(sql).into_boxed(), params);
    Ok(statement.load::<R>(conn)?)
}

fn is_in_memory(url: &str) -> bool {
    url.strip_prefix("sqlite://").unwrap_or(url) == IN_MEMORY
}

fn ensure_writable(url: &str) -> StoreResult<()> {
    let path = url.strip_prefix("sqlite://").unwrap_or(url);
    if is_in_memory(url) || path.starts_with("file:") {
        return Ok(());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(StoreError::connection(format!(
                "storage directory {} does not exist",
                parent.display()
            )));
        }
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|err| {
            StoreError::connection(format!("storage location {} is not writable: {err}", path.display()))
        })
}
