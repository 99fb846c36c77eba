//! This module provides the core data access layer for the application, managing the
//! connection pools of every configured database and handing out sessions.
//!
//! The central component is [`Engines`], a registry mapping logical database names to
//! their configuration. The pool of a database is built the first time a session is
//! requested on it and then reused. Each [`Session`] owns one pooled connection with an
//! open transaction for the duration of a single unit of work.

use std::{collections::HashMap, str::FromStr, sync::Arc};

use log::{debug, trace, warn};
use sqlx::{
    Pool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tokio::sync::OnceCell;
use url::Url;

use super::Error;

/// The concrete database type used throughout this module.
pub type Database = sqlx::Sqlite;

/// Name of the database used by models that do not declare one.
pub const DEFAULT_DATABASE: &str = "default";

/// A trait for types that can provide a [`sqlx::Executor`].
///
/// This trait establishes a generic contract, allowing functions to operate
/// on any type that can supply the necessary execution interface.
pub trait AsExec {
    /// Returns a reference to the underlying execution interface.
    fn as_exec(&mut self) -> Result<impl sqlx::Executor<'_, Database = Database>, Error>;
}

/// Lifecycle of a unit of work: finalize it with [`commit`](Transactional::commit) or
/// [`rollback`](Transactional::rollback), then release it with
/// [`close`](Transactional::close).
pub trait Transactional {
    fn commit(&mut self) -> impl Future<Output = Result<(), Error>>;

    fn rollback(&mut self) -> impl Future<Output = Result<(), Error>>;

    /// Releases the session. A transaction still open at this point is rolled back.
    fn close(self) -> impl Future<Output = ()>;
}

/// Hands out a new session bound to the named database.
pub trait SessionProvider {
    type Session: Transactional;

    fn session(&self, database: &str) -> impl Future<Output = Result<Self::Session, Error>>;
}

/// A pooled connection with an open transaction.
///
/// The transaction is started when the session is acquired and ends with the first
/// commit or rollback, whatever its result. Later calls are no-ops and statements
/// are refused with [`Error::SessionFinished`]. A session dropped while its
/// transaction is open (e.g. the owning future was cancelled) is rolled back by
/// `sqlx` before the connection is used again.
pub struct Session {
    database: String,
    tx: Option<sqlx::Transaction<'static, Database>>,
}

impl Session {
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns `true` until the transaction is committed or rolled back.
    pub fn is_open(&self) -> bool {
        self.tx.is_some()
    }
}

impl Transactional for Session {
    async fn commit(&mut self) -> Result<(), Error> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };
        trace!("commit session on `{}`", self.database);
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), Error> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };
        trace!("rollback session on `{}`", self.database);
        tx.rollback().await?;
        Ok(())
    }

    async fn close(mut self) {
        if let Err(err) = self.rollback().await {
            warn!(
                "unable to rollback session on `{}` while closing :: {}",
                self.database, err
            );
        }
        trace!("close session on `{}`", self.database);
    }
}

impl AsExec for Session {
    fn as_exec(&mut self) -> Result<impl sqlx::Executor<'_, Database = Database>, Error> {
        match &mut self.tx {
            Some(tx) => Ok(&mut **tx),
            None => Err(Error::SessionFinished(self.database.clone())),
        }
    }
}

/// The **Connection** struct, designed to hold a reference to a core resource pool.
///
/// Statements run through a `Cx` are executed outside of any explicit transaction.
pub struct Cx<'a> {
    inner: &'a Pool<Database>,
}

impl<'a> AsExec for Cx<'a> {
    /// Returns a reference to the inner resource pool as the execution interface.
    ///
    /// Since the inner `Pool` itself typically fulfills the `Executor` contract,
    /// this method simply returns the reference to the internal resource.
    fn as_exec(&mut self) -> Result<impl sqlx::Executor<'_, Database = Database>, Error> {
        Ok(self.inner)
    }
}

/// Configuration of a single database.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_url: Url,
    pub max_connections: u32,
    /// Create the database file if it does not exist
    pub create_if_missing: bool,
}

impl Config {
    pub fn new(db_url: Url) -> Self {
        Self {
            db_url,
            max_connections: crate::params::DEFAULT_MAX_CONNECTIONS,
            create_if_missing: false,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_create_if_missing(mut self, create_if_missing: bool) -> Self {
        self.create_if_missing = create_if_missing;
        self
    }

    /// Every connection to an in-memory database sees its own database.
    pub fn is_in_memory(&self) -> bool {
        let url = self.db_url.as_str();
        url.contains(":memory:") || url.contains("mode=memory")
    }
}

/// One initialized connection pool, bound to a logical database name.
#[derive(Clone)]
pub struct Repository {
    database: String,
    pub(super) pool: Pool<Database>,
}

impl Repository {
    pub async fn try_new(database: &str, config: &Config) -> Result<Self, Error> {
        debug!(
            "creating database connection pool for `{}` ({})",
            database, config.db_url
        );
        let options = SqliteConnectOptions::from_str(config.db_url.as_str())?
            .create_if_missing(config.create_if_missing);

        let pool_options = if config.is_in_memory() {
            // A single long-lived connection keeps the in-memory database alive
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        let pool = pool_options.connect_with(options).await?;

        Ok(Self {
            database: database.to_string(),
            pool,
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Acquires a connection and opens a transaction on it.
    ///
    /// This call should be used when performing **write** operations on the
    /// repository.
    pub async fn session(&self) -> Result<Session, Error> {
        trace!("begin session on `{}`", self.database);
        Ok(Session {
            database: self.database.clone(),
            tx: Some(self.pool.begin().await?),
        })
    }

    /// Returns a connection to perform operations on the repository.
    ///
    /// This call should be used when performing **read-only** operations on the repository.
    pub fn connection(&self) -> Cx<'_> {
        Cx { inner: &self.pool }
    }

    pub async fn close(&self) {
        debug!("closing database connection pool for `{}`", self.database);
        self.pool.close().await;
    }
}

struct Engine {
    config: Config,
    repository: OnceCell<Repository>,
}

/// Registry of the configured databases and of their lazily built pools.
///
/// Cloning an `Engines` is cheap and every clone shares the same pools.
#[derive(Clone, Default)]
pub struct Engines {
    inner: Arc<HashMap<String, Arc<Engine>>>,
}

impl Engines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `database`. Declaring the same name twice replaces its configuration.
    pub fn with_database(mut self, database: impl Into<String>, config: Config) -> Self {
        Arc::make_mut(&mut self.inner).insert(
            database.into(),
            Arc::new(Engine {
                config,
                repository: OnceCell::new(),
            }),
        );
        self
    }

    pub fn databases(&self) -> impl Iterator<Item = (&str, &Config)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), &v.config))
    }

    /// Returns the repository of `database`, building its pool on first use.
    pub async fn repository(&self, database: &str) -> Result<&Repository, Error> {
        let engine = self
            .inner
            .get(database)
            .ok_or_else(|| Error::UnknownDatabase(database.to_string()))?;

        engine
            .repository
            .get_or_try_init(|| Repository::try_new(database, &engine.config))
            .await
    }

    /// Closes every pool built so far. Sessions requested afterwards fail.
    pub async fn close(&self) {
        for engine in self.inner.values() {
            if let Some(repo) = engine.repository.get() {
                repo.close().await;
            }
        }
    }
}

impl SessionProvider for Engines {
    type Session = Session;

    async fn session(&self, database: &str) -> Result<Session, Error> {
        self.repository(database).await?.session().await
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo;

    #[tokio::test]
    async fn unknown_database() {
        let engines = testing::memory_engines();
        let res = engines.session("missing").await;
        assert!(matches!(res, Err(Error::UnknownDatabase(name)) if name == "missing"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pool_is_built_once() {
        let dir = tempfile::tempdir().unwrap();
        let engines = testing::file_engines(dir.path());

        // every task races the first use of the same database
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let engines = engines.clone();
                tokio::spawn(async move {
                    engines
                        .repository(DEFAULT_DATABASE)
                        .await
                        .map(|repo| repo as *const Repository as usize)
                })
            })
            .collect();

        let mut built = Vec::new();
        for task in tasks {
            built.push(task.await.unwrap().unwrap());
        }
        assert!(built.windows(2).all(|w| w[0] == w[1]));

        let again = engines.repository(DEFAULT_DATABASE).await.unwrap() as *const Repository;
        assert_eq!(again as usize, built[0]);
    }

    async fn insert_order(engines: &Engines, order_id: i64) -> Result<(), Error> {
        repo::scoped(engines, DEFAULT_DATABASE, repo::Commit::Yes, async |s| {
            repo::record_insert(s, &testing::Order::new(order_id, "writer", order_id)).await
        })
        .await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sessions_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let engines = testing::file_engines(dir.path());

        let mut setup = engines.session(DEFAULT_DATABASE).await.unwrap();
        testing::create_tables(&mut setup).await.unwrap();
        setup.commit().await.unwrap();
        setup.close().await;

        // two sessions held at once get their own connection and transaction
        let (first, second) = tokio::join!(
            engines.session(DEFAULT_DATABASE),
            engines.session(DEFAULT_DATABASE)
        );
        let (mut first, mut second) = (first.unwrap(), second.unwrap());
        first.commit().await.unwrap();
        assert!(!first.is_open());
        assert!(second.is_open());
        second.close().await;
        first.close().await;

        let (a, b, c, d) = tokio::join!(
            insert_order(&engines, 1),
            insert_order(&engines, 2),
            insert_order(&engines, 3),
            insert_order(&engines, 4)
        );
        for res in [a, b, c, d] {
            res.unwrap();
        }

        let repo = engines.repository(DEFAULT_DATABASE).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(repo.connection().as_exec().unwrap())
            .await
            .unwrap();
        assert_eq!(count, 4);

        engines.close().await;
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let engines = testing::memory_engines();

        let mut session = engines.session(DEFAULT_DATABASE).await.unwrap();
        assert!(session.is_open());
        assert_eq!(session.database(), DEFAULT_DATABASE);

        sqlx::raw_sql("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .execute(session.as_exec().unwrap())
            .await
            .unwrap();
        session.commit().await.unwrap();
        assert!(!session.is_open());

        // already finalized: no-op, and no more statements
        session.rollback().await.unwrap();
        assert!(matches!(
            session.as_exec().map(|_| ()),
            Err(Error::SessionFinished(name)) if name == DEFAULT_DATABASE
        ));
        session.close().await;

        // an uncommitted insert is discarded on close
        let mut session = engines.session(DEFAULT_DATABASE).await.unwrap();
        sqlx::raw_sql("INSERT INTO t (id) VALUES (1)")
            .execute(session.as_exec().unwrap())
            .await
            .unwrap();
        session.close().await;

        let repo = engines.repository(DEFAULT_DATABASE).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t")
            .fetch_one(repo.connection().as_exec().unwrap())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn failed_rollback_is_not_retried() {
        let engines = testing::memory_engines();
        let mut session = engines.session(DEFAULT_DATABASE).await.unwrap();

        // ending the transaction behind the session's back makes ROLLBACK fail
        sqlx::raw_sql("COMMIT")
            .execute(session.as_exec().unwrap())
            .await
            .unwrap();

        assert!(matches!(
            session.rollback().await,
            Err(Error::BackendError(_))
        ));
        assert!(!session.is_open());

        // neither a second rollback nor close reach the database again
        session.rollback().await.unwrap();
        session.close().await;
    }

    #[tokio::test]
    async fn dropped_session_is_rolled_back() {
        let engines = testing::memory_engines();

        let mut session = engines.session(DEFAULT_DATABASE).await.unwrap();
        sqlx::raw_sql("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .execute(session.as_exec().unwrap())
            .await
            .unwrap();
        session.commit().await.unwrap();
        session.close().await;

        let mut session = engines.session(DEFAULT_DATABASE).await.unwrap();
        sqlx::raw_sql("INSERT INTO t (id) VALUES (1)")
            .execute(session.as_exec().unwrap())
            .await
            .unwrap();
        drop(session);

        let repo = engines.repository(DEFAULT_DATABASE).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t")
            .fetch_one(repo.connection().as_exec().unwrap())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn closed_engines_refuse_sessions() {
        let engines = testing::memory_engines();
        engines.session(DEFAULT_DATABASE).await.unwrap().close().await;
        engines.close().await;
        assert!(engines.session(DEFAULT_DATABASE).await.is_err());
    }
}
