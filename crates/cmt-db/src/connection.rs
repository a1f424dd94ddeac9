//! Connection backends.
//!
//! A [`ConnectionSource`] hands out one connection at a time, scoped to the
//! returned guard. [`PooledSource`] wraps an `sqlx` pool; [`SingleConnectionSource`]
//! keeps one lazily-opened connection behind a mutex, which is how the job
//! talks to Cloud SQL through the proxy socket.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use cmt_core::{AppConfig, DatabaseTarget};
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection, PgPool, Postgres};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use crate::{connect_pool, DbError, PoolConfig};

/// A connection borrowed from a [`ConnectionSource`]. Dropping it releases
/// the connection.
pub enum ScopedConnection<'a> {
    Pooled(PoolConnection<Postgres>),
    Shared(MappedMutexGuard<'a, PgConnection>),
}

impl Deref for ScopedConnection<'_> {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        match self {
            ScopedConnection::Pooled(conn) => conn,
            ScopedConnection::Shared(guard) => guard,
        }
    }
}

impl DerefMut for ScopedConnection<'_> {
    fn deref_mut(&mut self) -> &mut PgConnection {
        match self {
            ScopedConnection::Pooled(conn) => conn,
            ScopedConnection::Shared(guard) => guard,
        }
    }
}

#[async_trait::async_trait]
pub trait ConnectionSource: Send + Sync {
    /// Borrow a connection for the lifetime of the returned guard.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if no connection can be obtained.
    async fn acquire(&self) -> Result<ScopedConnection<'_>, DbError>;

    /// Release every underlying connection. Later `acquire` calls fail or
    /// reconnect depending on the backend.
    async fn close(&self);
}

/// Pool-backed source for a plain `DATABASE_URL`.
#[derive(Debug, Clone)]
pub struct PooledSource {
    pool: PgPool,
}

impl PooledSource {
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the pool cannot connect.
    pub async fn connect(database_url: &str, config: PoolConfig) -> Result<Self, DbError> {
        let pool = connect_pool(database_url, config).await?;
        tracing::info!(
            max_connections = config.max_connections,
            "database pool connected"
        );
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl ConnectionSource for PooledSource {
    async fn acquire(&self) -> Result<ScopedConnection<'_>, DbError> {
        if self.pool.is_closed() {
            return Err(DbError::NotConnected);
        }
        Ok(ScopedConnection::Pooled(self.pool.acquire().await?))
    }

    async fn close(&self) {
        tracing::info!("closing database pool");
        self.pool.close().await;
    }
}

/// One connection opened on first use and shared by every caller in turn.
///
/// After [`ConnectionSource::close`] the next `acquire` opens a fresh
/// connection.
pub struct SingleConnectionSource {
    options: PgConnectOptions,
    conn: Mutex<Option<PgConnection>>,
}

impl SingleConnectionSource {
    #[must_use]
    pub fn new(options: PgConnectOptions) -> Self {
        Self {
            options,
            conn: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl ConnectionSource for SingleConnectionSource {
    async fn acquire(&self) -> Result<ScopedConnection<'_>, DbError> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            tracing::info!("opening database connection over unix socket");
            *guard = Some(PgConnection::connect_with(&self.options).await?);
        }
        MutexGuard::try_map(guard, Option::as_mut)
            .map(ScopedConnection::Shared)
            .map_err(|_| DbError::NotConnected)
    }

    async fn close(&self) {
        let conn = self.conn.lock().await.take();
        if let Some(conn) = conn {
            tracing::info!("closing database connection");
            if let Err(e) = conn.close().await {
                tracing::warn!(error = %e, "database connection did not close cleanly");
            }
        }
    }
}

/// Connect options for a Cloud SQL target, or `None` for a URL target.
#[must_use]
pub fn cloud_sql_options(target: &DatabaseTarget) -> Option<PgConnectOptions> {
    let socket = target.socket_path()?;
    let DatabaseTarget::CloudSql {
        user,
        password,
        database,
        ..
    } = target
    else {
        return None;
    };

    let mut options = PgConnectOptions::new()
        .socket(socket)
        .username(user)
        .database(database);
    if let Some(password) = password {
        options = options.password(password);
    }
    Some(options)
}

/// Build the backend the configuration selects.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a pool cannot connect. The Cloud SQL backend
/// defers connecting to the first `acquire`.
pub async fn connect_source(config: &AppConfig) -> Result<Arc<dyn ConnectionSource>, DbError> {
    match &config.database {
        DatabaseTarget::Url(url) => {
            let source = PooledSource::connect(url, PoolConfig::from_app_config(config)).await?;
            Ok(Arc::new(source))
        }
        target @ DatabaseTarget::CloudSql { instance, .. } => {
            tracing::info!(instance = %instance, "using cloud sql socket connection");
            let options = cloud_sql_options(target).ok_or(DbError::NotConnected)?;
            Ok(Arc::new(SingleConnectionSource::new(options)))
        }
    }
}
