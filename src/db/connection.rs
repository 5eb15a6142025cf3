//! SQL Server connection management using tiberius
//!
//! A small bounded pool: a semaphore caps open connections, idle clients are
//! reused, and a client whose statement failed is dropped instead of being
//! returned, so the next caller reconnects.

use crate::config::DatabaseConfig;
use crate::error::{AgentError, Result};
use std::sync::Mutex;
use std::time::Duration;
use tiberius::{Client, Config};
use tokio::net::TcpStream;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::timeout;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

pub type MssqlClient = Client<Compat<TcpStream>>;

pub struct DbPool {
    config: Config,
    idle: Mutex<Vec<MssqlClient>>,
    permits: Semaphore,
    acquire_timeout: Duration,
}

/// A checked-out client. Hand it back with [`DbPool::release`] after a
/// successful statement; dropping it closes the connection.
pub struct PooledClient<'a> {
    pub client: MssqlClient,
    _permit: SemaphorePermit<'a>,
}

/// Parse the ADO.NET connection string without connecting.
///
/// Connections are opened on first use, so an unreachable warehouse does not
/// prevent the service from starting; the failure surfaces per statement.
pub fn init_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let mssql = Config::from_ado_string(&config.url)
        .map_err(|e| AgentError::Config(format!("DATABASE_URL is not a valid connection string: {}", e)))?;
    Ok(DbPool {
        config: mssql,
        idle: Mutex::new(Vec::new()),
        permits: Semaphore::new(config.max_connections.max(1) as usize),
        acquire_timeout: config.acquire_timeout,
    })
}

impl DbPool {
    pub async fn acquire(&self) -> Result<PooledClient<'_>> {
        let permit = timeout(self.acquire_timeout, self.permits.acquire())
            .await
            .map_err(|_| {
                AgentError::StoreUnavailable(format!(
                    "no connection available after {}s",
                    self.acquire_timeout.as_secs()
                ))
            })?
            .map_err(|_| AgentError::StoreUnavailable("connection pool is closed".to_string()))?;

        let reused = self.idle.lock().ok().and_then(|mut idle| idle.pop());
        let client = match reused {
            Some(client) => client,
            None => timeout(self.acquire_timeout, self.connect())
                .await
                .map_err(|_| {
                    AgentError::StoreUnavailable(format!(
                        "connecting timed out after {}s",
                        self.acquire_timeout.as_secs()
                    ))
                })??,
        };

        Ok(PooledClient {
            client,
            _permit: permit,
        })
    }

    pub fn release(&self, conn: PooledClient<'_>) {
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(conn.client);
        }
    }

    async fn connect(&self) -> Result<MssqlClient> {
        debug!("Opening connection to {}", self.config.get_addr());
        let tcp = TcpStream::connect(self.config.get_addr()).await?;
        tcp.set_nodelay(true)?;
        let client = Client::connect(self.config.clone(), tcp.compat_write()).await?;
        info!("Database connected successfully");
        Ok(client)
    }
}
