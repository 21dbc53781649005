//! SQLite connection management for the database tools.
//!
//! Uses a single `Arc<Mutex<Connection>>` shared by every call; queries are
//! serialized on the mutex and run on the blocking thread pool. The connection
//! is opened read-only, lazily or by the module's startup hook, and dropped
//! by the shutdown hook.

use parking_lot::Mutex;
use rusqlite::{Connection, InterruptHandle, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised by [`DatabasePool`].
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// No database path is configured.
    #[error("no database configured")]
    NotConfigured,

    /// The database file could not be opened.
    #[error("could not open database: {0}")]
    Open(#[source] rusqlite::Error),

    /// The statement would modify the database.
    #[error("statement is not read-only")]
    NotReadOnly,

    /// The deadline passed before the statement finished.
    #[error("query timed out")]
    TimedOut,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// The blocking task panicked or was cancelled.
    #[error("database task failed: {0}")]
    Task(String),
}

impl DatabaseError {
    /// The connection could not be obtained at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::NotConfigured | Self::Open(_))
    }
}

/// Progress of one statement, shared between the caller and the blocking task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Waiting,
    Running,
    Finished,
    Abandoned,
}

#[derive(Default)]
struct Slot {
    conn: Option<Connection>,
}

/// Lazily opened, shared SQLite connection.
#[derive(Clone)]
pub struct DatabasePool {
    path: Option<PathBuf>,
    slot: Arc<Mutex<Slot>>,
    interrupt: Arc<Mutex<Option<InterruptHandle>>>,
}

impl DatabasePool {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            slot: Arc::new(Mutex::new(Slot::default())),
            interrupt: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_configured(&self) -> bool {
        self.path.is_some()
    }

    /// Human-readable database name for messages.
    pub fn display_name(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unconfigured>".to_string())
    }

    /// Open the connection now instead of on first use.
    pub async fn open(&self) -> Result<(), DatabaseError> {
        self.run(Duration::MAX, |_| Ok(())).await
    }

    /// Drop the connection. Safe to call when it was never opened.
    ///
    /// Returns whether a connection was closed.
    pub async fn close(&self) -> bool {
        let slot = self.slot.clone();
        let interrupt = self.interrupt.clone();
        let closed = tokio::task::spawn_blocking(move || {
            let mut guard = slot.lock();
            interrupt.lock().take();
            guard.conn.take().is_some()
        })
        .await
        .unwrap_or(false);

        if closed {
            info!("Database connection closed");
        }
        closed
    }

    /// Run `f` against the connection with a deadline.
    ///
    /// On expiry a running statement is interrupted and a statement still
    /// waiting for the connection is abandoned before it starts.
    pub async fn run<F, T>(&self, deadline: Duration, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone().ok_or(DatabaseError::NotConfigured)?;
        let slot = self.slot.clone();
        let interrupt = self.interrupt.clone();
        let phase = Arc::new(Mutex::new(Phase::Waiting));

        let task_phase = phase.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut guard = slot.lock();

            {
                let mut phase = task_phase.lock();
                if *phase == Phase::Abandoned {
                    return Err(DatabaseError::TimedOut);
                }
                *phase = Phase::Running;
            }

            if guard.conn.is_none() {
                let conn = open_connection(&path)?;
                *interrupt.lock() = Some(conn.get_interrupt_handle());
                guard.conn = Some(conn);
            }

            let result = match guard.conn.as_ref() {
                Some(conn) => f(conn),
                None => Err(DatabaseError::NotConfigured),
            };
            *task_phase.lock() = Phase::Finished;
            result
        });

        match tokio::time::timeout(deadline, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(DatabaseError::Task(join_err.to_string())),
            Err(_) => {
                let mut phase = phase.lock();
                match *phase {
                    Phase::Running => {
                        warn!("Query exceeded {:?}, interrupting", deadline);
                        if let Some(handle) = self.interrupt.lock().as_ref() {
                            handle.interrupt();
                        }
                    }
                    Phase::Waiting => *phase = Phase::Abandoned,
                    Phase::Finished | Phase::Abandoned => {}
                }
                Err(DatabaseError::TimedOut)
            }
        }
    }
}

fn open_connection(path: &Path) -> Result<Connection, DatabaseError> {
    if path.to_str() == Some(":memory:") {
        debug!("Opening in-memory database");
        return Connection::open_in_memory().map_err(DatabaseError::Open);
    }

    info!(path = ?path, "Opening SQLite database (read-only)");
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Connection::open_with_flags(path, flags).map_err(DatabaseError::Open)
}
