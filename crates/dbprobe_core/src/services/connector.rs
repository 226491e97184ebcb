//! Session acquisition and teardown.
//!
//! A [`Connector`] turns an [`IntrospectionConfig`] into an open
//! [`ConnectionHandle`]. The handle exclusively owns its driver session for
//! one run and releases it exactly once, on `close()` or on drop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ProbeError;
use crate::models::{Driver, IntrospectionConfig};
use crate::services::postgres::PostgresSession;
use crate::services::session::MetadataSession;
use crate::services::sqlite::SqliteSession;

/// Opens driver sessions from explicit configuration.
#[derive(Debug, Clone)]
pub struct Connector {
    config: Arc<IntrospectionConfig>,
}

impl Connector {
    /// Create a connector for the given configuration.
    pub fn new(config: IntrospectionConfig) -> Self {
        Self { config: Arc::new(config) }
    }

    /// Get the configuration.
    pub fn config(&self) -> &IntrospectionConfig {
        &self.config
    }

    /// Open a session.
    ///
    /// Fails with a connection error for unsupported drivers, unreachable
    /// servers or files, and rejected credentials.
    pub fn open(&self) -> Result<ConnectionHandle, ProbeError> {
        self.config.validate()?;
        let driver = self.config.resolved_driver()?;
        let display_url = self.config.display_url();

        tracing::debug!(driver = %driver, url = %display_url, "Opening session");

        let opened = match driver {
            Driver::Postgres => PostgresSession::open(&self.config)
                .map(|s| Box::new(s) as Box<dyn MetadataSession>),
            Driver::Sqlite => {
                SqliteSession::open(&self.config).map(|s| Box::new(s) as Box<dyn MetadataSession>)
            }
        };

        match opened {
            Ok(session) => {
                let handle = ConnectionHandle::from_session(session, display_url);
                tracing::info!(
                    run_id = %handle.id(),
                    driver = %driver,
                    url = %handle.display_url(),
                    "Session opened"
                );
                Ok(handle)
            }
            Err(e) => {
                tracing::error!(driver = %driver, url = %display_url, error = %e, "Failed to open session");
                Err(e)
            }
        }
    }

    /// Run `f` with an open session, closing it on every exit path.
    ///
    /// If opening fails, `f` is never called.
    pub fn with_connection<T, F>(&self, f: F) -> Result<T, ProbeError>
    where
        F: FnOnce(&mut ConnectionHandle) -> Result<T, ProbeError>,
    {
        let handle = self.open()?;
        scoped(handle, f)
    }
}

/// Run `f` against `handle`, then close it whatever `f` returned.
fn scoped<T, F>(mut handle: ConnectionHandle, f: F) -> Result<T, ProbeError>
where
    F: FnOnce(&mut ConnectionHandle) -> Result<T, ProbeError>,
{
    let result = f(&mut handle);
    if let Err(e) = &result {
        tracing::warn!(run_id = %handle.id(), error = %e, "Run failed, releasing session");
    }
    handle.close();
    result
}

/// An open session owned by a single introspection run.
pub struct ConnectionHandle {
    /// Run identifier used to correlate log events
    id: Uuid,
    driver: Driver,
    /// Connection URL with the password masked
    display_url: String,
    opened_at: DateTime<Utc>,
    session: Option<Box<dyn MetadataSession>>,
}

impl ConnectionHandle {
    /// Wrap an already open session.
    ///
    /// This is how sessions for drivers outside this crate are plugged in.
    pub fn from_session(session: Box<dyn MetadataSession>, display_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            driver: session.driver(),
            display_url: display_url.into(),
            opened_at: Utc::now(),
            session: Some(session),
        }
    }

    /// Get the run identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the driver.
    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// Get the connection URL with the password masked.
    pub fn display_url(&self) -> &str {
        &self.display_url
    }

    /// Get when the session was opened.
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Check if the session is still open.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Borrow the open session.
    pub fn session(&self) -> Result<&dyn MetadataSession, ProbeError> {
        self.session.as_deref().ok_or_else(|| {
            ProbeError::introspection(format!("Session for run {} is already closed", self.id))
        })
    }

    /// Release the session. Calling this more than once is a no-op.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
            tracing::info!(
                run_id = %self.id,
                elapsed_ms = (Utc::now() - self.opened_at).num_milliseconds(),
                "Session closed"
            );
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("driver", &self.driver)
            .field("display_url", &self.display_url)
            .field("open", &self.is_open())
            .finish()
    }
}
