//! Error types for dbprobe.
//!
//! Failures fall into the phases of an introspection run: establishing the
//! session, reading catalog metadata, and validating the collected model.
//! Configuration problems are reported before any of those phases start.

use std::fmt;

use thiserror::Error;

/// Boxed underlying cause carried by error variants.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for dbprobe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The database session could not be established.
    ///
    /// Raised for invalid credentials, unreachable hosts or files, malformed
    /// URLs and unsupported drivers. Aborts the run before any metadata read.
    #[error("Connection error: {message}")]
    Connection {
        /// Human-readable error message.
        message: String,
        /// Actionable hint for the user.
        hint: Option<String>,
        /// Optional underlying error source.
        #[source]
        source: Option<BoxedSource>,
    },

    /// A catalog metadata query failed.
    #[error("Introspection error{}: {message}", on_table(.table))]
    Introspection {
        /// Human-readable error message.
        message: String,
        /// Qualified name of the table being read, if any.
        table: Option<String>,
        /// Short name of the metadata query that failed.
        query: Option<String>,
        /// Optional underlying error source.
        #[source]
        source: Option<BoxedSource>,
    },

    /// The collected schema violates a model invariant.
    #[error("Validation error: {}", .violations.join("; "))]
    Validation {
        /// Every violation found, in discovery order.
        violations: Vec<String>,
    },

    /// Configuration is missing, unreadable or inconsistent.
    #[error("Config error: {message}")]
    Config {
        /// Human-readable error message.
        message: String,
    },
}

fn on_table(table: &Option<String>) -> String {
    table.as_ref().map(|t| format!(" on {t}")).unwrap_or_default()
}

impl ProbeError {
    // ========== Constructors ==========

    /// Create a new connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), hint: None, source: None }
    }

    /// Create a new connection error with source.
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), hint: None, source: Some(Box::new(source)) }
    }

    /// Create a new introspection error.
    pub fn introspection(message: impl Into<String>) -> Self {
        Self::Introspection { message: message.into(), table: None, query: None, source: None }
    }

    /// Create an introspection error for a failed metadata query.
    pub fn query_failed(
        query: &str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Introspection {
            message: format!("{query} query failed: {source}"),
            table: None,
            query: Some(query.to_string()),
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error from the list of violations.
    pub fn validation(violations: Vec<String>) -> Self {
        Self::Validation { violations }
    }

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    // ========== Context ==========

    /// Attach an actionable hint to a connection error.
    pub fn with_hint(mut self, new_hint: impl Into<String>) -> Self {
        if let Self::Connection { hint, .. } = &mut self {
            *hint = Some(new_hint.into());
        }
        self
    }

    /// Record the table being read when an introspection error occurred.
    ///
    /// Keeps the innermost table if one was already recorded.
    pub fn with_table(mut self, name: impl fmt::Display) -> Self {
        if let Self::Introspection { table, .. } = &mut self {
            if table.is_none() {
                *table = Some(name.to_string());
            }
        }
        self
    }

    // ========== Methods ==========

    /// Check if this error happened while establishing the session.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Check if this error came from a metadata query.
    pub fn is_introspection(&self) -> bool {
        matches!(self, Self::Introspection { .. })
    }

    /// Check if this error came from model validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Get the table an introspection error refers to.
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::Introspection { table, .. } => table.as_deref(),
            _ => None,
        }
    }

    /// Get the metadata query an introspection error refers to.
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::Introspection { query, .. } => query.as_deref(),
            _ => None,
        }
    }

    /// Get the validation violations, empty for other variants.
    pub fn violations(&self) -> &[String] {
        match self {
            Self::Validation { violations } => violations,
            _ => &[],
        }
    }

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "Connection",
            Self::Introspection { .. } => "Introspection",
            Self::Validation { .. } => "Validation",
            Self::Config { .. } => "Config",
        }
    }

    /// Get actionable hint for the user.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Connection { hint: Some(hint), .. } => Some(hint),
            Self::Connection { hint: None, .. } => {
                Some("Check that the database server is running and the URL is correct")
            }
            Self::Introspection { .. } => Some("Check that the user may read the system catalogs"),
            Self::Validation { .. } => {
                Some("Widen the schema or table pattern so referenced tables are included")
            }
            Self::Config { .. } => None,
        }
    }

    /// Convert to user-displayable error info.
    pub fn to_error_info(&self) -> ErrorInfo {
        let error_type = format!("{} Error", self.category());
        let message = self.to_string();
        let hint = self.hint().map(String::from);

        let technical_detail = match self {
            Self::Introspection { table, query, source, .. } => {
                let mut parts = Vec::new();
                if let Some(table) = table {
                    parts.push(format!("Table: {table}"));
                }
                if let Some(query) = query {
                    parts.push(format!("Query: {query}"));
                }
                if let Some(source) = source {
                    parts.push(format!("Cause: {source}"));
                }
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("\n"))
                }
            }
            Self::Connection { source: Some(source), .. } => Some(format!("Cause: {source}")),
            Self::Validation { violations } => Some(violations.join("\n")),
            _ => None,
        };

        ErrorInfo { error_type, message, hint, technical_detail }
    }
}

/// User-displayable error information.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Category name (e.g., "Connection Error").
    pub error_type: String,
    /// User-friendly message.
    pub message: String,
    /// Actionable suggestion.
    pub hint: Option<String>,
    /// Technical detail (table, query, cause).
    pub technical_detail: Option<String>,
}

// ========== Error Conversions ==========

/// Convert a failure to establish a PostgreSQL session.
///
/// Metadata query failures do not go through this conversion; they are
/// wrapped with [`ProbeError::query_failed`] so they keep their query context.
impl From<tokio_postgres::Error> for ProbeError {
    fn from(err: tokio_postgres::Error) -> Self {
        let hint = match err.as_db_error().map(|db| db.code().code()) {
            Some("28P01") => Some("Invalid password - check your credentials"),
            Some("28000") => Some("Authentication failed - check username and permissions"),
            Some("3D000") => Some("The database named in the URL does not exist"),
            Some(code) if code.starts_with("08") => Some("The server rejected the connection"),
            _ => None,
        };

        let message = match err.as_db_error() {
            Some(db_err) => db_err.message().to_string(),
            None if err.is_closed() => "Connection closed".to_string(),
            None => err.to_string(),
        };

        ProbeError::Connection {
            message,
            hint: hint.map(String::from),
            source: Some(Box::new(err)),
        }
    }
}

/// Convert a failure to open a SQLite database.
impl From<rusqlite::Error> for ProbeError {
    fn from(err: rusqlite::Error) -> Self {
        ProbeError::Connection {
            message: err.to_string(),
            hint: Some("Check that the database file exists and is readable".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

/// Convert from serde_json::Error to ProbeError.
impl From<serde_json::Error> for ProbeError {
    fn from(err: serde_json::Error) -> Self {
        ProbeError::Config { message: format!("Invalid config file: {err}") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_introspection_display_includes_table() {
        let err = ProbeError::introspection("columns query failed").with_table("public.users");
        assert_eq!(err.to_string(), "Introspection error on public.users: columns query failed");
        assert_eq!(err.table(), Some("public.users"));
    }

    #[test]
    fn test_with_table_keeps_innermost() {
        let err = ProbeError::introspection("boom").with_table("a").with_table("b");
        assert_eq!(err.table(), Some("a"));
    }

    #[test]
    fn test_with_table_ignores_other_variants() {
        let err = ProbeError::connection("refused").with_table("users");
        assert!(err.is_connection());
        assert_eq!(err.table(), None);
    }

    #[test]
    fn test_query_failed_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = ProbeError::query_failed("foreign keys", io);
        assert_eq!(err.query(), Some("foreign keys"));
        assert!(std::error::Error::source(&err).is_some());

        let info = err.with_table("main.orders").to_error_info();
        assert_eq!(info.error_type, "Introspection Error");
        let detail = info.technical_detail.unwrap();
        assert!(detail.contains("Table: main.orders"));
        assert!(detail.contains("Query: foreign keys"));
    }

    #[test]
    fn test_validation_lists_every_violation() {
        let err = ProbeError::validation(vec!["first".into(), "second".into()]);
        assert_eq!(err.to_string(), "Validation error: first; second");
        assert_eq!(err.violations().len(), 2);
        assert_eq!(err.category(), "Validation");
    }

    #[test]
    fn test_every_runtime_error_has_a_hint() {
        let errors = [
            ProbeError::connection("x"),
            ProbeError::introspection("x"),
            ProbeError::validation(vec!["x".into()]),
        ];
        for err in errors {
            assert!(err.hint().is_some(), "{} should carry a hint", err.category());
        }
    }

    #[test]
    fn test_custom_hint_overrides_default() {
        let err = ProbeError::connection("denied").with_hint("Check username");
        assert_eq!(err.hint(), Some("Check username"));
    }
}
