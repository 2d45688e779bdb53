use std::{fmt, io};

use crate::error::mongo::{format_mongodb_error, is_cursor_not_found};

/// Crate-wide `Result` type using [`ScanError`] as the error.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Top-level error type for mongoscan.
///
/// Wraps the more specific error kinds so a single error type can be used
/// throughout the crate.
#[derive(Debug)]
pub enum ScanError {
    /// Connection-related errors.
    Connection(ConnectionError),

    /// Server-side cursor errors.
    Cursor(CursorError),

    /// Invalid query arguments (filter, sort).
    Query(QueryError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// MongoDB driver errors.
    MongoDb(mongodb::error::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Failed to establish a connection.
    ConnectionFailed(String),

    /// Invalid connection URI.
    InvalidUri(String),

    /// Not currently connected to MongoDB.
    NotConnected,

    /// Ping command failed.
    PingFailed(String),
}

/// Cursor-specific errors.
#[derive(Debug)]
pub enum CursorError {
    /// The server no longer knows the cursor (expired, killed, server restart).
    NotFound(String),

    /// The cursor handle was used after it was closed.
    Closed,
}

/// Query argument errors.
#[derive(Debug)]
pub enum QueryError {
    /// Filter is not a valid JSON document.
    InvalidFilter(String),

    /// Sort specification is malformed.
    InvalidSort(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

impl ScanError {
    /// Whether this error means the server-side cursor was invalidated.
    ///
    /// Raw driver errors are classified too, so callers that skip the
    /// [`CursorError`] mapping still recover.
    pub fn is_cursor_not_found(&self) -> bool {
        match self {
            ScanError::Cursor(CursorError::NotFound(_)) => true,
            ScanError::MongoDb(e) => is_cursor_not_found(e),
            _ => false,
        }
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Connection(e) => write!(f, "Connection error: {e}"),
            ScanError::Cursor(e) => write!(f, "Cursor error: {e}"),
            ScanError::Query(e) => write!(f, "{e}"),
            ScanError::Config(e) => write!(f, "Configuration error: {e}"),
            ScanError::Io(e) => write!(f, "I/O error: {e}"),
            ScanError::MongoDb(e) => format_mongodb_error(f, e),
            ScanError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::InvalidUri(uri) => write!(f, "Invalid connection URI: {uri}"),
            ConnectionError::NotConnected => write!(f, "Not connected to MongoDB"),
            ConnectionError::PingFailed(msg) => write!(f, "Ping failed: {msg}"),
        }
    }
}

impl fmt::Display for CursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorError::NotFound(msg) => write!(f, "Cursor not found: {msg}"),
            CursorError::Closed => write!(f, "Cursor already closed"),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::InvalidFilter(msg) => write!(f, "Invalid filter: {msg}"),
            QueryError::InvalidSort(msg) => write!(f, "Invalid sort: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for ScanError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for CursorError {}
impl std::error::Error for QueryError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to ScanError ========================= */

impl From<io::Error> for ScanError {
    fn from(err: io::Error) -> Self {
        ScanError::Io(err)
    }
}

impl From<mongodb::error::Error> for ScanError {
    fn from(err: mongodb::error::Error) -> Self {
        ScanError::MongoDb(err)
    }
}

impl From<ConnectionError> for ScanError {
    fn from(err: ConnectionError) -> Self {
        ScanError::Connection(err)
    }
}

impl From<CursorError> for ScanError {
    fn from(err: CursorError) -> Self {
        ScanError::Cursor(err)
    }
}

impl From<QueryError> for ScanError {
    fn from(err: QueryError) -> Self {
        ScanError::Query(err)
    }
}

impl From<ConfigError> for ScanError {
    fn from(err: ConfigError) -> Self {
        ScanError::Config(err)
    }
}

impl From<String> for ScanError {
    fn from(msg: String) -> Self {
        ScanError::Generic(msg)
    }
}

impl From<&str> for ScanError {
    fn from(msg: &str) -> Self {
        ScanError::Generic(msg.to_owned())
    }
}
