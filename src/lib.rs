//! Querygate
//!
//! A thin gateway over database drivers that overload their return channel
//! with sentinel values (`false` for failure, `null` for both failure and
//! "no result"). The gateway delegates each call to an injected
//! [`DatabaseClient`], classifies the outcome per operation, and surfaces
//! every real failure as a single structured [`QueryError`].
//!
//! ```no_run
//! use querygate::{CommandGateway, Record, SqliteClient};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SqliteClient::open_in_memory()?;
//! let gateway = CommandGateway::new(client);
//!
//! gateway.execute("CREATE TABLE orders (id INTEGER PRIMARY KEY, customer TEXT)")?;
//! let id = gateway.insert("orders", &Record::new().set("customer", "A"), None)?;
//! assert_eq!(id, 1);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod gateway;
pub mod sqlite;
pub mod value;

use thiserror::Error;

/// Fallback message used when the driver reports a failure but supplies no
/// error text.
pub const UNKNOWN_DB_ERROR: &str = "Unknown database error";

/// Query errors
///
/// One error kind for every gateway operation. Each variant carries the
/// table or statement the failing call was issued against, the serialized
/// input parameters where the operation takes any, and the driver's error
/// text (or [`UNKNOWN_DB_ERROR`]).
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Error inserting into table {table}: {message}. Data: {data}")]
    Insert {
        table: String,
        data: String,
        message: String,
    },

    #[error("Error updating table {table}: {message}. Data: {data}, Where: {filter}")]
    Update {
        table: String,
        data: String,
        filter: String,
        message: String,
    },

    #[error("Error executing {statement}: {message}")]
    Execute { statement: String, message: String },

    #[error("Error fetching scalar {statement}: {message}")]
    Scalar { statement: String, message: String },

    /// An argument was rejected before the client was invoked.
    #[error("{operation}: {reason}")]
    Precondition {
        operation: &'static str,
        reason: &'static str,
    },
}

impl QueryError {
    /// The driver error text attached at failure-detection time, if the
    /// failure came from the driver at all.
    pub fn driver_message(&self) -> Option<&str> {
        match self {
            Self::Insert { message, .. }
            | Self::Update { message, .. }
            | Self::Execute { message, .. }
            | Self::Scalar { message, .. } => Some(message),
            Self::Precondition { .. } => None,
        }
    }

    /// The table or statement the failing call targeted.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Insert { table, .. } | Self::Update { table, .. } => Some(table),
            Self::Execute { statement, .. } | Self::Scalar { statement, .. } => Some(statement),
            Self::Precondition { .. } => None,
        }
    }
}

pub type QueryResult<T> = Result<T, QueryError>;

// Re-exports
pub use client::{DatabaseClient, DriverReturn, ExecuteResult};
pub use gateway::CommandGateway;
pub use sqlite::SqliteClient;
pub use value::{Record, SqlValue, ValueFormat};
