//! Client Capability
//!
//! The injected database client and the tagged form of its return channel.

use crate::value::{Record, SqlValue, ValueFormat};

/// Tagged form of the driver's overloaded return channel.
///
/// Drivers in this family signal failure by returning a boolean `false` on
/// the same channel that carries real data. Clients translate that sentinel
/// into [`DriverReturn::Failed`] at the delegation boundary, so nothing
/// downstream ever re-tests raw values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverReturn<T> {
    /// The driver returned data. Zero counts and null identifiers are data.
    Value(T),
    /// The driver returned its failure marker.
    Failed,
}

impl<T> DriverReturn<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Outcome of one raw statement.
///
/// Kept as an enum so an affected-row count of `0` can never be confused
/// with the driver's boolean failure marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteResult {
    /// Rows affected or returned. Zero is a valid outcome.
    Affected(u64),
    /// The statement completed but reports no row count (DDL and similar).
    Done,
}

impl ExecuteResult {
    /// The reported row count, if the statement reports one.
    pub fn affected(&self) -> Option<u64> {
        match self {
            Self::Affected(n) => Some(*n),
            Self::Done => None,
        }
    }
}

/// The externally supplied database client.
///
/// The gateway owns no connection of its own; it is handed one of these at
/// construction time and routes every operation through it. Implementations
/// must keep two contracts:
///
/// - the failure sentinel is reported only through [`DriverReturn::Failed`]
///   (or `None` from [`scalar`](Self::scalar)), never encoded into a value;
/// - [`last_error_text`](Self::last_error_text) is flushed at the start of
///   every call, so that after a call it is non-empty exactly when that call
///   hit a real driver error. The scalar-fetch classification depends on
///   this.
pub trait DatabaseClient {
    /// Insert one row. `Value` carries the driver-native identifier of the
    /// new row, which may be `Null`, `Integer`, or `Text` depending on the
    /// driver.
    fn insert(
        &self,
        table: &str,
        data: &Record,
        format: Option<&[ValueFormat]>,
    ) -> DriverReturn<SqlValue>;

    /// Update rows matching the equality filter. `Value` carries the number
    /// of rows changed, which is legitimately zero.
    fn update(
        &self,
        table: &str,
        data: &Record,
        filter: &Record,
        format: Option<&[ValueFormat]>,
        filter_format: Option<&[ValueFormat]>,
    ) -> DriverReturn<u64>;

    /// Run a raw statement.
    fn execute(&self, statement: &str) -> DriverReturn<ExecuteResult>;

    /// Fetch a single cell, addressed by zero-based column and row index.
    ///
    /// `None` for the statement reuses the result set of the previous
    /// query. The return value is `None` both on failure and when the cell
    /// is absent or SQL NULL; callers disambiguate through
    /// [`last_error_text`](Self::last_error_text).
    fn scalar(&self, statement: Option<&str>, column: usize, row: usize) -> Option<SqlValue>;

    /// Error text of the most recent call; empty when it succeeded.
    fn last_error_text(&self) -> String;
}
