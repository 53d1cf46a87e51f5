//! SQLite Client
//!
//! Reference [`DatabaseClient`] backed by rusqlite, for hosts that do not
//! bring their own driver.

use std::cell::RefCell;
use std::path::Path;

use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};
use rusqlite::{Connection, ToSql};

use crate::client::{DatabaseClient, DriverReturn, ExecuteResult};
use crate::value::{Record, SqlValue, ValueFormat};

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(SqliteValue::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            SqlValue::Bool(b) => ToSqlOutput::Owned(SqliteValue::Integer(i64::from(*b))),
        })
    }
}

fn from_sqlite(value: SqliteValue) -> SqlValue {
    match value {
        SqliteValue::Null => SqlValue::Null,
        SqliteValue::Integer(i) => SqlValue::Integer(i),
        SqliteValue::Real(f) => SqlValue::Real(f),
        SqliteValue::Text(s) => SqlValue::Text(s),
        SqliteValue::Blob(b) => SqlValue::Blob(b),
    }
}

/// SQLite-backed client with the sentinel semantics the gateway expects.
///
/// Error text is flushed at the start of every call and recorded on any
/// rusqlite failure; the result grid of the most recent scalar query is
/// cached so statement-less scalar fetches can address it. Like the
/// wrapped [`Connection`], one instance serves one thread at a time.
pub struct SqliteClient {
    conn: Connection,
    last_error: RefCell<String>,
    cached_rows: RefCell<Vec<Vec<SqlValue>>>,
}

impl SqliteClient {
    /// Wrap an already configured connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            last_error: RefCell::new(String::new()),
            cached_rows: RefCell::new(Vec::new()),
        }
    }

    /// Open or create a database file.
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        Ok(Self::new(Connection::open(path)?))
    }

    /// Open an in-memory database (testing).
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    /// Get reference to the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn flush_error(&self) {
        self.last_error.borrow_mut().clear();
    }

    fn record_error(&self, e: rusqlite::Error) {
        *self.last_error.borrow_mut() = e.to_string();
    }

    fn run_query(&self, sql: &str) -> rusqlite::Result<Vec<Vec<SqlValue>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let column_count = stmt.column_count();
        let mut rows = stmt.query([])?;
        let mut grid = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for i in 0..column_count {
                cells.push(from_sqlite(row.get::<_, SqliteValue>(i)?));
            }
            grid.push(cells);
        }
        Ok(grid)
    }
}

impl DatabaseClient for SqliteClient {
    fn insert(
        &self,
        table: &str,
        data: &Record,
        _format: Option<&[ValueFormat]>,
    ) -> DriverReturn<SqlValue> {
        self.flush_error();

        let columns: Vec<&str> = data.columns().collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        );
        let params: Vec<&dyn ToSql> = data.iter().map(|(_, v)| v as &dyn ToSql).collect();

        match self.conn.execute(&sql, params.as_slice()) {
            Ok(_) => DriverReturn::Value(SqlValue::Integer(self.conn.last_insert_rowid())),
            Err(e) => {
                self.record_error(e);
                DriverReturn::Failed
            }
        }
    }

    fn update(
        &self,
        table: &str,
        data: &Record,
        filter: &Record,
        _format: Option<&[ValueFormat]>,
        _filter_format: Option<&[ValueFormat]>,
    ) -> DriverReturn<u64> {
        self.flush_error();

        let mut params: Vec<&dyn ToSql> = Vec::new();
        let mut index = 0usize;

        let mut assignments = Vec::with_capacity(data.len());
        for (column, value) in data.iter() {
            index += 1;
            assignments.push(format!("{column} = ?{index}"));
            params.push(value);
        }

        // Null filter values match with IS NULL; equality never would.
        let mut conditions = Vec::with_capacity(filter.len());
        for (column, value) in filter.iter() {
            if value.is_null() {
                conditions.push(format!("{column} IS NULL"));
            } else {
                index += 1;
                conditions.push(format!("{column} = ?{index}"));
                params.push(value);
            }
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            assignments.join(", "),
            conditions.join(" AND ")
        );

        match self.conn.execute(&sql, params.as_slice()) {
            Ok(n) => DriverReturn::Value(n as u64),
            Err(e) => {
                self.record_error(e);
                DriverReturn::Failed
            }
        }
    }

    fn execute(&self, statement: &str) -> DriverReturn<ExecuteResult> {
        self.flush_error();

        let mut stmt = match self.conn.prepare(statement) {
            Ok(stmt) => stmt,
            Err(e) => {
                self.record_error(e);
                return DriverReturn::Failed;
            }
        };

        // Row-producing statements report how many rows they returned.
        if stmt.column_count() > 0 {
            let mut rows = match stmt.query([]) {
                Ok(rows) => rows,
                Err(e) => {
                    self.record_error(e);
                    return DriverReturn::Failed;
                }
            };
            let mut count = 0u64;
            loop {
                match rows.next() {
                    Ok(Some(_)) => count += 1,
                    Ok(None) => break,
                    Err(e) => {
                        self.record_error(e);
                        return DriverReturn::Failed;
                    }
                }
            }
            return DriverReturn::Value(ExecuteResult::Affected(count));
        }

        // DML reports its changed-row count; everything else (DDL, PRAGMA
        // and the like) completes without one.
        let verb = statement
            .trim_start()
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();
        let reports_count = matches!(verb.as_str(), "INSERT" | "UPDATE" | "DELETE" | "REPLACE");

        match stmt.execute([]) {
            Ok(n) if reports_count => DriverReturn::Value(ExecuteResult::Affected(n as u64)),
            Ok(_) => DriverReturn::Value(ExecuteResult::Done),
            Err(e) => {
                self.record_error(e);
                DriverReturn::Failed
            }
        }
    }

    fn scalar(&self, statement: Option<&str>, column: usize, row: usize) -> Option<SqlValue> {
        self.flush_error();

        if let Some(sql) = statement {
            match self.run_query(sql) {
                Ok(grid) => *self.cached_rows.borrow_mut() = grid,
                Err(e) => {
                    self.record_error(e);
                    return None;
                }
            }
        }

        let cached = self.cached_rows.borrow();
        let value = cached.get(row)?.get(column)?.clone();
        // A SQL NULL cell is reported the same way as a missing one.
        if value.is_null() { None } else { Some(value) }
    }

    fn last_error_text(&self) -> String {
        self.last_error.borrow().clone()
    }
}
