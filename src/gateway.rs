//! Command Gateway
//!
//! Normalizes the client's sentinel-overloaded outcomes into one failure
//! contract.

use crate::client::{DatabaseClient, DriverReturn, ExecuteResult};
use crate::value::{Record, SqlValue, ValueFormat};
use crate::{QueryError, QueryResult, UNKNOWN_DB_ERROR};

/// Stateless wrapper around an injected [`DatabaseClient`].
///
/// Holds only the client reference; every operation is one synchronous
/// delegated call followed by classification of its outcome. Safe to keep
/// long-lived and share to the extent the client itself allows.
pub struct CommandGateway<C> {
    client: C,
}

impl<C> CommandGateway<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Access the wrapped client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Consume the gateway, handing the client back.
    pub fn into_client(self) -> C {
        self.client
    }
}

impl<C: DatabaseClient> CommandGateway<C> {
    /// Insert one row and return the identifier of the new row.
    ///
    /// Only the driver's failure marker is an error; the identifier is
    /// coerced from its driver-native representation to an integer, with
    /// absent or unparseable identifiers becoming 0.
    pub fn insert(
        &self,
        table: &str,
        data: &Record,
        format: Option<&[ValueFormat]>,
    ) -> QueryResult<u64> {
        if table.is_empty() {
            return Err(precondition("insert", "table name is empty"));
        }
        if data.is_empty() {
            return Err(precondition("insert", "data is empty"));
        }

        match self.client.insert(table, data, format) {
            DriverReturn::Value(id) => Ok(coerce_insert_id(&id)),
            DriverReturn::Failed => Err(QueryError::Insert {
                table: table.to_string(),
                data: data.to_json(),
                message: self.driver_message(),
            }),
        }
    }

    /// Update rows matching the equality filter and return the number of
    /// rows changed. Zero changed rows is a success, not an error.
    pub fn update(
        &self,
        table: &str,
        data: &Record,
        filter: &Record,
        format: Option<&[ValueFormat]>,
        filter_format: Option<&[ValueFormat]>,
    ) -> QueryResult<u64> {
        if table.is_empty() {
            return Err(precondition("update", "table name is empty"));
        }
        if data.is_empty() {
            return Err(precondition("update", "data is empty"));
        }
        if filter.is_empty() {
            return Err(precondition("update", "filter is empty"));
        }

        match self
            .client
            .update(table, data, filter, format, filter_format)
        {
            DriverReturn::Value(n) => Ok(n),
            DriverReturn::Failed => Err(QueryError::Update {
                table: table.to_string(),
                data: data.to_json(),
                filter: filter.to_json(),
                message: self.driver_message(),
            }),
        }
    }

    /// Run a raw statement.
    ///
    /// Only [`DriverReturn::Failed`] is an error. A reported count of zero
    /// and a countless completion are both successes; the distinction from
    /// the boolean failure marker is structural, never a truthiness test.
    pub fn execute(&self, statement: &str) -> QueryResult<ExecuteResult> {
        if statement.is_empty() {
            return Err(precondition("execute", "statement is empty"));
        }

        match self.client.execute(statement) {
            DriverReturn::Value(result) => Ok(result),
            DriverReturn::Failed => Err(QueryError::Execute {
                statement: statement.to_string(),
                message: self.driver_message(),
            }),
        }
    }

    /// Fetch the first cell of the first row produced by `statement`.
    pub fn scalar_fetch(&self, statement: &str) -> QueryResult<Option<SqlValue>> {
        if statement.is_empty() {
            return Err(precondition("scalar fetch", "statement is empty"));
        }
        self.scalar_fetch_at(Some(statement), 0, 0)
    }

    /// Fetch one cell, addressed by zero-based column and row index; `None`
    /// for the statement reuses the previous query's result set.
    ///
    /// The client reports "no value" both when the query fails and when it
    /// succeeds without producing the addressed cell. The two are told
    /// apart through the error-text side channel: an absent value with
    /// empty error text is a legitimate `Ok(None)`, an absent value with
    /// non-empty error text is a failure.
    pub fn scalar_fetch_at(
        &self,
        statement: Option<&str>,
        column: usize,
        row: usize,
    ) -> QueryResult<Option<SqlValue>> {
        if statement == Some("") {
            return Err(precondition("scalar fetch", "statement is empty"));
        }

        match self.client.scalar(statement, column, row) {
            Some(value) => Ok(Some(value)),
            None => {
                let text = self.client.last_error_text();
                if text.is_empty() {
                    Ok(None)
                } else {
                    Err(QueryError::Scalar {
                        statement: statement.unwrap_or_default().to_string(),
                        message: text,
                    })
                }
            }
        }
    }

    fn driver_message(&self) -> String {
        let text = self.client.last_error_text();
        if text.is_empty() {
            UNKNOWN_DB_ERROR.to_string()
        } else {
            text
        }
    }
}

fn precondition(operation: &'static str, reason: &'static str) -> QueryError {
    QueryError::Precondition { operation, reason }
}

/// Coerce the driver-native new-row identifier to an integer.
fn coerce_insert_id(id: &SqlValue) -> u64 {
    match id {
        SqlValue::Integer(i) => u64::try_from(*i).unwrap_or(0),
        SqlValue::Real(f) if *f >= 0.0 => *f as u64,
        SqlValue::Real(_) => 0,
        SqlValue::Text(s) => s.trim().parse().unwrap_or(0),
        SqlValue::Bool(b) => u64::from(*b),
        SqlValue::Blob(_) | SqlValue::Null => 0,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Client whose replies are fixed per test.
    struct ScriptedClient {
        insert_reply: DriverReturn<SqlValue>,
        update_reply: DriverReturn<u64>,
        execute_reply: DriverReturn<ExecuteResult>,
        scalar_reply: Option<SqlValue>,
        error_text: String,
        calls: Cell<u32>,
    }

    impl ScriptedClient {
        fn succeeding() -> Self {
            Self {
                insert_reply: DriverReturn::Value(SqlValue::Integer(1)),
                update_reply: DriverReturn::Value(1),
                execute_reply: DriverReturn::Value(ExecuteResult::Affected(1)),
                scalar_reply: Some(SqlValue::Integer(1)),
                error_text: String::new(),
                calls: Cell::new(0),
            }
        }

        fn failing(error_text: &str) -> Self {
            Self {
                insert_reply: DriverReturn::Failed,
                update_reply: DriverReturn::Failed,
                execute_reply: DriverReturn::Failed,
                scalar_reply: None,
                error_text: error_text.to_string(),
                ..Self::succeeding()
            }
        }
    }

    impl DatabaseClient for ScriptedClient {
        fn insert(
            &self,
            _table: &str,
            _data: &Record,
            _format: Option<&[ValueFormat]>,
        ) -> DriverReturn<SqlValue> {
            self.calls.set(self.calls.get() + 1);
            self.insert_reply.clone()
        }

        fn update(
            &self,
            _table: &str,
            _data: &Record,
            _filter: &Record,
            _format: Option<&[ValueFormat]>,
            _filter_format: Option<&[ValueFormat]>,
        ) -> DriverReturn<u64> {
            self.calls.set(self.calls.get() + 1);
            self.update_reply
        }

        fn execute(&self, _statement: &str) -> DriverReturn<ExecuteResult> {
            self.calls.set(self.calls.get() + 1);
            self.execute_reply
        }

        fn scalar(&self, _statement: Option<&str>, _column: usize, _row: usize) -> Option<SqlValue> {
            self.calls.set(self.calls.get() + 1);
            self.scalar_reply.clone()
        }

        fn last_error_text(&self) -> String {
            self.error_text.clone()
        }
    }

    fn data() -> Record {
        Record::new().set("customer", "A")
    }

    #[test]
    fn test_insert_returns_driver_id() {
        let gateway = CommandGateway::new(ScriptedClient {
            insert_reply: DriverReturn::Value(SqlValue::Integer(42)),
            ..ScriptedClient::succeeding()
        });

        assert_eq!(gateway.insert("orders", &data(), None).unwrap(), 42);
    }

    #[test]
    fn test_insert_coerces_textual_and_absent_ids() {
        let cases = [
            (SqlValue::Text("42".into()), 42),
            (SqlValue::Text("  7 ".into()), 7),
            (SqlValue::Text("not a number".into()), 0),
            (SqlValue::Null, 0),
            (SqlValue::Integer(-3), 0),
            (SqlValue::Bool(true), 1),
        ];

        for (reply, expected) in cases {
            let gateway = CommandGateway::new(ScriptedClient {
                insert_reply: DriverReturn::Value(reply),
                ..ScriptedClient::succeeding()
            });
            assert_eq!(gateway.insert("orders", &data(), None).unwrap(), expected);
        }
    }

    #[test]
    fn test_insert_failure_carries_table_driver_text_and_data() {
        let gateway = CommandGateway::new(ScriptedClient::failing("duplicate key"));

        let err = gateway.insert("orders", &data(), None).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("duplicate key"));
        assert!(message.contains("orders"));
        assert!(message.contains(r#""customer":"A""#));
        assert_eq!(err.driver_message(), Some("duplicate key"));
        assert_eq!(err.subject(), Some("orders"));
    }

    #[test]
    fn test_empty_driver_text_falls_back_to_unknown_error() {
        let gateway = CommandGateway::new(ScriptedClient::failing(""));

        let err = gateway.insert("orders", &data(), None).unwrap_err();
        assert!(err.to_string().contains(UNKNOWN_DB_ERROR));
    }

    #[test]
    fn test_update_zero_affected_rows_is_success() {
        let gateway = CommandGateway::new(ScriptedClient {
            update_reply: DriverReturn::Value(0),
            ..ScriptedClient::succeeding()
        });

        let affected = gateway
            .update(
                "orders",
                &Record::new().set("status", "paid"),
                &Record::new().set("id", 5),
                None,
                None,
            )
            .unwrap();
        assert_eq!(affected, 0);
    }

    #[test]
    fn test_update_failure_carries_data_and_filter() {
        let gateway = CommandGateway::new(ScriptedClient::failing("deadlock"));

        let err = gateway
            .update(
                "orders",
                &Record::new().set("status", "paid"),
                &Record::new().set("id", 5),
                None,
                None,
            )
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("orders"));
        assert!(message.contains(r#""status":"paid""#));
        assert!(message.contains(r#""id":5"#));
        assert!(message.contains("deadlock"));
    }

    #[test]
    fn test_execute_zero_affected_is_not_a_failure() {
        let gateway = CommandGateway::new(ScriptedClient {
            execute_reply: DriverReturn::Value(ExecuteResult::Affected(0)),
            ..ScriptedClient::succeeding()
        });

        let result = gateway.execute("DELETE FROM orders WHERE id=99").unwrap();
        assert_eq!(result, ExecuteResult::Affected(0));
        assert_eq!(result.affected(), Some(0));
    }

    #[test]
    fn test_execute_countless_completion_is_success() {
        let gateway = CommandGateway::new(ScriptedClient {
            execute_reply: DriverReturn::Value(ExecuteResult::Done),
            ..ScriptedClient::succeeding()
        });

        let result = gateway.execute("CREATE TABLE t (id INTEGER)").unwrap();
        assert_eq!(result.affected(), None);
    }

    #[test]
    fn test_execute_failure_carries_statement_and_driver_text() {
        let gateway = CommandGateway::new(ScriptedClient::failing("syntax error"));

        let err = gateway
            .execute("DELETE FROM orders WHERE id=99")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("syntax error"));
        assert!(message.contains("DELETE FROM orders WHERE id=99"));
    }

    #[test]
    fn test_scalar_absent_with_empty_error_text_is_none() {
        let gateway = CommandGateway::new(ScriptedClient {
            scalar_reply: None,
            ..ScriptedClient::succeeding()
        });

        let value = gateway
            .scalar_fetch("SELECT max(id) FROM orders")
            .unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_scalar_absent_with_error_text_raises() {
        let gateway = CommandGateway::new(ScriptedClient::failing("no such table: orders"));

        let err = gateway
            .scalar_fetch("SELECT max(id) FROM orders")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("no such table: orders"));
        assert!(message.contains("SELECT max(id) FROM orders"));
    }

    #[test]
    fn test_scalar_present_value_ignores_stale_error_text() {
        // A value on the return channel is data; the side channel is only
        // consulted when the value is absent.
        let gateway = CommandGateway::new(ScriptedClient {
            scalar_reply: Some(SqlValue::Text("paid".into())),
            error_text: "stale".to_string(),
            ..ScriptedClient::succeeding()
        });

        let value = gateway.scalar_fetch("SELECT status FROM orders").unwrap();
        assert_eq!(value, Some(SqlValue::Text("paid".into())));
    }

    #[test]
    fn test_scalar_without_statement_reuses_previous_result() {
        let gateway = CommandGateway::new(ScriptedClient {
            scalar_reply: Some(SqlValue::Integer(9)),
            ..ScriptedClient::succeeding()
        });

        let value = gateway.scalar_fetch_at(None, 1, 0).unwrap();
        assert_eq!(value, Some(SqlValue::Integer(9)));
    }

    #[test]
    fn test_preconditions_reject_before_delegation() {
        let client = ScriptedClient::succeeding();
        let gateway = CommandGateway::new(client);

        assert!(gateway.insert("", &data(), None).is_err());
        assert!(gateway.insert("orders", &Record::new(), None).is_err());
        assert!(gateway
            .update("orders", &Record::new(), &data(), None, None)
            .is_err());
        assert!(gateway
            .update("orders", &data(), &Record::new(), None, None)
            .is_err());
        assert!(gateway.execute("").is_err());
        assert!(gateway.scalar_fetch("").is_err());
        assert!(gateway.scalar_fetch_at(Some(""), 0, 0).is_err());

        assert_eq!(gateway.client().calls.get(), 0);
    }

    #[test]
    fn test_precondition_error_has_no_driver_message() {
        let gateway = CommandGateway::new(ScriptedClient::succeeding());

        let err = gateway.execute("").unwrap_err();
        assert_eq!(err.driver_message(), None);
        assert_eq!(err.subject(), None);
    }
}
