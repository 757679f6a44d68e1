//! SQLite-backed gateway implementation.
//!
//! SQL is built dynamically from [`Filter`] clauses with numbered
//! placeholders; table and column names only ever come from crate code, never
//! from user input. JSON values map onto SQLite storage classes (booleans as
//! integers, nested structures as JSON text).

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};
use serde_json::{Number, Value};

use super::{Filter, Gateway, GatewayError, OrderBy, Row, Table};

pub struct SqliteGateway {
    conn: Connection,
}

impl SqliteGateway {
    /// Open a gateway over the database at `path`, running migrations.
    pub fn open(path: &Path) -> Result<Self, GatewayError> {
        let conn = Connection::open(path)?;
        configure_pragmas(&conn)?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory gateway (for testing).
    pub fn open_memory() -> Result<Self, GatewayError> {
        let conn = Connection::open_in_memory()?;
        configure_pragmas(&conn)?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Count tables in the database (for verification).
    pub fn count_tables(&self) -> Result<i64, GatewayError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(count)
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn configure_pragmas(conn: &Connection) -> Result<(), GatewayError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), GatewayError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_initial.sql")),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| GatewayError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet).
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, i64>(0),
    )
    .unwrap_or(0)
}

// ─── JSON <-> SQLite value mapping ────────────────────────────────────────────

fn to_sql_value(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(*b as i64),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Sql::Integer(i)
            } else {
                Sql::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => Sql::Text(s.clone()),
        // Arrays/objects are stored as JSON text.
        other => Sql::Text(other.to_string()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

/// Appends a WHERE clause for `filter`, continuing placeholder numbering from
/// `idx` and pushing bound values onto `params`.
fn push_where(
    sql: &mut String,
    filter: &Filter,
    params: &mut Vec<rusqlite::types::Value>,
    idx: &mut u32,
) {
    for (i, (column, value)) in filter.clauses().iter().enumerate() {
        sql.push_str(if i == 0 { " WHERE " } else { " AND " });
        sql.push_str(&format!("{column} = ?{idx}"));
        params.push(to_sql_value(value));
        *idx += 1;
    }
}

impl Gateway for SqliteGateway {
    fn select(
        &self,
        table: Table,
        filter: &Filter,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Row>, GatewayError> {
        let mut sql = format!("SELECT * FROM {}", table.name());
        let mut params = Vec::new();
        let mut idx = 1u32;
        push_where(&mut sql, filter, &mut params, &mut idx);
        if let Some(order) = order {
            sql.push_str(&format!(" ORDER BY {} {}", order.column, order.direction.sql()));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut out = Vec::new();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        while let Some(row) = rows.next()? {
            let mut map = Row::new();
            for (i, column) in columns.iter().enumerate() {
                map.insert(column.clone(), from_sql_value(row.get_ref(i)?));
            }
            out.push(map);
        }
        Ok(out)
    }

    fn insert(&self, table: Table, row: Row) -> Result<Row, GatewayError> {
        if row.is_empty() {
            return Err(GatewayError::InvalidRow("empty row".into()));
        }

        let columns: Vec<&str> = row.keys().map(String::as_str).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name(),
            columns.join(", "),
            placeholders.join(", "),
        );
        let params: Vec<rusqlite::types::Value> = row.values().map(to_sql_value).collect();

        self.conn.execute(&sql, params_from_iter(params.iter()))?;
        Ok(row)
    }

    fn update(&self, table: Table, patch: Row, filter: &Filter) -> Result<Vec<Row>, GatewayError> {
        if patch.is_empty() {
            return Err(GatewayError::InvalidRow("empty patch".into()));
        }

        let mut sql = format!("UPDATE {} SET ", table.name());
        let mut params = Vec::new();
        let mut idx = 1u32;
        for (i, (column, value)) in patch.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&format!("{column} = ?{idx}"));
            params.push(to_sql_value(value));
            idx += 1;
        }
        push_where(&mut sql, filter, &mut params, &mut idx);

        let affected = self.conn.execute(&sql, params_from_iter(params.iter()))?;
        if affected == 0 {
            return Err(GatewayError::NotFound {
                table: table.name(),
                detail: filter.describe(),
            });
        }

        self.select(table, filter, None)
    }

    fn delete(&self, table: Table, filter: &Filter) -> Result<(), GatewayError> {
        let mut sql = format!("DELETE FROM {}", table.name());
        let mut params = Vec::new();
        let mut idx = 1u32;
        push_where(&mut sql, filter, &mut params, &mut idx);

        let deleted = self.conn.execute(&sql, params_from_iter(params.iter()))?;
        if deleted == 0 {
            return Err(GatewayError::NotFound {
                table: table.name(),
                detail: filter.describe(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_gateway() -> SqliteGateway {
        SqliteGateway::open_memory().expect("in-memory gateway")
    }

    fn note_row(id: &str, owner: &str, subject: &str, title: &str, date: &str) -> Row {
        let Value::Object(map) = json!({
            "id": id,
            "owner_id": owner,
            "subject_id": subject,
            "title": title,
            "content": "",
            "record_date": date,
            "created_at": "2025-01-01T09:00:00",
            "updated_at": "2025-01-01T09:00:00",
        }) else {
            unreachable!()
        };
        map
    }

    #[test]
    fn database_initializes_all_tables() {
        let gateway = test_gateway();
        // 4 entity tables + schema_version
        let count = gateway.count_tables().unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn schema_version_is_current() {
        let gateway = test_gateway();
        let version: i64 = gateway
            .connection()
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn migration_idempotent() {
        let gateway = test_gateway();
        let result = run_migrations(gateway.connection());
        assert!(result.is_ok());
    }

    #[test]
    fn foreign_keys_enabled() {
        let gateway = test_gateway();
        let fk: i64 = gateway
            .connection()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn insert_then_select_round_trips() {
        let gateway = test_gateway();
        gateway
            .insert(Table::Notes, note_row("n1", "owner-a", "pat-1", "Intake", "2025-01-15"))
            .unwrap();

        let rows = gateway
            .select(Table::Notes, &Filter::new().eq("id", "n1"), None)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("title"), Some(&Value::from("Intake")));
        assert_eq!(rows[0].get("content"), Some(&Value::from("")));
    }

    #[test]
    fn select_honors_ownership_filter() {
        let gateway = test_gateway();
        gateway
            .insert(Table::Notes, note_row("n1", "owner-a", "pat-1", "Mine", "2025-01-15"))
            .unwrap();
        gateway
            .insert(Table::Notes, note_row("n2", "owner-b", "pat-1", "Theirs", "2025-01-16"))
            .unwrap();

        let rows = gateway
            .select(Table::Notes, &Filter::new().eq("owner_id", "owner-a"), None)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("title"), Some(&Value::from("Mine")));
    }

    #[test]
    fn select_orders_descending() {
        let gateway = test_gateway();
        gateway
            .insert(Table::Notes, note_row("n1", "owner-a", "pat-1", "Older", "2025-01-10"))
            .unwrap();
        gateway
            .insert(Table::Notes, note_row("n2", "owner-a", "pat-1", "Newer", "2025-02-01"))
            .unwrap();

        let rows = gateway
            .select(
                Table::Notes,
                &Filter::new().eq("owner_id", "owner-a"),
                Some(&OrderBy::desc("record_date")),
            )
            .unwrap();
        assert_eq!(rows[0].get("title"), Some(&Value::from("Newer")));
        assert_eq!(rows[1].get("title"), Some(&Value::from("Older")));
    }

    #[test]
    fn update_returns_affected_rows() {
        let gateway = test_gateway();
        gateway
            .insert(Table::Notes, note_row("n1", "owner-a", "pat-1", "Draft", "2025-01-15"))
            .unwrap();

        let mut patch = Row::new();
        patch.insert("title".into(), Value::from("Final"));
        let rows = gateway
            .update(
                Table::Notes,
                patch,
                &Filter::new().eq("id", "n1").eq("owner_id", "owner-a"),
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("title"), Some(&Value::from("Final")));
    }

    #[test]
    fn update_with_wrong_owner_is_not_found() {
        let gateway = test_gateway();
        gateway
            .insert(Table::Notes, note_row("n1", "owner-a", "pat-1", "Draft", "2025-01-15"))
            .unwrap();

        let mut patch = Row::new();
        patch.insert("title".into(), Value::from("Hijacked"));
        let result = gateway.update(
            Table::Notes,
            patch,
            &Filter::new().eq("id", "n1").eq("owner_id", "owner-b"),
        );
        match result.unwrap_err() {
            GatewayError::NotFound { table, .. } => assert_eq!(table, "notes"),
            other => panic!("Expected NotFound, got: {other}"),
        }
    }

    #[test]
    fn update_empty_patch_is_invalid() {
        let gateway = test_gateway();
        let result = gateway.update(Table::Notes, Row::new(), &Filter::new().eq("id", "n1"));
        assert!(matches!(result.unwrap_err(), GatewayError::InvalidRow(_)));
    }

    #[test]
    fn delete_removes_row() {
        let gateway = test_gateway();
        gateway
            .insert(Table::Notes, note_row("n1", "owner-a", "pat-1", "Gone", "2025-01-15"))
            .unwrap();
        gateway
            .delete(Table::Notes, &Filter::new().eq("id", "n1").eq("owner_id", "owner-a"))
            .unwrap();

        let rows = gateway.select(Table::Notes, &Filter::new(), None).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn delete_nonexistent_is_not_found() {
        let gateway = test_gateway();
        let result = gateway.delete(Table::Notes, &Filter::new().eq("id", "missing"));
        assert!(matches!(result.unwrap_err(), GatewayError::NotFound { .. }));
    }

    #[test]
    fn null_and_numeric_values_round_trip() {
        let gateway = test_gateway();
        let Value::Object(row) = json!({
            "id": "s1",
            "owner_id": "owner-a",
            "subject_id": "pat-1",
            "title": "Weekly session",
            "date": "2025-03-10",
            "time": "10:00:00",
            "duration_min": 60,
            "status": "scheduled",
            "payment_status": "to_pay",
            "fee": 75.5,
            "notes": "",
            "meeting_link": null,
        }) else {
            unreachable!()
        };
        gateway.insert(Table::Sessions, row).unwrap();

        let rows = gateway
            .select(Table::Sessions, &Filter::new().eq("id", "s1"), None)
            .unwrap();
        assert_eq!(rows[0].get("duration_min"), Some(&Value::from(60)));
        assert_eq!(rows[0].get("fee"), Some(&Value::from(75.5)));
        assert_eq!(rows[0].get("meeting_link"), Some(&Value::Null));
    }
}
