//! Table-store gateway — the persistence seam of the crate.
//!
//! The core never talks to storage directly; it issues filtered
//! select/insert/update/delete requests against logical tables through the
//! [`Gateway`] trait. Rows travel as JSON objects so the trait stays
//! independent of any particular backend. [`sqlite::SqliteGateway`] is the
//! bundled reference implementation.

pub mod sqlite;

pub use sqlite::SqliteGateway;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// A stored or in-flight row: column name to JSON value.
pub type Row = Map<String, Value>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("No matching row in {table}: {detail}")]
    NotFound { table: &'static str, detail: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Row cannot be stored or decoded: {0}")]
    InvalidRow(String),

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },
}

/// Logical tables exposed by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Patients,
    Sessions,
    Notes,
    TreatmentPlans,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Patients => "patients",
            Self::Sessions => "sessions",
            Self::Notes => "notes",
            Self::TreatmentPlans => "treatment_plans",
        }
    }
}

/// Conjunction of `column = value` predicates.
///
/// Ownership rule: any filter that targets an existing record must carry
/// `owner_id` next to the record id — never check-then-write.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.clauses.push((column.to_string(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Human-readable form for error details.
    pub fn describe(&self) -> String {
        if self.clauses.is_empty() {
            return "<unfiltered>".into();
        }
        self.clauses
            .iter()
            .map(|(c, v)| format!("{c} = {v}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Single-column ordering for selects.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDir,
}

impl OrderBy {
    pub fn asc(column: &str) -> Self {
        Self { column: column.to_string(), direction: SortDir::Asc }
    }

    pub fn desc(column: &str) -> Self {
        Self { column: column.to_string(), direction: SortDir::Desc }
    }
}

/// The storage contract the core depends on.
///
/// `update` and `delete` report [`GatewayError::NotFound`] when the filter
/// matched nothing, so an ownership mismatch surfaces the same way as a
/// missing record.
pub trait Gateway {
    fn select(
        &self,
        table: Table,
        filter: &Filter,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Row>, GatewayError>;

    /// Inserts one row and returns it as stored.
    fn insert(&self, table: Table, row: Row) -> Result<Row, GatewayError>;

    /// Applies `patch` to every row matching `filter`; returns the affected rows.
    fn update(&self, table: Table, patch: Row, filter: &Filter) -> Result<Vec<Row>, GatewayError>;

    /// Deletes every row matching `filter`.
    fn delete(&self, table: Table, filter: &Filter) -> Result<(), GatewayError>;
}

/// Serializes a model into a gateway row.
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, GatewayError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(GatewayError::InvalidRow(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(GatewayError::InvalidRow(e.to_string())),
    }
}

/// Decodes a gateway row into a model.
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, GatewayError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| GatewayError::InvalidRow(e.to_string()))
}

/// Decodes the first of a set of affected rows, e.g. after a single-record update.
pub fn single<T: DeserializeOwned>(table: Table, mut rows: Vec<Row>) -> Result<T, GatewayError> {
    if rows.is_empty() {
        return Err(GatewayError::NotFound {
            table: table.name(),
            detail: "no rows returned".into(),
        });
    }
    from_row(rows.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Probe {
        id: String,
        count: i64,
    }

    #[test]
    fn table_names() {
        assert_eq!(Table::Patients.name(), "patients");
        assert_eq!(Table::Sessions.name(), "sessions");
        assert_eq!(Table::Notes.name(), "notes");
        assert_eq!(Table::TreatmentPlans.name(), "treatment_plans");
    }

    #[test]
    fn filter_collects_clauses_in_order() {
        let f = Filter::new().eq("id", "abc").eq("owner_id", "xyz");
        assert_eq!(f.clauses().len(), 2);
        assert_eq!(f.clauses()[0].0, "id");
        assert_eq!(f.clauses()[1].0, "owner_id");
        assert!(!f.is_empty());
    }

    #[test]
    fn filter_describe_is_readable() {
        let f = Filter::new().eq("id", "abc");
        assert_eq!(f.describe(), "id = \"abc\"");
        assert_eq!(Filter::new().describe(), "<unfiltered>");
    }

    #[test]
    fn row_round_trip() {
        let probe = Probe { id: "a".into(), count: 3 };
        let row = to_row(&probe).unwrap();
        assert_eq!(row.get("count"), Some(&Value::from(3)));
        let back: Probe = from_row(row).unwrap();
        assert_eq!(back, probe);
    }

    #[test]
    fn to_row_rejects_non_objects() {
        assert!(to_row(&42i64).is_err());
    }

    #[test]
    fn single_on_empty_is_not_found() {
        let result: Result<Probe, _> = single(Table::Notes, Vec::new());
        match result.unwrap_err() {
            GatewayError::NotFound { table, .. } => assert_eq!(table, "notes"),
            other => panic!("Expected NotFound, got: {other}"),
        }
    }
}
