//! In-memory executor.
//!
//! `MemoryExecutor` keeps tables of JSON rows and evaluates a [`Select`]
//! directly: filter, order, offset, limit. It stands in for a database in
//! tests and examples and counts every fetch, which makes it easy to show
//! that building a queryset executes nothing.

use crate::executor::{StewardError, StewardExecutor};
use crate::query::filter::sort_order;
use crate::query::select::{Direction, Select};
use crate::query::Row;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// Tables of rows held in memory
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    fetches: AtomicUsize,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one row to `table`
    ///
    /// # Errors
    ///
    /// Returns `StewardError::ParseError` if `row` is not a JSON object.
    pub fn insert(&self, table: &str, row: Value) -> Result<(), StewardError> {
        self.insert_many(table, std::iter::once(row))
    }

    /// Append rows to `table`; nothing is inserted if any row is invalid
    ///
    /// # Errors
    ///
    /// Returns `StewardError::ParseError` if a row is not a JSON object.
    pub fn insert_many<I>(&self, table: &str, rows: I) -> Result<(), StewardError>
    where
        I: IntoIterator<Item = Value>,
    {
        let rows = rows
            .into_iter()
            .map(|row| match row {
                Value::Object(map) => Ok(map),
                other => Err(StewardError::ParseError(format!(
                    "Rows must be JSON objects, got: {other}"
                ))),
            })
            .collect::<Result<Vec<Row>, _>>()?;

        let mut tables = self.write()?;
        let stored = tables.entry(table.to_string()).or_default();
        log::debug!("Inserting {} row(s) into '{}'", rows.len(), table);
        stored.extend(rows);
        Ok(())
    }

    /// Every stored row of `table`, unfiltered
    ///
    /// # Errors
    ///
    /// Returns `StewardError::Other` if the store lock is poisoned.
    pub fn table_rows(&self, table: &str) -> Result<Vec<Row>, StewardError> {
        Ok(self.read()?.get(table).cloned().unwrap_or_default())
    }

    /// Remove every row of `table`
    ///
    /// # Errors
    ///
    /// Returns `StewardError::Other` if the store lock is poisoned.
    pub fn truncate(&self, table: &str) -> Result<(), StewardError> {
        if let Some(rows) = self.write()?.get_mut(table) {
            rows.clear();
        }
        Ok(())
    }

    /// Number of fetches executed so far
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Vec<Row>>>, StewardError> {
        self.tables
            .read()
            .map_err(|e| StewardError::Other(format!("Failed to lock memory store: {e}")))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<Row>>>, StewardError> {
        self.tables
            .write()
            .map_err(|e| StewardError::Other(format!("Failed to lock memory store: {e}")))
    }
}

impl StewardExecutor for MemoryExecutor {
    fn fetch_all(&self, select: &Select) -> Result<Vec<Row>, StewardError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let tables = self.read()?;
        let Some(stored) = tables.get(select.table()) else {
            return Err(StewardError::QueryError(format!(
                "relation \"{}\" does not exist",
                select.table()
            )));
        };

        let mut rows: Vec<Row> = stored
            .iter()
            .filter(|row| select.filter_ref().map_or(true, |f| f.matches(row)))
            .cloned()
            .collect();
        drop(tables);

        if !select.ordering().is_empty() {
            // stable: ties keep insertion order
            rows.sort_by(|a, b| {
                for (column, direction) in select.ordering() {
                    let left = a.get(column).unwrap_or(&Value::Null);
                    let right = b.get(column).unwrap_or(&Value::Null);
                    let ord = match direction {
                        Direction::Asc => sort_order(left, right),
                        Direction::Desc => sort_order(right, left),
                    };
                    if ord.is_ne() {
                        return ord;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        let offset = select.offset_value().unwrap_or(0) as usize;
        let limit = select.limit_value().map_or(usize::MAX, |l| l as usize);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::Filter;
    use fake::faker::name::en::Name;
    use fake::Fake;
    use serde_json::json;

    fn seeded() -> MemoryExecutor {
        let executor = MemoryExecutor::new();
        executor
            .insert_many(
                "users",
                vec![
                    json!({"id": 1, "name": "Cleo", "age": 30}),
                    json!({"id": 2, "name": "Ada", "age": null}),
                    json!({"id": 3, "name": "Bea", "age": 25}),
                    json!({"id": 4, "name": "Dan", "age": 30}),
                ],
            )
            .unwrap();
        executor
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn test_filter_and_order() {
        let executor = seeded();
        let select = Select::new("users")
            .filter(Filter::gte("age", 25))
            .order_by("age", Direction::Desc)
            .order_by("id", Direction::Asc);

        assert_eq!(ids(&executor.fetch_all(&select).unwrap()), vec![1, 4, 3]);
    }

    #[test]
    fn test_nulls_sort_last_ascending_first_descending() {
        let executor = seeded();
        let asc = Select::new("users").order_by("age", Direction::Asc);
        assert_eq!(ids(&executor.fetch_all(&asc).unwrap()), vec![3, 1, 4, 2]);

        let desc = Select::new("users").order_by("age", Direction::Desc);
        assert_eq!(ids(&executor.fetch_all(&desc).unwrap()), vec![2, 1, 4, 3]);
    }

    #[test]
    fn test_offset_and_limit() {
        let executor = seeded();
        let select = Select::new("users")
            .order_by("id", Direction::Asc)
            .offset(1)
            .limit(2);
        assert_eq!(ids(&executor.fetch_all(&select).unwrap()), vec![2, 3]);
    }

    #[test]
    fn test_count_ignores_pagination() {
        let executor = seeded();
        let select = Select::new("users").limit(1);
        assert_eq!(executor.fetch_count(&select).unwrap(), 4);
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let executor = MemoryExecutor::new();
        let err = executor.fetch_all(&Select::new("ghosts")).unwrap_err();
        assert!(err.to_string().contains("\"ghosts\" does not exist"), "{err}");
    }

    #[test]
    fn test_rejects_non_object_rows() {
        let executor = MemoryExecutor::new();
        let err = executor
            .insert_many("users", vec![json!({"id": 1}), json!([1, 2])])
            .unwrap_err();
        assert!(matches!(err, StewardError::ParseError(_)));
        assert!(executor.table_rows("users").unwrap().is_empty());
    }

    #[test]
    fn test_fetch_counter_and_truncate() {
        let executor = MemoryExecutor::new();
        for id in 0..10 {
            let name: String = Name().fake();
            executor.insert("people", json!({"id": id, "name": name})).unwrap();
        }
        assert_eq!(executor.fetches(), 0);

        let rows = executor.fetch_all(&Select::new("people")).unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(executor.fetches(), 1);

        executor.truncate("people").unwrap();
        assert!(executor.fetch_all(&Select::new("people")).unwrap().is_empty());
        assert_eq!(executor.fetches(), 2);
    }
}
