//! Shared test fixtures: a `User` model, a custom manager and a capturing executor.

use crate::executor::{StewardError, StewardExecutor};
use crate::model::{Model, ModelInfo};
use crate::query::{Filter, Manager, QuerySet, Row, Select};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Mutex;

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    #[serde(default)]
    pub age: Option<i32>,
}

impl Model for User {
    const NAME: &'static str = "User";
}

/// Only users with `is_active = true`
#[derive(Debug, Default)]
pub struct ActiveUsersManager;

impl ActiveUsersManager {
    pub fn named(&self, all: QuerySet<User>, name: &str) -> QuerySet<User> {
        self.get_queryset(all).filter(Filter::eq("name", name))
    }
}

impl Manager<User> for ActiveUsersManager {
    fn get_queryset(&self, all: QuerySet<User>) -> QuerySet<User> {
        all.filter(Filter::eq("is_active", true))
    }

    fn check(&self, model: &ModelInfo) -> Result<(), String> {
        if model.has_field("is_active") {
            Ok(())
        } else {
            Err("requires an `is_active` column".to_string())
        }
    }
}

/// Records every select and answers with a fixed set of rows
pub struct CapturingExecutor {
    rows: Vec<Row>,
    captured: Mutex<Vec<Select>>,
}

impl CapturingExecutor {
    pub fn new(rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| match row {
                Value::Object(map) => map,
                other => panic!("fixture rows must be objects, got {other}"),
            })
            .collect();
        Self {
            rows,
            captured: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.captured.lock().unwrap().len()
    }

    pub fn captured(&self) -> Vec<Select> {
        self.captured.lock().unwrap().clone()
    }
}

impl StewardExecutor for CapturingExecutor {
    fn fetch_all(&self, select: &Select) -> Result<Vec<Row>, StewardError> {
        self.captured.lock().unwrap().push(select.clone());
        Ok(self.rows.clone())
    }
}
