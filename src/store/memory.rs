//! In-memory store used by tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use uuid::Uuid;

use super::lost_items::STUDENT_ID;
use super::{Direction, OrderBy, Record, StoreClient, StoreError};

/// Table store that keeps rows in memory and records every call
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Record>>,
    without_student_id: bool,
    fail_list: AtomicBool,
    fail_probe: AtomicBool,
    insert_failures: Mutex<VecDeque<StoreError>>,
    list_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub inserted: Mutex<Vec<Record>>,
    pub list_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub probe_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose schema predates the student id column
    pub fn without_student_id() -> Self {
        Self {
            without_student_id: true,
            ..Self::default()
        }
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_probe(&self, fail: bool) {
        self.fail_probe.store(fail, Ordering::SeqCst);
    }

    /// Queue an error for the next insert call
    pub fn push_insert_failure(&self, error: StoreError) {
        self.insert_failures.lock().push_back(error);
    }

    /// Hold the next list call after it has read the rows, until the sender fires
    pub fn hold_next_list(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.list_gate.lock() = Some(rx);
        tx
    }

    /// Put a row in the table as-is, bypassing insert
    pub fn seed(&self, row: Value) {
        if let Value::Object(record) = row {
            self.rows.lock().push(record);
        }
    }

    pub fn calls(&self) -> (usize, usize, usize) {
        (
            self.list_calls.load(Ordering::SeqCst),
            self.probe_calls.load(Ordering::SeqCst),
            self.insert_calls.load(Ordering::SeqCst),
        )
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().len()
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Greater,
        (None, Some(_)) => std::cmp::Ordering::Less,
        _ => std::cmp::Ordering::Equal,
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn list(&self, _table: &str, order: &OrderBy) -> Result<Vec<Record>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionFailed("list unavailable".into()));
        }

        let mut rows = self.rows.lock().clone();
        rows.sort_by(|a, b| {
            let ord = compare(a.get(&order.field), b.get(&order.field));
            match order.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        });

        let gate = self.list_gate.lock().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(rows)
    }

    async fn insert(&self, _table: &str, record: Record) -> Result<Record, StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.inserted.lock().push(record.clone());

        if let Some(error) = self.insert_failures.lock().pop_front() {
            return Err(error);
        }
        if self.without_student_id && record.contains_key(STUDENT_ID) {
            return Err(StoreError::UnknownField(STUDENT_ID.to_string()));
        }

        let mut rows = self.rows.lock();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let created_at = (base + Duration::seconds(rows.len() as i64)).to_rfc3339();

        let mut row = record;
        row.insert("id".into(), json!(Uuid::new_v4()));
        row.insert("created_at".into(), json!(created_at));
        row.insert("updated_at".into(), json!(created_at));
        rows.push(row.clone());
        Ok(row)
    }

    async fn probe(&self, _table: &str) -> Result<Option<u64>, StoreError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionFailed("connection refused".into()));
        }
        Ok(Some(self.rows.lock().len() as u64))
    }
}
