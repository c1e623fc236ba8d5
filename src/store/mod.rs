//! Data store modules for Supabase integration

pub mod lost_items;
#[cfg(test)]
pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use lost_items::{LostItem, LOST_ITEMS_TABLE};
pub use supabase::SupabaseClient;

/// A single row as sent to or received from the store
pub type Record = Map<String, Value>;

/// Sort direction for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Column ordering for list queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Descending,
        }
    }

    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Ascending,
        }
    }
}

/// Table-oriented store boundary used by the inventory workflow
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Read every row of `table` in the given order
    async fn list(&self, table: &str, order: &OrderBy) -> Result<Vec<Record>, StoreError>;

    /// Insert one row and return it with store-generated fields filled in
    async fn insert(&self, table: &str, record: Record) -> Result<Record, StoreError>;

    /// Cheap reachability check; returns the row count when the store reports it
    async fn probe(&self, table: &str) -> Result<Option<u64>, StoreError>;
}

/// Store errors, classified so callers can branch on the kind
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unknown column '{0}' in table schema")]
    UnknownField(String),

    #[error("Connection to store failed: {0}")]
    ConnectionFailed(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("No row returned from insert")]
    NoRowReturned,
}

impl StoreError {
    /// True when the store rejected `field` as a column it does not know
    pub fn is_unknown_field(&self, field: &str) -> bool {
        matches!(self, StoreError::UnknownField(name) if name == field)
    }
}
