//! Listing and submission workflow for the lost items board

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::form::{ItemForm, ValidationErrors};
use crate::store::lost_items::{CREATED_AT, STUDENT_ID};
use crate::store::{LostItem, OrderBy, StoreClient, StoreError, LOST_ITEMS_TABLE};

/// Board lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No store configured; terminal
    Unconfigured,
    Loading,
    Loaded,
}

/// Point-in-time view of the board for rendering
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub items: Vec<LostItem>,
    pub processing: bool,
}

struct BoardState {
    phase: Phase,
    items: Vec<LostItem>,
    /// Ticket of the newest fetch whose rows are in `items`
    applied_fetch: u64,
}

/// Holds the in-progress flag for as long as it lives
pub(super) struct ProcessingGuard<'a>(&'a AtomicBool);

impl<'a> ProcessingGuard<'a> {
    pub(super) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Successful submission
#[derive(Debug, Clone)]
pub struct Submitted {
    /// Stored row, when the store's response could be read back
    pub item: Option<LostItem>,
    /// The row was stored without `student_id`
    pub schema_fallback: bool,
}

impl Submitted {
    /// Notice to show after a degraded success
    pub fn notice(&self) -> Option<&'static str> {
        self.schema_fallback.then_some(
            "Item added! (Note: please run the SQL migration that adds the student_id column.)",
        )
    }
}

/// Reasons a submission was not stored
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Store is not configured")]
    Unconfigured,

    #[error("A submission is already in progress")]
    Busy,

    #[error("Incomplete form: {0}")]
    Incomplete(ValidationErrors),

    #[error("Store unreachable: {0}")]
    Unreachable(StoreError),

    #[error("Insert failed: {0}")]
    Insert(StoreError),
}

impl SubmitError {
    /// User-facing text for the blocking notice
    pub fn notice(&self) -> String {
        match self {
            SubmitError::Unconfigured => {
                "Please configure the Supabase environment variables first.".to_string()
            }
            SubmitError::Busy => {
                "Another submission is still being processed. Please wait.".to_string()
            }
            SubmitError::Incomplete(_) => "Please fill in all fields.".to_string(),
            SubmitError::Unreachable(_) => {
                "Cannot connect to the database. Please check the Supabase settings.".to_string()
            }
            SubmitError::Insert(e) => format!("Error adding item: {}", e),
        }
    }
}

/// Owns the item collection and drives fetch and submit against the store
pub struct InventoryWorkflow {
    store: Option<Arc<dyn StoreClient>>,
    state: RwLock<BoardState>,
    pub(super) processing: AtomicBool,
    fetch_tickets: AtomicU64,
}

impl InventoryWorkflow {
    pub fn new(store: Option<Arc<dyn StoreClient>>) -> Self {
        let phase = if store.is_some() {
            Phase::Loading
        } else {
            Phase::Unconfigured
        };

        Self {
            store,
            state: RwLock::new(BoardState {
                phase,
                items: Vec::new(),
                applied_fetch: 0,
            }),
            processing: AtomicBool::new(false),
            fetch_tickets: AtomicU64::new(0),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    pub fn phase(&self) -> Phase {
        self.state.read().phase
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.read();
        Snapshot {
            phase: state.phase,
            items: state.items.clone(),
            processing: self.is_processing(),
        }
    }

    /// Reload the collection, newest first. Read failures keep the previous items,
    /// unreadable rows are skipped, and a fetch that finishes after a newer one is dropped.
    pub async fn fetch_all(&self) {
        let Some(store) = &self.store else {
            return;
        };

        let ticket = self.fetch_tickets.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.write().phase = Phase::Loading;

        let fetched: Result<Vec<LostItem>, StoreError> = store
            .list(LOST_ITEMS_TABLE, &OrderBy::desc(CREATED_AT))
            .await
            .map(|rows| rows.into_iter().filter_map(readable_item).collect());

        let mut state = self.state.write();
        match fetched {
            Ok(_) if ticket < state.applied_fetch => {
                debug!(ticket, applied = state.applied_fetch, "Dropping stale item list");
            }
            Ok(items) => {
                state.items = items;
                state.applied_fetch = ticket;
            }
            Err(e) => error!(error = %e, "Error fetching items"),
        }
        if ticket == self.fetch_tickets.load(Ordering::Acquire) {
            state.phase = Phase::Loaded;
        }
    }

    /// Validate and store a new item; the form is cleared only on success
    pub async fn submit(&self, form: &mut ItemForm) -> Result<Submitted, SubmitError> {
        let store = self.store.as_ref().ok_or(SubmitError::Unconfigured)?;
        let _guard = ProcessingGuard::acquire(&self.processing).ok_or(SubmitError::Busy)?;

        let draft = form.validate().map_err(SubmitError::Incomplete)?;

        store
            .probe(LOST_ITEMS_TABLE)
            .await
            .map_err(SubmitError::Unreachable)?;

        let record = draft.to_record();
        let (row, schema_fallback) = match store.insert(LOST_ITEMS_TABLE, record.clone()).await {
            Ok(row) => (row, false),
            Err(e) if e.is_unknown_field(STUDENT_ID) => {
                warn!(error = %e, "Store schema lacks student_id, retrying insert without it");
                let mut fallback = record;
                fallback.remove(STUDENT_ID);
                let row = store
                    .insert(LOST_ITEMS_TABLE, fallback)
                    .await
                    .map_err(SubmitError::Insert)?;
                (row, true)
            }
            Err(e) => return Err(SubmitError::Insert(e)),
        };

        let item = match LostItem::from_record(row) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "Inserted row could not be read back");
                None
            }
        };
        info!(id = ?item.as_ref().map(|i| i.id.as_str()), schema_fallback, "Lost item added");

        form.clear();
        self.fetch_all().await;

        Ok(Submitted {
            item,
            schema_fallback,
        })
    }
}

fn readable_item(row: crate::store::Record) -> Option<LostItem> {
    match LostItem::from_record(row) {
        Ok(item) => Some(item),
        Err(e) => {
            warn!(error = %e, "Skipping unreadable lost item row");
            None
        }
    }
}
