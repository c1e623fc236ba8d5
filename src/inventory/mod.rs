//! Lost items board: in-memory collection, form handling and submission

pub mod form;
pub mod image;
pub mod workflow;

pub use form::{ItemForm, ValidationErrors};
pub use workflow::{InventoryWorkflow, Phase, Snapshot, SubmitError};
