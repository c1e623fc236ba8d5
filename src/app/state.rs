//! Application state shared across routes

use std::sync::Arc;

use tracing::{error, warn};

use crate::config::Config;
use crate::inventory::InventoryWorkflow;
use crate::store::{StoreClient, SupabaseClient};
use crate::upload::{ImageUploader, SimulatedUploader};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub inventory: Arc<InventoryWorkflow>,
    pub uploader: Arc<dyn ImageUploader>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = connect_store(&config);
        let uploader = Arc::new(SimulatedUploader::new(config.upload_delay));
        Self::with_parts(config, store, uploader)
    }

    /// Assemble state from explicit collaborators
    pub fn with_parts(
        config: Config,
        store: Option<Arc<dyn StoreClient>>,
        uploader: Arc<dyn ImageUploader>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            inventory: Arc::new(InventoryWorkflow::new(store)),
            uploader,
        }
    }
}

/// Build the Supabase handle, or `None` when the board must run unconfigured
fn connect_store(config: &Config) -> Option<Arc<dyn StoreClient>> {
    let Some(store_config) = &config.store else {
        warn!(
            "Supabase environment variables are not set. Please configure SUPABASE_URL and \
             SUPABASE_ANON_KEY."
        );
        return None;
    };

    match SupabaseClient::new(store_config, config.store_timeout) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            error!(error = %e, "Failed to build Supabase client");
            None
        }
    }
}
