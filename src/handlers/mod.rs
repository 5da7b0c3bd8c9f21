pub mod common;
pub mod facilities;
pub mod photos;
pub mod spreadsheet;
pub mod taxonomy;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::{
    facilities::FacilityService, photos::PhotoService, search::SearchService,
    spreadsheet::SpreadsheetService, taxonomy::TaxonomyService,
};
use crate::storage::ObjectStorage;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub taxonomy: Arc<TaxonomyService>,
    pub facilities: Arc<FacilityService>,
    pub search: Arc<SearchService>,
    pub spreadsheet: Arc<SpreadsheetService>,
    pub photos: Arc<PhotoService>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        event_sender: Arc<EventSender>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            taxonomy: Arc::new(TaxonomyService::new(db.clone())),
            facilities: Arc::new(FacilityService::new(db.clone(), event_sender.clone())),
            search: Arc::new(SearchService::new(db.clone(), config)),
            spreadsheet: Arc::new(SpreadsheetService::new(
                db.clone(),
                event_sender.clone(),
                storage.clone(),
            )),
            photos: Arc::new(PhotoService::new(db, event_sender)),
            storage,
        }
    }
}
