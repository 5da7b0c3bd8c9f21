use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{facility_photo, facility_photo_link};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::PhotoView;
use crate::services::facilities::find_facility;

/// Attaches stored photos to facilities
#[derive(Clone)]
pub struct PhotoService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl PhotoService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Links the photo at `url` to the facility, creating the photo row on first use.
    #[instrument(skip(self))]
    pub async fn attach(
        &self,
        facility_id: Uuid,
        url: &str,
        filename: &str,
    ) -> Result<PhotoView, ServiceError> {
        let txn = self.db.begin().await?;
        find_facility(&txn, facility_id).await?;

        let photo = match facility_photo::Entity::find()
            .filter(facility_photo::Column::Url.eq(url))
            .one(&txn)
            .await?
        {
            Some(existing) => existing,
            None => {
                facility_photo::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    url: Set(url.to_string()),
                    filename: Set(filename.to_string()),
                }
                .insert(&txn)
                .await?
            }
        };

        let linked = facility_photo_link::Entity::find_by_id((facility_id, photo.id))
            .one(&txn)
            .await?
            .is_some();
        if !linked {
            facility_photo_link::ActiveModel {
                facility: Set(facility_id),
                photo: Set(photo.id),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        info!("Attached photo {} to facility {}", photo.id, facility_id);
        self.event_sender
            .send_or_log(Event::PhotoAttached {
                facility_id,
                photo_id: photo.id,
            });
        Ok(PhotoView::from(photo))
    }

    /// Drops the association and returns the stored filename so the object can be removed.
    #[instrument(skip(self))]
    pub async fn detach(&self, facility_id: Uuid, photo_id: Uuid) -> Result<String, ServiceError> {
        let txn = self.db.begin().await?;
        find_facility(&txn, facility_id).await?;

        let photo = facility_photo::Entity::find_by_id(photo_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("photo {}", photo_id)))?;

        let removed = facility_photo_link::Entity::delete_by_id((facility_id, photo_id))
            .exec(&txn)
            .await?;
        if removed.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "photo {} is not attached to facility {}",
                photo_id, facility_id
            )));
        }
        txn.commit().await?;

        info!("Detached photo {} from facility {}", photo_id, facility_id);
        self.event_sender
            .send_or_log(Event::PhotoDetached {
                facility_id,
                photo_id,
            });
        Ok(photo.filename)
    }
}
