use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::common::Patch;
use crate::entities::{
    facility, facility_age_link, facility_paying_type_link, facility_photo,
    facility_photo_link,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{FacilityFields, FacilityPatch, FacilityView, PhotoView};
use crate::services::taxonomy::{self, TaxonomyAxis, DEFAULT_OWNING_TYPE};

/// Taxonomy labels of a facility after normalization
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedTaxonomy {
    pub type_name: String,
    pub owning_type: Option<String>,
    pub covering_type: Option<String>,
    pub paying_type: Vec<String>,
    pub age: Vec<String>,
}

/// Resolves every taxonomy field of a full record. A missing owning type
/// falls back to the sentinel term.
pub(crate) async fn resolve_taxonomy<C>(
    conn: &C,
    fields: &FacilityFields,
) -> Result<ResolvedTaxonomy, ServiceError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let type_name = taxonomy::resolve(conn, TaxonomyAxis::Type, &fields.type_name).await?;
    let owning_label = fields
        .owning_type
        .as_deref()
        .filter(|label| !label.trim().is_empty())
        .unwrap_or(DEFAULT_OWNING_TYPE);
    let owning_type = taxonomy::resolve(conn, TaxonomyAxis::OwningType, owning_label).await?;
    let covering_type = match fields.covering_type.as_deref() {
        Some(label) if !label.trim().is_empty() => {
            Some(taxonomy::resolve(conn, TaxonomyAxis::CoveringType, label).await?)
        }
        _ => None,
    };
    let paying_type =
        taxonomy::resolve_all(conn, TaxonomyAxis::PayingType, &fields.paying_type).await?;
    let age = taxonomy::resolve_all(conn, TaxonomyAxis::Age, &fields.age).await?;

    Ok(ResolvedTaxonomy {
        type_name,
        owning_type: Some(owning_type),
        covering_type,
        paying_type,
        age,
    })
}

/// Human readable identity used in `AlreadyExists` messages
fn identity(name: &str, address: &str, owner: &str, area: f64, type_name: &str) -> String {
    format!(
        "facility '{}' at '{}' owned by '{}' (area {}, type '{}')",
        name, address, owner, area, type_name
    )
}

fn patched_text<'a>(patch: &'a Patch<String>, current: &'a str) -> &'a str {
    match patch {
        Patch::Value(v) => v,
        _ => current,
    }
}

/// Copies plain (non-taxonomy) fields onto an active model
fn apply_fields(
    active: &mut facility::ActiveModel,
    fields: &FacilityFields,
) -> Result<(), ServiceError> {
    active.name = Set(fields.name.trim().to_string());
    active.owner = Set(fields.owner.trim().to_string());
    active.address = Set(fields.address.trim().to_string());
    active.x = Set(fields.x);
    active.y = Set(fields.y);
    active.hidden = Set(fields.hidden);
    active.length = Set(fields.length);
    active.width = Set(fields.width);
    active.height = Set(fields.height);
    active.depth = Set(fields.depth);
    active.area = Set(fields.area);
    active.eps = Set(fields.eps);
    active.actual_workload = Set(fields.actual_workload);
    active.annual_capacity = Set(fields.annual_capacity);
    active.accessibility = Set(fields.accessibility);
    active.site = Set(fields.site.clone());
    active.phone_number = Set(fields.phone_number.clone());
    active.document = Set(fields.document.clone());
    active.note = Set(fields.note.clone());
    active.working_hours = Set(fields.working_hours.to_json()?);
    active.search_text = Set(facility::search_text(
        &fields.name,
        &fields.address,
        &fields.owner,
    ));
    Ok(())
}

/// Inserts a new facility row plus its link rows. Runs on whatever
/// connection or transaction it is handed.
pub(crate) async fn insert_facility<C>(
    conn: &C,
    fields: &FacilityFields,
    taxonomy: &ResolvedTaxonomy,
) -> Result<facility::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let mut active = facility::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(Utc::now()),
        type_name: Set(taxonomy.type_name.clone()),
        owning_type: Set(taxonomy.owning_type.clone()),
        covering_type: Set(taxonomy.covering_type.clone()),
        ..Default::default()
    };
    apply_fields(&mut active, fields)?;

    let model = active.insert(conn).await.map_err(|e| {
        ServiceError::from_write(
            e,
            identity(
                &fields.name,
                &fields.address,
                &fields.owner,
                fields.area,
                &taxonomy.type_name,
            ),
        )
    })?;

    replace_links(
        conn,
        model.id,
        Some(taxonomy.paying_type.as_slice()),
        Some(taxonomy.age.as_slice()),
    )
    .await?;
    Ok(model)
}

/// Replaces the paying type and/or age links of a facility. `None` leaves that set alone.
async fn replace_links<C>(
    conn: &C,
    facility_id: Uuid,
    paying_type: Option<&[String]>,
    age: Option<&[String]>,
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    if let Some(terms) = paying_type {
        facility_paying_type_link::Entity::delete_many()
            .filter(facility_paying_type_link::Column::Facility.eq(facility_id))
            .exec(conn)
            .await?;
        if !terms.is_empty() {
            facility_paying_type_link::Entity::insert_many(terms.iter().map(|term| {
                facility_paying_type_link::ActiveModel {
                    facility: Set(facility_id),
                    term: Set(term.clone()),
                }
            }))
            .exec_without_returning(conn)
            .await?;
        }
    }

    if let Some(terms) = age {
        facility_age_link::Entity::delete_many()
            .filter(facility_age_link::Column::Facility.eq(facility_id))
            .exec(conn)
            .await?;
        if !terms.is_empty() {
            facility_age_link::Entity::insert_many(terms.iter().map(|term| {
                facility_age_link::ActiveModel {
                    facility: Set(facility_id),
                    term: Set(term.clone()),
                }
            }))
            .exec_without_returning(conn)
            .await?;
        }
    }

    Ok(())
}

/// Hydrates facility rows with their associations using one query per
/// association kind. Input order is preserved.
pub(crate) async fn load_views<C>(
    conn: &C,
    models: Vec<facility::Model>,
) -> Result<Vec<FacilityView>, ServiceError>
where
    C: ConnectionTrait,
{
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();

    let mut paying_types: HashMap<Uuid, Vec<String>> = HashMap::new();
    for link in facility_paying_type_link::Entity::find()
        .filter(facility_paying_type_link::Column::Facility.is_in(ids.clone()))
        .all(conn)
        .await?
    {
        paying_types.entry(link.facility).or_default().push(link.term);
    }

    let mut ages: HashMap<Uuid, Vec<String>> = HashMap::new();
    for link in facility_age_link::Entity::find()
        .filter(facility_age_link::Column::Facility.is_in(ids.clone()))
        .all(conn)
        .await?
    {
        ages.entry(link.facility).or_default().push(link.term);
    }

    let mut photos: HashMap<Uuid, Vec<PhotoView>> = HashMap::new();
    for (link, photo) in facility_photo_link::Entity::find()
        .filter(facility_photo_link::Column::Facility.is_in(ids))
        .find_also_related(facility_photo::Entity)
        .all(conn)
        .await?
    {
        if let Some(photo) = photo {
            photos
                .entry(link.facility)
                .or_default()
                .push(PhotoView::from(photo));
        }
    }

    Ok(models
        .into_iter()
        .map(|model| {
            let id = model.id;
            let mut facility_photos = photos.remove(&id).unwrap_or_default();
            facility_photos.sort_by(|a, b| a.url.cmp(&b.url));
            FacilityView::assemble(
                model,
                paying_types.remove(&id).unwrap_or_default(),
                ages.remove(&id).unwrap_or_default(),
                facility_photos,
            )
        })
        .collect())
}

pub(crate) async fn load_view<C>(
    conn: &C,
    model: facility::Model,
) -> Result<FacilityView, ServiceError>
where
    C: ConnectionTrait,
{
    load_views(conn, vec![model])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::InternalError("facility vanished during hydration".into()))
}

pub(crate) async fn find_facility<C>(conn: &C, id: Uuid) -> Result<facility::Model, ServiceError>
where
    C: ConnectionTrait,
{
    facility::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("facility {}", id)))
}

/// Facility record manager
#[derive(Clone)]
pub struct FacilityService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl FacilityService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a facility. Taxonomy labels are normalized and created on first use.
    #[instrument(skip(self, fields), fields(name = %fields.name))]
    pub async fn create(&self, fields: FacilityFields) -> Result<FacilityView, ServiceError> {
        fields.validate()?;

        let txn = self.db.begin().await?;
        let taxonomy = resolve_taxonomy(&txn, &fields).await?;
        let model = insert_facility(&txn, &fields, &taxonomy).await?;
        let view = load_view(&txn, model).await?;
        txn.commit().await?;

        info!("Created facility: {}", view.id);
        self.event_sender
            .send_or_log(Event::FacilityCreated {
                facility_id: view.id,
                name: view.name.clone(),
                address: view.address.clone(),
                owner: view.owner.clone(),
                type_name: view.type_name.clone(),
            });

        Ok(view)
    }

    /// Overwrites every field, including all taxonomy associations.
    #[instrument(skip(self, fields))]
    pub async fn replace(
        &self,
        id: Uuid,
        fields: FacilityFields,
    ) -> Result<FacilityView, ServiceError> {
        fields.validate()?;

        let txn = self.db.begin().await?;
        let existing = find_facility(&txn, id).await?;
        let taxonomy = resolve_taxonomy(&txn, &fields).await?;

        let mut active: facility::ActiveModel = existing.into();
        apply_fields(&mut active, &fields)?;
        active.type_name = Set(taxonomy.type_name.clone());
        active.owning_type = Set(taxonomy.owning_type.clone());
        active.covering_type = Set(taxonomy.covering_type.clone());

        let model = active.update(&txn).await.map_err(|e| {
            ServiceError::from_write(
                e,
                identity(
                    &fields.name,
                    &fields.address,
                    &fields.owner,
                    fields.area,
                    &taxonomy.type_name,
                ),
            )
        })?;
        replace_links(
            &txn,
            id,
            Some(taxonomy.paying_type.as_slice()),
            Some(taxonomy.age.as_slice()),
        )
        .await?;

        let view = load_view(&txn, model).await?;
        txn.commit().await?;

        info!("Replaced facility: {}", id);
        self.event_sender.send_or_log(Event::FacilityUpdated(id));
        Ok(view)
    }

    /// Changes only the keys present in the patch. An empty patch returns the record untouched.
    #[instrument(skip(self, patch))]
    pub async fn partial_update(
        &self,
        id: Uuid,
        patch: FacilityPatch,
    ) -> Result<FacilityView, ServiceError> {
        patch.validate_patch()?;
        if patch == FacilityPatch::default() {
            return self.get_by_id(id).await;
        }

        let txn = self.db.begin().await?;
        let existing = find_facility(&txn, id).await?;
        let mut active: facility::ActiveModel = existing.clone().into();

        let search_text = facility::search_text(
            patched_text(&patch.name, &existing.name),
            patched_text(&patch.address, &existing.address),
            patched_text(&patch.owner, &existing.owner),
        );
        if search_text != existing.search_text {
            active.search_text = Set(search_text);
        }

        if let Patch::Value(v) = patch.name {
            active.name = Set(v.trim().to_string());
        }
        if let Patch::Value(v) = patch.owner {
            active.owner = Set(v.trim().to_string());
        }
        if let Patch::Value(v) = patch.address {
            active.address = Set(v.trim().to_string());
        }
        if let Patch::Value(v) = patch.area {
            active.area = Set(v);
        }
        if let Patch::Value(v) = patch.hidden {
            active.hidden = Set(v);
        }
        if let Patch::Value(v) = patch.accessibility {
            active.accessibility = Set(v);
        }
        if let Patch::Value(hours) = patch.working_hours {
            active.working_hours = Set(hours.to_json()?);
        }

        if let Some(v) = patch.x.into_update() {
            active.x = Set(v);
        }
        if let Some(v) = patch.y.into_update() {
            active.y = Set(v);
        }
        if let Some(v) = patch.length.into_update() {
            active.length = Set(v);
        }
        if let Some(v) = patch.width.into_update() {
            active.width = Set(v);
        }
        if let Some(v) = patch.height.into_update() {
            active.height = Set(v);
        }
        if let Some(v) = patch.depth.into_update() {
            active.depth = Set(v);
        }
        if let Some(v) = patch.eps.into_update() {
            active.eps = Set(v);
        }
        if let Some(v) = patch.actual_workload.into_update() {
            active.actual_workload = Set(v);
        }
        if let Some(v) = patch.annual_capacity.into_update() {
            active.annual_capacity = Set(v);
        }
        if let Some(v) = patch.site.into_update() {
            active.site = Set(v);
        }
        if let Some(v) = patch.phone_number.into_update() {
            active.phone_number = Set(v);
        }
        if let Some(v) = patch.document.into_update() {
            active.document = Set(v);
        }
        if let Some(v) = patch.note.into_update() {
            active.note = Set(v);
        }

        if let Patch::Value(label) = &patch.type_name {
            active.type_name = Set(taxonomy::resolve(&txn, TaxonomyAxis::Type, label).await?);
        }
        if let Some(label) = patch.owning_type.into_update() {
            let term = match label {
                Some(label) => {
                    Some(taxonomy::resolve(&txn, TaxonomyAxis::OwningType, &label).await?)
                }
                None => None,
            };
            active.owning_type = Set(term);
        }
        if let Some(label) = patch.covering_type.into_update() {
            let term = match label {
                Some(label) => {
                    Some(taxonomy::resolve(&txn, TaxonomyAxis::CoveringType, &label).await?)
                }
                None => None,
            };
            active.covering_type = Set(term);
        }

        let paying_type = match patch.paying_type.into_update() {
            Some(labels) => Some(
                taxonomy::resolve_all(&txn, TaxonomyAxis::PayingType, &labels.unwrap_or_default())
                    .await?,
            ),
            None => None,
        };
        let age = match patch.age.into_update() {
            Some(labels) => Some(
                taxonomy::resolve_all(&txn, TaxonomyAxis::Age, &labels.unwrap_or_default())
                    .await?,
            ),
            None => None,
        };

        let model = if active.is_changed() {
            let what = format!("facility {} with the patched identity", id);
            active
                .update(&txn)
                .await
                .map_err(|e| ServiceError::from_write(e, what))?
        } else {
            existing
        };
        replace_links(&txn, id, paying_type.as_deref(), age.as_deref()).await?;

        let view = load_view(&txn, model).await?;
        txn.commit().await?;

        info!("Patched facility: {}", id);
        self.event_sender.send_or_log(Event::FacilityUpdated(id));
        Ok(view)
    }

    /// Removes the facility and its links. Taxonomy terms and photos are kept.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        find_facility(&txn, id).await?;

        facility_paying_type_link::Entity::delete_many()
            .filter(facility_paying_type_link::Column::Facility.eq(id))
            .exec(&txn)
            .await?;
        facility_age_link::Entity::delete_many()
            .filter(facility_age_link::Column::Facility.eq(id))
            .exec(&txn)
            .await?;
        facility_photo_link::Entity::delete_many()
            .filter(facility_photo_link::Column::Facility.eq(id))
            .exec(&txn)
            .await?;
        facility::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        info!("Deleted facility: {}", id);
        self.event_sender.send_or_log(Event::FacilityDeleted(id));
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<FacilityView, ServiceError> {
        let db = &*self.db;
        let model = find_facility(db, id).await?;
        load_view(db, model).await
    }
}
