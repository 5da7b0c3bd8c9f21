use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sports facility record
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "facility")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub owner: String,
    pub address: String,

    /// Geocoordinates, empty until the address has been geocoded
    pub x: Option<f64>,
    pub y: Option<f64>,

    pub hidden: bool,

    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub depth: Option<f64>,
    pub area: f64,

    pub eps: Option<i32>,
    pub actual_workload: Option<i32>,
    pub annual_capacity: Option<i32>,

    pub accessibility: bool,
    pub site: Option<String>,
    pub phone_number: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub document: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,

    /// Weekly schedule, see `models::WorkingHours`
    #[sea_orm(column_type = "Json")]
    pub working_hours: Json,

    pub created_at: DateTimeUtc,

    #[sea_orm(column_name = "type")]
    pub type_name: String,
    pub owning_type: Option<String>,
    pub covering_type: Option<String>,

    /// Lower-cased name, address and owner for free-text search, see [`search_text`]
    #[sea_orm(column_type = "Text")]
    pub search_text: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::facility_type::Entity",
        from = "Column::TypeName",
        to = "super::facility_type::Column::Name"
    )]
    FacilityType,
    #[sea_orm(
        belongs_to = "super::facility_owning_type::Entity",
        from = "Column::OwningType",
        to = "super::facility_owning_type::Column::Name"
    )]
    OwningType,
    #[sea_orm(
        belongs_to = "super::facility_covering_type::Entity",
        from = "Column::CoveringType",
        to = "super::facility_covering_type::Column::Name"
    )]
    CoveringType,
    #[sea_orm(has_many = "super::facility_paying_type_link::Entity")]
    PayingTypeLink,
    #[sea_orm(has_many = "super::facility_age_link::Entity")]
    AgeLink,
    #[sea_orm(has_many = "super::facility_photo_link::Entity")]
    PhotoLink,
}

impl Related<super::facility_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FacilityType.def()
    }
}

impl Related<super::facility_paying_type_link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PayingTypeLink.def()
    }
}

impl Related<super::facility_age_link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AgeLink.def()
    }
}

impl Related<super::facility_photo_link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PhotoLink.def()
    }
}

impl Related<super::facility_photo::Entity> for Entity {
    fn to() -> RelationDef {
        super::facility_photo_link::Relation::Photo.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::facility_photo_link::Relation::Facility.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Separates the fields inside `search_text` so a query cannot match across two of them
pub const SEARCH_TEXT_SEPARATOR: char = '\u{1f}';

/// Value of the `search_text` column. Lower-casing happens here rather than in
/// SQL because SQLite's `lower()` only folds ASCII.
pub fn search_text(name: &str, address: &str, owner: &str) -> String {
    [name, address, owner]
        .iter()
        .map(|part| part.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join(&SEARCH_TEXT_SEPARATOR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_text_folds_cyrillic_and_keeps_fields_apart() {
        let text = search_text(" Стадион Арена ", "Ул. Ленина 1", "Спорткомитет");
        assert_eq!(text, "стадион арена\u{1f}ул. ленина 1\u{1f}спорткомитет");
        assert!(!text.contains("арена ул."));
    }
}
