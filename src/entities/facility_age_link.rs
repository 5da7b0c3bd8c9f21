use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Link between a facility and its target age groups.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "facility_facility_age_association_table")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub facility: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub term: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::facility::Entity",
        from = "Column::Facility",
        to = "super::facility::Column::Id",
        on_delete = "Cascade"
    )]
    Facility,
    #[sea_orm(
        belongs_to = "super::facility_age::Entity",
        from = "Column::Term",
        to = "super::facility_age::Column::Name",
        on_delete = "Cascade"
    )]
    Age,
}

impl Related<super::facility::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Facility.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
