use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored photo reference. Survives deletion of the facilities it is attached to.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "facility_photo")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub url: String,
    pub filename: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::facility_photo_link::Entity")]
    PhotoLink,
}

impl Related<super::facility_photo_link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PhotoLink.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
