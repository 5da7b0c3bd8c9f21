use sea_orm_migration::prelude::*;

use super::m20240601_000001_create_taxonomy_tables::{FacilityPhoto, TaxonomyTable, TaxonomyTerm};
use super::m20240601_000002_create_facility_table::Facility;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240601_000003_create_facility_association_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (table, term_table, fk_prefix) in [
            (
                AssociationTable::PayingType,
                TaxonomyTable::PayingType,
                "fk_facility_paying_type_link",
            ),
            (
                AssociationTable::Age,
                TaxonomyTable::Age,
                "fk_facility_age_link",
            ),
        ] {
            manager
                .create_table(
                    Table::create()
                        .table(table)
                        .if_not_exists()
                        .col(ColumnDef::new(Association::Facility).uuid().not_null())
                        .col(ColumnDef::new(Association::Term).string_len(255).not_null())
                        .primary_key(
                            Index::create()
                                .col(Association::Facility)
                                .col(Association::Term),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name(format!("{fk_prefix}_facility"))
                                .from(table, Association::Facility)
                                .to(Facility::Table, Facility::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name(format!("{fk_prefix}_term"))
                                .from(table, Association::Term)
                                .to(term_table, TaxonomyTerm::Name)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(AssociationTable::Photo)
                    .if_not_exists()
                    .col(ColumnDef::new(PhotoAssociation::Facility).uuid().not_null())
                    .col(ColumnDef::new(PhotoAssociation::Photo).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .col(PhotoAssociation::Facility)
                            .col(PhotoAssociation::Photo),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_facility_photo_link_facility")
                            .from(AssociationTable::Photo, PhotoAssociation::Facility)
                            .to(Facility::Table, Facility::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_facility_photo_link_photo")
                            .from(AssociationTable::Photo, PhotoAssociation::Photo)
                            .to(FacilityPhoto::Table, FacilityPhoto::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            AssociationTable::Photo,
            AssociationTable::Age,
            AssociationTable::PayingType,
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden, Clone, Copy)]
pub enum AssociationTable {
    #[sea_orm(iden = "facility_facility_paying_type_association_table")]
    PayingType,
    #[sea_orm(iden = "facility_facility_age_association_table")]
    Age,
    #[sea_orm(iden = "facility_facility_photo_association_table")]
    Photo,
}

/// Columns shared by the paying type and age link tables.
#[derive(DeriveIden)]
pub enum Association {
    #[sea_orm(iden = "facility")]
    Facility,
    #[sea_orm(iden = "term")]
    Term,
}

#[derive(DeriveIden)]
pub enum PhotoAssociation {
    #[sea_orm(iden = "facility")]
    Facility,
    #[sea_orm(iden = "photo")]
    Photo,
}
