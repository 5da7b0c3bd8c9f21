use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

use super::m20240601_000001_create_taxonomy_tables::{TaxonomyTable, TaxonomyTerm};

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240601_000002_create_facility_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Facility::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Facility::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Facility::Name).string_len(512).not_null())
                    .col(ColumnDef::new(Facility::Owner).string_len(512).not_null())
                    .col(ColumnDef::new(Facility::Address).string_len(1024).not_null())
                    .col(ColumnDef::new(Facility::X).double().null())
                    .col(ColumnDef::new(Facility::Y).double().null())
                    .col(
                        ColumnDef::new(Facility::Hidden)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Facility::Length).double().null())
                    .col(ColumnDef::new(Facility::Width).double().null())
                    .col(ColumnDef::new(Facility::Height).double().null())
                    .col(ColumnDef::new(Facility::Depth).double().null())
                    .col(ColumnDef::new(Facility::Area).double().not_null())
                    .col(ColumnDef::new(Facility::Eps).integer().null())
                    .col(ColumnDef::new(Facility::ActualWorkload).integer().null())
                    .col(ColumnDef::new(Facility::AnnualCapacity).integer().null())
                    .col(
                        ColumnDef::new(Facility::Accessibility)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Facility::Site).string_len(1024).null())
                    .col(ColumnDef::new(Facility::PhoneNumber).string_len(64).null())
                    .col(ColumnDef::new(Facility::Document).text().null())
                    .col(ColumnDef::new(Facility::Note).text().null())
                    .col(ColumnDef::new(Facility::WorkingHours).json().not_null())
                    .col(
                        ColumnDef::new(Facility::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Facility::Type).string_len(255).not_null())
                    .col(ColumnDef::new(Facility::OwningType).string_len(255).null())
                    .col(ColumnDef::new(Facility::CoveringType).string_len(255).null())
                    .col(
                        ColumnDef::new(Facility::SearchText)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_facility_type")
                            .from(Facility::Table, Facility::Type)
                            .to(TaxonomyTable::Type, TaxonomyTerm::Name)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_facility_owning_type")
                            .from(Facility::Table, Facility::OwningType)
                            .to(TaxonomyTable::OwningType, TaxonomyTerm::Name)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_facility_covering_type")
                            .from(Facility::Table, Facility::CoveringType)
                            .to(TaxonomyTable::CoveringType, TaxonomyTerm::Name)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_facility_identity")
                    .table(Facility::Table)
                    .col(Facility::Name)
                    .col(Facility::Address)
                    .col(Facility::Owner)
                    .col(Facility::Area)
                    .col(Facility::Type)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Hash indexes only exist on Postgres; other backends get btree.
        let text_index_type = match manager.get_database_backend() {
            DatabaseBackend::Postgres => Some(IndexType::Hash),
            _ => None,
        };

        for (name, column) in [
            ("idx_facility_name", Facility::Name),
            ("idx_facility_owner", Facility::Owner),
            ("idx_facility_address", Facility::Address),
        ] {
            let mut index = Index::create();
            index.name(name).table(Facility::Table).col(column);
            if let Some(index_type) = text_index_type.clone() {
                index.index_type(index_type);
            }
            manager.create_index(index.to_owned()).await?;
        }

        for (name, column) in [("idx_facility_x", Facility::X), ("idx_facility_y", Facility::Y)] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Facility::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Facility::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Facility {
    Table,
    Id,
    Name,
    Owner,
    Address,
    X,
    Y,
    Hidden,
    Length,
    Width,
    Height,
    Depth,
    Area,
    Eps,
    ActualWorkload,
    AnnualCapacity,
    Accessibility,
    Site,
    PhoneNumber,
    Document,
    Note,
    WorkingHours,
    CreatedAt,
    Type,
    OwningType,
    CoveringType,
    SearchText,
}
