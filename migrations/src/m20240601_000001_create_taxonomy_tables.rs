use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240601_000001_create_taxonomy_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Every axis is a single-column table keyed by the canonical lower-cased label.
        for table in TaxonomyTable::ALL {
            manager
                .create_table(
                    Table::create()
                        .table(table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TaxonomyTerm::Name)
                                .string_len(255)
                                .not_null()
                                .primary_key(),
                        )
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(FacilityPhoto::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FacilityPhoto::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FacilityPhoto::Url)
                            .string_len(1024)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(FacilityPhoto::Filename).string_len(255).not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FacilityPhoto::Table).to_owned())
            .await?;

        for table in TaxonomyTable::ALL {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }

        Ok(())
    }
}

#[derive(DeriveIden, Clone, Copy)]
pub enum TaxonomyTable {
    #[sea_orm(iden = "facility_type")]
    Type,
    #[sea_orm(iden = "facility_owning_type")]
    OwningType,
    #[sea_orm(iden = "facility_covering_type")]
    CoveringType,
    #[sea_orm(iden = "facility_paying_type")]
    PayingType,
    #[sea_orm(iden = "facility_age")]
    Age,
}

impl TaxonomyTable {
    pub const ALL: [TaxonomyTable; 5] = [
        TaxonomyTable::Type,
        TaxonomyTable::OwningType,
        TaxonomyTable::CoveringType,
        TaxonomyTable::PayingType,
        TaxonomyTable::Age,
    ];
}

#[derive(DeriveIden)]
pub enum TaxonomyTerm {
    Name,
}

#[derive(DeriveIden)]
pub enum FacilityPhoto {
    Table,
    Id,
    Url,
    Filename,
}
