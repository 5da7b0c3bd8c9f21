pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_taxonomy_tables;
mod m20240601_000002_create_facility_table;
mod m20240601_000003_create_facility_association_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_taxonomy_tables::Migration),
            Box::new(m20240601_000002_create_facility_table::Migration),
            Box::new(m20240601_000003_create_facility_association_tables::Migration),
        ]
    }
}
