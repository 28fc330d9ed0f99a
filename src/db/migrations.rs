pub mod drug;
pub mod drug_type;
pub mod sale;

use sea_orm_migration::prelude::*;

pub struct Migrator;

impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(drug_type::Migration),
            Box::new(drug::Migration),
            Box::new(sale::Migration),
        ]
    }
}
