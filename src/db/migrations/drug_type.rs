use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "drug_type_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DrugTypes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DrugTypes::Code).string().not_null().primary_key())
                    .col(ColumnDef::new(DrugTypes::Name).string().not_null())
                    .col(ColumnDef::new(DrugTypes::Description).string().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-drug_types-name")
                    .table(DrugTypes::Table)
                    .col(DrugTypes::Name)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(DrugTypes::Table).to_owned()).await
    }
}

#[derive(Iden)]
pub enum DrugTypes {
    Table,
    Code,
    Name,
    Description,
}
