use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "drug_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Drugs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Drugs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Drugs::DrugName).string().not_null())
                    .col(ColumnDef::new(Drugs::DrugTypeCode).string().not_null())
                    .col(ColumnDef::new(Drugs::DrugTypeName).string().not_null())
                    .col(
                        ColumnDef::new(Drugs::Quantity)
                            .integer()
                            .not_null()
                            .check(Expr::col(Drugs::Quantity).gte(0)),
                    )
                    .col(ColumnDef::new(Drugs::Price).double().not_null())
                    .col(ColumnDef::new(Drugs::Supplier).string().not_null())
                    .col(ColumnDef::new(Drugs::ExpiryDate).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Drugs::BatchNumber).string().not_null())
                    .col(ColumnDef::new(Drugs::Description).string().null())
                    .col(ColumnDef::new(Drugs::Status).string().not_null())
                    .col(ColumnDef::new(Drugs::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Drugs::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-drugs-name-supplier")
                    .table(Drugs::Table)
                    .col(Drugs::DrugName)
                    .col(Drugs::Supplier)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Drugs::Table).to_owned()).await
    }
}

#[derive(Iden)]
pub enum Drugs {
    Table,
    Id,
    DrugName,
    DrugTypeCode,
    DrugTypeName,
    Quantity,
    Price,
    Supplier,
    ExpiryDate,
    BatchNumber,
    Description,
    Status,
    CreatedAt,
    UpdatedAt,
}
