use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "sale_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sales::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Sales::DrugName).string().not_null())
                    .col(ColumnDef::new(Sales::Quantity).integer().not_null())
                    .col(ColumnDef::new(Sales::TotalAmount).double().not_null())
                    .col(ColumnDef::new(Sales::TransactionDate).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Sales::LedgerStatus).string().not_null())
                    .col(ColumnDef::new(Sales::Status).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sales-transaction_date")
                    .table(Sales::Table)
                    .col(Sales::TransactionDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Sales::Table).to_owned()).await
    }
}

#[derive(Iden)]
pub enum Sales {
    Table,
    Id,
    DrugName,
    Quantity,
    TotalAmount,
    TransactionDate,
    LedgerStatus,
    Status,
}
