use sea_orm::entity::prelude::*;
use serde::Deserialize;
use serde::Serialize;

use crate::types::LedgerStatus;
use crate::types::ShipmentStatus;

/// Sales ledger entry. Only `status` may change after the record is created.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id:               Uuid,
    // The drug is referenced by name and resolved once, when the sale is created.
    pub drug_name:        String,
    pub quantity:         i32,
    pub total_amount:     f64,
    pub transaction_date: DateTimeUtc,
    pub ledger_status:    LedgerStatus,
    pub status:           ShipmentStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
