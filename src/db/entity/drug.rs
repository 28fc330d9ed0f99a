use sea_orm::entity::prelude::*;

use crate::types::InventoryStatus;

/// Inventory item. Quantity is never negative; status is derived from the quantity and expiry date on each mutation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "drugs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id:             Uuid,
    pub drug_name:      String,
    pub drug_type_code: String,
    pub drug_type_name: String,
    pub quantity:       i32,
    pub price:          f64,
    pub supplier:       String,
    pub expiry_date:    DateTimeUtc,
    pub batch_number:   String,
    pub description:    Option<String>,
    pub status:         InventoryStatus,
    pub created_at:     DateTimeUtc,
    pub updated_at:     DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_expired_at(&self, now: DateTimeUtc) -> bool {
        self.expiry_date <= now
    }
}
