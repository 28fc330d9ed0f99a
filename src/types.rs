use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::Deserialize;
use serde::Serialize;

use crate::error::LedgerError;

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

/// Stock at or below this quantity marks an inventory item as `low-stock`.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

/// How many of the latest sales are included into the summary report.
pub const RECENT_TRANSACTIONS: u64 = 5;

/// Derived state of an inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum InventoryStatus {
    #[sea_orm(string_value = "active")]
    #[serde(rename = "active")]
    Active,
    #[sea_orm(string_value = "low-stock")]
    #[serde(rename = "low-stock")]
    LowStock,
    #[sea_orm(string_value = "expired")]
    #[serde(rename = "expired")]
    Expired,
}

impl InventoryStatus {
    /// Compute item status from its current stock and shelf life. Low stock takes precedence over expiration so that
    /// an item which has just been debited below the threshold is always reported as `low-stock`.
    pub fn derive(quantity: i32, expired: bool) -> Self {
        if quantity <= LOW_STOCK_THRESHOLD {
            Self::LowStock
        }
        else if expired {
            Self::Expired
        }
        else {
            Self::Active
        }
    }
}

/// Shipment tracking state of a sale. Any transition between the states is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ShipmentStatus {
    #[sea_orm(string_value = "Processing")]
    #[serde(rename = "Processing")]
    Processing,
    #[sea_orm(string_value = "In Transit")]
    #[serde(rename = "In Transit")]
    InTransit,
    #[sea_orm(string_value = "Delivered")]
    #[serde(rename = "Delivered")]
    Delivered,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 3] = [Self::Processing, Self::InTransit, Self::Delivered];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::InTransit => "In Transit",
            Self::Delivered => "Delivered",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or_else(|| {
            let valid = Self::ALL.iter().map(|st| st.as_str()).collect::<Vec<_>>();
            LedgerError::InvalidArgument {
                details: format!("Status must be one of: {}", valid.join(", ")),
            }
        })
    }
}

/// Bookkeeping state of a ledger entry. Unrelated to shipment tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum LedgerStatus {
    #[sea_orm(string_value = "completed")]
    #[serde(rename = "completed")]
    Completed,
    #[sea_orm(string_value = "pending")]
    #[serde(rename = "pending")]
    Pending,
}
