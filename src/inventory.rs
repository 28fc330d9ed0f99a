//! Inventory of drugs: listing, add-or-restock and the initial sample stock.
use std::sync::Arc;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use fieldx::fxstruct;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;
use sea_orm::IntoActiveModel;
use sea_orm::PaginatorTrait;
use sea_orm::QueryOrder;
use sea_orm::TransactionTrait;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::instrument;

use crate::catalog;
use crate::db;
use crate::db::driver::DatabaseDriver;
use crate::db::entity::drug;
use crate::db::prelude::*;
use crate::error::LedgerError;
use crate::types::InventoryStatus;
use crate::types::Result;

/// Wire representation of an inventory item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id:           Uuid,
    pub drug_name:    String,
    pub drug_type:    DrugTypeRef,
    pub quantity:     i32,
    pub price:        f64,
    pub supplier:     String,
    pub expiry_date:  DateTime<Utc>,
    pub batch_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description:  Option<String>,
    pub status:       InventoryStatus,
    pub created_at:   DateTime<Utc>,
    pub updated_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrugTypeRef {
    pub code: String,
    pub name: String,
}

impl From<Drug> for InventoryItem {
    fn from(d: Drug) -> Self {
        Self {
            id:           d.id,
            drug_name:    d.drug_name,
            drug_type:    DrugTypeRef {
                code: d.drug_type_code,
                name: d.drug_type_name,
            },
            quantity:     d.quantity,
            price:        d.price,
            supplier:     d.supplier,
            expiry_date:  d.expiry_date,
            batch_number: d.batch_number,
            description:  d.description,
            status:       d.status,
            created_at:   d.created_at,
            updated_at:   d.updated_at,
        }
    }
}

/// Add-or-restock request as submitted by the inventory form. `drug_type` is the catalog name of the type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStock {
    pub drug_name:    Option<String>,
    pub drug_type:    Option<String>,
    pub quantity:     Option<i64>,
    pub price:        Option<f64>,
    pub supplier:     Option<String>,
    pub expiry_date:  Option<String>,
    pub batch_number: Option<String>,
    pub description:  Option<String>,
}

/// Validated form of [`NewStock`].
#[derive(Debug, Clone, PartialEq)]
pub struct StockEntry {
    pub drug_name:    String,
    pub drug_type:    String,
    pub quantity:     i32,
    pub price:        f64,
    pub supplier:     String,
    pub expiry_date:  DateTime<Utc>,
    pub batch_number: String,
    pub description:  Option<String>,
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

/// Accepts both full RFC 3339 timestamps and plain `YYYY-MM-DD` dates (taken as UTC midnight).
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

impl NewStock {
    pub fn validate(&self) -> Result<StockEntry> {
        let (
            Some(drug_name),
            Some(drug_type),
            Some(quantity),
            Some(price),
            Some(supplier),
            Some(expiry_date),
            Some(batch_number),
        ) = (
            non_empty(&self.drug_name),
            non_empty(&self.drug_type),
            self.quantity.filter(|q| *q != 0),
            self.price,
            non_empty(&self.supplier),
            non_empty(&self.expiry_date),
            non_empty(&self.batch_number),
        )
        else {
            return Err(LedgerError::missing_fields("All fields are required except description"));
        };

        let quantity = i32::try_from(quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| LedgerError::validation("Invalid quantity", "Quantity must be a positive integer"))?;

        if !price.is_finite() || price < 0.0 {
            return Err(LedgerError::validation("Invalid price", "Price cannot be negative"));
        }

        let expiry_date = parse_date(&expiry_date).ok_or_else(|| {
            LedgerError::validation(
                "Invalid expiry date",
                format!("'{expiry_date}' is neither an RFC 3339 timestamp nor a YYYY-MM-DD date"),
            )
        })?;

        Ok(StockEntry {
            drug_name,
            drug_type,
            quantity,
            price,
            supplier,
            expiry_date,
            batch_number,
            description: non_empty(&self.description),
        })
    }
}

/// Result of an add-or-restock operation.
#[derive(Debug, Clone, PartialEq)]
pub enum StockOutcome {
    Created(InventoryItem),
    Restocked(InventoryItem),
}

impl StockOutcome {
    pub fn item(&self) -> &InventoryItem {
        match self {
            Self::Created(item) | Self::Restocked(item) => item,
        }
    }
}

#[derive(Debug)]
#[fxstruct(sync, no_new, builder)]
pub struct Inventory<D>
where
    D: DatabaseDriver,
{
    #[fieldx(get(clone))]
    db: Arc<D>,
}

impl<D> Inventory<D>
where
    D: DatabaseDriver,
{
    pub async fn list_inventory(&self) -> Result<Vec<InventoryItem>> {
        let drugs = Drugs::find()
            .order_by_asc(drug::Column::DrugName)
            .order_by_asc(drug::Column::Supplier)
            .all(&self.db().connection())
            .await?;
        debug!("Found {} items in inventory", drugs.len());
        Ok(drugs.into_iter().map(InventoryItem::from).collect())
    }

    /// Add a new drug or restock an existing one with the same name and supplier.
    #[instrument(level = "debug", skip(self), fields(drug = ?request.drug_name))]
    pub async fn stock_drug(&self, request: &NewStock) -> Result<StockOutcome> {
        let entry = request.validate()?;
        let conn = self.db().connection();

        let drug_type = catalog::find_by_name(&conn, &entry.drug_type)
            .await?
            .ok_or_else(|| LedgerError::validation("Invalid drug type", "The specified drug type does not exist"))?;

        let txn = conn.begin().await?;
        let outcome = Self::upsert(&txn, &entry, &drug_type).await;
        let outcome = db::conclude(txn, "restock", outcome).await?;

        match &outcome {
            StockOutcome::Created(item) => info!("New drug added: {} ({})", item.drug_name, item.supplier),
            StockOutcome::Restocked(item) => info!(
                "Drug quantity updated: {} ({}) now {}",
                item.drug_name, item.supplier, item.quantity
            ),
        }

        Ok(outcome)
    }

    // The (name, supplier) pair is unique. The increment is tried first; a conflicting insert means a concurrent
    // request created the item in between, so the increment is tried once more against that row.
    async fn upsert(txn: &impl ConnectionTrait, entry: &StockEntry, drug_type: &DrugType) -> Result<StockOutcome> {
        let now = Utc::now();

        if let Some(restocked) = Self::restock(txn, entry, drug_type, now).await? {
            return Ok(StockOutcome::Restocked(restocked.into()));
        }

        let id = Uuid::new_v4();
        let model = drug::ActiveModel {
            id:             Set(id),
            drug_name:      Set(entry.drug_name.clone()),
            drug_type_code: Set(drug_type.code.clone()),
            drug_type_name: Set(drug_type.name.clone()),
            quantity:       Set(entry.quantity),
            price:          Set(entry.price),
            supplier:       Set(entry.supplier.clone()),
            expiry_date:    Set(entry.expiry_date),
            batch_number:   Set(entry.batch_number.clone()),
            description:    Set(entry.description.clone()),
            status:         Set(InventoryStatus::derive(entry.quantity, entry.expiry_date <= now)),
            created_at:     Set(now),
            updated_at:     Set(now),
        };
        let inserted = Drugs::insert(model)
            .on_conflict(
                OnConflict::columns([drug::Column::DrugName, drug::Column::Supplier])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(txn)
            .await?;

        if inserted > 0 {
            let created = Drugs::find_by_id(id)
                .one(txn)
                .await?
                .ok_or_else(|| LedgerError::not_found("Drug", format!("id: {id}")))?;
            return Ok(StockOutcome::Created(created.into()));
        }

        debug!("{} ({}) was created concurrently, restocking it", entry.drug_name, entry.supplier);
        Self::restock(txn, entry, drug_type, now)
            .await?
            .map(|restocked| StockOutcome::Restocked(restocked.into()))
            .ok_or_else(|| {
                LedgerError::not_found(
                    "Drug",
                    format!("name: {}, supplier: {}", entry.drug_name, entry.supplier),
                )
            })
    }

    /// Increment the stock of an existing (name, supplier) item in place, so a concurrent sale debiting the same row
    /// is not lost. `None` when there is no such item yet.
    async fn restock(
        txn: &impl ConnectionTrait,
        entry: &StockEntry,
        drug_type: &DrugType,
        now: DateTime<Utc>,
    ) -> Result<Option<Drug>> {
        let mut update = Drugs::update_many()
            .col_expr(
                drug::Column::Quantity,
                Expr::col(drug::Column::Quantity).add(entry.quantity),
            )
            .col_expr(drug::Column::Price, Expr::value(entry.price))
            .col_expr(drug::Column::DrugTypeCode, Expr::value(drug_type.code.clone()))
            .col_expr(drug::Column::DrugTypeName, Expr::value(drug_type.name.clone()))
            .col_expr(drug::Column::ExpiryDate, Expr::value(entry.expiry_date))
            .col_expr(drug::Column::BatchNumber, Expr::value(entry.batch_number.clone()))
            .col_expr(drug::Column::UpdatedAt, Expr::value(now));
        if let Some(description) = &entry.description {
            update = update.col_expr(drug::Column::Description, Expr::value(description.clone()));
        }
        let result = update
            .filter(drug::Column::DrugName.eq(entry.drug_name.as_str()))
            .filter(drug::Column::Supplier.eq(entry.supplier.as_str()))
            .filter(drug::Column::Quantity.lte(i32::MAX - entry.quantity))
            .exec(txn)
            .await?;

        let existing = Drugs::find()
            .filter(drug::Column::DrugName.eq(entry.drug_name.as_str()))
            .filter(drug::Column::Supplier.eq(entry.supplier.as_str()))
            .one(txn)
            .await?;

        match existing {
            None => Ok(None),
            Some(existing) if result.rows_affected == 0 => Err(LedgerError::validation(
                "Invalid quantity",
                format!(
                    "Restocking {} by {} exceeds the supported maximum",
                    existing.drug_name, entry.quantity
                ),
            )),
            Some(existing) => Ok(Some(refresh_status(txn, existing.id, now).await?)),
        }
    }

    /// Put the sample drug into an empty inventory so that a fresh installation has something to sell.
    pub async fn seed_sample_stock(&self) -> Result<()> {
        let conn = self.db().connection();
        if Drugs::find().count(&conn).await? > 0 {
            return Ok(());
        }

        let sample = NewStock {
            drug_name:    Some("Paracetamol".into()),
            drug_type:    Some(
                catalog::find_by_code(&conn, "N02BE/B")
                    .await?
                    .map(|t| t.name)
                    .ok_or_else(|| LedgerError::not_found("Drug type", "code: N02BE/B"))?,
            ),
            quantity:     Some(100),
            price:        Some(10.0),
            supplier:     Some("Test Supplier".into()),
            expiry_date:  Some("2025-12-31".into()),
            batch_number: Some("TEST001".into()),
            description:  None,
        };
        self.stock_drug(&sample).await?;
        info!("Added test drug to database");

        Ok(())
    }
}

/// Re-read the drug and store the status derived from its current quantity.
pub(crate) async fn refresh_status(db: &impl ConnectionTrait, id: Uuid, now: DateTime<Utc>) -> Result<Drug> {
    let drug = Drugs::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| LedgerError::not_found("Drug", format!("id: {id}")))?;

    let status = InventoryStatus::derive(drug.quantity, drug.is_expired_at(now));
    if status == drug.status {
        return Ok(drug);
    }

    let mut am = drug.into_active_model();
    am.status = Set(status);
    Ok(am.update(db).await?)
}

#[cfg(test)]
mod test {
    use super::*;

    fn full_request() -> NewStock {
        NewStock {
            drug_name:    Some("  Ibuprofen ".into()),
            drug_type:    Some("Psycholeptics drugs (Anxiolytic)".into()),
            quantity:     Some(25),
            price:        Some(4.5),
            supplier:     Some("Acme".into()),
            expiry_date:  Some("2030-01-15".into()),
            batch_number: Some("B-1".into()),
            description:  Some("   ".into()),
        }
    }

    #[test]
    fn test_validate_trims_and_parses() {
        let entry = full_request().validate().unwrap();
        assert_eq!(entry.drug_name, "Ibuprofen");
        assert_eq!(entry.quantity, 25);
        assert_eq!(entry.description, None);
        assert_eq!(entry.expiry_date.to_rfc3339(), "2030-01-15T00:00:00+00:00");
    }

    #[test]
    fn test_validate_missing_fields() {
        let mut req = full_request();
        req.supplier = None;
        assert!(matches!(
            req.validate(),
            Err(LedgerError::Validation {
                reason: "Missing required fields",
                ..
            })
        ));

        let mut req = full_request();
        req.quantity = Some(0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut req = full_request();
        req.quantity = Some(-3);
        assert!(matches!(
            req.validate(),
            Err(LedgerError::Validation {
                reason: "Invalid quantity",
                ..
            })
        ));

        let mut req = full_request();
        req.price = Some(-1.0);
        assert!(req.validate().is_err());

        let mut req = full_request();
        req.expiry_date = Some("next tuesday".into());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_parse_date_forms() {
        assert!(parse_date("2025-12-31").is_some());
        assert_eq!(
            parse_date("2024-02-05T10:30:00+02:00").unwrap().to_rfc3339(),
            "2024-02-05T08:30:00+00:00"
        );
        assert!(parse_date("31/12/2025").is_none());
    }
}
