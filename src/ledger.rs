//! Sales ledger and its reconciliation with the inventory.
//!
//! A sale is recorded together with the debit of the drug it sells, within one database transaction. The debit is a
//! conditional decrement (`quantity = quantity - q WHERE quantity >= q`), so concurrent sales of the same drug are
//! serialized by the store and can never drive the stock below zero: whichever transaction comes second re-evaluates
//! the condition against the committed quantity.
use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use fieldx::fxstruct;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::Set;
use sea_orm::IntoActiveModel;
use sea_orm::QueryOrder;
use sea_orm::TransactionTrait;
use serde::Deserialize;
use tracing::debug;
use tracing::info;
use tracing::instrument;

use crate::db;
use crate::db::driver::DatabaseDriver;
use crate::db::entity::drug;
use crate::db::entity::sale;
use crate::db::prelude::*;
use crate::error::LedgerError;
use crate::inventory;
use crate::inventory::parse_date;
use crate::types::LedgerStatus;
use crate::types::Result;
use crate::types::ShipmentStatus;

/// Sale request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub drug_name:        Option<String>,
    pub quantity:         Option<i64>,
    pub total_amount:     Option<f64>,
    pub transaction_date: Option<String>,
}

/// Sale update body. Only the shipment status can be changed; anything else in the body is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleUpdate {
    pub status: Option<String>,
}

#[derive(Debug)]
#[fxstruct(sync, no_new, builder)]
pub struct Ledger<D>
where
    D: DatabaseDriver,
{
    #[fieldx(get(clone))]
    db: Arc<D>,
}

impl<D> Ledger<D>
where
    D: DatabaseDriver,
{
    /// Validate a request body and record the sale.
    pub async fn record_sale(&self, request: &NewSale) -> Result<Sale> {
        let (Some(drug_name), Some(quantity), Some(total_amount)) = (
            request.drug_name.as_deref().map(str::trim).filter(|s| !s.is_empty()),
            request.quantity,
            request.total_amount,
        )
        else {
            return Err(LedgerError::missing_fields(
                "Drug name, quantity, and total amount are required",
            ));
        };

        let transaction_date = match request.transaction_date.as_deref() {
            Some(date) => Some(parse_date(date).ok_or_else(|| {
                LedgerError::validation(
                    "Invalid transaction date",
                    format!("'{date}' is not an ISO 8601 date"),
                )
            })?),
            None => None,
        };

        self.create_sale(drug_name, quantity, total_amount, transaction_date)
            .await
    }

    /// Record a sale of `quantity` units of `drug_name` and debit the inventory by the same amount.
    ///
    /// Either both the sale and the debit are persisted, or neither is. `transaction_date` defaults to the current
    /// time.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_sale(
        &self,
        drug_name: &str,
        quantity: i64,
        total_amount: f64,
        transaction_date: Option<DateTime<Utc>>,
    ) -> Result<Sale> {
        let drug_name = drug_name.trim();
        if drug_name.is_empty() {
            return Err(LedgerError::missing_fields("Drug name is required"));
        }
        let quantity = i32::try_from(quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| LedgerError::validation("Invalid quantity", "Quantity must be a positive integer"))?;
        if !total_amount.is_finite() || total_amount < 0.0 {
            return Err(LedgerError::validation(
                "Invalid total amount",
                "Total amount must be a non-negative number",
            ));
        }

        let conn = self.db().connection();

        // The by-name reference is resolved once. When several suppliers carry the same drug, the oldest record wins.
        let drug = Drugs::find()
            .filter(drug::Column::DrugName.eq(drug_name))
            .order_by_asc(drug::Column::CreatedAt)
            .one(&conn)
            .await?
            .ok_or_else(|| LedgerError::not_found("Drug", format!("name: {drug_name}")))?;

        let txn = conn.begin().await?;
        let outcome = Self::reconcile(&txn, &drug, quantity, total_amount, transaction_date).await;
        let sale = db::conclude(txn, "sale", outcome).await?;

        info!(
            sale = %sale.id,
            drug = %sale.drug_name,
            quantity = sale.quantity,
            "New sale created"
        );

        Ok(sale)
    }

    async fn reconcile(
        txn: &impl ConnectionTrait,
        drug: &Drug,
        quantity: i32,
        total_amount: f64,
        transaction_date: Option<DateTime<Utc>>,
    ) -> Result<Sale> {
        let now = Utc::now();

        let debit = Drugs::update_many()
            .col_expr(drug::Column::Quantity, Expr::col(drug::Column::Quantity).sub(quantity))
            .col_expr(drug::Column::UpdatedAt, Expr::value(now))
            .filter(drug::Column::Id.eq(drug.id))
            .filter(drug::Column::Quantity.gte(quantity))
            .exec(txn)
            .await?;

        if debit.rows_affected == 0 {
            return Err(match Drugs::find_by_id(drug.id).one(txn).await? {
                Some(current) => LedgerError::InsufficientStock {
                    available: current.quantity,
                    requested: quantity,
                },
                None => LedgerError::not_found("Drug", format!("name: {}", drug.drug_name)),
            });
        }

        let debited = inventory::refresh_status(txn, drug.id, now).await?;
        debug!(
            "Debited {} by {quantity}: {} left, status {:?}",
            debited.drug_name, debited.quantity, debited.status
        );

        let sale = sale::ActiveModel {
            id:               Set(Uuid::new_v4()),
            drug_name:        Set(drug.drug_name.clone()),
            quantity:         Set(quantity),
            total_amount:     Set(total_amount),
            transaction_date: Set(transaction_date.unwrap_or(now)),
            ledger_status:    Set(LedgerStatus::Completed),
            status:           Set(ShipmentStatus::Processing),
        };

        Ok(sale.insert(txn).await?)
    }

    /// Set the shipment status of a sale. Transitions in any direction are accepted.
    #[instrument(level = "debug", skip(self))]
    pub async fn update_sale_status(&self, sale_id: &str, new_status: &str) -> Result<Sale> {
        let id = parse_sale_id(sale_id)?;
        let status: ShipmentStatus = new_status.parse()?;
        let conn = self.db().connection();

        let sale = Sales::find_by_id(id)
            .one(&conn)
            .await?
            .ok_or_else(|| LedgerError::not_found("Sale", format!("id: {id}")))?;

        let mut am = sale.into_active_model();
        am.status = Set(status);
        let sale = am.update(&conn).await?;

        info!(sale = %sale.id, status = %sale.status, "Sale updated");
        Ok(sale)
    }

    /// Apply a sale update body. A body without `status` leaves the record untouched.
    pub async fn update_sale(&self, sale_id: &str, update: &SaleUpdate) -> Result<Sale> {
        match update.status.as_deref() {
            Some(status) => self.update_sale_status(sale_id, status).await,
            None => self.find_sale(parse_sale_id(sale_id)?).await,
        }
    }

    pub async fn find_sale(&self, id: Uuid) -> Result<Sale> {
        Sales::find_by_id(id)
            .one(&self.db().connection())
            .await?
            .ok_or_else(|| LedgerError::not_found("Sale", format!("id: {id}")))
    }

    /// All sales, the most recent first.
    pub async fn list_sales(&self) -> Result<Vec<Sale>> {
        let sales = Sales::find()
            .order_by_desc(sale::Column::TransactionDate)
            .all(&self.db().connection())
            .await?;
        debug!("Found {} sales", sales.len());
        Ok(sales)
    }
}

fn parse_sale_id(sale_id: &str) -> Result<Uuid> {
    Uuid::parse_str(sale_id.trim())
        .map_err(|_| LedgerError::validation("Invalid ID format", "The provided ID is not a valid sale identifier"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_sale_id() {
        assert!(parse_sale_id("67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
        assert!(matches!(
            parse_sale_id("not-an-id"),
            Err(LedgerError::Validation {
                reason: "Invalid ID format",
                ..
            })
        ));
    }

    #[test]
    fn test_sale_update_ignores_other_fields() {
        let update: SaleUpdate =
            serde_json::from_str(r#"{"status": "In Transit", "quantity": 1000, "totalAmount": 0}"#).unwrap();
        assert_eq!(update.status.as_deref(), Some("In Transit"));
    }
}
