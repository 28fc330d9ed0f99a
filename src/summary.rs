//! Sales statistics.
use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Datelike;
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::QueryOrder;
use sea_orm::QuerySelect;
use serde::Serialize;
use tracing::debug;
use tracing::instrument;

use crate::db::driver::DatabaseDriver;
use crate::db::entity::sale;
use crate::db::prelude::*;
use crate::ledger::Ledger;
use crate::types::Result;
use crate::types::RECENT_TRANSACTIONS;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub total_sales:         f64,
    pub monthly_growth:      f64,
    pub average_order:       f64,
    pub total_orders:        u64,
    pub recent_transactions: Vec<Sale>,
}

/// Running totals over the ledger, with per-calendar-month revenue.
#[derive(Debug, Default, Clone)]
pub struct SalesTally {
    total:   f64,
    count:   u64,
    // (year, month) -> revenue
    monthly: BTreeMap<(i32, u32), f64>,
}

impl SalesTally {
    pub fn add(&mut self, date: DateTime<Utc>, amount: f64) {
        self.total += amount;
        self.count += 1;
        *self.monthly.entry((date.year(), date.month())).or_insert(0.0) += amount;
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        }
        else {
            self.total / self.count as f64
        }
    }

    /// Growth of the latest month with sales over the month with sales before it, in percent rounded to 2 decimals.
    /// Zero when fewer than two months have sales.
    pub fn monthly_growth(&self) -> f64 {
        let mut latest = self.monthly.values().rev();
        match (latest.next(), latest.next()) {
            (Some(current), Some(previous)) => round2(growth(*previous, *current)),
            _ => 0.0,
        }
    }
}

impl FromIterator<(DateTime<Utc>, f64)> for SalesTally {
    fn from_iter<I: IntoIterator<Item = (DateTime<Utc>, f64)>>(iter: I) -> Self {
        let mut tally = Self::default();
        for (date, amount) in iter {
            tally.add(date, amount);
        }
        tally
    }
}

/// Percentage change from `previous` to `current`. A zero base counts as 100% growth.
pub fn growth(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        100.0
    }
    else {
        (current - previous) / previous * 100.0
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl<D> Ledger<D>
where
    D: DatabaseDriver,
{
    /// Aggregate the whole ledger. Read-only; an empty ledger produces a zeroed report.
    #[instrument(level = "debug", skip(self))]
    pub async fn compute_sales_summary(&self) -> Result<SummaryReport> {
        let conn = self.db().connection();

        let amounts = Sales::find()
            .select_only()
            .column(sale::Column::TransactionDate)
            .column(sale::Column::TotalAmount)
            .into_tuple::<(DateTimeUtc, f64)>()
            .all(&conn)
            .await?;

        let recent_transactions = Sales::find()
            .order_by_desc(sale::Column::TransactionDate)
            .limit(RECENT_TRANSACTIONS)
            .all(&conn)
            .await?;

        let tally: SalesTally = amounts.into_iter().collect();
        debug!(
            "Sales tally: {} orders, {:.2} total over {} months",
            tally.count(),
            tally.total(),
            tally.monthly.len()
        );

        Ok(SummaryReport {
            total_sales: tally.total(),
            monthly_growth: tally.monthly_growth(),
            average_order: tally.average(),
            total_orders: tally.count(),
            recent_transactions,
        })
    }
}
