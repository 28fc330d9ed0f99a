//! HTTP interface of the service.
//!
//! ## Routes
//!
//! - `GET /api/inventory`, `POST /api/inventory`: list stock, add or restock a drug.
//! - `GET /api/drugs/types`: drug-type catalog.
//! - `GET /api/sales`, `POST /api/sales`: list sales (most recent first), record a sale.
//! - `PATCH /api/sales/:id`: change the shipment status of a sale.
//! - `GET /api/sales/stats/summary`: ledger statistics.
//! - `GET /api/predict/model-info`, `POST /api/predict/forecast`: prediction service proxy.
//! - `GET /health`: liveness check.
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::patch;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde_json::json;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::catalog;
use crate::db::driver::DatabaseDriver;
use crate::db::prelude::*;
use crate::error::LedgerError;
use crate::forecast::Forecast;
use crate::forecast::ForecastRequest;
use crate::forecast::Forecaster;
use crate::inventory::Inventory;
use crate::inventory::InventoryItem;
use crate::inventory::NewStock;
use crate::inventory::StockOutcome;
use crate::ledger::Ledger;
use crate::ledger::NewSale;
use crate::ledger::SaleUpdate;
use crate::summary::SummaryReport;
use crate::types::Result;

/// Shared state of the request handlers.
#[derive(Debug)]
pub struct AppState<D>
where
    D: DatabaseDriver,
{
    pub db:         Arc<D>,
    pub ledger:     Arc<Ledger<D>>,
    pub inventory:  Arc<Inventory<D>>,
    pub forecaster: Forecaster,
}

impl<D> Clone for AppState<D>
where
    D: DatabaseDriver,
{
    fn clone(&self) -> Self {
        Self {
            db:         Arc::clone(&self.db),
            ledger:     Arc::clone(&self.ledger),
            inventory:  Arc::clone(&self.inventory),
            forecaster: self.forecaster.clone(),
        }
    }
}

impl From<JsonRejection> for LedgerError {
    fn from(rejection: JsonRejection) -> Self {
        LedgerError::validation("Invalid request body", rejection.body_text())
    }
}

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    Ok(payload?.0)
}

pub fn router<D>(state: AppState<D>, cors: CorsLayer) -> Router
where
    D: DatabaseDriver,
{
    let api = Router::new()
        .route("/inventory", get(list_inventory::<D>).post(stock_drug::<D>))
        .route("/drugs/types", get(list_drug_types::<D>))
        .route("/sales", get(list_sales::<D>).post(create_sale::<D>))
        .route("/sales/stats/summary", get(sales_summary::<D>))
        .route("/sales/:id", patch(update_sale::<D>))
        .route("/predict/model-info", get(model_info::<D>))
        .route("/predict/forecast", post(forecast::<D>));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn list_inventory<D: DatabaseDriver>(State(state): State<AppState<D>>) -> Result<Json<Vec<InventoryItem>>> {
    Ok(Json(state.inventory.list_inventory().await?))
}

async fn stock_drug<D: DatabaseDriver>(
    State(state): State<AppState<D>>,
    payload: std::result::Result<Json<NewStock>, JsonRejection>,
) -> Result<Response> {
    let request = body(payload)?;
    Ok(match state.inventory.stock_drug(&request).await? {
        StockOutcome::Created(item) => (StatusCode::CREATED, Json(item)).into_response(),
        StockOutcome::Restocked(item) => Json(json!({
            "message": "Drug quantity updated successfully",
            "drug": item,
        }))
        .into_response(),
    })
}

async fn list_drug_types<D: DatabaseDriver>(State(state): State<AppState<D>>) -> Result<Json<Vec<DrugType>>> {
    Ok(Json(catalog::list_drug_types(&state.db.connection()).await?))
}

async fn list_sales<D: DatabaseDriver>(State(state): State<AppState<D>>) -> Result<Json<Vec<Sale>>> {
    Ok(Json(state.ledger.list_sales().await?))
}

async fn create_sale<D: DatabaseDriver>(
    State(state): State<AppState<D>>,
    payload: std::result::Result<Json<NewSale>, JsonRejection>,
) -> Result<(StatusCode, Json<Sale>)> {
    let request = body(payload)?;
    let sale = state.ledger.record_sale(&request).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

async fn update_sale<D: DatabaseDriver>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<SaleUpdate>, JsonRejection>,
) -> Result<Json<Sale>> {
    let update = body(payload)?;
    Ok(Json(state.ledger.update_sale(&id, &update).await?))
}

async fn sales_summary<D: DatabaseDriver>(State(state): State<AppState<D>>) -> Result<Json<SummaryReport>> {
    Ok(Json(state.ledger.compute_sales_summary().await?))
}

async fn model_info<D: DatabaseDriver>(State(state): State<AppState<D>>) -> Result<Json<Value>> {
    Ok(Json(state.forecaster.model_info().await?))
}

async fn forecast<D: DatabaseDriver>(
    State(state): State<AppState<D>>,
    payload: std::result::Result<Json<ForecastRequest>, JsonRejection>,
) -> Result<Json<Forecast>> {
    let request = body(payload)?;
    Ok(Json(state.forecaster.forecast(&request).await?))
}
