//! Client for the external demand-prediction service.
//!
//! The service is an opaque collaborator: requests are validated here and forwarded as-is, responses are passed
//! through without interpretation.
use std::time::Duration;

use reqwest::Client;
use reqwest::Response;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

use crate::error::LedgerError;
use crate::types::Result;

pub const DEFAULT_FORECAST_DAYS: u32 = 30;
pub const MAX_FORECAST_DAYS: u32 = 90;

pub const FORECAST_DRUG_TYPES: [&str; 8] = [
    "analgesic",
    "anti-inflammatory",
    "painkiller",
    "antipyretic",
    "sedative",
    "antipsychotic",
    "respiratory",
    "antihistamine",
];

/// Forecast request body. Numeric fields may come in as numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastRequest {
    pub drug_type:   Option<String>,
    pub month:       Option<Value>,
    pub stock_level: Option<Value>,
    pub days:        Option<Value>,
}

/// Validated payload sent to the prediction service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastQuery {
    pub drug_type:   String,
    pub month:       Value,
    pub stock_level: f64,
    pub days:        u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub success: bool,
    pub data:    Value,
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

impl ForecastRequest {
    pub fn validate(&self) -> Result<ForecastQuery> {
        let (Some(drug_type), Some(month), Some(stock_level)) = (
            self.drug_type.as_deref().filter(|s| !s.is_empty()),
            self.month.as_ref().filter(|v| !is_blank(v)),
            self.stock_level.as_ref().filter(|v| !v.is_null()),
        )
        else {
            return Err(LedgerError::missing_fields("drug_type, month, and stock_level are required"));
        };

        if !FORECAST_DRUG_TYPES.contains(&drug_type) {
            return Err(LedgerError::validation(
                "Invalid drug type",
                format!("Drug type must be one of: {}", FORECAST_DRUG_TYPES.join(", ")),
            ));
        }

        let stock_level = as_number(stock_level)
            .filter(|s| s.is_finite() && *s >= 0.0)
            .ok_or_else(|| LedgerError::validation("Invalid stock level", "Stock level must be a non-negative number"))?;

        let days = match self.days.as_ref().filter(|v| !v.is_null()) {
            None => DEFAULT_FORECAST_DAYS,
            Some(days) => as_number(days)
                .map(f64::trunc)
                .filter(|d| *d >= 1.0 && *d <= MAX_FORECAST_DAYS as f64)
                .map(|d| d as u32)
                .ok_or_else(|| {
                    LedgerError::validation("Invalid days", format!("Days must be between 1 and {MAX_FORECAST_DAYS}"))
                })?,
        };

        Ok(ForecastQuery {
            drug_type: drug_type.to_string(),
            month: month.clone(),
            stock_level,
            days,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Forecaster {
    base_url: String,
    client:   Client,
}

impl Forecaster {
    pub fn new<S: AsRef<str>>(base_url: S, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::config(format!("cannot build prediction service client: {e}")))?;
        Ok(Self {
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Health and model metadata of the prediction service, passed through verbatim.
    #[instrument(level = "debug", skip(self))]
    pub async fn model_info(&self) -> Result<Value> {
        let url = format!("{}/api/health", self.base_url);
        let response = self.client.get(&url).send().await.map_err(upstream)?;
        Self::json_of(response).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn forecast(&self, request: &ForecastRequest) -> Result<Forecast> {
        let query = request.validate()?;
        debug!("Forwarding forecast request: {query:?}");

        let url = format!("{}/api/predict", self.base_url);
        let response = self.client.post(&url).json(&query).send().await.map_err(upstream)?;

        Ok(Forecast {
            success: true,
            data:    Self::json_of(response).await?,
        })
    }

    async fn json_of(response: Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Prediction service responded with an error: {body}");
            return Err(LedgerError::Upstream {
                details: format!("prediction service responded with {status}"),
            });
        }
        response.json().await.map_err(upstream)
    }
}

fn upstream(err: reqwest::Error) -> LedgerError {
    warn!("Prediction service request failed: {err}");
    LedgerError::Upstream {
        details: err.to_string(),
    }
}
