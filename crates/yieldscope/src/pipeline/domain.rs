use serde::{Deserialize, Serialize};

/// Currency every figure in a run is denominated in.
pub const CURRENCY: &str = "USD";

/// Investment search criteria supplied by the caller.
///
/// Created once per run and read by every pipeline stage; the field names
/// serialize in camelCase to match the frontend contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchProfile {
    pub min_price: f64,
    pub max_price: f64,
    pub area: String,
    pub bedrooms: u32,
    pub min_sqft: f64,
    pub max_sqft: f64,
}

impl SearchProfile {
    /// Midpoint of the requested size band, used as the square-footage
    /// default when a listing omits it.
    pub fn sqft_midpoint(&self) -> f64 {
        (self.min_sqft + self.max_sqft) / 2.0
    }
}

/// One validated listing as returned to the caller.
///
/// `gross_yield` is `estimated_rent * 12 / price`, kept at full precision;
/// rounding happens only when a textual representation is rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub id: String,
    pub address: String,
    pub price: f64,
    pub bedrooms: u32,
    pub sqft: f64,
    pub estimated_rent: f64,
    pub gross_yield: f64,
    pub url: String,
}

/// Caller-facing result of a full evaluation run.
///
/// `properties` is sorted descending by gross yield; ties keep their original
/// extraction order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub average_rent: f64,
    pub currency: &'static str,
    pub properties: Vec<ListingRecord>,
}

/// Rent-only result for callers that want the market scalar without listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRentSnapshot {
    pub average_rent: f64,
    pub currency: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rent: Option<f64>,
    pub analysis: String,
}
