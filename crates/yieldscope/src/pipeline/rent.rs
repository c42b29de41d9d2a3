//! Market-rent estimation stage.
//!
//! One generation request yields a JSON quote with a single required numeric
//! field; if that field is unusable the run falls back to statistics over
//! per-listing rents, and a run that exhausts every source fails rather than
//! report a fabricated zero.

use serde_json::Value;

use super::coerce::coerce_f64;
use super::domain::SearchProfile;
use super::fence::strip_code_fences;
use super::PipelineError;
use crate::providers::TextGenerator;

const RENT_SYSTEM_PROMPT: &str = "You are a real estate data analyst. \
You answer with exactly one JSON object and no surrounding prose or code fences.";

/// Parsed market-rent quote. `average_rent` is `None` when the field was
/// absent or uncoercible; deciding what that means is the caller's job.
#[derive(Debug, Clone)]
pub(crate) struct MarketRentQuote {
    pub(crate) average_rent: Option<f64>,
    pub(crate) min_rent: Option<f64>,
    pub(crate) max_rent: Option<f64>,
    pub(crate) analysis: String,
}

pub(crate) fn rent_prompt(profile: &SearchProfile) -> String {
    format!(
        "Estimate the monthly rental price for a property with these specs:\n\
         \n\
         - Location: {area}\n\
         - Bedrooms: {bedrooms}\n\
         - Square footage: {min_sqft}-{max_sqft} sqft\n\
         - Purchase price context: ${min_price}-${max_price}\n\
         \n\
         Analyze current market trends for this area, then return a JSON object \
         with this EXACT structure:\n\
         {{\n\
           \"average_rent\": number,\n\
           \"min_rent\": number,\n\
           \"max_rent\": number,\n\
           \"currency\": \"USD\",\n\
           \"market_analysis\": \"one-sentence summary of the rental market\"\n\
         }}",
        area = profile.area,
        bedrooms = profile.bedrooms,
        min_sqft = profile.min_sqft,
        max_sqft = profile.max_sqft,
        min_price = profile.min_price,
        max_price = profile.max_price,
    )
}

/// Issue the single rent-quote request and parse the reply.
///
/// A reply that is not a JSON object is a format error; a parseable reply
/// with a missing or malformed primary field yields `average_rent: None`.
pub(crate) async fn fetch_market_rent<G>(
    generator: &G,
    profile: &SearchProfile,
) -> Result<MarketRentQuote, PipelineError>
where
    G: TextGenerator + ?Sized,
{
    let reply = generator
        .complete_json(RENT_SYSTEM_PROMPT, &rent_prompt(profile))
        .await?;

    parse_rent_quote(&reply)
}

pub(crate) fn parse_rent_quote(reply: &str) -> Result<MarketRentQuote, PipelineError> {
    let stripped = strip_code_fences(reply);
    let value: Value =
        serde_json::from_str(stripped).map_err(|source| PipelineError::Format {
            stage: "rent-estimator",
            detail: format!(
                "reply is not valid JSON ({source}): {}",
                super::reply_excerpt(stripped)
            ),
        })?;

    let object = value.as_object().ok_or_else(|| PipelineError::Format {
        stage: "rent-estimator",
        detail: format!(
            "reply is not a JSON object: {}",
            super::reply_excerpt(stripped)
        ),
    })?;

    let average_rent = object.get("average_rent").and_then(|v| coerce_f64(v).ok());
    let min_rent = object.get("min_rent").and_then(|v| coerce_f64(v).ok());
    let max_rent = object.get("max_rent").and_then(|v| coerce_f64(v).ok());
    let analysis = object
        .get("market_analysis")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(MarketRentQuote {
        average_rent,
        min_rent,
        max_rent,
        analysis,
    })
}

/// Resolve the run's rent scalar from the primary quote and any per-listing
/// rents, in order: primary, arithmetic mean, lower-median.
///
/// Exhausting all three without a positive value fails the run.
pub(crate) fn resolve_rent_scalar(
    primary: Option<f64>,
    listing_rents: &[f64],
) -> Result<f64, PipelineError> {
    if let Some(rent) = primary {
        if rent > 0.0 {
            return Ok(rent);
        }
        tracing::debug!(rent, "primary rent quote unusable, falling back");
    }

    if !listing_rents.is_empty() {
        let mean = listing_rents.iter().sum::<f64>() / listing_rents.len() as f64;
        if mean > 0.0 {
            return Ok(mean);
        }
        if let Some(median) = lower_median(listing_rents) {
            if median > 0.0 {
                return Ok(median);
            }
        }
    }

    Err(PipelineError::UnresolvedRent)
}

/// Middle element of the sorted sequence, lower-middle on even counts.
pub(crate) fn lower_median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some(sorted[(sorted.len() - 1) / 2])
}
