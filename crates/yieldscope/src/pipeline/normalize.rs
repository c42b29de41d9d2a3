//! Listing normalization stage.
//!
//! The structuring generator converts harvested free text into a JSON object
//! with a `properties` array of loosely-typed records. Every record is then
//! validated independently: a bad field skips that record, never the batch.
//! Only a structurally unparsable top-level reply fails the run.

use serde_json::{Map, Value};

use super::coerce::{coerce_f64, coerce_i64};
use super::domain::SearchProfile;
use super::fence::strip_code_fences;
use super::{PipelineError, RentSource};
use crate::providers::TextGenerator;

/// Key aliases accepted for the asking price, in resolution order.
const PRICE_KEYS: [&str; 4] = ["price_usd", "price", "asking_price", "list_price"];

/// Key aliases accepted for a per-listing monthly rent estimate.
const RENT_KEYS: [&str; 3] = ["estimated_rent_usd", "estimated_rent", "monthly_rent"];

/// Key aliases accepted for the top-level listing array.
const COLLECTION_KEYS: [&str; 2] = ["properties", "listings"];

const NORMALIZE_SYSTEM_PROMPT: &str = "You are a strict JSON parsing engine. \
You receive messy text that describes real property listings found online and \
extract clean structured data for each listing. You output ONLY valid JSON \
(no markdown, no ``` fences) and never add extra top-level keys. Numbers must \
be plain numbers with no commas or currency symbols.";

/// A listing that survived validation but has not been priced for yield yet.
///
/// `rent` is the listing's own coerced monthly rent when the run extracts
/// per-listing rents, and `None` in the shared-scalar variant.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawListing {
    pub(crate) id: String,
    pub(crate) address: String,
    pub(crate) price: f64,
    pub(crate) bedrooms: u32,
    pub(crate) sqft: f64,
    pub(crate) rent: Option<f64>,
    pub(crate) url: String,
}

pub(crate) fn normalize_prompt(
    profile: &SearchProfile,
    harvested_text: &str,
    rent_source: RentSource,
    max_listings: usize,
) -> String {
    let rent_field = match rent_source {
        RentSource::PerListing => {
            "\n   - \"estimated_rent_usd\": your estimate of MONTHLY rent for this listing"
        }
        RentSource::MarketScalar => "",
    };

    format!(
        "Here is raw text containing real property listings:\n\
         \n\
         ---\n\
         {harvested_text}\n\
         ---\n\
         \n\
         The user is interested in:\n\
         \n\
         - Area: {area}\n\
         - Target price range: {min_price}-{max_price} USD\n\
         - Target bedrooms: about {bedrooms}\n\
         - Target size: {min_sqft}-{max_sqft} sq ft\n\
         \n\
         From this text:\n\
         \n\
         1. Extract up to {max_listings} listings that roughly match the user's criteria.\n\
         2. For each listing:\n\
            - \"id\": a unique id like \"prop-1\", \"prop-2\", etc.\n\
            - \"address\": concise address or neighborhood + city\n\
            - \"price_usd\": asking price (numeric, no commas)\n\
            - \"bedrooms\": integer number of bedrooms\n\
            - \"sqft\": square footage (numeric; if missing, estimate reasonably)\n\
            - \"url\": URL string to the listing (if present; else empty string){rent_field}\n\
         \n\
         Return ONLY a JSON object with a single top-level \"properties\" array \
         holding those listings. Do NOT wrap the JSON in code fences.",
        area = profile.area,
        min_price = profile.min_price,
        max_price = profile.max_price,
        bedrooms = profile.bedrooms,
        min_sqft = profile.min_sqft,
        max_sqft = profile.max_sqft,
    )
}

/// Run the structuring request and validate every returned record.
///
/// Zero surviving records is itself an error so callers can tell "nothing
/// usable came back" apart from a legitimate empty result.
pub(crate) async fn normalize_listings<G>(
    generator: &G,
    profile: &SearchProfile,
    harvested_text: &str,
    rent_source: RentSource,
    max_listings: usize,
) -> Result<Vec<RawListing>, PipelineError>
where
    G: TextGenerator + ?Sized,
{
    let reply = generator
        .complete_json(
            NORMALIZE_SYSTEM_PROMPT,
            &normalize_prompt(profile, harvested_text, rent_source, max_listings),
        )
        .await?;

    listings_from_reply(&reply, profile, rent_source, max_listings)
}

/// Pure validation half of the stage, split out so it can be unit-tested
/// without a generator.
pub(crate) fn listings_from_reply(
    reply: &str,
    profile: &SearchProfile,
    rent_source: RentSource,
    max_listings: usize,
) -> Result<Vec<RawListing>, PipelineError> {
    let stripped = strip_code_fences(reply);
    let top: Value = serde_json::from_str(stripped).map_err(|source| PipelineError::Format {
        stage: "normalizer",
        detail: format!(
            "reply is not valid JSON ({source}): {}",
            super::reply_excerpt(stripped)
        ),
    })?;

    // A missing or non-array collection is an empty sequence, not a run
    // failure; the survivor check below decides the outcome.
    let raw_records = COLLECTION_KEYS
        .iter()
        .find_map(|key| top.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut listings = Vec::new();
    for (index, record) in raw_records.iter().take(max_listings).enumerate() {
        match validate_record(record, index, profile, rent_source) {
            Ok(listing) => listings.push(listing),
            Err(reason) => {
                tracing::debug!(index, %reason, "skipping malformed listing record");
            }
        }
    }

    if listings.is_empty() {
        return Err(PipelineError::NoValidListings);
    }

    tracing::info!(
        survivors = listings.len(),
        offered = raw_records.len(),
        "listing records normalized"
    );
    Ok(listings)
}

fn validate_record(
    record: &Value,
    index: usize,
    profile: &SearchProfile,
    rent_source: RentSource,
) -> Result<RawListing, String> {
    let object = record.as_object().ok_or("record is not a JSON object")?;

    let price_value = first_present(object, &PRICE_KEYS).ok_or("no price field present")?;
    let price = coerce_f64(price_value).map_err(|err| format!("price: {err}"))?;
    if price <= 0.0 {
        return Err(format!("non-positive price {price}"));
    }

    let rent = match rent_source {
        RentSource::PerListing => {
            let rent_value =
                first_present(object, &RENT_KEYS).ok_or("no rent estimate present")?;
            let rent = coerce_f64(rent_value).map_err(|err| format!("rent: {err}"))?;
            if rent <= 0.0 {
                return Err(format!("non-positive rent {rent}"));
            }
            Some(rent)
        }
        RentSource::MarketScalar => None,
    };

    let bedrooms = match object.get("bedrooms") {
        Some(value) => {
            let coerced = coerce_i64(value).map_err(|err| format!("bedrooms: {err}"))?;
            u32::try_from(coerced).map_err(|_| format!("negative bedroom count {coerced}"))?
        }
        None => profile.bedrooms,
    };

    let sqft = match object.get("sqft").map(coerce_f64) {
        Some(Ok(sqft)) if sqft > 0.0 => sqft,
        Some(Ok(_)) | None => profile.sqft_midpoint(),
        Some(Err(err)) => return Err(format!("sqft: {err}")),
    };

    let address = object
        .get("address")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or("Unknown")
        .to_string();

    let id = object
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("prop-{}", index + 1));

    let url = object
        .get("url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(RawListing {
        id,
        address,
        price,
        bedrooms,
        sqft,
        rent,
        url,
    })
}

fn first_present<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| object.get(*key))
        .filter(|value| !value.is_null())
}
