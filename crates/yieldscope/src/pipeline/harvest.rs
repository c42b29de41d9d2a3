//! Listing text harvesting stage.
//!
//! One request to the web-search-capable generator returns free text with
//! zero or more candidate listings. The reply is opaque here; structure is
//! the normalizer's problem. Any transport or envelope failure aborts the
//! run, there is no partial-success mode.

use super::domain::SearchProfile;
use super::PipelineError;
use crate::providers::TextGenerator;

const HARVEST_SYSTEM_PROMPT: &str = "You are a property search assistant with live web access. \
You search sites like Zillow, Redfin, Realtor, and Trulia and return real, current listings. \
You MUST NOT output JSON; just plain text.";

pub(crate) fn harvest_prompt(profile: &SearchProfile) -> String {
    format!(
        "Search the live web for REAL, CURRENT properties for sale that match:\n\
         \n\
         - Area: {area}\n\
         - Price range: {min_price}-{max_price} USD\n\
         - Bedrooms: around {bedrooms}\n\
         - Size: {min_sqft}-{max_sqft} square feet\n\
         \n\
         For each listing you find, include:\n\
         - Address or neighborhood + city\n\
         - Asking price\n\
         - Number of bedrooms\n\
         - Approximate square footage (if available; otherwise estimate)\n\
         - A direct URL to the listing; if none is visible, synthesize your best guess\n\
         \n\
         Return the results as plain text with one listing per bullet or paragraph.\n\
         Do NOT format as JSON.\n\
         Do NOT use ``` code fences.\n\
         Do NOT include any analysis, only the listing details.",
        area = profile.area,
        min_price = profile.min_price,
        max_price = profile.max_price,
        bedrooms = profile.bedrooms,
        min_sqft = profile.min_sqft,
        max_sqft = profile.max_sqft,
    )
}

pub(crate) async fn harvest_listing_text<G>(
    generator: &G,
    profile: &SearchProfile,
) -> Result<String, PipelineError>
where
    G: TextGenerator + ?Sized,
{
    let text = generator
        .complete(HARVEST_SYSTEM_PROMPT, &harvest_prompt(profile))
        .await?;

    tracing::info!(
        area = %profile.area,
        harvested_length = text.len(),
        "listing text harvested"
    );
    Ok(text)
}
