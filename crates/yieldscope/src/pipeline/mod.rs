//! Multi-stage extraction-and-normalization pipeline.
//!
//! Turns unreliable free text from generation services into validated,
//! yield-ranked listing records. Stages run strictly in order (market-rent
//! quote, listing harvest, normalization, ranking) because each depends on
//! the previous stage's output; runs share no mutable state with each other.

pub mod coerce;
pub mod domain;
pub mod fence;
mod harvest;
mod normalize;
mod rank;
mod rent;

pub use rank::round4;

use std::sync::Arc;

use crate::providers::{ProviderError, TextGenerator};
use domain::{EvaluationResult, MarketRentSnapshot, SearchProfile, CURRENCY};

/// Stage-level failure; always fatal to the run it occurred in.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Network or status failure calling an external service.
    #[error(transparent)]
    Upstream(#[from] ProviderError),
    /// An external reply could not be parsed as the expected shape.
    #[error("{stage} reply could not be parsed: {detail}")]
    Format {
        stage: &'static str,
        detail: String,
    },
    /// Every fallback for the rent scalar was exhausted.
    #[error("rent estimate unresolved after market quote, mean, and median fallbacks")]
    UnresolvedRent,
    /// Normalization produced zero surviving records. Distinct from a
    /// legitimate empty result.
    #[error("no listings survived normalization")]
    NoValidListings,
}

/// Leading slice of an upstream reply, short enough to embed in error
/// details and log lines without dumping the whole response.
pub(crate) fn reply_excerpt(reply: &str) -> &str {
    const MAX_CHARS: usize = 120;
    match reply.char_indices().nth(MAX_CHARS) {
        Some((end, _)) => &reply[..end],
        None => reply,
    }
}

/// Which rent figure each listing carries.
///
/// The two near-duplicate upstream designs are configurations of one
/// pipeline, never mixed within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RentSource {
    /// Every listing shares the single resolved market scalar.
    #[default]
    MarketScalar,
    /// Each listing keeps its own extracted rent; those also feed the
    /// mean/median fallbacks for the run scalar.
    PerListing,
}

impl RentSource {
    pub fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "per-listing" | "per_listing" | "listing" => Self::PerListing,
            _ => Self::MarketScalar,
        }
    }
}

/// Tunables for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub rent_source: RentSource,
    pub max_listings: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rent_source: RentSource::default(),
            max_listings: 10,
        }
    }
}

/// The evaluation pipeline, generic over its two upstream generators.
///
/// `S` is the web-search-capable generator feeding the rent estimator and
/// the harvester; `P` is the structuring generator feeding the normalizer.
/// Generics keep the seams substitutable with scripted fakes in tests.
pub struct EvaluationPipeline<S, P> {
    searcher: Arc<S>,
    structurer: Arc<P>,
    config: PipelineConfig,
}

impl<S, P> EvaluationPipeline<S, P>
where
    S: TextGenerator,
    P: TextGenerator,
{
    pub fn new(searcher: Arc<S>, structurer: Arc<P>, config: PipelineConfig) -> Self {
        Self {
            searcher,
            structurer,
            config,
        }
    }

    /// Resolve the market-rent scalar for a profile without harvesting
    /// listings. With no per-listing rents available, an unusable quote
    /// exhausts the fallback chain immediately.
    pub async fn estimate_rent(
        &self,
        profile: &SearchProfile,
    ) -> Result<MarketRentSnapshot, PipelineError> {
        let quote = rent::fetch_market_rent(self.searcher.as_ref(), profile).await?;
        let average_rent = rent::resolve_rent_scalar(quote.average_rent, &[])?;

        Ok(MarketRentSnapshot {
            average_rent,
            currency: CURRENCY,
            min_rent: quote.min_rent.filter(|rent| *rent > 0.0),
            max_rent: quote.max_rent.filter(|rent| *rent > 0.0),
            analysis: quote.analysis,
        })
    }

    /// Run the full chain and return the yield-ranked result set.
    pub async fn evaluate(
        &self,
        profile: &SearchProfile,
    ) -> Result<EvaluationResult, PipelineError> {
        tracing::info!(area = %profile.area, rent_source = ?self.config.rent_source, "evaluation run started");

        let quote = rent::fetch_market_rent(self.searcher.as_ref(), profile).await?;
        let harvested = harvest::harvest_listing_text(self.searcher.as_ref(), profile).await?;
        let listings = normalize::normalize_listings(
            self.structurer.as_ref(),
            profile,
            &harvested,
            self.config.rent_source,
            self.config.max_listings,
        )
        .await?;

        let listing_rents: Vec<f64> = listings.iter().filter_map(|listing| listing.rent).collect();
        let average_rent = rent::resolve_rent_scalar(quote.average_rent, &listing_rents)?;

        let properties = rank::rank_by_yield(listings, average_rent);
        tracing::info!(
            area = %profile.area,
            average_rent,
            properties = properties.len(),
            "evaluation run completed"
        );

        Ok(EvaluationResult {
            average_rent,
            currency: CURRENCY,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rent_source_parses_env_spellings() {
        assert_eq!(RentSource::from_str("per-listing"), RentSource::PerListing);
        assert_eq!(RentSource::from_str("PER_LISTING"), RentSource::PerListing);
        assert_eq!(RentSource::from_str("market"), RentSource::MarketScalar);
        assert_eq!(RentSource::from_str(""), RentSource::MarketScalar);
    }

    #[test]
    fn reply_excerpt_truncates_on_a_char_boundary() {
        let short = "brief reply";
        assert_eq!(reply_excerpt(short), short);

        let long = "é".repeat(200);
        let excerpt = reply_excerpt(&long);
        assert_eq!(excerpt.chars().count(), 120);
        assert!(long.starts_with(excerpt));
    }

    #[test]
    fn config_defaults_to_the_shared_scalar_variant() {
        let config = PipelineConfig::default();
        assert_eq!(config.rent_source, RentSource::MarketScalar);
        assert_eq!(config.max_listings, 10);
    }
}
