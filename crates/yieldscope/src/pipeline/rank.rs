//! Gross-yield computation and ranking.
//!
//! The normalizer guarantees positive prices and rents, so no division guard
//! is needed here. Yields stay at full precision; `round4` exists for the
//! presentation boundary only.

use super::domain::ListingRecord;
use super::normalize::RawListing;

/// Annualized rent over purchase price, as a fraction (0.08 = 8%).
pub(crate) fn gross_yield(monthly_rent: f64, price: f64) -> f64 {
    monthly_rent * 12.0 / price
}

/// Price every listing for yield and sort descending.
///
/// Listings without their own rent figure take `average_rent`. The sort is
/// stable, so equal yields keep their extraction order.
pub(crate) fn rank_by_yield(listings: Vec<RawListing>, average_rent: f64) -> Vec<ListingRecord> {
    let mut records: Vec<ListingRecord> = listings
        .into_iter()
        .map(|listing| {
            let estimated_rent = listing.rent.unwrap_or(average_rent);
            ListingRecord {
                id: listing.id,
                address: listing.address,
                price: listing.price,
                bedrooms: listing.bedrooms,
                sqft: listing.sqft,
                estimated_rent,
                gross_yield: gross_yield(estimated_rent, listing.price),
                url: listing.url,
            }
        })
        .collect();

    records.sort_by(|a, b| {
        b.gross_yield
            .partial_cmp(&a.gross_yield)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    records
}

/// Fixed 4-decimal policy for textual representations of a yield.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
