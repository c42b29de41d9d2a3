//! Rental-yield evaluation over non-deterministic text-generation services.
//!
//! A web-search-capable generator supplies free-text market and listing data,
//! a structuring generator normalizes that text into strict records, and the
//! pipeline derives and ranks gross yields. Every upstream reply is treated
//! as untrusted input; validation and fallback logic live in [`pipeline`].

pub mod config;
pub mod error;
pub mod pipeline;
pub mod providers;
pub mod telemetry;
