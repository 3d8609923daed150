//! cambio core — rate records, resilient HTTP, source adapters, normalization.
//!
//! This crate contains the ingestion half of the collector:
//! - `RateRecord`, the validated canonical observation
//! - A blocking HTTP client with bounded retry and exponential backoff
//! - The Frankfurter API adapter (fails loudly) and the x-rates.com table
//!   scraper (degrades to an empty list)
//! - The normalizer that reduces loosely-shaped records to five fields

pub mod data;
pub mod domain;
