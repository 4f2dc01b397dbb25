//! Batched rarity snapshot over a deployed tiers contract.

pub mod contract;
pub mod fetcher;
pub mod report;
