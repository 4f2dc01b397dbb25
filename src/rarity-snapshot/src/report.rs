use std::collections::BTreeMap;

use itertools::Itertools;

use crate::fetcher::{QueryRange, RarityEntry, UNASSIGNED};

/// Label reported for rarity codes outside the catalog.
pub const UNKNOWN_LABEL: &str = "UNKNOWN";

/// Closed set of rarity codes the tiers contract assigns.
const RARITY_LABELS: &[(u8, &str)] = &[
    (0, "UNASSIGNED"),
    (1, "COMMON"),
    (2, "UNCOMMON"),
    (3, "RARE"),
];

/// Maps rarity codes to their display labels.
#[derive(Debug, Clone)]
pub struct RarityCatalog {
    labels: BTreeMap<u8, &'static str>,
}

impl Default for RarityCatalog {
    fn default() -> Self {
        Self {
            labels: RARITY_LABELS.iter().copied().collect(),
        }
    }
}

impl RarityCatalog {
    pub fn label(&self, code: u8) -> &'static str {
        self.labels.get(&code).copied().unwrap_or(UNKNOWN_LABEL)
    }
}

/// Parallel id/code arrays for the batched write call, sentinel entries dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportPairs {
    pub token_ids: Vec<u64>,
    pub rarities: Vec<u8>,
}

pub fn export_pairs(results: &[RarityEntry]) -> ExportPairs {
    let mut pairs = ExportPairs::default();
    for entry in results.iter().filter(|entry| entry.rarity != UNASSIGNED) {
        pairs.token_ids.push(entry.token_id);
        pairs.rarities.push(entry.rarity);
    }
    pairs
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionEntry {
    pub label: &'static str,
    pub count: usize,
    pub percent: f64,
}

/// Frequency of every rarity code over the whole result set, sentinel included.
///
/// Entries come out in ascending code order; codes missing from the catalog
/// fold into a single [`UNKNOWN_LABEL`] bucket.
pub fn distribution(
    results: &[RarityEntry],
    catalog: &RarityCatalog,
    total: u64,
) -> Vec<DistributionEntry> {
    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    for entry in results {
        *counts.entry(entry.rarity).or_default() += 1;
    }

    let mut entries: Vec<DistributionEntry> = Vec::new();
    for (code, count) in counts {
        let label = catalog.label(code);
        match entries.iter_mut().find(|entry| entry.label == label) {
            Some(entry) => entry.count += count,
            None => entries.push(DistributionEntry {
                label,
                count,
                percent: 0.0,
            }),
        }
    }

    for entry in &mut entries {
        entry.percent = round_percent(entry.count, total);
    }

    entries
}

fn round_percent(count: usize, total: u64) -> f64 {
    let percent = count as f64 * 100.0 / total as f64;
    (percent * 100.0).round() / 100.0
}

/// Prints the arrays for the batched write and the distribution table.
pub fn print_report(results: &[RarityEntry], range: &QueryRange, catalog: &RarityCatalog) {
    let pairs = export_pairs(results);

    println!();
    println!("=== arrays for setRarityBatch ===");
    println!("token_ids: [{}]", pairs.token_ids.iter().join(", "));
    println!("rarities: [{}]", pairs.rarities.iter().join(", "));

    println!();
    println!("=== rarity distribution ===");
    println!("tokens queried: {}", range.size());
    println!("tokens with an assigned rarity: {}", pairs.token_ids.len());
    for entry in distribution(results, catalog, range.size()) {
        println!("{}: {} tokens ({:.2}%)", entry.label, entry.count, entry.percent);
    }
}
