// 🔍 Catalog Matcher - coverage similarity against reference descriptions
//
// coverage = |query ∩ reference| / |reference|
//
// The denominator is the reference entry's token count, so a query that is
// a superset of a short curated phrase scores 1.0. A one-word entry that
// appears anywhere in a long query therefore always matches.

use crate::catalog::{Catalog, CatalogEntry};
use crate::text::tokenize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum coverage for a catalog entry to be accepted (default: 0.80)
    pub threshold: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig { threshold: 0.80 }
    }
}

// ============================================================================
// SIMILARITY
// ============================================================================

/// Fraction of the reference tokens present in the query. An empty
/// reference scores 0.
pub fn coverage_similarity(query: &BTreeSet<String>, reference: &BTreeSet<String>) -> f64 {
    if reference.is_empty() {
        return 0.0;
    }
    let shared = reference.iter().filter(|t| query.contains(*t)).count();
    shared as f64 / reference.len() as f64
}

// ============================================================================
// MATCH RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogMatch<'c> {
    pub entry: &'c CatalogEntry,

    /// Coverage of the best candidate (also reported when it fell below the
    /// threshold and the default was returned)
    pub score: f64,

    pub is_default: bool,
}

/// Owned summary of a match, for reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub description: String,
    pub score: f64,
    pub is_default: bool,
}

impl From<&CatalogMatch<'_>> for MatchSummary {
    fn from(m: &CatalogMatch<'_>) -> Self {
        MatchSummary {
            description: m.entry.description.clone(),
            score: m.score,
            is_default: m.is_default,
        }
    }
}

// ============================================================================
// MATCHER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct CatalogMatcher {
    config: MatcherConfig,
}

impl CatalogMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        CatalogMatcher { config }
    }

    pub fn threshold(&self) -> f64 {
        self.config.threshold
    }

    /// Best catalog entry for a description, or the catalog's default entry
    pub fn best_match<'c>(&self, description: &str, catalog: &'c Catalog) -> CatalogMatch<'c> {
        let outcome = best_match_scored(
            description,
            catalog.entries(),
            catalog.default_entry(),
            self.config.threshold,
        );

        debug!(
            description,
            matched = outcome.entry.description.as_str(),
            score = outcome.score,
            is_default = outcome.is_default,
            "catalog match"
        );

        outcome
    }
}

/// Highest coverage entry with ties resolved to the earliest one. Falls back
/// to `default_entry` when the query has no tokens, nothing overlaps, or the
/// best score is below `threshold`.
pub fn best_match_scored<'c>(
    description: &str,
    entries: &'c [CatalogEntry],
    default_entry: &'c CatalogEntry,
    threshold: f64,
) -> CatalogMatch<'c> {
    let fallback = |score: f64| CatalogMatch {
        entry: default_entry,
        score,
        is_default: true,
    };

    let query = tokenize(description);
    if query.is_empty() {
        return fallback(0.0);
    }

    let mut best: Option<(&CatalogEntry, f64)> = None;
    for entry in entries {
        let score = coverage_similarity(&query, &entry.tokens);
        let is_better = match best {
            None => score > 0.0,
            Some((_, best_score)) => score > best_score,
        };
        if is_better {
            best = Some((entry, score));
        }
    }

    match best {
        Some((entry, score)) if score >= threshold => CatalogMatch {
            entry,
            score,
            is_default: false,
        },
        Some((_, score)) => fallback(score),
        None => fallback(0.0),
    }
}

/// Plain entry lookup with an explicit default and threshold
pub fn best_match<'c>(
    description: &str,
    entries: &'c [CatalogEntry],
    default_entry: &'c CatalogEntry,
    threshold: f64,
) -> &'c CatalogEntry {
    best_match_scored(description, entries, default_entry, threshold).entry
}

// ============================================================================
// TESTS
// ============================================================================
