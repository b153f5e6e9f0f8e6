// Cost Derivation - Core Library
// Classifies line items, matches them against a reference catalog and splits
// their tax-inclusive totals into a full cost breakdown

pub mod text;
pub mod money;
pub mod classifier;
pub mod catalog;
pub mod matcher;
pub mod allocation;
pub mod display;
pub mod details;
pub mod items;
pub mod prices;
pub mod config;
pub mod pipeline;
pub mod report;

// Re-export commonly used types
pub use text::{normalize, tokenize};
pub use money::{format_thousands, parse_amount, round_half_up, Amount, Rate};
pub use classifier::{classify, Classification, ClassifierRules, ItemCategory, TextClassifier};
pub use catalog::{Catalog, CatalogEntry};
pub use matcher::{best_match, coverage_similarity, CatalogMatch, CatalogMatcher, MatchSummary, MatcherConfig};
pub use allocation::{
    apportion, derive_parts, derive_summary, AllocationConfig, AllocationEngine,
    CostBreakdown, PartsBreakdown, SplitWeights, SummaryBreakdown,
};
pub use display::{DisplayConfig, DisplayTexts};
pub use details::{DetailConfig, LineDetails};
pub use items::{
    load_item_sheet, load_item_sheet_csv, load_items, load_items_csv, parse_item_selection,
    select_items, ItemSheet, LineItem, SheetHeading,
};
pub use prices::ReferencePrices;
pub use config::PipelineConfig;
pub use pipeline::{CostPipeline, ItemCosting};
pub use report::{BatchReport, BatchTotals, CategoryCounts};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
