// 🔗 Cost Pipeline - description + total → category, catalog texts, breakdown
//
// Data flow per item:
//   description ──► classifier ──► category ─┐
//   description ──► matcher ──► display texts │
//   total ─────────────────────────────────────┴─► allocation ──► breakdown ──► details
//
// Items are independent: no shared mutable state, no ordering between them.

use crate::allocation::{AllocationEngine, CostBreakdown};
use crate::catalog::Catalog;
use crate::classifier::{ItemCategory, TextClassifier};
use crate::config::PipelineConfig;
use crate::details::{DetailConfig, LineDetails};
use crate::display::{DisplayConfig, DisplayTexts};
use crate::items::LineItem;
use crate::matcher::{CatalogMatcher, MatchSummary};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

// ============================================================================
// RESULT
// ============================================================================

/// Everything derived for one line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCosting {
    pub item: String,
    pub description: String,
    pub quantity: f64,
    pub category: ItemCategory,

    /// Keyword or prefix that decided the category
    pub classified_by: Option<String>,

    pub matched: MatchSummary,
    pub breakdown: CostBreakdown,
    pub texts: DisplayTexts,
    pub details: LineDetails,
}

// ============================================================================
// PIPELINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct CostPipeline {
    classifier: TextClassifier,
    matcher: CatalogMatcher,
    engine: AllocationEngine,
    display: DisplayConfig,
    details: DetailConfig,
}

impl CostPipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        CostPipeline {
            classifier: TextClassifier::from_rules(&config.classifier),
            matcher: CatalogMatcher::new(config.matcher),
            engine: AllocationEngine::new(config.allocation.clone()),
            display: config.display.clone(),
            details: config.details.clone(),
        }
    }

    pub fn classifier(&self) -> &TextClassifier {
        &self.classifier
    }

    pub fn engine(&self) -> &AllocationEngine {
        &self.engine
    }

    /// Breakdown from a raw total and a description, no catalog involved
    pub fn breakdown(&self, total_tax_inclusive: f64, description: &str) -> (ItemCategory, CostBreakdown) {
        let category = self.classifier.classify(description);
        (category, self.engine.derive(total_tax_inclusive, category))
    }

    /// Full evaluation of one item. `seed` only varies the detail-line
    /// choices; the breakdown never depends on it.
    pub fn cost_item(&self, item: &LineItem, catalog: &Catalog, seed: u64) -> ItemCosting {
        let classification = self.classifier.classify_with_rule(&item.description);
        let category = classification.category;

        let matched = self.matcher.best_match(&item.description, catalog);
        let texts = DisplayTexts::build(matched.entry, category, &self.display);

        let breakdown = self.engine.derive(item.resolved_total(), category);
        let quantity = item.quantity_or_zero();
        let details = LineDetails::derive(&breakdown, quantity, seed, &self.details);

        debug!(
            item = item.item.as_str(),
            category = category.as_str(),
            cu_iva = breakdown.cu_iva,
            matched_default = matched.is_default,
            "item costed"
        );

        ItemCosting {
            item: item.item.clone(),
            description: item.description.clone(),
            quantity,
            category,
            classified_by: classification.matched_rule,
            matched: MatchSummary::from(&matched),
            breakdown,
            texts,
            details,
        }
    }

    /// Evaluate a batch; output order follows input order and the seed of
    /// each item is its 1-based position.
    pub fn cost_items(&self, items: &[LineItem], catalog: &Catalog) -> Vec<ItemCosting> {
        let costed = self.evaluate(items, catalog);
        info!(items = costed.len(), "batch costed");
        costed
    }

    #[cfg(feature = "parallel")]
    fn evaluate(&self, items: &[LineItem], catalog: &Catalog) -> Vec<ItemCosting> {
        items
            .par_iter()
            .enumerate()
            .map(|(i, item)| self.cost_item(item, catalog, i as u64 + 1))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn evaluate(&self, items: &[LineItem], catalog: &Catalog) -> Vec<ItemCosting> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.cost_item(item, catalog, i as u64 + 1))
            .collect()
    }
}

impl Default for CostPipeline {
    fn default() -> Self {
        CostPipeline::new(&PipelineConfig::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_rows(vec![
            ("Bomba centrífuga", "Llaves y extractor", "Sellos mecánicos"),
            ("Cable", "Pinzas", ""),
            ("DEFAULT", "Herramientas de mano", "Insumos y materiales"),
        ])
    }

    #[test]
    fn test_cost_item_end_to_end() {
        let pipeline = CostPipeline::default();
        let item = LineItem::new("1", "Bomba centrífuga 5HP").with_quantity(2.0).with_total_price(1100.0);

        let costed = pipeline.cost_item(&item, &catalog(), 1);

        assert_eq!(costed.category, ItemCategory::Ambiguous);
        assert_eq!(costed.classified_by, None);
        assert!(!costed.matched.is_default);
        assert_eq!(costed.texts.equipment, "Llaves y extractor");
        assert_eq!(costed.texts.materials, "Sellos mecánicos");
        assert!(!costed.texts.labor.is_empty());

        let b = costed.breakdown;
        assert_eq!((b.cu_iva, b.iva, b.cu), (1100, 100, 1000));
        assert_eq!((b.cdt, b.gg, b.bel), (750, 150, 100));
        assert_eq!((b.d, b.e, b.f), (357, 318, 75));
        assert_eq!((b.a, b.b), (36, 321));

        assert_eq!(costed.details.labor.unwrap().workers, 2);
        assert_eq!(costed.details.materials.unwrap().total, 318);
    }

    #[test]
    fn test_materials_item_uses_catalog_default_texts() {
        let pipeline = CostPipeline::default();
        let item = LineItem::new("2", "Provisión de pintura látex").with_total_price(5500.0);

        let costed = pipeline.cost_item(&item, &catalog(), 2);

        assert_eq!(costed.category, ItemCategory::Materials);
        assert_eq!(costed.classified_by.as_deref(), Some("provision de"));
        assert!(costed.matched.is_default);
        assert_eq!(costed.texts.equipment, "Herramientas de mano");
        assert_eq!(costed.texts.labor, "");
        assert_eq!(costed.breakdown.b, 0);
        assert!(costed.details.labor.is_none());
    }

    #[test]
    fn test_blank_matched_materials_text_falls_back() {
        let pipeline = CostPipeline::default();
        let item = LineItem::new("3", "Cable unipolar 6mm").with_total_price(2200.0);

        let costed = pipeline.cost_item(&item, &catalog(), 3);
        assert_eq!(costed.texts.equipment, "Pinzas");
        assert_eq!(costed.texts.materials, "supplies and materials");
    }

    #[test]
    fn test_total_derived_from_unit_price() {
        let pipeline = CostPipeline::default();
        let item = LineItem::new("4", "Mantenimiento de bomba").with_quantity(2.0).with_unit_price(550.0);

        let costed = pipeline.cost_item(&item, &catalog(), 4);
        assert_eq!(costed.category, ItemCategory::Labor);
        assert_eq!(costed.breakdown.cu_iva, 1100);
        assert_eq!(costed.breakdown.e, 0);
    }

    #[test]
    fn test_missing_or_corrupt_totals_are_zero() {
        let pipeline = CostPipeline::default();
        let items = vec![
            LineItem::new("5", "Cable"),
            LineItem::new("6", "Cable").with_total_price(-4000.0),
            LineItem::new("7", "Cable").with_unit_price(-10.0).with_quantity(3.0),
        ];

        for costed in pipeline.cost_items(&items, &catalog()) {
            assert_eq!(costed.breakdown, CostBreakdown::default());
            assert!(costed.breakdown.is_balanced());
        }
    }

    #[test]
    fn test_batch_preserves_order_and_is_repeatable() {
        let pipeline = CostPipeline::default();
        let items: Vec<LineItem> = (1..=40)
            .map(|i| {
                LineItem::new(&i.to_string(), "Bomba centrífuga")
                    .with_quantity(i as f64)
                    .with_total_price(i as f64 * 12_345.0)
            })
            .collect();

        let first = pipeline.cost_items(&items, &catalog());
        let second = pipeline.cost_items(&items, &catalog());

        assert_eq!(first, second);
        for (costed, item) in first.iter().zip(&items) {
            assert_eq!(costed.item, item.item);
            assert!(costed.breakdown.is_balanced());
        }
    }

    #[test]
    fn test_breakdown_without_catalog() {
        let (category, breakdown) = CostPipeline::default().breakdown(1100.0, "Instalación de tablero");
        assert_eq!(category, ItemCategory::Labor);
        assert_eq!(breakdown.d, 675);
        assert_eq!(breakdown.a, 68);
        assert_eq!(breakdown.b, 607);
    }
}
