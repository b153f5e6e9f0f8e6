// 📊 Batch Report - costed items plus run metadata and totals

use crate::allocation::CostBreakdown;
use crate::classifier::ItemCategory;
use crate::items::SheetHeading;
use crate::money::{format_thousands, Amount};
use crate::pipeline::ItemCosting;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Field-wise sums over a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchTotals {
    pub cu_iva: Amount,
    pub iva: Amount,
    pub cu: Amount,
    pub cdt: Amount,
    pub gg: Amount,
    pub bel: Amount,
    pub a: Amount,
    pub b: Amount,
    pub d: Amount,
    pub e: Amount,
    pub f: Amount,
}

impl BatchTotals {
    fn add(&mut self, b: &CostBreakdown) {
        self.cu_iva = self.cu_iva.saturating_add(b.cu_iva);
        self.iva = self.iva.saturating_add(b.iva);
        self.cu = self.cu.saturating_add(b.cu);
        self.cdt = self.cdt.saturating_add(b.cdt);
        self.gg = self.gg.saturating_add(b.gg);
        self.bel = self.bel.saturating_add(b.bel);
        self.a = self.a.saturating_add(b.a);
        self.b = self.b.saturating_add(b.b);
        self.d = self.d.saturating_add(b.d);
        self.e = self.e.saturating_add(b.e);
        self.f = self.f.saturating_add(b.f);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub materials: usize,
    pub labor: usize,
    pub ambiguous: usize,
}

impl CategoryCounts {
    pub fn get(&self, category: ItemCategory) -> usize {
        match category {
            ItemCategory::Materials => self.materials,
            ItemCategory::Labor => self.labor,
            ItemCategory::Ambiguous => self.ambiguous,
        }
    }

    fn bump(&mut self, category: ItemCategory) {
        match category {
            ItemCategory::Materials => self.materials += 1,
            ItemCategory::Labor => self.labor += 1,
            ItemCategory::Ambiguous => self.ambiguous += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,

    /// Tender title and lot text of the source sheet, blank when unknown
    #[serde(default)]
    pub heading: SheetHeading,

    pub items: Vec<ItemCosting>,
    pub category_counts: CategoryCounts,

    /// Items that fell back to the catalog default entry
    pub default_matches: usize,

    pub totals: BatchTotals,

    /// SHA-256 over every item's breakdown fingerprint, in order. Equal
    /// inputs give equal digests across runs.
    pub digest: String,
}

impl BatchReport {
    pub fn new(items: Vec<ItemCosting>) -> Self {
        let mut category_counts = CategoryCounts::default();
        let mut totals = BatchTotals::default();
        let mut default_matches = 0;
        let mut hasher = Sha256::new();

        for costed in &items {
            category_counts.bump(costed.category);
            totals.add(&costed.breakdown);
            if costed.matched.is_default {
                default_matches += 1;
            }
            hasher.update(costed.item.as_bytes());
            hasher.update(costed.breakdown.fingerprint().as_bytes());
        }

        BatchReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            heading: SheetHeading::default(),
            items,
            category_counts,
            default_matches,
            totals,
            digest: format!("{:x}", hasher.finalize()),
        }
    }

    pub fn with_heading(mut self, heading: SheetHeading) -> Self {
        self.heading = heading;
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items whose breakdown breaks a sum identity (should always be empty)
    pub fn unbalanced(&self) -> Vec<&ItemCosting> {
        self.items.iter().filter(|c| !c.breakdown.is_balanced()).collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} items ({} materials, {} labor, {} ambiguous) | CU+IVA {} | CDT {} | {} default catalog matches",
            self.items.len(),
            self.category_counts.materials,
            self.category_counts.labor,
            self.category_counts.ambiguous,
            format_thousands(self.totals.cu_iva),
            format_thousands(self.totals.cdt),
            self.default_matches
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
