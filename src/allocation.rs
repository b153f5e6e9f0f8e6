// ⚖️ Allocation Engine - from a tax-inclusive total to a full cost breakdown
//
// Two stages:
//   1. Summary: CU+IVA → IVA, CU → CDT, GG, BEL   (CDT + GG + BEL = CU)
//   2. Parts:   CDT → D, E, F → A, B               (D + E + F = CDT, A + B = D)
//
// Every stage works on whole, non-negative amounts. Where independent
// rounded shares could disagree with their total, one share is designated
// as the remainder absorber (GG in the summary, E then D in the parts).

use crate::classifier::ItemCategory;
use crate::money::{div_round_half_up, round_half_up, Amount, Rate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// D:E weights applied to the CDT remainder after transport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitWeights {
    pub execution: f64,
    pub materials: f64,
}

impl SplitWeights {
    pub const fn new(execution: f64, materials: f64) -> Self {
        SplitWeights {
            execution,
            materials,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// IVA = CU+IVA / divisor (11 for a 10% VAT)
    pub vat_divisor: u64,

    /// Theoretical CDT share of CU
    pub direct_cost_rate: Rate,

    /// Theoretical BEL share of CU
    pub levy_rate: Rate,

    /// Informational only: GG is always the residual of CU - CDT - BEL
    pub general_expenses_rate: Rate,

    /// F share of CDT, independent of category
    pub transport_rate: Rate,

    /// A share of D for items with labor
    pub equipment_rate: Rate,

    pub materials_split: SplitWeights,
    pub ambiguous_split: SplitWeights,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        AllocationConfig {
            vat_divisor: 11,
            direct_cost_rate: Rate::from_basis_points(7_500),
            levy_rate: Rate::from_basis_points(1_000),
            general_expenses_rate: Rate::from_basis_points(1_400),
            transport_rate: Rate::from_basis_points(1_000),
            equipment_rate: Rate::from_basis_points(1_000),
            materials_split: SplitWeights::new(5.0, 85.0),
            ambiguous_split: SplitWeights::new(45.0, 40.0),
        }
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// Summary buckets derived from the tax-inclusive total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummaryBreakdown {
    pub cu_iva: Amount,
    pub iva: Amount,
    pub cu: Amount,
    pub cdt: Amount,
    pub gg: Amount,
    pub bel: Amount,
}

/// Sub-totals of the direct cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartsBreakdown {
    pub cdt: Amount,
    /// Equipment
    pub a: Amount,
    /// Labor
    pub b: Amount,
    /// Production, always A + B
    pub ab: Amount,
    /// Execution
    pub d: Amount,
    /// Materials
    pub e: Amount,
    /// Transport
    pub f: Amount,
}

/// Full breakdown for one line item. Built once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    #[serde(rename = "CU_IVA")]
    pub cu_iva: Amount,
    #[serde(rename = "IVA")]
    pub iva: Amount,
    #[serde(rename = "CU")]
    pub cu: Amount,
    #[serde(rename = "CDT")]
    pub cdt: Amount,
    #[serde(rename = "GG")]
    pub gg: Amount,
    #[serde(rename = "BEL")]
    pub bel: Amount,
    #[serde(rename = "AB")]
    pub ab: Amount,
    #[serde(rename = "D")]
    pub d: Amount,
    #[serde(rename = "E")]
    pub e: Amount,
    #[serde(rename = "F")]
    pub f: Amount,
    #[serde(rename = "A")]
    pub a: Amount,
    #[serde(rename = "B")]
    pub b: Amount,
}

impl CostBreakdown {
    pub fn from_stages(summary: &SummaryBreakdown, parts: &PartsBreakdown) -> Self {
        CostBreakdown {
            cu_iva: summary.cu_iva,
            iva: summary.iva,
            cu: summary.cu,
            cdt: summary.cdt,
            gg: summary.gg,
            bel: summary.bel,
            ab: parts.ab,
            d: parts.d,
            e: parts.e,
            f: parts.f,
            a: parts.a,
            b: parts.b,
        }
    }

    /// Field values in canonical order, paired with their labels.
    pub fn fields(&self) -> [(&'static str, Amount); 12] {
        [
            ("CU_IVA", self.cu_iva),
            ("IVA", self.iva),
            ("CU", self.cu),
            ("CDT", self.cdt),
            ("GG", self.gg),
            ("BEL", self.bel),
            ("AB", self.ab),
            ("D", self.d),
            ("E", self.e),
            ("F", self.f),
            ("A", self.a),
            ("B", self.b),
        ]
    }

    /// Every sum identity that must hold; empty when the breakdown is sound.
    pub fn violations(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let sum = |xs: &[Amount]| xs.iter().map(|&x| x as u128).sum::<u128>();

        if sum(&[self.cu, self.iva]) != self.cu_iva as u128 {
            issues.push(format!("CU + IVA = {} + {} != CU_IVA {}", self.cu, self.iva, self.cu_iva));
        }
        if sum(&[self.cdt, self.gg, self.bel]) != self.cu as u128 {
            issues.push(format!(
                "CDT + GG + BEL = {} + {} + {} != CU {}",
                self.cdt, self.gg, self.bel, self.cu
            ));
        }
        if sum(&[self.d, self.e, self.f]) != self.cdt as u128 {
            issues.push(format!(
                "D + E + F = {} + {} + {} != CDT {}",
                self.d, self.e, self.f, self.cdt
            ));
        }
        if sum(&[self.a, self.b]) != self.d as u128 {
            issues.push(format!("A + B = {} + {} != D {}", self.a, self.b, self.d));
        }
        if self.ab != self.d {
            issues.push(format!("AB {} != D {}", self.ab, self.d));
        }

        issues
    }

    pub fn is_balanced(&self) -> bool {
        self.violations().is_empty()
    }

    /// SHA-256 over the canonical field sequence. Identical inputs always
    /// give identical fingerprints.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (label, value) in self.fields() {
            hasher.update(format!("{}={};", label, value));
        }
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// APPORTIONMENT (largest remainder)
// ============================================================================

/// Split `total` into integer parts proportional to `weights`, summing
/// exactly to `total`.
///
/// Negative or non-finite weights count as zero. If no weight is positive
/// the whole total goes to the first part. An empty weight list yields an
/// empty split.
pub fn apportion(total: Amount, weights: &[f64]) -> Vec<Amount> {
    let k = weights.len();
    if k == 0 {
        return Vec::new();
    }

    let weights: Vec<f64> = weights
        .iter()
        .map(|&w| if w.is_finite() && w > 0.0 { w } else { 0.0 })
        .collect();
    let weight_sum: f64 = weights.iter().sum();

    let mut parts = vec![0; k];
    if total == 0 {
        return parts;
    }
    if !(weight_sum > 0.0) || !weight_sum.is_finite() {
        parts[0] = total;
        return parts;
    }

    // Provisional floors and their fractional remainders
    let mut fractions = vec![0.0; k];
    for i in 0..k {
        let share = total as f64 * (weights[i] / weight_sum);
        let floor = share.floor();
        parts[i] = (floor as Amount).min(total);
        fractions[i] = (share - floor).clamp(0.0, 1.0);
    }

    // Largest fractional remainder first, ties by original index
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&x, &y| {
        fractions[y]
            .partial_cmp(&fractions[x])
            .unwrap_or(Ordering::Equal)
            .then(x.cmp(&y))
    });

    let allocated: u128 = parts.iter().map(|&p| p as u128).sum();
    let target = total as u128;

    if allocated < target {
        let mut residue = target - allocated;
        let mut ranked = order.iter().copied().chain((0..k).cycle());
        while residue > 0 {
            match ranked.next() {
                Some(i) => {
                    parts[i] += 1;
                    residue -= 1;
                }
                None => break,
            }
        }
    } else if allocated > target {
        trim_excess(&mut parts, &order, allocated - target);
    }

    parts
}

/// Safety net for float pathologies: take units back from the parts with
/// the smallest remainders first.
fn trim_excess(parts: &mut [Amount], order: &[usize], mut excess: u128) {
    let k = order.len();
    let mut step = 0usize;
    let mut idle = 0usize;

    while excess > 0 && idle < k {
        let i = order[k - 1 - (step % k)];
        step += 1;
        if parts[i] > 0 {
            parts[i] -= 1;
            excess -= 1;
            idle = 0;
        } else {
            idle += 1;
        }
    }
}

/// Two-way split (D, E) by weights.
fn split_pair(total: Amount, weights: SplitWeights) -> (Amount, Amount) {
    let parts = apportion(total, &[weights.execution, weights.materials]);
    (parts[0], parts[1])
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct AllocationEngine {
    config: AllocationConfig,
}

impl AllocationEngine {
    pub fn new(config: AllocationConfig) -> Self {
        AllocationEngine { config }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// VAT backout and CDT / GG / BEL split of a raw tax-inclusive total.
    pub fn derive_summary(&self, total_tax_inclusive: f64) -> SummaryBreakdown {
        let cu_iva = round_half_up(total_tax_inclusive);

        let iva = div_round_half_up(cu_iva, self.config.vat_divisor).min(cu_iva);
        let cu = cu_iva - iva;

        let cdt = self.config.direct_cost_rate.apply_capped(cu);
        let bel = self.config.levy_rate.apply(cu).min(cu - cdt);
        let gg = absorb_general_expenses(cu, cdt, bel);

        SummaryBreakdown {
            cu_iva,
            iva,
            cu,
            cdt,
            gg,
            bel,
        }
    }

    /// Split CDT into D / E / F and D into A / B according to category.
    pub fn derive_parts(&self, cdt: Amount, category: ItemCategory) -> PartsBreakdown {
        let f = self.config.transport_rate.apply_capped(cdt);
        let remainder = cdt - f;

        let (mut d, mut e) = match category {
            ItemCategory::Labor => (remainder, 0),
            ItemCategory::Materials => split_pair(remainder, self.config.materials_split),
            ItemCategory::Ambiguous => split_pair(remainder, self.config.ambiguous_split),
        };

        close_parts_sum(cdt, &mut d, &mut e, f);

        let (a, b) = self.split_execution(d, category);

        PartsBreakdown {
            cdt,
            a,
            b,
            ab: a + b,
            d,
            e,
            f,
        }
    }

    /// Full breakdown for one item.
    pub fn derive(&self, total_tax_inclusive: f64, category: ItemCategory) -> CostBreakdown {
        let summary = self.derive_summary(total_tax_inclusive);
        let parts = self.derive_parts(summary.cdt, category);
        let breakdown = CostBreakdown::from_stages(&summary, &parts);

        debug!(
            category = category.as_str(),
            cu_iva = breakdown.cu_iva,
            cdt = breakdown.cdt,
            d = breakdown.d,
            e = breakdown.e,
            f = breakdown.f,
            "derived cost breakdown"
        );
        debug_assert!(breakdown.is_balanced(), "{:?}", breakdown.violations());

        breakdown
    }

    /// A (equipment) and B (labor) from D. Materials items carry no labor.
    fn split_execution(&self, d: Amount, category: ItemCategory) -> (Amount, Amount) {
        match category {
            ItemCategory::Materials => (d, 0),
            ItemCategory::Labor | ItemCategory::Ambiguous => {
                let a = self.config.equipment_rate.apply_capped(d);
                (a, d - a)
            }
        }
    }
}

/// GG is the residual of CU after CDT and BEL, so the three buckets always
/// sum to CU whatever rounding did to the other two.
fn absorb_general_expenses(cu: Amount, cdt: Amount, bel: Amount) -> Amount {
    cu.saturating_sub(cdt).saturating_sub(bel)
}

/// Force D + E + F == CDT. E absorbs the difference first, then D; any
/// remaining overshoot is shaved off whichever of E or D can take it.
fn close_parts_sum(cdt: Amount, d: &mut Amount, e: &mut Amount, f: Amount) {
    let target = cdt as i128;
    let sum = |d: Amount, e: Amount| d as i128 + e as i128 + f as i128;

    if sum(*d, *e) == target {
        return;
    }

    *e = clamp_to_amount(*e as i128 + (target - sum(*d, *e)));

    if sum(*d, *e) != target {
        *d = clamp_to_amount(*d as i128 + (target - sum(*d, *e)));

        let total = sum(*d, *e);
        if total > target {
            let excess = (total - target) as Amount;
            if *e >= excess {
                *e -= excess;
            } else if *d >= excess {
                *d -= excess;
            }
        }
    }
}

fn clamp_to_amount(value: i128) -> Amount {
    value.clamp(0, Amount::MAX as i128) as Amount
}

/// Summary with the default configuration
pub fn derive_summary(total_tax_inclusive: f64) -> SummaryBreakdown {
    AllocationEngine::default().derive_summary(total_tax_inclusive)
}

/// Parts with the default configuration
pub fn derive_parts(cdt: Amount, category: ItemCategory) -> PartsBreakdown {
    AllocationEngine::default().derive_parts(cdt, category)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_category_shape(parts: &PartsBreakdown, category: ItemCategory) {
        assert_eq!(parts.d + parts.e + parts.f, parts.cdt, "{:?}", parts);
        assert_eq!(parts.a + parts.b, parts.d, "{:?}", parts);
        assert_eq!(parts.ab, parts.d, "{:?}", parts);
        match category {
            ItemCategory::Materials => {
                assert_eq!(parts.b, 0);
                assert_eq!(parts.a, parts.d);
            }
            ItemCategory::Labor => {
                assert_eq!(parts.e, 0);
                assert_eq!(parts.d, parts.cdt - parts.f);
            }
            ItemCategory::Ambiguous => {}
        }
    }

    // ------------------------------------------------------------------
    // apportion
    // ------------------------------------------------------------------

    #[test]
    fn test_apportion_sums_exactly_for_all_small_totals() {
        let weight_sets: [&[f64]; 4] = [&[1.0, 1.0], &[5.0, 85.0], &[45.0, 40.0], &[1.0, 0.0]];

        for weights in weight_sets {
            for total in 0..=10_000u64 {
                let parts = apportion(total, weights);
                assert_eq!(parts.len(), weights.len());
                assert_eq!(parts.iter().sum::<u64>(), total, "total {} weights {:?}", total, weights);
            }
        }
    }

    #[test]
    fn test_apportion_largest_remainder() {
        // 675 * 45/85 = 357.35, 675 * 40/85 = 317.65 → the leftover unit goes to E
        assert_eq!(apportion(675, &[45.0, 40.0]), vec![357, 318]);
        assert_eq!(apportion(900, &[5.0, 85.0]), vec![50, 850]);
        assert_eq!(apportion(10, &[1.0, 0.0]), vec![10, 0]);
    }

    #[test]
    fn test_apportion_ties_go_to_lower_index() {
        assert_eq!(apportion(1, &[1.0, 1.0]), vec![1, 0]);
        assert_eq!(apportion(2, &[1.0, 1.0, 1.0]), vec![1, 1, 0]);
        assert_eq!(apportion(3, &[1.0, 1.0, 1.0]), vec![1, 1, 1]);
        assert_eq!(apportion(5, &[1.0, 1.0, 1.0]), vec![2, 2, 1]);
    }

    #[test]
    fn test_apportion_degenerate_weights() {
        assert!(apportion(10, &[]).is_empty());
        assert_eq!(apportion(10, &[0.0, 0.0]), vec![10, 0]);
        assert_eq!(apportion(10, &[-1.0, f64::NAN]), vec![10, 0]);
        assert_eq!(apportion(10, &[f64::INFINITY, 1.0]), vec![0, 10]);
        assert_eq!(apportion(0, &[3.0, 1.0]), vec![0, 0]);
    }

    #[test]
    fn test_apportion_huge_total_still_closes() {
        for weights in [[45.0, 40.0], [5.0, 85.0], [1.0, 3.0]] {
            let parts = apportion(u64::MAX, &weights);
            let sum: u128 = parts.iter().map(|&p| p as u128).sum();
            assert_eq!(sum, u64::MAX as u128);
        }
    }

    #[test]
    fn test_trim_excess_takes_from_smallest_remainders() {
        let mut parts = vec![5, 0, 3];
        // order: index 2 has the largest remainder, index 0 the smallest
        trim_excess(&mut parts, &[2, 1, 0], 3);
        assert_eq!(parts, vec![3, 0, 2]);
    }

    // ------------------------------------------------------------------
    // summary
    // ------------------------------------------------------------------

    #[test]
    fn test_summary_reference_example() {
        let summary = derive_summary(1100.0);
        assert_eq!(
            summary,
            SummaryBreakdown {
                cu_iva: 1100,
                iva: 100,
                cu: 1000,
                cdt: 750,
                gg: 150,
                bel: 100,
            }
        );
    }

    #[test]
    fn test_summary_rounds_input_half_up() {
        assert_eq!(derive_summary(1099.5).cu_iva, 1100);
        assert_eq!(derive_summary(1099.49).cu_iva, 1099);
    }

    #[test]
    fn test_summary_gg_absorbs_rounding() {
        // CU = 7: CDT = round(5.25) = 5, BEL = round(0.7) = 1, GG = 1
        let summary = derive_summary(8.0);
        assert_eq!(summary.iva, 1);
        assert_eq!(summary.cu, 7);
        assert_eq!(summary.cdt, 5);
        assert_eq!(summary.bel, 1);
        assert_eq!(summary.gg, 1);
    }

    #[test]
    fn test_summary_degenerate_totals_are_zero() {
        for total in [0.0, -500.0, f64::NAN, f64::NEG_INFINITY, f64::INFINITY] {
            assert_eq!(derive_summary(total), SummaryBreakdown::default());
        }
    }

    #[test]
    fn test_summary_bel_capped_by_remaining_cu() {
        let engine = AllocationEngine::new(AllocationConfig {
            direct_cost_rate: Rate::from_fraction(0.95),
            levy_rate: Rate::from_fraction(0.10),
            ..AllocationConfig::default()
        });
        let summary = engine.derive_summary(1100.0);
        assert_eq!(summary.cdt, 950);
        assert_eq!(summary.bel, 50);
        assert_eq!(summary.gg, 0);
    }

    #[test]
    fn test_summary_zero_vat_divisor_means_no_vat() {
        let engine = AllocationEngine::new(AllocationConfig {
            vat_divisor: 0,
            ..AllocationConfig::default()
        });
        let summary = engine.derive_summary(1000.0);
        assert_eq!(summary.iva, 0);
        assert_eq!(summary.cu, 1000);
    }

    // ------------------------------------------------------------------
    // parts
    // ------------------------------------------------------------------

    #[test]
    fn test_parts_ambiguous_reference_example() {
        let parts = derive_parts(750, ItemCategory::Ambiguous);
        assert_eq!(parts.f, 75);
        assert_eq!((parts.d, parts.e), (357, 318));
        assert_eq!(parts.a, 36);
        assert_eq!(parts.b, 321);
        assert_category_shape(&parts, ItemCategory::Ambiguous);
    }

    #[test]
    fn test_parts_materials() {
        let parts = derive_parts(1000, ItemCategory::Materials);
        assert_eq!(parts.f, 100);
        assert_eq!((parts.d, parts.e), (50, 850));
        assert_eq!(parts.b, 0);
        assert_eq!(parts.a, parts.d);
        assert_category_shape(&parts, ItemCategory::Materials);
    }

    #[test]
    fn test_parts_labor() {
        let parts = derive_parts(1000, ItemCategory::Labor);
        assert_eq!(parts.f, 100);
        assert_eq!(parts.e, 0);
        assert_eq!(parts.d, 900);
        assert_eq!(parts.a, 90);
        assert_eq!(parts.b, 810);
        assert_category_shape(&parts, ItemCategory::Labor);
    }

    #[test]
    fn test_parts_transport_independent_of_category() {
        for cdt in [5, 17, 750, 123_457] {
            let fs: Vec<Amount> = ItemCategory::ALL
                .iter()
                .map(|&c| derive_parts(cdt, c).f)
                .collect();
            assert!(fs.iter().all(|&f| f == fs[0]));
            assert!(fs[0] > 0);
        }
    }

    #[test]
    fn test_parts_close_for_every_small_cdt() {
        for cdt in 0..=5_000u64 {
            for category in ItemCategory::ALL {
                assert_category_shape(&derive_parts(cdt, category), category);
            }
        }
    }

    #[test]
    fn test_parts_zero() {
        for category in ItemCategory::ALL {
            let parts = derive_parts(0, category);
            assert_eq!(parts, PartsBreakdown::default());
        }
    }

    #[test]
    fn test_parts_zero_weights_fall_back_to_execution() {
        let engine = AllocationEngine::new(AllocationConfig {
            ambiguous_split: SplitWeights::new(0.0, 0.0),
            ..AllocationConfig::default()
        });
        let parts = engine.derive_parts(1000, ItemCategory::Ambiguous);
        assert_eq!(parts.d, 900);
        assert_eq!(parts.e, 0);
        assert_category_shape(&parts, ItemCategory::Ambiguous);
    }

    // ------------------------------------------------------------------
    // repair
    // ------------------------------------------------------------------

    #[test]
    fn test_close_parts_sum_adjusts_e_first() {
        let (mut d, mut e) = (50, 840);
        close_parts_sum(1000, &mut d, &mut e, 100);
        assert_eq!((d, e), (50, 850));
    }

    #[test]
    fn test_close_parts_sum_falls_back_to_d() {
        // E cannot go below zero, so D gives up the rest
        let (mut d, mut e) = (950, 3);
        close_parts_sum(1000, &mut d, &mut e, 100);
        assert_eq!((d, e), (900, 0));
        assert_eq!(d + e + 100, 1000);
    }

    #[test]
    fn test_close_parts_sum_noop_when_balanced() {
        let (mut d, mut e) = (357, 318);
        close_parts_sum(750, &mut d, &mut e, 75);
        assert_eq!((d, e), (357, 318));
    }

    // ------------------------------------------------------------------
    // full breakdown
    // ------------------------------------------------------------------

    #[test]
    fn test_derive_end_to_end() {
        let engine = AllocationEngine::default();
        let breakdown = engine.derive(1100.0, ItemCategory::Ambiguous);

        assert_eq!(breakdown.cu_iva, 1100);
        assert_eq!(breakdown.iva, 100);
        assert_eq!(breakdown.cu, 1000);
        assert_eq!(breakdown.cdt, 750);
        assert_eq!(breakdown.gg, 150);
        assert_eq!(breakdown.bel, 100);
        assert_eq!(breakdown.f, 75);
        assert_eq!(breakdown.d, 357);
        assert_eq!(breakdown.e, 318);
        assert_eq!(breakdown.a, 36);
        assert_eq!(breakdown.b, 321);
        assert_eq!(breakdown.ab, 357);
        assert!(breakdown.is_balanced());
    }

    #[test]
    fn test_breakdown_serializes_with_domain_labels() {
        let breakdown = AllocationEngine::default().derive(1100.0, ItemCategory::Labor);
        let json = serde_json::to_value(breakdown).unwrap();
        assert_eq!(json["CU_IVA"], 1100);
        assert_eq!(json["E"], 0);
        assert_eq!(json.as_object().unwrap().len(), 12);
    }

    #[test]
    fn test_violations_reported() {
        let mut breakdown = AllocationEngine::default().derive(1100.0, ItemCategory::Labor);
        assert!(breakdown.violations().is_empty());

        breakdown.e += 1;
        let issues = breakdown.violations();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("D + E + F"));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let engine = AllocationEngine::default();
        let first = engine.derive(2_345_678.0, ItemCategory::Materials);
        let second = engine.derive(2_345_678.0, ItemCategory::Materials);
        assert_eq!(first, second);
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.fingerprint().len(), 64);

        let other = engine.derive(2_345_678.0, ItemCategory::Labor);
        assert_ne!(first.fingerprint(), other.fingerprint());
    }

    proptest! {
        #[test]
        fn breakdown_invariants_hold_for_any_raw_total(
            total in proptest::num::f64::ANY,
            category_index in 0usize..3,
        ) {
            let category = ItemCategory::ALL[category_index];
            let breakdown = AllocationEngine::default().derive(total, category);

            prop_assert!(breakdown.is_balanced(), "{:?}", breakdown.violations());
            match category {
                ItemCategory::Materials => {
                    prop_assert_eq!(breakdown.b, 0);
                    prop_assert_eq!(breakdown.a, breakdown.d);
                }
                ItemCategory::Labor => {
                    prop_assert_eq!(breakdown.e, 0);
                }
                ItemCategory::Ambiguous => {}
            }
        }

        #[test]
        fn parts_close_for_any_cdt(cdt in any::<u64>(), category_index in 0usize..3) {
            let category = ItemCategory::ALL[category_index];
            let parts = derive_parts(cdt, category);

            prop_assert_eq!(parts.d as u128 + parts.e as u128 + parts.f as u128, cdt as u128);
            prop_assert_eq!(parts.a + parts.b, parts.d);
            prop_assert_eq!(parts.ab, parts.d);
        }

        #[test]
        fn apportion_closes_for_any_positive_weights(
            total in 0u64..1_000_000_000_000,
            weights in prop::collection::vec(0.001f64..1_000.0, 1..6),
        ) {
            let parts = apportion(total, &weights);
            prop_assert_eq!(parts.len(), weights.len());
            prop_assert_eq!(parts.iter().map(|&p| p as u128).sum::<u128>(), total as u128);
        }
    }
}
