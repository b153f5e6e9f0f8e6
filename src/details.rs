// 🧾 Detail Lines - per-part figures shown under each sub-total
//
// Each detail restates its part's total as (count × unit) figures. Where a
// count has to be chosen (hours, a transport unit cost) the choice is a
// SHA-256 derived index of the item seed: varied across items, identical
// across runs.

use crate::allocation::CostBreakdown;
use crate::money::{at_least_one, div_round_half_up, round_half_up, Amount};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Widest range a configuration may ask for; candidate values are enumerated
pub const MAX_RANGE_WIDTH: u64 = 100_000;

/// Inclusive range of whole numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRange {
    pub min: u64,
    pub max: u64,
}

impl UnitRange {
    pub const fn new(min: u64, max: u64) -> Self {
        UnitRange { min, max }
    }

    /// Ordered, and never starting below 1
    fn sanitized(&self) -> UnitRange {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        UnitRange::new(lo.max(1), hi.max(1))
    }

    fn values(&self) -> impl Iterator<Item = u64> {
        let r = self.sanitized();
        r.min..=r.max
    }

    /// Number of whole values in the (sanitized) range
    pub fn width(&self) -> u64 {
        let r = self.sanitized();
        r.max - r.min + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailConfig {
    /// Hours the equipment is used (A)
    pub equipment_hours: UnitRange,

    /// Hours per worker (B)
    pub labor_hours: UnitRange,

    /// Transport unit cost (F)
    pub transport_unit_cost: UnitRange,

    /// Transport consumption per distance unit (F)
    pub transport_consumption: f64,
}

impl Default for DetailConfig {
    fn default() -> Self {
        DetailConfig {
            equipment_hours: UnitRange::new(2, 10),
            labor_hours: UnitRange::new(1, 3),
            transport_unit_cost: UnitRange::new(8_000, 11_000),
            transport_consumption: 0.05,
        }
    }
}

// ============================================================================
// DETAIL RECORDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentDetail {
    pub hours: u64,
    pub hourly_cost: Amount,
    pub total: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborDetail {
    pub workers: u64,
    pub hours_per_worker: u64,
    pub unit_cost: Amount,
    pub total: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialsDetail {
    pub consumption: u64,
    pub unit_cost: Amount,
    pub total: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportDetail {
    /// Distance implied by total / (consumption × unit cost)
    pub distance: f64,
    pub consumption: f64,
    pub unit_cost: Amount,
    pub total: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDetails {
    pub equipment: EquipmentDetail,

    /// Only when B > 0
    pub labor: Option<LaborDetail>,

    /// Only when E > 0
    pub materials: Option<MaterialsDetail>,

    pub transport: TransportDetail,
}

impl LineDetails {
    /// Details for one breakdown. `quantity` is the item quantity from the
    /// source sheet (workers for labor, consumption for materials).
    pub fn derive(
        breakdown: &CostBreakdown,
        quantity: f64,
        seed: u64,
        config: &DetailConfig,
    ) -> Self {
        let workers = round_half_up(quantity).max(1);

        LineDetails {
            equipment: equipment_detail(breakdown.a, seed, config),
            labor: labor_detail(breakdown.b, workers, seed, config),
            materials: materials_detail(breakdown.e, workers),
            transport: transport_detail(breakdown.f, seed, config),
        }
    }
}

// ============================================================================
// DERIVATION
// ============================================================================

/// Deterministic index in `0..len` for a seed and purpose.
fn seeded_index(seed: u64, purpose: &str, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let mut hasher = Sha256::new();
    hasher.update(purpose.as_bytes());
    hasher.update(seed.to_le_bytes());
    let digest = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_le_bytes(head) % len as u64) as usize
}

/// Prefer values that divide `total` exactly; otherwise any value in range.
fn choose_divisor(total: Amount, range: UnitRange, step: u64, seed: u64, purpose: &str) -> u64 {
    let exact: Vec<u64> = range
        .values()
        .filter(|h| match h.checked_mul(step) {
            Some(unit) => unit > 0 && total % unit == 0,
            None => false,
        })
        .collect();

    if !exact.is_empty() {
        return exact[seeded_index(seed, purpose, exact.len())];
    }

    let r = range.sanitized();
    r.min + seeded_index(seed, purpose, range.width() as usize) as u64
}

fn equipment_detail(total: Amount, seed: u64, config: &DetailConfig) -> EquipmentDetail {
    let hours = choose_divisor(total, config.equipment_hours, 1, seed, "equipment");
    EquipmentDetail {
        hours,
        hourly_cost: total / hours,
        total,
    }
}

fn labor_detail(total: Amount, workers: u64, seed: u64, config: &DetailConfig) -> Option<LaborDetail> {
    if total == 0 {
        return None;
    }
    let hours = choose_divisor(total, config.labor_hours, workers, seed, "labor");
    let unit_cost = at_least_one(div_round_half_up(total, workers.saturating_mul(hours)), total);

    Some(LaborDetail {
        workers,
        hours_per_worker: hours,
        unit_cost,
        total,
    })
}

fn materials_detail(total: Amount, consumption: u64) -> Option<MaterialsDetail> {
    if total == 0 {
        return None;
    }
    Some(MaterialsDetail {
        consumption,
        unit_cost: at_least_one(div_round_half_up(total, consumption), total),
        total,
    })
}

fn transport_detail(total: Amount, seed: u64, config: &DetailConfig) -> TransportDetail {
    let range = config.transport_unit_cost.sanitized();
    let unit_cost = range.min + seeded_index(seed, "transport", range.width() as usize) as u64;

    let consumption = if config.transport_consumption.is_finite() && config.transport_consumption > 0.0 {
        config.transport_consumption
    } else {
        0.0
    };

    let denominator = consumption * unit_cost as f64;
    let distance = if denominator > 0.0 {
        total as f64 / denominator
    } else {
        0.0
    };

    TransportDetail {
        distance,
        consumption,
        unit_cost,
        total,
    }
}

// ============================================================================
// TESTS
// ============================================================================
