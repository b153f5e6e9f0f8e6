// 🖨️ Display Texts - descriptive lines that accompany the numbers
//
// These never feed the allocation math. They only tell downstream rendering
// what to print next to each part and whether a labor or materials line
// applies at all.

use crate::catalog::{CatalogEntry, FALLBACK_EQUIPMENT_TEXT, FALLBACK_MATERIALS_TEXT};
use crate::classifier::ItemCategory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Used when the matched entry has no tools text
    pub equipment_fallback: String,

    /// Used when the matched entry has no materials text
    pub materials_fallback: String,

    /// Crew description for items with labor
    pub labor_text: String,

    /// Always printed on the transport line
    pub transport_text: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            equipment_fallback: FALLBACK_EQUIPMENT_TEXT.to_string(),
            materials_fallback: FALLBACK_MATERIALS_TEXT.to_string(),
            labor_text: "supervisor, skilled technicians and assistant technicians".to_string(),
            transport_text: "land transport".to_string(),
        }
    }
}

/// Texts for the four descriptive lines of a breakdown. A blank string
/// means "no such line for this item".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayTexts {
    pub equipment: String,
    pub labor: String,
    pub materials: String,
    pub transport: String,
}

impl DisplayTexts {
    pub fn build(entry: &CatalogEntry, category: ItemCategory, config: &DisplayConfig) -> Self {
        let or_fallback = |text: &str, fallback: &str| {
            let text = text.trim();
            if text.is_empty() {
                fallback.to_string()
            } else {
                text.to_string()
            }
        };

        let labor = if category.has_labor() {
            config.labor_text.clone()
        } else {
            String::new()
        };

        let materials = if category.has_materials() {
            or_fallback(&entry.materials_text, &config.materials_fallback)
        } else {
            String::new()
        };

        DisplayTexts {
            equipment: or_fallback(&entry.equipment_text, &config.equipment_fallback),
            labor,
            materials,
            transport: config.transport_text.clone(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
