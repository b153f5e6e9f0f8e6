// 🏷️ Item Classifier - Rules as Data
// Decides whether a line item is materials, labor or ambiguous from its description

use crate::text::normalize;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

// ============================================================================
// ITEM CATEGORY
// ============================================================================

/// Cost category of a line item. Selects the split ratios used by the
/// allocation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    /// Supply only, no labor component
    Materials,

    /// Work only, no materials component
    Labor,

    /// Anything the rules cannot place (conservative default)
    Ambiguous,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 3] = [
        ItemCategory::Materials,
        ItemCategory::Labor,
        ItemCategory::Ambiguous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Materials => "materials",
            ItemCategory::Labor => "labor",
            ItemCategory::Ambiguous => "ambiguous",
        }
    }

    /// Parse a category label leniently. Unknown labels fall back to
    /// `Ambiguous`, never an error.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "materials" | "materiales" | "material" | "mat" => ItemCategory::Materials,
            "labor" | "mano de obra" | "mano_obra" | "manoobra" | "mo" | "mano-obra" => {
                ItemCategory::Labor
            }
            _ => ItemCategory::Ambiguous,
        }
    }

    /// True when the item carries a labor line (B may be non-zero).
    pub fn has_labor(&self) -> bool {
        !matches!(self, ItemCategory::Materials)
    }

    /// True when the item carries a materials line (E may be non-zero).
    pub fn has_materials(&self) -> bool {
        !matches!(self, ItemCategory::Labor)
    }
}

impl Default for ItemCategory {
    fn default() -> Self {
        ItemCategory::Ambiguous
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RULE DEFINITION
// ============================================================================

/// Keyword rules. Prefix rules are checked before keyword rules and the
/// first hit wins; there is no scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    /// A description starting with one of these is `Materials`
    /// (two spellings to tolerate a common misspelling)
    pub provision_prefixes: Vec<String>,

    /// A description containing one of these is `Labor`
    pub labor_keywords: Vec<String>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        ClassifierRules {
            provision_prefixes: vec!["provision de".to_string(), "provicion de".to_string()],
            labor_keywords: [
                "mano de obra",
                "montaje",
                "desmontaje",
                "instalacion",
                "colocacion",
                "retiro",
                "reemplazo",
                "mantenimiento",
                "reparacion",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
        }
    }
}

impl ClassifierRules {
    /// Same rules with every pattern normalized, blanks removed.
    fn normalized(&self) -> ClassifierRules {
        fn prepare(patterns: &[String]) -> Vec<String> {
            patterns
                .iter()
                .map(|p| normalize(p))
                .filter(|p| !p.is_empty())
                .collect()
        }

        ClassifierRules {
            provision_prefixes: prepare(&self.provision_prefixes),
            labor_keywords: prepare(&self.labor_keywords),
        }
    }
}

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: ItemCategory,

    /// Normalized prefix or keyword that fired, `None` for the default
    pub matched_rule: Option<String>,
}

impl Default for Classification {
    fn default() -> Self {
        Classification {
            category: ItemCategory::Ambiguous,
            matched_rule: None,
        }
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

#[derive(Debug, Clone)]
pub struct TextClassifier {
    rules: ClassifierRules,
}

impl TextClassifier {
    /// Classifier with the built-in rules
    pub fn new() -> Self {
        TextClassifier::from_rules(&ClassifierRules::default())
    }

    pub fn from_rules(rules: &ClassifierRules) -> Self {
        TextClassifier {
            rules: rules.normalized(),
        }
    }

    /// Load rules from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read classifier rules: {:?}", path.as_ref()))?;

        let rules: ClassifierRules =
            serde_json::from_str(&content).context("Failed to parse classifier rules JSON")?;

        Ok(TextClassifier::from_rules(&rules))
    }

    pub fn rules(&self) -> &ClassifierRules {
        &self.rules
    }

    pub fn classify(&self, description: &str) -> ItemCategory {
        self.classify_with_rule(description).category
    }

    /// Classify and report which rule decided it
    pub fn classify_with_rule(&self, description: &str) -> Classification {
        let text = normalize(description);

        if let Some(prefix) = self
            .rules
            .provision_prefixes
            .iter()
            .find(|p| text.starts_with(p.as_str()))
        {
            return Classification {
                category: ItemCategory::Materials,
                matched_rule: Some(prefix.clone()),
            };
        }

        if let Some(keyword) = self
            .rules
            .labor_keywords
            .iter()
            .find(|k| text.contains(k.as_str()))
        {
            return Classification {
                category: ItemCategory::Labor,
                matched_rule: Some(keyword.clone()),
            };
        }

        Classification::default()
    }
}

impl Default for TextClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify with the built-in rules
pub fn classify(description: &str) -> ItemCategory {
    TextClassifier::new().classify(description)
}

// ============================================================================
// TESTS
// ============================================================================
