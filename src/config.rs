// ⚙️ Pipeline Configuration - JSON file + environment overrides
//
// Every section has serde defaults, so a config file only needs the keys it
// changes. Environment variables win over the file.

use crate::allocation::AllocationConfig;
use crate::classifier::ClassifierRules;
use crate::details::{DetailConfig, MAX_RANGE_WIDTH};
use crate::display::DisplayConfig;
use crate::matcher::MatcherConfig;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub const ENV_MATCH_THRESHOLD: &str = "COSTING_MATCH_THRESHOLD";
pub const ENV_VAT_DIVISOR: &str = "COSTING_VAT_DIVISOR";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub allocation: AllocationConfig,
    pub matcher: MatcherConfig,
    pub classifier: ClassifierRules,
    pub display: DisplayConfig,
    pub details: DetailConfig,
}

impl PipelineConfig {
    /// Load from a JSON file (missing keys take their defaults)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: PipelineConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults or the given file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                info!(path = ?p, "loading pipeline config");
                PipelineConfig::from_file(p)?
            }
            None => PipelineConfig::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// `COSTING_MATCH_THRESHOLD` and `COSTING_VAT_DIVISOR` from the process
    /// environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a key lookup. Unparseable values are ignored
    /// with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MATCH_THRESHOLD) {
            match raw.trim().parse::<f64>() {
                Ok(v) => self.matcher.threshold = v,
                Err(_) => warn!(key = ENV_MATCH_THRESHOLD, value = raw.as_str(), "ignoring invalid override"),
            }
        }

        if let Some(raw) = lookup(ENV_VAT_DIVISOR) {
            match raw.trim().parse::<u64>() {
                Ok(v) => self.allocation.vat_divisor = v,
                Err(_) => warn!(key = ENV_VAT_DIVISOR, value = raw.as_str(), "ignoring invalid override"),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.matcher.threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            bail!("matcher.threshold must be within 0..=1, got {}", threshold);
        }
        if self.allocation.vat_divisor == 0 {
            bail!("allocation.vat_divisor must be positive");
        }

        let ranges = [
            ("details.equipment_hours", self.details.equipment_hours),
            ("details.labor_hours", self.details.labor_hours),
            ("details.transport_unit_cost", self.details.transport_unit_cost),
        ];
        for (name, range) in ranges {
            if range.width() > MAX_RANGE_WIDTH {
                bail!(
                    "{} spans {} values, at most {} allowed",
                    name,
                    range.width(),
                    MAX_RANGE_WIDTH
                );
            }
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::UnitRange;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.matcher.threshold, 0.80);
        assert_eq!(config.allocation.vat_divisor, 11);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "matcher": { "threshold": 0.6 },
                "allocation": { "direct_cost_rate": 0.7 },
                "display": { "transport_text": "Transporte terrestre" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.matcher.threshold, 0.6);
        assert_eq!(config.allocation.direct_cost_rate.basis_points(), 7_000);
        assert_eq!(config.allocation.vat_divisor, 11);
        assert_eq!(config.display.transport_text, "Transporte terrestre");
        assert_eq!(config.classifier, ClassifierRules::default());
    }

    #[test]
    fn test_overrides() {
        let mut config = PipelineConfig::default();
        config.apply_overrides(lookup(&[
            (ENV_MATCH_THRESHOLD, "0.9"),
            (ENV_VAT_DIVISOR, " 21 "),
        ]));
        assert_eq!(config.matcher.threshold, 0.9);
        assert_eq!(config.allocation.vat_divisor, 21);
    }

    #[test]
    fn test_invalid_overrides_ignored() {
        let mut config = PipelineConfig::default();
        config.apply_overrides(lookup(&[
            (ENV_MATCH_THRESHOLD, "high"),
            (ENV_VAT_DIVISOR, "-3"),
        ]));
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.matcher.threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.allocation.vat_divisor = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_caps_range_width() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{ "details": { "labor_hours": { "min": 1, "max": 18446744073709551615 } } }"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("details.labor_hours"));

        let mut config = PipelineConfig::default();
        config.details.equipment_hours = UnitRange::new(1, MAX_RANGE_WIDTH);
        assert!(config.validate().is_ok());
        config.details.equipment_hours = UnitRange::new(1, MAX_RANGE_WIDTH + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("costing-config-{}.json", uuid::Uuid::new_v4()));
        let mut file = fs::File::create(&path).unwrap();
        write!(file, r#"{{ "details": {{ "labor_hours": {{ "min": 2, "max": 4 }} }} }}"#).unwrap();
        drop(file);

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.details.labor_hours.min, 2);
        assert_eq!(config.details.labor_hours.max, 4);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_from_file_errors() {
        assert!(PipelineConfig::from_file("/nonexistent/config.json").is_err());

        let path = std::env::temp_dir().join(format!("costing-config-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, "{ not json").unwrap();
        assert!(PipelineConfig::from_file(&path).is_err());
        fs::remove_file(&path).unwrap();
    }
}
