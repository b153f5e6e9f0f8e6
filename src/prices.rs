// 💲 Reference Prices - item number → reference unit price
//
// A price report lists estimated or referential unit prices per item. When
// applied to an items sheet it replaces each matching item's unit price, and
// the line total is then unit price × quantity.

use crate::items::{item_number, read_csv_text, sniff_delimiter, LineItem};
use crate::money::parse_amount;
use crate::text::normalize;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferencePrices {
    prices: BTreeMap<u64, f64>,
}

impl ReferencePrices {
    pub fn new() -> Self {
        ReferencePrices::default()
    }

    /// Later pairs for the same item replace earlier ones
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u64, f64)>,
    {
        ReferencePrices {
            prices: pairs.into_iter().collect(),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open price report: {:?}", path.as_ref()))?;
        ReferencePrices::from_reader(file)
            .with_context(|| format!("Failed to load price report: {:?}", path.as_ref()))
    }

    /// Read a `;` or `,` delimited report whose first row is the header.
    /// Rows without a readable item number or price are skipped; the last
    /// row for a repeated item wins.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let content = read_csv_text(reader)?;
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .delimiter(sniff_delimiter(&content))
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = rdr
            .headers()
            .context("Failed to read price report header row")?
            .iter()
            .map(normalize)
            .collect();

        let (col_item, col_price) = match detect_columns(&headers) {
            Some(cols) => cols,
            None => bail!("price report has no item number and unit price columns"),
        };

        let mut prices = BTreeMap::new();
        let mut skipped = 0usize;

        for (line, record) in rdr.records().enumerate() {
            let record =
                record.with_context(|| format!("Failed to read price report row {}", line + 2))?;

            let item = record.get(col_item).and_then(item_number);
            let price = record.get(col_price).and_then(parse_amount);
            match (item, price) {
                (Some(item), Some(price)) => {
                    prices.insert(item, price);
                }
                _ => skipped += 1,
            }
        }

        if prices.is_empty() {
            warn!("price report has no usable rows");
        }
        debug!(prices = prices.len(), skipped, "reference prices loaded");

        Ok(ReferencePrices { prices })
    }

    pub fn get(&self, item: u64) -> Option<f64> {
        self.prices.get(&item).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Set the unit price of every item with a reference price and drop its
    /// line total, so the total follows the reference price. Returns how
    /// many items were repriced.
    pub fn apply(&self, items: &mut [LineItem]) -> usize {
        let mut applied = 0;
        for item in items.iter_mut() {
            if let Some(price) = item.item_number().and_then(|n| self.get(n)) {
                item.unit_price = Some(price);
                item.total_price = None;
                applied += 1;
            }
        }
        debug!(applied, items = items.len(), "reference prices applied");
        applied
    }
}

/// Item column: `numero`, `nro`, `item...` or anything containing
/// `numero`. Price column: a unit price header, preferring an estimated or
/// referential one.
fn detect_columns(headers: &[String]) -> Option<(usize, usize)> {
    let item = headers.iter().position(|h| {
        h == "numero" || h == "nro" || h.starts_with("item") || h.contains("numero")
    })?;

    let is_unit_price = |h: &String| h.contains("precio") && h.contains("unit");
    let price = headers
        .iter()
        .position(|h| is_unit_price(h) && (h.contains("estim") || h.contains("ref")))
        .or_else(|| headers.iter().position(is_unit_price))?;

    Some((item, price))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semicolon_report() {
        let data = "\
Nro;Descripción;Precio Unitario;Precio Unitario Referencial
1;Cable;1.000;\"1.100,50\"
2;Bomba;2.000;2.500.000
x;Firma;;
3;Tablero;;
";
        let prices = ReferencePrices::from_reader(data.as_bytes()).unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices.get(1), Some(1100.5));
        assert_eq!(prices.get(2), Some(2_500_000.0));
        assert_eq!(prices.get(3), None);
    }

    #[test]
    fn test_comma_report_first_unit_price_column() {
        let data = "Item,Precio Unitario,Precio Total\n1,500,1000\n1,600,1200\n";
        let prices = ReferencePrices::from_reader(data.as_bytes()).unwrap();
        // repeated item: the last row wins
        assert_eq!(prices.get(1), Some(600.0));
    }

    #[test]
    fn test_missing_columns() {
        let data = "Descripcion;Precio Total\nCable;100\n";
        let err = ReferencePrices::from_reader(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("unit price"));

        assert!(ReferencePrices::from_path("/nonexistent/prices.csv").is_err());
    }

    #[test]
    fn test_detect_columns() {
        let headers: Vec<String> = ["numero de item", "precio unitario", "precio unitario estimado"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        assert_eq!(detect_columns(&headers), Some((0, 2)));
    }

    #[test]
    fn test_apply_reprices_matching_items() {
        let prices = ReferencePrices::from_pairs(vec![(1, 550.0), (3, 20.0)]);
        let mut items = vec![
            LineItem::new("1", "Cable").with_quantity(2.0).with_total_price(999.0),
            LineItem::new("2", "Bomba").with_quantity(1.0).with_total_price(777.0),
        ];

        assert_eq!(prices.apply(&mut items), 1);
        assert_eq!(items[0].unit_price, Some(550.0));
        assert_eq!(items[0].resolved_total(), 1100.0);
        assert_eq!(items[1].resolved_total(), 777.0);
    }
}
