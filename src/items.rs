// 📥 Line Items - per-item inputs, the CSV sheet loader and item selection

use crate::money::parse_amount;
use crate::text::normalize;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// How many leading rows may precede the header row (title, lot name, ...)
const HEADER_SEARCH_ROWS: usize = 10;

/// Rows above the header searched for the tender title
const TITLE_SEARCH_ROWS: usize = 5;

/// Rows above the header searched for the lot text
const LOT_SEARCH_ROWS: usize = 15;

/// Lines looked at when guessing the delimiter
const SNIFF_LINES: usize = 20;

/// Widest range accepted in an item selection
const MAX_SELECTION_SPAN: u64 = 100_000;

// ============================================================================
// LINE ITEM
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineItem {
    /// Item number as written in the source
    pub item: String,

    pub description: String,

    pub quantity: Option<f64>,

    /// Tax-inclusive unit price
    pub unit_price: Option<f64>,

    /// Tax-inclusive line total
    pub total_price: Option<f64>,
}

impl LineItem {
    pub fn new(item: &str, description: &str) -> Self {
        LineItem {
            item: item.trim().to_string(),
            description: description.trim().to_string(),
            ..LineItem::default()
        }
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_unit_price(mut self, unit_price: f64) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    pub fn with_total_price(mut self, total_price: f64) -> Self {
        self.total_price = Some(total_price);
        self
    }

    /// Tax-inclusive total: the line total if present, else unit price ×
    /// quantity, else 0. Non-finite values count as absent.
    pub fn resolved_total(&self) -> f64 {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());

        if let Some(total) = finite(self.total_price) {
            return total;
        }
        match (finite(self.unit_price), finite(self.quantity)) {
            (Some(price), Some(qty)) => price * qty,
            _ => 0.0,
        }
    }

    pub fn quantity_or_zero(&self) -> f64 {
        self.quantity.filter(|q| q.is_finite()).unwrap_or(0.0)
    }

    pub fn item_number(&self) -> Option<u64> {
        item_number(&self.item)
    }
}

// ============================================================================
// SHEET
// ============================================================================

/// Free text found above the header row
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SheetHeading {
    /// Tender title ("Ítems del llamado ...")
    pub title: String,

    /// Lot or group line ("Lote 1 - ...")
    pub lot: String,
}

impl SheetHeading {
    /// Scan the rows above the header. The title is the first cell naming
    /// the tender's items, else the very first cell; the lot is the first
    /// cell mentioning a lot or group.
    fn detect(rows: &[csv::StringRecord]) -> Self {
        let cells = |limit: usize| {
            rows.iter()
                .take(limit)
                .flat_map(|r| r.iter())
                .map(str::trim)
                .filter(|c| !c.is_empty())
        };

        let title = cells(TITLE_SEARCH_ROWS)
            .find(|c| {
                let norm = normalize(c);
                norm.contains("items del llamado") || norm.contains("item del llamado")
            })
            .or_else(|| rows.first().and_then(|r| r.get(0)).map(str::trim))
            .unwrap_or("")
            .to_string();

        let lot = cells(LOT_SEARCH_ROWS)
            .find(|c| {
                let norm = normalize(c);
                norm.contains("lote") || norm.contains("grupo")
            })
            .unwrap_or("")
            .to_string();

        SheetHeading { title, lot }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemSheet {
    pub heading: SheetHeading,
    pub items: Vec<LineItem>,
}

// ============================================================================
// CSV LOADER
// ============================================================================

#[derive(Debug, Default)]
struct ItemColumns {
    description: usize,
    item: Option<usize>,
    quantity: Option<usize>,
    unit_price: Option<usize>,
    total_price: Option<usize>,
}

impl ItemColumns {
    /// Locate columns in a header row; `None` if there is no description
    fn detect(headers: &[String]) -> Option<Self> {
        let description = headers
            .iter()
            .position(|h| h.contains("descripcion") || h.contains("description"))?;

        let find = |pred: &dyn Fn(&str) -> bool| headers.iter().position(|h| pred(h));
        let is_price = |h: &str| h.contains("precio") || h.contains("price");

        Some(ItemColumns {
            description,
            item: find(&|h| h == "item" || h.starts_with("item ")),
            quantity: find(&|h| matches!(h, "cantidad" | "quantity" | "qty")),
            unit_price: find(&|h| is_price(h) && h.contains("unit")),
            total_price: find(&|h| is_price(h) && h.contains("total")),
        })
    }
}

/// Item numbers are plain integers; anything else (signature lines,
/// footers) is not an item row.
fn is_valid_item_number(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    // spreadsheets export whole numbers as "3.0"
    matches!(trimmed.parse::<f64>(), Ok(v) if v.fract() == 0.0 && v >= 0.0)
}

pub fn load_items_csv<P: AsRef<Path>>(path: P) -> Result<Vec<LineItem>> {
    Ok(load_item_sheet_csv(path)?.items)
}

/// Read line items from CSV. The header row is the first of the leading
/// rows that has a description column; rows above it are ignored.
pub fn load_items<R: Read>(reader: R) -> Result<Vec<LineItem>> {
    Ok(load_item_sheet(reader)?.items)
}

pub fn load_item_sheet_csv<P: AsRef<Path>>(path: P) -> Result<ItemSheet> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("Failed to open items file: {:?}", path.as_ref()))?;
    load_item_sheet(file).with_context(|| format!("Failed to load items: {:?}", path.as_ref()))
}

/// Read a whole items sheet: the heading texts above the header row and
/// the item rows below it. `;` and `,` delimited files are both accepted.
pub fn load_item_sheet<R: Read>(reader: R) -> Result<ItemSheet> {
    let content = read_csv_text(reader)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(sniff_delimiter(&content))
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let records: Vec<csv::StringRecord> = rdr
        .records()
        .collect::<std::result::Result<_, _>>()
        .context("Failed to read items CSV")?;

    let (header_row, columns) = records
        .iter()
        .take(HEADER_SEARCH_ROWS)
        .enumerate()
        .find_map(|(i, record)| {
            let headers: Vec<String> = record.iter().map(normalize).collect();
            ItemColumns::detect(&headers).map(|c| (i, c))
        })
        .ok_or_else(|| anyhow!("no header row with a Description column"))?;

    let heading = SheetHeading::detect(&records[..header_row]);

    let mut items = Vec::new();
    let mut skipped = 0usize;

    for (offset, record) in records.iter().skip(header_row + 1).enumerate() {
        let cell = |col: Option<usize>| col.and_then(|i| record.get(i)).unwrap_or("");

        let description = cell(Some(columns.description));
        if description.is_empty() {
            skipped += 1;
            continue;
        }

        let item = match columns.item {
            Some(_) => {
                let raw = cell(columns.item);
                if !is_valid_item_number(raw) {
                    skipped += 1;
                    continue;
                }
                raw.to_string()
            }
            None => (offset + 1).to_string(),
        };

        items.push(LineItem {
            item,
            description: description.to_string(),
            quantity: parse_amount(cell(columns.quantity)),
            unit_price: parse_amount(cell(columns.unit_price)),
            total_price: parse_amount(cell(columns.total_price)),
        });
    }

    if items.is_empty() {
        warn!("items file has a header row but no item rows");
    }
    debug!(items = items.len(), skipped, title = heading.title.as_str(), "line items loaded");

    Ok(ItemSheet { heading, items })
}

/// Whole input as text. Invalid UTF-8 is replaced rather than rejected and
/// a leading byte order mark is dropped.
pub(crate) fn read_csv_text<R: Read>(mut reader: R) -> Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).context("Failed to read CSV input")?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// `;` or `,`, whichever occurs more often outside quotes in the first
/// lines. Ties (including neither) pick `;`, the usual export delimiter.
pub(crate) fn sniff_delimiter(content: &str) -> u8 {
    let mut semicolons = 0usize;
    let mut commas = 0usize;
    let mut quoted = false;

    for c in content.lines().take(SNIFF_LINES).flat_map(|line| line.chars()) {
        match c {
            '"' => quoted = !quoted,
            ';' if !quoted => semicolons += 1,
            ',' if !quoted => commas += 1,
            _ => {}
        }
    }

    if commas > semicolons {
        b','
    } else {
        b';'
    }
}

// ============================================================================
// ITEM SELECTION
// ============================================================================

/// First run of digits in a cell: `"12"`, `"3.0"` and `"Item 3"` all name
/// an item.
pub fn item_number(raw: &str) -> Option<u64> {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Parse an item selection such as `"3, 11-15, 18"` into sorted, distinct
/// item numbers. Reversed ranges are swapped; unreadable parts are skipped.
pub fn parse_item_selection(text: &str) -> Vec<u64> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let mut selected = BTreeSet::new();

    for part in compact.split(',').filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((from, to)) => {
                let (from, to) = match (item_number(from), item_number(to)) {
                    (Some(a), Some(b)) if a <= b => (a, b),
                    (Some(a), Some(b)) => (b, a),
                    _ => continue,
                };
                if to - from >= MAX_SELECTION_SPAN {
                    warn!(range = part, "item range too wide, skipped");
                    continue;
                }
                selected.extend(from..=to);
            }
            None => {
                if let Some(n) = item_number(part) {
                    selected.insert(n);
                }
            }
        }
    }

    selected.into_iter().collect()
}

/// Keep the items whose number is in `selection`, in their original order
pub fn select_items(items: Vec<LineItem>, selection: &[u64]) -> Vec<LineItem> {
    items
        .into_iter()
        .filter(|item| {
            item.item_number()
                .map_or(false, |n| selection.binary_search(&n).is_ok())
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
