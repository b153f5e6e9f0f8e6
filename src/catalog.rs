// 📚 Reference Catalog - description → tools / materials texts
//
// The catalog is loaded once and read concurrently afterwards; nothing in
// here mutates an entry after construction.

use crate::text::{normalize, tokenize};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Normalized description that marks the fallback row.
pub const DEFAULT_SENTINEL: &str = "default";

/// Texts carried by the synthetic fallback entry.
pub const FALLBACK_EQUIPMENT_TEXT: &str = "generic hand tools";
pub const FALLBACK_MATERIALS_TEXT: &str = "supplies and materials";

// Accepted header names (already normalized)
const DESCRIPTION_HEADERS: &[&str] = &["description", "descripcion"];
const EQUIPMENT_HEADERS: &[&str] = &["tools", "herramientas", "equipment"];
const MATERIALS_HEADERS: &[&str] = &["materials", "materiales"];

// ============================================================================
// CATALOG ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Description as written in the source
    pub description: String,

    /// Matching tokens (normalized, stop words removed)
    pub tokens: BTreeSet<String>,

    /// Tools / equipment text, may be blank
    pub equipment_text: String,

    /// Materials text, may be blank
    pub materials_text: String,
}

impl CatalogEntry {
    pub fn new(description: &str, equipment_text: &str, materials_text: &str) -> Self {
        CatalogEntry {
            description: description.trim().to_string(),
            tokens: tokenize(description),
            equipment_text: equipment_text.trim().to_string(),
            materials_text: materials_text.trim().to_string(),
        }
    }

    pub fn normalized_description(&self) -> String {
        normalize(&self.description)
    }

    /// Case and accent insensitive check against the fallback sentinel
    pub fn is_default_sentinel(&self) -> bool {
        self.normalized_description() == DEFAULT_SENTINEL
    }

    /// Entries without tokens score zero against every query
    pub fn is_matchable(&self) -> bool {
        !self.tokens.is_empty()
    }
}

/// Built once, shared by every catalog that lacks a default row.
pub fn synthetic_default() -> &'static CatalogEntry {
    static SYNTHETIC: OnceLock<CatalogEntry> = OnceLock::new();
    SYNTHETIC.get_or_init(|| CatalogEntry {
        description: "DEFAULT".to_string(),
        tokens: BTreeSet::new(),
        equipment_text: FALLBACK_EQUIPMENT_TEXT.to_string(),
        materials_text: FALLBACK_MATERIALS_TEXT.to_string(),
    })
}

// ============================================================================
// CATALOG
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Matchable rows in source order
    entries: Vec<CatalogEntry>,

    /// Explicit default row, if the source provided one
    default_entry: Option<CatalogEntry>,
}

impl Catalog {
    /// Empty catalog: every lookup resolves to the synthetic default
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Build from already-constructed entries. A sentinel row is pulled out
    /// as the default (the last one wins if several are present).
    pub fn from_entries<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = CatalogEntry>,
    {
        let mut entries = Vec::new();
        let mut default_entry: Option<CatalogEntry> = None;

        for entry in rows {
            if entry.is_default_sentinel() {
                if default_entry.is_some() {
                    warn!("catalog has more than one default row, keeping the last one");
                }
                default_entry = Some(entry);
            } else {
                entries.push(entry);
            }
        }

        if default_entry.is_none() {
            debug!("catalog has no default row, using the synthetic fallback");
        }

        Catalog {
            entries,
            default_entry,
        }
    }

    /// Build from `(description, equipment, materials)` triples
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    {
        Catalog::from_entries(
            rows.into_iter()
                .map(|(desc, equipment, materials)| CatalogEntry::new(desc, equipment, materials)),
        )
    }

    /// Load from a CSV file with a header row
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open catalog file: {:?}", path.as_ref()))?;
        Catalog::from_reader(file)
            .with_context(|| format!("Failed to load catalog: {:?}", path.as_ref()))
    }

    /// Load from any CSV source. Columns are located by header name:
    /// Description / Tools / Materials (Spanish names accepted too).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .context("Failed to read catalog header row")?
            .iter()
            .map(normalize)
            .collect();

        let find = |names: &[&str], label: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| names.contains(&h.as_str()))
                .ok_or_else(|| anyhow!("catalog is missing the {} column", label))
        };

        let col_desc = find(DESCRIPTION_HEADERS, "Description")?;
        let col_tools = find(EQUIPMENT_HEADERS, "Tools")?;
        let col_mat = find(MATERIALS_HEADERS, "Materials")?;

        let mut rows = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record =
                record.with_context(|| format!("Failed to read catalog row {}", line + 2))?;
            let cell = |i: usize| record.get(i).unwrap_or("");
            rows.push(CatalogEntry::new(cell(col_desc), cell(col_tools), cell(col_mat)));
        }

        let catalog = Catalog::from_entries(rows);
        debug!(
            entries = catalog.len(),
            explicit_default = catalog.has_explicit_default(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_explicit_default(&self) -> bool {
        self.default_entry.is_some()
    }

    /// The default row, or the synthetic fallback when none was supplied.
    /// Never fails.
    pub fn default_entry(&self) -> &CatalogEntry {
        match &self.default_entry {
            Some(entry) => entry,
            None => synthetic_default(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
