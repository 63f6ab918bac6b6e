//! Cross-dump comparison
//!
//! Builds an address-sorted matrix from the definition table and a selection
//! of dumps. Every join is on the canonical (lower-cased) address, so `0x10`
//! and `0X10` always land in the same row.

use serde::{Serialize, Serializer};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::definition::RegisterDefinition;
use crate::dump::{Dump, DumpId};
use crate::hex::canonical_address;

/// Name shown for addresses with no matching definition
pub const UNKNOWN_NAME: &str = "Unknown";

/// Marker rendered for a dump that has no value at an address
pub const MISSING_MARKER: &str = "-";

/// One dump's value in a comparison row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellValue {
    Present(String),
    Missing,
}

impl CellValue {
    pub fn as_str(&self) -> &str {
        match self {
            CellValue::Present(v) => v,
            CellValue::Missing => MISSING_MARKER,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single address across all selected dumps
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRow {
    /// Canonical (lower-cased) address
    pub address: String,
    pub name: String,
    pub description: String,
    /// One value per selected dump, in dump store order
    pub values: Vec<CellValue>,
    pub is_mismatch: bool,
}

/// A selected dump with its keys folded to canonical form
///
/// Built once per comparison so every lookup is a map access. Where several
/// raw keys fold to the same address, the last one in dump order wins.
pub struct DumpIndex<'a> {
    dump: &'a Dump,
    folded: HashMap<String, &'a str>,
}

impl<'a> DumpIndex<'a> {
    pub fn new(dump: &'a Dump) -> Self {
        let folded = dump
            .parsed_data
            .iter()
            .map(|(key, value)| (canonical_address(key), value.as_str()))
            .collect();
        Self { dump, folded }
    }

    /// Canonical addresses present in this dump
    pub fn addresses(&self) -> impl Iterator<Item = &String> {
        self.folded.keys()
    }
}

/// Ways of finding a dump's value for a row, tried in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Raw key identical to the canonical address
    ExactAddress,
    /// Raw key whose canonical form equals the canonical address
    CaseInsensitiveAddress,
    /// Raw key identical to the resolved definition's name
    DefinitionName,
}

impl LookupStrategy {
    pub const ORDER: [LookupStrategy; 3] = [
        LookupStrategy::ExactAddress,
        LookupStrategy::CaseInsensitiveAddress,
        LookupStrategy::DefinitionName,
    ];

    fn lookup<'a>(
        self,
        index: &DumpIndex<'a>,
        address: &str,
        definition: Option<&RegisterDefinition>,
    ) -> Option<&'a str> {
        let parsed = &index.dump.parsed_data;
        match self {
            LookupStrategy::ExactAddress => parsed.get(address).map(String::as_str),
            LookupStrategy::CaseInsensitiveAddress => index.folded.get(address).copied(),
            LookupStrategy::DefinitionName => definition
                .and_then(|d| parsed.get(&d.name))
                .map(String::as_str),
        }
    }
}

/// Resolve a dump's value for `address`, falling back to `Missing`
pub fn resolve_value(
    index: &DumpIndex<'_>,
    address: &str,
    definition: Option<&RegisterDefinition>,
) -> CellValue {
    LookupStrategy::ORDER
        .iter()
        .find_map(|strategy| strategy.lookup(index, address, definition))
        .map(|v| CellValue::Present(v.to_string()))
        .unwrap_or(CellValue::Missing)
}

/// True when more than one distinct present value appears
pub fn is_mismatch(values: &[CellValue]) -> bool {
    let distinct: HashSet<&str> = values
        .iter()
        .filter(|v| !v.is_missing())
        .map(CellValue::as_str)
        .collect();
    distinct.len() > 1
}

/// Dumps whose id is selected, in the order of `dumps`
pub fn active_dumps<'a>(dumps: &'a [Dump], selected: &HashSet<DumpId>) -> Vec<&'a Dump> {
    dumps.iter().filter(|d| selected.contains(&d.id)).collect()
}

/// Compare the selected dumps against the definition table
///
/// Returns one row per canonical address found in the definitions or in any
/// selected dump, sorted by plain string order. An empty selection returns
/// no rows. With `diff_only`, rows without a mismatch are dropped.
pub fn compare(
    definitions: &[RegisterDefinition],
    dumps: &[Dump],
    selected: &HashSet<DumpId>,
    diff_only: bool,
) -> Vec<ComparisonRow> {
    if selected.is_empty() {
        return Vec::new();
    }

    let active: Vec<DumpIndex> = active_dumps(dumps, selected)
        .into_iter()
        .map(DumpIndex::new)
        .collect();

    // First definition per canonical address wins
    let mut by_address: HashMap<String, &RegisterDefinition> = HashMap::new();
    for definition in definitions {
        by_address
            .entry(definition.canonical_address())
            .or_insert(definition);
    }

    let mut addresses: BTreeSet<String> = by_address.keys().cloned().collect();
    for index in &active {
        addresses.extend(index.addresses().cloned());
    }

    addresses
        .into_iter()
        .map(|address| {
            let definition = by_address.get(&address).copied();
            let values: Vec<CellValue> = active
                .iter()
                .map(|index| resolve_value(index, &address, definition))
                .collect();
            let is_mismatch = is_mismatch(&values);

            ComparisonRow {
                name: definition
                    .map(|d| d.name.clone())
                    .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
                description: definition.map(|d| d.description.clone()).unwrap_or_default(),
                address,
                values,
                is_mismatch,
            }
        })
        .filter(|row| !diff_only || row.is_mismatch)
        .collect()
}

/// Row and mismatch totals for a comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonSummary {
    pub rows: usize,
    pub mismatches: usize,
}

impl ComparisonSummary {
    pub fn from_rows(rows: &[ComparisonRow]) -> Self {
        Self {
            rows: rows.len(),
            mismatches: rows.iter().filter(|r| r.is_mismatch).count(),
        }
    }
}
