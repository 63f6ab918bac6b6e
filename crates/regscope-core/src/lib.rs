//! Regscope Core - Register definitions, dump parsing, and comparison
//!
//! This crate provides the pure core of the Regscope system:
//! - Register definition table and the sequential definition generator
//! - Dump parsing from free-form `key value` text
//! - Cross-dump comparison with mismatch detection
//! - Workspace persistence as a keyed JSON record

pub mod compare;
pub mod definition;
pub mod dump;
pub mod hex;
pub mod store;

pub use compare::{compare, CellValue, ComparisonRow, ComparisonSummary, LookupStrategy};
pub use definition::{
    check_generate_count, generate, DefinitionError, DefinitionTable, RegisterDefinition,
    MAX_GENERATE_COUNT,
};
pub use dump::{parse_dump, Dump, DumpError, DumpId, DumpStore, ParsedDump};
pub use hex::{canonical_address, format_address, is_valid_address, parse_hex_or_zero};
pub use store::{RecordStore, StoreError, Workspace, DEFAULT_STORE_NAME};
