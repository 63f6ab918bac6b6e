//! Register definitions - the address map used to label dump values
//!
//! A definition maps a hexadecimal address to a human-readable register name
//! and optional description. The table keeps definitions in the order they
//! were entered; comparisons resolve an address to the first matching entry.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hex::{canonical_address, format_address, parse_hex_or_zero, with_hex_prefix};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Address required.")]
    MissingAddress,
    #[error("Name required.")]
    MissingName,
    #[error("No definition at index {index} (table has {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Cannot generate {count} definitions (limit is {max})")]
    CountTooLarge { count: usize, max: usize },
}

/// Default upper bound on definitions produced by one generator call
pub const MAX_GENERATE_COUNT: usize = 65_536;

/// A single named register address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDefinition {
    /// Hex address, e.g. "0x1000"
    pub address: String,
    /// Register name, e.g. "CTRL_REG"
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
}

impl RegisterDefinition {
    /// Build a definition from user input, prepending `0x` when missing
    pub fn new(
        address: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Self, DefinitionError> {
        if address.trim().is_empty() {
            return Err(DefinitionError::MissingAddress);
        }
        if name.trim().is_empty() {
            return Err(DefinitionError::MissingName);
        }

        Ok(Self {
            address: with_hex_prefix(address),
            name: name.trim().to_string(),
            description: description.unwrap_or_default().to_string(),
        })
    }

    /// Address in its lower-cased join form
    pub fn canonical_address(&self) -> String {
        canonical_address(&self.address)
    }
}

/// Ordered collection of register definitions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefinitionTable {
    entries: Vec<RegisterDefinition>,
}

impl DefinitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(entries: Vec<RegisterDefinition>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisterDefinition> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[RegisterDefinition] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&RegisterDefinition> {
        self.entries.get(index)
    }

    /// Append a definition to the end of the table
    pub fn add(&mut self, definition: RegisterDefinition) {
        self.entries.push(definition);
    }

    /// Replace the definition at `index`
    pub fn update(
        &mut self,
        index: usize,
        definition: RegisterDefinition,
    ) -> Result<(), DefinitionError> {
        let len = self.entries.len();
        let slot = self
            .entries
            .get_mut(index)
            .ok_or(DefinitionError::IndexOutOfRange { index, len })?;
        *slot = definition;
        Ok(())
    }

    /// Remove and return the definition at `index`
    pub fn remove(&mut self, index: usize) -> Result<RegisterDefinition, DefinitionError> {
        if index >= self.entries.len() {
            return Err(DefinitionError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    /// Replace the whole table (e.g. with generator output)
    pub fn replace_all(&mut self, entries: Vec<RegisterDefinition>) {
        self.entries = entries;
    }

    /// Append several definitions, keeping their order
    pub fn extend(&mut self, entries: impl IntoIterator<Item = RegisterDefinition>) {
        self.entries.extend(entries);
    }

    /// First definition (table order) whose address matches, ignoring case
    pub fn find_by_address(&self, address: &str) -> Option<&RegisterDefinition> {
        find_by_address(&self.entries, address)
    }
}

/// First definition in `definitions` whose lower-cased address equals the
/// canonical form of `address`
pub fn find_by_address<'a>(
    definitions: &'a [RegisterDefinition],
    address: &str,
) -> Option<&'a RegisterDefinition> {
    let key = canonical_address(address);
    definitions.iter().find(|d| d.canonical_address() == key)
}

/// Reject generator requests above `max` entries
pub fn check_generate_count(count: usize, max: usize) -> Result<(), DefinitionError> {
    if count > max {
        return Err(DefinitionError::CountTooLarge { count, max });
    }
    Ok(())
}

/// Generate `count` sequential definitions starting at `start_address_hex`
///
/// Addresses advance by `stride_bytes` and are rendered as uppercase hex with
/// a `0x` prefix; names run `REG_0..REG_{count-1}`. An unparseable start
/// address is treated as zero. Whether the result replaces or extends an
/// existing table is the caller's decision.
pub fn generate(start_address_hex: &str, count: usize, stride_bytes: u64) -> Vec<RegisterDefinition> {
    let start = parse_hex_or_zero(start_address_hex);

    (0..count)
        .map(|i| {
            let offset = (i as u64).wrapping_mul(stride_bytes);
            RegisterDefinition {
                address: format_address(start.wrapping_add(offset)),
                name: format!("REG_{}", i),
                description: String::new(),
            }
        })
        .collect()
}
