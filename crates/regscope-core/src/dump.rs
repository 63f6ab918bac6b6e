//! Register dumps - parsing raw text snapshots and keeping them in a store
//!
//! A dump is one captured snapshot of register values. Each non-blank line
//! contributes a `key value` pair, where the key is whatever the first token
//! was (an address or a register name). Accepted line forms include:
//! - `0x1000 0xFF`
//! - `0x1000 = 0xFF   # trailing comment`
//! - `CTRL_REG: 5` / `CTRL_REG, 5`

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DumpError {
    #[error("Name required.")]
    EmptyName,
    #[error("Content required.")]
    EmptyContent,
    #[error("No valid registers found.")]
    NoRegisters,
    #[error("Dump not found: {0}")]
    NotFound(DumpId),
}

/// Unique identifier for a dump, assigned at creation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DumpId(pub String);

impl DumpId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DumpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DumpId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Result of parsing dump text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDump {
    /// Raw key -> raw value, in first-seen key order
    pub entries: IndexMap<String, String>,
    /// Number of lines that produced an entry (duplicates included)
    pub recognized: usize,
}

const COMMENT_MARKERS: [char; 2] = ['#', ';'];

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '=' | ',' | ':')
}

/// Parse raw dump text into key/value entries
///
/// Never fails: comments, blank lines and lines with fewer than two tokens
/// are skipped. A `recognized` count of zero is for the caller to reject.
pub fn parse_dump(content: &str) -> ParsedDump {
    let mut parsed = ParsedDump::default();

    for line in content.split('\n') {
        let code = match line.find(COMMENT_MARKERS) {
            Some(pos) => &line[..pos],
            None => line,
        };

        let mut tokens = code.split(is_separator).filter(|t| !t.is_empty());
        let (Some(key), Some(value)) = (tokens.next(), tokens.next()) else {
            continue;
        };

        parsed.entries.insert(key.to_string(), value.to_string());
        parsed.recognized += 1;
    }

    parsed
}

/// A named, parsed register dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dump {
    pub id: DumpId,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    /// Original text, kept verbatim
    pub content: String,
    /// Raw key -> raw value, keys stored exactly as they appeared
    pub parsed_data: IndexMap<String, String>,
}

impl Dump {
    /// Validate and parse user input into a new dump
    pub fn create(name: &str, content: &str) -> Result<Self, DumpError> {
        Self::build(DumpId::generate(), name, content)
    }

    fn build(id: DumpId, name: &str, content: &str) -> Result<Self, DumpError> {
        if name.trim().is_empty() {
            return Err(DumpError::EmptyName);
        }
        if content.trim().is_empty() {
            return Err(DumpError::EmptyContent);
        }

        let parsed = parse_dump(content);
        if parsed.recognized == 0 {
            return Err(DumpError::NoRegisters);
        }

        debug!(
            dump = %id,
            lines = parsed.recognized,
            keys = parsed.entries.len(),
            "Parsed dump"
        );

        Ok(Self {
            id,
            name: name.to_string(),
            timestamp: Utc::now(),
            content: content.to_string(),
            parsed_data: parsed.entries,
        })
    }

    /// Number of distinct register keys
    pub fn register_count(&self) -> usize {
        self.parsed_data.len()
    }
}

/// Collection of dumps in creation order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DumpStore {
    dumps: Vec<Dump>,
}

impl DumpStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.dumps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dumps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dump> {
        self.dumps.iter()
    }

    pub fn as_slice(&self) -> &[Dump] {
        &self.dumps
    }

    pub fn ids(&self) -> Vec<DumpId> {
        self.dumps.iter().map(|d| d.id.clone()).collect()
    }

    pub fn get(&self, id: &DumpId) -> Option<&Dump> {
        self.dumps.iter().find(|d| &d.id == id)
    }

    pub fn add(&mut self, dump: Dump) {
        self.dumps.push(dump);
    }

    pub fn remove(&mut self, id: &DumpId) -> Option<Dump> {
        let pos = self.dumps.iter().position(|d| &d.id == id)?;
        Some(self.dumps.remove(pos))
    }

    /// Replace a dump's name and content, re-parsing and keeping its id
    /// and position
    pub fn update(&mut self, id: &DumpId, name: &str, content: &str) -> Result<&Dump, DumpError> {
        let pos = self
            .dumps
            .iter()
            .position(|d| &d.id == id)
            .ok_or_else(|| DumpError::NotFound(id.clone()))?;

        let replacement = Dump::build(id.clone(), name, content)?;
        self.dumps[pos] = replacement;
        Ok(&self.dumps[pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_separators() {
        let parsed = parse_dump("0x10 0xFF");
        assert_eq!(parsed.entries, entries(&[("0x10", "0xFF")]));
        assert_eq!(parsed.recognized, 1);

        assert_eq!(parse_dump("0x10=0xFF # comment"), parsed);

        let parsed = parse_dump("REG1, 5");
        assert_eq!(parsed.entries, entries(&[("REG1", "5")]));

        let parsed = parse_dump("STATUS:\t0x3 extra tokens");
        assert_eq!(parsed.entries, entries(&[("STATUS", "0x3")]));
    }

    #[test]
    fn test_parse_comments_and_blanks() {
        let parsed = parse_dump("# just a comment\n\n   \n0x20 1");
        assert_eq!(parsed.entries, entries(&[("0x20", "1")]));
        assert_eq!(parsed.recognized, 1);

        let parsed = parse_dump("; header\r\n0x4 7 ; note\r\n");
        assert_eq!(parsed.entries, entries(&[("0x4", "7")]));
    }

    #[test]
    fn test_parse_drops_malformed_lines() {
        assert_eq!(parse_dump("onlyonetoken").recognized, 0);

        let parsed = parse_dump("onlyonetoken\n0x1 2");
        assert_eq!(parsed.recognized, 1);
        assert_eq!(parsed.entries, entries(&[("0x1", "2")]));

        assert_eq!(parse_dump("= 5\n0x10 =").recognized, 0);
    }

    #[test]
    fn test_parse_last_occurrence_wins() {
        let parsed = parse_dump("0x10 1\n0x14 2\n0x10 3");
        assert_eq!(parsed.entries, entries(&[("0x10", "3"), ("0x14", "2")]));
        assert_eq!(parsed.recognized, 3);
    }

    #[test]
    fn test_parse_keeps_raw_case() {
        let parsed = parse_dump("0X1A 0xab\nCtrl_Reg 1");
        assert_eq!(parsed.entries, entries(&[("0X1A", "0xab"), ("Ctrl_Reg", "1")]));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let text = "0x0 1\n0x4 2\n# c\n0x8 3\nNAME 4";
        assert_eq!(parse_dump(text), parse_dump(text));
    }

    #[test]
    fn test_create_validation() {
        assert_eq!(Dump::create("  ", "0x0 1"), Err(DumpError::EmptyName));
        assert_eq!(Dump::create("Working", "\n  \n"), Err(DumpError::EmptyContent));
        assert_eq!(
            Dump::create("Working", "# nothing here\nlonely"),
            Err(DumpError::NoRegisters)
        );

        let dump = Dump::create("Working", "0x0 1\n0x4 2").unwrap();
        assert_eq!(dump.name, "Working");
        assert_eq!(dump.content, "0x0 1\n0x4 2");
        assert_eq!(dump.register_count(), 2);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(DumpError::EmptyName.to_string(), "Name required.");
        assert_eq!(DumpError::EmptyContent.to_string(), "Content required.");
        assert_eq!(DumpError::NoRegisters.to_string(), "No valid registers found.");
    }

    #[test]
    fn test_store_add_remove() {
        let mut store = DumpStore::new();
        let a = Dump::create("a", "0x0 1").unwrap();
        let b = Dump::create("b", "0x0 2").unwrap();
        let a_id = a.id.clone();
        let b_id = b.id.clone();
        assert_ne!(a_id, b_id);

        store.add(a);
        store.add(b);
        assert_eq!(store.ids(), vec![a_id.clone(), b_id.clone()]);

        assert_eq!(store.remove(&a_id).unwrap().name, "a");
        assert!(store.remove(&a_id).is_none());
        assert_eq!(store.len(), 1);
        assert!(store.get(&b_id).is_some());
    }

    #[test]
    fn test_store_update_replaces_record() {
        let mut store = DumpStore::new();
        let dump = Dump::create("before", "0x0 1").unwrap();
        let id = dump.id.clone();
        store.add(dump);

        let updated = store.update(&id, "after", "0x0 9\n0x4 8").unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(updated.name, "after");
        assert_eq!(updated.parsed_data, entries(&[("0x0", "9"), ("0x4", "8")]));

        assert_eq!(
            store.update(&id, "after", "garbage").unwrap_err(),
            DumpError::NoRegisters
        );
        assert_eq!(store.get(&id).unwrap().name, "after");

        let missing = DumpId::from("nope");
        assert_eq!(
            store.update(&missing, "x", "0x0 1").unwrap_err(),
            DumpError::NotFound(missing)
        );
    }
}
