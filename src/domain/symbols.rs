// ============================================================
// Layer 3 — Symbols Table
// ============================================================
// Maps CTC output indices to text. The table is a plain text
// file with one `symbol id` pair per line:
//
//   <ctc>    0
//   <space>  1
//   a        2
//
// Blank lines and lines starting with '#' are ignored.
// `<space>` is decoded as a literal space.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};

const SPACE_SYMBOL: &str = "<space>";
const UNKNOWN: &str = "?";

#[derive(Debug, Clone, Default)]
pub struct SymbolsTable {
    by_id:     HashMap<usize, String>,
    by_symbol: HashMap<String, usize>,
}

impl SymbolsTable {
    pub fn parse(text: &str) -> Result<Self> {
        let mut table = Self::default();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(symbol), Some(id), None) = (fields.next(), fields.next(), fields.next())
            else {
                bail!("Line {}: expected 'symbol id', got '{line}'", line_no + 1);
            };
            let id: usize = id
                .parse()
                .with_context(|| format!("Line {}: invalid id '{id}'", line_no + 1))?;
            table.insert(symbol, id).with_context(|| format!("Line {}", line_no + 1))?;
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read symbols table '{}'", path.display()))?;
        let table = Self::parse(&text)?;
        tracing::debug!("Loaded {} symbols from '{}'", table.len(), path.display());
        Ok(table)
    }

    fn insert(&mut self, symbol: &str, id: usize) -> Result<()> {
        if self.by_symbol.contains_key(symbol) {
            bail!("Duplicate symbol '{symbol}'");
        }
        if self.by_id.contains_key(&id) {
            bail!("Duplicate id {id}");
        }
        self.by_symbol.insert(symbol.to_string(), id);
        self.by_id.insert(id, symbol.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn symbol(&self, id: usize) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn id(&self, symbol: &str) -> Option<usize> {
        self.by_symbol.get(symbol).copied()
    }

    /// Join the symbols of a decoded path. Unknown ids become '?'.
    pub fn decode(&self, ids: &[usize]) -> String {
        ids.iter()
            .map(|&id| match self.symbol(id) {
                Some(SPACE_SYMBOL) => " ",
                Some(symbol)       => symbol,
                None               => UNKNOWN,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "# ctc symbols\n<ctc> 0\n<space> 1\na 2\n\nb 3\n";

    #[test]
    fn parse_and_lookup() {
        let table = SymbolsTable::parse(TABLE).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.symbol(2), Some("a"));
        assert_eq!(table.id("b"), Some(3));
        assert_eq!(table.symbol(9), None);
    }

    #[test]
    fn decode_maps_space_and_unknown() {
        let table = SymbolsTable::parse(TABLE).unwrap();
        assert_eq!(table.decode(&[2, 1, 3, 7]), "a b?");
        assert_eq!(table.decode(&[]), "");
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(SymbolsTable::parse("a").is_err());
        assert!(SymbolsTable::parse("a 1 2").is_err());
        assert!(SymbolsTable::parse("a x").is_err());
    }

    #[test]
    fn rejects_duplicates() {
        assert!(SymbolsTable::parse("a 1\na 2").is_err());
        assert!(SymbolsTable::parse("a 1\nb 1").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("syms.txt");
        std::fs::write(&path, TABLE).unwrap();
        let table = SymbolsTable::load(&path).unwrap();
        assert_eq!(table.id("<ctc>"), Some(0));
        assert!(SymbolsTable::load(&dir.path().join("missing.txt")).is_err());
    }
}
