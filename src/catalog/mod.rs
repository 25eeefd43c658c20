//! Signature catalog: format definitions and the prefix index.
//!
//! The catalog is built once from a JSON signature source (or the embedded
//! database), validated, and never mutated afterwards. Matching code only
//! ever borrows it, so a single catalog is safely shared across batch
//! workers without locking.
//!
//! Wire format, one record per format:
//! `{ "type", "extensions", "magic_bytes", "offset", "description",
//! "risk_level" }` where `magic_bytes` is a hex string ("??" marks a
//! wildcard byte) or an array of such strings for formats with alternative
//! magics (BE/LE variants, version families).

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScanError};

/// Maximum sample window the catalog supports. Patterns must fit entirely
/// inside this window; the extractor never needs to read more than this for
/// matching purposes.
pub const MAX_SAMPLE_LEN: usize = 512;

/// Embedded signature database, compiled into the binary.
pub const BUILTIN_SIGNATURES: &str = include_str!("../../assets/signatures.json");

static BUILTIN: Lazy<Catalog> = Lazy::new(|| {
    // The embedded database is validated by the catalog test suite; a failure
    // here means the shipped asset itself is broken.
    Catalog::load_str(BUILTIN_SIGNATURES).expect("embedded signature database is valid")
});

/// Intrinsic danger of a format, independent of any extension mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Formats that warrant the disguise penalty when hidden behind a
    /// benign extension.
    pub fn is_dangerous(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

/// One byte pattern anchored at a fixed offset. `None` positions are
/// wildcards and match any byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePattern {
    pub offset: usize,
    pub bytes: Vec<Option<u8>>,
}

impl SignaturePattern {
    /// Number of concrete (non-wildcard) bytes.
    pub fn exact_len(&self) -> usize {
        self.bytes.iter().filter(|b| b.is_some()).count()
    }

    /// First byte past the pattern.
    pub fn end(&self) -> usize {
        self.offset + self.bytes.len()
    }

    /// Test the pattern against a sample prefix. A prefix too short to
    /// cover the pattern never matches; there is no out-of-bounds access.
    pub fn matches(&self, prefix: &[u8]) -> bool {
        if prefix.len() < self.end() {
            return false;
        }
        self.bytes
            .iter()
            .zip(&prefix[self.offset..self.end()])
            .all(|(pat, byte)| match pat {
                Some(expected) => expected == byte,
                None => true,
            })
    }
}

/// Identity of one recognizable format.
#[derive(Debug, Clone)]
pub struct SignatureRule {
    /// Unique key, e.g. "PE_EXECUTABLE".
    pub type_id: String,
    /// Alternative patterns; the rule matches if any of them match.
    pub patterns: Vec<SignaturePattern>,
    /// Lowercase extensions this format legitimately uses. May be empty.
    pub known_extensions: Vec<String>,
    pub risk_level: RiskLevel,
    pub description: String,
}

impl SignatureRule {
    /// True if the declared extension is one this format legitimately uses.
    pub fn claims_extension(&self, extension: &str) -> bool {
        self.known_extensions.iter().any(|e| e == extension)
    }
}

/// `magic_bytes` accepts a single hex string or an array of alternatives.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MagicSpec {
    One(String),
    Many(Vec<String>),
}

impl MagicSpec {
    fn into_vec(self) -> Vec<String> {
        match self {
            MagicSpec::One(s) => vec![s],
            MagicSpec::Many(v) => v,
        }
    }
}

/// Raw signature record as it appears in the JSON source.
#[derive(Debug, Clone, Deserialize)]
pub struct SignatureRecord {
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default)]
    pub extensions: Vec<String>,
    pub magic_bytes: MagicSpec,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub description: String,
    pub risk_level: RiskLevel,
}

/// Immutable, validated signature table with a first-byte index.
#[derive(Debug)]
pub struct Catalog {
    rules: Vec<SignatureRule>,
    /// Rules whose patterns all start with a concrete byte at offset 0,
    /// bucketed by that byte.
    buckets: Vec<Vec<usize>>,
    /// Rules anchored at non-zero offsets or starting with a wildcard;
    /// always evaluated.
    fallback: Vec<usize>,
    max_exact_len: usize,
}

impl Catalog {
    /// Build a catalog from parsed records, validating as specified:
    /// unique type ids, non-empty patterns, patterns inside the sample
    /// window.
    pub fn from_records(records: Vec<SignatureRecord>) -> Result<Self> {
        let mut rules: Vec<SignatureRule> = Vec::with_capacity(records.len());
        let mut seen: HashSet<String> = HashSet::with_capacity(records.len());

        for record in records {
            if !seen.insert(record.type_id.clone()) {
                return Err(ScanError::DuplicateTypeId(record.type_id));
            }
            let magics = record.magic_bytes.into_vec();
            if magics.is_empty() {
                return Err(ScanError::EmptyPattern(record.type_id));
            }
            let mut patterns = Vec::with_capacity(magics.len());
            for magic in magics {
                let bytes = parse_magic(&record.type_id, &magic)?;
                if bytes.is_empty() {
                    return Err(ScanError::EmptyPattern(record.type_id));
                }
                let pattern = SignaturePattern {
                    offset: record.offset,
                    bytes,
                };
                if pattern.end() > MAX_SAMPLE_LEN {
                    return Err(ScanError::PatternOutOfRange {
                        type_id: record.type_id,
                        end: pattern.end(),
                        max: MAX_SAMPLE_LEN,
                    });
                }
                patterns.push(pattern);
            }
            rules.push(SignatureRule {
                type_id: record.type_id,
                patterns,
                known_extensions: record
                    .extensions
                    .iter()
                    .map(|e| e.to_ascii_lowercase())
                    .collect(),
                risk_level: record.risk_level,
                description: record.description,
            });
        }

        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); 256];
        let mut fallback: Vec<usize> = Vec::new();
        for (idx, rule) in rules.iter().enumerate() {
            let indexable = rule
                .patterns
                .iter()
                .all(|p| p.offset == 0 && matches!(p.bytes.first(), Some(Some(_))));
            if indexable {
                let firsts: HashSet<u8> = rule
                    .patterns
                    .iter()
                    .filter_map(|p| p.bytes.first().copied().flatten())
                    .collect();
                for first in firsts {
                    buckets[first as usize].push(idx);
                }
            } else {
                fallback.push(idx);
            }
        }

        let max_exact_len = rules
            .iter()
            .flat_map(|r| r.patterns.iter())
            .map(SignaturePattern::exact_len)
            .max()
            .unwrap_or(0)
            .max(1);

        debug!(
            rules = rules.len(),
            fallback = fallback.len(),
            max_exact_len,
            "catalog built"
        );

        Ok(Self {
            rules,
            buckets,
            fallback,
            max_exact_len,
        })
    }

    /// Load a catalog from any JSON reader.
    pub fn load<R: Read>(reader: R) -> Result<Self> {
        let records: Vec<SignatureRecord> = serde_json::from_reader(reader)?;
        Self::from_records(records)
    }

    /// Load a catalog from a JSON string.
    pub fn load_str(source: &str) -> Result<Self> {
        let records: Vec<SignatureRecord> = serde_json::from_str(source)?;
        Self::from_records(records)
    }

    /// Load a catalog from a JSON file on disk.
    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref()).map_err(ScanError::CatalogSource)?;
        Self::load(std::io::BufReader::new(file))
    }

    /// The embedded signature database, built once on first use.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    /// Candidate rules for a prefix: the first-byte bucket plus every rule
    /// that cannot be indexed at offset 0. Catalog order is preserved.
    pub fn candidates_for(&self, prefix: &[u8]) -> Vec<&SignatureRule> {
        let mut indices: Vec<usize> = match prefix.first() {
            Some(&first) => self.buckets[first as usize].clone(),
            None => Vec::new(),
        };
        indices.extend_from_slice(&self.fallback);
        indices.sort_unstable();
        indices.iter().map(|&i| &self.rules[i]).collect()
    }

    /// Look up a rule by its type id.
    pub fn rule(&self, type_id: &str) -> Option<&SignatureRule> {
        self.rules.iter().find(|r| r.type_id == type_id)
    }

    pub fn rules(&self) -> &[SignatureRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Longest concrete-byte count across the catalog, used to normalize
    /// match confidence. At least 1 so the division is always defined.
    pub fn max_exact_len(&self) -> usize {
        self.max_exact_len
    }
}

/// Parse a `magic_bytes` hex string ("??" per wildcard byte) into pattern
/// bytes. Whitespace between byte pairs is tolerated.
fn parse_magic(type_id: &str, magic: &str) -> Result<Vec<Option<u8>>> {
    let invalid = |reason: &str| ScanError::InvalidMagic {
        type_id: type_id.to_string(),
        magic: magic.to_string(),
        reason: reason.to_string(),
    };

    let compact: String = magic.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if !compact.is_ascii() {
        return Err(invalid("non-ASCII characters"));
    }
    if compact.len() % 2 != 0 {
        return Err(invalid("odd number of hex digits"));
    }

    let mut bytes = Vec::with_capacity(compact.len() / 2);
    for pair in compact.as_bytes().chunks(2) {
        if pair == b"??" {
            bytes.push(None);
        } else {
            let decoded = hex::decode(pair).map_err(|_| invalid("non-hex byte pair"))?;
            bytes.push(Some(decoded[0]));
        }
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(type_id: &str, magic: &str, offset: usize) -> SignatureRecord {
        SignatureRecord {
            type_id: type_id.to_string(),
            extensions: vec!["bin".to_string()],
            magic_bytes: MagicSpec::One(magic.to_string()),
            offset,
            description: String::new(),
            risk_level: RiskLevel::Low,
        }
    }

    #[test]
    fn test_parse_magic_plain() {
        let bytes = parse_magic("T", "4D5A").unwrap();
        assert_eq!(bytes, vec![Some(0x4D), Some(0x5A)]);
    }

    #[test]
    fn test_parse_magic_wildcards() {
        let bytes = parse_magic("T", "52??46??").unwrap();
        assert_eq!(bytes, vec![Some(0x52), None, Some(0x46), None]);
    }

    #[test]
    fn test_parse_magic_whitespace_tolerated() {
        let bytes = parse_magic("T", "89 50 4E 47").unwrap();
        assert_eq!(bytes.len(), 4);
        assert_eq!(bytes[0], Some(0x89));
    }

    #[test]
    fn test_parse_magic_rejects_odd_and_garbage() {
        assert!(parse_magic("T", "4D5").is_err());
        assert!(parse_magic("T", "ZZ").is_err());
        assert!(parse_magic("T", "4D5Ä").is_err());
    }

    #[test]
    fn test_pattern_matches_with_wildcards() {
        let pattern = SignaturePattern {
            offset: 0,
            bytes: vec![Some(0x52), None, Some(0x46)],
        };
        assert!(pattern.matches(&[0x52, 0xAB, 0x46, 0x00]));
        assert!(pattern.matches(&[0x52, 0x00, 0x46]));
        assert!(!pattern.matches(&[0x52, 0xAB, 0x47]));
        // Too short to cover the pattern
        assert!(!pattern.matches(&[0x52, 0xAB]));
        assert!(!pattern.matches(&[]));
    }

    #[test]
    fn test_pattern_matches_at_offset() {
        let pattern = SignaturePattern {
            offset: 2,
            bytes: vec![Some(0xAA)],
        };
        assert!(pattern.matches(&[0x00, 0x00, 0xAA]));
        assert!(!pattern.matches(&[0xAA, 0x00]));
    }

    #[test]
    fn test_duplicate_type_id_rejected() {
        let records = vec![record("SAME", "4D5A", 0), record("SAME", "504B", 0)];
        let err = Catalog::from_records(records).unwrap_err();
        assert!(matches!(err, ScanError::DuplicateTypeId(id) if id == "SAME"));
    }

    #[test]
    fn test_pattern_out_of_range_rejected() {
        let records = vec![record("FAR", "4D5A", MAX_SAMPLE_LEN)];
        let err = Catalog::from_records(records).unwrap_err();
        assert!(matches!(err, ScanError::PatternOutOfRange { .. }));
    }

    #[test]
    fn test_empty_magic_rejected() {
        let records = vec![record("EMPTY", "", 0)];
        let err = Catalog::from_records(records).unwrap_err();
        assert!(matches!(err, ScanError::EmptyPattern(id) if id == "EMPTY"));
    }

    #[test]
    fn test_alternative_patterns_fold_into_one_rule() {
        let json = r#"[{
            "type": "TIFF_IMAGE",
            "extensions": ["tif", "tiff"],
            "magic_bytes": ["49492A00", "4D4D002A"],
            "offset": 0,
            "description": "TIFF, both byte orders",
            "risk_level": "low"
        }]"#;
        let catalog = Catalog::load_str(json).unwrap();
        assert_eq!(catalog.len(), 1);
        let rule = catalog.rule("TIFF_IMAGE").unwrap();
        assert_eq!(rule.patterns.len(), 2);
        // Both first bytes are indexed
        assert_eq!(catalog.candidates_for(&[0x49, 0x49]).len(), 1);
        assert_eq!(catalog.candidates_for(&[0x4D, 0x4D]).len(), 1);
        assert!(catalog.candidates_for(&[0x00]).is_empty());
    }

    #[test]
    fn test_index_fallback_for_offset_rules() {
        let records = vec![record("ZERO", "4D5A", 0), record("DEEP", "75737461", 8)];
        let catalog = Catalog::from_records(records).unwrap();
        // Offset-anchored rule is returned regardless of the first byte
        let names: Vec<&str> = catalog
            .candidates_for(&[0x00])
            .iter()
            .map(|r| r.type_id.as_str())
            .collect();
        assert_eq!(names, vec!["DEEP"]);
        let names: Vec<&str> = catalog
            .candidates_for(&[0x4D])
            .iter()
            .map(|r| r.type_id.as_str())
            .collect();
        assert_eq!(names, vec!["ZERO", "DEEP"]);
    }

    #[test]
    fn test_extensions_lowercased() {
        let mut rec = record("UPPER", "4D5A", 0);
        rec.extensions = vec!["EXE".to_string()];
        let catalog = Catalog::from_records(vec![rec]).unwrap();
        assert!(catalog.rule("UPPER").unwrap().claims_extension("exe"));
    }

    #[test]
    fn test_builtin_loads() {
        let catalog = Catalog::builtin();
        assert!(catalog.len() > 40);
        assert!(catalog.rule("PE_EXECUTABLE").is_some());
        assert!(catalog.rule("ZIP_ARCHIVE").is_some());
        assert!(catalog.rule("PDF_DOCUMENT").is_some());
        assert!(catalog.max_exact_len() >= 8);
    }
}
