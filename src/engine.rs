//! Matching engine: ranks catalog rules against a byte sample.
//!
//! Matching is a total, pure function of the sample and the catalog. Every
//! candidate rule from the prefix index is evaluated; a rule matches when
//! any of its alternative patterns matches, and its strongest alternative
//! (most concrete bytes, then lowest offset) represents it in the ranking.

use crate::catalog::{Catalog, SignatureRule};
use crate::sample::ByteSample;

/// One matched rule with its normalized confidence.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub rule: &'a SignatureRule,
    /// `exact_bytes / catalog.max_exact_len()`, in [0, 1]. A full-length
    /// match of the longest catalog pattern approaches 1.0.
    pub confidence: f32,
    /// Offset of the winning alternative pattern.
    pub matched_offset: usize,
    /// Concrete bytes matched by the winning alternative.
    pub exact_bytes: usize,
}

/// Ranked outcome of matching one sample. Empty candidates means the format
/// is not in the catalog, which is distinct from a matched-but-mismatched
/// extension.
#[derive(Debug, Clone, Default)]
pub struct MatchResult<'a> {
    /// Best first; confidences are non-increasing.
    pub candidates: Vec<Candidate<'a>>,
}

impl<'a> MatchResult<'a> {
    pub fn best(&self) -> Option<&Candidate<'a>> {
        self.candidates.first()
    }

    pub fn is_unknown(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Match a sample against the catalog and rank the results.
///
/// Ranking order: higher confidence first; among equals, lower matched
/// offset (content at the file start is more authoritative than embedded
/// headers); then rules claiming the sample's declared extension (keeps
/// ambiguous ZIP-family containers from flagging spuriously); finally
/// type id, for a deterministic order.
pub fn match_sample<'a>(sample: &ByteSample, catalog: &'a Catalog) -> MatchResult<'a> {
    let prefix = sample.prefix.as_slice();
    let max_exact = catalog.max_exact_len() as f32;
    let mut candidates: Vec<Candidate<'a>> = Vec::new();

    for rule in catalog.candidates_for(prefix) {
        let mut best: Option<(usize, usize)> = None; // (exact_bytes, offset)
        for pattern in &rule.patterns {
            if !pattern.matches(prefix) {
                continue;
            }
            let key = (pattern.exact_len(), pattern.offset);
            best = Some(match best {
                Some(current)
                    if current.0 > key.0 || (current.0 == key.0 && current.1 <= key.1) =>
                {
                    current
                }
                _ => key,
            });
        }
        if let Some((exact_bytes, matched_offset)) = best {
            candidates.push(Candidate {
                rule,
                confidence: (exact_bytes as f32 / max_exact).clamp(0.0, 1.0),
                matched_offset,
                exact_bytes,
            });
        }
    }

    rank(&mut candidates, &sample.declared_extension);
    MatchResult { candidates }
}

fn rank(candidates: &mut [Candidate<'_>], declared_extension: &str) {
    candidates.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.matched_offset.cmp(&b.matched_offset))
            .then_with(|| {
                let a_claims = a.rule.claims_extension(declared_extension);
                let b_claims = b.rule.claims_extension(declared_extension);
                b_claims.cmp(&a_claims)
            })
            .then_with(|| a.rule.type_id.cmp(&b.rule.type_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IoConfig;
    use crate::sample::ByteSample;

    fn sample_named(name: &str, data: &[u8]) -> ByteSample {
        ByteSample::from_bytes(name, data, IoConfig::default().max_prefix_len)
    }

    #[test]
    fn test_pe_header_matches() {
        let sample = sample_named("setup.exe", b"MZ\x90\x00\x03\x00");
        let result = match_sample(&sample, Catalog::builtin());
        let best = result.best().unwrap();
        assert_eq!(best.rule.type_id, "PE_EXECUTABLE");
        assert_eq!(best.matched_offset, 0);
        assert_eq!(best.exact_bytes, 2);
        assert!(best.confidence > 0.0);
    }

    #[test]
    fn test_empty_prefix_matches_nothing() {
        let sample = sample_named("empty.bin", b"");
        let result = match_sample(&sample, Catalog::builtin());
        assert!(result.is_unknown());
    }

    #[test]
    fn test_confidence_non_increasing() {
        let sample = sample_named("blob.jpg", b"PK\x03\x04rest of a zip local header");
        let result = match_sample(&sample, Catalog::builtin());
        assert!(!result.is_unknown());
        for pair in result.candidates.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn test_zip_family_ambiguity_prefers_declared_extension() {
        let zip_header = b"PK\x03\x04\x14\x00\x00\x00";
        for (name, expected) in [
            ("app.jar", "JAR_ARCHIVE"),
            ("app.apk", "APK_PACKAGE"),
            ("report.docx", "OOXML_DOCUMENT"),
            ("data.zip", "ZIP_ARCHIVE"),
        ] {
            let sample = sample_named(name, zip_header);
            let result = match_sample(&sample, Catalog::builtin());
            assert_eq!(result.best().unwrap().rule.type_id, expected, "{name}");
        }
    }

    #[test]
    fn test_longer_match_outranks_shorter_at_same_start() {
        // "ftypheic" at offset 4 hits both the generic ISO media rule (4
        // exact bytes) and the HEIC rule (8 exact bytes).
        let mut data = vec![0x00, 0x00, 0x00, 0x20];
        data.extend_from_slice(b"ftypheic");
        let sample = sample_named("photo.heic", &data);
        let result = match_sample(&sample, Catalog::builtin());
        assert_eq!(result.best().unwrap().rule.type_id, "HEIC_IMAGE");
        assert!(result
            .candidates
            .iter()
            .any(|c| c.rule.type_id == "MP4_CONTAINER"));
    }

    #[test]
    fn test_wildcard_positions_match_any_byte() {
        // WEBP: RIFF ???? WEBP, the four size bytes are wildcards.
        let data = b"RIFF\xDE\xAD\xBE\xEFWEBP";
        let sample = sample_named("img.webp", data);
        let result = match_sample(&sample, Catalog::builtin());
        assert_eq!(result.best().unwrap().rule.type_id, "WEBP_IMAGE");
    }

    #[test]
    fn test_short_sample_never_overruns_pattern() {
        // 7 bytes: long enough for RIFF but not for the WEBP/WAV tails.
        let sample = sample_named("img.webp", b"RIFF\xDE\xAD\xBE");
        let result = match_sample(&sample, Catalog::builtin());
        assert!(result
            .candidates
            .iter()
            .all(|c| c.rule.type_id != "WEBP_IMAGE" && c.rule.type_id != "WAV_AUDIO"));
    }

    #[test]
    fn test_offset_anchored_rule_matches() {
        let mut data = vec![0u8; 257];
        data.extend_from_slice(b"ustar\x0000");
        data.extend_from_slice(&[0u8; 64]);
        let sample = sample_named("backup.tar", &data);
        let result = match_sample(&sample, Catalog::builtin());
        assert_eq!(result.best().unwrap().rule.type_id, "TAR_ARCHIVE");
        assert_eq!(result.best().unwrap().matched_offset, 257);
    }

    #[test]
    fn test_equal_confidence_ties_break_deterministically() {
        // CAFEBABE is claimed by both MACHO_FAT_BINARY and JAVA_CLASS with
        // identical exact lengths and offsets.
        let sample = sample_named("Thing.class", &[0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00]);
        let result = match_sample(&sample, Catalog::builtin());
        assert_eq!(result.best().unwrap().rule.type_id, "JAVA_CLASS");

        let sample = sample_named("thing", &[0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00]);
        let result = match_sample(&sample, Catalog::builtin());
        // No extension claim; falls back to type id order.
        assert_eq!(result.best().unwrap().rule.type_id, "JAVA_CLASS");
        assert_eq!(result.candidates[1].rule.type_id, "MACHO_FAT_BINARY");
    }

    #[test]
    fn test_unmatched_garbage_is_unknown() {
        let sample = sample_named("noise.dat", &[0x01, 0x02, 0x03, 0x04, 0x05]);
        let result = match_sample(&sample, Catalog::builtin());
        assert!(result.is_unknown());
    }
}
