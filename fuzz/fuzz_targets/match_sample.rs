#![no_main]
use libfuzzer_sys::fuzz_target;

use filesig::catalog::Catalog;
use filesig::config::ScoringConfig;
use filesig::engine::match_sample;
use filesig::sample::ByteSample;
use filesig::verdict::{score, ArchiveContext};

fuzz_target!(|data: &[u8]| {
    let sample = ByteSample::from_bytes("<fuzz>.bin", data, 512);
    let result = match_sample(&sample, Catalog::builtin());
    for pair in result.candidates.windows(2) {
        assert!(pair[0].confidence >= pair[1].confidence);
    }
    let verdict = score(
        &sample,
        &result,
        &ArchiveContext::default(),
        &ScoringConfig::default(),
    );
    assert!(verdict.risk_score <= 100);
});
