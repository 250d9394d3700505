#![no_main]

use attrgate_abac::{
    Evaluator, FlushMode, Pipeline, PipelineOptions, Policy, decoder, decode_record,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Single record: must decode or fail cleanly.
    match decode_record(data) {
        Ok(None) => assert!(decoder::is_blank(data)),
        Ok(Some(_)) => {}
        Err(err) => assert!(!err.kind().is_empty()),
    }

    // Whole stream: one decision line per non-blank record, nothing else.
    let pipeline = Pipeline::new(
        Evaluator::new(Policy::standard()),
        PipelineOptions {
            flush: FlushMode::OnExit,
            max_record_bytes: 256,
        },
    );
    let mut output = Vec::new();
    let stats = pipeline
        .run(data, &mut output)
        .expect("in-memory streams never fail");

    let text = std::str::from_utf8(&output).expect("decisions are ASCII");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len() as u64, stats.decisions());
    assert_eq!(stats.records, stats.decisions() + stats.blank);
    assert!(
        lines
            .iter()
            .all(|line| *line == "authorized" || *line == "unauthorized")
    );
});
