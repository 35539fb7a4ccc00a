mod common;

use std::collections::BTreeSet;
use clg::core::config::SearchConfig;
use clg::core::stats::SearchContext;
use clg::core::types::TimeRange;
use clg::query::compiler::{CompileQuery, QueryCompiler};
use clg::search::output::BinaryRecord;
use clg::search::wildcard::WildcardPattern;
use clg::search::{search, SearchRequest};
use clg::storage::archive::Archive;
use common::ArchiveBuilder;
use proptest::prelude::*;

const MESSAGES: &[&str] = &[
    "ERROR connect failed",
    "retry 3 of host-7",
    "retry 12 of host-9",
    "INFO user=alice42 logged in",
    "WARN disk 91% full",
    "job 007 moved to 0x1F",
    "delta -5 for a1b2",
    "ERROR timeout after 250 ms",
];

#[derive(Debug, Clone)]
struct FileSpec {
    segment: u32,
    indexed: bool,
    messages: Vec<usize>,
}

#[derive(Debug, Clone)]
struct QuerySpec {
    source: usize,
    ops: Vec<(u8, usize)>,
    lead: bool,
    trail: bool,
    ignore_case: bool,
}

fn file_spec() -> impl Strategy<Value = FileSpec> {
    (0u32..3, any::<bool>(), prop::collection::vec(0..MESSAGES.len(), 1..5))
        .prop_map(|(segment, indexed, messages)| FileSpec { segment, indexed, messages })
}

fn query_spec() -> impl Strategy<Value = QuerySpec> {
    (
        0..MESSAGES.len(),
        prop::collection::vec((0u8..6, 0usize..8), 6),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(source, ops, lead, trail, ignore_case)| QuerySpec {
            source,
            ops,
            lead,
            trail,
            ignore_case,
        })
}

/// Derives a wildcard query from one of the messages by blurring words.
fn render(spec: &QuerySpec) -> String {
    let words: Vec<String> = MESSAGES[spec.source]
        .split(' ')
        .zip(spec.ops.iter())
        .map(|(word, &(op, k))| match op {
            1 => "*".to_string(),
            2 => format!("{}*", &word[..k % (word.len() + 1)]),
            3 => format!("*{}", &word[k % (word.len() + 1)..]),
            4 => {
                let at = k % word.len();
                format!("{}?{}", &word[..at], &word[at + 1..])
            }
            _ => word.to_string(),
        })
        .collect();
    let mut query = words.join(" ");
    if spec.lead {
        query.insert(0, '*');
    }
    if spec.trail {
        query.push('*');
    }
    if spec.ignore_case {
        query = query.to_lowercase();
    }
    query
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn compiled_queries_never_lose_matches(
        files in prop::collection::vec(file_spec(), 1..5),
        spec in query_spec(),
    ) {
        let mut builder = ArchiveBuilder::new();
        for (i, file) in files.iter().enumerate() {
            let messages: Vec<(i64, &str)> = file
                .messages
                .iter()
                .enumerate()
                .map(|(n, &m)| ((i * 100 + n) as i64, MESSAGES[m]))
                .collect();
            builder = builder.file(&format!("/logs/{}.log", i), file.segment, file.indexed, &messages);
        }
        let buffers = builder.build();

        let raw = render(&spec);
        let pattern = WildcardPattern::parse(&raw).unwrap();
        let mut expected = BTreeSet::new();
        let mut expected_segments = BTreeSet::new();
        for fixture in builder.files() {
            for (ts, message) in &fixture.messages {
                if pattern.is_match_str(message, !spec.ignore_case) {
                    expected.insert((fixture.path.clone(), *ts, message.clone()));
                    if fixture.indexed {
                        expected_segments.insert(fixture.segment);
                    }
                }
            }
        }

        let config = SearchConfig { ignore_case: spec.ignore_case, ..SearchConfig::default() };
        let segments = buffers.segment_slices();
        let archive = Archive::open_in_memory(buffers.addresses(&segments), &config).unwrap();
        let compiler = QueryCompiler::from_config(&config);

        match compiler.compile(&raw, TimeRange::unbounded(), spec.ignore_case, &archive).unwrap() {
            None => prop_assert!(expected.is_empty(), "'{}' compiled to nothing", raw),
            Some(query) if !query.is_superseding() => {
                let candidates = query.candidate_segments();
                for segment in &expected_segments {
                    prop_assert!(candidates.contains(*segment), "'{}' misses segment {}", raw, segment);
                }
            }
            Some(_) => {}
        }

        let mut ctx = SearchContext::begin(config);
        let mut found: Vec<BinaryRecord> = Vec::new();
        search(&archive, &compiler, &SearchRequest::new(raw.clone()), &mut found, &mut ctx).unwrap();
        let actual: BTreeSet<(String, i64, String)> =
            found.iter().map(|r| (r.path.clone(), r.timestamp, r.message.clone())).collect();
        prop_assert_eq!(found.len(), actual.len());
        prop_assert_eq!(actual, expected);
    }
}
