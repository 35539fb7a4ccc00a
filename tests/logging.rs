mod common;

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use clg::core::config::SearchConfig;
use clg::core::stats::SearchContext;
use clg::query::compiler::QueryCompiler;
use clg::search::output::BinaryRecord;
use clg::search::{search, SearchRequest};
use clg::storage::archive::Archive;
use common::ArchiveBuilder;
use tracing::Level;

/// Collects formatted log lines for inspection.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()
    }
}

fn with_captured_logs<F: FnOnce()>(f: F) -> Vec<String> {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    captured.lines()
}

#[test]
fn dropped_query_warning_names_its_origin() {
    let buffers = ArchiveBuilder::new()
        .file("/var/log/a.log", 0, true, &[(1000, "ERROR connect failed")])
        .build();
    let segments = buffers.segment_slices();
    let config = SearchConfig::default();
    let archive = Archive::open_in_memory(buffers.addresses(&segments), &config).unwrap();
    let compiler = QueryCompiler::from_config(&config);

    let lines = with_captured_logs(|| {
        let mut ctx = SearchContext::begin(config.clone());
        let mut found: Vec<BinaryRecord> = Vec::new();
        let request = SearchRequest::new("dangling\\");
        search(&archive, &compiler, &request, &mut found, &mut ctx).unwrap();
    });

    let warning = lines
        .iter()
        .find(|line| line.contains("Ignoring invalid query"))
        .expect("warning logged");
    assert!(warning.contains("kind=InvalidQuery"), "{}", warning);
    assert!(warning.contains("origin=src/search/wildcard.rs:"), "{}", warning);
}

#[test]
fn skipped_file_warning_names_its_origin() {
    let buffers = ArchiveBuilder::new()
        .file("/var/log/a.log", 0, true, &[(1000, "ERROR connect failed")])
        .file("/var/log/b.log", 1, true, &[(2000, "ERROR disk full")])
        .build();
    let dir = tempfile::tempdir().unwrap();
    buffers.write_dir(dir.path());
    std::fs::remove_file(dir.path().join("s").join("1")).unwrap();

    let config = SearchConfig::default();
    let archive = Archive::open_dir(dir.path(), &config).unwrap();
    let compiler = QueryCompiler::from_config(&config);

    let lines = with_captured_logs(|| {
        let mut ctx = SearchContext::begin(config.clone());
        let mut found: Vec<BinaryRecord> = Vec::new();
        search(&archive, &compiler, &SearchRequest::new("ERROR*"), &mut found, &mut ctx).unwrap();
        assert_eq!(found.len(), 1);
    });

    let warning = lines
        .iter()
        .find(|line| line.contains("Skipping file"))
        .expect("warning logged");
    assert!(warning.contains("kind=FileNotFound"), "{}", warning);
    assert!(warning.contains("origin=src/storage/segment.rs:"), "{}", warning);
}
