use std::time::{Duration, Instant};
use crate::core::config::SearchConfig;

/// Named wall-clock measurements taken over an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measurement {
    Search,
    Compile,
    Scan,
}

/// Counters collected while searching
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub queries_compiled: usize,
    pub queries_dropped: usize,
    pub scan_passes: usize,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub messages_tested: usize,
    pub matches: usize,
}

/// Continuous measurements: start/stop pairs accumulate into a total.
#[derive(Debug, Default)]
pub struct Profiler {
    running: Vec<(Measurement, Instant)>,
    totals: Vec<(Measurement, Duration)>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, measurement: Measurement) {
        self.running.retain(|(m, _)| *m != measurement);
        self.running.push((measurement, Instant::now()));
    }

    pub fn stop(&mut self, measurement: Measurement) {
        let Some(pos) = self.running.iter().position(|(m, _)| *m == measurement) else {
            return;
        };
        let (_, started) = self.running.swap_remove(pos);
        let elapsed = started.elapsed();
        match self.totals.iter_mut().find(|(m, _)| *m == measurement) {
            Some((_, total)) => *total += elapsed,
            None => self.totals.push((measurement, elapsed)),
        }
    }

    pub fn total(&self, measurement: Measurement) -> Duration {
        self.totals
            .iter()
            .find(|(m, _)| *m == measurement)
            .map(|(_, d)| *d)
            .unwrap_or_default()
    }
}

/// Per-invocation state handed to every component that logs or measures.
/// Created by `begin`, reported and dropped by `finish`.
pub struct SearchContext {
    pub config: SearchConfig,
    pub profiler: Profiler,
    pub stats: SearchStats,
    span: tracing::Span,
}

impl SearchContext {
    pub fn begin(config: SearchConfig) -> Self {
        let span = tracing::info_span!("search", ignore_case = config.ignore_case);
        let mut profiler = Profiler::new();
        profiler.start(Measurement::Search);
        SearchContext {
            config,
            profiler,
            stats: SearchStats::default(),
            span,
        }
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub fn finish(mut self) -> SearchStats {
        self.profiler.stop(Measurement::Search);
        let _entered = self.span.enter();
        tracing::debug!(
            search_ms = self.profiler.total(Measurement::Search).as_millis() as u64,
            compile_ms = self.profiler.total(Measurement::Compile).as_millis() as u64,
            scan_ms = self.profiler.total(Measurement::Scan).as_millis() as u64,
            files_scanned = self.stats.files_scanned,
            files_skipped = self.stats.files_skipped,
            messages_tested = self.stats.messages_tested,
            "# matches found: {}",
            self.stats.matches
        );
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_without_start_is_ignored() {
        let mut profiler = Profiler::new();
        profiler.stop(Measurement::Scan);
        assert_eq!(profiler.total(Measurement::Scan), Duration::ZERO);
    }

    #[test]
    fn measurements_accumulate() {
        let mut profiler = Profiler::new();
        profiler.start(Measurement::Compile);
        std::thread::sleep(Duration::from_millis(2));
        profiler.stop(Measurement::Compile);
        let first = profiler.total(Measurement::Compile);
        profiler.start(Measurement::Compile);
        profiler.stop(Measurement::Compile);
        assert!(profiler.total(Measurement::Compile) >= first);
        assert!(first >= Duration::from_millis(2));
    }
}
