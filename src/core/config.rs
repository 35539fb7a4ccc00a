/// How matches are serialized to the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputMethod {
    Text,    // "<path>:<message>"
    Binary,  // length-prefixed frames
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub ignore_case: bool,
    pub use_heuristic: bool,
    pub max_matches: Option<usize>,             // None: unbounded
    pub max_interpretations: usize,             // Above this a query supersedes
    pub segment_cache_capacity: usize,          // Decompressed segments kept
    pub output_method: OutputMethod,
}

impl SearchConfig {
    /// Match-count cap as a plain limit.
    pub fn match_limit(&self) -> usize {
        self.max_matches.unwrap_or(usize::MAX)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            ignore_case: false,
            use_heuristic: true,
            max_matches: None,
            max_interpretations: 4096,
            segment_cache_capacity: 16,
            output_method: OutputMethod::Text,
        }
    }
}
