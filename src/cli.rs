use std::ffi::OsString;
use std::fs;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use clap::Parser;
use clap::error::ErrorKind as ClapErrorKind;
use tracing_subscriber::EnvFilter;
use crate::core::config::{OutputMethod, SearchConfig};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::stats::SearchContext;
use crate::core::time::{normalize_bound, Zone};
use crate::core::types::{EpochMillis, TimeRange};
use crate::query::compiler::QueryCompiler;
use crate::search::output::OutputSink;
use crate::search::wildcard::WildcardPattern;
use crate::search::{search, SearchRequest};
use crate::storage::archive::{Archive, ArchiveAddresses};

#[derive(Debug, Parser)]
#[command(
    name = "clg",
    about = "Search a compressed log archive with wildcard patterns",
    version
)]
pub struct Cli {
    /// Archive directory (ignored when the archive is supplied in memory)
    pub archive: PathBuf,

    /// Wildcard search string; `*` and `?` are wildcards, `\` escapes
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub query: Option<String>,

    /// File of search strings, one per line
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Only messages at or after this epoch millisecond
    #[arg(long, allow_hyphen_values = true)]
    pub tge: Option<EpochMillis>,

    /// Only messages at or before this epoch millisecond
    #[arg(long, allow_hyphen_values = true)]
    pub tle: Option<EpochMillis>,

    /// Timezone the bounds are given in: local, utc, +HH:MM or an IANA name
    #[arg(long, default_value = "utc")]
    pub timezone: Zone,

    /// Case-insensitive match
    #[arg(short = 'i', long = "ignore-case")]
    pub ignore_case: bool,

    /// Only files whose path matches this wildcard pattern
    #[arg(long = "file-path")]
    pub file_path: Option<String>,

    #[arg(long, value_enum, default_value = "text")]
    pub output_method: OutputMethod,

    /// Stop after this many matches
    #[arg(long)]
    pub max_matches: Option<usize>,

    /// Treat any ambiguous wildcard token as matching everything
    #[arg(long)]
    pub no_heuristic: bool,
}

impl Cli {
    pub fn config(&self) -> SearchConfig {
        SearchConfig {
            ignore_case: self.ignore_case,
            use_heuristic: !self.no_heuristic,
            max_matches: self.max_matches,
            output_method: self.output_method,
            ..SearchConfig::default()
        }
    }

    pub fn request(&self) -> Result<SearchRequest> {
        let queries = match (&self.query, &self.file) {
            (Some(query), _) => vec![query.clone()],
            (None, Some(path)) => {
                let contents = fs::read_to_string(path)
                    .map_err(|e| Error::from(e).with_context(format!("Reading {}", path.display())))?;
                contents
                    .lines()
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            (None, None) => {
                return Err(Error::new(ErrorKind::InvalidArgument, "No search string given"));
            }
        };

        let begin = normalize_bound(self.tge.unwrap_or(EpochMillis::MIN), self.timezone)?;
        let end = normalize_bound(self.tle.unwrap_or(EpochMillis::MAX), self.timezone)?;

        let path_filter = match self.file_path.as_deref() {
            None | Some("") => None,
            Some(pattern) => Some(
                WildcardPattern::parse(pattern)
                    .map_err(|e| e.with_kind(ErrorKind::InvalidArgument))?,
            ),
        };

        Ok(SearchRequest {
            queries,
            time_range: TimeRange::new(begin, end),
            path_filter,
        })
    }
}

/// Install the stderr subscriber. Tolerates one already being set.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Parse arguments. `Err` carries the exit code to return right away.
fn parse<I, T>(args: I) -> std::result::Result<Cli, i32>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(cli),
        Err(e) => {
            let _ = e.print();
            match e.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => Err(0),
                _ => Err(-1),
            }
        }
    }
}

/// Entry point of the `clg` binary: search an archive directory.
pub fn run<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    init_logging();
    let cli = match parse(args) {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    let config = cli.config();
    let archive = match Archive::open_dir(&cli.archive, &config) {
        Ok(archive) => archive,
        Err(e) => {
            e.log("Opening archive");
            return -1;
        }
    };
    search_archive(archive, &cli, config)
}

/// Same as `run`, over an archive whose buffers the caller owns.
pub fn search_in_memory<I, T>(args: I, addresses: ArchiveAddresses<'_>) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    init_logging();
    let cli = match parse(args) {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    let config = cli.config();
    let archive = match Archive::open_in_memory(addresses, &config) {
        Ok(archive) => archive,
        Err(e) => {
            e.log("Opening archive");
            return -1;
        }
    };
    search_archive(archive, &cli, config)
}

fn search_archive(mut archive: Archive<'_>, cli: &Cli, config: SearchConfig) -> i32 {
    let request = match cli.request() {
        Ok(request) => request,
        Err(e) => {
            e.log("Reading arguments");
            return -1;
        }
    };

    let compiler = QueryCompiler::from_config(&config);
    let output_method = config.output_method;
    let mut ctx = SearchContext::begin(config);
    let stdout = io::stdout();
    let mut sink = OutputSink::new(output_method, BufWriter::new(stdout.lock()));

    let outcome = search(&archive, &compiler, &request, &mut sink, &mut ctx);
    let _ = sink.flush();
    let stats = ctx.finish();

    if !archive.close() {
        tracing::warn!("Archive still had open cursors at exit");
    }
    match outcome {
        Ok(_) => {
            tracing::debug!(matches = stats.matches, "Search finished");
            0
        }
        Err(e) => {
            e.log("Search");
            -1
        }
    }
}
