pub mod wildcard;
pub mod output;
pub mod executor;

use crate::core::error::Result;
use crate::core::stats::SearchContext;
use crate::core::types::TimeRange;
use crate::query::compiler::CompileQuery;
use crate::query::planner::QueryPlanner;
use crate::search::executor::SearchExecutor;
use crate::search::output::MatchSink;
use crate::search::wildcard::WildcardPattern;
use crate::storage::archive::Archive;

/// What one invocation searches for
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub queries: Vec<String>,
    pub time_range: TimeRange,
    pub path_filter: Option<WildcardPattern>,
}

impl SearchRequest {
    pub fn new<S: Into<String>>(query: S) -> Self {
        SearchRequest {
            queries: vec![query.into()],
            time_range: TimeRange::unbounded(),
            path_filter: None,
        }
    }
}

/// Compile, plan and execute a request. Returns the match count.
pub fn search<C: CompileQuery>(
    archive: &Archive<'_>,
    compiler: &C,
    request: &SearchRequest,
    sink: &mut dyn MatchSink,
    ctx: &mut SearchContext,
) -> Result<usize> {
    let plan = QueryPlanner::new(compiler).plan(archive, &request.queries, request.time_range, ctx)?;
    if plan.is_empty() {
        tracing::debug!("No query can match, nothing to scan");
        return Ok(0);
    }
    SearchExecutor::new(archive).execute(&plan, request.path_filter.as_ref(), sink, ctx)
}
