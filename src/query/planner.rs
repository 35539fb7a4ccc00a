use roaring::RoaringBitmap;
use crate::core::error::{ErrorKind, Result};
use crate::core::stats::{Measurement, SearchContext};
use crate::core::types::{SegmentId, TimeRange};
use crate::query::ast::Query;
use crate::query::compiler::CompileQuery;
use crate::storage::archive::Archive;
use crate::storage::metadata::SegmentScope;

/// One sweep over the file metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPass {
    pub scope: SegmentScope,
}

/// Queries to apply and the passes to apply them in.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub queries: Vec<Query>,
    pub passes: Vec<ScanPass>,
}

impl SearchPlan {
    pub fn empty() -> Self {
        SearchPlan { queries: Vec::new(), passes: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn is_superseding(&self) -> bool {
        self.queries.len() == 1 && self.queries[0].is_superseding()
    }
}

/// Compiles every search string of an invocation and lays out the scan.
pub struct QueryPlanner<'c, C: CompileQuery> {
    compiler: &'c C,
}

impl<'c, C: CompileQuery> QueryPlanner<'c, C> {
    pub fn new(compiler: &'c C) -> Self {
        QueryPlanner { compiler }
    }

    pub fn plan(
        &self,
        archive: &Archive<'_>,
        raw_queries: &[String],
        time_range: TimeRange,
        ctx: &mut SearchContext,
    ) -> Result<SearchPlan> {
        let _entered = ctx.span().clone().entered();
        let ignore_case = ctx.config.ignore_case;
        let mut queries = Vec::new();
        let mut segments = RoaringBitmap::new();

        ctx.profiler.start(Measurement::Compile);
        for raw in raw_queries {
            let compiled = self.compiler.compile(raw, time_range, ignore_case, archive);
            let query = match compiled {
                Ok(Some(query)) => query,
                Ok(None) => {
                    tracing::debug!(query = %raw, "Query matches nothing");
                    ctx.stats.queries_dropped += 1;
                    continue;
                }
                Err(e) if e.kind == ErrorKind::InvalidQuery => {
                    tracing::warn!(
                        query = %raw,
                        kind = ?e.kind,
                        origin = %e.origin,
                        "Ignoring invalid query: {}",
                        e.context
                    );
                    ctx.stats.queries_dropped += 1;
                    continue;
                }
                Err(e) => {
                    ctx.profiler.stop(Measurement::Compile);
                    return Err(e.with_context(format!("Compiling '{}'", raw)));
                }
            };
            ctx.stats.queries_compiled += 1;

            if query.is_superseding() {
                tracing::debug!(query = %raw, "Query supersedes all others");
                ctx.profiler.stop(Measurement::Compile);
                return Ok(SearchPlan {
                    queries: vec![query],
                    passes: vec![ScanPass { scope: SegmentScope::Any }],
                });
            }
            segments |= query.candidate_segments();
            queries.push(query);
        }
        ctx.profiler.stop(Measurement::Compile);

        if queries.is_empty() {
            return Ok(SearchPlan::empty());
        }

        let mut passes = Vec::with_capacity(segments.len() as usize + 1);
        passes.push(ScanPass { scope: SegmentScope::Unsegmented });
        passes.extend(segments.iter().map(|id| ScanPass {
            scope: SegmentScope::Segment(SegmentId(id)),
        }));
        tracing::debug!(queries = queries.len(), passes = passes.len(), "Planned search");
        Ok(SearchPlan { queries, passes })
    }
}
