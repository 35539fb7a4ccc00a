use crate::core::error::Result;
use crate::core::stats::{Measurement, SearchContext};
use crate::query::ast::{Query, SubQuery};
use crate::query::planner::SearchPlan;
use crate::search::output::{MatchSink, OutputRecord};
use crate::search::wildcard::WildcardPattern;
use crate::storage::archive::Archive;
use crate::storage::file::CompressedFile;

/// Runs a plan's passes over the archive and streams matches to a sink.
pub struct SearchExecutor<'s, 'a> {
    archive: &'s Archive<'a>,
}

impl<'s, 'a> SearchExecutor<'s, 'a> {
    pub fn new(archive: &'s Archive<'a>) -> Self {
        SearchExecutor { archive }
    }

    /// Returns the number of matches emitted.
    pub fn execute(
        &self,
        plan: &SearchPlan,
        path_filter: Option<&WildcardPattern>,
        sink: &mut dyn MatchSink,
        ctx: &mut SearchContext,
    ) -> Result<usize> {
        let _entered = ctx.span().clone().entered();
        let limit = ctx.config.match_limit();
        let Some(time_range) = plan.queries.first().map(|q| q.time_range) else {
            return Ok(0);
        };
        let mut matches = 0usize;

        ctx.profiler.start(Measurement::Scan);
        let mut files = self.archive.file_iterator(time_range, path_filter.cloned())?;
        'passes: for pass in &plan.passes {
            if matches >= limit {
                break;
            }
            files.set_segment_scope(pass.scope);
            ctx.stats.scan_passes += 1;
            tracing::debug!(scope = ?pass.scope, "Starting scan pass");

            while let Some(record) = files.advance() {
                let mut file = match self.archive.open_file(record) {
                    Ok(file) => file,
                    Err(e) if e.is_recoverable_open_failure() => {
                        tracing::warn!(
                            path = %record.path,
                            kind = ?e.kind,
                            origin = %e.origin,
                            errno = e.errno.unwrap_or(0),
                            "Skipping file: {}",
                            e.context
                        );
                        ctx.stats.files_skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        ctx.profiler.stop(Measurement::Scan);
                        return Err(e.with_context(format!("Opening {}", record.path)));
                    }
                };
                ctx.stats.files_scanned += 1;

                for query in &plan.queries {
                    let relevant: Vec<&SubQuery> = query
                        .sub_queries
                        .iter()
                        .filter(|sub_query| sub_query.is_relevant_to(&file))
                        .collect();
                    if !query.is_superseding() && relevant.is_empty() {
                        continue;
                    }

                    file.reset_indices();
                    match self.scan_file(&mut file, query, &relevant, limit - matches, sink, ctx) {
                        Ok(found) => matches += found,
                        Err(e) => {
                            ctx.profiler.stop(Measurement::Scan);
                            return Err(e.with_context(format!("Searching {}", file.path())));
                        }
                    }
                    if matches >= limit {
                        break 'passes;
                    }
                }
            }
        }
        ctx.profiler.stop(Measurement::Scan);
        ctx.stats.matches += matches;
        Ok(matches)
    }

    fn scan_file(
        &self,
        file: &mut CompressedFile,
        query: &Query,
        relevant: &[&SubQuery],
        budget: usize,
        sink: &mut dyn MatchSink,
        ctx: &mut SearchContext,
    ) -> Result<usize> {
        let path = file.path().to_string();
        let mut found = 0usize;

        while found < budget {
            let Some(message) = file.next_message() else {
                break;
            };
            ctx.stats.messages_tested += 1;
            if !query.time_range.contains(message.timestamp) {
                continue;
            }
            if !query.is_superseding()
                && !relevant
                    .iter()
                    .any(|sub_query| sub_query.matches_message(message.logtype_id, message.kinds, message.variables))
            {
                continue;
            }

            let text = self.archive.decode(&message)?;
            if !query.matches_text(&text) {
                continue;
            }
            sink.write_match(&OutputRecord {
                path: &path,
                timestamp: message.timestamp,
                logtype_id: message.logtype_id,
                message: &text,
            });
            found += 1;
        }
        Ok(found)
    }
}
