use std::collections::HashSet;
use roaring::RoaringBitmap;
use crate::analysis::lexer::{ByteLexer, Openness};
use crate::analysis::token::{TokenKind, TokenKinds};
use crate::core::config::SearchConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{LogtypeId, TimeRange};
use crate::index::encoding::{is_placeholder, placeholder_kinds, DICTIONARY_PLACEHOLDER, INTEGER_PLACEHOLDER};
use crate::query::ast::{constraints_fit, Query, SubQuery, VarConstraint};
use crate::search::wildcard::{PatternItem, WildcardPattern};
use crate::storage::archive::Archive;

/// Anything able to turn a raw search string into a `Query`.
///
/// `Ok(None)` means the string provably matches nothing in the archive.
pub trait CompileQuery {
    fn compile(
        &self,
        raw: &str,
        time_range: TimeRange,
        ignore_case: bool,
        archive: &Archive<'_>,
    ) -> Result<Option<Query>>;
}

/// Compiles wildcard search strings against an archive's dictionaries and
/// segment indexes.
pub struct QueryCompiler {
    forward: ByteLexer,
    reverse: ByteLexer,
    use_heuristic: bool,
    max_interpretations: usize,
}

/// A query broken at its literal delimiters
enum Piece<'q> {
    Delimiter(u8),
    Token(&'q [PatternItem]),
}

/// How one query token may appear in a logtype, and what it then requires
/// of the message's variables.
#[derive(Debug, Clone, PartialEq)]
struct Interpretation {
    items: Vec<PatternItem>,
    constraints: Vec<VarConstraint>,
}

impl Interpretation {
    fn literal(items: &[PatternItem]) -> Self {
        Interpretation { items: items.to_vec(), constraints: Vec::new() }
    }

    fn variable(placeholder: u8, constraint: VarConstraint) -> Self {
        Interpretation {
            items: vec![PatternItem::Literal(placeholder)],
            constraints: vec![constraint],
        }
    }

    fn empty() -> Self {
        Interpretation { items: Vec::new(), constraints: Vec::new() }
    }
}

enum Resolution {
    Superseding,
    Interpretations(Vec<Vec<Interpretation>>),
    Nothing,
}

impl QueryCompiler {
    /// Both lexers must share one delimiter table.
    pub fn new(forward: ByteLexer, reverse: ByteLexer, use_heuristic: bool, max_interpretations: usize) -> Result<Self> {
        if !forward.same_delimiters(&reverse) {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Forward and reverse lexers disagree on delimiters",
            ));
        }
        Ok(QueryCompiler {
            forward,
            reverse,
            use_heuristic,
            max_interpretations,
        })
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        QueryCompiler {
            forward: ByteLexer::forward(),
            reverse: ByteLexer::reverse(),
            use_heuristic: config.use_heuristic,
            max_interpretations: config.max_interpretations,
        }
    }

    fn split<'q>(&self, items: &'q [PatternItem]) -> Vec<Piece<'q>> {
        let mut pieces = Vec::new();
        let mut start = None;
        for (i, item) in items.iter().enumerate() {
            match item {
                PatternItem::Literal(b) if self.forward.is_delimiter(*b) => {
                    if let Some(s) = start.take() {
                        pieces.push(Piece::Token(&items[s..i]));
                    }
                    pieces.push(Piece::Delimiter(*b));
                }
                _ => {
                    start.get_or_insert(i);
                }
            }
        }
        if let Some(s) = start {
            pieces.push(Piece::Token(&items[s..]));
        }
        pieces
    }

    fn interpret_token(&self, token: &[PatternItem], archive: &Archive<'_>, case_sensitive: bool) -> Vec<Interpretation> {
        if token.iter().all(|item| *item == PatternItem::AnyMany) {
            return vec![Interpretation::literal(token)];
        }

        let mut interpretations = Vec::new();
        if !token.iter().any(PatternItem::is_wildcard) {
            let bytes: Vec<u8> = token
                .iter()
                .filter_map(|item| match item {
                    PatternItem::Literal(b) => Some(*b),
                    _ => None,
                })
                .collect();
            match self.forward.classify_token(&bytes) {
                TokenKind::Static => interpretations.push(Interpretation::literal(token)),
                TokenKind::Integer => interpretations.push(Interpretation::variable(
                    INTEGER_PLACEHOLDER,
                    VarConstraint::Integer(WildcardPattern::literal(&bytes)),
                )),
                TokenKind::Dictionary => {
                    let value = String::from_utf8_lossy(&bytes);
                    let ids = archive.var_dictionary().lookup_all(&value, case_sensitive);
                    if !ids.is_empty() {
                        interpretations.push(Interpretation::variable(
                            DICTIONARY_PLACEHOLDER,
                            VarConstraint::Dictionary(ids),
                        ));
                    }
                }
            }
            return interpretations;
        }

        // The wildcards stay inside one message token
        let whole = self
            .forward
            .classify_fragment(token, Openness::CLOSED)
            .union(self.reverse.classify_fragment(token, Openness::CLOSED));
        self.push_fragment(&mut interpretations, whole, token, token, archive, case_sensitive);

        // The wildcards span delimiters: the first message token starts with
        // the literal prefix, the last ends with the literal suffix
        let prefix_len = token.iter().take_while(|item| !item.is_wildcard()).count();
        let suffix_len = token.iter().rev().take_while(|item| !item.is_wildcard()).count();
        let (prefix, suffix) = (&token[..prefix_len], &token[token.len() - suffix_len..]);

        let heads = self.end_interpretations(prefix, true, archive, case_sensitive);
        let tails = self.end_interpretations(suffix, false, archive, case_sensitive);
        for head in &heads {
            for tail in &tails {
                let mut items = head.items.clone();
                items.push(PatternItem::AnyMany);
                items.extend_from_slice(&tail.items);
                let mut constraints = head.constraints.clone();
                constraints.extend(tail.constraints.iter().cloned());
                let spanning = Interpretation { items, constraints };
                if !interpretations.contains(&spanning) {
                    interpretations.push(spanning);
                }
            }
        }
        interpretations
    }

    /// Interpretations of the literal prefix (or suffix) of a token whose
    /// wildcards span delimiters.
    fn end_interpretations(&self, literal: &[PatternItem], is_prefix: bool, archive: &Archive<'_>, case_sensitive: bool) -> Vec<Interpretation> {
        if literal.is_empty() {
            return vec![Interpretation::empty()];
        }
        let (kinds, open) = if is_prefix {
            (self.forward.classify_fragment(literal, Openness::RIGHT), Openness::RIGHT)
        } else {
            (self.reverse.classify_fragment(literal, Openness::LEFT), Openness::LEFT)
        };

        let mut value_items = Vec::with_capacity(literal.len() + 2);
        if open.left {
            value_items.push(PatternItem::AnyMany);
        }
        value_items.extend_from_slice(literal);
        if open.right {
            value_items.push(PatternItem::AnyMany);
        }

        let mut interpretations = Vec::new();
        self.push_fragment(&mut interpretations, kinds, literal, &value_items, archive, case_sensitive);
        interpretations
    }

    /// Add one interpretation per possible kind. `static_items` is what a
    /// static token contributes to the logtype; `value_items` is the pattern
    /// a variable's value must match.
    fn push_fragment(
        &self,
        out: &mut Vec<Interpretation>,
        kinds: TokenKinds,
        static_items: &[PatternItem],
        value_items: &[PatternItem],
        archive: &Archive<'_>,
        case_sensitive: bool,
    ) {
        for kind in kinds.iter() {
            let interpretation = match kind {
                TokenKind::Static => Interpretation::literal(static_items),
                TokenKind::Integer => Interpretation::variable(
                    INTEGER_PLACEHOLDER,
                    VarConstraint::Integer(WildcardPattern::from_items(value_items.to_vec())),
                ),
                TokenKind::Dictionary => {
                    let pattern = WildcardPattern::from_items(value_items.to_vec());
                    let ids = archive.var_dictionary().search(&pattern, case_sensitive);
                    if ids.is_empty() {
                        continue;
                    }
                    Interpretation::variable(DICTIONARY_PLACEHOLDER, VarConstraint::Dictionary(ids))
                }
            };
            if !out.contains(&interpretation) {
                out.push(interpretation);
            }
        }
    }

    fn resolve(&self, pieces: &[Piece<'_>], archive: &Archive<'_>, case_sensitive: bool) -> Resolution {
        let mut per_token = Vec::new();
        let mut combinations: usize = 1;
        for piece in pieces {
            let Piece::Token(token) = piece else { continue };
            let interpretations = self.interpret_token(token, archive, case_sensitive);
            if interpretations.is_empty() {
                return Resolution::Nothing;
            }
            if !self.use_heuristic && interpretations.len() > 1 {
                tracing::debug!("Ambiguous token with heuristic disabled, query supersedes");
                return Resolution::Superseding;
            }
            combinations = combinations.saturating_mul(interpretations.len());
            if combinations > self.max_interpretations {
                tracing::debug!(limit = self.max_interpretations, "Too many interpretations, query supersedes");
                return Resolution::Superseding;
            }
            per_token.push(interpretations);
        }
        Resolution::Interpretations(per_token)
    }

    /// Every combination of per-token choices as a logtype pattern plus the
    /// constraints it implies. Identical combinations appear once.
    fn combinations(&self, pieces: &[Piece<'_>], per_token: &[Vec<Interpretation>]) -> Vec<(WildcardPattern, Vec<VarConstraint>)> {
        let mut seen = HashSet::new();
        let mut combinations = Vec::new();
        let mut choice = vec![0usize; per_token.len()];

        loop {
            let mut items = Vec::new();
            let mut constraints = Vec::new();
            let mut token_index = 0;
            for piece in pieces {
                match piece {
                    Piece::Delimiter(b) => items.push(PatternItem::Literal(*b)),
                    Piece::Token(_) => {
                        let chosen = &per_token[token_index][choice[token_index]];
                        items.extend_from_slice(&chosen.items);
                        constraints.extend(chosen.constraints.iter().cloned());
                        token_index += 1;
                    }
                }
            }
            let combination = (WildcardPattern::from_items(items), constraints);
            if seen.insert(combination.clone()) {
                combinations.push(combination);
            }

            // Odometer over the per-token choices
            let mut position = choice.len();
            loop {
                if position == 0 {
                    return combinations;
                }
                position -= 1;
                choice[position] += 1;
                if choice[position] < per_token[position].len() {
                    break;
                }
                choice[position] = 0;
            }
        }
    }

    /// One pass over the logtype dictionary, testing each logtype against
    /// every combination.
    fn build_sub_queries(
        &self,
        pieces: &[Piece<'_>],
        per_token: &[Vec<Interpretation>],
        archive: &Archive<'_>,
        case_sensitive: bool,
    ) -> Vec<SubQuery> {
        let combinations = self.combinations(pieces, per_token);
        let mut seen: HashSet<(LogtypeId, &[VarConstraint])> = HashSet::new();
        let mut sub_queries = Vec::new();

        for (logtype_id, logtype) in archive.logtype_dictionary().iter() {
            for (pattern, constraints) in &combinations {
                if !pattern.is_match_str(logtype, case_sensitive) {
                    continue;
                }
                if !seen.insert((logtype_id, constraints.as_slice())) {
                    continue;
                }
                if let Some(sub_query) = self.bind_segments(logtype_id, logtype, constraints, archive) {
                    sub_queries.push(sub_query);
                }
            }
        }
        sub_queries
    }

    fn bind_segments(&self, logtype_id: LogtypeId, logtype: &str, constraints: &[VarConstraint], archive: &Archive<'_>) -> Option<SubQuery> {
        let kinds: Vec<TokenKind> = placeholder_kinds(logtype).collect();
        if !constraints_fit(constraints, &kinds) {
            return None;
        }

        let mut segments: RoaringBitmap = archive
            .logtype_segment_index()
            .segments_of(logtype_id)
            .cloned()
            .unwrap_or_default();
        for constraint in constraints {
            if let VarConstraint::Dictionary(ids) = constraint {
                segments &= archive.var_segment_index().union_of(ids);
            }
        }
        Some(SubQuery::new(logtype_id, constraints.to_vec(), segments))
    }
}

impl CompileQuery for QueryCompiler {
    fn compile(
        &self,
        raw: &str,
        time_range: TimeRange,
        ignore_case: bool,
        archive: &Archive<'_>,
    ) -> Result<Option<Query>> {
        if time_range.is_empty() {
            return Ok(None);
        }
        let pattern = WildcardPattern::parse(raw)?;
        let mut query = Query {
            raw: raw.to_string(),
            pattern,
            ignore_case,
            time_range,
            sub_queries: Vec::new(),
        };

        if query.pattern.is_unconstrained() {
            return Ok(Some(query));
        }
        // Messages never contain placeholder bytes
        if query
            .pattern
            .items()
            .iter()
            .any(|item| matches!(item, PatternItem::Literal(b) if is_placeholder(*b)))
        {
            return Ok(None);
        }

        let case_sensitive = !ignore_case;
        let items = query.pattern.items().to_vec();
        let pieces = self.split(&items);
        match self.resolve(&pieces, archive, case_sensitive) {
            Resolution::Superseding => Ok(Some(query)),
            Resolution::Nothing => Ok(None),
            Resolution::Interpretations(per_token) => {
                query.sub_queries = self.build_sub_queries(&pieces, &per_token, archive, case_sensitive);
                if query.sub_queries.is_empty() {
                    return Ok(None);
                }
                tracing::debug!(query = raw, sub_queries = query.sub_queries.len(), "Compiled query");
                Ok(Some(query))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::lexer::Direction;

    #[test]
    fn lexers_must_share_delimiters() {
        let forward = ByteLexer::forward();
        let reverse = ByteLexer::new(Direction::Reverse, b" ");
        let err = QueryCompiler::new(forward, reverse, true, 16).err().unwrap();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn splits_at_literal_delimiters_only() {
        let compiler = QueryCompiler::from_config(&SearchConfig::default());
        let pattern = WildcardPattern::parse("ERROR *=4? x").unwrap();
        let pieces = compiler.split(pattern.items());
        let shape: Vec<String> = pieces
            .iter()
            .map(|p| match p {
                Piece::Delimiter(b) => format!("d{}", *b as char),
                Piece::Token(t) => format!("t{}", WildcardPattern::from_items(t.to_vec())),
            })
            .collect();
        assert_eq!(shape, vec!["tERROR", "d ", "t*", "d=", "t4?", "d ", "tx"]);
    }

    #[test]
    fn combinations_cover_the_product_once() {
        let compiler = QueryCompiler::from_config(&SearchConfig::default());
        let pattern = WildcardPattern::parse("a b").unwrap();
        let pieces = compiler.split(pattern.items());
        let any = PatternItem::AnyMany;
        let per_token = vec![
            // Both collapse to a single `*`
            vec![
                Interpretation::literal(&[any]),
                Interpretation::literal(&[any, any]),
            ],
            vec![
                Interpretation::literal(&[PatternItem::Literal(b'b')]),
                Interpretation::variable(
                    INTEGER_PLACEHOLDER,
                    VarConstraint::Integer(WildcardPattern::parse("1*").unwrap()),
                ),
            ],
        ];
        let combinations = compiler.combinations(&pieces, &per_token);
        let rendered: Vec<String> = combinations.iter().map(|(p, c)| format!("{}/{}", p, c.len())).collect();
        assert_eq!(rendered, vec!["* b/0", "* \\x11/1"]);
    }
}
