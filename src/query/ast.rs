use roaring::RoaringBitmap;
use crate::analysis::token::TokenKind;
use crate::core::types::{LogtypeId, SegmentId, TimeRange, VariableId};
use crate::search::wildcard::WildcardPattern;
use crate::storage::file::CompressedFile;

/// Requirement on one variable of a message, in query order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarConstraint {
    Integer(WildcardPattern),    // Decimal text of the value must match
    Dictionary(Vec<VariableId>), // Value must be one of these ids, sorted
}

impl VarConstraint {
    pub fn kind(&self) -> TokenKind {
        match self {
            VarConstraint::Integer(_) => TokenKind::Integer,
            VarConstraint::Dictionary(_) => TokenKind::Dictionary,
        }
    }

    pub fn matches(&self, value: i64) -> bool {
        match self {
            VarConstraint::Integer(pattern) => pattern.is_match_str(&value.to_string(), true),
            VarConstraint::Dictionary(ids) => ids.binary_search(&VariableId(value as u64)).is_ok(),
        }
    }
}

/// True if the constraints can be assigned, in order, to distinct
/// variables of matching kinds satisfying them. Greedy earliest assignment
/// finds one whenever one exists.
pub fn constraints_hold(constraints: &[VarConstraint], kinds: &[TokenKind], values: &[i64]) -> bool {
    let mut vars = kinds.iter().zip(values);
    constraints.iter().all(|constraint| {
        vars.by_ref()
            .any(|(kind, value)| *kind == constraint.kind() && constraint.matches(*value))
    })
}

/// Ordering-only version of `constraints_hold`, used before values are known.
pub fn constraints_fit(constraints: &[VarConstraint], kinds: &[TokenKind]) -> bool {
    let mut remaining = kinds.iter();
    constraints
        .iter()
        .all(|constraint| remaining.by_ref().any(|kind| *kind == constraint.kind()))
}

/// One resolved interpretation of a search string
#[derive(Debug, Clone, PartialEq)]
pub struct SubQuery {
    pub logtype_id: LogtypeId,
    pub constraints: Vec<VarConstraint>,
    ids_of_matching_segments: RoaringBitmap,
}

impl SubQuery {
    pub fn new(logtype_id: LogtypeId, constraints: Vec<VarConstraint>, segments: RoaringBitmap) -> Self {
        SubQuery {
            logtype_id,
            constraints,
            ids_of_matching_segments: segments,
        }
    }

    /// Indexed segments that may hold a match. Never misses one.
    pub fn ids_of_matching_segments(&self) -> &RoaringBitmap {
        &self.ids_of_matching_segments
    }

    pub fn matches_segment(&self, id: SegmentId) -> bool {
        self.ids_of_matching_segments.contains(id.value())
    }

    /// Whether any message of `file` can satisfy this sub-query.
    pub fn is_relevant_to(&self, file: &CompressedFile) -> bool {
        let record = file.record();
        if record.indexed && !self.matches_segment(record.segment_id) {
            return false;
        }
        if !file.contains_logtype(self.logtype_id) {
            return false;
        }
        self.constraints.iter().all(|constraint| match constraint {
            VarConstraint::Dictionary(ids) => ids.iter().any(|id| file.contains_dictionary_var(*id)),
            VarConstraint::Integer(_) => true,
        })
    }

    pub fn matches_message(&self, logtype_id: LogtypeId, kinds: &[TokenKind], values: &[i64]) -> bool {
        logtype_id == self.logtype_id && constraints_hold(&self.constraints, kinds, values)
    }
}

/// Compiled form of one search string. No sub-queries means the string
/// matches unconditionally within its filters and supersedes every other.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub raw: String,
    pub pattern: WildcardPattern,
    pub ignore_case: bool,
    pub time_range: TimeRange,
    pub sub_queries: Vec<SubQuery>,
}

impl Query {
    pub fn is_superseding(&self) -> bool {
        self.sub_queries.is_empty()
    }

    /// Union of every sub-query's candidate segments.
    pub fn candidate_segments(&self) -> RoaringBitmap {
        let mut union = RoaringBitmap::new();
        for sub_query in &self.sub_queries {
            union |= sub_query.ids_of_matching_segments();
        }
        union
    }

    pub fn matches_text(&self, text: &str) -> bool {
        self.pattern.is_match_str(text, !self.ignore_case)
    }
}
