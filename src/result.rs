// The common match record shared by every backend (spec.md §3). CPU and GPU
// engines each produce their own backend-specific record internally (see
// `gpu::protocol`), but every public API surfaces this type after
// `aggregate::aggregate` has run.

/// A single match, in the common cross-backend form.
///
/// Invariants (spec.md §3):
/// - `line_start <= position <= position + match_len <= text.len`
/// - records on the same line share `line_start`
/// - `match_len == 0` only for synthetic line-records (empty pattern or
///   invert-match)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchRecord {
    pub position: u32,
    pub match_len: u32,
    pub line_start: u32,
    /// 1-based; 0 means "unset, compute lazily on the host" (§3, §4.I).
    pub line_num: u32,
    /// Which pattern matched; 0 for single-pattern searches.
    pub pattern_idx: u32,
}

impl MatchRecord {
    pub fn end(&self) -> u32 {
        self.position + self.match_len
    }
}

/// Owned sequence of matches plus a possibly-truncated total count
/// (spec.md §3, "Truncation cap" in the GLOSSARY).
#[derive(Clone, Debug, Default)]
pub struct SearchResult {
    pub matches: Vec<MatchRecord>,
    /// May exceed `matches.len()` if results were truncated at the
    /// implementation cap (1_000_000, see `gpu::protocol::MAX_RESULTS`).
    pub total_matches: u64,
}

impl SearchResult {
    pub fn empty() -> SearchResult {
        SearchResult { matches: Vec::new(), total_matches: 0 }
    }

    pub fn is_truncated(&self) -> bool {
        self.total_matches > self.matches.len() as u64
    }
}
