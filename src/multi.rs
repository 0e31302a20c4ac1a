// Multi-pattern union (spec.md §4.J). Each pattern is searched independently
// (always on the CPU engine -- `dispatch::choose` forces this whenever
// `num_patterns > 1`), then the per-pattern results are unioned by line:
// a line is reported once even if several patterns match it, keeping only
// the first pattern's record for that line.

use crate::error::Result;
use crate::options::SearchOptions;
use crate::result::{MatchRecord, SearchResult};
use std::collections::HashSet;

/// Search `text` against every pattern in `patterns` and union the results
/// by line (spec.md §4.J). `search_one` is the single-pattern entry point
/// (`crate::engine::search`), injected so this module stays backend-agnostic.
pub fn search_union(
    text: &[u8],
    patterns: &[Vec<u8>],
    options: &SearchOptions,
    search_one: impl Fn(&[u8], &[u8], &SearchOptions) -> Result<SearchResult>,
) -> Result<SearchResult> {
    let mut seen_lines: HashSet<u32> = HashSet::new();
    let mut matches: Vec<MatchRecord> = Vec::new();

    for (idx, pattern) in patterns.iter().enumerate() {
        let mut per_pattern_opts = *options;
        per_pattern_opts.invert_match = false; // invert is applied post-union, see below
        let result = search_one(text, pattern, &per_pattern_opts)?;
        for mut m in result.matches {
            if seen_lines.insert(m.line_start) {
                m.pattern_idx = idx as u32;
                matches.push(m);
            }
        }
    }

    matches.sort_by_key(|m| m.line_start);

    if options.invert_match {
        matches = invert_by_line(text, &seen_lines);
    }

    let total = matches.len() as u64;
    Ok(SearchResult { matches, total_matches: total })
}

/// Build synthetic whole-line records for every line whose start is *not*
/// in `matched_lines` (spec.md §4.J invert-match combined with union).
fn invert_by_line(text: &[u8], matched_lines: &HashSet<u32>) -> Vec<MatchRecord> {
    let mut out = Vec::new();
    let mut start = 0usize;
    loop {
        let line_end = match memchr::memchr(b'\n', &text[start..]) {
            Some(off) => start + off,
            None => text.len(),
        };
        if !matched_lines.contains(&(start as u32)) {
            out.push(MatchRecord {
                position: start as u32,
                match_len: (line_end - start) as u32,
                line_start: start as u32,
                line_num: 0,
                pattern_idx: 0,
            });
        }
        if line_end >= text.len() {
            break;
        }
        start = line_end + 1;
        if start >= text.len() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_keeps_first_pattern_per_line() {
        let text = b"cat and dog\nonly cat\nonly dog\nneither";
        let patterns = vec![b"cat".to_vec(), b"dog".to_vec()];
        let result = search_union(text, &patterns, &SearchOptions::default(), |t, p, o| crate::literal::search(t, p, o)).unwrap();
        assert_eq!(result.matches.len(), 3);
        let line_starts: Vec<u32> = result.matches.iter().map(|m| m.line_start).collect();
        assert_eq!(line_starts, vec![0, 12, 21]);
    }

    #[test]
    fn union_with_invert_excludes_matched_lines() {
        let text = b"cat\ndog\nbird";
        let patterns = vec![b"cat".to_vec(), b"dog".to_vec()];
        let mut opts = SearchOptions::default();
        opts.invert_match = true;
        let result = search_union(text, &patterns, &opts, |t, p, o| {
            let mut o2 = *o;
            o2.invert_match = false;
            crate::literal::search(t, p, &o2)
        })
        .unwrap();
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].line_start, 8);
    }
}
