// Result aggregation (spec.md §4.I). Lazily fills in `line_num` (engines
// leave it at 0, meaning "unset") by counting newlines from the start of
// the buffer, caching the last position counted so a sorted batch of
// matches only walks each byte of `text` once.

use crate::result::{MatchRecord, SearchResult};
use memchr::memchr_iter;

/// Sort matches by position, then assign 1-based line numbers in a single
/// forward pass (spec.md §4.I "lazy line-number computation").
pub fn aggregate(mut result: SearchResult, text: &[u8]) -> SearchResult {
    result.matches.sort_by_key(|m| (m.position, m.pattern_idx));
    assign_line_numbers(&mut result.matches, text);
    result
}

fn assign_line_numbers(matches: &mut [MatchRecord], text: &[u8]) {
    if matches.is_empty() {
        return;
    }
    let mut newline_positions = memchr_iter(b'\n', text);
    let mut line_num = 1u32;
    let mut next_newline = newline_positions.next();

    for m in matches.iter_mut() {
        while let Some(nl) = next_newline {
            if (nl as u32) < m.position {
                line_num += 1;
                next_newline = newline_positions.next();
            } else {
                break;
            }
        }
        m.line_num = line_num;
    }
}

/// Deduplicate by `line_start` for line-oriented output modes (spec.md
/// §4.I): keeps the first match on each line, used when the caller wants
/// "which lines matched" rather than every individual match span.
pub fn dedup_by_line(result: &SearchResult) -> Vec<MatchRecord> {
    let mut out: Vec<MatchRecord> = Vec::new();
    let mut last_line_start: Option<u32> = None;
    for m in &result.matches {
        if last_line_start != Some(m.line_start) {
            out.push(*m);
            last_line_start = Some(m.line_start);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(position: u32, line_start: u32) -> MatchRecord {
        MatchRecord { position, match_len: 1, line_start, line_num: 0, pattern_idx: 0 }
    }

    #[test]
    fn line_numbers_increment_per_newline() {
        let text = b"a\nb\nc\n";
        let mut result = SearchResult { matches: vec![rec(0, 0), rec(2, 2), rec(4, 4)], total_matches: 3 };
        result = aggregate(result, text);
        let nums: Vec<u32> = result.matches.iter().map(|m| m.line_num).collect();
        assert_eq!(nums, vec![1, 2, 3]);
    }

    #[test]
    fn dedup_keeps_first_per_line() {
        let result = SearchResult { matches: vec![rec(0, 0), rec(1, 0), rec(2, 2)], total_matches: 3 };
        let deduped = dedup_by_line(&result);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].position, 0);
        assert_eq!(deduped[1].position, 2);
    }

    #[test]
    fn sorts_before_numbering() {
        let text = b"a\nb\nc\n";
        let result = SearchResult { matches: vec![rec(4, 4), rec(0, 0)], total_matches: 2 };
        let result = aggregate(result, text);
        assert_eq!(result.matches[0].position, 0);
        assert_eq!(result.matches[1].position, 4);
    }
}
