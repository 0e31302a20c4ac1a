// External PCRE adapter (spec.md §6 "Perl-compatible escape hatch"),
// feature-gated behind `perl`. Wraps the real `pcre2` crate the way
// ripgrep's `grep-pcre2` does: compile once, reuse the compiled regex for
// every `find_all` call, surface compile failures as `Error::InvalidPattern`
// rather than panicking.

use crate::error::{Error, Result};
use crate::result::{MatchRecord, SearchResult};
use pcre2::bytes::{Regex, RegexBuilder};

pub struct PcreHandle {
    regex: Regex,
}

pub fn compile(pattern: &[u8], case_insensitive: bool, multiline: bool) -> Result<PcreHandle> {
    let pattern_str =
        std::str::from_utf8(pattern).map_err(|_| Error::InvalidPattern("pattern is not valid UTF-8".into()))?;
    let regex = RegexBuilder::new()
        .caseless(case_insensitive)
        .multi_line(multiline)
        .build(pattern_str)
        .map_err(|e| Error::InvalidPattern(e.to_string()))?;
    Ok(PcreHandle { regex })
}

impl PcreHandle {
    /// Non-overlapping left-to-right matches over `text` (spec.md §4.J
    /// "Perl path" shares the same non-overlap contract as the native
    /// engines so aggregation doesn't need to special-case it).
    pub fn find_all(&self, text: &[u8]) -> Result<SearchResult> {
        let mut matches = Vec::new();
        for m in self.regex.find_iter(text) {
            let m = m.map_err(|e| Error::InvalidPattern(e.to_string()))?;
            let line_start = crate::literal::line_start_for(text, m.start());
            matches.push(MatchRecord {
                position: m.start() as u32,
                match_len: (m.end() - m.start()) as u32,
                line_start,
                line_num: 0,
                pattern_idx: 0,
            });
        }
        let total = matches.len() as u64;
        Ok(SearchResult { matches, total_matches: total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookahead_matches() {
        let handle = compile(b"foo(?=bar)", false, false).unwrap();
        let result = handle.find_all(b"foobar foobaz").unwrap();
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].position, 0);
    }

    #[test]
    fn invalid_pattern_errors() {
        let err = compile(b"(unclosed", false, false);
        assert!(err.is_err());
    }
}
