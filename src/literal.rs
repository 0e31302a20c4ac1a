// CPU literal engine (spec.md §4.B). Grounded on `defuz-regex`'s
// `literals::SingleSearch` (BMH with a Raita twist) and generalized to:
// case folding, word-boundary validation, invert-match, and the empty
// pattern special case. Newline scanning uses `memchr`, the crate the wider
// corpus (ripgrep, ib-matcher) reaches for whenever it wants a
// SIMD-accelerated single-byte scan -- this is the idiomatic stand-in for
// the spec's "SIMD-scan backward/forward in N-byte chunks" language.
//
// The main BMH window comparison is written as a 16-byte chunked equality
// check on fixed-size arrays, which LLVM auto-vectorizes on all common
// targets; this is the safe-Rust expression of spec.md's "compare in
// 16-byte SIMD chunks, scalar tail".

use memchr::{memchr, memrchr};

use crate::error::{Error, Result};
use crate::options::SearchOptions;
use crate::result::{MatchRecord, SearchResult};
use crate::skip::{fold_byte, fold_pattern, SkipTable};

const CHUNK: usize = 16;
const STACK_FOLD_LIMIT: usize = 1024;

/// Entry point for literal (non-regex) search, spec.md §4.B.
pub fn search(text: &[u8], pattern: &[u8], options: &SearchOptions) -> Result<SearchResult> {
    if pattern.len() > 256 {
        return Err(Error::PatternTooLong);
    }
    if pattern.is_empty() {
        return Ok(search_empty_pattern(text));
    }
    if options.invert_match {
        return Ok(search_invert(text, pattern, options));
    }
    if text.len() < pattern.len() {
        return Ok(SearchResult::empty());
    }

    let folded_owned;
    let folded: &[u8] = if options.case_insensitive {
        folded_owned = fold_pattern(pattern);
        &folded_owned
    } else {
        pattern
    };
    let skip = SkipTable::build(folded, options.case_insensitive);

    let mut matches = Vec::new();
    scan(text, pattern, folded, &skip, options, &mut matches);
    let total = matches.len() as u64;
    Ok(SearchResult { matches, total_matches: total })
}

/// Non-overlapping left-to-right BMH scan. On a mismatch, resumes at
/// `pos + max(skip, 1)`; on a match, resumes at the match end -- this is
/// what makes the reported occurrences non-overlapping (spec.md §4.B).
fn scan(
    text: &[u8],
    pattern: &[u8],
    folded_pattern: &[u8],
    skip: &SkipTable,
    options: &SearchOptions,
    out: &mut Vec<MatchRecord>,
) {
    let plen = pattern.len();
    let mut pos = 0usize;
    while pos + plen <= text.len() {
        let window = &text[pos..pos + plen];
        if window_matches(window, folded_pattern, options.case_insensitive) {
            let end = pos + plen;
            let boundary_ok = !options.word_boundary || word_boundary_ok(text, pos, end);
            if boundary_ok {
                let line_start = line_start_for(text, pos);
                out.push(MatchRecord {
                    position: pos as u32,
                    match_len: plen as u32,
                    line_start,
                    line_num: 0,
                    pattern_idx: 0,
                });
                pos = end;
                continue;
            }
            // Word-boundary rejection still advances like a mismatch would.
        }
        let last = window[plen - 1];
        let probe = if options.case_insensitive { fold_byte(last) } else { last };
        let shift = skip.shift_for(probe);
        pos += std::cmp::max(shift, 1);
    }
}

/// Compare a window against the (already folded) pattern in `CHUNK`-byte
/// chunks with a scalar tail, per spec.md §4.B step 4.
#[inline]
fn window_matches(window: &[u8], folded_pattern: &[u8], case_insensitive: bool) -> bool {
    debug_assert_eq!(window.len(), folded_pattern.len());
    let len = window.len();
    let mut i = 0;
    while i + CHUNK <= len {
        let mut chunk = [0u8; CHUNK];
        chunk.copy_from_slice(&window[i..i + CHUNK]);
        if case_insensitive {
            for b in chunk.iter_mut() {
                *b = fold_byte(*b);
            }
        }
        if chunk != folded_pattern[i..i + CHUNK] {
            return false;
        }
        i += CHUNK;
    }
    while i < len {
        let b = if case_insensitive { fold_byte(window[i]) } else { window[i] };
        if b != folded_pattern[i] {
            return false;
        }
        i += 1;
    }
    true
}

#[inline]
pub fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Word-boundary validation (spec.md §4.B): neither side of the match may
/// be immediately adjacent to a word character.
pub fn word_boundary_ok(text: &[u8], start: usize, end: usize) -> bool {
    let before_ok = start == 0 || !is_word(text[start - 1]);
    let after_ok = end == text.len() || !is_word(text[end]);
    before_ok && after_ok
}

/// Backward scan for the start of the line containing `pos` (spec.md
/// §4.B "Line-start discovery"). `memrchr` is the SIMD-accelerated
/// backward byte scan the wider corpus uses for this exact purpose.
pub fn line_start_for(text: &[u8], pos: usize) -> u32 {
    match memrchr(b'\n', &text[..pos]) {
        Some(i) => (i + 1) as u32,
        None => 0,
    }
}

/// Empty-pattern special case: one zero-length record per line, including a
/// final line without a trailing newline (spec.md §4.B, §8).
fn search_empty_pattern(text: &[u8]) -> SearchResult {
    let mut matches = Vec::new();
    let mut start = 0usize;
    loop {
        matches.push(MatchRecord {
            position: start as u32,
            match_len: 0,
            line_start: start as u32,
            line_num: 0,
            pattern_idx: 0,
        });
        match memchr(b'\n', &text[start..]) {
            Some(off) => start += off + 1,
            None => break,
        }
        if start >= text.len() {
            // Trailing newline with nothing after it: the last "line" was
            // already emitted (it ended exactly at the newline), so we
            // don't emit a spurious empty record past the end.
            if start == text.len() {
                break;
            }
        }
    }
    let total = matches.len() as u64;
    SearchResult { matches, total_matches: total }
}

/// Invert-match path: line-wise scan. Lines that do *not* contain the
/// pattern become synthetic whole-line records (spec.md §4.B).
fn search_invert(text: &[u8], pattern: &[u8], options: &SearchOptions) -> SearchResult {
    let folded_owned;
    let folded: &[u8] = if options.case_insensitive {
        folded_owned = fold_pattern(pattern);
        &folded_owned
    } else {
        pattern
    };
    let skip = SkipTable::build(folded, options.case_insensitive);

    let mut matches = Vec::new();
    let mut start = 0usize;
    loop {
        let line_end = match memchr(b'\n', &text[start..]) {
            Some(off) => start + off,
            None => text.len(),
        };
        let line = &text[start..line_end];
        if !line_contains(line, pattern, folded, &skip, options) {
            matches.push(MatchRecord {
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
    let total = matches.len() as u64;
    SearchResult { matches, total_matches: total }
}

fn line_contains(
    line: &[u8],
    pattern: &[u8],
    folded_pattern: &[u8],
    skip: &SkipTable,
    options: &SearchOptions,
) -> bool {
    let plen = pattern.len();
    if line.len() < plen {
        return false;
    }
    let mut pos = 0usize;
    while pos + plen <= line.len() {
        let window = &line[pos..pos + plen];
        if window_matches(window, folded_pattern, options.case_insensitive) {
            let end = pos + plen;
            if !options.word_boundary || word_boundary_ok(line, pos, end) {
                return true;
            }
        }
        let last = window[plen - 1];
        let probe = if options.case_insensitive { fold_byte(last) } else { last };
        pos += std::cmp::max(skip.shift_for(probe), 1);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> SearchOptions {
        SearchOptions::default()
    }

    #[test]
    fn scenario_1_two_matches() {
        let r = search(b"hello world hello", b"hello", &opts()).unwrap();
        let positions: Vec<u32> = r.matches.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![0, 12]);
        assert!(r.matches.iter().all(|m| m.line_start == 0));
    }

    #[test]
    fn scenario_2_case_insensitive() {
        let mut o = opts();
        o.case_insensitive = true;
        let r = search(b"Hello HELLO hello HeLLo", b"hello", &o).unwrap();
        let positions: Vec<u32> = r.matches.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![0, 6, 12, 18]);
    }

    #[test]
    fn scenario_3_word_boundary() {
        let mut o = opts();
        o.word_boundary = true;
        let r = search(b"the theory there", b"the", &o).unwrap();
        let positions: Vec<u32> = r.matches.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![0]);
    }

    #[test]
    fn scenario_4_invert_match() {
        let mut o = opts();
        o.invert_match = true;
        let text = b"line with pattern\nline without\nanother with pattern";
        let r = search(text, b"pattern", &o).unwrap();
        assert_eq!(r.matches.len(), 1);
        assert_eq!(r.matches[0].match_len, "line without".len() as u32);
    }

    #[test]
    fn empty_pattern_counts_lines() {
        let r = search(b"a\nb\nc", b"", &opts()).unwrap();
        assert_eq!(r.matches.len(), 3);
    }

    #[test]
    fn empty_pattern_trailing_no_newline() {
        let r = search(b"a\nb", b"", &opts()).unwrap();
        assert_eq!(r.matches.len(), 2);
    }

    #[test]
    fn pattern_longer_than_text() {
        let r = search(b"ab", b"abcdef", &opts()).unwrap();
        assert!(r.matches.is_empty());
    }

    #[test]
    fn pattern_equals_text() {
        let r = search(b"hello", b"hello", &opts()).unwrap();
        assert_eq!(r.matches.len(), 1);
        assert_eq!(r.matches[0].position, 0);
    }

    #[test]
    fn non_overlapping() {
        let r = search(b"aaaa", b"aa", &opts()).unwrap();
        let positions: Vec<u32> = r.matches.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![0, 2]);
    }
}
