// CPU NFA evaluator (spec.md §4.D). Thompson/Pike-VM style parallel-state
// simulation, generalized from `defuz-regex`'s `nfa::Nfa` (same sparse-set
// "Threads" dedup technique, same recursive epsilon-closure `add`) to the
// spec's explicit contract: longest match per starting position (greedy),
// non-overlapping, left-to-right, sequential single-threaded scheduling.
//
// Design note §9 pins the greedy-per-start-position choice over POSIX
// leftmost-longest; see DESIGN.md for the reasoning.

use crate::literal::is_word;
use crate::regex::nfa::{CompiledRegex, Kind};
use crate::result::MatchRecord;

/// One capture-tracking thread: the NFA state it occupies plus the
/// (start, end) byte offsets recorded so far for each capture group.
#[derive(Clone)]
struct Thread {
    caps: Vec<Option<u32>>,
}

struct ThreadSet {
    dense: Vec<(u32, Thread)>,
    sparse: Vec<u32>,
    seen: Vec<bool>,
}

impl ThreadSet {
    fn new(num_states: usize) -> ThreadSet {
        ThreadSet { dense: Vec::new(), sparse: vec![0; num_states], seen: vec![false; num_states] }
    }

    fn clear(&mut self) {
        self.dense.clear();
        for s in self.seen.iter_mut() {
            *s = false;
        }
    }

    fn contains(&self, pc: u32) -> bool {
        self.seen[pc as usize]
    }

    fn insert(&mut self, pc: u32, thread: Thread) {
        self.seen[pc as usize] = true;
        self.sparse[pc as usize] = self.dense.len() as u32;
        self.dense.push((pc, thread));
    }
}

/// A single (position, end, groups) result of evaluating the NFA starting
/// at one position.
pub struct EvalMatch {
    pub end: usize,
    pub groups: Vec<Option<u32>>,
}

pub struct Evaluator<'r> {
    re: &'r CompiledRegex,
}

impl<'r> Evaluator<'r> {
    pub fn new(re: &'r CompiledRegex) -> Evaluator<'r> {
        Evaluator { re }
    }

    /// Find the longest match starting exactly at `start` (spec.md §4.D:
    /// "on each start position, finds the longest match (greedy)"), or
    /// `None` if no match begins there.
    pub fn longest_match_at(&self, text: &[u8], start: usize) -> Option<EvalMatch> {
        let num_states = self.re.states.len();
        let ncaps = (self.re.num_groups as usize + 1) * 2;
        let mut current = ThreadSet::new(num_states);
        let mut next = ThreadSet::new(num_states);

        let init_caps = vec![None; ncaps];
        self.add_closure(&mut current, start, text, self.re.start_state, init_caps);

        let mut best: Option<EvalMatch> = None;
        let mut pos = start;
        loop {
            if current.dense.is_empty() {
                break;
            }
            // Record the most recently discovered accepting thread at this
            // position (greedy: later additions reflect deeper/longer
            // paths explored first in `add_closure`'s depth-first walk).
            // A top-level `$` was stripped to `anchored_end` at compile time
            // (no `LineEnd` state remains to enforce it), so re-check the
            // line-end condition here before accepting.
            let end_ok = !self.re.anchored_end || pos == text.len() || text[pos] == b'\n';
            if end_ok {
                for (pc, thread) in current.dense.iter() {
                    if matches!(self.re.states[*pc as usize].kind, Kind::Match) {
                        best = Some(EvalMatch { end: pos, groups: thread.caps.clone() });
                    }
                }
            }
            if pos >= text.len() {
                break;
            }
            let byte = text[pos];
            next.clear();
            for i in 0..current.dense.len() {
                let (pc, ref thread) = current.dense[i];
                self.step(&mut next, pc, thread, byte, pos, text);
            }
            std::mem::swap(&mut current, &mut next);
            pos += 1;
        }
        best
    }

    fn step(&self, next: &mut ThreadSet, pc: u32, thread: &Thread, byte: u8, pos: usize, text: &[u8]) {
        let state = &self.re.states[pc as usize];
        let matches = match &state.kind {
            Kind::Literal { byte: b, case_insensitive } => {
                if *case_insensitive {
                    byte.to_ascii_lowercase() == b.to_ascii_lowercase()
                } else {
                    byte == *b
                }
            }
            Kind::CharClass { bitmap, negated } => bitmap.contains(byte) != *negated,
            Kind::Dot => byte != b'\n',
            Kind::Any => true,
            _ => false,
        };
        if matches && state.out != crate::regex::nfa::NO_EDGE {
            self.add_closure(next, pos + 1, text, state.out, thread.caps.clone());
        }
    }

    /// Recursive epsilon closure, following `Split`/`GroupStart`/
    /// `GroupEnd`/zero-width-assertion states without consuming input;
    /// mirrors `defuz-regex`'s `Nfa::add`.
    fn add_closure(&self, set: &mut ThreadSet, pos: usize, text: &[u8], pc: u32, mut caps: Vec<Option<u32>>) {
        if pc == crate::regex::nfa::NO_EDGE || set.contains(pc) {
            return;
        }
        set.insert(pc, Thread { caps: caps.clone() });
        let state = &self.re.states[pc as usize];
        match &state.kind {
            Kind::Split => {
                self.add_closure(set, pos, text, state.out, caps.clone());
                self.add_closure(set, pos, text, state.out2, caps);
            }
            Kind::GroupStart(idx) => {
                let slot = (*idx as usize) * 2;
                if slot < caps.len() {
                    caps[slot] = Some(pos as u32);
                }
                self.add_closure(set, pos, text, state.out, caps);
            }
            Kind::GroupEnd(idx) => {
                let slot = (*idx as usize) * 2 + 1;
                if slot < caps.len() {
                    caps[slot] = Some(pos as u32);
                }
                self.add_closure(set, pos, text, state.out, caps);
            }
            Kind::WordBoundary | Kind::NotWordBoundary => {
                let before = pos > 0 && is_word(text[pos - 1]);
                let after = pos < text.len() && is_word(text[pos]);
                let is_boundary = before != after;
                let want_boundary = matches!(state.kind, Kind::WordBoundary);
                if is_boundary == want_boundary {
                    self.add_closure(set, pos, text, state.out, caps);
                }
            }
            Kind::LineStart => {
                if pos == 0 || text.get(pos - 1) == Some(&b'\n') {
                    self.add_closure(set, pos, text, state.out, caps);
                }
            }
            Kind::LineEnd => {
                if pos == text.len() || text.get(pos) == Some(&b'\n') {
                    self.add_closure(set, pos, text, state.out, caps);
                }
            }
            Kind::Match | Kind::Literal { .. } | Kind::CharClass { .. } | Kind::Dot | Kind::Any => {}
            // PCRE-only states never appear in a host-compiled BRE/ERE NFA
            // (spec.md §4.C only constructs them for `perl` patterns, which
            // bypass this evaluator entirely). Treat as an opaque pass
            // through for robustness rather than panicking.
            _ => {
                self.add_closure(set, pos, text, state.out, caps);
            }
        }
    }
}

/// Run the full non-overlapping left-to-right search (spec.md §4.D
/// contract) and build common `MatchRecord`s. Word-boundary / invert-match
/// handling for regex search lives in `crate::engine`, which calls this per
/// candidate line or buffer region depending on anchoring.
pub fn search_all(re: &CompiledRegex, text: &[u8]) -> Vec<(MatchRecord, Vec<Option<u32>>)> {
    let eval = Evaluator::new(re);
    let mut out = Vec::new();
    let mut pos = 0usize;
    loop {
        if re.anchored_start && pos != 0 {
            break;
        }
        if pos > text.len() {
            break;
        }
        match eval.longest_match_at(text, pos) {
            Some(m) => {
                let line_start = crate::literal::line_start_for(text, pos);
                out.push((
                    MatchRecord {
                        position: pos as u32,
                        match_len: (m.end - pos) as u32,
                        line_start,
                        line_num: 0,
                        pattern_idx: 0,
                    },
                    m.groups,
                ));
                pos = if m.end > pos { m.end } else { pos + 1 };
            }
            None => {
                if re.anchored_start {
                    break;
                }
                pos += 1;
            }
        }
        if pos > text.len() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SearchOptions;
    use crate::regex;

    fn compile(pattern: &[u8]) -> CompiledRegex {
        let opts = SearchOptions { extended: true, ..Default::default() };
        regex::compile(pattern, &opts).unwrap()
    }

    #[test]
    fn scenario_5_plus_quantifier() {
        let re = compile(b"ab+c");
        let results = search_all(&re, b"ac abc abbc abbbc");
        let lens: Vec<u32> = results.iter().map(|(m, _)| m.match_len).collect();
        assert_eq!(lens.len(), 3);
        assert_eq!(lens, vec![3, 4, 5]);
    }

    #[test]
    fn scenario_6_alternation() {
        let re = compile(b"cat|dog");
        let results = search_all(&re, b"cat dog bird cat");
        let positions: Vec<u32> = results.iter().map(|(m, _)| m.position).collect();
        assert_eq!(positions, vec![0, 4, 13]);
    }

    #[test]
    fn anchored_start_only_tries_position_zero() {
        let re = compile(b"^abc");
        let results = search_all(&re, b"xxabc");
        assert!(results.is_empty());
    }

    #[test]
    fn anchored_end_rejects_trailing_bytes() {
        let re = compile(b"abc$");
        let results = search_all(&re, b"abcd");
        assert!(results.is_empty());
    }

    #[test]
    fn anchored_end_accepts_end_of_line() {
        let re = compile(b"abc$");
        let results = search_all(&re, b"xx\nabc\nabcd");
        let positions: Vec<u32> = results.iter().map(|(m, _)| m.position).collect();
        assert_eq!(positions, vec![3]);
    }

    #[test]
    fn capture_groups_recorded() {
        let re = compile(b"(a)(b)");
        let results = search_all(&re, b"ab");
        let (_, groups) = &results[0];
        assert_eq!(groups[2], Some(0));
        assert_eq!(groups[3], Some(1));
    }

    #[test]
    fn fixed_string_as_regex_matches_same() {
        let opts = SearchOptions { extended: true, ..Default::default() };
        let re = regex::compile(b"hello", &opts).unwrap();
        let regex_matches = search_all(&re, b"hello world hello");
        let lit = crate::literal::search(b"hello world hello", b"hello", &SearchOptions::default()).unwrap();
        assert_eq!(regex_matches.len(), lit.matches.len());
        for ((rm, _), lm) in regex_matches.iter().zip(lit.matches.iter()) {
            assert_eq!(rm.position, lm.position);
            assert_eq!(rm.match_len, lm.match_len);
        }
    }
}
