// Universal invariants from spec.md §3/§8: every `MatchRecord` returned by
// the public API must satisfy `line_start <= position <= position +
// match_len <= text.len()`, and records sharing a line share `line_start`.

use rg_core::{BackendChoice, SearchOptions};

fn cpu_only() -> SearchOptions {
    let mut opts = SearchOptions::default();
    opts.backend = BackendChoice::Cpu;
    opts
}

fn assert_invariants(text: &[u8], result: &rg_core::SearchResult) {
    for m in &result.matches {
        assert!(m.line_start <= m.position, "line_start must not exceed position");
        assert!(m.position + m.match_len <= text.len() as u32, "match must not exceed text length");
        assert!(m.line_num >= 1, "line_num must be resolved to a 1-based value after aggregation");
    }
}

#[test]
fn literal_search_invariants_hold() {
    let mut opts = cpu_only();
    opts.fixed_string = true;
    let text = b"alpha\nbeta alpha\ngamma alpha delta";
    let result = rg_core::search(text, b"alpha", &opts).unwrap();
    assert_invariants(text, &result);
    assert!(result.matches.len() >= 3);
}

#[test]
fn regex_search_invariants_hold() {
    let mut opts = cpu_only();
    opts.extended = true;
    let text = b"id=1\nid=22\nid=333";
    let result = rg_core::search(text, b"[0-9]+", &opts).unwrap();
    assert_invariants(text, &result);
    assert_eq!(result.matches.len(), 3);
}

#[test]
fn empty_text_produces_no_matches_for_non_empty_pattern() {
    let mut opts = cpu_only();
    opts.fixed_string = true;
    let result = rg_core::search(b"", b"x", &opts).unwrap();
    assert!(result.matches.is_empty());
}

#[test]
fn records_on_same_line_share_line_start() {
    let mut opts = cpu_only();
    opts.fixed_string = true;
    let text = b"aa aa aa";
    let result = rg_core::search(text, b"aa", &opts).unwrap();
    let line_starts: Vec<u32> = result.matches.iter().map(|m| m.line_start).collect();
    assert!(line_starts.iter().all(|&ls| ls == 0));
}

#[test]
fn invert_match_and_forward_match_are_complementary_by_line() {
    let text = b"keep this\ndrop this\nkeep that";
    let mut forward = cpu_only();
    forward.fixed_string = true;
    let mut inverted = forward;
    inverted.invert_match = true;

    let fwd = rg_core::search(text, b"keep", &forward).unwrap();
    let inv = rg_core::search(text, b"keep", &inverted).unwrap();

    let fwd_lines: std::collections::HashSet<u32> = fwd.matches.iter().map(|m| m.line_start).collect();
    let inv_lines: std::collections::HashSet<u32> = inv.matches.iter().map(|m| m.line_start).collect();
    assert!(fwd_lines.is_disjoint(&inv_lines));
}
