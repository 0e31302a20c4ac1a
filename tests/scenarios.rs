// End-to-end scenarios from spec.md §8, run through the public API
// (`rg_core::search`) rather than any one engine's internals, so these
// exercise dispatch, aggregation, and the CPU engines together.

use rg_core::{BackendChoice, SearchOptions};

fn cpu_only() -> SearchOptions {
    let mut opts = SearchOptions::default();
    opts.backend = BackendChoice::Cpu;
    opts
}

#[test]
fn scenario_1_literal_two_matches_with_line_numbers() {
    let text = b"hello world hello";
    let mut opts = cpu_only();
    opts.fixed_string = true;
    let result = rg_core::search(text, b"hello", &opts).unwrap();
    let positions: Vec<u32> = result.matches.iter().map(|m| m.position).collect();
    assert_eq!(positions, vec![0, 12]);
    assert!(result.matches.iter().all(|m| m.line_num == 1));
}

#[test]
fn scenario_2_case_insensitive_literal() {
    let mut opts = cpu_only();
    opts.fixed_string = true;
    opts.case_insensitive = true;
    let result = rg_core::search(b"Hello HELLO hello HeLLo", b"hello", &opts).unwrap();
    assert_eq!(result.matches.len(), 4);
}

#[test]
fn scenario_3_word_boundary_literal() {
    let mut opts = cpu_only();
    opts.fixed_string = true;
    opts.word_boundary = true;
    let result = rg_core::search(b"the theory there", b"the", &opts).unwrap();
    assert_eq!(result.matches.len(), 1);
}

#[test]
fn scenario_4_invert_match() {
    let mut opts = cpu_only();
    opts.fixed_string = true;
    opts.invert_match = true;
    let text = b"line with pattern\nline without\nanother with pattern";
    let result = rg_core::search(text, b"pattern", &opts).unwrap();
    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].line_num, 2);
}

#[test]
fn scenario_5_regex_plus_quantifier() {
    let mut opts = cpu_only();
    opts.extended = true;
    let result = rg_core::search(b"ac abc abbc abbbc", b"ab+c", &opts).unwrap();
    assert_eq!(result.matches.len(), 3);
}

#[test]
fn scenario_6_regex_alternation() {
    let mut opts = cpu_only();
    opts.extended = true;
    let result = rg_core::search(b"cat dog bird cat", b"cat|dog", &opts).unwrap();
    let positions: Vec<u32> = result.matches.iter().map(|m| m.position).collect();
    assert_eq!(positions, vec![0, 4, 13]);
}

#[test]
fn multi_pattern_union_reports_each_line_once() {
    let patterns = vec![b"cat".to_vec(), b"dog".to_vec()];
    let mut opts = cpu_only();
    opts.fixed_string = true;
    let result = rg_core::search_many(b"cat and dog\nonly cat\nonly dog\nneither", &patterns, &opts).unwrap();
    assert_eq!(result.matches.len(), 3);
}

#[test]
fn bre_bare_plus_is_literal_not_quantifier() {
    let opts = cpu_only(); // BRE: extended == false
    let result = rg_core::search(b"a+b ab", b"a+b", &opts).unwrap();
    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].position, 0);
}
