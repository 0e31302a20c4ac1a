// Top-level search orchestration: regex compilation, backend dispatch, the
// CPU/GPU engines, result aggregation, and multi-pattern union, wired
// together into the one entry point `bin/rg_core.rs` calls. Generalizes
// `defuz-regex::program::Program::exec`'s role as the single call site that
// picks an engine and runs it.

use crate::error::Result;
use crate::options::SearchOptions;
use crate::result::SearchResult;
use crate::{aggregate, cpu, dispatch, gpu, literal, multi, regex};

/// Search `text` for a single `pattern` under `options` (spec.md §4.A "top
/// level contract"). Multi-pattern union is handled by `search_many`.
pub fn search(text: &[u8], pattern: &[u8], options: &SearchOptions) -> Result<SearchResult> {
    let raw = if options.perl {
        search_perl(text, pattern, options)?
    } else if options.fixed_string {
        search_fixed(text, pattern, options)?
    } else {
        search_regex(text, pattern, options)?
    };
    Ok(aggregate::aggregate(raw, text))
}

/// Search `text` against every pattern in `patterns`, unioned by line
/// (spec.md §4.J). Falls back to `search` directly when there's only one.
pub fn search_many(text: &[u8], patterns: &[Vec<u8>], options: &SearchOptions) -> Result<SearchResult> {
    if patterns.len() == 1 {
        return search(text, &patterns[0], options);
    }
    let raw = multi::search_union(text, patterns, options, |t, p, o| {
        if o.perl {
            search_perl(t, p, o)
        } else if o.fixed_string {
            search_fixed(t, p, o)
        } else {
            search_regex(t, p, o)
        }
    })?;
    Ok(aggregate::aggregate(raw, text))
}

fn search_fixed(text: &[u8], pattern: &[u8], options: &SearchOptions) -> Result<SearchResult> {
    let input = dispatch::DispatchInput {
        text_len: text.len(),
        pattern,
        num_patterns: 1,
        is_regex: false,
        gpu_available: false,
    };
    match dispatch::choose(&maybe_probe(input), options) {
        dispatch::Engine::Gpu => match gpu::probe() {
            Some(backend) => match backend.literal_search(text, pattern, options) {
                Ok(result) => Ok(result),
                Err(_) => literal::search(text, pattern, options),
            },
            None => literal::search(text, pattern, options),
        },
        dispatch::Engine::Cpu => literal::search(text, pattern, options),
    }
}

fn search_regex(text: &[u8], pattern: &[u8], options: &SearchOptions) -> Result<SearchResult> {
    let compiled = regex::compile(pattern, options)?;

    let input = dispatch::DispatchInput {
        text_len: text.len(),
        pattern,
        num_patterns: 1,
        is_regex: true,
        gpu_available: false,
    };
    let fits_gpu = compiled.states.len() <= gpu::protocol::GPU_MAX_NFA_STATES;
    let choice = if fits_gpu { dispatch::choose(&maybe_probe(input), options) } else { dispatch::Engine::Cpu };

    if let dispatch::Engine::Gpu = choice {
        if let Some(backend) = gpu::probe() {
            if let Ok(result) = backend.regex_search_lines(&compiled, text, options) {
                return Ok(result);
            }
        }
    }
    cpu_search_regex(&compiled, text)
}

fn cpu_search_regex(compiled: &regex::nfa::CompiledRegex, text: &[u8]) -> Result<SearchResult> {
    let matches = cpu::evaluator::search_all(compiled, text);
    let mut out = Vec::with_capacity(matches.len());
    for (record, _groups) in matches {
        out.push(record);
    }
    let total = out.len() as u64;
    Ok(SearchResult { matches: out, total_matches: total })
}

fn search_perl(text: &[u8], pattern: &[u8], options: &SearchOptions) -> Result<SearchResult> {
    #[cfg(feature = "perl")]
    {
        let handle = crate::pcre::compile(pattern, options.case_insensitive, false)?;
        handle.find_all(text)
    }
    #[cfg(not(feature = "perl"))]
    {
        let _ = (text, pattern);
        Err(crate::error::Error::InvalidPattern(
            "perl-compatible matching requires the `perl` feature".into(),
        ))
    }
}

fn maybe_probe(mut input: dispatch::DispatchInput) -> dispatch::DispatchInput {
    input.gpu_available = gpu_available();
    input
}

#[cfg(any(feature = "metal-backend", feature = "vulkan-backend"))]
fn gpu_available() -> bool {
    gpu::probe().is_some()
}

#[cfg(not(any(feature = "metal-backend", feature = "vulkan-backend")))]
fn gpu_available() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_string_search_matches_literal_engine() {
        let mut opts = SearchOptions::default();
        opts.fixed_string = true;
        let result = search(b"hello world hello", b"hello", &opts).unwrap();
        assert_eq!(result.matches.len(), 2);
        assert_eq!(result.matches[0].line_num, 1);
    }

    #[test]
    fn regex_search_assigns_line_numbers() {
        let mut opts = SearchOptions::default();
        opts.extended = true;
        let result = search(b"a1\nb2\na3", b"[0-9]", &opts).unwrap();
        let nums: Vec<u32> = result.matches.iter().map(|m| m.line_num).collect();
        assert_eq!(nums, vec![1, 2, 3]);
    }

    #[test]
    fn search_many_unions_across_patterns() {
        let patterns = vec![b"cat".to_vec(), b"dog".to_vec()];
        let mut opts = SearchOptions::default();
        opts.fixed_string = true;
        let result = search_many(b"cat\ndog\nbird", &patterns, &opts).unwrap();
        assert_eq!(result.matches.len(), 2);
    }
}
