// Backend dispatcher (spec.md §4.H). Hard short-circuit rules first, then
// an additive scoring heuristic over the remaining candidates, generalized
// from `defuz-regex::program::Program::choose_engine`'s shape (pick among a
// small fixed set of engines by inspecting the compiled pattern) combined
// with `searchlight`'s `DelegatingSearcher::new` fail-soft-to-CPU pattern
// for the GPU probe (see `other_examples/` grounding in DESIGN.md).

use crate::capability;
use crate::options::{BackendChoice, SearchOptions};

/// The engine actually selected for a given search, after both the
/// short-circuit rules and the scoring heuristic have run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Engine {
    Cpu,
    Gpu,
}

/// Inputs to the dispatcher that aren't already on `SearchOptions`.
pub struct DispatchInput<'a> {
    pub text_len: usize,
    pub pattern: &'a [u8],
    pub num_patterns: usize,
    pub is_regex: bool,
    pub gpu_available: bool,
}

/// Decide CPU vs GPU for one search (spec.md §4.H). The caller still needs
/// to probe `gpu::probe()` and fall back to `Engine::Cpu` if the chosen GPU
/// backend subsequently fails at runtime (`Error::GpuUnavailable`).
pub fn choose(input: &DispatchInput, options: &SearchOptions) -> Engine {
    match options.backend {
        BackendChoice::Cpu => return Engine::Cpu,
        BackendChoice::Gpu | BackendChoice::Metal | BackendChoice::Vulkan => {
            if input.gpu_available {
                return Engine::Gpu;
            }
            return Engine::Cpu;
        }
        BackendChoice::Auto => {}
    }

    // Hard short-circuits (spec.md §4.H "always CPU" rules).
    if !input.gpu_available {
        return Engine::Cpu;
    }
    if input.num_patterns > 1 {
        return Engine::Cpu;
    }
    if options.perl {
        return Engine::Cpu;
    }
    if input.text_len < options.tuning.min_gpu_size || input.text_len > options.tuning.max_gpu_size {
        return Engine::Cpu;
    }

    let score = score(input, options);
    if score >= 0 {
        Engine::Gpu
    } else {
        Engine::Cpu
    }
}

/// Additive scoring heuristic (spec.md §4.H). Positive favors GPU.
fn score(input: &DispatchInput, options: &SearchOptions) -> i32 {
    let mut s = 3; // base GPU advantage: parallel scan beats single-thread BMH on large inputs

    if input.text_len >= 1 << 20 {
        s += 1; // ≥1 MiB
    }
    if input.text_len >= 1 << 22 {
        s += 1; // ≥4 MiB
    }

    let plen = input.pattern.len();
    if plen == 1 {
        s += 6;
    } else if plen <= options.tuning.short_pattern_len {
        // Short patterns are where the BMH skip table is weakest and GPU's
        // flat per-position scan wins outright.
        s += 4;
    } else if plen >= 5 && plen <= 7 {
        s += 2;
    } else if plen >= options.tuning.long_pattern_len {
        s += 1;
    }

    if options.case_insensitive {
        s += 6; // CPU folding doubles the skip-table lookup; GPU folds per-thread for free
    }
    if options.word_boundary {
        s += 5;
    }

    if has_common_letter_bias(input.pattern) {
        s += 2; // common letters shrink the BMH skip distance, hurting CPU more than GPU
    }
    if is_rare_byte_pattern(input.pattern) {
        s -= 3; // rare bytes make BMH's skip table extremely effective; GPU has nothing to win
    }

    if input.is_regex {
        s -= 1; // NFA interpretation branches per-thread; less GPU-friendly than literal scan
    }

    s += options.tuning.gpu_bias;
    s += capability::probe().cpu_score_bonus();
    s
}

const COMMON_LETTERS: &[u8] = b"etaoinshrl";

fn has_common_letter_bias(pattern: &[u8]) -> bool {
    let common = pattern.iter().filter(|b| COMMON_LETTERS.contains(&b.to_ascii_lowercase())).count();
    common >= 3
}

fn is_rare_byte_pattern(pattern: &[u8]) -> bool {
    let all_upper_long = pattern.len() >= 8 && pattern.iter().all(|b| !b.is_ascii_lowercase());
    let has_digit_or_underscore = pattern.iter().any(|b| b.is_ascii_digit() || *b == b'_');
    all_upper_long || has_digit_or_underscore
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(text_len: usize, pattern: &[u8]) -> DispatchInput {
        DispatchInput { text_len, pattern, num_patterns: 1, is_regex: false, gpu_available: true }
    }

    #[test]
    fn forces_cpu_without_gpu() {
        let mut inp = input(1 << 20, b"hello");
        inp.gpu_available = false;
        let choice = choose(&inp, &SearchOptions::default());
        assert_eq!(choice, Engine::Cpu);
    }

    #[test]
    fn forces_cpu_for_multi_pattern() {
        let mut inp = input(1 << 20, b"hello");
        inp.num_patterns = 2;
        let choice = choose(&inp, &SearchOptions::default());
        assert_eq!(choice, Engine::Cpu);
    }

    #[test]
    fn forces_cpu_below_min_size() {
        let inp = input(1024, b"hello");
        let choice = choose(&inp, &SearchOptions::default());
        assert_eq!(choice, Engine::Cpu);
    }

    #[test]
    fn forces_cpu_for_perl() {
        let inp = input(1 << 20, b"hello");
        let mut opts = SearchOptions::default();
        opts.perl = true;
        assert_eq!(choose(&inp, &opts), Engine::Cpu);
    }

    #[test]
    fn explicit_cpu_override_wins() {
        let inp = input(1 << 20, b"hello");
        let mut opts = SearchOptions::default();
        opts.backend = BackendChoice::Cpu;
        assert_eq!(choose(&inp, &opts), Engine::Cpu);
    }

    #[test]
    fn case_insensitive_large_text_favors_gpu() {
        let inp = input(4 << 20, b"xqz7");
        let mut opts = SearchOptions::default();
        opts.case_insensitive = true;
        assert_eq!(choose(&inp, &opts), Engine::Gpu);
    }
}
