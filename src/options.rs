// Configuration surface shared by every search engine and by the backend
// dispatcher. Kept as a plain struct with a `Default` impl in the style the
// teacher uses for `Program` construction: all fields public, no builder
// ceremony, because every field here is a recognized CLI flag (spec.md §6)
// rather than an internal invariant that needs guarding.

/// The recognized search options (spec.md §3).
#[derive(Clone, Copy, Debug)]
pub struct SearchOptions {
    /// ASCII case folding in the A-Z <-> a-z range only.
    pub case_insensitive: bool,
    /// Matches only where neither adjacent byte is a word character.
    pub word_boundary: bool,
    /// Select lines that do *not* contain a match.
    pub invert_match: bool,
    /// Treat pattern as literal bytes; disable regex interpretation.
    pub fixed_string: bool,
    /// ERE syntax when regex is active; otherwise BRE.
    pub extended: bool,
    /// Use the external PCRE-compatible adapter.
    pub perl: bool,
    /// Backend selection override.
    pub backend: BackendChoice,
    /// Dispatcher tuning knobs (spec.md §4.H / §6).
    pub tuning: DispatchTuning,
}

impl Default for SearchOptions {
    fn default() -> SearchOptions {
        SearchOptions {
            case_insensitive: false,
            word_boundary: false,
            invert_match: false,
            fixed_string: false,
            extended: false,
            perl: false,
            backend: BackendChoice::Auto,
            tuning: DispatchTuning::default(),
        }
    }
}

/// Backend override surface (spec.md §6 CLI contract).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendChoice {
    Auto,
    Cpu,
    Gpu,
    Metal,
    Vulkan,
}

/// Tunable weights for the dispatcher's scoring heuristic (spec.md §4.H).
/// These are explicitly *not* contractual per the spec's design notes; tests
/// pin the hard decision-boundary rules, not these specific numbers.
#[derive(Clone, Copy, Debug)]
pub struct DispatchTuning {
    pub gpu_bias: i32,
    pub short_pattern_len: usize,
    pub long_pattern_len: usize,
    pub min_gpu_size: usize,
    pub max_gpu_size: usize,
}

impl Default for DispatchTuning {
    fn default() -> DispatchTuning {
        DispatchTuning {
            gpu_bias: 0,
            short_pattern_len: 4,
            long_pattern_len: 8,
            min_gpu_size: 64 * 1024,
            max_gpu_size: 256 * 1024 * 1024,
        }
    }
}
