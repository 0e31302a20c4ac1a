//! CPU search engine (spec.md §4.B, §4.D): SIMD-style Boyer-Moore-Horspool
//! for literals (`crate::literal`) and a Thompson-style NFA evaluator for
//! regular expressions (`evaluator`).

pub mod evaluator;
