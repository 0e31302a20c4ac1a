//! Regex compiler (spec.md §4.C): parses BRE/ERE patterns, builds an NFA
//! with character-class bitmaps, and serializes that NFA into the
//! GPU-friendly packed state table.

pub mod ast;
pub mod class;
pub mod compiler;
pub mod gpu_pack;
pub mod nfa;
pub mod parser;

use crate::error::Result;
use crate::options::SearchOptions;
pub use nfa::CompiledRegex;

/// Compile `pattern` under `options` into a host-form `CompiledRegex`
/// (spec.md §4.C contract).
pub fn compile(pattern: &[u8], options: &SearchOptions) -> Result<CompiledRegex> {
    let (ast, num_groups) = parser::parse(pattern, options.extended)?;
    compiler::compile(&ast, num_groups, options)
}
