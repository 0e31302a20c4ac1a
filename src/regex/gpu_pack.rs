// GPU serialization of a compiled regex (spec.md §4.C "GPU serialization",
// §4.E "Regex header"). Packs the host `CompiledRegex` into the exact byte
// layout both the Metal and Vulkan kernels read as raw bytes: a 16-byte
// header, a 12-byte-per-state array, and a trailing bitmap pool in
// 8 x u32 (256-bit) units.

use crate::regex::nfa::{CompiledRegex, Kind, NO_EDGE};

pub const STATE_RECORD_SIZE: usize = 12;
pub const HEADER_SIZE: usize = 16;

// Kind tags (byte 0 of the packed state). Stable across host and device;
// both the Metal and SPIR-V kernels switch on this byte.
pub const KIND_LITERAL: u8 = 0;
pub const KIND_CHAR_CLASS: u8 = 1;
pub const KIND_DOT: u8 = 2;
pub const KIND_ANY: u8 = 3;
pub const KIND_SPLIT: u8 = 4;
pub const KIND_MATCH: u8 = 5;
pub const KIND_GROUP_START: u8 = 6;
pub const KIND_GROUP_END: u8 = 7;
pub const KIND_WORD_BOUNDARY: u8 = 8;
pub const KIND_NOT_WORD_BOUNDARY: u8 = 9;
pub const KIND_LINE_START: u8 = 10;
pub const KIND_LINE_END: u8 = 11;
pub const KIND_LOOKAHEAD_POS: u8 = 12;
pub const KIND_LOOKAHEAD_NEG: u8 = 13;
pub const KIND_LOOKBEHIND_POS: u8 = 14;
pub const KIND_LOOKBEHIND_NEG: u8 = 15;
pub const KIND_ATOMIC_GROUP: u8 = 16;
pub const KIND_NON_GREEDY: u8 = 17;

// Flag bits (byte 1 of the packed state).
pub const FLAG_CASE_INSENSITIVE: u8 = 0x01;
pub const FLAG_NEGATED: u8 = 0x02;
pub const FLAG_NON_GREEDY: u8 = 0x04;

/// Header flags (distinct from the per-state flag byte); mirrors
/// spec.md §4.E's shared search flags for the regex path.
pub const HEADER_ANCHORED_START: u32 = 0x01;
pub const HEADER_ANCHORED_END: u32 = 0x02;
pub const HEADER_CASE_INSENSITIVE: u32 = 0x04;

/// The packed GPU form of a `CompiledRegex`: a 16-byte header, a
/// 12-byte-per-state table, and a bitmap pool.
pub struct PackedRegex {
    pub header: Vec<u8>,
    pub states: Vec<u8>,
    pub bitmaps: Vec<u8>,
}

impl PackedRegex {
    /// Concatenate header + states + bitmaps into one contiguous buffer,
    /// ready for upload as a single storage buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header.len() + self.states.len() + self.bitmaps.len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.states);
        out.extend_from_slice(&self.bitmaps);
        out
    }
}

pub fn pack(re: &CompiledRegex) -> PackedRegex {
    let mut states = Vec::with_capacity(re.states.len() * STATE_RECORD_SIZE);
    let mut bitmaps = Vec::new();
    let mut next_bitmap_word_offset: u32 = 0;

    for state in &re.states {
        let mut rec = [0u8; STATE_RECORD_SIZE];
        let out = if state.out == NO_EDGE { 0xFFFF } else { state.out as u16 };
        let out2 = if state.out2 == NO_EDGE { 0xFFFF } else { state.out2 as u16 };
        rec[2..4].copy_from_slice(&out.to_le_bytes());
        rec[4..6].copy_from_slice(&out2.to_le_bytes());

        match &state.kind {
            Kind::Literal { byte, case_insensitive } => {
                rec[0] = KIND_LITERAL;
                rec[1] = if *case_insensitive { FLAG_CASE_INSENSITIVE } else { 0 };
                rec[6] = *byte;
            }
            Kind::CharClass { bitmap, negated } => {
                rec[0] = KIND_CHAR_CLASS;
                rec[1] = if *negated { FLAG_NEGATED } else { 0 };
                let words = bitmap.to_u32_words();
                for w in words {
                    bitmaps.extend_from_slice(&w.to_le_bytes());
                }
                rec[8..12].copy_from_slice(&next_bitmap_word_offset.to_le_bytes());
                next_bitmap_word_offset += 8;
            }
            Kind::Dot => rec[0] = KIND_DOT,
            Kind::Any => rec[0] = KIND_ANY,
            Kind::Split => rec[0] = KIND_SPLIT,
            Kind::Match => rec[0] = KIND_MATCH,
            Kind::GroupStart(idx) => {
                rec[0] = KIND_GROUP_START;
                rec[7] = (*idx).min(255) as u8;
            }
            Kind::GroupEnd(idx) => {
                rec[0] = KIND_GROUP_END;
                rec[7] = (*idx).min(255) as u8;
            }
            Kind::WordBoundary => rec[0] = KIND_WORD_BOUNDARY,
            Kind::NotWordBoundary => rec[0] = KIND_NOT_WORD_BOUNDARY,
            Kind::LineStart => rec[0] = KIND_LINE_START,
            Kind::LineEnd => rec[0] = KIND_LINE_END,
            Kind::LookaheadPos => rec[0] = KIND_LOOKAHEAD_POS,
            Kind::LookaheadNeg => rec[0] = KIND_LOOKAHEAD_NEG,
            Kind::LookbehindPos { len } => {
                rec[0] = KIND_LOOKBEHIND_POS;
                rec[8..12].copy_from_slice(&len.to_le_bytes());
            }
            Kind::LookbehindNeg { len } => {
                rec[0] = KIND_LOOKBEHIND_NEG;
                rec[8..12].copy_from_slice(&len.to_le_bytes());
            }
            Kind::AtomicGroup => rec[0] = KIND_ATOMIC_GROUP,
            Kind::NonGreedy => {
                rec[0] = KIND_NON_GREEDY;
                rec[1] |= FLAG_NON_GREEDY;
            }
        }
        states.extend_from_slice(&rec);
    }

    let mut header_flags = 0u32;
    if re.anchored_start {
        header_flags |= HEADER_ANCHORED_START;
    }
    if re.anchored_end {
        header_flags |= HEADER_ANCHORED_END;
    }
    if re.case_insensitive {
        header_flags |= HEADER_CASE_INSENSITIVE;
    }

    let mut header = Vec::with_capacity(HEADER_SIZE);
    header.extend_from_slice(&(re.states.len() as u32).to_le_bytes());
    header.extend_from_slice(&re.start_state.to_le_bytes());
    header.extend_from_slice(&re.num_groups.to_le_bytes());
    header.extend_from_slice(&header_flags.to_le_bytes());

    PackedRegex { header, states, bitmaps }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SearchOptions;
    use crate::regex::{compiler, parser};

    #[test]
    fn packed_header_matches_state_count() {
        let opts = SearchOptions { extended: true, ..Default::default() };
        let (ast, groups) = parser::parse(b"a(b|c)+", true).unwrap();
        let re = compiler::compile(&ast, groups, &opts).unwrap();
        let packed = pack(&re);
        let num_states = u32::from_le_bytes(packed.header[0..4].try_into().unwrap());
        assert_eq!(num_states as usize, re.states.len());
        assert_eq!(packed.states.len(), re.states.len() * STATE_RECORD_SIZE);
    }

    #[test]
    fn class_state_gets_bitmap_offset() {
        let opts = SearchOptions { extended: true, ..Default::default() };
        let (ast, groups) = parser::parse(b"[0-9]+", true).unwrap();
        let re = compiler::compile(&ast, groups, &opts).unwrap();
        let packed = pack(&re);
        assert!(!packed.bitmaps.is_empty());
    }
}
