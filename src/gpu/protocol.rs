// Shared GPU search protocol (spec.md §4.E): struct layouts, flag bits, and
// dispatch geometry common to both the Metal and Vulkan host drivers. Every
// struct here is interpreted as raw bytes by the device-side kernels, so
// field order and size are part of the contract -- changing either breaks
// both `gpu::metal` and `gpu::vulkan` simultaneously.

pub const MAX_RESULTS: u32 = 1_000_000;

/// Device-side NFA state-table cap (spec.md §4.C commits only to "≥256 NFA
/// states" as a floor; the GPU kernel's fixed-size thread-local bitsets in
/// `search.metal`/`search.spv` are sized to this, so any compiled regex with
/// more states than this falls back to the CPU evaluator, same as the
/// `min_gpu_size`/`max_gpu_size` hard rules in `crate::dispatch`).
pub const GPU_MAX_NFA_STATES: usize = 256;

/// Shared search flags (spec.md §4.E), common to literal and regex kernels.
pub const FLAG_CASE_INSENSITIVE: u32 = 0x01;
pub const FLAG_WORD_BOUNDARY: u32 = 0x02;
pub const FLAG_INVERT_MATCH: u32 = 0x10;
pub const FLAG_FIXED_STRING: u32 = 0x20;

pub fn flags_from_options(options: &crate::options::SearchOptions) -> u32 {
    let mut f = 0;
    if options.case_insensitive {
        f |= FLAG_CASE_INSENSITIVE;
    }
    if options.word_boundary {
        f |= FLAG_WORD_BOUNDARY;
    }
    if options.invert_match {
        f |= FLAG_INVERT_MATCH;
    }
    if options.fixed_string {
        f |= FLAG_FIXED_STRING;
    }
    f
}

/// Literal search config (32 bytes, spec.md §4.E).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct LiteralSearchConfig {
    pub text_len: u32,
    pub pattern_len: u32,
    pub num_patterns: u32,
    pub flags: u32,
    pub positions_per_thread: u32,
    pub batch_offset: u32,
    pub _pad: [u32; 2],
}

impl LiteralSearchConfig {
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[0..4].copy_from_slice(&self.text_len.to_le_bytes());
        out[4..8].copy_from_slice(&self.pattern_len.to_le_bytes());
        out[8..12].copy_from_slice(&self.num_patterns.to_le_bytes());
        out[12..16].copy_from_slice(&self.flags.to_le_bytes());
        out[16..20].copy_from_slice(&self.positions_per_thread.to_le_bytes());
        out[20..24].copy_from_slice(&self.batch_offset.to_le_bytes());
        out
    }
}

/// Literal match record (32 bytes, spec.md §4.E).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct LiteralMatchRecord {
    pub position: u32,
    pub pattern_idx: u32,
    pub match_len: u32,
    pub line_start: u32,
    pub line_num: u32,
    pub _pad: [u32; 3],
}

impl LiteralMatchRecord {
    pub const SIZE: usize = 32;

    pub fn from_bytes(b: &[u8]) -> LiteralMatchRecord {
        LiteralMatchRecord {
            position: u32::from_le_bytes(b[0..4].try_into().unwrap()),
            pattern_idx: u32::from_le_bytes(b[4..8].try_into().unwrap()),
            match_len: u32::from_le_bytes(b[8..12].try_into().unwrap()),
            line_start: u32::from_le_bytes(b[12..16].try_into().unwrap()),
            line_num: u32::from_le_bytes(b[16..20].try_into().unwrap()),
            _pad: [0; 3],
        }
    }

    pub fn into_match_record(self) -> crate::result::MatchRecord {
        crate::result::MatchRecord {
            position: self.position,
            match_len: self.match_len,
            line_start: self.line_start,
            line_num: self.line_num,
            pattern_idx: self.pattern_idx,
        }
    }
}

/// Regex search config (32 bytes, spec.md §4.E).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct RegexSearchConfig {
    pub text_len: u32,
    pub num_states: u32,
    pub start_state: u32,
    pub header_flags: u32,
    pub num_bitmaps: u32,
    pub max_results: u32,
    pub flags: u32,
    pub line_offset: u32,
}

impl RegexSearchConfig {
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[0..4].copy_from_slice(&self.text_len.to_le_bytes());
        out[4..8].copy_from_slice(&self.num_states.to_le_bytes());
        out[8..12].copy_from_slice(&self.start_state.to_le_bytes());
        out[12..16].copy_from_slice(&self.header_flags.to_le_bytes());
        out[16..20].copy_from_slice(&self.num_bitmaps.to_le_bytes());
        out[20..24].copy_from_slice(&self.max_results.to_le_bytes());
        out[24..28].copy_from_slice(&self.flags.to_le_bytes());
        out[28..32].copy_from_slice(&self.line_offset.to_le_bytes());
        out
    }
}

/// Regex match record (32 bytes, spec.md §4.E).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct RegexMatchRecord {
    pub start: u32,
    pub end: u32,
    pub line_start: u32,
    pub flags: u32,
    pub line_num: u32,
    pub _pad: [u32; 3],
}

impl RegexMatchRecord {
    pub const SIZE: usize = 32;
    pub const FLAG_VALID: u32 = 0x01;

    pub fn from_bytes(b: &[u8]) -> RegexMatchRecord {
        RegexMatchRecord {
            start: u32::from_le_bytes(b[0..4].try_into().unwrap()),
            end: u32::from_le_bytes(b[4..8].try_into().unwrap()),
            line_start: u32::from_le_bytes(b[8..12].try_into().unwrap()),
            flags: u32::from_le_bytes(b[12..16].try_into().unwrap()),
            line_num: u32::from_le_bytes(b[16..20].try_into().unwrap()),
            _pad: [0; 3],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.flags & Self::FLAG_VALID != 0
    }

    pub fn into_match_record(self) -> crate::result::MatchRecord {
        crate::result::MatchRecord {
            position: self.start,
            match_len: self.end - self.start,
            line_start: self.line_start,
            line_num: self.line_num,
            pattern_idx: 0,
        }
    }
}

/// Dispatch geometry (spec.md §4.E "Dispatch geometry"):
/// `workgroup size = min(device_max_threadgroup, 256)`,
/// `grid = max(1, ceil(work_items / workgroup_size))`.
pub struct DispatchGeometry {
    pub workgroup_size: u32,
    pub grid_size: u32,
}

/// Split `text` into (offset, length) pairs, one per line, excluding the
/// trailing `\n` from each length -- the host-side half of the
/// `regex_search_lines` contract (spec.md §4.E: "one thread per line",
/// using `line_offsets[]`/`line_lengths[]`).
pub fn line_spans(text: &[u8]) -> (Vec<u32>, Vec<u32>) {
    let mut offsets = Vec::new();
    let mut lengths = Vec::new();
    let mut start = 0usize;
    for i in memchr::memchr_iter(b'\n', text) {
        offsets.push(start as u32);
        lengths.push((i - start) as u32);
        start = i + 1;
    }
    if start < text.len() || text.is_empty() {
        offsets.push(start as u32);
        lengths.push((text.len() - start) as u32);
    }
    (offsets, lengths)
}

pub fn position_partitioned_geometry(text_len: usize, device_max_threadgroup: u32) -> DispatchGeometry {
    let work_items = std::cmp::max(1, text_len / 64) as u32;
    geometry_for(work_items, device_max_threadgroup)
}

pub fn line_partitioned_geometry(num_lines: usize, device_max_threadgroup: u32) -> DispatchGeometry {
    geometry_for(std::cmp::max(1, num_lines as u32), device_max_threadgroup)
}

fn geometry_for(work_items: u32, device_max_threadgroup: u32) -> DispatchGeometry {
    let workgroup_size = std::cmp::min(device_max_threadgroup, 256);
    let grid_size = std::cmp::max(1, (work_items + workgroup_size - 1) / workgroup_size);
    DispatchGeometry { workgroup_size, grid_size }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_config_round_trips_len() {
        let cfg = LiteralSearchConfig { text_len: 1024, pattern_len: 5, ..Default::default() };
        let bytes = cfg.to_bytes();
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 1024);
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn geometry_at_least_one_group() {
        let g = position_partitioned_geometry(10, 256);
        assert_eq!(g.grid_size, 1);
    }

    #[test]
    fn geometry_caps_workgroup_at_256() {
        let g = position_partitioned_geometry(1 << 20, 1024);
        assert_eq!(g.workgroup_size, 256);
    }

    #[test]
    fn line_spans_splits_on_newline() {
        let (offsets, lengths) = line_spans(b"ab\ncd\ne");
        assert_eq!(offsets, vec![0, 3, 6]);
        assert_eq!(lengths, vec![2, 2, 1]);
    }

    #[test]
    fn line_spans_trailing_newline_has_no_extra_line() {
        let (offsets, lengths) = line_spans(b"ab\n");
        assert_eq!(offsets, vec![0]);
        assert_eq!(lengths, vec![2]);
    }
}
