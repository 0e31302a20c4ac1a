// Metal host driver (spec.md §4.F). Device/queue/pipeline lifecycle and
// buffer plumbing for both the literal and line-partitioned regex search
// kernels, grounded in the `metal` crate's standard
// `Device -> CommandQueue -> ComputePipelineState` dispatch shape.

use crate::error::{Error, Result};
use crate::gpu::protocol::{
    self, LiteralMatchRecord, LiteralSearchConfig, RegexMatchRecord, RegexSearchConfig, GPU_MAX_NFA_STATES,
    MAX_RESULTS,
};
use crate::gpu::shaders::METAL_SEARCH_SOURCE;
use crate::options::SearchOptions;
use crate::regex::gpu_pack;
use crate::regex::nfa::CompiledRegex;
use crate::result::{MatchRecord, SearchResult};
use metal::{Device, MTLResourceOptions, MTLSize};

pub struct MetalBackend {
    device: Device,
    queue: metal::CommandQueue,
    literal_pipeline: metal::ComputePipelineState,
    regex_pipeline: metal::ComputePipelineState,
}

/// Probe for a usable Metal device (spec.md §4.H "hardware capability
/// probe"): returns `None` rather than erroring so the dispatcher can
/// silently prefer CPU when no GPU is present.
pub fn probe() -> Option<MetalBackend> {
    MetalBackend::new().ok()
}

impl MetalBackend {
    pub fn new() -> Result<MetalBackend> {
        let device = Device::system_default().ok_or_else(|| Error::GpuUnavailable("no Metal device".into()))?;
        let queue = device.new_command_queue();
        let library = device
            .new_library_with_source(METAL_SEARCH_SOURCE, &metal::CompileOptions::new())
            .map_err(|e| Error::GpuUnavailable(format!("metal library compile failed: {e}")))?;

        let literal_fn = library
            .get_function("literal_search", None)
            .map_err(|e| Error::GpuUnavailable(format!("missing kernel: {e}")))?;
        let literal_pipeline = device
            .new_compute_pipeline_state_with_function(&literal_fn)
            .map_err(|e| Error::GpuUnavailable(format!("pipeline state failed: {e}")))?;

        let regex_fn = library
            .get_function("regex_search_lines", None)
            .map_err(|e| Error::GpuUnavailable(format!("missing kernel: {e}")))?;
        let regex_pipeline = device
            .new_compute_pipeline_state_with_function(&regex_fn)
            .map_err(|e| Error::GpuUnavailable(format!("pipeline state failed: {e}")))?;

        Ok(MetalBackend { device, queue, literal_pipeline, regex_pipeline })
    }

    pub fn max_threadgroup(&self) -> u32 {
        self.literal_pipeline.max_total_threads_per_threadgroup() as u32
    }

    fn new_buffer_from<T: Copy>(&self, data: &[T]) -> metal::Buffer {
        let bytes = data.len() * std::mem::size_of::<T>();
        if bytes == 0 {
            return self.device.new_buffer(1, MTLResourceOptions::StorageModeShared);
        }
        self.device.new_buffer_with_data(data.as_ptr() as *const _, bytes as u64, MTLResourceOptions::StorageModeShared)
    }

    fn zeroed_counter(&self) -> metal::Buffer {
        let buf = self.device.new_buffer(4, MTLResourceOptions::StorageModeShared);
        unsafe {
            *(buf.contents() as *mut u32) = 0;
        }
        buf
    }

    pub fn literal_search(&self, text: &[u8], pattern: &[u8], options: &SearchOptions) -> Result<SearchResult> {
        if text.len() > u32::MAX as usize {
            return Err(Error::PatternTooLong);
        }
        let geometry = protocol::position_partitioned_geometry(text.len(), self.max_threadgroup());
        let cfg = LiteralSearchConfig {
            text_len: text.len() as u32,
            pattern_len: pattern.len() as u32,
            num_patterns: 1,
            flags: protocol::flags_from_options(options),
            positions_per_thread: 64,
            batch_offset: 0,
            _pad: [0; 2],
        };

        let text_buf = self.new_buffer_from(text);
        let pattern_buf = self.new_buffer_from(pattern);
        let cfg_bytes = cfg.to_bytes();
        let cfg_buf = self.new_buffer_from(&cfg_bytes[..]);
        let out_buf =
            self.device.new_buffer((MAX_RESULTS as u64) * LiteralMatchRecord::SIZE as u64, MTLResourceOptions::StorageModeShared);
        let result_count_buf = self.zeroed_counter();
        let total_matches_buf = self.zeroed_counter();

        let command_buffer = self.queue.new_command_buffer();
        let encoder = command_buffer.new_compute_command_encoder();
        encoder.set_compute_pipeline_state(&self.literal_pipeline);
        encoder.set_buffer(0, Some(&text_buf), 0);
        encoder.set_buffer(1, Some(&pattern_buf), 0);
        encoder.set_buffer(2, Some(&cfg_buf), 0);
        encoder.set_buffer(3, Some(&out_buf), 0);
        encoder.set_buffer(4, Some(&result_count_buf), 0);
        encoder.set_buffer(5, Some(&total_matches_buf), 0);
        let grid = MTLSize::new(geometry.grid_size as u64 * geometry.workgroup_size as u64, 1, 1);
        let threadgroup = MTLSize::new(geometry.workgroup_size as u64, 1, 1);
        encoder.dispatch_threads(grid, threadgroup);
        encoder.end_encoding();
        command_buffer.commit();
        command_buffer.wait_until_completed();

        let count = unsafe { *(result_count_buf.contents() as *const u32) }.min(MAX_RESULTS);
        let total = unsafe { *(total_matches_buf.contents() as *const u32) };
        let mut matches = Vec::with_capacity(count as usize);
        let raw = out_buf.contents() as *const u8;
        for i in 0..count as usize {
            let offset = i * LiteralMatchRecord::SIZE;
            let bytes = unsafe { std::slice::from_raw_parts(raw.add(offset), LiteralMatchRecord::SIZE) };
            let rec = LiteralMatchRecord::from_bytes(bytes);
            matches.push(rec.into_match_record());
        }
        Ok(finish(matches, total as u64))
    }

    /// Regex search over `text`, one GPU thread per line (spec.md §4.E
    /// `regex_search_lines`). Rejected with `GpuUnavailable` when the
    /// compiled pattern's state count exceeds `GPU_MAX_NFA_STATES`, so the
    /// caller (`crate::engine`) can fall back to the CPU evaluator.
    pub fn regex_search_lines(&self, re: &CompiledRegex, text: &[u8], options: &SearchOptions) -> Result<SearchResult> {
        if re.states.len() > GPU_MAX_NFA_STATES {
            return Err(Error::GpuUnavailable("regex exceeds GPU state cap".into()));
        }
        if text.len() > u32::MAX as usize {
            return Err(Error::PatternTooLong);
        }
        let packed = gpu_pack::pack(re);
        let (line_offsets, line_lengths) = protocol::line_spans(text);
        let geometry = protocol::line_partitioned_geometry(line_offsets.len(), self.max_threadgroup());

        let mut header_flags = 0u32;
        if re.anchored_start {
            header_flags |= gpu_pack::HEADER_ANCHORED_START;
        }
        if re.anchored_end {
            header_flags |= gpu_pack::HEADER_ANCHORED_END;
        }
        let cfg = RegexSearchConfig {
            text_len: text.len() as u32,
            num_states: re.states.len() as u32,
            start_state: re.start_state,
            header_flags,
            num_bitmaps: (packed.bitmaps.len() / 4) as u32,
            max_results: MAX_RESULTS,
            flags: protocol::flags_from_options(options),
            line_offset: 0,
        };

        let text_buf = self.new_buffer_from(text);
        let states_buf = self.new_buffer_from(&packed.states);
        let bitmaps_buf = self.new_buffer_from(&packed.bitmaps);
        let cfg_bytes = cfg.to_bytes();
        let cfg_buf = self.new_buffer_from(&cfg_bytes[..]);
        let offsets_buf = self.new_buffer_from(&line_offsets);
        let lengths_buf = self.new_buffer_from(&line_lengths);
        let out_buf =
            self.device.new_buffer((MAX_RESULTS as u64) * RegexMatchRecord::SIZE as u64, MTLResourceOptions::StorageModeShared);
        let result_count_buf = self.zeroed_counter();
        let total_matches_buf = self.zeroed_counter();

        let command_buffer = self.queue.new_command_buffer();
        let encoder = command_buffer.new_compute_command_encoder();
        encoder.set_compute_pipeline_state(&self.regex_pipeline);
        encoder.set_buffer(0, Some(&text_buf), 0);
        encoder.set_buffer(1, Some(&states_buf), 0);
        encoder.set_buffer(2, Some(&bitmaps_buf), 0);
        encoder.set_buffer(3, Some(&cfg_buf), 0);
        encoder.set_buffer(4, Some(&offsets_buf), 0);
        encoder.set_buffer(5, Some(&lengths_buf), 0);
        encoder.set_buffer(6, Some(&out_buf), 0);
        encoder.set_buffer(7, Some(&result_count_buf), 0);
        encoder.set_buffer(8, Some(&total_matches_buf), 0);
        let grid = MTLSize::new(geometry.grid_size as u64 * geometry.workgroup_size as u64, 1, 1);
        let threadgroup = MTLSize::new(geometry.workgroup_size as u64, 1, 1);
        encoder.dispatch_threads(grid, threadgroup);
        encoder.end_encoding();
        command_buffer.commit();
        command_buffer.wait_until_completed();

        let count = unsafe { *(result_count_buf.contents() as *const u32) }.min(MAX_RESULTS);
        let total = unsafe { *(total_matches_buf.contents() as *const u32) };
        let mut matches = Vec::with_capacity(count as usize);
        let raw = out_buf.contents() as *const u8;
        for i in 0..count as usize {
            let offset = i * RegexMatchRecord::SIZE;
            let bytes = unsafe { std::slice::from_raw_parts(raw.add(offset), RegexMatchRecord::SIZE) };
            let rec = RegexMatchRecord::from_bytes(bytes);
            if rec.is_valid() {
                matches.push(rec.into_match_record());
            }
        }
        Ok(finish(matches, total as u64))
    }
}

fn finish(mut matches: Vec<MatchRecord>, total_matches: u64) -> SearchResult {
    matches.sort_by_key(|m| m.position);
    SearchResult { matches, total_matches }
}
