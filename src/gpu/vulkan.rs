// Vulkan host driver (spec.md §4.G). Instance/physical-device/queue
// selection and descriptor-set plumbing follow the shape used by
// `searchlight`'s `PfacGpu` (see `other_examples/` grounding in DESIGN.md):
// pick the first discrete (falling back to any) device exposing a compute
// queue, build two pipelines from the embedded SPIR-V (literal + line-
// partitioned regex), and fail soft so the dispatcher can fall back to CPU.

use crate::error::{Error, Result};
use crate::gpu::protocol::{
    self, LiteralMatchRecord, LiteralSearchConfig, RegexMatchRecord, RegexSearchConfig, GPU_MAX_NFA_STATES,
    MAX_RESULTS,
};
use crate::gpu::shaders::VULKAN_SEARCH_SPIRV;
use crate::options::SearchOptions;
use crate::regex::gpu_pack;
use crate::regex::nfa::CompiledRegex;
use crate::result::{MatchRecord, SearchResult};
use std::sync::{Arc, OnceLock};
use vulkano::buffer::{Buffer, BufferCreateInfo, BufferUsage, Subbuffer};
use vulkano::command_buffer::allocator::StandardCommandBufferAllocator;
use vulkano::command_buffer::{AutoCommandBufferBuilder, CommandBufferUsage};
use vulkano::descriptor_set::allocator::StandardDescriptorSetAllocator;
use vulkano::descriptor_set::{PersistentDescriptorSet, WriteDescriptorSet};
use vulkano::device::physical::PhysicalDeviceType;
use vulkano::device::{Device, DeviceCreateInfo, Queue, QueueCreateInfo, QueueFlags};
use vulkano::instance::{Instance, InstanceCreateInfo};
use vulkano::memory::allocator::{AllocationCreateInfo, MemoryTypeFilter, StandardMemoryAllocator};
use vulkano::pipeline::compute::ComputePipelineCreateInfo;
use vulkano::pipeline::layout::PipelineDescriptorSetLayoutCreateInfo;
use vulkano::pipeline::{ComputePipeline, Pipeline, PipelineBindPoint, PipelineLayout, PipelineShaderStageCreateInfo};
use vulkano::shader::ShaderModule;
use vulkano::sync::GpuFuture;
use vulkano::VulkanLibrary;

pub struct VulkanBackend {
    device: Arc<Device>,
    queue: Arc<Queue>,
    literal_pipeline: Arc<ComputePipeline>,
    regex_pipeline: Arc<ComputePipeline>,
    allocator: Arc<StandardMemoryAllocator>,
}

/// Cached process-wide loader handle (spec.md §4.G "Loader resolution":
/// "cache the loader handle process-wide after first success"). `VulkanLibrary::new`
/// already walks the platform-specific names this paragraph describes
/// (MoltenVK then `libvulkan` on Darwin, `libvulkan.so.1`/`.so` on Linux,
/// `vulkan-1.dll` on Windows) via its underlying dynamic-loading crate; this
/// just adds the one-time-only caching layer on top.
static VULKAN_LIBRARY: OnceLock<Option<Arc<VulkanLibrary>>> = OnceLock::new();

fn load_library() -> Option<Arc<VulkanLibrary>> {
    VULKAN_LIBRARY.get_or_init(|| VulkanLibrary::new().ok()).clone()
}

/// Probe for a usable Vulkan device; mirrors `metal::probe` -- `None` on any
/// failure rather than propagating an error, per spec.md §4.H fallback rule.
pub fn probe() -> Option<VulkanBackend> {
    VulkanBackend::new().ok()
}

impl VulkanBackend {
    pub fn new() -> Result<VulkanBackend> {
        let library = load_library().ok_or_else(|| Error::GpuUnavailable("no Vulkan loader".into()))?;
        let instance = Instance::new(library, InstanceCreateInfo::default())
            .map_err(|e| Error::GpuUnavailable(format!("instance creation failed: {e}")))?;

        let physical_devices: Vec<_> = instance
            .enumerate_physical_devices()
            .map_err(|e| Error::GpuUnavailable(format!("device enumeration failed: {e}")))?
            .collect();
        // Prefer a discrete GPU with a compute queue (spec.md §4.G); fall
        // back to the first device that has one at all.
        let physical = physical_devices
            .iter()
            .find(|p| {
                p.properties().device_type == PhysicalDeviceType::DiscreteGpu
                    && p.queue_family_properties().iter().any(|q| q.queue_flags.intersects(QueueFlags::COMPUTE))
            })
            .or_else(|| physical_devices.iter().find(|p| p.queue_family_properties().iter().any(|q| q.queue_flags.intersects(QueueFlags::COMPUTE))))
            .cloned()
            .ok_or_else(|| Error::GpuUnavailable("no physical device with a compute queue".into()))?;

        let queue_family_index = physical
            .queue_family_properties()
            .iter()
            .position(|q| q.queue_flags.intersects(QueueFlags::COMPUTE))
            .ok_or_else(|| Error::GpuUnavailable("no compute queue family".into()))? as u32;

        let (device, mut queues) = Device::new(
            physical,
            DeviceCreateInfo {
                queue_create_infos: vec![QueueCreateInfo { queue_family_index, ..Default::default() }],
                ..Default::default()
            },
        )
        .map_err(|e| Error::GpuUnavailable(format!("logical device creation failed: {e}")))?;
        let queue = queues.next().ok_or_else(|| Error::GpuUnavailable("no queue returned".into()))?;

        let words = bytemuck_words(VULKAN_SEARCH_SPIRV);
        let shader = unsafe { ShaderModule::from_words(device.clone(), &words) }
            .map_err(|e| Error::GpuUnavailable(format!("shader module load failed: {e}")))?;

        let literal_pipeline = build_pipeline(&device, &shader, "literal_search")?;
        let regex_pipeline = build_pipeline(&device, &shader, "regex_search_lines")?;

        let allocator = Arc::new(StandardMemoryAllocator::new_default(device.clone()));
        Ok(VulkanBackend { device, queue, literal_pipeline, regex_pipeline, allocator })
    }

    pub fn literal_search(&self, text: &[u8], pattern: &[u8], options: &SearchOptions) -> Result<SearchResult> {
        let geometry = protocol::position_partitioned_geometry(text.len(), 256);
        let cfg = LiteralSearchConfig {
            text_len: text.len() as u32,
            pattern_len: pattern.len() as u32,
            num_patterns: 1,
            flags: protocol::flags_from_options(options),
            positions_per_thread: 64,
            batch_offset: 0,
            _pad: [0; 2],
        };

        let text_buf = self.upload(text, BufferUsage::STORAGE_BUFFER)?;
        let pattern_buf = self.upload(pattern, BufferUsage::STORAGE_BUFFER)?;
        let cfg_buf = self.upload(&cfg.to_bytes(), BufferUsage::UNIFORM_BUFFER)?;
        let out_buf = self.alloc_zeroed(MAX_RESULTS as usize * LiteralMatchRecord::SIZE, BufferUsage::STORAGE_BUFFER)?;
        let result_count_buf = self.alloc_zeroed(4, BufferUsage::STORAGE_BUFFER)?;
        let total_matches_buf = self.alloc_zeroed(4, BufferUsage::STORAGE_BUFFER)?;

        let set = self.descriptor_set(
            &self.literal_pipeline,
            [
                WriteDescriptorSet::buffer(0, text_buf),
                WriteDescriptorSet::buffer(1, pattern_buf),
                WriteDescriptorSet::buffer(2, cfg_buf),
                WriteDescriptorSet::buffer(3, out_buf.clone()),
                WriteDescriptorSet::buffer(4, result_count_buf.clone()),
                WriteDescriptorSet::buffer(5, total_matches_buf.clone()),
            ],
        )?;

        self.dispatch_and_wait(&self.literal_pipeline, set, geometry.grid_size)?;

        let count = read_u32(&result_count_buf)?.min(MAX_RESULTS);
        let total = read_u32(&total_matches_buf)?;
        let out_read = out_buf.read().map_err(|e| Error::GpuUnavailable(e.to_string()))?;
        let mut matches = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let offset = i * LiteralMatchRecord::SIZE;
            let rec = LiteralMatchRecord::from_bytes(&out_read[offset..offset + LiteralMatchRecord::SIZE]);
            matches.push(rec.into_match_record());
        }
        matches.sort_by_key(|m: &MatchRecord| m.position);
        Ok(SearchResult { matches, total_matches: total as u64 })
    }

    /// Regex search over `text`, one GPU thread per line (spec.md §4.E
    /// `regex_search_lines`, §4.G "regex: 9 storage buffers"). Rejected with
    /// `GpuUnavailable` when the compiled pattern exceeds `GPU_MAX_NFA_STATES`
    /// so `crate::engine` can fall back to the CPU evaluator.
    pub fn regex_search_lines(&self, re: &CompiledRegex, text: &[u8], options: &SearchOptions) -> Result<SearchResult> {
        if re.states.len() > GPU_MAX_NFA_STATES {
            return Err(Error::GpuUnavailable("regex exceeds GPU state cap".into()));
        }
        let packed = gpu_pack::pack(re);
        let (line_offsets, line_lengths) = protocol::line_spans(text);
        let geometry = protocol::line_partitioned_geometry(line_offsets.len(), 256);

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

        let text_buf = self.upload(text, BufferUsage::STORAGE_BUFFER)?;
        let states_buf = self.upload(&packed.states, BufferUsage::STORAGE_BUFFER)?;
        let bitmaps_buf = self.upload(&packed.bitmaps, BufferUsage::STORAGE_BUFFER)?;
        let cfg_buf = self.upload(&cfg.to_bytes(), BufferUsage::UNIFORM_BUFFER)?;
        let offsets_buf = self.upload(&u32_to_le_bytes(&line_offsets), BufferUsage::STORAGE_BUFFER)?;
        let lengths_buf = self.upload(&u32_to_le_bytes(&line_lengths), BufferUsage::STORAGE_BUFFER)?;
        let out_buf = self.alloc_zeroed(MAX_RESULTS as usize * RegexMatchRecord::SIZE, BufferUsage::STORAGE_BUFFER)?;
        let result_count_buf = self.alloc_zeroed(4, BufferUsage::STORAGE_BUFFER)?;
        let total_matches_buf = self.alloc_zeroed(4, BufferUsage::STORAGE_BUFFER)?;

        let set = self.descriptor_set(
            &self.regex_pipeline,
            [
                WriteDescriptorSet::buffer(0, text_buf),
                WriteDescriptorSet::buffer(1, states_buf),
                WriteDescriptorSet::buffer(2, bitmaps_buf),
                WriteDescriptorSet::buffer(3, cfg_buf),
                WriteDescriptorSet::buffer(4, offsets_buf),
                WriteDescriptorSet::buffer(5, lengths_buf),
                WriteDescriptorSet::buffer(6, out_buf.clone()),
                WriteDescriptorSet::buffer(7, result_count_buf.clone()),
                WriteDescriptorSet::buffer(8, total_matches_buf.clone()),
            ],
        )?;

        self.dispatch_and_wait(&self.regex_pipeline, set, geometry.grid_size)?;

        let count = read_u32(&result_count_buf)?.min(MAX_RESULTS);
        let total = read_u32(&total_matches_buf)?;
        let out_read = out_buf.read().map_err(|e| Error::GpuUnavailable(e.to_string()))?;
        let mut matches = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let offset = i * RegexMatchRecord::SIZE;
            let rec = RegexMatchRecord::from_bytes(&out_read[offset..offset + RegexMatchRecord::SIZE]);
            if rec.is_valid() {
                matches.push(rec.into_match_record());
            }
        }
        matches.sort_by_key(|m: &MatchRecord| m.position);
        Ok(SearchResult { matches, total_matches: total as u64 })
    }

    fn descriptor_set<const N: usize>(
        &self,
        pipeline: &Arc<ComputePipeline>,
        writes: [WriteDescriptorSet; N],
    ) -> Result<Arc<PersistentDescriptorSet>> {
        let layout = pipeline.layout().set_layouts().first().ok_or_else(|| Error::GpuUnavailable("no descriptor set layout".into()))?;
        PersistentDescriptorSet::new(
            &StandardDescriptorSetAllocator::new(self.device.clone(), Default::default()),
            layout.clone(),
            writes,
            [],
        )
        .map_err(|e| Error::GpuUnavailable(format!("descriptor set failed: {e}")))
    }

    fn dispatch_and_wait(&self, pipeline: &Arc<ComputePipeline>, set: Arc<PersistentDescriptorSet>, grid_size: u32) -> Result<()> {
        let allocator = StandardCommandBufferAllocator::new(self.device.clone(), Default::default());
        let mut builder = AutoCommandBufferBuilder::primary(&allocator, self.queue.queue_family_index(), CommandBufferUsage::OneTimeSubmit)
            .map_err(|e| Error::GpuUnavailable(format!("command buffer failed: {e}")))?;
        builder
            .bind_pipeline_compute(pipeline.clone())
            .map_err(|e| Error::GpuUnavailable(e.to_string()))?
            .bind_descriptor_sets(PipelineBindPoint::Compute, pipeline.layout().clone(), 0, set)
            .map_err(|e| Error::GpuUnavailable(e.to_string()))?;
        unsafe {
            builder.dispatch([grid_size, 1, 1]).map_err(|e| Error::GpuUnavailable(e.to_string()))?;
        }
        let command_buffer = builder.build().map_err(|e| Error::GpuUnavailable(e.to_string()))?;
        let future = vulkano::sync::now(self.device.clone())
            .then_execute(self.queue.clone(), command_buffer)
            .map_err(|e| Error::GpuUnavailable(e.to_string()))?
            .then_signal_fence_and_flush()
            .map_err(|e| Error::GpuUnavailable(e.to_string()))?;
        future.wait(None).map_err(|e| Error::GpuUnavailable(e.to_string()))
    }

    fn upload(&self, data: &[u8], usage: BufferUsage) -> Result<Subbuffer<[u8]>> {
        Buffer::from_iter(
            self.allocator.clone(),
            BufferCreateInfo { usage, ..Default::default() },
            AllocationCreateInfo { memory_type_filter: MemoryTypeFilter::PREFER_DEVICE | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE, ..Default::default() },
            data.iter().copied(),
        )
        .map_err(|e| Error::GpuUnavailable(format!("buffer upload failed: {e}")))
    }

    fn alloc_zeroed(&self, len: usize, usage: BufferUsage) -> Result<Subbuffer<[u8]>> {
        Buffer::from_iter(
            self.allocator.clone(),
            BufferCreateInfo { usage, ..Default::default() },
            AllocationCreateInfo { memory_type_filter: MemoryTypeFilter::HOST_RANDOM_ACCESS, ..Default::default() },
            std::iter::repeat(0u8).take(len),
        )
        .map_err(|e| Error::GpuUnavailable(format!("buffer alloc failed: {e}")))
    }
}

fn build_pipeline(device: &Arc<Device>, shader: &Arc<ShaderModule>, entry_point_name: &str) -> Result<Arc<ComputePipeline>> {
    let entry_point = shader
        .entry_point(entry_point_name)
        .ok_or_else(|| Error::GpuUnavailable(format!("missing entry point: {entry_point_name}")))?;
    let stage = PipelineShaderStageCreateInfo::new(entry_point);
    let layout = PipelineLayout::new(
        device.clone(),
        PipelineDescriptorSetLayoutCreateInfo::from_stages([&stage])
            .into_pipeline_layout_create_info(device.clone())
            .map_err(|e| Error::GpuUnavailable(format!("layout failed: {e}")))?,
    )
    .map_err(|e| Error::GpuUnavailable(format!("layout creation failed: {e}")))?;
    ComputePipeline::new(device.clone(), None, ComputePipelineCreateInfo::stage_layout(stage, layout))
        .map_err(|e| Error::GpuUnavailable(format!("pipeline creation failed: {e}")))
}

fn read_u32(buf: &Subbuffer<[u8]>) -> Result<u32> {
    let read = buf.read().map_err(|e| Error::GpuUnavailable(e.to_string()))?;
    Ok(u32::from_le_bytes(read[0..4].try_into().unwrap()))
}

fn u32_to_le_bytes(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytemuck_words(bytes: &[u8]) -> Vec<u32> {
    bytes.chunks_exact(4).map(|c| u32::from_le_bytes(c.try_into().unwrap())).collect()
}
