// Embedded device kernels (spec.md §6 "Embedded shaders"). Both kernel
// sources are baked into the binary at compile time so the crate ships with
// no runtime asset dependency; each host driver only touches the constant
// that matches its own backend.

/// Metal Shading Language source for the literal + regex search kernels,
/// compiled at runtime by `MTLDevice::new_library_with_source`.
#[cfg(feature = "metal-backend")]
pub const METAL_SEARCH_SOURCE: &str = include_str!("search.metal");

/// Pre-compiled SPIR-V for the same two kernels, consumed directly by
/// `vulkano::shader::ShaderModule::from_words`.
#[cfg(feature = "vulkan-backend")]
pub const VULKAN_SEARCH_SPIRV: &[u8] = include_bytes!("search.spv");
