//! GPU search backends (spec.md §4.E-§4.G): shared wire protocol plus the
//! feature-gated Metal and Vulkan host drivers. Neither driver is ever
//! required -- `crate::dispatch` falls back to the CPU engine whenever a
//! probe fails or the relevant feature is disabled.

pub mod protocol;
pub mod shaders;

#[cfg(feature = "metal-backend")]
pub mod metal;

#[cfg(feature = "vulkan-backend")]
pub mod vulkan;

use crate::error::Result;
use crate::options::SearchOptions;
use crate::regex::nfa::CompiledRegex;
use crate::result::SearchResult;

/// A live, probed GPU backend ready to run a literal or regex search.
pub enum GpuBackend {
    #[cfg(feature = "metal-backend")]
    Metal(metal::MetalBackend),
    #[cfg(feature = "vulkan-backend")]
    Vulkan(vulkan::VulkanBackend),
}

impl GpuBackend {
    pub fn literal_search(&self, text: &[u8], pattern: &[u8], options: &SearchOptions) -> Result<SearchResult> {
        match self {
            #[cfg(feature = "metal-backend")]
            GpuBackend::Metal(b) => b.literal_search(text, pattern, options),
            #[cfg(feature = "vulkan-backend")]
            GpuBackend::Vulkan(b) => b.literal_search(text, pattern, options),
        }
    }

    /// Regex search via the line-partitioned kernel (spec.md §4.E
    /// `regex_search_lines`). Returns `Err(Error::GpuUnavailable)` when the
    /// compiled pattern exceeds `protocol::GPU_MAX_NFA_STATES`, same as any
    /// other GPU-side failure -- `crate::engine` treats it as a fallback
    /// signal, not a hard error.
    pub fn regex_search_lines(&self, re: &CompiledRegex, text: &[u8], options: &SearchOptions) -> Result<SearchResult> {
        match self {
            #[cfg(feature = "metal-backend")]
            GpuBackend::Metal(b) => b.regex_search_lines(re, text, options),
            #[cfg(feature = "vulkan-backend")]
            GpuBackend::Vulkan(b) => b.regex_search_lines(re, text, options),
        }
    }
}

/// Probe for a live GPU backend, preferring Metal when both are compiled in
/// (spec.md §4.H treats this as a platform choice, not a quality ranking:
/// on a build with both features enabled we're almost certainly on macOS,
/// where Metal is native).
pub fn probe() -> Option<GpuBackend> {
    #[cfg(feature = "metal-backend")]
    if let Some(backend) = metal::probe() {
        return Some(GpuBackend::Metal(backend));
    }
    #[cfg(feature = "vulkan-backend")]
    if let Some(backend) = vulkan::probe() {
        return Some(GpuBackend::Vulkan(backend));
    }
    None
}
