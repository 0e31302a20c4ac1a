// Hardware capability probe (spec.md §4.H "hardware-adaptive" dispatch).
// Used to bias the CPU-vs-GPU score: a CPU with wide SIMD support narrows
// the gap the GPU engine would otherwise win on large case-insensitive or
// word-boundary searches, since the 16-byte chunked compare in
// `literal::window_matches` benefits directly from it.

use raw_cpuid::CpuId;

#[derive(Clone, Copy, Debug, Default)]
pub struct CpuCapabilities {
    pub has_avx2: bool,
    pub has_sse42: bool,
}

pub fn probe() -> CpuCapabilities {
    let cpuid = CpuId::new();
    let features = cpuid.get_feature_info();
    let extended = cpuid.get_extended_feature_info();
    CpuCapabilities {
        has_avx2: extended.map(|f| f.has_avx2()).unwrap_or(false),
        has_sse42: features.map(|f| f.has_sse42()).unwrap_or(false),
    }
}

/// Score adjustment applied against the GPU side of `dispatch::score`
/// (spec.md §4.H): a wide-SIMD CPU claws back some of the GPU's base
/// advantage on large inputs.
impl CpuCapabilities {
    pub fn cpu_score_bonus(&self) -> i32 {
        if self.has_avx2 {
            -2
        } else if self.has_sse42 {
            -1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_does_not_panic() {
        let caps = probe();
        let _ = caps.cpu_score_bonus();
    }

    #[test]
    fn avx2_outweighs_sse42() {
        let avx2 = CpuCapabilities { has_avx2: true, has_sse42: true };
        let sse = CpuCapabilities { has_avx2: false, has_sse42: true };
        assert!(avx2.cpu_score_bonus() < sse.cpu_score_bonus());
    }
}
