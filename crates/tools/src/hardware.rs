//! Hardware Reference Profiles
//!
//! Published figures for common accelerators. The session hands a matched
//! profile to the backend as grounding for its energy and cost estimates.

use serde::Serialize;

/// Reference figures for one accelerator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpuProfile {
    pub name: &'static str,
    /// Peak dense FP16 throughput
    pub fp16_tflops: f64,
    /// Thermal design power
    pub tdp_watts: u32,
    /// Typical on-demand cloud price
    pub hourly_cost_usd: f64,
}

pub const H100: GpuProfile = GpuProfile {
    name: "NVIDIA H100",
    fp16_tflops: 1979.0,
    tdp_watts: 700,
    hourly_cost_usd: 3.50,
};

pub const A100_80GB: GpuProfile = GpuProfile {
    name: "NVIDIA A100 80GB",
    fp16_tflops: 312.0,
    tdp_watts: 400,
    hourly_cost_usd: 2.50,
};

pub const A100_40GB: GpuProfile = GpuProfile {
    name: "NVIDIA A100 40GB",
    fp16_tflops: 312.0,
    tdp_watts: 400,
    hourly_cost_usd: 2.21,
};

pub const A10G: GpuProfile = GpuProfile {
    name: "NVIDIA A10G",
    fp16_tflops: 125.0,
    tdp_watts: 150,
    hourly_cost_usd: 1.00,
};

pub const V100: GpuProfile = GpuProfile {
    name: "NVIDIA V100",
    fp16_tflops: 125.0,
    tdp_watts: 300,
    hourly_cost_usd: 1.50,
};

pub const T4: GpuProfile = GpuProfile {
    name: "NVIDIA T4",
    fp16_tflops: 65.0,
    tdp_watts: 70,
    hourly_cost_usd: 0.50,
};

pub const L4: GpuProfile = GpuProfile {
    name: "NVIDIA L4",
    fp16_tflops: 121.0,
    tdp_watts: 72,
    hourly_cost_usd: 0.80,
};

pub const RTX_4090: GpuProfile = GpuProfile {
    name: "NVIDIA RTX 4090",
    fp16_tflops: 330.0,
    tdp_watts: 450,
    hourly_cost_usd: 1.20,
};

pub const RTX_3090: GpuProfile = GpuProfile {
    name: "NVIDIA RTX 3090",
    fp16_tflops: 142.0,
    tdp_watts: 350,
    hourly_cost_usd: 0.80,
};

/// Every known profile.
pub const GPU_PROFILES: &[GpuProfile] = &[
    H100, A100_80GB, A100_40GB, A10G, V100, T4, L4, RTX_4090, RTX_3090,
];

/// Match a free-form device name against the known profiles.
///
/// Matching is case-insensitive and by substring, checked in a fixed order
/// so that e.g. "A100 80GB" resolves to the 80GB part before the generic A100.
pub fn lookup_gpu_profile(name: &str) -> Option<GpuProfile> {
    let name = name.to_lowercase();
    if name.contains("h100") {
        Some(H100)
    } else if name.contains("a100") {
        if name.contains("80g") {
            Some(A100_80GB)
        } else {
            Some(A100_40GB)
        }
    } else if name.contains("a10g") {
        Some(A10G)
    } else if name.contains("v100") {
        Some(V100)
    } else if name.contains("t4") {
        Some(T4)
    } else if name.contains("l4") {
        Some(L4)
    } else if name.contains("4090") {
        Some(RTX_4090)
    } else if name.contains("3090") {
        Some(RTX_3090)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_a100_variants() {
        assert_eq!(lookup_gpu_profile("NVIDIA A100-SXM4-80GB"), Some(A100_80GB));
        assert_eq!(lookup_gpu_profile("a100"), Some(A100_40GB));
    }

    #[test]
    fn test_lookup_consumer_cards() {
        assert_eq!(lookup_gpu_profile("GeForce RTX 4090"), Some(RTX_4090));
        assert_eq!(lookup_gpu_profile("rtx3090"), Some(RTX_3090));
    }

    #[test]
    fn test_lookup_unknown() {
        assert_eq!(lookup_gpu_profile("Raspberry Pi 5"), None);
        assert_eq!(lookup_gpu_profile(""), None);
    }

    #[test]
    fn test_profile_table_is_complete() {
        assert_eq!(GPU_PROFILES.len(), 9);
        assert!(GPU_PROFILES.iter().all(|p| p.tdp_watts > 0));
    }
}
