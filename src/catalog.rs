//! Built-in rule groups.
//!
//! Each function returns one capability category in its declared order. The
//! order of rules inside a group and of groups inside a profile decides which
//! rule claims overlapping text, so both are spelled out here rather than
//! derived.

use crate::rule::{Rule, RuleGroup};

/// Shader model written by the shader-model group.
pub const SHADER_MODEL: &str = "6.9";
/// Feature level written by the shader-model group.
pub const FEATURE_LEVEL: &str = "12_2";
/// `vendor:device` pair written by the identity-override group.
pub const GPU_IDENTITY: &str = "0x1002:0x163f";

const VENDOR_ID: &str = "0x1002";
const DEVICE_ID: &str = "0x163f";

fn assign(id: &str, target: &str, value: &str) -> Rule {
    Rule::assignment(id, target, value)
}

pub fn shader_model() -> RuleGroup {
    RuleGroup::new(
        "shader-model",
        vec![
            assign("sm69", "data->HighestShaderModel", "D3D_SHADER_MODEL_6_9"),
            assign("sm69i", "info.HighestShaderModel", "D3D_SHADER_MODEL_6_9"),
            assign("fl122", "MaxSupportedFeatureLevel", "D3D_FEATURE_LEVEL_12_2"),
        ],
    )
}

pub fn wave_ops() -> RuleGroup {
    RuleGroup::new(
        "wave-ops",
        vec![
            assign("wv0", "options1.WaveOps", "TRUE"),
            assign("wv1", "options1.WaveLaneCountMin", "32"),
            assign("wv2", "options1.WaveLaneCountMax", "128"),
            assign("wv3", "options9.WaveMMATier", "D3D12_WAVE_MMA_TIER_1_0"),
        ],
    )
}

pub fn resource_binding() -> RuleGroup {
    RuleGroup::new(
        "resource-binding",
        vec![
            assign("rb0", "options.ResourceBindingTier", "D3D12_RESOURCE_BINDING_TIER_3"),
            assign("rb1", "options.TiledResourcesTier", "D3D12_TILED_RESOURCES_TIER_4"),
            assign("rb2", "options.ResourceHeapTier", "D3D12_RESOURCE_HEAP_TIER_2"),
            assign("rb3", "options19.MaxSamplerDescriptorHeapSize", "4096"),
            assign("rb4", "options19.MaxViewDescriptorHeapSize", "1000000"),
        ],
    )
}

pub fn shader_ops() -> RuleGroup {
    RuleGroup::new(
        "shader-ops",
        vec![
            assign("so0", "options.DoublePrecisionFloatShaderOps", "TRUE"),
            assign("so1", "options1.Int64ShaderOps", "TRUE"),
            assign("so2", "options4.Native16BitShaderOpsSupported", "TRUE"),
            assign("so3", "options9.AtomicInt64OnTypedResourceSupported", "TRUE"),
            assign("so4", "options9.AtomicInt64OnGroupSharedSupported", "TRUE"),
            assign("so5", "options11.AtomicInt64OnDescriptorHeapResourceSupported", "TRUE"),
        ],
    )
}

pub fn mesh_shading() -> RuleGroup {
    RuleGroup::new(
        "mesh-shading",
        vec![
            assign("ms0", "options7.MeshShaderTier", "D3D12_MESH_SHADER_TIER_1"),
            assign("ms1", "options9.MeshShaderPipelineStatsSupported", "TRUE"),
            assign(
                "ms2",
                "options9.MeshShaderSupportsFullRangeRenderTargetArrayIndex",
                "TRUE",
            ),
            assign(
                "ms3",
                "options9.DerivativesInMeshAndAmplificationShadersSupported",
                "TRUE",
            ),
            assign(
                "ms4",
                "options10.MeshShaderPerPrimitiveShadingRateSupported",
                "TRUE",
            ),
            assign("ms5", "options21.ExecuteIndirectTier", "D3D12_EXECUTE_INDIRECT_TIER_1_1"),
            assign("ms6", "options21.WorkGraphsTier", "D3D12_WORK_GRAPHS_TIER_1_0"),
            assign("ms7", "options12.EnhancedBarriersSupported", "TRUE"),
            assign("ms8", "options20.ComputeOnlyWriteWatchSupported", "TRUE"),
        ],
    )
}

pub fn ray_tracing() -> RuleGroup {
    RuleGroup::new(
        "ray-tracing",
        vec![
            assign("rt0", "options5.RaytracingTier", "D3D12_RAYTRACING_TIER_1_1"),
            assign("rt1", "options5.RenderPassesTier", "D3D12_RENDER_PASS_TIER_2"),
            assign(
                "rt2",
                "options6.VariableShadingRateTier",
                "D3D12_VARIABLE_SHADING_RATE_TIER_2",
            ),
            assign("rt3", "options6.ShadingRateImageTileSize", "8"),
            assign("rt4", "options6.BackgroundProcessingSupported", "TRUE"),
            assign("rt5", "options10.VariableRateShadingSumCombinerSupported", "TRUE"),
        ],
    )
}

pub fn sampler_feedback() -> RuleGroup {
    RuleGroup::new(
        "sampler-feedback",
        vec![
            assign("sf0", "options7.SamplerFeedbackTier", "D3D12_SAMPLER_FEEDBACK_TIER_1_0"),
            assign("sf1", "options2.DepthBoundsTestSupported", "TRUE"),
            assign("sf2", "options14.AdvancedTextureOpsSupported", "TRUE"),
            assign("sf3", "options14.WriteableMSAATexturesSupported", "TRUE"),
        ],
    )
}

pub fn texture_ops() -> RuleGroup {
    RuleGroup::new(
        "texture-ops",
        vec![
            assign("tx0", "options8.UnalignedBlockTexturesSupported", "TRUE"),
            assign("tx1", "options13.UnrestrictedBufferTextureCopyPitchSupported", "TRUE"),
            assign("tx2", "options13.TextureCopyBetweenDimensionsSupported", "TRUE"),
            assign("tx3", "options16.GPUUploadHeapSupported", "TRUE"),
        ],
    )
}

pub fn rendering_features() -> RuleGroup {
    RuleGroup::new(
        "rendering-features",
        vec![
            assign("rn0", "options13.UnrestrictedVertexElementAlignmentSupported", "TRUE"),
            assign("rn1", "options13.InvertedViewportHeightFlipsYSupported", "TRUE"),
            assign("rn2", "options13.InvertedViewportDepthFlipsZSupported", "TRUE"),
            assign("rn3", "options13.AlphaBlendFactorSupported", "TRUE"),
            assign("rn4", "options15.TriangleFanSupported", "TRUE"),
            assign("rn5", "options15.DynamicIndexBufferStripCutSupported", "TRUE"),
            assign("rn6", "options19.RasterizerDesc2Supported", "TRUE"),
            assign("rn7", "options19.NarrowQuadrilateralLinesSupported", "TRUE"),
        ],
    )
}

/// Hardware identity fields. Applied to capability files only.
pub fn identity_override() -> RuleGroup {
    RuleGroup::new(
        "identity-override",
        vec![
            assign("g0", "adapter_id.vendor_id", VENDOR_ID),
            assign("g1", "adapter_id.device_id", DEVICE_ID),
            Rule::new("g2", r"(VendorId\s*=\s*)[^;]+;", format!("${{1}}{VENDOR_ID};")),
            Rule::new("g3", r"(DeviceId\s*=\s*)[^;]+;", format!("${{1}}{DEVICE_ID};")),
            Rule::new(
                "g4",
                r"(SharedSystemMemory\s*=\s*)[^;]+;",
                "${1}16384 * 1024 * 1024;",
            ),
        ],
    )
}

/// Build-configuration macros. Applied to every discovered source file.
pub fn build_flags() -> RuleGroup {
    RuleGroup::new(
        "build-flags",
        vec![
            Rule::define("cp0", "VKD3D_ENABLE_AVX", 1),
            Rule::define("cp1", "VKD3D_ENABLE_AVX2", 1),
            Rule::define("cp2", "VKD3D_ENABLE_FMA", 1),
            Rule::define("cp3", "VKD3D_ENABLE_SSE4_2", 1),
            Rule::define("pf0", "VKD3D_DEBUG", 0),
            Rule::define("pf1", "VKD3D_PROFILING", 0),
            Rule::define("pf2", "VKD3D_SHADER_DEBUG", 0),
        ],
    )
}

/// Every built-in group, in the order a `full` run with identity override
/// would use them.
pub fn all_groups() -> Vec<RuleGroup> {
    vec![
        shader_model(),
        wave_ops(),
        resource_binding(),
        shader_ops(),
        mesh_shading(),
        ray_tracing(),
        sampler_feedback(),
        texture_ops(),
        rendering_features(),
        identity_override(),
        build_flags(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::ensure_unique_ids;
    use regex::Regex;

    #[test]
    fn test_catalog_ids_are_unique() {
        let groups = all_groups();
        assert!(ensure_unique_ids(&groups).is_ok());
    }

    #[test]
    fn test_catalog_patterns_compile() {
        for group in all_groups() {
            for rule in group.rules() {
                assert!(
                    Regex::new(rule.pattern()).is_ok(),
                    "{} in {} does not compile",
                    rule.id(),
                    group.category()
                );
            }
        }
    }

    #[test]
    fn test_no_group_is_empty() {
        assert!(all_groups().iter().all(|g| !g.is_empty()));
    }

    #[test]
    fn test_identity_raw_rule_keeps_left_side() {
        let group = identity_override();
        let rule = &group.rules()[2];
        let re = Regex::new(rule.pattern()).unwrap();
        let out = re.replace_all("desc->VendorId = 0x10de;", rule.replacement());
        assert_eq!(out, "desc->VendorId = 0x1002;");
    }
}
