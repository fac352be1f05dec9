//! Shader extraction reference tests: generated program shape, and
//! agreement between the legacy baked texture and the CPU apply path.

use chromat_core::ops::cdl::{CdlOpData, CdlStyle, create_cdl_op};
use chromat_core::ops::gamma::{GammaOpData, GammaStyle, create_gamma_op};
use chromat_core::ops::lut1d::{Lut1dOpData, create_lut1d_op};
use chromat_core::ops::lut3d::Lut3dOpData;
use chromat_core::ops::matrix::{MatrixOpData, create_matrix_op};
use chromat_core::ops::Op;
use chromat_core::{
    BitDepth, FinalizationFlags, OptimizationFlags, Pipeline, TransformDirection,
};
use chromat_gpu::{GpuLanguage, GpuShaderDesc, ShaderMode, extract_shader_info};

fn finalize(ops: Vec<Op>) -> Pipeline {
    Pipeline::finalize(
        ops,
        BitDepth::F32,
        OptimizationFlags::default(),
        FinalizationFlags::Default,
    )
    .unwrap()
}

fn graded_ops() -> Vec<Op> {
    let mut ops = Vec::new();
    create_matrix_op(
        &mut ops,
        MatrixOpData::diagonal(&[1.2, 1.0, 0.8, 1.0]),
        TransformDirection::Forward,
    )
    .unwrap();
    create_lut1d_op(
        &mut ops,
        Lut1dOpData::new(vec![[0.0; 3], [0.1; 3], [0.45; 3], [1.0; 3]]),
        TransformDirection::Forward,
    )
    .unwrap();
    create_cdl_op(
        &mut ops,
        CdlOpData::new(
            CdlStyle::NoClampFwd,
            [1.1, 1.0, 0.9],
            [0.02, 0.0, -0.02],
            [1.1, 1.0, 0.9],
            0.9,
        ),
        TransformDirection::Forward,
    )
    .unwrap();
    ops
}

#[test]
fn test_modern_shader_has_header_body_footer() {
    let pipeline = finalize(graded_ops());
    let mut desc = GpuShaderDesc::new(GpuLanguage::Glsl, "apply_grade", ShaderMode::Modern);
    extract_shader_info(&pipeline, &mut desc).unwrap();

    let text = desc.shader_text().unwrap();
    let header = text.find("vec4 apply_grade(in vec4 inPixel)").unwrap();
    let copy = text.find("vec4 outColor = inPixel;").unwrap();
    let matrix = text.find("// matrix").unwrap();
    let footer = text.rfind("return outColor;").unwrap();
    assert!(header < copy && copy < matrix && matrix < footer);
}

#[test]
fn test_modern_wgsl_shader_compiles_shape() {
    let pipeline = finalize(graded_ops());
    let mut desc = GpuShaderDesc::new(GpuLanguage::Wgsl, "apply_grade", ShaderMode::Modern);
    extract_shader_info(&pipeline, &mut desc).unwrap();
    let text = desc.shader_text().unwrap();
    assert!(text.contains("fn apply_grade(inPixel: vec4<f32>) -> vec4<f32>"));
    // WGSL has no swizzle assignment; rgb updates rebuild the vector.
    assert!(!text.contains("outColor.rgb ="));
}

#[test]
fn test_legacy_bakes_middle_segment_into_lattice() {
    let edge = 17_u32;
    let pipeline = finalize(graded_ops());
    let mut desc = GpuShaderDesc::new(
        GpuLanguage::Glsl,
        "apply_grade",
        ShaderMode::Legacy { edge_len: edge },
    );
    extract_shader_info(&pipeline, &mut desc).unwrap();

    assert_eq!(desc.textures_3d().len(), 1);
    let texture = &desc.textures_3d()[0];
    assert_eq!(texture.edge_len, edge);
    assert_eq!(texture.values.len(), (edge as usize).pow(3));

    // The middle segment here is exactly the 1D LUT op. Applying it to
    // every lattice point must reproduce the baked texture.
    let ops = pipeline.finalized_ops().unwrap();
    let middle = &ops[1];
    let lattice = Lut3dOpData::identity(edge);
    for (i, rgb) in lattice.values().iter().enumerate() {
        let mut px = [rgb[0], rgb[1], rgb[2], 1.0];
        middle.apply(&mut px).unwrap();
        for c in 0..3 {
            assert!(
                (texture.values[i][c] - px[c]).abs() < 1e-6,
                "lattice point {i} channel {c}: {} vs {}",
                texture.values[i][c],
                px[c]
            );
        }
    }
}

#[test]
fn test_legacy_without_lookup_ops_needs_no_texture() {
    let mut ops = Vec::new();
    create_gamma_op(
        &mut ops,
        GammaOpData::basic_rgb(GammaStyle::BasicFwd, 2.2),
        TransformDirection::Forward,
    )
    .unwrap();
    let pipeline = finalize(ops);
    let mut desc = GpuShaderDesc::new(
        GpuLanguage::Glsl,
        "apply_gamma",
        ShaderMode::Legacy { edge_len: 33 },
    );
    extract_shader_info(&pipeline, &mut desc).unwrap();
    assert!(desc.textures_3d().is_empty());
    assert!(desc.shader_text().unwrap().contains("// gamma"));
}
