//! End-to-end pipeline properties: optimizer correctness, fused-prefix
//! rendering equivalence, and dynamic property behavior.

use chromat_core::ops::cdl::{CdlOpData, CdlStyle, create_cdl_op};
use chromat_core::ops::exposure_contrast::{
    ExposureContrastOpData, create_exposure_contrast_op,
};
use chromat_core::ops::gamma::{GammaOpData, GammaStyle, create_gamma_op};
use chromat_core::ops::log::{LogOpData, create_log_op};
use chromat_core::ops::lut1d::{Lut1dOpData, create_lut1d_op};
use chromat_core::ops::matrix::{MatrixOpData, create_matrix_op};
use chromat_core::ops::range::{RangeOpData, create_range_op};
use chromat_core::ops::{Op, OpKind, OpParams};
use chromat_core::{
    BitDepth, DynamicPropertyType, FinalizationFlags, OptimizationFlags, Pipeline,
    TransformDirection,
};

fn finalize(ops: Vec<Op>) -> Pipeline {
    Pipeline::finalize(
        ops,
        BitDepth::F32,
        OptimizationFlags::default(),
        FinalizationFlags::Default,
    )
    .expect("pipeline finalizes")
}

fn representative_pixels() -> Vec<f32> {
    vec![
        51000.0 / 65535.0, 54000.0 / 65535.0, 58000.0 / 65535.0, 10000.0 / 65535.0,
        2920.0 / 65535.0, 944.0 / 65535.0, 57775.0 / 65535.0, 65500.0 / 65535.0,
        32000.0 / 65535.0, 25000.0 / 65535.0, 0.0, 0.0,
        1.0, 10.0 / 65535.0, 15000.0 / 65535.0, 1.0,
    ]
}

#[test]
fn test_inverse_pair_optimizes_to_empty_pipeline() {
    let mut ops = Vec::new();
    create_gamma_op(
        &mut ops,
        GammaOpData::basic_rgb(GammaStyle::BasicFwd, 2.2),
        TransformDirection::Forward,
    )
    .unwrap();
    create_gamma_op(
        &mut ops,
        GammaOpData::basic_rgb(GammaStyle::BasicFwd, 2.2),
        TransformDirection::Inverse,
    )
    .unwrap();

    let pipeline = finalize(ops);
    assert!(pipeline.is_noop().unwrap());

    let mut img = representative_pixels();
    let orig = img.clone();
    pipeline.apply(&mut img).unwrap();
    for (a, b) in img.iter().zip(&orig) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn test_log_inverse_pair_cancels() {
    let mut ops = Vec::new();
    let log = LogOpData::new(10.0, [0.18; 3], [1.0; 3], [2.0; 3], [0.1; 3]);
    create_log_op(&mut ops, log.clone(), TransformDirection::Forward).unwrap();
    create_log_op(&mut ops, log, TransformDirection::Inverse).unwrap();
    let pipeline = finalize(ops);
    assert!(pipeline.is_noop().unwrap());
}

#[test]
fn test_optimizer_is_idempotent_at_pipeline_level() {
    let mut ops = Vec::new();
    create_matrix_op(
        &mut ops,
        MatrixOpData::diagonal(&[1.5, 1.5, 1.5, 1.0]),
        TransformDirection::Forward,
    )
    .unwrap();
    create_gamma_op(
        &mut ops,
        GammaOpData::basic_rgb(GammaStyle::BasicFwd, 2.4),
        TransformDirection::Forward,
    )
    .unwrap();

    let first = finalize(ops).finalized_ops().unwrap();
    let second = finalize(first.clone()).finalized_ops().unwrap();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a, b);
    }
}

#[test]
fn test_five_identical_matrices_combine_to_one() {
    let m = MatrixOpData::diagonal(&[2.0, 2.0, 2.0, 1.0]);
    let mut ops = Vec::new();
    for _ in 0..5 {
        create_matrix_op(&mut ops, m.clone(), TransformDirection::Forward).unwrap();
    }
    let finalized = finalize(ops).finalized_ops().unwrap();
    assert_eq!(finalized.len(), 1);

    let expected = m.compose(&m).compose(&m).compose(&m).compose(&m);
    match finalized[0].params() {
        OpParams::Matrix(actual) => assert_eq!(actual, &expected),
        other => panic!("expected a matrix, got {other:?}"),
    }
}

#[test]
fn test_fusion_skips_single_forward_lut() {
    let mut ops = Vec::new();
    create_lut1d_op(
        &mut ops,
        Lut1dOpData::new(vec![[0.0; 3], [0.4; 3], [1.0; 3]]),
        TransformDirection::Forward,
    )
    .unwrap();
    let pipeline = Pipeline::finalize(
        ops,
        BitDepth::U8,
        OptimizationFlags::default(),
        FinalizationFlags::Default,
    )
    .unwrap();
    let finalized = pipeline.finalized_ops().unwrap();
    assert_eq!(finalized.len(), 1);
    match finalized[0].params() {
        OpParams::Lut1d(lut) => assert_eq!(lut.len(), 3, "original table kept, not resampled"),
        other => panic!("expected the original lut, got {other:?}"),
    }
}

#[test]
fn test_fusion_skips_inexpensive_only_prefix() {
    let mut ops = Vec::new();
    create_matrix_op(
        &mut ops,
        MatrixOpData::diagonal(&[2.0, 1.0, 1.0, 1.0]),
        TransformDirection::Forward,
    )
    .unwrap();
    create_range_op(
        &mut ops,
        RangeOpData::new(Some(0.0), Some(1.0), Some(-1.0 / 65535.0), Some(65540.0 / 65535.0)),
        TransformDirection::Forward,
    )
    .unwrap();
    let pipeline = Pipeline::finalize(
        ops,
        BitDepth::U8,
        OptimizationFlags::default(),
        FinalizationFlags::Default,
    )
    .unwrap();
    let finalized = pipeline.finalized_ops().unwrap();
    assert_eq!(finalized.len(), 2);
    assert_eq!(finalized[0].kind(), OpKind::Matrix);
    assert_eq!(finalized[1].kind(), OpKind::Range);
}

#[test]
fn test_uint8_fused_prefix_renders_close_to_unfused() {
    let mut ops = Vec::new();
    create_matrix_op(
        &mut ops,
        MatrixOpData::diagonal(&[1.2, 1.1, 0.9, 1.0]).with_offsets([0.01, 0.0, -0.01, 0.0]),
        TransformDirection::Forward,
    )
    .unwrap();
    create_range_op(
        &mut ops,
        RangeOpData::new(Some(0.0), Some(1.0), Some(0.0), Some(1.0)),
        TransformDirection::Forward,
    )
    .unwrap();
    create_cdl_op(
        &mut ops,
        CdlOpData::new(
            CdlStyle::V1_2Fwd,
            [1.35, 1.1, 0.71],
            [0.05, -0.23, 0.11],
            [1.27, 0.81, 0.2],
            // Unit saturation keeps the CDL separable so it joins the prefix.
            1.0,
        ),
        TransformDirection::Forward,
    )
    .unwrap();

    let unfused = Pipeline::finalize(
        ops.clone(),
        BitDepth::U8,
        OptimizationFlags::none(),
        FinalizationFlags::Default,
    )
    .unwrap();
    let fused = Pipeline::finalize(
        ops,
        BitDepth::U8,
        OptimizationFlags::default(),
        FinalizationFlags::Default,
    )
    .unwrap();

    let finalized = fused.finalized_ops().unwrap();
    assert_eq!(finalized.len(), 1);
    match finalized[0].params() {
        OpParams::Lut1d(lut) => assert_eq!(lut.len(), 256),
        other => panic!("expected a fused lut, got {other:?}"),
    }

    // U8-representable pixels, where the fused domain is exact.
    let mut img_a: Vec<f32> = (0..64)
        .flat_map(|i| {
            let v = i as f32 * 4.0 / 255.0;
            [v, (255.0 - i as f32 * 4.0) / 255.0, 0.5, 1.0]
        })
        .collect();
    let mut img_b = img_a.clone();

    unfused.apply(&mut img_a).unwrap();
    fused.apply(&mut img_b).unwrap();
    for (a, b) in img_a.iter().zip(&img_b) {
        assert!((a - b).abs() < 2e-5, "{a} vs {b}");
    }
}

#[test]
fn test_unified_exposure_changes_both_ops_with_one_set() {
    let mut ops = Vec::new();
    for _ in 0..2 {
        let ec = ExposureContrastOpData::new(0.0, 1.0, 1.0, 0.18);
        ec.exposure().make_dynamic();
        create_exposure_contrast_op(&mut ops, ec, TransformDirection::Forward).unwrap();
    }
    let pipeline = finalize(ops);

    let mut px = [0.25_f32, 0.25, 0.25, 1.0];
    pipeline.apply(&mut px).unwrap();
    assert!((px[0] - 0.25).abs() < 1e-6);

    // One set on the shared property must affect both ops: 2 ops at
    // +1 stop each quadruples the value.
    pipeline
        .dynamic_property(DynamicPropertyType::Exposure)
        .unwrap()
        .set(1.0);
    let mut px = [0.25_f32, 0.25, 0.25, 1.0];
    pipeline.apply(&mut px).unwrap();
    assert!((px[0] - 1.0).abs() < 1e-5, "got {}", px[0]);
}

#[test]
fn test_cache_id_stable_for_equal_pipelines_and_distinct_otherwise() {
    let build = |gamma: f64| {
        let mut ops = Vec::new();
        create_gamma_op(
            &mut ops,
            GammaOpData::basic_rgb(GammaStyle::BasicFwd, gamma),
            TransformDirection::Forward,
        )
        .unwrap();
        finalize(ops)
    };
    assert_eq!(
        build(2.2).cache_id().unwrap(),
        build(2.2).cache_id().unwrap()
    );
    assert_ne!(
        build(2.2).cache_id().unwrap(),
        build(2.4).cache_id().unwrap()
    );
}

#[test]
fn test_nan_and_infinity_policy_through_clamping_pipeline() {
    let mut ops = Vec::new();
    create_range_op(
        &mut ops,
        RangeOpData::new(Some(0.0), Some(1.0), Some(0.0), Some(1.0)),
        TransformDirection::Forward,
    )
    .unwrap();
    let pipeline = finalize(ops);

    let mut px = [f32::NAN, f32::INFINITY, f32::NEG_INFINITY, f32::NAN];
    pipeline.apply(&mut px).unwrap();
    assert_eq!(px[0], 0.0, "NaN resolves to the low bound");
    assert_eq!(px[1], 1.0, "+inf clamps to the high bound");
    assert_eq!(px[2], 0.0, "-inf clamps to the low bound");
    assert!(px[3].is_nan(), "alpha is untouched by a range op");
}
