//! Pipeline optimizer — rewrites an op list into an equivalent cheaper one.
//!
//! A bounded fixpoint loop applies three local rules per pass: no-op
//! removal, adjacent inverse-pair removal, and adjacent combination. The
//! two scanning rules backstep after each rewrite so a deletion exposes
//! the newly adjacent pair immediately; nested `A, B, B', A'` chains
//! collapse from the inside out in a single pass.
//!
//! After the loop, and only when enabled and meaningful for the input
//! encoding, the separable-prefix fusion replaces a leading run of
//! channel-independent ops with a single 1D lookup. That rewrite is
//! deliberately lossy for extended-range inputs (internal clamps get
//! baked into table entries) and callers needing bit-exactness leave it
//! disabled.

use crate::depth::BitDepth;
use crate::error::Result;
use crate::ops::{Op, OpData, OpKind, OpParams, TransformDirection};
use crate::ops::lut1d::Lut1dOpData;
use crate::pipeline::OptimizationFlags;

/// Bound on fixpoint passes. Pipelines that legitimately need more are
/// rare; the bound exists so two rules that undo each other cannot spin.
pub const MAX_OPTIMIZATION_PASSES: usize = 8;

/// Delete every op whose `is_noop` holds (pure identity, no clamping).
pub(crate) fn remove_noops(ops: &mut Vec<Op>) -> usize {
    let before = ops.len();
    ops.retain(|op| !op.is_noop());
    before - ops.len()
}

/// Delete adjacent `A, A'` pairs, backstepping after each deletion.
///
/// The common shape is a deep nesting `…, A, B, B', A', …`: removing
/// `B, B'` leaves the cursor on `A`, and stepping it back one (clamped at
/// zero) re-examines the now-adjacent `A, A'`.
pub(crate) fn remove_inverse_ops(ops: &mut Vec<Op>) -> usize {
    let mut count = 0;
    let mut first = 0;
    while ops.len() >= 2 && first < ops.len() - 1 {
        let second = first + 1;
        if ops[first].is_same_type(&ops[second]) && ops[first].is_inverse(&ops[second]) {
            ops.drain(first..=second);
            count += 1;
            first = first.saturating_sub(1);
        } else {
            first += 1;
        }
    }
    count
}

/// Combine adjacent pairs where a closed form exists, splicing in the
/// replacement (possibly empty) and backstepping as above.
pub(crate) fn combine_ops(ops: &mut Vec<Op>) -> Result<usize> {
    let mut count = 0;
    let mut first = 0;
    while ops.len() >= 2 && first < ops.len() - 1 {
        let second = first + 1;
        if ops[first].can_combine_with(&ops[second]) {
            let replacement = ops[first].combine_with(&ops[second])?;
            ops.splice(first..=second, replacement);
            count += 1;
            first = first.saturating_sub(1);
        } else {
            first += 1;
        }
    }
    Ok(count)
}

/// Run the pass loop, then prefix fusion when enabled.
pub fn optimize(ops: &mut Vec<Op>, input_depth: BitDepth, flags: &OptimizationFlags) -> Result<()> {
    if ops.is_empty() {
        return Ok(());
    }

    let original_len = ops.len();
    let mut total_noops = 0;
    let mut total_inverse = 0;
    let mut total_combines = 0;
    let mut passes = 0;

    loop {
        let noops = remove_noops(ops);
        let inverse = remove_inverse_ops(ops);
        let combines = combine_ops(ops)?;

        if noops == 0 && inverse == 0 && combines == 0 {
            break;
        }
        total_noops += noops;
        total_inverse += inverse;
        total_combines += combines;

        passes += 1;
        if passes >= MAX_OPTIMIZATION_PASSES {
            tracing::warn!(
                passes,
                "optimization pass bound reached; the transform is either very \
                 complex or rewrite rules are undoing each other"
            );
            break;
        }
    }

    if !ops.is_empty() && flags.separable_prefix_enabled() {
        optimize_separable_prefix(ops, input_depth, flags)?;
    }

    tracing::debug!(
        original = original_len,
        optimized = ops.len(),
        passes,
        noops = total_noops,
        inverse_pairs = total_inverse,
        combines = total_combines,
        "op list optimized"
    );

    Ok(())
}

/// Length of the longest leading run of channel-independent, non-dynamic
/// ops worth fusing. Zero means the rewrite should not fire.
pub(crate) fn find_separable_prefix(ops: &[Op], flags: &OptimizationFlags) -> usize {
    let mut prefix_len = 0;
    for op in ops {
        if op.has_channel_crosstalk() || op.is_dynamic() {
            break;
        }
        prefix_len += 1;
    }

    // A single forward 1D LUT is already the shape fusion would produce.
    // (An inverse LUT still benefits: fusing replaces the per-pixel
    // search with a forward table.)
    if prefix_len == 1
        && ops[0].kind() == OpKind::Lut1d
        && ops[0].direction() == TransformDirection::Forward
    {
        return 0;
    }

    // If every op in the run is inexpensive, a lookup is not a net win.
    // This is a heuristic policy, not a correctness rule; the kinds it
    // treats as inexpensive are configurable on the flags.
    let expensive = ops[..prefix_len]
        .iter()
        .filter(|op| !flags.is_inexpensive(op.kind()))
        .count();
    if expensive == 0 {
        return 0;
    }

    prefix_len
}

/// Replace the separable prefix with one forward 1D LUT sampled for the
/// input bit depth (half domain for F16).
fn optimize_separable_prefix(
    ops: &mut Vec<Op>,
    input_depth: BitDepth,
    flags: &OptimizationFlags,
) -> Result<()> {
    // Float pipelines have no finite lookup domain worth building.
    if input_depth == BitDepth::F32 {
        return Ok(());
    }

    let prefix_len = find_separable_prefix(ops, flags);
    if prefix_len == 0 {
        return Ok(());
    }

    let domain = Lut1dOpData::make_lookup_domain(input_depth)?;
    let baked = domain.compose_through(&ops[..prefix_len])?;

    tracing::debug!(
        prefix_len,
        entries = baked.len(),
        %input_depth,
        "separable prefix fused into a 1D LUT; internal clamps are now \
         baked into table entries"
    );

    ops.splice(
        ..prefix_len,
        [Op::forward(OpData::new(OpParams::Lut1d(baked)))],
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::gamma::{GammaOpData, GammaStyle, create_gamma_op};
    use crate::ops::log::{LogOpData, create_log_op};
    use crate::ops::matrix::{MatrixOpData, create_matrix_op};
    use crate::ops::range::{RangeOpData, create_range_op};
    use crate::ops::{OpParams, TransformDirection};

    fn gamma(ops: &mut Vec<Op>, g: f64, dir: TransformDirection) {
        create_gamma_op(ops, GammaOpData::basic_rgb(GammaStyle::BasicFwd, g), dir).unwrap();
    }

    fn log(ops: &mut Vec<Op>, dir: TransformDirection) {
        let data = LogOpData::new(10.0, [0.18; 3], [1.0; 3], [2.0; 3], [0.1; 3]);
        create_log_op(ops, data, dir).unwrap();
    }

    #[test]
    fn test_remove_nested_inverse_pairs() {
        let mut ops = Vec::new();
        gamma(&mut ops, 1.2, TransformDirection::Forward);
        log(&mut ops, TransformDirection::Forward);
        log(&mut ops, TransformDirection::Inverse);
        gamma(&mut ops, 1.2, TransformDirection::Inverse);
        assert_eq!(ops.len(), 4);
        remove_inverse_ops(&mut ops);
        assert!(ops.is_empty());
    }

    #[test]
    fn test_remove_inverse_pairs_leaves_survivor() {
        let mut ops = Vec::new();
        gamma(&mut ops, 1.2, TransformDirection::Forward);
        gamma(&mut ops, 1.2, TransformDirection::Inverse);
        log(&mut ops, TransformDirection::Inverse);
        log(&mut ops, TransformDirection::Forward);
        gamma(&mut ops, 1.2, TransformDirection::Forward);
        assert_eq!(ops.len(), 5);
        remove_inverse_ops(&mut ops);
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn test_combine_scale_chain_to_single_op() {
        let mut ops = Vec::new();
        for diag in [2.0, 0.6, 0.7] {
            create_matrix_op(
                &mut ops,
                MatrixOpData::diagonal(&[diag, diag, diag, 1.0]),
                TransformDirection::Forward,
            )
            .unwrap();
        }
        assert_eq!(combine_ops(&mut ops).unwrap(), 2);
        assert_eq!(ops.len(), 1);
        match ops[0].params() {
            OpParams::Matrix(m) => {
                assert!((m.value(0, 0) - 2.0 * 0.6 * 0.7).abs() < 1e-9);
            }
            other => panic!("expected matrix, got {other:?}"),
        }
    }

    #[test]
    fn test_combine_collapsing_chain_to_empty() {
        let mut ops = Vec::new();
        gamma(&mut ops, 1.2, TransformDirection::Forward);
        create_matrix_op(
            &mut ops,
            MatrixOpData::diagonal(&[2.0, 2.0, 2.0, 1.0]),
            TransformDirection::Forward,
        )
        .unwrap();
        create_matrix_op(
            &mut ops,
            MatrixOpData::diagonal(&[0.5, 0.5, 0.5, 1.0]),
            TransformDirection::Forward,
        )
        .unwrap();
        gamma(&mut ops, 1.2, TransformDirection::Inverse);
        assert_eq!(ops.len(), 4);
        combine_ops(&mut ops).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn test_prefix_skips_single_forward_lut() {
        let mut ops = Vec::new();
        crate::ops::lut1d::create_lut1d_op(
            &mut ops,
            Lut1dOpData::new(vec![[0.0; 3], [0.5; 3], [1.0; 3]]),
            TransformDirection::Forward,
        )
        .unwrap();
        assert_eq!(find_separable_prefix(&ops, &OptimizationFlags::default()), 0);
    }

    #[test]
    fn test_prefix_skips_all_inexpensive_run() {
        let mut ops = Vec::new();
        create_matrix_op(
            &mut ops,
            MatrixOpData::diagonal(&[2.0, 1.0, 1.0, 1.0]),
            TransformDirection::Forward,
        )
        .unwrap();
        create_range_op(
            &mut ops,
            RangeOpData::new(Some(0.0), Some(1.0), Some(0.0), Some(1.5)),
            TransformDirection::Forward,
        )
        .unwrap();
        assert_eq!(find_separable_prefix(&ops, &OptimizationFlags::default()), 0);
    }

    #[test]
    fn test_prefix_stops_at_crosstalk() {
        let mut ops = Vec::new();
        gamma(&mut ops, 2.2, TransformDirection::Forward);
        let mut saturating = MatrixOpData::identity();
        saturating.set_value(0, 1, 0.5);
        create_matrix_op(&mut ops, saturating, TransformDirection::Forward).unwrap();
        assert_eq!(find_separable_prefix(&ops, &OptimizationFlags::default()), 1);
    }

    #[test]
    fn test_optimize_is_idempotent() {
        let mut ops = Vec::new();
        gamma(&mut ops, 2.2, TransformDirection::Forward);
        gamma(&mut ops, 2.2, TransformDirection::Inverse);
        log(&mut ops, TransformDirection::Forward);
        let flags = OptimizationFlags::default();
        optimize(&mut ops, BitDepth::F32, &flags).unwrap();
        let first = ops.clone();
        optimize(&mut ops, BitDepth::F32, &flags).unwrap();
        assert_eq!(ops.len(), first.len());
        assert!(ops.iter().zip(&first).all(|(a, b)| a == b));
    }

    #[test]
    fn test_gamma_prefix_fuses_for_integer_depth() {
        let mut ops = Vec::new();
        gamma(&mut ops, 2.6, TransformDirection::Forward);
        optimize(&mut ops, BitDepth::U16, &OptimizationFlags::default()).unwrap();
        assert_eq!(ops.len(), 1);
        match ops[0].params() {
            OpParams::Lut1d(lut) => assert_eq!(lut.len(), 65536),
            other => panic!("expected lut1d, got {other:?}"),
        }
    }

    #[test]
    fn test_gamma_prefix_not_fused_for_float_depth() {
        let mut ops = Vec::new();
        gamma(&mut ops, 2.6, TransformDirection::Forward);
        optimize(&mut ops, BitDepth::F32, &OptimizationFlags::default()).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind(), OpKind::Gamma);
    }

    #[test]
    fn test_fusion_respects_flag() {
        let mut ops = Vec::new();
        gamma(&mut ops, 2.6, TransformDirection::Forward);
        optimize(&mut ops, BitDepth::U16, &OptimizationFlags::none()).unwrap();
        assert_eq!(ops[0].kind(), OpKind::Gamma);
    }
}
