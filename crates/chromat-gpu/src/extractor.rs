//! Shader extraction — modern per-op walk and the legacy baked path.
//!
//! Legacy targets cannot express lookup ops in the shader language, so
//! the op list is partitioned around them *before* optimization-proper:
//! hardware-expressibility is a property of the target, not something
//! the general optimizer knows about. The non-expressible middle segment
//! is rendered through the CPU apply path over an identity lattice and
//! replaced by a single 3D LUT, then the spliced list is re-optimized
//! and emitted op by op like the modern path.

use chromat_core::ops::lut3d::Lut3dOpData;
use chromat_core::ops::{Op, OpData, OpKind, OpParams};
use chromat_core::{BitDepth, Error, OptimizationFlags, Pipeline, optimizer};

use crate::descriptor::{GpuShaderDesc, ShaderMode};
use crate::emit::emit_op;
use crate::{Result, ShaderError};

/// Populate the descriptor with the shader program for a finalized
/// pipeline.
pub fn extract_shader_info(pipeline: &Pipeline, desc: &mut GpuShaderDesc) -> Result<()> {
    let ops = pipeline.finalized_ops().map_err(ShaderError::Core)?;

    let ops = match desc.mode() {
        ShaderMode::Modern => ops,
        ShaderMode::Legacy { edge_len } => legacy_reduce(ops, edge_len)?,
    };

    for op in &ops {
        emit_op(desc, op)?;
    }
    desc.finalize();

    tracing::debug!(
        ops = ops.len(),
        uniforms = desc.uniforms().len(),
        textures_3d = desc.textures_3d().len(),
        "gpu shader extracted"
    );
    Ok(())
}

/// Whether a legacy fixed-function target can evaluate the op
/// analytically in the shader. Lookup ops need textures and must be
/// baked instead.
fn supports_legacy_shader(op: &Op) -> bool {
    !matches!(op.kind(), OpKind::Lut1d | OpKind::Lut3d)
}

/// Split into a hardware prefix, a bakeable middle, and a hardware
/// postfix. The middle spans from the first non-expressible op to the
/// last one, inclusive.
fn partition_legacy_ops(ops: Vec<Op>) -> (Vec<Op>, Vec<Op>, Vec<Op>) {
    let first = ops.iter().position(|op| !supports_legacy_shader(op));
    let Some(first) = first else {
        return (ops, Vec::new(), Vec::new());
    };
    let last = ops
        .iter()
        .rposition(|op| !supports_legacy_shader(op))
        .expect("a non-expressible op exists");

    let mut ops = ops;
    let postfix = ops.split_off(last + 1);
    let middle = ops.split_off(first);
    (ops, middle, postfix)
}

/// Bake a pipeline segment into a 3D LUT by rendering an identity
/// lattice through the CPU renderers and keeping the RGB channels.
fn bake_segment(ops: &[Op], edge_len: u32) -> Result<Lut3dOpData> {
    let lattice = Lut3dOpData::identity(edge_len);
    let mut buffer: Vec<f32> = Vec::with_capacity(lattice.values().len() * 4);
    for rgb in lattice.values() {
        buffer.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 1.0]);
    }

    for op in ops {
        // A well-formed pipeline always supports CPU apply here; failure
        // is a fatal integration bug, not a recoverable condition.
        op.apply(&mut buffer).map_err(|err| {
            ShaderError::Core(Error::Internal(format!(
                "legacy baking: op {} has no CPU apply path: {err}",
                op.kind()
            )))
        })?;
    }

    let values = buffer
        .chunks_exact(4)
        .map(|px| [px[0], px[1], px[2]])
        .collect();
    Ok(Lut3dOpData::new(edge_len, values))
}

/// Reduce an op list to {hardware prefix, one 3D LUT, hardware postfix},
/// re-optimized for emission.
fn legacy_reduce(ops: Vec<Op>, edge_len: u32) -> Result<Vec<Op>> {
    let (prefix, middle, postfix) = partition_legacy_ops(ops);
    if middle.is_empty() {
        return Ok(prefix);
    }

    tracing::debug!(
        prefix = prefix.len(),
        baked = middle.len(),
        postfix = postfix.len(),
        edge_len,
        "partitioned op list for legacy target"
    );

    let lut = bake_segment(&middle, edge_len)?;

    let mut reduced = prefix;
    reduced.push(Op::forward(OpData::new(OpParams::Lut3d(lut))));
    reduced.extend(postfix);

    optimizer::optimize(&mut reduced, BitDepth::F32, &OptimizationFlags::none())
        .map_err(ShaderError::Core)?;
    for op in &mut reduced {
        op.finalize().map_err(ShaderError::Core)?;
    }
    Ok(reduced)
}
