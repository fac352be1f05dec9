//! Finalized pipelines — optimization, validation, cache identity, and
//! the CPU apply path.
//!
//! A [`Pipeline`] is built from raw ops, then finalized once: the op list
//! is optimized, every op revalidated, inverse 1D LUTs baked (default
//! style), dynamic properties unified, renderers selected, and the
//! aggregate cache ID computed. Finalization takes a pipeline-scoped
//! write lock; afterwards the op list is read-only, and `apply` may be
//! called concurrently from many threads as long as each call owns its
//! pixel buffer.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::cpu::{self, CpuRenderer};
use crate::depth::BitDepth;
use crate::dynamic::{DynamicPropertyHandle, DynamicPropertyType};
use crate::error::{Error, Result};
use crate::ops::{self, Op, OpData, OpKind, OpParams, TransformDirection};
use crate::optimizer;

/// Optimization controls.
///
/// The pass loop (no-op removal, inverse-pair removal, combination) is
/// always run; it only rewrites when semantics are preserved. The flag
/// here controls the lossy separable-prefix fusion, and the inexpensive
/// policy tunes its profitability heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationFlags {
    separable_prefix: bool,
    /// Op kinds considered too cheap for fusion to pay off on their own.
    inexpensive_kinds: Vec<OpKind>,
}

impl Default for OptimizationFlags {
    fn default() -> Self {
        Self {
            separable_prefix: true,
            inexpensive_kinds: vec![OpKind::Matrix, OpKind::Range],
        }
    }
}

impl OptimizationFlags {
    /// Semantics-preserving rewrites only.
    pub fn none() -> Self {
        Self {
            separable_prefix: false,
            ..Self::default()
        }
    }

    pub fn with_separable_prefix(mut self, enabled: bool) -> Self {
        self.separable_prefix = enabled;
        self
    }

    pub fn with_inexpensive_kinds(mut self, kinds: Vec<OpKind>) -> Self {
        self.inexpensive_kinds = kinds;
        self
    }

    pub fn separable_prefix_enabled(&self) -> bool {
        self.separable_prefix
    }

    pub fn is_inexpensive(&self, kind: OpKind) -> bool {
        self.inexpensive_kinds.contains(&kind)
    }

    fn cache_tag(&self) -> String {
        let kinds: Vec<String> = self.inexpensive_kinds.iter().map(|k| k.to_string()).collect();
        format!("sp={} cheap=[{}]", self.separable_prefix, kinds.join(","))
    }
}

/// Numerical finalization style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalizationFlags {
    /// Bake inverse 1D LUTs into forward lookup tables: faster rendering,
    /// inversion error bounded by the table resolution.
    Default,
    /// Keep exact per-pixel inversion of inverse 1D LUTs.
    Exact,
}

struct Finalized {
    ops: Vec<Op>,
    renderers: Vec<Box<dyn CpuRenderer>>,
    cache_id: String,
    has_crosstalk: bool,
    is_dynamic: bool,
}

/// An ordered op sequence and, once finalized, everything needed to
/// render it.
pub struct Pipeline {
    raw_ops: Vec<Op>,
    finalized: RwLock<Option<Finalized>>,
}

impl Pipeline {
    pub fn new(raw_ops: Vec<Op>) -> Self {
        Self {
            raw_ops,
            finalized: RwLock::new(None),
        }
    }

    /// Build and finalize in one step.
    pub fn finalize(
        raw_ops: Vec<Op>,
        input_depth: BitDepth,
        opt_flags: OptimizationFlags,
        fin_flags: FinalizationFlags,
    ) -> Result<Self> {
        let pipeline = Self::new(raw_ops);
        pipeline.refinalize(input_depth, opt_flags, fin_flags)?;
        Ok(pipeline)
    }

    /// (Re)finalize from the raw ops. Holds the pipeline lock for the
    /// duration, so concurrent re-finalizations serialize.
    pub fn refinalize(
        &self,
        input_depth: BitDepth,
        opt_flags: OptimizationFlags,
        fin_flags: FinalizationFlags,
    ) -> Result<()> {
        let mut guard = self.finalized.write();

        let mut ops = self.raw_ops.clone();
        optimizer::optimize(&mut ops, input_depth, &opt_flags)?;

        // Numerical finalization: default style trades exact 1D LUT
        // inversion for a baked forward table.
        if fin_flags == FinalizationFlags::Default {
            for op in &mut ops {
                if let (OpParams::Lut1d(lut), TransformDirection::Inverse) =
                    (op.params(), op.direction())
                    && !lut.is_half_domain()
                {
                    let baked = lut.invert_to_forward()?;
                    *op = Op::forward(OpData::new(OpParams::Lut1d(baked)));
                }
            }
        }

        for op in &mut ops {
            op.finalize()?;
        }

        ops::unify_dynamic_properties(&mut ops);

        let has_crosstalk = ops.iter().any(Op::has_channel_crosstalk);
        let is_dynamic = ops.iter().any(Op::is_dynamic);

        let mut cache_id = format!(
            "Pipeline: oflags [{}] fflags {:?} ops:",
            opt_flags.cache_tag(),
            fin_flags
        );
        for op in &ops {
            cache_id.push(' ');
            cache_id.push_str(op.cache_id().unwrap_or("?"));
        }

        let renderers = ops
            .iter()
            .map(cpu::renderer_for)
            .collect::<Result<Vec<_>>>()?;

        *guard = Some(Finalized {
            ops,
            renderers,
            cache_id,
            has_crosstalk,
            is_dynamic,
        });
        Ok(())
    }

    /// Apply the finalized pipeline to a packed RGBA f32 buffer in place.
    ///
    /// Concurrent calls are safe; each must own its buffer.
    pub fn apply(&self, rgba: &mut [f32]) -> Result<()> {
        if rgba.len() % 4 != 0 {
            return Err(Error::Internal(format!(
                "pixel buffer length {} is not a multiple of 4",
                rgba.len()
            )));
        }
        let guard = self.finalized.read();
        let finalized = guard
            .as_ref()
            .ok_or_else(|| Error::Internal("apply called before finalize".into()))?;
        for renderer in &finalized.renderers {
            renderer.apply(rgba);
        }
        Ok(())
    }

    /// Convenience wrapper over [`apply`](Self::apply) for RGBA quads.
    pub fn apply_pixels(&self, pixels: &mut [[f32; 4]]) -> Result<()> {
        self.apply(bytemuck::cast_slice_mut(pixels))
    }

    /// Stable content ID: equal IDs guarantee equal `apply` output for
    /// equal input.
    pub fn cache_id(&self) -> Result<String> {
        self.with_finalized(|f| f.cache_id.clone())
    }

    /// Snapshot of the finalized op list (data is shared, not copied).
    pub fn finalized_ops(&self) -> Result<Vec<Op>> {
        self.with_finalized(|f| f.ops.clone())
    }

    pub fn has_channel_crosstalk(&self) -> Result<bool> {
        self.with_finalized(|f| f.has_crosstalk)
    }

    pub fn is_dynamic(&self) -> Result<bool> {
        self.with_finalized(|f| f.is_dynamic)
    }

    pub fn is_noop(&self) -> Result<bool> {
        self.with_finalized(|f| f.ops.is_empty())
    }

    /// First op's handle for the given dynamic property.
    pub fn dynamic_property(
        &self,
        prop_type: DynamicPropertyType,
    ) -> Result<DynamicPropertyHandle> {
        self.with_finalized(|f| {
            f.ops
                .iter()
                .find_map(|op| op.dynamic_property(prop_type).cloned())
        })?
        .ok_or(Error::MissingDynamicProperty(prop_type))
    }

    fn with_finalized<T>(&self, read: impl FnOnce(&Finalized) -> T) -> Result<T> {
        let guard = self.finalized.read();
        guard
            .as_ref()
            .map(read)
            .ok_or_else(|| Error::Internal("pipeline is not finalized".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::exposure_contrast::{ExposureContrastOpData, create_exposure_contrast_op};
    use crate::ops::gamma::{GammaOpData, GammaStyle, create_gamma_op};
    use crate::ops::lut1d::{Lut1dOpData, create_lut1d_op};
    use crate::ops::matrix::{MatrixOpData, create_matrix_op};

    fn simple_ops() -> Vec<Op> {
        let mut ops = Vec::new();
        create_matrix_op(
            &mut ops,
            MatrixOpData::diagonal(&[2.0, 2.0, 2.0, 1.0]),
            TransformDirection::Forward,
        )
        .unwrap();
        create_gamma_op(
            &mut ops,
            GammaOpData::basic_rgb(GammaStyle::BasicFwd, 2.2),
            TransformDirection::Forward,
        )
        .unwrap();
        ops
    }

    #[test]
    fn test_apply_before_finalize_is_error() {
        let pipeline = Pipeline::new(simple_ops());
        let mut px = [0.5_f32; 4];
        assert!(matches!(pipeline.apply(&mut px), Err(Error::Internal(_))));
    }

    #[test]
    fn test_misaligned_buffer_rejected() {
        let pipeline = Pipeline::finalize(
            simple_ops(),
            BitDepth::F32,
            OptimizationFlags::default(),
            FinalizationFlags::Default,
        )
        .unwrap();
        let mut bad = [0.5_f32; 6];
        assert!(pipeline.apply(&mut bad).is_err());
    }

    #[test]
    fn test_cache_id_equal_for_equal_pipelines() {
        let a = Pipeline::finalize(
            simple_ops(),
            BitDepth::F32,
            OptimizationFlags::default(),
            FinalizationFlags::Default,
        )
        .unwrap();
        let b = Pipeline::finalize(
            simple_ops(),
            BitDepth::F32,
            OptimizationFlags::default(),
            FinalizationFlags::Default,
        )
        .unwrap();
        assert_eq!(a.cache_id().unwrap(), b.cache_id().unwrap());
    }

    #[test]
    fn test_cache_id_differs_with_flags() {
        let a = Pipeline::finalize(
            simple_ops(),
            BitDepth::F32,
            OptimizationFlags::default(),
            FinalizationFlags::Default,
        )
        .unwrap();
        let b = Pipeline::finalize(
            simple_ops(),
            BitDepth::F32,
            OptimizationFlags::none(),
            FinalizationFlags::Exact,
        )
        .unwrap();
        assert_ne!(a.cache_id().unwrap(), b.cache_id().unwrap());
    }

    #[test]
    fn test_default_finalization_bakes_inverse_lut() {
        let mut ops = Vec::new();
        create_lut1d_op(
            &mut ops,
            Lut1dOpData::new(vec![[0.0; 3], [0.25; 3], [1.0; 3]]),
            TransformDirection::Inverse,
        )
        .unwrap();
        let pipeline = Pipeline::finalize(
            ops,
            BitDepth::F32,
            OptimizationFlags::default(),
            FinalizationFlags::Default,
        )
        .unwrap();
        let finalized = pipeline.finalized_ops().unwrap();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].direction(), TransformDirection::Forward);
    }

    #[test]
    fn test_crosstalk_aggregates_across_ops() {
        let mut ops = simple_ops();
        assert!(
            !Pipeline::finalize(
                ops.clone(),
                BitDepth::F32,
                OptimizationFlags::default(),
                FinalizationFlags::Default,
            )
            .unwrap()
            .has_channel_crosstalk()
            .unwrap()
        );
        let mut saturating = MatrixOpData::identity();
        saturating.set_value(0, 1, 0.3);
        create_matrix_op(&mut ops, saturating, TransformDirection::Forward).unwrap();
        assert!(
            Pipeline::finalize(
                ops,
                BitDepth::F32,
                OptimizationFlags::default(),
                FinalizationFlags::Default,
            )
            .unwrap()
            .has_channel_crosstalk()
            .unwrap()
        );
    }

    #[test]
    fn test_missing_dynamic_property_is_error() {
        let pipeline = Pipeline::finalize(
            simple_ops(),
            BitDepth::F32,
            OptimizationFlags::default(),
            FinalizationFlags::Default,
        )
        .unwrap();
        assert!(matches!(
            pipeline.dynamic_property(DynamicPropertyType::Exposure),
            Err(Error::MissingDynamicProperty(_))
        ));
    }

    #[test]
    fn test_dynamic_property_reachable_after_finalize() {
        let mut ops = Vec::new();
        let ec = ExposureContrastOpData::new(0.0, 1.0, 1.0, 0.18);
        ec.exposure().make_dynamic();
        create_exposure_contrast_op(&mut ops, ec, TransformDirection::Forward).unwrap();
        let pipeline = Pipeline::finalize(
            ops,
            BitDepth::F32,
            OptimizationFlags::default(),
            FinalizationFlags::Default,
        )
        .unwrap();
        assert!(pipeline.is_dynamic().unwrap());
        let prop = pipeline.dynamic_property(DynamicPropertyType::Exposure).unwrap();

        let mut px = [0.5_f32, 0.5, 0.5, 1.0];
        pipeline.apply(&mut px).unwrap();
        assert_eq!(px[0], 0.5);

        prop.set(1.0);
        let mut px = [0.5_f32, 0.5, 0.5, 1.0];
        pipeline.apply(&mut px).unwrap();
        assert!((px[0] - 1.0).abs() < 1e-5);
    }
}
