//! The op data model and the polymorphic `Op` contract.
//!
//! Op kinds form a closed set: the optimizer and the GPU extractor both
//! need exhaustive, compile-time-checked matches over them, so the model
//! is a tagged enum rather than open registration. An [`Op`] pairs shared,
//! immutable [`OpData`] with a transform direction and exposes the uniform
//! surface the optimizer, the CPU dispatch, and the shader extractor use:
//! apply, combine, inverse tests, crosstalk/dynamic queries, cache IDs.

pub mod cdl;
pub mod exposure_contrast;
pub mod fixed_function;
pub mod gamma;
pub mod log;
pub mod lut1d;
pub mod lut3d;
pub mod matrix;
pub mod range;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_128;

use crate::depth::BitDepth;
use crate::dynamic::{DynamicPropertyHandle, DynamicPropertyType};
use crate::error::{Error, Result};

pub use cdl::{CdlOpData, CdlStyle, create_cdl_op};
pub use exposure_contrast::{ExposureContrastOpData, create_exposure_contrast_op};
pub use fixed_function::{FixedFunctionOpData, FixedFunctionStyle, create_fixed_function_op};
pub use gamma::{GammaOpData, GammaStyle, create_gamma_op};
pub use log::{LogOpData, create_log_op};
pub use lut1d::{Lut1dOpData, create_lut1d_op};
pub use lut3d::{Lut3dOpData, create_lut3d_op};
pub use matrix::{MatrixOpData, create_matrix_op};
pub use range::{RangeOpData, create_range_op};

/// Direction a transform is applied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformDirection {
    Forward,
    Inverse,
}

impl TransformDirection {
    pub fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Inverse,
            Self::Inverse => Self::Forward,
        }
    }
}

/// Closed set of op kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    Matrix,
    Range,
    Gamma,
    Log,
    Cdl,
    Lut1d,
    Lut3d,
    ExposureContrast,
    FixedFunction,
    NoOp,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Matrix => "matrix",
            Self::Range => "range",
            Self::Gamma => "gamma",
            Self::Log => "log",
            Self::Cdl => "cdl",
            Self::Lut1d => "lut1d",
            Self::Lut3d => "lut3d",
            Self::ExposureContrast => "exposure_contrast",
            Self::FixedFunction => "fixed_function",
            Self::NoOp => "noop",
        };
        write!(f, "{name}")
    }
}

/// Human-readable identification. Never semantically load-bearing and
/// excluded from equality and cache IDs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Per-family validated parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpParams {
    Matrix(MatrixOpData),
    Range(RangeOpData),
    Gamma(GammaOpData),
    Log(LogOpData),
    Cdl(CdlOpData),
    Lut1d(Lut1dOpData),
    Lut3d(Lut3dOpData),
    ExposureContrast(ExposureContrastOpData),
    FixedFunction(FixedFunctionOpData),
    NoOp,
}

impl OpParams {
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Matrix(_) => OpKind::Matrix,
            Self::Range(_) => OpKind::Range,
            Self::Gamma(_) => OpKind::Gamma,
            Self::Log(_) => OpKind::Log,
            Self::Cdl(_) => OpKind::Cdl,
            Self::Lut1d(_) => OpKind::Lut1d,
            Self::Lut3d(_) => OpKind::Lut3d,
            Self::ExposureContrast(_) => OpKind::ExposureContrast,
            Self::FixedFunction(_) => OpKind::FixedFunction,
            Self::NoOp => OpKind::NoOp,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Matrix(d) => d.validate(),
            Self::Range(d) => d.validate(),
            Self::Gamma(d) => d.validate(),
            Self::Log(d) => d.validate(),
            Self::Cdl(d) => d.validate(),
            Self::Lut1d(d) => d.validate(),
            Self::Lut3d(d) => d.validate(),
            Self::ExposureContrast(d) => d.validate(),
            Self::FixedFunction(d) => d.validate(),
            Self::NoOp => Ok(()),
        }
    }

    /// Identity transform (possibly still clamping).
    pub fn is_identity(&self) -> bool {
        match self {
            Self::Matrix(d) => d.is_identity(),
            Self::Range(d) => d.is_identity(),
            Self::Gamma(d) => d.is_identity(),
            Self::Log(d) => d.is_identity(),
            Self::Cdl(d) => d.is_identity(),
            Self::Lut1d(d) => d.is_identity(),
            Self::Lut3d(d) => d.is_identity(),
            Self::ExposureContrast(d) => d.is_identity(),
            Self::FixedFunction(d) => d.is_identity(),
            Self::NoOp => true,
        }
    }

    /// Identity with no clamping side effect; safe for removal.
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Matrix(d) => d.is_noop(),
            Self::Range(d) => d.is_noop(),
            Self::Gamma(d) => d.is_noop(),
            Self::Log(d) => d.is_noop(),
            Self::Cdl(d) => d.is_noop(),
            Self::Lut1d(d) => d.is_noop(),
            Self::Lut3d(d) => d.is_noop(),
            Self::ExposureContrast(d) => d.is_noop(),
            Self::FixedFunction(d) => d.is_noop(),
            Self::NoOp => true,
        }
    }

    /// Output channels depend on more than their own input channel.
    pub fn has_channel_crosstalk(&self) -> bool {
        match self {
            Self::Matrix(d) => d.has_channel_crosstalk(),
            Self::Cdl(d) => d.has_channel_crosstalk(),
            Self::Lut3d(_) => true,
            Self::FixedFunction(d) => d.has_channel_crosstalk(),
            Self::Range(_) | Self::Gamma(_) | Self::Log(_) | Self::Lut1d(_) => false,
            Self::ExposureContrast(_) | Self::NoOp => false,
        }
    }

    /// One or more parameters may change after pipeline construction.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::ExposureContrast(d) => d.is_dynamic(),
            _ => false,
        }
    }

    /// Type plus style match, ignoring numeric parameters.
    fn same_type(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Gamma(a), Self::Gamma(b)) => {
                a.style().is_basic() == b.style().is_basic()
            }
            (Self::Cdl(a), Self::Cdl(b)) => a.style().clamps() == b.style().clamps(),
            (Self::FixedFunction(a), Self::FixedFunction(b)) => {
                a.style().reversed() == b.style() || a.style() == b.style()
            }
            _ => self.kind() == other.kind(),
        }
    }
}

/// A pipeline stage: shared immutable data plus a direction.
///
/// Cloning shares the data; ops are never mutated in place after
/// finalization, so sharing is safe across pipelines and threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Op {
    data: Arc<OpData>,
    direction: TransformDirection,
    #[serde(skip)]
    cache_id: Option<String>,
}

/// Semantic equality: data and direction, not the cached ID.
impl PartialEq for Op {
    fn eq(&self, other: &Self) -> bool {
        self.direction == other.direction && self.data == other.data
    }
}

/// Validated parameters plus file-level metadata for one op instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpData {
    params: OpParams,
    metadata: OpMetadata,
    file_in_depth: BitDepth,
    file_out_depth: BitDepth,
}

/// Structural equality: semantic parameters only, never metadata.
impl PartialEq for OpData {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params
    }
}

impl OpData {
    pub fn new(params: OpParams) -> Self {
        Self {
            params,
            metadata: OpMetadata::default(),
            file_in_depth: BitDepth::F32,
            file_out_depth: BitDepth::F32,
        }
    }

    pub fn with_metadata(mut self, metadata: OpMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_file_depths(mut self, input: BitDepth, output: BitDepth) -> Self {
        self.file_in_depth = input;
        self.file_out_depth = output;
        self
    }

    pub fn params(&self) -> &OpParams {
        &self.params
    }

    pub fn metadata(&self) -> &OpMetadata {
        &self.metadata
    }

    pub fn file_in_depth(&self) -> BitDepth {
        self.file_in_depth
    }

    pub fn file_out_depth(&self) -> BitDepth {
        self.file_out_depth
    }

    pub fn validate(&self) -> Result<()> {
        self.params.validate()
    }
}

impl Op {
    pub fn new(data: OpData, direction: TransformDirection) -> Self {
        Self {
            data: Arc::new(data),
            direction,
            cache_id: None,
        }
    }

    pub fn forward(data: OpData) -> Self {
        Self::new(data, TransformDirection::Forward)
    }

    pub fn data(&self) -> &OpData {
        &self.data
    }

    pub fn params(&self) -> &OpParams {
        &self.data.params
    }

    pub fn kind(&self) -> OpKind {
        self.data.params.kind()
    }

    pub fn direction(&self) -> TransformDirection {
        self.direction
    }

    pub fn is_noop(&self) -> bool {
        self.data.params.is_noop()
    }

    pub fn has_channel_crosstalk(&self) -> bool {
        self.data.params.has_channel_crosstalk()
    }

    pub fn is_dynamic(&self) -> bool {
        self.data.params.is_dynamic()
    }

    /// Type and style equality, ignoring numeric parameters.
    pub fn is_same_type(&self, other: &Self) -> bool {
        self.data.params.same_type(&other.data.params)
    }

    /// Whether applying `other` after `self` is the identity transform.
    pub fn is_inverse(&self, other: &Self) -> bool {
        match (self.params(), other.params()) {
            // Direction is folded into the data at creation; a pair is
            // inverse when composing them yields an identity.
            (OpParams::Matrix(a), OpParams::Matrix(b)) => a.compose(b).is_identity(),
            (OpParams::Gamma(a), OpParams::Gamma(b)) => a.is_inverse(b),
            (OpParams::Cdl(a), OpParams::Cdl(b)) => a.is_inverse(b),
            (OpParams::FixedFunction(a), OpParams::FixedFunction(b)) => a.is_inverse(b),
            (OpParams::ExposureContrast(a), OpParams::ExposureContrast(b)) => {
                a.is_inverse(b) && self.direction == other.direction.reversed()
            }
            // Data-equal ops applied in opposite directions.
            (OpParams::Log(a), OpParams::Log(b)) => {
                a == b && self.direction == other.direction.reversed()
            }
            (OpParams::Lut1d(a), OpParams::Lut1d(b)) => {
                a == b && self.direction == other.direction.reversed()
            }
            (OpParams::Lut3d(a), OpParams::Lut3d(b)) => {
                a == b && self.direction == other.direction.reversed()
            }
            // Removing a range pair would drop its clamp side effect.
            (OpParams::Range(_), OpParams::Range(_)) => false,
            _ => false,
        }
    }

    /// Whether [`combine_with`](Self::combine_with) has a closed form for
    /// this pair.
    pub fn can_combine_with(&self, other: &Self) -> bool {
        match (self.params(), other.params()) {
            (OpParams::Matrix(_), OpParams::Matrix(_)) => true,
            (OpParams::Gamma(a), OpParams::Gamma(b)) => a.may_compose(b),
            _ => false,
        }
    }

    /// Functional composition of two adjacent ops.
    ///
    /// Returns the replacement sequence: empty when the pair collapsed to
    /// an identity, otherwise one combined op. Calling this without a
    /// prior [`can_combine_with`](Self::can_combine_with) check is a
    /// programming error.
    pub fn combine_with(&self, other: &Self) -> Result<Vec<Op>> {
        match (self.params(), other.params()) {
            (OpParams::Matrix(a), OpParams::Matrix(b)) => {
                let composed = a.compose(b);
                if composed.is_noop() {
                    Ok(Vec::new())
                } else {
                    Ok(vec![Op::forward(OpData::new(OpParams::Matrix(composed)))])
                }
            }
            (OpParams::Gamma(a), OpParams::Gamma(b)) => {
                let composed = a.compose(b)?;
                if composed.is_identity() {
                    Ok(Vec::new())
                } else {
                    Ok(vec![Op::forward(OpData::new(OpParams::Gamma(composed)))])
                }
            }
            _ => Err(Error::Internal(format!(
                "combine_with called on incompatible ops {} and {}",
                self.kind(),
                other.kind()
            ))),
        }
    }

    /// Apply this op to a packed RGBA float buffer in place.
    ///
    /// Builds a renderer on the fly; finalized pipelines hold their
    /// renderers instead of going through here per call.
    pub fn apply(&self, rgba: &mut [f32]) -> Result<()> {
        if self.is_noop() {
            return Ok(());
        }
        crate::cpu::renderer_for(self)?.apply(rgba);
        Ok(())
    }

    /// Handle for a dynamic property this op references, if any.
    pub fn dynamic_property(
        &self,
        prop_type: DynamicPropertyType,
    ) -> Option<&DynamicPropertyHandle> {
        match self.params() {
            OpParams::ExposureContrast(d) => {
                let handle = d.property(prop_type);
                handle.is_dynamic().then_some(handle)
            }
            _ => None,
        }
    }

    fn replace_dynamic_property(&mut self, handle: DynamicPropertyHandle) {
        let data = Arc::make_mut(&mut self.data);
        if let OpParams::ExposureContrast(d) = &mut data.params {
            d.set_property(handle);
        }
    }

    /// Validate and refresh the cached facts; computes the cache ID.
    pub fn finalize(&mut self) -> Result<()> {
        self.data.validate()?;
        self.cache_id = Some(self.compute_cache_id());
        Ok(())
    }

    /// Stable content ID. Available after [`finalize`](Self::finalize).
    pub fn cache_id(&self) -> Option<&str> {
        self.cache_id.as_deref()
    }

    fn compute_cache_id(&self) -> String {
        // Parameters serialize deterministically (serde_json emits the
        // shortest round-trip form for floats); metadata is not included.
        let params =
            serde_json::to_string(&self.data.params).unwrap_or_else(|_| self.kind().to_string());
        let tag = format!("{}:{:?}:{params}", self.kind(), self.direction);
        format!("{:032x}", xxh3_128(tag.as_bytes()))
    }
}

/// Make ops created from the same logical dynamic parameter share one
/// property instance: the first dynamic handle of each type becomes
/// canonical and every later op is rebound to it.
pub fn unify_dynamic_properties(ops: &mut [Op]) {
    use DynamicPropertyType as T;
    for prop_type in [T::Exposure, T::Contrast, T::Gamma] {
        let mut canonical: Option<DynamicPropertyHandle> = None;
        for op in ops.iter_mut() {
            let Some(handle) = op.dynamic_property(prop_type).map(Arc::clone) else {
                continue;
            };
            match &canonical {
                None => canonical = Some(handle),
                Some(c) => op.replace_dynamic_property(Arc::clone(c)),
            }
        }
    }
}
