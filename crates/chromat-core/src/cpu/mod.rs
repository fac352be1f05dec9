//! CPU renderer dispatch.
//!
//! For each finalized op, one stateless renderer is selected on (kind,
//! style, feature set) so the per-pixel loop carries no branches that the
//! parameters already decide. Renderers precompute every float constant
//! (direction resolution, unit scaling, moncurve break-point math) at
//! construction and expose a single in-place `apply` over a packed
//! RGBA f32 buffer.
//!
//! NaN policy for clamping renderers follows IEEE `max`/`min` argument
//! semantics: a NaN resolves to the clamp bound rather than propagating.
//! Infinities pass through unless a bound clamps them. Hot loops use
//! `glam`'s SIMD-backed vector types where the shape fits; the scalar
//! paths agree with them within 1e-5 relative.

pub mod cdl;
pub mod exposure_contrast;
pub mod fixed_function;
pub mod gamma;
pub mod log;
pub mod lut;
pub mod matrix;
pub mod range;

use crate::error::{Error, Result};
use crate::ops::{Op, OpParams};

/// A stateless pixel renderer for one op.
///
/// `apply` processes 4 channels per pixel in place. Implementations are
/// immutable after construction and safe to share across threads; dynamic
/// renderers re-read their property handles on every call.
pub trait CpuRenderer: Send + Sync {
    /// Name of the specialized variant, for diagnostics and tests.
    fn name(&self) -> &'static str;

    fn apply(&self, rgba: &mut [f32]);
}

/// Select the renderer for a finalized op.
///
/// Asking for a renderer the op set cannot express (a no-op range, an
/// inverse 3D LUT) is a structural error: the optimizer removes no-ops
/// before rendering, and inverse 3D LUTs have no CPU evaluation path.
pub fn renderer_for(op: &Op) -> Result<Box<dyn CpuRenderer>> {
    match op.params() {
        OpParams::Matrix(d) => Ok(matrix::renderer(d)),
        OpParams::Range(d) => range::renderer(d),
        OpParams::Gamma(d) => Ok(gamma::renderer(d)),
        OpParams::Log(d) => Ok(log::renderer(d, op.direction())),
        OpParams::Cdl(d) => Ok(cdl::renderer(d)),
        OpParams::Lut1d(d) => lut::lut1d_renderer(d, op.direction()),
        OpParams::Lut3d(d) => lut::lut3d_renderer(d, op.direction()),
        OpParams::ExposureContrast(d) => Ok(exposure_contrast::renderer(d, op.direction())),
        OpParams::FixedFunction(d) => Ok(fixed_function::renderer(d)),
        OpParams::NoOp => Err(Error::Internal(
            "no processing renderer exists for a no-op".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{OpData, TransformDirection};

    #[test]
    fn test_noop_has_no_renderer() {
        let op = Op::forward(OpData::new(OpParams::NoOp));
        assert!(matches!(renderer_for(&op), Err(Error::Internal(_))));
    }

    #[test]
    fn test_inverse_lut3d_has_no_renderer() {
        let lut = crate::ops::Lut3dOpData::identity(5);
        let op = Op::new(
            OpData::new(OpParams::Lut3d(lut)),
            TransformDirection::Inverse,
        );
        assert!(matches!(renderer_for(&op), Err(Error::Internal(_))));
    }
}
