//! Lookup table renderers.
//!
//! 1D LUTs interpolate per channel (or index by half-float bit pattern
//! for half-domain tables); the inverse variant binary-searches the
//! monotonic table per pixel, which default-style finalization avoids by
//! baking the inverse into a forward table up front. 3D LUTs sample the
//! cube trilinearly and only exist in the forward direction on the CPU.

use crate::cpu::CpuRenderer;
use crate::error::{Error, Result};
use crate::ops::{Lut1dOpData, Lut3dOpData, TransformDirection};

struct Lut1dFwdRenderer {
    lut: Lut1dOpData,
}

impl CpuRenderer for Lut1dFwdRenderer {
    fn name(&self) -> &'static str {
        "Lut1dFwd"
    }

    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for c in 0..3 {
                px[c] = self.lut.eval_fwd(c, px[c]);
            }
        }
    }
}

struct Lut1dRevRenderer {
    lut: Lut1dOpData,
}

impl CpuRenderer for Lut1dRevRenderer {
    fn name(&self) -> &'static str {
        "Lut1dRev"
    }

    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for c in 0..3 {
                px[c] = self.lut.eval_rev_normal(c, px[c]);
            }
        }
    }
}

struct Lut3dRenderer {
    lut: Lut3dOpData,
}

impl CpuRenderer for Lut3dRenderer {
    fn name(&self) -> &'static str {
        "Lut3d"
    }

    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            let out = self.lut.sample([px[0], px[1], px[2]]);
            px[..3].copy_from_slice(&out);
        }
    }
}

pub fn lut1d_renderer(
    data: &Lut1dOpData,
    direction: TransformDirection,
) -> Result<Box<dyn CpuRenderer>> {
    match direction {
        TransformDirection::Forward => Ok(Box::new(Lut1dFwdRenderer { lut: data.clone() })),
        TransformDirection::Inverse => {
            if data.is_half_domain() {
                return Err(Error::Internal(
                    "inverse evaluation of a half-domain LUT is not supported".into(),
                ));
            }
            Ok(Box::new(Lut1dRevRenderer { lut: data.clone() }))
        }
    }
}

pub fn lut3d_renderer(
    data: &Lut3dOpData,
    direction: TransformDirection,
) -> Result<Box<dyn CpuRenderer>> {
    match direction {
        TransformDirection::Forward => Ok(Box::new(Lut3dRenderer { lut: data.clone() })),
        TransformDirection::Inverse => Err(Error::Internal(
            "a 3D LUT cannot be applied in the inverse direction on the CPU".into(),
        )),
    }
}
