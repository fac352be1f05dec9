//! Gamma renderers.
//!
//! The basic renderer is a per-channel power with negatives clamped to
//! zero (direction is resolved into the exponent at construction). The
//! moncurve renderers derive the linear-segment break point and slope
//! from the gamma and offset once, so the loop is a compare plus either a
//! multiply or a power.
//!
//! Parameters were validated at op creation; the math below relies on
//! that and performs no divide-by-zero checks beyond the documented
//! epsilon fudge.

use crate::cpu::CpuRenderer;
use crate::ops::gamma::{GammaOpData, GammaStyle, Params};

/// Fudge applied so the moncurve model cannot divide by zero with
/// gamma = 1 or offset = 0. The neat values stay in the op data; only the
/// renderer constants are nudged.
const EPS: f64 = 1e-6;

/// Precomputed constants for one moncurve channel.
#[derive(Clone, Copy, Default)]
pub struct MoncurveParams {
    pub gamma: f32,
    pub offset: f32,
    pub scale: f32,
    pub slope: f32,
    pub break_pnt: f32,
}

/// Forward constants: linear below the break, scaled power above.
pub fn moncurve_params_fwd(p: &Params) -> MoncurveParams {
    let gamma = p[0].max(1.0 + EPS);
    let offset = p[1].max(EPS);
    MoncurveParams {
        gamma: gamma as f32,
        offset: (offset / (1.0 + offset)) as f32,
        scale: (1.0 / (1.0 + offset)) as f32,
        break_pnt: (offset / (gamma - 1.0)) as f32,
        slope: {
            let a = (gamma - 1.0) / offset;
            let b = offset * gamma / ((gamma - 1.0) * (1.0 + offset));
            (a * b.powf(gamma)) as f32
        },
    }
}

/// Constants for the inverse of the forward curve.
pub fn moncurve_params_rev(p: &Params) -> MoncurveParams {
    let gamma = p[0].max(1.0 + EPS);
    let offset = p[1].max(EPS);
    MoncurveParams {
        gamma: (1.0 / gamma) as f32,
        offset: offset as f32,
        scale: (1.0 + offset) as f32,
        break_pnt: {
            let a = offset * gamma;
            let b = (gamma - 1.0) * (1.0 + offset);
            (a / b).powf(gamma) as f32
        },
        slope: {
            let a = (gamma - 1.0) / offset;
            let b = (1.0 + offset) / gamma;
            (a.powf(gamma - 1.0) * b.powf(gamma)) as f32
        },
    }
}

struct GammaBasicRenderer {
    gamma: [f32; 4],
}

impl CpuRenderer for GammaBasicRenderer {
    fn name(&self) -> &'static str {
        "GammaBasic"
    }

    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for (v, g) in px.iter_mut().zip(self.gamma) {
                *v = v.max(0.0).powf(g);
            }
        }
    }
}

struct GammaMoncurveFwdRenderer {
    channels: [MoncurveParams; 4],
}

impl CpuRenderer for GammaMoncurveFwdRenderer {
    fn name(&self) -> &'static str {
        "GammaMoncurveFwd"
    }

    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for (v, p) in px.iter_mut().zip(&self.channels) {
                *v = if *v <= p.break_pnt {
                    *v * p.slope
                } else {
                    (*v * p.scale + p.offset).powf(p.gamma)
                };
            }
        }
    }
}

struct GammaMoncurveRevRenderer {
    channels: [MoncurveParams; 4],
}

impl CpuRenderer for GammaMoncurveRevRenderer {
    fn name(&self) -> &'static str {
        "GammaMoncurveRev"
    }

    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for (v, p) in px.iter_mut().zip(&self.channels) {
                *v = if *v <= p.break_pnt {
                    *v * p.slope
                } else {
                    v.powf(p.gamma) * p.scale - p.offset
                };
            }
        }
    }
}

pub fn renderer(data: &GammaOpData) -> Box<dyn CpuRenderer> {
    match data.style() {
        GammaStyle::BasicFwd | GammaStyle::BasicRev => {
            let rev = data.style() == GammaStyle::BasicRev;
            let gamma = data
                .channels()
                .map(|p| (if rev { 1.0 / p[0] } else { p[0] }) as f32);
            Box::new(GammaBasicRenderer { gamma })
        }
        GammaStyle::MoncurveFwd => Box::new(GammaMoncurveFwdRenderer {
            channels: data.channels().map(|p| moncurve_params_fwd(p)),
        }),
        GammaStyle::MoncurveRev => Box::new(GammaMoncurveRevRenderer {
            channels: data.channels().map(|p| moncurve_params_rev(p)),
        }),
    }
}
