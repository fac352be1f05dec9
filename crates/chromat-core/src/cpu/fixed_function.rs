//! Fixed-function renderers.
//!
//! Rec.2100 surround scales RGB by a power of the Rec.2100 luminance.
//! The luminance is floored well above zero so dark colors cannot pick up
//! extreme gain from a sub-unity exponent.

use crate::cpu::CpuRenderer;
use crate::ops::fixed_function::{FixedFunctionOpData, FixedFunctionStyle, LUMA_REC2100};

struct Rec2100SurroundRenderer {
    /// Exponent applied to luminance, minus one so the result scales RGB.
    gamma_minus_one: f32,
}

impl CpuRenderer for Rec2100SurroundRenderer {
    fn name(&self) -> &'static str {
        "Rec2100Surround"
    }

    fn apply(&self, rgba: &mut [f32]) {
        const MIN_LUM: f32 = 1e-4;
        let weights = LUMA_REC2100.map(|v| v as f32);
        for px in rgba.chunks_exact_mut(4) {
            let y = (px[0] * weights[0] + px[1] * weights[1] + px[2] * weights[2]).max(MIN_LUM);
            let gain = y.powf(self.gamma_minus_one);
            px[0] *= gain;
            px[1] *= gain;
            px[2] *= gain;
        }
    }
}

pub fn renderer(data: &FixedFunctionOpData) -> Box<dyn CpuRenderer> {
    match data.style() {
        FixedFunctionStyle::Rec2100SurroundFwd | FixedFunctionStyle::Rec2100SurroundRev => {
            Box::new(Rec2100SurroundRenderer {
                gamma_minus_one: (data.effective_gamma() - 1.0) as f32,
            })
        }
    }
}
