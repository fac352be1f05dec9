//! Log renderers.
//!
//! Direction selects the formula at construction; the loop works in
//! natural logs with the base folded into precomputed slopes. The forward
//! path clamps its log argument to the smallest positive normal float, so
//! zero and negative inputs produce the curve's finite floor instead of
//! −∞ or NaN.

use crate::cpu::CpuRenderer;
use crate::ops::{LogOpData, TransformDirection};

struct LogFwdRenderer {
    /// log_slope / ln(base), per RGB channel.
    log_slope: [f32; 3],
    log_offset: [f32; 3],
    lin_slope: [f32; 3],
    lin_offset: [f32; 3],
}

impl CpuRenderer for LogFwdRenderer {
    fn name(&self) -> &'static str {
        "LogFwd"
    }

    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for c in 0..3 {
                let arg = (px[c] * self.lin_slope[c] + self.lin_offset[c])
                    .max(f32::MIN_POSITIVE);
                px[c] = arg.ln() * self.log_slope[c] + self.log_offset[c];
            }
        }
    }
}

struct LogRevRenderer {
    /// ln(base) / log_slope, per RGB channel.
    inv_log_slope: [f32; 3],
    log_offset: [f32; 3],
    inv_lin_slope: [f32; 3],
    lin_offset: [f32; 3],
}

impl CpuRenderer for LogRevRenderer {
    fn name(&self) -> &'static str {
        "LogRev"
    }

    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for c in 0..3 {
                let lin = ((px[c] - self.log_offset[c]) * self.inv_log_slope[c]).exp();
                px[c] = (lin - self.lin_offset[c]) * self.inv_lin_slope[c];
            }
        }
    }
}

pub fn renderer(data: &LogOpData, direction: TransformDirection) -> Box<dyn CpuRenderer> {
    let ln_base = data.base().ln();
    match direction {
        TransformDirection::Forward => Box::new(LogFwdRenderer {
            log_slope: std::array::from_fn(|c| (data.log_slope()[c] / ln_base) as f32),
            log_offset: std::array::from_fn(|c| data.log_offset()[c] as f32),
            lin_slope: std::array::from_fn(|c| data.lin_slope()[c] as f32),
            lin_offset: std::array::from_fn(|c| data.lin_offset()[c] as f32),
        }),
        TransformDirection::Inverse => Box::new(LogRevRenderer {
            inv_log_slope: std::array::from_fn(|c| (ln_base / data.log_slope()[c]) as f32),
            log_offset: std::array::from_fn(|c| data.log_offset()[c] as f32),
            inv_lin_slope: std::array::from_fn(|c| (1.0 / data.lin_slope()[c]) as f32),
            lin_offset: std::array::from_fn(|c| data.lin_offset()[c] as f32),
        }),
    }
}
