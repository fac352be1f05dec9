//! Exposure/contrast renderer.
//!
//! The only dynamic renderer: it holds the op's property handles and
//! re-reads them at the top of every `apply`, so a `set` on a unified
//! property between calls changes the output without rebuilding anything.
//! Per-call constants are then hoisted out of the pixel loop as usual.

use crate::cpu::CpuRenderer;
use crate::ops::{ExposureContrastOpData, TransformDirection};

struct ExposureContrastRenderer {
    data: ExposureContrastOpData,
    direction: TransformDirection,
}

impl CpuRenderer for ExposureContrastRenderer {
    fn name(&self) -> &'static str {
        match self.direction {
            TransformDirection::Forward => "ExposureContrastFwd",
            TransformDirection::Inverse => "ExposureContrastRev",
        }
    }

    fn apply(&self, rgba: &mut [f32]) {
        let gain = 2.0_f64.powf(self.data.exposure().get()) as f32;
        let contrast = (self.data.contrast().get() * self.data.gamma().get()) as f32;
        let pivot = self.data.pivot() as f32;

        match self.direction {
            TransformDirection::Forward => {
                if contrast == 1.0 {
                    for px in rgba.chunks_exact_mut(4) {
                        for v in px[..3].iter_mut() {
                            *v *= gain;
                        }
                    }
                } else {
                    for px in rgba.chunks_exact_mut(4) {
                        for v in px[..3].iter_mut() {
                            *v = pivot * (*v * gain / pivot).max(0.0).powf(contrast);
                        }
                    }
                }
            }
            TransformDirection::Inverse => {
                let inv_contrast = 1.0 / contrast;
                let inv_gain = 1.0 / gain;
                if contrast == 1.0 {
                    for px in rgba.chunks_exact_mut(4) {
                        for v in px[..3].iter_mut() {
                            *v *= inv_gain;
                        }
                    }
                } else {
                    for px in rgba.chunks_exact_mut(4) {
                        for v in px[..3].iter_mut() {
                            *v = pivot * (*v / pivot).max(0.0).powf(inv_contrast) * inv_gain;
                        }
                    }
                }
            }
        }
    }
}

pub fn renderer(
    data: &ExposureContrastOpData,
    direction: TransformDirection,
) -> Box<dyn CpuRenderer> {
    // Handles are shared, not copied, so post-finalize property changes
    // reach this renderer.
    Box::new(ExposureContrastRenderer {
        data: sharing_clone(data),
        direction,
    })
}

/// Handle-sharing copy; `Clone` for the op data is deliberately deep.
fn sharing_clone(data: &ExposureContrastOpData) -> ExposureContrastOpData {
    let mut copy = ExposureContrastOpData::new(0.0, 1.0, 1.0, data.pivot());
    copy.set_property(std::sync::Arc::clone(data.exposure()));
    copy.set_property(std::sync::Arc::clone(data.contrast()));
    copy.set_property(std::sync::Arc::clone(data.gamma()));
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_exposure_doubles_per_stop() {
        let data = ExposureContrastOpData::new(1.0, 1.0, 1.0, 0.18);
        let r = renderer(&data, TransformDirection::Forward);
        let mut px = [0.25, 0.5, 1.0, 0.5];
        r.apply(&mut px);
        assert!((px[0] - 0.5).abs() < EPSILON);
        assert!((px[1] - 1.0).abs() < EPSILON);
        assert_eq!(px[3], 0.5);
    }

    #[test]
    fn test_contrast_pivots_around_pivot() {
        let data = ExposureContrastOpData::new(0.0, 2.0, 1.0, 0.5);
        let r = renderer(&data, TransformDirection::Forward);
        let mut px = [0.5, 0.25, 1.0, 1.0];
        r.apply(&mut px);
        assert!((px[0] - 0.5).abs() < EPSILON, "pivot value unchanged");
        assert!(px[1] < 0.25, "below pivot pushed down");
        assert!(px[2] > 1.0, "above pivot pushed up");
    }

    #[test]
    fn test_inverse_round_trips() {
        let data = ExposureContrastOpData::new(0.8, 1.4, 1.1, 0.18);
        let fwd = renderer(&data, TransformDirection::Forward);
        let rev = renderer(&data, TransformDirection::Inverse);
        let mut px = [0.1, 0.5, 2.0, 1.0];
        let orig = px;
        fwd.apply(&mut px);
        rev.apply(&mut px);
        for c in 0..3 {
            assert!((px[c] - orig[c]).abs() < 1e-4);
        }
    }

    #[test]
    fn test_renderer_sees_post_construction_property_change() {
        let data = ExposureContrastOpData::new(0.0, 1.0, 1.0, 0.18);
        data.exposure().make_dynamic();
        let r = renderer(&data, TransformDirection::Forward);

        let mut px = [0.5, 0.5, 0.5, 1.0];
        r.apply(&mut px);
        assert_eq!(px[0], 0.5);

        data.exposure().set(1.0);
        let mut px = [0.5, 0.5, 0.5, 1.0];
        r.apply(&mut px);
        assert!((px[0] - 1.0).abs() < EPSILON);
    }
}
