//! CDL renderers.
//!
//! Four variants keyed off the style: forward/reverse crossed with
//! clamping (v1.2) and no-clamp. Constants, including the reciprocal
//! slope and power used by the reverse paths, are precomputed. NaNs
//! entering a clamping variant resolve to 0 at the first clamp; the
//! no-clamp variants let them flow through the arithmetic.

use crate::cpu::CpuRenderer;
use crate::ops::cdl::{CdlOpData, CdlStyle, LUMA_REC709};

struct Constants {
    slope: [f32; 3],
    offset: [f32; 3],
    power: [f32; 3],
    inv_slope: [f32; 3],
    inv_power: [f32; 3],
    saturation: f32,
    inv_saturation: f32,
    luma: [f32; 3],
}

impl Constants {
    fn new(data: &CdlOpData) -> Self {
        Self {
            slope: data.slope().map(|v| v as f32),
            offset: data.offset().map(|v| v as f32),
            power: data.power().map(|v| v as f32),
            inv_slope: data.slope().map(|v| (1.0 / v) as f32),
            inv_power: data.power().map(|v| (1.0 / v) as f32),
            saturation: data.saturation() as f32,
            inv_saturation: (1.0 / data.saturation()) as f32,
            luma: LUMA_REC709.map(|v| v as f32),
        }
    }

    #[inline]
    fn luma(&self, rgb: &[f32]) -> f32 {
        rgb[0] * self.luma[0] + rgb[1] * self.luma[1] + rgb[2] * self.luma[2]
    }

    #[inline]
    fn saturate(&self, rgb: &mut [f32], sat: f32) {
        let luma = self.luma(rgb);
        for v in rgb.iter_mut() {
            *v = luma + sat * (*v - luma);
        }
    }
}

#[inline]
fn clamp01(v: f32) -> f32 {
    v.max(0.0).min(1.0)
}

struct CdlFwdClampRenderer(Constants);

impl CpuRenderer for CdlFwdClampRenderer {
    fn name(&self) -> &'static str {
        "CdlFwdClamp"
    }

    fn apply(&self, rgba: &mut [f32]) {
        let c = &self.0;
        for px in rgba.chunks_exact_mut(4) {
            for ch in 0..3 {
                let v = clamp01(px[ch] * c.slope[ch] + c.offset[ch]);
                px[ch] = v.powf(c.power[ch]);
            }
            c.saturate(&mut px[..3], c.saturation);
            for ch in 0..3 {
                px[ch] = clamp01(px[ch]);
            }
        }
    }
}

struct CdlFwdNoClampRenderer(Constants);

impl CpuRenderer for CdlFwdNoClampRenderer {
    fn name(&self) -> &'static str {
        "CdlFwdNoClamp"
    }

    fn apply(&self, rgba: &mut [f32]) {
        let c = &self.0;
        for px in rgba.chunks_exact_mut(4) {
            for ch in 0..3 {
                let v = px[ch] * c.slope[ch] + c.offset[ch];
                px[ch] = if v > 0.0 { v.powf(c.power[ch]) } else { v };
            }
            c.saturate(&mut px[..3], c.saturation);
        }
    }
}

struct CdlRevClampRenderer(Constants);

impl CpuRenderer for CdlRevClampRenderer {
    fn name(&self) -> &'static str {
        "CdlRevClamp"
    }

    fn apply(&self, rgba: &mut [f32]) {
        let c = &self.0;
        for px in rgba.chunks_exact_mut(4) {
            for ch in 0..3 {
                px[ch] = clamp01(px[ch]);
            }
            c.saturate(&mut px[..3], c.inv_saturation);
            for ch in 0..3 {
                let v = clamp01(px[ch]).powf(c.inv_power[ch]);
                px[ch] = (v - c.offset[ch]) * c.inv_slope[ch];
            }
        }
    }
}

struct CdlRevNoClampRenderer(Constants);

impl CpuRenderer for CdlRevNoClampRenderer {
    fn name(&self) -> &'static str {
        "CdlRevNoClamp"
    }

    fn apply(&self, rgba: &mut [f32]) {
        let c = &self.0;
        for px in rgba.chunks_exact_mut(4) {
            c.saturate(&mut px[..3], c.inv_saturation);
            for ch in 0..3 {
                let v = if px[ch] > 0.0 {
                    px[ch].powf(c.inv_power[ch])
                } else {
                    px[ch]
                };
                px[ch] = (v - c.offset[ch]) * c.inv_slope[ch];
            }
        }
    }
}

pub fn renderer(data: &CdlOpData) -> Box<dyn CpuRenderer> {
    let c = Constants::new(data);
    match data.style() {
        CdlStyle::V1_2Fwd => Box::new(CdlFwdClampRenderer(c)),
        CdlStyle::NoClampFwd => Box::new(CdlFwdNoClampRenderer(c)),
        CdlStyle::V1_2Rev => Box::new(CdlRevClampRenderer(c)),
        CdlStyle::NoClampRev => Box::new(CdlRevNoClampRenderer(c)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn grade() -> CdlOpData {
        CdlOpData::new(
            CdlStyle::NoClampFwd,
            [1.35, 1.1, 0.71],
            [0.05, -0.23, 0.11],
            [1.27, 0.81, 0.95],
            1.0,
        )
    }

    #[test]
    fn test_sop_formula_forward() {
        let data = CdlOpData::new(
            CdlStyle::V1_2Fwd,
            [2.0, 1.0, 1.0],
            [0.1, 0.0, 0.0],
            [1.2, 1.0, 1.0],
            1.0,
        );
        let r = renderer(&data);
        let mut px = [0.25, 0.5, 0.5, 1.0];
        r.apply(&mut px);
        let expected = (0.25_f32 * 2.0 + 0.1).powf(1.2);
        assert!((px[0] - expected).abs() < EPSILON);
        assert_eq!(px[1], 0.5);
        assert_eq!(px[3], 1.0);
    }

    #[test]
    fn test_clamp_style_clamps_to_unit_range() {
        let data = CdlOpData::new(CdlStyle::V1_2Fwd, [3.0; 3], [0.0; 3], [1.0; 3], 1.0);
        let r = renderer(&data);
        let mut px = [0.9, -0.5, f32::NAN, 1.0];
        r.apply(&mut px);
        assert_eq!(px[0], 1.0);
        assert_eq!(px[1], 0.0);
        assert_eq!(px[2], 0.0, "NaN resolves to the low clamp");
    }

    #[test]
    fn test_no_clamp_preserves_extended_range(){
        let data = CdlOpData::new(CdlStyle::NoClampFwd, [3.0; 3], [0.0; 3], [1.0; 3], 1.0);
        let r = renderer(&data);
        let mut px = [0.9, -0.5, 0.0, 1.0];
        r.apply(&mut px);
        assert!((px[0] - 2.7).abs() < EPSILON);
        assert!((px[1] + 1.5).abs() < EPSILON, "negatives skip the power");
    }

    #[test]
    fn test_saturation_pulls_toward_luma() {
        let data = CdlOpData::new(CdlStyle::NoClampFwd, [1.0; 3], [0.0; 3], [1.0; 3], 0.0);
        let r = renderer(&data);
        let mut px = [1.0, 0.0, 0.0, 1.0];
        r.apply(&mut px);
        let luma = LUMA_REC709[0] as f32;
        for c in 0..3 {
            assert!((px[c] - luma).abs() < EPSILON);
        }
    }

    #[test]
    fn test_reverse_undoes_forward() {
        let data = grade();
        let fwd = renderer(&data);
        let rev_data = CdlOpData::new(
            data.style().reversed(),
            data.slope(),
            data.offset(),
            data.power(),
            data.saturation(),
        );
        let rev = renderer(&rev_data);
        let mut px = [0.4, 0.6, 0.2, 1.0];
        let orig = px;
        fwd.apply(&mut px);
        rev.apply(&mut px);
        for c in 0..3 {
            assert!(
                (px[c] - orig[c]).abs() < 1e-4,
                "channel {c}: {} vs {}",
                px[c],
                orig[c]
            );
        }
    }
}
