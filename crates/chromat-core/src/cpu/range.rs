//! Range renderers.
//!
//! Selection depends on which of {scale, low clamp, high clamp} apply, so
//! the per-pixel loop never tests a bound that cannot fire. Six reachable
//! variants; the scale-only form is kept for completeness but the data
//! model only produces a scale together with at least one bound.
//!
//! Clamp order fixes the NaN policy: `max(lo, v)` then `min(hi, v)` with
//! IEEE semantics turns a NaN into the low bound (or the high bound for
//! the max-only renderer). Alpha always passes through.

use crate::cpu::CpuRenderer;
use crate::error::{Error, Result};
use crate::ops::RangeOpData;

struct Constants {
    scale: f32,
    offset: f32,
    lower: f32,
    upper: f32,
}

impl Constants {
    fn new(data: &RangeOpData) -> Self {
        Self {
            scale: data.scale() as f32,
            offset: data.offset() as f32,
            lower: data.min_out().unwrap_or(0.0) as f32,
            upper: data.max_out().unwrap_or(0.0) as f32,
        }
    }
}

macro_rules! range_renderer {
    ($struct_name:ident, $name:literal, |$c:ident, $v:ident| $body:expr) => {
        struct $struct_name(Constants);

        impl CpuRenderer for $struct_name {
            fn name(&self) -> &'static str {
                $name
            }

            fn apply(&self, rgba: &mut [f32]) {
                let $c = &self.0;
                for px in rgba.chunks_exact_mut(4) {
                    for $v in px[..3].iter_mut() {
                        *$v = $body;
                    }
                }
            }
        }
    };
}

range_renderer!(RangeScaleMinMaxRenderer, "RangeScaleMinMax", |c, v| {
    (*v * c.scale + c.offset).max(c.lower).min(c.upper)
});
range_renderer!(RangeScaleMinRenderer, "RangeScaleMin", |c, v| {
    (*v * c.scale + c.offset).max(c.lower)
});
range_renderer!(RangeScaleMaxRenderer, "RangeScaleMax", |c, v| {
    (*v * c.scale + c.offset).min(c.upper)
});
range_renderer!(RangeScaleRenderer, "RangeScale", |c, v| {
    *v * c.scale + c.offset
});
range_renderer!(RangeMinMaxRenderer, "RangeMinMax", |c, v| {
    (*v).max(c.lower).min(c.upper)
});
range_renderer!(RangeMinRenderer, "RangeMin", |c, v| (*v).max(c.lower));
range_renderer!(RangeMaxRenderer, "RangeMax", |c, v| (*v).min(c.upper));

/// Select the specialized range renderer.
///
/// A range with neither bound is an identity the optimizer should have
/// removed; asking for its renderer is a structural error.
pub fn renderer(data: &RangeOpData) -> Result<Box<dyn CpuRenderer>> {
    let c = Constants::new(data);
    let has_min = data.min_out().is_some();
    let has_max = data.max_out().is_some();

    if data.scales() {
        match (has_min, has_max) {
            (true, true) => Ok(Box::new(RangeScaleMinMaxRenderer(c))),
            (true, false) => Ok(Box::new(RangeScaleMinRenderer(c))),
            (false, true) => Ok(Box::new(RangeScaleMaxRenderer(c))),
            (false, false) => Ok(Box::new(RangeScaleRenderer(c))),
        }
    } else {
        match (has_min, has_max) {
            (true, true) => Ok(Box::new(RangeMinMaxRenderer(c))),
            (true, false) => Ok(Box::new(RangeMinRenderer(c))),
            (false, true) => Ok(Box::new(RangeMaxRenderer(c))),
            (false, false) => Err(Error::Internal(
                "no processing renderer exists for an identity range".into(),
            )),
        }
    }
}
