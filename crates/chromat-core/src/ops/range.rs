//! Range op — affine rescale with optional clamping at either end.
//!
//! A bound is always declared as an input/output pair: the input value at
//! which clamping begins and the output value it maps to. When both low
//! and high bounds are present the op rescales between them; with a single
//! bound it clamps and offsets; with no bounds it is an identity.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ops::{Op, OpData, OpParams, TransformDirection};

/// Validated parameters for a range op.
///
/// `None` means the corresponding end is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeOpData {
    min_in: Option<f64>,
    max_in: Option<f64>,
    min_out: Option<f64>,
    max_out: Option<f64>,
}

impl RangeOpData {
    pub fn new(
        min_in: Option<f64>,
        max_in: Option<f64>,
        min_out: Option<f64>,
        max_out: Option<f64>,
    ) -> Self {
        Self {
            min_in,
            max_in,
            min_out,
            max_out,
        }
    }

    pub fn min_out(&self) -> Option<f64> {
        self.min_out
    }

    pub fn max_out(&self) -> Option<f64> {
        self.max_out
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_in.is_some() != self.min_out.is_some() {
            return Err(Error::param(
                "range",
                "low bound requires both input and output values",
            ));
        }
        if self.max_in.is_some() != self.max_out.is_some() {
            return Err(Error::param(
                "range",
                "high bound requires both input and output values",
            ));
        }
        for v in [self.min_in, self.max_in, self.min_out, self.max_out]
            .into_iter()
            .flatten()
        {
            if !v.is_finite() {
                return Err(Error::param("range", "bounds must be finite"));
            }
        }
        if let (Some(lo), Some(hi)) = (self.min_in, self.max_in)
            && lo >= hi
        {
            return Err(Error::param(
                "range",
                format!("low input bound {lo} must be less than high input bound {hi}"),
            ));
        }
        if let (Some(lo), Some(hi)) = (self.min_out, self.max_out)
            && lo >= hi
        {
            return Err(Error::param(
                "range",
                format!("low output bound {lo} must be less than high output bound {hi}"),
            ));
        }
        Ok(())
    }

    /// Multiplier of the affine part. 1.0 unless both bounds are present.
    pub fn scale(&self) -> f64 {
        match (self.min_in, self.max_in, self.min_out, self.max_out) {
            (Some(lo_in), Some(hi_in), Some(lo_out), Some(hi_out)) => {
                (hi_out - lo_out) / (hi_in - lo_in)
            }
            _ => 1.0,
        }
    }

    /// Additive part of the affine rescale.
    pub fn offset(&self) -> f64 {
        let scale = self.scale();
        if let (Some(lo_in), Some(lo_out)) = (self.min_in, self.min_out) {
            lo_out - scale * lo_in
        } else if let (Some(hi_in), Some(hi_out)) = (self.max_in, self.max_out) {
            hi_out - scale * hi_in
        } else {
            0.0
        }
    }

    /// Whether the affine part does anything.
    pub fn scales(&self) -> bool {
        self.scale() != 1.0 || self.offset() != 0.0
    }

    pub fn clamps(&self) -> bool {
        self.min_out.is_some() || self.max_out.is_some()
    }

    /// An unbounded range is the only identity; any bound clamps.
    pub fn is_identity(&self) -> bool {
        self.min_in.is_none() && self.max_in.is_none()
    }

    pub fn is_noop(&self) -> bool {
        self.is_identity()
    }

    /// Swap input and output roles.
    pub fn inverse(&self) -> Self {
        Self {
            min_in: self.min_out,
            max_in: self.max_out,
            min_out: self.min_in,
            max_out: self.max_in,
        }
    }

    /// Scalar reference transform. Renderers specialize this; table baking
    /// and equivalence tests go through here.
    pub fn transform(&self, v: f64) -> f64 {
        let mut t = v * self.scale() + self.offset();
        if let Some(lo) = self.min_out {
            t = t.max(lo);
        }
        if let Some(hi) = self.max_out {
            t = t.min(hi);
        }
        t
    }
}

/// Append a range op, resolving an inverse direction into the data.
pub fn create_range_op(
    ops: &mut Vec<Op>,
    data: RangeOpData,
    direction: TransformDirection,
) -> Result<()> {
    data.validate()?;
    let data = match direction {
        TransformDirection::Forward => data,
        TransformDirection::Inverse => data.inverse(),
    };
    ops.push(Op::forward(OpData::new(OpParams::Range(data))));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_range_is_identity() {
        let r = RangeOpData::default();
        assert!(r.validate().is_ok());
        assert!(r.is_identity());
        assert!(r.is_noop());
        assert!(!r.clamps());
    }

    #[test]
    fn test_unpaired_bound_rejected() {
        let r = RangeOpData::new(Some(0.0), None, None, None);
        assert!(r.validate().is_err());
        let r = RangeOpData::new(None, Some(1.0), None, None);
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let r = RangeOpData::new(Some(1.0), Some(0.0), Some(0.0), Some(1.0));
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_scale_and_offset_from_full_bounds() {
        // [0, 1] -> [0.5, 1.5]: scale 1, offset 0.5.
        let r = RangeOpData::new(Some(0.0), Some(1.0), Some(0.5), Some(1.5));
        assert_eq!(r.scale(), 1.0);
        assert_eq!(r.offset(), 0.5);
        assert!(r.scales());
        assert_eq!(r.transform(0.25), 0.75);
        // Clamped at both ends.
        assert_eq!(r.transform(-10.0), 0.5);
        assert_eq!(r.transform(10.0), 1.5);
    }

    #[test]
    fn test_min_only_clamps_low_end() {
        let r = RangeOpData::new(Some(-0.1), None, Some(-0.1), None);
        assert!(!r.scales());
        assert_eq!(r.transform(-0.5), -0.1);
        assert_eq!(r.transform(0.5), 0.5);
    }

    #[test]
    fn test_inverse_swaps_domains() {
        let r = RangeOpData::new(Some(0.0), Some(1.0), Some(0.0), Some(2.0));
        let inv = r.inverse();
        assert_eq!(inv.transform(r.transform(0.3)), 0.3);
    }
}
