//! CDL op — ASC color decision list (slope, offset, power, saturation).
//!
//! ```text
//! forward: per channel  v = clamp01(in × slope + offset) ^ power
//!          then          out = clamp01(luma + saturation × (v − luma))
//! ```
//!
//! where luma uses Rec.709 weights. The v1.2 styles clamp to [0, 1] at the
//! two marked points; the no-clamp styles skip both clamps (applying the
//! power only to positive values) and so can represent extended-range
//! grades. Direction is folded into the style.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ops::{Op, OpData, OpParams, TransformDirection};

/// Rec.709 luma weights used for the saturation pivot.
pub const LUMA_REC709: [f64; 3] = [0.2126, 0.7152, 0.0722];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CdlStyle {
    V1_2Fwd,
    V1_2Rev,
    NoClampFwd,
    NoClampRev,
}

impl CdlStyle {
    pub fn is_reverse(self) -> bool {
        matches!(self, Self::V1_2Rev | Self::NoClampRev)
    }

    pub fn clamps(self) -> bool {
        matches!(self, Self::V1_2Fwd | Self::V1_2Rev)
    }

    pub fn reversed(self) -> Self {
        match self {
            Self::V1_2Fwd => Self::V1_2Rev,
            Self::V1_2Rev => Self::V1_2Fwd,
            Self::NoClampFwd => Self::NoClampRev,
            Self::NoClampRev => Self::NoClampFwd,
        }
    }
}

/// Validated parameters for a CDL op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdlOpData {
    style: CdlStyle,
    slope: [f64; 3],
    offset: [f64; 3],
    power: [f64; 3],
    saturation: f64,
}

impl CdlOpData {
    pub fn new(
        style: CdlStyle,
        slope: [f64; 3],
        offset: [f64; 3],
        power: [f64; 3],
        saturation: f64,
    ) -> Self {
        Self {
            style,
            slope,
            offset,
            power,
            saturation,
        }
    }

    pub fn style(&self) -> CdlStyle {
        self.style
    }

    pub fn slope(&self) -> [f64; 3] {
        self.slope
    }

    pub fn offset(&self) -> [f64; 3] {
        self.offset
    }

    pub fn power(&self) -> [f64; 3] {
        self.power
    }

    pub fn saturation(&self) -> f64 {
        self.saturation
    }

    pub fn validate(&self) -> Result<()> {
        for c in 0..3 {
            if !self.slope[c].is_finite() || self.slope[c] < 0.0 {
                return Err(Error::param(
                    "cdl",
                    format!("slope {} must be non-negative", self.slope[c]),
                ));
            }
            if !self.power[c].is_finite() || self.power[c] <= 0.0 {
                return Err(Error::param(
                    "cdl",
                    format!("power {} must be greater than zero", self.power[c]),
                ));
            }
            if !self.offset[c].is_finite() {
                return Err(Error::param("cdl", "offset must be finite"));
            }
        }
        if !self.saturation.is_finite() || self.saturation < 0.0 {
            return Err(Error::param(
                "cdl",
                format!("saturation {} must be non-negative", self.saturation),
            ));
        }
        Ok(())
    }

    pub fn is_identity(&self) -> bool {
        self.slope == [1.0; 3]
            && self.offset == [0.0; 3]
            && self.power == [1.0; 3]
            && self.saturation == 1.0
    }

    /// The clamping styles are never no-ops even with identity parameters.
    pub fn is_noop(&self) -> bool {
        self.is_identity() && !self.style.clamps()
    }

    pub fn has_channel_crosstalk(&self) -> bool {
        self.saturation != 1.0
    }

    pub fn is_inverse(&self, other: &Self) -> bool {
        self.style.reversed() == other.style
            && self.slope == other.slope
            && self.offset == other.offset
            && self.power == other.power
            && self.saturation == other.saturation
    }
}

/// Append a CDL op, folding an inverse direction into the style.
pub fn create_cdl_op(
    ops: &mut Vec<Op>,
    data: CdlOpData,
    direction: TransformDirection,
) -> Result<()> {
    data.validate()?;
    let data = match direction {
        TransformDirection::Forward => data,
        TransformDirection::Inverse => CdlOpData::new(
            data.style.reversed(),
            data.slope,
            data.offset,
            data.power,
            data.saturation,
        ),
    };
    ops.push(Op::forward(OpData::new(OpParams::Cdl(data))));
    Ok(())
}
