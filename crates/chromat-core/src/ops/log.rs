//! Log op — logarithmic encoding with linear-side slope and offset.
//!
//! ```text
//! forward: out = logSlope × log_base(linSlope × x + linOffset) + logOffset
//! inverse: out = (base^((y − logOffset) / logSlope) − linOffset) / linSlope
//! ```
//!
//! The forward renderer clamps the log argument to a tiny positive floor,
//! so non-positive inputs encode to a finite minimum rather than −∞.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ops::{Op, OpData, OpParams, TransformDirection};

/// Validated parameters for a log op, per RGB channel. Alpha is untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogOpData {
    base: f64,
    log_slope: [f64; 3],
    log_offset: [f64; 3],
    lin_slope: [f64; 3],
    lin_offset: [f64; 3],
}

impl LogOpData {
    pub fn new(
        base: f64,
        log_slope: [f64; 3],
        log_offset: [f64; 3],
        lin_slope: [f64; 3],
        lin_offset: [f64; 3],
    ) -> Self {
        Self {
            base,
            log_slope,
            log_offset,
            lin_slope,
            lin_offset,
        }
    }

    /// Plain log10-style curve with unit slopes and no offsets.
    pub fn with_base(base: f64) -> Self {
        Self::new(base, [1.0; 3], [0.0; 3], [1.0; 3], [0.0; 3])
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn log_slope(&self) -> [f64; 3] {
        self.log_slope
    }

    pub fn log_offset(&self) -> [f64; 3] {
        self.log_offset
    }

    pub fn lin_slope(&self) -> [f64; 3] {
        self.lin_slope
    }

    pub fn lin_offset(&self) -> [f64; 3] {
        self.lin_offset
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base.is_finite() || self.base <= 0.0 || self.base == 1.0 {
            return Err(Error::param(
                "log",
                format!("base {} must be positive and not 1", self.base),
            ));
        }
        for c in 0..3 {
            if self.log_slope[c] == 0.0 {
                return Err(Error::param("log", "log slope must be non-zero"));
            }
            if self.lin_slope[c] == 0.0 {
                return Err(Error::param("log", "linear slope must be non-zero"));
            }
        }
        let all_finite = self
            .log_slope
            .iter()
            .chain(&self.log_offset)
            .chain(&self.lin_slope)
            .chain(&self.lin_offset)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(Error::param("log", "parameters must be finite"));
        }
        Ok(())
    }

    /// A log curve is never an identity over the full input range.
    pub fn is_identity(&self) -> bool {
        false
    }

    pub fn is_noop(&self) -> bool {
        false
    }
}

/// Append a log op. Direction is kept on the op; the renderer picks the
/// forward or inverse formula.
pub fn create_log_op(
    ops: &mut Vec<Op>,
    data: LogOpData,
    direction: TransformDirection,
) -> Result<()> {
    data.validate()?;
    ops.push(Op::new(OpData::new(OpParams::Log(data)), direction));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_base_rejected() {
        assert!(LogOpData::with_base(1.0).validate().is_err());
        assert!(LogOpData::with_base(0.0).validate().is_err());
        assert!(LogOpData::with_base(-10.0).validate().is_err());
        assert!(LogOpData::with_base(10.0).validate().is_ok());
    }

    #[test]
    fn test_zero_slope_rejected() {
        let log = LogOpData::new(10.0, [0.0; 3], [0.0; 3], [1.0; 3], [0.0; 3]);
        assert!(log.validate().is_err());
        let log = LogOpData::new(10.0, [1.0; 3], [0.0; 3], [0.0; 3], [0.0; 3]);
        assert!(log.validate().is_err());
    }
}
