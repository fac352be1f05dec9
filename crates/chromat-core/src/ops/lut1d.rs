//! 1D LUT op — per-channel value lookup with linear interpolation.
//!
//! Two domain shapes:
//! - **Normal**: N entries sampling [0, 1] uniformly; inputs are clamped
//!   into the domain and interpolated.
//! - **Half**: 65536 entries indexed by the bit pattern of the input
//!   rounded to a 16-bit float. This concentrates samples near the values
//!   an F16 pipeline can actually represent, and is what the optimizer
//!   builds when fusing a separable prefix for an F16 target.
//!
//! An inverse-direction LUT is evaluated by monotonic search (exact
//! style), or baked into an equivalent forward table at finalization
//! (default style).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ops::{Op, OpData, OpParams, TransformDirection};
use crate::BitDepth;

/// Identity tolerance per entry.
const IDENTITY_TOL: f32 = 1e-6;

/// Validated parameters for a 1D LUT op: an RGB output triple per entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lut1dOpData {
    values: Vec<[f32; 3]>,
    half_domain: bool,
}

impl Lut1dOpData {
    pub fn new(values: Vec<[f32; 3]>) -> Self {
        Self {
            values,
            half_domain: false,
        }
    }

    /// Identity LUT over a normal domain.
    pub fn identity(len: usize) -> Self {
        let values = (0..len)
            .map(|i| {
                let v = i as f32 / (len - 1) as f32;
                [v, v, v]
            })
            .collect();
        Self::new(values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[[f32; 3]] {
        &self.values
    }

    pub fn is_half_domain(&self) -> bool {
        self.half_domain
    }

    /// Build the lookup domain for a target input bit depth.
    ///
    /// Integer depths get a uniform [0, 1] ramp with one entry per code;
    /// F16 gets a half-domain table covering every 16-bit float pattern.
    /// F32 has no finite domain and is rejected.
    pub fn make_lookup_domain(depth: BitDepth) -> Result<Self> {
        let len = depth.entry_count().ok_or_else(|| {
            Error::param("lut1d", format!("no lookup domain for {depth} inputs"))
        })?;
        if depth == BitDepth::F16 {
            let values = (0..len)
                .map(|i| {
                    let v = half_bits_to_f32(i as u16);
                    [v, v, v]
                })
                .collect();
            Ok(Self {
                values,
                half_domain: true,
            })
        } else {
            Ok(Self::identity(len))
        }
    }

    /// Evaluate a run of ops over this domain, producing the fused table.
    ///
    /// The domain values are packed into an RGBA buffer (alpha 0), pushed
    /// through each op's pixel path in order, and read back as the new
    /// table. This is the engine of separable-prefix fusion.
    pub fn compose_through(&self, ops: &[Op]) -> Result<Self> {
        let mut buffer: Vec<f32> = Vec::with_capacity(self.values.len() * 4);
        for rgb in &self.values {
            buffer.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 0.0]);
        }
        for op in ops {
            op.apply(&mut buffer)?;
        }
        let values = buffer
            .chunks_exact(4)
            .map(|px| [px[0], px[1], px[2]])
            .collect();
        Ok(Self {
            values,
            half_domain: self.half_domain,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.half_domain {
            if self.values.len() != 65536 {
                return Err(Error::param(
                    "lut1d",
                    format!(
                        "half-domain table must have 65536 entries, found {}",
                        self.values.len()
                    ),
                ));
            }
        } else {
            if self.values.len() < 2 {
                return Err(Error::param(
                    "lut1d",
                    format!("table must have at least 2 entries, found {}", self.values.len()),
                ));
            }
            if self
                .values
                .iter()
                .flatten()
                .any(|v| v.is_nan() || v.is_infinite())
            {
                return Err(Error::param("lut1d", "table values must be finite"));
            }
        }
        Ok(())
    }

    /// Table equals its own domain, entry for entry.
    pub fn is_identity(&self) -> bool {
        if self.half_domain {
            self.values.iter().enumerate().all(|(i, rgb)| {
                let domain = half_bits_to_f32(i as u16);
                // Bit equality covers the NaN and infinity codes, which a
                // true identity passes through unchanged.
                rgb.iter().all(|&v| {
                    v.to_bits() == domain.to_bits() || (v - domain).abs() <= IDENTITY_TOL
                })
            })
        } else {
            let last = (self.values.len() - 1) as f32;
            self.values.iter().enumerate().all(|(i, rgb)| {
                let domain = i as f32 / last;
                rgb.iter().all(|&v| (v - domain).abs() <= IDENTITY_TOL)
            })
        }
    }

    pub fn is_noop(&self) -> bool {
        // A normal-domain lookup clamps its input into [0, 1].
        self.half_domain && self.is_identity()
    }

    /// Forward lookup of one component.
    pub fn eval_fwd(&self, channel: usize, v: f32) -> f32 {
        if self.half_domain {
            return self.values[f32_to_half_bits(v) as usize][channel];
        }
        let last = (self.values.len() - 1) as f32;
        let t = (if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }) * last;
        let lo = t.floor() as usize;
        let hi = (lo + 1).min(self.values.len() - 1);
        let frac = t - lo as f32;
        let a = self.values[lo][channel];
        let b = self.values[hi][channel];
        a + frac * (b - a)
    }

    /// Inverse lookup by binary search, assuming per-channel monotonic
    /// non-decreasing values. Out-of-range inputs clamp to the table ends.
    pub fn eval_rev(&self, channel: usize, v: f32) -> Result<f32> {
        if self.half_domain {
            return Err(Error::Internal(
                "inverse evaluation of a half-domain LUT is not supported".into(),
            ));
        }
        Ok(self.eval_rev_normal(channel, v))
    }

    /// Inverse lookup over a normal domain. The renderer dispatch rejects
    /// inverse half-domain LUTs before construction.
    pub(crate) fn eval_rev_normal(&self, channel: usize, v: f32) -> f32 {
        let last = (self.values.len() - 1) as f32;
        let v = if v.is_nan() { self.values[0][channel] } else { v };
        let hi = self.values.partition_point(|rgb| rgb[channel] < v);
        if hi == 0 {
            return 0.0;
        }
        if hi == self.values.len() {
            return 1.0;
        }
        let lo = hi - 1;
        let a = self.values[lo][channel];
        let b = self.values[hi][channel];
        let frac = if b > a { (v - a) / (b - a) } else { 0.0 };
        (lo as f32 + frac) / last
    }

    /// Bake the inverse into a forward table.
    ///
    /// Used by default-style finalization so rendering never pays the
    /// per-pixel search cost. The inverse's knots do not line up with a
    /// uniform grid, so the bake samples at no less than 256 entries to
    /// keep the knot-misalignment error small.
    pub fn invert_to_forward(&self) -> Result<Self> {
        let len = self.values.len().max(256);
        let mut values = Vec::with_capacity(len);
        for i in 0..len {
            let t = i as f32 / (len - 1) as f32;
            values.push([
                self.eval_rev(0, t)?,
                self.eval_rev(1, t)?,
                self.eval_rev(2, t)?,
            ]);
        }
        Ok(Self::new(values))
    }
}

/// Append a 1D LUT op. Direction is kept on the op.
pub fn create_lut1d_op(
    ops: &mut Vec<Op>,
    data: Lut1dOpData,
    direction: TransformDirection,
) -> Result<()> {
    data.validate()?;
    ops.push(Op::new(OpData::new(OpParams::Lut1d(data)), direction));
    Ok(())
}

// ── Half-float conversion ───────────────────────────────────────────
//
// Only the two directions needed for half-domain tables; round-to-nearest
// on encode, standard IEEE 754 binary16 layout.

/// Decode a 16-bit float bit pattern to f32.
pub fn half_bits_to_f32(bits: u16) -> f32 {
    let sign = u32::from(bits >> 15) << 31;
    let exp = u32::from((bits >> 10) & 0x1f);
    let mant = u32::from(bits & 0x3ff);

    let magnitude = if exp == 0 {
        if mant == 0 {
            0
        } else {
            // Subnormal: value = mant × 2^-24.
            let shift = mant.leading_zeros() - 21;
            let mant = (mant << shift) & 0x3ff;
            let exp = 127 - 14 - shift;
            (exp << 23) | (mant << 13)
        }
    } else if exp == 0x1f {
        0x7f80_0000 | (mant << 13)
    } else {
        ((exp + 127 - 15) << 23) | (mant << 13)
    };

    f32::from_bits(sign | magnitude)
}

/// Encode an f32 to the nearest 16-bit float bit pattern.
pub fn f32_to_half_bits(v: f32) -> u16 {
    let bits = v.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp = ((bits >> 23) & 0xff) as i32;
    let mant = bits & 0x7f_ffff;

    if exp == 0xff {
        // Inf / NaN.
        let payload = if mant != 0 { 0x200 } else { 0 };
        return sign | 0x7c00 | payload;
    }

    let unbiased = exp - 127;
    if unbiased > 15 {
        return sign | 0x7c00; // Overflow to infinity.
    }
    if unbiased >= -14 {
        // Normal range: round mantissa to 10 bits.
        let mant16 = (mant + 0x1000) >> 13;
        let half = (((unbiased + 15) as u32) << 10) + mant16;
        return sign | half as u16;
    }
    if unbiased >= -25 {
        // Subnormal range.
        let mant = mant | 0x80_0000;
        let shift = (-14 - unbiased) as u32;
        let mant16 = (mant >> (13 + shift)) as u16;
        let round_bit = 1u32 << (12 + shift);
        let rounded = if mant & round_bit != 0 { mant16 + 1 } else { mant16 };
        return sign | rounded;
    }
    sign // Underflow to zero.
}
