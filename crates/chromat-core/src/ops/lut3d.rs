//! 3D LUT op — RGB cube lookup with trilinear interpolation.
//!
//! Entries are ordered blue-fastest: `index = b + edge × (g + edge × r)`.
//! The identity lattice constructor is also what the legacy GPU path
//! renders through a pipeline segment to bake that segment into a
//! texture.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ops::{Op, OpData, OpParams, TransformDirection};

/// Smallest useful cube.
pub const MIN_EDGE_LEN: u32 = 2;
/// Largest cube any target hardware is expected to accept.
pub const MAX_EDGE_LEN: u32 = 129;

/// Validated parameters for a 3D LUT op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lut3dOpData {
    edge_len: u32,
    values: Vec<[f32; 3]>,
}

impl Lut3dOpData {
    pub fn new(edge_len: u32, values: Vec<[f32; 3]>) -> Self {
        Self { edge_len, values }
    }

    /// Identity lattice: grid points uniformly covering the RGB cube.
    pub fn identity(edge_len: u32) -> Self {
        let e = edge_len as usize;
        let last = (edge_len - 1) as f32;
        let mut values = Vec::with_capacity(e * e * e);
        for r in 0..e {
            for g in 0..e {
                for b in 0..e {
                    values.push([r as f32 / last, g as f32 / last, b as f32 / last]);
                }
            }
        }
        Self::new(edge_len, values)
    }

    pub fn edge_len(&self) -> u32 {
        self.edge_len
    }

    pub fn values(&self) -> &[[f32; 3]] {
        &self.values
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_EDGE_LEN..=MAX_EDGE_LEN).contains(&self.edge_len) {
            return Err(Error::param(
                "lut3d",
                format!(
                    "edge length {} outside [{MIN_EDGE_LEN}, {MAX_EDGE_LEN}]",
                    self.edge_len
                ),
            ));
        }
        let expected = (self.edge_len as usize).pow(3);
        if self.values.len() != expected {
            return Err(Error::param(
                "lut3d",
                format!(
                    "cube of edge {} requires {expected} entries, found {}",
                    self.edge_len,
                    self.values.len()
                ),
            ));
        }
        Ok(())
    }

    pub fn is_identity(&self) -> bool {
        const TOL: f32 = 1e-6;
        let lattice = Self::identity(self.edge_len);
        self.values
            .iter()
            .zip(lattice.values.iter())
            .all(|(a, b)| (0..3).all(|c| (a[c] - b[c]).abs() <= TOL))
    }

    /// A 3D lookup clamps its input into the cube, so even an identity
    /// table is not removable.
    pub fn is_noop(&self) -> bool {
        false
    }

    fn entry(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        let e = self.edge_len as usize;
        self.values[b + e * (g + e * r)]
    }

    /// Trilinear sample of one RGB value.
    pub fn sample(&self, rgb: [f32; 3]) -> [f32; 3] {
        let last = (self.edge_len - 1) as f32;
        let mut idx = [0usize; 3];
        let mut frac = [0f32; 3];
        for c in 0..3 {
            let v = (if rgb[c].is_nan() { 0.0 } else { rgb[c].clamp(0.0, 1.0) }) * last;
            let lo = (v.floor() as usize).min(self.edge_len as usize - 2);
            idx[c] = lo;
            frac[c] = v - lo as f32;
        }
        let (r, g, b) = (idx[0], idx[1], idx[2]);
        let mut out = [0f32; 3];
        for c in 0..3 {
            let c000 = self.entry(r, g, b)[c];
            let c001 = self.entry(r, g, b + 1)[c];
            let c010 = self.entry(r, g + 1, b)[c];
            let c011 = self.entry(r, g + 1, b + 1)[c];
            let c100 = self.entry(r + 1, g, b)[c];
            let c101 = self.entry(r + 1, g, b + 1)[c];
            let c110 = self.entry(r + 1, g + 1, b)[c];
            let c111 = self.entry(r + 1, g + 1, b + 1)[c];

            let c00 = c000 + frac[2] * (c001 - c000);
            let c01 = c010 + frac[2] * (c011 - c010);
            let c10 = c100 + frac[2] * (c101 - c100);
            let c11 = c110 + frac[2] * (c111 - c110);

            let c0 = c00 + frac[1] * (c01 - c00);
            let c1 = c10 + frac[1] * (c11 - c10);

            out[c] = c0 + frac[0] * (c1 - c0);
        }
        out
    }
}

/// Append a 3D LUT op. Direction is kept on the op; only forward LUTs can
/// be rendered on the CPU.
pub fn create_lut3d_op(
    ops: &mut Vec<Op>,
    data: Lut3dOpData,
    direction: TransformDirection,
) -> Result<()> {
    data.validate()?;
    ops.push(Op::new(OpData::new(OpParams::Lut3d(data)), direction));
    Ok(())
}
