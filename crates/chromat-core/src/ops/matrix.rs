//! Matrix op — 4×4 linear transform plus per-channel offsets.
//!
//! Parameters are held in f64 and only dropped to f32 inside the renderer.
//! Composition and inversion are exact-comparison friendly: results are
//! cleaned up so values that land within tolerance of an integer become
//! that integer, which lets a matrix composed with its inverse be
//! recognized as an identity.

use glam::{DMat4, DVec4};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ops::{Op, OpData, OpParams, TransformDirection};

/// Absolute tolerance used for the diagonal identity test.
const IDENTITY_TOL: f64 = 1e-6;

/// Validated parameters for a matrix op.
///
/// The linear part is always 4×4 by construction; 3×3 inputs are expanded
/// with an identity alpha row/column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixOpData {
    /// Linear transform. Stored column-major by `glam`; the public
    /// accessors speak row-major like the on-disk transform formats.
    matrix: DMat4,
    /// Post-multiply offsets, RGBA.
    offsets: DVec4,
}

impl Default for MatrixOpData {
    fn default() -> Self {
        Self::identity()
    }
}

impl MatrixOpData {
    pub fn identity() -> Self {
        Self {
            matrix: DMat4::IDENTITY,
            offsets: DVec4::ZERO,
        }
    }

    /// Build from 16 row-major values.
    pub fn from_rgba(values: &[f64; 16]) -> Self {
        Self {
            matrix: DMat4::from_cols_array(values).transpose(),
            offsets: DVec4::ZERO,
        }
    }

    /// Build from 9 row-major values, expanding to 4×4 with identity alpha.
    pub fn from_rgb(values: &[f64; 9]) -> Self {
        let m = [
            values[0], values[1], values[2], 0.0,
            values[3], values[4], values[5], 0.0,
            values[6], values[7], values[8], 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self::from_rgba(&m)
    }

    /// Uniform RGBA scale.
    pub fn diagonal(values: &[f64; 4]) -> Self {
        Self {
            matrix: DMat4::from_diagonal(DVec4::from_array(*values)),
            offsets: DVec4::ZERO,
        }
    }

    pub fn with_offsets(mut self, offsets: [f64; 4]) -> Self {
        self.offsets = DVec4::from_array(offsets);
        self
    }

    /// Row-major copy of the 16 matrix values.
    pub fn to_rgba(&self) -> [f64; 16] {
        self.matrix.transpose().to_cols_array()
    }

    pub fn offsets(&self) -> [f64; 4] {
        self.offsets.to_array()
    }

    pub fn matrix(&self) -> DMat4 {
        self.matrix
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: f64) {
        self.matrix.col_mut(col)[row] = value;
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.matrix.col(col)[row]
    }

    pub fn validate(&self) -> Result<()> {
        let all_finite = self
            .matrix
            .to_cols_array()
            .iter()
            .chain(self.offsets.to_array().iter())
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(Error::param("matrix", "values must be finite"));
        }
        Ok(())
    }

    pub fn has_offsets(&self) -> bool {
        self.offsets != DVec4::ZERO
    }

    /// Off-diagonal elements are strictly zero.
    pub fn is_diagonal(&self) -> bool {
        for row in 0..4 {
            for col in 0..4 {
                if row != col && self.value(row, col) != 0.0 {
                    return false;
                }
            }
        }
        true
    }

    /// Whether the transform touches the alpha channel.
    pub fn has_alpha(&self) -> bool {
        let m = self.to_rgba();
        // Last column.
        m[3] != 0.0 || m[7] != 0.0 || m[11] != 0.0
            // Bottom row.
            || m[12] != 0.0 || m[13] != 0.0 || m[14] != 0.0
            || (m[15] - 1.0).abs() > IDENTITY_TOL
            || self.offsets.w != 0.0
    }

    /// Identity within tolerance on the diagonal, strict zero elsewhere.
    pub fn is_identity(&self) -> bool {
        if self.has_offsets() || !self.is_diagonal() {
            return false;
        }
        (0..4).all(|i| (self.value(i, i) - 1.0).abs() <= IDENTITY_TOL)
    }

    /// A matrix is a no-op exactly when it is an identity; it never clamps.
    pub fn is_noop(&self) -> bool {
        self.is_identity()
    }

    pub fn has_channel_crosstalk(&self) -> bool {
        !self.is_diagonal()
    }

    /// Functional composition: `self` applied first, then `other`.
    ///
    /// The result is cleaned up so that near-integer values become exact,
    /// allowing a matrix composed with its inverse to compare equal to the
    /// identity under the strict predicates above.
    pub fn compose(&self, other: &Self) -> Self {
        let matrix = other.matrix * self.matrix;
        let rotated = other.matrix * self.offsets;

        // Estimate offset magnitude before the add, where catastrophic
        // cancellation may occur, so the cleanup tolerance is scaled to
        // the inputs rather than the possibly tiny result.
        let max_offset = rotated
            .abs()
            .max(other.offsets.abs())
            .max_element();

        let offsets = rotated + other.offsets;

        let mut out = Self { matrix, offsets };
        out.clean_up(max_offset);
        out
    }

    /// Analytic inverse of the transform (matrix and offsets).
    pub fn inverse(&self) -> Result<Self> {
        if self.matrix.determinant().abs() < f64::MIN_POSITIVE {
            return Err(Error::SingularMatrix);
        }
        let inv = self.matrix.inverse();
        if !inv.to_cols_array().iter().all(|v| v.is_finite()) {
            return Err(Error::SingularMatrix);
        }
        Ok(Self {
            matrix: inv,
            offsets: -(inv * self.offsets),
        })
    }

    /// Snap values within a scaled tolerance of an integer to that integer.
    fn clean_up(&mut self, offset_scale: f64) {
        let max_val = self
            .matrix
            .to_cols_array()
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let tol = max_val.max(1e-4) * 1e-6;

        let mut vals = self.matrix.to_cols_array();
        for v in &mut vals {
            let rounded = v.round();
            if (*v - rounded).abs() < tol {
                *v = rounded;
            }
        }
        self.matrix = DMat4::from_cols_array(&vals);

        let tol = offset_scale.max(1e-4) * 1e-6;
        let mut offs = self.offsets.to_array();
        for v in &mut offs {
            let rounded = v.round();
            if (*v - rounded).abs() < tol {
                *v = rounded;
            }
        }
        self.offsets = DVec4::from_array(offs);
    }

    /// Transform one RGBA value (used by table baking, not the hot loop).
    pub fn transform(&self, rgba: [f64; 4]) -> [f64; 4] {
        (self.matrix * DVec4::from_array(rgba) + self.offsets).to_array()
    }
}

/// Append a matrix op, resolving an inverse direction into the data so the
/// stored op is always forward.
pub fn create_matrix_op(
    ops: &mut Vec<Op>,
    data: MatrixOpData,
    direction: TransformDirection,
) -> Result<()> {
    data.validate()?;
    let data = match direction {
        TransformDirection::Forward => data,
        TransformDirection::Inverse => data.inverse()?,
    };
    ops.push(Op::forward(OpData::new(OpParams::Matrix(data))));
    Ok(())
}
