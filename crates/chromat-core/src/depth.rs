//! Bit-depth metadata for pixel encodings.
//!
//! Pixel processing is always f32; a [`BitDepth`] describes the encoding a
//! buffer was (or will be) stored in. It drives the sizing of lookup
//! domains when the optimizer bakes a run of ops into a 1D LUT.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported pixel bit depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitDepth {
    /// 8-bit unsigned integer.
    U8,
    /// 10-bit unsigned integer.
    U10,
    /// 12-bit unsigned integer.
    U12,
    /// 16-bit unsigned integer.
    U16,
    /// 16-bit floating point.
    F16,
    /// 32-bit floating point.
    F32,
}

impl BitDepth {
    /// Maximum representable code value, as a float.
    ///
    /// For float depths this is 1.0 since processing is normalized.
    pub const fn max_value(self) -> f64 {
        match self {
            Self::U8 => 255.0,
            Self::U10 => 1023.0,
            Self::U12 => 4095.0,
            Self::U16 => 65535.0,
            Self::F16 | Self::F32 => 1.0,
        }
    }

    /// Number of distinct code values, used to size lookup domains.
    ///
    /// F16 counts every half-float bit pattern; F32 has no useful finite
    /// domain and returns `None`.
    pub const fn entry_count(self) -> Option<usize> {
        match self {
            Self::U8 => Some(256),
            Self::U10 => Some(1024),
            Self::U12 => Some(4096),
            Self::U16 => Some(65536),
            Self::F16 => Some(65536),
            Self::F32 => None,
        }
    }

    /// Whether this is a floating-point encoding.
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F16 | Self::F32)
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8 => write!(f, "8-bit"),
            Self::U10 => write!(f, "10-bit"),
            Self::U12 => write!(f, "12-bit"),
            Self::U16 => write!(f, "16-bit"),
            Self::F16 => write!(f, "16-bit float"),
            Self::F32 => write!(f, "32-bit float"),
        }
    }
}
