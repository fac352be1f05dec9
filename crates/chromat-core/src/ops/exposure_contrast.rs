//! Exposure/contrast op — scene-linear exposure and pivoted contrast.
//!
//! ```text
//! forward: v   = in × 2^exposure
//!          out = pivot × max(0, v / pivot) ^ (contrast × gamma)
//! ```
//!
//! Exposure, contrast, and gamma are held as dynamic properties: once one
//! is marked dynamic, its value may be changed after finalization and is
//! re-read on every apply. Finalization unifies properties across ops so
//! that ops built from the same logical parameter share one cell.

use serde::{Deserialize, Serialize};

use crate::dynamic::{DynamicProperty, DynamicPropertyHandle, DynamicPropertyType};
use crate::error::{Error, Result};
use crate::ops::{Op, OpData, OpParams, TransformDirection};

/// Parameters for an exposure/contrast op.
///
/// Equality is by value: unified and non-unified handles with the same
/// contents compare equal.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExposureContrastOpData {
    exposure: DynamicPropertyHandle,
    contrast: DynamicPropertyHandle,
    gamma: DynamicPropertyHandle,
    pivot: f64,
}

impl ExposureContrastOpData {
    pub fn new(exposure: f64, contrast: f64, gamma: f64, pivot: f64) -> Self {
        Self {
            exposure: DynamicProperty::new(DynamicPropertyType::Exposure, exposure),
            contrast: DynamicProperty::new(DynamicPropertyType::Contrast, contrast),
            gamma: DynamicProperty::new(DynamicPropertyType::Gamma, gamma),
            pivot,
        }
    }

    pub fn exposure(&self) -> &DynamicPropertyHandle {
        &self.exposure
    }

    pub fn contrast(&self) -> &DynamicPropertyHandle {
        &self.contrast
    }

    pub fn gamma(&self) -> &DynamicPropertyHandle {
        &self.gamma
    }

    pub fn pivot(&self) -> f64 {
        self.pivot
    }

    /// Handle for one of this op's properties.
    pub fn property(&self, prop_type: DynamicPropertyType) -> &DynamicPropertyHandle {
        match prop_type {
            DynamicPropertyType::Exposure => &self.exposure,
            DynamicPropertyType::Contrast => &self.contrast,
            DynamicPropertyType::Gamma => &self.gamma,
        }
    }

    /// Replace one property handle with a shared instance (unification).
    pub(crate) fn set_property(&mut self, handle: DynamicPropertyHandle) {
        match handle.prop_type() {
            DynamicPropertyType::Exposure => self.exposure = handle,
            DynamicPropertyType::Contrast => self.contrast = handle,
            DynamicPropertyType::Gamma => self.gamma = handle,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.pivot.is_finite() || self.pivot <= 0.0 {
            return Err(Error::param(
                "exposure_contrast",
                format!("pivot {} must be greater than zero", self.pivot),
            ));
        }
        let gamma = self.gamma.get();
        if !gamma.is_finite() || gamma <= 0.0 {
            return Err(Error::param(
                "exposure_contrast",
                format!("gamma {gamma} must be greater than zero"),
            ));
        }
        let contrast = self.contrast.get();
        if !contrast.is_finite() || contrast <= 0.0 {
            return Err(Error::param(
                "exposure_contrast",
                format!("contrast {contrast} must be greater than zero"),
            ));
        }
        if !self.exposure.get().is_finite() {
            return Err(Error::param("exposure_contrast", "exposure must be finite"));
        }
        Ok(())
    }

    pub fn is_dynamic(&self) -> bool {
        self.exposure.is_dynamic() || self.contrast.is_dynamic() || self.gamma.is_dynamic()
    }

    /// Neutral parameters, and none dynamic (a dynamic op may change later
    /// so it can never be optimized away).
    pub fn is_identity(&self) -> bool {
        !self.is_dynamic()
            && self.exposure.get() == 0.0
            && self.contrast.get() * self.gamma.get() == 1.0
    }

    /// The identity path applies no contrast curve and therefore no clamp.
    pub fn is_noop(&self) -> bool {
        self.is_identity()
    }

    pub fn is_inverse(&self, other: &Self) -> bool {
        // Dynamic ops may diverge after finalization.
        !self.is_dynamic() && !other.is_dynamic() && self == other
    }
}

impl Clone for ExposureContrastOpData {
    /// Deep copy: clones get their own property cells. Sharing is
    /// re-established by unification, never by cloning.
    fn clone(&self) -> Self {
        Self {
            exposure: self.exposure.duplicate(),
            contrast: self.contrast.duplicate(),
            gamma: self.gamma.duplicate(),
            pivot: self.pivot,
        }
    }
}

impl PartialEq for ExposureContrastOpData {
    fn eq(&self, other: &Self) -> bool {
        *self.exposure == *other.exposure
            && *self.contrast == *other.contrast
            && *self.gamma == *other.gamma
            && self.pivot == other.pivot
    }
}

/// Append an exposure/contrast op. Direction is kept on the op.
pub fn create_exposure_contrast_op(
    ops: &mut Vec<Op>,
    data: ExposureContrastOpData,
    direction: TransformDirection,
) -> Result<()> {
    data.validate()?;
    ops.push(Op::new(
        OpData::new(OpParams::ExposureContrast(data)),
        direction,
    ));
    Ok(())
}
