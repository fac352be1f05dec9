//! Dynamic properties — named, shared, mutable pipeline parameters.
//!
//! An op that references a dynamic property (e.g. exposure) can change
//! behavior after the pipeline is finalized, without rebuilding any ops.
//! Properties are shared by relation: finalization unifies all ops created
//! from the same logical parameter onto one instance, so a single `set`
//! is seen by every referencing op.
//!
//! The library does not serialize writers against in-flight `apply` calls;
//! hosts that mutate properties while rendering are responsible for that
//! synchronization.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// The kinds of parameters that can be made dynamic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DynamicPropertyType {
    Exposure,
    Contrast,
    Gamma,
}

impl fmt::Display for DynamicPropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exposure => write!(f, "exposure"),
            Self::Contrast => write!(f, "contrast"),
            Self::Gamma => write!(f, "gamma"),
        }
    }
}

/// A shared mutable scalar referenced by one or more ops.
///
/// A property starts out static; [`make_dynamic`](Self::make_dynamic)
/// marks it as externally mutable, which also makes the owning op
/// ineligible for optimizations that would bake its value in.
#[derive(Debug)]
pub struct DynamicProperty {
    prop_type: DynamicPropertyType,
    value: RwLock<f64>,
    dynamic: AtomicBool,
}

pub type DynamicPropertyHandle = Arc<DynamicProperty>;

impl DynamicProperty {
    pub fn new(prop_type: DynamicPropertyType, value: f64) -> DynamicPropertyHandle {
        Arc::new(Self {
            prop_type,
            value: RwLock::new(value),
            dynamic: AtomicBool::new(false),
        })
    }

    pub fn prop_type(&self) -> DynamicPropertyType {
        self.prop_type
    }

    pub fn get(&self) -> f64 {
        *self.value.read()
    }

    pub fn set(&self, value: f64) {
        *self.value.write() = value;
    }

    /// Whether the value may change after pipeline construction.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic.load(Ordering::Relaxed)
    }

    pub fn make_dynamic(&self) {
        self.dynamic.store(true, Ordering::Relaxed);
    }

    /// Independent copy with the same value and dynamic flag.
    pub fn duplicate(&self) -> DynamicPropertyHandle {
        let copy = Self::new(self.prop_type, self.get());
        if self.is_dynamic() {
            copy.make_dynamic();
        }
        copy
    }
}

/// Equality is by value, not identity: two properties of the same type,
/// value, and dynamic flag compare equal even when not yet unified.
impl PartialEq for DynamicProperty {
    fn eq(&self, other: &Self) -> bool {
        self.prop_type == other.prop_type
            && self.get() == other.get()
            && self.is_dynamic() == other.is_dynamic()
    }
}

impl Serialize for DynamicProperty {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("DynamicProperty", 3)?;
        s.serialize_field("type", &self.prop_type)?;
        s.serialize_field("value", &self.get())?;
        s.serialize_field("dynamic", &self.is_dynamic())?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for DynamicProperty {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(rename = "type")]
            prop_type: DynamicPropertyType,
            value: f64,
            dynamic: bool,
        }
        let raw = Raw::deserialize(deserializer)?;
        let prop = Self {
            prop_type: raw.prop_type,
            value: RwLock::new(raw.value),
            dynamic: AtomicBool::new(raw.dynamic),
        };
        Ok(prop)
    }
}
