//! Chromat Core — color-transform pipeline engine.
//!
//! This crate contains the op data model, the pipeline optimizer, and the
//! CPU renderer dispatch. A transform is an ordered list of elementary ops
//! (matrix, range, gamma, log, CDL, lookup tables, fixed functions); the
//! optimizer rewrites the list into an equivalent cheaper one, and the
//! finalized pipeline applies it to packed RGBA float buffers. No GPU or
//! framework dependencies; shader generation lives in `chromat-gpu`.

pub mod cpu;
pub mod depth;
pub mod dynamic;
pub mod error;
pub mod ops;
pub mod optimizer;
pub mod pipeline;

// Re-exports for convenience.
pub use depth::BitDepth;
pub use dynamic::{DynamicProperty, DynamicPropertyHandle, DynamicPropertyType};
pub use error::{Error, Result};
pub use ops::{Op, OpData, OpKind, TransformDirection};
pub use pipeline::{FinalizationFlags, OptimizationFlags, Pipeline};
