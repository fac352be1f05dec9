//! Chromat GPU — shader program generation for finalized pipelines.
//!
//! Walks a finalized op list and builds a shader function that reproduces
//! the CPU result within float tolerance. Two paths:
//!
//! - **Modern**: every op appends its own source fragment (plus uniform
//!   and texture declarations) into a shared descriptor.
//! - **Legacy**: for fixed-function targets with a single 3D-texture
//!   budget, the list is partitioned into a hardware prefix, a baked
//!   middle (rendered through the CPU renderers into a 3D LUT), and a
//!   hardware postfix, then re-optimized and emitted as above.

pub mod descriptor;
pub mod emit;
pub mod extractor;
pub mod shader_text;

pub use descriptor::{GpuShaderDesc, GpuTexture1d, GpuTexture3d, GpuUniform, ShaderMode};
pub use extractor::extract_shader_info;
pub use shader_text::{GpuLanguage, GpuShaderText};

/// Shader generation failures.
///
/// Parameter and structural errors from the core crate pass through;
/// emission errors cover ops the requested path cannot express.
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error(transparent)]
    Core(#[from] chromat_core::Error),
    #[error("shader emission: {0}")]
    Emit(String),
}

pub type Result<T> = std::result::Result<T, ShaderError>;
