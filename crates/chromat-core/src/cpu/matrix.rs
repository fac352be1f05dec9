//! Matrix renderers.
//!
//! The general path runs `glam`'s SIMD-backed `Mat4 × Vec4`; a diagonal
//! matrix gets a multiply-add specialization that skips the full product.

use glam::{Mat4, Vec4};

use crate::cpu::CpuRenderer;
use crate::ops::MatrixOpData;

struct MatrixRenderer {
    matrix: Mat4,
    offsets: Vec4,
}

impl CpuRenderer for MatrixRenderer {
    fn name(&self) -> &'static str {
        "Matrix"
    }

    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            let v = self.matrix * Vec4::from_slice(px) + self.offsets;
            v.write_to_slice(px);
        }
    }
}

struct MatrixDiagonalRenderer {
    scale: Vec4,
    offsets: Vec4,
}

impl CpuRenderer for MatrixDiagonalRenderer {
    fn name(&self) -> &'static str {
        "MatrixDiagonal"
    }

    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            let v = Vec4::from_slice(px) * self.scale + self.offsets;
            v.write_to_slice(px);
        }
    }
}

pub fn renderer(data: &MatrixOpData) -> Box<dyn CpuRenderer> {
    let offsets = data.offsets().map(|v| v as f32);
    let offsets = Vec4::from_array(offsets);
    if data.is_diagonal() {
        let scale = Vec4::new(
            data.value(0, 0) as f32,
            data.value(1, 1) as f32,
            data.value(2, 2) as f32,
            data.value(3, 3) as f32,
        );
        Box::new(MatrixDiagonalRenderer { scale, offsets })
    } else {
        Box::new(MatrixRenderer {
            matrix: data.matrix().as_mat4(),
            offsets,
        })
    }
}
