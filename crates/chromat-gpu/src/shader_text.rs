//! Shader source text builder.
//!
//! A thin line writer that hides the syntax differences between the
//! supported shading languages: type keywords, vector constructors, and
//! texture sampling calls. Ops build their fragments through this so the
//! emission code stays language-neutral.

/// Target shading language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuLanguage {
    /// OpenGL GLSL (3.30-style syntax).
    Glsl,
    /// WebGPU WGSL.
    Wgsl,
}

impl GpuLanguage {
    pub fn vec4_keyword(self) -> &'static str {
        match self {
            Self::Glsl => "vec4",
            Self::Wgsl => "vec4<f32>",
        }
    }

    pub fn vec3_keyword(self) -> &'static str {
        match self {
            Self::Glsl => "vec3",
            Self::Wgsl => "vec3<f32>",
        }
    }

    pub fn float_keyword(self) -> &'static str {
        match self {
            Self::Glsl => "float",
            Self::Wgsl => "f32",
        }
    }
}

/// Accumulates indented shader source lines.
pub struct GpuShaderText {
    language: GpuLanguage,
    text: String,
    indent: usize,
}

impl GpuShaderText {
    pub fn new(language: GpuLanguage) -> Self {
        Self {
            language,
            text: String::new(),
            indent: 0,
        }
    }

    pub fn language(&self) -> GpuLanguage {
        self.language
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Append one line at the current indentation.
    pub fn line(&mut self, content: impl AsRef<str>) {
        let content = content.as_ref();
        if content.is_empty() {
            self.text.push('\n');
            return;
        }
        for _ in 0..self.indent {
            self.text.push_str("    ");
        }
        self.text.push_str(content);
        self.text.push('\n');
    }

    /// Shortest round-trip literal; always valid in both languages.
    pub fn float_const(v: f32) -> String {
        if v == v.trunc() && v.abs() < 1e9 {
            format!("{v:.1}")
        } else {
            format!("{v:?}")
        }
    }

    pub fn vec3_const(&self, v: [f32; 3]) -> String {
        format!(
            "{}({}, {}, {})",
            self.language.vec3_keyword(),
            Self::float_const(v[0]),
            Self::float_const(v[1]),
            Self::float_const(v[2]),
        )
    }

    pub fn vec4_const(&self, v: [f32; 4]) -> String {
        format!(
            "{}({}, {}, {}, {})",
            self.language.vec4_keyword(),
            Self::float_const(v[0]),
            Self::float_const(v[1]),
            Self::float_const(v[2]),
            Self::float_const(v[3]),
        )
    }

    /// Declaration for a scalar uniform.
    pub fn uniform_float_decl(&self, name: &str) -> String {
        match self.language {
            GpuLanguage::Glsl => format!("uniform float {name};"),
            GpuLanguage::Wgsl => format!("var<uniform> {name}: f32;"),
        }
    }

    /// Declaration for a 3D texture plus its sampler.
    pub fn texture3d_decl(&self, name: &str) -> String {
        match self.language {
            GpuLanguage::Glsl => format!("uniform sampler3D {name};"),
            GpuLanguage::Wgsl => {
                format!("var {name}: texture_3d<f32>;\nvar {name}_sampler: sampler;")
            }
        }
    }

    /// Declaration for a 1D texture plus its sampler.
    pub fn texture1d_decl(&self, name: &str) -> String {
        match self.language {
            GpuLanguage::Glsl => format!("uniform sampler1D {name};"),
            GpuLanguage::Wgsl => {
                format!("var {name}: texture_1d<f32>;\nvar {name}_sampler: sampler;")
            }
        }
    }

    /// Sampling expression for a 3D texture at `coords` (a vec3).
    pub fn sample_texture3d(&self, name: &str, coords: &str) -> String {
        match self.language {
            GpuLanguage::Glsl => format!("texture({name}, {coords}).rgb"),
            GpuLanguage::Wgsl => {
                format!("textureSampleLevel({name}, {name}_sampler, {coords}, 0.0).rgb")
            }
        }
    }

    /// Sampling expression for a 1D texture at a scalar coordinate.
    pub fn sample_texture1d(&self, name: &str, coord: &str) -> String {
        match self.language {
            GpuLanguage::Glsl => format!("texture({name}, {coord})"),
            GpuLanguage::Wgsl => {
                format!("textureSampleLevel({name}, {name}_sampler, {coord}, 0.0)")
            }
        }
    }

    pub fn into_string(self) -> String {
        self.text
    }
}
