//! Shader descriptor — what the caller supplies and what comes back.
//!
//! The caller picks the language, function name, and mode (modern, or
//! legacy with a 3D-texture edge length). Ops fill the descriptor with
//! declarations, function body code, uniforms, and texture payloads;
//! `finalize` dedupes declarations and assembles the complete source.

use chromat_core::DynamicPropertyHandle;

use crate::shader_text::{GpuLanguage, GpuShaderText};

/// Extraction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderMode {
    /// Every op emits its own fragment.
    Modern,
    /// Fixed-function target: at most one baked 3D lookup of the given
    /// edge length, plus analytically expressible ops around it.
    Legacy { edge_len: u32 },
}

/// A scalar uniform backed by a dynamic property.
///
/// The host reads `handle` each frame to upload the current value.
pub struct GpuUniform {
    pub name: String,
    pub handle: DynamicPropertyHandle,
}

/// A baked 3D texture payload (RGB triples, blue-fastest).
pub struct GpuTexture3d {
    pub name: String,
    pub edge_len: u32,
    pub values: Vec<[f32; 3]>,
}

/// A 1D LUT texture payload (RGB triples).
pub struct GpuTexture1d {
    pub name: String,
    pub values: Vec<[f32; 3]>,
}

/// Accumulates everything the host needs to run the generated shader.
pub struct GpuShaderDesc {
    language: GpuLanguage,
    function_name: String,
    pixel_name: String,
    mode: ShaderMode,
    resource_index: usize,
    declarations: Vec<String>,
    function_body: String,
    uniforms: Vec<GpuUniform>,
    textures_3d: Vec<GpuTexture3d>,
    textures_1d: Vec<GpuTexture1d>,
    shader_text: Option<String>,
}

impl GpuShaderDesc {
    pub fn new(language: GpuLanguage, function_name: impl Into<String>, mode: ShaderMode) -> Self {
        Self {
            language,
            function_name: function_name.into(),
            pixel_name: "outColor".into(),
            mode,
            resource_index: 0,
            declarations: Vec::new(),
            function_body: String::new(),
            uniforms: Vec::new(),
            textures_3d: Vec::new(),
            textures_1d: Vec::new(),
            shader_text: None,
        }
    }

    pub fn language(&self) -> GpuLanguage {
        self.language
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Name of the working pixel variable inside the function.
    pub fn pixel_name(&self) -> &str {
        &self.pixel_name
    }

    pub fn mode(&self) -> ShaderMode {
        self.mode
    }

    /// Fresh name for a texture or uniform resource.
    pub fn next_resource_name(&mut self, stem: &str) -> String {
        let name = format!("{}_{stem}_{}", self.function_name, self.resource_index);
        self.resource_index += 1;
        name
    }

    /// Add a declaration line; exact duplicates collapse at finalize.
    pub fn add_declaration(&mut self, decl: impl Into<String>) {
        self.declarations.push(decl.into());
    }

    /// Append fragment code to the function body.
    pub fn add_function_code(&mut self, code: &str) {
        self.function_body.push_str(code);
    }

    /// Register a dynamic-property uniform. Ops unified onto one property
    /// share a name, so repeats collapse here.
    pub fn add_uniform(&mut self, name: &str, handle: DynamicPropertyHandle) {
        if self.uniforms.iter().any(|u| u.name == name) {
            return;
        }
        let ss = GpuShaderText::new(self.language);
        self.add_declaration(ss.uniform_float_decl(name));
        self.uniforms.push(GpuUniform {
            name: name.into(),
            handle,
        });
    }

    pub fn add_texture_3d(&mut self, texture: GpuTexture3d) {
        let ss = GpuShaderText::new(self.language);
        self.add_declaration(ss.texture3d_decl(&texture.name));
        self.textures_3d.push(texture);
    }

    pub fn add_texture_1d(&mut self, texture: GpuTexture1d) {
        let ss = GpuShaderText::new(self.language);
        self.add_declaration(ss.texture1d_decl(&texture.name));
        self.textures_1d.push(texture);
    }

    pub fn uniforms(&self) -> &[GpuUniform] {
        &self.uniforms
    }

    pub fn textures_3d(&self) -> &[GpuTexture3d] {
        &self.textures_3d
    }

    pub fn textures_1d(&self) -> &[GpuTexture1d] {
        &self.textures_1d
    }

    /// Assemble the final source: deduped declarations, the generated
    /// function header (copies the input into the working pixel), the
    /// accumulated body, and the return footer.
    pub fn finalize(&mut self) {
        let mut ss = GpuShaderText::new(self.language);

        let mut seen = std::collections::HashSet::new();
        for decl in &self.declarations {
            if seen.insert(decl.as_str()) {
                ss.line(decl);
            }
        }
        ss.line("");

        let vec4 = self.language.vec4_keyword();
        match self.language {
            GpuLanguage::Glsl => {
                ss.line(format!(
                    "{vec4} {}(in {vec4} inPixel)",
                    self.function_name
                ));
            }
            GpuLanguage::Wgsl => {
                ss.line(format!(
                    "fn {}(inPixel: {vec4}) -> {vec4}",
                    self.function_name
                ));
            }
        }
        ss.line("{");
        ss.indent();
        match self.language {
            GpuLanguage::Glsl => ss.line(format!("{vec4} {} = inPixel;", self.pixel_name)),
            GpuLanguage::Wgsl => ss.line(format!("var {}: {vec4} = inPixel;", self.pixel_name)),
        }
        ss.dedent();

        let mut text = ss.into_string();
        text.push_str(&self.function_body);

        let mut footer = GpuShaderText::new(self.language);
        footer.indent();
        footer.line(format!("return {};", self.pixel_name));
        footer.dedent();
        footer.line("}");
        text.push_str(&footer.into_string());

        self.shader_text = Some(text);
    }

    /// Complete source, available after [`finalize`](Self::finalize).
    pub fn shader_text(&self) -> Option<&str> {
        self.shader_text.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chromat_core::{DynamicProperty, DynamicPropertyType};

    #[test]
    fn test_finalize_wraps_body_in_function() {
        let mut desc = GpuShaderDesc::new(GpuLanguage::Glsl, "apply_transform", ShaderMode::Modern);
        desc.add_function_code("    outColor.rgb = outColor.rgb * vec3(2.0, 2.0, 2.0);\n");
        desc.finalize();
        let text = desc.shader_text().unwrap();
        assert!(text.contains("vec4 apply_transform(in vec4 inPixel)"));
        assert!(text.contains("vec4 outColor = inPixel;"));
        assert!(text.contains("* vec3(2.0, 2.0, 2.0);"));
        assert!(text.contains("return outColor;"));
    }

    #[test]
    fn test_duplicate_declarations_collapse() {
        let mut desc = GpuShaderDesc::new(GpuLanguage::Glsl, "fn0", ShaderMode::Modern);
        desc.add_declaration("uniform float fn0_exposure;");
        desc.add_declaration("uniform float fn0_exposure;");
        desc.finalize();
        let text = desc.shader_text().unwrap();
        assert_eq!(text.matches("uniform float fn0_exposure;").count(), 1);
    }

    #[test]
    fn test_uniforms_dedupe_by_name() {
        let mut desc = GpuShaderDesc::new(GpuLanguage::Glsl, "fn0", ShaderMode::Modern);
        let prop = DynamicProperty::new(DynamicPropertyType::Exposure, 0.5);
        desc.add_uniform("fn0_exposure", prop.clone());
        desc.add_uniform("fn0_exposure", prop);
        assert_eq!(desc.uniforms().len(), 1);
    }

    #[test]
    fn test_resource_names_are_unique() {
        let mut desc = GpuShaderDesc::new(GpuLanguage::Glsl, "fn0", ShaderMode::Modern);
        let a = desc.next_resource_name("lut3d");
        let b = desc.next_resource_name("lut3d");
        assert_ne!(a, b);
    }

    #[test]
    fn test_wgsl_function_shape() {
        let mut desc = GpuShaderDesc::new(GpuLanguage::Wgsl, "apply_transform", ShaderMode::Modern);
        desc.finalize();
        let text = desc.shader_text().unwrap();
        assert!(text.contains("fn apply_transform(inPixel: vec4<f32>) -> vec4<f32>"));
        assert!(text.contains("var outColor: vec4<f32> = inPixel;"));
    }
}
