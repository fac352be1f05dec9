//! Per-op shader fragment emission.
//!
//! Each op appends a brace-scoped fragment to the descriptor's function
//! body, so fragment locals never collide. WGSL does not allow swizzle
//! assignment, so RGB-only updates go through `assign_rgb`, which
//! rebuilds the pixel with the untouched alpha on that language.

use chromat_core::ops::cdl::LUMA_REC709;
use chromat_core::ops::fixed_function::LUMA_REC2100;
use chromat_core::ops::{
    CdlOpData, ExposureContrastOpData, FixedFunctionOpData, GammaOpData, GammaStyle, LogOpData,
    Lut1dOpData, Lut3dOpData, MatrixOpData, Op, OpParams, RangeOpData,
};
use chromat_core::TransformDirection;

use crate::descriptor::{GpuShaderDesc, GpuTexture1d, GpuTexture3d};
use crate::shader_text::{GpuLanguage, GpuShaderText};
use crate::{Result, ShaderError};

/// Append the fragment for one op.
pub fn emit_op(desc: &mut GpuShaderDesc, op: &Op) -> Result<()> {
    match op.params() {
        OpParams::Matrix(d) => emit_matrix(desc, d),
        OpParams::Range(d) => emit_range(desc, d),
        OpParams::Gamma(d) => emit_gamma(desc, d),
        OpParams::Log(d) => emit_log(desc, d, op.direction()),
        OpParams::Cdl(d) => emit_cdl(desc, d),
        OpParams::Lut1d(d) => emit_lut1d(desc, d, op.direction())?,
        OpParams::Lut3d(d) => emit_lut3d(desc, d, op.direction())?,
        OpParams::ExposureContrast(d) => emit_exposure_contrast(desc, d, op.direction()),
        OpParams::FixedFunction(d) => emit_fixed_function(desc, d),
        OpParams::NoOp => {}
    }
    Ok(())
}

fn begin(desc: &GpuShaderDesc, label: &str) -> GpuShaderText {
    let mut ss = GpuShaderText::new(desc.language());
    ss.indent();
    ss.line("");
    ss.line(format!("// {label}"));
    ss.line("{");
    ss.indent();
    ss
}

fn end(mut ss: GpuShaderText, desc: &mut GpuShaderDesc) {
    ss.dedent();
    ss.line("}");
    desc.add_function_code(&ss.into_string());
}

/// RGB-only assignment that keeps alpha intact on both languages.
fn assign_rgb(ss: &mut GpuShaderText, pix: &str, expr: &str) {
    match ss.language() {
        GpuLanguage::Glsl => ss.line(format!("{pix}.rgb = {expr};")),
        GpuLanguage::Wgsl => ss.line(format!("{pix} = vec4<f32>({expr}, {pix}.a);")),
    }
}

fn local_vec3(ss: &mut GpuShaderText, name: &str, expr: &str) {
    match ss.language() {
        GpuLanguage::Glsl => ss.line(format!("vec3 {name} = {expr};")),
        GpuLanguage::Wgsl => ss.line(format!("let {name}: vec3<f32> = {expr};")),
    }
}

fn local_vec4(ss: &mut GpuShaderText, name: &str, expr: &str) {
    match ss.language() {
        GpuLanguage::Glsl => ss.line(format!("vec4 {name} = {expr};")),
        GpuLanguage::Wgsl => ss.line(format!("let {name}: vec4<f32> = {expr};")),
    }
}

fn local_float(ss: &mut GpuShaderText, name: &str, expr: &str) {
    match ss.language() {
        GpuLanguage::Glsl => ss.line(format!("float {name} = {expr};")),
        GpuLanguage::Wgsl => ss.line(format!("let {name}: f32 = {expr};")),
    }
}

fn emit_matrix(desc: &mut GpuShaderDesc, data: &MatrixOpData) {
    let mut ss = begin(desc, "matrix");
    let pix = desc.pixel_name().to_string();

    // Column-major constructor order on both languages.
    let cols: Vec<String> = data
        .matrix()
        .to_cols_array()
        .iter()
        .map(|v| GpuShaderText::float_const(*v as f32))
        .collect();
    let ctor = match ss.language() {
        GpuLanguage::Glsl => format!("mat4 m = mat4({});", cols.join(", ")),
        GpuLanguage::Wgsl => format!("let m = mat4x4<f32>({});", cols.join(", ")),
    };
    ss.line(ctor);

    let offsets = data.offsets().map(|v| v as f32);
    let offset_const = ss.vec4_const(offsets);
    ss.line(format!("{pix} = m * {pix} + {offset_const};"));
    end(ss, desc);
}

fn emit_range(desc: &mut GpuShaderDesc, data: &RangeOpData) {
    let mut ss = begin(desc, "range");
    let pix = desc.pixel_name().to_string();

    if data.scales() {
        let scale = ss.vec3_const([data.scale() as f32; 3]);
        let offset = ss.vec3_const([data.offset() as f32; 3]);
        assign_rgb(&mut ss, &pix, &format!("{pix}.rgb * {scale} + {offset}"));
    }
    if let Some(lo) = data.min_out() {
        let bound = ss.vec3_const([lo as f32; 3]);
        assign_rgb(&mut ss, &pix, &format!("max({bound}, {pix}.rgb)"));
    }
    if let Some(hi) = data.max_out() {
        let bound = ss.vec3_const([hi as f32; 3]);
        assign_rgb(&mut ss, &pix, &format!("min({bound}, {pix}.rgb)"));
    }
    end(ss, desc);
}

fn emit_gamma(desc: &mut GpuShaderDesc, data: &GammaOpData) {
    let mut ss = begin(desc, "gamma");
    let pix = desc.pixel_name().to_string();

    match data.style() {
        GammaStyle::BasicFwd | GammaStyle::BasicRev => {
            let rev = data.style() == GammaStyle::BasicRev;
            let g = data
                .channels()
                .map(|p| (if rev { 1.0 / p[0] } else { p[0] }) as f32);
            let zero = ss.vec4_const([0.0; 4]);
            let gamma = ss.vec4_const(g);
            ss.line(format!("{pix} = pow(max({zero}, {pix}), {gamma});"));
        }
        GammaStyle::MoncurveFwd => {
            let p = data
                .channels()
                .map(|c| chromat_core::cpu::gamma::moncurve_params_fwd(c));
            let brk = ss.vec4_const(p.map(|c| c.break_pnt));
            local_vec4(&mut ss, "brk", &brk);
            let slope = ss.vec4_const(p.map(|c| c.slope));
            let scale = ss.vec4_const(p.map(|c| c.scale));
            let offset = ss.vec4_const(p.map(|c| c.offset));
            let gamma = ss.vec4_const(p.map(|c| c.gamma));
            ss.line(format!(
                "{pix} = mix({pix} * {slope}, pow({pix} * {scale} + {offset}, {gamma}), step(brk, {pix}));"
            ));
        }
        GammaStyle::MoncurveRev => {
            let p = data
                .channels()
                .map(|c| chromat_core::cpu::gamma::moncurve_params_rev(c));
            let brk = ss.vec4_const(p.map(|c| c.break_pnt));
            local_vec4(&mut ss, "brk", &brk);
            let slope = ss.vec4_const(p.map(|c| c.slope));
            let scale = ss.vec4_const(p.map(|c| c.scale));
            let offset = ss.vec4_const(p.map(|c| c.offset));
            let gamma = ss.vec4_const(p.map(|c| c.gamma));
            ss.line(format!(
                "{pix} = mix({pix} * {slope}, pow({pix}, {gamma}) * {scale} - {offset}, step(brk, {pix}));"
            ));
        }
    }
    end(ss, desc);
}

fn emit_log(desc: &mut GpuShaderDesc, data: &LogOpData, direction: TransformDirection) {
    let mut ss = begin(desc, "log");
    let pix = desc.pixel_name().to_string();
    let ln_base = data.base().ln();

    match direction {
        TransformDirection::Forward => {
            let lin_slope = ss.vec3_const(data.lin_slope().map(|v| v as f32));
            let lin_offset = ss.vec3_const(data.lin_offset().map(|v| v as f32));
            let log_slope =
                ss.vec3_const(data.log_slope().map(|v| (v / ln_base) as f32));
            let log_offset = ss.vec3_const(data.log_offset().map(|v| v as f32));
            let floor = ss.vec3_const([f32::MIN_POSITIVE; 3]);
            local_vec3(
                &mut ss,
                "arg",
                &format!("max({pix}.rgb * {lin_slope} + {lin_offset}, {floor})"),
            );
            assign_rgb(&mut ss, &pix, &format!("log(arg) * {log_slope} + {log_offset}"));
        }
        TransformDirection::Inverse => {
            let inv_log_slope =
                ss.vec3_const(data.log_slope().map(|v| (ln_base / v) as f32));
            let log_offset = ss.vec3_const(data.log_offset().map(|v| v as f32));
            let inv_lin_slope = ss.vec3_const(data.lin_slope().map(|v| (1.0 / v) as f32));
            let lin_offset = ss.vec3_const(data.lin_offset().map(|v| v as f32));
            local_vec3(
                &mut ss,
                "lin",
                &format!("exp(({pix}.rgb - {log_offset}) * {inv_log_slope})"),
            );
            assign_rgb(&mut ss, &pix, &format!("(lin - {lin_offset}) * {inv_lin_slope}"));
        }
    }
    end(ss, desc);
}

fn emit_cdl(desc: &mut GpuShaderDesc, data: &CdlOpData) {
    let mut ss = begin(desc, "cdl");
    let pix = desc.pixel_name().to_string();
    let zero = ss.vec3_const([0.0; 3]);
    let one = ss.vec3_const([1.0; 3]);
    let luma = ss.vec3_const(LUMA_REC709.map(|v| v as f32));

    let style = data.style();
    let (slope, offset, power, sat) = if style.is_reverse() {
        (
            ss.vec3_const(data.slope().map(|v| (1.0 / v) as f32)),
            ss.vec3_const(data.offset().map(|v| v as f32)),
            ss.vec3_const(data.power().map(|v| (1.0 / v) as f32)),
            GpuShaderText::float_const((1.0 / data.saturation()) as f32),
        )
    } else {
        (
            ss.vec3_const(data.slope().map(|v| v as f32)),
            ss.vec3_const(data.offset().map(|v| v as f32)),
            ss.vec3_const(data.power().map(|v| v as f32)),
            GpuShaderText::float_const(data.saturation() as f32),
        )
    };

    let saturate = |ss: &mut GpuShaderText, pix: &str| {
        local_float(ss, "luma", &format!("dot({pix}.rgb, {luma})"));
        let l3 = match ss.language() {
            GpuLanguage::Glsl => "vec3(luma)".to_string(),
            GpuLanguage::Wgsl => "vec3<f32>(luma)".to_string(),
        };
        assign_rgb(ss, pix, &format!("{l3} + {sat} * ({pix}.rgb - {l3})"));
    };

    if style.is_reverse() {
        if style.clamps() {
            assign_rgb(&mut ss, &pix, &format!("clamp({pix}.rgb, {zero}, {one})"));
        }
        saturate(&mut ss, &pix);
        if style.clamps() {
            assign_rgb(&mut ss, &pix, &format!("clamp({pix}.rgb, {zero}, {one})"));
            assign_rgb(&mut ss, &pix, &format!("pow({pix}.rgb, {power})"));
        } else {
            local_vec3(&mut ss, "v", &format!("{pix}.rgb"));
            assign_rgb(
                &mut ss,
                &pix,
                &format!("mix(v, pow(max(v, {zero}), {power}), step({zero}, v))"),
            );
        }
        assign_rgb(&mut ss, &pix, &format!("({pix}.rgb - {offset}) * {slope}"));
    } else {
        if style.clamps() {
            assign_rgb(
                &mut ss,
                &pix,
                &format!("clamp({pix}.rgb * {slope} + {offset}, {zero}, {one})"),
            );
            assign_rgb(&mut ss, &pix, &format!("pow({pix}.rgb, {power})"));
        } else {
            local_vec3(&mut ss, "v", &format!("{pix}.rgb * {slope} + {offset}"));
            assign_rgb(
                &mut ss,
                &pix,
                &format!("mix(v, pow(max(v, {zero}), {power}), step({zero}, v))"),
            );
        }
        saturate(&mut ss, &pix);
        if style.clamps() {
            assign_rgb(&mut ss, &pix, &format!("clamp({pix}.rgb, {zero}, {one})"));
        }
    }
    end(ss, desc);
}

fn emit_exposure_contrast(
    desc: &mut GpuShaderDesc,
    data: &ExposureContrastOpData,
    direction: TransformDirection,
) {
    // Dynamic parameters become uniforms the host refreshes; static ones
    // are inlined as constants.
    let scalar_expr = |desc: &mut GpuShaderDesc, prop: &chromat_core::DynamicPropertyHandle, stem: &str| {
        if prop.is_dynamic() {
            let name = format!("{}_{stem}", desc.function_name());
            desc.add_uniform(&name, std::sync::Arc::clone(prop));
            name
        } else {
            GpuShaderText::float_const(prop.get() as f32)
        }
    };
    let exposure = scalar_expr(desc, data.exposure(), "exposure");
    let contrast = scalar_expr(desc, data.contrast(), "contrast");
    let gamma = scalar_expr(desc, data.gamma(), "gamma");

    // With a static unit contrast the curve degenerates to a pure gain;
    // the clamp in the contrast path must not be emitted in that case.
    let unit_contrast = !data.contrast().is_dynamic()
        && !data.gamma().is_dynamic()
        && data.contrast().get() * data.gamma().get() == 1.0;

    let mut ss = begin(desc, "exposure_contrast");
    let pix = desc.pixel_name().to_string();
    let pivot = GpuShaderText::float_const(data.pivot() as f32);
    let zero = ss.vec3_const([0.0; 3]);
    let lang = ss.language();
    let splat3 = move |expr: &str| match lang {
        GpuLanguage::Glsl => format!("vec3({expr})"),
        GpuLanguage::Wgsl => format!("vec3<f32>({expr})"),
    };

    local_float(&mut ss, "gain", &format!("pow(2.0, {exposure})"));
    match (direction, unit_contrast) {
        (TransformDirection::Forward, true) => {
            assign_rgb(&mut ss, &pix, &format!("{pix}.rgb * gain"));
        }
        (TransformDirection::Inverse, true) => {
            assign_rgb(&mut ss, &pix, &format!("{pix}.rgb / gain"));
        }
        (TransformDirection::Forward, false) => {
            let c3 = splat3("c");
            local_float(&mut ss, "c", &format!("{contrast} * {gamma}"));
            assign_rgb(
                &mut ss,
                &pix,
                &format!("pow(max({pix}.rgb * gain / {pivot}, {zero}), {c3}) * {pivot}"),
            );
        }
        (TransformDirection::Inverse, false) => {
            let inv_c3 = splat3("1.0 / c");
            local_float(&mut ss, "c", &format!("{contrast} * {gamma}"));
            assign_rgb(
                &mut ss,
                &pix,
                &format!("pow(max({pix}.rgb / {pivot}, {zero}), {inv_c3}) * {pivot} / gain"),
            );
        }
    }
    end(ss, desc);
}

fn emit_fixed_function(desc: &mut GpuShaderDesc, data: &FixedFunctionOpData) {
    let mut ss = begin(desc, "fixed_function rec2100_surround");
    let pix = desc.pixel_name().to_string();
    let weights = ss.vec3_const(LUMA_REC2100.map(|v| v as f32));
    let gamma = GpuShaderText::float_const((data.effective_gamma() - 1.0) as f32);

    local_float(
        &mut ss,
        "Y",
        &format!("max(1e-4, dot({pix}.rgb, {weights}))"),
    );
    assign_rgb(&mut ss, &pix, &format!("{pix}.rgb * pow(Y, {gamma})"));
    end(ss, desc);
}

fn emit_lut1d(
    desc: &mut GpuShaderDesc,
    data: &Lut1dOpData,
    direction: TransformDirection,
) -> Result<()> {
    if direction == TransformDirection::Inverse {
        return Err(ShaderError::Emit(
            "inverse 1D LUTs must be baked before shader emission \
             (finalize with the default style)"
                .into(),
        ));
    }
    if data.is_half_domain() {
        return Err(ShaderError::Emit(
            "half-domain 1D LUTs have no shader sampling path; \
             finalize the pipeline for an F32 target"
                .into(),
        ));
    }

    let name = desc.next_resource_name("lut1d");
    desc.add_texture_1d(GpuTexture1d {
        name: name.clone(),
        values: data.values().to_vec(),
    });

    let mut ss = begin(desc, "lut1d");
    let pix = desc.pixel_name().to_string();
    let len = data.len() as f32;
    let scale = GpuShaderText::float_const((len - 1.0) / len);
    let offset = GpuShaderText::float_const(0.5 / len);
    let zero = ss.vec3_const([0.0; 3]);
    let one = ss.vec3_const([1.0; 3]);

    local_vec3(
        &mut ss,
        "coords",
        &format!("clamp({pix}.rgb, {zero}, {one}) * {scale} + {offset}"),
    );
    let r = ss.sample_texture1d(&name, "coords.x");
    let g = ss.sample_texture1d(&name, "coords.y");
    let b = ss.sample_texture1d(&name, "coords.z");
    let gather = format!("{}({r}.r, {g}.g, {b}.b)", ss.language().vec3_keyword());
    assign_rgb(&mut ss, &pix, &gather);
    end(ss, desc);
    Ok(())
}

fn emit_lut3d(
    desc: &mut GpuShaderDesc,
    data: &Lut3dOpData,
    direction: TransformDirection,
) -> Result<()> {
    if direction == TransformDirection::Inverse {
        return Err(ShaderError::Emit(
            "a 3D LUT cannot be sampled in the inverse direction".into(),
        ));
    }

    let name = desc.next_resource_name("lut3d");
    let edge = data.edge_len();
    desc.add_texture_3d(GpuTexture3d {
        name: name.clone(),
        edge_len: edge,
        values: data.values().to_vec(),
    });

    let mut ss = begin(desc, "lut3d");
    let pix = desc.pixel_name().to_string();
    let e = edge as f32;
    let scale = ss.vec3_const([(e - 1.0) / e; 3]);
    let offset = ss.vec3_const([0.5 / e; 3]);
    let zero = ss.vec3_const([0.0; 3]);
    let one = ss.vec3_const([1.0; 3]);

    local_vec3(
        &mut ss,
        "coords",
        &format!("clamp({pix}.rgb, {zero}, {one}) * {scale} + {offset}"),
    );
    let sample = ss.sample_texture3d(&name, "coords");
    assign_rgb(&mut ss, &pix, &sample);
    end(ss, desc);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ShaderMode;
    use chromat_core::ops::matrix::create_matrix_op;
    use chromat_core::ops::range::create_range_op;

    fn desc() -> GpuShaderDesc {
        GpuShaderDesc::new(GpuLanguage::Glsl, "fn0", ShaderMode::Modern)
    }

    #[test]
    fn test_range_fragment_emits_scale_then_clamps() {
        let mut ops = Vec::new();
        create_range_op(
            &mut ops,
            RangeOpData::new(Some(0.0), Some(1.0), Some(0.5), Some(1.5)),
            TransformDirection::Forward,
        )
        .unwrap();
        let mut d = desc();
        emit_op(&mut d, &ops[0]).unwrap();
        d.finalize();
        let text = d.shader_text().unwrap();
        assert!(text.contains("max(vec3(0.5, 0.5, 0.5), outColor.rgb)"));
        assert!(text.contains("min(vec3(1.5, 1.5, 1.5), outColor.rgb)"));
    }

    #[test]
    fn test_matrix_fragment_uses_column_major_ctor() {
        let mut ops = Vec::new();
        create_matrix_op(
            &mut ops,
            MatrixOpData::diagonal(&[2.0, 3.0, 4.0, 1.0]),
            TransformDirection::Forward,
        )
        .unwrap();
        let mut d = desc();
        emit_op(&mut d, &ops[0]).unwrap();
        d.finalize();
        let text = d.shader_text().unwrap();
        assert!(text.contains("mat4 m = mat4(2.0, 0.0, 0.0, 0.0, 0.0, 3.0,"));
    }

    #[test]
    fn test_lut3d_fragment_registers_texture() {
        let lut = Lut3dOpData::identity(3);
        let op = chromat_core::Op::forward(chromat_core::OpData::new(OpParams::Lut3d(lut)));
        let mut d = desc();
        emit_op(&mut d, &op).unwrap();
        assert_eq!(d.textures_3d().len(), 1);
        assert_eq!(d.textures_3d()[0].edge_len, 3);
        assert_eq!(d.textures_3d()[0].values.len(), 27);
    }

    #[test]
    fn test_inverse_lut3d_is_rejected() {
        let lut = Lut3dOpData::identity(3);
        let op = chromat_core::Op::new(
            chromat_core::OpData::new(OpParams::Lut3d(lut)),
            TransformDirection::Inverse,
        );
        let mut d = desc();
        assert!(emit_op(&mut d, &op).is_err());
    }

    #[test]
    fn test_dynamic_exposure_becomes_uniform() {
        let ec = ExposureContrastOpData::new(0.5, 1.0, 1.0, 0.18);
        ec.exposure().make_dynamic();
        let op = chromat_core::Op::forward(chromat_core::OpData::new(
            OpParams::ExposureContrast(ec),
        ));
        let mut d = desc();
        emit_op(&mut d, &op).unwrap();
        d.finalize();
        assert_eq!(d.uniforms().len(), 1);
        assert_eq!(d.uniforms()[0].name, "fn0_exposure");
        let text = d.shader_text().unwrap();
        assert!(text.contains("uniform float fn0_exposure;"));
        assert!(text.contains("pow(2.0, fn0_exposure)"));
    }

    #[test]
    fn test_static_exposure_is_inlined() {
        let ec = ExposureContrastOpData::new(0.5, 1.0, 1.0, 0.18);
        let op = chromat_core::Op::forward(chromat_core::OpData::new(
            OpParams::ExposureContrast(ec),
        ));
        let mut d = desc();
        emit_op(&mut d, &op).unwrap();
        assert!(d.uniforms().is_empty());
    }
}
