/// Shared equirectangular lookup. `v` grows downward, matching texture rows.
const EQUIRECT: &str = r#"
const PI: f32 = 3.14159265;

fn equirect_uv(dir: vec3<f32>) -> vec2<f32> {
    let d = normalize(dir);
    let u = atan2(d.z, d.x) / (2.0 * PI) + 0.5;
    let v = 0.5 - asin(clamp(d.y, -1.0, 1.0)) / PI;
    return vec2<f32>(u, v);
}
"#;

/// Metallic-roughness shading lit only by the pre-filtered environment.
const PBR_BODY: &str = r#"
struct Frame {
    view_proj: mat4x4<f32>,
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    inv_view_rot_proj: mat4x4<f32>,
    // xyz: camera position, w: last environment mip level
    camera: vec4<f32>,
};

struct Material {
    base_color: vec4<f32>,
    // rgb: emissive factor, a: occlusion strength
    emissive: vec4<f32>,
    // metallic, roughness, alpha cutoff, alpha mode (0 opaque, 1 mask, 2 blend)
    params: vec4<f32>,
};

@group(0) @binding(0) var<uniform> frame: Frame;

@group(1) @binding(0) var t_env: texture_2d<f32>;
@group(1) @binding(1) var s_env: sampler;

@group(2) @binding(0) var<uniform> material: Material;
@group(2) @binding(1) var t_base: texture_2d<f32>;
@group(2) @binding(2) var t_metal_rough: texture_2d<f32>;
@group(2) @binding(3) var t_occlusion: texture_2d<f32>;
@group(2) @binding(4) var t_emissive: texture_2d<f32>;
@group(2) @binding(5) var s_material: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let world = frame.model * vec4<f32>(in.position, 1.0);
    var out: VertexOutput;
    out.clip_position = frame.view_proj * world;
    out.world_pos = world.xyz;
    out.world_normal = (frame.normal_matrix * vec4<f32>(in.normal, 0.0)).xyz;
    out.uv = in.uv;
    return out;
}

fn env_sample(dir: vec3<f32>, level: f32) -> vec3<f32> {
    return textureSampleLevel(t_env, s_env, equirect_uv(dir), level).rgb;
}

// Analytic fit of the split-sum environment BRDF.
fn env_brdf(f0: vec3<f32>, roughness: f32, n_dot_v: f32) -> vec3<f32> {
    let c0 = vec4<f32>(-1.0, -0.0275, -0.572, 0.022);
    let c1 = vec4<f32>(1.0, 0.0425, 1.04, -0.04);
    let r = roughness * c0 + c1;
    let a004 = min(r.x * r.x, exp2(-9.28 * n_dot_v)) * r.x + r.y;
    let ab = vec2<f32>(-1.04, 1.04) * a004 + r.zw;
    return f0 * ab.x + ab.y;
}

@fragment
fn fs_main(in: VertexOutput, @builtin(front_facing) front: bool) -> @location(0) vec4<f32> {
    let base = material.base_color * textureSample(t_base, s_material, in.uv);
    let mr = textureSample(t_metal_rough, s_material, in.uv);
    let ao = textureSample(t_occlusion, s_material, in.uv).r;
    let emissive = material.emissive.rgb * textureSample(t_emissive, s_material, in.uv).rgb;

    let mode = material.params.w;
    if (mode > 0.5 && mode < 1.5 && base.a < material.params.z) {
        discard;
    }

    let metallic = clamp(material.params.x * mr.b, 0.0, 1.0);
    let roughness = clamp(material.params.y * mr.g, 0.04, 1.0);
    let occlusion = 1.0 + material.emissive.a * (ao - 1.0);

    var n = normalize(in.world_normal);
    if (!front) {
        n = -n;
    }
    let v = normalize(frame.camera.xyz - in.world_pos);
    let n_dot_v = clamp(dot(n, v), 0.0001, 1.0);
    let r = reflect(-v, n);
    let max_level = frame.camera.w;

    let f0 = mix(vec3<f32>(0.04), base.rgb, metallic);
    let specular = env_sample(r, roughness * max_level) * env_brdf(f0, roughness, n_dot_v);
    let diffuse_color = base.rgb * (1.0 - metallic);
    let irradiance = env_sample(n, max_level);
    let diffuse = diffuse_color * irradiance;

    let color = (diffuse + specular) * occlusion + emissive;
    var alpha = 1.0;
    if (mode > 1.5) {
        alpha = base.a;
    }
    return vec4<f32>(color, alpha);
}
"#;

/// Environment drawn behind the model.
const BACKGROUND_BODY: &str = r#"
struct Frame {
    view_proj: mat4x4<f32>,
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    inv_view_rot_proj: mat4x4<f32>,
    camera: vec4<f32>,
};

@group(0) @binding(0) var<uniform> frame: Frame;
@group(1) @binding(0) var t_env: texture_2d<f32>;
@group(1) @binding(1) var s_env: sampler;

struct BackgroundOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) ndc: vec2<f32>,
};

@vertex
fn vs_background(@builtin(vertex_index) index: u32) -> BackgroundOutput {
    let corner = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    let ndc = corner * 2.0 - 1.0;
    var out: BackgroundOutput;
    out.clip_position = vec4<f32>(ndc, 1.0, 1.0);
    out.ndc = ndc;
    return out;
}

@fragment
fn fs_background(in: BackgroundOutput) -> @location(0) vec4<f32> {
    let far = frame.inv_view_rot_proj * vec4<f32>(in.ndc, 1.0, 1.0);
    let dir = far.xyz / far.w;
    return vec4<f32>(textureSampleLevel(t_env, s_env, equirect_uv(dir), 0.0).rgb, 1.0);
}
"#;

/// Vertex stage shared by every fullscreen pass: one oversized triangle
/// with `uv` in texture space (`v` down).
pub const FULLSCREEN_VERTEX: &str = r#"
struct FullscreenOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> FullscreenOutput {
    let corner = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: FullscreenOutput;
    out.clip_position = vec4<f32>(corner * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(corner.x, 1.0 - corner.y);
    return out;
}

@group(0) @binding(0) var t_input: texture_2d<f32>;
@group(0) @binding(1) var s_input: sampler;
"#;

pub const RGB_SHIFT_FRAGMENT: &str = r#"
struct RgbShift {
    // texture-space offset, +y up
    offset: vec2<f32>,
    _pad: vec2<f32>,
};

@group(0) @binding(2) var<uniform> params: RgbShift;

@fragment
fn fs_main(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let offset = vec2<f32>(params.offset.x, -params.offset.y);
    let cr = textureSample(t_input, s_input, in.uv + offset);
    let cga = textureSample(t_input, s_input, in.uv);
    let cb = textureSample(t_input, s_input, in.uv - offset);
    return vec4<f32>(cr.r, cga.g, cb.b, cga.a);
}
"#;

pub const OUTPUT_FRAGMENT: &str = r#"
struct Output {
    exposure: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
};

@group(0) @binding(2) var<uniform> params: Output;

fn rrt_and_odt_fit(v: vec3<f32>) -> vec3<f32> {
    let a = v * (v + 0.0245786) - 0.000090537;
    let b = v * (0.983729 * v + 0.4329510) + 0.238081;
    return a / b;
}

fn aces_filmic(color: vec3<f32>) -> vec3<f32> {
    let input_mat = mat3x3<f32>(
        vec3<f32>(0.59719, 0.07600, 0.02840),
        vec3<f32>(0.35458, 0.90834, 0.13383),
        vec3<f32>(0.04823, 0.01566, 0.83777),
    );
    let output_mat = mat3x3<f32>(
        vec3<f32>(1.60475, -0.10208, -0.00327),
        vec3<f32>(-0.53108, 1.10813, -0.07276),
        vec3<f32>(-0.07367, -0.00605, 1.07602),
    );
    var c = color * (params.exposure / 0.6);
    c = output_mat * rrt_and_odt_fit(input_mat * c);
    return clamp(c, vec3<f32>(0.0), vec3<f32>(1.0));
}

// The surface is sRGB, so encoding happens on store.
@fragment
fn fs_main(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let hdr = textureSample(t_input, s_input, in.uv);
    return vec4<f32>(aces_filmic(hdr.rgb), 1.0);
}
"#;

pub fn pbr_shader() -> String {
    format!("{EQUIRECT}\n{PBR_BODY}")
}

pub fn background_shader() -> String {
    format!("{EQUIRECT}\n{BACKGROUND_BODY}")
}

/// Fullscreen pass source: shared vertex stage plus the given fragment.
pub fn fullscreen_shader(fragment: &str) -> String {
    format!("{FULLSCREEN_VERTEX}\n{fragment}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_expose_entry_points() {
        let pbr = pbr_shader();
        assert!(pbr.contains("fn vs_main") && pbr.contains("fn fs_main"));
        assert!(pbr.contains("fn equirect_uv"));
        assert!(background_shader().contains("fn fs_background"));
        for frag in [RGB_SHIFT_FRAGMENT, OUTPUT_FRAGMENT] {
            let src = fullscreen_shader(frag);
            assert!(src.contains("fn vs_main") && src.contains("fn fs_main"));
        }
    }

    #[test]
    fn fragments_bind_params_after_input() {
        assert!(RGB_SHIFT_FRAGMENT.contains("@binding(2)"));
        assert!(OUTPUT_FRAGMENT.contains("@binding(2)"));
    }
}
