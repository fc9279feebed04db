/// WGSL for the shaded color pass: textured geometry lit by the sun and the
/// extracted point lights, with shadow attenuation from the depth map.
pub const SCENE_SHADER: &str = r#"
struct FrameUniforms {
    light_space: mat4x4<f32>,
    // xyz = direction sunlight travels, w = day factor
    sun_dir: vec4<f32>,
    sun_color: vec4<f32>,
    // xyz = camera world position, w = active light count
    camera_pos: vec4<f32>,
    light_positions: array<vec4<f32>, 4>,
    light_colors: array<vec4<f32>, 4>,
};

struct NodeUniforms {
    model: mat4x4<f32>,
    mvp: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    // x > 0.5 means the bound texture is meaningful
    flags: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> frame: FrameUniforms;
@group(0) @binding(1)
var shadow_map: texture_depth_2d;
@group(0) @binding(2)
var shadow_sampler: sampler_comparison;

@group(1) @binding(0)
var<uniform> node: NodeUniforms;

@group(2) @binding(0)
var diffuse_texture: texture_2d<f32>;
@group(2) @binding(1)
var diffuse_sampler: sampler;

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
    @location(3) shadow_pos: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world = node.model * vec4<f32>(vertex.position, 1.0);
    out.clip_position = node.mvp * vec4<f32>(vertex.position, 1.0);
    out.world_pos = world.xyz;
    out.world_normal = (node.normal_matrix * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.uv = vertex.uv;
    out.shadow_pos = frame.light_space * world;
    return out;
}

fn shadow_factor(shadow_pos: vec4<f32>) -> f32 {
    let proj = shadow_pos.xyz / shadow_pos.w;
    let uv = proj.xy * vec2<f32>(0.5, -0.5) + vec2<f32>(0.5, 0.5);
    // Outside the light frustum reads as lit.
    if (uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0 || proj.z > 1.0) {
        return 1.0;
    }
    let bias = 0.002;
    return textureSampleCompareLevel(shadow_map, shadow_sampler, uv, proj.z - bias);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.world_normal);
    let tex = textureSample(diffuse_texture, diffuse_sampler, in.uv);
    var albedo = vec3<f32>(0.8, 0.8, 0.8);
    if (node.flags.x > 0.5) {
        albedo = tex.rgb;
    }

    let day = frame.sun_dir.w;
    let to_light = -frame.sun_dir.xyz;
    let sun_diffuse = max(dot(n, to_light), 0.0) * frame.sun_color.rgb * day;
    let shadow = shadow_factor(in.shadow_pos);

    var point = vec3<f32>(0.0, 0.0, 0.0);
    let count = u32(frame.camera_pos.w);
    for (var i = 0u; i < count; i = i + 1u) {
        let offset = frame.light_positions[i].xyz - in.world_pos;
        let dist = length(offset);
        let attenuation = 1.0 / (1.0 + 0.002 * dist + 0.00002 * dist * dist);
        point += max(dot(n, offset / max(dist, 0.001)), 0.0)
            * frame.light_colors[i].rgb * attenuation;
    }

    let ambient = mix(0.08, 0.2, day);
    let lit = albedo * (ambient + shadow * sun_diffuse + point);
    return vec4<f32>(lit, 1.0);
}
"#;

/// WGSL for the depth-only shadow pass, drawn from the light's viewpoint.
pub const SHADOW_SHADER: &str = r#"
struct ShadowUniforms {
    light_space: mat4x4<f32>,
};

struct NodeUniforms {
    model: mat4x4<f32>,
    mvp: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    flags: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> shadow: ShadowUniforms;
@group(1) @binding(0)
var<uniform> node: NodeUniforms;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return shadow.light_space * node.model * vec4<f32>(position, 1.0);
}
"#;

/// WGSL for the backdrop: a fullscreen triangle at far depth that
/// reconstructs the view ray from the inverse view-projection and blends
/// a night palette toward a day palette, with sun and moon discs.
pub const SKY_SHADER: &str = r#"
struct SkyUniforms {
    inv_view_proj: mat4x4<f32>,
    // xyz = direction sunlight travels, w = day factor
    sun_dir: vec4<f32>,
    sun_color: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> sky: SkyUniforms;

struct SkyOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) ndc: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> SkyOutput {
    // One triangle covering the screen, pinned to the far plane.
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: SkyOutput;
    out.ndc = uv * 2.0 - 1.0;
    out.clip_position = vec4<f32>(out.ndc, 1.0, 1.0);
    return out;
}

@fragment
fn fs_main(in: SkyOutput) -> @location(0) vec4<f32> {
    let far = sky.inv_view_proj * vec4<f32>(in.ndc, 1.0, 1.0);
    let dir = normalize(far.xyz / far.w);

    let day = sky.sun_dir.w;
    let horizon = clamp(dir.y * 0.5 + 0.5, 0.0, 1.0);
    let night = mix(vec3<f32>(0.05, 0.06, 0.12), vec3<f32>(0.02, 0.03, 0.08), horizon);
    let daylight = mix(vec3<f32>(0.75, 0.8, 0.9), vec3<f32>(0.45, 0.65, 0.95), horizon);
    var color = mix(night, daylight, day);

    // The visible sun sits opposite the travel direction of its light.
    let sun_amount = smoothstep(0.9995, 0.9999, dot(dir, -sky.sun_dir.xyz));
    color += sun_amount * sky.sun_color.rgb * 4.0;
    let moon_amount = smoothstep(0.99975, 0.9999, dot(dir, sky.sun_dir.xyz));
    color += moon_amount * vec3<f32>(0.7, 0.72, 0.8) * (1.0 - day);

    return vec4<f32>(color, 1.0);
}
"#;
