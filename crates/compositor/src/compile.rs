use std::borrow::Cow;

use wgpu::naga::ShaderStage;

/// Compiles the static full-screen triangle vertex shader shared by every pass.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Full-screen triangle. `v_uv` has its origin in the top-left corner so it
/// lines up with texture addressing and the CPU passes.
pub(crate) const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = vec2(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Velocity painter. Uniform layout matches `PaintUniforms`.
pub(crate) const PAINT_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec2 outField;

layout(std140, set = 0, binding = 0) uniform PaintParams {
    vec4 pointer;
    vec4 brush;
    vec4 spread;
} ubo;

layout(set = 0, binding = 1) uniform texture2D seedField;
layout(set = 0, binding = 2) uniform sampler fieldSampler;

vec2 seed_at(vec2 uv) {
    return textureLod(sampler2D(seedField, fieldSampler), uv, 0.0).xy;
}

float stroke_distance(vec2 uv) {
    vec2 scale = vec2(ubo.brush.x, 1.0);
    vec2 end_point = ubo.pointer.xy * scale;
    vec2 start_point = (ubo.pointer.xy - ubo.pointer.zw) * scale;
    vec2 point = uv * scale;
    vec2 segment = end_point - start_point;
    float length_sq = dot(segment, segment);
    if (length_sq == 0.0) {
        return distance(point, end_point);
    }
    float t = clamp(dot(point - start_point, segment) / length_sq, 0.0, 1.0);
    return distance(point, start_point + segment * t);
}

void main() {
    vec2 seeded = seed_at(v_uv);
    float diffusion = ubo.spread.z;
    if (diffusion > 0.0) {
        vec2 step_x = vec2(ubo.spread.x, 0.0);
        vec2 step_y = vec2(0.0, ubo.spread.y);
        vec2 neighbours = (seed_at(v_uv + step_x) + seed_at(v_uv - step_x)
            + seed_at(v_uv + step_y) + seed_at(v_uv - step_y)) * 0.25;
        seeded = mix(seeded, neighbours, diffusion);
    }
    vec2 decayed = seeded * ubo.brush.y;

    vec2 velocity = ubo.pointer.zw;
    if (velocity.x == 0.0 && velocity.y == 0.0) {
        outField = decayed;
        return;
    }
    float influence = 1.0 - smoothstep(0.0, ubo.brush.z, stroke_distance(v_uv));
    outField = decayed + velocity * influence * ubo.brush.w;
}
";

/// Box/tent filter into the low-resolution field. Uniform layout matches
/// `DownsampleUniforms`.
pub(crate) const DOWNSAMPLE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec2 outField;

layout(std140, set = 0, binding = 0) uniform DownsampleParams {
    vec4 kernel;
    vec4 weights[2];
} ubo;

layout(set = 0, binding = 1) uniform texture2D sourceField;
layout(set = 0, binding = 2) uniform sampler fieldSampler;

float kernel_weight(int index) {
    vec4 packed_weights = ubo.weights[index / 4];
    return packed_weights[index % 4];
}

void main() {
    int radius = int(ubo.kernel.z);
    int width = int(ubo.kernel.w);
    vec2 acc = vec2(0.0);
    for (int j = 0; j < width; j++) {
        for (int i = 0; i < width; i++) {
            vec2 displacement = vec2(float(i - radius), float(j - radius)) * ubo.kernel.xy;
            vec2 tap = textureLod(sampler2D(sourceField, fieldSampler), v_uv + displacement, 0.0).xy;
            acc += tap * (kernel_weight(i) * kernel_weight(j));
        }
    }
    outField = acc;
}
";

/// Distortion compositor. Uniform layout matches `CompositeUniforms`; the hash
/// mirrors `noise::pcg_hash` bit for bit.
pub(crate) const COMPOSITE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform CompositeParams {
    vec4 blur;
    uvec4 sampling;
} ubo;

layout(set = 0, binding = 1) uniform texture2D sceneColor;
layout(set = 0, binding = 2) uniform texture2D motionField;
layout(set = 0, binding = 3) uniform sampler linearSampler;

const float MOTION_EPSILON = 0.001;
const float CHROMATIC_SHIFT = 0.025;

uint pcg_hash(uint value) {
    uint state = value * 747796405u + 2891336453u;
    uint word = ((state >> ((state >> 28u) + 4u)) ^ state) * 277803737u;
    return (word >> 22u) ^ word;
}

float signed_unit(uint hash) {
    return float(hash >> 8u) / 16777216.0 * 2.0 - 1.0;
}

vec2 jitter(uint index) {
    float amplitude = ubo.blur.w;
    if (amplitude == 0.0) {
        return vec2(0.0);
    }
    uint h = pcg_hash(ubo.sampling.y ^ pcg_hash(ubo.sampling.z ^ pcg_hash(index)));
    return vec2(signed_unit(h), signed_unit(pcg_hash(h))) * amplitude;
}

vec4 scene_at(vec2 uv) {
    return textureLod(sampler2D(sceneColor, linearSampler), uv, 0.0);
}

void main() {
    vec4 direct = texelFetch(sampler2D(sceneColor, linearSampler), ivec2(gl_FragCoord.xy), 0);
    vec2 motion = textureLod(sampler2D(motionField, linearSampler), v_uv, 0.0).xy;
    float magnitude = length(motion);
    if (magnitude < MOTION_EPSILON) {
        outColor = direct;
        return;
    }

    uint count = max(ubo.sampling.x, 1u);
    vec4 acc = vec4(0.0);
    float total = 0.0;
    for (uint i = 0u; i < count; i++) {
        float t = 0.0;
        if (count > 1u) {
            t = float(i) / float(count - 1u);
        }
        float weight = 1.0 - 0.5 * t;
        vec2 displacement = motion * t * ubo.blur.x + jitter(i);
        acc += scene_at(v_uv - displacement) * weight;
        total += weight;
    }
    vec4 blurred = acc / total;

    float blend = clamp(magnitude * ubo.blur.y, 0.0, 1.0);
    vec4 base = mix(direct, blurred, blend);

    vec2 shift = motion * CHROMATIC_SHIFT;
    vec2 chroma = motion / magnitude * ubo.blur.z * blend;
    vec3 fringe = vec3(
        scene_at(v_uv - shift - chroma).r,
        scene_at(v_uv - shift).g,
        scene_at(v_uv - shift + chroma).b
    );

    outColor = vec4(mix(base.rgb, fringe, blend), direct.a);
}
";

/// Selective post stage: spiral frost and colour split where the composed
/// image departs from the scene near the pointer. Uniform layout matches
/// `SelectiveUniforms`; the CPU twin is `passes::selective`.
pub(crate) const SELECTIVE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform SelectiveParams {
    vec4 pointer;
    vec4 effect;
} ubo;

layout(set = 0, binding = 1) uniform texture2D distortedColor;
layout(set = 0, binding = 2) uniform texture2D sceneColor;
layout(set = 0, binding = 3) uniform sampler linearSampler;

const int SPIRAL_TAPS = 16;
const float SPIRAL_SCALE = 0.008;
const float FROST_AMPLITUDE = 0.03;
const float FRINGE_OFFSET = 0.005;
const float BLUR_CUTOFF = 0.01;
const float TAU = 6.28318530718;

float frost(vec2 uv) {
    return fract(sin(dot(uv, vec2(12.9898, 78.233))) * 43758.5453);
}

vec4 distorted_at(vec2 uv) {
    return textureLod(sampler2D(distortedColor, linearSampler), uv, 0.0);
}

vec4 clean_at(vec2 uv) {
    return textureLod(sampler2D(sceneColor, linearSampler), uv, 0.0);
}

vec4 frosted(vec2 uv, vec4 distorted, vec4 clean) {
    float strength = ubo.effect.x;
    if (strength <= 0.0) {
        return distorted;
    }
    vec2 scale = vec2(ubo.pointer.z, 1.0);
    float radial = 1.0 - smoothstep(0.0, ubo.effect.y, length((uv - ubo.pointer.xy) * scale));
    float departure = length(distorted.rgb - clean.rgb);
    float mask = clamp(radial * smoothstep(0.01, 0.1, departure), 0.0, 1.0);
    if (mask <= BLUR_CUTOFF) {
        return distorted;
    }

    float reach = strength * mask * SPIRAL_SCALE;
    vec4 acc = vec4(0.0);
    for (int i = 0; i < SPIRAL_TAPS; i++) {
        float f = float(i) / float(SPIRAL_TAPS);
        float angle = f * TAU;
        acc += distorted_at(uv + vec2(cos(angle), sin(angle)) * f * reach);
    }
    float grain = (frost(uv) - 0.5) * FROST_AMPLITUDE;
    vec4 blurred = acc / float(SPIRAL_TAPS) + vec4(vec3(grain), 0.0);
    return mix(distorted, blurred, mask);
}

void main() {
    ivec2 pixel = ivec2(gl_FragCoord.xy);
    vec4 clean = texelFetch(sampler2D(sceneColor, linearSampler), pixel, 0);
    vec4 distorted = texelFetch(sampler2D(distortedColor, linearSampler), pixel, 0);
    vec4 base = frosted(v_uv, distorted, clean);
    if (ubo.effect.z < 0.5) {
        outColor = base;
        return;
    }

    float mask = smoothstep(0.01, 0.5, length(base.rgb - clean.rgb));
    if (mask <= 0.0) {
        outColor = base;
        return;
    }
    vec2 offset = vec2(FRINGE_OFFSET * mask);
    vec2 red_uv = v_uv + offset;
    vec2 blue_uv = v_uv - offset;
    float red = frosted(red_uv, distorted_at(red_uv), clean_at(red_uv)).r;
    float blue = frosted(blue_uv, distorted_at(blue_uv), clean_at(blue_uv)).b;
    outColor = vec4(red, base.g, blue, base.a);
}
";

/// Procedural demo scene; the CPU twin lives in `scene::demo_colour`.
pub(crate) const SCENE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform SceneParams {
    vec4 frame;
} ubo;

vec3 palette(int index) {
    if (index == 0) {
        return vec3(0.95, 0.36, 0.31);
    }
    if (index == 1) {
        return vec3(0.29, 0.82, 0.62);
    }
    return vec3(0.36, 0.52, 0.98);
}

void main() {
    vec2 cell = floor(v_uv * 12.0);
    float checker = mod(cell.x + cell.y, 2.0);
    vec3 colour = mix(vec3(0.08, 0.09, 0.14), vec3(0.16, 0.18, 0.26), checker);

    vec2 point = vec2((v_uv.x - 0.5) * ubo.frame.y, v_uv.y - 0.5);
    for (int k = 0; k < 3; k++) {
        float angle = ubo.frame.x * 0.6 + float(k) * 6.28318530718 / 3.0;
        vec2 centre = vec2(cos(angle), sin(angle)) * 0.28;
        float disc = 1.0 - smoothstep(0.09, 0.1, distance(point, centre));
        colour = mix(colour, palette(k), disc);
    }
    outColor = vec4(colour, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::naga::front::glsl::{Frontend, Options};
    use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

    fn check(source: &str, stage: ShaderStage) {
        let module = Frontend::default()
            .parse(&Options::from(stage), source)
            .unwrap_or_else(|err| panic!("GLSL parse failed: {err:?}"));
        Validator::new(ValidationFlags::all(), Capabilities::empty())
            .validate(&module)
            .unwrap_or_else(|err| panic!("GLSL validation failed: {err:?}"));
    }

    #[test]
    fn vertex_shader_is_valid() {
        check(VERTEX_SHADER_GLSL, ShaderStage::Vertex);
    }

    #[test]
    fn pass_shaders_are_valid() {
        for source in [
            PAINT_FRAGMENT_GLSL,
            DOWNSAMPLE_FRAGMENT_GLSL,
            COMPOSITE_FRAGMENT_GLSL,
            SELECTIVE_FRAGMENT_GLSL,
            SCENE_FRAGMENT_GLSL,
        ] {
            check(source, ShaderStage::Fragment);
        }
    }

    #[test]
    fn composite_shader_shares_cpu_constants() {
        assert!(COMPOSITE_FRAGMENT_GLSL.contains("MOTION_EPSILON = 0.001"));
        assert!(COMPOSITE_FRAGMENT_GLSL.contains("CHROMATIC_SHIFT = 0.025"));
        assert_eq!(crate::passes::MOTION_EPSILON, 0.001);
        assert_eq!(crate::passes::CHROMATIC_SHIFT, 0.025);
        for constant in ["747796405u", "2891336453u", "277803737u", "16777216.0"] {
            assert!(COMPOSITE_FRAGMENT_GLSL.contains(constant), "{constant}");
        }
    }

    #[test]
    fn selective_shader_shares_cpu_constants() {
        use crate::passes::selective::{FRINGE_OFFSET, FROST_AMPLITUDE, SPIRAL_SCALE, SPIRAL_TAPS};

        let expected = [
            format!("SPIRAL_TAPS = {SPIRAL_TAPS};"),
            format!("SPIRAL_SCALE = {SPIRAL_SCALE};"),
            format!("FROST_AMPLITUDE = {FROST_AMPLITUDE};"),
            format!("FRINGE_OFFSET = {FRINGE_OFFSET};"),
        ];
        for constant in &expected {
            assert!(SELECTIVE_FRAGMENT_GLSL.contains(constant.as_str()), "{constant}");
        }
        assert!(SELECTIVE_FRAGMENT_GLSL.contains("smoothstep(0.01, 0.1, departure)"));
        assert!(SELECTIVE_FRAGMENT_GLSL.contains("smoothstep(0.01, 0.5,"));
    }

    #[test]
    fn field_passes_write_two_channels() {
        assert!(PAINT_FRAGMENT_GLSL.contains("out vec2 outField"));
        assert!(DOWNSAMPLE_FRAGMENT_GLSL.contains("out vec2 outField"));
    }
}
