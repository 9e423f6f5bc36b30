//! Raymarch pipeline assembly: config validation, GLSL generation and the
//! uniform table.
//!
//! Validation runs before any GPU call so a bad camera or algorithm config
//! never produces a half-built pipeline. Shaders target GLSL ES 1.00 so the
//! same source runs on WebGL1 and WebGL2.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::camera::CameraState;
use crate::encoding::{texel_center, TextureEncoding, TEXTURE_HEIGHT, TEXTURE_WIDTH};
use crate::error::RenderError;
use crate::field::FIELD_COMPONENTS;
use crate::params::{require_f64, require_keys};
use crate::state::RenderingParameters;

/// Algebra name the field sampler accepts.
pub const SUPPORTED_ALGEBRA: &str = "Cl(1,3)";

/// Vertex attribute holding the quad corner in clip space.
pub const ATTRIBUTE_POSITION: &str = "position";
pub const UNIFORM_INVERSE_VIEW: &str = "uInverseViewMatrix";
pub const UNIFORM_INVERSE_PROJECTION: &str = "uInverseProjectionMatrix";
pub const UNIFORM_CAMERA_POSITION: &str = "uCameraPosition";
pub const UNIFORM_MIN_DISTANCE: &str = "uMinDistance";
pub const UNIFORM_MAX_DISTANCE: &str = "uMaxDistance";
pub const UNIFORM_FIELD: &str = "uCliffordField";

/// Texture unit the field sampler is bound to.
pub const FIELD_TEXTURE_UNIT: u32 = 0;

const CAMERA_KEYS: &[&str] = &["position", "target", "up", "fov", "aspect_ratio"];

/// GLSL type of a pipeline uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UniformType {
    Mat4,
    Vec3,
    Float,
    Sampler2D,
}

impl UniformType {
    pub fn glsl_name(self) -> &'static str {
        match self {
            UniformType::Mat4 => "mat4",
            UniformType::Vec3 => "vec3",
            UniformType::Float => "float",
            UniformType::Sampler2D => "sampler2D",
        }
    }
}

/// Declared shape of the field a pipeline is built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSignature {
    pub algebra: String,
    pub dimension: usize,
}

impl Default for FieldSignature {
    fn default() -> Self {
        Self {
            algebra: SUPPORTED_ALGEBRA.to_owned(),
            dimension: FIELD_COMPONENTS,
        }
    }
}

/// Metadata returned by [`validate_clifford_field_sampling`].
///
/// `interpolation` is descriptive only; the renderer samples four texel
/// centres of a 4x1 texture with nearest filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamplingDescriptor {
    pub algebra: String,
    pub dimension: usize,
    pub interpolation: &'static str,
    pub texture_width: u32,
    pub texture_height: u32,
}

/// Component count per grade, as recorded on a built pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GradeLayout {
    pub scalar: usize,
    pub vector: usize,
    pub bivector: usize,
    pub trivector: usize,
    pub pseudoscalar: usize,
}

/// Field configuration a pipeline was built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub field_type: &'static str,
    pub components: usize,
    pub grades: GradeLayout,
    pub sampling: SamplingDescriptor,
}

/// Compiled-ready shader sources plus the configuration used to build them.
#[derive(Debug, Clone, PartialEq)]
pub struct RaymarchPipeline {
    pub vertex_source: String,
    pub fragment_source: String,
    pub uniforms: BTreeMap<&'static str, UniformType>,
    pub camera: CameraState,
    pub rendering: RenderingParameters,
    pub field: FieldDescriptor,
    pub encoding: TextureEncoding,
}

impl RaymarchPipeline {
    /// Whether two pipelines would compile to the same program.
    pub fn same_program(&self, other: &RaymarchPipeline) -> bool {
        self.vertex_source == other.vertex_source && self.fragment_source == other.fragment_source
    }
}

/// Checks the field signature the sampler is written against.
///
/// # Errors
///
/// `RenderError::Configuration` unless the algebra is `Cl(1,3)` and the
/// dimension is 16.
pub fn validate_clifford_field_sampling(
    signature: &FieldSignature,
) -> Result<SamplingDescriptor, RenderError> {
    if signature.algebra != SUPPORTED_ALGEBRA {
        return Err(RenderError::Configuration(format!(
            "field algebra must be {SUPPORTED_ALGEBRA}, got {}",
            signature.algebra
        )));
    }
    if signature.dimension != FIELD_COMPONENTS {
        return Err(RenderError::Configuration(format!(
            "field dimension must be {FIELD_COMPONENTS}, got {}",
            signature.dimension
        )));
    }
    Ok(SamplingDescriptor {
        algebra: signature.algebra.clone(),
        dimension: signature.dimension,
        interpolation: "trilinear",
        texture_width: TEXTURE_WIDTH,
        texture_height: TEXTURE_HEIGHT,
    })
}

/// Checks a camera config and returns it typed.
///
/// # Errors
///
/// `RenderError::Configuration` if any of `position, target, up, fov,
/// aspect_ratio` is missing, if `fov` is outside (0, 180), if
/// `aspect_ratio <= 0`, or if a vector is malformed.
pub fn validate_camera_mathematics(config: &Value) -> Result<CameraState, RenderError> {
    require_keys(config, CAMERA_KEYS)?;

    let fov = require_f64(config, "fov")?;
    if !(fov > 0.0 && fov < 180.0) {
        return Err(RenderError::Configuration(format!(
            "fov must be in (0, 180) degrees, got {fov}"
        )));
    }
    let aspect = require_f64(config, "aspect_ratio")?;
    if !(aspect > 0.0) {
        return Err(RenderError::Configuration(format!(
            "aspect_ratio must be positive, got {aspect}"
        )));
    }

    serde_json::from_value(config.clone())
        .map_err(|e| RenderError::Configuration(format!("malformed camera: {e}")))
}

/// Checks the sphere-tracing bounds and returns them typed.
///
/// # Errors
///
/// `RenderError::Configuration` unless `max_steps` is a positive integer,
/// `min_distance > 0` and `max_distance > min_distance`.
pub fn validate_raymarching_algorithm_structure(
    config: &Value,
) -> Result<RenderingParameters, RenderError> {
    let max_steps = require_f64(config, "max_steps")?;
    if !(max_steps >= 1.0 && max_steps.fract() == 0.0 && max_steps <= f64::from(u32::MAX)) {
        return Err(RenderError::Configuration(format!(
            "max_steps must be a positive integer, got {max_steps}"
        )));
    }
    let min_distance = require_f64(config, "min_distance")?;
    if !(min_distance > 0.0) {
        return Err(RenderError::Configuration(format!(
            "min_distance must be positive, got {min_distance}"
        )));
    }
    let max_distance = require_f64(config, "max_distance")?;
    if !(max_distance > min_distance) {
        return Err(RenderError::Configuration(format!(
            "max_distance ({max_distance}) must exceed min_distance ({min_distance})"
        )));
    }

    Ok(RenderingParameters {
        max_steps: max_steps as u32,
        min_distance: min_distance as f32,
        max_distance: max_distance as f32,
    })
}

/// Builds [`RaymarchPipeline`]s.
///
/// The step budget comes from the algorithm config and is baked into the
/// fragment shader; the encoding picks how the shader decodes texels.
#[derive(Debug, Clone)]
pub struct RaymarchPipelineBuilder {
    algorithm: Value,
    encoding: TextureEncoding,
}

impl Default for RaymarchPipelineBuilder {
    fn default() -> Self {
        let defaults = RenderingParameters::default();
        Self {
            algorithm: serde_json::json!({
                "max_steps": defaults.max_steps,
                "min_distance": defaults.min_distance,
                "max_distance": defaults.max_distance,
            }),
            encoding: TextureEncoding::default(),
        }
    }
}

impl RaymarchPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the algorithm config (`max_steps`, `min_distance`, `max_distance`).
    pub fn with_algorithm(mut self, algorithm: Value) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Overrides only `max_steps` in the algorithm config.
    ///
    /// A config that is not a JSON object is replaced by the default config
    /// carrying this `max_steps`.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        match self.algorithm.as_object_mut() {
            Some(map) => {
                map.insert("max_steps".to_owned(), max_steps.into());
            }
            None => {
                log::warn!(
                    "algorithm config is not an object ({}), replacing it to set max_steps",
                    self.algorithm
                );
                self.algorithm = Self::default().algorithm;
                self.algorithm["max_steps"] = max_steps.into();
            }
        }
        self
    }

    pub fn with_encoding(mut self, encoding: TextureEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn encoding(&self) -> TextureEncoding {
        self.encoding
    }

    /// Validates field, camera and algorithm config, then generates shaders.
    ///
    /// # Errors
    ///
    /// The first `RenderError::Configuration` raised by the validators.
    pub fn create_raymarching_pipeline(
        &self,
        field: &FieldSignature,
        camera_config: &Value,
    ) -> Result<RaymarchPipeline, RenderError> {
        let sampling = validate_clifford_field_sampling(field)?;
        let camera = validate_camera_mathematics(camera_config)?;
        let rendering = validate_raymarching_algorithm_structure(&self.algorithm)?;

        log::debug!(
            "building raymarch pipeline: {} steps, {} texels",
            rendering.max_steps,
            self.encoding.name()
        );

        Ok(RaymarchPipeline {
            vertex_source: vertex_shader_source(),
            fragment_source: fragment_shader_source(rendering.max_steps, self.encoding),
            uniforms: uniform_table(),
            camera,
            rendering,
            field: FieldDescriptor {
                field_type: "clifford",
                components: FIELD_COMPONENTS,
                grades: GradeLayout {
                    scalar: 1,
                    vector: 3,
                    bivector: 6,
                    trivector: 4,
                    pseudoscalar: 1,
                },
                sampling,
            },
            encoding: self.encoding,
        })
    }
}

/// Uniform name to GLSL type for the generated program.
pub fn uniform_table() -> BTreeMap<&'static str, UniformType> {
    BTreeMap::from([
        (UNIFORM_INVERSE_VIEW, UniformType::Mat4),
        (UNIFORM_INVERSE_PROJECTION, UniformType::Mat4),
        (UNIFORM_CAMERA_POSITION, UniformType::Vec3),
        (UNIFORM_MIN_DISTANCE, UniformType::Float),
        (UNIFORM_MAX_DISTANCE, UniformType::Float),
        (UNIFORM_FIELD, UniformType::Sampler2D),
    ])
}

/// Rebuilds a world-space ray per vertex from the inverse matrices; the
/// rasterizer interpolates it across the quad.
const VERTEX_SHADER: &str = r#"precision highp float;
attribute vec2 position;
varying vec3 vRayDir;

uniform mat4 uInverseViewMatrix;
uniform mat4 uInverseProjectionMatrix;

void main() {
    vec4 viewPos = uInverseProjectionMatrix * vec4(position, 1.0, 1.0);
    viewPos /= viewPos.w;
    vec4 worldDir = uInverseViewMatrix * vec4(viewPos.xyz, 0.0);
    vRayDir = normalize(worldDir.xyz);
    gl_Position = vec4(position, 0.0, 1.0);
}
"#;

const FRAGMENT_HEADER: &str = r#"#ifdef GL_FRAGMENT_PRECISION_HIGH
precision highp float;
#else
precision mediump float;
#endif
varying vec3 vRayDir;

uniform vec3 uCameraPosition;
uniform float uMinDistance;
uniform float uMaxDistance;
uniform sampler2D uCliffordField;
"#;

const FIELD_DISTANCE_GLSL: &str = r#"
float fieldDistance(vec3 pos) {
    vec4 t0 = fieldTexel(TEXEL0);
    vec4 t1 = fieldTexel(TEXEL1);
    vec4 t2 = fieldTexel(TEXEL2);
    vec4 t3 = fieldTexel(TEXEL3);

    float coherence = dot(abs(t0), vec4(1.0)) + dot(abs(t1), vec4(1.0))
        + dot(abs(t2), vec4(1.0)) + dot(abs(t3), vec4(1.0));

    float scalar = t0.r;
    vec3 vectors = t0.gba;
    vec3 bivectors1 = t1.rgb;
    float bivectorE12 = t1.a;
    vec3 bivectors2 = t2.rgb;
    float trivectorE013 = t2.a;
    vec3 trivectors1 = t3.rgb;
    float pseudoscalar = t3.a;

    float scale1 = (pos.x + pos.y + pos.z) * 0.1;
    float scale2 = (pos.x * pos.y + pos.y * pos.z + pos.z * pos.x) * 0.5;
    float scale3 = (pos.x * pos.y * pos.z) * 2.0;

    float layer1 = scalar * cos(scale1)
        + dot(vectors, pos) * sin(scale1)
        + (bivectors1.x * pos.x * pos.y + bivectors1.y * pos.y * pos.z + bivectors1.z * pos.z * pos.x)
            * cos(scale1 * 1.618);
    float layer2 = dot(bivectors2, pos) * sin(scale2)
        + trivectorE013 * cos(pos.x * scale2)
        + trivectors1.x * sin(pos.y * scale2)
        + trivectors1.y * cos(pos.z * scale2);
    float layer3 = pseudoscalar * sin(scale3)
        + trivectors1.z * cos(scale3 * 0.618)
        + bivectorE12 * sin(pos.x * pos.y * scale3);

    float weight = coherence / 16.0;
    float blended = layer1 * (0.3 + weight * 0.2)
        + layer2 * (0.2 + weight * 0.3)
        + layer3 * (0.1 + weight * 0.4)
        + layer1 * layer2 * (0.05 + weight * 0.1)
        + layer2 * layer3 * (0.03 + weight * 0.15)
        + layer3 * layer1 * (0.02 + weight * 0.2);

    float complexity = abs(scalar) * 0.1
        + dot(abs(vectors), vec3(1.0)) * 0.08
        + dot(abs(bivectors1), vec3(1.0)) * 0.06
        + abs(bivectorE12) * 0.05
        + dot(abs(bivectors2), vec3(1.0)) * 0.04
        + abs(trivectorE013) * 0.03
        + dot(abs(trivectors1), vec3(1.0)) * 0.025
        + abs(pseudoscalar) * 0.01;

    float coupling = scalar * dot(vectors, pos) * 0.01
        + dot(vectors, bivectors1) * sin(scale2) * 0.02
        + trivectorE013 * trivectors1.x * cos(scale3) * 0.01
        + bivectors1.x * pos.y * pos.z * sin(scale1) * 0.03
        + bivectors1.y * pos.z * pos.x * cos(scale2) * 0.03
        + bivectors1.z * pos.x * pos.y * sin(scale3) * 0.03
        + vectors.x * bivectors2.y * pos.z * 0.02
        + vectors.y * bivectors2.z * pos.x * 0.02
        + vectors.z * bivectors2.x * pos.y * 0.02
        + trivectorE013 * bivectors2.x * sin(scale1) * 0.015
        + trivectors1.x * trivectors1.y * cos(scale2) * 0.015
        + trivectors1.z * pseudoscalar * sin(scale3) * 0.01;

    float incoherence = abs(blended) / max(complexity, 0.01);
    float fieldDist = blended * (1.0 - RESTORATION * incoherence / (1.0 + incoherence));

    float coupled = coupling;
    coupled += coupling * coupling * sin(weight * PHI * SHADER_PI) * 0.1;
    coupled += coupling * coupling * coupling * cos(weight * PHI * PHI * SHADER_PI) * 0.01;
    coupled += sin(coupling * complexity) * sin(weight * PHI * PHI * PHI * SHADER_PI) * 0.05;
    fieldDist += coupled + complexity * sin(coherence);

    float asymmetry = sin(pos.x * 0.5) * cos(pos.y * 0.3) * sin(pos.z * 0.7) * complexity * 0.1;
    return abs(fieldDist) * (0.1 + coherence * 0.05) + asymmetry;
}
"#;

const RAYMARCH_MAIN_GLSL: &str = r#"
vec3 gradeColor() {
    vec4 t0 = fieldTexel(TEXEL0);
    vec4 t1 = fieldTexel(TEXEL1);
    vec4 t2 = fieldTexel(TEXEL2);
    vec4 t3 = fieldTexel(TEXEL3);

    float scalarStrength = abs(t0.r);
    float vectorStrength = abs(t0.g) + abs(t0.b) + abs(t0.a);
    float bivectorStrength = dot(abs(t1), vec4(1.0)) + abs(t2.r) + abs(t2.g) + abs(t2.b);
    float trivectorStrength = abs(t2.a) + abs(t3.r) + abs(t3.g) + abs(t3.b);
    float pseudoscalarStrength = abs(t3.a);
    float total = scalarStrength + vectorStrength + bivectorStrength
        + trivectorStrength + pseudoscalarStrength;

    vec3 color = vec3(0.1, 0.1, 0.2);
    if (total > 0.01) {
        color = vec3(
            0.1 + 0.9 * (scalarStrength / total) + 0.2 * (trivectorStrength / total),
            0.1 + 0.9 * (vectorStrength / total) + 0.3 * (bivectorStrength / total),
            0.1 + 0.9 * (bivectorStrength / total) + 0.4 * (trivectorStrength / total)
                + 0.1 * (pseudoscalarStrength / total));
        if (trivectorStrength > bivectorStrength * 0.5) {
            color.r = min(1.0, color.r + trivectorStrength * 0.3);
            color.b = min(1.0, color.b + trivectorStrength * 0.4);
            color.g = max(0.0, color.g - trivectorStrength * 0.2);
        }
        if (pseudoscalarStrength > scalarStrength * 0.3) {
            color.r = min(1.0, color.r + pseudoscalarStrength * 0.5);
            color.g = min(1.0, color.g + pseudoscalarStrength * 0.5);
            color.b = min(1.0, color.b + pseudoscalarStrength * 0.3);
        }
    }

    float activation = abs(scalarStrength - vectorStrength) / max(bivectorStrength, 0.01);
    float tint = 1.0 + activation * 0.618;
    return color * vec3(tint, 1.0, 1.0 / tint);
}

vec3 estimateNormal(vec3 p) {
    vec3 dx = vec3(NORMAL_EPS, 0.0, 0.0);
    vec3 dy = vec3(0.0, NORMAL_EPS, 0.0);
    vec3 dz = vec3(0.0, 0.0, NORMAL_EPS);
    vec3 n = vec3(
        fieldDistance(p + dx) - fieldDistance(p - dx),
        fieldDistance(p + dy) - fieldDistance(p - dy),
        fieldDistance(p + dz) - fieldDistance(p - dz));
    float len = length(n);
    return len > 0.0 ? n / len : vec3(0.0);
}

void main() {
    vec3 rayPos = uCameraPosition;
    vec3 rayDir = normalize(vRayDir);
    float travelled = 0.0;

    for (int i = 0; i < MAX_STEPS; i++) {
        float dist = fieldDistance(rayPos);
        if (dist < uMinDistance) {
            float depth = travelled / uMaxDistance;
            vec3 normal = estimateNormal(rayPos);
            float diffuse = max(0.3, dot(normal, normalize(vec3(0.5, 0.7, 1.0))));

            vec3 color = gradeColor() * diffuse * (1.0 - depth * 0.3);
            color += normal * 0.3;
            float phase = travelled * 0.3 + (rayPos.x + rayPos.y + rayPos.z) * 0.2;
            color += 0.3 * vec3(sin(phase * 2.0), cos(phase * 2.2), sin(phase * 1.8));
            color += vec3(0.2 * sin(travelled * 5.0));

            gl_FragColor = vec4(color, 1.0);
            return;
        }

        float stepDist = min(max(abs(dist) * STEP_FRACTION, uMinDistance), MAX_STEP);
        rayPos += rayDir * stepDist;
        travelled += stepDist;
        if (travelled > uMaxDistance) {
            break;
        }
    }

    gl_FragColor = vec4(BACKGROUND, 1.0);
}
"#;

/// Vertex shader source.
pub fn vertex_shader_source() -> String {
    VERTEX_SHADER.to_owned()
}

/// Fragment shader source with `max_steps` and the texel decoder baked in.
pub fn fragment_shader_source(max_steps: u32, encoding: TextureEncoding) -> String {
    let preamble = format!(
        "#define MAX_STEPS {max_steps}\n\
         #define STEP_FRACTION {step:.1}\n\
         #define MAX_STEP {max_step:.1}\n\
         #define NORMAL_EPS 0.01\n\
         #define PHI 1.618033988749\n\
         #define RESTORATION 0.382\n\
         #define SHADER_PI 3.14159\n\
         #define BACKGROUND vec3(0.0, 0.0, 0.1)\n\
         #define TEXEL0 {t0}\n\
         #define TEXEL1 {t1}\n\
         #define TEXEL2 {t2}\n\
         #define TEXEL3 {t3}\n",
        step = crate::trace::STEP_FRACTION,
        max_step = crate::trace::MAX_STEP,
        t0 = glsl_float(texel_center(0)),
        t1 = glsl_float(texel_center(1)),
        t2 = glsl_float(texel_center(2)),
        t3 = glsl_float(texel_center(3)),
    );
    let decoder = format!(
        "\nvec4 fieldTexel(float u) {{\n    vec4 texel = texture2D(uCliffordField, vec2(u, 0.5));\n    {}\n}}\n",
        encoding.glsl_decode()
    );

    let mut source = String::with_capacity(
        FRAGMENT_HEADER.len() + preamble.len() + FIELD_DISTANCE_GLSL.len() + RAYMARCH_MAIN_GLSL.len() + 256,
    );
    source.push_str(FRAGMENT_HEADER);
    source.push_str(&preamble);
    source.push_str(&decoder);
    source.push_str(FIELD_DISTANCE_GLSL);
    source.push_str(RAYMARCH_MAIN_GLSL);
    source
}

/// Formats a float so GLSL ES 1.00 parses it as a float literal.
fn glsl_float(value: f32) -> String {
    let text = format!("{value}");
    if text.contains('.') || text.contains('e') {
        text
    } else {
        format!("{text}.0")
    }
}
