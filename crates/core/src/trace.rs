//! CPU reference of the fragment shader's sphere tracer and hit shading.
//!
//! Used for regression tests and for rendering snapshots without a GPU. The
//! loop and shading constants match `RAYMARCH_MAIN_GLSL` in the pipeline
//! module.

use glam::{Vec2, Vec3, Vec4};

use crate::camera::{CameraMatrices, CameraState};
use crate::field::MultivectorField;
use crate::sdf::{estimate_normal, field_distance};
use crate::state::RenderingParameters;

/// Fraction of the evaluated distance taken per step.
pub const STEP_FRACTION: f32 = 0.9;
/// Upper bound on a single step.
pub const MAX_STEP: f32 = 2.0;
/// Color written when a ray escapes.
pub const BACKGROUND: Vec3 = Vec3::new(0.0, 0.0, 0.1);

/// Result of tracing one ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraceOutcome {
    /// The distance dropped below `min_distance` at `position`.
    Hit {
        position: Vec3,
        travelled: f32,
        steps: u32,
    },
    /// The ray ran out of steps or passed `max_distance`.
    Miss { travelled: f32, steps: u32 },
}

/// World-space ray direction for a point in normalized device coordinates,
/// rebuilt exactly as the vertex shader does: unproject at the far plane,
/// divide by w, rotate into world space with w = 0.
pub fn ray_direction(matrices: &CameraMatrices, ndc: Vec2) -> Vec3 {
    let view = matrices.inverse_projection * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
    let view = view / view.w;
    let world = matrices.inverse_view * Vec4::new(view.x, view.y, view.z, 0.0);
    world.truncate().normalize_or_zero()
}

/// Sphere-traces the field from `origin` along `direction`.
pub fn trace_ray(
    field: &MultivectorField,
    origin: Vec3,
    direction: Vec3,
    params: &RenderingParameters,
) -> TraceOutcome {
    let mut position = origin;
    let mut travelled = 0.0_f32;

    for step in 0..params.max_steps {
        let distance = field_distance(field, position);
        if distance < params.min_distance {
            return TraceOutcome::Hit {
                position,
                travelled,
                steps: step,
            };
        }

        let advance = (distance.abs() * STEP_FRACTION)
            .max(params.min_distance)
            .min(MAX_STEP);
        position += direction * advance;
        travelled += advance;

        if travelled > params.max_distance {
            return TraceOutcome::Miss {
                travelled,
                steps: step + 1,
            };
        }
    }

    TraceOutcome::Miss {
        travelled,
        steps: params.max_steps,
    }
}

/// Base color from grade ratios before lighting, including the
/// trivector/pseudoscalar emphasis and the restoration tint.
pub fn grade_color(field: &MultivectorField) -> Vec3 {
    let g = field.grade_strengths();
    let total = g.total();

    let mut color = if total > 0.01 {
        let mut c = Vec3::new(
            0.1 + 0.9 * (g.scalar / total) + 0.2 * (g.trivector / total),
            0.1 + 0.9 * (g.vector / total) + 0.3 * (g.bivector / total),
            0.1 + 0.9 * (g.bivector / total)
                + 0.4 * (g.trivector / total)
                + 0.1 * (g.pseudoscalar / total),
        );
        if g.trivector > g.bivector * 0.5 {
            c.x = (c.x + g.trivector * 0.3).min(1.0);
            c.z = (c.z + g.trivector * 0.4).min(1.0);
            c.y = (c.y - g.trivector * 0.2).max(0.0);
        }
        if g.pseudoscalar > g.scalar * 0.3 {
            c.x = (c.x + g.pseudoscalar * 0.5).min(1.0);
            c.y = (c.y + g.pseudoscalar * 0.5).min(1.0);
            c.z = (c.z + g.pseudoscalar * 0.3).min(1.0);
        }
        c
    } else {
        Vec3::new(0.1, 0.1, 0.2)
    };

    let activation = (g.scalar - g.vector).abs() / g.bivector.max(0.01);
    let tint = 1.0 + activation * 0.618;
    color *= Vec3::new(tint, 1.0, 1.0 / tint);
    color
}

/// Lit color at a hit point. Output is not clamped; the framebuffer does that.
pub fn shade_hit(
    field: &MultivectorField,
    position: Vec3,
    travelled: f32,
    params: &RenderingParameters,
) -> Vec3 {
    let depth = travelled / params.max_distance;
    let normal = estimate_normal(field, position);
    let light = Vec3::new(0.5, 0.7, 1.0).normalize();
    let diffuse = normal.dot(light).max(0.3);

    let mut color = grade_color(field) * diffuse * (1.0 - depth * 0.3);
    color += normal * 0.3;

    let phase = travelled * 0.3 + (position.x + position.y + position.z) * 0.2;
    color += Vec3::new(
        0.3 * (phase * 2.0).sin(),
        0.3 * (phase * 2.2).cos(),
        0.3 * (phase * 1.8).sin(),
    );
    color + Vec3::splat(0.2 * (travelled * 5.0).sin())
}

/// Traces and shades one pixel, returning an RGB color clamped to [0, 1].
pub fn render_pixel(
    field: &MultivectorField,
    camera: &CameraState,
    matrices: &CameraMatrices,
    params: &RenderingParameters,
    ndc: Vec2,
) -> Vec3 {
    let direction = ray_direction(matrices, ndc);
    let color = match trace_ray(field, camera.position, direction, params) {
        TraceOutcome::Hit {
            position,
            travelled,
            ..
        } => shade_hit(field, position, travelled, params),
        TraceOutcome::Miss { .. } => BACKGROUND,
    };
    color.clamp(Vec3::ZERO, Vec3::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::MatrixCache;

    fn params() -> RenderingParameters {
        RenderingParameters::default()
    }

    #[test]
    fn zero_field_hits_on_first_step() {
        let outcome = trace_ray(
            &MultivectorField::zeros(),
            Vec3::new(0.0, 0.0, 8.0),
            Vec3::NEG_Z,
            &params(),
        );
        assert_eq!(
            outcome,
            TraceOutcome::Hit {
                position: Vec3::new(0.0, 0.0, 8.0),
                travelled: 0.0,
                steps: 0
            }
        );
    }

    #[test]
    fn steps_are_clamped_to_max_step() {
        // A strong scalar keeps the distance well above the hit threshold along +X.
        let field = MultivectorField::zeros().with(0, 9.0);
        let params = RenderingParameters {
            max_steps: 3,
            min_distance: 0.001,
            max_distance: 1000.0,
        };
        match trace_ray(&field, Vec3::ZERO, Vec3::X, &params) {
            TraceOutcome::Miss { travelled, steps } => {
                assert_eq!(steps, 3);
                assert!(travelled <= 3.0 * MAX_STEP + 1e-5, "travelled {travelled}");
            }
            hit => panic!("expected a miss, got {hit:?}"),
        }
    }

    #[test]
    fn ray_stops_past_max_distance() {
        let field = MultivectorField::zeros().with(0, 9.0);
        let params = RenderingParameters {
            max_steps: 64,
            min_distance: 0.001,
            max_distance: 1.0,
        };
        match trace_ray(&field, Vec3::ZERO, Vec3::X, &params) {
            TraceOutcome::Miss { travelled, .. } => assert!(travelled > 1.0),
            hit => panic!("expected a miss, got {hit:?}"),
        }
    }

    #[test]
    fn center_ray_points_at_target() {
        let camera = CameraState {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 60.0,
            aspect_ratio: 1.0,
        };
        let matrices = MatrixCache::new().matrices(&camera);
        let dir = ray_direction(&matrices, Vec2::ZERO);
        assert!(dir.abs_diff_eq(Vec3::NEG_Z, 1e-4), "dir: {dir}");
    }

    #[test]
    fn corner_ray_spreads_by_half_fov() {
        let camera = CameraState {
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: 90.0,
            aspect_ratio: 1.0,
        };
        let matrices = MatrixCache::new().matrices(&camera);
        let dir = ray_direction(&matrices, Vec2::new(0.0, 1.0));
        // Top edge of a 90 degree frustum is 45 degrees above the axis.
        assert!((dir.y - dir.z.abs()).abs() < 1e-3, "dir: {dir}");
    }

    #[test]
    fn weak_field_uses_fallback_color() {
        let color = grade_color(&MultivectorField::zeros());
        assert_eq!(color, Vec3::new(0.1, 0.1, 0.2));
    }

    #[test]
    fn scalar_dominant_field_is_red_tinted() {
        let color = grade_color(&MultivectorField::zeros().with(0, 1.0));
        assert!(color.x > color.y && color.x > color.z, "color: {color}");
    }

    #[test]
    fn miss_renders_background() {
        let field = MultivectorField::zeros().with(0, 9.0);
        let camera = CameraState::default();
        let matrices = MatrixCache::new().matrices(&camera);
        let params = RenderingParameters {
            max_steps: 2,
            ..RenderingParameters::default()
        };
        let color = render_pixel(&field, &camera, &matrices, &params, Vec2::ZERO);
        assert_eq!(color, BACKGROUND);
    }

    #[test]
    fn rendered_pixels_are_clamped() {
        let field = MultivectorField::new([3.0; 16]);
        let camera = CameraState::default();
        let matrices = MatrixCache::new().matrices(&camera);
        for (x, y) in [(-0.9, -0.9), (0.0, 0.0), (0.5, -0.2)] {
            let c = render_pixel(&field, &camera, &matrices, &params(), Vec2::new(x, y));
            assert!(c.min_element() >= 0.0 && c.max_element() <= 1.0, "color: {c}");
        }
    }
}
