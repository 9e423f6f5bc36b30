//! Camera pose and the matrices the vertex shader needs to rebuild rays.
//!
//! Matrices are column-major `glam::Mat4`s in the right-handed, OpenGL clip
//! convention. Inversion is done on the CPU because GLSL ES 1.00 has no
//! `inverse()`; a singular input yields the identity and bumps a counter on
//! [`MatrixCache`] instead of failing.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::params::{param_f32, param_vec3};

/// Near clip plane distance.
pub const NEAR_PLANE: f32 = 0.1;
/// Far clip plane distance.
pub const FAR_PLANE: f32 = 1000.0;
/// Determinant magnitude below which a matrix is treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-10;

/// Camera pose. `fov` is the vertical field of view in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov: f32,
    pub aspect_ratio: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 8.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 60.0,
            aspect_ratio: 16.0 / 9.0,
        }
    }
}

impl CameraState {
    /// Reads a possibly partial camera config; missing or mistyped keys take
    /// the defaults. Nothing is range-checked here.
    pub fn from_params(params: &Value) -> Self {
        let d = Self::default();
        Self {
            position: param_vec3(params, "position", d.position),
            target: param_vec3(params, "target", d.target),
            up: param_vec3(params, "up", d.up),
            fov: param_f32(params, "fov", d.fov),
            aspect_ratio: param_f32(params, "aspect_ratio", d.aspect_ratio),
        }
    }
}

/// Builds a right-handed look-at view matrix.
///
/// forward = normalize(target - position), right = normalize(forward x up),
/// up' = right x forward. When forward is parallel to `up` an arbitrary
/// perpendicular up vector is substituted; when position equals target the
/// camera looks down -Z. Both cases log a warning.
pub fn compute_view_matrix(camera: &CameraState) -> Mat4 {
    let offset = camera.target - camera.position;
    let forward = if offset.length_squared() > f32::EPSILON {
        offset.normalize()
    } else {
        log::warn!("camera position equals target; looking down -Z");
        Vec3::NEG_Z
    };

    let mut right = forward.cross(camera.up);
    if right.length_squared() <= f32::EPSILON {
        log::warn!("camera up vector is parallel to the view direction; substituting one");
        right = forward.cross(forward.any_orthonormal_vector());
    }
    let right = right.normalize();
    let up = right.cross(forward);
    let eye = camera.position;

    Mat4::from_cols_array(&[
        right.x,
        up.x,
        -forward.x,
        0.0,
        right.y,
        up.y,
        -forward.y,
        0.0,
        right.z,
        up.z,
        -forward.z,
        0.0,
        -right.dot(eye),
        -up.dot(eye),
        forward.dot(eye),
        1.0,
    ])
}

/// Perspective projection from the vertical fov, aspect ratio and the fixed
/// [`NEAR_PLANE`] / [`FAR_PLANE`].
pub fn compute_projection_matrix(camera: &CameraState) -> Mat4 {
    Mat4::perspective_rh_gl(
        camera.fov.to_radians(),
        camera.aspect_ratio,
        NEAR_PLANE,
        FAR_PLANE,
    )
}

/// Inverts a 4x4 matrix by cofactor expansion, or returns `None` when
/// `|det| < SINGULAR_EPSILON`. Arithmetic is done in `f64`.
pub fn try_invert_matrix4(matrix: &Mat4) -> Option<Mat4> {
    let m = matrix.to_cols_array().map(f64::from);
    // a(row, col) over column-major storage.
    let a = |r: usize, c: usize| m[c * 4 + r];

    let s0 = a(0, 0) * a(1, 1) - a(1, 0) * a(0, 1);
    let s1 = a(0, 0) * a(1, 2) - a(1, 0) * a(0, 2);
    let s2 = a(0, 0) * a(1, 3) - a(1, 0) * a(0, 3);
    let s3 = a(0, 1) * a(1, 2) - a(1, 1) * a(0, 2);
    let s4 = a(0, 1) * a(1, 3) - a(1, 1) * a(0, 3);
    let s5 = a(0, 2) * a(1, 3) - a(1, 2) * a(0, 3);

    let c5 = a(2, 2) * a(3, 3) - a(3, 2) * a(2, 3);
    let c4 = a(2, 1) * a(3, 3) - a(3, 1) * a(2, 3);
    let c3 = a(2, 1) * a(3, 2) - a(3, 1) * a(2, 2);
    let c2 = a(2, 0) * a(3, 3) - a(3, 0) * a(2, 3);
    let c1 = a(2, 0) * a(3, 2) - a(3, 0) * a(2, 2);
    let c0 = a(2, 0) * a(3, 1) - a(3, 0) * a(2, 1);

    let det = s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0;
    if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    // b[row][col] of the inverse.
    let b = [
        [
            a(1, 1) * c5 - a(1, 2) * c4 + a(1, 3) * c3,
            -a(0, 1) * c5 + a(0, 2) * c4 - a(0, 3) * c3,
            a(3, 1) * s5 - a(3, 2) * s4 + a(3, 3) * s3,
            -a(2, 1) * s5 + a(2, 2) * s4 - a(2, 3) * s3,
        ],
        [
            -a(1, 0) * c5 + a(1, 2) * c2 - a(1, 3) * c1,
            a(0, 0) * c5 - a(0, 2) * c2 + a(0, 3) * c1,
            -a(3, 0) * s5 + a(3, 2) * s2 - a(3, 3) * s1,
            a(2, 0) * s5 - a(2, 2) * s2 + a(2, 3) * s1,
        ],
        [
            a(1, 0) * c4 - a(1, 1) * c2 + a(1, 3) * c0,
            -a(0, 0) * c4 + a(0, 1) * c2 - a(0, 3) * c0,
            a(3, 0) * s4 - a(3, 1) * s2 + a(3, 3) * s0,
            -a(2, 0) * s4 + a(2, 1) * s2 - a(2, 3) * s0,
        ],
        [
            -a(1, 0) * c3 + a(1, 1) * c1 - a(1, 2) * c0,
            a(0, 0) * c3 - a(0, 1) * c1 + a(0, 2) * c0,
            -a(3, 0) * s3 + a(3, 1) * s1 - a(3, 2) * s0,
            a(2, 0) * s3 - a(2, 1) * s1 + a(2, 2) * s0,
        ],
    ];

    let mut cols = [0.0_f32; 16];
    for (col, chunk) in cols.chunks_exact_mut(4).enumerate() {
        for (row, slot) in chunk.iter_mut().enumerate() {
            *slot = (b[row][col] * inv_det) as f32;
        }
    }
    Some(Mat4::from_cols_array(&cols))
}

/// Inverts a 4x4 matrix, substituting the identity when it is singular.
pub fn invert_matrix4(matrix: &Mat4) -> Mat4 {
    try_invert_matrix4(matrix).unwrap_or(Mat4::IDENTITY)
}

/// View and projection matrices plus their inverses for one camera pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub inverse_view: Mat4,
    pub inverse_projection: Mat4,
}

/// Caches [`CameraMatrices`] for the last seen camera pose.
///
/// The pose is compared by value; matrices are rebuilt only when it changes.
#[derive(Debug, Default)]
pub struct MatrixCache {
    last: Option<(CameraState, CameraMatrices)>,
    recomputations: u64,
    singular_fallbacks: u64,
}

impl MatrixCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the matrices for `camera`, recomputing only on a pose change.
    pub fn matrices(&mut self, camera: &CameraState) -> CameraMatrices {
        if let Some((cached, matrices)) = &self.last {
            if cached == camera {
                return *matrices;
            }
        }

        let view = compute_view_matrix(camera);
        let projection = compute_projection_matrix(camera);
        let inverse_view = self.invert_or_identity(&view, "view");
        let inverse_projection = self.invert_or_identity(&projection, "projection");
        let matrices = CameraMatrices {
            view,
            projection,
            inverse_view,
            inverse_projection,
        };

        self.recomputations += 1;
        self.last = Some((*camera, matrices));
        matrices
    }

    fn invert_or_identity(&mut self, matrix: &Mat4, which: &str) -> Mat4 {
        match try_invert_matrix4(matrix) {
            Some(inverse) => inverse,
            None => {
                self.singular_fallbacks += 1;
                log::warn!("{which} matrix is singular; using identity as its inverse");
                Mat4::IDENTITY
            }
        }
    }

    /// How many times matrices were rebuilt.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// How many inversions fell back to the identity.
    pub fn singular_fallbacks(&self) -> u64 {
        self.singular_fallbacks
    }

    /// Forgets the cached pose.
    pub fn invalidate(&mut self) {
        self.last = None;
    }
}
