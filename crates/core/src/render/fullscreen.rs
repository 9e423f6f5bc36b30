//! Fullscreen quad geometry for the raymarch pass.
//!
//! Two triangles covering clip space. The vertex shader reads each corner
//! through the `position` attribute and rebuilds the world-space ray there;
//! GLSL ES 1.00 has no `gl_VertexID`, so a vertex buffer is required.

/// Clip-space corners of two counter-clockwise triangles, `(x, y)` pairs.
pub const FULLSCREEN_QUAD: [f32; 12] = [
    -1.0, -1.0, //
    1.0, -1.0, //
    1.0, 1.0, //
    -1.0, -1.0, //
    1.0, 1.0, //
    -1.0, 1.0,
];

/// Components per quad vertex.
pub const QUAD_COMPONENTS: i32 = 2;

/// Vertices drawn per frame.
pub const QUAD_VERTEX_COUNT: i32 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    fn vertices() -> Vec<(f32, f32)> {
        FULLSCREEN_QUAD.chunks(2).map(|c| (c[0], c[1])).collect()
    }

    #[test]
    fn quad_has_six_vertices() {
        assert_eq!(
            FULLSCREEN_QUAD.len() as i32,
            QUAD_VERTEX_COUNT * QUAD_COMPONENTS
        );
    }

    #[test]
    fn quad_covers_all_four_corners() {
        let v = vertices();
        for corner in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            assert!(v.contains(&corner), "missing corner {corner:?}");
        }
    }

    #[test]
    fn triangles_wind_counter_clockwise() {
        for tri in vertices().chunks(3) {
            let (a, b, c) = (tri[0], tri[1], tri[2]);
            let area = (b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1);
            assert!(area > 0.0, "clockwise triangle {tri:?}");
        }
    }
}
