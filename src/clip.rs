//! Primitive clipping against the view volume.

use nalgebra::Vector4;
use smallvec::SmallVec;

use ::interpolate::Interpolate;
use ::shader::MAX_VARYINGS;

/// A vertex between the vertex shader and the rasterizer: a position
/// (clip space before the perspective divide, window space after) plus the
/// varyings the vertex shader produced for it.
#[derive(Debug, Clone, Copy)]
pub struct ClipVertex {
    pub position: Vector4<f32>,
    pub varyings: [Vector4<f32>; MAX_VARYINGS],
}

impl ClipVertex {
    #[inline]
    pub fn new(position: Vector4<f32>, varyings: [Vector4<f32>; MAX_VARYINGS]) -> ClipVertex {
        ClipVertex { position: position, varyings: varyings }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipPlane {
    Left,
    Right,
    Top,
    Bottom,
    Near,
    Far,
}

/// All clipping planes in a constant array. Useful for iterating over all of them.
pub const ALL_CLIP_PLANES: [ClipPlane; 6] = [
    ClipPlane::Left,
    ClipPlane::Right,
    ClipPlane::Top,
    ClipPlane::Bottom,
    ClipPlane::Near,
    ClipPlane::Far,
];

impl ClipPlane {
    /// Check if the clipping plane has the given clip-space point inside of it.
    ///
    /// The volume is `-w <= x,y <= w` and `0 <= z <= w`.
    #[inline]
    pub fn has_inside(self, p: &Vector4<f32>) -> bool {
        match self {
            ClipPlane::Left => p[0] >= -p[3],
            ClipPlane::Right => p[0] <= p[3],
            ClipPlane::Top => p[1] >= -p[3],
            ClipPlane::Bottom => p[1] <= p[3],
            ClipPlane::Near => p[2] >= 0.0,
            ClipPlane::Far => p[2] <= p[3],
        }
    }

    #[inline]
    pub fn bit(self) -> u8 {
        match self {
            ClipPlane::Left => 0x01,
            ClipPlane::Right => 0x02,
            ClipPlane::Top => 0x04,
            ClipPlane::Bottom => 0x08,
            ClipPlane::Near => 0x10,
            ClipPlane::Far => 0x20,
        }
    }

    /// Find the intersection of a line and the clipping plane
    #[inline]
    pub fn intersect(self, v1: &ClipVertex, v2: &ClipVertex) -> ClipVertex {
        let t = self.crossing_parameter(&v1.position, &v2.position);

        ClipVertex {
            position: Interpolate::linear_interpolate(t, &v1.position, &v2.position),
            varyings: Interpolate::linear_interpolate(t, &v1.varyings, &v2.varyings),
        }
    }

    /// Parameter along `p1 -> p2` where the segment crosses this plane.
    #[inline]
    pub fn crossing_parameter(self, p1: &Vector4<f32>, p2: &Vector4<f32>) -> f32 {
        let (a, b) = match self {
            ClipPlane::Left => (p1[3] + p1[0], p2[3] + p2[0]),
            ClipPlane::Right => (p1[3] - p1[0], p2[3] - p2[0]),
            ClipPlane::Top => (p1[3] + p1[1], p2[3] + p2[1]),
            ClipPlane::Bottom => (p1[3] - p1[1], p2[3] - p2[1]),
            ClipPlane::Near => (p1[2], p2[2]),
            ClipPlane::Far => (p1[3] - p1[2], p2[3] - p2[2]),
        };

        a / (a - b)
    }
}

/// Visibility of a primitive against the whole view volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipStatus {
    NotVisible,
    PartiallyVisible,
    FullyVisible,
}

/// Bitmask of the planes a point violates.
#[inline]
pub fn visibility_code(p: &Vector4<f32>) -> u8 {
    let mut code = 0u8;
    for plane in ALL_CLIP_PLANES.iter() {
        if !plane.has_inside(p) {
            code |= plane.bit();
        }
    }
    code
}

/// Classify a primitive by the visibility codes of its vertices.
pub fn classify(positions: &[Vector4<f32>]) -> ClipStatus {
    let mut all = 0xFFu8;
    let mut any = 0u8;

    for p in positions.iter() {
        let code = visibility_code(p);
        all &= code;
        any |= code;
    }

    if all != 0 {
        // every vertex is outside the same plane
        ClipStatus::NotVisible
    } else if any == 0 {
        ClipStatus::FullyVisible
    } else {
        ClipStatus::PartiallyVisible
    }
}

/// Polygon produced by clipping one triangle; at most 3 + 6 vertices.
pub type ClippedPolygon = SmallVec<[ClipVertex; 9]>;

/// Sutherland-Hodgman clipping of a triangle against each violated plane.
///
/// Varyings on introduced vertices are linearly interpolated with the
/// crossing parameter. The result fans into at most 7 triangles; an empty
/// polygon means the triangle degenerated away entirely.
pub fn clip_triangle(triangle: [ClipVertex; 3]) -> ClippedPolygon {
    let mut polygon: ClippedPolygon = SmallVec::new();
    polygon.extend(triangle.iter().cloned());

    let mut scratch: ClippedPolygon = SmallVec::new();

    for plane in ALL_CLIP_PLANES.iter() {
        if polygon.is_empty() {
            break;
        }

        scratch.clear();

        for i in 0..polygon.len() {
            let current = polygon[i];
            let previous = polygon[(i + polygon.len() - 1) % polygon.len()];

            let current_inside = plane.has_inside(&current.position);
            let previous_inside = plane.has_inside(&previous.position);

            if current_inside != previous_inside {
                scratch.push(plane.intersect(&previous, &current));
            }

            if current_inside {
                scratch.push(current);
            }
        }

        ::std::mem::swap(&mut polygon, &mut scratch);
    }

    if polygon.len() < 3 {
        polygon.clear();
    }

    polygon
}

/// Outcode-based Cohen-Sutherland clipping of a window-space segment against
/// the framebuffer rectangle.
///
/// Returns the clipped endpoints along with their parameters on the original
/// segment, so the caller can re-interpolate depth and varyings.
pub fn clip_segment(
    mut a: Vector4<f32>,
    mut b: Vector4<f32>,
    width: f32,
    height: f32,
) -> Option<((Vector4<f32>, f32), (Vector4<f32>, f32))> {
    const INSIDE: u8 = 0;
    const LEFT: u8 = 1;
    const RIGHT: u8 = 2;
    const BOTTOM: u8 = 4;
    const TOP: u8 = 8;

    let x_max = width - 1.0;
    let y_max = height - 1.0;

    let outcode = |p: &Vector4<f32>| -> u8 {
        let mut code = INSIDE;
        if p[0] < 0.0 {
            code |= LEFT;
        } else if p[0] > x_max {
            code |= RIGHT;
        }
        if p[1] < 0.0 {
            code |= BOTTOM;
        } else if p[1] > y_max {
            code |= TOP;
        }
        code
    };

    let mut code_a = outcode(&a);
    let mut code_b = outcode(&b);

    let mut t_a = 0.0f32;
    let mut t_b = 1.0f32;

    loop {
        if code_a | code_b == INSIDE {
            return Some(((a, t_a), (b, t_b)));
        }

        if code_a & code_b != INSIDE {
            return None;
        }

        let code_out = if code_a != INSIDE { code_a } else { code_b };

        // parameter along the current a -> b span
        let s = if code_out & TOP != INSIDE {
            (y_max - a[1]) / (b[1] - a[1])
        } else if code_out & BOTTOM != INSIDE {
            (0.0 - a[1]) / (b[1] - a[1])
        } else if code_out & RIGHT != INSIDE {
            (x_max - a[0]) / (b[0] - a[0])
        } else {
            (0.0 - a[0]) / (b[0] - a[0])
        };

        let clipped = Interpolate::linear_interpolate(s, &a, &b);
        let t = t_a + s * (t_b - t_a);

        if code_out == code_a {
            a = clipped;
            t_a = t;
            code_a = outcode(&a);
        } else {
            b = clipped;
            t_b = t;
            code_b = outcode(&b);
        }
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector4;

    use ::shader::MAX_VARYINGS;

    use super::*;

    fn vertex(x: f32, y: f32, z: f32, w: f32) -> ClipVertex {
        ClipVertex::new(Vector4::new(x, y, z, w), [Vector4::new(0.0, 0.0, 0.0, 0.0); MAX_VARYINGS])
    }

    #[test]
    fn classify_fully_visible() {
        let positions = [
            Vector4::new(0.0, 0.0, 0.5, 1.0),
            Vector4::new(0.5, 0.0, 0.5, 1.0),
            Vector4::new(0.0, 0.5, 0.5, 1.0),
        ];
        assert_eq!(classify(&positions), ClipStatus::FullyVisible);
    }

    #[test]
    fn classify_common_plane_rejects() {
        // every vertex is to the right of the frustum
        let positions = [
            Vector4::new(2.0, 0.0, 0.5, 1.0),
            Vector4::new(3.0, 0.0, 0.5, 1.0),
            Vector4::new(2.0, 0.5, 0.5, 1.0),
        ];
        assert_eq!(classify(&positions), ClipStatus::NotVisible);
    }

    #[test]
    fn classify_straddling_is_partial() {
        let positions = [
            Vector4::new(0.0, 0.0, 0.5, 1.0),
            Vector4::new(2.0, 0.0, 0.5, 1.0),
            Vector4::new(0.0, 0.5, 0.5, 1.0),
        ];
        assert_eq!(classify(&positions), ClipStatus::PartiallyVisible);
    }

    #[test]
    fn clip_produces_vertices_inside_the_volume() {
        // one vertex behind the near plane
        let triangle = [
            vertex(0.0, 0.5, 0.5, 1.0),
            vertex(-0.5, -0.5, 0.5, 1.0),
            vertex(0.5, -0.5, -0.5, 1.0),
        ];

        let polygon = clip_triangle(triangle);
        assert!(polygon.len() >= 3);

        // small tolerance for the interpolated crossings
        let eps = 1.0e-5;
        for v in polygon.iter() {
            let p = v.position;
            assert!(p[0] >= -p[3] - eps && p[0] <= p[3] + eps, "{:?} is outside x", p);
            assert!(p[1] >= -p[3] - eps && p[1] <= p[3] + eps, "{:?} is outside y", p);
            assert!(p[2] >= -eps && p[2] <= p[3] + eps, "{:?} is outside z", p);
        }
    }

    #[test]
    fn clip_keeps_contained_triangles() {
        let triangle = [
            vertex(0.0, 0.5, 0.5, 1.0),
            vertex(-0.5, -0.5, 0.5, 1.0),
            vertex(0.5, -0.5, 0.5, 1.0),
        ];
        let polygon = clip_triangle(triangle);
        assert_eq!(polygon.len(), 3);
    }

    #[test]
    fn clip_discards_degenerate_output() {
        let triangle = [
            vertex(2.0, 0.0, 0.5, 1.0),
            vertex(3.0, 0.0, 0.5, 1.0),
            vertex(2.0, 1.0, 0.5, 1.0),
        ];
        // entirely outside; Sutherland-Hodgman leaves nothing
        assert!(clip_triangle(triangle).is_empty());
    }

    #[test]
    fn segment_accept_and_reject() {
        let inside = clip_segment(
            Vector4::new(1.0, 1.0, 0.0, 1.0),
            Vector4::new(5.0, 5.0, 0.0, 1.0),
            8.0,
            8.0,
        );
        assert!(inside.is_some());

        let outside = clip_segment(
            Vector4::new(-5.0, -1.0, 0.0, 1.0),
            Vector4::new(-1.0, -5.0, 0.0, 1.0),
            8.0,
            8.0,
        );
        assert!(outside.is_none());
    }

    #[test]
    fn segment_clips_to_the_border() {
        let ((a, t_a), (b, t_b)) = clip_segment(
            Vector4::new(-2.0, 3.0, 0.0, 1.0),
            Vector4::new(10.0, 3.0, 0.0, 1.0),
            8.0,
            8.0,
        ).unwrap();

        assert_eq!(a[0], 0.0);
        assert_eq!(b[0], 7.0);
        assert!(t_a > 0.0 && t_a < t_b && t_b < 1.0);
    }
}
