//! Scanline algebra shared by the triangle rasterizers.

use nalgebra::{Vector2, Vector4};

use ::utils::clamp;

/// Smallest non-negative offset `k` such that `(y0 + k) mod n == thread_id`.
///
/// Worker `t` of `n` owns the scanlines where `y mod n == t`; this gives the
/// first scanline at or after `y0` that a worker owns, so the inner raster
/// loops can stride by `n` without touching anyone else's rows.
#[inline]
pub fn scanline_offset(num_threads: i32, thread_id: i32, y0: i32) -> i32 {
    debug_assert!(num_threads > 0 && thread_id < num_threads);
    (thread_id - y0).rem_euclid(num_threads)
}

#[inline]
fn sort_by_y_descending(p0: &mut Vector4<f32>, p1: &mut Vector4<f32>, p2: &mut Vector4<f32>) {
    if p0[1] < p1[1] {
        ::std::mem::swap(p0, p1);
    }
    if p0[1] < p2[1] {
        ::std::mem::swap(p0, p2);
    }
    if p1[1] < p2[1] {
        ::std::mem::swap(p1, p2);
    }
}

#[inline]
fn rcp(x: f32) -> f32 {
    1.0 / x
}

#[inline]
fn min3(a: f32, b: f32, c: f32) -> f32 {
    a.min(b).min(c)
}

#[inline]
fn max3(a: f32, b: f32, c: f32) -> f32 {
    a.max(b).max(c)
}

/// Common method to get the beginning and end of a scanline.
///
/// Initialized once per triangle with the screen-space vertices sorted by
/// descending y; `step` then produces the `[x_min, x_max)` span for a
/// scanline with two fused multiply-adds and a compare.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanlineBounds {
    v0: Vector2<f32>,
    v1: Vector2<f32>,

    p10xy: f32,
    p20y: f32,
    p21xy: f32,
    p20x: f32,

    bbox_min_x: i32,
    bbox_max_x: i32,
}

impl ScanlineBounds {
    /// Initialize with the x bounding box clamped against the framebuffer
    /// width. Used when upstream vertex clipping is disabled and spans can
    /// overhang the render target.
    pub fn init_clamped(&mut self, mut p0: Vector4<f32>, mut p1: Vector4<f32>, mut p2: Vector4<f32>, fbo_w: f32) {
        sort_by_y_descending(&mut p0, &mut p1, &mut p2);

        self.v0 = Vector2::new(p0[0], p0[1]);
        self.v1 = Vector2::new(p1[0], p1[1]);

        self.p20x = p2[0] - p0[0];
        self.p20y = rcp(p2[1] - p0[1]);
        self.p10xy = (p1[0] - p0[0]) * rcp(p1[1] - p0[1]);
        self.p21xy = (p2[0] - p1[0]) * rcp(p2[1] - p1[1]);

        self.bbox_min_x = fbo_w.min(0f32.max(min3(p0[0], p1[0], p2[0]))) as i32;
        self.bbox_max_x = 0f32.max(fbo_w.min(max3(p0[0], p1[0], p2[0])) + 0.5) as i32;
    }

    /// Initialize with the raw x bounding box. Valid when the vertices were
    /// clipped upstream and already lie within the render target.
    pub fn init(&mut self, mut p0: Vector4<f32>, mut p1: Vector4<f32>, mut p2: Vector4<f32>) {
        sort_by_y_descending(&mut p0, &mut p1, &mut p2);

        self.v0 = Vector2::new(p0[0], p0[1]);
        self.v1 = Vector2::new(p1[0], p1[1]);

        self.p20x = p2[0] - p0[0];
        self.p20y = rcp(p2[1] - p0[1]);
        self.p10xy = (p1[0] - p0[0]) * rcp(p1[1] - p0[1]);
        self.p21xy = (p2[0] - p1[0]) * rcp(p2[1] - p1[1]);

        self.bbox_min_x = min3(p0[0], p1[0], p2[0]) as i32;
        self.bbox_max_x = max3(p0[0], p1[0], p2[0]) as i32;
    }

    /// Span of the scanline at `yf`: inclusive on the left, exclusive on the
    /// right. Callers must treat `x_min >= x_max` as an empty span.
    #[inline]
    pub fn step(&self, yf: f32) -> (i32, i32) {
        let d0 = yf - self.v0[1];
        let b = self.p10xy * d0 + self.v0[0];
        let alpha = d0 * self.p20y;

        let d1 = yf - self.v1[1];
        let a = self.p21xy * d1 + self.v1[0];
        let second_half = d1 < 0.0;

        let mut x_min = (self.p20x * alpha + self.v0[0]) as i32;
        let mut x_max = (if second_half { a } else { b }) as i32;

        if x_min > x_max {
            ::std::mem::swap(&mut x_min, &mut x_max);
        }

        x_min = clamp(x_min, self.bbox_min_x, self.bbox_max_x);

        // a flat edge evaluated exactly on its own row yields an unbounded
        // slope; the bounding box caps the span either way
        x_max = x_max.min(self.bbox_max_x);

        (x_min, x_max)
    }

    /// `step` for the path without upstream clipping; the right edge is
    /// clamped into the bounding box too.
    #[inline]
    pub fn step_clamped(&self, yf: f32) -> (i32, i32) {
        let (x_min, x_max) = self.step(yf);
        (x_min, clamp(x_max, self.bbox_min_x, self.bbox_max_x))
    }
}
