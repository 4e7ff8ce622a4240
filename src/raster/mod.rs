//! Bin consumption: scanline rasterization and the fragment pipeline.

pub mod fragment;
pub mod lines;
pub mod points;
pub mod triangles;

use ::bins::{FragmentBin, FragQueue};
use ::color::ColorType;
use ::framebuffer::FramebufferView;
use ::half::Half;
use ::mesh::RenderMode;
use ::shader::{DepthTest, Shader};
use ::texture::{DepthTexel, TextureView};

/// Depth comparison monomorphized into the raster kernels.
pub trait DepthCompare {
    /// `false` lets kernels skip the depth texel load entirely.
    const READS_DEPTH: bool = true;

    fn compare(frag: f32, dst: f32) -> bool;
}

pub struct DepthOff;
pub struct DepthLt;
pub struct DepthLe;
pub struct DepthGt;
pub struct DepthGe;
pub struct DepthEq;
pub struct DepthNe;

impl DepthCompare for DepthOff {
    const READS_DEPTH: bool = false;

    #[inline(always)]
    fn compare(_: f32, _: f32) -> bool { true }
}

impl DepthCompare for DepthLt {
    #[inline(always)]
    fn compare(frag: f32, dst: f32) -> bool { frag < dst }
}

impl DepthCompare for DepthLe {
    #[inline(always)]
    fn compare(frag: f32, dst: f32) -> bool { frag <= dst }
}

impl DepthCompare for DepthGt {
    #[inline(always)]
    fn compare(frag: f32, dst: f32) -> bool { frag > dst }
}

impl DepthCompare for DepthGe {
    #[inline(always)]
    fn compare(frag: f32, dst: f32) -> bool { frag >= dst }
}

impl DepthCompare for DepthEq {
    #[inline(always)]
    fn compare(frag: f32, dst: f32) -> bool { frag == dst }
}

impl DepthCompare for DepthNe {
    #[inline(always)]
    fn compare(frag: f32, dst: f32) -> bool { frag != dst }
}

/// Drain a batch of bins for one worker, selecting the kernel monomorphized
/// for the bound depth function, depth texel type, and render mode.
pub fn rasterize_bins(
    mode: RenderMode,
    shader: &Shader,
    fbo: &FramebufferView,
    bins: &[FragmentBin],
    queue: &mut FragQueue,
    thread_id: i32,
    num_threads: i32,
) {
    match shader.pipeline_state.depth_test {
        DepthTest::Off => with_depth_func::<DepthOff>(mode, shader, fbo, bins, queue, thread_id, num_threads),
        DepthTest::Lt => with_depth_func::<DepthLt>(mode, shader, fbo, bins, queue, thread_id, num_threads),
        DepthTest::Le => with_depth_func::<DepthLe>(mode, shader, fbo, bins, queue, thread_id, num_threads),
        DepthTest::Gt => with_depth_func::<DepthGt>(mode, shader, fbo, bins, queue, thread_id, num_threads),
        DepthTest::Ge => with_depth_func::<DepthGe>(mode, shader, fbo, bins, queue, thread_id, num_threads),
        DepthTest::Eq => with_depth_func::<DepthEq>(mode, shader, fbo, bins, queue, thread_id, num_threads),
        DepthTest::Ne => with_depth_func::<DepthNe>(mode, shader, fbo, bins, queue, thread_id, num_threads),
    }
}

fn with_depth_func<C: DepthCompare>(
    mode: RenderMode,
    shader: &Shader,
    fbo: &FramebufferView,
    bins: &[FragmentBin],
    queue: &mut FragQueue,
    thread_id: i32,
    num_threads: i32,
) {
    match fbo.depth_type {
        Some(ColorType::R16F) => with_depth_texel::<C, Half>(mode, shader, fbo, bins, queue, thread_id, num_threads),
        Some(ColorType::R64F) => with_depth_texel::<C, f64>(mode, shader, fbo, bins, queue, thread_id, num_threads),
        Some(_) | None => with_depth_texel::<C, f32>(mode, shader, fbo, bins, queue, thread_id, num_threads),
    }
}

fn with_depth_texel<C: DepthCompare, D: DepthTexel>(
    mode: RenderMode,
    shader: &Shader,
    fbo: &FramebufferView,
    bins: &[FragmentBin],
    queue: &mut FragQueue,
    thread_id: i32,
    num_threads: i32,
) {
    debug_assert!(fbo.depth.is_some() || !C::READS_DEPTH);

    let depth = match fbo.depth {
        Some(view) => view,
        None => TextureView::detached(),
    };

    match mode {
        RenderMode::Points => {
            points::render_points::<C, D>(bins, fbo, shader, &depth, thread_id, num_threads)
        }
        RenderMode::Lines => {
            lines::render_lines::<C, D>(bins, queue, fbo, shader, &depth, thread_id, num_threads)
        }
        RenderMode::Triangles | RenderMode::IndexedTriangles => {
            triangles::render_triangles_blocks::<C, D>(bins, queue, fbo, shader, &depth, thread_id, num_threads)
        }
        RenderMode::TriWire | RenderMode::IndexedTriWire => {
            triangles::render_wireframe::<C, D>(bins, queue, fbo, shader, &depth, thread_id, num_threads)
        }
    }
}
