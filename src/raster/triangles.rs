//! Triangle rasterization kernels.
//!
//! The scalar kernel is the normative one; the block kernel walks the span
//! four pixels at a time with branchless queue compaction and must produce
//! the same fragments up to floating-point associativity.

use nalgebra::Vector4;

use ::bins::{FragmentBin, FragQueue, MAX_QUEUED_FRAGS};
use ::framebuffer::FramebufferView;
use ::scanline::{scanline_offset, ScanlineBounds};
use ::shader::{FragCoord, Shader};
use ::texture::{DepthTexel, TextureView};

use super::fragment::flush_fragments;
use super::DepthCompare;

#[inline]
fn bbox_y(bin: &FragmentBin) -> (i32, i32) {
    let p = &bin.screen_coords;
    let min = p[0][1].min(p[1][1]).min(p[2][1]);
    let max = p[0][1].max(p[1][1]).max(p[2][1]);
    (min as i32, max as i32)
}

#[inline]
fn depth_lanes(bin: &FragmentBin) -> Vector4<f32> {
    let p = &bin.screen_coords;
    Vector4::new(p[0][2], p[1][2], p[2][2], 0.0)
}

/// Scalar per-pixel rasterization.
pub fn render_triangles<C: DepthCompare, D: DepthTexel>(
    bins: &[FragmentBin],
    queue: &mut FragQueue,
    fbo: &FramebufferView,
    shader: &Shader,
    depth_buffer: &TextureView,
    thread_id: i32,
    num_threads: i32,
) {
    let mut scanline = ScanlineBounds::default();

    for bin in bins.iter() {
        let (bbox_min_y, bbox_max_y) = bbox_y(bin);
        let offset = scanline_offset(num_threads, thread_id, bbox_min_y);

        let mut y = bbox_min_y + offset;
        if y >= bbox_max_y {
            continue;
        }

        let depth = depth_lanes(bin);
        let p = &bin.screen_coords;
        scanline.init(p[0], p[1], p[2]);

        let bc = &bin.barycentric;
        let mut num_queued = 0;

        while y < bbox_max_y {
            let yf = y as f32;
            let (x_min, x_max) = scanline.step(yf);

            if x_min < x_max {
                let bc_y = bc[1] * yf + bc[2];
                let mut bc_x = bc[0] * x_min as f32 + bc_y;

                let mut x = x_min;
                while x < x_max {
                    let d = if C::READS_DEPTH {
                        unsafe { depth_buffer.depth_texel::<D>(x as u16, y as u16) }
                    } else {
                        0.0
                    };
                    let z = depth.dot(&bc_x);

                    if C::compare(z, d) {
                        queue.bc[num_queued] = bc_x;
                        queue.coord[num_queued] = FragCoord { x: x as u16, y: y as u16, depth: z };
                        num_queued += 1;

                        if num_queued == MAX_QUEUED_FRAGS {
                            flush_fragments::<D>(bin, num_queued, queue, fbo, shader);
                            num_queued = 0;
                        }
                    }

                    bc_x = bc_x + bc[0];
                    x += 1;
                }
            }

            y += num_threads;
        }

        if num_queued > 0 {
            flush_fragments::<D>(bin, num_queued, queue, fbo, shader);
        }
    }
}

/// Rasterize spans four pixels at a time, compacting depth-test survivors
/// into the queue with prefix sums instead of per-lane branches.
pub fn render_triangles_blocks<C: DepthCompare, D: DepthTexel>(
    bins: &[FragmentBin],
    queue: &mut FragQueue,
    fbo: &FramebufferView,
    shader: &Shader,
    depth_buffer: &TextureView,
    thread_id: i32,
    num_threads: i32,
) {
    let mut scanline = ScanlineBounds::default();

    for bin in bins.iter() {
        let (bbox_min_y, bbox_max_y) = bbox_y(bin);
        let offset = scanline_offset(num_threads, thread_id, bbox_min_y);

        let mut y = bbox_min_y + offset;
        if y >= bbox_max_y {
            continue;
        }

        let depth = depth_lanes(bin);
        let p = &bin.screen_coords;
        scanline.init(p[0], p[1], p[2]);

        let bc = &bin.barycentric;
        let mut num_queued = 0;

        while y < bbox_max_y {
            let yf = y as f32;
            let (x_min, x_max) = scanline.step(yf);

            if x_min < x_max {
                let bc_y = bc[1] * yf + bc[2];

                // one barycentric vector per lane, advanced by 4 columns
                let mut block = [
                    bc[0] * x_min as f32 + bc_y,
                    bc[0] * (x_min + 1) as f32 + bc_y,
                    bc[0] * (x_min + 2) as f32 + bc_y,
                    bc[0] * (x_min + 3) as f32 + bc_y,
                ];
                let bc_step = bc[0] * 4.0;

                let mut x = x_min;
                while x < x_max {
                    let mut mask = [0usize; 4];

                    for lane in 0..4 {
                        let xl = x + lane as i32;
                        if xl >= x_max {
                            continue;
                        }

                        let d = if C::READS_DEPTH {
                            unsafe { depth_buffer.depth_texel::<D>(xl as u16, y as u16) }
                        } else {
                            0.0
                        };

                        mask[lane] = C::compare(depth.dot(&block[lane]), d) as usize;
                    }

                    if mask[0] | mask[1] | mask[2] | mask[3] != 0 {
                        // prefix-sum compaction: lanes that fail the test are
                        // overwritten by the next surviving lane
                        let store0 = num_queued;
                        let store1 = store0 + mask[0];
                        let store2 = store1 + mask[1];
                        let store3 = store2 + mask[2];
                        let stores = [store0, store1, store2, store3];

                        let y16 = y as u16;
                        for lane in 0..4 {
                            queue.bc[stores[lane]] = block[lane];
                            queue.coord[stores[lane]] = FragCoord {
                                x: (x + lane as i32) as u16,
                                y: y16,
                                depth: depth.dot(&block[lane]),
                            };
                        }

                        num_queued += mask[0] + mask[1] + mask[2] + mask[3];

                        if num_queued > MAX_QUEUED_FRAGS - 4 {
                            flush_fragments::<D>(bin, num_queued, queue, fbo, shader);
                            num_queued = 0;
                        }
                    }

                    for lane in 0..4 {
                        block[lane] = block[lane] + bc_step;
                    }
                    x += 4;
                }
            }

            y += num_threads;
        }

        if num_queued > 0 {
            flush_fragments::<D>(bin, num_queued, queue, fbo, shader);
        }
    }
}

/// Wireframe rasterization: only the pixels within the per-scanline edge
/// margins are emitted, approximating one-pixel-thick triangle edges without
/// a separate line walk.
pub fn render_wireframe<C: DepthCompare, D: DepthTexel>(
    bins: &[FragmentBin],
    queue: &mut FragQueue,
    fbo: &FramebufferView,
    shader: &Shader,
    depth_buffer: &TextureView,
    thread_id: i32,
    num_threads: i32,
) {
    let mut scanline = ScanlineBounds::default();

    for bin in bins.iter() {
        let (bbox_min_y, bbox_max_y) = bbox_y(bin);
        let offset = scanline_offset(num_threads, thread_id, bbox_min_y);

        let depth = depth_lanes(bin);
        let p = &bin.screen_coords;
        scanline.init(p[0], p[1], p[2]);

        let bc = &bin.barycentric;
        let mut num_queued = 0;

        let mut y = bbox_min_y + offset;
        while y < bbox_max_y {
            let yf = y as f32;
            let bc_y = bc[1] * yf + bc[2];

            // edge thickness from the drift of the span bounds between
            // neighboring scanlines
            let (x_min0, x_max0) = scanline.step(yf);
            let (x_min1, x_max1) = scanline.step(yf - 1.0);
            let d0 = (x_min0 - x_min1).abs().max(1);
            let d1 = (x_max0 - x_max1).abs().max(1);

            let mut ix = 0;
            let mut x = x_min0;
            while x < x_max0 {
                if ix == d0 {
                    // skip to the start of the right-hand edge
                    x = x_min0.max(x_max0 - d1 - 1);
                    ix += 1;
                    x += 1;
                    continue;
                }

                let xf = x as f32;
                let bc_x = bc[0] * xf + bc_y;
                let z = depth.dot(&bc_x);
                let d = if C::READS_DEPTH {
                    unsafe { depth_buffer.depth_texel::<D>(x as u16, y as u16) }
                } else {
                    0.0
                };

                if C::compare(z, d) {
                    queue.bc[num_queued] = bc_x;
                    queue.coord[num_queued] = FragCoord { x: x as u16, y: y as u16, depth: z };
                    num_queued += 1;

                    if num_queued == MAX_QUEUED_FRAGS {
                        flush_fragments::<D>(bin, num_queued, queue, fbo, shader);
                        num_queued = 0;
                    }
                }

                ix += 1;
                x += 1;
            }

            y += num_threads;
        }

        if num_queued > 0 {
            flush_fragments::<D>(bin, num_queued, queue, fbo, shader);
        }
    }
}
