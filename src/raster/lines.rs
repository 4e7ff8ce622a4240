//! Line rasterization.

use nalgebra::Vector4;

use ::bins::{FragmentBin, FragQueue, MAX_QUEUED_FRAGS};
use ::framebuffer::FramebufferView;
use ::shader::{FragCoord, Shader};
use ::texture::{DepthTexel, TextureView};

use super::fragment::flush_fragments;
use super::DepthCompare;

/// Uses Bresenham's algorithm to walk the pixels of a segment.
fn walk_line_bresenham<F>(mut x0: i32, mut y0: i32, x1: i32, y1: i32, mut plot: F) where F: FnMut(i32, i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();

    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };

    let mut err = dx + dy;

    loop {
        plot(x0, y0);

        if x0 == x1 && y0 == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            err += dy;
            x0 += sx;
        }

        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Rasterize line bins. The `y mod num_threads` scanline filter applies per
/// plotted pixel; fragments carry two-point barycentrics `(1-t, t, 0)` so
/// the shared fragment pipeline interpolates the endpoint varyings.
pub fn render_lines<C: DepthCompare, D: DepthTexel>(
    bins: &[FragmentBin],
    queue: &mut FragQueue,
    fbo: &FramebufferView,
    shader: &Shader,
    depth_buffer: &TextureView,
    thread_id: i32,
    num_threads: i32,
) {
    for bin in bins.iter() {
        let a = bin.screen_coords[0];
        let b = bin.screen_coords[1];

        let (x0, y0) = (a[0] as i32, a[1] as i32);
        let (x1, y1) = (b[0] as i32, b[1] as i32);

        // parameterize along the dominant axis
        let span_x = (x1 - x0).abs();
        let span_y = (y1 - y0).abs();
        let length = span_x.max(span_y).max(1) as f32;

        let mut num_queued = 0;

        walk_line_bresenham(x0, y0, x1, y1, |x, y| {
            if y % num_threads != thread_id {
                return;
            }

            if x < 0 || y < 0 || x >= fbo.width as i32 || y >= fbo.height as i32 {
                return;
            }

            let t = if span_x >= span_y {
                (x - x0).abs() as f32 / length
            } else {
                (y - y0).abs() as f32 / length
            };

            let z = a[2] * (1.0 - t) + b[2] * t;

            if C::READS_DEPTH {
                let d = unsafe { depth_buffer.depth_texel::<D>(x as u16, y as u16) };
                if !C::compare(z, d) {
                    return;
                }
            }

            queue.bc[num_queued] = Vector4::new(1.0 - t, t, 0.0, 0.0);
            queue.coord[num_queued] = FragCoord { x: x as u16, y: y as u16, depth: z };
            num_queued += 1;

            if num_queued == MAX_QUEUED_FRAGS {
                flush_fragments::<D>(bin, num_queued, queue, fbo, shader);
                num_queued = 0;
            }
        });

        if num_queued > 0 {
            flush_fragments::<D>(bin, num_queued, queue, fbo, shader);
        }
    }
}
