//! Point rasterization.

use ::bins::FragmentBin;
use ::framebuffer::FramebufferView;
use ::shader::{FragCoord, Shader};
use ::texture::{DepthTexel, TextureView};

use super::fragment::shade_and_write;
use super::DepthCompare;

/// A point bin shades at most one pixel, so fragments skip the queue and go
/// straight through the fragment pipeline.
pub fn render_points<C: DepthCompare, D: DepthTexel>(
    bins: &[FragmentBin],
    fbo: &FramebufferView,
    shader: &Shader,
    depth_buffer: &TextureView,
    thread_id: i32,
    num_threads: i32,
) {
    let num_varyings = shader.pipeline_state.num_varyings;

    for bin in bins.iter() {
        let position = bin.screen_coords[0];

        let coord = FragCoord {
            x: position[0] as u16,
            y: position[1] as u16,
            depth: position[2],
        };

        if coord.y as i32 % num_threads != thread_id {
            continue;
        }

        if coord.x >= fbo.width || coord.y >= fbo.height {
            continue;
        }

        if C::READS_DEPTH {
            let d = unsafe { depth_buffer.depth_texel::<D>(coord.x, coord.y) };
            if !C::compare(coord.depth, d) {
                continue;
            }
        }

        shade_and_write::<D>(coord, &bin.varyings[0][..num_varyings], fbo, shader);
    }
}
