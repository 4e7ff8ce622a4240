//! The back half of the pipeline: varying interpolation, fragment shading,
//! blending, and writeback.

use nalgebra::Vector4;

use ::bins::{FragmentBin, FragQueue};
use ::framebuffer::FramebufferView;
use ::interpolate::Interpolate;
use ::shader::{BlendMode, FragCoord, FragmentParam, Shader, VaryingInterp, MAX_RENDER_TARGETS, MAX_VARYINGS};
use ::texture::DepthTexel;

/// Correct screen-space barycentrics by the interpolated `1/w`.
#[inline]
fn perspective_weights(bc: &Vector4<f32>, rw: &Vector4<f32>) -> Vector4<f32> {
    let w0 = bc[0] * rw[0];
    let w1 = bc[1] * rw[1];
    let w2 = bc[2] * rw[2];
    let sum = w0 + w1 + w2;

    if sum != 0.0 && sum.is_finite() {
        let r = 1.0 / sum;
        Vector4::new(w0 * r, w1 * r, w2 * r, 0.0)
    } else {
        *bc
    }
}

/// Run the fragment shader for one surviving fragment and write its outputs
/// through the blend stage, plus the depth attachment when the mask is on.
pub fn shade_and_write<D: DepthTexel>(
    coord: FragCoord,
    varyings: &[Vector4<f32>],
    fbo: &FramebufferView,
    shader: &Shader,
) {
    let state = &shader.pipeline_state;
    let num_outputs = state.num_render_targets.min(fbo.colors.len());

    let mut outputs = [Vector4::new(0.0, 0.0, 0.0, 0.0); MAX_RENDER_TARGETS];

    let keep = {
        let mut param = FragmentParam {
            coord: coord,
            uniforms: shader.uniforms,
            varyings: varyings,
            outputs: &mut outputs[..num_outputs],
        };

        (shader.fragment_shader)(&mut param)
    };

    if !keep {
        return;
    }

    for target in 0..num_outputs {
        unsafe {
            match state.blend_mode {
                BlendMode::Off => fbo.put_pixel(target, coord.x, coord.y, &outputs[target]),
                blend => fbo.put_blended_pixel(target, coord.x, coord.y, &outputs[target], blend),
            }
        }
    }

    if state.depth_mask {
        unsafe {
            fbo.put_depth_pixel::<D>(coord.x, coord.y, coord.depth);
        }
    }
}

/// Flush queued fragments of one bin through the fragment pipeline.
pub fn flush_fragments<D: DepthTexel>(
    bin: &FragmentBin,
    count: usize,
    queue: &FragQueue,
    fbo: &FramebufferView,
    shader: &Shader,
) {
    let state = &shader.pipeline_state;
    let num_varyings = state.num_varyings;

    let rw = Vector4::new(
        bin.screen_coords[0][3],
        bin.screen_coords[1][3],
        bin.screen_coords[2][3],
        0.0,
    );

    for i in 0..count {
        let bc = queue.bc[i];

        let weights = match state.varying_interp {
            VaryingInterp::Perspective => perspective_weights(&bc, &rw),
            VaryingInterp::NoPerspective => bc,
        };

        let mut varyings = [Vector4::new(0.0, 0.0, 0.0, 0.0); MAX_VARYINGS];
        for v in 0..num_varyings {
            varyings[v] = Interpolate::barycentric_interpolate(
                weights[0], &bin.varyings[0][v],
                weights[1], &bin.varyings[1][v],
                weights[2], &bin.varyings[2][v],
            );
        }

        shade_and_write::<D>(queue.coord[i], &varyings[..num_varyings], fbo, shader);
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector4;

    use super::perspective_weights;

    #[test]
    fn uniform_w_is_a_no_op() {
        let bc = Vector4::new(0.2, 0.3, 0.5, 0.0);
        let rw = Vector4::new(1.0, 1.0, 1.0, 0.0);
        let w = perspective_weights(&bc, &rw);

        for i in 0..3 {
            assert!((w[i] - bc[i]).abs() < 1.0e-6);
        }
    }

    #[test]
    fn closer_vertices_pull_weight() {
        // vertex 0 is twice as close (larger 1/w)
        let bc = Vector4::new(0.5, 0.5, 0.0, 0.0);
        let rw = Vector4::new(2.0, 1.0, 1.0, 0.0);
        let w = perspective_weights(&bc, &rw);

        assert!(w[0] > w[1]);
        assert!((w[0] + w[1] + w[2] - 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn two_vertex_weights_for_lines() {
        // line bins leave the third slot zeroed
        let bc = Vector4::new(0.25, 0.75, 0.0, 0.0);
        let rw = Vector4::new(1.0, 1.0, 0.0, 0.0);
        let w = perspective_weights(&bc, &rw);

        assert!((w[0] - 0.25).abs() < 1.0e-6);
        assert!((w[1] - 0.75).abs() < 1.0e-6);
        assert_eq!(w[2], 0.0);
    }
}
