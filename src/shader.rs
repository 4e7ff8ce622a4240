//! The programmable shader contract and fixed-function pipeline state.

use nalgebra::Vector4;

use ::uniform::UniformBuffer;

/// Number of `vec4` varying slots carried from the vertex shader to the
/// fragment shader.
pub const MAX_VARYINGS: usize = 4;

/// Number of color attachments a fragment shader may write.
pub const MAX_RENDER_TARGETS: usize = 4;

/// How fragment shader output is combined with the existing framebuffer
/// color. All math happens on normalized floats before the cast back into
/// the attachment's format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Replace the destination.
    Off,
    /// `src·a + dst·(1−a)`, with alpha itself composited "over".
    Alpha,
    /// `src + dst·(1−a)` for pre-multiplied sources.
    Premultiplied,
    /// `src + dst`
    Additive,
    /// `src + dst − src·dst`
    Screen,
}

impl BlendMode {
    #[inline]
    pub fn apply(self, src: Vector4<f32>, dst: Vector4<f32>) -> Vector4<f32> {
        match self {
            BlendMode::Off => src,
            BlendMode::Alpha => {
                let a = src[3];
                Vector4::new(
                    src[0] * a + dst[0] * (1.0 - a),
                    src[1] * a + dst[1] * (1.0 - a),
                    src[2] * a + dst[2] * (1.0 - a),
                    a + dst[3] * (1.0 - a),
                )
            }
            BlendMode::Premultiplied => {
                let a = src[3];
                src + dst * (1.0 - a)
            }
            BlendMode::Additive => src + dst,
            BlendMode::Screen => {
                Vector4::new(
                    src[0] + dst[0] - src[0] * dst[0],
                    src[1] + dst[1] - src[1] * dst[1],
                    src[2] + dst[2] - src[2] * dst[2],
                    src[3] + dst[3] - src[3] * dst[3],
                )
            }
        }
    }
}

/// Fragment-versus-destination depth comparison. A fragment is kept iff the
/// function passes; `Off` keeps everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthTest {
    Off,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// Winding-based primitive rejection, evaluated on the signed window-space
/// area of the triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    Off,
    Back,
    Front,
}

/// Whether varyings are interpolated with perspective correction (division
/// by the interpolated `1/w`) or directly in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaryingInterp {
    Perspective,
    NoPerspective,
}

/// Fixed-function state bound alongside the shader pair for one draw.
#[derive(Debug, Clone, Copy)]
pub struct PipelineState {
    pub blend_mode: BlendMode,
    pub depth_test: DepthTest,
    pub depth_mask: bool,
    pub cull_mode: CullMode,
    pub num_render_targets: usize,
    pub num_varyings: usize,
    pub varying_interp: VaryingInterp,
}

impl Default for PipelineState {
    fn default() -> PipelineState {
        PipelineState {
            blend_mode: BlendMode::Off,
            depth_test: DepthTest::Lt,
            depth_mask: true,
            cull_mode: CullMode::Off,
            num_render_targets: 1,
            num_varyings: 0,
            varying_interp: VaryingInterp::Perspective,
        }
    }
}

/// Window-space position of a fragment, as handed to the fragment shader.
#[derive(Debug, Clone, Copy, Default)]
pub struct FragCoord {
    pub x: u16,
    pub y: u16,
    pub depth: f32,
}

/// Inputs to one vertex shader invocation.
pub struct VertexParam<'a> {
    pub vertex_id: u32,
    pub instance_id: u32,
    pub uniforms: &'a UniformBuffer,
    /// Output varying slots, `num_varyings` of which reach the fragment shader.
    pub varyings: &'a mut [Vector4<f32>],
}

/// Inputs to one fragment shader invocation.
pub struct FragmentParam<'a> {
    pub coord: FragCoord,
    pub uniforms: &'a UniformBuffer,
    pub varyings: &'a [Vector4<f32>],
    /// One normalized color per bound render target.
    pub outputs: &'a mut [Vector4<f32>],
}

/// Transforms one vertex into clip space, filling its varyings.
pub type VertexShaderFn = fn(&mut VertexParam) -> Vector4<f32>;

/// Shades one fragment; returning `false` discards it.
pub type FragmentShaderFn = fn(&mut FragmentParam) -> bool;

/// A vertex/fragment program pair with its pipeline state and constants.
/// The pipeline borrows it for the duration of one draw.
pub struct Shader<'a> {
    pub pipeline_state: PipelineState,
    pub vertex_shader: VertexShaderFn,
    pub fragment_shader: FragmentShaderFn,
    pub uniforms: &'a UniformBuffer,
}

impl<'a> Shader<'a> {
    pub fn new(
        pipeline_state: PipelineState,
        vertex_shader: VertexShaderFn,
        fragment_shader: FragmentShaderFn,
        uniforms: &'a UniformBuffer,
    ) -> Shader<'a> {
        Shader {
            pipeline_state: pipeline_state,
            vertex_shader: vertex_shader,
            fragment_shader: fragment_shader,
            uniforms: uniforms,
        }
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector4;

    use super::BlendMode;

    #[test]
    fn alpha_over_opaque_background() {
        let src = Vector4::new(1.0, 0.0, 0.0, 0.5);
        let dst = Vector4::new(0.0, 0.0, 0.0, 1.0);
        let out = BlendMode::Alpha.apply(src, dst);

        assert!((out[0] - 0.5).abs() < 1.0e-6);
        assert_eq!(out[1], 0.0);
        assert!((out[3] - 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn additive_sums() {
        let out = BlendMode::Additive.apply(
            Vector4::new(0.25, 0.5, 0.75, 1.0),
            Vector4::new(0.25, 0.25, 0.25, 0.0),
        );
        assert_eq!(out, Vector4::new(0.5, 0.75, 1.0, 1.0));
    }

    #[test]
    fn screen_never_exceeds_one() {
        let out = BlendMode::Screen.apply(
            Vector4::new(1.0, 0.5, 0.0, 1.0),
            Vector4::new(1.0, 0.5, 0.0, 1.0),
        );
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], 0.75);
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn off_replaces() {
        let src = Vector4::new(0.1, 0.2, 0.3, 0.4);
        assert_eq!(BlendMode::Off.apply(src, Vector4::new(1.0, 1.0, 1.0, 1.0)), src);
    }
}
