//! End-to-end draws through the full pipeline.

extern crate nalgebra;
extern crate softraster;

use nalgebra::Vector4;

use softraster::color::ColorType;
use softraster::context::Context;
use softraster::mesh::{Mesh, RenderMode};
use softraster::shader::{
    BlendMode, DepthTest, FragmentParam, PipelineState, Shader, VertexParam,
};
use softraster::texture::TexelOrder;
use softraster::uniform::UniformBuffer;

const SIZE: u16 = 64;

#[derive(Debug, Clone, Copy)]
struct FlatParams {
    color: [f32; 4],
    depth: f32,
}

/// One triangle covering the whole NDC box (and then some); the clipper
/// trims it to the framebuffer.
fn fullscreen_vs(param: &mut VertexParam) -> Vector4<f32> {
    let constants = param.uniforms.as_ref::<FlatParams>();

    let (x, y) = match param.vertex_id % 3 {
        0 => (-1.0, -1.0),
        1 => (3.0, -1.0),
        _ => (-1.0, 3.0),
    };

    Vector4::new(x, y, constants.depth, 1.0)
}

fn flat_fs(param: &mut FragmentParam) -> bool {
    let constants = param.uniforms.as_ref::<FlatParams>();
    param.outputs[0] = Vector4::new(
        constants.color[0],
        constants.color[1],
        constants.color[2],
        constants.color[3],
    );
    true
}

struct Target {
    ctx: Context,
    color: usize,
    depth: usize,
    fbo: usize,
    mesh: usize,
}

fn target() -> Target {
    let mut ctx = Context::with_threads(4);

    let color = ctx.create_texture(ColorType::Rgba8U, SIZE, SIZE, 1, TexelOrder::Ordered).unwrap();
    let depth = ctx.create_texture(ColorType::R32F, SIZE, SIZE, 1, TexelOrder::Ordered).unwrap();

    let fbo = ctx.create_framebuffer();
    ctx.attach_color_buffer(fbo, 0, color).unwrap();
    ctx.attach_depth_buffer(fbo, depth).unwrap();

    let mesh = ctx.create_mesh(Mesh::new(RenderMode::Triangles, 3));

    Target {
        ctx: ctx,
        color: color,
        depth: depth,
        fbo: fbo,
        mesh: mesh,
    }
}

fn depth_texel(ctx: &Context, depth: usize, x: u16, y: u16) -> f32 {
    let texel = ctx.texture(depth).unwrap().texel(x, y, 0);
    f32::from_bits(u32::from_ne_bytes([texel[0], texel[1], texel[2], texel[3]]))
}

fn flat_shader(uniforms: &UniformBuffer, blend: BlendMode) -> Shader {
    let mut state = PipelineState::default();
    state.blend_mode = blend;
    state.depth_test = DepthTest::Lt;
    state.depth_mask = true;

    Shader::new(state, fullscreen_vs, flat_fs, uniforms)
}

#[test]
fn depth_culling_keeps_the_nearer_triangle() {
    let mut t = target();

    t.ctx.clear_color_buffer(t.fbo, 0, &Vector4::new(0.0, 0.0, 0.0, 1.0)).unwrap();
    t.ctx.clear_depth_buffer(t.fbo, 1.0).unwrap();

    let front = UniformBuffer::from_value(&FlatParams { color: [0.0, 0.0, 1.0, 1.0], depth: 0.5 });
    let back = UniformBuffer::from_value(&FlatParams { color: [0.0, 1.0, 0.0, 1.0], depth: 0.8 });

    t.ctx.draw(t.mesh, &flat_shader(&front, BlendMode::Off), t.fbo).unwrap();
    t.ctx.draw(t.mesh, &flat_shader(&back, BlendMode::Off), t.fbo).unwrap();

    for y in 0..SIZE {
        for x in 0..SIZE {
            assert_eq!(
                t.ctx.texture(t.color).unwrap().texel(x, y, 0),
                &[0, 0, 255, 255],
                "wrong color at ({}, {})", x, y
            );
            assert_eq!(depth_texel(&t.ctx, t.depth, x, y), 0.5, "wrong depth at ({}, {})", x, y);
        }
    }
}

#[test]
fn alpha_blend_halves_the_coverage() {
    let mut t = target();

    t.ctx.clear_color_buffer(t.fbo, 0, &Vector4::new(0.0, 0.0, 0.0, 1.0)).unwrap();
    t.ctx.clear_depth_buffer(t.fbo, 1.0).unwrap();

    let red = UniformBuffer::from_value(&FlatParams { color: [1.0, 0.0, 0.0, 0.5], depth: 0.5 });
    t.ctx.draw(t.mesh, &flat_shader(&red, BlendMode::Alpha), t.fbo).unwrap();

    for y in 0..SIZE {
        for x in 0..SIZE {
            let texel = t.ctx.texture(t.color).unwrap().texel(x, y, 0);
            // (0.5, 0, 0, 1) within one 8-bit step
            assert!((texel[0] as i32 - 128).abs() <= 1, "r = {} at ({}, {})", texel[0], x, y);
            assert_eq!(texel[1], 0);
            assert_eq!(texel[2], 0);
            assert_eq!(texel[3], 255);
        }
    }
}

#[test]
fn draw_multiple_validates_once_and_draws_all() {
    let mut t = target();

    t.ctx.clear_color_buffer(t.fbo, 0, &Vector4::new(0.0, 0.0, 0.0, 1.0)).unwrap();
    t.ctx.clear_depth_buffer(t.fbo, 1.0).unwrap();

    let second = t.ctx.create_mesh(Mesh::new(RenderMode::Triangles, 3));
    let uniforms = UniformBuffer::from_value(&FlatParams { color: [0.0, 0.0, 1.0, 1.0], depth: 0.5 });

    t.ctx.draw_multiple(&[t.mesh, second], &flat_shader(&uniforms, BlendMode::Off), t.fbo).unwrap();

    for y in 0..SIZE {
        for x in 0..SIZE {
            assert_eq!(t.ctx.texture(t.color).unwrap().texel(x, y, 0), &[0, 0, 255, 255]);
        }
    }

    assert!(t.ctx.draw_multiple(&[t.mesh, 999], &flat_shader(&uniforms, BlendMode::Off), t.fbo).is_err());
}

#[derive(Debug, Clone, Copy)]
struct TriParams {
    verts: [[f32; 4]; 3],
}

fn indexed_vs(param: &mut VertexParam) -> Vector4<f32> {
    let v = param.uniforms.as_ref::<TriParams>().verts[(param.vertex_id % 3) as usize];
    Vector4::new(v[0], v[1], v[2], v[3])
}

fn white_fs(param: &mut FragmentParam) -> bool {
    param.outputs[0] = Vector4::new(1.0, 1.0, 1.0, 1.0);
    true
}

#[test]
fn near_plane_clipping_preserves_the_silhouette() {
    let mut t = target();

    t.ctx.clear_color_buffer(t.fbo, 0, &Vector4::new(0.0, 0.0, 0.0, 1.0)).unwrap();
    t.ctx.clear_depth_buffer(t.fbo, 1.0).unwrap();

    // one vertex behind the near plane
    let a = [0.0f32, 0.9, 0.5, 1.0];
    let b = [-0.9f32, -0.9, 0.5, 1.0];
    let c = [0.9f32, -0.9, -0.5, 1.0];

    let uniforms = UniformBuffer::from_value(&TriParams { verts: [a, b, c] });
    let shader = Shader::new(PipelineState::default(), indexed_vs, white_fs, &uniforms);
    t.ctx.draw(t.mesh, &shader, t.fbo).unwrap();

    // w == 1 everywhere, so the unclipped 2-D projection is just (x, y)
    let bary = |px: f32, py: f32| -> (f32, f32, f32) {
        let det = (b[1] - c[1]) * (a[0] - c[0]) + (c[0] - b[0]) * (a[1] - c[1]);
        let l0 = ((b[1] - c[1]) * (px - c[0]) + (c[0] - b[0]) * (py - c[1])) / det;
        let l1 = ((c[1] - a[1]) * (px - c[0]) + (a[0] - c[0]) * (py - c[1])) / det;
        (l0, l1, 1.0 - l0 - l1)
    };

    let mut lit = 0usize;

    for y in 0..SIZE {
        for x in 0..SIZE {
            if t.ctx.texture(t.color).unwrap().texel(x, y, 0)[0] == 0 {
                continue;
            }
            lit += 1;

            // pixel center back to NDC
            let ndc_x = (x as f32 + 0.5) / (SIZE as f32 * 0.5) - 1.0;
            let ndc_y = (y as f32 + 0.5) / (SIZE as f32 * 0.5) - 1.0;

            assert!(ndc_x >= -1.0 && ndc_x <= 1.0);
            assert!(ndc_y >= -1.0 && ndc_y <= 1.0);

            let (l0, l1, l2) = bary(ndc_x, ndc_y);
            let tolerance = -0.08;
            assert!(
                l0 >= tolerance && l1 >= tolerance && l2 >= tolerance,
                "pixel ({}, {}) outside the unclipped triangle: {} {} {}",
                x, y, l0, l1, l2
            );
        }
    }

    assert!(lit > 0, "nothing was rasterized");
}

fn striped_vs(param: &mut VertexParam) -> Vector4<f32> {
    let primitive = param.vertex_id / 3;
    let distance = (primitive as f32 - 2500.0).abs() / 2500.0;
    let depth = 0.25 + 0.5 * distance;

    param.varyings[0] = Vector4::new(depth, 0.0, 0.0, 1.0);

    let (x, y) = match param.vertex_id % 3 {
        0 => (-1.0, -1.0),
        1 => (3.0, -1.0),
        _ => (-1.0, 3.0),
    };

    Vector4::new(x, y, depth, 1.0)
}

fn varying_fs(param: &mut FragmentParam) -> bool {
    param.outputs[0] = param.varyings[0];
    true
}

#[test]
fn bin_overflow_flushes_and_converges() {
    let mut t = target();

    t.ctx.clear_color_buffer(t.fbo, 0, &Vector4::new(0.0, 0.0, 0.0, 1.0)).unwrap();
    t.ctx.clear_depth_buffer(t.fbo, 1.0).unwrap();

    // far more primitives than the bin array holds; the nearest one
    // (primitive 2500 at depth 0.25) must win under the depth test
    let mesh = t.ctx.create_mesh(Mesh::new(RenderMode::Triangles, 3 * 5000));

    let uniforms = UniformBuffer::new();
    let mut state = PipelineState::default();
    state.depth_test = DepthTest::Lt;
    state.num_varyings = 1;

    let shader = Shader::new(state, striped_vs, varying_fs, &uniforms);
    t.ctx.draw(mesh, &shader, t.fbo).unwrap();

    for y in 0..SIZE {
        for x in 0..SIZE {
            let texel = t.ctx.texture(t.color).unwrap().texel(x, y, 0);
            assert!((texel[0] as i32 - 64).abs() <= 1, "r = {} at ({}, {})", texel[0], x, y);
            assert!((depth_texel(&t.ctx, t.depth, x, y) - 0.25).abs() < 1.0e-4);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PointsParams {
    verts: [[f32; 4]; 3],
}

fn points_vs(param: &mut VertexParam) -> Vector4<f32> {
    let v = param.uniforms.as_ref::<PointsParams>().verts[param.vertex_id as usize % 3];
    Vector4::new(v[0], v[1], v[2], v[3])
}

#[test]
fn points_hit_their_pixels() {
    let mut t = target();

    t.ctx.clear_color_buffer(t.fbo, 0, &Vector4::new(0.0, 0.0, 0.0, 1.0)).unwrap();
    t.ctx.clear_depth_buffer(t.fbo, 1.0).unwrap();

    let half = SIZE as f32 * 0.5;
    let to_ndc = |p: u16| (p as f32 + 0.5) / half - 1.0;

    let pixels = [(10u16, 20u16), (0, 0), (63, 63)];
    let verts = [
        [to_ndc(pixels[0].0), to_ndc(pixels[0].1), 0.5, 1.0],
        [to_ndc(pixels[1].0), to_ndc(pixels[1].1), 0.5, 1.0],
        [to_ndc(pixels[2].0), to_ndc(pixels[2].1), 0.5, 1.0],
    ];

    let mesh = t.ctx.create_mesh(Mesh::new(RenderMode::Points, 3));
    let uniforms = UniformBuffer::from_value(&PointsParams { verts: verts });
    let shader = Shader::new(PipelineState::default(), points_vs, white_fs, &uniforms);

    t.ctx.draw(mesh, &shader, t.fbo).unwrap();

    let mut lit = Vec::new();
    for y in 0..SIZE {
        for x in 0..SIZE {
            if t.ctx.texture(t.color).unwrap().texel(x, y, 0)[0] != 0 {
                lit.push((x, y));
            }
        }
    }

    assert_eq!(lit.len(), 3);
    for expected in pixels.iter() {
        assert!(lit.contains(expected), "{:?} not in {:?}", expected, lit);
    }
}

fn instanced_points_vs(param: &mut VertexParam) -> Vector4<f32> {
    let half = SIZE as f32 * 0.5;
    let x = 10 + param.instance_id as u16 * 5;
    Vector4::new(
        (x as f32 + 0.5) / half - 1.0,
        (20.0 + 0.5) / half - 1.0,
        0.5,
        1.0,
    )
}

#[test]
fn instances_rerun_the_pipeline_per_instance() {
    let mut t = target();

    t.ctx.clear_color_buffer(t.fbo, 0, &Vector4::new(0.0, 0.0, 0.0, 1.0)).unwrap();
    t.ctx.clear_depth_buffer(t.fbo, 1.0).unwrap();

    let mesh = t.ctx.create_mesh(Mesh::new(RenderMode::Points, 1));
    let uniforms = UniformBuffer::new();
    let shader = Shader::new(PipelineState::default(), instanced_points_vs, white_fs, &uniforms);

    t.ctx.draw_instanced(mesh, 3, &shader, t.fbo).unwrap();

    for instance in 0..3u16 {
        let x = 10 + instance * 5;
        assert_ne!(
            t.ctx.texture(t.color).unwrap().texel(x, 20, 0)[0], 0,
            "instance {} missing at x = {}", instance, x
        );
    }
    assert_eq!(t.ctx.texture(t.color).unwrap().texel(12, 20, 0)[0], 0);
}

fn line_vs(param: &mut VertexParam) -> Vector4<f32> {
    let v = param.uniforms.as_ref::<PointsParams>().verts[param.vertex_id as usize % 2];
    Vector4::new(v[0], v[1], v[2], v[3])
}

#[test]
fn horizontal_line_covers_its_row() {
    let mut t = target();

    t.ctx.clear_color_buffer(t.fbo, 0, &Vector4::new(0.0, 0.0, 0.0, 1.0)).unwrap();
    t.ctx.clear_depth_buffer(t.fbo, 1.0).unwrap();

    let half = SIZE as f32 * 0.5;
    let to_ndc = |p: u16| (p as f32 + 0.5) / half - 1.0;

    let verts = [
        [to_ndc(2), to_ndc(5), 0.5, 1.0],
        [to_ndc(60), to_ndc(5), 0.5, 1.0],
        [0.0, 0.0, 0.0, 1.0],
    ];

    let mesh = t.ctx.create_mesh(Mesh::new(RenderMode::Lines, 2));
    let uniforms = UniformBuffer::from_value(&PointsParams { verts: verts });
    let shader = Shader::new(PipelineState::default(), line_vs, white_fs, &uniforms);

    t.ctx.draw(mesh, &shader, t.fbo).unwrap();

    for x in 2..61u16 {
        assert_ne!(
            t.ctx.texture(t.color).unwrap().texel(x, 5, 0)[0], 0,
            "pixel ({}, 5) not drawn", x
        );
    }
    for x in [0u16, 1, 62, 63].iter() {
        assert_eq!(t.ctx.texture(t.color).unwrap().texel(*x, 5, 0)[0], 0);
    }
    for x in 0..SIZE {
        assert_eq!(t.ctx.texture(t.color).unwrap().texel(x, 9, 0)[0], 0);
    }
}

#[test]
fn wireframe_draws_edges_not_interiors() {
    let mut t = target();

    t.ctx.clear_color_buffer(t.fbo, 0, &Vector4::new(0.0, 0.0, 0.0, 1.0)).unwrap();
    t.ctx.clear_depth_buffer(t.fbo, 1.0).unwrap();

    let uniforms = UniformBuffer::from_value(&TriParams {
        verts: [
            [0.0, 0.8, 0.5, 1.0],
            [-0.8, -0.8, 0.5, 1.0],
            [0.8, -0.8, 0.5, 1.0],
        ],
    });

    let mesh = t.ctx.create_mesh(Mesh::new(RenderMode::TriWire, 3));
    let shader = Shader::new(PipelineState::default(), indexed_vs, white_fs, &uniforms);
    t.ctx.draw(mesh, &shader, t.fbo).unwrap();

    let mut lit = 0usize;
    for y in 0..SIZE {
        for x in 0..SIZE {
            if t.ctx.texture(t.color).unwrap().texel(x, y, 0)[0] != 0 {
                lit += 1;
            }
        }
    }

    assert!(lit > 0, "no edges drawn");

    // the interior must stay dark; the triangle center is far from any edge
    assert_eq!(t.ctx.texture(t.color).unwrap().texel(32, 28, 0)[0], 0);
}
