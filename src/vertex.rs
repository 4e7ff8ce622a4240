//! The vertex phase: shader execution, clipping, and primitive binning.

use nalgebra::Vector4;

use ::bins::{FragmentBin, FragQueue, MAX_BINNED_PRIMS};
use ::clip::{self, ClipStatus, ClipVertex};
use ::framebuffer::FramebufferView;
use ::mesh::Mesh;
use ::pool::{BinCounters, Trusted};
use ::raster;
use ::shader::{CullMode, Shader, VertexParam, MAX_VARYINGS};

/// One worker's slice of the vertex phase.
///
/// Each worker transforms the primitives where `index mod num_threads ==
/// thread_id`, pushing finished bins into the shared array. When every
/// producer has finished (or the array fills up) the workers rendezvous and
/// drain the bins through the rasterizer over their own scanlines.
#[derive(Clone, Copy)]
pub struct VertexProcessor<'a> {
    pub thread_id: usize,
    pub num_threads: usize,
    pub mesh: &'a Mesh,
    pub num_instances: usize,
    pub shader: &'a Shader<'a>,
    pub fbo: &'a FramebufferView,
    pub counters: &'a BinCounters,
    pub bins: &'a Trusted<Vec<FragmentBin>>,
    pub queues: &'a Trusted<Vec<FragQueue>>,
    pub depth_range: (f32, f32),
}

impl<'a> VertexProcessor<'a> {
    pub fn execute(&self) {
        let num_primitives = self.mesh.num_primitives();
        let vertices_per_primitive = self.mesh.mode.vertices_per_primitive();

        for instance_id in 0..self.num_instances as u32 {
            let mut primitive = self.thread_id;

            while primitive < num_primitives {
                match vertices_per_primitive {
                    1 => self.process_point(primitive, instance_id),
                    2 => self.process_line(primitive, instance_id),
                    _ => self.process_triangle(primitive, instance_id),
                }

                primitive += self.num_threads;
            }
        }

        self.counters.finish_producer();

        // serve mid-draw flushes until every producer is finished
        loop {
            if self.counters.flush_requested() {
                self.flush_bins();
                continue;
            }

            if self.counters.all_producers_done() {
                break;
            }

            ::std::hint::spin_loop();
        }

        // final drain through the rasterizer
        self.flush_bins();
    }

    /// Rendezvous with every worker, rasterize the published bins over this
    /// worker's scanlines, and let thread 0 reset the counters.
    fn flush_bins(&self) {
        self.counters.rendezvous();

        let num_bins = self.counters.used();
        if num_bins > 0 {
            let bins = &self.bins.as_ref()[..num_bins];
            let queue = &mut self.queues.as_mut()[self.thread_id];

            raster::rasterize_bins(
                self.mesh.mode,
                self.shader,
                self.fbo,
                bins,
                queue,
                self.thread_id as i32,
                self.num_threads as i32,
            );
        }

        self.counters.rendezvous();

        if self.thread_id == 0 {
            self.counters.finish_flush();
        }

        self.counters.rendezvous();
    }

    /// Claim a slot and publish one bin. A full array forces a flush; this
    /// is the engine's only back-pressure mechanism.
    fn push_bin(&self, bin: FragmentBin) {
        loop {
            if self.counters.flush_requested() {
                self.flush_bins();
            }

            let slot = self.counters.claim_slot();

            if slot < MAX_BINNED_PRIMS {
                self.bins.as_mut()[slot] = bin;
                return;
            }

            trace!("Fragment bins exhausted; forcing a mid-draw flush");
            self.counters.request_flush();
        }
    }

    fn run_vertex_shader(&self, vertex_id: u32, instance_id: u32) -> ClipVertex {
        let mut varyings = [Vector4::new(0.0, 0.0, 0.0, 0.0); MAX_VARYINGS];

        let position = {
            let mut param = VertexParam {
                vertex_id: vertex_id,
                instance_id: instance_id,
                uniforms: self.shader.uniforms,
                varyings: &mut varyings[..self.shader.pipeline_state.num_varyings],
            };

            (self.shader.vertex_shader)(&mut param)
        };

        ClipVertex::new(position, varyings)
    }

    /// Perspective divide and viewport mapping. The result keeps `1/w` in
    /// the w lane for perspective-corrected interpolation downstream.
    fn to_window_space(&self, vertex: &ClipVertex) -> ClipVertex {
        let p = vertex.position;
        let rw = 1.0 / p[3];

        let (near, far) = self.depth_range;

        ClipVertex::new(
            Vector4::new(
                (p[0] * rw + 1.0) * 0.5 * self.fbo.width as f32,
                (p[1] * rw + 1.0) * 0.5 * self.fbo.height as f32,
                near + p[2] * rw * (far - near),
                rw,
            ),
            vertex.varyings,
        )
    }

    fn process_triangle(&self, primitive: usize, instance_id: u32) {
        let corners = [
            self.run_vertex_shader(self.mesh.vertex_id(primitive, 0), instance_id),
            self.run_vertex_shader(self.mesh.vertex_id(primitive, 1), instance_id),
            self.run_vertex_shader(self.mesh.vertex_id(primitive, 2), instance_id),
        ];

        let positions = [corners[0].position, corners[1].position, corners[2].position];

        match clip::classify(&positions) {
            ClipStatus::NotVisible => {}
            ClipStatus::FullyVisible => self.bin_triangle(&corners[0], &corners[1], &corners[2]),
            ClipStatus::PartiallyVisible => {
                let polygon = clip::clip_triangle(corners);

                // fan the clipped polygon back into triangles
                for i in 1..polygon.len().saturating_sub(1) {
                    self.bin_triangle(&polygon[0], &polygon[i], &polygon[i + 1]);
                }
            }
        }
    }

    fn bin_triangle(&self, a: &ClipVertex, b: &ClipVertex, c: &ClipVertex) {
        if a.position[3] <= 0.0 || b.position[3] <= 0.0 || c.position[3] <= 0.0 {
            return;
        }

        let a = self.to_window_space(a);
        let b = self.to_window_space(b);
        let c = self.to_window_space(c);

        // signed doubled area in window space
        let area = (b.position[0] - a.position[0]) * (c.position[1] - a.position[1])
            - (c.position[0] - a.position[0]) * (b.position[1] - a.position[1]);

        match self.shader.pipeline_state.cull_mode {
            CullMode::Back if area <= 0.0 => return,
            CullMode::Front if area >= 0.0 => return,
            _ if area == 0.0 => return,
            _ => {}
        }

        let basis = match barycentric_basis(&a.position, &b.position, &c.position) {
            Some(basis) => basis,
            None => return,
        };

        self.push_bin(FragmentBin {
            screen_coords: [a.position, b.position, c.position],
            barycentric: basis,
            varyings: [a.varyings, b.varyings, c.varyings],
        });
    }

    fn process_point(&self, primitive: usize, instance_id: u32) {
        let vertex = self.run_vertex_shader(self.mesh.vertex_id(primitive, 0), instance_id);

        if clip::visibility_code(&vertex.position) != 0 || vertex.position[3] <= 0.0 {
            return;
        }

        let vertex = self.to_window_space(&vertex);

        let mut bin = FragmentBin::empty();
        bin.screen_coords[0] = vertex.position;
        bin.varyings[0] = vertex.varyings;

        self.push_bin(bin);
    }

    fn process_line(&self, primitive: usize, instance_id: u32) {
        let mut a = self.run_vertex_shader(self.mesh.vertex_id(primitive, 0), instance_id);
        let mut b = self.run_vertex_shader(self.mesh.vertex_id(primitive, 1), instance_id);

        if clip::classify(&[a.position, b.position]) == ClipStatus::NotVisible {
            return;
        }

        // clip the depth planes in clip space before the divide
        for plane in &[clip::ClipPlane::Near, clip::ClipPlane::Far] {
            let a_inside = plane.has_inside(&a.position);
            let b_inside = plane.has_inside(&b.position);

            if !a_inside && !b_inside {
                return;
            } else if !a_inside {
                a = plane.intersect(&a, &b);
            } else if !b_inside {
                b = plane.intersect(&a, &b);
            }
        }

        if a.position[3] <= 0.0 || b.position[3] <= 0.0 {
            return;
        }

        let a = self.to_window_space(&a);
        let b = self.to_window_space(&b);

        // bound the segment to the framebuffer rectangle
        let clipped = clip::clip_segment(
            a.position,
            b.position,
            self.fbo.width as f32,
            self.fbo.height as f32,
        );

        let ((pa, ta), (pb, tb)) = match clipped {
            Some(clipped) => clipped,
            None => return,
        };

        let mut bin = FragmentBin::empty();
        bin.screen_coords[0] = pa;
        bin.screen_coords[1] = pb;
        bin.varyings[0] = ::interpolate::Interpolate::linear_interpolate(ta, &a.varyings, &b.varyings);
        bin.varyings[1] = ::interpolate::Interpolate::linear_interpolate(tb, &a.varyings, &b.varyings);

        self.push_bin(bin);
    }
}

/// Invert the edge functions of a window-space triangle into three vectors
/// such that a pixel's barycentric coordinate is
/// `basis[0]*x + basis[1]*y + basis[2]`.
pub fn barycentric_basis(a: &Vector4<f32>, b: &Vector4<f32>, c: &Vector4<f32>) -> Option<[Vector4<f32>; 3]> {
    let det = (b[1] - c[1]) * (a[0] - c[0]) + (c[0] - b[0]) * (a[1] - c[1]);

    if det == 0.0 || !det.is_finite() {
        return None;
    }

    let r = 1.0 / det;

    Some([
        Vector4::new((b[1] - c[1]) * r, (c[1] - a[1]) * r, (a[1] - b[1]) * r, 0.0),
        Vector4::new((c[0] - b[0]) * r, (a[0] - c[0]) * r, (b[0] - a[0]) * r, 0.0),
        Vector4::new(
            (b[0] * c[1] - c[0] * b[1]) * r,
            (c[0] * a[1] - a[0] * c[1]) * r,
            (a[0] * b[1] - b[0] * a[1]) * r,
            0.0,
        ),
    ])
}
