//! The rendering context: resource ownership and the draw entry points.

use nalgebra::Vector4;
use smallvec::SmallVec;

use ::color::ColorType;
use ::error::{RenderError, RenderResult};
use ::framebuffer::{clear_depth_texture, clear_texture, ColorAttachmentView, Framebuffer, FramebufferView};
use ::mesh::Mesh;
use ::pool::ProcessorPool;
use ::shader::{DepthTest, Shader, MAX_RENDER_TARGETS, MAX_VARYINGS};
use ::texture::{TexelOrder, Texture, TextureView};

/// Owns every texture, framebuffer, and mesh, plus the processor pool that
/// draws with them. Handles are plain indices; destroying a resource leaves
/// a hole so the other handles stay stable, and framebuffers weakly
/// referencing a destroyed texture are detached from it.
pub struct Context {
    textures: Vec<Option<Texture>>,
    framebuffers: Vec<Option<Framebuffer>>,
    meshes: Vec<Option<Mesh>>,
    pool: ProcessorPool,
    depth_range: (f32, f32),
}

fn store<T>(slots: &mut Vec<Option<T>>, value: T) -> usize {
    for (i, slot) in slots.iter_mut().enumerate() {
        if slot.is_none() {
            *slot = Some(value);
            return i;
        }
    }

    slots.push(Some(value));
    slots.len() - 1
}

impl Context {
    pub fn new() -> Context {
        Context::with_threads(::num_cpus::get())
    }

    pub fn with_threads(num_threads: usize) -> Context {
        Context {
            textures: Vec::new(),
            framebuffers: Vec::new(),
            meshes: Vec::new(),
            pool: ProcessorPool::new(num_threads),
            depth_range: (0.0, 1.0),
        }
    }

    #[inline]
    pub fn num_threads(&self) -> usize {
        self.pool.num_threads()
    }

    pub fn set_num_threads(&mut self, num_threads: usize) {
        self.pool.set_num_threads(num_threads);
    }

    /// Window-space depth values produced by the viewport mapping span
    /// `[near, far]`. Defaults to `[0, 1]`.
    pub fn set_depth_range(&mut self, near: f32, far: f32) {
        self.depth_range = (near, far);
    }

    /*
     * Textures
     */

    pub fn create_texture(
        &mut self,
        color_type: ColorType,
        width: u16,
        height: u16,
        depth: u16,
        order: TexelOrder,
    ) -> RenderResult<usize> {
        let texture = Texture::new(color_type, width, height, depth, order)?;
        Ok(store(&mut self.textures, texture))
    }

    pub fn texture(&self, handle: usize) -> RenderResult<&Texture> {
        self.textures
            .get(handle)
            .and_then(|t| t.as_ref())
            .ok_or(RenderError::InvalidHandle("texture", handle))
    }

    pub fn texture_mut(&mut self, handle: usize) -> RenderResult<&mut Texture> {
        self.textures
            .get_mut(handle)
            .and_then(|t| t.as_mut())
            .ok_or(RenderError::InvalidHandle("texture", handle))
    }

    /// Destroy a texture and detach it from every framebuffer that
    /// references it.
    pub fn destroy_texture(&mut self, handle: usize) -> RenderResult<()> {
        if self.textures.get_mut(handle).and_then(|t| t.take()).is_none() {
            return Err(RenderError::InvalidHandle("texture", handle));
        }

        for framebuffer in self.framebuffers.iter_mut() {
            if let Some(ref mut framebuffer) = *framebuffer {
                framebuffer.detach_texture(handle);
            }
        }

        Ok(())
    }

    /*
     * Framebuffers
     */

    pub fn create_framebuffer(&mut self) -> usize {
        store(&mut self.framebuffers, Framebuffer::new())
    }

    pub fn framebuffer(&self, handle: usize) -> RenderResult<&Framebuffer> {
        self.framebuffers
            .get(handle)
            .and_then(|f| f.as_ref())
            .ok_or(RenderError::InvalidHandle("framebuffer", handle))
    }

    pub fn destroy_framebuffer(&mut self, handle: usize) -> RenderResult<()> {
        self.framebuffers
            .get_mut(handle)
            .and_then(|f| f.take())
            .map(|_| ())
            .ok_or(RenderError::InvalidHandle("framebuffer", handle))
    }

    pub fn attach_color_buffer(&mut self, fbo: usize, slot: usize, texture: usize) -> RenderResult<()> {
        let tex = self.textures
            .get(texture)
            .and_then(|t| t.as_ref())
            .ok_or(RenderError::InvalidHandle("texture", texture))?;

        self.framebuffers
            .get_mut(fbo)
            .and_then(|f| f.as_mut())
            .ok_or(RenderError::InvalidHandle("framebuffer", fbo))?
            .attach_color_buffer(slot, texture, tex)
    }

    pub fn attach_depth_buffer(&mut self, fbo: usize, texture: usize) -> RenderResult<()> {
        let tex = self.textures
            .get(texture)
            .and_then(|t| t.as_ref())
            .ok_or(RenderError::InvalidHandle("texture", texture))?;

        self.framebuffers
            .get_mut(fbo)
            .and_then(|f| f.as_mut())
            .ok_or(RenderError::InvalidHandle("framebuffer", fbo))?
            .attach_depth_buffer(texture, tex)
    }

    pub fn clear_color_buffer(&mut self, fbo: usize, slot: usize, rgba: &Vector4<f32>) -> RenderResult<()> {
        let handle = self.framebuffer(fbo)?
            .color_buffer(slot)
            .ok_or(RenderError::InvalidHandle("color attachment slot", slot))?;

        clear_texture(self.texture_mut(handle)?, rgba);
        Ok(())
    }

    pub fn clear_depth_buffer(&mut self, fbo: usize, depth: f32) -> RenderResult<()> {
        let handle = self.framebuffer(fbo)?
            .depth_buffer()
            .ok_or(RenderError::MissingDepthBuffer)?;

        clear_depth_texture(self.texture_mut(handle)?, depth);
        Ok(())
    }

    /*
     * Meshes
     */

    pub fn create_mesh(&mut self, mesh: Mesh) -> usize {
        store(&mut self.meshes, mesh)
    }

    pub fn mesh(&self, handle: usize) -> RenderResult<&Mesh> {
        self.meshes
            .get(handle)
            .and_then(|m| m.as_ref())
            .ok_or(RenderError::InvalidHandle("mesh", handle))
    }

    pub fn destroy_mesh(&mut self, handle: usize) -> RenderResult<()> {
        self.meshes
            .get_mut(handle)
            .and_then(|m| m.take())
            .map(|_| ())
            .ok_or(RenderError::InvalidHandle("mesh", handle))
    }

    /*
     * Drawing
     */

    /// Validate the draw state once and resolve the attachment views the
    /// workers write through. Past this point the pipeline assumes the state
    /// is well-formed.
    fn framebuffer_view(&mut self, fbo: usize, shader: &Shader) -> RenderResult<FramebufferView> {
        let state = &shader.pipeline_state;

        if state.num_render_targets > MAX_RENDER_TARGETS {
            return Err(RenderError::InvalidPipelineState("too many render targets"));
        }
        if state.num_varyings > MAX_VARYINGS {
            return Err(RenderError::InvalidPipelineState("too many varyings"));
        }

        let framebuffer = self.framebuffers
            .get(fbo)
            .and_then(|f| f.as_ref())
            .ok_or(RenderError::InvalidHandle("framebuffer", fbo))?
            .clone();

        if framebuffer.width() == 0 || framebuffer.height() == 0 {
            return Err(RenderError::EmptyFramebuffer);
        }

        let mut colors: SmallVec<[ColorAttachmentView; MAX_RENDER_TARGETS]> = SmallVec::new();

        for slot in 0..MAX_RENDER_TARGETS {
            let handle = match framebuffer.color_buffer(slot) {
                Some(handle) => handle,
                None => continue,
            };

            let texture = self.textures
                .get_mut(handle)
                .and_then(|t| t.as_mut())
                .ok_or(RenderError::InvalidHandle("texture", handle))?;

            if texture.width() != framebuffer.width() || texture.height() != framebuffer.height() {
                return Err(RenderError::AttachmentSizeMismatch(
                    texture.width(), texture.height(),
                    framebuffer.width(), framebuffer.height(),
                ));
            }

            colors.push(ColorAttachmentView::new(TextureView::new_mut(texture)));
        }

        let (depth, depth_type) = match framebuffer.depth_buffer() {
            Some(handle) => {
                let texture = self.textures
                    .get_mut(handle)
                    .and_then(|t| t.as_mut())
                    .ok_or(RenderError::InvalidHandle("texture", handle))?;

                if !texture.color_type().is_depth_capable() {
                    return Err(RenderError::UnsupportedAttachmentFormat(texture.color_type(), "depth"));
                }

                (Some(TextureView::new_mut(texture)), Some(texture.color_type()))
            }
            None => {
                if state.depth_test != DepthTest::Off {
                    return Err(RenderError::MissingDepthBuffer);
                }
                (None, None)
            }
        };

        Ok(FramebufferView {
            width: framebuffer.width(),
            height: framebuffer.height(),
            colors: colors,
            depth: depth,
            depth_type: depth_type,
        })
    }

    pub fn draw(&mut self, mesh: usize, shader: &Shader, fbo: usize) -> RenderResult<()> {
        self.draw_instanced(mesh, 1, shader, fbo)
    }

    pub fn draw_instanced(&mut self, mesh: usize, num_instances: usize, shader: &Shader, fbo: usize) -> RenderResult<()> {
        let view = self.framebuffer_view(fbo, shader)?;

        let mesh = self.meshes
            .get(mesh)
            .and_then(|m| m.as_ref())
            .ok_or(RenderError::InvalidHandle("mesh", mesh))?;

        debug!(
            "Drawing {:?} x{} instances into {}x{} target",
            mesh, num_instances, view.width, view.height
        );

        let depth_range = self.depth_range;
        self.pool.run_shader_processors(mesh, num_instances.max(1), shader, &view, depth_range);

        Ok(())
    }

    /// Draw several meshes with the same shader and framebuffer, validating
    /// the target once.
    pub fn draw_multiple(&mut self, meshes: &[usize], shader: &Shader, fbo: usize) -> RenderResult<()> {
        let view = self.framebuffer_view(fbo, shader)?;

        let mut resolved = Vec::with_capacity(meshes.len());
        for &handle in meshes.iter() {
            resolved.push(
                self.meshes
                    .get(handle)
                    .and_then(|m| m.as_ref())
                    .ok_or(RenderError::InvalidHandle("mesh", handle))?,
            );
        }

        let depth_range = self.depth_range;
        for mesh in resolved {
            self.pool.run_shader_processors(mesh, 1, shader, &view, depth_range);
        }

        Ok(())
    }

    /*
     * Blits
     */

    fn check_rect(rect: (u16, u16, u16, u16), width: u16, height: u16, what: &'static str) -> RenderResult<()> {
        let (x0, y0, x1, y1) = rect;

        if x0 >= x1 || y0 >= y1 || x1 > width || y1 > height {
            return Err(RenderError::InvalidHandle(what, x1 as usize));
        }

        Ok(())
    }

    /// Nearest-neighbor copy between two context-owned textures.
    pub fn blit(
        &mut self,
        src: usize,
        dst: usize,
        src_rect: (u16, u16, u16, u16),
        dst_rect: (u16, u16, u16, u16),
    ) -> RenderResult<()> {
        if src == dst {
            return Err(RenderError::InvalidHandle("blit destination", dst));
        }

        let src_view = {
            let texture = self.texture(src)?;
            Context::check_rect(src_rect, texture.width(), texture.height(), "blit source rectangle")?;
            TextureView::new(texture)
        };

        let dst_view = {
            let texture = self.texture_mut(dst)?;
            Context::check_rect(dst_rect, texture.width(), texture.height(), "blit destination rectangle")?;
            TextureView::new_mut(texture)
        };

        self.pool.run_blit_processors(&src_view, &dst_view, src_rect, dst_rect);
        Ok(())
    }

    /// Nearest-neighbor copy from a context-owned texture into an external
    /// target, typically a window back buffer.
    pub fn blit_to_texture(
        &mut self,
        src: usize,
        dst: &mut Texture,
        src_rect: (u16, u16, u16, u16),
        dst_rect: (u16, u16, u16, u16),
    ) -> RenderResult<()> {
        let src_view = {
            let texture = self.texture(src)?;
            Context::check_rect(src_rect, texture.width(), texture.height(), "blit source rectangle")?;
            TextureView::new(texture)
        };

        Context::check_rect(dst_rect, dst.width(), dst.height(), "blit destination rectangle")?;
        let dst_view = TextureView::new_mut(dst);

        self.pool.run_blit_processors(&src_view, &dst_view, src_rect, dst_rect);
        Ok(())
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new()
    }
}
