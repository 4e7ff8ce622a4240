//! Render target management and pixel placement.

use nalgebra::Vector4;
use smallvec::SmallVec;

use ::color::{decode_fn, encode_fn, ColorType, DecodeFn, EncodeFn, MAX_TEXEL_BYTES};
use ::error::{RenderError, RenderResult};
use ::shader::{BlendMode, MAX_RENDER_TARGETS};
use ::texture::{DepthTexel, Texture, TextureView};
use ::utils::fill_pattern;

/// A set of weak references into context-owned textures: up to
/// `MAX_RENDER_TARGETS` color attachments and at most one depth attachment.
///
/// All attachments must share the same width and height; the depth
/// attachment must be a single-channel float format in row-major order.
#[derive(Debug, Clone, Default)]
pub struct Framebuffer {
    width: u16,
    height: u16,
    colors: [Option<usize>; MAX_RENDER_TARGETS],
    depth: Option<usize>,
}

impl Framebuffer {
    pub fn new() -> Framebuffer {
        Framebuffer::default()
    }

    #[inline(always)]
    pub fn width(&self) -> u16 { self.width }

    #[inline(always)]
    pub fn height(&self) -> u16 { self.height }

    pub fn num_color_buffers(&self) -> usize {
        self.colors.iter().filter(|c| c.is_some()).count()
    }

    #[inline]
    pub fn color_buffer(&self, slot: usize) -> Option<usize> {
        self.colors.get(slot).and_then(|c| *c)
    }

    #[inline]
    pub fn depth_buffer(&self) -> Option<usize> {
        self.depth
    }

    fn accept_size(&mut self, texture: &Texture) -> RenderResult<()> {
        if texture.depth() != 1 {
            return Err(RenderError::InvalidTextureExtent(texture.width(), texture.height(), texture.depth()));
        }

        if self.width == 0 && self.height == 0 {
            self.width = texture.width();
            self.height = texture.height();
            Ok(())
        } else if self.width == texture.width() && self.height == texture.height() {
            Ok(())
        } else {
            Err(RenderError::AttachmentSizeMismatch(texture.width(), texture.height(), self.width, self.height))
        }
    }

    fn forget_size_if_empty(&mut self) {
        if self.depth.is_none() && self.colors.iter().all(|c| c.is_none()) {
            self.width = 0;
            self.height = 0;
        }
    }

    pub fn attach_color_buffer(&mut self, slot: usize, handle: usize, texture: &Texture) -> RenderResult<()> {
        if slot >= MAX_RENDER_TARGETS {
            return Err(RenderError::InvalidHandle("color attachment slot", slot));
        }

        self.accept_size(texture)?;
        self.colors[slot] = Some(handle);
        Ok(())
    }

    pub fn attach_depth_buffer(&mut self, handle: usize, texture: &Texture) -> RenderResult<()> {
        if !texture.color_type().is_depth_capable() {
            return Err(RenderError::UnsupportedAttachmentFormat(texture.color_type(), "depth"));
        }

        if texture.order() != ::texture::TexelOrder::Ordered {
            return Err(RenderError::UnsupportedAttachmentFormat(texture.color_type(), "depth"));
        }

        self.accept_size(texture)?;
        self.depth = Some(handle);
        Ok(())
    }

    pub fn detach_color_buffer(&mut self, slot: usize) -> Option<usize> {
        let detached = self.colors.get_mut(slot).and_then(|c| c.take());
        self.forget_size_if_empty();
        detached
    }

    pub fn detach_depth_buffer(&mut self) -> Option<usize> {
        let detached = self.depth.take();
        self.forget_size_if_empty();
        detached
    }

    /// Drop every reference to a texture that is going away.
    pub fn detach_texture(&mut self, handle: usize) {
        for color in self.colors.iter_mut() {
            if *color == Some(handle) {
                *color = None;
            }
        }
        if self.depth == Some(handle) {
            self.depth = None;
        }
        self.forget_size_if_empty();
    }
}

/// Broadcast a typed clear color to every texel of a texture.
pub fn clear_texture(texture: &mut Texture, rgba: &Vector4<f32>) {
    let mut pattern = [0u8; MAX_TEXEL_BYTES];
    let bpp = texture.bpp();

    encode_fn(texture.color_type())(rgba, &mut pattern[..bpp]);
    fill_pattern(texture.data_mut(), &pattern[..bpp]);
}

/// Broadcast a depth value to every texel of a depth texture.
pub fn clear_depth_texture(texture: &mut Texture, depth: f32) {
    clear_texture(texture, &Vector4::new(depth, 0.0, 0.0, 0.0))
}

/// One bound color attachment with its texel codecs resolved up front so the
/// per-fragment path never re-matches on the format.
#[derive(Clone, Copy)]
pub struct ColorAttachmentView {
    pub view: TextureView,
    pub decode: DecodeFn,
    pub encode: EncodeFn,
}

impl ColorAttachmentView {
    pub fn new(view: TextureView) -> ColorAttachmentView {
        ColorAttachmentView {
            decode: decode_fn(view.color_type()),
            encode: encode_fn(view.color_type()),
            view: view,
        }
    }
}

/// The resolved, shareable form of a framebuffer that rasterizer workers
/// write through during one draw.
#[derive(Clone)]
pub struct FramebufferView {
    pub width: u16,
    pub height: u16,
    pub colors: SmallVec<[ColorAttachmentView; MAX_RENDER_TARGETS]>,
    pub depth: Option<TextureView>,
    pub depth_type: Option<ColorType>,
}

impl FramebufferView {
    /// Store a shaded color without blending.
    ///
    /// No bounds checking is performed for performance reasons,
    /// so bounds should be checked elsewhere.
    #[inline]
    pub unsafe fn put_pixel(&self, target: usize, x: u16, y: u16, rgba: &Vector4<f32>) {
        let attachment = &self.colors[target];
        (attachment.encode)(rgba, attachment.view.texel_mut(x, y, 0));
    }

    /// Blend a shaded color over the existing framebuffer value.
    ///
    /// No bounds checking is performed for performance reasons,
    /// so bounds should be checked elsewhere.
    #[inline]
    pub unsafe fn put_blended_pixel(&self, target: usize, x: u16, y: u16, rgba: &Vector4<f32>, blend_mode: BlendMode) {
        let attachment = &self.colors[target];
        let dst = (attachment.decode)(attachment.view.texel(x, y, 0));
        let blended = blend_mode.apply(*rgba, dst);
        (attachment.encode)(&blended, attachment.view.texel_mut(x, y, 0));
    }

    /// Store a depth value into the depth attachment.
    #[inline]
    pub unsafe fn put_depth_pixel<D: DepthTexel>(&self, x: u16, y: u16, depth: f32) {
        if let Some(ref view) = self.depth {
            view.put_depth_texel::<D>(x, y, depth);
        }
    }
}
