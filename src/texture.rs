//! Texel storage with ordered and Z-order swizzled addressing.

use ::color::{ColorScalar, ColorType};
use ::error::{RenderError, RenderResult};
use ::half::Half;

/// Side length of a swizzle tile along each axis.
pub const TILE_DIM: u16 = 4;
const TILE_SHIFT: u32 = 2;
const TILE_MASK: u32 = (TILE_DIM as u32) - 1;

/// Memory layout of the texels within a texture.
///
/// `Ordered` is plain row-major. `Swizzled` interleaves the low coordinate
/// bits inside 4x4x4 tiles (4x4 for 2-D textures) so that neighboring reads
/// along either axis stay within a cache line; the tiles themselves are laid
/// out row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexelOrder {
    Ordered,
    Swizzled,
}

/// A 3-D array of texels. 2-D textures use `depth == 1`.
#[derive(Debug, Clone)]
pub struct Texture {
    width: u16,
    height: u16,
    depth: u16,
    color_type: ColorType,
    order: TexelOrder,
    bpp: usize,
    num_tiles_x: u32,
    num_tiles_y: u32,
    data: Vec<u8>,
}

#[inline]
fn num_tiles(extent: u16) -> u32 {
    ((extent as u32) + TILE_MASK) >> TILE_SHIFT
}

impl Texture {
    pub fn new(color_type: ColorType, width: u16, height: u16, depth: u16, order: TexelOrder) -> RenderResult<Texture> {
        if width == 0 || height == 0 || depth == 0 {
            return Err(RenderError::InvalidTextureExtent(width, height, depth));
        }

        let bpp = color_type.bytes_per_texel();

        let num_texels = match order {
            TexelOrder::Ordered => width as usize * height as usize * depth as usize,
            // swizzled storage is padded out to whole tiles
            TexelOrder::Swizzled => {
                let tiles = num_tiles(width) as usize * num_tiles(height) as usize * num_tiles(depth) as usize;
                tiles * texels_per_tile(depth)
            }
        };

        let num_bytes = num_texels.checked_mul(bpp)
            .ok_or(RenderError::TextureAllocationFailed(num_texels))?;

        Ok(Texture {
            width: width,
            height: height,
            depth: depth,
            color_type: color_type,
            order: order,
            bpp: bpp,
            num_tiles_x: num_tiles(width),
            num_tiles_y: num_tiles(height),
            data: vec![0u8; num_bytes],
        })
    }

    #[inline(always)]
    pub fn width(&self) -> u16 { self.width }

    #[inline(always)]
    pub fn height(&self) -> u16 { self.height }

    #[inline(always)]
    pub fn depth(&self) -> u16 { self.depth }

    #[inline(always)]
    pub fn color_type(&self) -> ColorType { self.color_type }

    #[inline(always)]
    pub fn order(&self) -> TexelOrder { self.order }

    #[inline(always)]
    pub fn bpp(&self) -> usize { self.bpp }

    #[inline(always)]
    pub fn data(&self) -> &[u8] { &self.data }

    #[inline(always)]
    pub fn data_mut(&mut self) -> &mut [u8] { &mut self.data }

    /// Map a texel coordinate to its index within the storage.
    #[inline]
    pub fn map_coordinate(&self, x: u16, y: u16, z: u16) -> usize {
        match self.order {
            TexelOrder::Ordered => {
                x as usize + self.width as usize * (y as usize + self.height as usize * z as usize)
            }
            TexelOrder::Swizzled => map_swizzled(
                x as u32, y as u32, z as u32,
                self.num_tiles_x, self.num_tiles_y,
                self.depth > 1,
            ),
        }
    }

    /// Borrow the raw bytes of one texel.
    #[inline]
    pub fn texel(&self, x: u16, y: u16, z: u16) -> &[u8] {
        let offset = self.map_coordinate(x, y, z) * self.bpp;
        &self.data[offset..offset + self.bpp]
    }

    /// Mutably borrow the raw bytes of one texel.
    #[inline]
    pub fn texel_mut(&mut self, x: u16, y: u16, z: u16) -> &mut [u8] {
        let offset = self.map_coordinate(x, y, z) * self.bpp;
        &mut self.data[offset..offset + self.bpp]
    }
}

#[inline(always)]
fn texels_per_tile(depth: u16) -> usize {
    if depth > 1 { 64 } else { 16 }
}

/// Z-order index of a texel: tiles are row-major, texels within a tile are
/// the Morton interleave of the low two bits of each coordinate.
#[inline]
fn map_swizzled(x: u32, y: u32, z: u32, num_tiles_x: u32, num_tiles_y: u32, volumetric: bool) -> usize {
    let tile = (x >> TILE_SHIFT)
        + num_tiles_x * ((y >> TILE_SHIFT) + num_tiles_y * (z >> TILE_SHIFT));

    let px = x & TILE_MASK;
    let py = y & TILE_MASK;
    let pz = z & TILE_MASK;

    if volumetric {
        let local = (px & 1)
            | ((py & 1) << 1)
            | ((pz & 1) << 2)
            | ((px >> 1) << 3)
            | ((py >> 1) << 4)
            | ((pz >> 1) << 5);
        tile as usize * 64 + local as usize
    } else {
        let local = (px & 1) | ((py & 1) << 1) | ((px >> 1) << 2) | ((py >> 1) << 3);
        tile as usize * 16 + local as usize
    }
}

/// Marker for element types that can back a depth attachment.
pub trait DepthTexel: ColorScalar + Send + Sync {}

impl DepthTexel for Half {}
impl DepthTexel for f32 {}
impl DepthTexel for f64 {}

/// An unsynchronized view into a texture's storage, used by the rasterizer
/// workers during a draw.
///
/// The view carries a raw data pointer so that it can be shared across the
/// worker threads; the scanline partition guarantees writes stay disjoint.
/// Constructing a mutable view from a texture that is also sampled in the
/// same draw is a caller bug.
#[derive(Debug, Clone, Copy)]
pub struct TextureView {
    data: *mut u8,
    len: usize,
    width: u16,
    height: u16,
    depth: u16,
    bpp: usize,
    color_type: ColorType,
    order: TexelOrder,
    num_tiles_x: u32,
    num_tiles_y: u32,
}

unsafe impl Send for TextureView {}
unsafe impl Sync for TextureView {}

impl TextureView {
    /// A read-only view. Writing through it is a contract violation.
    pub fn new(texture: &Texture) -> TextureView {
        TextureView {
            data: texture.data.as_ptr() as *mut u8,
            len: texture.data.len(),
            width: texture.width,
            height: texture.height,
            depth: texture.depth,
            bpp: texture.bpp,
            color_type: texture.color_type,
            order: texture.order,
            num_tiles_x: texture.num_tiles_x,
            num_tiles_y: texture.num_tiles_y,
        }
    }

    /// A writable view. The draw that holds it owns the texture exclusively.
    pub fn new_mut(texture: &mut Texture) -> TextureView {
        TextureView {
            data: texture.data.as_mut_ptr(),
            len: texture.data.len(),
            width: texture.width,
            height: texture.height,
            depth: texture.depth,
            bpp: texture.bpp,
            color_type: texture.color_type,
            order: texture.order,
            num_tiles_x: texture.num_tiles_x,
            num_tiles_y: texture.num_tiles_y,
        }
    }

    /// Placeholder view for a draw that has no depth attachment. The
    /// pipeline validates that the depth test and mask are off before one of
    /// these can reach a kernel, so it is never dereferenced.
    pub fn detached() -> TextureView {
        TextureView {
            data: ::std::ptr::null_mut(),
            len: 0,
            width: 0,
            height: 0,
            depth: 1,
            bpp: 0,
            color_type: ColorType::R32F,
            order: TexelOrder::Ordered,
            num_tiles_x: 0,
            num_tiles_y: 0,
        }
    }

    #[inline(always)]
    pub fn width(&self) -> u16 { self.width }

    #[inline(always)]
    pub fn height(&self) -> u16 { self.height }

    #[inline(always)]
    pub fn bpp(&self) -> usize { self.bpp }

    #[inline(always)]
    pub fn color_type(&self) -> ColorType { self.color_type }

    #[inline]
    pub fn texel_offset(&self, x: u16, y: u16, z: u16) -> usize {
        let idx = match self.order {
            TexelOrder::Ordered => {
                x as usize + self.width as usize * (y as usize + self.height as usize * z as usize)
            }
            TexelOrder::Swizzled => map_swizzled(
                x as u32, y as u32, z as u32,
                self.num_tiles_x, self.num_tiles_y,
                self.depth > 1,
            ),
        };
        idx * self.bpp
    }

    /// Read the texel bytes at a coordinate.
    ///
    /// No bounds checking is performed for performance reasons,
    /// so bounds should be checked elsewhere.
    #[inline]
    pub unsafe fn texel(&self, x: u16, y: u16, z: u16) -> &[u8] {
        let offset = self.texel_offset(x, y, z);
        debug_assert!(offset + self.bpp <= self.len);
        ::std::slice::from_raw_parts(self.data.offset(offset as isize), self.bpp)
    }

    /// Write access to the texel bytes at a coordinate.
    ///
    /// No bounds checking is performed for performance reasons,
    /// so bounds should be checked elsewhere.
    #[inline]
    pub unsafe fn texel_mut(&self, x: u16, y: u16, z: u16) -> &mut [u8] {
        let offset = self.texel_offset(x, y, z);
        debug_assert!(offset + self.bpp <= self.len);
        ::std::slice::from_raw_parts_mut(self.data.offset(offset as isize), self.bpp)
    }

    /// Read a typed depth texel.
    #[inline]
    pub unsafe fn depth_texel<D: DepthTexel>(&self, x: u16, y: u16) -> f32 {
        D::read(self.texel(x, y, 0)).to_norm()
    }

    /// Store a typed depth texel.
    #[inline]
    pub unsafe fn put_depth_texel<D: DepthTexel>(&self, x: u16, y: u16, depth: f32) {
        D::from_norm(depth).write(self.texel_mut(x, y, 0));
    }
}
