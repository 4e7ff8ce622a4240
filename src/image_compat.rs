//! Conversions into `image` buffers for dumping frames to disk.

use image::{Pixel, Rgba, RgbaImage};

use ::color::decode_fn;
use ::texture::Texture;

/// Decode the first 2-D slice of a texture into an 8-bit RGBA image.
pub fn texture_to_image(texture: &Texture) -> RgbaImage {
    let decode = decode_fn(texture.color_type());

    RgbaImage::from_fn(texture.width() as u32, texture.height() as u32, |x, y| {
        let rgba = decode(texture.texel(x as u16, y as u16, 0));

        Rgba::from_channels(
            (rgba[0].max(0.0).min(1.0) * 255.0 + 0.5) as u8,
            (rgba[1].max(0.0).min(1.0) * 255.0 + 0.5) as u8,
            (rgba[2].max(0.0).min(1.0) * 255.0 + 0.5) as u8,
            (rgba[3].max(0.0).min(1.0) * 255.0 + 0.5) as u8,
        )
    })
}
