//! Typed color texels and conversions between them.

use nalgebra::Vector4;

use ::half::Half;

pub mod cast;
pub mod packed;

pub use self::cast::{color_cast, ColorScalar};

/// Every texel layout understood by the engine: one to four channels over
/// each supported element type, plus the packed 16-bit formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorType {
    R8U,
    R16U,
    R32U,
    R64U,
    R16F,
    R32F,
    R64F,
    Rg8U,
    Rg16U,
    Rg32U,
    Rg64U,
    Rg16F,
    Rg32F,
    Rg64F,
    Rgb8U,
    Rgb16U,
    Rgb32U,
    Rgb64U,
    Rgb16F,
    Rgb32F,
    Rgb64F,
    Rgba8U,
    Rgba16U,
    Rgba32U,
    Rgba64U,
    Rgba16F,
    Rgba32F,
    Rgba64F,
    Rgb565,
    Rgba5551,
    Rgba4444,
}

impl ColorType {
    pub fn num_channels(self) -> usize {
        use self::ColorType::*;

        match self {
            R8U | R16U | R32U | R64U | R16F | R32F | R64F => 1,
            Rg8U | Rg16U | Rg32U | Rg64U | Rg16F | Rg32F | Rg64F => 2,
            Rgb8U | Rgb16U | Rgb32U | Rgb64U | Rgb16F | Rgb32F | Rgb64F | Rgb565 => 3,
            Rgba8U | Rgba16U | Rgba32U | Rgba64U | Rgba16F | Rgba32F | Rgba64F | Rgba5551 | Rgba4444 => 4,
        }
    }

    pub fn bytes_per_channel(self) -> usize {
        use self::ColorType::*;

        match self {
            R8U | Rg8U | Rgb8U | Rgba8U => 1,
            R16U | Rg16U | Rgb16U | Rgba16U | R16F | Rg16F | Rgb16F | Rgba16F => 2,
            R32U | Rg32U | Rgb32U | Rgba32U | R32F | Rg32F | Rgb32F | Rgba32F => 4,
            R64U | Rg64U | Rgb64U | Rgba64U | R64F | Rg64F | Rgb64F | Rgba64F => 8,
            Rgb565 | Rgba5551 | Rgba4444 => 2,
        }
    }

    pub fn bytes_per_texel(self) -> usize {
        use self::ColorType::*;

        match self {
            Rgb565 | Rgba5551 | Rgba4444 => 2,
            other => other.num_channels() * other.bytes_per_channel(),
        }
    }

    pub fn is_float(self) -> bool {
        use self::ColorType::*;

        match self {
            R16F | R32F | R64F | Rg16F | Rg32F | Rg64F | Rgb16F | Rgb32F | Rgb64F | Rgba16F
            | Rgba32F | Rgba64F => true,
            _ => false,
        }
    }

    /// Only single-channel floating formats may back a depth attachment.
    pub fn is_depth_capable(self) -> bool {
        match self {
            ColorType::R16F | ColorType::R32F | ColorType::R64F => true,
            _ => false,
        }
    }
}

/// Reads one texel into a normalized RGBA quadruple. Missing channels decode
/// as green/blue = 0 and alpha = 1.
pub type DecodeFn = fn(&[u8]) -> Vector4<f32>;

/// Writes a normalized RGBA quadruple into one texel, dropping the channels
/// the format does not store.
pub type EncodeFn = fn(&Vector4<f32>, &mut [u8]);

fn decode_r<T: ColorScalar>(buf: &[u8]) -> Vector4<f32> {
    Vector4::new(T::read(buf).to_norm(), 0.0, 0.0, 1.0)
}

fn decode_rg<T: ColorScalar>(buf: &[u8]) -> Vector4<f32> {
    Vector4::new(
        T::read(buf).to_norm(),
        T::read(&buf[T::SIZE..]).to_norm(),
        0.0,
        1.0,
    )
}

fn decode_rgb<T: ColorScalar>(buf: &[u8]) -> Vector4<f32> {
    Vector4::new(
        T::read(buf).to_norm(),
        T::read(&buf[T::SIZE..]).to_norm(),
        T::read(&buf[T::SIZE * 2..]).to_norm(),
        1.0,
    )
}

fn decode_rgba<T: ColorScalar>(buf: &[u8]) -> Vector4<f32> {
    Vector4::new(
        T::read(buf).to_norm(),
        T::read(&buf[T::SIZE..]).to_norm(),
        T::read(&buf[T::SIZE * 2..]).to_norm(),
        T::read(&buf[T::SIZE * 3..]).to_norm(),
    )
}

fn encode_r<T: ColorScalar>(rgba: &Vector4<f32>, buf: &mut [u8]) {
    T::from_norm(rgba[0]).write(buf);
}

fn encode_rg<T: ColorScalar>(rgba: &Vector4<f32>, buf: &mut [u8]) {
    T::from_norm(rgba[0]).write(buf);
    T::from_norm(rgba[1]).write(&mut buf[T::SIZE..]);
}

fn encode_rgb<T: ColorScalar>(rgba: &Vector4<f32>, buf: &mut [u8]) {
    T::from_norm(rgba[0]).write(buf);
    T::from_norm(rgba[1]).write(&mut buf[T::SIZE..]);
    T::from_norm(rgba[2]).write(&mut buf[T::SIZE * 2..]);
}

fn encode_rgba<T: ColorScalar>(rgba: &Vector4<f32>, buf: &mut [u8]) {
    T::from_norm(rgba[0]).write(buf);
    T::from_norm(rgba[1]).write(&mut buf[T::SIZE..]);
    T::from_norm(rgba[2]).write(&mut buf[T::SIZE * 2..]);
    T::from_norm(rgba[3]).write(&mut buf[T::SIZE * 3..]);
}

fn decode_packed_rgb565(buf: &[u8]) -> Vector4<f32> {
    packed::decode_rgb565(u16::read(buf))
}

fn decode_packed_rgba5551(buf: &[u8]) -> Vector4<f32> {
    packed::decode_rgba5551(u16::read(buf))
}

fn decode_packed_rgba4444(buf: &[u8]) -> Vector4<f32> {
    packed::decode_rgba4444(u16::read(buf))
}

fn encode_packed_rgb565(rgba: &Vector4<f32>, buf: &mut [u8]) {
    packed::encode_rgb565(rgba).write(buf)
}

fn encode_packed_rgba5551(rgba: &Vector4<f32>, buf: &mut [u8]) {
    packed::encode_rgba5551(rgba).write(buf)
}

fn encode_packed_rgba4444(rgba: &Vector4<f32>, buf: &mut [u8]) {
    packed::encode_rgba4444(rgba).write(buf)
}

/// Select the texel reader for a format.
pub fn decode_fn(color_type: ColorType) -> DecodeFn {
    use self::ColorType::*;

    match color_type {
        R8U => decode_r::<u8>,
        R16U => decode_r::<u16>,
        R32U => decode_r::<u32>,
        R64U => decode_r::<u64>,
        R16F => decode_r::<Half>,
        R32F => decode_r::<f32>,
        R64F => decode_r::<f64>,
        Rg8U => decode_rg::<u8>,
        Rg16U => decode_rg::<u16>,
        Rg32U => decode_rg::<u32>,
        Rg64U => decode_rg::<u64>,
        Rg16F => decode_rg::<Half>,
        Rg32F => decode_rg::<f32>,
        Rg64F => decode_rg::<f64>,
        Rgb8U => decode_rgb::<u8>,
        Rgb16U => decode_rgb::<u16>,
        Rgb32U => decode_rgb::<u32>,
        Rgb64U => decode_rgb::<u64>,
        Rgb16F => decode_rgb::<Half>,
        Rgb32F => decode_rgb::<f32>,
        Rgb64F => decode_rgb::<f64>,
        Rgba8U => decode_rgba::<u8>,
        Rgba16U => decode_rgba::<u16>,
        Rgba32U => decode_rgba::<u32>,
        Rgba64U => decode_rgba::<u64>,
        Rgba16F => decode_rgba::<Half>,
        Rgba32F => decode_rgba::<f32>,
        Rgba64F => decode_rgba::<f64>,
        Rgb565 => decode_packed_rgb565,
        Rgba5551 => decode_packed_rgba5551,
        Rgba4444 => decode_packed_rgba4444,
    }
}

/// Select the texel writer for a format.
pub fn encode_fn(color_type: ColorType) -> EncodeFn {
    use self::ColorType::*;

    match color_type {
        R8U => encode_r::<u8>,
        R16U => encode_r::<u16>,
        R32U => encode_r::<u32>,
        R64U => encode_r::<u64>,
        R16F => encode_r::<Half>,
        R32F => encode_r::<f32>,
        R64F => encode_r::<f64>,
        Rg8U => encode_rg::<u8>,
        Rg16U => encode_rg::<u16>,
        Rg32U => encode_rg::<u32>,
        Rg64U => encode_rg::<u64>,
        Rg16F => encode_rg::<Half>,
        Rg32F => encode_rg::<f32>,
        Rg64F => encode_rg::<f64>,
        Rgb8U => encode_rgb::<u8>,
        Rgb16U => encode_rgb::<u16>,
        Rgb32U => encode_rgb::<u32>,
        Rgb64U => encode_rgb::<u64>,
        Rgb16F => encode_rgb::<Half>,
        Rgb32F => encode_rgb::<f32>,
        Rgb64F => encode_rgb::<f64>,
        Rgba8U => encode_rgba::<u8>,
        Rgba16U => encode_rgba::<u16>,
        Rgba32U => encode_rgba::<u32>,
        Rgba64U => encode_rgba::<u64>,
        Rgba16F => encode_rgba::<Half>,
        Rgba32F => encode_rgba::<f32>,
        Rgba64F => encode_rgba::<f64>,
        Rgb565 => encode_packed_rgb565,
        Rgba5551 => encode_packed_rgba5551,
        Rgba4444 => encode_packed_rgba4444,
    }
}

/// Largest `bytes_per_texel` of any format, sized for stack texel scratch.
pub const MAX_TEXEL_BYTES: usize = 32;
