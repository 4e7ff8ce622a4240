//! Blit processor behavior through the context and pool.

extern crate softraster;

use softraster::color::ColorType;
use softraster::context::Context;
use softraster::texture::TexelOrder;

/// An 8x8-squares checkerboard scaled from 100x100 into 300x200 must follow
/// the nearest-neighbor source mapping at every destination pixel.
#[test]
fn checkerboard_scaling_matches_the_mapping() {
    let mut ctx = Context::with_threads(4);

    let (src_w, src_h) = (100u16, 100u16);
    let (dst_w, dst_h) = (300u16, 200u16);

    let src = ctx.create_texture(ColorType::Rgba8U, src_w, src_h, 1, TexelOrder::Ordered).unwrap();
    let dst = ctx.create_texture(ColorType::Rgba8U, dst_w, dst_h, 1, TexelOrder::Ordered).unwrap();

    {
        let texture = ctx.texture_mut(src).unwrap();
        for y in 0..src_h {
            for x in 0..src_w {
                let white = ((x / 8) + (y / 8)) % 2 == 0;
                let value = if white { 255 } else { 16 };
                texture.texel_mut(x, y, 0).copy_from_slice(&[value, value, value, 255]);
            }
        }
    }

    ctx.blit(src, dst, (0, 0, src_w, src_h), (0, 0, dst_w, dst_h)).unwrap();

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = (dx as u32 * src_w as u32 / dst_w as u32) as u16;
            let sy = (dy as u32 * src_h as u32 / dst_h as u32) as u16;

            assert_eq!(
                ctx.texture(dst).unwrap().texel(dx, dy, 0),
                ctx.texture(src).unwrap().texel(sx, sy, 0),
                "mismatch at ({}, {}) <- ({}, {})", dx, dy, sx, sy
            );
        }
    }
}

/// Blitting out of a swizzled source exercises the Z-order addressing.
#[test]
fn swizzled_source_blits_like_an_ordered_one() {
    let mut ctx = Context::with_threads(2);

    let swizzled = ctx.create_texture(ColorType::R8U, 32, 32, 1, TexelOrder::Swizzled).unwrap();
    let ordered = ctx.create_texture(ColorType::R8U, 32, 32, 1, TexelOrder::Ordered).unwrap();

    {
        let texture = ctx.texture_mut(swizzled).unwrap();
        for y in 0..32u16 {
            for x in 0..32u16 {
                texture.texel_mut(x, y, 0)[0] = (x * 7 + y * 3) as u8;
            }
        }
    }

    ctx.blit(swizzled, ordered, (0, 0, 32, 32), (0, 0, 32, 32)).unwrap();

    for y in 0..32u16 {
        for x in 0..32u16 {
            assert_eq!(
                ctx.texture(ordered).unwrap().texel(x, y, 0)[0],
                (x * 7 + y * 3) as u8,
                "at ({}, {})", x, y
            );
        }
    }
}

/// Sub-rectangle to sub-rectangle, with a format conversion on the way.
#[test]
fn offset_rectangles_and_conversion() {
    let mut ctx = Context::with_threads(3);

    let src = ctx.create_texture(ColorType::Rgba8U, 16, 16, 1, TexelOrder::Ordered).unwrap();
    let dst = ctx.create_texture(ColorType::Rgb565, 16, 16, 1, TexelOrder::Ordered).unwrap();

    {
        let texture = ctx.texture_mut(src).unwrap();
        for y in 4..8u16 {
            for x in 4..8u16 {
                texture.texel_mut(x, y, 0).copy_from_slice(&[255, 0, 0, 255]);
            }
        }
    }

    ctx.blit(src, dst, (4, 4, 8, 8), (8, 8, 12, 12)).unwrap();

    let texture = ctx.texture(dst).unwrap();
    for y in 8..12u16 {
        for x in 8..12u16 {
            let texel = texture.texel(x, y, 0);
            let bits = u16::from_ne_bytes([texel[0], texel[1]]);
            // pure red in RGB565
            assert_eq!(bits, 0xF800, "at ({}, {})", x, y);
        }
    }

    // untouched destination texels stay zero
    assert_eq!(texture.texel(0, 0, 0), &[0, 0]);
}
