//! Nearest-neighbor texture blits between arbitrary color formats.

use ::color::{decode_fn, encode_fn};
use ::texture::TextureView;

/// Fractional bits of the fixed-point source coordinate stepping.
const NUM_FIXED_BITS: u64 = 16;

/// One worker's share of a rectangle-to-rectangle blit.
///
/// Source texels decode to normalized RGBA and re-encode into the
/// destination format, so every source/destination format pairing goes
/// through the same kernel with the codecs resolved once up front. Worker
/// `t` copies the destination rows where `row mod num_threads == t`.
#[derive(Clone, Copy)]
pub struct BlitProcessor<'a> {
    pub thread_id: usize,
    pub num_threads: usize,
    pub src: &'a TextureView,
    pub dst: &'a TextureView,
    /// `(x0, y0, x1, y1)`, exclusive on the upper bounds.
    pub src_rect: (u16, u16, u16, u16),
    pub dst_rect: (u16, u16, u16, u16),
}

impl<'a> BlitProcessor<'a> {
    pub fn execute(&self) {
        let (src_x0, src_y0, src_x1, src_y1) = self.src_rect;
        let (dst_x0, dst_y0, dst_x1, dst_y1) = self.dst_rect;

        let in_w = src_x1.saturating_sub(src_x0) as u64;
        let in_h = src_y1.saturating_sub(src_y0) as u64;
        let out_w = dst_x1.saturating_sub(dst_x0) as u64;
        let out_h = dst_y1.saturating_sub(dst_y0) as u64;

        if in_w == 0 || in_h == 0 || out_w == 0 || out_h == 0 {
            return;
        }

        // identical formats at 1:1 scale skip the decode/encode round trip
        if self.src.color_type() == self.dst.color_type() && in_w == out_w && in_h == out_h {
            self.copy_rows();
            return;
        }

        let decode = decode_fn(self.src.color_type());
        let encode = encode_fn(self.dst.color_type());

        // fixed-point source steps; the +1 guards against the rounding loss
        // of the truncating division
        let fout_w = ((in_w << NUM_FIXED_BITS) / out_w) + 1;
        let fout_h = ((in_h << NUM_FIXED_BITS) / out_h) + 1;

        let x_end = (dst_x1 as u64).min(self.dst.width() as u64);
        let y_end = (dst_y1 as u64).min(self.dst.height() as u64);

        let mut y = dst_y0 as u64 + self.thread_id as u64;

        while y < y_end {
            let yf = ((y - dst_y0 as u64) * fout_h) >> NUM_FIXED_BITS;
            let src_y = (src_y0 as u64 + yf).min(src_y1 as u64 - 1) as u16;

            let mut x = dst_x0 as u64;
            while x < x_end {
                let xf = ((x - dst_x0 as u64) * fout_w) >> NUM_FIXED_BITS;
                let src_x = (src_x0 as u64 + xf).min(src_x1 as u64 - 1) as u16;

                unsafe {
                    let rgba = decode(self.src.texel(src_x, src_y, 0));
                    encode(&rgba, self.dst.texel_mut(x as u16, y as u16, 0));
                }

                x += 1;
            }

            y += self.num_threads as u64;
        }
    }

    fn copy_rows(&self) {
        let (src_x0, src_y0, _, src_y1) = self.src_rect;
        let (dst_x0, dst_y0, dst_x1, dst_y1) = self.dst_rect;

        let x_end = dst_x1.min(self.dst.width());
        let y_end = dst_y1.min(self.dst.height());

        let mut y = dst_y0 as usize + self.thread_id;

        while y < y_end as usize {
            let src_y = (src_y0 as usize + (y - dst_y0 as usize)).min(src_y1 as usize - 1) as u16;

            for x in dst_x0..x_end {
                let src_x = src_x0 + (x - dst_x0);

                unsafe {
                    let texel = self.src.texel(src_x, src_y, 0);
                    self.dst.texel_mut(x, y as u16, 0).copy_from_slice(texel);
                }
            }

            y += self.num_threads;
        }
    }
}
