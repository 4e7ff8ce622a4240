//! Primitive bins and fragment queues shared between the pipeline phases.

use nalgebra::Vector4;

use ::shader::{FragCoord, MAX_VARYINGS};

/// Capacity of the shared bin array. Producers that outrun it trigger a
/// mid-draw flush through the rasterizer.
pub const MAX_BINNED_PRIMS: usize = 4096;

/// Capacity of a per-worker fragment queue.
pub const MAX_QUEUED_FRAGS: usize = 64;

#[inline]
fn zero4() -> Vector4<f32> {
    Vector4::new(0.0, 0.0, 0.0, 0.0)
}

/// One clipped, transformed primitive, ready for rasterization.
///
/// `screen_coords` hold window-space x/y, the mapped depth in z, and `1/w`
/// from the perspective divide in w. The barycentric basis is laid out so a
/// pixel's coordinate is `basis[0]*x + basis[1]*y + basis[2]`. Lines use the
/// first two vertex slots and points only the first.
#[derive(Debug, Clone, Copy)]
#[repr(align(128))]
pub struct FragmentBin {
    pub screen_coords: [Vector4<f32>; 3],
    pub barycentric: [Vector4<f32>; 3],
    pub varyings: [[Vector4<f32>; MAX_VARYINGS]; 3],
}

impl FragmentBin {
    pub fn empty() -> FragmentBin {
        FragmentBin {
            screen_coords: [zero4(); 3],
            barycentric: [zero4(); 3],
            varyings: [[zero4(); MAX_VARYINGS]; 3],
        }
    }
}

/// Per-worker staging for fragments that passed the depth test, stored
/// structure-of-arrays so the flush walks each stream linearly.
#[derive(Clone, Copy)]
pub struct FragQueue {
    pub bc: [Vector4<f32>; MAX_QUEUED_FRAGS],
    pub coord: [FragCoord; MAX_QUEUED_FRAGS],
}

impl FragQueue {
    pub fn empty() -> FragQueue {
        FragQueue {
            bc: [zero4(); MAX_QUEUED_FRAGS],
            coord: [FragCoord { x: 0, y: 0, depth: 0.0 }; MAX_QUEUED_FRAGS],
        }
    }
}
