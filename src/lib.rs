#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate nalgebra;
extern crate num_cpus;
extern crate num_traits;
extern crate parking_lot;
extern crate scoped_threadpool;
extern crate smallvec;

#[cfg(feature = "image_compat")]
extern crate image;

pub mod error;
pub mod utils;
pub mod half;
pub mod interpolate;
pub mod color;
pub mod texture;
pub mod framebuffer;
pub mod mesh;
pub mod uniform;
pub mod shader;
pub mod clip;
pub mod scanline;
pub mod bins;
pub mod vertex;
pub mod raster;
pub mod blit;
pub mod pool;
pub mod context;
pub mod window;

#[cfg(feature = "image_compat")]
pub mod image_compat;
