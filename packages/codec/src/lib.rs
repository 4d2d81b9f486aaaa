//! Image compression primitive built on the `image` crate.
//!
//! [`ImageCompressor`] implements [`squeeze_core::Compressor`]:
//! - web-optimized output is clamped to 1920x1080 (or explicit maxima)
//! - large web-optimized outputs trade a little quality for size
//! - PNG sources stay PNG unless web-optimized, WebP stays WebP, all else is JPEG
//! - every result carries a small JPEG preview

mod compressor;
mod config;
pub mod encode;
pub mod params;

pub use compressor::{ImageCompressor, compress_image};
pub use config::CodecConfig;
pub use encode::CodecError;
