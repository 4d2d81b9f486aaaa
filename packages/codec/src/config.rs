//! Tunables for the image compressor.

use serde::{Deserialize, Serialize};

/// Constants applied by [`crate::ImageCompressor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Width cap for web-optimized output when no explicit max is given.
    pub web_max_width: u32,
    /// Height cap for web-optimized output when no explicit max is given.
    pub web_max_height: u32,
    /// Output pixel count above which web-optimized quality is lowered.
    pub large_image_pixels: u64,
    /// Quality points removed from large web-optimized images.
    pub large_image_quality_penalty: u8,
    /// Quality never drops below this through the large-image penalty.
    pub min_quality: u8,
    /// Web-optimized JPEGs below this quality get channel quantization.
    pub quantize_below_quality: u8,
    /// Longest edge of the preview rendition.
    pub preview_size: u32,
    pub preview_quality: u8,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            web_max_width: 1920,
            web_max_height: 1080,
            large_image_pixels: 1_000_000,
            large_image_quality_penalty: 10,
            min_quality: 10,
            quantize_below_quality: 85,
            preview_size: 200,
            preview_quality: 80,
        }
    }
}
