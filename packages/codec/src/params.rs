//! Output parameters derived from the request and the decoded source.
//!
//! These functions are pure so the sizing and quality rules can be tested
//! without encoding anything.

use squeeze_core::{CompressionOptions, Dimensions, OutputFormat};

use crate::CodecConfig;

/// Compute output dimensions for an image.
///
/// Web-optimized requests are clamped to the explicit `max_width` /
/// `max_height` if given, otherwise to the configured web maximum. Other
/// requests are clamped only to explicit maxima. Width is constrained
/// first, then height, both preserving aspect ratio. Images are never
/// upscaled.
pub fn target_dimensions(
    original: Dimensions,
    options: &CompressionOptions,
    config: &CodecConfig,
) -> Dimensions {
    let (max_width, max_height) = if options.web_optimized {
        (
            Some(options.max_width.unwrap_or(config.web_max_width)),
            Some(options.max_height.unwrap_or(config.web_max_height)),
        )
    } else {
        (options.max_width, options.max_height)
    };

    let mut width = f64::from(original.width);
    let mut height = f64::from(original.height);

    if let Some(max) = max_width.filter(|&m| m > 0)
        && width > f64::from(max)
    {
        height = height * f64::from(max) / width;
        width = f64::from(max);
    }

    if let Some(max) = max_height.filter(|&m| m > 0)
        && height > f64::from(max)
    {
        width = width * f64::from(max) / height;
        height = f64::from(max);
    }

    // Raster sizes are whole pixels; fractional edges are truncated.
    Dimensions::new((width as u32).max(1), (height as u32).max(1))
}

/// Quality handed to the encoder.
///
/// Large web-optimized outputs lose a fixed number of quality points,
/// never going below the configured floor.
pub fn effective_quality(
    options: &CompressionOptions,
    output: Dimensions,
    config: &CodecConfig,
) -> u8 {
    let quality = options.quality.min(100);
    if options.web_optimized && output.pixel_count() > config.large_image_pixels {
        quality
            .saturating_sub(config.large_image_quality_penalty)
            .max(config.min_quality)
    } else {
        quality
    }
}

/// Pick the output format.
///
/// An explicit format wins. Otherwise PNG stays PNG unless web-optimized,
/// WebP stays WebP, and everything else becomes JPEG.
pub fn select_format(source: Option<OutputFormat>, options: &CompressionOptions) -> OutputFormat {
    if let Some(format) = options.output_format {
        return format;
    }
    match source {
        Some(OutputFormat::Png) if !options.web_optimized => OutputFormat::Png,
        Some(OutputFormat::Webp) => OutputFormat::Webp,
        _ => OutputFormat::Jpeg,
    }
}

/// Whether channel quantization applies before encoding.
pub fn should_quantize(format: OutputFormat, options: &CompressionOptions, config: &CodecConfig) -> bool {
    format == OutputFormat::Jpeg
        && options.web_optimized
        && options.quality < config.quantize_below_quality
}
