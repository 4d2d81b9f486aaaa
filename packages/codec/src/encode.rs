//! Decoding and encoding with the `image` crate.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader, RgbImage};
use squeeze_core::{Dimensions, OutputFormat};
use thiserror::Error;

/// Errors from the codec pipeline.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("empty source")]
    EmptySource,

    #[error("{0}")]
    Decode(String),

    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("{format} encoding failed: {message}")]
    Encode {
        format: OutputFormat,
        message: String,
    },
}

/// Map an `image` crate format onto an output format, if it is one.
pub fn output_format_of(format: ImageFormat) -> Option<OutputFormat> {
    match format {
        ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
        ImageFormat::Png => Some(OutputFormat::Png),
        ImageFormat::WebP => Some(OutputFormat::Webp),
        _ => None,
    }
}

/// Sniff the container format from the leading bytes.
pub fn sniff_format(bytes: &[u8]) -> Option<OutputFormat> {
    image::guess_format(bytes).ok().and_then(output_format_of)
}

/// Decode an encoded image.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::EmptySource);
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CodecError::Decode(e.to_string()))?;

    reader
        .decode()
        .map_err(|e| CodecError::Decode(e.to_string()))
}

/// Resize to exact dimensions. Returns the input unchanged if it already matches.
pub fn resize(image: DynamicImage, target: Dimensions, smooth: bool) -> DynamicImage {
    if image.width() == target.width && image.height() == target.height {
        return image;
    }
    // Bicubic for web output, bilinear otherwise.
    let filter = if smooth {
        FilterType::CatmullRom
    } else {
        FilterType::Triangle
    };
    image.resize_exact(target.width, target.height, filter)
}

/// Round every colour channel to an even value.
///
/// Halving the number of distinct levels gives the JPEG encoder less
/// high-frequency noise to spend bits on.
pub fn quantize_channels(image: &mut RgbImage) {
    for channel in image.iter_mut() {
        let rounded = ((f32::from(*channel) / 2.0).round() * 2.0).min(255.0);
        *channel = rounded as u8;
    }
}

/// Encode RGB pixels as JPEG.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, CodecError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(CodecError::InvalidDimensions { width, height });
    }

    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    encoder
        .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| CodecError::Encode {
            format: OutputFormat::Jpeg,
            message: e.to_string(),
        })?;

    Ok(buffer.into_inner())
}

/// Encode an image in the requested format.
///
/// PNG and WebP output is lossless, so `quality` only affects JPEG.
/// `thorough` selects the slowest PNG compression setting.
pub fn encode(
    image: &DynamicImage,
    format: OutputFormat,
    quality: u8,
    thorough: bool,
) -> Result<Vec<u8>, CodecError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(CodecError::InvalidDimensions { width, height });
    }

    let encode_err = |e: image::ImageError| CodecError::Encode {
        format,
        message: e.to_string(),
    };

    match format {
        OutputFormat::Jpeg => encode_jpeg(&image.to_rgb8(), quality),
        OutputFormat::Png => {
            let rgba = image.to_rgba8();
            let mut buffer = Vec::new();
            let compression = if thorough {
                CompressionType::Best
            } else {
                CompressionType::Default
            };
            PngEncoder::new_with_quality(&mut buffer, compression, PngFilter::Adaptive)
                .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(encode_err)?;
            Ok(buffer)
        }
        OutputFormat::Webp => {
            let rgba = image.to_rgba8();
            let mut buffer = Vec::new();
            WebPEncoder::new_lossless(&mut buffer)
                .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(encode_err)?;
            Ok(buffer)
        }
    }
}

/// Small JPEG rendition that fits in a `size` x `size` box.
pub fn preview(image: &DynamicImage, size: u32, quality: u8) -> Result<Vec<u8>, CodecError> {
    let thumb = image.thumbnail(size.max(1), size.max(1));
    encode_jpeg(&thumb.to_rgb8(), quality)
}
