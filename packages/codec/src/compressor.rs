//! The `image`-crate implementation of the compression primitive.

use std::sync::Arc;

use bytes::Bytes;
use image::RgbImage;
use squeeze_core::{
    CompressFuture, CompressionError, CompressionOptions, CompressionOutput, CompressionResult,
    Compressor, Dimensions, OutputFormat, SourceImage, SourceRef,
};

use crate::encode::{self, CodecError};
use crate::params::{effective_quality, select_format, should_quantize, target_dimensions};
use crate::CodecConfig;

impl From<CodecError> for CompressionError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::EmptySource | CodecError::Decode(_) => {
                CompressionError::Decode(err.to_string())
            }
            CodecError::InvalidDimensions { .. } | CodecError::Encode { .. } => {
                CompressionError::Encode(err.to_string())
            }
        }
    }
}

/// Compressor that decodes, resizes and re-encodes images.
///
/// Work runs on the blocking thread pool so decoding large files does not
/// stall the async runtime. Re-encoding drops all source metadata.
#[derive(Debug, Clone, Default)]
pub struct ImageCompressor {
    config: Arc<CodecConfig>,
}

impl ImageCompressor {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}

impl Compressor for ImageCompressor {
    fn name(&self) -> &str {
        "image"
    }

    fn compress(&self, source: SourceRef, options: CompressionOptions) -> CompressFuture {
        let config = Arc::clone(&self.config);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || compress_image(&source, &options, &config))
                .await
                .map_err(|e| {
                    CompressionError::ResourceUnavailable(format!("compression worker: {e}"))
                })?
        })
    }
}

/// Run the full pipeline synchronously.
pub fn compress_image(
    source: &SourceImage,
    options: &CompressionOptions,
    config: &CodecConfig,
) -> CompressionResult {
    let decoded = encode::decode(&source.bytes)?;
    let original = Dimensions::new(decoded.width(), decoded.height());

    let target = target_dimensions(original, options, config);
    let resized = encode::resize(decoded, target, options.web_optimized);

    let source_format = source
        .mime_type
        .as_deref()
        .and_then(OutputFormat::parse)
        .or_else(|| encode::sniff_format(&source.bytes));
    let format = select_format(source_format, options);
    let quality = effective_quality(options, target, config);

    tracing::debug!(
        "Compressing {} {} -> {} as {} at quality {}",
        source.name,
        original,
        target,
        format,
        quality
    );

    let payload = if should_quantize(format, options, config) {
        let mut rgb: RgbImage = resized.to_rgb8();
        encode::quantize_channels(&mut rgb);
        encode::encode_jpeg(&rgb, quality)?
    } else {
        encode::encode(&resized, format, quality, options.web_optimized)?
    };

    let preview = encode::preview(&resized, config.preview_size, config.preview_quality)?;

    let size_bytes = payload.len() as u64;
    let compression_ratio = if size_bytes == 0 {
        0.0
    } else {
        source.size() as f64 / size_bytes as f64
    };

    Ok(CompressionOutput {
        payload: Bytes::from(payload),
        size_bytes,
        format,
        original_dimensions: original,
        output_dimensions: target,
        compression_ratio,
        quality: options.quality,
        preview: Some(Bytes::from(preview)),
    })
}
