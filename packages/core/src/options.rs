//! Compression parameters and results.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output encodings supported by the compressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    /// Parse a MIME type or a bare format name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "jpeg" | "jpg" => Some(OutputFormat::Jpeg),
            "image/png" | "png" => Some(OutputFormat::Png),
            "image/webp" | "webp" => Some(OutputFormat::Webp),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Parameters for a single compression call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompressionOptions {
    /// Output quality, 0-100.
    pub quality: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
    /// Explicit output format. Chosen from the source type when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
    /// Clamp dimensions and trade quality for size.
    pub web_optimized: bool,
    pub progressive: bool,
    pub remove_metadata: bool,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            quality: 80,
            max_width: None,
            max_height: None,
            output_format: None,
            web_optimized: false,
            progressive: false,
            remove_metadata: false,
        }
    }
}

impl CompressionOptions {
    /// Options used for batches submitted from the compression page.
    pub fn for_web(quality: u8) -> Self {
        Self {
            quality: quality.min(100),
            web_optimized: true,
            progressive: quality > 70,
            remove_metadata: true,
            ..Self::default()
        }
    }

    pub fn with_max_dimensions(mut self, max_width: Option<u32>, max_height: Option<u32>) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Artifact produced by a successful compression.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionOutput {
    /// Encoded output file.
    pub payload: Bytes,
    pub size_bytes: u64,
    pub format: OutputFormat,
    pub original_dimensions: Dimensions,
    pub output_dimensions: Dimensions,
    /// Source size divided by output size.
    pub compression_ratio: f64,
    /// Quality that was requested, before any automatic adjustment.
    pub quality: u8,
    /// Small JPEG rendition for side-by-side comparison.
    pub preview: Option<Bytes>,
}

/// Errors reported by a compressor.
///
/// The queue does not distinguish between kinds: every error is retried
/// until the job runs out of attempts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompressionError {
    #[error("Failed to load image: {0}")]
    Decode(String),

    #[error("Failed to compress image: {0}")]
    Encode(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Compressor panicked: {0}")]
    Panicked(String),
}

/// Outcome of a compression call.
pub type CompressionResult = Result<CompressionOutput, CompressionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_preset_follows_quality() {
        let high = CompressionOptions::for_web(85);
        assert!(high.web_optimized);
        assert!(high.progressive);
        assert!(high.remove_metadata);

        let low = CompressionOptions::for_web(60);
        assert!(!low.progressive);

        assert_eq!(CompressionOptions::for_web(250).quality, 100);
    }

    #[test]
    fn format_parsing_accepts_mime_and_names() {
        assert_eq!(OutputFormat::parse("image/jpeg"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::parse("JPG"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::parse("webp"), Some(OutputFormat::Webp));
        assert_eq!(OutputFormat::parse("image/gif"), None);
        assert_eq!(OutputFormat::Png.extension(), "png");
    }

    #[test]
    fn options_use_camel_case_on_the_wire() {
        let options = CompressionOptions::for_web(75).with_max_dimensions(Some(800), None);
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["maxWidth"], 800);
        assert_eq!(json["webOptimized"], true);
        assert!(json.get("maxHeight").is_none());

        let parsed: CompressionOptions =
            serde_json::from_str(r#"{"quality": 40, "outputFormat": "png"}"#).unwrap();
        assert_eq!(parsed.quality, 40);
        assert_eq!(parsed.output_format, Some(OutputFormat::Png));
        assert!(!parsed.web_optimized);
    }

    #[test]
    fn pixel_count_does_not_overflow() {
        let dims = Dimensions::new(u32::MAX, 2);
        assert_eq!(dims.pixel_count(), u64::from(u32::MAX) * 2);
        assert_eq!(Dimensions::new(1920, 1080).to_string(), "1920x1080");
    }
}
