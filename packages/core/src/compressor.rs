//! Compressor trait consumed by the queue.

use std::future::Future;
use std::pin::Pin;

use crate::{CompressionOptions, CompressionResult, SourceRef};

/// Future type for async compression calls.
pub type CompressFuture = Pin<Box<dyn Future<Output = CompressionResult> + Send>>;

/// The compression primitive.
///
/// Implement this trait to define how a source image is turned into an
/// output artifact. Each call owns its own working memory; nothing is
/// shared between concurrent calls.
pub trait Compressor: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str {
        "compressor"
    }

    /// Compress one source image.
    fn compress(&self, source: SourceRef, options: CompressionOptions) -> CompressFuture;
}

/// A simple function-based compressor.
pub struct FnCompressor<F>
where
    F: Fn(SourceRef, CompressionOptions) -> CompressFuture + Send + Sync + 'static,
{
    name: String,
    compress: F,
}

impl<F> FnCompressor<F>
where
    F: Fn(SourceRef, CompressionOptions) -> CompressFuture + Send + Sync + 'static,
{
    /// Create a new function-based compressor.
    pub fn new(name: impl Into<String>, compress: F) -> Self {
        Self {
            name: name.into(),
            compress,
        }
    }
}

impl<F> Compressor for FnCompressor<F>
where
    F: Fn(SourceRef, CompressionOptions) -> CompressFuture + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn compress(&self, source: SourceRef, options: CompressionOptions) -> CompressFuture {
        (self.compress)(source, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompressionError, SourceImage};

    #[tokio::test]
    async fn fn_compressor_forwards_calls() {
        let compressor = FnCompressor::new("reject", |source: SourceRef, _options| {
            let name = source.name.clone();
            Box::pin(async move { Err(CompressionError::Decode(name)) })
        });

        let source = SourceImage::new("broken.png", vec![0u8; 4]).into_ref();
        let result = compressor
            .compress(source, CompressionOptions::default())
            .await;

        assert_eq!(compressor.name(), "reject");
        assert_eq!(result, Err(CompressionError::Decode("broken.png".into())));
    }
}
