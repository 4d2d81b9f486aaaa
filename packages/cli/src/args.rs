//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use squeeze_core::{CompressionOptions, OutputFormat};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "squeeze",
    about = "Compress images through a bounded-concurrency queue"
)]
pub struct Args {
    /// Images to compress.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory for compressed files.
    #[arg(short, long, default_value = "compressed")]
    pub out_dir: PathBuf,

    /// Encoder quality.
    #[arg(short, long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Maximum output width in pixels.
    #[arg(long)]
    pub max_width: Option<u32>,

    /// Maximum output height in pixels.
    #[arg(long)]
    pub max_height: Option<u32>,

    /// Output format (jpeg, png or webp). Chosen per file when unset.
    #[arg(short, long, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Subscription plan whose limits apply.
    #[arg(long, env = "SQUEEZE_PLAN", default_value = "free")]
    pub plan: String,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Options for every job in the batch.
    pub fn options(&self) -> CompressionOptions {
        let options = CompressionOptions::for_web(self.quality)
            .with_max_dimensions(self.max_width, self.max_height);
        match self.format {
            Some(format) => options.with_output_format(format),
            None => options,
        }
    }
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    OutputFormat::parse(value).ok_or_else(|| format!("unsupported format: {value}"))
}
