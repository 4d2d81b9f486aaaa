use clap::Parser;
use cli::Args;
use codec::CodecConfig;
use squeeze_core::QueueConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // RUST_LOG overrides the default level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = QueueConfig::from_env()?;
    let summary = cli::run(&args, config, CodecConfig::default()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary.render());
    }

    if !summary.is_success() {
        std::process::exit(2);
    }
    Ok(())
}
