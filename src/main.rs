use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use promopost::PostComposer;
use promopost::detection::{DEFAULT_CONFIDENCE, DEFAULT_MODEL};

#[derive(Parser)]
#[command(name = "promopost")]
#[command(about = "Cut a product out of a catalog photo and lay it out as a branded post")]
struct Cli {
    /// Catalog image containing the product
    #[arg(value_name = "CATALOG")]
    catalog: PathBuf,

    /// Header image placed at the top of the post
    #[arg(value_name = "HEADER")]
    header: PathBuf,

    /// Output name; the post is written as <OUTPUT_BASE>.jpg
    #[arg(value_name = "OUTPUT_BASE")]
    output_base: String,

    /// Detection model: a .rten file or a name looked up in the model directories
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Minimum detection confidence
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE, value_parser = parse_confidence)]
    confidence: f32,

    /// Directory to write the post to
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Save intermediate images to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_confidence(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not between 0 and 1"))
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let mut composer = PostComposer::new(args.model)
        .confidence(args.confidence)?
        .output_dir(args.output_dir);

    if let Some(debug_dir) = args.debug_out {
        composer = composer.debug_dir(debug_dir);
    }

    match composer.create(&args.catalog, &args.header, &args.output_base) {
        Some(_) => Ok(ExitCode::SUCCESS),
        None => Ok(ExitCode::FAILURE),
    }
}
