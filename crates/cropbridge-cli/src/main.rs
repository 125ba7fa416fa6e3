//! cropbridge - copy crop and straighten edits from Nitro sidecars into
//! Adobe camera-raw sidecars.
//!
//! # Usage
//!
//! ```bash
//! # One pair of sidecars
//! cropbridge convert nitro/IMG_0001.xmp adobe/IMG_0001.xmp
//!
//! # Every matching sidecar in two directories
//! cropbridge convert nitro/ adobe/ --dry-run
//!
//! # Show what a sidecar holds
//! cropbridge inspect nitro/IMG_0001.xmp
//! ```

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::error;

use cropbridge_core::ConvertOptions;

/// Command-line arguments
#[derive(Parser)]
#[command(name = "cropbridge", version)]
#[command(about = "Convert Nitro crop edits into Adobe camera-raw crop settings")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write crops from source sidecars into existing destination sidecars
    Convert(ConvertArgs),
    /// Print the crop held by a sidecar
    Inspect(InspectArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Source sidecar, or directory of source sidecars
    source: PathBuf,

    /// Destination sidecar, or directory of destination sidecars
    destination: PathBuf,

    /// Decimal places for written crop values
    #[arg(long, default_value = "6")]
    precision: usize,

    /// Compute crops without modifying any file
    #[arg(long)]
    dry_run: bool,

    /// Write the crop in sensor orientation, ignoring image rotation
    #[arg(long)]
    no_orientation: bool,

    /// Do not read EXIF orientation from photos next to the sidecars
    #[arg(long)]
    no_probe_image: bool,
}

impl ConvertArgs {
    fn options(&self) -> ConvertOptions {
        ConvertOptions {
            precision: self.precision,
            dry_run: self.dry_run,
            probe_image_orientation: !self.no_probe_image,
            apply_orientation: !self.no_orientation,
        }
    }
}

#[derive(Args)]
struct InspectArgs {
    /// Sidecar to inspect
    file: PathBuf,

    /// Destination sidecar whose orientation applies, as in `convert`
    #[arg(long)]
    destination: Option<PathBuf>,

    /// Do not read EXIF orientation from photos next to the sidecars
    #[arg(long)]
    no_probe_image: bool,

    /// Decimal places for computed crop values
    #[arg(long, default_value = "6")]
    precision: usize,
}

/// Install the fmt subscriber; `RUST_LOG` overrides the `info` default.
fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Convert(args) => {
            commands::convert(&args.source, &args.destination, &args.options()).map(|ok| {
                if ok {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            })
        }
        Command::Inspect(args) => commands::inspect(
            &args.file,
            args.destination.as_deref(),
            args.precision,
            !args.no_probe_image,
        )
        .map(|report| {
            print!("{report}");
            ExitCode::SUCCESS
        }),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
