//! neural-style CLI - apply a neural style model to an image.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use neural_style::image::{save_image, to_data_url, MAX_INPUT_SIZE};
use neural_style::math::factorial;
use neural_style::model::{OrtEngine, StyleSelection};
use neural_style::pipeline::{AppState, Event, Phase, SelectedFile};
use neural_style::{Config, Stylizer};

/// Apply neural style transfer models to images.
#[derive(Parser, Debug)]
#[command(name = "neural-style")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stylize an image with one of the bundled style models.
    Stylize {
        /// Input image path.
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output image path. Defaults to `<input-stem>-<style>.png`.
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Style model: mosaic, candy or rain-princess.
        #[arg(short, long, default_value = "mosaic", value_name = "STYLE")]
        style: StyleSelection,

        /// Directory containing the `.onnx` style models.
        #[arg(long, value_name = "DIR")]
        models_dir: Option<PathBuf>,

        /// Side length of the square model input (1-4096).
        #[arg(
            long,
            default_value = "224",
            value_name = "INT",
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_INPUT_SIZE))
        )]
        size: u32,

        /// Output JPEG quality (1-100).
        #[arg(short, long, default_value = "95", value_name = "INT")]
        quality: u8,

        /// Print the result as a PNG data URL instead of writing a file.
        #[arg(long)]
        data_url: bool,
    },

    /// Compute n! the way the demo page's arithmetic module does.
    Factorial {
        #[arg(value_name = "N")]
        n: u32,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("neural_style={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(args.command) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Stylize {
            input,
            output,
            style,
            models_dir,
            size,
            quality,
            data_url,
        } => {
            let config = Config {
                width: size,
                height: size,
                models_dir,
                output_quality: quality,
            };
            stylize(&input, output, style, config, data_url)
        }
        Command::Factorial { n } => {
            let result = factorial(n).context("Failed to compute factorial")?;
            println!("Factorial of {n} is {result}");
            Ok(())
        }
    }
}

fn stylize(
    input: &Path,
    output: Option<PathBuf>,
    style: StyleSelection,
    config: Config,
    data_url: bool,
) -> Result<()> {
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read input file {}", input.display()))?;

    let quality = config.output_quality;
    let stylizer = Stylizer::new(OrtEngine, config).context("Failed to initialize pipeline")?;

    let mut state = AppState::new(style);
    state.apply(Event::FileSelected(SelectedFile::new(
        input.display().to_string(),
        bytes,
    )));
    stylizer.run(&mut state);

    let image = match (state.phase(), state.take_result()) {
        (Phase::Done, Some(image)) => image,
        _ => anyhow::bail!(
            "{}",
            state.error().unwrap_or("Style transfer did not produce an image")
        ),
    };

    if data_url {
        println!("{}", to_data_url(&image).context("Failed to encode result")?);
        return Ok(());
    }

    let output = output.unwrap_or_else(|| default_output(input, style));
    save_image(&image, &output, quality).context("Failed to save result")?;

    println!(
        "Successfully processed {} -> {}",
        input.display(),
        output.display()
    );

    Ok(())
}

fn default_output(input: &Path, style: StyleSelection) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}-{style}.png"))
}
