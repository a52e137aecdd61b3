//! APD Sensors Tool
//!
//! Shows the readings of the built-in sensors, or of a single sensor under
//! development, in the terminal.

use anyhow::{Context, Result};
use apd_sensors::{collect, BoxedSensor, LoaderError, SensorContext, SensorRegistry};
use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "apd-sensors")]
#[command(about = "Show readings from the apd sensors")]
#[command(version)]
struct Cli {
    /// Load a single sensor by path (module:TypeName) instead of the defaults
    #[arg(long, value_name = "PATH")]
    develop: Option<String>,

    /// Enable verbose logging and full error diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Print the collected readings as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let registry = SensorRegistry::builtin();
    let context = SensorContext::default();

    let sensors = match load_sensors(&registry, &context, cli.develop.as_deref()) {
        Ok(sensors) => sensors,
        Err(e) => {
            if cli.verbose {
                eprintln!("{:?}", e);
            }
            eprintln!("{}", e);
            return Ok(ExitCode::from(e.code()));
        }
    };
    debug!("Loaded {} sensors", sensors.len());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        serde_json::to_writer_pretty(&mut out, &collect(&sensors))
            .context("Failed to write readings")?;
        writeln!(out)?;
    } else {
        show_sensors(&mut out, &sensors, cli.verbose).context("Failed to write readings")?;
    }

    Ok(ExitCode::SUCCESS)
}

fn load_sensors(
    registry: &SensorRegistry,
    context: &SensorContext,
    develop: Option<&str>,
) -> Result<Vec<BoxedSensor>, LoaderError> {
    match develop {
        Some(path) => Ok(vec![registry.get_sensor_by_path(path, context)?]),
        None => Ok(registry.get_sensors(context)),
    }
}

/// Writes title, value and a blank line for each sensor.
fn show_sensors(out: &mut impl Write, sensors: &[BoxedSensor], verbose: bool) -> io::Result<()> {
    for sensor in sensors {
        writeln!(out, "{}", sensor.title())?;
        match sensor.poll() {
            Ok(data) => writeln!(out, "{}", data.human_readable)?,
            Err(failure) => {
                if verbose {
                    writeln!(out, "{:?}", failure.error)?;
                }
                writeln!(out, "{}", failure.error.public_message())?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}
