use std::process::ExitCode;

use clap::{Parser, Subcommand};

use rommap_cli::commands::{self, ScanArgs};
use rommap_cli::CommandError;

/// Calibration-map detector CLI for ECU firmware images.
///
/// The binary is intentionally thin: it parses args and dispatches to command
/// helpers; `rommap-core` owns the detection logic for testability and reuse.
#[derive(Parser, Debug)]
#[command(
    name = "rommap",
    version,
    about = "Locate 2D calibration maps in ECU firmware images",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a firmware image for candidate maps and persist them as JSON.
    Scan {
        /// Path to the raw firmware image.
        image: String,

        /// Optional JSON catalog of known-map templates to rescan.
        #[arg(long)]
        templates: Option<String>,

        /// Optional JSON disassembler export used as classification hints.
        #[arg(long)]
        hints: Option<String>,

        /// Output path for the detected-maps JSON.
        #[arg(long)]
        out: String,

        /// Row count every candidate is tested with.
        #[arg(long, default_value_t = 3)]
        min_rows: usize,

        /// Largest column count tried at each offset.
        #[arg(long, default_value_t = 128)]
        max_cols: usize,

        /// Worker thread count. Defaults to one per CPU core.
        #[arg(long)]
        threads: Option<usize>,

        /// Grow candidates past the minimum row count while rows stay correlated.
        #[arg(long, default_value_t = false)]
        grow_rows: bool,

        /// Byte window swept around each template's recorded address.
        #[arg(long, default_value_t = 4096)]
        search_range: usize,

        /// Optional output path for relocated template fragments (JSON).
        #[arg(long)]
        templates_out: Option<String>,

        /// Emit a JSON summary instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Render a persisted maps JSON file as an XDF document.
    ExportXdf {
        /// Path to a maps JSON file produced by `scan`.
        maps: String,

        /// Output path for the XDF document.
        #[arg(long)]
        out: String,

        /// Emit a JSON summary instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result: Result<(), CommandError> = match cli.command {
        Command::Scan {
            image,
            templates,
            hints,
            out,
            min_rows,
            max_cols,
            threads,
            grow_rows,
            search_range,
            templates_out,
            json,
        } => commands::scan_command(&ScanArgs {
            image,
            templates,
            hints,
            out,
            min_rows,
            max_cols,
            threads,
            grow_rows,
            search_range,
            templates_out,
            json,
        }),
        Command::ExportXdf { maps, out, json } => commands::export_xdf_command(&maps, &out, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
