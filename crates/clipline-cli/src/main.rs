//! `clipline`: run bounding-box correction and clip projection over local
//! extraction and OCR JSON files.
//!
//! ```bash
//! clipline clip --fields extraction.json --ocr vision.json --table
//! clipline correct --fields extraction.json --ocr vision.json
//! clipline words --ocr vision.json
//! ```

mod display;
mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

#[derive(Parser)]
#[command(name = "clipline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Snap LLM field boxes to OCR words and project them into clips", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value = "text", env = "CLIPLINE_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and print the clip message
    Clip {
        /// Extraction JSON produced by the language model
        #[arg(long, env = "CLIPLINE_FIELDS")]
        fields: PathBuf,

        /// OCR document-text annotation JSON
        #[arg(long, env = "CLIPLINE_OCR")]
        ocr: PathBuf,

        /// Clipping request id (defaults to a fresh UUID)
        #[arg(long, env = "CLIPLINE_REQUEST_ID")]
        request_id: Option<String>,

        /// Write the message here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Print a clip table instead of JSON
        #[arg(long, conflicts_with = "output")]
        table: bool,
    },
    /// Print the field tree with corrected boxes
    Correct {
        #[arg(long, env = "CLIPLINE_FIELDS")]
        fields: PathBuf,

        #[arg(long, env = "CLIPLINE_OCR")]
        ocr: PathBuf,
    },
    /// List OCR words in reading order
    Words {
        #[arg(long, env = "CLIPLINE_OCR")]
        ocr: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);
    tracing::debug!("clipline v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Clip {
            fields,
            ocr,
            request_id,
            output,
            table,
        } => {
            let request_id = request_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let message = run::clip(&fields, &ocr, &request_id)?;
            if table {
                display::print_clip_table(&message);
            } else {
                run::write_json(&message, output.as_deref())?;
            }
        }
        Commands::Correct { fields, ocr } => {
            let corrected = run::correct(&fields, &ocr)?;
            run::write_json(&corrected, None)?;
        }
        Commands::Words { ocr } => {
            let words = run::words(&ocr)?;
            display::print_words(&words);
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
