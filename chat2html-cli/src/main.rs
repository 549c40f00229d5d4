use std::path::PathBuf;
use std::process::ExitCode;

use chat2html_core::{ConvertOptions, TimeZoneMode, convert};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "chat2html",
    version,
    about = "Render an LM Studio chat export as a standalone HTML page"
)]
struct Cli {
    /// Chat export JSON file
    input: PathBuf,

    /// Output HTML file, defaults to <input without extension>_chat.html
    output: Option<PathBuf>,

    /// Render timestamps in UTC instead of local time
    #[arg(long)]
    utc: bool,

    /// Leave out the light/dark theme toggle
    #[arg(long)]
    no_theme_toggle: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(&cli) {
        Ok(output) => {
            println!("HTML chat interface saved to {}", output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> chat2html_core::Result<PathBuf> {
    // Flags win over CHAT2HTML_* environment values.
    let mut options = ConvertOptions::from_env()?;
    if cli.utc {
        options.time_zone = TimeZoneMode::Utc;
    }
    if cli.no_theme_toggle {
        options.theme_toggle = false;
    }

    convert(&cli.input, cli.output.as_deref(), &options)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(err) = result {
        eprintln!("warning: could not initialize logging: {err}");
    }
}
