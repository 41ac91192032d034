use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use njdoe_sync::commands::sync;
use njdoe_sync::config::{ConfigOverrides, SourceMode};
use njdoe_sync::models::CheckType;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "njdoe-sync")]
#[command(about = "Verify HR workers against NJDOE background-check and certification records", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up criminal-history background checks by SSN and birth date
    BackgroundCheck {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Look up teaching certifications by surname and SSN
    Certification {
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Batch source: preselected (staff list) or full-roster (HR export).
    /// Overrides SOURCE_MODE.
    #[arg(long, value_parser = parse_source_mode)]
    source: Option<SourceMode>,

    /// Do not send alert emails for this run
    #[arg(long)]
    no_notify: bool,
}

impl RunArgs {
    fn overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            source_mode: self.source,
            disable_notifications: self.no_notify,
        }
    }
}

fn parse_source_mode(s: &str) -> Result<SourceMode, String> {
    s.parse().map_err(|e: anyhow::Error| e.to_string())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("njdoe_sync=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let (check, run) = match cli.command {
        Commands::BackgroundCheck { run } => (CheckType::BackgroundCheck, run),
        Commands::Certification { run } => (CheckType::Certification, run),
    };

    match sync::execute(check, run.overrides()) {
        Ok(summary) => {
            println!("\n{}", summary.to_string().bold());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
