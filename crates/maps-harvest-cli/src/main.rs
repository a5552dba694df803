//! maps-harvest — entry point.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use maps_harvest_cli::cli::run_cmd::{ConfigArgs, RunArgs};
use maps_harvest_cli::cli::{self, output};

#[derive(Parser)]
#[command(
    name = "maps-harvest",
    about = "Scrape restaurant listings from a map search and publish them to Google Sheets",
    version,
    after_help = "Run 'maps-harvest <command> --help' for details on each command.\nRun 'maps-harvest' with no command to scrape and upload with the defaults."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the results page, clean the listings, and upload them
    Run(RunArgs),
    /// Check Chromium and credentials
    Doctor(ConfigArgs),
    /// Print the resolved configuration as JSON
    Config(ConfigArgs),
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        cli.log_level.as_str()
    };

    // Third-party crates (chromiumoxide in particular) stay at warn.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "warn,maps_harvest={level},maps_harvest_cli={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var("MAPS_HARVEST_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("MAPS_HARVEST_QUIET", "1");
    }
    if cli.no_color {
        std::env::set_var("MAPS_HARVEST_NO_COLOR", "1");
    }

    init_tracing(&cli);

    let result = match cli.command {
        None => cli::run_cmd::run(&RunArgs::default()).await,
        Some(Commands::Run(args)) => cli::run_cmd::run(&args).await,
        Some(Commands::Doctor(args)) => cli::doctor::run(&args.resolve()).await,
        Some(Commands::Config(args)) => cli::config_cmd::run(&args.resolve()),
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "maps-harvest", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if output::is_json() {
            output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else {
            eprintln!("  {} Error: {e:#}", output::Styled::new().err_sym());
        }
        std::process::exit(1);
    }

    result
}
