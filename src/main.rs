use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use cloud_drive::config::{schema_json, Config};

/// Personal cloud storage from the terminal.
#[derive(Parser, Debug)]
#[command(name = "cloud-drive", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log requests and responses to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and open the interactive dashboard (default)
    Shell,

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the JSON Schema of the config file
    Schema,
    /// Print the config file location
    Path,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "cloud_drive=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn config_path(cli_path: Option<PathBuf>) -> Result<PathBuf> {
    cli_path
        .or_else(Config::default_path)
        .context("Could not determine a config directory; pass --config")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            let config = Config::load(cli.config.as_deref())?;
            tokio::select! {
                result = cloud_drive::shell::run(&config) => result,
                _ = tokio::signal::ctrl_c() => {
                    eprintln!();
                    // A prompt may still hold a blocking thread that runtime
                    // shutdown would wait on.
                    std::process::exit(130);
                }
            }
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "cloud-drive", &mut io::stdout());
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = Config::load(cli.config.as_deref())?;
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigAction::Init { force } => {
                let path = config_path(cli.config)?;
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                Config::default().save(&path)?;
                println!("Wrote {}", path.display());
                Ok(())
            }
            ConfigAction::Schema => {
                println!("{}", schema_json()?);
                Ok(())
            }
            ConfigAction::Path => {
                println!("{}", config_path(cli.config)?.display());
                Ok(())
            }
        },
    }
}
