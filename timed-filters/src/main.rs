use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

use timed_filters::config::load_config;
use timed_filters::open_job;
use timed_filters::services::status::render_crontab;
use timed_filters::types::error::Result;
use timed_filters::types::HandlerId;

/// Scheduled mailbox filters with a digest of processed threads
#[derive(Debug, Parser)]
#[command(name = "timed-filters", version, about)]
struct Cli {
    /// Config file (default: ~/.config/timed-filters/config.toml)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or migrate persisted state and register the triggers
    Install,
    /// Delete persisted state and every registered trigger
    Uninstall,
    /// Run every configured query once
    RunQueries,
    /// Email the processed-thread total and reset it
    EmailResults,
    /// Run the entry point a trigger names
    Dispatch {
        /// `run-queries` or `email-results`
        handler: HandlerId,
    },
    /// Show the installed version, running total and trigger count
    Status,
    /// List registered triggers
    Triggers,
    /// Print the registered triggers as crontab lines
    Crontab,
}

fn main() -> ExitCode {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "timed_filters=info,warn".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let job = open_job(&config)?;

    match cli.command {
        Command::Install => job.install(),
        Command::Uninstall => job.uninstall(),
        Command::RunQueries => job.run_queries(),
        Command::EmailResults => job.email_results(),
        Command::Dispatch { handler } => job.dispatch(handler),
        Command::Status => {
            let status = job.status()?;
            match status.version {
                Some(version) => println!("version:  {}", version),
                None => println!("version:  not installed"),
            }
            println!("total:    {}", status.total);
            println!("triggers: {}", status.triggers.len());
            Ok(())
        }
        Command::Triggers => {
            for trigger in job.status()?.triggers {
                println!(
                    "{}  {:<14} {}  (since {})",
                    trigger.id,
                    trigger.handler.as_str(),
                    trigger.schedule,
                    trigger.created_at.format("%Y-%m-%d %H:%M UTC")
                );
            }
            Ok(())
        }
        Command::Crontab => {
            let mut command = shell_quote(&std::env::current_exe()?.display().to_string());
            if let Some(path) = &cli.config {
                command.push_str(" --config ");
                command.push_str(&shell_quote(&path.display().to_string()));
            }
            println!("{}", render_crontab(&job.status()?.triggers, &command));
            Ok(())
        }
    }
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
