mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::loan::{ProjectArgs, ScheduleArgs, ValidateArgs};
use commands::portfolio::PortfolioArgs;

/// Loan amortization schedules and portfolio aggregation
#[derive(Parser)]
#[command(
    name = "loanctl",
    version,
    about = "Loan amortization schedules and portfolio aggregation",
    long_about = "A CLI for generating loan payment schedules with decimal precision. \
                  Supports fully amortizing and interest-only/balloon structures, \
                  as-of-date projections, and portfolio-level aggregation."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate loan terms and report field-level errors
    Validate(ValidateArgs),
    /// Generate the full payment schedule for one loan
    Schedule(ScheduleArgs),
    /// Project point-in-time facts for one loan at an as-of date
    Project(ProjectArgs),
    /// Aggregate a set of loans into a portfolio summary
    Portfolio(PortfolioArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Validate(args) => commands::loan::run_validate(args),
        Commands::Schedule(args) => commands::loan::run_schedule(args),
        Commands::Project(args) => commands::loan::run_project(args),
        Commands::Portfolio(args) => commands::portfolio::run_portfolio(args),
        Commands::Version => {
            println!("loanctl {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
