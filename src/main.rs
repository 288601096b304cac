mod commands;

use cargo_relay::core::error::{print_error, RelayError};
use clap::{Parser, Subcommand};

/// Resumable release orchestration: retry, checkpoints, rollback
#[derive(Parser)]
#[command(name = "cargo")]
#[command(bin_name = "cargo")]
#[command(styles = get_styles())]
enum CargoCli {
  Relay(RelayCli),
}

#[derive(Parser)]
#[command(name = "relay")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct RelayCli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Show status of all recorded release workflows
  Status {
    /// Output status in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Inspect one release workflow (stages, faults, rollback snapshot)
  Show {
    /// Workflow id (see `cargo relay status`)
    id: String,
    /// Output workflow in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Roll back a failed release from its persisted snapshot
  Rollback {
    /// Workflow id (see `cargo relay status`)
    id: String,
    /// Restrict to specific components (registry, release-host, changelog, manifest, vcs)
    #[arg(long, value_delimiter = ',')]
    components: Vec<String>,
    /// Continue past unrecoverable component failures
    #[arg(long)]
    force: bool,
    /// Validate system state against the snapshot after rolling back
    #[arg(long)]
    validate: bool,
    /// Deadline for the rollback pass, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Actually perform the rollback (default: dry-run mode showing plan)
    #[arg(long)]
    apply: bool,
    /// Output the rollback outcome in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Delete terminal workflow state files
  Clean {
    /// Also remove failed workflows (discards their rollback snapshots)
    #[arg(long)]
    failed: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let CargoCli::Relay(cli) = CargoCli::parse();

  let result = match cli.command {
    Commands::Status { json } => commands::run_status(json),
    Commands::Show { id, json } => commands::run_show(&id, json),
    Commands::Rollback {
      id,
      components,
      force,
      validate,
      timeout_ms,
      apply,
      json,
    } => commands::run_rollback(&id, components, force, validate, timeout_ms, apply, json),
    Commands::Clean { failed } => commands::run_clean(failed),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: RelayError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
