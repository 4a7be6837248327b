use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use serde::{Deserialize, Serialize};

use crate::output;

/// Styles for CLI
fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .literal(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::BrightCyan))),
    )
    .usage(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
}

#[derive(Debug, Parser)]
#[command(author, about, version)]
#[command(propagate_version = true)]
#[command(styles=get_styles())]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,

  #[clap(flatten)]
  pub verbose: Verbosity,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Provision the cluster and export its certificate authority lookups
  Apply(Apply),

  /// Print the resources that would be provisioned without calling AWS
  Plan(Plan),
}

#[derive(Args, Debug, Serialize, Deserialize)]
pub struct Apply {
  /// Path to the configuration file (defaults to .eksprov.yaml when present)
  #[arg(short, long)]
  pub config: Option<String>,

  /// The AWS region where the cluster is provisioned
  #[arg(short, long, env = "AWS_REGION")]
  pub region: Option<String>,

  /// The AWS profile used by the pinned provider
  #[arg(short, long, env = "AWS_PROFILE")]
  pub profile: Option<String>,

  #[arg(short, long, value_enum, default_value_t)]
  pub format: output::Format,

  /// Write to file instead of stdout
  #[arg(short, long)]
  pub output: Option<String>,
}

#[derive(Args, Debug, Serialize, Deserialize)]
pub struct Plan {
  /// Path to the configuration file (defaults to .eksprov.yaml when present)
  #[arg(short, long)]
  pub config: Option<String>,

  #[arg(short, long, value_enum, default_value_t)]
  pub format: output::Format,

  /// Write to file instead of stdout
  #[arg(short, long)]
  pub output: Option<String>,
}
