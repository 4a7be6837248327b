mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod lookup;
pub mod output;
pub mod provider;
pub mod resources;
pub mod retry;
pub mod run;
pub mod sequencer;

use anyhow::Result;

pub use cli::{Apply, Cli, Commands, Plan};
pub use error::Error;

/// Provision the declared resources and write the exported outputs
pub async fn apply(args: &Apply) -> Result<()> {
  let config = config::load(args.config.as_deref())?.with_overrides(args.region.clone(), args.profile.clone());

  // All checks and validations on input happen inside the run before any API call
  let report = run::run(&config, &provider::AwsConnector).await?;
  output::output(&report.outputs, &args.format, &args.output)?;

  Ok(())
}

/// Render the declared resources without connecting to AWS
pub fn plan(args: &Plan) -> Result<()> {
  let config = config::load(args.config.as_deref())?;
  let specs = resources::declare(&config)?;

  let rendered = output::render(&specs, &args.format, |specs| resources::to_stdout_table(specs))?;
  output::write(&rendered, &args.output)
}
