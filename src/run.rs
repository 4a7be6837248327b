use std::{fmt, time::Duration};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
  clients::{AwsClients, CallerIdentity},
  config::Config,
  error::Result,
  lookup::{self, ClusterLookupResult},
  output::{CLUSTER_CA_DATA, CLUSTER_CA_DATA_DEFAULT, Outputs},
  provider::{Binding, Connect, ProviderHandle},
  resources::{self, ResourceSpec},
  retry::{self, Backoff},
  sequencer::{Applied, Created, Sequencer},
};

/// Linear progression of a provisioning run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RunState {
  Init,
  ProviderConnected,
  RoleCreated,
  PoliciesAttached,
  ClusterCreated,
  LookupResolved,
  Exported,
  Done,
}

impl fmt::Display for RunState {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

/// State threaded through every step of a run
pub struct Context<P, D> {
  pub pinned: P,
  pub default: D,
  pub state: RunState,
  pub created: Vec<Created>,
  pub outputs: Outputs,
}

impl<P: AwsClients, D: AwsClients> Context<P, D> {
  pub fn new(pinned: P, default: D) -> Self {
    Self {
      pinned,
      default,
      state: RunState::Init,
      created: Vec::new(),
      outputs: Outputs::new(),
    }
  }

  fn advance(&mut self, state: RunState) {
    info!(from = %self.state, to = %state, "Run state changed");
    self.state = state;
  }

  /// Submit the specs in order, advancing the state as each kind of resource lands
  pub async fn apply(&mut self, specs: &[ResourceSpec]) -> Result<Applied> {
    let outcomes = Sequencer::new(&self.pinned).apply(specs).await;
    let declared = specs
      .iter()
      .filter(|spec| matches!(spec, ResourceSpec::PolicyAttachment(_)))
      .count();
    let mut attached = 0;

    for created in outcomes.iter().flatten() {
      match created {
        Created::Role(_) => self.advance(RunState::RoleCreated),
        Created::PolicyAttachment { .. } => attached += 1,
        Created::Cluster(_) => self.advance(RunState::ClusterCreated),
      }
      if self.state == RunState::RoleCreated && attached == declared {
        self.advance(RunState::PoliciesAttached);
      }
      self.created.push(created.clone());
    }

    Applied::from_outcomes(outcomes)
  }

  /// Look the cluster up through both bindings and export what each one reports
  pub async fn resolve(
    &mut self,
    applied: &Applied,
    backoff: &Backoff,
  ) -> Result<(ClusterLookupResult, ClusterLookupResult)> {
    let (pinned, default) = lookup::lookup_both(&applied.cluster, &self.pinned, &self.default, backoff).await?;
    self.advance(RunState::LookupResolved);

    self.outputs.export(CLUSTER_CA_DATA, pinned.ca_data());
    self.outputs.export(CLUSTER_CA_DATA_DEFAULT, default.ca_data());
    self.advance(RunState::Exported);

    Ok((pinned, default))
  }
}

/// Everything a completed run produced
#[derive(Debug, Serialize)]
pub struct Report {
  /// Who each binding authenticated as, pinned first
  pub callers: Vec<(Binding, CallerIdentity)>,
  pub created: Vec<Created>,
  pub pinned: ClusterLookupResult,
  pub default: ClusterLookupResult,
  pub outputs: Outputs,
}

/// Provision the declared resources and resolve both lookups
///
/// Configuration and declaration problems are reported before any connection is
/// made. A failure after that aborts the run and leaves whatever was already created.
pub async fn run<C: Connect>(config: &Config, connector: &C) -> Result<Report> {
  let provider = config.provider()?;
  let specs = resources::declare(config)?;
  info!(region = %provider.region, profile = %provider.profile, resources = specs.len(), "Starting run");

  let pinned = connector.connect(&provider, Binding::Pinned).await?;
  let default = connector.connect(&provider, Binding::Default).await?;
  let callers = callers(&pinned, &default);

  let mut ctx = Context::new(pinned.clients, default.clients);
  ctx.advance(RunState::ProviderConnected);

  let result = provision(&mut ctx, config, &specs).await;
  if let Err(err) = &result {
    error!(state = %ctx.state, "Run aborted: {err}");
  }
  let (pinned, default) = result?;

  ctx.advance(RunState::Done);

  Ok(Report {
    callers,
    created: ctx.created,
    pinned,
    default,
    outputs: ctx.outputs,
  })
}

fn callers<P, D>(pinned: &ProviderHandle<P>, default: &ProviderHandle<D>) -> Vec<(Binding, CallerIdentity)> {
  if pinned.identity.account != default.identity.account {
    warn!(
      pinned = %pinned.identity.account,
      default = %default.identity.account,
      "Bindings authenticated against different accounts"
    );
  }

  vec![
    (pinned.binding, pinned.identity.clone()),
    (default.binding, default.identity.clone()),
  ]
}

async fn provision<P: AwsClients, D: AwsClients>(
  ctx: &mut Context<P, D>,
  config: &Config,
  specs: &[ResourceSpec],
) -> Result<(ClusterLookupResult, ClusterLookupResult)> {
  let applied = ctx.apply(specs).await?;

  if config.cluster.wait_for_active {
    let interval = Duration::from_secs(config.cluster.wait_interval_secs);
    let backoff = Backoff {
      retries: config.cluster.wait_attempts,
      initial_delay: interval,
      max_delay: interval,
    };
    retry::wait_for_active(&ctx.pinned, &applied.cluster.name, &backoff).await?;
  }

  ctx.resolve(&applied, &Backoff::from(&config.lookup)).await
}
