use std::fmt;

use aws_config::{BehaviorVersion, SdkConfig, meta::region::RegionProviderChain};
use aws_types::region::Region;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  clients::{AwsClients, CallerIdentity, RealAwsClients},
  error::{Error, Result},
};

/// Resolved provider configuration; created once per run and never mutated
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
  pub region: String,
  pub profile: String,
  pub behavior_version: BehaviorPin,
}

/// SDK behavior version used by the pinned binding
///
/// The default binding always resolves to `BehaviorVersion::latest()`, so pinning
/// anything other than `latest` here is what allows the two lookups to diverge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BehaviorPin {
  #[default]
  #[serde(rename = "2024-03-28")]
  V20240328,
  #[serde(rename = "latest")]
  Latest,
}

impl BehaviorPin {
  pub fn behavior_version(&self) -> BehaviorVersion {
    match self {
      BehaviorPin::V20240328 => BehaviorVersion::v2024_03_28(),
      BehaviorPin::Latest => BehaviorVersion::latest(),
    }
  }
}

/// Which provider a call is bound to
///
/// Both bindings authenticate with the configured region and profile; only the SDK
/// behavior version differs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Binding {
  /// Behavior version pinned by the configuration
  Pinned,
  /// `BehaviorVersion::latest()`
  Default,
}

impl Binding {
  pub fn behavior_version(&self, config: &ProviderConfig) -> BehaviorVersion {
    match self {
      Binding::Pinned => config.behavior_version.behavior_version(),
      Binding::Default => BehaviorVersion::latest(),
    }
  }
}

impl fmt::Display for Binding {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      Binding::Pinned => write!(f, "pinned"),
      Binding::Default => write!(f, "default"),
    }
  }
}

/// An authenticated provider session
#[derive(Clone, Debug)]
pub struct ProviderHandle<C> {
  pub binding: Binding,
  pub identity: CallerIdentity,
  pub clients: C,
}

/// Establishes provider sessions for a run
///
/// Abstracted so a run can be driven against mock clients.
pub trait Connect {
  type Clients: AwsClients + Sync;

  fn connect(
    &self,
    config: &ProviderConfig,
    binding: Binding,
  ) -> impl std::future::Future<Output = Result<ProviderHandle<Self::Clients>>> + Send;
}

/// Connects to the real AWS APIs
pub struct AwsConnector;

impl Connect for AwsConnector {
  type Clients = RealAwsClients;

  async fn connect(&self, config: &ProviderConfig, binding: Binding) -> Result<ProviderHandle<RealAwsClients>> {
    connect(config, binding).await
  }
}

/// Load the SDK configuration for the binding and verify the session is usable
pub async fn connect(config: &ProviderConfig, binding: Binding) -> Result<ProviderHandle<RealAwsClients>> {
  let sdk_config = load_sdk_config(config, binding).await;
  debug!(%binding, region = ?sdk_config.region(), "Loaded SDK configuration");

  let clients = RealAwsClients::new(&sdk_config);
  let identity = clients
    .get_caller_identity()
    .await
    .map_err(|err| Error::Authentication {
      profile: config.profile.clone(),
      region: config.region.clone(),
      message: err.to_string(),
    })?;

  info!(%binding, account = %identity.account, arn = %identity.arn, "Connected to AWS");

  Ok(ProviderHandle {
    binding,
    identity,
    clients,
  })
}

async fn load_sdk_config(config: &ProviderConfig, binding: Binding) -> SdkConfig {
  // The configured region always wins so both bindings see the cluster that was created
  let region_provider = RegionProviderChain::first_try(Region::new(config.region.clone())).or_default_provider();

  aws_config::defaults(binding.behavior_version(config))
    .region(region_provider)
    .profile_name(&config.profile)
    .load()
    .await
}
