use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
  error::{self, Error},
  provider::{BehaviorPin, ProviderConfig},
  resources,
};

/// Top-level configuration loaded from `.eksprov.yaml` or an explicit path.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub provider: ProviderSettings,

  #[serde(default)]
  pub role: RoleConfig,

  #[serde(default)]
  pub cluster: ClusterConfig,

  #[serde(default)]
  pub lookup: LookupConfig,
}

/// Provider settings as written by the user; both values are required before a run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
  pub region: Option<String>,

  pub profile: Option<String>,

  /// SDK behavior version used by the pinned binding
  #[serde(default)]
  pub behavior_version: BehaviorPin,
}

/// The IAM role assumed by the EKS control plane
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoleConfig {
  #[serde(default = "default_role_name")]
  pub name: String,

  /// Managed policies attached to the role, in attachment order
  #[serde(default = "default_policy_arns")]
  pub policy_arns: Vec<String>,

  /// Trust policy document (JSON)
  #[serde(default = "default_assume_role_policy")]
  pub assume_role_policy: String,
}

fn default_role_name() -> String {
  "eks-iam-eksRole".to_string()
}

fn default_policy_arns() -> Vec<String> {
  resources::EKS_POLICY_ARNS.iter().map(|arn| arn.to_string()).collect()
}

fn default_assume_role_policy() -> String {
  resources::EKS_ASSUME_ROLE_POLICY.to_string()
}

impl Default for RoleConfig {
  fn default() -> Self {
    Self {
      name: default_role_name(),
      policy_arns: default_policy_arns(),
      assume_role_policy: default_assume_role_policy(),
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterConfig {
  #[serde(default = "default_cluster_name")]
  pub name: String,

  #[serde(default = "default_subnet_ids")]
  pub subnet_ids: Vec<String>,

  /// Poll the cluster until it reports `ACTIVE` before looking it up
  #[serde(default)]
  pub wait_for_active: bool,

  #[serde(default = "default_wait_attempts")]
  pub wait_attempts: u32,

  #[serde(default = "default_wait_interval_secs")]
  pub wait_interval_secs: u64,
}

fn default_cluster_name() -> String {
  "example".to_string()
}

fn default_subnet_ids() -> Vec<String> {
  vec!["your-subnetids".to_string(), "your-subnetids".to_string()]
}

// Cluster creation typically takes 10-15 minutes
fn default_wait_attempts() -> u32 {
  90
}

fn default_wait_interval_secs() -> u64 {
  20
}

impl Default for ClusterConfig {
  fn default() -> Self {
    Self {
      name: default_cluster_name(),
      subnet_ids: default_subnet_ids(),
      wait_for_active: false,
      wait_attempts: default_wait_attempts(),
      wait_interval_secs: default_wait_interval_secs(),
    }
  }
}

/// Caller-side retry settings for lookups that race cluster visibility.
///
/// `retries: 0` means a lookup that returns `NotFound` fails the run immediately.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LookupConfig {
  #[serde(default)]
  pub retries: u32,

  #[serde(default = "default_initial_backoff_ms")]
  pub initial_backoff_ms: u64,

  #[serde(default = "default_max_backoff_ms")]
  pub max_backoff_ms: u64,
}

fn default_initial_backoff_ms() -> u64 {
  500
}

fn default_max_backoff_ms() -> u64 {
  10_000
}

impl Default for LookupConfig {
  fn default() -> Self {
    Self {
      retries: 0,
      initial_backoff_ms: default_initial_backoff_ms(),
      max_backoff_ms: default_max_backoff_ms(),
    }
  }
}

impl Config {
  /// Apply command line overrides on top of the file values
  pub fn with_overrides(mut self, region: Option<String>, profile: Option<String>) -> Self {
    if region.is_some() {
      self.provider.region = region;
    }
    if profile.is_some() {
      self.provider.profile = profile;
    }
    self
  }

  /// Resolve the provider configuration, failing if region or profile is missing
  ///
  /// Blank values are treated the same as missing ones.
  pub fn provider(&self) -> error::Result<ProviderConfig> {
    let region = require(&self.provider.region, "provider.region")?;
    let profile = require(&self.provider.profile, "provider.profile")?;

    Ok(ProviderConfig {
      region,
      profile,
      behavior_version: self.provider.behavior_version,
    })
  }
}

fn require(value: &Option<String>, key: &str) -> error::Result<String> {
  match value.as_deref().map(str::trim) {
    Some(v) if !v.is_empty() => Ok(v.to_string()),
    _ => Err(Error::Configuration(format!("missing required configuration value '{key}'"))),
  }
}

const DEFAULT_CONFIG_FILE: &str = ".eksprov.yaml";

/// Load configuration from an explicit path, the default `.eksprov.yaml` in the
/// current working directory, or fall back to `Config::default()`.
pub fn load(path: Option<&str>) -> Result<Config> {
  load_from(path, std::env::current_dir().ok().as_deref())
}

fn load_from(path: Option<&str>, base_dir: Option<&Path>) -> Result<Config> {
  match (path, base_dir) {
    (Some(path), _) => read(Path::new(path)),
    (None, Some(dir)) if dir.join(DEFAULT_CONFIG_FILE).exists() => read(&dir.join(DEFAULT_CONFIG_FILE)),
    _ => Ok(Config::default()),
  }
}

fn read(path: &Path) -> Result<Config> {
  let contents =
    std::fs::read_to_string(path).with_context(|| format!("Failed to read config file: {}", path.display()))?;
  serde_yaml::from_str(&contents).with_context(|| format!("Failed to parse config file: {}", path.display()))
}
