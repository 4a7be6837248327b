use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
  clients::AwsClients,
  error::{Error, Result},
  resources::{ClusterOutputs, ClusterSpec, PolicyAttachment, ResourceSpec, RoleOutputs, RoleRef, RoleSpec},
};

/// Outputs of a successfully submitted resource
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Created {
  Role(RoleOutputs),
  PolicyAttachment {
    name: String,
    role: String,
    policy_arn: String,
  },
  Cluster(ClusterOutputs),
}

/// Submits resource specs one at a time, in order
///
/// A dependent resource is only submitted once the role it references has
/// resolved its name and ARN. The first failure ends the sequence; resources
/// created before it are left in place.
pub struct Sequencer<'a, A> {
  clients: &'a A,
  roles: HashMap<RoleRef, RoleOutputs>,
  attached: HashMap<RoleRef, Vec<String>>,
}

impl<'a, A: AwsClients> Sequencer<'a, A> {
  pub fn new(clients: &'a A) -> Self {
    Self {
      clients,
      roles: HashMap::new(),
      attached: HashMap::new(),
    }
  }

  /// Submit each spec in order and collect the outcome of every submission made
  ///
  /// The returned outcomes end at the first `Err`.
  pub async fn apply(&mut self, specs: &[ResourceSpec]) -> Vec<Result<Created>> {
    let mut outcomes = Vec::with_capacity(specs.len());

    for spec in specs {
      let outcome = match spec {
        ResourceSpec::Role(role) => self.create_role(role).await,
        ResourceSpec::PolicyAttachment(attachment) => self.attach(attachment).await,
        ResourceSpec::Cluster(cluster) => self.create_cluster(cluster).await,
      };

      let failed = outcome.is_err();
      if let Err(err) = &outcome {
        error!(resource = spec.name(), "{err}");
      }
      outcomes.push(outcome);

      if failed {
        break;
      }
    }

    outcomes
  }

  async fn create_role(&mut self, spec: &RoleSpec) -> Result<Created> {
    let outputs = self
      .clients
      .create_role(spec)
      .await
      .map_err(|err| Error::creation(&spec.name, err))?;

    if outputs.arn.is_empty() {
      return Err(Error::creation(
        &spec.name,
        Error::api("CreateRole", "role was created without an ARN"),
      ));
    }

    info!(role = %outputs.name, arn = %outputs.arn, "Created role");
    self.roles.insert(RoleRef(spec.name.clone()), outputs.clone());

    Ok(Created::Role(outputs))
  }

  async fn attach(&mut self, spec: &PolicyAttachment) -> Result<Created> {
    let role_name = self.resolve(&spec.role, &spec.name)?.name.clone();

    if let Err(err) = self.clients.attach_role_policy(&role_name, &spec.policy_arn).await {
      return Err(Error::PartialAttachment {
        role: role_name,
        attached: self.attached.get(&spec.role).cloned().unwrap_or_default(),
        failed: spec.name.clone(),
        source: Box::new(err),
      });
    }

    info!(attachment = %spec.name, role = %role_name, policy = %spec.policy_arn, "Attached policy");
    self.attached.entry(spec.role.clone()).or_default().push(spec.name.clone());

    Ok(Created::PolicyAttachment {
      name: spec.name.clone(),
      role: role_name,
      policy_arn: spec.policy_arn.clone(),
    })
  }

  async fn create_cluster(&mut self, spec: &ClusterSpec) -> Result<Created> {
    let role_arn = self.resolve(&spec.role, &spec.name)?.arn.clone();

    let outputs = self
      .clients
      .create_cluster(&spec.name, &role_arn, &spec.subnet_ids)
      .await
      .map_err(|err| Error::creation(&spec.name, err))?;

    info!(cluster = %outputs.name, arn = %outputs.arn, "Created cluster");

    Ok(Created::Cluster(outputs))
  }

  fn resolve(&self, role: &RoleRef, dependent: &str) -> Result<&RoleOutputs> {
    self.roles.get(role).ok_or_else(|| {
      Error::Validation(format!(
        "{dependent} depends on role {} which has not been created",
        role.0
      ))
    })
  }
}

/// Identifiers accumulated by a fully successful sequence
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applied {
  pub role: RoleOutputs,
  pub attachments: Vec<String>,
  pub cluster: ClusterOutputs,
}

impl Applied {
  /// Fold sequencer outcomes, surfacing the first error
  pub fn from_outcomes(outcomes: Vec<Result<Created>>) -> Result<Self> {
    let mut role = None;
    let mut attachments = Vec::new();
    let mut cluster = None;

    for outcome in outcomes {
      match outcome? {
        Created::Role(outputs) => role = Some(outputs),
        Created::PolicyAttachment { name, .. } => attachments.push(name),
        Created::Cluster(outputs) => cluster = Some(outputs),
      }
    }

    Ok(Applied {
      role: role.ok_or_else(|| Error::Validation("no role was declared".to_string()))?,
      attachments,
      cluster: cluster.ok_or_else(|| Error::Validation("no cluster was declared".to_string()))?,
    })
  }
}
