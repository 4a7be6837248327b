use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabled::{Table, Tabled, settings::Style};

use crate::{
  config::Config,
  error::{Error, Result},
};

/// Trust policy allowing the EKS service to assume the cluster role
pub const EKS_ASSUME_ROLE_POLICY: &str = r#"{
  "Version": "2008-10-17",
  "Statement": [{
    "Sid": "",
    "Effect": "Allow",
    "Principal": {
      "Service": "eks.amazonaws.com"
    },
    "Action": "sts:AssumeRole"
  }]
}"#;

/// Managed policies attached to the cluster role, in attachment order
pub const EKS_POLICY_ARNS: [&str; 2] = [
  "arn:aws:iam::aws:policy/AmazonEKSServicePolicy",
  "arn:aws:iam::aws:policy/AmazonEKSClusterPolicy",
];

/// Reference to a role declared earlier in the same run, by name
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleRef(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
  pub name: String,
  pub assume_role_policy_document: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyAttachment {
  pub name: String,
  pub policy_arn: String,
  pub role: RoleRef,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
  pub name: String,
  pub role: RoleRef,
  pub subnet_ids: Vec<String>,
}

/// A resource to be submitted, in dependency order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceSpec {
  Role(RoleSpec),
  PolicyAttachment(PolicyAttachment),
  Cluster(ClusterSpec),
}

impl ResourceSpec {
  pub fn name(&self) -> &str {
    match self {
      ResourceSpec::Role(role) => &role.name,
      ResourceSpec::PolicyAttachment(attachment) => &attachment.name,
      ResourceSpec::Cluster(cluster) => &cluster.name,
    }
  }
}

/// Identifying outputs of a created role
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleOutputs {
  pub name: String,
  pub arn: String,
}

/// Identifying outputs of a created cluster
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterOutputs {
  pub name: String,
  pub arn: String,
}

/// Build the ordered resource specs for a run
///
/// Role first, then one attachment per configured policy ARN (`rpa-<index>`), then the
/// cluster. Nothing is submitted here.
pub fn declare(config: &Config) -> Result<Vec<ResourceSpec>> {
  let role = role_spec(&config.role.name, &config.role.assume_role_policy)?;
  let role_ref = RoleRef(role.name.clone());

  let mut specs = vec![ResourceSpec::Role(role)];

  for attachment in policy_attachments(&role_ref, &config.role.policy_arns)? {
    specs.push(ResourceSpec::PolicyAttachment(attachment));
  }

  specs.push(ResourceSpec::Cluster(cluster_spec(
    &config.cluster.name,
    &role_ref,
    &config.cluster.subnet_ids,
  )?));

  Ok(specs)
}

pub fn role_spec(name: &str, assume_role_policy: &str) -> Result<RoleSpec> {
  if name.trim().is_empty() {
    return Err(Error::Validation("role name must not be empty".to_string()));
  }
  validate_policy_document(assume_role_policy)?;

  Ok(RoleSpec {
    name: name.to_string(),
    assume_role_policy_document: assume_role_policy.to_string(),
  })
}

pub fn policy_attachments(role: &RoleRef, policy_arns: &[String]) -> Result<Vec<PolicyAttachment>> {
  policy_arns
    .iter()
    .enumerate()
    .map(|(i, arn)| {
      if arn.trim().is_empty() {
        return Err(Error::Validation(format!("policy ARN {i} for role {} is empty", role.0)));
      }
      Ok(PolicyAttachment {
        name: format!("rpa-{i}"),
        policy_arn: arn.to_string(),
        role: role.clone(),
      })
    })
    .collect()
}

pub fn cluster_spec(name: &str, role: &RoleRef, subnet_ids: &[String]) -> Result<ClusterSpec> {
  if name.trim().is_empty() {
    return Err(Error::Validation("cluster name must not be empty".to_string()));
  }
  if subnet_ids.is_empty() {
    return Err(Error::Validation(format!("cluster {name} requires at least one subnet")));
  }

  Ok(ClusterSpec {
    name: name.to_string(),
    role: role.clone(),
    subnet_ids: subnet_ids.to_vec(),
  })
}

#[derive(Tabled)]
#[tabled(rename_all = "UpperCase")]
struct PlanRow {
  kind: &'static str,
  name: String,
  #[tabled(rename = "DEPENDS ON")]
  depends_on: String,
  detail: String,
}

/// Tabular view of the declared resources, in submission order
pub fn to_stdout_table(specs: &[ResourceSpec]) -> String {
  let rows: Vec<PlanRow> = specs
    .iter()
    .map(|spec| match spec {
      ResourceSpec::Role(role) => PlanRow {
        kind: "role",
        name: role.name.clone(),
        depends_on: String::new(),
        detail: String::new(),
      },
      ResourceSpec::PolicyAttachment(attachment) => PlanRow {
        kind: "policy-attachment",
        name: attachment.name.clone(),
        depends_on: attachment.role.0.clone(),
        detail: attachment.policy_arn.clone(),
      },
      ResourceSpec::Cluster(cluster) => PlanRow {
        kind: "cluster",
        name: cluster.name.clone(),
        depends_on: cluster.role.0.clone(),
        detail: cluster.subnet_ids.join(", "),
      },
    })
    .collect();

  let mut table = Table::new(rows);
  table.with(Style::sharp());
  format!("{table}\n")
}

/// An IAM policy document must be a JSON object with a non-empty `Statement`
fn validate_policy_document(document: &str) -> Result<()> {
  let value: Value = serde_json::from_str(document)
    .map_err(|err| Error::Validation(format!("assume role policy is not valid JSON: {err}")))?;

  let statement = value
    .as_object()
    .and_then(|doc| doc.get("Statement"))
    .ok_or_else(|| Error::Validation("assume role policy has no Statement".to_string()))?;

  let populated = match statement {
    Value::Array(statements) => !statements.is_empty(),
    Value::Object(_) => true,
    _ => false,
  };
  if !populated {
    return Err(Error::Validation("assume role policy Statement is empty".to_string()));
  }

  Ok(())
}
