use aws_sdk_eks::{
  error::DisplayErrorContext,
  operation::describe_cluster::DescribeClusterError,
  types::{Cluster, VpcConfigRequest},
};
use serde::Serialize;
use tracing::debug;

use crate::{
  error::{Error, Result},
  resources::{ClusterOutputs, RoleOutputs, RoleSpec},
};

/// Identity the provider session authenticated as
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CallerIdentity {
  pub account: String,
  pub arn: String,
}

/// Trait abstracting all AWS API operations used by eksprov
pub trait AwsClients {
  fn get_caller_identity(&self) -> impl std::future::Future<Output = Result<CallerIdentity>> + Send;
  fn create_role(&self, spec: &RoleSpec) -> impl std::future::Future<Output = Result<RoleOutputs>> + Send;
  fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> impl std::future::Future<Output = Result<()>> + Send;
  fn create_cluster(
    &self,
    name: &str,
    role_arn: &str,
    subnet_ids: &[String],
  ) -> impl std::future::Future<Output = Result<ClusterOutputs>> + Send;
  fn describe_cluster(&self, name: &str) -> impl std::future::Future<Output = Result<Cluster>> + Send;
}

/// Real AWS client implementation wrapping the SDK clients
#[derive(Clone, Debug)]
pub struct RealAwsClients {
  eks: aws_sdk_eks::Client,
  iam: aws_sdk_iam::Client,
  sts: aws_sdk_sts::Client,
}

impl RealAwsClients {
  pub fn new(config: &aws_config::SdkConfig) -> Self {
    Self {
      eks: aws_sdk_eks::Client::new(config),
      iam: aws_sdk_iam::Client::new(config),
      sts: aws_sdk_sts::Client::new(config),
    }
  }
}

impl AwsClients for RealAwsClients {
  async fn get_caller_identity(&self) -> Result<CallerIdentity> {
    let output = self
      .sts
      .get_caller_identity()
      .send()
      .await
      .map_err(|err| Error::api("GetCallerIdentity", DisplayErrorContext(&err).to_string()))?;

    Ok(CallerIdentity {
      account: output.account().unwrap_or_default().to_string(),
      arn: output.arn().unwrap_or_default().to_string(),
    })
  }

  async fn create_role(&self, spec: &RoleSpec) -> Result<RoleOutputs> {
    debug!(role = %spec.name, "CreateRole");
    let output = self
      .iam
      .create_role()
      .role_name(&spec.name)
      .assume_role_policy_document(&spec.assume_role_policy_document)
      .send()
      .await
      .map_err(|err| Error::api("CreateRole", DisplayErrorContext(&err).to_string()))?;

    let role = output
      .role()
      .ok_or_else(|| Error::api("CreateRole", "response did not include a role"))?;

    Ok(RoleOutputs {
      name: role.role_name().to_string(),
      arn: role.arn().to_string(),
    })
  }

  async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
    debug!(role = role_name, policy = policy_arn, "AttachRolePolicy");
    self
      .iam
      .attach_role_policy()
      .role_name(role_name)
      .policy_arn(policy_arn)
      .send()
      .await
      .map_err(|err| Error::api("AttachRolePolicy", DisplayErrorContext(&err).to_string()))?;

    Ok(())
  }

  async fn create_cluster(&self, name: &str, role_arn: &str, subnet_ids: &[String]) -> Result<ClusterOutputs> {
    debug!(cluster = name, role_arn, ?subnet_ids, "CreateCluster");
    let vpc_config = VpcConfigRequest::builder()
      .set_subnet_ids(Some(subnet_ids.to_vec()))
      .build();

    let output = self
      .eks
      .create_cluster()
      .name(name)
      .role_arn(role_arn)
      .resources_vpc_config(vpc_config)
      .send()
      .await
      .map_err(|err| Error::api("CreateCluster", DisplayErrorContext(&err).to_string()))?;

    let cluster = output
      .cluster()
      .ok_or_else(|| Error::api("CreateCluster", "response did not include a cluster"))?;

    Ok(ClusterOutputs {
      name: cluster.name().unwrap_or(name).to_string(),
      arn: cluster.arn().unwrap_or_default().to_string(),
    })
  }

  /// Describe the cluster to get its full details
  async fn describe_cluster(&self, name: &str) -> Result<Cluster> {
    let not_found = || Error::NotFound {
      resource: format!("cluster {name}"),
    };

    match self.eks.describe_cluster().name(name).send().await {
      Ok(response) => response.cluster.ok_or_else(not_found),
      Err(err) => match err.into_service_error() {
        DescribeClusterError::ResourceNotFoundException(_) => Err(not_found()),
        err => Err(Error::api("DescribeCluster", DisplayErrorContext(&err).to_string())),
      },
    }
  }
}
