use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aws_sdk_eks::types::{Cluster, ClusterStatus};

use eksprov::clients::{AwsClients, CallerIdentity};
use eksprov::error::{Error, Result};
use eksprov::provider::{Binding, Connect, ProviderConfig, ProviderHandle};
use eksprov::resources::{ClusterOutputs, RoleOutputs, RoleSpec};

/// Every API call a mock receives, in the order received
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
  GetCallerIdentity,
  CreateRole(String),
  /// Recorded when a (possibly delayed) role creation returns its ARN
  RoleResolved(String),
  AttachRolePolicy {
    role: String,
    policy_arn: String,
  },
  CreateCluster {
    name: String,
    role_arn: String,
    subnet_ids: Vec<String>,
  },
  DescribeCluster(String),
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

/// Mock AWS client for testing. Defaults describe a healthy, active cluster.
/// Override specific fields to simulate failures and delays.
#[derive(Clone)]
pub struct MockAwsClients {
  pub calls: CallLog,
  pub account: String,
  pub role_arn: String,
  pub role_delay: Option<Duration>,
  pub failing_policies: Vec<String>,
  pub fail_cluster: bool,
  pub cluster: ClusterOutputs,
  /// `None` makes every describe return `NotFound`
  pub described: Option<Cluster>,
  /// Number of describes answered with `NotFound` before `described` is returned
  pub not_found_times: Arc<AtomicU32>,
  /// Number of describes answered with a `CREATING` cluster before `described` is returned
  pub creating_times: Arc<AtomicU32>,
}

impl Default for MockAwsClients {
  fn default() -> Self {
    Self {
      calls: CallLog::default(),
      account: "123".to_string(),
      role_arn: "arn:aws:iam::123:role/eks-role".to_string(),
      role_delay: None,
      failing_policies: vec![],
      fail_cluster: false,
      cluster: ClusterOutputs {
        name: "example".to_string(),
        arn: "arn:aws:eks::123:cluster/example".to_string(),
      },
      described: Some(super::fixtures::described_cluster(Some("BASE64DATA"))),
      not_found_times: Arc::new(AtomicU32::new(0)),
      creating_times: Arc::new(AtomicU32::new(0)),
    }
  }
}

impl MockAwsClients {
  pub fn with_calls(mut self, calls: &CallLog) -> Self {
    self.calls = calls.clone();
    self
  }

  fn record(&self, call: Call) {
    self.calls.lock().unwrap().push(call);
  }

  pub fn recorded(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  fn identity(&self) -> CallerIdentity {
    CallerIdentity {
      account: self.account.clone(),
      arn: format!("arn:aws:iam::{}:user/test", self.account),
    }
  }

  fn take(counter: &AtomicU32) -> bool {
    counter
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok()
  }
}

impl AwsClients for MockAwsClients {
  async fn get_caller_identity(&self) -> Result<CallerIdentity> {
    self.record(Call::GetCallerIdentity);
    Ok(self.identity())
  }

  async fn create_role(&self, spec: &RoleSpec) -> Result<RoleOutputs> {
    self.record(Call::CreateRole(spec.name.clone()));
    if let Some(delay) = self.role_delay {
      tokio::time::sleep(delay).await;
    }
    self.record(Call::RoleResolved(self.role_arn.clone()));

    Ok(RoleOutputs {
      name: spec.name.clone(),
      arn: self.role_arn.clone(),
    })
  }

  async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
    self.record(Call::AttachRolePolicy {
      role: role_name.to_string(),
      policy_arn: policy_arn.to_string(),
    });

    if self.failing_policies.iter().any(|p| p == policy_arn) {
      return Err(Error::Api {
        operation: "AttachRolePolicy".to_string(),
        message: format!("mock failure attaching {policy_arn}"),
      });
    }
    Ok(())
  }

  async fn create_cluster(&self, name: &str, role_arn: &str, subnet_ids: &[String]) -> Result<ClusterOutputs> {
    self.record(Call::CreateCluster {
      name: name.to_string(),
      role_arn: role_arn.to_string(),
      subnet_ids: subnet_ids.to_vec(),
    });

    if self.fail_cluster {
      return Err(Error::Api {
        operation: "CreateCluster".to_string(),
        message: "mock InvalidParameterException".to_string(),
      });
    }
    Ok(self.cluster.clone())
  }

  async fn describe_cluster(&self, name: &str) -> Result<Cluster> {
    self.record(Call::DescribeCluster(name.to_string()));
    let not_found = || Error::NotFound {
      resource: format!("cluster {name}"),
    };

    if Self::take(&self.not_found_times) {
      return Err(not_found());
    }
    if Self::take(&self.creating_times) {
      return Ok(
        Cluster::builder()
          .name(name)
          .arn(&self.cluster.arn)
          .status(ClusterStatus::Creating)
          .build(),
      );
    }

    self.described.clone().ok_or_else(not_found)
  }
}

/// Hands out the pinned or default mock and records every connection attempt
#[derive(Clone, Default)]
pub struct MockConnector {
  pub pinned: MockAwsClients,
  pub default: MockAwsClients,
  pub connects: Arc<Mutex<Vec<Binding>>>,
  pub fail_auth: bool,
}

impl MockConnector {
  pub fn connected(&self) -> Vec<Binding> {
    self.connects.lock().unwrap().clone()
  }
}

impl Connect for MockConnector {
  type Clients = MockAwsClients;

  async fn connect(&self, config: &ProviderConfig, binding: Binding) -> Result<ProviderHandle<MockAwsClients>> {
    self.connects.lock().unwrap().push(binding);

    if self.fail_auth {
      return Err(Error::Authentication {
        profile: config.profile.clone(),
        region: config.region.clone(),
        message: "mock ExpiredToken".to_string(),
      });
    }

    let clients = match binding {
      Binding::Pinned => self.pinned.clone(),
      Binding::Default => self.default.clone(),
    };
    clients.record(Call::GetCallerIdentity);
    Ok(ProviderHandle {
      binding,
      identity: clients.identity(),
      clients,
    })
  }
}
