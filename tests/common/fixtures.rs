use aws_sdk_eks::types::{Certificate, Cluster, ClusterStatus};

use eksprov::config::Config;

use super::mock_aws::{CallLog, MockAwsClients, MockConnector};

/// An active cluster as returned by DescribeCluster
///
/// `None` leaves the certificate authority structure in place with no data.
pub fn described_cluster(ca_data: Option<&str>) -> Cluster {
  let certificate = match ca_data {
    Some(data) => Certificate::builder().data(data).build(),
    None => Certificate::builder().build(),
  };

  Cluster::builder()
    .name("example")
    .arn("arn:aws:eks::123:cluster/example")
    .status(ClusterStatus::Active)
    .certificate_authority(certificate)
    .build()
}

/// An active cluster whose response has no certificate authority structure at all
pub fn cluster_without_ca() -> Cluster {
  Cluster::builder()
    .name("example")
    .arn("arn:aws:eks::123:cluster/example")
    .status(ClusterStatus::Active)
    .build()
}

/// Configuration with the required provider values and the given policies/subnets
pub fn config(policy_arns: &[&str], subnet_ids: &[&str]) -> Config {
  let mut config = Config::default().with_overrides(Some("us-west-2".into()), Some("default".into()));
  config.role.policy_arns = policy_arns.iter().map(|p| p.to_string()).collect();
  config.cluster.subnet_ids = subnet_ids.iter().map(|s| s.to_string()).collect();
  config
}

/// Pinned binding reports empty CA data, default binding reports it populated.
/// Both mocks share one call log.
pub fn diverging_connector() -> (MockConnector, CallLog) {
  let calls = CallLog::default();
  let pinned = MockAwsClients {
    described: Some(described_cluster(Some(""))),
    ..Default::default()
  }
  .with_calls(&calls);
  let default = MockAwsClients {
    described: Some(described_cluster(Some("BASE64DATA"))),
    ..Default::default()
  }
  .with_calls(&calls);

  let connector = MockConnector {
    pinned,
    default,
    ..Default::default()
  };
  (connector, calls)
}
