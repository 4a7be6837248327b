use std::time::Duration;

use aws_sdk_eks::types::ClusterStatus;
use tracing::{info, warn};

use crate::{
  clients::AwsClients,
  config::LookupConfig,
  error::{Error, Result},
};

/// Exponential backoff applied by callers that choose to retry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Backoff {
  /// Retries after the first attempt; 0 disables retrying
  pub retries: u32,
  pub initial_delay: Duration,
  pub max_delay: Duration,
}

impl Backoff {
  pub fn none() -> Self {
    Self {
      retries: 0,
      initial_delay: Duration::ZERO,
      max_delay: Duration::ZERO,
    }
  }

  fn next_delay(&self, delay: Duration) -> Duration {
    delay.saturating_mul(2).min(self.max_delay)
  }
}

impl From<&LookupConfig> for Backoff {
  fn from(config: &LookupConfig) -> Self {
    Self {
      retries: config.retries,
      initial_delay: Duration::from_millis(config.initial_backoff_ms),
      max_delay: Duration::from_millis(config.max_backoff_ms.max(config.initial_backoff_ms)),
    }
  }
}

/// Retry an operation while it reports `NotFound`
///
/// Any other error is returned immediately, as is the last `NotFound` once the
/// retries are used up.
pub async fn retry_not_found<F, Fut, T>(backoff: &Backoff, operation_name: &str, mut operation: F) -> Result<T>
where
  F: FnMut() -> Fut,
  Fut: std::future::Future<Output = Result<T>>,
{
  let mut attempt = 0u32;
  let mut delay = backoff.initial_delay;

  loop {
    match operation().await {
      Err(Error::NotFound { resource }) if attempt < backoff.retries => {
        attempt += 1;
        warn!(
          operation = operation_name,
          attempt,
          delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
          "{resource} not found, retrying"
        );
        tokio::time::sleep(delay).await;
        delay = backoff.next_delay(delay);
      }
      result => return result,
    }
  }
}

/// Poll the cluster until it reports `ACTIVE`
///
/// Gives up with `NotFound` once the backoff is exhausted; a cluster that reports
/// `FAILED` is a creation error.
pub async fn wait_for_active<A: AwsClients>(clients: &A, cluster_name: &str, backoff: &Backoff) -> Result<()> {
  let mut attempt = 0u32;
  let mut delay = backoff.initial_delay;

  loop {
    let status = match clients.describe_cluster(cluster_name).await {
      Ok(cluster) => cluster.status().cloned(),
      Err(Error::NotFound { .. }) => None,
      Err(err) => return Err(err),
    };

    match status {
      Some(ClusterStatus::Active) => {
        info!(cluster = cluster_name, "Cluster is active");
        return Ok(());
      }
      Some(ClusterStatus::Failed) => {
        return Err(Error::creation(
          cluster_name,
          Error::api("DescribeCluster", "cluster entered FAILED status"),
        ));
      }
      _ if attempt >= backoff.retries => {
        return Err(Error::NotFound {
          resource: format!("active cluster {cluster_name}"),
        });
      }
      status => {
        attempt += 1;
        info!(cluster = cluster_name, ?status, attempt, "Waiting for cluster to become active");
        tokio::time::sleep(delay).await;
        delay = backoff.next_delay(delay);
      }
    }
  }
}
