use aws_sdk_eks::types::Cluster;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
  clients::AwsClients,
  error::{Error, Result},
  provider::Binding,
  resources::ClusterOutputs,
  retry::{self, Backoff},
};

/// Fields read back from a created cluster
///
/// `certificate_authority_data` is optional: depending on the provider binding the
/// same cluster may report it populated, empty, or absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterLookupResult {
  pub binding: Binding,
  pub name: String,
  pub arn: String,
  pub certificate_authority_data: Option<String>,
}

impl ClusterLookupResult {
  /// Certificate authority data as an exportable string, empty when absent
  pub fn ca_data(&self) -> &str {
    self.certificate_authority_data.as_deref().unwrap_or_default()
  }
}

/// Describe the cluster through the given binding and extract its lookup fields
///
/// A cluster the API does not reflect yet fails with `NotFound`; retrying is left
/// to the caller.
pub async fn lookup<A: AwsClients>(cluster_name: &str, clients: &A, binding: Binding) -> Result<ClusterLookupResult> {
  debug!(%binding, cluster = cluster_name, "Looking up cluster");
  let cluster = clients.describe_cluster(cluster_name).await?;
  extract(&cluster, binding)
}

/// Map a described cluster onto the lookup schema
///
/// The certificate authority structure itself must be present; only its `data`
/// field is allowed to be missing or empty.
pub fn extract(cluster: &Cluster, binding: Binding) -> Result<ClusterLookupResult> {
  let name = cluster
    .name()
    .ok_or_else(|| Error::shape("cluster", "response does not include a name"))?;
  let arn = cluster
    .arn()
    .ok_or_else(|| Error::shape(name, "response does not include an ARN"))?;
  let certificate_authority = cluster
    .certificate_authority()
    .ok_or_else(|| Error::shape(name, "response does not include a certificate authority"))?;

  Ok(ClusterLookupResult {
    binding,
    name: name.to_string(),
    arn: arn.to_string(),
    certificate_authority_data: certificate_authority.data().map(str::to_string),
  })
}

/// Look the created cluster up through both bindings concurrently
///
/// Each lookup retries `NotFound` as the backoff allows. Returns `(pinned, default)`;
/// a difference between the two is reported, not reconciled.
pub async fn lookup_both<P, D>(
  cluster: &ClusterOutputs,
  pinned: &P,
  default: &D,
  backoff: &Backoff,
) -> Result<(ClusterLookupResult, ClusterLookupResult)>
where
  P: AwsClients,
  D: AwsClients,
{
  debug!(cluster = %cluster.name, arn = %cluster.arn, "Resolving lookups");
  let name = cluster.name.as_str();

  let (pinned, default) = tokio::try_join!(
    retry::retry_not_found(backoff, "lookup (pinned)", move || lookup(name, pinned, Binding::Pinned)),
    retry::retry_not_found(backoff, "lookup (default)", move || lookup(name, default, Binding::Default)),
  )?;

  report_divergence(&pinned, &default);

  Ok((pinned, default))
}

fn report_divergence(pinned: &ClusterLookupResult, default: &ClusterLookupResult) {
  if pinned.ca_data() == default.ca_data() {
    info!(cluster = %pinned.name, "Certificate authority data matches across bindings");
  } else {
    warn!(
      cluster = %pinned.name,
      pinned_empty = pinned.ca_data().is_empty(),
      default_empty = default.ca_data().is_empty(),
      "Certificate authority data differs between pinned and default bindings"
    );
  }
}
