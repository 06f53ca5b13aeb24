use super::cloud_api::{CloudApi, ResourceSummary};
use super::errors::CollectError;
use super::fan_out::{fan_out_fail_fast, unless_cancelled};
use aws_credential_types::provider::SharedCredentialsProvider;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Region codes across partitions: us-east-1, us-gov-west-1, cn-north-1, ap-southeast-5, ...
static REGION_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d+$").expect("static regex is valid"));

/// Reject region strings that cannot be AWS region codes before touching the network
pub fn validate_region(region: &str) -> Result<(), CollectError> {
    if REGION_CODE.is_match(region) {
        Ok(())
    } else {
        Err(CollectError::Configuration {
            region: region.to_string(),
            message: format!("'{}' is not an AWS region code", region),
        })
    }
}

/// Two-phase collector for a single region: list, then describe every listed item.
pub struct RegionCollector<A: CloudApi> {
    api: Arc<A>,
    max_concurrent_describes: usize,
}

impl<A: CloudApi> RegionCollector<A> {
    /// Sequential collector: one describe call at a time, in list order
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            max_concurrent_describes: 1,
        }
    }

    pub fn with_max_concurrent_describes(mut self, limit: usize) -> Self {
        self.max_concurrent_describes = limit.max(1);
        self
    }

    pub fn service_name(&self) -> &'static str {
        self.api.service_name()
    }

    /// Collect every resource detail for `region`, in listing order.
    ///
    /// Any failure discards the details fetched so far and is returned as-is.
    pub async fn collect(
        &self,
        credentials: &SharedCredentialsProvider,
        region: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<A::Detail>, CollectError> {
        validate_region(region)?;
        let service = self.api.service_name();
        let started = Instant::now();

        debug!("Listing {} resources in {}", service, region);
        let summaries = unless_cancelled(
            cancel,
            region,
            self.api.list_summaries(credentials, region),
        )
        .await?
        .map_err(|source| CollectError::List {
            service,
            region: region.to_string(),
            source,
        })?;
        debug!(
            "Listed {} {} resources in {}, describing",
            summaries.len(),
            service,
            region
        );

        let details = fan_out_fail_fast(
            summaries,
            self.max_concurrent_describes,
            cancel,
            |_, summary, token| async move {
                let identifier = summary.identifier();
                unless_cancelled(
                    &token,
                    region,
                    self.api.describe_detail(credentials, region, identifier),
                )
                .await?
                .map_err(|source| CollectError::Describe {
                    service,
                    region: region.to_string(),
                    identifier: identifier.to_string(),
                    source,
                })
            },
        )
        .await?;

        info!(
            "Collected {} {} resources in {} ({:?})",
            details.len(),
            service,
            region,
            started.elapsed()
        );
        Ok(details)
    }
}
