//! Multi-region resource collection.
//!
//! A collection pass turns `(credentials, regions)` into a map of region to fully
//! described resources. Each region runs the two-phase [`RegionCollector`]; the
//! [`MultiRegionCollector`] assembles the map and aborts on the first failure.
//!
//! ```text
//! MultiRegionCollector ──► RegionCollector ──► CloudApi::list_summaries
//!                                         └──► CloudApi::describe_detail (per summary)
//! ```
//!
//! Results are all-or-nothing: a returned map always holds every requested region.

pub mod cloud_api;
pub mod config;
pub mod errors;
mod fan_out;
pub mod region;
pub mod sdk_errors;

pub use cloud_api::{CloudApi, ResourceSummary};
pub use config::{CollectorConfig, ConcurrencyConfig};
pub use errors::CollectError;
pub use region::{validate_region, RegionCollector};
pub use sdk_errors::ErrorCategory;

use aws_credential_types::provider::SharedCredentialsProvider;
use fan_out::fan_out_fail_fast;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Details for one region, in listing order
pub type RegionResult<D> = Vec<D>;

/// Region-keyed output of a collection pass
pub type CollectionResult<D> = HashMap<String, RegionResult<D>>;

/// Runs a [`RegionCollector`] per requested region and assembles the region-keyed map.
pub struct MultiRegionCollector<A: CloudApi> {
    region_collector: RegionCollector<A>,
    max_concurrent_regions: usize,
}

impl<A: CloudApi> MultiRegionCollector<A> {
    /// Fully sequential collector
    pub fn new(api: Arc<A>) -> Self {
        Self::with_concurrency(api, &ConcurrencyConfig::default())
    }

    pub fn with_concurrency(api: Arc<A>, concurrency: &ConcurrencyConfig) -> Self {
        Self {
            region_collector: RegionCollector::new(api)
                .with_max_concurrent_describes(concurrency.max_concurrent_describes),
            max_concurrent_regions: concurrency.max_concurrent_regions.max(1),
        }
    }

    /// Collect every region in `regions`.
    ///
    /// Duplicated regions are collected again and the later result replaces the earlier
    /// one. An empty region list yields an empty map without any API call.
    pub async fn collect(
        &self,
        credentials: &SharedCredentialsProvider,
        regions: &[String],
        cancel: &CancellationToken,
    ) -> Result<CollectionResult<A::Detail>, CollectError> {
        let service = self.region_collector.service_name();
        let started = Instant::now();
        log_debug!(
            "Starting {} collection across {} regions",
            service,
            regions.len()
        );

        let per_region = fan_out_fail_fast(
            regions.iter().map(String::as_str).collect(),
            self.max_concurrent_regions,
            cancel,
            |_, region, token| async move {
                let details = self
                    .region_collector
                    .collect(credentials, region, &token)
                    .await?;
                Ok::<_, CollectError>((region.to_string(), details))
            },
        )
        .await;

        let per_region = match per_region {
            Ok(per_region) => per_region,
            Err(err) => {
                if err.is_cancelled() {
                    log_warn!("{} collection cancelled: {}", service, err);
                } else {
                    log_error!(
                        "{} collection aborted [{}]: {} ({})",
                        service,
                        err.category().short_label(),
                        err,
                        err.category()
                    );
                }
                return Err(err);
            }
        };

        let mut result: CollectionResult<A::Detail> = HashMap::with_capacity(per_region.len());
        for (region, details) in per_region {
            result.insert(region, details);
        }

        log_info!(
            "{} collection finished: {} regions, {} resources in {:?}",
            service,
            result.len(),
            result.values().map(Vec::len).sum::<usize>(),
            started.elapsed()
        );
        Ok(result)
    }
}
