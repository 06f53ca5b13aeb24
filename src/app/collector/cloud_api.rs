use anyhow::Result;
use async_trait::async_trait;
use aws_credential_types::provider::SharedCredentialsProvider;

/// Minimal listing output: enough to fetch the full record
pub trait ResourceSummary {
    /// Stable identifier passed to [`CloudApi::describe_detail`]
    fn identifier(&self) -> &str;
}

/// Capability the collectors are written against.
///
/// Implementations own transport, retries, and pagination. `list_summaries` must
/// return the complete listing for the region in the order the service returned it.
#[async_trait]
pub trait CloudApi: Send + Sync {
    type Summary: ResourceSummary + Send + Sync;
    type Detail: Send;

    /// Display name used in errors and logs, e.g. "ACM"
    fn service_name(&self) -> &'static str;

    async fn list_summaries(
        &self,
        credentials: &SharedCredentialsProvider,
        region: &str,
    ) -> Result<Vec<Self::Summary>>;

    async fn describe_detail(
        &self,
        credentials: &SharedCredentialsProvider,
        region: &str,
        identifier: &str,
    ) -> Result<Self::Detail>;
}
