use crate::app::collector::{
    CloudApi, CollectError, CollectionResult, CollectorConfig, MultiRegionCollector,
    ResourceSummary,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sdk_acm as acm;
use aws_sdk_acm::error::DisplayErrorContext;
use aws_types::region::Region;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Key algorithms requested when listing with `all_key_types`.
///
/// Without an explicit filter `ListCertificates` only returns RSA-2048 certificates.
const ALL_KEY_ALGORITHMS: &[&str] = &[
    "RSA_1024",
    "RSA_2048",
    "RSA_3072",
    "RSA_4096",
    "EC_prime256v1",
    "EC_secp384r1",
    "EC_secp521r1",
];

/// One entry of `ListCertificates`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CertificateSummary {
    pub certificate_arn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
}

impl ResourceSummary for CertificateSummary {
    fn identifier(&self) -> &str {
        &self.certificate_arn
    }
}

impl TryFrom<acm::types::CertificateSummary> for CertificateSummary {
    type Error = anyhow::Error;

    fn try_from(summary: acm::types::CertificateSummary) -> Result<Self> {
        let certificate_arn = summary.certificate_arn.ok_or_else(|| {
            anyhow!(
                "ListCertificates returned a certificate without an ARN (domain: {})",
                summary.domain_name.as_deref().unwrap_or("unknown")
            )
        })?;
        Ok(Self {
            certificate_arn,
            domain_name: summary.domain_name,
        })
    }
}

/// Validation state of one domain on a certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainValidation {
    pub domain_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_emails: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_record: Option<ResourceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_method: Option<String>,
}

impl DomainValidation {
    fn from_sdk(option: acm::types::DomainValidation) -> Self {
        Self {
            domain_name: option.domain_name,
            validation_emails: option.validation_emails.unwrap_or_default(),
            validation_domain: option.validation_domain,
            validation_status: option.validation_status.map(|s| s.as_str().to_string()),
            resource_record: option.resource_record.map(|record| ResourceRecord {
                name: record.name,
                record_type: record.r#type.as_str().to_string(),
                value: record.value,
            }),
            validation_method: option.validation_method.map(|m| m.as_str().to_string()),
        }
    }
}

/// DNS record ACM expects for DNS validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRecord {
    pub name: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    pub value: String,
}

/// Managed renewal state. Only present for certificates ACM has started renewing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenewalSummary {
    /// `PENDING_AUTO_RENEWAL`, `PENDING_VALIDATION`, `SUCCESS` or `FAILED`
    pub renewal_status: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_validation_options: Vec<DomainValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renewal_status_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RenewalSummary {
    fn from_sdk(summary: acm::types::RenewalSummary) -> Self {
        Self {
            renewal_status: summary.renewal_status.as_str().to_string(),
            domain_validation_options: summary
                .domain_validation_options
                .into_iter()
                .map(DomainValidation::from_sdk)
                .collect(),
            renewal_status_reason: summary
                .renewal_status_reason
                .map(|r| r.as_str().to_string()),
            updated_at: to_utc(&summary.updated_at),
        }
    }
}

/// Normalized `DescribeCertificate` output, the record handed to policy evaluation.
///
/// Enum values keep their AWS wire spelling (`ISSUED`, `RSA_2048`, `AMAZON_ISSUED`, ...)
/// and timestamps are UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CertificateDetail {
    pub certificate_arn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_alternative_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_validation_options: Vec<DomainValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "Type", skip_serializing_if = "Option::is_none")]
    pub certificate_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_usages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extended_key_usages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_after: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub in_use_by: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renewal_eligibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renewal_summary: Option<RenewalSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_transparency_logging_preference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority_arn: Option<String>,
}

impl CertificateDetail {
    /// Normalize an SDK record. `requested_arn` fills in a missing ARN so every detail
    /// stays traceable to the summary it was described from.
    pub fn from_sdk(certificate: acm::types::CertificateDetail, requested_arn: &str) -> Self {
        let domain_validation_options = certificate
            .domain_validation_options
            .unwrap_or_default()
            .into_iter()
            .map(DomainValidation::from_sdk)
            .collect();

        Self {
            certificate_arn: certificate
                .certificate_arn
                .unwrap_or_else(|| requested_arn.to_string()),
            domain_name: certificate.domain_name,
            subject_alternative_names: certificate.subject_alternative_names.unwrap_or_default(),
            domain_validation_options,
            subject: certificate.subject,
            issuer: certificate.issuer,
            serial: certificate.serial,
            status: certificate.status.map(|s| s.as_str().to_string()),
            certificate_type: certificate.r#type.map(|t| t.as_str().to_string()),
            key_algorithm: certificate.key_algorithm.map(|k| k.as_str().to_string()),
            signature_algorithm: certificate.signature_algorithm,
            key_usages: certificate
                .key_usages
                .unwrap_or_default()
                .into_iter()
                .filter_map(|usage| usage.name.map(|n| n.as_str().to_string()))
                .collect(),
            extended_key_usages: certificate
                .extended_key_usages
                .unwrap_or_default()
                .into_iter()
                .filter_map(|usage| usage.name.map(|n| n.as_str().to_string()))
                .collect(),
            created_at: certificate.created_at.as_ref().and_then(to_utc),
            issued_at: certificate.issued_at.as_ref().and_then(to_utc),
            imported_at: certificate.imported_at.as_ref().and_then(to_utc),
            not_before: certificate.not_before.as_ref().and_then(to_utc),
            not_after: certificate.not_after.as_ref().and_then(to_utc),
            revoked_at: certificate.revoked_at.as_ref().and_then(to_utc),
            revocation_reason: certificate
                .revocation_reason
                .map(|r| r.as_str().to_string()),
            failure_reason: certificate.failure_reason.map(|r| r.as_str().to_string()),
            in_use_by: certificate.in_use_by.unwrap_or_default(),
            renewal_eligibility: certificate
                .renewal_eligibility
                .map(|r| r.as_str().to_string()),
            renewal_summary: certificate.renewal_summary.map(RenewalSummary::from_sdk),
            certificate_transparency_logging_preference: certificate
                .options
                .and_then(|o| o.certificate_transparency_logging_preference)
                .map(|p| p.as_str().to_string()),
            certificate_authority_arn: certificate.certificate_authority_arn,
        }
    }

    /// True once `not_after` has passed. Certificates without an expiry never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.not_after.is_some_and(|not_after| not_after <= now)
    }

    /// Whole days until `not_after`; negative once expired
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.not_after
            .map(|not_after| not_after.signed_duration_since(now).num_days())
    }
}

fn to_utc(timestamp: &aws_smithy_types::DateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

/// [`CloudApi`] over AWS Certificate Manager.
///
/// Clients are built per call from a shared base `SdkConfig`, so SDK retry, timeout,
/// and endpoint settings come from the caller's environment while region and
/// credentials come from the collection pass.
pub struct AcmApi {
    base_config: SdkConfig,
    all_key_types: bool,
}

impl AcmApi {
    pub fn new(base_config: SdkConfig) -> Self {
        Self {
            base_config,
            all_key_types: true,
        }
    }

    pub fn with_all_key_types(mut self, all_key_types: bool) -> Self {
        self.all_key_types = all_key_types;
        self
    }

    fn client(&self, credentials: &SharedCredentialsProvider, region: &str) -> acm::Client {
        let config = acm::config::Builder::from(&self.base_config)
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials.clone())
            .build();
        acm::Client::from_conf(config)
    }

    fn list_filters(&self) -> Option<acm::types::Filters> {
        self.all_key_types.then(|| {
            acm::types::Filters::builder()
                .set_key_types(Some(
                    ALL_KEY_ALGORITHMS
                        .iter()
                        .map(|algorithm| acm::types::KeyAlgorithm::from(*algorithm))
                        .collect(),
                ))
                .build()
        })
    }
}

#[async_trait]
impl CloudApi for AcmApi {
    type Summary = CertificateSummary;
    type Detail = CertificateDetail;

    fn service_name(&self) -> &'static str {
        "ACM"
    }

    /// List every certificate in the region, following `NextToken` until exhausted
    async fn list_summaries(
        &self,
        credentials: &SharedCredentialsProvider,
        region: &str,
    ) -> Result<Vec<CertificateSummary>> {
        let client = self.client(credentials, region);
        let mut paginator = client
            .list_certificates()
            .set_includes(self.list_filters())
            .into_paginator()
            .send();

        let mut summaries = Vec::new();
        while let Some(page) = paginator.next().await {
            let page = page
                .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))
                .with_context(|| format!("ListCertificates failed in {}", region))?;
            for summary in page.certificate_summary_list.unwrap_or_default() {
                summaries.push(CertificateSummary::try_from(summary)?);
            }
        }

        debug!("ListCertificates returned {} certificates in {}", summaries.len(), region);
        Ok(summaries)
    }

    async fn describe_detail(
        &self,
        credentials: &SharedCredentialsProvider,
        region: &str,
        identifier: &str,
    ) -> Result<CertificateDetail> {
        let client = self.client(credentials, region);
        let response = client
            .describe_certificate()
            .certificate_arn(identifier)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))
            .with_context(|| format!("DescribeCertificate failed for {}", identifier))?;

        let certificate = response
            .certificate
            .ok_or_else(|| anyhow!("Certificate {} not found", identifier))?;
        Ok(CertificateDetail::from_sdk(certificate, identifier))
    }
}

/// Collect and describe every ACM certificate in `regions`.
///
/// Concurrency and key-type listing follow `config`; `config.regions` is ignored in
/// favor of the explicit `regions` argument.
pub async fn collect_acm_certificates(
    base_config: &SdkConfig,
    credentials: &SharedCredentialsProvider,
    regions: &[String],
    config: &CollectorConfig,
    cancel: &CancellationToken,
) -> Result<CollectionResult<CertificateDetail>, CollectError> {
    let api = AcmApi::new(base_config.clone()).with_all_key_types(config.all_key_types);
    MultiRegionCollector::with_concurrency(Arc::new(api), &config.concurrency)
        .collect(credentials, regions, cancel)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use acm::types::{
        CertificateStatus, CertificateType, DomainStatus, ExtendedKeyUsage,
        ExtendedKeyUsageName, FailureReason, KeyAlgorithm, KeyUsage, KeyUsageName, RecordType,
        RenewalStatus, ValidationMethod,
    };
    use insta::assert_json_snapshot;
    use pretty_assertions::assert_eq;

    const ARN: &str = "arn:aws:acm:us-east-1:123456789012:certificate/1f2e3d4c";

    fn sdk_domain_validation() -> acm::types::DomainValidation {
        acm::types::DomainValidation::builder()
            .domain_name("example.com")
            .validation_emails("admin@example.com")
            .validation_domain("example.com")
            .validation_status(DomainStatus::PendingValidation)
            .resource_record(
                acm::types::ResourceRecord::builder()
                    .name("_x1.example.com.")
                    .r#type(RecordType::Cname)
                    .value("_x2.acm-validations.aws.")
                    .build()
                    .expect("resource record"),
            )
            .validation_method(ValidationMethod::Dns)
            .build()
            .expect("domain validation")
    }

    fn sdk_certificate() -> acm::types::CertificateDetail {
        acm::types::CertificateDetail::builder()
            .certificate_arn(ARN)
            .domain_name("example.com")
            .subject_alternative_names("example.com")
            .subject_alternative_names("www.example.com")
            .issuer("Amazon")
            .status(CertificateStatus::Issued)
            .r#type(CertificateType::AmazonIssued)
            .key_algorithm(KeyAlgorithm::Rsa2048)
            .key_usages(KeyUsage::builder().name(KeyUsageName::DigitalSignature).build())
            .extended_key_usages(
                ExtendedKeyUsage::builder()
                    .name(ExtendedKeyUsageName::TlsWebServerAuthentication)
                    .build(),
            )
            .not_after(aws_smithy_types::DateTime::from_secs(1_767_225_600))
            .in_use_by("arn:aws:elasticloadbalancing:us-east-1:123456789012:loadbalancer/app/web/50dc6c495c0c9188")
            .domain_validation_options(sdk_domain_validation())
            .renewal_summary(
                acm::types::RenewalSummary::builder()
                    .renewal_status(RenewalStatus::PendingAutoRenewal)
                    .renewal_status_reason(FailureReason::CaaError)
                    .domain_validation_options(sdk_domain_validation())
                    .updated_at(aws_smithy_types::DateTime::from_secs(1_764_547_200))
                    .build()
                    .expect("renewal summary"),
            )
            .build()
    }

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn test_summary_requires_arn() {
        let summary = acm::types::CertificateSummary::builder()
            .certificate_arn(ARN)
            .domain_name("example.com")
            .build();
        let summary = CertificateSummary::try_from(summary).expect("summary with ARN");
        assert_eq!(summary.identifier(), ARN);

        let missing = acm::types::CertificateSummary::builder()
            .domain_name("orphan.example.com")
            .build();
        let err = CertificateSummary::try_from(missing).expect_err("no ARN");
        assert!(err.to_string().contains("orphan.example.com"));
    }

    #[test]
    fn test_detail_normalization() {
        let detail = CertificateDetail::from_sdk(sdk_certificate(), ARN);

        assert_eq!(detail.certificate_arn, ARN);
        assert_eq!(
            detail.subject_alternative_names,
            vec!["example.com", "www.example.com"]
        );
        assert_eq!(detail.status.as_deref(), Some("ISSUED"));
        assert_eq!(detail.certificate_type.as_deref(), Some("AMAZON_ISSUED"));
        assert_eq!(detail.key_algorithm.as_deref(), Some("RSA_2048"));
        assert_eq!(detail.key_usages, vec!["DIGITAL_SIGNATURE"]);
        assert_eq!(detail.extended_key_usages, vec!["TLS_WEB_SERVER_AUTHENTICATION"]);
        assert_eq!(detail.not_after, Some(at("2026-01-01T00:00:00Z")));
        assert_eq!(detail.in_use_by.len(), 1);

        let expected_validation = DomainValidation {
            domain_name: "example.com".to_string(),
            validation_emails: vec!["admin@example.com".to_string()],
            validation_domain: Some("example.com".to_string()),
            validation_status: Some("PENDING_VALIDATION".to_string()),
            resource_record: Some(ResourceRecord {
                name: "_x1.example.com.".to_string(),
                record_type: "CNAME".to_string(),
                value: "_x2.acm-validations.aws.".to_string(),
            }),
            validation_method: Some("DNS".to_string()),
        };
        assert_eq!(detail.domain_validation_options, vec![expected_validation.clone()]);
        assert_eq!(
            detail.renewal_summary,
            Some(RenewalSummary {
                renewal_status: "PENDING_AUTO_RENEWAL".to_string(),
                domain_validation_options: vec![expected_validation],
                renewal_status_reason: Some("CAA_ERROR".to_string()),
                updated_at: Some(at("2025-12-01T00:00:00Z")),
            })
        );
    }

    #[test]
    fn test_detail_falls_back_to_requested_arn() {
        let detail = CertificateDetail::from_sdk(
            acm::types::CertificateDetail::builder().build(),
            ARN,
        );
        assert_eq!(detail.certificate_arn, ARN);
        assert_eq!(detail.not_after, None);
        assert_eq!(detail.renewal_summary, None);
    }

    #[test]
    fn test_expiry_helpers() {
        let detail = CertificateDetail::from_sdk(sdk_certificate(), ARN);

        assert!(!detail.is_expired(at("2025-12-01T00:00:00Z")));
        assert_eq!(detail.days_until_expiry(at("2025-12-01T00:00:00Z")), Some(31));
        assert!(detail.is_expired(at("2026-01-01T00:00:00Z")));
        assert_eq!(detail.days_until_expiry(at("2026-01-11T00:00:00Z")), Some(-10));

        let no_expiry = CertificateDetail::from_sdk(
            acm::types::CertificateDetail::builder().build(),
            ARN,
        );
        assert!(!no_expiry.is_expired(at("2100-01-01T00:00:00Z")));
        assert_eq!(no_expiry.days_until_expiry(at("2100-01-01T00:00:00Z")), None);
    }

    #[test]
    fn test_detail_json_shape() {
        let detail = CertificateDetail {
            certificate_arn: ARN.to_string(),
            domain_name: Some("example.com".to_string()),
            subject_alternative_names: vec!["example.com".to_string()],
            domain_validation_options: vec![DomainValidation {
                domain_name: "example.com".to_string(),
                validation_emails: Vec::new(),
                validation_domain: Some("example.com".to_string()),
                validation_status: Some("SUCCESS".to_string()),
                resource_record: Some(ResourceRecord {
                    name: "_x1.example.com.".to_string(),
                    record_type: "CNAME".to_string(),
                    value: "_x2.acm-validations.aws.".to_string(),
                }),
                validation_method: Some("DNS".to_string()),
            }],
            subject: None,
            issuer: Some("Amazon".to_string()),
            serial: None,
            status: Some("ISSUED".to_string()),
            certificate_type: Some("AMAZON_ISSUED".to_string()),
            key_algorithm: None,
            signature_algorithm: None,
            key_usages: Vec::new(),
            extended_key_usages: Vec::new(),
            created_at: None,
            issued_at: None,
            imported_at: None,
            not_before: None,
            not_after: None,
            revoked_at: None,
            revocation_reason: None,
            failure_reason: None,
            in_use_by: Vec::new(),
            renewal_eligibility: Some("ELIGIBLE".to_string()),
            renewal_summary: Some(RenewalSummary {
                renewal_status: "FAILED".to_string(),
                domain_validation_options: Vec::new(),
                renewal_status_reason: Some("CAA_ERROR".to_string()),
                updated_at: Some(at("2025-12-01T00:00:00Z")),
            }),
            certificate_transparency_logging_preference: None,
            certificate_authority_arn: None,
        };

        assert_json_snapshot!(detail, @r###"
        {
          "CertificateArn": "arn:aws:acm:us-east-1:123456789012:certificate/1f2e3d4c",
          "DomainName": "example.com",
          "SubjectAlternativeNames": [
            "example.com"
          ],
          "DomainValidationOptions": [
            {
              "DomainName": "example.com",
              "ValidationDomain": "example.com",
              "ValidationStatus": "SUCCESS",
              "ResourceRecord": {
                "Name": "_x1.example.com.",
                "Type": "CNAME",
                "Value": "_x2.acm-validations.aws."
              },
              "ValidationMethod": "DNS"
            }
          ],
          "Issuer": "Amazon",
          "Status": "ISSUED",
          "Type": "AMAZON_ISSUED",
          "RenewalEligibility": "ELIGIBLE",
          "RenewalSummary": {
            "RenewalStatus": "FAILED",
            "RenewalStatusReason": "CAA_ERROR",
            "UpdatedAt": "2025-12-01T00:00:00Z"
          }
        }
        "###);
    }

    #[test]
    fn test_list_filters_follow_key_type_setting() {
        let base = SdkConfig::builder().build();

        let filters = AcmApi::new(base.clone())
            .list_filters()
            .expect("all key types by default");
        assert_eq!(filters.key_types.unwrap_or_default().len(), ALL_KEY_ALGORITHMS.len());

        assert!(AcmApi::new(base).with_all_key_types(false).list_filters().is_none());
    }
}
