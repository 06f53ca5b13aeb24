//! AWS service implementations of [`CloudApi`](crate::app::collector::CloudApi).

pub mod acm;

pub use acm::{collect_acm_certificates, AcmApi, CertificateDetail, CertificateSummary};
