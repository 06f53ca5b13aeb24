//! Core modules for the ACM collector.
//!
//! # Module Organization
//!
//! - [`collector`] - generic multi-region, two-phase collection with fail-fast aggregation
//! - [`aws_services`] - concrete `CloudApi` implementations backed by the AWS SDK
//!
//! # Architecture
//!
//! Control flows strictly downward: `MultiRegionCollector` -> `RegionCollector` ->
//! `CloudApi`. Records flow back up as per-region ordered vectors keyed by region.

pub mod aws_services;
pub mod collector;
